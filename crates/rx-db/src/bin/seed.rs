//! # Seed Data Generator
//!
//! Populates the database with a development medicine catalog.
//!
//! ## Usage
//! ```bash
//! # Default database path (./rx_dev.db)
//! cargo run -p rx-db --bin seed
//!
//! # Custom path
//! cargo run -p rx-db --bin seed -- --db ./data/pharmacy.db
//! ```
//!
//! Each medicine gets a deterministic price and stock spread so every
//! stock-level bucket (critical/low/normal/high) is represented on the
//! inventory dashboard.

use chrono::Utc;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rx_core::Medicine;
use rx_db::{Database, DbConfig};

/// Catalog spread across categories used by substitute suggestions.
const CATALOG: &[(&str, &[(&str, &str)])] = &[
    (
        "analgesic",
        &[
            ("Paracetamol 500mg", "tablet"),
            ("Paracetamol 650mg", "tablet"),
            ("Ibuprofen 400mg", "tablet"),
            ("Diclofenac 50mg", "tablet"),
            ("Aspirin 325mg", "tablet"),
            ("Tramadol 50mg", "capsule"),
        ],
    ),
    (
        "antibiotic",
        &[
            ("Amoxicillin 500mg", "capsule"),
            ("Azithromycin 250mg", "tablet"),
            ("Ciprofloxacin 500mg", "tablet"),
            ("Doxycycline 100mg", "capsule"),
            ("Cephalexin 250mg", "capsule"),
        ],
    ),
    (
        "antihistamine",
        &[
            ("Cetirizine 10mg", "tablet"),
            ("Loratadine 10mg", "tablet"),
            ("Fexofenadine 120mg", "tablet"),
        ],
    ),
    (
        "antacid",
        &[
            ("Omeprazole 20mg", "capsule"),
            ("Pantoprazole 40mg", "tablet"),
            ("Ranitidine 150mg", "tablet"),
        ],
    ),
    (
        "antidiabetic",
        &[
            ("Metformin 500mg", "tablet"),
            ("Glimepiride 2mg", "tablet"),
        ],
    ),
    (
        "supplement",
        &[
            ("Vitamin D3 1000IU", "tablet"),
            ("Vitamin B12 500mcg", "tablet"),
            ("Iron Folic Acid", "tablet"),
            ("Calcium 500mg", "tablet"),
        ],
    ),
    (
        "syrup",
        &[
            ("Cough Syrup 100ml", "bottle"),
            ("Paracetamol Syrup 60ml", "bottle"),
            ("ORS Solution 200ml", "bottle"),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./rx_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Rx Engine Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./rx_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding medicine catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.medicines().count_active().await?;
    if existing > 0 {
        info!(
            existing,
            "Database already has medicines; skipping seed to avoid duplicates"
        );
        return Ok(());
    }

    let mut generated = 0usize;
    for (category, medicines) in CATALOG {
        for (index, (name, unit)) in medicines.iter().enumerate() {
            let medicine = generate_medicine(category, name, unit, generated + index);
            db.medicines().insert(&medicine).await?;
        }
        generated += medicines.len();
    }

    info!(count = generated, "Seed complete");

    // Sanity-check substring search over the fresh catalog.
    let hits = db.medicines().search("paracetamol", 10).await?;
    info!(hits = hits.len(), "Search 'paracetamol'");

    Ok(())
}

/// Generates one medicine with a deterministic price and stock spread.
fn generate_medicine(category: &str, name: &str, unit: &str, seed: usize) -> Medicine {
    let now = Utc::now();

    // Price 0.50 - 8.49 per unit
    let unit_price_cents = 50 + ((seed * 37) % 800) as i64;

    // Stock spread hits every report bucket: 0-149 units
    let stock_quantity = ((seed * 13) % 150) as i64;

    Medicine {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        category: category.to_string(),
        unit: unit.to_string(),
        unit_price_cents,
        stock_quantity,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
