//! # rx-db: Database Layer for the Rx Engine
//!
//! This crate provides database access for the pharmacy fulfillment engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Rx Engine Data Flow                          │
//! │                                                                     │
//! │  FulfillmentEngine / ReportingAggregator (rx-engine)                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                     rx-db (THIS CRATE)                        │  │
//! │  │                                                               │  │
//! │  │   ┌──────────────┐   ┌────────────────┐   ┌───────────────┐  │  │
//! │  │   │   Database   │   │  Repositories  │   │  Migrations   │  │  │
//! │  │   │  (pool.rs)   │   │ (medicine.rs,  │   │  (embedded)   │  │  │
//! │  │   │              │◄──│  prescription, │   │ 001_init.sql  │  │  │
//! │  │   │  SqlitePool  │   │  bill)         │   │               │  │  │
//! │  │   └──────────────┘   └────────────────┘   └───────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │                      SQLite Database (WAL)                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rx_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/pharmacy.db")).await?;
//! let catalog = db.medicines().search("paracetamol", 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::medicine::MedicineRepository;
pub use repository::prescription::PrescriptionRepository;
