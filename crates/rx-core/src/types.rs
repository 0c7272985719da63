//! # Domain Types
//!
//! Core domain types for the pharmacy fulfillment engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────┐   │
//! │  │    Medicine     │  │   Prescription   │  │       Bill       │   │
//! │  │  ─────────────  │  │  ──────────────  │  │  ──────────────  │   │
//! │  │  id (UUID)      │  │  id (UUID)       │  │  id (UUID)       │   │
//! │  │  name           │  │  patient_id      │  │  prescription_id │   │
//! │  │  category       │  │  doctor_id       │  │  original_cents  │   │
//! │  │  unit_price     │  │  PrescriptionLine│  │  BillItem (snap) │   │
//! │  │  stock_quantity │  │    × N (ordered) │  │    × N (frozen)  │   │
//! │  └─────────────────┘  └──────────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID v4 `id` used for relations; human-facing fields
//! (medicine name, patient reference) are data, never keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Actor
// =============================================================================

/// An already-authenticated actor performing an operation.
///
/// Authentication and authorization live outside this engine; the actor is
/// carried only for audit fields (`generated_by`, `administered_by`,
/// `adjusted_by`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// A medicine in the pharmacy catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to pharmacists and on bills.
    pub name: String,

    /// Category, used for substitute suggestions (e.g. "analgesic").
    pub category: String,

    /// Dispensing unit (e.g. "tablet", "bottle").
    pub unit: String,

    /// Price per unit in cents.
    pub unit_price_cents: i64,

    /// Current stock level. Never negative.
    pub stock_quantity: i64,

    /// Whether the medicine is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Checks whether the requested quantity can be dispensed from stock.
    #[inline]
    pub fn covers(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// Stock-level classification used by the inventory report.
///
/// Buckets: Critical < 10, Low 10-49, Normal 50-99, High >= 100 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Critical,
    Low,
    Normal,
    High,
}

impl StockLevel {
    /// Classifies a unit count into its bucket.
    pub const fn from_units(units: i64) -> Self {
        match units {
            i64::MIN..=9 => StockLevel::Critical,
            10..=49 => StockLevel::Low,
            50..=99 => StockLevel::Normal,
            _ => StockLevel::High,
        }
    }

    /// All buckets in ascending stock order, for report assembly.
    pub const ALL: [StockLevel; 4] = [
        StockLevel::Critical,
        StockLevel::Low,
        StockLevel::Normal,
        StockLevel::High,
    ];
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Administrative stock operation (restock, manual correction).
///
/// Shares the non-negative-stock invariant with fulfillment decrements but
/// runs outside any fulfillment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustmentOp {
    /// Increase stock by the given quantity.
    Add,
    /// Decrease stock by the given quantity; rejected if it would go negative.
    Subtract,
    /// Set stock to the given quantity.
    Set,
}

/// Audit record of an administrative stock change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAdjustment {
    pub id: String,
    pub medicine_id: String,
    pub op: StockAdjustmentOp,
    pub quantity: i64,
    /// Stock level after the adjustment was applied.
    pub resulting_stock: i64,
    pub reason: String,
    pub adjusted_by: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Prescription
// =============================================================================

/// Administration status of one prescription line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Prescribed but not yet dispensed.
    #[default]
    Pending,
    /// Dispensed to the patient by a fulfillment. Never reverts.
    Administered,
}

/// A prescription header. Created by the doctor workflow; this engine only
/// reads it and flips line status during fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One medicine entry within a prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PrescriptionLine {
    pub id: String,
    pub prescription_id: String,

    /// Order within the prescription, starting at 0.
    pub position: i64,

    /// Medicine name as written by the doctor.
    pub medicine_name: String,

    /// Explicit catalog reference, when the prescribing UI resolved one.
    /// Preferred over name matching during fulfillment.
    pub medicine_id: Option<String>,

    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,

    /// Units to dispense. Defaults to 1.
    pub quantity: i64,

    pub status: LineStatus,
    pub administered_at: Option<DateTime<Utc>>,
    pub administered_by: Option<String>,
}

// =============================================================================
// Bill
// =============================================================================

/// Payment status of a bill.
///
/// One-way machine: pending -> paid -> refunded. Re-submitting the current
/// state is a no-op; paid never silently reverts to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

/// How a bill was settled. Gateway integration is out of scope; card/UPI
/// settlements are recorded by reference only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
}

/// An immutable bill created by the fulfillment engine.
///
/// Only the payment-status fields change after creation. The row's existence
/// for a prescription is itself the "already fulfilled" marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    pub prescription_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,

    /// Sum of line totals before discount.
    pub original_cents: i64,

    /// Flat discount percentage, 0-100.
    pub discount_percent: i64,

    /// Discount in cents, rounded half-up from the percentage.
    pub discount_cents: i64,

    /// original_cents - discount_cents, always.
    pub final_cents: i64,

    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    /// Actor who ran the fulfillment.
    pub generated_by: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Returns the pre-discount amount as Money.
    #[inline]
    pub fn original_amount(&self) -> Money {
        Money::from_cents(self.original_cents)
    }

    /// Returns the payable amount as Money.
    #[inline]
    pub fn final_amount(&self) -> Money {
        Money::from_cents(self.final_cents)
    }
}

/// A line item on a bill.
/// Uses the snapshot pattern to freeze catalog data at fulfillment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub medicine_id: String,

    /// Medicine name at fulfillment time (frozen).
    pub name_snapshot: String,

    /// Dispensing unit at fulfillment time (frozen).
    pub unit_snapshot: String,

    /// Unit price in cents at fulfillment time (frozen).
    pub unit_price_cents: i64,

    pub quantity: i64,

    /// unit_price_cents × quantity.
    pub line_total_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl BillItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Stock Shortage
// =============================================================================

/// Per-line shortfall detail carried by an insufficient-stock failure, with
/// enough information for the caller to re-offer substitutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    /// Medicine name as requested on the prescription line.
    pub medicine_name: String,
    pub requested: i64,
    /// Units actually available; 0 when the line had no catalog match.
    pub available: i64,
    /// False when no catalog entry matched the line at all.
    pub matched: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
