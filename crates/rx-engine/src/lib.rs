//! # rx-engine: Fulfillment, Payment Lifecycle & Reporting
//!
//! The service layer of the pharmacy engine: the only component that turns
//! prescriptions into dispensed stock and immutable bills.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Pharmacy Fulfillment Flow                        │
//! │                                                                     │
//! │  caller ──► FulfillmentEngine::preview_availability (read-only)     │
//! │                     │                                               │
//! │                     ▼                                               │
//! │          FulfillmentEngine::create_bill / quick_process             │
//! │          (one transaction: conditional stock decrements,            │
//! │           bill insert, administration status flip)                  │
//! │                     │                                               │
//! │                     ▼                                               │
//! │          PaymentWorkflow::update_payment_status                     │
//! │          (pending → paid → refunded; idempotent re-submits)         │
//! │                     │                                               │
//! │                     ▼                                               │
//! │          ReportingAggregator::sales_report / inventory_report       │
//! │          (read-only rollups for the dashboards)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants This Crate Protects
//!
//! - **No oversell**: concurrent fulfillments can never decrement a
//!   medicine below zero; the per-line conditional update is the guard.
//! - **No double-bill**: at most one bill per prescription; the UNIQUE
//!   constraint on `bills.prescription_id` is the guard.
//! - **All-or-nothing**: a fulfillment either publishes bill, decrements,
//!   and administration flips together, or leaves no trace.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fulfillment;
pub mod payment;
pub mod reporting;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult, ErrorKind};
pub use fulfillment::{CreateBillRequest, FulfillmentEngine};
pub use payment::PaymentWorkflow;
pub use reporting::{
    DispensedSummary, InventorySummary, ReportWindow, ReportingAggregator, SalesSummary,
};
