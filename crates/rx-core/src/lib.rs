//! # rx-core: Pure Business Logic for the Rx Engine
//!
//! This crate is the heart of the pharmacy fulfillment engine. It contains
//! all business rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Rx Engine Architecture                         │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                rx-engine (Fulfillment / Reporting)            │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                 ★ rx-core (THIS CRATE) ★                      │  │
//! │  │                                                               │  │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌────────────┐  │  │
//! │  │   │  types   │ │  money   │ │ availability │ │ validation │  │  │
//! │  │   │ Medicine │ │  Money   │ │  matching,   │ │   rules    │  │  │
//! │  │   │   Bill   │ │ rounding │ │ substitutes  │ │   checks   │  │  │
//! │  │   └──────────┘ └──────────┘ └──────────────┘ └────────────┘  │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                    rx-db (Database Layer)                     │  │
//! │  │             SQLite queries, migrations, repositories          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, Prescription, Bill, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`availability`] - Catalog matching and substitute suggestions
//! - [`error`] - Validation error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, every time
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use availability::{AvailabilityReport, LineAvailability};
pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default quantity for a prescription line when the doctor leaves it blank.
pub const DEFAULT_LINE_QUANTITY: i64 = 1;

/// Maximum quantity of a single medicine on one prescription line.
///
/// ## Business Reason
/// Prevents accidental over-dispensing (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum number of substitute suggestions returned for an unavailable line.
pub const MAX_SUBSTITUTES: usize = 3;
