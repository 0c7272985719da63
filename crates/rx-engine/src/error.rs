//! # Engine Error Type
//!
//! The caller-facing error taxonomy for fulfillment, payment, and reporting
//! operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Error Flow in the Rx Engine                         │
//! │                                                                     │
//! │  ValidationError (rx-core) ──┐                                      │
//! │                              ├──► EngineError ──► caller            │
//! │  DbError (rx-db) ────────────┘                                      │
//! │                                                                     │
//! │  The one special mapping: a UNIQUE violation on                     │
//! │  bills.prescription_id during a fulfillment insert IS the           │
//! │  double-bill race, surfaced as AlreadyBilled at the insert site.    │
//! │  Every other storage failure is Storage(..), which callers treat    │
//! │  as "unknown outcome": check for an existing bill, then retry.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All variants are terminal; the engine never retries on the caller's
//! behalf.

use serde::Serialize;
use thiserror::Error;

use rx_core::{StockShortage, ValidationError};
use rx_db::DbError;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Prescription, medicine, or bill id could not be resolved.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The prescription already has a bill. Bill existence is the
    /// fulfillment marker, so this also answers an unknown-outcome retry:
    /// the earlier attempt succeeded.
    #[error("Prescription already billed: {prescription_id}")]
    AlreadyBilled { prescription_id: String },

    /// The caller-supplied patient does not own the prescription.
    #[error("Patient {patient_id} does not own prescription {prescription_id}")]
    PatientMismatch {
        prescription_id: String,
        patient_id: String,
    },

    /// One or more lines cannot be fully satisfied. Nothing was decremented
    /// and no bill was created; `shortages` carries required vs available
    /// per failing line so the caller can re-offer substitutes.
    #[error("Insufficient stock for {} prescription line(s)", .shortages.len())]
    InsufficientStock { shortages: Vec<StockShortage> },

    /// Malformed caller input (discount percent out of range, bad quantity,
    /// unsupported payment transition).
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Transient storage failure. The fulfillment state is recoverable by
    /// re-running the operation against the same prescription.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for client errors (the 4xx-equivalents): bad requests that will
    /// fail the same way on retry. Storage errors are the only server-side
    /// kind.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Storage(_))
    }

    /// Machine-readable error kind for API layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyBilled { .. } => ErrorKind::AlreadyBilled,
            EngineError::PatientMismatch { .. } => ErrorKind::PatientMismatch,
            EngineError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    AlreadyBilled,
    PatientMismatch,
    InsufficientStock,
    InvalidInput,
    Storage,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
