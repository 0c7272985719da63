//! # Error Types
//!
//! Validation error types for rx-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  rx-core errors (this file)                                         │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  rx-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  rx-engine errors (separate crate)                                  │
//! │  └── EngineError      - Caller-facing fulfillment taxonomy          │
//! │                                                                     │
//! │  Flow: ValidationError → EngineError → caller                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, bounds)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements; they are raised
/// before any business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format or unsupported value.
    #[error("{field} has invalid value: {reason}")]
    InvalidValue { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "medicineName".to_string(),
        };
        assert_eq!(err.to_string(), "medicineName is required");

        let err = ValidationError::OutOfRange {
            field: "discountPercent".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "discountPercent must be between 0 and 100");
    }
}
