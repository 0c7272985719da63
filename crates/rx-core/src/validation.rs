//! # Validation Module
//!
//! Business rule validation for fulfillment and catalog input.
//!
//! ## Validation Strategy
//! Validation runs in layers: the engine validates caller input with these
//! functions before touching storage, and the database schema backs the same
//! rules with CHECK and UNIQUE constraints. Multiple layers catch different
//! mistakes.
//!
//! ## Usage
//! ```rust
//! use rx_core::validation::{validate_discount_percent, validate_quantity};
//!
//! validate_discount_percent(10).unwrap();
//! validate_quantity(5).unwrap();
//! assert!(validate_discount_percent(101).is_err());
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a flat discount percentage.
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_discount_percent(percent: u32) -> ValidationResult<()> {
    if percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "discountPercent".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a dispense quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
pub fn validate_unit_price(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unitPrice".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a medicine name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 200 characters
pub fn validate_medicine_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a medicine category.
pub fn validate_category(category: &str) -> ValidationResult<()> {
    let category = category.trim();

    if category.is_empty() {
        return Err(ValidationError::Required {
            field: "category".to_string(),
        });
    }

    if category.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates an adjustment reason string.
///
/// Every administrative stock change must say why.
pub fn validate_adjustment_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_percent_bounds() {
        assert!(validate_discount_percent(0).is_ok());
        assert!(validate_discount_percent(50).is_ok());
        assert!(validate_discount_percent(100).is_ok());
        assert!(validate_discount_percent(101).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_unit_price() {
        assert!(validate_unit_price(0).is_ok());
        assert!(validate_unit_price(199).is_ok());
        assert!(validate_unit_price(-1).is_err());
    }

    #[test]
    fn test_medicine_name() {
        assert!(validate_medicine_name("Paracetamol 500mg").is_ok());
        assert!(validate_medicine_name("").is_err());
        assert!(validate_medicine_name("   ").is_err());
        assert!(validate_medicine_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_adjustment_reason() {
        assert!(validate_adjustment_reason("monthly restock").is_ok());
        assert!(validate_adjustment_reason(" ").is_err());
    }
}
