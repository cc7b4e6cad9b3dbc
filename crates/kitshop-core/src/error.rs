//! # Error Types
//!
//! Domain-specific error types for kitshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kitshop-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kitshop-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  shop-api errors (in app)                                              │
//! │  └── ApiError         - What HTTP clients see (JSON + status)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product ID, phone, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to exactly one HTTP status in shop-api

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product referenced by a sale line does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product is out of stock or has fewer units than requested.
    ///
    /// ## User Workflow
    /// ```text
    /// WhatsApp order: 3 × "Robotics Starter Kit"
    ///      │
    ///      ▼
    /// Check stock: stock_quantity=2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Robotics Starter Kit", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Admin sees: "Insufficient stock for Robotics Starter Kit"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// No bonus ledger row matches the phone number or name.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Redemption asks for more points than the customer has available.
    #[error("Insufficient bonuses: available {available}, requested {requested}")]
    InsufficientBonuses { available: i64, requested: i64 },

    /// Sale total does not equal the sum of its line totals.
    #[error("Sale total {actual} does not match item totals {expected}")]
    InvalidSaleTotal { expected: i64, actual: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Every variant names the offending field so the API can report it.
#[derive(Debug, Error)]
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

    /// Invalid format (e.g., phone number, UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Returns the name of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Robotics Starter Kit".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Robotics Starter Kit: available 2, requested 3"
        );

        let err = CoreError::InsufficientBonuses {
            available: 100,
            requested: 150,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient bonuses: available 100, requested 150"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");
        assert_eq!(err.field(), "items");

        let err = ValidationError::MustBePositive {
            field: "bonusesToDeduct".to_string(),
        };
        assert_eq!(err.to_string(), "bonusesToDeduct must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customerPhone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
