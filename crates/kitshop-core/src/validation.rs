//! # Validation Module
//!
//! Input validation for the bonus subsystem's HTTP requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin form / storefront (TypeScript)                         │
//! │  └── Phone input mask, basic required checks                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: shop-api handler (Rust)                                      │
//! │  ├── JSON deserialization                                              │
//! │  └── THIS MODULE: field rules (phone shape, quantities, amounts)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(sale_id) on pending bonuses                                │
//! │  ├── UNIQUE(phone_digits) on the ledger                                │
//! │  └── CHECK(available = total - used)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are the JSON names the client sent
//! (`customerPhone`, `bonusesToDeduct`, ...).
//!
//! ## Usage
//! ```rust
//! use kitshop_core::validation::{validate_phone, validate_quantity};
//!
//! let phone = validate_phone("customerPhone", "+7 (777) 123-12-12").unwrap();
//! assert_eq!(phone.digits(), "77771231212");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::phone::PhoneNumber;
use crate::{MAX_ITEM_QUANTITY, MAX_PAGE, MAX_PAGE_SIZE, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest customer name accepted.
pub const MAX_FULL_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a phone in canonical `+7 (XXX) XXX-XX-XX` form.
pub fn validate_phone(field: &str, raw: &str) -> ValidationResult<PhoneNumber> {
    PhoneNumber::parse(field, raw)
}

/// Normalizes an optional customer name.
///
/// Blank names become `None`; names longer than [`MAX_FULL_NAME_LEN`]
/// characters are rejected.
pub fn validate_full_name(field: &str, name: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_FULL_NAME_LEN,
        });
    }

    Ok(Some(name.to_string()))
}

/// Validates a free-text search term (name lookups).
///
/// Returns the trimmed term.
pub fn validate_search_term(field: &str, term: &str) -> ValidationResult<String> {
    let term = term.trim();

    if term.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if term.chars().count() > MAX_FULL_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_FULL_NAME_LEN,
        });
    }

    Ok(term.to_string())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use kitshop_core::validation::validate_uuid;
///
/// assert!(validate_uuid("productId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("productId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of line items in a sale.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates an admin credit amount. Zero is allowed.
pub fn validate_bonus_credit(amount: i64) -> ValidationResult<()> {
    if amount < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "bonusesToAdd".to_string(),
        });
    }

    Ok(())
}

/// Validates a redemption amount. Must be strictly positive.
pub fn validate_bonus_deduction(amount: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "bonusesToDeduct".to_string(),
        });
    }

    Ok(())
}

/// Validates an accrual rate in basis points (0 to 10000).
pub fn validate_accrual_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "accrual_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates pagination parameters.
pub fn validate_page(page: i64, limit: i64) -> ValidationResult<()> {
    if page < 1 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if page > MAX_PAGE {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: MAX_PAGE,
        });
    }

    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE,
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
    fn test_validate_phone() {
        assert!(validate_phone("phoneNumber", "+7 (777) 123-12-12").is_ok());
        assert!(validate_phone("phoneNumber", "87771231212").is_err());
        assert!(validate_phone("phoneNumber", "").is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert_eq!(validate_full_name("fullName", None).unwrap(), None);
        assert_eq!(validate_full_name("fullName", Some("   ")).unwrap(), None);
        assert_eq!(
            validate_full_name("fullName", Some(" Айгерим Садыкова ")).unwrap(),
            Some("Айгерим Садыкова".to_string())
        );
        assert!(validate_full_name("fullName", Some(&"я".repeat(201))).is_err());
    }

    #[test]
    fn test_validate_search_term() {
        assert_eq!(validate_search_term("name", " айг ").unwrap(), "айг");
        assert!(validate_search_term("name", "  ").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(matches!(
            validate_item_count(0),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_item_count(101).is_err());
    }

    #[test]
    fn test_validate_bonus_amounts() {
        assert!(validate_bonus_credit(0).is_ok());
        assert!(validate_bonus_credit(-1).is_err());

        assert!(validate_bonus_deduction(1).is_ok());
        assert!(validate_bonus_deduction(0).is_err());
        assert!(validate_bonus_deduction(-5).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("productId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("productId", "").is_err());
        assert!(validate_uuid("productId", "123").is_err());
    }

    #[test]
    fn test_validate_accrual_bps() {
        assert!(validate_accrual_bps(0).is_ok());
        assert!(validate_accrual_bps(300).is_ok());
        assert!(validate_accrual_bps(10_000).is_ok());
        assert!(validate_accrual_bps(10_001).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1, 20).is_ok());
        assert!(validate_page(0, 20).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, 101).is_err());

        assert!(validate_page(MAX_PAGE, MAX_PAGE_SIZE).is_ok());
        let err = validate_page(i64::MAX, 20).unwrap_err();
        assert_eq!(err.field(), "page");
        assert!(matches!(err, ValidationError::OutOfRange { max: MAX_PAGE, .. }));
    }
}
