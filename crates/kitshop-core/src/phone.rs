//! # Phone Matching
//!
//! Customers type their phone numbers in many shapes. The shop treats two
//! phone strings as the same customer when their digits are identical.
//!
//! ## Matching Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw input               extract_digits        same customer as #1?     │
//! │  ─────────────────────   ──────────────        ────────────────────     │
//! │  +7 (777) 123-12-12      77771231212           (reference)              │
//! │  7 777 123 12 12         77771231212           yes                      │
//! │  +7-777-123-1212         77771231212           yes                      │
//! │  87771231212             87771231212           NO (first digit differs) │
//! │  "n/a"                   ""                    never matches anything   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no country-code canonicalization: `8` and `+7` prefixes are
//! different digits and therefore different customers.
//!
//! Ledger rows created from a lookup store the phone reformatted with
//! [`display_form`] when the digits allow it.
//!
//! The digits are computed when a record is written and stored in an indexed
//! `phone_digits` column, so lookups are indexed equality queries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Shape required by write endpoints. `#` stands for one ASCII digit.
pub const CANONICAL_TEMPLATE: &str = "+7 (###) ###-##-##";

/// Strips every non-digit character and returns the remaining digits verbatim.
///
/// ## Example
/// ```rust
/// use kitshop_core::phone::extract_digits;
///
/// assert_eq!(extract_digits("+7 (777) 123-12-12"), "77771231212");
/// assert_eq!(extract_digits("no phone"), "");
/// ```
pub fn extract_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Returns true if both strings carry the same non-empty digit sequence.
pub fn same_customer(a: &str, b: &str) -> bool {
    let a = extract_digits(a);
    !a.is_empty() && a == extract_digits(b)
}

/// Checks the strict `+7 (XXX) XXX-XX-XX` format.
pub fn is_canonical(raw: &str) -> bool {
    raw.len() == CANONICAL_TEMPLATE.len()
        && raw
            .chars()
            .zip(CANONICAL_TEMPLATE.chars())
            .all(|(c, t)| match t {
                '#' => c.is_ascii_digit(),
                _ => c == t,
            })
}

/// Formats 11 digits starting with `7` as `+7 (XXX) XXX-XX-XX`.
///
/// ## Example
/// ```rust
/// use kitshop_core::phone::format_canonical;
///
/// assert_eq!(format_canonical("77771231212").as_deref(), Some("+7 (777) 123-12-12"));
/// assert_eq!(format_canonical("87771231212"), None);
/// ```
pub fn format_canonical(digits: &str) -> Option<String> {
    let well_formed = digits.len() == 11
        && digits.starts_with('7')
        && digits.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return None;
    }

    Some(format!(
        "+7 ({}) {}-{}-{}",
        &digits[1..4],
        &digits[4..7],
        &digits[7..9],
        &digits[9..11]
    ))
}

/// Display form to store for a phone typed in any format.
///
/// Canonical input is kept as is. Anything that formats canonically is
/// reformatted. Other input is stored trimmed.
pub fn display_form(raw: &str) -> String {
    let raw = raw.trim();
    if is_canonical(raw) {
        return raw.to_string();
    }
    format_canonical(&extract_digits(raw)).unwrap_or_else(|| raw.to_string())
}

/// A phone number that passed the canonical format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    display: String,
    digits: String,
}

impl PhoneNumber {
    /// Parses a canonical phone number.
    ///
    /// ## Arguments
    /// * `field` - request field name reported on failure
    /// * `raw` - the phone as sent by the client
    pub fn parse(field: &str, raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        if !is_canonical(raw) {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "expected +7 (XXX) XXX-XX-XX".to_string(),
            });
        }

        Ok(PhoneNumber {
            display: raw.to_string(),
            digits: extract_digits(raw),
        })
    }

    /// Display form as entered, e.g. `+7 (777) 123-12-12`.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Digits-only matching key, e.g. `77771231212`.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_digits() {
        assert_eq!(extract_digits("+7 (777) 123-12-12"), "77771231212");
        assert_eq!(extract_digits("87771231212"), "87771231212");
        assert_eq!(extract_digits("7 777 123 12 12"), "77771231212");
        assert_eq!(extract_digits(""), "");
        assert_eq!(extract_digits("телефон"), "");
    }

    #[test]
    fn test_matching_is_pure_digit_equality() {
        assert!(same_customer("+7 (777) 123-12-12", "7 777 123 12 12"));
        assert!(same_customer("+7 (777) 123-12-12", "+7-777-123-1212"));
        // No +7/8 equivalence: the digits differ.
        assert!(!same_customer("+7 (777) 123-12-12", "87771231212"));
        assert!(!same_customer("", ""));
        assert!(!same_customer("abc", "---"));
    }

    #[test]
    fn test_is_canonical() {
        assert!(is_canonical("+7 (777) 123-12-12"));
        assert!(!is_canonical("87771231212"));
        assert!(!is_canonical("+7 777 123-12-12"));
        assert!(!is_canonical("+7 (777) 123-12-1"));
        assert!(!is_canonical("+7 (777) 123-12-123"));
        assert!(!is_canonical("+8 (777) 123-12-12"));
        assert!(!is_canonical("+7 (77a) 123-12-12"));
    }

    #[test]
    fn test_format_canonical() {
        let formatted = format_canonical("77015550011").unwrap();
        assert_eq!(formatted, "+7 (701) 555-00-11");
        assert!(is_canonical(&formatted));

        assert_eq!(format_canonical("87015550011"), None);
        assert_eq!(format_canonical("7701555001"), None);
        assert_eq!(format_canonical("770155500111"), None);
        assert_eq!(format_canonical(""), None);
    }

    #[test]
    fn test_display_form() {
        assert_eq!(display_form(" +7 (777) 123-12-12 "), "+7 (777) 123-12-12");
        assert_eq!(display_form("77771231212"), "+7 (777) 123-12-12");
        assert_eq!(display_form("7 777 123 12 12"), "+7 (777) 123-12-12");
        // No +7/8 rewriting; the digits stay the customer's key.
        assert_eq!(display_form(" 87771231212"), "87771231212");
        assert_eq!(display_form("555-12"), "555-12");
    }

    #[test]
    fn test_parse() {
        let phone = PhoneNumber::parse("customerPhone", " +7 (701) 555-00-11 ").unwrap();
        assert_eq!(phone.as_str(), "+7 (701) 555-00-11");
        assert_eq!(phone.digits(), "77015550011");

        let err = PhoneNumber::parse("customerPhone", "8 701 555 00 11").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
        assert_eq!(err.field(), "customerPhone");

        let err = PhoneNumber::parse("phoneNumber", "   ").unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }
}
