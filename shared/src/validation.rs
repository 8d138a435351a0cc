//! Validation rules for the Warehouse Revision Management Platform
//!
//! Business limits mirror the external accounting source: quantities are
//! 12,2 decimals and counted stock must carry an expiry date inside the
//! allowed window.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Earliest accepted expiry year for counted stock
pub const MIN_EXPIRY_YEAR: i32 = 2025;

/// Latest accepted expiry year for counted stock
pub const MAX_EXPIRY_YEAR: i32 = 2050;

/// Maximum length of a batch series string
pub const MAX_SERIES_LEN: usize = 100;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a counted quantity (revizor input): strictly positive
pub fn validate_count_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate an expected-ledger quantity: non-negative
pub fn validate_ledger_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Expected quantity cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Date Validations
// ============================================================================

/// Validate an expiry date against the allowed window (2025..=2050)
pub fn validate_expiry_date(date: NaiveDate) -> Result<(), &'static str> {
    let year = date.year();
    if year < MIN_EXPIRY_YEAR || year > MAX_EXPIRY_YEAR {
        return Err("Expiry date must fall between 2025 and 2050");
    }
    Ok(())
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate a product code (unique key from the accounting system)
pub fn validate_product_code(code: &str) -> Result<(), &'static str> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Product code cannot be empty");
    }
    if code.len() > 50 {
        return Err("Product code must be at most 50 characters");
    }
    Ok(())
}

/// Validate a product name
pub fn validate_product_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Product name cannot be empty");
    }
    if name.chars().count() > 500 {
        return Err("Product name must be at most 500 characters");
    }
    Ok(())
}

/// Validate a batch series string (empty is allowed)
pub fn validate_series(series: &str) -> Result<(), &'static str> {
    if series.chars().count() > MAX_SERIES_LEN {
        return Err("Series must be at most 100 characters");
    }
    Ok(())
}

/// Normalize an optional series to its stored form (trimmed, empty for none)
pub fn normalize_series(series: Option<&str>) -> String {
    series.map(|s| s.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========================================================================
    // Quantity Validation Tests
    // ========================================================================

    #[test]
    fn test_count_quantity_positive() {
        assert!(validate_count_quantity(dec("0.01")).is_ok());
        assert!(validate_count_quantity(dec("150")).is_ok());
    }

    #[test]
    fn test_count_quantity_rejects_zero_and_negative() {
        assert!(validate_count_quantity(Decimal::ZERO).is_err());
        assert!(validate_count_quantity(dec("-5")).is_err());
    }

    #[test]
    fn test_ledger_quantity_allows_zero() {
        assert!(validate_ledger_quantity(Decimal::ZERO).is_ok());
        assert!(validate_ledger_quantity(dec("10.50")).is_ok());
    }

    #[test]
    fn test_ledger_quantity_rejects_negative() {
        assert!(validate_ledger_quantity(dec("-0.01")).is_err());
    }

    // ========================================================================
    // Date Validation Tests
    // ========================================================================

    #[test]
    fn test_expiry_date_window() {
        assert!(validate_expiry_date(date(2025, 1, 1)).is_ok());
        assert!(validate_expiry_date(date(2030, 6, 15)).is_ok());
        assert!(validate_expiry_date(date(2050, 12, 31)).is_ok());
    }

    #[test]
    fn test_expiry_date_outside_window() {
        assert!(validate_expiry_date(date(2024, 12, 31)).is_err());
        assert!(validate_expiry_date(date(2051, 1, 1)).is_err());
        assert!(validate_expiry_date(date(1999, 1, 1)).is_err());
    }

    // ========================================================================
    // Catalog Validation Tests
    // ========================================================================

    #[test]
    fn test_product_code() {
        assert!(validate_product_code("10457").is_ok());
        assert!(validate_product_code("A-204/B").is_ok());
        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_product_name() {
        assert!(validate_product_name("Парацетамол 500мг").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"н".repeat(501)).is_err());
    }

    #[test]
    fn test_series() {
        assert!(validate_series("").is_ok());
        assert!(validate_series("LOT-2025-117").is_ok());
        assert!(validate_series(&"s".repeat(101)).is_err());
    }

    #[test]
    fn test_normalize_series() {
        assert_eq!(normalize_series(None), "");
        assert_eq!(normalize_series(Some("  A17 ")), "A17");
        assert_eq!(normalize_series(Some("")), "");
    }
}
