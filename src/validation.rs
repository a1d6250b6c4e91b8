//! Input validation and sanitization module
//!
//! This module provides centralized input validation for:
//! - User registration input (names, phone numbers, pincodes)
//! - Financial data (minor-unit amounts, basis-point rates)
//! - Ledger keys (service types, transaction ids)

use crate::ledger::money::{BPS_DENOMINATOR, MINOR_PER_MAJOR};

/// Validation result type
pub type ValidationResult = Result<(), String>;

/// Upper bound for a single ledger amount: 10 crore rupees in paise.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000;

/// Validate a full name
/// - Length: 2-100 characters
/// - Allowed: letters, spaces, basic punctuation
pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Name must not be empty".into());
    }

    let len = trimmed.chars().count();
    if !(2..=100).contains(&len) {
        return Err("Name must be 2-100 characters".into());
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c.is_whitespace() || ".-'".contains(c))
    {
        return Err("Name may only contain letters, spaces and .-'".into());
    }

    Ok(())
}

/// Validate phone number (Indian mobile: 10 digits, optional +91/0 prefix)
pub fn validate_phone(phone: &str) -> ValidationResult {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err("Phone number must not be empty".into());
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit() || "+- ".contains(c)) {
        return Err("Phone number contains invalid characters".into());
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = if digits.len() == 12 && digits.starts_with("91") {
        &digits[2..]
    } else if digits.len() == 11 && digits.starts_with('0') {
        &digits[1..]
    } else {
        digits.as_str()
    };

    if local.len() != 10 {
        return Err("Phone number must have 10 digits".into());
    }

    if !matches!(local.chars().next(), Some('6'..='9')) {
        return Err("Phone number must start with 6-9".into());
    }

    Ok(())
}

/// Validate an Indian postal pincode (6 digits, not starting with 0)
pub fn validate_pincode(pincode: &str) -> ValidationResult {
    let trimmed = pincode.trim();

    if trimmed.len() != 6 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err("Pincode must be 6 digits".into());
    }

    if trimmed.starts_with('0') {
        return Err("Pincode must not start with 0".into());
    }

    Ok(())
}

/// Validate monetary amount in minor units
pub fn validate_amount(amount: i64, min: Option<i64>, max: Option<i64>) -> ValidationResult {
    let min_val = min.unwrap_or(0);
    let max_val = max.unwrap_or(MAX_AMOUNT_MINOR);

    if amount < min_val {
        return Err(format!("Amount must be at least {}", format_currency(min_val)));
    }

    if amount > max_val {
        return Err(format!("Amount must be at most {}", format_currency(max_val)));
    }

    Ok(())
}

/// Validate a commission rate expressed in basis points
pub fn validate_bps(label: &str, bps: i64) -> ValidationResult {
    if !(0..=BPS_DENOMINATOR).contains(&bps) {
        return Err(format!("{} must be between 0 and {} bps", label, BPS_DENOMINATOR));
    }
    Ok(())
}

/// Validate a service type key
/// - Length: 2-50 characters
/// - Allowed: lowercase letters, digits, underscore
pub fn validate_service_type(service_type: &str) -> ValidationResult {
    if service_type.is_empty() {
        return Err("Service type must not be empty".into());
    }

    if service_type.len() < 2 || service_type.len() > 50 {
        return Err("Service type must be 2-50 characters".into());
    }

    if !service_type
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err("Service type may only contain lowercase letters, digits and underscore".into());
    }

    Ok(())
}

/// Validate an originating transaction id
pub fn validate_transaction_id(transaction_id: &str) -> ValidationResult {
    if transaction_id.is_empty() {
        return Err("Transaction id must not be empty".into());
    }

    if transaction_id.len() > 100 {
        return Err("Transaction id is too long".into());
    }

    if !transaction_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Transaction id may only contain letters, digits, '-' and '_'".into());
    }

    Ok(())
}

/// Validate free-text notes
pub fn validate_notes(notes: &str) -> ValidationResult {
    if notes.len() > 500 {
        return Err("Notes are too long (max 500 characters)".into());
    }

    Ok(())
}

/// Sanitize string input (remove control characters)
pub fn sanitize_string(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).collect()
}

/// Format minor units as rupees for error messages
pub fn format_currency(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    let per = MINOR_PER_MAJOR as u64;
    format!("{}Rs {}.{:02}", sign, abs / per, abs % per)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_formats() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("09876543210").is_ok());
        assert!(validate_phone("1234567890").is_err());
        assert!(validate_phone("98765").is_err());
        assert!(validate_phone("98765x4321").is_err());
    }

    #[test]
    fn test_pincode() {
        assert!(validate_pincode("560001").is_ok());
        assert!(validate_pincode("060001").is_err());
        assert!(validate_pincode("5600").is_err());
    }

    #[test]
    fn test_service_type() {
        assert!(validate_service_type("recharge").is_ok());
        assert!(validate_service_type("product_sale").is_ok());
        assert!(validate_service_type("Taxi").is_err());
        assert!(validate_service_type("x").is_err());
    }

    #[test]
    fn test_transaction_id() {
        assert!(validate_transaction_id("RCH-2024-0001").is_ok());
        assert!(validate_transaction_id("").is_err());
        assert!(validate_transaction_id("a b").is_err());
    }

    #[test]
    fn test_amount_and_bps() {
        assert!(validate_amount(100, Some(1), None).is_ok());
        assert!(validate_amount(0, Some(1), None).is_err());
        assert!(validate_amount(MAX_AMOUNT_MINOR + 1, None, None).is_err());
        assert!(validate_bps("admin_bps", 10_000).is_ok());
        assert!(validate_bps("admin_bps", -1).is_err());
        assert!(validate_bps("admin_bps", 10_001).is_err());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(100_050), "Rs 1000.50");
        assert_eq!(format_currency(-5), "-Rs 0.05");
    }
}
