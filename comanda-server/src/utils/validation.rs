//! Input validation helpers
//!
//! Centralized text length constants and validation functions. redb has no
//! built-in length enforcement, so limits live here.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product, category, item name.
pub const MAX_NAME_LEN: usize = 200;

/// Table labels are short free text ("5", "Patio 2").
pub const MAX_TABLE_LABEL_LEN: usize = 64;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty (after trimming) and within
/// the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that a monetary amount is strictly positive.
pub fn validate_positive_amount(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Validate that a monetary amount is non-negative (payment splits may be 0).
pub fn validate_non_negative_amount(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!("{field} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_text() {
        assert!(validate_required_text("  ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text("Coke", "name", MAX_NAME_LEN).is_ok());
    }

    #[test]
    fn rejects_overlong_text() {
        let long = "x".repeat(MAX_TABLE_LABEL_LEN + 1);
        assert!(validate_required_text(&long, "table", MAX_TABLE_LABEL_LEN).is_err());
    }

    #[test]
    fn amount_checks() {
        assert!(validate_positive_amount(0.0, "price").is_err());
        assert!(validate_positive_amount(-1.0, "price").is_err());
        assert!(validate_positive_amount(f64::NAN, "price").is_err());
        assert!(validate_positive_amount(2.5, "price").is_ok());
        assert!(validate_non_negative_amount(0.0, "cash").is_ok());
        assert!(validate_non_negative_amount(-0.01, "cash").is_err());
    }
}
