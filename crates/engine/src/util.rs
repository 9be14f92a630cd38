//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{EngineError, ResultEngine};

/// Parse a decimal stored as text and return a labeled error on failure.
pub(crate) fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|_| EngineError::InvalidState(format!("invalid {label}: {value}")))
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_are_parsed_from_storage_text() {
        assert_eq!(parse_decimal("1.25", "price").unwrap(), Decimal::new(125, 2));
        assert_eq!(parse_decimal(" 7 ", "weight").unwrap(), Decimal::new(7, 0));
        assert!(matches!(
            parse_decimal("abc", "price"),
            Err(EngineError::InvalidState(_))
        ));
    }

    #[test]
    fn blank_text_is_rejected_or_dropped() {
        assert!(normalize_required_text("  ", "reason").is_err());
        assert_eq!(normalize_required_text(" ok ", "reason").unwrap(), "ok");
        assert_eq!(normalize_optional_text(Some("   ")), None);
        assert_eq!(normalize_optional_text(Some(" x ")), Some("x".to_string()));
    }
}
