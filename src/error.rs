//! Error handling for the Tesouro engine
//!
//! Domain failures are typed so callers can tell a missing bond apart from an
//! empty portfolio. The binary wraps them in `anyhow` for context chaining.

use chrono::NaiveDate;
use thiserror::Error;

/// Core error types for valuation, quota and cost operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TesouroError {
    #[error("unknown product type: {0}")]
    UnknownProductType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("portfolio has no titles")]
    EmptyPortfolio,

    #[error("no valuation data: {0}")]
    NoValuationData(String),

    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("feed error: {0}")]
    Feed(String),
}

impl TesouroError {
    pub fn bond_not_found(product: &str, maturity: NaiveDate) -> Self {
        TesouroError::NotFound(format!("no feed rows for {} maturing {}", product, maturity))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, TesouroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = TesouroError::UnknownProductType("Tesouro Bitcoin".to_string());
        assert_eq!(err.to_string(), "unknown product type: Tesouro Bitcoin");
    }

    #[test]
    fn test_not_found_names_the_bond() {
        let maturity = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let err = TesouroError::bond_not_found("Tesouro Selic", maturity);
        assert_eq!(
            err.to_string(),
            "not found: no feed rows for Tesouro Selic maturing 2025-03-01"
        );
    }

    #[test]
    fn test_anyhow_context_chains_errors() {
        use anyhow::Context;
        let result: anyhow::Result<()> =
            Err(TesouroError::EmptyPortfolio).context("failed to compose portfolio");
        match result {
            Err(e) => {
                assert!(e.to_string().contains("failed to compose portfolio"));
                assert!(format!("{:?}", e).contains("portfolio has no titles"));
            }
            Ok(_) => panic!("expected error"),
        }
    }

    #[test]
    fn test_insufficient_data_variant() {
        let err = TesouroError::InsufficientData {
            required: 2,
            actual: 1,
        };
        assert!(err.to_string().starts_with("insufficient data"));
    }
}
