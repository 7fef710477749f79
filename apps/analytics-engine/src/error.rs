//! Error types for the analytics engine.
//!
//! The engine is best-effort by design: data anomalies degrade to advisories
//! and defined defaults instead of failing the surrounding view. The only
//! fatal error a caller can see is [`ConfigError`], raised by
//! [`crate::config::AnalyticsConfig::validate`] before any computation runs.
//! [`LedgerError`] is the per-record classification the normalizer attaches
//! to skipped ledger entries; it never escapes the engine boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a raw ledger record was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerError {
    /// No alias in the instrument group resolved to a usable identifier.
    #[error("no resolvable instrument identifier")]
    MissingInstrument,

    /// The record is not a JSON object and cannot carry named fields.
    #[error("record is not an object")]
    NotAnObject,

    /// No alias in the side group was present; the record is a no-op and is
    /// never offered to downstream matching.
    #[error("missing trade side")]
    MissingSide,

    /// A side field was present but its value is not a recognized token.
    #[error("unrecognized trade side `{token}`")]
    UnrecognizedSide {
        /// The offending side token.
        token: String,
    },

    /// A timestamp field was present but could not be parsed.
    #[error("unparseable timestamp `{value}`")]
    BadTimestamp {
        /// The offending timestamp value.
        value: String,
    },

    /// Quantity resolved to zero or a negative number.
    #[error("non-positive quantity")]
    NonPositiveQuantity,
}

/// Invalid engine configuration.
///
/// Raised by `AnalyticsConfig::validate()`; the engine refuses to run with a
/// configuration that would make its defaults meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `assumed_trading_days` must be at least 1.
    #[error("assumed_trading_days must be at least 1, got {0}")]
    ZeroAssumedTradingDays(u32),

    /// Position estimator bounds are inverted.
    #[error("position estimator bounds inverted: min {min} > max {max}")]
    InvertedEstimatorBounds {
        /// Configured minimum position count.
        min: u32,
        /// Configured maximum position count.
        max: u32,
    },

    /// Position estimator percentage step must be positive.
    #[error("pct_per_position must be positive, got {0}")]
    NonPositiveEstimatorStep(rust_decimal::Decimal),

    /// A heuristic proxy factor is negative.
    #[error("proxy factor `{name}` must be non-negative, got {value}")]
    NegativeProxyFactor {
        /// Name of the offending factor.
        name: &'static str,
        /// The configured value.
        value: rust_decimal::Decimal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        assert_eq!(
            LedgerError::MissingInstrument.to_string(),
            "no resolvable instrument identifier"
        );
        assert_eq!(
            LedgerError::UnrecognizedSide {
                token: "HOLD".to_string()
            }
            .to_string(),
            "unrecognized trade side `HOLD`"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvertedEstimatorBounds { min: 5, max: 2 };
        assert_eq!(
            err.to_string(),
            "position estimator bounds inverted: min 5 > max 2"
        );
    }

    #[test]
    fn test_ledger_error_serializes_with_tag() {
        let json = serde_json::to_value(LedgerError::MissingSide).unwrap();
        assert_eq!(json["reason"], "MISSING_SIDE");
    }
}
