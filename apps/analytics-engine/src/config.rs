//! Engine configuration types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Position-count fallback estimator configuration.
///
/// Used only when the trade ledger is wholly absent and position counts must
/// be estimated from portfolio-value volatility alone (a lower-confidence
/// estimate, flagged via advisory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEstimatorConfig {
    /// Lower bound of the estimated position count.
    pub min_positions: u32,
    /// Upper bound of the estimated position count.
    pub max_positions: u32,
    /// Daily-return standard deviation (in percentage points) attributed to
    /// each concurrently held position.
    pub pct_per_position: Decimal,
}

impl Default for PositionEstimatorConfig {
    fn default() -> Self {
        Self {
            min_positions: 1,
            max_positions: 10,
            pct_per_position: Decimal::new(5, 1), // 0.5 pct points per position
        }
    }
}

/// Heuristic proxy factors for monthly buckets.
///
/// When true intraday series are unavailable, monthly volatility and
/// drawdown are approximated from the bucket's return magnitude. These
/// estimates are flagged in [`crate::aggregate::MonthlyBucket`] and must not
/// be confused with the precise drawdown scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFactorConfig {
    /// Estimated volatility as a fraction of the absolute monthly return.
    pub volatility_factor: Decimal,
    /// Estimated max drawdown magnitude as a fraction of the absolute
    /// monthly return.
    pub drawdown_factor: Decimal,
}

impl Default for ProxyFactorConfig {
    fn default() -> Self {
        Self {
            volatility_factor: Decimal::new(5, 1), // 0.5
            drawdown_factor: Decimal::new(4, 1),   // 0.4
        }
    }
}

/// Top-level analytics engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Trading days assumed for a month with no trade data.
    pub assumed_trading_days: u32,
    /// Position-count fallback estimator settings.
    pub estimator: PositionEstimatorConfig,
    /// Monthly bucket heuristic proxy factors.
    pub proxies: ProxyFactorConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            assumed_trading_days: 20,
            estimator: PositionEstimatorConfig::default(),
            proxies: ProxyFactorConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any setting would make the engine's
    /// defaults meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assumed_trading_days == 0 {
            return Err(ConfigError::ZeroAssumedTradingDays(
                self.assumed_trading_days,
            ));
        }
        if self.estimator.min_positions > self.estimator.max_positions {
            return Err(ConfigError::InvertedEstimatorBounds {
                min: self.estimator.min_positions,
                max: self.estimator.max_positions,
            });
        }
        if self.estimator.pct_per_position <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveEstimatorStep(
                self.estimator.pct_per_position,
            ));
        }
        if self.proxies.volatility_factor < Decimal::ZERO {
            return Err(ConfigError::NegativeProxyFactor {
                name: "volatility_factor",
                value: self.proxies.volatility_factor,
            });
        }
        if self.proxies.drawdown_factor < Decimal::ZERO {
            return Err(ConfigError::NegativeProxyFactor {
                name: "drawdown_factor",
                value: self.proxies.drawdown_factor,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_trading_days_rejected() {
        let config = AnalyticsConfig {
            assumed_trading_days: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroAssumedTradingDays(0))
        );
    }

    #[test]
    fn test_inverted_estimator_bounds_rejected() {
        let mut config = AnalyticsConfig::default();
        config.estimator.min_positions = 8;
        config.estimator.max_positions = 3;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedEstimatorBounds { min: 8, max: 3 })
        );
    }

    #[test]
    fn test_non_positive_estimator_step_rejected() {
        let mut config = AnalyticsConfig::default();
        config.estimator.pct_per_position = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_proxy_factor_rejected() {
        let mut config = AnalyticsConfig::default();
        config.proxies.drawdown_factor = dec!(-0.1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeProxyFactor {
                name: "drawdown_factor",
                ..
            })
        ));
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = AnalyticsConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalyticsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.assumed_trading_days, 20);
        assert_eq!(back.proxies.volatility_factor, dec!(0.5));
    }
}
