//! Risk metric normalization onto a common 0-100 scale.
//!
//! Raw summary ratios arrive in incompatible units: Sharpe-style ratios
//! cluster around low single digits, volatility and drawdown are fractions,
//! win rate is a 0-1 fraction. To compare them side by side (the shell
//! renders them as one radar), each metric class maps onto `[0, 100]`:
//!
//! - *ratio-type* (Sharpe, Sortino, Calmar): `value * 50`, so 2.0 saturates
//! - *volatility-type*: `100 - |value| * 200`, so 50% volatility floors at 0
//! - *drawdown-type*: same shape as volatility-type
//! - *percentage-type* (win rate): `value * 100`
//!
//! Every score clamps to `[0, 100]` regardless of input magnitude, and a
//! missing raw ratio scores 0 rather than erroring: partial reports must
//! still render.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const FIFTY: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
const TWO_HUNDRED: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Normalization policy class of a risk metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricClass {
    /// Risk-adjusted return ratio (Sharpe, Sortino, Calmar).
    Ratio,
    /// Annualized volatility as a fraction; lower is better.
    Volatility,
    /// Maximum drawdown as a (typically negative) fraction; smaller
    /// magnitude is better.
    Drawdown,
    /// A 0-1 fraction rendered directly as a percentage (win rate).
    Percentage,
}

/// Normalize one raw metric value onto the 0-100 scale.
///
/// `None` (missing/undefined upstream) scores 0.
#[must_use]
pub fn normalize_metric(class: MetricClass, value: Option<Decimal>) -> Decimal {
    let Some(value) = value else {
        return Decimal::ZERO;
    };

    // Saturating arithmetic: extreme raw ratios must clamp, never overflow.
    let raw = match class {
        MetricClass::Ratio => value.saturating_mul(FIFTY),
        MetricClass::Volatility | MetricClass::Drawdown => {
            HUNDRED.saturating_sub(value.abs().saturating_mul(TWO_HUNDRED))
        }
        MetricClass::Percentage => value.saturating_mul(HUNDRED),
    };

    raw.clamp(Decimal::ZERO, HUNDRED)
}

/// Externally computed summary statistics, passed through unchanged from
/// the data layer. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRiskSummary {
    /// Sharpe ratio.
    pub sharpe_ratio: Option<Decimal>,
    /// Sortino ratio.
    pub sortino_ratio: Option<Decimal>,
    /// Calmar ratio.
    pub calmar_ratio: Option<Decimal>,
    /// Annualized volatility (fraction, e.g. 0.25 = 25%).
    pub volatility: Option<Decimal>,
    /// Maximum drawdown (fraction, typically negative).
    pub max_drawdown: Option<Decimal>,
    /// Win rate over trading days (0-1 fraction).
    pub win_rate_days: Option<Decimal>,
}

/// Normalized 0-100 scores, one per summary metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScorecard {
    /// Sharpe ratio score.
    pub sharpe_ratio: Decimal,
    /// Sortino ratio score.
    pub sortino_ratio: Decimal,
    /// Calmar ratio score.
    pub calmar_ratio: Decimal,
    /// Volatility score (lower volatility scores higher).
    pub volatility: Decimal,
    /// Max drawdown score (smaller magnitude scores higher).
    pub max_drawdown: Decimal,
    /// Win rate score.
    pub win_rate: Decimal,
}

impl RiskScorecard {
    /// Normalize a raw summary into a scorecard.
    #[must_use]
    pub fn from_summary(summary: &RawRiskSummary) -> Self {
        Self {
            sharpe_ratio: normalize_metric(MetricClass::Ratio, summary.sharpe_ratio),
            sortino_ratio: normalize_metric(MetricClass::Ratio, summary.sortino_ratio),
            calmar_ratio: normalize_metric(MetricClass::Ratio, summary.calmar_ratio),
            volatility: normalize_metric(MetricClass::Volatility, summary.volatility),
            max_drawdown: normalize_metric(MetricClass::Drawdown, summary.max_drawdown),
            win_rate: normalize_metric(MetricClass::Percentage, summary.win_rate_days),
        }
    }

    /// Flatten into a name-keyed map for the rendering layer.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, Decimal> {
        BTreeMap::from([
            ("sharpe_ratio".to_string(), self.sharpe_ratio),
            ("sortino_ratio".to_string(), self.sortino_ratio),
            ("calmar_ratio".to_string(), self.calmar_ratio),
            ("volatility".to_string(), self.volatility),
            ("max_drawdown".to_string(), self.max_drawdown),
            ("win_rate".to_string(), self.win_rate),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(MetricClass::Ratio, dec!(3.0), dec!(100) ; "sharpe saturates at two")]
    #[test_case(MetricClass::Ratio, dec!(2.0), dec!(100) ; "ratio of exactly two")]
    #[test_case(MetricClass::Ratio, dec!(1.0), dec!(50) ; "ratio of one scores fifty")]
    #[test_case(MetricClass::Ratio, dec!(0.5), dec!(25) ; "fractional ratio")]
    #[test_case(MetricClass::Ratio, dec!(-1.0), dec!(0) ; "negative ratio floors at zero")]
    #[test_case(MetricClass::Volatility, dec!(0.1), dec!(80) ; "ten percent volatility")]
    #[test_case(MetricClass::Volatility, dec!(0.5), dec!(0) ; "fifty percent volatility floors")]
    #[test_case(MetricClass::Volatility, dec!(0.9), dec!(0) ; "extreme volatility floors")]
    #[test_case(MetricClass::Volatility, dec!(-0.2), dec!(60) ; "volatility sign ignored")]
    #[test_case(MetricClass::Drawdown, dec!(-0.15), dec!(70) ; "moderate drawdown")]
    #[test_case(MetricClass::Drawdown, dec!(-0.6), dec!(0) ; "deep drawdown floors")]
    #[test_case(MetricClass::Drawdown, dec!(0), dec!(100) ; "no drawdown scores full")]
    #[test_case(MetricClass::Percentage, dec!(0.55), dec!(55) ; "win rate fraction")]
    #[test_case(MetricClass::Percentage, dec!(1.5), dec!(100) ; "win rate over one clamps")]
    #[test_case(MetricClass::Percentage, dec!(-0.1), dec!(0) ; "negative win rate clamps")]
    fn test_normalization_table(class: MetricClass, value: Decimal, expected: Decimal) {
        assert_eq!(normalize_metric(class, Some(value)), expected);
    }

    #[test]
    fn test_missing_metric_scores_zero() {
        for class in [
            MetricClass::Ratio,
            MetricClass::Volatility,
            MetricClass::Drawdown,
            MetricClass::Percentage,
        ] {
            assert_eq!(normalize_metric(class, None), Decimal::ZERO);
        }
    }

    #[test]
    fn test_scorecard_from_summary() {
        let summary = RawRiskSummary {
            sharpe_ratio: Some(dec!(1.2)),
            sortino_ratio: Some(dec!(2.5)),
            calmar_ratio: None,
            volatility: Some(dec!(0.2)),
            max_drawdown: Some(dec!(-0.3)),
            win_rate_days: Some(dec!(0.62)),
        };
        let scorecard = RiskScorecard::from_summary(&summary);

        assert_eq!(scorecard.sharpe_ratio, dec!(60));
        assert_eq!(scorecard.sortino_ratio, dec!(100));
        assert_eq!(scorecard.calmar_ratio, Decimal::ZERO);
        assert_eq!(scorecard.volatility, dec!(60));
        assert_eq!(scorecard.max_drawdown, dec!(40));
        assert_eq!(scorecard.win_rate, dec!(62));
    }

    #[test]
    fn test_scorecard_map_keys_are_stable() {
        let map = RiskScorecard::from_summary(&RawRiskSummary::default()).into_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "calmar_ratio",
                "max_drawdown",
                "sharpe_ratio",
                "sortino_ratio",
                "volatility",
                "win_rate"
            ]
        );
    }

    proptest! {
        /// Scores stay inside [0, 100] for any finite numeric input,
        /// including very large and very negative raw ratios.
        #[test]
        fn prop_scores_bounded(value in -1e12f64..1e12f64) {
            let Some(value) = Decimal::from_f64(value) else {
                return Ok(());
            };
            for class in [
                MetricClass::Ratio,
                MetricClass::Volatility,
                MetricClass::Drawdown,
                MetricClass::Percentage,
            ] {
                let score = normalize_metric(class, Some(value));
                prop_assert!(score >= Decimal::ZERO);
                prop_assert!(score <= Decimal::ONE_HUNDRED);
            }
        }
    }
}
