//! Calendar-month aggregation of daily return and trade data.
//!
//! Buckets are keyed by zero-padded `YYYY-MM` strings, so lexicographic key
//! order is chronological order across year boundaries. Monthly volatility
//! and drawdown here are heuristic proxies derived from the bucket's return
//! magnitude (true intraday series are unavailable at this granularity) and
//! are flagged as such to keep them distinct from the precise
//! [`crate::drawdown`] scan.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::cost_basis::RealizedTradeOutcome;
use crate::events::{Advisory, AdvisoryCode};
use crate::models::{PortfolioSeries, TradeRecord};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Zero-padded `YYYY-MM` key for a date.
#[must_use]
pub fn period_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a `YYYY-MM` period key back into `(year, month)`.
#[must_use]
pub fn parse_period_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

/// Last calendar day of the given month.
#[must_use]
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).map(|first| first - chrono::Days::new(1))
}

/// One calendar-month summary bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// Zero-padded `YYYY-MM` period key.
    pub period_key: String,
    /// Monthly return in percent, sourced from the portfolio series.
    pub return_pct: Decimal,
    /// Distinct dates with at least one trade; the configured assumed value
    /// when the bucket has no trade data.
    pub trading_day_count: u32,
    /// Sell outcomes falling in the bucket.
    pub trade_count: u32,
    /// Fraction of those sells with positive realized P&L, in percent;
    /// zero when the bucket has no sells.
    pub win_rate_pct: Decimal,
    /// Heuristic drawdown proxy from the return magnitude (always `<= 0`).
    pub estimated_max_drawdown_pct: Decimal,
    /// Heuristic volatility proxy from the return magnitude.
    pub estimated_volatility_pct: Decimal,
    /// True while the two estimates above come from the return-magnitude
    /// heuristic rather than a genuine intraday series.
    pub estimates_are_heuristic: bool,
}

/// Result of the monthly aggregation.
#[derive(Debug, Clone, Default)]
pub struct MonthlyAggregation {
    /// Buckets in chronological key order, across year boundaries.
    pub buckets: Vec<MonthlyBucket>,
    /// Advisories for zero-trade buckets.
    pub advisories: Vec<Advisory>,
}

/// Derive per-month returns (percent) from the portfolio value series.
///
/// Each month's return compares its last value against the previous month's
/// last value; the first month compares against the series' first value. A
/// non-positive baseline yields a zero return for that month.
#[must_use]
pub fn monthly_returns_from_series(series: &PortfolioSeries) -> BTreeMap<String, Decimal> {
    // Last value per month, in chronological order.
    let mut month_closes: Vec<(String, Decimal)> = Vec::new();
    for (date, value) in series.iter() {
        let key = period_key(date);
        match month_closes.last_mut() {
            Some((last_key, last_value)) if *last_key == key => *last_value = value,
            _ => month_closes.push((key, value)),
        }
    }

    let mut returns = BTreeMap::new();
    let mut baseline = series.iter().next().map(|(_, value)| value);
    for (key, close) in month_closes {
        let return_pct = match baseline {
            Some(prev) if prev > Decimal::ZERO => (close / prev - Decimal::ONE) * HUNDRED,
            _ => Decimal::ZERO,
        };
        returns.insert(key, return_pct);
        baseline = Some(close);
    }
    returns
}

/// Bucket trades and outcomes into calendar-month summaries.
#[must_use]
pub fn aggregate_monthly(
    trades: &[TradeRecord],
    outcomes: &[RealizedTradeOutcome],
    monthly_returns: &BTreeMap<String, Decimal>,
    config: &AnalyticsConfig,
) -> MonthlyAggregation {
    let mut trade_dates: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
    for trade in trades {
        let date = trade.trade_date();
        trade_dates.entry(period_key(date)).or_default().insert(date);
    }

    let mut sell_stats: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for outcome in outcomes {
        let entry = sell_stats
            .entry(period_key(outcome.timestamp.date_naive()))
            .or_default();
        entry.0 += 1;
        if outcome.is_winner() {
            entry.1 += 1;
        }
    }

    // Every month any input touches gets a bucket; BTreeSet keeps the keys
    // chronological across year boundaries.
    let keys: BTreeSet<String> = monthly_returns
        .keys()
        .chain(trade_dates.keys())
        .chain(sell_stats.keys())
        .cloned()
        .collect();

    let mut aggregation = MonthlyAggregation::default();
    for key in keys {
        let return_pct = monthly_returns.get(&key).copied().unwrap_or(Decimal::ZERO);
        let (trade_count, wins) = sell_stats.get(&key).copied().unwrap_or((0, 0));

        let win_rate_pct = if trade_count > 0 {
            Decimal::from(wins) / Decimal::from(trade_count) * HUNDRED
        } else {
            Decimal::ZERO
        };

        let trading_day_count = match trade_dates.get(&key) {
            Some(dates) => u32::try_from(dates.len()).unwrap_or(u32::MAX),
            None => config.assumed_trading_days,
        };

        if trade_count == 0 {
            aggregation.advisories.push(
                Advisory::warning(
                    AdvisoryCode::EmptyBucket,
                    format!("no trades in {key}; win rate defaults to zero"),
                )
                .with_period(&key),
            );
        }

        let magnitude = return_pct.abs();
        aggregation.buckets.push(MonthlyBucket {
            period_key: key,
            return_pct,
            trading_day_count,
            trade_count,
            win_rate_pct,
            estimated_max_drawdown_pct: -(magnitude * config.proxies.drawdown_factor),
            estimated_volatility_pct: magnitude * config.proxies.volatility_factor,
            estimates_are_heuristic: true,
        });
    }

    aggregation
}
