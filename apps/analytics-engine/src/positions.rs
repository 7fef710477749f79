//! Position-count reconstruction from the trade ledger.
//!
//! The source system persists no position snapshot, so the number of
//! concurrently held instruments at any date is derived by replaying the
//! canonical ledger forward and checkpointing the open-instrument count
//! after every trade. Dates between trades inherit the most recent prior
//! count (carry-forward, not interpolation); dates before the first trade
//! count zero.
//!
//! When trade data is wholly absent, [`estimate_position_count`] provides a
//! coarser estimate driven only by portfolio-value volatility. It is a
//! deliberately separate, clearly labeled code path (a lower-confidence
//! fallback, not a defect) and the engine flags its use with an advisory.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PositionEstimatorConfig;
use crate::models::{PortfolioSeries, TradeRecord, TradeSide};

/// Open-instrument count immediately after one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCheckpoint {
    /// Timestamp of the trade that produced this checkpoint.
    pub timestamp: DateTime<Utc>,
    /// Distinct instruments with positive held quantity after the trade.
    pub open_count: u32,
}

/// Replay-derived timeline of concurrently held position counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionTimeline {
    checkpoints: Vec<PositionCheckpoint>,
}

impl PositionTimeline {
    /// Build the timeline with a single forward replay of the canonical,
    /// time-ordered ledger.
    #[must_use]
    pub fn from_ledger(trades: &[TradeRecord]) -> Self {
        let mut held: HashMap<&str, Decimal> = HashMap::new();
        let mut open_count: u32 = 0;
        let mut checkpoints = Vec::with_capacity(trades.len());

        for trade in trades {
            let quantity = held.entry(trade.instrument_id.as_str()).or_default();
            let was_open = *quantity > Decimal::ZERO;

            match trade.side {
                TradeSide::Buy => *quantity += trade.quantity,
                TradeSide::Sell => {
                    // Sells beyond the held quantity clamp at zero, matching
                    // the cost-basis reset rule.
                    *quantity = (*quantity - trade.quantity).max(Decimal::ZERO);
                }
            }

            let is_open = *quantity > Decimal::ZERO;
            if is_open && !was_open {
                open_count += 1;
            } else if !is_open && was_open {
                open_count -= 1;
            }

            checkpoints.push(PositionCheckpoint {
                timestamp: trade.timestamp,
                open_count,
            });
        }

        Self { checkpoints }
    }

    /// Whether the timeline has no checkpoints (no trades replayed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// All checkpoints in replay order.
    #[must_use]
    pub fn checkpoints(&self) -> &[PositionCheckpoint] {
        &self.checkpoints
    }

    /// Position count at the end of `date`: the count at the last trade on
    /// or before that date, zero if no trade precedes it.
    #[must_use]
    pub fn count_on(&self, date: NaiveDate) -> u32 {
        let idx = self
            .checkpoints
            .partition_point(|checkpoint| checkpoint.timestamp.date_naive() <= date);
        if idx == 0 {
            0
        } else {
            self.checkpoints[idx - 1].open_count
        }
    }
}

/// Estimate a concurrent position count from portfolio-value volatility
/// alone.
///
/// Used only when no trade data exists. The sample standard deviation of
/// daily simple returns (in percentage points) is divided by the configured
/// per-position step and clamped to the configured bounds. Returns `None`
/// when the series is too short to yield a volatility figure (fewer than
/// three points).
#[must_use]
pub fn estimate_position_count(
    series: &PortfolioSeries,
    config: &PositionEstimatorConfig,
) -> Option<u32> {
    let mut returns: Vec<f64> = Vec::with_capacity(series.len().saturating_sub(1));
    let mut previous: Option<Decimal> = None;

    for (_, value) in series.iter() {
        if let Some(prev) = previous {
            if prev > Decimal::ZERO {
                let ratio = (value / prev - Decimal::ONE).to_f64()?;
                returns.push(ratio);
            }
        }
        previous = Some(value);
    }

    if returns.len() < 2 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns
        .iter()
        .map(|r| (r - mean) * (r - mean))
        .sum::<f64>()
        / (n - 1.0);
    let stddev_pct = libm::sqrt(variance) * 100.0;

    let step = config.pct_per_position.to_f64()?;
    if step <= 0.0 {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let raw = libm::round(stddev_pct / step).max(0.0) as u32;
    let estimate = raw.clamp(config.min_positions, config.max_positions);

    debug!(
        stddev_pct,
        estimate, "position count estimated from portfolio volatility"
    );
    Some(estimate)
}
