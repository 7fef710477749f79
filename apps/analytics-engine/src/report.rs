//! Engine facade: wires the analytics components into one report.
//!
//! [`AnalyticsEngine::run`] is the single entry point the desktop shell
//! calls. It is a pure function of its input: no state survives between
//! calls, re-invocation on updated input performs a full replay, and every
//! stage is a single bounded scan, so repeated runs stay linear in ledger
//! size. Data anomalies never fail the run; they degrade to advisories on
//! the report.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::{
    MonthlyBucket, aggregate_monthly, month_end, monthly_returns_from_series, parse_period_key,
};
use crate::config::AnalyticsConfig;
use crate::cost_basis::{PositionState, RealizedTradeOutcome, replay_cost_basis};
use crate::drawdown::{DrawdownPoint, max_drawdown, scan_drawdown};
use crate::error::ConfigError;
use crate::events::{
    Advisory, AdvisoryCode, RunSummaryEvent, log_advisory, log_run_end, log_run_start,
};
use crate::ledger::normalize_ledger;
use crate::models::PortfolioSeries;
use crate::positions::{PositionTimeline, estimate_position_count};
use crate::risk::{RawRiskSummary, RiskScorecard};

/// Everything the engine consumes, supplied by external collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsInput {
    /// Raw heterogeneous trade records, in any order.
    pub trades: Vec<Value>,
    /// Portfolio valuation series, one entry per trading day.
    pub portfolio_series: PortfolioSeries,
    /// Externally computed summary ratios, passed through unchanged.
    pub risk_summary: RawRiskSummary,
}

/// The full analytics report consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// One realized outcome per sell, in replay order.
    pub realized_outcomes: Vec<RealizedTradeOutcome>,
    /// Open holdings at end of replay, keyed by instrument.
    pub open_positions: BTreeMap<String, PositionState>,
    /// Concurrently held position count at each month's end.
    pub position_counts_by_month: BTreeMap<String, u32>,
    /// Drawdown point series over the portfolio values.
    pub drawdown_series: Vec<DrawdownPoint>,
    /// The worst drawdown point (earliest of equal minima).
    pub max_drawdown: Option<DrawdownPoint>,
    /// Normalized 0-100 risk scores.
    pub normalized_risk_scores: RiskScorecard,
    /// Calendar-month summary buckets, chronological.
    pub monthly_buckets: Vec<MonthlyBucket>,
    /// Raw records dropped during normalization.
    pub skipped_count: usize,
    /// Non-fatal advisories accumulated across all stages.
    pub advisories: Vec<Advisory>,
}

/// The trade/portfolio analytics reconstruction engine.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Create an engine with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ConfigError`] if the configuration is
    /// invalid; this is the only fatal error the engine can produce.
    pub fn new(config: AnalyticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run the full pipeline and assemble the report.
    #[must_use]
    pub fn run(&self, input: &AnalyticsInput) -> AnalyticsReport {
        let started = Instant::now();
        log_run_start(input.trades.len(), input.portfolio_series.len());

        let mut advisories: Vec<Advisory> = Vec::new();
        let series = Self::usable_series(&input.portfolio_series, &mut advisories);

        // Canonical, time-ordered ledger; feeds both replay passes.
        let ledger = normalize_ledger(&input.trades);
        advisories.extend(ledger.advisories.iter().cloned());

        let replay = replay_cost_basis(&ledger.trades);
        advisories.extend(replay.advisories.iter().cloned());

        let timeline = PositionTimeline::from_ledger(&ledger.trades);

        let scan = scan_drawdown(&series);
        advisories.extend(scan.advisories.iter().cloned());
        let worst = max_drawdown(&scan.points).cloned();

        let monthly_returns = monthly_returns_from_series(&series);
        let aggregation =
            aggregate_monthly(&ledger.trades, &replay.outcomes, &monthly_returns, &self.config);
        advisories.extend(aggregation.advisories.iter().cloned());

        let position_counts_by_month =
            self.position_counts(&timeline, &series, &aggregation.buckets, &mut advisories);

        for advisory in &advisories {
            log_advisory(advisory);
        }

        let report = AnalyticsReport {
            realized_outcomes: replay.outcomes,
            open_positions: replay.positions.into_iter().collect(),
            position_counts_by_month,
            drawdown_series: scan.points,
            max_drawdown: worst,
            normalized_risk_scores: RiskScorecard::from_summary(&input.risk_summary),
            monthly_buckets: aggregation.buckets,
            skipped_count: ledger.skips.len(),
            advisories,
        };

        #[allow(clippy::cast_possible_truncation)]
        log_run_end(&RunSummaryEvent {
            trade_count: ledger.trades.len(),
            skipped_count: report.skipped_count,
            outcome_count: report.realized_outcomes.len(),
            bucket_count: report.monthly_buckets.len(),
            advisory_count: report.advisories.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });

        report
    }

    /// Best-effort view of the portfolio series: ragged parallel arrays are
    /// truncated to the shorter length, an empty series is flagged.
    fn usable_series(series: &PortfolioSeries, advisories: &mut Vec<Advisory>) -> PortfolioSeries {
        let usable = if series.is_ragged() {
            let len = series.len();
            advisories.push(Advisory::warning(
                AdvisoryCode::SeriesTruncated,
                format!(
                    "portfolio series arrays disagree ({} dates, {} values); truncated to {len}",
                    series.dates.len(),
                    series.values.len()
                ),
            ));
            PortfolioSeries::new(series.dates[..len].to_vec(), series.values[..len].to_vec())
        } else {
            series.clone()
        };

        if usable.is_empty() {
            advisories.push(Advisory::warning(
                AdvisoryCode::EmptySeries,
                "portfolio series is empty; drawdown and monthly returns are empty",
            ));
        }
        usable
    }

    /// Month-end position counts: replay-derived when trades exist,
    /// volatility-estimated when they do not (lower-confidence fallback).
    fn position_counts(
        &self,
        timeline: &PositionTimeline,
        series: &PortfolioSeries,
        buckets: &[MonthlyBucket],
        advisories: &mut Vec<Advisory>,
    ) -> BTreeMap<String, u32> {
        let month_ends = buckets.iter().filter_map(|bucket| {
            let (year, month) = parse_period_key(&bucket.period_key)?;
            Some((bucket.period_key.clone(), month_end(year, month)?))
        });

        if !timeline.is_empty() {
            return month_ends
                .map(|(key, end)| (key, timeline.count_on(end)))
                .collect();
        }

        match estimate_position_count(series, &self.config.estimator) {
            Some(estimate) => {
                advisories.push(Advisory::warning(
                    AdvisoryCode::HeuristicPositionEstimate,
                    format!(
                        "no trade data; position count {estimate} estimated from portfolio volatility"
                    ),
                ));
                month_ends.map(|(key, _)| (key, estimate)).collect()
            }
            None => BTreeMap::new(),
        }
    }
}
