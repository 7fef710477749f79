// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Analytics Engine - Rust Core Library
//!
//! The trade/portfolio analytics reconstruction engine for the Ledgerscope
//! desktop shell. Given a raw trade ledger (heterogeneous field naming,
//! unordered arrival) and a portfolio valuation series, it reconstructs
//! per-instrument cost basis and realized P&L, derives concurrently held
//! position counts without a persisted snapshot, computes drawdown and
//! peak-tracking series, normalizes risk ratios onto a common 0-100 scale,
//! and aggregates results into calendar-month buckets.
//!
//! # Pipeline
//!
//! - `ledger`: canonicalize heterogeneous records (alias resolution, type
//!   coercion, chronological ordering)
//! - `cost_basis`: average-cost matching, one realized outcome per sell
//! - `positions`: replay-derived position counts with a volatility fallback
//! - `drawdown`: running-peak and drawdown scan over the value series
//! - `risk`: 0-100 normalization of summary ratios
//! - `aggregate`: calendar-month buckets with win-rate and trade counts
//! - `report`: the [`AnalyticsEngine`] facade tying the stages together
//!
//! # Error philosophy
//!
//! The engine always produces a best-effort report rather than failing the
//! surrounding view: data anomalies degrade to advisories and defined
//! defaults. The only fatal error is an invalid [`AnalyticsConfig`].
//!
//! # Example
//!
//! ```
//! use analytics_engine::{AnalyticsEngine, AnalyticsInput};
//! use serde_json::json;
//!
//! let engine = AnalyticsEngine::default();
//! let input = AnalyticsInput {
//!     trades: vec![
//!         json!({"symbol": "AAPL", "side": "buy", "quantity": 100,
//!                "price": 10, "commission": 1, "date": "2024-11-05"}),
//!         json!({"symbol": "AAPL", "side": "sell", "quantity": 100,
//!                "price": 12, "commission": 1, "tax": 1, "date": "2024-12-10"}),
//!     ],
//!     ..Default::default()
//! };
//!
//! let report = engine.run(&input);
//! assert_eq!(report.realized_outcomes.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod config;
pub mod cost_basis;
pub mod drawdown;
pub mod error;
pub mod events;
pub mod ledger;
pub mod models;
pub mod positions;
pub mod report;
pub mod risk;

pub use aggregate::{
    MonthlyAggregation, MonthlyBucket, aggregate_monthly, month_end, monthly_returns_from_series,
    period_key,
};
pub use config::{AnalyticsConfig, PositionEstimatorConfig, ProxyFactorConfig};
pub use cost_basis::{
    CostBasisMatcher, CostBasisReplay, PositionState, RealizedTradeOutcome, replay_cost_basis,
};
pub use drawdown::{DrawdownPoint, DrawdownScan, max_drawdown, scan_drawdown};
pub use error::{ConfigError, LedgerError};
pub use events::{Advisory, AdvisoryCode, AdvisorySeverity};
pub use ledger::{NormalizedLedger, SkippedRecord, normalize_ledger};
pub use models::{PortfolioSeries, TradeRecord, TradeSide};
pub use positions::{PositionCheckpoint, PositionTimeline, estimate_position_count};
pub use report::{AnalyticsEngine, AnalyticsInput, AnalyticsReport};
pub use risk::{MetricClass, RawRiskSummary, RiskScorecard, normalize_metric};
