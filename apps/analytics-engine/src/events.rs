//! Advisory records and structured logging for the analytics pipeline.
//!
//! The engine never fails the surrounding view: every anomaly it absorbs is
//! recorded as an [`Advisory`] on the report and emitted as a structured
//! tracing event.
//!
//! # Log Levels
//!
//! - **INFO**: Normal operations (run start/end)
//! - **WARN**: Degraded output (skipped records, unmatched sells, heuristic
//!   fallbacks)
//! - **DEBUG**: Detailed calculation steps

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::LedgerError;

/// Severity of an advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisorySeverity {
    /// Informational; the output is complete.
    Info,
    /// The output is defined but degraded or lower-confidence.
    Warning,
}

/// Machine-readable advisory code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvisoryCode {
    /// A raw ledger record was dropped during normalization.
    RecordSkipped,
    /// A negative commission/tax/price was clamped to zero.
    NegativeFieldClamped,
    /// A sell arrived with no held quantity; emitted with zero P&L.
    UnmatchedSell,
    /// A sell exceeded the held quantity; the excess carried no cost basis.
    OversoldPosition,
    /// Position counts were estimated from portfolio volatility alone.
    HeuristicPositionEstimate,
    /// A monthly bucket contains no trades.
    EmptyBucket,
    /// Portfolio parallel arrays disagreed in length and were truncated.
    SeriesTruncated,
    /// The portfolio series is empty; dependent outputs are empty.
    EmptySeries,
    /// The series starts at or below zero; leading drawdowns forced to zero.
    NonPositiveSeriesStart,
}

/// A non-fatal advisory attached to the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// Severity.
    pub severity: AdvisorySeverity,
    /// Machine-readable code.
    pub code: AdvisoryCode,
    /// Human-readable message.
    pub message: String,
    /// Instrument the advisory concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_id: Option<String>,
    /// Period key (`YYYY-MM`) the advisory concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_key: Option<String>,
}

impl Advisory {
    /// Create a warning-severity advisory.
    #[must_use]
    pub fn warning(code: AdvisoryCode, message: impl Into<String>) -> Self {
        Self {
            severity: AdvisorySeverity::Warning,
            code,
            message: message.into(),
            instrument_id: None,
            period_key: None,
        }
    }

    /// Create an info-severity advisory.
    #[must_use]
    pub fn info(code: AdvisoryCode, message: impl Into<String>) -> Self {
        Self {
            severity: AdvisorySeverity::Info,
            code,
            message: message.into(),
            instrument_id: None,
            period_key: None,
        }
    }

    /// Attach an instrument id.
    #[must_use]
    pub fn with_instrument(mut self, instrument_id: impl Into<String>) -> Self {
        self.instrument_id = Some(instrument_id.into());
        self
    }

    /// Attach a period key.
    #[must_use]
    pub fn with_period(mut self, period_key: impl Into<String>) -> Self {
        self.period_key = Some(period_key.into());
        self
    }

    /// Build the advisory for a skipped ledger record.
    #[must_use]
    pub fn for_skipped_record(index: usize, error: &LedgerError) -> Self {
        Self::warning(
            AdvisoryCode::RecordSkipped,
            format!("ledger record {index} skipped: {error}"),
        )
    }
}

/// Engine run summary, logged at the end of every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummaryEvent {
    /// Canonical trades replayed.
    pub trade_count: usize,
    /// Raw records dropped during normalization.
    pub skipped_count: usize,
    /// Realized sell outcomes emitted.
    pub outcome_count: usize,
    /// Monthly buckets produced.
    pub bucket_count: usize,
    /// Advisories attached to the report.
    pub advisory_count: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

/// Log the start of an engine run.
pub fn log_run_start(raw_record_count: usize, series_len: usize) {
    info!(
        raw_record_count,
        series_len, "analytics engine run started"
    );
}

/// Log the end of an engine run.
pub fn log_run_end(event: &RunSummaryEvent) {
    info!(
        trade_count = event.trade_count,
        skipped_count = event.skipped_count,
        outcome_count = event.outcome_count,
        bucket_count = event.bucket_count,
        advisory_count = event.advisory_count,
        duration_ms = event.duration_ms,
        "analytics engine run finished"
    );
}

/// Log a single advisory at its severity's level.
pub fn log_advisory(advisory: &Advisory) {
    match advisory.severity {
        AdvisorySeverity::Info => info!(
            code = ?advisory.code,
            instrument_id = advisory.instrument_id.as_deref(),
            period_key = advisory.period_key.as_deref(),
            "{}",
            advisory.message
        ),
        AdvisorySeverity::Warning => warn!(
            code = ?advisory.code,
            instrument_id = advisory.instrument_id.as_deref(),
            period_key = advisory.period_key.as_deref(),
            "{}",
            advisory.message
        ),
    }
}

/// Log an unmatched sell (zero held quantity at sell time).
pub fn log_unmatched_sell(instrument_id: &str, quantity: Decimal) {
    warn!(
        instrument_id,
        %quantity,
        "sell with no held quantity; emitting zero realized P&L"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisory_builders() {
        let advisory = Advisory::warning(AdvisoryCode::UnmatchedSell, "unmatched sell")
            .with_instrument("TSLA")
            .with_period("2024-07");
        assert_eq!(advisory.severity, AdvisorySeverity::Warning);
        assert_eq!(advisory.instrument_id.as_deref(), Some("TSLA"));
        assert_eq!(advisory.period_key.as_deref(), Some("2024-07"));
    }

    #[test]
    fn test_skipped_record_advisory_message() {
        let advisory = Advisory::for_skipped_record(3, &LedgerError::MissingInstrument);
        assert_eq!(advisory.code, AdvisoryCode::RecordSkipped);
        assert!(advisory.message.contains("record 3"));
        assert!(advisory.message.contains("instrument"));
    }

    #[test]
    fn test_advisory_serde_omits_empty_context() {
        let advisory = Advisory::info(AdvisoryCode::EmptySeries, "empty series");
        let json = serde_json::to_value(&advisory).unwrap();
        assert!(json.get("instrument_id").is_none());
        assert_eq!(json["code"], "EMPTY_SERIES");
    }
}
