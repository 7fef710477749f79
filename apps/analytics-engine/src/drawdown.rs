//! Drawdown and running-peak tracking over a portfolio value series.
//!
//! A single left-to-right scan maintains the running peak and the percentage
//! decline from it. This is the precise computation over genuine daily data;
//! the heuristic monthly proxies in [`crate::aggregate`] must never be
//! confused with it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::events::{Advisory, AdvisoryCode};
use crate::models::PortfolioSeries;

/// One point of the drawdown series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    /// Valuation date.
    pub date: NaiveDate,
    /// Portfolio value on that date.
    pub portfolio_value: Decimal,
    /// Maximum portfolio value up to and including this point.
    pub running_peak: Decimal,
    /// `portfolio_value / running_peak - 1`; always `<= 0`, exactly zero
    /// when the value sits at the peak.
    pub drawdown_pct: Decimal,
}

/// Result of a drawdown scan.
#[derive(Debug, Clone, Default)]
pub struct DrawdownScan {
    /// One point per series entry, in input order.
    pub points: Vec<DrawdownPoint>,
    /// Advisories (non-positive leading values).
    pub advisories: Vec<Advisory>,
}

/// Scan the portfolio series, producing the drawdown point series.
///
/// Degenerate input is not an error: an empty series yields an empty scan
/// and a single-point series yields one zero-drawdown point. Points before
/// the first positive value carry zero drawdown, since a non-positive peak
/// makes the ratio meaningless; one advisory flags the condition.
#[must_use]
pub fn scan_drawdown(series: &PortfolioSeries) -> DrawdownScan {
    let mut scan = DrawdownScan::default();
    let mut running_peak = Decimal::MIN;
    let mut saw_non_positive_lead = false;

    for (date, value) in series.iter() {
        running_peak = running_peak.max(value);

        let drawdown_pct = if running_peak > Decimal::ZERO {
            value / running_peak - Decimal::ONE
        } else {
            saw_non_positive_lead = true;
            Decimal::ZERO
        };

        scan.points.push(DrawdownPoint {
            date,
            portfolio_value: value,
            running_peak,
            drawdown_pct,
        });
    }

    if saw_non_positive_lead {
        scan.advisories.push(Advisory::warning(
            AdvisoryCode::NonPositiveSeriesStart,
            "portfolio series starts at or below zero; leading drawdowns forced to zero",
        ));
    }

    scan
}

/// Maximum drawdown: the minimum `drawdown_pct` over the series, resolving
/// ties to the earliest occurrence. `None` for an empty series.
#[must_use]
pub fn max_drawdown(points: &[DrawdownPoint]) -> Option<&DrawdownPoint> {
    let mut worst: Option<&DrawdownPoint> = None;
    for point in points {
        match worst {
            // Strict comparison keeps the earliest of equal minima.
            Some(current) if point.drawdown_pct >= current.drawdown_pct => {}
            _ => worst = Some(point),
        }
    }
    worst
}
