//! Canonical data types shared across the analytics pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    /// Opening/accumulating purchase.
    Buy,
    /// Closing/reducing sale.
    Sell,
}

/// Canonical trade record.
///
/// Produced once by the ledger normalizer from a raw heterogeneous record
/// and immutable thereafter. Ordering is established by `(timestamp,
/// ledger_index)` with a stable sort, so same-timestamp records keep their
/// original ledger position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Execution timestamp.
    pub timestamp: DateTime<Utc>,
    /// Trade side.
    pub side: TradeSide,
    /// Traded quantity (always positive).
    pub quantity: Decimal,
    /// Execution price per unit (never negative).
    pub price: Decimal,
    /// Commission paid (never negative).
    pub commission: Decimal,
    /// Transaction tax paid (never negative).
    pub transaction_tax: Decimal,
    /// Position of the record in the original raw ledger; secondary sort
    /// key for same-timestamp records.
    pub ledger_index: usize,
}

impl TradeRecord {
    /// Gross value of the trade (price times quantity).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }

    /// The calendar date the trade executed on.
    #[must_use]
    pub fn trade_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Portfolio valuation series: one value per trading day, parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSeries {
    /// Valuation dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Portfolio values, parallel to `dates`.
    pub values: Vec<Decimal>,
}

impl PortfolioSeries {
    /// Create a series from parallel arrays.
    #[must_use]
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Decimal>) -> Self {
        Self { dates, values }
    }

    /// Number of points in the series, bounded by the shorter array.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len().min(self.values.len())
    }

    /// Whether the series has no usable points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the parallel arrays disagree in length.
    #[must_use]
    pub fn is_ragged(&self) -> bool {
        self.dates.len() != self.values.len()
    }

    /// Iterate `(date, value)` pairs up to the shorter array's length.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}
