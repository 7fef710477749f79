//! Trade ledger normalization.
//!
//! Raw trade records arrive from brokerage exports and scraped statements in
//! arbitrary shapes: field names vary (`symbol` vs `instrument_id`, `shares`
//! vs `quantity`), numbers arrive as JSON numbers or as strings, and the
//! ledger itself is unordered. This module canonicalizes each record through
//! an explicit, ordered alias table per field (the first present alias
//! wins) and establishes the replay order: timestamp ascending with a
//! stable tie-break on original ledger position.
//!
//! All "which field name wins" ambiguity is isolated here; downstream
//! components only ever see [`TradeRecord`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::{Map, Value};

use crate::error::LedgerError;
use crate::events::{Advisory, AdvisoryCode};
use crate::models::{TradeRecord, TradeSide};

/// Ordered aliases for the instrument identifier. The only field whose
/// absence makes a record malformed.
const INSTRUMENT_ALIASES: &[&str] = &["instrument_id", "symbol", "code", "ticker", "stock_code"];

/// Ordered aliases for the execution timestamp.
const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "trade_date", "date", "executed_at"];

/// Ordered aliases for the trade side.
const SIDE_ALIASES: &[&str] = &["side", "action", "order_type", "trade_type"];

/// Ordered aliases for the traded quantity.
const QUANTITY_ALIASES: &[&str] = &["quantity", "shares", "qty", "volume"];

/// Ordered aliases for the execution price.
const PRICE_ALIASES: &[&str] = &["price", "unit_price", "trade_price"];

/// Ordered aliases for the commission.
const COMMISSION_ALIASES: &[&str] = &["commission", "fee", "fees"];

/// Ordered aliases for the transaction tax.
const TAX_ALIASES: &[&str] = &["transaction_tax", "tax"];

/// A raw record dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Index of the record in the raw input array.
    pub index: usize,
    /// Why it was dropped.
    pub error: LedgerError,
}

/// Result of normalizing a raw ledger.
#[derive(Debug, Clone, Default)]
pub struct NormalizedLedger {
    /// Canonical trades, sorted by `(timestamp, original index)`.
    pub trades: Vec<TradeRecord>,
    /// Records dropped during normalization.
    pub skips: Vec<SkippedRecord>,
    /// Advisories produced while normalizing (skips and field clamps).
    pub advisories: Vec<Advisory>,
}

impl NormalizedLedger {
    /// Number of raw records that did not make it into the canonical ledger.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skips.len()
    }
}

/// Normalize a raw heterogeneous ledger into canonical, time-ordered trades.
///
/// Never fails: records that cannot be canonicalized are dropped with an
/// advisory, per-record. A record with no resolvable instrument identifier
/// is classified [`LedgerError::MissingInstrument`]; a record without a
/// usable side is a no-op and is never offered to downstream matching.
#[must_use]
pub fn normalize_ledger(raw: &[Value]) -> NormalizedLedger {
    let mut ledger = NormalizedLedger::default();

    for (index, value) in raw.iter().enumerate() {
        match normalize_record(index, value, &mut ledger.advisories) {
            Ok(trade) => ledger.trades.push(trade),
            Err(error) => {
                ledger
                    .advisories
                    .push(Advisory::for_skipped_record(index, &error));
                ledger.skips.push(SkippedRecord { index, error });
            }
        }
    }

    // Stable replay order: timestamp ascending, original position breaks ties.
    ledger
        .trades
        .sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.ledger_index.cmp(&b.ledger_index)));

    ledger
}

fn normalize_record(
    index: usize,
    value: &Value,
    advisories: &mut Vec<Advisory>,
) -> Result<TradeRecord, LedgerError> {
    let object = value.as_object().ok_or(LedgerError::NotAnObject)?;

    let instrument_id =
        coerce_identifier(resolve(object, INSTRUMENT_ALIASES)).ok_or(LedgerError::MissingInstrument)?;

    let side = match resolve(object, SIDE_ALIASES) {
        None => return Err(LedgerError::MissingSide),
        Some(raw_side) => parse_side(raw_side)?,
    };

    let timestamp = match resolve(object, TIMESTAMP_ALIASES) {
        // Absent fields default rather than raise; epoch sorts first.
        None => DateTime::UNIX_EPOCH,
        Some(raw_ts) => parse_timestamp(raw_ts)?,
    };

    let quantity = coerce_decimal(resolve(object, QUANTITY_ALIASES)).unwrap_or(Decimal::ZERO);
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQuantity);
    }

    let price = clamp_non_negative(
        coerce_decimal(resolve(object, PRICE_ALIASES)).unwrap_or(Decimal::ZERO),
        "price",
        &instrument_id,
        index,
        advisories,
    );
    let commission = clamp_non_negative(
        coerce_decimal(resolve(object, COMMISSION_ALIASES)).unwrap_or(Decimal::ZERO),
        "commission",
        &instrument_id,
        index,
        advisories,
    );
    let transaction_tax = clamp_non_negative(
        coerce_decimal(resolve(object, TAX_ALIASES)).unwrap_or(Decimal::ZERO),
        "transaction_tax",
        &instrument_id,
        index,
        advisories,
    );

    Ok(TradeRecord {
        instrument_id,
        timestamp,
        side,
        quantity,
        price,
        commission,
        transaction_tax,
        ledger_index: index,
    })
}

/// First present, non-null alias wins; a null field counts as absent.
fn resolve<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|alias| object.get(*alias).filter(|value| !value.is_null()))
}

/// Accept strings and bare numbers as identifiers (numeric stock codes are
/// common in exported ledgers).
fn coerce_identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept JSON numbers and numeric strings.
fn coerce_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn clamp_non_negative(
    value: Decimal,
    field: &str,
    instrument_id: &str,
    index: usize,
    advisories: &mut Vec<Advisory>,
) -> Decimal {
    if value < Decimal::ZERO {
        advisories.push(
            Advisory::warning(
                AdvisoryCode::NegativeFieldClamped,
                format!("ledger record {index}: negative {field} {value} clamped to zero"),
            )
            .with_instrument(instrument_id),
        );
        Decimal::ZERO
    } else {
        value
    }
}

fn parse_side(value: &Value) -> Result<TradeSide, LedgerError> {
    let token = match value {
        Value::String(s) => s.trim().to_ascii_lowercase(),
        other => other.to_string(),
    };
    match token.as_str() {
        "buy" | "b" | "bid" | "long" => Ok(TradeSide::Buy),
        "sell" | "s" | "ask" | "short" => Ok(TradeSide::Sell),
        _ => Err(LedgerError::UnrecognizedSide { token }),
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, LedgerError> {
    let bad = |value: &Value| LedgerError::BadTimestamp {
        value: value.to_string(),
    };

    let Value::String(s) = value else {
        return Err(bad(value));
    };
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(bad(value))
}
