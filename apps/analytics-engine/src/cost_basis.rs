//! Average-cost basis matching and realized P&L reconstruction.
//!
//! Replays the canonical ledger in chronological order, maintaining one
//! [`PositionState`] per instrument, and emits one [`RealizedTradeOutcome`]
//! per sell. Matching is average-cost, not FIFO-lot: all held units of an
//! instrument share one blended cost, updated on every buy.
//!
//! The matcher never fails on an inconsistent ledger. A sell with no held
//! quantity (the source ledger may start mid-position) emits zero P&L and an
//! advisory; a sell exceeding the held quantity matches the held portion at
//! average cost and resets the position.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::events::{Advisory, AdvisoryCode, log_unmatched_sell};
use crate::models::{TradeRecord, TradeSide};

/// Running position state for one instrument during a replay pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Currently held quantity (never negative).
    pub held_quantity: Decimal,
    /// Total cost of the currently held lots (never negative).
    pub total_cost_basis: Decimal,
}

impl PositionState {
    /// Blended average cost per held unit; zero when flat.
    #[must_use]
    pub fn average_cost(&self) -> Decimal {
        if self.held_quantity > Decimal::ZERO {
            self.total_cost_basis / self.held_quantity
        } else {
            Decimal::ZERO
        }
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.held_quantity == Decimal::ZERO
    }

    /// Full closure: both fields return to exact zero so no rounding
    /// residue carries into the next position in the same instrument.
    fn reset(&mut self) {
        self.held_quantity = Decimal::ZERO;
        self.total_cost_basis = Decimal::ZERO;
    }
}

/// Realized result of one sell event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedTradeOutcome {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Sell execution timestamp.
    pub timestamp: DateTime<Utc>,
    /// Sold quantity.
    pub quantity: Decimal,
    /// Sell price per unit.
    pub price: Decimal,
    /// Proceeds net of commission and tax, minus matched cost basis.
    pub realized_pnl: Decimal,
    /// False when the sell found no held quantity to match against; such
    /// outcomes carry zero P&L by policy.
    pub matched: bool,
}

impl RealizedTradeOutcome {
    /// Whether this sell locked in a profit.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}

/// Output of a full cost-basis replay.
#[derive(Debug, Clone, Default)]
pub struct CostBasisReplay {
    /// One outcome per sell, in replay order.
    pub outcomes: Vec<RealizedTradeOutcome>,
    /// Per-instrument position state at end of replay (open holdings).
    pub positions: HashMap<String, PositionState>,
    /// Advisories for unmatched and oversold sells.
    pub advisories: Vec<Advisory>,
}

/// Average-cost matcher over a chronological trade stream.
#[derive(Debug, Default)]
pub struct CostBasisMatcher {
    positions: HashMap<String, PositionState>,
    outcomes: Vec<RealizedTradeOutcome>,
    advisories: Vec<Advisory>,
}

impl CostBasisMatcher {
    /// Create an empty matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one trade. Buys mutate state only; sells also emit an outcome.
    pub fn apply(&mut self, trade: &TradeRecord) {
        match trade.side {
            TradeSide::Buy => self.apply_buy(trade),
            TradeSide::Sell => self.apply_sell(trade),
        }
    }

    fn apply_buy(&mut self, trade: &TradeRecord) {
        let state = self.positions.entry(trade.instrument_id.clone()).or_default();
        state.held_quantity += trade.quantity;
        state.total_cost_basis += trade.notional() + trade.commission;
    }

    fn apply_sell(&mut self, trade: &TradeRecord) {
        let state = self.positions.entry(trade.instrument_id.clone()).or_default();

        if state.is_flat() {
            // Ledger may start mid-position: degrade to a zero-P&L outcome.
            log_unmatched_sell(&trade.instrument_id, trade.quantity);
            self.advisories.push(
                Advisory::warning(
                    AdvisoryCode::UnmatchedSell,
                    format!(
                        "sell of {} {} with no held quantity; zero P&L emitted",
                        trade.quantity, trade.instrument_id
                    ),
                )
                .with_instrument(&trade.instrument_id),
            );
            self.outcomes.push(RealizedTradeOutcome {
                instrument_id: trade.instrument_id.clone(),
                timestamp: trade.timestamp,
                quantity: trade.quantity,
                price: trade.price,
                realized_pnl: Decimal::ZERO,
                matched: false,
            });
            return;
        }

        let average_cost = state.average_cost();
        let matched_quantity = trade.quantity.min(state.held_quantity);
        let realized_pnl = trade.notional()
            - trade.commission
            - trade.transaction_tax
            - matched_quantity * average_cost;

        if trade.quantity >= state.held_quantity {
            if trade.quantity > state.held_quantity {
                self.advisories.push(
                    Advisory::warning(
                        AdvisoryCode::OversoldPosition,
                        format!(
                            "sell of {} {} exceeds held {}; excess carries no cost basis",
                            trade.quantity, trade.instrument_id, state.held_quantity
                        ),
                    )
                    .with_instrument(&trade.instrument_id),
                );
            }
            state.reset();
        } else {
            state.held_quantity -= matched_quantity;
            state.total_cost_basis -= matched_quantity * average_cost;
        }

        self.outcomes.push(RealizedTradeOutcome {
            instrument_id: trade.instrument_id.clone(),
            timestamp: trade.timestamp,
            quantity: trade.quantity,
            price: trade.price,
            realized_pnl,
            matched: true,
        });
    }

    /// Finish the replay, yielding outcomes and final open positions.
    #[must_use]
    pub fn finish(self) -> CostBasisReplay {
        CostBasisReplay {
            outcomes: self.outcomes,
            positions: self.positions,
            advisories: self.advisories,
        }
    }
}

/// Replay a canonical, time-ordered ledger through the average-cost matcher.
#[must_use]
pub fn replay_cost_basis(trades: &[TradeRecord]) -> CostBasisReplay {
    let mut matcher = CostBasisMatcher::new();
    for trade in trades {
        matcher.apply(trade);
    }
    matcher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn trade(
        instrument: &str,
        day: u32,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        tax: Decimal,
    ) -> TradeRecord {
        TradeRecord {
            instrument_id: instrument.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            side,
            quantity,
            price,
            commission,
            transaction_tax: tax,
            ledger_index: day as usize,
        }
    }

    #[test]
    fn test_buy_then_sell_worked_example() {
        // buy 100 @ 10 (commission 1), sell 100 @ 12 (commission 1, tax 1)
        // realized = 100*12 - 1 - 1 - (100*10 + 1) = 197
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(100), dec!(10), dec!(1), dec!(0)),
            trade("AAPL", 2, TradeSide::Sell, dec!(100), dec!(12), dec!(1), dec!(1)),
        ];
        let replay = replay_cost_basis(&trades);

        assert_eq!(replay.outcomes.len(), 1);
        assert_eq!(replay.outcomes[0].realized_pnl, dec!(197));
        assert!(replay.outcomes[0].matched);
        assert!(replay.positions["AAPL"].is_flat());
    }

    #[test]
    fn test_buys_emit_no_outcome() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(10), dec!(5), dec!(0), dec!(0)),
            trade("AAPL", 2, TradeSide::Buy, dec!(10), dec!(6), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);
        assert!(replay.outcomes.is_empty());
        assert_eq!(replay.positions["AAPL"].held_quantity, dec!(20));
        assert_eq!(replay.positions["AAPL"].total_cost_basis, dec!(110));
    }

    #[test]
    fn test_average_cost_blends_across_buys() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(10), dec!(10), dec!(0), dec!(0)),
            trade("AAPL", 2, TradeSide::Buy, dec!(10), dec!(20), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);
        assert_eq!(replay.positions["AAPL"].average_cost(), dec!(15));
    }

    #[test]
    fn test_partial_sell_decrements_proportionally() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(100), dec!(10), dec!(0), dec!(0)),
            trade("AAPL", 2, TradeSide::Sell, dec!(40), dec!(12), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);

        assert_eq!(replay.outcomes[0].realized_pnl, dec!(80));
        let state = &replay.positions["AAPL"];
        assert_eq!(state.held_quantity, dec!(60));
        assert_eq!(state.total_cost_basis, dec!(600));
    }

    #[test]
    fn test_unmatched_sell_emits_zero_pnl() {
        let trades = vec![trade(
            "AAPL",
            1,
            TradeSide::Sell,
            dec!(50),
            dec!(12),
            dec!(1),
            dec!(0),
        )];
        let replay = replay_cost_basis(&trades);

        assert_eq!(replay.outcomes.len(), 1);
        assert_eq!(replay.outcomes[0].realized_pnl, Decimal::ZERO);
        assert!(!replay.outcomes[0].matched);
        assert_eq!(replay.advisories.len(), 1);
        assert_eq!(replay.advisories[0].code, AdvisoryCode::UnmatchedSell);
    }

    #[test]
    fn test_oversell_matches_held_portion_and_resets() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(50), dec!(10), dec!(0), dec!(0)),
            trade("AAPL", 2, TradeSide::Sell, dec!(80), dec!(12), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);

        // 80*12 proceeds, only 50 units carry cost basis at 10.
        assert_eq!(replay.outcomes[0].realized_pnl, dec!(460));
        assert!(replay.positions["AAPL"].is_flat());
        assert_eq!(replay.positions["AAPL"].total_cost_basis, Decimal::ZERO);
        assert_eq!(replay.advisories[0].code, AdvisoryCode::OversoldPosition);
    }

    #[test]
    fn test_full_closure_resets_cost_basis_exactly() {
        // 3 units at a non-terminating average cost; closure must not leave
        // rounding residue in the state.
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(3), dec!(10), dec!(1), dec!(0)),
            trade("AAPL", 2, TradeSide::Sell, dec!(3), dec!(11), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);

        let state = &replay.positions["AAPL"];
        assert_eq!(state.held_quantity, Decimal::ZERO);
        assert_eq!(state.total_cost_basis, Decimal::ZERO);
        assert_eq!(state.average_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_instruments_tracked_independently() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(10), dec!(10), dec!(0), dec!(0)),
            trade("TSLA", 2, TradeSide::Buy, dec!(5), dec!(200), dec!(0), dec!(0)),
            trade("AAPL", 3, TradeSide::Sell, dec!(10), dec!(11), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);

        assert_eq!(replay.outcomes.len(), 1);
        assert_eq!(replay.outcomes[0].instrument_id, "AAPL");
        assert!(replay.positions["AAPL"].is_flat());
        assert_eq!(replay.positions["TSLA"].held_quantity, dec!(5));
    }

    #[test]
    fn test_reopened_position_starts_clean() {
        let trades = vec![
            trade("AAPL", 1, TradeSide::Buy, dec!(10), dec!(10), dec!(0), dec!(0)),
            trade("AAPL", 2, TradeSide::Sell, dec!(10), dec!(12), dec!(0), dec!(0)),
            trade("AAPL", 3, TradeSide::Buy, dec!(4), dec!(20), dec!(0), dec!(0)),
        ];
        let replay = replay_cost_basis(&trades);

        let state = &replay.positions["AAPL"];
        assert_eq!(state.held_quantity, dec!(4));
        assert_eq!(state.average_cost(), dec!(20));
    }

    proptest! {
        /// For a fully closed position, the realized P&L sum equals
        /// total sell proceeds - total buy cost - commissions - taxes,
        /// within rounding tolerance.
        #[test]
        fn prop_closed_position_conserves_pnl(
            buys in proptest::collection::vec(
                (1u32..500, 1u32..100_000, 0u32..500),
                1..8,
            ),
            sell_price_cents in 1u32..100_000,
            sell_commission_cents in 0u32..500,
            sell_tax_cents in 0u32..500,
        ) {
            let mut trades = Vec::new();
            let mut total_quantity = Decimal::ZERO;
            let mut total_buy_cost = Decimal::ZERO;

            for (day, (quantity, price_cents, commission_cents)) in buys.iter().enumerate() {
                let quantity = Decimal::from(*quantity);
                let price = Decimal::new(i64::from(*price_cents), 2);
                let commission = Decimal::new(i64::from(*commission_cents), 2);
                total_quantity += quantity;
                total_buy_cost += quantity * price + commission;
                trades.push(trade(
                    "X",
                    u32::try_from(day + 1).unwrap(),
                    TradeSide::Buy,
                    quantity,
                    price,
                    commission,
                    Decimal::ZERO,
                ));
            }

            let sell_price = Decimal::new(i64::from(sell_price_cents), 2);
            let sell_commission = Decimal::new(i64::from(sell_commission_cents), 2);
            let sell_tax = Decimal::new(i64::from(sell_tax_cents), 2);
            trades.push(trade(
                "X",
                28,
                TradeSide::Sell,
                total_quantity,
                sell_price,
                sell_commission,
                sell_tax,
            ));

            let replay = replay_cost_basis(&trades);
            let realized: Decimal = replay.outcomes.iter().map(|o| o.realized_pnl).sum();
            let expected =
                total_quantity * sell_price - sell_commission - sell_tax - total_buy_cost;

            prop_assert!(replay.positions["X"].is_flat());
            prop_assert!((realized - expected).abs() < dec!(0.000001));
        }
    }
}
