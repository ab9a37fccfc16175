//! Pure position calculations: P&L, hedge sizing, and heuristic greeks.
//!
//! Everything here is stateless apart from the configured commission rate;
//! no function touches the ledger or performs I/O.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::events::Side;
use crate::position::Position;
use crate::reports::{HedgeInstruction, Urgency};

/// Imbalances below this stake are not worth hedging.
const MIN_HEDGE_SIZE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Stateless P&L and hedge calculator.
#[derive(Debug, Clone)]
pub struct Calculator {
    commission_rate: Decimal,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(Decimal::new(2, 2))
    }
}

impl Calculator {
    #[must_use]
    pub fn new(commission_rate: Decimal) -> Self {
        Self { commission_rate }
    }

    /// P&L for a position at the given market price.
    ///
    /// Back positions gain as the price rises; lay positions gain as the
    /// price shortens. With `include_commission` the accrued commission is
    /// deducted from the realized component and the commission rate from any
    /// unrealized profit.
    #[must_use]
    pub fn pnl(
        &self,
        position: &Position,
        current_price: Decimal,
        include_commission: bool,
    ) -> (Decimal, Decimal) {
        let realized = if include_commission {
            position.realized_pnl - position.commission
        } else {
            position.realized_pnl
        };

        let mut unrealized = if position.current_size > Decimal::ZERO {
            match position.side {
                Side::Back => (current_price - position.entry_price) * position.current_size,
                Side::Lay => (position.entry_price - current_price) * position.current_size,
            }
        } else {
            Decimal::ZERO
        };
        if include_commission && unrealized > Decimal::ZERO {
            unrealized *= Decimal::ONE - self.commission_rate;
        }

        (realized, unrealized)
    }

    /// Computes the offsetting bet that balances worst-case losses across
    /// the selections of a market.
    ///
    /// Back exposure counts positively, lay liability negatively; the
    /// selection carrying the most exposure gets an opposing bet sized to
    /// equalize outcomes. Returns `None` for single-selection markets,
    /// already-balanced books, and imbalances too small to bother with.
    ///
    /// The suggested price is the assumed even-money level; callers should
    /// reprice from a live market book before submitting.
    #[must_use]
    pub fn hedge_requirement(&self, positions: &[Position]) -> Option<HedgeInstruction> {
        // Net exposure per (market, selection).
        let mut by_market: HashMap<&str, HashMap<&str, Decimal>> = HashMap::new();
        for pos in positions {
            if pos.current_size == Decimal::ZERO {
                continue;
            }
            let exposure = match pos.side {
                Side::Back => pos.current_size,
                Side::Lay => -pos.liability(),
            };
            *by_market
                .entry(pos.market_id.as_str())
                .or_default()
                .entry(pos.selection_id.as_str())
                .or_default() += exposure;
        }

        let mut best: Option<(Decimal, &str, &str, Decimal)> = None;
        for (market_id, selections) in &by_market {
            if selections.len() < 2 {
                continue;
            }
            let max = selections.values().copied().max()?;
            let min = selections.values().copied().min()?;
            let imbalance = max - min;
            if best.as_ref().map_or(true, |(b, ..)| imbalance > *b) {
                let heavy = selections.iter().find(|(_, &v)| v == max).map(|(k, _)| *k)?;
                best = Some((imbalance, *market_id, heavy, max));
            }
        }

        let (imbalance, market_id, selection_id, exposure) = best?;
        if imbalance < MIN_HEDGE_SIZE {
            return None;
        }

        // At even money, a lay of X on the heavy selection moves its outcome
        // down by X and every other outcome up by X, so half the imbalance
        // equalizes them.
        let side = if exposure > Decimal::ZERO {
            Side::Lay
        } else {
            Side::Back
        };
        Some(HedgeInstruction {
            market_id: market_id.to_string(),
            selection_id: selection_id.to_string(),
            side,
            size: imbalance / Decimal::TWO,
            price: Decimal::TWO,
            reason: format!("Balance {imbalance} exposure imbalance in {market_id}"),
            urgency: Urgency::Medium,
        })
    }

    /// P&L sensitivity to a unit price move: the open size, signed by side
    /// (positive for back, negative for lay). Exact for exchange bets, so no
    /// finite differencing is needed.
    #[must_use]
    pub fn delta(position: &Position) -> Decimal {
        match position.side {
            Side::Back => position.current_size,
            Side::Lay => -position.current_size,
        }
    }

    /// Heuristic time-decay score, not a real options greek: a linear decay
    /// per hour that accelerates as the event approaches. Treat it as a
    /// ranking signal only.
    #[must_use]
    pub fn theta(position: &Position, seconds_to_settlement: i64) -> Decimal {
        if position.current_size == Decimal::ZERO || seconds_to_settlement <= 0 {
            return Decimal::ZERO;
        }

        let hours = Decimal::from(seconds_to_settlement) / Decimal::from(3600);
        let multiplier = if hours < Decimal::ONE {
            Decimal::TWO
        } else if hours < Decimal::from(4) {
            Decimal::new(15, 1)
        } else {
            Decimal::ONE
        };
        let decay_rate = Decimal::new(1, 2); // 0.01 per hour

        -position.current_size * decay_rate * multiplier
    }

    /// Price at which closing the position nets to zero after commission.
    #[must_use]
    pub fn break_even_price(&self, position: &Position) -> Decimal {
        if position.current_size == Decimal::ZERO {
            return Decimal::ZERO;
        }
        match position.side {
            Side::Back => position.entry_price / (Decimal::ONE - self.commission_rate),
            Side::Lay => position.entry_price * (Decimal::ONE - self.commission_rate),
        }
    }

    /// Implied probability of decimal odds, clamped to 1 for odds at or
    /// below even money floor.
    #[must_use]
    pub fn implied_probability(decimal_odds: Decimal) -> Decimal {
        if decimal_odds <= Decimal::ONE {
            return Decimal::ONE;
        }
        (Decimal::ONE / decimal_odds).round_dp(4)
    }

    /// Fractional-Kelly stake for an estimated edge.
    ///
    /// Caps at 10% of bankroll and returns zero below a £2 minimum or when
    /// there is no edge.
    #[must_use]
    pub fn kelly_stake(
        probability: Decimal,
        odds: Decimal,
        bankroll: Decimal,
        kelly_fraction: Decimal,
    ) -> Decimal {
        if probability <= Decimal::ZERO || probability >= Decimal::ONE || odds <= Decimal::ONE {
            return Decimal::ZERO;
        }

        let edge = probability * odds - Decimal::ONE;
        if edge <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let kelly = edge / (odds - Decimal::ONE) * kelly_fraction;
        let max_stake = bankroll * Decimal::new(1, 1); // 10% of bankroll
        let stake = (bankroll * kelly).min(max_stake);

        if stake < Decimal::TWO {
            Decimal::ZERO
        } else {
            stake.round_dp(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(side: Side, entry_price: Decimal, size: Decimal) -> Position {
        let now = Utc::now();
        Position {
            position_id: "p1".to_string(),
            market_id: "1.234".to_string(),
            selection_id: "101".to_string(),
            side,
            entry_price,
            entry_size: size,
            entry_time: now,
            current_size: size,
            exit_price: None,
            exit_size: Decimal::ZERO,
            last_update: now,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            commission: Decimal::ZERO,
            status: PositionStatus::Open,
            provider: "betfair".to_string(),
            strategy: None,
        }
    }

    #[test]
    fn back_pnl_rises_with_price() {
        let calc = Calculator::default();
        let pos = position(Side::Back, dec!(2.0), dec!(10));
        let (realized, unrealized) = calc.pnl(&pos, dec!(2.5), false);
        assert_eq!(realized, Decimal::ZERO);
        assert_eq!(unrealized, dec!(5.0));
    }

    #[test]
    fn lay_pnl_rises_as_price_shortens() {
        let calc = Calculator::default();
        let pos = position(Side::Lay, dec!(3.0), dec!(8));
        let (_, unrealized) = calc.pnl(&pos, dec!(2.9), false);
        assert_eq!(unrealized, dec!(0.8));
    }

    #[test]
    fn commission_only_reduces_profit() {
        let calc = Calculator::default();
        let pos = position(Side::Back, dec!(2.0), dec!(10));
        let (_, with) = calc.pnl(&pos, dec!(2.5), true);
        assert_eq!(with, dec!(4.90));

        // A losing position pays no commission.
        let (_, losing) = calc.pnl(&pos, dec!(1.5), true);
        assert_eq!(losing, dec!(-5.0));
    }

    #[test]
    fn hedge_recommends_lay_on_heavy_selection() {
        // Scenario: back 50 on A, back 10 on B in the same market.
        let calc = Calculator::default();
        let mut a = position(Side::Back, dec!(2.0), dec!(50));
        a.selection_id = "A".to_string();
        let mut b = position(Side::Back, dec!(2.0), dec!(10));
        b.position_id = "p2".to_string();
        b.selection_id = "B".to_string();

        let hedge = calc.hedge_requirement(&[a, b]).unwrap();
        assert_eq!(hedge.selection_id, "A");
        assert_eq!(hedge.side, Side::Lay);
        assert_eq!(hedge.size, dec!(20));
    }

    #[test]
    fn no_hedge_for_single_position_market() {
        let calc = Calculator::default();
        let pos = position(Side::Back, dec!(2.0), dec!(50));
        assert!(calc.hedge_requirement(&[pos]).is_none());
    }

    #[test]
    fn no_hedge_for_small_imbalance() {
        let calc = Calculator::default();
        let mut a = position(Side::Back, dec!(2.0), dec!(12));
        a.selection_id = "A".to_string();
        let mut b = position(Side::Back, dec!(2.0), dec!(10));
        b.position_id = "p2".to_string();
        b.selection_id = "B".to_string();

        assert!(calc.hedge_requirement(&[a, b]).is_none());
    }

    #[test]
    fn delta_is_signed_open_size() {
        let back = position(Side::Back, dec!(2.0), dec!(10));
        let lay = position(Side::Lay, dec!(2.0), dec!(10));
        assert_eq!(Calculator::delta(&back), dec!(10));
        assert_eq!(Calculator::delta(&lay), dec!(-10));
    }

    #[test]
    fn theta_accelerates_near_the_event() {
        let pos = position(Side::Back, dec!(2.0), dec!(10));
        let far = Calculator::theta(&pos, 8 * 3600);
        let near = Calculator::theta(&pos, 1800);
        assert_eq!(far, dec!(-0.10));
        assert_eq!(near, dec!(-0.20));
        assert_eq!(Calculator::theta(&pos, 0), Decimal::ZERO);
    }

    #[test]
    fn break_even_accounts_for_commission_by_side() {
        let calc = Calculator::default();
        let back = position(Side::Back, dec!(2.0), dec!(10));
        let lay = position(Side::Lay, dec!(2.0), dec!(10));
        assert!(calc.break_even_price(&back) > dec!(2.0));
        assert!(calc.break_even_price(&lay) < dec!(2.0));
    }

    #[test]
    fn kelly_stake_requires_an_edge() {
        // 60% at evens is a healthy edge.
        let stake = Calculator::kelly_stake(dec!(0.6), dec!(2.0), dec!(1000), dec!(0.25));
        assert_eq!(stake, dec!(50.00));

        // 40% at evens has none.
        let none = Calculator::kelly_stake(dec!(0.4), dec!(2.0), dec!(1000), dec!(0.25));
        assert_eq!(none, Decimal::ZERO);
    }

    #[test]
    fn implied_probability_inverts_odds() {
        assert_eq!(Calculator::implied_probability(dec!(4.0)), dec!(0.25));
        assert_eq!(Calculator::implied_probability(dec!(1.0)), Decimal::ONE);
    }
}
