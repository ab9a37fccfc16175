//! Position ledger: open/closed positions, average prices, and P&L.
//!
//! The ledger is the single serialization domain for position state. All
//! mutations (`open_position`, `close_position`, `update_position_price`)
//! run under one write lock so no reader can observe a half-updated
//! position; aggregate queries snapshot under the read lock and release it
//! before returning. Nothing in here performs I/O.
//!
//! P&L accounting: `realized_pnl` and `unrealized_pnl` are gross figures;
//! commission is accrued separately (on profitable closes) and applied when
//! building net statements.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::events::Side;
use crate::reports::{MarketExposure, PnLStatement};

/// Derived position status. Never set independently of the sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    PartiallyClosed,
    Closed,
}

impl PositionStatus {
    /// Pure function of the sizes: open while nothing has exited, closed
    /// when nothing remains.
    #[must_use]
    pub fn from_sizes(entry_size: Decimal, current_size: Decimal) -> Self {
        if current_size == Decimal::ZERO {
            Self::Closed
        } else if current_size < entry_size {
            Self::PartiallyClosed
        } else {
            Self::Open
        }
    }
}

/// A single open-or-closed exposure in one market/selection.
///
/// Invariant: `entry_size == current_size + exit_size` at all times.
/// Average prices are weighted means recomputed on each fill, never
/// overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    pub market_id: String,
    pub selection_id: String,
    pub side: Side,

    /// Weighted average entry price.
    pub entry_price: Decimal,
    /// Cumulative size ever entered.
    pub entry_size: Decimal,
    pub entry_time: DateTime<Utc>,

    /// Size still open.
    pub current_size: Decimal,
    /// Weighted average of exits; `None` until the first exit.
    pub exit_price: Option<Decimal>,
    /// Cumulative size exited.
    pub exit_size: Decimal,
    pub last_update: DateTime<Utc>,

    /// Gross realized P&L (before commission).
    pub realized_pnl: Decimal,
    /// Gross unrealized P&L for the open remainder.
    pub unrealized_pnl: Decimal,
    /// Commission accrued on closes; always >= 0.
    pub commission: Decimal,

    pub status: PositionStatus,

    pub provider: String,
    pub strategy: Option<String>,
}

impl Position {
    /// Worst-case loss of the open remainder: stake for a back position,
    /// `(entry_price - 1) * stake` for a lay position.
    #[must_use]
    pub fn liability(&self) -> Decimal {
        match self.side {
            Side::Back => self.current_size,
            Side::Lay => (self.entry_price - Decimal::ONE) * self.current_size,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status != PositionStatus::Closed
    }

    fn validate(price: Decimal, size: Decimal) -> Result<(), LedgerError> {
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "price",
                value: price,
            });
        }
        if size <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "size",
                value: size,
            });
        }
        Ok(())
    }
}

/// Ratio of largest to smallest selection exposure above which a hedge is
/// recommended.
const HEDGE_IMBALANCE_RATIO: Decimal = Decimal::from_parts(15, 0, 0, false, 1); // 1.5

#[derive(Debug, Default)]
struct LedgerState {
    positions: HashMap<String, Position>,
    /// Position ids in insertion order of first fill, for deterministic
    /// iteration.
    order: Vec<String>,
    /// market_id -> position ids.
    market_index: HashMap<String, Vec<String>>,
    /// order_id -> position_id, for venue reconciliation.
    order_to_position: HashMap<String, String>,

    /// Net realized P&L (after commission) accumulated from closes.
    daily_pnl: Decimal,
    total_commission: Decimal,
    pnl_by_market: HashMap<String, Decimal>,
    pnl_by_strategy: HashMap<String, Decimal>,
}

/// Owns all positions and computes P&L and exposure aggregates.
///
/// Thread-safe; interior `parking_lot::RwLock` keeps every read-modify-write
/// sequence in a single critical section.
pub struct PositionLedger {
    state: RwLock<LedgerState>,
    commission_rate: Decimal,
}

impl std::fmt::Debug for PositionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("PositionLedger")
            .field("positions", &state.positions.len())
            .field("daily_pnl", &state.daily_pnl)
            .field("commission_rate", &self.commission_rate)
            .finish()
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        // Betfair's standard 2% commission on winnings.
        Self::new(Decimal::new(2, 2))
    }
}

impl PositionLedger {
    #[must_use]
    pub fn new(commission_rate: Decimal) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            commission_rate,
        }
    }

    #[must_use]
    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    /// Opens a new position or merges the fill into an existing open
    /// position on the same (market, selection, side).
    ///
    /// On merge the average entry price becomes the size-weighted mean of
    /// the old position and the new fill.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidQuantity` if `price` or `size` is not positive.
    #[allow(clippy::too_many_arguments)]
    pub fn open_position(
        &self,
        market_id: &str,
        selection_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        order_id: &str,
        provider: &str,
        strategy: Option<&str>,
    ) -> Result<Position, LedgerError> {
        Position::validate(price, size)?;

        let mut state = self.state.write();

        let existing_id = state.positions.values().find_map(|p| {
            (p.market_id == market_id
                && p.selection_id == selection_id
                && p.side == side
                && p.is_open())
            .then(|| p.position_id.clone())
        });

        let position = if let Some(id) = existing_id {
            let pos = state
                .positions
                .get_mut(&id)
                .expect("indexed position exists");
            let total_value = pos.entry_price * pos.current_size + price * size;
            let total_size = pos.current_size + size;
            pos.entry_price = total_value / total_size;
            pos.entry_size += size;
            pos.current_size += size;
            pos.last_update = Utc::now();
            debug!(
                position_id = %pos.position_id,
                avg_price = %pos.entry_price,
                size = %pos.current_size,
                "Merged fill into existing position"
            );
            pos.clone()
        } else {
            let now = Utc::now();
            let position = Position {
                position_id: Uuid::new_v4().to_string(),
                market_id: market_id.to_string(),
                selection_id: selection_id.to_string(),
                side,
                entry_price: price,
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
                provider: provider.to_string(),
                strategy: strategy.map(ToString::to_string),
            };
            state.order.push(position.position_id.clone());
            state
                .market_index
                .entry(market_id.to_string())
                .or_default()
                .push(position.position_id.clone());
            state
                .positions
                .insert(position.position_id.clone(), position.clone());
            info!(
                position_id = %position.position_id,
                market_id, selection_id, %side, %price, %size,
                "Opened position"
            );
            position
        };

        state
            .order_to_position
            .insert(order_id.to_string(), position.position_id.clone());

        Ok(position)
    }

    /// Closes part or all of a position at the given price.
    ///
    /// Realized P&L for the closed portion is side-aware:
    /// `(price - entry) * size` for back, `(entry - price) * size` for lay.
    /// Commission is charged on profitable closes and accrued separately
    /// from the gross realized figure.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidQuantity` for a non-positive price or size
    /// - `LedgerError::PositionNotFound` if unknown or already fully closed
    /// - `LedgerError::InsufficientSize` if `size` exceeds the open remainder
    pub fn close_position(
        &self,
        position_id: &str,
        price: Decimal,
        size: Option<Decimal>,
    ) -> Result<Position, LedgerError> {
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "price",
                value: price,
            });
        }

        let mut state = self.state.write();

        let pos = state
            .positions
            .get_mut(position_id)
            .filter(|p| p.is_open())
            .ok_or_else(|| LedgerError::PositionNotFound(position_id.to_string()))?;

        let close_size = size.unwrap_or(pos.current_size);
        if close_size <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity {
                field: "size",
                value: close_size,
            });
        }
        if close_size > pos.current_size {
            return Err(LedgerError::InsufficientSize {
                requested: close_size,
                available: pos.current_size,
            });
        }

        let gross_pnl = match pos.side {
            Side::Back => (price - pos.entry_price) * close_size,
            Side::Lay => (pos.entry_price - price) * close_size,
        };
        let commission = if gross_pnl > Decimal::ZERO {
            gross_pnl * self.commission_rate
        } else {
            Decimal::ZERO
        };
        let net_pnl = gross_pnl - commission;

        // Weighted-average exit price across all closes.
        pos.exit_price = Some(match pos.exit_price {
            Some(prev) => (prev * pos.exit_size + price * close_size) / (pos.exit_size + close_size),
            None => price,
        });
        pos.exit_size += close_size;
        pos.current_size -= close_size;
        pos.realized_pnl += gross_pnl;
        pos.commission += commission;
        pos.status = PositionStatus::from_sizes(pos.entry_size, pos.current_size);
        if pos.status == PositionStatus::Closed {
            pos.unrealized_pnl = Decimal::ZERO;
        }
        pos.last_update = Utc::now();

        let closed = pos.clone();

        state.daily_pnl += net_pnl;
        state.total_commission += commission;
        *state
            .pnl_by_market
            .entry(closed.market_id.clone())
            .or_default() += net_pnl;
        if let Some(strategy) = &closed.strategy {
            *state.pnl_by_strategy.entry(strategy.clone()).or_default() += net_pnl;
        }

        info!(
            position_id,
            %price,
            size = %close_size,
            pnl = %gross_pnl,
            status = ?closed.status,
            "Closed position"
        );

        Ok(closed)
    }

    /// Recomputes unrealized P&L for the open remainder at the given market
    /// price. Does not mutate sizes; called on every price tick, so it is
    /// O(1) and never blocks on I/O.
    ///
    /// # Errors
    ///
    /// - `LedgerError::PositionNotFound` for an unknown id
    /// - `LedgerError::PositionClosed` if nothing remains open
    pub fn update_position_price(
        &self,
        position_id: &str,
        current_price: Decimal,
    ) -> Result<Position, LedgerError> {
        let mut state = self.state.write();

        let pos = state
            .positions
            .get_mut(position_id)
            .ok_or_else(|| LedgerError::PositionNotFound(position_id.to_string()))?;

        if pos.current_size == Decimal::ZERO {
            return Err(LedgerError::PositionClosed(position_id.to_string()));
        }

        pos.unrealized_pnl = match pos.side {
            Side::Back => (current_price - pos.entry_price) * pos.current_size,
            Side::Lay => (pos.entry_price - current_price) * pos.current_size,
        };
        pos.last_update = Utc::now();

        Ok(pos.clone())
    }

    #[must_use]
    pub fn get_position(&self, position_id: &str) -> Option<Position> {
        self.state.read().positions.get(position_id).cloned()
    }

    /// The position a venue order was booked into, if known.
    #[must_use]
    pub fn position_for_order(&self, order_id: &str) -> Option<Position> {
        let state = self.state.read();
        let id = state.order_to_position.get(order_id)?;
        state.positions.get(id).cloned()
    }

    /// Open and partially closed positions in insertion order of first fill.
    #[must_use]
    pub fn get_open_positions(&self) -> Vec<Position> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.positions.get(id))
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }

    /// Every position ever opened, in insertion order. Closed positions are
    /// never deleted; they stay queryable for reporting.
    #[must_use]
    pub fn get_all_positions(&self) -> Vec<Position> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.positions.get(id))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get_market_positions(&self, market_id: &str) -> Vec<Position> {
        let state = self.state.read();
        state
            .market_index
            .get(market_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.positions.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Aggregate exposure for one market, computed on demand from its open
    /// positions. Returns `None` when the market has no open positions.
    #[must_use]
    pub fn market_exposure(&self, market_id: &str) -> Option<MarketExposure> {
        let positions = self.get_market_positions(market_id);
        Self::exposure_from_positions(market_id, &positions)
    }

    /// Total portfolio exposure: the sum of each market's worst-case loss.
    #[must_use]
    pub fn total_exposure(&self) -> Decimal {
        let state = self.state.read();
        let markets: Vec<String> = state.market_index.keys().cloned().collect();
        drop(state);

        markets
            .iter()
            .filter_map(|m| self.market_exposure(m))
            .map(|e| e.max_loss)
            .sum()
    }

    /// All market exposures with open positions, in market-index order.
    #[must_use]
    pub fn all_market_exposures(&self) -> Vec<MarketExposure> {
        let state = self.state.read();
        let mut markets: Vec<String> = state.market_index.keys().cloned().collect();
        drop(state);
        markets.sort();

        markets
            .iter()
            .filter_map(|m| self.market_exposure(m))
            .collect()
    }

    /// Net realized P&L (after commission) accumulated since the last reset.
    #[must_use]
    pub fn daily_pnl(&self) -> Decimal {
        self.state.read().daily_pnl
    }

    /// Commission accrued over the ledger's lifetime.
    #[must_use]
    pub fn total_commission(&self) -> Decimal {
        self.state.read().total_commission
    }

    /// Resets the daily P&L accumulators at the start of a trading day.
    pub fn reset_daily_pnl(&self) {
        let mut state = self.state.write();
        state.daily_pnl = Decimal::ZERO;
        info!("Daily P&L accumulator reset");
    }

    /// P&L statement for positions entered within the trailing period.
    ///
    /// Win rate counts fully closed positions only: winners are those with
    /// positive gross realized P&L.
    #[must_use]
    pub fn get_pnl_statement(&self, period: Duration) -> PnLStatement {
        let state = self.state.read();
        let now = Utc::now();
        let period_start = now - period;

        let in_period: Vec<&Position> = state
            .positions
            .values()
            .filter(|p| p.entry_time >= period_start)
            .collect();

        let closed: Vec<&&Position> = in_period
            .iter()
            .filter(|p| p.status == PositionStatus::Closed)
            .collect();
        let wins: Vec<Decimal> = closed
            .iter()
            .filter(|p| p.realized_pnl > Decimal::ZERO)
            .map(|p| p.realized_pnl)
            .collect();
        let losses: Vec<Decimal> = closed
            .iter()
            .filter(|p| p.realized_pnl < Decimal::ZERO)
            .map(|p| p.realized_pnl.abs())
            .collect();

        let num_closed = closed.len();
        let win_rate = if num_closed > 0 {
            Decimal::from(wins.len()) / Decimal::from(num_closed) * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let avg_win = if wins.is_empty() {
            Decimal::ZERO
        } else {
            wins.iter().copied().sum::<Decimal>() / Decimal::from(wins.len())
        };
        let avg_loss = if losses.is_empty() {
            Decimal::ZERO
        } else {
            losses.iter().copied().sum::<Decimal>() / Decimal::from(losses.len())
        };

        let realized: Decimal = in_period.iter().map(|p| p.realized_pnl).sum();
        let unrealized: Decimal = in_period.iter().map(|p| p.unrealized_pnl).sum();
        let commission: Decimal = in_period.iter().map(|p| p.commission).sum();
        let gross = realized + unrealized;

        PnLStatement {
            period_start,
            period_end: now,
            gross_pnl: gross,
            commission,
            net_pnl: gross - commission,
            realized_pnl: realized,
            unrealized_pnl: unrealized,
            pnl_by_market: state.pnl_by_market.clone(),
            pnl_by_strategy: state.pnl_by_strategy.clone(),
            num_trades: num_closed,
            win_rate,
            avg_win,
            avg_loss,
            total_volume: in_period.iter().map(|p| p.entry_size).sum(),
        }
    }

    /// Seeds the ledger with positions loaded from the persistence adapter.
    /// Intended for startup; existing entries with the same id are replaced.
    pub fn restore(&self, positions: Vec<Position>) {
        let mut state = self.state.write();
        for position in positions {
            let id = position.position_id.clone();
            if !state.order.contains(&id) {
                state.order.push(id.clone());
                state
                    .market_index
                    .entry(position.market_id.clone())
                    .or_default()
                    .push(id.clone());
            }
            state.positions.insert(id, position);
        }
        info!(count = state.positions.len(), "Restored positions");
    }

    fn exposure_from_positions(
        market_id: &str,
        positions: &[Position],
    ) -> Option<MarketExposure> {
        let open: Vec<&Position> = positions.iter().filter(|p| p.is_open()).collect();
        if open.is_empty() {
            return None;
        }

        let mut selection_exposures: HashMap<String, Decimal> = HashMap::new();
        let mut net_back_exposure = Decimal::ZERO;
        let mut net_lay_liability = Decimal::ZERO;

        for pos in &open {
            let exposure = pos.liability();
            match pos.side {
                Side::Back => net_back_exposure += exposure,
                Side::Lay => net_lay_liability += exposure,
            }
            *selection_exposures
                .entry(pos.selection_id.clone())
                .or_default() += exposure;
        }

        let max_selection = selection_exposures
            .values()
            .copied()
            .max()
            .unwrap_or(Decimal::ZERO);
        let max_loss = net_back_exposure.max(net_lay_liability).max(max_selection);

        // Hedge when one selection carries disproportionate exposure.
        let mut hedge_required = false;
        let mut hedge_amount = None;
        let mut hedge_selection = None;
        if selection_exposures.len() > 1 {
            let min_exposure = selection_exposures
                .values()
                .copied()
                .min()
                .unwrap_or(Decimal::ZERO);
            if max_selection > min_exposure * HEDGE_IMBALANCE_RATIO {
                hedge_required = true;
                hedge_amount = Some((max_selection - min_exposure) / Decimal::TWO);
                hedge_selection = selection_exposures
                    .iter()
                    .find(|(_, &v)| v == max_selection)
                    .map(|(k, _)| k.clone());
            }
        }

        Some(MarketExposure {
            market_id: market_id.to_string(),
            selection_exposures,
            net_back_exposure,
            net_lay_liability,
            max_loss,
            open_positions: open.len(),
            total_stake: open.iter().map(|p| p.current_size).sum(),
            hedge_required,
            hedge_amount,
            hedge_selection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> PositionLedger {
        PositionLedger::default()
    }

    fn open_back(ledger: &PositionLedger, price: Decimal, size: Decimal) -> Position {
        ledger
            .open_position("1.234", "101", Side::Back, price, size, "o1", "betfair", None)
            .unwrap()
    }

    #[test]
    fn rejects_non_positive_price_and_size() {
        let ledger = ledger();
        let err = ledger
            .open_position("1.234", "101", Side::Back, dec!(0), dec!(10), "o1", "betfair", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity { field: "price", .. }));

        let err = ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(-1), "o1", "betfair", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity { field: "size", .. }));
    }

    #[test]
    fn long_position_full_lifecycle() {
        // Scenario: back 10 @ 2.0, mark to 2.5, close 10 @ 2.5.
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        assert_eq!(pos.status, PositionStatus::Open);

        let pos = ledger
            .update_position_price(&pos.position_id, dec!(2.5))
            .unwrap();
        assert_eq!(pos.unrealized_pnl, dec!(5.0));

        let pos = ledger
            .close_position(&pos.position_id, dec!(2.5), Some(dec!(10)))
            .unwrap();
        assert_eq!(pos.realized_pnl, dec!(5.0));
        assert_eq!(pos.current_size, Decimal::ZERO);
        assert_eq!(pos.status, PositionStatus::Closed);
        assert_eq!(pos.unrealized_pnl, Decimal::ZERO);
        // 2% commission on the profitable close, tracked separately.
        assert_eq!(pos.commission, dec!(0.100));
    }

    #[test]
    fn lay_position_profits_when_price_shortens() {
        // Scenario: lay 8 @ 3.0, price drops to 2.9.
        let ledger = ledger();
        let pos = ledger
            .open_position("1.234", "101", Side::Lay, dec!(3.0), dec!(8), "o1", "betfair", None)
            .unwrap();

        let pos = ledger
            .update_position_price(&pos.position_id, dec!(2.9))
            .unwrap();
        assert_eq!(pos.unrealized_pnl, dec!(0.8));
    }

    #[test]
    fn partial_close_keeps_remainder_open() {
        // Scenario: back 10 @ 2.0, close 4 @ 2.2.
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));

        let pos = ledger
            .close_position(&pos.position_id, dec!(2.2), Some(dec!(4)))
            .unwrap();
        assert_eq!(pos.realized_pnl, dec!(0.8));
        assert_eq!(pos.current_size, dec!(6));
        assert_eq!(pos.exit_size, dec!(4));
        assert_eq!(pos.status, PositionStatus::PartiallyClosed);
        assert_eq!(pos.exit_price, Some(dec!(2.2)));
    }

    #[test]
    fn size_invariant_holds_through_mutations() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        ledger
            .open_position("1.234", "101", Side::Back, dec!(3.0), dec!(10), "o2", "betfair", None)
            .unwrap();
        ledger
            .close_position(&pos.position_id, dec!(2.4), Some(dec!(7)))
            .unwrap();

        let pos = ledger.get_position(&pos.position_id).unwrap();
        assert_eq!(pos.entry_size, pos.current_size + pos.exit_size);
    }

    #[test]
    fn repeat_fill_merges_with_weighted_average() {
        let ledger = ledger();
        let first = open_back(&ledger, dec!(2.0), dec!(10));
        let merged = ledger
            .open_position("1.234", "101", Side::Back, dec!(3.0), dec!(10), "o2", "betfair", None)
            .unwrap();

        assert_eq!(merged.position_id, first.position_id);
        assert_eq!(merged.entry_price, dec!(2.5));
        assert_eq!(merged.entry_size, dec!(20));
        assert_eq!(merged.current_size, dec!(20));
    }

    #[test]
    fn opposite_side_gets_its_own_position() {
        let ledger = ledger();
        let back = open_back(&ledger, dec!(2.0), dec!(10));
        let lay = ledger
            .open_position("1.234", "101", Side::Lay, dec!(2.1), dec!(5), "o2", "betfair", None)
            .unwrap();
        assert_ne!(back.position_id, lay.position_id);
        assert_eq!(ledger.get_open_positions().len(), 2);
    }

    #[test]
    fn close_more_than_open_is_insufficient_size() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        let err = ledger
            .close_position(&pos.position_id, dec!(2.2), Some(dec!(11)))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientSize {
                requested: dec!(11),
                available: dec!(10),
            }
        );
    }

    #[test]
    fn closed_position_cannot_be_closed_again() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        ledger
            .close_position(&pos.position_id, dec!(2.2), None)
            .unwrap();
        let err = ledger
            .close_position(&pos.position_id, dec!(2.2), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::PositionNotFound(_)));
    }

    #[test]
    fn price_update_on_closed_position_errors() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        ledger
            .close_position(&pos.position_id, dec!(2.2), None)
            .unwrap();
        let err = ledger
            .update_position_price(&pos.position_id, dec!(2.3))
            .unwrap_err();
        assert!(matches!(err, LedgerError::PositionClosed(_)));
    }

    #[test]
    fn price_update_is_idempotent() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        let first = ledger
            .update_position_price(&pos.position_id, dec!(2.3))
            .unwrap();
        let second = ledger
            .update_position_price(&pos.position_id, dec!(2.3))
            .unwrap();
        assert_eq!(first.unrealized_pnl, second.unrealized_pnl);
    }

    #[test]
    fn back_unrealized_is_monotone_in_price() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));
        let mut prev = Decimal::MIN;
        for price in [dec!(1.5), dec!(2.0), dec!(2.5), dec!(3.0), dec!(5.0)] {
            let p = ledger.update_position_price(&pos.position_id, price).unwrap();
            assert!(p.unrealized_pnl > prev);
            prev = p.unrealized_pnl;
        }
    }

    #[test]
    fn lay_unrealized_is_antitone_in_price() {
        let ledger = ledger();
        let pos = ledger
            .open_position("1.234", "101", Side::Lay, dec!(3.0), dec!(8), "o1", "betfair", None)
            .unwrap();
        let mut prev = Decimal::MAX;
        for price in [dec!(1.5), dec!(2.0), dec!(2.5), dec!(3.0), dec!(5.0)] {
            let p = ledger.update_position_price(&pos.position_id, price).unwrap();
            assert!(p.unrealized_pnl < prev);
            prev = p.unrealized_pnl;
        }
    }

    #[test]
    fn open_positions_keep_insertion_order() {
        let ledger = ledger();
        for (i, selection) in ["101", "102", "103"].iter().enumerate() {
            ledger
                .open_position(
                    "1.234",
                    selection,
                    Side::Back,
                    dec!(2.0),
                    dec!(10),
                    &format!("o{i}"),
                    "betfair",
                    None,
                )
                .unwrap();
        }
        let open = ledger.get_open_positions();
        let selections: Vec<&str> = open.iter().map(|p| p.selection_id.as_str()).collect();
        assert_eq!(selections, vec!["101", "102", "103"]);
    }

    #[test]
    fn market_exposure_aggregates_back_and_lay() {
        let ledger = ledger();
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();
        ledger
            .open_position("1.234", "102", Side::Lay, dec!(3.0), dec!(5), "o2", "betfair", None)
            .unwrap();

        let exposure = ledger.market_exposure("1.234").unwrap();
        assert_eq!(exposure.net_back_exposure, dec!(50));
        assert_eq!(exposure.net_lay_liability, dec!(10));
        assert_eq!(exposure.max_loss, dec!(50));
        assert_eq!(exposure.open_positions, 2);
        // 50 vs 10 exceeds the 1.5x imbalance ratio.
        assert!(exposure.hedge_required);
        assert_eq!(exposure.hedge_selection.as_deref(), Some("101"));
        assert_eq!(exposure.hedge_amount, Some(dec!(20)));
    }

    #[test]
    fn pnl_statement_win_rate_counts_closed_positions() {
        let ledger = ledger();
        let a = open_back(&ledger, dec!(2.0), dec!(10));
        ledger.close_position(&a.position_id, dec!(2.5), None).unwrap();

        let b = ledger
            .open_position("1.235", "201", Side::Back, dec!(2.0), dec!(10), "o2", "betfair", None)
            .unwrap();
        ledger.close_position(&b.position_id, dec!(1.5), None).unwrap();

        let statement = ledger.get_pnl_statement(Duration::hours(24));
        assert_eq!(statement.num_trades, 2);
        assert_eq!(statement.win_rate, dec!(50));
        assert_eq!(statement.avg_win, dec!(5.0));
        assert_eq!(statement.avg_loss, dec!(5.0));
        assert_eq!(statement.realized_pnl, dec!(0.0));
        // Only the winning close paid commission.
        assert_eq!(statement.commission, dec!(0.100));
    }

    #[test]
    fn restore_reinstates_saved_positions() {
        let ledger = ledger();
        let pos = open_back(&ledger, dec!(2.0), dec!(10));

        let other = PositionLedger::default();
        other.restore(vec![pos.clone()]);
        let loaded = other.get_position(&pos.position_id).unwrap();
        assert_eq!(loaded.entry_price, pos.entry_price);
        assert_eq!(other.get_open_positions().len(), 1);
    }
}
