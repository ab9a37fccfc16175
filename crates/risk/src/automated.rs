//! Automated order management: stop-loss, take-profit, trailing stops and
//! one-cancels-other pairs.
//!
//! Orders here are synthetic. Nothing rests at the venue; the manager holds
//! trigger levels locally and `check_triggers` compares them against each
//! price tick. A fired order is removed from the book and handed back to the
//! coordinator, which owns the actual close.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use bettex_core::config::AutomationConfig;
use bettex_core::events::Side;
use bettex_core::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AutomatedOrderKind {
    StopLoss,
    TakeProfit,
    /// Stop that ratchets with favorable price movement. `trail` is the
    /// distance maintained from the best price seen.
    TrailingStop { trail: Decimal },
}

/// A locally-held conditional exit for one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomatedOrder {
    pub id: String,
    pub position_id: String,
    pub market_id: String,
    pub selection_id: String,
    /// Side of the position being protected, not of the exit bet.
    pub side: Side,
    pub kind: AutomatedOrderKind,
    pub trigger_price: Decimal,
    /// Peer order cancelled when this one fires.
    pub oco_with: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AutomatedOrder {
    /// Whether `price` has reached the trigger. A back position loses as
    /// the price falls below entry, so its stop sits below entry and its
    /// target above; a lay position is the mirror image.
    fn is_triggered(&self, price: Decimal) -> bool {
        match (&self.kind, self.side) {
            (AutomatedOrderKind::StopLoss | AutomatedOrderKind::TrailingStop { .. }, Side::Back) => {
                price <= self.trigger_price
            }
            (AutomatedOrderKind::StopLoss | AutomatedOrderKind::TrailingStop { .. }, Side::Lay) => {
                price >= self.trigger_price
            }
            (AutomatedOrderKind::TakeProfit, Side::Back) => price >= self.trigger_price,
            (AutomatedOrderKind::TakeProfit, Side::Lay) => price <= self.trigger_price,
        }
    }
}

#[derive(Debug, Default)]
struct AutomatedState {
    orders: HashMap<String, AutomatedOrder>,
    /// Insertion order, for deterministic trigger evaluation.
    order: Vec<String>,
    by_position: HashMap<String, Vec<String>>,
}

/// Tracks conditional exits and evaluates them against price ticks.
#[derive(Debug, Default)]
pub struct AutoTradeManager {
    config: AutomationConfig,
    state: RwLock<AutomatedState>,
}

impl AutoTradeManager {
    /// Manager with the default 10% trigger offsets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: AutomationConfig) -> Self {
        Self {
            config,
            state: RwLock::default(),
        }
    }

    /// Arms a stop-loss for a position. `trigger_price` of `None` places
    /// the stop the configured fraction adverse of the entry price.
    pub fn create_stop_loss(
        &self,
        position: &Position,
        trigger_price: Option<Decimal>,
    ) -> AutomatedOrder {
        let pct = self.config.stop_loss_pct;
        let trigger = trigger_price.unwrap_or_else(|| match position.side {
            Side::Back => position.entry_price * (Decimal::ONE - pct),
            Side::Lay => position.entry_price * (Decimal::ONE + pct),
        });
        self.insert(position, AutomatedOrderKind::StopLoss, trigger)
    }

    /// Arms a take-profit. `trigger_price` of `None` places the target the
    /// configured fraction favorable of the entry price.
    pub fn create_take_profit(
        &self,
        position: &Position,
        trigger_price: Option<Decimal>,
    ) -> AutomatedOrder {
        let pct = self.config.take_profit_pct;
        let trigger = trigger_price.unwrap_or_else(|| match position.side {
            Side::Back => position.entry_price * (Decimal::ONE + pct),
            Side::Lay => position.entry_price * (Decimal::ONE - pct),
        });
        self.insert(position, AutomatedOrderKind::TakeProfit, trigger)
    }

    /// Arms a trailing stop `trail` away from the current price. The stop
    /// only ever tightens; adverse moves leave it where it is.
    pub fn create_trailing_stop(
        &self,
        position: &Position,
        trail: Decimal,
        current_price: Decimal,
    ) -> AutomatedOrder {
        let trigger = match position.side {
            Side::Back => current_price - trail,
            Side::Lay => current_price + trail,
        };
        self.insert(position, AutomatedOrderKind::TrailingStop { trail }, trigger)
    }

    /// Links two orders as a one-cancels-other pair. When either fires,
    /// `check_triggers` removes both in the same lock scope.
    pub fn link_oco(&self, order_a: &str, order_b: &str) -> bool {
        let mut state = self.state.write();
        if !state.orders.contains_key(order_a) || !state.orders.contains_key(order_b) {
            return false;
        }
        if let Some(a) = state.orders.get_mut(order_a) {
            a.oco_with = Some(order_b.to_string());
        }
        if let Some(b) = state.orders.get_mut(order_b) {
            b.oco_with = Some(order_a.to_string());
        }
        debug!(order_a, order_b, "Linked OCO pair");
        true
    }

    /// Cancels one order. Returns false if it was not found (already fired
    /// or cancelled). The OCO peer, if any, stays armed.
    pub fn cancel_order(&self, order_id: &str) -> bool {
        let mut state = self.state.write();
        let removed = state.orders.remove(order_id).is_some();
        if removed {
            state.order.retain(|id| id != order_id);
            for ids in state.by_position.values_mut() {
                ids.retain(|id| id != order_id);
            }
            info!(order_id, "Cancelled automated order");
        }
        removed
    }

    /// Cancels every order protecting a position; used when a position is
    /// closed manually. Returns how many were removed.
    pub fn cancel_for_position(&self, position_id: &str) -> usize {
        let mut state = self.state.write();
        let Some(ids) = state.by_position.remove(position_id) else {
            return 0;
        };
        for id in &ids {
            state.orders.remove(id);
        }
        state.order.retain(|id| !ids.contains(id));
        if !ids.is_empty() {
            info!(position_id, count = ids.len(), "Cancelled automated orders");
        }
        ids.len()
    }

    /// All armed orders in creation order.
    #[must_use]
    pub fn open_orders(&self) -> Vec<AutomatedOrder> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect()
    }

    #[must_use]
    pub fn orders_for_position(&self, position_id: &str) -> Vec<AutomatedOrder> {
        let state = self.state.read();
        state
            .by_position
            .get(position_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.orders.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Evaluates every armed order against the latest prices, returning the
    /// orders that fired. Fired orders and their OCO peers are removed
    /// before this returns. A selection with no price in `prices` is
    /// skipped, never treated as triggered. This function is total: bad or
    /// missing data can only delay a trigger, not fail the sweep.
    pub fn check_triggers(
        &self,
        positions: &[Position],
        prices: &HashMap<String, Decimal>,
    ) -> Vec<AutomatedOrder> {
        let open_ids: std::collections::HashSet<&str> = positions
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.position_id.as_str())
            .collect();

        let mut state = self.state.write();
        let mut fired = Vec::new();
        let mut remove = Vec::new();

        for id in state.order.clone() {
            if remove.contains(&id) {
                continue;
            }
            let Some(mut order) = state.orders.get(&id).cloned() else {
                continue;
            };
            if !open_ids.contains(order.position_id.as_str()) {
                // Position closed out from under the order; drop it.
                remove.push(id);
                continue;
            }
            let Some(&price) = prices.get(&order.selection_id) else {
                continue;
            };

            // Trailing stops ratchet before the trigger test.
            if let AutomatedOrderKind::TrailingStop { trail } = order.kind {
                let tightened = match order.side {
                    Side::Back => (price - trail).max(order.trigger_price),
                    Side::Lay => (price + trail).min(order.trigger_price),
                };
                if tightened != order.trigger_price {
                    order.trigger_price = tightened;
                    if let Some(stored) = state.orders.get_mut(&id) {
                        stored.trigger_price = tightened;
                    }
                }
            }

            if order.is_triggered(price) {
                info!(
                    order_id = %order.id,
                    position_id = %order.position_id,
                    kind = ?order.kind,
                    trigger = %order.trigger_price,
                    %price,
                    "Automated order triggered"
                );
                fired.push(order.clone());
                remove.push(id.clone());
                if let Some(peer) = order.oco_with.clone() {
                    remove.push(peer);
                }
            }
        }

        for id in &remove {
            if let Some(order) = state.orders.remove(id) {
                if let Some(ids) = state.by_position.get_mut(&order.position_id) {
                    ids.retain(|i| i != id);
                }
            }
        }
        state.order.retain(|id| !remove.contains(id));

        fired
    }

    fn insert(
        &self,
        position: &Position,
        kind: AutomatedOrderKind,
        trigger_price: Decimal,
    ) -> AutomatedOrder {
        let order = AutomatedOrder {
            id: Uuid::new_v4().to_string(),
            position_id: position.position_id.clone(),
            market_id: position.market_id.clone(),
            selection_id: position.selection_id.clone(),
            side: position.side,
            kind,
            trigger_price,
            oco_with: None,
            created_at: Utc::now(),
        };
        let mut state = self.state.write();
        state.order.push(order.id.clone());
        state
            .by_position
            .entry(order.position_id.clone())
            .or_default()
            .push(order.id.clone());
        state.orders.insert(order.id.clone(), order.clone());
        info!(
            order_id = %order.id,
            position_id = %order.position_id,
            kind = ?order.kind,
            trigger = %order.trigger_price,
            "Armed automated order"
        );
        order
    }
}
