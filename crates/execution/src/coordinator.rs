//! Trade coordinator: the single entry point that ties risk checks, venue
//! execution, position booking, automated triggers, and persistence into
//! one flow.
//!
//! Ordering contract for `place_trade`: risk check, then venue submission,
//! then ledger booking with the venue's executed values, then best-effort
//! persistence. The risk check and the booking are separate critical
//! sections; a burst of concurrent trades can jointly overshoot a limit
//! that each one individually respects. The next check sees the booked
//! state and rejects, so the overshoot is bounded by in-flight volume.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use bettex_core::calculator::Calculator;
use bettex_core::events::{AlertSeverity, OrderType, PriceTick, RiskAlert, TradeInstruction};
use bettex_core::position::{Position, PositionLedger};
use bettex_core::reports::{ExposureReport, PnLStatement};
use bettex_core::traits::{AlertSink, ExecutionVenue, PositionStore};
use bettex_risk::{AutoTradeManager, RiskManager};

/// Outcome of a trade request. Rejection and venue failure are ordinary
/// results, not errors; `Err` is reserved for transport faults.
#[derive(Debug, Clone)]
pub enum TradeOutcome {
    /// Booked into the ledger with the venue's executed values.
    Executed(Position),
    /// Blocked by a risk rule before reaching the venue.
    Rejected { reason: String },
    /// Reached the venue but nothing matched.
    Failed { reason: String },
}

impl TradeOutcome {
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }
}

/// Running counters for the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeStats {
    pub requested: usize,
    pub executed: usize,
    pub rejected: usize,
    pub failed: usize,
    pub triggered_closes: usize,
}

/// Owns the full trade lifecycle. One instance per account.
pub struct TradeCoordinator {
    ledger: Arc<PositionLedger>,
    risk: Arc<RiskManager>,
    automated: Arc<AutoTradeManager>,
    venue: Arc<dyn ExecutionVenue>,
    store: Arc<dyn PositionStore>,
    sink: Arc<dyn AlertSink>,
    calculator: Calculator,
    provider: String,
    /// Last seen price per selection, fed by `on_price_tick`.
    prices: RwLock<HashMap<String, Decimal>>,
    account_balance: RwLock<Decimal>,
    stats: RwLock<TradeStats>,
}

impl TradeCoordinator {
    #[must_use]
    pub fn new(
        ledger: Arc<PositionLedger>,
        risk: Arc<RiskManager>,
        automated: Arc<AutoTradeManager>,
        venue: Arc<dyn ExecutionVenue>,
        store: Arc<dyn PositionStore>,
        sink: Arc<dyn AlertSink>,
        provider: &str,
    ) -> Self {
        let calculator = Calculator::new(ledger.commission_rate());
        Self {
            ledger,
            risk,
            automated,
            venue,
            store,
            sink,
            calculator,
            provider: provider.to_string(),
            prices: RwLock::new(HashMap::new()),
            account_balance: RwLock::new(Decimal::ZERO),
            stats: RwLock::new(TradeStats::default()),
        }
    }

    /// Updates the cached account balance from the provider layer.
    pub fn set_account_balance(&self, balance: Decimal) {
        *self.account_balance.write() = balance;
    }

    /// Restores the ledger from persisted state; call once at startup
    /// before any trading.
    pub async fn restore_positions(&self) -> Result<usize> {
        let positions = self
            .store
            .load_open_positions()
            .await
            .context("loading persisted positions")?;
        let count = positions.len();
        self.ledger.restore(positions);
        info!(count, "Restored open positions");
        Ok(count)
    }

    /// Runs a trade end to end: risk check, venue submission, booking,
    /// persistence. Booking always uses the venue's executed size and
    /// price, never the requested values.
    pub async fn place_trade(&self, instruction: TradeInstruction) -> Result<TradeOutcome> {
        self.stats.write().requested += 1;
        let balance = *self.account_balance.read();

        let decision = self.risk.check_trade(&instruction, balance);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "risk check failed".to_string());
            info!(
                market_id = %instruction.market_id,
                selection_id = %instruction.selection_id,
                %reason,
                "Trade rejected"
            );
            self.stats.write().rejected += 1;
            return Ok(TradeOutcome::Rejected { reason });
        }

        let report = self
            .venue
            .submit_order(&instruction)
            .await
            .context("submitting order to venue")?;

        if !report.is_successful() {
            let reason = report
                .error
                .unwrap_or_else(|| format!("order {:?} with no fill", report.status));
            warn!(
                market_id = %instruction.market_id,
                order_id = %report.order_id,
                %reason,
                "Order not filled"
            );
            self.stats.write().failed += 1;
            return Ok(TradeOutcome::Failed { reason });
        }

        let position = self.ledger.open_position(
            &instruction.market_id,
            &instruction.selection_id,
            instruction.side,
            report.executed_price,
            report.executed_size,
            &report.order_id,
            &self.provider,
            instruction.strategy.as_deref(),
        )?;
        self.stats.write().executed += 1;
        info!(
            position_id = %position.position_id,
            market_id = %position.market_id,
            side = %position.side,
            size = %report.executed_size,
            price = %report.executed_price,
            "Trade executed and booked"
        );

        self.persist(&position).await;

        // Advice only; acting on it is `hedge_market`'s job.
        let _ = self.risk.check_market_hedge(&instruction.market_id);

        // A fill changes the book, so protective orders armed since the
        // last tick get a chance to fire against the cached prices.
        self.sweep_triggers().await;

        Ok(TradeOutcome::Executed(position))
    }

    /// Closes part or all of a position at `price` by submitting the
    /// opposite-side bet and booking the fill. Feeds the realized result
    /// into the daily loss tally.
    pub async fn close_position(
        &self,
        position_id: &str,
        price: Decimal,
        size: Option<Decimal>,
    ) -> Result<Position> {
        let position = self
            .ledger
            .get_position(position_id)
            .ok_or_else(|| anyhow::anyhow!("position {position_id} not found"))?;

        let close_size = size.unwrap_or(position.current_size);
        let instruction = TradeInstruction {
            market_id: position.market_id.clone(),
            selection_id: position.selection_id.clone(),
            side: position.side.opposite(),
            size: close_size,
            price,
            order_type: OrderType::Limit,
            strategy: position.strategy.clone(),
        };

        // Exits bypass check_trade: they only ever reduce exposure, and a
        // frozen book must still be closeable.
        let report = self
            .venue
            .submit_order(&instruction)
            .await
            .context("submitting closing order")?;
        if !report.is_successful() {
            anyhow::bail!(
                "closing order for {position_id} not filled: {:?}",
                report.status
            );
        }

        let before = position;
        let closed = self.ledger.close_position(
            position_id,
            report.executed_price,
            Some(report.executed_size),
        )?;

        let net = (closed.realized_pnl - before.realized_pnl)
            - (closed.commission - before.commission);
        self.risk.record_realized_pnl(net);

        if !closed.is_open() {
            self.automated.cancel_for_position(position_id);
        }
        self.persist(&closed).await;
        info!(
            position_id,
            size = %report.executed_size,
            price = %report.executed_price,
            net_pnl = %net,
            "Position closed"
        );
        Ok(closed)
    }

    /// Closes a position at its last seen market price, locking in the
    /// current value. Fails if no price has been seen for the selection.
    pub async fn cash_out_position(&self, position_id: &str) -> Result<Position> {
        let position = self
            .ledger
            .get_position(position_id)
            .ok_or_else(|| anyhow::anyhow!("position {position_id} not found"))?;
        let price = self
            .prices
            .read()
            .get(&position.selection_id)
            .copied()
            .ok_or_else(|| {
                anyhow::anyhow!("no market price seen for selection {}", position.selection_id)
            })?;
        self.close_position(position_id, price, None).await
    }

    /// Hedges the market a position belongs to, if its book is imbalanced.
    pub async fn hedge_position(&self, position_id: &str) -> Result<Option<TradeOutcome>> {
        let position = self
            .ledger
            .get_position(position_id)
            .ok_or_else(|| anyhow::anyhow!("position {position_id} not found"))?;
        self.hedge_market(&position.market_id).await
    }

    /// Places the offsetting bet a market's imbalance calls for, if any.
    /// Works regardless of the auto-hedge setting; this is the explicit
    /// path.
    pub async fn hedge_market(&self, market_id: &str) -> Result<Option<TradeOutcome>> {
        let positions = self.ledger.get_market_positions(market_id);
        let Some(hedge) = self.calculator.hedge_requirement(&positions) else {
            return Ok(None);
        };
        let price = self
            .prices
            .read()
            .get(&hedge.selection_id)
            .copied()
            .unwrap_or(hedge.price);
        let instruction = TradeInstruction {
            market_id: hedge.market_id,
            selection_id: hedge.selection_id,
            side: hedge.side,
            size: hedge.size,
            price,
            order_type: OrderType::Limit,
            strategy: Some("hedge".to_string()),
        };
        let outcome = self.place_trade(instruction).await?;
        Ok(Some(outcome))
    }

    /// Ingests a price tick: refreshes marks for every open position on
    /// the selection, then sweeps automated triggers and closes whatever
    /// fired. Trigger closes are exits, so they run even when frozen.
    pub async fn on_price_tick(&self, tick: PriceTick) -> Result<Vec<Position>> {
        self.prices
            .write()
            .insert(tick.selection_id.clone(), tick.price);

        for position in self.ledger.get_open_positions() {
            if position.selection_id == tick.selection_id {
                // A raced concurrent close is fine to skip.
                if let Err(e) = self
                    .ledger
                    .update_position_price(&position.position_id, tick.price)
                {
                    warn!(
                        position_id = %position.position_id,
                        error = %e,
                        "Skipped mark-to-market update"
                    );
                }
            }
        }

        Ok(self.sweep_triggers().await)
    }

    /// Evaluates automated orders against the cached prices and closes
    /// whatever fired. Trigger closes are exits, so they run even when
    /// frozen.
    async fn sweep_triggers(&self) -> Vec<Position> {
        let prices = self.prices.read().clone();
        let fired = self
            .automated
            .check_triggers(&self.ledger.get_open_positions(), &prices);

        let mut closed = Vec::with_capacity(fired.len());
        for order in fired {
            // An order only fires when its selection has a cached price.
            let Some(price) = prices.get(&order.selection_id).copied() else {
                continue;
            };
            self.sink.publish(
                RiskAlert::new(
                    AlertSeverity::Info,
                    "auto_trade",
                    format!(
                        "{:?} triggered at {} for {}",
                        order.kind, price, order.selection_id
                    ),
                )
                .with_market(&order.market_id)
                .with_position(&order.position_id),
            );
            match self.close_position(&order.position_id, price, None).await {
                Ok(position) => {
                    self.stats.write().triggered_closes += 1;
                    closed.push(position);
                }
                Err(e) => {
                    // The order is already consumed; the position stays
                    // open and needs manual attention.
                    error!(
                        position_id = %order.position_id,
                        error = %e,
                        "Failed to close position for triggered order"
                    );
                }
            }
        }
        closed
    }

    /// Snapshots the day's P&L statement to the store.
    pub async fn snapshot_daily_pnl(&self) -> Result<()> {
        let statement = self.ledger.get_pnl_statement(Duration::hours(24));
        let date = chrono::Utc::now().date_naive();
        self.store
            .save_daily_pnl(date, &statement)
            .await
            .context("saving daily P&L snapshot")
    }

    #[must_use]
    pub fn get_positions(&self) -> Vec<Position> {
        self.ledger.get_open_positions()
    }

    #[must_use]
    pub fn get_pnl_summary(&self, period: Duration) -> PnLStatement {
        self.ledger.get_pnl_statement(period)
    }

    #[must_use]
    pub fn get_risk_status(&self) -> ExposureReport {
        self.risk.get_exposure_report(*self.account_balance.read())
    }

    #[must_use]
    pub fn get_trade_stats(&self) -> TradeStats {
        *self.stats.read()
    }

    /// Convenience accessors for attaching protective orders to a booked
    /// position.
    pub fn arm_stop_loss(&self, position: &Position, trigger: Option<Decimal>) -> String {
        self.automated.create_stop_loss(position, trigger).id
    }

    pub fn arm_take_profit(&self, position: &Position, trigger: Option<Decimal>) -> String {
        self.automated.create_take_profit(position, trigger).id
    }

    /// Arms a linked stop-loss/take-profit bracket around a position.
    pub fn arm_bracket(
        &self,
        position: &Position,
        stop_trigger: Option<Decimal>,
        profit_trigger: Option<Decimal>,
    ) -> (String, String) {
        let stop = self.automated.create_stop_loss(position, stop_trigger);
        let profit = self.automated.create_take_profit(position, profit_trigger);
        self.automated.link_oco(&stop.id, &profit.id);
        (stop.id, profit.id)
    }

    async fn persist(&self, position: &Position) {
        if let Err(e) = self.store.save_position(position).await {
            // Ledger state is authoritative; persistence is best-effort.
            error!(
                position_id = %position.position_id,
                error = %e,
                "Failed to persist position"
            );
        }
    }
}
