//! Risk manager: limit enforcement, kill switch, and risk reporting.
//!
//! Two trading states: active and frozen. Freezing is terminal until an
//! explicit `reset_kill_switch` call so that resuming trading is always a
//! deliberate human decision. The frozen flag is read inside the same lock
//! scope as every `check_trade`, so activation applies immediately to every
//! later call, including ones already queued.
//!
//! `check_trade` and the eventual position booking are two separate critical
//! sections; two trades approved back-to-back can jointly exceed a limit
//! either alone would respect. That looseness is accepted at retail trade
//! rates and documented rather than fixed.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use bettex_core::calculator::Calculator;
use bettex_core::events::{AlertSeverity, RiskAlert, TradeInstruction};
use bettex_core::position::PositionLedger;
use bettex_core::reports::{ExposureReport, HedgeInstruction, RiskMetrics};
use bettex_core::traits::AlertSink;

use crate::limits::RiskLimits;

/// Outcome of a risk check. Rejection is an expected, frequent result of
/// normal operation, so it is a value, not an error.
#[derive(Debug, Clone)]
pub struct TradeDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl TradeDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn reject(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TradingState {
    Active,
    Frozen { reason: String },
}

#[derive(Debug)]
struct ManagerState {
    trading: TradingState,
    /// Net realized loss today, as a positive number.
    daily_loss: Decimal,
    active_breaches: Vec<String>,
    alert_history: Vec<RiskAlert>,
}

const ALERT_HISTORY_LIMIT: usize = 100;

/// Soft-warning threshold as a percentage of a limit.
const WARN_THRESHOLD_PCT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Enforces risk limits against current ledger state.
pub struct RiskManager {
    ledger: Arc<PositionLedger>,
    limits: RwLock<RiskLimits>,
    calculator: Calculator,
    auto_hedge: bool,
    sink: Arc<dyn AlertSink>,
    state: RwLock<ManagerState>,
}

impl std::fmt::Debug for RiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RiskManager")
            .field("trading", &state.trading)
            .field("daily_loss", &state.daily_loss)
            .field("auto_hedge", &self.auto_hedge)
            .finish()
    }
}

impl RiskManager {
    #[must_use]
    pub fn new(
        ledger: Arc<PositionLedger>,
        limits: RiskLimits,
        auto_hedge: bool,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let calculator = Calculator::new(ledger.commission_rate());
        Self {
            ledger,
            limits: RwLock::new(limits),
            calculator,
            auto_hedge,
            sink,
            state: RwLock::new(ManagerState {
                trading: TradingState::Active,
                daily_loss: Decimal::ZERO,
                active_breaches: Vec::new(),
                alert_history: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn limits(&self) -> RiskLimits {
        self.limits.read().clone()
    }

    /// Replaces the limits. Takes effect for subsequent checks only; an
    /// in-flight evaluation keeps the snapshot it started with.
    pub fn set_limits(&self, limits: RiskLimits) {
        *self.limits.write() = limits;
        info!("Risk limits replaced");
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self.state.read().trading, TradingState::Frozen { .. })
    }

    #[must_use]
    pub fn daily_loss(&self) -> Decimal {
        self.state.read().daily_loss
    }

    /// Validates a proposed trade against current limits and ledger state.
    ///
    /// Rules run in a fixed order and the first failure wins; the reason
    /// names the specific limit breached. Limits are evaluated against the
    /// ledger at call time; the check and the eventual booking are not
    /// atomic as a pair.
    #[must_use]
    pub fn check_trade(
        &self,
        instruction: &TradeInstruction,
        account_balance: Decimal,
    ) -> TradeDecision {
        let limits = self.limits.read().clone();
        let state = self.state.read();

        if let TradingState::Frozen { reason } = &state.trading {
            return TradeDecision::reject(format!("Kill switch active: {reason}"));
        }

        if instruction.size > limits.max_position_size {
            return TradeDecision::reject(format!(
                "Position size {} exceeds limit {}",
                instruction.size, limits.max_position_size
            ));
        }

        if state.daily_loss >= limits.max_daily_loss {
            return TradeDecision::reject(format!(
                "Daily loss limit reached: {} >= {}",
                state.daily_loss, limits.max_daily_loss
            ));
        }
        drop(state);

        let liability = instruction.liability();

        if account_balance - liability < limits.min_available_balance {
            return TradeDecision::reject(format!(
                "Insufficient balance: {account_balance} - {liability} would fall below {}",
                limits.min_available_balance
            ));
        }

        let market_exposure = self
            .ledger
            .market_exposure(&instruction.market_id)
            .map_or(Decimal::ZERO, |e| e.max_loss);
        let projected_market = market_exposure + liability;
        if projected_market > limits.max_market_exposure {
            return TradeDecision::reject(format!(
                "Market exposure would exceed limit: {projected_market} > {}",
                limits.max_market_exposure
            ));
        }

        let total_exposure = self.ledger.total_exposure();
        let projected_total = total_exposure + liability;
        if projected_total > limits.max_total_exposure {
            return TradeDecision::reject(format!(
                "Total exposure would exceed limit: {projected_total} > {}",
                limits.max_total_exposure
            ));
        }

        let open_positions = self.ledger.get_open_positions();
        if open_positions.len() >= limits.max_open_positions {
            // Adding to an existing position does not raise the count.
            let adds_to_existing = open_positions.iter().any(|p| {
                p.market_id == instruction.market_id
                    && p.selection_id == instruction.selection_id
                    && p.side == instruction.side
            });
            if !adds_to_existing {
                return TradeDecision::reject(format!(
                    "Maximum open positions reached: {}",
                    limits.max_open_positions
                ));
            }
        }

        // Concentration only applies once there is an existing book to be
        // concentrated against.
        if total_exposure > Decimal::ZERO && projected_total > Decimal::ZERO {
            let concentration = projected_market / projected_total;
            if concentration > limits.max_concentration {
                return TradeDecision::reject(format!(
                    "Market concentration too high: {concentration} > {}",
                    limits.max_concentration
                ));
            }
        }

        TradeDecision::allow()
    }

    /// Freezes all trading. Terminal until `reset_kill_switch`.
    pub fn trigger_kill_switch(&self, reason: &str) {
        error!(reason, "KILL SWITCH ACTIVATED");
        {
            let mut state = self.state.write();
            state.trading = TradingState::Frozen {
                reason: reason.to_string(),
            };
        }
        self.publish(
            RiskAlert::new(
                AlertSeverity::Critical,
                "kill_switch",
                format!("Kill switch activated: {reason}"),
            ),
        );
    }

    /// Re-enables trading after a kill-switch freeze.
    pub fn reset_kill_switch(&self) {
        {
            let mut state = self.state.write();
            state.trading = TradingState::Active;
        }
        info!("Kill switch reset, trading re-enabled");
        self.publish(RiskAlert::new(
            AlertSeverity::Info,
            "kill_switch",
            "Kill switch reset, trading re-enabled".to_string(),
        ));
    }

    /// Folds a close's net realized P&L into the daily loss tally and runs
    /// the limit checks, including the automatic kill-switch trigger at
    /// 120% of the daily loss limit.
    pub fn record_realized_pnl(&self, net_pnl: Decimal) {
        // Lock order is limits before state everywhere; taking limits
        // inside the state write would invert it against `check_trade`.
        let limit = self.limits.read().max_daily_loss;
        let daily_loss = {
            let mut state = self.state.write();
            state.daily_loss = (state.daily_loss - net_pnl).max(Decimal::ZERO);
            state.daily_loss
        };

        if daily_loss > limit {
            self.publish(
                RiskAlert::new(
                    AlertSeverity::Warning,
                    "limit_breach",
                    format!("Daily loss limit breached: {daily_loss} > {limit}"),
                )
                .with_metric(daily_loss, limit),
            );
            if daily_loss > limit * Decimal::new(12, 1) {
                self.trigger_kill_switch(&format!(
                    "Daily loss exceeded 120% of limit: {daily_loss}"
                ));
            }
        }
    }

    /// Resets the daily loss tally; call at the start of a trading day.
    pub fn reset_daily_limits(&self) {
        self.state.write().daily_loss = Decimal::ZERO;
        self.ledger.reset_daily_pnl();
        info!("Daily risk limits reset");
    }

    /// Recomputes portfolio risk metrics from scratch; nothing is cached.
    #[must_use]
    pub fn get_risk_metrics(&self) -> RiskMetrics {
        let limits = self.limits.read().clone();
        let daily_loss = self.state.read().daily_loss;
        let positions = self.ledger.get_open_positions();
        let exposures = self.ledger.all_market_exposures();
        let total_exposure: Decimal = exposures.iter().map(|e| e.max_loss).sum();

        let num_positions = positions.len();
        let num_markets = exposures.len();
        let largest_position = positions
            .iter()
            .map(|p| p.current_size)
            .max()
            .unwrap_or(Decimal::ZERO);

        let concentration = if total_exposure > Decimal::ZERO {
            exposures
                .iter()
                .map(|e| e.max_loss)
                .max()
                .unwrap_or(Decimal::ZERO)
                / total_exposure
        } else {
            Decimal::ZERO
        };

        let portfolio_delta: Decimal = positions.iter().map(Calculator::delta).sum();
        // Settlement times come from the provider layer; an hour out is the
        // neutral assumption for in-play tennis.
        let portfolio_theta: Decimal = positions
            .iter()
            .map(|p| Calculator::theta(p, 3600))
            .sum();

        let pct = |value: Decimal, limit: Decimal| {
            if limit > Decimal::ZERO {
                value / limit * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            }
        };
        let exposure_limit_used = pct(total_exposure, limits.max_total_exposure);
        let position_limit_used = pct(
            Decimal::from(num_positions),
            Decimal::from(limits.max_open_positions),
        );
        let loss_limit_used = pct(daily_loss, limits.max_daily_loss);

        let risk_score = exposure_limit_used
            .max(position_limit_used)
            .max(loss_limit_used)
            .max(concentration * Decimal::ONE_HUNDRED)
            .min(Decimal::ONE_HUNDRED);

        let mut alerts = Vec::new();
        if exposure_limit_used > WARN_THRESHOLD_PCT {
            alerts.push(format!("Exposure limit {exposure_limit_used:.1}% used"));
        }
        if loss_limit_used > WARN_THRESHOLD_PCT {
            alerts.push(format!("Daily loss limit {loss_limit_used:.1}% used"));
        }
        if concentration > Decimal::new(5, 1) {
            alerts.push(format!("High concentration risk: {concentration:.2}"));
        }

        RiskMetrics {
            timestamp: Utc::now(),
            total_exposure,
            num_open_positions: num_positions,
            num_markets,
            largest_position,
            concentration,
            portfolio_delta,
            portfolio_theta,
            exposure_limit_used,
            position_limit_used,
            loss_limit_used,
            risk_score,
            alerts,
        }
    }

    /// Full exposure snapshot: per-market exposures, soft warnings above
    /// 80% of a limit, and hard breaches at 100% or more. Each breach is
    /// published to the alert sink; 20% past a limit trips the kill
    /// switch.
    #[must_use]
    pub fn get_exposure_report(&self, account_balance: Decimal) -> ExposureReport {
        let limits = self.limits.read().clone();
        let daily_loss = self.state.read().daily_loss;
        let market_exposures = self.ledger.all_market_exposures();
        let risk_metrics = self.get_risk_metrics();
        let daily_pnl = self.ledger.get_pnl_statement(chrono::Duration::hours(24));

        let total_exposure: Decimal = market_exposures.iter().map(|e| e.max_loss).sum();
        let total_liability: Decimal = market_exposures
            .iter()
            .map(|e| e.net_lay_liability)
            .sum();
        let net_exposure: Decimal = market_exposures
            .iter()
            .map(|e| e.net_back_exposure - e.net_lay_liability)
            .sum();
        let open_pnl: Decimal = self
            .ledger
            .get_open_positions()
            .iter()
            .map(|p| p.unrealized_pnl)
            .sum();

        let available_balance = account_balance - total_exposure;

        let mut warnings = Vec::new();
        if available_balance < limits.min_available_balance * Decimal::TWO {
            warnings.push("Low available balance".to_string());
        }
        if risk_metrics.risk_score > Decimal::from(75) {
            warnings.push(format!("High risk score: {:.1}", risk_metrics.risk_score));
        }
        warnings.extend(risk_metrics.alerts.iter().cloned());

        let mut breaches = Vec::new();
        for (name, value, limit) in [
            ("Total exposure", total_exposure, limits.max_total_exposure),
            ("Daily loss", daily_loss, limits.max_daily_loss),
        ] {
            if value <= limit {
                continue;
            }
            let message = format!("{name} {value} over limit {limit}");
            breaches.push(message.clone());
            self.publish(
                RiskAlert::new(AlertSeverity::Warning, "limit_breach", message)
                    .with_metric(value, limit),
            );
            // Same escalation threshold as the daily loss path: 20% past
            // a hard limit freezes trading.
            if value > limit * Decimal::new(12, 1) && !self.is_frozen() {
                self.trigger_kill_switch(&format!("{name} exceeded 120% of limit: {value}"));
            }
        }
        self.state.write().active_breaches = breaches.clone();

        ExposureReport {
            timestamp: Utc::now(),
            account_balance,
            available_balance,
            market_exposures,
            total_exposure,
            total_liability,
            net_exposure,
            risk_metrics,
            daily_pnl,
            open_pnl,
            exposure_limit: limits.max_total_exposure,
            exposure_limit_remaining: (limits.max_total_exposure - total_exposure)
                .max(Decimal::ZERO),
            daily_loss_limit: limits.max_daily_loss,
            daily_loss_limit_remaining: (limits.max_daily_loss - daily_loss).max(Decimal::ZERO),
            warnings,
            breaches,
        }
    }

    /// When auto-hedge is enabled, recommends and alerts on an offsetting
    /// bet for an imbalanced market. Submission is the coordinator's job;
    /// this is fire-and-forget advice.
    #[must_use]
    pub fn check_market_hedge(&self, market_id: &str) -> Option<HedgeInstruction> {
        if !self.auto_hedge {
            return None;
        }
        let positions = self.ledger.get_market_positions(market_id);
        let hedge = self.calculator.hedge_requirement(&positions)?;
        warn!(market_id, size = %hedge.size, "Hedge recommended");
        self.publish(
            RiskAlert::new(
                AlertSeverity::Warning,
                "hedging",
                format!(
                    "Hedging recommended: {} {} at {} on {}",
                    hedge.side, hedge.size, hedge.price, hedge.selection_id
                ),
            )
            .with_market(market_id),
        );
        Some(hedge)
    }

    /// Breaches observed by the most recent exposure report.
    #[must_use]
    pub fn active_breaches(&self) -> Vec<String> {
        self.state.read().active_breaches.clone()
    }

    /// Most recent alerts, oldest first, bounded to the last 100.
    #[must_use]
    pub fn alert_history(&self) -> Vec<RiskAlert> {
        self.state.read().alert_history.clone()
    }

    fn publish(&self, alert: RiskAlert) {
        {
            let mut state = self.state.write();
            state.alert_history.push(alert.clone());
            if state.alert_history.len() > ALERT_HISTORY_LIMIT {
                let excess = state.alert_history.len() - ALERT_HISTORY_LIMIT;
                state.alert_history.drain(..excess);
            }
        }
        self.sink.publish(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bettex_core::events::{OrderType, Side};
    use bettex_core::traits::LogAlertSink;
    use rust_decimal_macros::dec;

    fn instruction(size: Decimal, price: Decimal) -> TradeInstruction {
        TradeInstruction {
            market_id: "1.234".to_string(),
            selection_id: "101".to_string(),
            side: Side::Back,
            size,
            price,
            order_type: OrderType::Limit,
            strategy: None,
        }
    }

    fn manager_with(limits: RiskLimits) -> (Arc<PositionLedger>, RiskManager) {
        let ledger = Arc::new(PositionLedger::default());
        let manager = RiskManager::new(
            Arc::clone(&ledger),
            limits,
            false,
            Arc::new(LogAlertSink),
        );
        (ledger, manager)
    }

    #[test]
    fn position_size_limit_is_enforced() {
        // Scenario: limit 20, sizes 25 and 15.
        let (_, manager) = manager_with(RiskLimits::default().with_max_position_size(dec!(20)));

        let rejected = manager.check_trade(&instruction(dec!(25), dec!(2.0)), dec!(1000));
        assert!(!rejected.allowed);
        assert!(rejected.reason.unwrap().contains("Position size"));

        let allowed = manager.check_trade(&instruction(dec!(15), dec!(2.0)), dec!(1000));
        assert!(allowed.allowed, "{:?}", allowed.reason);
    }

    #[test]
    fn kill_switch_rejects_everything() {
        let (_, manager) = manager_with(RiskLimits::default());
        manager.trigger_kill_switch("manual test");

        let decision = manager.check_trade(&instruction(dec!(1), dec!(2.0)), dec!(1000));
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("Kill switch"));
        assert!(manager.is_frozen());
    }

    #[test]
    fn kill_switch_reset_is_explicit() {
        let (_, manager) = manager_with(RiskLimits::default());
        manager.trigger_kill_switch("manual test");
        manager.reset_kill_switch();
        assert!(!manager.is_frozen());
        let decision = manager.check_trade(&instruction(dec!(1), dec!(2.0)), dec!(1000));
        assert!(decision.allowed);
    }

    #[test]
    fn market_exposure_limit_uses_projected_value() {
        let (ledger, manager) =
            manager_with(RiskLimits::default().with_max_market_exposure(dec!(60)));
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();

        let decision = manager.check_trade(&instruction(dec!(20), dec!(2.0)), dec!(10000));
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("Market exposure"));
    }

    #[test]
    fn open_position_count_allows_adding_to_existing() {
        let (ledger, manager) = manager_with(
            RiskLimits::default()
                .with_max_open_positions(1)
                .with_max_concentration(Decimal::ONE),
        );
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(10), "o1", "betfair", None)
            .unwrap();

        // Same market/selection/side merges, so it passes.
        let same = manager.check_trade(&instruction(dec!(10), dec!(2.0)), dec!(1000));
        assert!(same.allowed, "{:?}", same.reason);

        // A different selection would be a new position.
        let mut other = instruction(dec!(10), dec!(2.0));
        other.selection_id = "102".to_string();
        let rejected = manager.check_trade(&other, dec!(1000));
        assert!(!rejected.allowed);
        assert!(rejected.reason.unwrap().contains("open positions"));
    }

    #[test]
    fn concentration_limit_applies_against_existing_book() {
        let (ledger, manager) = manager_with(
            RiskLimits::default()
                .with_max_concentration(dec!(0.6))
                .with_max_market_exposure(dec!(500)),
        );
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(40), "o1", "betfair", None)
            .unwrap();
        ledger
            .open_position("1.235", "201", Side::Back, dec!(2.0), dec!(40), "o2", "betfair", None)
            .unwrap();

        // Pushing market 1.234 to 90 of a 130 total is ~69% concentration.
        let decision = manager.check_trade(&instruction(dec!(50), dec!(2.0)), dec!(10000));
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("concentration"));
    }

    #[test]
    fn daily_loss_breach_blocks_and_120_pct_freezes() {
        let (_, manager) = manager_with(RiskLimits::default().with_max_daily_loss(dec!(100)));

        manager.record_realized_pnl(dec!(-100));
        let decision = manager.check_trade(&instruction(dec!(1), dec!(2.0)), dec!(1000));
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("Daily loss"));
        assert!(!manager.is_frozen());

        manager.record_realized_pnl(dec!(-25));
        assert!(manager.is_frozen());
    }

    #[test]
    fn concurrent_limit_updates_do_not_block_pnl_recording() {
        let (_, manager) = manager_with(RiskLimits::default());
        let manager = Arc::new(manager);

        let mut handles = Vec::new();
        for _ in 0..2 {
            let m = Arc::clone(&manager);
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    m.record_realized_pnl(dec!(-0.01));
                    let _ = m.check_trade(&instruction(dec!(1), dec!(2.0)), dec!(1000));
                }
            }));
        }
        let m = Arc::clone(&manager);
        handles.push(std::thread::spawn(move || {
            for _ in 0..500 {
                m.set_limits(RiskLimits::default());
            }
        }));
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(manager.daily_loss(), dec!(10.00));
    }

    #[test]
    fn risk_metrics_reflect_open_book() {
        let (ledger, manager) = manager_with(RiskLimits::default());
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();
        ledger
            .open_position("1.234", "102", Side::Lay, dec!(3.0), dec!(10), "o2", "betfair", None)
            .unwrap();

        let metrics = manager.get_risk_metrics();
        assert_eq!(metrics.num_open_positions, 2);
        assert_eq!(metrics.num_markets, 1);
        assert_eq!(metrics.largest_position, dec!(50));
        // Back 50 minus lay 10.
        assert_eq!(metrics.portfolio_delta, dec!(40));
        assert_eq!(metrics.concentration, Decimal::ONE);
        assert!(metrics.risk_score > Decimal::ZERO);
    }

    #[test]
    fn exposure_breach_alerts_and_escalates() {
        let (ledger, manager) =
            manager_with(RiskLimits::default().with_max_total_exposure(dec!(40)));
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();

        let report = manager.get_exposure_report(dec!(1000));
        assert_eq!(report.total_exposure, dec!(50));
        assert!(!report.breaches.is_empty());
        assert_eq!(report.exposure_limit_remaining, Decimal::ZERO);
        assert_eq!(manager.active_breaches(), report.breaches);

        // Breaches are published, not just reported.
        let history = manager.alert_history();
        assert!(history
            .iter()
            .any(|a| a.category == "limit_breach" && a.metric_value == Some(dec!(50))));
        // 50 is 125% of the 40 limit, past the escalation threshold.
        assert!(manager.is_frozen());
    }

    #[test]
    fn moderate_exposure_breach_alerts_without_freezing() {
        let (ledger, manager) =
            manager_with(RiskLimits::default().with_max_total_exposure(dec!(45)));
        ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();

        // 50 is ~111% of the 45 limit: alert, no kill switch.
        let report = manager.get_exposure_report(dec!(1000));
        assert!(!report.breaches.is_empty());
        assert!(!manager.is_frozen());
        assert_eq!(manager.alert_history().len(), 1);
    }

    #[test]
    fn auto_hedge_gate_is_config_controlled() {
        let ledger = Arc::new(PositionLedger::default());
        ledger
            .open_position("1.234", "A", Side::Back, dec!(2.0), dec!(50), "o1", "betfair", None)
            .unwrap();
        ledger
            .open_position("1.234", "B", Side::Back, dec!(2.0), dec!(10), "o2", "betfair", None)
            .unwrap();

        let disabled = RiskManager::new(
            Arc::clone(&ledger),
            RiskLimits::default(),
            false,
            Arc::new(LogAlertSink),
        );
        assert!(disabled.check_market_hedge("1.234").is_none());

        let enabled = RiskManager::new(
            Arc::clone(&ledger),
            RiskLimits::default(),
            true,
            Arc::new(LogAlertSink),
        );
        let hedge = enabled.check_market_hedge("1.234").unwrap();
        assert_eq!(hedge.selection_id, "A");
        assert_eq!(enabled.alert_history().len(), 1);
    }
}
