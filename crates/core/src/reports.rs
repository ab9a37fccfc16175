//! Derived reporting snapshots.
//!
//! Everything in this module is computed on demand from current ledger
//! state and never persisted as authoritative; the persistence adapter may
//! store copies as historical record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::events::Side;

/// Aggregate exposure for one market, computed from its open positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketExposure {
    pub market_id: String,
    /// Worst-case loss per selection.
    pub selection_exposures: HashMap<String, Decimal>,
    /// Total stake at risk on back bets.
    pub net_back_exposure: Decimal,
    /// Total lay liability, `(price - 1) * stake` summed.
    pub net_lay_liability: Decimal,
    /// Worst single outcome across all selections.
    pub max_loss: Decimal,
    pub open_positions: usize,
    pub total_stake: Decimal,
    /// Set when one selection's exposure materially exceeds the others.
    pub hedge_required: bool,
    pub hedge_amount: Option<Decimal>,
    pub hedge_selection: Option<String>,
}

/// Instruction for an offsetting bet that balances market exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeInstruction {
    pub market_id: String,
    pub selection_id: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub reason: String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// P&L statement for a period, grouped by market and strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnLStatement {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub gross_pnl: Decimal,
    pub commission: Decimal,
    pub net_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub pnl_by_market: HashMap<String, Decimal>,
    pub pnl_by_strategy: HashMap<String, Decimal>,
    pub num_trades: usize,
    /// Winning closed positions / total closed positions, as a percentage.
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub total_volume: Decimal,
}

/// Portfolio risk metrics, recomputed from scratch on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub timestamp: DateTime<Utc>,
    pub total_exposure: Decimal,
    pub num_open_positions: usize,
    pub num_markets: usize,
    pub largest_position: Decimal,
    /// Largest market's share of total exposure (0-1).
    pub concentration: Decimal,
    /// Signed open size summed across positions (back positive, lay negative).
    pub portfolio_delta: Decimal,
    /// Heuristic time-decay score, not a real options greek.
    pub portfolio_theta: Decimal,
    /// Percentage of each limit consumed.
    pub exposure_limit_used: Decimal,
    pub position_limit_used: Decimal,
    pub loss_limit_used: Decimal,
    /// Weighted composite of limit utilization, 0-100.
    pub risk_score: Decimal,
    pub alerts: Vec<String>,
}

/// Full exposure snapshot including warnings and hard breaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureReport {
    pub timestamp: DateTime<Utc>,
    pub account_balance: Decimal,
    pub available_balance: Decimal,
    pub market_exposures: Vec<MarketExposure>,
    pub total_exposure: Decimal,
    pub total_liability: Decimal,
    pub net_exposure: Decimal,
    pub risk_metrics: RiskMetrics,
    pub daily_pnl: PnLStatement,
    pub open_pnl: Decimal,
    pub exposure_limit: Decimal,
    pub exposure_limit_remaining: Decimal,
    pub daily_loss_limit: Decimal,
    pub daily_loss_limit_remaining: Decimal,
    /// Soft threshold crossings (above 80% of a limit).
    pub warnings: Vec<String>,
    /// Hard limit breaches (100% or more).
    pub breaches: Vec<String>,
}
