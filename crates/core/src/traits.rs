//! Collaborator seams for the risk core.
//!
//! The core itself is synchronous and deterministic; network-facing
//! collaborators (execution venue, persistence, alerting transport) sit
//! behind these traits and are called outside any ledger lock.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::events::{AlertSeverity, ExecutionReport, RiskAlert, TradeInstruction};
use crate::position::Position;
use crate::reports::PnLStatement;

/// External execution venue. May partially fill; callers must book the
/// report's `executed_size`/`executed_price`, never the requested values.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    async fn submit_order(&self, instruction: &TradeInstruction) -> Result<ExecutionReport>;
}

/// Durable storage for positions and daily P&L snapshots.
///
/// Best-effort durability: callers log failures and carry on; a persistence
/// error never rolls back in-memory ledger state.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn save_position(&self, position: &Position) -> Result<()>;
    async fn load_open_positions(&self) -> Result<Vec<Position>>;
    async fn save_daily_pnl(&self, date: NaiveDate, statement: &PnLStatement) -> Result<()>;
}

/// Sink for risk alerts: limit breaches, kill-switch transitions, trigger
/// firings. Implementations must not block; the core publishes from inside
/// its hot paths.
pub trait AlertSink: Send + Sync {
    fn publish(&self, alert: RiskAlert);
}

/// Default sink that forwards alerts to `tracing` at a level matching the
/// alert severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn publish(&self, alert: RiskAlert) {
        match alert.severity {
            AlertSeverity::Info => info!(category = %alert.category, "{}", alert.message),
            AlertSeverity::Warning => warn!(category = %alert.category, "{}", alert.message),
            AlertSeverity::Critical => error!(category = %alert.category, "{}", alert.message),
        }
    }
}
