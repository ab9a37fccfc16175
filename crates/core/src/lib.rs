//! Core types for exchange-betting position and risk management: the
//! position ledger, P&L and exposure calculation, shared event types, and
//! configuration.

pub mod calculator;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod position;
pub mod reports;
pub mod traits;

pub use calculator::Calculator;
pub use config::{AppConfig, AutomationConfig, RiskLimitsConfig};
pub use config_loader::ConfigLoader;
pub use error::LedgerError;
pub use events::{
    AlertSeverity, ExecutionReport, OrderStatus, OrderType, PriceTick, RiskAlert, Side,
    TradeInstruction,
};
pub use position::{Position, PositionLedger, PositionStatus};
pub use reports::{ExposureReport, HedgeInstruction, MarketExposure, PnLStatement, RiskMetrics};
pub use traits::{AlertSink, ExecutionVenue, LogAlertSink, PositionStore};
