//! Risk controls for exchange betting: configurable limits, a manual and
//! automatic kill switch, and locally-managed conditional exit orders.

pub mod automated;
pub mod limits;
pub mod manager;

pub use automated::{AutoTradeManager, AutomatedOrder, AutomatedOrderKind};
pub use limits::RiskLimits;
pub use manager::{RiskManager, TradeDecision};
