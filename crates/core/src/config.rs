use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub commission_rate: Decimal,
    pub auto_hedge: bool,
    pub automation: AutomationConfig,
    pub risk: RiskLimitsConfig,
}

/// Default trigger offsets for automated orders, as fractions of the entry
/// price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimitsConfig {
    pub max_position_size: Decimal,
    pub max_market_exposure: Decimal,
    pub max_total_exposure: Decimal,
    pub max_daily_loss: Decimal,
    pub max_open_positions: usize,
    pub max_concentration: Decimal,
    pub min_available_balance: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(2, 2),
            auto_hedge: false,
            automation: AutomationConfig::default(),
            risk: RiskLimitsConfig::default(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: Decimal::new(1, 1),
            take_profit_pct: Decimal::new(1, 1),
        }
    }
}

impl Default for RiskLimitsConfig {
    fn default() -> Self {
        Self {
            max_position_size: Decimal::from(100),
            max_market_exposure: Decimal::from(500),
            max_total_exposure: Decimal::from(1000),
            max_daily_loss: Decimal::from(200),
            max_open_positions: 20,
            max_concentration: Decimal::new(3, 1),
            min_available_balance: Decimal::from(100),
        }
    }
}
