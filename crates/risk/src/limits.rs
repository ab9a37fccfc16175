use bettex_core::config::RiskLimitsConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configurable risk limits.
///
/// Treated as an immutable snapshot during an evaluation pass; replacing the
/// limits takes effect for subsequent checks only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum stake for a single trade.
    /// Default: 100
    pub max_position_size: Decimal,

    /// Maximum worst-case loss in a single market.
    /// Default: 500
    pub max_market_exposure: Decimal,

    /// Maximum worst-case loss across all markets.
    /// Default: 1000
    pub max_total_exposure: Decimal,

    /// Daily net loss at which trading stops.
    /// Default: 200
    pub max_daily_loss: Decimal,

    /// Maximum number of open positions.
    /// Default: 20
    pub max_open_positions: usize,

    /// Maximum share of total exposure a single market may carry (0-1).
    /// Default: 0.3
    pub max_concentration: Decimal,

    /// Balance floor that must stay free after a trade's liability.
    /// Default: 100
    pub min_available_balance: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self::from(RiskLimitsConfig::default())
    }
}

impl From<RiskLimitsConfig> for RiskLimits {
    fn from(config: RiskLimitsConfig) -> Self {
        Self {
            max_position_size: config.max_position_size,
            max_market_exposure: config.max_market_exposure,
            max_total_exposure: config.max_total_exposure,
            max_daily_loss: config.max_daily_loss,
            max_open_positions: config.max_open_positions,
            max_concentration: config.max_concentration,
            min_available_balance: config.min_available_balance,
        }
    }
}

impl RiskLimits {
    /// Builder method to set max position size.
    #[must_use]
    pub fn with_max_position_size(mut self, size: Decimal) -> Self {
        self.max_position_size = size;
        self
    }

    /// Builder method to set max market exposure.
    #[must_use]
    pub fn with_max_market_exposure(mut self, exposure: Decimal) -> Self {
        self.max_market_exposure = exposure;
        self
    }

    /// Builder method to set max total exposure.
    #[must_use]
    pub fn with_max_total_exposure(mut self, exposure: Decimal) -> Self {
        self.max_total_exposure = exposure;
        self
    }

    /// Builder method to set max daily loss.
    #[must_use]
    pub fn with_max_daily_loss(mut self, loss: Decimal) -> Self {
        self.max_daily_loss = loss;
        self
    }

    /// Builder method to set max open positions.
    #[must_use]
    pub fn with_max_open_positions(mut self, count: usize) -> Self {
        self.max_open_positions = count;
        self
    }

    /// Builder method to set max concentration (0-1).
    #[must_use]
    pub fn with_max_concentration(mut self, concentration: Decimal) -> Self {
        self.max_concentration = concentration;
        self
    }

    /// Builder method to set the minimum available balance.
    #[must_use]
    pub fn with_min_available_balance(mut self, balance: Decimal) -> Self {
        self.min_available_balance = balance;
        self
    }
}
