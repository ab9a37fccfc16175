use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of an exchange bet.
///
/// `Back` is the long side (profits when the price rises), `Lay` is the
/// short side (profits when the price shortens; liability is
/// `(price - 1) * stake`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Back,
    Lay,
}

impl Side {
    #[must_use]
    pub const fn is_back(self) -> bool {
        matches!(self, Self::Back)
    }

    /// The side that closes or hedges a position on this side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Back => Self::Lay,
            Self::Lay => Self::Back,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Back => write!(f, "back"),
            Self::Lay => write!(f, "lay"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

/// Status reported back by the execution venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Matched,
    PartiallyMatched,
    Rejected,
    Failed,
}

/// A proposed trade, as handed to the risk manager and execution venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub market_id: String,
    pub selection_id: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub order_type: OrderType,
    pub strategy: Option<String>,
}

impl TradeInstruction {
    /// Worst-case loss this instruction can add: the stake for a back bet,
    /// `(price - 1) * stake` for a lay bet.
    #[must_use]
    pub fn liability(&self) -> Decimal {
        match self.side {
            Side::Back => self.size,
            Side::Lay => (self.price - Decimal::ONE) * self.size,
        }
    }
}

/// Fill report from the execution venue.
///
/// `executed_size`/`executed_price` are the venue's values, which may differ
/// from the requested ones on partial fills; the ledger must be updated with
/// these, never the requested values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: String,
    pub status: OrderStatus,
    pub executed_size: Decimal,
    pub executed_price: Decimal,
    pub error: Option<String>,
}

impl ExecutionReport {
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Matched | OrderStatus::PartiallyMatched
        ) && self.executed_size > Decimal::ZERO
    }
}

/// One market-data update for a selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTick {
    pub selection_id: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Risk alert emitted on limit breaches, kill-switch transitions, and
/// automated-order triggers. Consumed by an external notification layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    pub severity: AlertSeverity,
    pub category: String,
    pub message: String,
    pub market_id: Option<String>,
    pub position_id: Option<String>,
    pub metric_value: Option<Decimal>,
    pub threshold: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl RiskAlert {
    #[must_use]
    pub fn new(severity: AlertSeverity, category: &str, message: String) -> Self {
        Self {
            severity,
            category: category.to_string(),
            message,
            market_id: None,
            position_id: None,
            metric_value: None,
            threshold: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_market(mut self, market_id: &str) -> Self {
        self.market_id = Some(market_id.to_string());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position_id: &str) -> Self {
        self.position_id = Some(position_id.to_string());
        self
    }

    #[must_use]
    pub fn with_metric(mut self, value: Decimal, threshold: Decimal) -> Self {
        self.metric_value = Some(value);
        self.threshold = Some(threshold);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn instruction(side: Side, size: Decimal, price: Decimal) -> TradeInstruction {
        TradeInstruction {
            market_id: "1.234".to_string(),
            selection_id: "101".to_string(),
            side,
            size,
            price,
            order_type: OrderType::Limit,
            strategy: None,
        }
    }

    #[test]
    fn back_liability_is_stake() {
        let ins = instruction(Side::Back, dec!(10), dec!(2.5));
        assert_eq!(ins.liability(), dec!(10));
    }

    #[test]
    fn lay_liability_is_price_minus_one_times_stake() {
        let ins = instruction(Side::Lay, dec!(10), dec!(3.0));
        assert_eq!(ins.liability(), dec!(20));
    }

    #[test]
    fn partial_match_with_size_is_successful() {
        let report = ExecutionReport {
            order_id: "o1".to_string(),
            status: OrderStatus::PartiallyMatched,
            executed_size: dec!(4),
            executed_price: dec!(2.0),
            error: None,
        };
        assert!(report.is_successful());
    }

    #[test]
    fn failed_report_is_not_successful() {
        let report = ExecutionReport {
            order_id: "o1".to_string(),
            status: OrderStatus::Failed,
            executed_size: Decimal::ZERO,
            executed_price: Decimal::ZERO,
            error: Some("venue unavailable".to_string()),
        };
        assert!(!report.is_successful());
    }
}
