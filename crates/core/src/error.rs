use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from position ledger operations.
///
/// Risk-limit rejections are not errors; they come back as structured
/// decisions from the risk manager, because rejection is an expected
/// outcome of normal operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    /// Caller supplied a non-positive price or size.
    #[error("Invalid {field}: {value} (must be positive)")]
    InvalidQuantity {
        /// Which field failed validation.
        field: &'static str,
        /// The offending value.
        value: Decimal,
    },

    /// Referenced position does not exist.
    #[error("Position {0} not found")]
    PositionNotFound(String),

    /// Requested closing more size than is open.
    #[error("Insufficient size: requested {requested}, only {available} open")]
    InsufficientSize {
        requested: Decimal,
        available: Decimal,
    },

    /// Operation requires an open remainder but the position is fully closed.
    #[error("Position {0} is fully closed")]
    PositionClosed(String),
}
