//! Trade coordination and persistence for exchange betting.
//!
//! Wires the position ledger, risk manager, and automated order manager to
//! an execution venue and a durable store, exposing one `TradeCoordinator`
//! entry point per account.

pub mod coordinator;
pub mod persistence;

pub use coordinator::{TradeCoordinator, TradeOutcome, TradeStats};
pub use persistence::{JsonPositionStore, PersistenceError};
