//! Position persistence for surviving restarts.
//!
//! Positions are kept in a single JSON file, rewritten whole on every save.
//! Writes go to a temp file in the same directory and are renamed into
//! place, so a crash mid-write leaves the previous snapshot intact. A
//! missing or corrupt file loads as an empty book with a warning; restart
//! recovery must never refuse to start over bad state.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use bettex_core::position::Position;
use bettex_core::reports::PnLStatement;
use bettex_core::traits::PositionStore;

/// Errors from position persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// IO error reading/writing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk snapshot format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedBook {
    positions: HashMap<String, Position>,
    saved_at: DateTime<Utc>,
}

impl Default for PersistedBook {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            saved_at: Utc::now(),
        }
    }
}

/// JSON-file-backed implementation of `PositionStore`.
///
/// All writes serialize through an internal mutex; the async trait methods
/// do blocking file IO, which is acceptable at the snapshot sizes involved.
#[derive(Debug)]
pub struct JsonPositionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonPositionStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    fn positions_path(&self) -> PathBuf {
        self.dir.join("positions.json")
    }

    fn pnl_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("pnl_{date}.json"))
    }

    /// Reads the current book, or an empty one if the file is missing or
    /// unparseable.
    fn load_book(&self) -> PersistedBook {
        let path = self.positions_path();
        if !path.exists() {
            info!(path = %path.display(), "No persisted positions found, starting fresh");
            return PersistedBook::default();
        }
        match self.load_book_strict() {
            Ok(book) => book,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load persisted positions, starting fresh"
                );
                PersistedBook::default()
            }
        }
    }

    fn load_book_strict(&self) -> Result<PersistedBook, PersistenceError> {
        let file = File::open(self.positions_path())?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Atomically replaces the snapshot on disk.
    fn write_book(&self, book: &PersistedBook) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join("positions.json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, book)?;
            writer.flush()?;
        }
        fs::rename(&tmp, self.positions_path())?;
        debug!(
            path = %self.positions_path().display(),
            positions = book.positions.len(),
            "Saved position snapshot"
        );
        Ok(())
    }
}

#[async_trait]
impl PositionStore for JsonPositionStore {
    async fn save_position(&self, position: &Position) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut book = self.load_book();
        book.positions
            .insert(position.position_id.clone(), position.clone());
        book.saved_at = Utc::now();
        self.write_book(&book)?;
        Ok(())
    }

    async fn load_open_positions(&self) -> Result<Vec<Position>> {
        let _guard = self.write_lock.lock();
        let book = self.load_book();
        let mut open: Vec<Position> = book
            .positions
            .into_values()
            .filter(Position::is_open)
            .collect();
        // Snapshot order is a HashMap's; restore deterministically.
        open.sort_by(|a, b| a.entry_time.cmp(&b.entry_time));
        info!(count = open.len(), "Loaded open positions from disk");
        Ok(open)
    }

    async fn save_daily_pnl(&self, date: NaiveDate, statement: &PnLStatement) -> Result<()> {
        let _guard = self.write_lock.lock();
        fs::create_dir_all(&self.dir)?;
        let path = self.pnl_path(date);
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).map_err(PersistenceError::Io)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, statement)
                .map_err(PersistenceError::Json)?;
            writer.flush().map_err(PersistenceError::Io)?;
        }
        fs::rename(&tmp, &path).map_err(PersistenceError::Io)?;
        debug!(path = %path.display(), "Saved daily P&L statement");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bettex_core::events::Side;
    use bettex_core::position::PositionLedger;
    use rust_decimal_macros::dec;

    fn store() -> (tempfile::TempDir, JsonPositionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPositionStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[tokio::test]
    async fn save_load_roundtrip_preserves_decimals() {
        let (_dir, store) = store();
        let ledger = PositionLedger::default();
        let position = ledger
            .open_position("1.234", "101", Side::Back, dec!(2.34), dec!(10.55), "o1", "betfair", None)
            .unwrap();

        store.save_position(&position).await.unwrap();
        let loaded = store.load_open_positions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].entry_price, dec!(2.34));
        assert_eq!(loaded[0].current_size, dec!(10.55));
        assert_eq!(loaded[0].position_id, position.position_id);
    }

    #[tokio::test]
    async fn closed_positions_are_not_reloaded() {
        let (_dir, store) = store();
        let ledger = PositionLedger::default();
        let position = ledger
            .open_position("1.234", "101", Side::Back, dec!(2.0), dec!(10), "o1", "betfair", None)
            .unwrap();
        let closed = ledger.close_position(&position.position_id, dec!(1.8), None).unwrap();

        store.save_position(&closed).await.unwrap();
        let loaded = store.load_open_positions().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let (_dir, store) = store();
        assert!(store.load_open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let (_dir, store) = store();
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.positions_path(), "not json{{").unwrap();
        assert!(store.load_open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn daily_pnl_snapshot_is_written() {
        let (_dir, store) = store();
        let ledger = PositionLedger::default();
        let statement = ledger.get_pnl_statement(chrono::Duration::hours(24));
        let date = Utc::now().date_naive();

        store.save_daily_pnl(date, &statement).await.unwrap();
        assert!(store.pnl_path(date).exists());
    }
}
