//! Local persistence for classes, sports, sheets, results, and tools.
//!
//! Every collection lives in one `SQLite` database under the storage root:
//!
//! ```text
//! <root>/eps.sqlite
//!   classes   (seq, id, body)
//!   sports    (seq, id, body)
//!   sheets    (seq, id, body)
//!   results   (seq, id, body)
//!   tools     (seq, id, body)
//! ```
//!
//! Each row is one JSON document keyed by UUID; `seq` preserves insertion
//! order. Mutations are announced to subscribers as [`Change`] messages.

mod collection;
mod documents;

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{Sport, default_sports};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{collection} entry not found: {id}")]
    NotFound { collection: Collection, id: Uuid },

    #[error("{collection} entry already exists: {id}")]
    AlreadyExists { collection: Collection, id: Uuid },

    #[error("{0} entries cannot be modified once created")]
    Immutable(Collection),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt data: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// The five named collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Classes,
    Sports,
    Sheets,
    Results,
    Tools,
}

impl Collection {
    pub const ALL: [Self; 5] = [
        Self::Classes,
        Self::Sports,
        Self::Sheets,
        Self::Results,
        Self::Tools,
    ];

    fn table(self) -> &'static str {
        match self {
            Self::Classes => "classes",
            Self::Sports => "sports",
            Self::Sheets => "sheets",
            Self::Results => "results",
            Self::Tools => "tools",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classes => "class",
            Self::Sports => "sport",
            Self::Sheets => "sheet",
            Self::Results => "result",
            Self::Tools => "tool",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Appended,
    Updated,
    Deleted,
}

/// A successful mutation, sent to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: Uuid,
}

/// A value stored as a JSON document in one of the collections.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Whether `update` is allowed. Results are append-only.
    const MUTABLE: bool = true;

    fn id(&self) -> Uuid;

    fn set_id(&mut self, id: Uuid);

    /// Human-readable name, used for lookups by name and in listings.
    fn label(&self) -> String;
}

/// `SQLite`-backed storage for all collections.
pub struct Storage {
    conn: Connection,
    subscribers: RefCell<Vec<Sender<Change>>>,
}

impl Storage {
    /// Opens (or creates) the database under `root`.
    ///
    /// The directory is created if it doesn't exist. An empty sports
    /// collection is seeded with the default sports.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let path = root.join("eps.sqlite");

        let conn = Connection::open(&path)?;
        // Concurrent writers (two observers finishing at once) wait for the
        // lock instead of failing.
        conn.busy_timeout(Duration::from_secs(5))?;
        for collection in Collection::ALL {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    seq  INTEGER PRIMARY KEY AUTOINCREMENT,
                    id   TEXT NOT NULL UNIQUE,
                    body TEXT NOT NULL
                );",
                collection.table()
            ))?;
        }
        debug!(path = %path.display(), "storage opened");

        let storage = Self {
            conn,
            subscribers: RefCell::new(Vec::new()),
        };
        storage.seed_sports()?;
        Ok(storage)
    }

    /// Returns the default storage root: `~/.eps/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".eps"))
    }

    /// Registers a subscriber for change notifications.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<Change> {
        let (tx, rx) = unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    fn notify(&self, change: &Change) {
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }

    fn seed_sports(&self) -> Result<()> {
        if self.count(Collection::Sports)? > 0 {
            return Ok(());
        }
        let defaults = default_sports();
        let seeded = defaults.len();
        for sport in defaults {
            self.append::<Sport>(sport)?;
        }
        info!(count = seeded, "seeded default sports");
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(n).map_err(|e| StorageError::Corrupt(format!("negative row count: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn new_storage_seeds_nine_sports_once() {
        let dir = TempDir::new().unwrap();

        let storage = Storage::new(dir.path()).unwrap();
        assert_eq!(storage.list::<Sport>().unwrap().len(), 9);
        drop(storage);

        let reopened = Storage::new(dir.path()).unwrap();
        assert_eq!(reopened.list::<Sport>().unwrap().len(), 9);
    }

    #[test]
    fn emptied_sports_are_reseeded_on_open() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        for sport in storage.list::<Sport>().unwrap() {
            storage.delete::<Sport>(sport.id).unwrap();
        }
        drop(storage);

        let reopened = Storage::new(dir.path()).unwrap();
        assert_eq!(reopened.list::<Sport>().unwrap().len(), 9);
    }

    #[test]
    fn creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("eps");
        Storage::new(&root).unwrap();
        assert!(root.join("eps.sqlite").exists());
    }
}
