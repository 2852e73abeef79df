//! Store handle: lifecycle of the SQLite connection
//!
//! The handle is passed explicitly to the services. It opens the database
//! lazily on the first transaction (creating the data directory and running
//! pending migrations), and can be closed and re-opened.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::record::RecordKind;
use super::schema;
use super::transaction::{Transaction, TransactionMode};
use crate::config::Config;

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

impl Location {
    fn describe(&self) -> String {
        match self {
            Location::File(path) => path.display().to_string(),
            Location::Memory => ":memory:".to_string(),
        }
    }
}

/// Record counts and on-disk size of a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub bookmarks: usize,
    pub page_references: usize,
    pub groups: usize,
    pub queries: usize,
    pub schema_version: i32,
    /// Size of the database file in bytes (0 for in-memory stores)
    pub file_size: u64,
}

impl StoreStats {
    /// Human-readable file size
    pub fn file_size_human(&self) -> String {
        let size = self.file_size as f64;
        if size < 1024.0 {
            format!("{} B", self.file_size)
        } else if size < 1024.0 * 1024.0 {
            format!("{:.1} KB", size / 1024.0)
        } else {
            format!("{:.1} MB", size / (1024.0 * 1024.0))
        }
    }
}

/// Handle to the record store
pub struct StoreHandle {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

impl StoreHandle {
    /// Create a handle for the database at `path` without opening it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: Mutex::new(None),
        }
    }

    /// Create a handle for the configured database path
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.database_path())
    }

    /// Open (or create) the database at `path` immediately
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let handle = Self::new(path);
        handle.ensure_open()?;
        Ok(handle)
    }

    /// Open a fresh in-memory database (for testing)
    ///
    /// The contents are discarded when the handle is closed or dropped.
    pub fn open_in_memory() -> StorageResult<Self> {
        let handle = Self {
            location: Location::Memory,
            conn: Mutex::new(None),
        };
        handle.ensure_open()?;
        Ok(handle)
    }

    /// Path of the database file, if this is a file-backed store
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Whether a connection is currently open
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Open the connection now if it is not open yet
    pub fn ensure_open(&self) -> StorageResult<()> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        Ok(())
    }

    /// Close the connection; the next transaction re-opens it
    pub fn close(&self) {
        if self.lock().take().is_some() {
            debug!("Closed store {}", self.location.describe());
        }
    }

    /// Begin a transaction over `kinds`
    ///
    /// Blocks while another transaction on this handle is in progress.
    pub fn transaction(
        &self,
        kinds: &[RecordKind],
        mode: TransactionMode,
    ) -> StorageResult<Transaction<'_>> {
        let mut guard = self.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        Transaction::begin(guard, kinds, mode)
    }

    /// Record counts per kind plus file size
    pub fn stats(&self) -> StorageResult<StoreStats> {
        let tx = self.transaction(&RecordKind::ALL, TransactionMode::ReadOnly)?;
        let count = |kind: RecordKind| -> StorageResult<usize> { tx.count_kind(kind) };
        let stats = StoreStats {
            bookmarks: count(RecordKind::Bookmark)?,
            page_references: count(RecordKind::PageReference)?,
            groups: count(RecordKind::Group)?,
            queries: count(RecordKind::Query)?,
            schema_version: tx.schema_version()?,
            file_size: 0,
        };
        tx.commit()?;

        let file_size = match &self.location {
            Location::File(path) => file_size(path)?,
            Location::Memory => 0,
        };
        Ok(StoreStats { file_size, ..stats })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic mid-transaction leaves nothing half-applied: the
        // transaction guard rolls back on unwind.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connect(&self) -> StorageResult<Connection> {
        let location = self.location.describe();
        let init_failed = |details: String| StorageError::StoreInitFailed {
            location: location.clone(),
            details,
        };

        let conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
                    }
                }
                Connection::open(path).map_err(|e| init_failed(e.to_string()))?
            }
            Location::Memory => {
                Connection::open_in_memory().map_err(|e| init_failed(e.to_string()))?
            }
        };

        if schema::needs_migration(&conn) {
            info!("Migrating store {} to schema v{}", location, schema::SCHEMA_VERSION);
        }
        schema::run_all(&conn).map_err(|e| init_failed(e.to_string()))?;

        debug!("Opened store {}", location);
        Ok(conn)
    }
}

fn file_size(path: &Path) -> StorageResult<u64> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(StorageError::from_io(e, path.to_path_buf()))
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}
