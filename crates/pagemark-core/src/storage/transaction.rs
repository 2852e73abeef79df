//! Scoped transactions over the record store
//!
//! A `Transaction` holds the store's connection for its whole lifetime, so
//! transactions are serialised within the process. Readwrite transactions
//! take SQLite's write lock up front (`BEGIN IMMEDIATE`), which makes a
//! check-then-insert inside one transaction atomic with respect to other
//! writers. Dropping an uncommitted transaction rolls it back.

use std::sync::MutexGuard;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, warn};

use super::cursor::{Cursor, Direction};
use super::error::{StorageError, StorageResult};
use super::record::{Record, RecordKind};
use super::schema;

/// Access mode of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// A transaction scoped to a set of record kinds
pub struct Transaction<'h> {
    conn: MutexGuard<'h, Option<Connection>>,
    kinds: Vec<RecordKind>,
    mode: TransactionMode,
    finished: bool,
}

impl<'h> Transaction<'h> {
    pub(crate) fn begin(
        conn: MutexGuard<'h, Option<Connection>>,
        kinds: &[RecordKind],
        mode: TransactionMode,
    ) -> StorageResult<Self> {
        let begin = match mode {
            TransactionMode::ReadOnly => "BEGIN DEFERRED",
            TransactionMode::ReadWrite => "BEGIN IMMEDIATE",
        };
        conn.as_ref().ok_or(StorageError::Closed)?.execute_batch(begin)?;

        let tx = Self {
            conn,
            kinds: kinds.to_vec(),
            mode,
            finished: false,
        };
        debug!("Transaction opened ({:?}) over [{}]", mode, tx.scope());
        Ok(tx)
    }

    /// Access mode of this transaction
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Kinds this transaction may touch
    pub fn kinds(&self) -> &[RecordKind] {
        &self.kinds
    }

    /// Commit every operation performed in this transaction
    pub fn commit(mut self) -> StorageResult<()> {
        self.connection()?.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    /// Discard every operation performed in this transaction
    pub fn rollback(mut self) -> StorageResult<()> {
        self.connection()?.execute_batch("ROLLBACK")?;
        self.finished = true;
        Ok(())
    }

    // ==================== Record Operations ====================

    /// Insert a new record
    ///
    /// Kinds with auto-assigned keys receive a fresh key when the record has
    /// none; the key is written back into the record. Supplying a key that
    /// already exists fails with `DuplicateKey`.
    pub fn add<T: Record>(&self, record: &mut T) -> StorageResult<T::Key> {
        self.check_write(T::KIND)?;
        let conn = self.connection()?;
        let table = T::KIND.table();

        let key = match record.key() {
            Some(key) => {
                if self.exists::<T>(&key)? {
                    return Err(StorageError::DuplicateKey {
                        kind: T::KIND,
                        key: format!("{:?}", key),
                    });
                }
                key
            }
            None => {
                if !T::KIND.auto_increment() {
                    return Err(StorageError::MissingKey(T::KIND));
                }
                conn.execute(&format!("INSERT INTO {} (data) VALUES ('null')", table), [])?;
                record.assign_key(conn.last_insert_rowid());
                record.key().ok_or(StorageError::MissingKey(T::KIND))?
            }
        };

        self.write_row(conn, &key, record)?;
        Ok(key)
    }

    /// Insert or replace a record by its primary key
    pub fn put<T: Record>(&self, record: &T) -> StorageResult<T::Key> {
        self.check_write(T::KIND)?;
        let conn = self.connection()?;
        let key = record.key().ok_or(StorageError::MissingKey(T::KIND))?;
        self.write_row(conn, &key, record)?;
        Ok(key)
    }

    /// Fetch a record by primary key
    pub fn get<T: Record>(&self, key: &T::Key) -> StorageResult<Option<T>> {
        self.check_scope(T::KIND)?;
        let data: Option<String> = self
            .connection()?
            .query_row(
                &format!("SELECT data FROM {} WHERE key = ?1", T::KIND.table()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(StorageError::from))
            .transpose()
    }

    /// Fetch a record through the kind's secondary index
    pub fn get_by_index<T: Record>(&self, value: &str) -> StorageResult<Option<T>> {
        self.check_scope(T::KIND)?;
        let column = T::KIND.index_column().ok_or(StorageError::NoIndex(T::KIND))?;
        let data: Option<String> = self
            .connection()?
            .query_row(
                &format!(
                    "SELECT data FROM {} WHERE {} = ?1",
                    T::KIND.table(),
                    column
                ),
                [value],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(StorageError::from))
            .transpose()
    }

    /// Delete a record by primary key, returning whether it existed
    pub fn delete<T: Record>(&self, key: &T::Key) -> StorageResult<bool> {
        self.check_write(T::KIND)?;
        let affected = self.connection()?.execute(
            &format!("DELETE FROM {} WHERE key = ?1", T::KIND.table()),
            params![key],
        )?;
        Ok(affected > 0)
    }

    /// Number of records of a kind
    pub fn count<T: Record>(&self) -> StorageResult<usize> {
        self.count_kind(T::KIND)
    }

    /// Remove every record of a kind
    pub fn clear<T: Record>(&self) -> StorageResult<()> {
        self.check_write(T::KIND)?;
        self.connection()?
            .execute(&format!("DELETE FROM {}", T::KIND.table()), [])?;
        Ok(())
    }

    /// Start a scan over every record of a kind
    pub fn cursor<T: Record>(&self) -> Cursor<'_, 'h, T> {
        Cursor::new(self)
    }

    // ==================== Internals ====================

    /// Walk the records of a kind in key order
    ///
    /// `step` returns `false` to stop the walk early.
    pub(crate) fn scan<T, F>(&self, direction: Direction, mut step: F) -> StorageResult<()>
    where
        T: Record,
        F: FnMut(T) -> bool,
    {
        self.check_scope(T::KIND)?;
        let order = match direction {
            Direction::Next => "ASC",
            Direction::Prev => "DESC",
        };
        let mut stmt = self.connection()?.prepare(&format!(
            "SELECT data FROM {} ORDER BY key {}",
            T::KIND.table(),
            order
        ))?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            let record: T = serde_json::from_str(&data)?;
            if !step(record) {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn count_kind(&self, kind: RecordKind) -> StorageResult<usize> {
        self.check_scope(kind)?;
        let count: i64 = self.connection()?.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub(crate) fn schema_version(&self) -> StorageResult<i32> {
        Ok(schema::get_schema_version(self.connection()?)?)
    }

    fn exists<T: Record>(&self, key: &T::Key) -> StorageResult<bool> {
        let exists = self
            .connection()?
            .prepare(&format!("SELECT 1 FROM {} WHERE key = ?1", T::KIND.table()))?
            .exists(params![key])?;
        Ok(exists)
    }

    fn write_row<T: Record>(
        &self,
        conn: &Connection,
        key: &T::Key,
        record: &T,
    ) -> StorageResult<()> {
        let data = serde_json::to_string(record)?;
        let table = T::KIND.table();

        let result = match T::KIND.index_column() {
            Some(column) => conn.execute(
                &format!(
                    "INSERT INTO {table} (key, {column}, data) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET {column} = excluded.{column}, data = excluded.data"
                ),
                params![key, record.index_value(), data],
            ),
            None => conn.execute(
                &format!(
                    "INSERT INTO {table} (key, data) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET data = excluded.data"
                ),
                params![key, data],
            ),
        };

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateKey {
                    kind: T::KIND,
                    key: record
                        .index_value()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{:?}", key)),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn connection(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn check_scope(&self, kind: RecordKind) -> StorageResult<()> {
        if self.kinds.contains(&kind) {
            Ok(())
        } else {
            Err(StorageError::KindNotInScope {
                kind,
                scope: self.scope(),
            })
        }
    }

    fn check_write(&self, kind: RecordKind) -> StorageResult<()> {
        self.check_scope(kind)?;
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(StorageError::ReadOnlyTransaction(kind)),
        }
    }

    fn scope(&self) -> String {
        self.kinds
            .iter()
            .map(RecordKind::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(conn) = self.conn.as_ref() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("Failed to roll back transaction: {}", e);
            }
        }
    }
}
