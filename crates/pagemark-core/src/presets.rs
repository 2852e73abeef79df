//! Stored query presets
//!
//! A preset is a named `BookmarkQuery` kept in the `query` kind so a saved
//! search can be replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::bookmarks::query_cursor;
use crate::models::Bookmark;
use crate::query::BookmarkQuery;
use crate::storage::{Record, RecordKind, StorageError, StoreHandle, TransactionMode};

/// Store-assigned preset key
pub type QueryId = i64;

/// A named, stored bookmark query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryPreset {
    /// Store-assigned identifier (0 until inserted)
    pub query_id: QueryId,
    pub name: String,
    pub query: BookmarkQuery,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Record for QueryPreset {
    type Key = QueryId;
    const KIND: RecordKind = RecordKind::Query;

    fn key(&self) -> Option<QueryId> {
        (self.query_id > 0).then_some(self.query_id)
    }

    fn assign_key(&mut self, key: i64) {
        self.query_id = key;
    }
}

#[derive(Error, Debug)]
pub enum QueryPresetError {
    #[error("Query preset {0} not found")]
    NotFound(QueryId),

    #[error("Query preset name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QueryPresetError {
    /// Stable taxonomy code for this error
    pub fn code(&self) -> &'static str {
        match self {
            QueryPresetError::NotFound(_) => "NOT_FOUND",
            QueryPresetError::EmptyName => "INVALID_PRESET",
            QueryPresetError::Storage(e) => e.code(),
        }
    }

    /// Whether the store itself failed, as opposed to a domain rule
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, QueryPresetError::Storage(_))
    }
}

pub type QueryPresetResult<T> = Result<T, QueryPresetError>;

/// Preset operations over a store
pub struct QueryPresetService<'s> {
    store: &'s StoreHandle,
}

impl<'s> QueryPresetService<'s> {
    pub fn new(store: &'s StoreHandle) -> Self {
        Self { store }
    }

    /// All presets, oldest first
    pub fn list_presets(&self) -> QueryPresetResult<Vec<QueryPreset>> {
        let tx = self
            .store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)?;
        let presets = tx.cursor::<QueryPreset>().to_list()?;
        tx.commit()?;
        Ok(presets)
    }

    /// Fetch one preset
    pub fn get_preset(&self, query_id: QueryId) -> QueryPresetResult<QueryPreset> {
        let tx = self
            .store
            .transaction(&[RecordKind::Query], TransactionMode::ReadOnly)?;
        let preset = tx
            .get::<QueryPreset>(&query_id)?
            .ok_or(QueryPresetError::NotFound(query_id))?;
        tx.commit()?;
        Ok(preset)
    }

    /// Store a query under `name`
    ///
    /// An existing preset with the same name is overwritten in place.
    pub fn save_preset(&self, name: &str, query: BookmarkQuery) -> QueryPresetResult<QueryPreset> {
        if name.trim().is_empty() {
            return Err(QueryPresetError::EmptyName);
        }

        let tx = self
            .store
            .transaction(&[RecordKind::Query], TransactionMode::ReadWrite)?;
        let now = Utc::now();
        let existing = tx
            .cursor::<QueryPreset>()
            .filter(|p| p.name == name)
            .limit_and_offset(Some(1), None)
            .to_list()?
            .pop();

        let preset = match existing {
            Some(mut preset) => {
                preset.query = query;
                preset.update_time = now;
                tx.put(&preset)?;
                preset
            }
            None => {
                let mut preset = QueryPreset {
                    query_id: 0,
                    name: name.to_string(),
                    query,
                    create_time: now,
                    update_time: now,
                };
                tx.add(&mut preset)?;
                preset
            }
        };
        tx.commit()?;

        info!("Saved query preset {} ({})", preset.query_id, preset.name);
        Ok(preset)
    }

    /// Delete a preset, returning it
    pub fn delete_preset(&self, query_id: QueryId) -> QueryPresetResult<QueryPreset> {
        let tx = self
            .store
            .transaction(&[RecordKind::Query], TransactionMode::ReadWrite)?;
        let preset = tx
            .get::<QueryPreset>(&query_id)?
            .ok_or(QueryPresetError::NotFound(query_id))?;
        tx.delete::<QueryPreset>(&query_id)?;
        tx.commit()?;

        info!("Deleted query preset {} ({})", query_id, preset.name);
        Ok(preset)
    }

    /// Execute a stored query
    pub fn run_preset(&self, query_id: QueryId) -> QueryPresetResult<Vec<Bookmark>> {
        let tx = self.store.transaction(
            &[RecordKind::Query, RecordKind::Bookmark],
            TransactionMode::ReadOnly,
        )?;
        let preset = tx
            .get::<QueryPreset>(&query_id)?
            .ok_or(QueryPresetError::NotFound(query_id))?;
        let bookmarks = query_cursor(&tx, &preset.query).to_list()?;
        tx.commit()?;
        Ok(bookmarks)
    }
}
