//! Record kinds and the `Record` trait
//!
//! Every persisted type names the kind (table) it lives in and how its
//! primary key is read and assigned.

use std::fmt;

use rusqlite::types::{FromSql, ToSql};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The named record kinds held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Bookmark,
    PageReference,
    Group,
    Query,
}

impl RecordKind {
    /// All kinds, in migration order
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Bookmark,
        RecordKind::PageReference,
        RecordKind::Group,
        RecordKind::Query,
    ];

    /// Logical name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Bookmark => "bookmark",
            RecordKind::PageReference => "pageReference",
            RecordKind::Group => "group",
            RecordKind::Query => "query",
        }
    }

    /// Backing SQLite table
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Bookmark => "bookmark_store",
            RecordKind::PageReference => "page_reference_store",
            RecordKind::Group => "group_store",
            RecordKind::Query => "query_store",
        }
    }

    /// Column holding the secondary index value, if the kind has one
    pub fn index_column(&self) -> Option<&'static str> {
        match self {
            RecordKind::PageReference => Some("url"),
            _ => None,
        }
    }

    /// Whether the store assigns integer keys on insert
    pub fn auto_increment(&self) -> bool {
        !matches!(self, RecordKind::Group)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value that can be stored in the record store
pub trait Record: Serialize + DeserializeOwned {
    /// Primary key type
    type Key: ToSql + FromSql + Clone + fmt::Debug;

    /// Kind this record is stored under
    const KIND: RecordKind;

    /// Primary key, or `None` if the store has not assigned one yet
    fn key(&self) -> Option<Self::Key>;

    /// Receive a store-assigned key (auto-increment kinds only)
    fn assign_key(&mut self, _key: i64) {}

    /// Value for the kind's secondary index column
    fn index_value(&self) -> Option<&str> {
        None
    }
}
