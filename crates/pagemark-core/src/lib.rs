//! Pagemark Core Library
//!
//! This crate provides the core functionality for pagemark, a local
//! bookmark manager that groups collectible pages under named bookmarks and
//! tags both with a configurable group taxonomy.
//!
//! # Architecture
//!
//! - **Record store**: SQLite tables per record kind, scoped transactions
//! - **Cursor engine**: filter/order/limit/offset scans over a kind
//! - **Services**: bookmark, group and query-preset operations enforcing
//!   URL uniqueness and group referential integrity
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = StoreHandle::from_config(&config);
//! let bookmarks = BookmarkService::new(&store);
//!
//! // Add a bookmark and a page
//! let bookmark = bookmarks.add_bookmark(BookmarkForm::new("Rust Book"))?;
//! bookmarks.add_page(bookmark.bookmark_id, None, PageForm::new(url, "The Book"))?;
//!
//! // Query bookmarks
//! let found = bookmarks.query_bookmarks(&BookmarkQuery::default())?;
//! ```
//!
//! # Modules
//!
//! - `storage`: record store, transactions and cursors
//! - `models`: bookmarks, pages, page references and groups
//! - `query`: bookmark query description
//! - `bookmarks`: bookmark and page operations
//! - `groups`: group taxonomy operations
//! - `presets`: stored query presets
//! - `config`: application configuration

pub mod bookmarks;
pub mod config;
pub mod groups;
pub mod models;
pub mod presets;
pub mod query;
pub mod storage;

pub use bookmarks::{BookmarkError, BookmarkService, MoveOutcome, PageLocation};
pub use config::Config;
pub use groups::{GroupError, GroupService};
pub use models::{
    AvailableFor, Bookmark, BookmarkForm, BookmarkId, BookmarkPatch, EntityKind, Group, GroupForm,
    GroupItem, GroupPair, Page, PageForm, PageId, PageReference,
};
pub use presets::{QueryId, QueryPreset, QueryPresetError, QueryPresetService};
pub use query::{BookmarkOrder, BookmarkQuery, OrderDirection};
pub use storage::{StorageError, StoreHandle, StoreStats};
