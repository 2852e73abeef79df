//! Storage layer
//!
//! A transactional record store on SQLite.
//!
//! ## Architecture
//!
//! - **Record kinds**: `bookmark`, `pageReference`, `group`, `query`, one
//!   table each, rows holding the record as JSON
//! - **Secondary index**: `pageReference` by `url` (unique)
//! - **Transactions**: scoped to a set of kinds, readonly or readwrite,
//!   rolled back unless committed
//! - **Cursors**: filter/order/window scans over a kind

pub mod cursor;
pub mod error;
pub mod handle;
pub mod record;
pub mod schema;
pub mod transaction;

pub use cursor::{Cursor, Direction};
pub use error::{StorageError, StorageResult};
pub use handle::{StoreHandle, StoreStats};
pub use record::{Record, RecordKind};
pub use schema::SCHEMA_VERSION;
pub use transaction::{Transaction, TransactionMode};
