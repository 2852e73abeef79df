//! Group service
//!
//! CRUD for the group taxonomy. Groups and items that are still referenced
//! by a bookmark or one of its pages cannot be removed.

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Bookmark, EntityKind, Group, GroupForm, GroupPair};
use crate::storage::{RecordKind, StorageError, StoreHandle, Transaction, TransactionMode};

/// Kinds touched by occupancy checks
const OCCUPANCY_KINDS: [RecordKind; 2] = [RecordKind::Group, RecordKind::Bookmark];

/// Failures of group operations
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Group {0} not found")]
    NotFound(String),

    #[error("Group {0} already exists")]
    AlreadyExists(String),

    #[error("Item {item_key} of group {group_key} is still in use")]
    ItemOccupied { group_key: String, item_key: String },

    #[error("Group {0} is still in use")]
    GroupOccupied(String),

    #[error("Group {group_key} lists item {item_key} more than once")]
    DuplicateItem { group_key: String, item_key: String },

    #[error("Group key cannot be empty")]
    EmptyKey,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GroupError {
    /// Stable taxonomy code for this error
    pub fn code(&self) -> &'static str {
        match self {
            GroupError::NotFound(_) => "NOT_FOUND",
            GroupError::AlreadyExists(_) => "ALREADY_EXISTS",
            GroupError::ItemOccupied { .. } => "ITEM_OCCUPIED",
            GroupError::GroupOccupied(_) => "GROUP_OCCUPIED",
            GroupError::DuplicateItem { .. } => "DUPLICATE_ITEM",
            GroupError::EmptyKey => "INVALID_GROUP",
            GroupError::Storage(e) => e.code(),
        }
    }

    /// Whether the store itself failed, as opposed to a domain rule
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, GroupError::Storage(_))
    }
}

pub type GroupResult<T> = Result<T, GroupError>;

/// Group operations over a store
pub struct GroupService<'s> {
    store: &'s StoreHandle,
}

impl<'s> GroupService<'s> {
    pub fn new(store: &'s StoreHandle) -> Self {
        Self { store }
    }

    /// All groups, in key order
    pub fn get_groups(&self) -> GroupResult<Vec<Group>> {
        let tx = self
            .store
            .transaction(&[RecordKind::Group], TransactionMode::ReadOnly)?;
        let groups = tx.cursor::<Group>().to_list()?;
        tx.commit()?;
        Ok(groups)
    }

    /// Fetch one group
    pub fn get_group(&self, group_key: &str) -> GroupResult<Group> {
        let tx = self
            .store
            .transaction(&[RecordKind::Group], TransactionMode::ReadOnly)?;
        let group = tx
            .get::<Group>(&group_key.to_string())?
            .ok_or_else(|| GroupError::NotFound(group_key.to_string()))?;
        tx.commit()?;
        Ok(group)
    }

    /// Groups an entity of `kind` carrying `carried` may select
    pub fn available_groups(
        &self,
        kind: EntityKind,
        carried: &[GroupPair],
    ) -> GroupResult<Vec<Group>> {
        let tx = self
            .store
            .transaction(&[RecordKind::Group], TransactionMode::ReadOnly)?;
        let groups = tx
            .cursor::<Group>()
            .filter(|g| g.is_available(kind, carried))
            .to_list()?;
        tx.commit()?;
        Ok(groups)
    }

    /// Keys of single-select groups holding more than one of `pairs`
    ///
    /// Writes do not enforce this; callers use it to report violations.
    pub fn single_select_conflicts(&self, pairs: &[GroupPair]) -> GroupResult<Vec<String>> {
        let tx = self
            .store
            .transaction(&[RecordKind::Group], TransactionMode::ReadOnly)?;
        let conflicts = tx
            .cursor::<Group>()
            .filter(|g| !g.accepts_pairs(pairs))
            .to_list()?
            .into_iter()
            .map(|g| g.group_key_path)
            .collect();
        tx.commit()?;
        Ok(conflicts)
    }

    /// Create a group
    pub fn add_group(&self, form: GroupForm) -> GroupResult<Group> {
        validate(&form)?;

        let tx = self
            .store
            .transaction(&[RecordKind::Group], TransactionMode::ReadWrite)?;
        let key = form.group_key_path.clone();
        if tx.get::<Group>(&key)?.is_some() {
            return Err(GroupError::AlreadyExists(key));
        }

        let mut group = form;
        tx.add(&mut group).map_err(|e| match e {
            StorageError::DuplicateKey { .. } => GroupError::AlreadyExists(key.clone()),
            other => other.into(),
        })?;
        tx.commit()?;

        info!("Added group {} ({})", group.group_key_path, group.group_name);
        Ok(group)
    }

    /// Replace a group
    ///
    /// Fails when the update drops an item that is still referenced.
    pub fn update_group(&self, form: GroupForm) -> GroupResult<Group> {
        validate(&form)?;

        let tx = self
            .store
            .transaction(&OCCUPANCY_KINDS, TransactionMode::ReadWrite)?;
        let key = form.group_key_path.clone();
        let existing = tx
            .get::<Group>(&key)?
            .ok_or_else(|| GroupError::NotFound(key.clone()))?;

        for item in existing.removed_items(&form) {
            if is_occupied(&tx, |b| b.item_references(&key, &item.item_key_path) > 0)? {
                return Err(GroupError::ItemOccupied {
                    group_key: key,
                    item_key: item.item_key_path.clone(),
                });
            }
        }

        tx.put(&form)?;
        tx.commit()?;

        debug!("Updated group {}", key);
        Ok(form)
    }

    /// Delete an unreferenced group
    ///
    /// Returns the deleted group.
    pub fn delete_group(&self, group_key: &str) -> GroupResult<Group> {
        let tx = self
            .store
            .transaction(&OCCUPANCY_KINDS, TransactionMode::ReadWrite)?;
        let key = group_key.to_string();
        let group = tx
            .get::<Group>(&key)?
            .ok_or_else(|| GroupError::NotFound(key.clone()))?;

        if is_occupied(&tx, |b| b.references_group(group_key))? {
            return Err(GroupError::GroupOccupied(key));
        }

        tx.delete::<Group>(&key)?;
        tx.commit()?;

        info!("Deleted group {}", group_key);
        Ok(group)
    }
}

/// Whether any bookmark satisfies `uses`; stops at the first hit
fn is_occupied<'t>(
    tx: &'t Transaction<'_>,
    uses: impl Fn(&Bookmark) -> bool + 't,
) -> GroupResult<bool> {
    let hits = tx
        .cursor::<Bookmark>()
        .filter(uses)
        .limit_and_offset(Some(1), None)
        .count()?;
    Ok(hits > 0)
}

fn validate(form: &GroupForm) -> GroupResult<()> {
    if form.group_key_path.is_empty() {
        return Err(GroupError::EmptyKey);
    }
    if let Some(item_key) = form.duplicate_item_keys().first() {
        return Err(GroupError::DuplicateItem {
            group_key: form.group_key_path.clone(),
            item_key: item_key.to_string(),
        });
    }
    Ok(())
}
