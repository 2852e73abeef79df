//! Data models for pagemark
//!
//! Defines the persisted records: Bookmark (owning its Pages inline),
//! PageReference (the URL index entry for a Page) and Group (a tag axis
//! with selectable Items), plus the forms used to create and edit them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::storage::{Record, RecordKind};

/// Store-assigned bookmark key
pub type BookmarkId = i64;
/// Store-assigned page key, unique across all bookmarks
pub type PageId = i64;

/// A reference to one Item of one Group: `(groupKeyPath, itemKeyPath)`
///
/// Serialised as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupPair(pub String, pub String);

impl GroupPair {
    pub fn new(group_key: impl Into<String>, item_key: impl Into<String>) -> Self {
        Self(group_key.into(), item_key.into())
    }

    pub fn group_key(&self) -> &str {
        &self.0
    }

    pub fn item_key(&self) -> &str {
        &self.1
    }
}

impl fmt::Display for GroupPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

impl<G: Into<String>, I: Into<String>> From<(G, I)> for GroupPair {
    fn from((group_key, item_key): (G, I)) -> Self {
        Self::new(group_key, item_key)
    }
}

/// A named collection of pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Store-assigned identifier (0 until inserted)
    pub bookmark_id: BookmarkId,
    /// Primary display name
    pub name: String,
    /// Aliases
    #[serde(default)]
    pub other_names: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Free-form keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Selected group items
    #[serde(default)]
    pub groups: Vec<GroupPair>,
    /// Rating from 1 to 5
    #[serde(default)]
    pub score: Option<u8>,
    /// Latest `last_collect_time` across the pages
    #[serde(default)]
    pub last_collect_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Owned pages, in display order
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Bookmark {
    /// Build an unsaved bookmark from a form
    pub fn from_form(form: BookmarkForm, now: DateTime<Utc>) -> Self {
        Self {
            bookmark_id: 0,
            name: form.name,
            other_names: form.other_names,
            description: form.description,
            keywords: form.keywords,
            groups: form.groups,
            score: form.score,
            last_collect_time: None,
            create_time: now,
            update_time: now,
            pages: Vec::new(),
        }
    }

    /// Merge the fields present in `patch` over this bookmark
    pub fn apply_patch(&mut self, patch: BookmarkPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(other_names) = patch.other_names {
            self.other_names = other_names;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(keywords) = patch.keywords {
            self.keywords = keywords;
        }
        if let Some(groups) = patch.groups {
            self.groups = groups;
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
    }

    /// Position of a page in `pages`
    pub fn page_index(&self, page_id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.page_id == page_id)
    }

    /// Borrow a page by id
    pub fn page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_id == page_id)
    }

    /// Recompute `last_collect_time` from the pages
    ///
    /// Returns whether the value changed.
    pub fn recompute_last_collect_time(&mut self) -> bool {
        let latest = self.pages.iter().filter_map(|p| p.last_collect_time).max();
        let changed = latest != self.last_collect_time;
        self.last_collect_time = latest;
        changed
    }

    /// Whether the bookmark or any of its pages carries `pair`
    pub fn carries(&self, pair: &GroupPair) -> bool {
        self.groups.contains(pair) || self.pages.iter().any(|p| p.carries(pair))
    }

    /// Case-sensitive substring match on name, aliases and page titles
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.contains(needle)
            || self.other_names.iter().any(|n| n.contains(needle))
            || self.pages.iter().any(|p| p.title.contains(needle))
    }

    /// Whether the bookmark or any page references a group at all
    pub fn references_group(&self, group_key: &str) -> bool {
        self.all_pairs().any(|pair| pair.group_key() == group_key)
    }

    /// Number of references to one item across the bookmark and its pages
    pub fn item_references(&self, group_key: &str, item_key: &str) -> usize {
        self.all_pairs()
            .filter(|pair| pair.group_key() == group_key && pair.item_key() == item_key)
            .count()
    }

    fn all_pairs(&self) -> impl Iterator<Item = &GroupPair> {
        self.groups
            .iter()
            .chain(self.pages.iter().flat_map(|p| p.group_pairs()))
    }
}

impl Record for Bookmark {
    type Key = BookmarkId;
    const KIND: RecordKind = RecordKind::Bookmark;

    fn key(&self) -> Option<BookmarkId> {
        (self.bookmark_id > 0).then_some(self.bookmark_id)
    }

    fn assign_key(&mut self, key: i64) {
        self.bookmark_id = key;
    }
}

/// One collectible URL inside a bookmark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Identifier assigned through the page reference index
    pub page_id: PageId,
    pub url: String,
    /// Host derived from `url` (empty when the url does not parse)
    pub host: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub groups: Option<Vec<GroupPair>>,
    /// Free-text progress label, e.g. "up to #123"
    #[serde(default)]
    pub last_collect: Option<String>,
    #[serde(default)]
    pub last_collect_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Which parts of a page an edit touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageChange {
    /// title, url, description, keywords or groups differ
    pub content: bool,
    pub url: bool,
    pub last_collect_time: bool,
}

impl Page {
    /// Build a page from a form
    pub fn from_form(page_id: PageId, form: PageForm, now: DateTime<Utc>) -> Self {
        Self {
            page_id,
            host: derive_host(&form.url),
            url: form.url,
            title: form.title,
            description: form.description,
            keywords: form.keywords,
            groups: form.groups,
            last_collect: form.last_collect,
            last_collect_time: form.last_collect_time,
            create_time: now,
            update_time: now,
        }
    }

    /// Replace the editable fields with `form`
    ///
    /// `update_time` only moves when the content changed.
    pub fn apply_form(&mut self, form: PageForm, now: DateTime<Utc>) -> PageChange {
        let url = self.url != form.url;
        let content = url
            || self.title != form.title
            || self.description != form.description
            || self.keywords != form.keywords
            || self.groups != form.groups;
        let last_collect_time = self.last_collect_time != form.last_collect_time;

        if url {
            self.host = derive_host(&form.url);
        }
        self.url = form.url;
        self.title = form.title;
        self.description = form.description;
        self.keywords = form.keywords;
        self.groups = form.groups;
        self.last_collect = form.last_collect;
        self.last_collect_time = form.last_collect_time;
        if content {
            self.update_time = now;
        }

        PageChange {
            content,
            url,
            last_collect_time,
        }
    }

    /// Whether this page carries `pair`
    pub fn carries(&self, pair: &GroupPair) -> bool {
        self.group_pairs().any(|p| p == pair)
    }

    fn group_pairs(&self) -> impl Iterator<Item = &GroupPair> {
        self.groups.iter().flatten()
    }
}

/// Host part of a URL, or an empty string when it cannot be parsed
pub fn derive_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// URL index entry: exactly one per live page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageReference {
    pub page_id: PageId,
    pub url: String,
    pub bookmark_id: BookmarkId,
}

impl PageReference {
    /// Unsaved reference; the store assigns `page_id` on insert
    pub fn new(url: impl Into<String>, bookmark_id: BookmarkId) -> Self {
        Self {
            page_id: 0,
            url: url.into(),
            bookmark_id,
        }
    }
}

impl Record for PageReference {
    type Key = PageId;
    const KIND: RecordKind = RecordKind::PageReference;

    fn key(&self) -> Option<PageId> {
        (self.page_id > 0).then_some(self.page_id)
    }

    fn assign_key(&mut self, key: i64) {
        self.page_id = key;
    }

    fn index_value(&self) -> Option<&str> {
        Some(&self.url)
    }
}

/// Entity kinds a group may apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Bookmark,
    Page,
}

/// Restriction on which entity kinds may carry a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailableFor {
    Bookmark,
    Page,
    #[default]
    Both,
}

impl AvailableFor {
    pub fn allows(&self, kind: EntityKind) -> bool {
        match self {
            AvailableFor::Both => true,
            AvailableFor::Bookmark => kind == EntityKind::Bookmark,
            AvailableFor::Page => kind == EntityKind::Page,
        }
    }
}

/// A selectable value within a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupItem {
    pub item_key_path: String,
    pub item_name: String,
}

impl GroupItem {
    pub fn new(item_key_path: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_key_path: item_key_path.into(),
            item_name: item_name.into(),
        }
    }
}

/// A named taxonomy axis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique, caller-supplied key
    pub group_key_path: String,
    pub group_name: String,
    #[serde(default)]
    pub available_for: AvailableFor,
    /// Whether several items may be attached to one entity
    #[serde(default)]
    pub multi: bool,
    /// Pairs an entity must already carry for this group to be selectable
    #[serde(default)]
    pub available_condition: Option<Vec<GroupPair>>,
    #[serde(default)]
    pub items: Vec<GroupItem>,
}

impl Group {
    pub fn new(group_key_path: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            group_key_path: group_key_path.into(),
            group_name: group_name.into(),
            available_for: AvailableFor::Both,
            multi: false,
            available_condition: None,
            items: Vec::new(),
        }
    }

    /// Builder-style item append
    pub fn with_item(mut self, item_key_path: &str, item_name: &str) -> Self {
        self.items.push(GroupItem::new(item_key_path, item_name));
        self
    }

    pub fn item(&self, item_key_path: &str) -> Option<&GroupItem> {
        self.items.iter().find(|i| i.item_key_path == item_key_path)
    }

    /// Display name of an item, "UNKNOWN" for dangling references
    pub fn item_name(&self, item_key_path: &str) -> &str {
        self.item(item_key_path)
            .map(|i| i.item_name.as_str())
            .unwrap_or("UNKNOWN")
    }

    /// Whether entities of `kind` may carry this group at all
    pub fn accepts(&self, kind: EntityKind) -> bool {
        self.available_for.allows(kind)
    }

    /// Whether an entity of `kind` carrying `carried` may select this group
    ///
    /// Every pair in `available_condition` must be present.
    pub fn is_available(&self, kind: EntityKind, carried: &[GroupPair]) -> bool {
        self.accepts(kind)
            && self
                .available_condition
                .iter()
                .flatten()
                .all(|required| carried.contains(required))
    }

    /// Whether an entity may hold all of `pairs` for this group at once
    ///
    /// Single-select groups allow at most one pair; pairs for other groups
    /// are ignored.
    pub fn accepts_pairs(&self, pairs: &[GroupPair]) -> bool {
        self.multi
            || pairs
                .iter()
                .filter(|p| p.group_key() == self.group_key_path)
                .count()
                <= 1
    }

    /// Items present here but missing from `updated`
    pub fn removed_items<'a>(&'a self, updated: &Group) -> Vec<&'a GroupItem> {
        self.items
            .iter()
            .filter(|item| updated.item(&item.item_key_path).is_none())
            .collect()
    }

    /// Item keys that appear more than once
    pub fn duplicate_item_keys(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.items
            .iter()
            .map(|i| i.item_key_path.as_str())
            .filter(|key| !seen.insert(*key))
            .collect()
    }
}

impl Record for Group {
    type Key = String;
    const KIND: RecordKind = RecordKind::Group;

    fn key(&self) -> Option<String> {
        (!self.group_key_path.is_empty()).then(|| self.group_key_path.clone())
    }
}

/// Input for `add_group` / `update_group`
///
/// Groups carry no store-assigned fields, so the form is the record itself.
pub type GroupForm = Group;

/// Fields for creating a bookmark
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkForm {
    pub name: String,
    pub other_names: Vec<String>,
    pub description: String,
    pub keywords: Vec<String>,
    pub groups: Vec<GroupPair>,
    pub score: Option<u8>,
}

impl BookmarkForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial bookmark update: `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkPatch {
    pub name: Option<String>,
    pub other_names: Option<Vec<String>>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub groups: Option<Vec<GroupPair>>,
    /// `Some(None)` clears the score
    pub score: Option<Option<u8>>,
}

/// Editable fields of a page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageForm {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub groups: Option<Vec<GroupPair>>,
    pub last_collect: Option<String>,
    pub last_collect_time: Option<DateTime<Utc>>,
}

impl PageForm {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

impl From<&Page> for PageForm {
    fn from(page: &Page) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            description: page.description.clone(),
            keywords: page.keywords.clone(),
            groups: page.groups.clone(),
            last_collect: page.last_collect.clone(),
            last_collect_time: page.last_collect_time,
        }
    }
}
