//! Bookmark service
//!
//! Domain operations over bookmarks and their pages. Every operation runs in
//! one transaction over the kinds it touches, so the URL uniqueness check and
//! the PageReference write it guards are atomic.
//!
//! ## Usage
//!
//! ```ignore
//! let store = StoreHandle::from_config(&config);
//! let bookmarks = BookmarkService::new(&store);
//!
//! let bookmark = bookmarks.add_bookmark(BookmarkForm::new("Rust Book"))?;
//! bookmarks.add_page(
//!     bookmark.bookmark_id,
//!     None,
//!     PageForm::new("https://doc.rust-lang.org/book/", "The Book"),
//! )?;
//! ```

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    Bookmark, BookmarkForm, BookmarkId, BookmarkPatch, Page, PageForm, PageId, PageReference,
};
use crate::query::BookmarkQuery;
use crate::storage::{
    Cursor, RecordKind, StorageError, StoreHandle, Transaction, TransactionMode,
};

/// Kinds touched by page operations
const PAGE_KINDS: [RecordKind; 2] = [RecordKind::Bookmark, RecordKind::PageReference];

/// Failures of bookmark and page operations
#[derive(Error, Debug)]
pub enum BookmarkError {
    #[error("Bookmark {0} not found")]
    NotFound(BookmarkId),

    #[error("Bookmark {0} not found")]
    BookmarkNotFound(BookmarkId),

    #[error("Page {page_id} not found in bookmark {bookmark_id}")]
    PageNotFound {
        bookmark_id: BookmarkId,
        page_id: PageId,
    },

    #[error("Target bookmark {0} not found")]
    TargetBookmarkNotFound(BookmarkId),

    #[error("A page with URL {0} already exists")]
    UrlAlreadyExists(String),

    #[error("Score must be between 1 and 5, got {0}")]
    InvalidScore(u8),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BookmarkError {
    /// Stable taxonomy code for this error
    pub fn code(&self) -> &'static str {
        match self {
            BookmarkError::NotFound(_) => "NOT_FOUND",
            BookmarkError::BookmarkNotFound(_) => "BOOKMARK_NOT_FOUND",
            BookmarkError::PageNotFound { .. } => "PAGE_NOT_FOUND",
            BookmarkError::TargetBookmarkNotFound(_) => "TARGET_BOOKMARK_NOT_FOUND",
            BookmarkError::UrlAlreadyExists(_) => "URL_ALREADY_EXISTS",
            BookmarkError::InvalidScore(_) => "INVALID_SCORE",
            BookmarkError::Storage(e) => e.code(),
        }
    }

    /// Whether the store itself failed, as opposed to a domain rule
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, BookmarkError::Storage(_))
    }
}

pub type BookmarkResult<T> = Result<T, BookmarkError>;

/// A page together with the bookmark that owns it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLocation {
    pub bookmark: Bookmark,
    pub page: Page,
}

/// Both ends of a page move
///
/// For moves within one bookmark both fields hold the same bookmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveOutcome {
    pub origin: Bookmark,
    pub target: Bookmark,
}

/// Bookmark and page operations over a store
pub struct BookmarkService<'s> {
    store: &'s StoreHandle,
}

impl<'s> BookmarkService<'s> {
    pub fn new(store: &'s StoreHandle) -> Self {
        Self { store }
    }

    // ==================== Bookmark Operations ====================

    /// Bookmarks matching `query`, ordered and windowed as requested
    pub fn query_bookmarks(&self, query: &BookmarkQuery) -> BookmarkResult<Vec<Bookmark>> {
        let tx = self
            .store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadOnly)?;
        let bookmarks = query_cursor(&tx, query).to_list()?;
        tx.commit()?;
        Ok(bookmarks)
    }

    /// Number of bookmarks matching `query`, ignoring limit and offset
    pub fn count_bookmarks(&self, query: &BookmarkQuery) -> BookmarkResult<usize> {
        let unwindowed = BookmarkQuery {
            order: None,
            ..query.unwindowed()
        };
        let tx = self
            .store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadOnly)?;
        let count = query_cursor(&tx, &unwindowed).count()?;
        tx.commit()?;
        Ok(count)
    }

    /// Fetch one bookmark
    pub fn get_bookmark(&self, bookmark_id: BookmarkId) -> BookmarkResult<Bookmark> {
        let tx = self
            .store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadOnly)?;
        let bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::NotFound(bookmark_id))?;
        tx.commit()?;
        Ok(bookmark)
    }

    /// Create a bookmark with no pages
    pub fn add_bookmark(&self, form: BookmarkForm) -> BookmarkResult<Bookmark> {
        check_score(form.score)?;

        let tx = self
            .store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadWrite)?;
        let mut bookmark = Bookmark::from_form(form, Utc::now());
        tx.add(&mut bookmark)?;
        tx.commit()?;

        info!("Added bookmark {} ({})", bookmark.bookmark_id, bookmark.name);
        Ok(bookmark)
    }

    /// Merge `patch` over a bookmark; always refreshes `update_time`
    pub fn update_bookmark(
        &self,
        bookmark_id: BookmarkId,
        patch: BookmarkPatch,
    ) -> BookmarkResult<Bookmark> {
        if let Some(score) = patch.score {
            check_score(score)?;
        }

        let tx = self
            .store
            .transaction(&[RecordKind::Bookmark], TransactionMode::ReadWrite)?;
        let mut bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::NotFound(bookmark_id))?;

        bookmark.apply_patch(patch);
        bookmark.update_time = Utc::now();
        tx.put(&bookmark)?;
        tx.commit()?;

        debug!("Updated bookmark {}", bookmark_id);
        Ok(bookmark)
    }

    /// Delete a bookmark and the URL index entries of its pages
    ///
    /// Returns the deleted bookmark.
    pub fn delete_bookmark(&self, bookmark_id: BookmarkId) -> BookmarkResult<Bookmark> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadWrite)?;
        let bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::NotFound(bookmark_id))?;

        for page in &bookmark.pages {
            if !tx.delete::<PageReference>(&page.page_id)? {
                warn!(
                    "Page {} of bookmark {} had no URL index entry",
                    page.page_id, bookmark_id
                );
            }
        }

        // References pointing here without a page in the array
        let strays = tx
            .cursor::<PageReference>()
            .filter(|r| r.bookmark_id == bookmark_id)
            .to_list()?;
        for stray in strays {
            warn!(
                "Removing stray URL index entry {} for bookmark {}",
                stray.url, bookmark_id
            );
            tx.delete::<PageReference>(&stray.page_id)?;
        }

        tx.delete::<Bookmark>(&bookmark_id)?;
        tx.commit()?;

        info!(
            "Deleted bookmark {} ({}) with {} page(s)",
            bookmark_id,
            bookmark.name,
            bookmark.pages.len()
        );
        Ok(bookmark)
    }

    // ==================== Page Operations ====================

    /// Find the page holding `url` and its owning bookmark
    ///
    /// A dangling index entry is reported as not found.
    pub fn query_page_by_url(&self, url: &str) -> BookmarkResult<Option<PageLocation>> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadOnly)?;
        let location = locate(&tx, url)?;
        tx.commit()?;
        Ok(location)
    }

    /// Add a page to a bookmark at `insert_index` (append when `None` or
    /// past the end)
    pub fn add_page(
        &self,
        bookmark_id: BookmarkId,
        insert_index: Option<usize>,
        form: PageForm,
    ) -> BookmarkResult<Page> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadWrite)?;
        let mut bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::BookmarkNotFound(bookmark_id))?;

        if tx.get_by_index::<PageReference>(&form.url)?.is_some() {
            return Err(BookmarkError::UrlAlreadyExists(form.url));
        }

        let mut reference = PageReference::new(form.url.clone(), bookmark_id);
        tx.add(&mut reference).map_err(|e| url_conflict(e, &form.url))?;

        let now = Utc::now();
        let page = Page::from_form(reference.page_id, form, now);
        let index = clamp_insert(insert_index, bookmark.pages.len());
        bookmark.pages.insert(index, page.clone());
        if page.last_collect_time.is_some() {
            bookmark.recompute_last_collect_time();
        }
        bookmark.update_time = now;
        tx.put(&bookmark)?;
        tx.commit()?;

        info!(
            "Added page {} ({}) to bookmark {} at {}",
            page.page_id, page.url, bookmark_id, index
        );
        Ok(page)
    }

    /// Replace a page's editable fields
    ///
    /// `update_time` of the page and the bookmark only moves when title,
    /// url, description, keywords or groups changed.
    pub fn update_page(
        &self,
        bookmark_id: BookmarkId,
        page_id: PageId,
        form: PageForm,
    ) -> BookmarkResult<Page> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadWrite)?;
        let mut bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::BookmarkNotFound(bookmark_id))?;
        let index = bookmark
            .page_index(page_id)
            .ok_or(BookmarkError::PageNotFound {
                bookmark_id,
                page_id,
            })?;

        if bookmark.pages[index].url != form.url {
            if let Some(existing) = tx.get_by_index::<PageReference>(&form.url)? {
                if existing.page_id != page_id {
                    return Err(BookmarkError::UrlAlreadyExists(form.url));
                }
            }
        }

        let now = Utc::now();
        let change = bookmark.pages[index].apply_form(form, now);

        if change.url {
            let url = bookmark.pages[index].url.clone();
            let mut reference = tx.get::<PageReference>(&page_id)?.unwrap_or_else(|| {
                warn!("Page {} had no URL index entry, recreating it", page_id);
                PageReference {
                    page_id,
                    url: url.clone(),
                    bookmark_id,
                }
            });
            reference.url = url;
            tx.put(&reference).map_err(|e| url_conflict(e, &reference.url))?;
        }
        if change.last_collect_time {
            bookmark.recompute_last_collect_time();
        }
        if change.content {
            bookmark.update_time = now;
        }

        let page = bookmark.pages[index].clone();
        tx.put(&bookmark)?;
        tx.commit()?;

        debug!("Updated page {} of bookmark {}", page_id, bookmark_id);
        Ok(page)
    }

    /// Move a page within a bookmark or into another one
    ///
    /// `target_index` names a slot in the page list as it was before the move:
    /// the page lands before the page currently at that index. `None` or an
    /// index past the end appends.
    pub fn move_page(
        &self,
        bookmark_id: BookmarkId,
        page_id: PageId,
        target_bookmark_id: BookmarkId,
        target_index: Option<usize>,
    ) -> BookmarkResult<MoveOutcome> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadWrite)?;
        let mut origin = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::BookmarkNotFound(bookmark_id))?;
        let from = origin
            .page_index(page_id)
            .ok_or(BookmarkError::PageNotFound {
                bookmark_id,
                page_id,
            })?;

        let now = Utc::now();

        if target_bookmark_id == bookmark_id {
            let to = reorder_index(from, target_index, origin.pages.len());
            if to == from {
                tx.commit()?;
                return Ok(MoveOutcome {
                    origin: origin.clone(),
                    target: origin,
                });
            }

            let page = origin.pages.remove(from);
            origin.pages.insert(to, page);
            origin.update_time = now;
            tx.put(&origin)?;
            tx.commit()?;

            debug!(
                "Moved page {} within bookmark {} from {} to {}",
                page_id, bookmark_id, from, to
            );
            return Ok(MoveOutcome {
                origin: origin.clone(),
                target: origin,
            });
        }

        let mut target = tx
            .get::<Bookmark>(&target_bookmark_id)?
            .ok_or(BookmarkError::TargetBookmarkNotFound(target_bookmark_id))?;

        let page = origin.pages.remove(from);
        let collected = page.last_collect_time.is_some();
        let to = clamp_insert(target_index, target.pages.len());
        target.pages.insert(to, page);

        if collected {
            origin.recompute_last_collect_time();
            target.recompute_last_collect_time();
        }
        origin.update_time = now;
        target.update_time = now;

        let url = target.pages[to].url.clone();
        let mut reference = tx.get::<PageReference>(&page_id)?.unwrap_or_else(|| {
            warn!("Page {} had no URL index entry, recreating it", page_id);
            PageReference::new(url, target_bookmark_id)
        });
        reference.page_id = page_id;
        reference.bookmark_id = target_bookmark_id;
        tx.put(&reference)?;
        tx.put(&origin)?;
        tx.put(&target)?;
        tx.commit()?;

        info!(
            "Moved page {} from bookmark {} to bookmark {} at {}",
            page_id, bookmark_id, target_bookmark_id, to
        );
        Ok(MoveOutcome { origin, target })
    }

    /// Remove a page and its URL index entry
    ///
    /// Returns the removed page.
    pub fn delete_page(&self, bookmark_id: BookmarkId, page_id: PageId) -> BookmarkResult<Page> {
        let tx = self.store.transaction(&PAGE_KINDS, TransactionMode::ReadWrite)?;
        let mut bookmark = tx
            .get::<Bookmark>(&bookmark_id)?
            .ok_or(BookmarkError::BookmarkNotFound(bookmark_id))?;
        let index = bookmark
            .page_index(page_id)
            .ok_or(BookmarkError::PageNotFound {
                bookmark_id,
                page_id,
            })?;

        let page = bookmark.pages.remove(index);
        if !tx.delete::<PageReference>(&page_id)? {
            warn!("Page {} had no URL index entry", page_id);
        }
        if page.last_collect_time.is_some() {
            bookmark.recompute_last_collect_time();
        }
        bookmark.update_time = Utc::now();
        tx.put(&bookmark)?;
        tx.commit()?;

        info!("Deleted page {} ({}) from bookmark {}", page_id, page.url, bookmark_id);
        Ok(page)
    }
}

/// Cursor over bookmarks applying the filters, order and window of `query`
pub(crate) fn query_cursor<'t, 'h>(
    tx: &'t Transaction<'h>,
    query: &'t BookmarkQuery,
) -> Cursor<'t, 'h, Bookmark> {
    let mut cursor = tx.cursor::<Bookmark>().filter(move |b| query.matches(b));
    if let Some(comparator) = query.comparator() {
        cursor = cursor.order(comparator);
    }
    cursor.limit_and_offset(query.limit, query.offset)
}

fn locate(tx: &Transaction<'_>, url: &str) -> BookmarkResult<Option<PageLocation>> {
    let Some(reference) = tx.get_by_index::<PageReference>(url)? else {
        return Ok(None);
    };
    let Some(bookmark) = tx.get::<Bookmark>(&reference.bookmark_id)? else {
        warn!(
            "URL index entry {} points at missing bookmark {}",
            url, reference.bookmark_id
        );
        return Ok(None);
    };
    let Some(page) = bookmark.page(reference.page_id).cloned() else {
        warn!(
            "URL index entry {} points at missing page {} in bookmark {}",
            url, reference.page_id, reference.bookmark_id
        );
        return Ok(None);
    };
    Ok(Some(PageLocation { bookmark, page }))
}

fn clamp_insert(index: Option<usize>, len: usize) -> usize {
    index.filter(|i| *i <= len).unwrap_or(len)
}

/// Final position of a page moved from `from` to before `index`
///
/// Removing the page shifts every later slot down by one.
fn reorder_index(from: usize, index: Option<usize>, len: usize) -> usize {
    match index {
        Some(i) if i < len && i > from => i - 1,
        Some(i) if i < len => i,
        _ => len - 1,
    }
}

fn check_score(score: Option<u8>) -> BookmarkResult<()> {
    match score {
        Some(s) if !(1..=5).contains(&s) => Err(BookmarkError::InvalidScore(s)),
        _ => Ok(()),
    }
}

fn url_conflict(error: StorageError, url: &str) -> BookmarkError {
    match error {
        StorageError::DuplicateKey {
            kind: RecordKind::PageReference,
            ..
        } => BookmarkError::UrlAlreadyExists(url.to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupPair;
    use crate::query::{BookmarkOrder, OrderDirection};
    use chrono::{DateTime, Duration};

    fn store() -> StoreHandle {
        StoreHandle::open_in_memory().unwrap()
    }

    fn add(service: &BookmarkService, name: &str) -> Bookmark {
        service.add_bookmark(BookmarkForm::new(name)).unwrap()
    }

    fn page_form(url: &str, collected: Option<DateTime<Utc>>) -> PageForm {
        let mut form = PageForm::new(url, url);
        form.last_collect_time = collected;
        form
    }

    fn page_ids(bookmark: &Bookmark) -> Vec<PageId> {
        bookmark.pages.iter().map(|p| p.page_id).collect()
    }

    fn reference_count(store: &StoreHandle) -> usize {
        store.stats().unwrap().page_references
    }

    #[test]
    fn test_add_and_get_bookmark() {
        let store = store();
        let service = BookmarkService::new(&store);

        let mut form = BookmarkForm::new("Series");
        form.other_names = vec!["Alias".to_string()];
        form.groups = vec![GroupPair::new("STATUS", "TODO")];
        form.score = Some(5);
        let added = service.add_bookmark(form.clone()).unwrap();

        assert!(added.bookmark_id > 0);
        let fetched = service.get_bookmark(added.bookmark_id).unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched.other_names, form.other_names);
        assert!(fetched.pages.is_empty());
    }

    #[test]
    fn test_invalid_score_rejected() {
        let store = store();
        let service = BookmarkService::new(&store);

        let mut form = BookmarkForm::new("B");
        form.score = Some(6);
        let err = service.add_bookmark(form).unwrap_err();
        assert_eq!(err.code(), "INVALID_SCORE");
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn test_update_bookmark_merges_and_touches() {
        let store = store();
        let service = BookmarkService::new(&store);
        let mut form = BookmarkForm::new("Old");
        form.description = "kept".to_string();
        let added = service.add_bookmark(form).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = service
            .update_bookmark(
                added.bookmark_id,
                BookmarkPatch {
                    name: Some("New".to_string()),
                    ..BookmarkPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "New");
        assert_eq!(updated.description, "kept");
        assert!(updated.update_time > added.update_time);
        assert_eq!(updated.create_time, added.create_time);
    }

    #[test]
    fn test_update_missing_bookmark() {
        let store = store();
        let service = BookmarkService::new(&store);

        let err = service
            .update_bookmark(42, BookmarkPatch::default())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(service.delete_bookmark(42).unwrap_err().code(), "NOT_FOUND");
    }

    #[test]
    fn test_add_page_appends_and_inserts() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");

        let p1 = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();
        let p2 = service.add_page(b.bookmark_id, None, page_form("https://a/2", None)).unwrap();
        let p3 = service
            .add_page(b.bookmark_id, Some(0), page_form("https://a/3", None))
            .unwrap();
        let p4 = service
            .add_page(b.bookmark_id, Some(99), page_form("https://a/4", None))
            .unwrap();

        let b = service.get_bookmark(b.bookmark_id).unwrap();
        assert_eq!(
            page_ids(&b),
            vec![p3.page_id, p1.page_id, p2.page_id, p4.page_id]
        );
        assert_eq!(p1.host, "a");
        assert_eq!(reference_count(&store), 4);
    }

    #[test]
    fn test_page_ids_unique_across_bookmarks() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b1 = add(&service, "B1");
        let b2 = add(&service, "B2");

        let p1 = service.add_page(b1.bookmark_id, None, page_form("https://a/1", None)).unwrap();
        let p2 = service.add_page(b2.bookmark_id, None, page_form("https://a/2", None)).unwrap();
        assert_ne!(p1.page_id, p2.page_id);
    }

    #[test]
    fn test_add_page_missing_bookmark() {
        let store = store();
        let service = BookmarkService::new(&store);

        let err = service
            .add_page(7, None, page_form("https://a/1", None))
            .unwrap_err();
        assert_eq!(err.code(), "BOOKMARK_NOT_FOUND");
        assert_eq!(reference_count(&store), 0);
    }

    #[test]
    fn test_duplicate_url_has_no_side_effects() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b1 = add(&service, "B1");
        let b2 = add(&service, "B2");
        service.add_page(b1.bookmark_id, None, page_form("https://x/1", None)).unwrap();

        let err = service
            .add_page(b2.bookmark_id, None, page_form("https://x/1", None))
            .unwrap_err();
        assert_eq!(err.code(), "URL_ALREADY_EXISTS");

        let b2_after = service.get_bookmark(b2.bookmark_id).unwrap();
        assert_eq!(b2_after, b2);
        assert_eq!(reference_count(&store), 1);
    }

    #[test]
    fn test_last_collect_time_tracks_pages() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let t0 = Utc::now() - Duration::days(2);
        let t1 = Utc::now() - Duration::days(1);

        let p0 = service.add_page(b.bookmark_id, None, page_form("https://a/0", Some(t0))).unwrap();
        let p1 = service.add_page(b.bookmark_id, None, page_form("https://a/1", Some(t1))).unwrap();
        assert_eq!(service.get_bookmark(b.bookmark_id).unwrap().last_collect_time, Some(t1));

        service.delete_page(b.bookmark_id, p1.page_id).unwrap();
        assert_eq!(service.get_bookmark(b.bookmark_id).unwrap().last_collect_time, Some(t0));

        let mut form = PageForm::from(&p0);
        form.last_collect_time = None;
        service.update_page(b.bookmark_id, p0.page_id, form).unwrap();
        assert_eq!(service.get_bookmark(b.bookmark_id).unwrap().last_collect_time, None);
    }

    #[test]
    fn test_update_page_only_touches_on_content_change() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let page = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();
        let before = service.get_bookmark(b.bookmark_id).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut form = PageForm::from(&page);
        form.last_collect = Some("up to #3".to_string());
        let same = service.update_page(b.bookmark_id, page.page_id, form).unwrap();
        assert_eq!(same.update_time, page.update_time);
        assert_eq!(same.last_collect.as_deref(), Some("up to #3"));
        assert_eq!(
            service.get_bookmark(b.bookmark_id).unwrap().update_time,
            before.update_time
        );

        let mut form = PageForm::from(&same);
        form.keywords = Some(vec!["k".to_string()]);
        let changed = service.update_page(b.bookmark_id, page.page_id, form).unwrap();
        assert!(changed.update_time > page.update_time);
        assert!(service.get_bookmark(b.bookmark_id).unwrap().update_time > before.update_time);
    }

    #[test]
    fn test_update_page_url_rewrites_reference() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let page = service.add_page(b.bookmark_id, None, page_form("https://a/old", None)).unwrap();
        service.add_page(b.bookmark_id, None, page_form("https://a/taken", None)).unwrap();

        let mut form = PageForm::from(&page);
        form.url = "https://a/taken".to_string();
        let err = service
            .update_page(b.bookmark_id, page.page_id, form)
            .unwrap_err();
        assert_eq!(err.code(), "URL_ALREADY_EXISTS");

        let mut form = PageForm::from(&page);
        form.url = "https://b.org/new".to_string();
        let updated = service.update_page(b.bookmark_id, page.page_id, form).unwrap();
        assert_eq!(updated.host, "b.org");

        assert!(service.query_page_by_url("https://a/old").unwrap().is_none());
        let found = service.query_page_by_url("https://b.org/new").unwrap().unwrap();
        assert_eq!(found.page.page_id, page.page_id);
        assert_eq!(found.bookmark.bookmark_id, b.bookmark_id);
        assert_eq!(reference_count(&store), 2);
    }

    #[test]
    fn test_update_page_errors() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");

        let err = service
            .update_page(99, 1, page_form("https://a/1", None))
            .unwrap_err();
        assert_eq!(err.code(), "BOOKMARK_NOT_FOUND");

        let err = service
            .update_page(b.bookmark_id, 1, page_form("https://a/1", None))
            .unwrap_err();
        assert_eq!(err.code(), "PAGE_NOT_FOUND");
    }

    #[test]
    fn test_move_within_bookmark() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let ids: Vec<PageId> = (0..4)
            .map(|i| {
                service
                    .add_page(b.bookmark_id, None, page_form(&format!("https://a/{}", i), None))
                    .unwrap()
                    .page_id
            })
            .collect();

        // Lands before the page that sat at index 2
        let moved = service
            .move_page(b.bookmark_id, ids[0], b.bookmark_id, Some(2))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![ids[1], ids[0], ids[2], ids[3]]);
        assert_eq!(moved.origin, moved.target);

        let moved = service
            .move_page(b.bookmark_id, ids[3], b.bookmark_id, Some(0))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![ids[3], ids[1], ids[0], ids[2]]);

        let moved = service
            .move_page(b.bookmark_id, ids[1], b.bookmark_id, None)
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![ids[3], ids[0], ids[2], ids[1]]);

        let stored = service.get_bookmark(b.bookmark_id).unwrap();
        assert_eq!(stored, moved.origin);
    }

    #[test]
    fn test_move_to_current_index_is_noop() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let p = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();
        service.add_page(b.bookmark_id, None, page_form("https://a/2", None)).unwrap();
        let before = service.get_bookmark(b.bookmark_id).unwrap();

        let moved = service
            .move_page(b.bookmark_id, p.page_id, b.bookmark_id, Some(0))
            .unwrap();
        assert_eq!(moved.origin, before);
        assert_eq!(moved.target, before);
        assert_eq!(service.get_bookmark(b.bookmark_id).unwrap(), before);
    }

    fn four_pages(service: &BookmarkService<'_>, b: &Bookmark) -> Vec<PageId> {
        (0..4)
            .map(|i| {
                service
                    .add_page(b.bookmark_id, None, page_form(&format!("https://a/{}", i), None))
                    .unwrap()
                    .page_id
            })
            .collect()
    }

    #[test]
    fn test_move_before_next_page_is_noop() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let ids = four_pages(&service, &b);
        let before = service.get_bookmark(b.bookmark_id).unwrap();

        let moved = service
            .move_page(b.bookmark_id, ids[1], b.bookmark_id, Some(2))
            .unwrap();
        assert_eq!(moved.origin, before);
        assert_eq!(service.get_bookmark(b.bookmark_id).unwrap(), before);
    }

    #[test]
    fn test_move_before_last_page() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let ids = four_pages(&service, &b);

        let moved = service
            .move_page(b.bookmark_id, ids[0], b.bookmark_id, Some(3))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![ids[1], ids[2], ids[0], ids[3]]);
    }

    #[test]
    fn test_move_at_len_appends() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let ids = four_pages(&service, &b);

        let moved = service
            .move_page(b.bookmark_id, ids[0], b.bookmark_id, Some(4))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![ids[1], ids[2], ids[3], ids[0]]);
    }

    #[test]
    fn test_reorder_index() {
        assert_eq!(reorder_index(0, Some(2), 4), 1);
        assert_eq!(reorder_index(1, Some(2), 4), 1);
        assert_eq!(reorder_index(2, Some(0), 4), 0);
        assert_eq!(reorder_index(0, Some(3), 4), 2);
        assert_eq!(reorder_index(0, Some(4), 4), 3);
        assert_eq!(reorder_index(3, None, 4), 3);
    }

    #[test]
    fn test_move_out_of_range_appends() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let p1 = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();
        let p2 = service.add_page(b.bookmark_id, None, page_form("https://a/2", None)).unwrap();

        let moved = service
            .move_page(b.bookmark_id, p1.page_id, b.bookmark_id, Some(10))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![p2.page_id, p1.page_id]);
    }

    #[test]
    fn test_move_across_bookmarks() {
        let store = store();
        let service = BookmarkService::new(&store);
        let origin = add(&service, "Origin");
        let target = add(&service, "Target");
        let collected = Utc::now() - Duration::hours(1);

        let moving = service
            .add_page(origin.bookmark_id, None, page_form("https://a/1", Some(collected)))
            .unwrap();
        let staying = service.add_page(origin.bookmark_id, None, page_form("https://a/2", None)).unwrap();
        let resident = service.add_page(target.bookmark_id, None, page_form("https://b/1", None)).unwrap();

        let moved = service
            .move_page(origin.bookmark_id, moving.page_id, target.bookmark_id, Some(0))
            .unwrap();
        assert_eq!(page_ids(&moved.origin), vec![staying.page_id]);
        assert_eq!(page_ids(&moved.target), vec![moving.page_id, resident.page_id]);
        assert_eq!(moved.origin.last_collect_time, None);
        assert_eq!(moved.target.last_collect_time, Some(collected));

        let found = service.query_page_by_url("https://a/1").unwrap().unwrap();
        assert_eq!(found.bookmark.bookmark_id, target.bookmark_id);
        assert_eq!(reference_count(&store), 3);
    }

    #[test]
    fn test_move_errors() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let p = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();

        assert_eq!(
            service.move_page(99, p.page_id, b.bookmark_id, None).unwrap_err().code(),
            "BOOKMARK_NOT_FOUND"
        );
        assert_eq!(
            service.move_page(b.bookmark_id, 99, b.bookmark_id, None).unwrap_err().code(),
            "PAGE_NOT_FOUND"
        );
        assert_eq!(
            service.move_page(b.bookmark_id, p.page_id, 99, None).unwrap_err().code(),
            "TARGET_BOOKMARK_NOT_FOUND"
        );
        assert_eq!(page_ids(&service.get_bookmark(b.bookmark_id).unwrap()), vec![p.page_id]);
    }

    #[test]
    fn test_delete_page() {
        let store = store();
        let service = BookmarkService::new(&store);
        let b = add(&service, "B");
        let p = service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();

        let removed = service.delete_page(b.bookmark_id, p.page_id).unwrap();
        assert_eq!(removed.page_id, p.page_id);
        assert!(service.get_bookmark(b.bookmark_id).unwrap().pages.is_empty());
        assert!(service.query_page_by_url("https://a/1").unwrap().is_none());

        assert_eq!(
            service.delete_page(b.bookmark_id, p.page_id).unwrap_err().code(),
            "PAGE_NOT_FOUND"
        );
        // The URL is free again
        service.add_page(b.bookmark_id, None, page_form("https://a/1", None)).unwrap();
    }

    #[test]
    fn test_delete_bookmark_cascades() {
        let store = store();
        let service = BookmarkService::new(&store);
        let doomed = add(&service, "Doomed");
        let kept = add(&service, "Kept");
        for i in 0..3 {
            service
                .add_page(doomed.bookmark_id, None, page_form(&format!("https://d/{}", i), None))
                .unwrap();
        }
        service.add_page(kept.bookmark_id, None, page_form("https://k/1", None)).unwrap();

        let deleted = service.delete_bookmark(doomed.bookmark_id).unwrap();
        assert_eq!(deleted.pages.len(), 3);
        assert_eq!(reference_count(&store), 1);
        assert_eq!(
            service.get_bookmark(doomed.bookmark_id).unwrap_err().code(),
            "NOT_FOUND"
        );
        assert!(service.query_page_by_url("https://k/1").unwrap().is_some());
    }

    #[test]
    fn test_query_page_by_url_tolerates_dangling_reference() {
        let store = store();
        let service = BookmarkService::new(&store);

        let tx = store
            .transaction(&[RecordKind::PageReference], TransactionMode::ReadWrite)
            .unwrap();
        tx.add(&mut PageReference::new("https://ghost/1", 77)).unwrap();
        tx.commit().unwrap();

        assert!(service.query_page_by_url("https://ghost/1").unwrap().is_none());
        assert!(service.query_page_by_url("https://nowhere").unwrap().is_none());
    }

    #[test]
    fn test_query_search_and_groups() {
        let store = store();
        let service = BookmarkService::new(&store);
        let mut form = BookmarkForm::new("Rust Book");
        form.groups = vec![GroupPair::new("STATUS", "TODO")];
        let rust = service.add_bookmark(form).unwrap();
        let other = add(&service, "Cooking");
        let mut page = page_form("https://c/1", None);
        page.title = "Rusty pans".to_string();
        page.groups = Some(vec![GroupPair::new("LANG", "EN")]);
        service.add_page(other.bookmark_id, None, page).unwrap();

        let hits = service
            .query_bookmarks(&BookmarkQuery {
                search: Some("Rust".to_string()),
                ..BookmarkQuery::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = service
            .query_bookmarks(&BookmarkQuery {
                search: Some("rust".to_string()),
                ..BookmarkQuery::default()
            })
            .unwrap();
        assert!(hits.is_empty());

        let hits = service
            .query_bookmarks(&BookmarkQuery {
                groups: vec![GroupPair::new("LANG", "EN")],
                ..BookmarkQuery::default()
            })
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bookmark_id, other.bookmark_id);

        let hits = service
            .query_bookmarks(&BookmarkQuery {
                groups: vec![GroupPair::new("STATUS", "TODO")],
                ..BookmarkQuery::default()
            })
            .unwrap();
        assert_eq!(hits[0].bookmark_id, rust.bookmark_id);
    }

    #[test]
    fn test_query_order_window_and_count() {
        let store = store();
        let service = BookmarkService::new(&store);
        for (name, score) in [("a", Some(2)), ("b", None), ("c", Some(5)), ("d", Some(3))] {
            let mut form = BookmarkForm::new(name);
            form.score = score;
            service.add_bookmark(form).unwrap();
        }

        let query = BookmarkQuery {
            order: Some(BookmarkOrder::Score),
            order_direction: OrderDirection::Desc,
            limit: Some(2),
            offset: Some(1),
            ..BookmarkQuery::default()
        };
        let names: Vec<String> = service
            .query_bookmarks(&query)
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["d", "a"]);
        assert_eq!(service.count_bookmarks(&query).unwrap(), 4);

        let none = BookmarkQuery {
            limit: Some(0),
            ..BookmarkQuery::default()
        };
        assert!(service.query_bookmarks(&none).unwrap().is_empty());
    }
}
