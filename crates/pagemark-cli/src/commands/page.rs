//! Page command handlers

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;

use pagemark_core::{
    BookmarkError, BookmarkId, BookmarkService, GroupPair, PageForm, PageId, StoreHandle,
};

use super::{parse_pair, parse_time, warn_single_select};
use crate::output::Output;
use crate::prompt::confirm;

/// Fields accepted by `page add`
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Bookmark to add the page to
    pub bookmark_id: BookmarkId,
    /// Page URL (unique across all bookmarks)
    pub url: String,
    /// Page title (defaults to the URL)
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// Position in the bookmark's page list (defaults to last)
    #[arg(short, long)]
    pub index: Option<usize>,
    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Keyword, repeatable
    #[arg(short, long = "keyword")]
    pub keywords: Option<Vec<String>>,
    /// Group pair (GROUP/ITEM), repeatable
    #[arg(short, long = "group", value_parser = parse_pair)]
    pub groups: Option<Vec<GroupPair>>,
    /// Progress label, e.g. "ep 12"
    #[arg(short, long)]
    pub progress: Option<String>,
    /// When the page was last collected (`now` or RFC 3339)
    #[arg(short, long, value_parser = parse_time)]
    pub collected: Option<DateTime<Utc>>,
}

/// Fields accepted by `page edit`; omitted flags keep current values
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// New URL
    #[arg(short, long)]
    pub url: Option<String>,
    /// New title
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Replace keywords
    #[arg(short, long = "keyword")]
    pub keywords: Option<Vec<String>>,
    /// Replace group pairs (GROUP/ITEM)
    #[arg(short, long = "group", value_parser = parse_pair)]
    pub groups: Option<Vec<GroupPair>>,
    /// New progress label
    #[arg(short, long)]
    pub progress: Option<String>,
    /// When the page was last collected (`now` or RFC 3339)
    #[arg(short, long, value_parser = parse_time)]
    pub collected: Option<DateTime<Utc>>,
    /// Clear progress label and collection time
    #[arg(long, conflicts_with_all = ["progress", "collected"])]
    pub uncollect: bool,
}

impl EditArgs {
    fn apply(self, form: &mut PageForm) {
        if let Some(url) = self.url {
            form.url = url;
        }
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(description) = self.description {
            form.description = (!description.is_empty()).then_some(description);
        }
        if let Some(keywords) = self.keywords {
            form.keywords = Some(keywords);
        }
        if let Some(groups) = self.groups {
            form.groups = Some(groups);
        }
        if self.uncollect {
            form.last_collect = None;
            form.last_collect_time = None;
        }
        if let Some(progress) = self.progress {
            form.last_collect = Some(progress);
        }
        if let Some(collected) = self.collected {
            form.last_collect_time = Some(collected);
        }
    }
}

/// Add a page to a bookmark
pub fn add(store: &StoreHandle, args: AddArgs, output: &Output) -> Result<()> {
    let title = args.title.unwrap_or_else(|| args.url.clone());
    let form = PageForm {
        url: args.url,
        title,
        description: args.description,
        keywords: args.keywords,
        groups: args.groups,
        last_collect: args.progress,
        last_collect_time: args.collected,
    };

    let page = BookmarkService::new(store).add_page(args.bookmark_id, args.index, form)?;

    output.success(&format!(
        "Added page {} to bookmark {}",
        page.page_id, args.bookmark_id
    ));
    output.print_page(&page);
    warn_single_select(store, page.groups.as_deref().unwrap_or_default(), output)?;
    Ok(())
}

/// Edit a page in place
pub fn edit(
    store: &StoreHandle,
    bookmark_id: BookmarkId,
    page_id: PageId,
    args: EditArgs,
    output: &Output,
) -> Result<()> {
    let service = BookmarkService::new(store);
    let bookmark = service.get_bookmark(bookmark_id)?;
    let mut form = bookmark
        .page(page_id)
        .map(PageForm::from)
        .ok_or(BookmarkError::PageNotFound {
            bookmark_id,
            page_id,
        })?;

    args.apply(&mut form);
    let page = service.update_page(bookmark_id, page_id, form)?;

    output.success("Page updated");
    output.print_page(&page);
    warn_single_select(store, page.groups.as_deref().unwrap_or_default(), output)?;
    Ok(())
}

/// Move a page within a bookmark or to another one
pub fn move_page(
    store: &StoreHandle,
    bookmark_id: BookmarkId,
    page_id: PageId,
    target: Option<BookmarkId>,
    index: Option<usize>,
    output: &Output,
) -> Result<()> {
    let target = target.unwrap_or(bookmark_id);
    let outcome = BookmarkService::new(store).move_page(bookmark_id, page_id, target, index)?;

    if output.is_json() {
        crate::output::print_json(&outcome);
        return Ok(());
    }

    let position = outcome
        .target
        .page_index(page_id)
        .map(|i| i.to_string())
        .unwrap_or_else(|| "?".to_string());
    output.success(&format!(
        "Moved page {} to bookmark {} at position {}",
        page_id, outcome.target.bookmark_id, position
    ));
    Ok(())
}

/// Remove a page from its bookmark
pub fn delete(
    store: &StoreHandle,
    bookmark_id: BookmarkId,
    page_id: PageId,
    output: &Output,
) -> Result<()> {
    let service = BookmarkService::new(store);

    if output.should_prompt() {
        let bookmark = service.get_bookmark(bookmark_id)?;
        if let Some(page) = bookmark.page(page_id) {
            println!("Delete page: {} - {}", page.page_id, page.title);
            if !confirm("Are you sure?")? {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }

    let page = service.delete_page(bookmark_id, page_id)?;

    output.success(&format!("Deleted page: {} ({})", page.page_id, page.url));
    Ok(())
}

/// Look up the page stored under a URL
pub fn find(store: &StoreHandle, url: &str, output: &Output) -> Result<()> {
    match BookmarkService::new(store).query_page_by_url(url)? {
        Some(location) => output.print_location(&location),
        None => {
            if output.is_json() {
                println!("null");
            } else {
                output.message(&format!("No page stored for {}", url));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form() -> PageForm {
        PageForm {
            description: Some("old".to_string()),
            last_collect: Some("ep 1".to_string()),
            last_collect_time: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..PageForm::new("https://a/1", "A")
        }
    }

    #[test]
    fn test_empty_edit_keeps_form() {
        let mut edited = form();
        EditArgs::default().apply(&mut edited);
        assert_eq!(edited, form());
    }

    #[test]
    fn test_edit_overrides_fields() {
        let mut edited = form();
        EditArgs {
            url: Some("https://a/2".to_string()),
            description: Some(String::new()),
            progress: Some("ep 2".to_string()),
            ..EditArgs::default()
        }
        .apply(&mut edited);

        assert_eq!(edited.url, "https://a/2");
        assert_eq!(edited.description, None);
        assert_eq!(edited.last_collect.as_deref(), Some("ep 2"));
        assert_eq!(edited.last_collect_time, form().last_collect_time);
    }

    fn add_args(bookmark_id: BookmarkId, url: &str) -> AddArgs {
        AddArgs {
            bookmark_id,
            url: url.to_string(),
            title: None,
            index: None,
            description: None,
            keywords: None,
            groups: None,
            progress: None,
            collected: None,
        }
    }

    #[test]
    fn test_handlers_against_store() {
        let store = StoreHandle::open_in_memory().unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);
        let service = BookmarkService::new(&store);
        let b1 = service.add_bookmark(pagemark_core::BookmarkForm::new("B1")).unwrap();
        let b2 = service.add_bookmark(pagemark_core::BookmarkForm::new("B2")).unwrap();

        add(&store, add_args(b1.bookmark_id, "https://a/1"), &output).unwrap();
        let page = service.get_bookmark(b1.bookmark_id).unwrap().pages[0].clone();
        assert_eq!(page.title, "https://a/1");

        let err = add(&store, add_args(b2.bookmark_id, "https://a/1"), &output).unwrap_err();
        assert!(err.downcast_ref::<BookmarkError>().is_some());

        move_page(&store, b1.bookmark_id, page.page_id, Some(b2.bookmark_id), None, &output)
            .unwrap();
        assert!(service.get_bookmark(b1.bookmark_id).unwrap().pages.is_empty());

        delete(&store, b2.bookmark_id, page.page_id, &output).unwrap();
        assert!(service.query_page_by_url("https://a/1").unwrap().is_none());
    }

    #[test]
    fn test_uncollect_clears_progress() {
        let mut edited = form();
        EditArgs {
            uncollect: true,
            ..EditArgs::default()
        }
        .apply(&mut edited);
        assert!(edited.last_collect.is_none());
        assert!(edited.last_collect_time.is_none());
    }
}
