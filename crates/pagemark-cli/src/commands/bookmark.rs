//! Bookmark command handlers

use anyhow::{Context, Result};
use clap::Args;

use pagemark_core::{
    BookmarkForm, BookmarkId, BookmarkOrder, BookmarkPatch, BookmarkQuery, BookmarkService,
    GroupPair, OrderDirection, StoreHandle,
};

use super::{parse_pair, parse_score, split_list, warn_single_select};
use crate::output::Output;
use crate::prompt::{confirm, prompt_optional, prompt_with_default};

/// Filter, order and window flags shared by `bookmark list` and `preset save`
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Substring of a name, alias or page title
    #[arg(short, long)]
    pub search: Option<String>,
    /// Required group pair (GROUP/ITEM), repeatable
    #[arg(short, long = "group", value_parser = parse_pair)]
    pub groups: Vec<GroupPair>,
    /// Sort field: created, updated, collected or score
    #[arg(long)]
    pub order: Option<BookmarkOrder>,
    /// Sort descending
    #[arg(long, requires = "order")]
    pub desc: bool,
    /// Maximum number of bookmarks
    #[arg(long)]
    pub limit: Option<usize>,
    /// Number of matches to skip
    #[arg(long)]
    pub offset: Option<usize>,
}

impl QueryArgs {
    pub fn to_query(&self) -> BookmarkQuery {
        BookmarkQuery {
            search: self.search.clone(),
            groups: self.groups.clone(),
            order: self.order,
            order_direction: if self.desc {
                OrderDirection::Desc
            } else {
                OrderDirection::Asc
            },
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Fields accepted by `bookmark add`
#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Bookmark name
    pub name: String,
    /// Alternative name, repeatable
    #[arg(short, long = "alias")]
    pub aliases: Vec<String>,
    /// Description
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Keyword, repeatable
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,
    /// Group pair (GROUP/ITEM), repeatable
    #[arg(short, long = "group", value_parser = parse_pair)]
    pub groups: Vec<GroupPair>,
    /// Score from 1 to 5
    #[arg(long, value_parser = parse_score)]
    pub score: Option<u8>,
}

/// Fields accepted by `bookmark edit`; omitted flags keep current values
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// Replace alternative names
    #[arg(short, long = "alias")]
    pub aliases: Option<Vec<String>>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Replace keywords
    #[arg(short, long = "keyword")]
    pub keywords: Option<Vec<String>>,
    /// Replace group pairs (GROUP/ITEM)
    #[arg(short, long = "group", value_parser = parse_pair)]
    pub groups: Option<Vec<GroupPair>>,
    /// Remove all group pairs
    #[arg(long, conflicts_with = "groups")]
    pub clear_groups: bool,
    /// New score from 1 to 5
    #[arg(long, value_parser = parse_score)]
    pub score: Option<u8>,
    /// Remove the score
    #[arg(long, conflicts_with = "score")]
    pub clear_score: bool,
}

impl EditArgs {
    fn to_patch(&self) -> BookmarkPatch {
        let groups = if self.clear_groups {
            Some(Vec::new())
        } else {
            self.groups.clone()
        };
        let score = if self.clear_score {
            Some(None)
        } else {
            self.score.map(Some)
        };
        BookmarkPatch {
            name: self.name.clone(),
            other_names: self.aliases.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            groups,
            score,
        }
    }
}

/// Create a bookmark
pub fn add(store: &StoreHandle, args: AddArgs, output: &Output) -> Result<()> {
    let form = BookmarkForm {
        name: args.name,
        other_names: args.aliases,
        description: args.description,
        keywords: args.keywords,
        groups: args.groups,
        score: args.score,
    };

    let bookmark = BookmarkService::new(store).add_bookmark(form)?;

    output.success(&format!("Created bookmark: {}", bookmark.bookmark_id));
    output.print_bookmark(&bookmark);
    warn_single_select(store, &bookmark.groups, output)?;
    Ok(())
}

/// List bookmarks matching the query flags
pub fn list(store: &StoreHandle, args: &QueryArgs, output: &Output) -> Result<()> {
    let service = BookmarkService::new(store);
    let query = args.to_query();

    let bookmarks = service.query_bookmarks(&query)?;
    let total = service.count_bookmarks(&query)?;

    output.print_bookmarks(&bookmarks, total);
    Ok(())
}

/// Show a bookmark with its pages
pub fn show(store: &StoreHandle, bookmark_id: BookmarkId, output: &Output) -> Result<()> {
    let bookmark = BookmarkService::new(store).get_bookmark(bookmark_id)?;
    output.print_bookmark(&bookmark);
    Ok(())
}

/// Edit a bookmark
///
/// Without any field flags, prompts for name, description and keywords.
pub fn edit(
    store: &StoreHandle,
    bookmark_id: BookmarkId,
    args: EditArgs,
    output: &Output,
) -> Result<()> {
    let service = BookmarkService::new(store);

    let patch = if args.to_patch() == BookmarkPatch::default() && output.should_prompt() {
        let bookmark = service.get_bookmark(bookmark_id)?;
        println!("Editing bookmark: {}", bookmark.bookmark_id);
        println!("Press Enter to keep current value, or type new value.\n");
        interactive_patch(&bookmark.name, &bookmark.description, &bookmark.keywords)?
    } else {
        args.to_patch()
    };

    let bookmark = service
        .update_bookmark(bookmark_id, patch)
        .with_context(|| format!("Failed to update bookmark {}", bookmark_id))?;

    output.success("Bookmark updated");
    output.print_bookmark(&bookmark);
    warn_single_select(store, &bookmark.groups, output)?;
    Ok(())
}

fn interactive_patch(name: &str, description: &str, keywords: &[String]) -> Result<BookmarkPatch> {
    let mut patch = BookmarkPatch {
        name: prompt_with_default("Name", name)?,
        description: prompt_with_default("Description", description)?,
        ..BookmarkPatch::default()
    };

    let current = keywords.join(", ");
    println!(
        "Current keywords: {}",
        if current.is_empty() { "(none)" } else { &current }
    );
    if let Some(new_keywords) = prompt_optional("New keywords (comma-separated)")? {
        patch.keywords = Some(split_list(&new_keywords));
    }
    Ok(patch)
}

/// Delete a bookmark and all of its pages
pub fn delete(store: &StoreHandle, bookmark_id: BookmarkId, output: &Output) -> Result<()> {
    let service = BookmarkService::new(store);

    if output.should_prompt() {
        let bookmark = service.get_bookmark(bookmark_id)?;
        println!(
            "Delete bookmark: {} - {} ({} page(s))",
            bookmark.bookmark_id,
            bookmark.name,
            bookmark.pages.len()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let bookmark = service.delete_bookmark(bookmark_id)?;

    output.success(&format!(
        "Deleted bookmark: {} ({})",
        bookmark.bookmark_id, bookmark.name
    ));
    Ok(())
}
