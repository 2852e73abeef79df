//! Bookmark query description
//!
//! A `BookmarkQuery` is plain data so it can be stored as a preset and
//! replayed later. `BookmarkService::query_bookmarks` turns it into cursor
//! filters and an optional comparator.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{Bookmark, GroupPair};

/// Field to sort bookmarks by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookmarkOrder {
    CreateTime,
    UpdateTime,
    LastCollectTime,
    Score,
}

impl BookmarkOrder {
    /// Ascending comparison; bookmarks lacking the field sort first
    pub fn compare(&self, a: &Bookmark, b: &Bookmark) -> Ordering {
        match self {
            BookmarkOrder::CreateTime => a.create_time.cmp(&b.create_time),
            BookmarkOrder::UpdateTime => a.update_time.cmp(&b.update_time),
            // Option orders None before Some
            BookmarkOrder::LastCollectTime => a.last_collect_time.cmp(&b.last_collect_time),
            BookmarkOrder::Score => a.score.cmp(&b.score),
        }
    }
}

impl std::str::FromStr for BookmarkOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createTime" | "create-time" | "created" => Ok(BookmarkOrder::CreateTime),
            "updateTime" | "update-time" | "updated" => Ok(BookmarkOrder::UpdateTime),
            "lastCollectTime" | "last-collect-time" | "collected" => {
                Ok(BookmarkOrder::LastCollectTime)
            }
            "score" => Ok(BookmarkOrder::Score),
            _ => Err(format!(
                "unknown order '{}' (expected created, updated, collected or score)",
                s
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            _ => Err(format!("unknown direction '{}' (expected asc or desc)", s)),
        }
    }
}

/// Filter, order and window for `query_bookmarks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkQuery {
    /// Case-sensitive substring of the name, an alias or a page title
    pub search: Option<String>,
    /// Pairs that must all be carried by the bookmark or one of its pages
    pub groups: Vec<GroupPair>,
    pub order: Option<BookmarkOrder>,
    pub order_direction: OrderDirection,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl BookmarkQuery {
    /// Whether a bookmark passes the search and group filters
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        let search = match self.search.as_deref() {
            Some(needle) if !needle.is_empty() => bookmark.matches_search(needle),
            _ => true,
        };
        search && self.groups.iter().all(|pair| bookmark.carries(pair))
    }

    /// Comparator for the requested order, if any
    pub fn comparator(&self) -> Option<impl Fn(&Bookmark, &Bookmark) -> Ordering> {
        let order = self.order?;
        let direction = self.order_direction;
        Some(move |a: &Bookmark, b: &Bookmark| {
            let ordering = order.compare(a, b);
            match direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            }
        })
    }

    /// Same filters without the offset/limit window
    pub fn unwindowed(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}
