//! Command handlers and shared argument parsers

pub mod bookmark;
pub mod config;
pub mod group;
pub mod page;
pub mod preset;
pub mod status;

use anyhow::Result;
use chrono::{DateTime, Utc};

use pagemark_core::{AvailableFor, EntityKind, GroupItem, GroupPair, GroupService, StoreHandle};

use crate::output::Output;

/// Warn about single-select groups that ended up with several items
pub fn warn_single_select(store: &StoreHandle, pairs: &[GroupPair], output: &Output) -> Result<()> {
    for key in GroupService::new(store).single_select_conflicts(pairs)? {
        output.warning(&format!("group {} is single-select but holds several items", key));
    }
    Ok(())
}

/// Parse a `GROUP/ITEM` (or `GROUP=ITEM`) pair
pub fn parse_pair(s: &str) -> Result<GroupPair, String> {
    let (group, item) = s
        .split_once('/')
        .or_else(|| s.split_once('='))
        .ok_or_else(|| format!("expected GROUP/ITEM, got '{}'", s))?;
    let (group, item) = (group.trim(), item.trim());
    if group.is_empty() || item.is_empty() {
        return Err(format!("expected GROUP/ITEM, got '{}'", s));
    }
    Ok(GroupPair::new(group, item))
}

/// Parse a `KEY=NAME` group item
pub fn parse_item(s: &str) -> Result<GroupItem, String> {
    let (key, name) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=NAME, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("item key is empty in '{}'", s));
    }
    Ok(GroupItem::new(key, name.trim()))
}

/// Parse `now` or an RFC 3339 timestamp
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

/// Parse a 1-5 score
pub fn parse_score(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(score) if (1..=5).contains(&score) => Ok(score),
        _ => Err(format!("score must be 1-5, got '{}'", s)),
    }
}

pub fn parse_entity_kind(s: &str) -> Result<EntityKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "bookmark" => Ok(EntityKind::Bookmark),
        "page" => Ok(EntityKind::Page),
        _ => Err(format!("expected bookmark or page, got '{}'", s)),
    }
}

pub fn parse_available_for(s: &str) -> Result<AvailableFor, String> {
    match s.to_ascii_lowercase().as_str() {
        "bookmark" => Ok(AvailableFor::Bookmark),
        "page" => Ok(AvailableFor::Page),
        "both" => Ok(AvailableFor::Both),
        _ => Err(format!("expected bookmark, page or both, got '{}'", s)),
    }
}

/// Split comma-separated input, dropping blanks
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
