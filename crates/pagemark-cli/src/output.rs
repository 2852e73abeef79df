//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use pagemark_core::{Bookmark, Group, Page, PageLocation, QueryPreset};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single bookmark with its pages
    pub fn print_bookmark(&self, bookmark: &Bookmark) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", bookmark.bookmark_id);
                println!("Name:        {}", bookmark.name);
                if !bookmark.other_names.is_empty() {
                    println!("Aliases:     {}", bookmark.other_names.join(", "));
                }
                if !bookmark.description.is_empty() {
                    println!("Description: {}", bookmark.description);
                }
                if !bookmark.keywords.is_empty() {
                    println!("Keywords:    {}", bookmark.keywords.join(", "));
                }
                if !bookmark.groups.is_empty() {
                    println!("Groups:      {}", join_pairs(&bookmark.groups));
                }
                if let Some(score) = bookmark.score {
                    println!("Score:       {}", stars(score));
                }
                if let Some(collected) = bookmark.last_collect_time {
                    println!("Collected:   {}", collected.format("%Y-%m-%d %H:%M"));
                }
                println!("Created:     {}", bookmark.create_time.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", bookmark.update_time.format("%Y-%m-%d %H:%M"));

                if !bookmark.pages.is_empty() {
                    println!();
                    println!("── Pages ({}) ──", bookmark.pages.len());
                    for (index, page) in bookmark.pages.iter().enumerate() {
                        let progress = page
                            .last_collect
                            .as_deref()
                            .map(|l| format!(" [{}]", l))
                            .unwrap_or_default();
                        println!(
                            "{:>2}. #{} {}{} | {}",
                            index,
                            page.page_id,
                            truncate(&page.title, 35),
                            progress,
                            truncate(&page.url, 45)
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(bookmark),
            OutputFormat::Quiet => {
                println!("{}", bookmark.bookmark_id);
            }
        }
    }

    /// Print a list of bookmarks
    ///
    /// `total` is the number of matches before limit/offset.
    pub fn print_bookmarks(&self, bookmarks: &[Bookmark], total: usize) {
        match self.format {
            OutputFormat::Human => {
                if bookmarks.is_empty() {
                    println!("No bookmarks found.");
                    return;
                }
                for bookmark in bookmarks {
                    let score = bookmark.score.map(stars).unwrap_or_default();
                    println!(
                        "{:>5} | {:<35} | {:>3} page(s) | {}",
                        bookmark.bookmark_id,
                        truncate(&bookmark.name, 35),
                        bookmark.pages.len(),
                        score
                    );
                }
                if total > bookmarks.len() {
                    println!("\n{} of {} bookmark(s)", bookmarks.len(), total);
                } else {
                    println!("\n{} bookmark(s)", bookmarks.len());
                }
            }
            OutputFormat::Json => print_json(&bookmarks),
            OutputFormat::Quiet => {
                for bookmark in bookmarks {
                    println!("{}", bookmark.bookmark_id);
                }
            }
        }
    }

    /// Print a single page
    pub fn print_page(&self, page: &Page) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", page.page_id);
                println!("Title:       {}", page.title);
                println!("URL:         {}", page.url);
                if !page.host.is_empty() {
                    println!("Host:        {}", page.host);
                }
                if let Some(ref desc) = page.description {
                    println!("Description: {}", desc);
                }
                if let Some(ref keywords) = page.keywords {
                    println!("Keywords:    {}", keywords.join(", "));
                }
                if let Some(ref groups) = page.groups {
                    println!("Groups:      {}", join_pairs(groups));
                }
                if let Some(ref label) = page.last_collect {
                    println!("Progress:    {}", label);
                }
                if let Some(collected) = page.last_collect_time {
                    println!("Collected:   {}", collected.format("%Y-%m-%d %H:%M"));
                }
                println!("Created:     {}", page.create_time.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", page.update_time.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(page),
            OutputFormat::Quiet => {
                println!("{}", page.page_id);
            }
        }
    }

    /// Print the result of a URL lookup
    pub fn print_location(&self, location: &PageLocation) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "Bookmark:    {} - {}",
                    location.bookmark.bookmark_id, location.bookmark.name
                );
                self.print_page(&location.page);
            }
            OutputFormat::Json => print_json(location),
            OutputFormat::Quiet => {
                println!("{} {}", location.bookmark.bookmark_id, location.page.page_id);
            }
        }
    }

    /// Print a list of groups
    pub fn print_groups(&self, groups: &[Group]) {
        match self.format {
            OutputFormat::Human => {
                if groups.is_empty() {
                    println!("No groups found.");
                    return;
                }
                for group in groups {
                    let mut flags = vec![format!("{:?}", group.available_for).to_lowercase()];
                    if group.multi {
                        flags.push("multi".to_string());
                    }
                    if let Some(ref condition) = group.available_condition {
                        flags.push(format!("requires {}", join_pairs(condition)));
                    }
                    println!(
                        "{} - {} ({})",
                        group.group_key_path,
                        group.group_name,
                        flags.join(", ")
                    );
                    for item in &group.items {
                        println!("    {} - {}", item.item_key_path, item.item_name);
                    }
                }
                println!("\n{} group(s)", groups.len());
            }
            OutputFormat::Json => print_json(&groups),
            OutputFormat::Quiet => {
                for group in groups {
                    println!("{}", group.group_key_path);
                }
            }
        }
    }

    /// Print a list of query presets
    pub fn print_presets(&self, presets: &[QueryPreset]) {
        match self.format {
            OutputFormat::Human => {
                if presets.is_empty() {
                    println!("No presets saved.");
                    return;
                }
                for preset in presets {
                    println!(
                        "{:>4} | {:<25} | {}",
                        preset.query_id,
                        truncate(&preset.name, 25),
                        describe_query(preset)
                    );
                }
                println!("\n{} preset(s)", presets.len());
            }
            OutputFormat::Json => print_json(&presets),
            OutputFormat::Quiet => {
                for preset in presets {
                    println!("{}", preset.query_id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a failure, with its taxonomy code when known
    pub fn error(&self, code: Option<&str>, message: &str) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "error", "code": code, "message": message})
                );
            }
            _ => match code {
                Some(code) => eprintln!("Error [{}]: {}", code, message),
                None => eprintln!("Error: {}", message),
            },
        }
    }

    /// Print a non-fatal warning to stderr (human mode only)
    pub fn warning(&self, message: &str) {
        if self.format == OutputFormat::Human {
            eprintln!("Warning: {}", message);
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print any serialisable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output as JSON: {}", e),
    }
}

fn describe_query(preset: &QueryPreset) -> String {
    let query = &preset.query;
    let mut parts = Vec::new();
    if let Some(ref search) = query.search {
        parts.push(format!("search \"{}\"", search));
    }
    if !query.groups.is_empty() {
        parts.push(format!("groups {}", join_pairs(&query.groups)));
    }
    if let Some(order) = query.order {
        parts.push(format!("order {:?} {:?}", order, query.order_direction).to_lowercase());
    }
    if let Some(limit) = query.limit {
        parts.push(format!("limit {}", limit));
    }
    if let Some(offset) = query.offset {
        parts.push(format!("offset {}", offset));
    }
    if parts.is_empty() {
        "all bookmarks".to_string()
    } else {
        parts.join("; ")
    }
}

fn join_pairs(pairs: &[pagemark_core::GroupPair]) -> String {
    pairs
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn stars(score: u8) -> String {
    "★".repeat(score as usize)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
