//! Status command handler

use anyhow::Result;

use pagemark_core::{Config, StoreHandle};

use crate::output::{Output, OutputFormat};

/// Show store location, record counts and size
pub fn show(store: &StoreHandle, config: &Config, output: &Output) -> Result<()> {
    let stats = store.stats()?;
    let location = store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": location,
                    "data_dir": config.data_dir,
                    "schema_version": stats.schema_version,
                    "size": stats.file_size,
                    "counts": {
                        "bookmarks": stats.bookmarks,
                        "pages": stats.page_references,
                        "groups": stats.groups,
                        "presets": stats.queries
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", location);
        }
        OutputFormat::Human => {
            println!("Pagemark Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Database: {}", location);
            println!("  Schema:   v{}", stats.schema_version);
            println!("  Size:     {}", stats.file_size_human());
            println!();
            println!("Contents:");
            println!("  Bookmarks: {}", stats.bookmarks);
            println!("  Pages:     {}", stats.page_references);
            println!("  Groups:    {}", stats.groups);
            println!("  Presets:   {}", stats.queries);
        }
    }

    Ok(())
}
