//! Query preset command handlers

use anyhow::Result;

use pagemark_core::{QueryId, QueryPresetService, StoreHandle};

use super::bookmark::QueryArgs;
use crate::output::Output;
use crate::prompt::confirm;

/// List saved presets
pub fn list(store: &StoreHandle, output: &Output) -> Result<()> {
    let presets = QueryPresetService::new(store).list_presets()?;
    output.print_presets(&presets);
    Ok(())
}

/// Save the query flags under `name`, replacing a preset of that name
pub fn save(store: &StoreHandle, name: &str, args: &QueryArgs, output: &Output) -> Result<()> {
    let preset = QueryPresetService::new(store).save_preset(name, args.to_query())?;

    output.success(&format!("Saved preset {}: {}", preset.query_id, preset.name));
    output.print_presets(std::slice::from_ref(&preset));
    Ok(())
}

/// Run a preset and print the matching bookmarks
pub fn run(store: &StoreHandle, query_id: QueryId, output: &Output) -> Result<()> {
    let bookmarks = QueryPresetService::new(store).run_preset(query_id)?;
    output.print_bookmarks(&bookmarks, bookmarks.len());
    Ok(())
}

/// Delete a preset
pub fn delete(store: &StoreHandle, query_id: QueryId, output: &Output) -> Result<()> {
    let service = QueryPresetService::new(store);

    if output.should_prompt() {
        let preset = service.get_preset(query_id)?;
        println!("Delete preset: {} - {}", preset.query_id, preset.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let preset = service.delete_preset(query_id)?;

    output.success(&format!("Deleted preset: {} ({})", preset.query_id, preset.name));
    Ok(())
}
