//! Pagemark CLI
//!
//! Command-line interface for pagemark - bookmarks, pages and groups.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pagemark_core::{
    BookmarkError, BookmarkId, Config, EntityKind, GroupError, GroupPair, PageId, QueryId,
    QueryPresetError, StorageError, StoreHandle,
};

mod commands;
mod logging;
mod output;
mod prompt;

use commands::{parse_entity_kind, parse_pair};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(about = "Pagemark - Local bookmark and reading-progress manager")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage bookmarks
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommands,
    },
    /// Manage pages within bookmarks
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Manage the group taxonomy
    Group {
        #[command(subcommand)]
        command: Option<GroupCommands>,
    },
    /// Manage saved queries
    Preset {
        #[command(subcommand)]
        command: Option<PresetCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show store location and record counts
    Status,
}

#[derive(Subcommand)]
enum BookmarkCommands {
    /// Create a new bookmark
    #[command(alias = "create")]
    Add(commands::bookmark::AddArgs),
    /// List bookmarks
    #[command(alias = "ls")]
    List(commands::bookmark::QueryArgs),
    /// Show bookmark details (including pages)
    Show {
        /// Bookmark ID
        id: BookmarkId,
    },
    /// Edit a bookmark
    Edit {
        /// Bookmark ID
        id: BookmarkId,
        #[command(flatten)]
        args: commands::bookmark::EditArgs,
    },
    /// Delete a bookmark and its pages
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID
        id: BookmarkId,
    },
}

#[derive(Subcommand)]
enum PageCommands {
    /// Add a page to a bookmark
    Add(commands::page::AddArgs),
    /// Edit a page
    Edit {
        /// Bookmark ID
        bookmark_id: BookmarkId,
        /// Page ID
        page_id: PageId,
        #[command(flatten)]
        args: commands::page::EditArgs,
    },
    /// Reorder a page or move it to another bookmark
    #[command(alias = "mv")]
    Move {
        /// Bookmark currently holding the page
        bookmark_id: BookmarkId,
        /// Page ID
        page_id: PageId,
        /// Destination bookmark (defaults to the current one)
        #[arg(short, long)]
        to: Option<BookmarkId>,
        /// Insert before the page at this position (defaults to last)
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// Delete a page
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID
        bookmark_id: BookmarkId,
        /// Page ID
        page_id: PageId,
    },
    /// Find the page stored under a URL
    Find {
        /// Page URL
        url: String,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// List groups
    #[command(alias = "ls")]
    List {
        /// Only groups selectable by this entity kind (bookmark or page)
        #[arg(long = "for", value_parser = parse_entity_kind)]
        kind: Option<EntityKind>,
        /// Pairs the entity already carries (GROUP/ITEM), repeatable
        #[arg(long, value_parser = parse_pair, requires = "kind")]
        carrying: Vec<GroupPair>,
    },
    /// Create a group
    Add(commands::group::AddArgs),
    /// Edit a group
    Edit {
        /// Group key
        key: String,
        #[command(flatten)]
        args: commands::group::EditArgs,
    },
    /// Delete an unused group
    #[command(alias = "rm")]
    Delete {
        /// Group key
        key: String,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List saved presets
    #[command(alias = "ls")]
    List,
    /// Save a query under a name
    Save {
        /// Preset name
        name: String,
        #[command(flatten)]
        query: commands::bookmark::QueryArgs,
    },
    /// Run a saved preset
    Run {
        /// Preset ID
        id: QueryId,
    },
    /// Delete a preset
    #[command(alias = "rm")]
    Delete {
        /// Preset ID
        id: QueryId,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(error_code(&e), &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config_file.as_deref();

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(&key, &value, config_path, output)
            }
        };
    }

    let config = Config::load_with_cli_override(config_path)?;
    logging::init(&config);
    let store = StoreHandle::from_config(&config);

    let result = match cli.command {
        Commands::Bookmark { command } => handle_bookmark_command(command, &store, output),
        Commands::Page { command } => handle_page_command(command, &store, output),
        Commands::Group { command } => handle_group_command(command, &store, output),
        Commands::Preset { command } => handle_preset_command(command, &store, output),
        Commands::Status => commands::status::show(&store, &config, output),
        Commands::Config { .. } => Ok(()), // Handled above
    };

    store.close();
    result
}

fn handle_bookmark_command(
    command: BookmarkCommands,
    store: &StoreHandle,
    output: &Output,
) -> Result<()> {
    match command {
        BookmarkCommands::Add(args) => commands::bookmark::add(store, args, output),
        BookmarkCommands::List(args) => commands::bookmark::list(store, &args, output),
        BookmarkCommands::Show { id } => commands::bookmark::show(store, id, output),
        BookmarkCommands::Edit { id, args } => commands::bookmark::edit(store, id, args, output),
        BookmarkCommands::Delete { id } => commands::bookmark::delete(store, id, output),
    }
}

fn handle_page_command(command: PageCommands, store: &StoreHandle, output: &Output) -> Result<()> {
    match command {
        PageCommands::Add(args) => commands::page::add(store, args, output),
        PageCommands::Edit {
            bookmark_id,
            page_id,
            args,
        } => commands::page::edit(store, bookmark_id, page_id, args, output),
        PageCommands::Move {
            bookmark_id,
            page_id,
            to,
            index,
        } => commands::page::move_page(store, bookmark_id, page_id, to, index, output),
        PageCommands::Delete {
            bookmark_id,
            page_id,
        } => commands::page::delete(store, bookmark_id, page_id, output),
        PageCommands::Find { url } => commands::page::find(store, &url, output),
    }
}

fn handle_group_command(
    command: Option<GroupCommands>,
    store: &StoreHandle,
    output: &Output,
) -> Result<()> {
    match command {
        Some(GroupCommands::List { kind, carrying }) => {
            commands::group::list(store, kind, &carrying, output)
        }
        None => commands::group::list(store, None, &[], output),
        Some(GroupCommands::Add(args)) => commands::group::add(store, args, output),
        Some(GroupCommands::Edit { key, args }) => commands::group::edit(store, &key, args, output),
        Some(GroupCommands::Delete { key }) => commands::group::delete(store, &key, output),
    }
}

fn handle_preset_command(
    command: Option<PresetCommands>,
    store: &StoreHandle,
    output: &Output,
) -> Result<()> {
    match command {
        Some(PresetCommands::List) | None => commands::preset::list(store, output),
        Some(PresetCommands::Save { name, query }) => {
            commands::preset::save(store, &name, &query, output)
        }
        Some(PresetCommands::Run { id }) => commands::preset::run(store, id, output),
        Some(PresetCommands::Delete { id }) => commands::preset::delete(store, id, output),
    }
}

/// Taxonomy code of the domain error behind `error`, if any
fn error_code(error: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = error.downcast_ref::<BookmarkError>() {
        return Some(e.code());
    }
    if let Some(e) = error.downcast_ref::<GroupError>() {
        return Some(e.code());
    }
    if let Some(e) = error.downcast_ref::<QueryPresetError>() {
        return Some(e.code());
    }
    error.downcast_ref::<StorageError>().map(StorageError::code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_page_move() {
        let cli = Cli::try_parse_from(["pagemark", "page", "move", "1", "7", "--to", "2", "-i", "0"])
            .unwrap();
        match cli.command {
            Commands::Page {
                command:
                    PageCommands::Move {
                        bookmark_id,
                        page_id,
                        to,
                        index,
                    },
            } => {
                assert_eq!((bookmark_id, page_id, to, index), (1, 7, Some(2), Some(0)));
            }
            _ => panic!("expected page move"),
        }
    }

    #[test]
    fn test_parse_bookmark_list_query() {
        let cli = Cli::try_parse_from([
            "pagemark", "--json", "bookmark", "list", "-g", "STATUS/TODO", "--order", "score",
            "--desc", "--limit", "5",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Bookmark {
                command: BookmarkCommands::List(args),
            } => {
                let query = args.to_query();
                assert_eq!(query.groups, vec![GroupPair::new("STATUS", "TODO")]);
                assert_eq!(query.limit, Some(5));
            }
            _ => panic!("expected bookmark list"),
        }
    }

    #[test]
    fn test_desc_requires_order() {
        assert!(Cli::try_parse_from(["pagemark", "bookmark", "list", "--desc"]).is_err());
    }

    #[test]
    fn test_error_code_from_domain_errors() {
        let err = anyhow::Error::new(BookmarkError::UrlAlreadyExists("https://x".into()));
        assert_eq!(error_code(&err), Some("URL_ALREADY_EXISTS"));

        let err = anyhow::Error::new(GroupError::GroupOccupied("STATUS".into()));
        assert_eq!(error_code(&err), Some("GROUP_OCCUPIED"));

        let err = anyhow::Error::new(QueryPresetError::NotFound(3));
        assert_eq!(error_code(&err), Some("NOT_FOUND"));

        assert_eq!(error_code(&anyhow::anyhow!("plain")), None);
    }

    #[test]
    fn test_error_code_survives_context() {
        use anyhow::Context;
        let err = Err::<(), _>(BookmarkError::NotFound(9))
            .context("Failed to update bookmark 9")
            .unwrap_err();
        assert_eq!(error_code(&err), Some("NOT_FOUND"));
    }
}
