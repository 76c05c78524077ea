use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::storage;
use crate::sync::Coordinator;

pub mod commands;

use self::commands::{
    AddArgs, CategoryArgs, DeleteArgs, EditArgs, ExportArgs, ImportArgs, ListArgs, ResetArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "webshelf",
    version,
    about = "Keep web page bookmarks sorted into categories"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over WEBSHELF_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over WEBSHELF_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print bookmarks, optionally only one category
    List(ListArgs),
    /// Save a new bookmark
    Add(AddArgs),
    /// Change fields of an existing bookmark
    Edit(EditArgs),
    /// Delete a bookmark
    Delete(DeleteArgs),
    /// Manage categories
    Category(CategoryArgs),
    /// Write every bookmark to a CSV file
    Export(ExportArgs),
    /// Replace all bookmarks with the contents of a CSV file
    Import(ImportArgs),
    /// Snapshot the current bookmarks and categories
    Backup,
    /// Replace the current data with the last snapshot
    Restore,
    /// Delete all live data and start over with the default categories
    Reset(ResetArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("WEBSHELF_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("WEBSHELF_DATA", path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;
    let mut coordinator =
        Coordinator::open(storage, &config.categories).context("loading saved bookmarks")?;

    let command = cli.command.unwrap_or(Commands::Tui);
    let output = match command {
        Commands::Tui => {
            let mut app = App::new(coordinator);
            return commands::run_tui(&mut app);
        }
        Commands::List(args) => commands::list_bookmarks(&mut coordinator, args)?,
        Commands::Add(args) => commands::add_bookmark(&mut coordinator, args)?,
        Commands::Edit(args) => commands::edit_bookmark(&mut coordinator, args)?,
        Commands::Delete(args) => commands::delete_bookmark(&mut coordinator, args)?,
        Commands::Category(args) => commands::handle_category_command(&mut coordinator, args)?,
        Commands::Export(args) => {
            commands::export_bookmarks(&coordinator, args, &config.export.file_name)?
        }
        Commands::Import(args) => commands::import_bookmarks(&mut coordinator, args)?,
        Commands::Backup => commands::create_backup(&mut coordinator)?,
        Commands::Restore => commands::restore_backup(&mut coordinator)?,
        Commands::Reset(args) => commands::reset_data(&mut coordinator, args)?,
    };
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_means_tui() -> Result<()> {
        let cli = Cli::try_parse_from(["webshelf"])?;
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "warn");
        Ok(())
    }

    #[test]
    fn category_move_parses_position() -> Result<()> {
        let cli = Cli::try_parse_from(["webshelf", "category", "move", "Blog", "2"])?;
        match cli.command {
            Some(Commands::Category(CategoryArgs {
                command: commands::CategoryCommand::Move { name, index },
            })) => {
                assert_eq!(name, "Blog");
                assert_eq!(index, 2);
            }
            other => panic!("unexpected parse {other:?}"),
        }
        Ok(())
    }
}
