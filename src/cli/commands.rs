use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::actions::{Command, Event};
use crate::app::App;
use crate::model::{Bookmark, BookmarkDraft};
use crate::storage::KeyValueStore;
use crate::sync::Coordinator;

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only show bookmarks filed under this category
    #[arg(long, short)]
    pub category: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,
    pub url: String,
    /// Category to file the bookmark under (defaults to the first one)
    #[arg(long, short)]
    pub category: Option<String>,
    #[arg(long, short, default_value = "")]
    pub memo: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Bookmark identifier
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long, short)]
    pub category: Option<String>,
    #[arg(long, short)]
    pub memo: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Bookmark identifier
    pub id: i64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// List categories with bookmark counts
    List,
    /// Add a category at the end of the list
    Add { name: String },
    /// Rename a category and move its bookmarks along
    Rename { from: String, to: String },
    /// Delete a category that holds no bookmarks
    Delete { name: String },
    /// Move a category to a position (1 is right after the "All" tab)
    Move { name: String, index: usize },
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Destination file (defaults to the configured export file name)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// CSV file to import. Reads stdin when omitted.
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResetArgs {
    /// Confirm that every live bookmark and custom category should go
    #[arg(long)]
    pub yes: bool,
}

pub fn run_tui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    app.run()
}

pub fn list_bookmarks<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: ListArgs,
) -> Result<String> {
    if let Some(category) = args.category {
        coordinator.dispatch(Command::SelectCategory(category))?;
    }
    let view = coordinator.view();
    Ok(format_bookmarks(&view.active_category, &view.items))
}

fn format_bookmarks(category: &str, items: &[Bookmark]) -> String {
    if items.is_empty() {
        return format!("No bookmarks in '{category}'.\n");
    }
    let mut out = String::new();
    for bookmark in items {
        let _ = writeln!(&mut out, "#{}  {}", bookmark.id, bookmark.title);
        let _ = writeln!(&mut out, "    {}", bookmark.url);
        let _ = writeln!(
            &mut out,
            "    [{}] added {}",
            bookmark.category, bookmark.date
        );
        if !bookmark.memo.trim().is_empty() {
            let _ = writeln!(&mut out, "    {}", bookmark.memo.replace('\n', " "));
        }
    }
    out
}

pub fn add_bookmark<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: AddArgs,
) -> Result<String> {
    let category = match args.category {
        Some(category) => category,
        None => coordinator
            .state()
            .categories()
            .assignable()
            .next()
            .map(str::to_string)
            .context("no category to file the bookmark under; add one first")?,
    };
    let draft = BookmarkDraft::new(args.title, args.url, category, args.memo);
    let events = coordinator.dispatch(Command::AddBookmark(draft))?;
    Ok(describe(&events))
}

pub fn edit_bookmark<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: EditArgs,
) -> Result<String> {
    coordinator.dispatch(Command::EditBookmark(args.id))?;
    let Some(current) = coordinator.view().editing.clone() else {
        bail!("bookmark #{} is not open for editing", args.id);
    };
    let draft = BookmarkDraft::new(
        args.title.unwrap_or(current.title),
        args.url.unwrap_or(current.url),
        args.category.unwrap_or(current.category),
        args.memo.unwrap_or(current.memo),
    );
    match coordinator.dispatch(Command::UpdateBookmark {
        id: args.id,
        draft,
    }) {
        Ok(events) => {
            let updates: Vec<Event> = events
                .into_iter()
                .filter(|event| !matches!(event, Event::EditCleared))
                .collect();
            Ok(describe(&updates))
        }
        Err(err) => {
            coordinator.dispatch(Command::CancelEdit)?;
            Err(err.into())
        }
    }
}

pub fn delete_bookmark<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: DeleteArgs,
) -> Result<String> {
    let events = coordinator.dispatch(Command::DeleteBookmark(args.id))?;
    Ok(describe(&events))
}

pub fn handle_category_command<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: CategoryArgs,
) -> Result<String> {
    let command = match args.command {
        CategoryCommand::List => return Ok(format_categories(coordinator)),
        CategoryCommand::Add { name } => Command::AddCategory(name),
        CategoryCommand::Rename { from, to } => Command::RenameCategory { from, to },
        CategoryCommand::Delete { name } => Command::RemoveCategory(name),
        CategoryCommand::Move { name, index } => Command::MoveCategory {
            name,
            to_index: index,
        },
    };
    let events = coordinator.dispatch(command)?;
    if events.is_empty() {
        return Ok("Nothing to change.\n".to_string());
    }
    Ok(describe(&events))
}

fn format_categories<S: KeyValueStore>(coordinator: &Coordinator<S>) -> String {
    let mut out = String::new();
    for (position, tab) in coordinator.view().tabs.iter().enumerate() {
        let marker = if tab.protected { "*" } else { " " };
        let _ = writeln!(
            &mut out,
            "{position:>3} {marker} {}  ({})",
            tab.name, tab.count
        );
    }
    out
}

pub fn export_bookmarks<S: KeyValueStore>(
    coordinator: &Coordinator<S>,
    args: ExportArgs,
    default_file: &str,
) -> Result<String> {
    let bytes = coordinator.export_csv()?;
    let path = args.output.unwrap_or_else(|| PathBuf::from(default_file));
    write_export(&path, &bytes)?;
    Ok(format!(
        "Exported {} bookmark(s) to {}\n",
        coordinator.state().bookmarks().len(),
        path.display()
    ))
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("writing export {}", path.display()))
}

pub fn import_bookmarks<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: ImportArgs,
) -> Result<String> {
    let bytes = match args.path {
        Some(path) => {
            fs::read(&path).with_context(|| format!("reading import {}", path.display()))?
        }
        None => match read_stdin()? {
            Some(bytes) => bytes,
            None => bail!("no CSV given; pass a path or pipe the file on stdin"),
        },
    };
    let events = coordinator.dispatch(Command::ImportCsv(bytes))?;
    Ok(describe(&events))
}

pub fn create_backup<S: KeyValueStore>(coordinator: &mut Coordinator<S>) -> Result<String> {
    let events = coordinator.dispatch(Command::CreateBackup)?;
    Ok(describe(&events))
}

pub fn restore_backup<S: KeyValueStore>(coordinator: &mut Coordinator<S>) -> Result<String> {
    let events = coordinator.dispatch(Command::RestoreBackup)?;
    Ok(describe(&events))
}

pub fn reset_data<S: KeyValueStore>(
    coordinator: &mut Coordinator<S>,
    args: ResetArgs,
) -> Result<String> {
    if !args.yes {
        bail!("reset deletes every live bookmark; re-run with --yes to confirm");
    }
    let events = coordinator.dispatch(Command::Reset)?;
    Ok(describe(&events))
}

fn describe(events: &[Event]) -> String {
    let mut out = String::new();
    for event in events {
        let _ = writeln!(&mut out, "{}", event.describe());
    }
    out
}

fn read_stdin() -> Result<Option<Vec<u8>>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .context("reading CSV from stdin")?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryOptions;
    use crate::error::ShelfError;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn setup() -> TestResult<Coordinator<MemoryStore>> {
        let options = CategoryOptions {
            sentinel: "All".into(),
            defaults: vec!["Learning".into(), "Tools".into()],
        };
        Ok(Coordinator::open(MemoryStore::new(), &options)?)
    }

    fn add(coordinator: &mut Coordinator<MemoryStore>, title: &str, category: &str) -> TestResult {
        add_bookmark(
            coordinator,
            AddArgs {
                title: title.into(),
                url: format!("https://{title}.example"),
                category: Some(category.into()),
                memo: String::new(),
            },
        )?;
        Ok(())
    }

    #[test]
    fn cli_list_filters_by_category() -> TestResult {
        let mut coordinator = setup()?;
        add(&mut coordinator, "rustbook", "Learning")?;
        add(&mut coordinator, "ripgrep", "Tools")?;

        let output = list_bookmarks(
            &mut coordinator,
            ListArgs {
                category: Some("Tools".into()),
            },
        )?;
        assert!(output.contains("ripgrep"));
        assert!(!output.contains("rustbook"));

        let everything = list_bookmarks(&mut coordinator, ListArgs { category: Some("All".into()) })?;
        assert!(everything.contains("rustbook"));
        assert!(everything.contains("ripgrep"));
        Ok(())
    }

    #[test]
    fn cli_add_defaults_to_first_category() -> TestResult {
        let mut coordinator = setup()?;
        let output = add_bookmark(
            &mut coordinator,
            AddArgs {
                title: "docs".into(),
                url: "https://docs.rs".into(),
                category: None,
                memo: "crates".into(),
            },
        )?;
        assert!(output.starts_with("Added bookmark #"));
        let stored = coordinator
            .state()
            .bookmarks()
            .iter()
            .next()
            .expect("bookmark stored");
        assert_eq!(stored.category, "Learning");
        assert_eq!(stored.memo, "crates");
        Ok(())
    }

    #[test]
    fn cli_edit_keeps_unspecified_fields() -> TestResult {
        let mut coordinator = setup()?;
        add(&mut coordinator, "docs", "Learning")?;
        let id = coordinator.view().items[0].id;

        edit_bookmark(
            &mut coordinator,
            EditArgs {
                id,
                category: Some("Tools".into()),
                ..EditArgs::default()
            },
        )?;
        let stored = coordinator.state().bookmarks().get(id).expect("present");
        assert_eq!(stored.title, "docs");
        assert_eq!(stored.category, "Tools");
        assert_eq!(coordinator.state().editing(), None);

        let missing = edit_bookmark(
            &mut coordinator,
            EditArgs {
                id: id + 1,
                ..EditArgs::default()
            },
        )
        .unwrap_err();
        assert_matches!(
            missing.downcast_ref::<ShelfError>(),
            Some(ShelfError::NotFound(n)) if *n == id + 1
        );
        Ok(())
    }

    #[test]
    fn cli_edit_rejected_update_leaves_edit_mode() -> TestResult {
        let mut coordinator = setup()?;
        add(&mut coordinator, "docs", "Learning")?;
        let id = coordinator.view().items[0].id;

        let output = edit_bookmark(
            &mut coordinator,
            EditArgs {
                id,
                memo: Some("read later".into()),
                ..EditArgs::default()
            },
        )?;
        assert!(!output.contains("Left edit mode"));

        let err = edit_bookmark(
            &mut coordinator,
            EditArgs {
                id,
                title: Some("   ".into()),
                ..EditArgs::default()
            },
        )
        .unwrap_err();
        assert_matches!(
            err.downcast_ref::<ShelfError>(),
            Some(ShelfError::Validation { field: "title" })
        );
        assert_eq!(coordinator.state().editing(), None);
        let stored = coordinator.state().bookmarks().get(id).expect("present");
        assert_eq!(stored.title, "docs");
        assert_eq!(stored.memo, "read later");
        Ok(())
    }

    #[test]
    fn cli_category_delete_refuses_non_empty_category() -> TestResult {
        let mut coordinator = setup()?;
        add(&mut coordinator, "docs", "Learning")?;

        let err = handle_category_command(
            &mut coordinator,
            CategoryArgs {
                command: CategoryCommand::Delete {
                    name: "Learning".into(),
                },
            },
        )
        .expect_err("category in use");
        assert_matches!(
            err.downcast_ref::<ShelfError>(),
            Some(ShelfError::CategoryInUse { count: 1, .. })
        );

        let listing = handle_category_command(
            &mut coordinator,
            CategoryArgs {
                command: CategoryCommand::List,
            },
        )?;
        assert!(listing.contains("Learning  (1)"));
        assert!(listing.contains("* All  (1)"));
        Ok(())
    }

    #[test]
    fn cli_category_move_of_sentinel_is_a_no_op() -> TestResult {
        let mut coordinator = setup()?;
        let output = handle_category_command(
            &mut coordinator,
            CategoryArgs {
                command: CategoryCommand::Move {
                    name: "All".into(),
                    index: 2,
                },
            },
        )?;
        assert_eq!(output, "Nothing to change.\n");
        Ok(())
    }

    #[test]
    fn cli_export_then_import_through_files() -> TestResult {
        let temp = TempDir::new()?;
        let target = temp.path().join("out/webpages.csv");
        let mut source = setup()?;
        add(&mut source, "docs", "Learning")?;
        add(&mut source, "grep", "Tools")?;

        let message = export_bookmarks(
            &source,
            ExportArgs {
                output: Some(target.clone()),
            },
            "unused.csv",
        )?;
        assert!(message.starts_with("Exported 2 bookmark(s)"));

        let mut destination = setup()?;
        let imported = import_bookmarks(
            &mut destination,
            ImportArgs {
                path: Some(target),
            },
        )?;
        assert!(imported.starts_with("Imported 2 bookmark(s)"));
        assert_eq!(
            destination.state().bookmarks().as_slice(),
            source.state().bookmarks().as_slice()
        );
        Ok(())
    }

    #[test]
    fn cli_export_of_empty_shelf_fails() -> TestResult {
        let temp = TempDir::new()?;
        let coordinator = setup()?;
        let err = export_bookmarks(
            &coordinator,
            ExportArgs {
                output: Some(temp.path().join("empty.csv")),
            },
            "unused.csv",
        )
        .expect_err("nothing to export");
        assert_matches!(err.downcast_ref::<ShelfError>(), Some(ShelfError::EmptyExport));
        assert!(!temp.path().join("empty.csv").exists());
        Ok(())
    }

    #[test]
    fn cli_reset_requires_confirmation() -> TestResult {
        let mut coordinator = setup()?;
        add(&mut coordinator, "docs", "Learning")?;
        create_backup(&mut coordinator)?;

        assert!(reset_data(&mut coordinator, ResetArgs { yes: false }).is_err());
        assert_eq!(coordinator.state().bookmarks().len(), 1);

        reset_data(&mut coordinator, ResetArgs { yes: true })?;
        assert!(coordinator.state().bookmarks().is_empty());

        let restored = restore_backup(&mut coordinator)?;
        assert_eq!(restored, "Restored 1 bookmark(s) from backup\n");
        Ok(())
    }
}
