use strum::IntoStaticStr;

use crate::model::BookmarkDraft;

/// Every user-facing action the shelf understands.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    AddBookmark(BookmarkDraft),
    /// Focus a bookmark for editing.
    EditBookmark(i64),
    UpdateBookmark { id: i64, draft: BookmarkDraft },
    CancelEdit,
    DeleteBookmark(i64),
    SelectCategory(String),
    AddCategory(String),
    RenameCategory { from: String, to: String },
    RemoveCategory(String),
    MoveCategory { name: String, to_index: usize },
    ImportCsv(Vec<u8>),
    CreateBackup,
    RestoreBackup,
    Reset,
}

impl Command {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// What changed as the result of a command.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    BookmarkAdded {
        id: i64,
    },
    BookmarkUpdated {
        id: i64,
    },
    BookmarkDeleted {
        id: i64,
    },
    EditStarted {
        id: i64,
    },
    EditCleared,
    CategorySelected {
        name: String,
    },
    CategoryAdded {
        name: String,
    },
    CategoryRenamed {
        from: String,
        to: String,
        reassigned: usize,
    },
    CategoryRemoved {
        name: String,
    },
    CategoryMoved {
        name: String,
        to_index: usize,
    },
    Imported {
        bookmarks: usize,
        dropped: usize,
        new_categories: Vec<String>,
    },
    BackupCreated {
        bookmarks: usize,
    },
    BackupRestored {
        bookmarks: usize,
    },
    DataReset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// One-line description for status bars and CLI output.
    pub fn describe(&self) -> String {
        match self {
            Event::BookmarkAdded { id } => format!("Added bookmark #{id}"),
            Event::BookmarkUpdated { id } => format!("Updated bookmark #{id}"),
            Event::BookmarkDeleted { id } => format!("Deleted bookmark #{id}"),
            Event::EditStarted { id } => format!("Editing bookmark #{id}"),
            Event::EditCleared => "Left edit mode".to_string(),
            Event::CategorySelected { name } => format!("Showing '{name}'"),
            Event::CategoryAdded { name } => format!("Added category '{name}'"),
            Event::CategoryRenamed {
                from,
                to,
                reassigned,
            } => format!(
                "Renamed category '{from}' to '{to}' ({reassigned} bookmark{})",
                if *reassigned == 1 { "" } else { "s" }
            ),
            Event::CategoryRemoved { name } => format!("Deleted category '{name}'"),
            Event::CategoryMoved { name, to_index } => {
                format!("Moved category '{name}' to position {to_index}")
            }
            Event::Imported {
                bookmarks,
                dropped,
                new_categories,
            } => {
                let mut line = format!("Imported {bookmarks} bookmark(s)");
                if *dropped > 0 {
                    line.push_str(&format!(", skipped {dropped} row(s) without id"));
                }
                if !new_categories.is_empty() {
                    line.push_str(&format!(", new categories: {}", new_categories.join(", ")));
                }
                line
            }
            Event::BackupCreated { bookmarks } => {
                format!("Backed up {bookmarks} bookmark(s)")
            }
            Event::BackupRestored { bookmarks } => {
                format!("Restored {bookmarks} bookmark(s) from backup")
            }
            Event::DataReset => "All data reset to defaults".to_string(),
        }
    }
}

/// Storage work the coordinator must finish before a transition counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Only derived view state changed.
    None,
    /// Both live collections must be rewritten.
    PersistLive,
    /// Both live slots must be emptied.
    ClearLive,
    /// The current collections go to the backup slots.
    WriteBackup,
    /// The backup slots replace the live collections.
    RestoreBackup,
}
