use thiserror::Error;

pub type ShelfResult<T> = std::result::Result<T, ShelfError>;

/// Failures surfaced to whoever triggered an action.
///
/// Everything except [`ShelfError::Storage`] is raised before any state is
/// touched, so the caller can report it and carry on.
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("{field} is required")]
    Validation { field: &'static str },
    #[error("category name cannot be empty")]
    EmptyName,
    #[error("category '{0}' already exists")]
    DuplicateCategory(String),
    #[error("category '{0}' cannot be changed")]
    ProtectedCategory(String),
    #[error("category '{0}' does not exist")]
    UnknownCategory(String),
    #[error("category '{name}' is still used by {count} bookmark(s)")]
    CategoryInUse { name: String, count: usize },
    #[error("bookmark #{0} not found")]
    NotFound(i64),
    #[error("there are no bookmarks to export")]
    EmptyExport,
    #[error("could not parse CSV: {0}")]
    ImportParse(String),
    #[error("no backup has been created yet")]
    NoBackupAvailable,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ShelfError {
    /// True for failures caused by the input of the action rather than the
    /// environment it ran in.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ShelfError::Storage(_))
    }
}
