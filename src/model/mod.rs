pub mod bookmark;
pub mod category;

pub use bookmark::{Bookmark, BookmarkDraft, BookmarkStore};
pub use category::{CategoryFilter, CategoryRegistry, RenameOutcome};
