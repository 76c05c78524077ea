pub mod app;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{ShelfError, ShelfResult};
pub use model::{Bookmark, BookmarkDraft};
pub use sync::Coordinator;
