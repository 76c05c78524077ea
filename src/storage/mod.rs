use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use strum::IntoStaticStr;
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};
use crate::model::Bookmark;

mod memory;
mod schema;

pub use memory::MemoryStore;

/// Named durable slots. The key strings match the layout used by earlier
/// browser-based versions of the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Slot {
    #[strum(serialize = "webpagesData")]
    LiveBookmarks,
    #[strum(serialize = "categoriesData")]
    LiveCategories,
    #[strum(serialize = "webpagesBackup")]
    BackupBookmarks,
    #[strum(serialize = "categoriesBackup")]
    BackupCategories,
}

impl Slot {
    pub fn key(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPair {
    Live,
    Backup,
}

impl SlotPair {
    pub fn bookmarks(self) -> Slot {
        match self {
            SlotPair::Live => Slot::LiveBookmarks,
            SlotPair::Backup => Slot::BackupBookmarks,
        }
    }

    pub fn categories(self) -> Slot {
        match self {
            SlotPair::Live => Slot::LiveCategories,
            SlotPair::Backup => Slot::BackupCategories,
        }
    }
}

/// A pending slot mutation; `None` clears the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWrite {
    pub slot: Slot,
    pub value: Option<String>,
}

pub trait KeyValueStore {
    fn read(&self, slot: Slot) -> Result<Option<String>>;

    /// Applies every write or none of them.
    fn write(&self, writes: &[SlotWrite]) -> Result<()>;
}

/// Whatever a slot pair currently holds. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCollections {
    pub bookmarks: Option<Vec<Bookmark>>,
    pub categories: Option<Vec<String>>,
}

impl StoredCollections {
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_none() && self.categories.is_none()
    }
}

pub fn read_pair<S>(store: &S, pair: SlotPair) -> Result<StoredCollections>
where
    S: KeyValueStore + ?Sized,
{
    Ok(StoredCollections {
        bookmarks: read_json(store, pair.bookmarks())?,
        categories: read_json(store, pair.categories())?,
    })
}

pub fn pair_writes(
    pair: SlotPair,
    bookmarks: &[Bookmark],
    categories: &[String],
) -> Result<Vec<SlotWrite>> {
    let bookmarks = serde_json::to_string(bookmarks).context("encoding bookmarks")?;
    let categories = serde_json::to_string(categories).context("encoding categories")?;
    Ok(vec![
        SlotWrite {
            slot: pair.bookmarks(),
            value: Some(bookmarks),
        },
        SlotWrite {
            slot: pair.categories(),
            value: Some(categories),
        },
    ])
}

pub fn pair_clears(pair: SlotPair) -> Vec<SlotWrite> {
    vec![
        SlotWrite {
            slot: pair.bookmarks(),
            value: None,
        },
        SlotWrite {
            slot: pair.categories(),
            value: None,
        },
    ]
}

fn read_json<S, T>(store: &S, slot: Slot) -> Result<Option<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = store.read(slot)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("decoding slot {}", slot.key()))?;
    Ok(Some(value))
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }
}

impl KeyValueStore for StorageHandle {
    fn read(&self, slot: Slot) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![slot.key()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading slot {}", slot.key()))
        })
    }

    fn write(&self, writes: &[SlotWrite]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        for write in writes {
            match &write.value {
                Some(value) => {
                    tx.execute(
                        "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                        updated_at = excluded.updated_at",
                        params![write.slot.key(), value, now],
                    )
                    .with_context(|| format!("writing slot {}", write.slot.key()))?;
                }
                None => {
                    tx.execute(
                        "DELETE FROM slots WHERE key = ?1",
                        params![write.slot.key()],
                    )
                    .with_context(|| format!("clearing slot {}", write.slot.key()))?;
                }
            }
        }
        tx.commit().context("committing slot writes")?;
        tracing::debug!(writes = writes.len(), "persisted slot batch");
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = &paths.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::info!(path = %db_path.display(), "opened shelf database");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}
