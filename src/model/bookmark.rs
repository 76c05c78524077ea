use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::{ShelfError, ShelfResult};
use crate::model::category::CategoryFilter;

/// A saved web page. Field order is also the persisted key order and the
/// CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub date: String,
}

impl Bookmark {
    pub const FIELD_NAMES: [&'static str; 6] = ["id", "title", "url", "category", "memo", "date"];

    /// Values in `FIELD_NAMES` order.
    pub fn field_values(&self) -> [String; 6] {
        [
            self.id.to_string(),
            self.title.clone(),
            self.url.clone(),
            self.category.clone(),
            self.memo.clone(),
            self.date.clone(),
        ]
    }
}

/// The user-editable part of a bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkDraft {
    pub title: String,
    pub url: String,
    pub category: String,
    pub memo: String,
}

impl BookmarkDraft {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            category: category.into(),
            memo: memo.into(),
        }
    }

    pub fn validate(&self) -> ShelfResult<()> {
        if self.title.trim().is_empty() {
            return Err(ShelfError::Validation { field: "title" });
        }
        if self.url.trim().is_empty() {
            return Err(ShelfError::Validation { field: "url" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookmarkStore {
    items: Vec<Bookmark>,
    last_issued: i64,
}

impl BookmarkStore {
    pub fn from_records(records: Vec<Bookmark>) -> Self {
        let mut store = Self::default();
        store.replace_all(records);
        store
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&Bookmark> {
        self.items.iter().find(|bookmark| bookmark.id == id)
    }

    pub fn create(&mut self, draft: BookmarkDraft) -> ShelfResult<i64> {
        self.create_at(draft, OffsetDateTime::now_utc())
    }

    /// Appends a bookmark stamped with `now`. Returns the assigned id.
    pub fn create_at(&mut self, draft: BookmarkDraft, now: OffsetDateTime) -> ShelfResult<i64> {
        draft.validate()?;
        let date = calendar_date(now)?;
        let id = self.next_id(now);
        self.last_issued = id;
        self.items.push(Bookmark {
            id,
            title: draft.title,
            url: draft.url,
            category: draft.category,
            memo: draft.memo,
            date,
        });
        Ok(id)
    }

    pub fn update(&mut self, id: i64, draft: BookmarkDraft) -> ShelfResult<()> {
        let Some(bookmark) = self.items.iter_mut().find(|bookmark| bookmark.id == id) else {
            return Err(ShelfError::NotFound(id));
        };
        draft.validate()?;
        bookmark.title = draft.title;
        bookmark.url = draft.url;
        bookmark.category = draft.category;
        bookmark.memo = draft.memo;
        Ok(())
    }

    pub fn delete(&mut self, id: i64) -> ShelfResult<Bookmark> {
        let position = self
            .items
            .iter()
            .position(|bookmark| bookmark.id == id)
            .ok_or(ShelfError::NotFound(id))?;
        Ok(self.items.remove(position))
    }

    pub fn filter(&self, filter: &CategoryFilter) -> Vec<&Bookmark> {
        self.items
            .iter()
            .filter(|bookmark| filter.matches(bookmark))
            .collect()
    }

    pub fn count_in(&self, category: &str) -> usize {
        self.items
            .iter()
            .filter(|bookmark| bookmark.category == category)
            .count()
    }

    /// Swaps in a whole new collection. Category references are not checked.
    pub fn replace_all(&mut self, records: Vec<Bookmark>) {
        let highest = records.iter().map(|bookmark| bookmark.id).max();
        if let Some(highest) = highest {
            self.last_issued = self.last_issued.max(highest);
        }
        self.items = records;
    }

    pub(crate) fn recategorize(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for bookmark in self.items.iter_mut().filter(|b| b.category == from) {
            bookmark.category = to.to_string();
            moved += 1;
        }
        moved
    }

    fn next_id(&self, now: OffsetDateTime) -> i64 {
        let stamp = (now.unix_timestamp_nanos() / 1_000_000) as i64;
        let floor = self
            .items
            .iter()
            .map(|bookmark| bookmark.id)
            .max()
            .unwrap_or(0)
            .max(self.last_issued)
            .saturating_add(1);
        stamp.max(floor)
    }
}

/// `YYYY-MM-DD` in the offset of `now`.
fn calendar_date(now: OffsetDateTime) -> ShelfResult<String> {
    let date = now
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .context("formatting creation date")?;
    Ok(date)
}
