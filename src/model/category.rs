use indexmap::IndexSet;

use crate::error::{ShelfError, ShelfResult};
use crate::model::bookmark::{Bookmark, BookmarkStore};

/// Which bookmarks a category tab shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Named(String),
}

impl CategoryFilter {
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => bookmark.category == *name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub from: String,
    pub to: String,
    pub reassigned: usize,
}

/// Ordered, unique category names behind an always-first sentinel.
///
/// The sentinel is never stored in `names`; it is prepended whenever the
/// full sequence is observed, so index 0 of that sequence always belongs to
/// it.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    sentinel: String,
    defaults: Vec<String>,
    names: IndexSet<String>,
}

impl CategoryRegistry {
    pub fn new(sentinel: impl Into<String>, defaults: &[String]) -> Self {
        let sentinel = sentinel.into();
        let defaults: Vec<String> = defaults
            .iter()
            .filter(|name| !name.trim().is_empty() && **name != sentinel)
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let names = defaults.iter().cloned().collect();
        Self {
            sentinel,
            defaults,
            names,
        }
    }

    /// A registry holding only the defaults, configured like `self`.
    pub fn reset_to_defaults(&self) -> Self {
        Self {
            sentinel: self.sentinel.clone(),
            defaults: self.defaults.clone(),
            names: self.defaults.iter().cloned().collect(),
        }
    }

    /// Rebuilds from a saved name list: defaults merged with everything saved.
    pub fn hydrate<I, S>(&self, saved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = self.reset_to_defaults();
        registry.merge(saved);
        registry
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn is_sentinel(&self, name: &str) -> bool {
        self.sentinel == name
    }

    /// Full sequence, sentinel first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.sentinel.as_str()).chain(self.assignable())
    }

    /// Names a bookmark may be filed under.
    pub fn assignable(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_sentinel(name) || self.names.contains(name)
    }

    pub fn is_assignable(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Position in the full sequence.
    pub fn position(&self, name: &str) -> Option<usize> {
        if self.is_sentinel(name) {
            return Some(0);
        }
        self.names.get_index_of(name).map(|index| index + 1)
    }

    pub fn resolve(&self, name: &str) -> ShelfResult<CategoryFilter> {
        if self.is_sentinel(name) {
            Ok(CategoryFilter::All)
        } else if self.names.contains(name) {
            Ok(CategoryFilter::Named(name.to_string()))
        } else {
            Err(ShelfError::UnknownCategory(name.to_string()))
        }
    }

    /// Appends a new category. Returns the stored (trimmed) name.
    pub fn add(&mut self, name: &str) -> ShelfResult<String> {
        let name = name.trim();
        // blank names count as already taken
        if name.is_empty() || self.contains(name) {
            return Err(ShelfError::DuplicateCategory(name.to_string()));
        }
        self.names.insert(name.to_string());
        Ok(name.to_string())
    }

    /// Renames `old` in place and moves every bookmark filed under it.
    /// Nothing is modified unless the whole operation is valid.
    pub fn rename(
        &mut self,
        old: &str,
        new: &str,
        bookmarks: &mut BookmarkStore,
    ) -> ShelfResult<RenameOutcome> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ShelfError::EmptyName);
        }
        if self.is_sentinel(old) {
            return Err(ShelfError::ProtectedCategory(old.to_string()));
        }
        if !self.names.contains(old) {
            return Err(ShelfError::UnknownCategory(old.to_string()));
        }
        if new == old {
            return Ok(RenameOutcome {
                from: old.to_string(),
                to: new.to_string(),
                reassigned: 0,
            });
        }
        if self.contains(new) {
            return Err(ShelfError::DuplicateCategory(new.to_string()));
        }

        self.names = self
            .names
            .iter()
            .map(|name| {
                if name == old {
                    new.to_string()
                } else {
                    name.clone()
                }
            })
            .collect();
        let reassigned = bookmarks.recategorize(old, new);
        Ok(RenameOutcome {
            from: old.to_string(),
            to: new.to_string(),
            reassigned,
        })
    }

    pub fn remove(&mut self, name: &str, bookmarks: &BookmarkStore) -> ShelfResult<()> {
        if self.is_sentinel(name) {
            return Err(ShelfError::ProtectedCategory(name.to_string()));
        }
        if !self.names.contains(name) {
            return Err(ShelfError::UnknownCategory(name.to_string()));
        }
        let count = bookmarks.count_in(name);
        if count > 0 {
            return Err(ShelfError::CategoryInUse {
                name: name.to_string(),
                count,
            });
        }
        self.names.shift_remove(name);
        Ok(())
    }

    /// Moves `name` to `to_index` of the full sequence. Returns whether the
    /// order changed; moving the sentinel, dropping onto it, or dropping an
    /// item onto its own slot is ignored.
    pub fn reorder(&mut self, name: &str, to_index: usize) -> ShelfResult<bool> {
        if self.is_sentinel(name) {
            return Ok(false);
        }
        let Some(from) = self.names.get_index_of(name) else {
            return Err(ShelfError::UnknownCategory(name.to_string()));
        };
        if to_index == 0 {
            return Ok(false);
        }
        let to = (to_index - 1).min(self.names.len() - 1);
        if to == from {
            return Ok(false);
        }
        self.names.move_index(from, to);
        Ok(true)
    }

    /// Unions `incoming` into the registry. Default categories end up first
    /// in default order; every other name keeps first-seen order after them.
    /// Returns the names that were not known before.
    pub fn merge<I, S>(&mut self, incoming: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut union = self.names.clone();
        let mut added = Vec::new();
        for name in incoming {
            let name = name.as_ref();
            if name.trim().is_empty() || self.is_sentinel(name) {
                continue;
            }
            if union.insert(name.to_string()) {
                added.push(name.to_string());
            }
        }

        let defaults = &self.defaults;
        let mut ordered: Vec<String> = union.into_iter().collect();
        ordered.sort_by_key(|name| {
            defaults
                .iter()
                .position(|default| default == name)
                .unwrap_or(usize::MAX)
        });
        self.names = ordered.into_iter().collect();
        added
    }

    /// The full sequence as it is persisted.
    pub fn to_persisted(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }
}
