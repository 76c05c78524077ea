use crate::app::actions::{Command, Effect, Event};
use crate::codec;
use crate::config::CategoryOptions;
use crate::error::{ShelfError, ShelfResult};
use crate::model::{Bookmark, BookmarkStore, CategoryFilter, CategoryRegistry};
use crate::storage::StoredCollections;

/// Everything the shelf knows about in one session.
#[derive(Debug, Clone)]
pub struct AppState {
    bookmarks: BookmarkStore,
    categories: CategoryRegistry,
    active_category: String,
    editing: Option<i64>,
}

/// The result of applying a command to a state.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: AppState,
    pub events: Vec<Event>,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTab {
    pub name: String,
    pub active: bool,
    pub count: usize,
    pub protected: bool,
}

/// Presentation-ready projection of [`AppState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub tabs: Vec<CategoryTab>,
    pub active_category: String,
    /// Bookmarks under the active tab, in store order.
    pub items: Vec<Bookmark>,
    /// Categories a bookmark can be filed under.
    pub category_options: Vec<String>,
    pub editing: Option<Bookmark>,
    pub total: usize,
}

impl AppState {
    pub fn new(options: &CategoryOptions) -> Self {
        let categories = CategoryRegistry::new(options.sentinel.clone(), &options.defaults);
        Self {
            bookmarks: BookmarkStore::default(),
            active_category: categories.sentinel().to_string(),
            categories,
            editing: None,
        }
    }

    /// Replaces both collections with what was read from a slot pair.
    /// A missing categories list means the defaults; saved lists are merged
    /// over the defaults.
    pub fn hydrated(&self, stored: StoredCollections) -> Self {
        let categories = match stored.categories {
            Some(saved) => self.categories.hydrate(saved),
            None => self.categories.reset_to_defaults(),
        };
        let mut bookmarks = self.bookmarks.clone();
        bookmarks.replace_all(stored.bookmarks.unwrap_or_default());

        let active_category = if categories.contains(&self.active_category) {
            self.active_category.clone()
        } else {
            categories.sentinel().to_string()
        };
        let editing = self.editing.filter(|id| bookmarks.get(*id).is_some());
        Self {
            bookmarks,
            categories,
            active_category,
            editing,
        }
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    pub fn active_filter(&self) -> CategoryFilter {
        self.categories
            .resolve(&self.active_category)
            .unwrap_or(CategoryFilter::All)
    }

    pub fn view(&self) -> ViewState {
        let tabs = self
            .categories
            .names()
            .map(|name| {
                let protected = self.categories.is_sentinel(name);
                CategoryTab {
                    name: name.to_string(),
                    active: name == self.active_category,
                    count: if protected {
                        self.bookmarks.len()
                    } else {
                        self.bookmarks.count_in(name)
                    },
                    protected,
                }
            })
            .collect();
        let items = self
            .bookmarks
            .filter(&self.active_filter())
            .into_iter()
            .cloned()
            .collect();
        ViewState {
            tabs,
            active_category: self.active_category.clone(),
            items,
            category_options: self.categories.assignable().map(str::to_string).collect(),
            editing: self
                .editing
                .and_then(|id| self.bookmarks.get(id))
                .cloned(),
            total: self.bookmarks.len(),
        }
    }

    /// Computes the state after `command` without touching `self`.
    /// Storage effects are described, not performed.
    pub fn apply(&self, command: Command) -> ShelfResult<Transition> {
        let mut next = self.clone();
        let mut events = Vec::new();
        let effect = match command {
            Command::AddBookmark(draft) => {
                draft.validate()?;
                next.require_assignable(&draft.category)?;
                let id = next.bookmarks.create(draft)?;
                events.push(Event::BookmarkAdded { id });
                Effect::PersistLive
            }
            Command::EditBookmark(id) => {
                if next.bookmarks.get(id).is_none() {
                    return Err(ShelfError::NotFound(id));
                }
                next.editing = Some(id);
                events.push(Event::EditStarted { id });
                Effect::None
            }
            Command::UpdateBookmark { id, draft } => {
                if next.bookmarks.get(id).is_none() {
                    return Err(ShelfError::NotFound(id));
                }
                draft.validate()?;
                next.require_assignable(&draft.category)?;
                next.bookmarks.update(id, draft)?;
                events.push(Event::BookmarkUpdated { id });
                if next.editing.take().is_some() {
                    events.push(Event::EditCleared);
                }
                Effect::PersistLive
            }
            Command::CancelEdit => {
                if next.editing.take().is_some() {
                    events.push(Event::EditCleared);
                }
                Effect::None
            }
            Command::DeleteBookmark(id) => {
                next.bookmarks.delete(id)?;
                events.push(Event::BookmarkDeleted { id });
                if next.editing == Some(id) {
                    next.editing = None;
                    events.push(Event::EditCleared);
                }
                Effect::PersistLive
            }
            Command::SelectCategory(name) => {
                next.categories.resolve(&name)?;
                next.active_category = name.clone();
                events.push(Event::CategorySelected { name });
                Effect::None
            }
            Command::AddCategory(name) => {
                let name = next.categories.add(&name)?;
                events.push(Event::CategoryAdded { name });
                Effect::PersistLive
            }
            Command::RenameCategory { from, to } => {
                let outcome = next.categories.rename(&from, &to, &mut next.bookmarks)?;
                if outcome.from == outcome.to {
                    Effect::None
                } else {
                    if next.active_category == outcome.from {
                        next.active_category = outcome.to.clone();
                    }
                    events.push(Event::CategoryRenamed {
                        from: outcome.from,
                        to: outcome.to,
                        reassigned: outcome.reassigned,
                    });
                    Effect::PersistLive
                }
            }
            Command::RemoveCategory(name) => {
                next.categories.remove(&name, &next.bookmarks)?;
                let was_active = next.active_category == name;
                events.push(Event::CategoryRemoved { name });
                if was_active {
                    next.active_category = next.categories.sentinel().to_string();
                    events.push(Event::CategorySelected {
                        name: next.active_category.clone(),
                    });
                }
                Effect::PersistLive
            }
            Command::MoveCategory { name, to_index } => {
                if next.categories.reorder(&name, to_index)? {
                    let to_index = next.categories.position(&name).unwrap_or(to_index);
                    events.push(Event::CategoryMoved { name, to_index });
                    Effect::PersistLive
                } else {
                    Effect::None
                }
            }
            Command::ImportCsv(bytes) => {
                let batch = codec::parse(&bytes)?;
                let new_categories = next.categories.merge(&batch.categories);
                let imported = batch.records.len();
                next.bookmarks.replace_all(batch.records);
                if let Some(id) = next.editing {
                    if next.bookmarks.get(id).is_none() {
                        next.editing = None;
                        events.push(Event::EditCleared);
                    }
                }
                events.push(Event::Imported {
                    bookmarks: imported,
                    dropped: batch.dropped,
                    new_categories,
                });
                Effect::PersistLive
            }
            Command::CreateBackup => {
                events.push(Event::BackupCreated {
                    bookmarks: next.bookmarks.len(),
                });
                Effect::WriteBackup
            }
            Command::RestoreBackup => Effect::RestoreBackup,
            Command::Reset => {
                next = next.hydrated(StoredCollections::default());
                next.active_category = next.categories.sentinel().to_string();
                next.editing = None;
                events.push(Event::DataReset);
                Effect::ClearLive
            }
        };
        Ok(Transition {
            state: next,
            events,
            effect,
        })
    }

    fn require_assignable(&self, category: &str) -> ShelfResult<()> {
        if self.categories.is_assignable(category) {
            Ok(())
        } else if self.categories.is_sentinel(category) {
            Err(ShelfError::ProtectedCategory(category.to_string()))
        } else {
            Err(ShelfError::UnknownCategory(category.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookmarkDraft;
    use assert_matches::assert_matches;

    fn options() -> CategoryOptions {
        CategoryOptions {
            sentinel: "All".into(),
            defaults: vec!["A".into(), "B".into(), "C".into()],
        }
    }

    fn step(state: &AppState, command: Command) -> AppState {
        state.apply(command).expect("command succeeds").state
    }

    fn add(state: &AppState, title: &str, category: &str) -> (AppState, i64) {
        let transition = state
            .apply(Command::AddBookmark(BookmarkDraft::new(
                title,
                "https://example.com",
                category,
                "",
            )))
            .expect("bookmark added");
        let id = match transition.events.as_slice() {
            [Event::BookmarkAdded { id }] => *id,
            other => panic!("unexpected events {other:?}"),
        };
        (transition.state, id)
    }

    #[test]
    fn adding_requires_a_real_category() {
        let state = AppState::new(&options());
        let draft = |category: &str| BookmarkDraft::new("t", "https://u", category, "");
        assert_matches!(
            state.apply(Command::AddBookmark(draft("Missing"))),
            Err(ShelfError::UnknownCategory(_))
        );
        assert_matches!(
            state.apply(Command::AddBookmark(draft("All"))),
            Err(ShelfError::ProtectedCategory(_))
        );
        assert_matches!(
            state.apply(Command::AddBookmark(BookmarkDraft::new("", "u", "Missing", ""))),
            Err(ShelfError::Validation { field: "title" })
        );
    }

    #[test]
    fn add_is_persisted_and_visible_under_the_sentinel() {
        let state = AppState::new(&options());
        let transition = state
            .apply(Command::AddBookmark(BookmarkDraft::new(
                "Docs",
                "https://docs.rs",
                "B",
                "",
            )))
            .expect("added");
        assert_eq!(transition.effect, Effect::PersistLive);
        let view = transition.state.view();
        assert_eq!(view.active_category, "All");
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.tabs[0].count, 1);
        assert_eq!(view.tabs[2].count, 1);
        assert_eq!(view.category_options, vec!["A", "B", "C"]);
    }

    #[test]
    fn selecting_a_category_filters_the_view() {
        let state = AppState::new(&options());
        let (state, a) = add(&state, "one", "A");
        let (state, _b) = add(&state, "two", "B");

        let transition = state
            .apply(Command::SelectCategory("A".into()))
            .expect("selected");
        assert_eq!(transition.effect, Effect::None);
        let view = transition.state.view();
        let ids: Vec<i64> = view.items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![a]);
        assert!(view.tabs.iter().any(|tab| tab.name == "A" && tab.active));
        assert_matches!(
            state.apply(Command::SelectCategory("Nope".into())),
            Err(ShelfError::UnknownCategory(_))
        );
    }

    #[test]
    fn deleting_the_focused_bookmark_leaves_edit_mode() {
        let state = AppState::new(&options());
        let (state, id) = add(&state, "one", "A");
        let state = step(&state, Command::EditBookmark(id));
        assert_eq!(state.editing(), Some(id));
        assert_eq!(state.view().editing.map(|item| item.id), Some(id));

        let transition = state.apply(Command::DeleteBookmark(id)).expect("deleted");
        assert_eq!(
            transition.events,
            vec![Event::BookmarkDeleted { id }, Event::EditCleared]
        );
        assert_eq!(transition.state.editing(), None);
        assert_matches!(
            transition.state.apply(Command::DeleteBookmark(id)),
            Err(ShelfError::NotFound(_))
        );
    }

    #[test]
    fn update_clears_focus_and_keeps_identity() {
        let state = AppState::new(&options());
        let (state, id) = add(&state, "one", "A");
        let date = state.bookmarks().get(id).expect("present").date.clone();
        let state = step(&state, Command::EditBookmark(id));

        let transition = state
            .apply(Command::UpdateBookmark {
                id,
                draft: BookmarkDraft::new("uno", "https://uno.example", "C", "memo"),
            })
            .expect("updated");
        assert_eq!(transition.state.editing(), None);
        let stored = transition.state.bookmarks().get(id).expect("present");
        assert_eq!(stored.title, "uno");
        assert_eq!(stored.category, "C");
        assert_eq!(stored.date, date);

        assert_matches!(
            transition.state.apply(Command::UpdateBookmark {
                id: id + 1,
                draft: BookmarkDraft::new("x", "y", "A", ""),
            }),
            Err(ShelfError::NotFound(_))
        );
    }

    #[test]
    fn removing_the_active_category_falls_back_to_the_sentinel() {
        let state = AppState::new(&options());
        let state = step(&state, Command::SelectCategory("C".into()));
        let transition = state
            .apply(Command::RemoveCategory("C".into()))
            .expect("removed");
        assert_eq!(transition.state.active_category(), "All");
        assert_eq!(
            transition.events,
            vec![
                Event::CategoryRemoved { name: "C".into() },
                Event::CategorySelected { name: "All".into() },
            ]
        );
    }

    #[test]
    fn removal_blocked_while_bookmarks_reference_it() {
        let state = AppState::new(&options());
        let (state, _id) = add(&state, "one", "A");
        assert_matches!(
            state.apply(Command::RemoveCategory("A".into())),
            Err(ShelfError::CategoryInUse { count: 1, .. })
        );
    }

    #[test]
    fn renaming_the_active_category_keeps_it_selected() {
        let state = AppState::new(&options());
        let (state, id) = add(&state, "one", "B");
        let state = step(&state, Command::SelectCategory("B".into()));
        let state = step(
            &state,
            Command::RenameCategory {
                from: "B".into(),
                to: "Bee".into(),
            },
        );
        assert_eq!(state.active_category(), "Bee");
        assert_eq!(state.view().items[0].id, id);
        assert_eq!(state.bookmarks().get(id).expect("present").category, "Bee");
    }

    #[test]
    fn moving_the_sentinel_changes_nothing() {
        let state = AppState::new(&options());
        let transition = state
            .apply(Command::MoveCategory {
                name: "All".into(),
                to_index: 0,
            })
            .expect("no-op");
        assert!(transition.events.is_empty());
        assert_eq!(transition.effect, Effect::None);
        assert_eq!(
            transition.state.categories().to_persisted(),
            state.categories().to_persisted()
        );

        let moved = state
            .apply(Command::MoveCategory {
                name: "C".into(),
                to_index: 1,
            })
            .expect("moved");
        assert_eq!(
            moved.events,
            vec![Event::CategoryMoved {
                name: "C".into(),
                to_index: 1
            }]
        );
        assert_eq!(moved.state.categories().to_persisted(), vec!["All", "C", "A", "B"]);
    }

    #[test]
    fn import_replaces_bookmarks_and_merges_categories() {
        let state = AppState::new(&options());
        let state = step(&state, Command::AddCategory("X".into()));
        let (state, old) = add(&state, "old", "X");

        let csv = "id,title,url,category,memo,date\n\
                   \"10\",\"t\",\"u\",\"B\",\"\",\"2024-01-01\"\n\
                   \"11\",\"t\",\"u\",\"Y\",\"\",\"2024-01-01\"\n\
                   \"\",\"lost\",\"u\",\"Z\",\"\",\"2024-01-01\"";
        let transition = state
            .apply(Command::ImportCsv(csv.as_bytes().to_vec()))
            .expect("imported");
        assert_eq!(
            transition.events,
            vec![Event::Imported {
                bookmarks: 2,
                dropped: 1,
                new_categories: vec!["Y".into()],
            }]
        );
        let next = transition.state;
        assert!(next.bookmarks().get(old).is_none());
        assert_eq!(
            next.categories().to_persisted(),
            vec!["All", "A", "B", "C", "X", "Y"]
        );
    }

    #[test]
    fn failed_import_leaves_state_untouched() {
        let state = AppState::new(&options());
        let (state, id) = add(&state, "keep", "A");
        assert_matches!(
            state.apply(Command::ImportCsv(b"id,title\n1,ok\n,,,".to_vec())),
            Err(ShelfError::ImportParse(_))
        );
        assert!(state.bookmarks().get(id).is_some());
    }

    // Historical behaviour kept on purpose: a CSV without an `id` column
    // parses fine, drops every row, and replaces the shelf with nothing.
    #[test]
    fn import_without_id_column_empties_the_shelf() {
        let state = AppState::new(&options());
        let (state, id) = add(&state, "lost", "A");
        let transition = state
            .apply(Command::ImportCsv(b"title,url\nx,y".to_vec()))
            .expect("import accepted");
        assert_eq!(
            transition.events,
            vec![Event::Imported {
                bookmarks: 0,
                dropped: 1,
                new_categories: Vec::new(),
            }]
        );
        assert_eq!(transition.effect, Effect::PersistLive);
        assert!(transition.state.bookmarks().get(id).is_none());
        assert!(transition.state.bookmarks().is_empty());
    }

    #[test]
    fn reset_returns_to_defaults() {
        let state = AppState::new(&options());
        let state = step(&state, Command::AddCategory("X".into()));
        let (state, _id) = add(&state, "one", "X");
        let state = step(&state, Command::SelectCategory("X".into()));

        let transition = state.apply(Command::Reset).expect("reset");
        assert_eq!(transition.effect, Effect::ClearLive);
        assert!(transition.state.bookmarks().is_empty());
        assert_eq!(transition.state.active_category(), "All");
        assert_eq!(
            transition.state.categories().to_persisted(),
            vec!["All", "A", "B", "C"]
        );
    }

    #[test]
    fn hydration_merges_saved_categories_over_defaults() {
        let state = AppState::new(&options());
        let stored = StoredCollections {
            bookmarks: None,
            categories: Some(vec!["All".into(), "Custom".into(), "B".into()]),
        };
        let hydrated = state.hydrated(stored);
        assert_eq!(
            hydrated.categories().to_persisted(),
            vec!["All", "A", "B", "C", "Custom"]
        );
        assert!(hydrated.bookmarks().is_empty());
    }
}
