//! Keeps the in-memory shelf, its persisted copy and the derived view in
//! step.
//!
//! A command is applied to a copy of the state. The copy only replaces the
//! current state once its storage effect has been written, so a failed
//! write leaves both memory and disk as they were.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::app::actions::{Command, Effect, Event};
use crate::app::state::{AppState, Transition, ViewState};
use crate::codec;
use crate::config::CategoryOptions;
use crate::error::{ShelfError, ShelfResult};
use crate::storage::{self, KeyValueStore, SlotPair};

/// Sent to subscribers after every command that produced events.
#[derive(Debug, Clone)]
pub struct Notification {
    pub events: Vec<Event>,
    pub view: ViewState,
}

pub struct Coordinator<S: KeyValueStore> {
    store: S,
    state: AppState,
    view: ViewState,
    subscribers: Vec<Sender<Notification>>,
}

impl<S: KeyValueStore> Coordinator<S> {
    /// Loads the live slots, falling back to the default categories and an
    /// empty shelf for whatever is missing.
    pub fn open(store: S, options: &CategoryOptions) -> ShelfResult<Self> {
        let stored = storage::read_pair(&store, SlotPair::Live)?;
        let state = AppState::new(options).hydrated(stored);
        tracing::info!(
            bookmarks = state.bookmarks().len(),
            categories = state.categories().len(),
            "loaded shelf"
        );
        let view = state.view();
        Ok(Self {
            store,
            state,
            view,
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn dispatch(&mut self, command: Command) -> ShelfResult<Vec<Event>> {
        let name = command.name();
        let Transition {
            state,
            mut events,
            effect,
        } = self.state.apply(command).map_err(|err| {
            tracing::debug!(command = name, error = %err, "command rejected");
            err
        })?;

        let state = match effect {
            Effect::None => state,
            Effect::PersistLive => {
                self.persist(SlotPair::Live, &state)?;
                state
            }
            Effect::ClearLive => {
                self.store.write(&storage::pair_clears(SlotPair::Live))?;
                state
            }
            Effect::WriteBackup => {
                self.persist(SlotPair::Backup, &state)?;
                state
            }
            Effect::RestoreBackup => {
                let backup = storage::read_pair(&self.store, SlotPair::Backup)?;
                if backup.bookmarks.is_none() {
                    return Err(ShelfError::NoBackupAvailable);
                }
                let restored = state.hydrated(backup);
                self.persist(SlotPair::Live, &restored)?;
                events.push(Event::BackupRestored {
                    bookmarks: restored.bookmarks().len(),
                });
                restored
            }
        };

        if effect != Effect::None {
            tracing::info!(command = name, ?effect, events = events.len(), "applied command");
        }
        self.state = state;
        self.view = self.state.view();
        tracing::debug!(items = self.view.items.len(), "re-derived view");
        self.notify(&events);
        Ok(events)
    }

    /// CSV bytes for the whole shelf, in store order.
    pub fn export_csv(&self) -> ShelfResult<Vec<u8>> {
        codec::export(self.state.bookmarks().as_slice())
    }

    fn persist(&self, pair: SlotPair, state: &AppState) -> ShelfResult<()> {
        let writes = storage::pair_writes(
            pair,
            state.bookmarks().as_slice(),
            &state.categories().to_persisted(),
        )?;
        self.store.write(&writes)?;
        Ok(())
    }

    fn notify(&mut self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        let notification = Notification {
            events: events.to_vec(),
            view: self.view.clone(),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }
}
