use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::error::ShelfError;
use crate::storage::KeyValueStore;
use crate::sync::{Coordinator, Notification};
use crate::ui::{self, Screen};

pub mod actions;
pub mod state;

pub use actions::{Command, Effect, Event};
pub use state::{AppState, CategoryTab, Transition, ViewState};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NextCategory,
    PreviousCategory,
    MoveCategoryLeft,
    MoveCategoryRight,
    RequestDelete,
    Backup,
    Restore,
}

pub struct App<S: KeyValueStore> {
    coordinator: Coordinator<S>,
    updates: Receiver<Notification>,
    list_state: ListState,
    selected: usize,
    pending_delete: Option<i64>,
    status: Option<String>,
    should_quit: bool,
    tick_rate: Duration,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(mut coordinator: Coordinator<S>) -> Self {
        let updates = coordinator.subscribe();
        let status = Some(format!(
            "{} bookmark(s) in {} categories",
            coordinator.view().total,
            coordinator.state().categories().len()
        ));
        Self {
            coordinator,
            updates,
            list_state: ListState::default(),
            selected: 0,
            pending_delete: None,
            status,
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn view(&self) -> &ViewState {
        self.coordinator.view()
    }

    pub fn selected(&self) -> Option<usize> {
        (!self.view().items.is_empty()).then_some(self.selected)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let selected = self.selected();
            let view = self.coordinator.view();
            let screen = Screen {
                view,
                selected,
                status: self.status.as_deref(),
                confirm_delete: self
                    .pending_delete
                    .and_then(|id| view.items.iter().find(|bookmark| bookmark.id == id)),
            };
            let list_state = &mut self.list_state;
            list_state.select(selected);
            terminal
                .draw(|frame| ui::draw_app(frame, &screen, list_state))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let TermEvent::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.drain_updates();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if let Some(id) = self.pending_delete.take() {
            if key.code == KeyCode::Char('y') {
                self.dispatch(Command::DeleteBookmark(id));
            } else {
                self.status = Some("Delete cancelled".to_string());
            }
            return;
        }

        if key
            .modifiers
            .intersects(KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return;
        }
        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            _ if key.modifiers.contains(KeyModifiers::CONTROL) => None,
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::NextCategory),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::PreviousCategory),
            KeyCode::Char('<') => Some(Action::MoveCategoryLeft),
            KeyCode::Char('>') => Some(Action::MoveCategoryRight),
            KeyCode::Char('d') => Some(Action::RequestDelete),
            KeyCode::Char('b') => Some(Action::Backup),
            KeyCode::Char('B') => Some(Action::Restore),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::NextCategory => self.cycle_category(1),
            Action::PreviousCategory => self.cycle_category(-1),
            Action::MoveCategoryLeft => self.shift_active_category(-1),
            Action::MoveCategoryRight => self.shift_active_category(1),
            Action::RequestDelete => {
                let target = self
                    .selected()
                    .and_then(|index| self.view().items.get(index))
                    .map(|bookmark| (bookmark.id, bookmark.title.clone()));
                if let Some((id, title)) = target {
                    self.status = Some(format!("Delete \"{title}\"? (y/n)"));
                    self.pending_delete = Some(id);
                }
            }
            Action::Backup => self.dispatch(Command::CreateBackup),
            Action::Restore => self.dispatch(Command::RestoreBackup),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.view().items.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = self.selected as isize + delta;
        self.selected = next.clamp(0, len as isize - 1) as usize;
    }

    fn cycle_category(&mut self, delta: isize) {
        let tabs = &self.view().tabs;
        if tabs.is_empty() {
            return;
        }
        let current = tabs.iter().position(|tab| tab.active).unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        let name = tabs[next].name.clone();
        self.dispatch(Command::SelectCategory(name));
        self.selected = 0;
    }

    fn shift_active_category(&mut self, delta: isize) {
        let view = self.view();
        let Some(current) = view.tabs.iter().position(|tab| tab.active) else {
            return;
        };
        let name = view.active_category.clone();
        if view.tabs[current].protected {
            self.status = Some(format!("'{name}' always stays first"));
            return;
        }
        let target = current as isize + delta;
        if target < 1 {
            return;
        }
        self.dispatch(Command::MoveCategory {
            name,
            to_index: target as usize,
        });
    }

    fn dispatch(&mut self, command: Command) {
        match self.coordinator.dispatch(command) {
            Ok(_) => {}
            Err(err) => {
                if !err.is_user_error() {
                    tracing::error!(error = ?err, "command failed");
                }
                self.status = Some(describe_error(&err));
            }
        }
        self.drain_updates();
        let len = self.view().items.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn drain_updates(&mut self) {
        for notification in self.updates.try_iter() {
            if let Some(event) = notification.events.last() {
                self.status = Some(event.describe());
            }
        }
    }
}

fn describe_error(err: &ShelfError) -> String {
    match err {
        ShelfError::Storage(source) => format!("Could not save: {source:#}"),
        other => other.to_string(),
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
