use crate::parser::OrbitalRecord;
use crate::propagation::{LookAngle, Propagator};
use crate::tracking::TrackedSatellites;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

// ── Input ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    ToggleDetail,
    Back,
    Refresh,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }
        let action = match key.code {
            KeyCode::Up | KeyCode::Char('k') => Action::Up,
            KeyCode::Down | KeyCode::Char('j') => Action::Down,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::PageDown => Action::PageDown,
            KeyCode::Home => Action::Top,
            KeyCode::End => Action::Bottom,
            KeyCode::Char('d') | KeyCode::Enter => Action::ToggleDetail,
            KeyCode::Esc => Action::Back,
            KeyCode::Char(' ') => Action::Refresh,
            KeyCode::Char('q') => Action::Quit,
            _ => return None,
        };
        Some(action)
    }
}

// ── State ───────────────────────────────────────────────────────────────────

/// The selected entry as it was when the overlay opened.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailSnapshot {
    pub record: OrbitalRecord,
    pub look: LookAngle,
    pub rank: usize,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Steady,
    Detail(DetailSnapshot),
    Terminated,
}

/// Cursor, scroll position and overlay state of the interactive view.
pub struct App {
    state: State,
    cursor: usize,
    offset: usize,
    viewport: usize,
}

impl App {
    pub fn new(viewport: usize) -> Self {
        Self {
            state: State::Steady,
            cursor: 0,
            offset: 0,
            viewport: viewport.max(1),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First visible row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_terminated(&self) -> bool {
        self.state == State::Terminated
    }

    /// Number of list rows that fit on screen.
    pub fn set_viewport(&mut self, rows: usize) {
        self.viewport = rows.max(1);
        self.scroll_to_cursor();
    }

    pub fn handle_action<P: Propagator>(&mut self, action: Action, sats: &mut TrackedSatellites<P>) {
        if action == Action::Quit {
            self.state = State::Terminated;
            return;
        }

        match self.state {
            State::Steady => match action {
                Action::Up => self.move_to(self.cursor.saturating_sub(1), sats.len()),
                Action::Down => self.move_to(self.cursor + 1, sats.len()),
                Action::PageUp => self.move_to(self.cursor.saturating_sub(self.viewport), sats.len()),
                Action::PageDown => self.move_to(self.cursor + self.viewport, sats.len()),
                Action::Top => self.move_to(0, sats.len()),
                Action::Bottom => self.move_to(usize::MAX, sats.len()),
                Action::ToggleDetail => {
                    if let Some(tracked) = sats.get(self.cursor) {
                        self.state = State::Detail(DetailSnapshot {
                            record: tracked.record.clone(),
                            look: tracked.look,
                            rank: self.cursor + 1,
                            computed_at: sats.computed_at(),
                        });
                    }
                }
                Action::Refresh => {
                    self.refresh(sats);
                }
                Action::Back => self.state = State::Terminated,
                Action::Quit => {}
            },
            State::Detail(_) => {
                if matches!(action, Action::ToggleDetail | Action::Back) {
                    self.state = State::Steady;
                }
            }
            State::Terminated => {}
        }
    }

    /// The refresh timer fired. Only the list view recomputes.
    pub fn on_tick<P: Propagator>(&mut self, sats: &mut TrackedSatellites<P>) {
        if self.state == State::Steady {
            self.refresh(sats);
        }
    }

    /// Recompute and re-rank, keeping the cursor on the same object.
    /// Returns how many objects could not be propagated.
    pub fn refresh<P: Propagator>(&mut self, sats: &mut TrackedSatellites<P>) -> usize {
        let selected = sats.get(self.cursor).map(|t| t.record.catalog_id());
        let failures = sats.recompute();
        for failure in &failures {
            debug!("{}", failure);
        }
        sats.sort();
        self.cursor = selected.and_then(|id| sats.position_of(id)).unwrap_or(0);
        self.scroll_to_cursor();
        failures.len()
    }

    fn move_to(&mut self, row: usize, len: usize) {
        self.cursor = row.min(len.saturating_sub(1));
        self.scroll_to_cursor();
    }

    fn scroll_to_cursor(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.viewport {
            self.offset = self.cursor + 1 - self.viewport;
        }
    }
}
