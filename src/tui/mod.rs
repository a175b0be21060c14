pub mod app;
pub mod detail;
pub mod list;

use crate::config::RefreshInterval;
use crate::propagation::Propagator;
use crate::tracking::TrackedSatellites;
use anyhow::Result;
use app::{Action, App, State};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend, layout::Rect};
use std::io::{self, Stdout};
use std::time::Instant;

/// Full-screen ranked list with periodic recomputation.
pub struct InteractivePresenter {
    refresh: RefreshInterval,
}

impl InteractivePresenter {
    pub fn new(refresh: RefreshInterval) -> Self {
        Self { refresh }
    }

    /// Take over the terminal until the user quits.
    pub fn render<P: Propagator>(&mut self, sats: &mut TrackedSatellites<P>) -> Result<()> {
        let mut guard = TerminalGuard::acquire()?;
        let size = guard.terminal.size()?;
        let mut app = App::new(list::viewport_rows(Rect::new(0, 0, size.width, size.height)));
        main_loop(&mut guard.terminal, &mut app, sats, self.refresh)
    }
}

/// Draw one frame: the list, plus the overlay when it is open.
pub fn draw<P>(f: &mut Frame, app: &App, sats: &TrackedSatellites<P>) {
    list::render(f, app, sats);
    if let State::Detail(snapshot) = app.state() {
        detail::render(f, snapshot);
    }
}

enum Input {
    Action(Action),
    Tick,
    Redraw,
}

fn main_loop<P: Propagator>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    sats: &mut TrackedSatellites<P>,
    refresh: RefreshInterval,
) -> Result<()> {
    let mut next_tick = match refresh {
        RefreshInterval::Every(period) => Some(Instant::now() + period),
        RefreshInterval::Never => None,
    };

    while !app.is_terminated() {
        let size = terminal.size()?;
        app.set_viewport(list::viewport_rows(Rect::new(0, 0, size.width, size.height)));
        terminal.draw(|f| draw(f, app, sats))?;

        match next_input(next_tick)? {
            Input::Action(action) => app.handle_action(action, sats),
            Input::Tick => {
                app.on_tick(sats);
                if let RefreshInterval::Every(period) = refresh {
                    next_tick = Some(Instant::now() + period);
                }
            }
            Input::Redraw => {}
        }
    }
    Ok(())
}

/// Block until a key arrives or the refresh deadline passes.
fn next_input(deadline: Option<Instant>) -> Result<Input> {
    if let Some(deadline) = deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !event::poll(remaining)? {
            return Ok(Input::Tick);
        }
    }

    let input = match event::read()? {
        // Only handle key press events, not release/repeat (avoids double-input on Windows)
        Event::Key(key) if key.kind == KeyEventKind::Press => match Action::from_key(key) {
            Some(action) => Input::Action(action),
            None => Input::Redraw,
        },
        _ => Input::Redraw,
    };
    Ok(input)
}

// ── Terminal setup ──────────────────────────────────────────────────────────

/// Raw mode and the alternate screen, released on drop (including unwinding).
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, Hide) {
            restore_terminal();
            return Err(err.into());
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => {
                install_panic_hook();
                Ok(Self { terminal })
            }
            Err(err) => {
                restore_terminal();
                Err(err.into())
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

/// Leave the alternate screen before the panic message is printed.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::tests::{FakePropagator, observer, records};
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn frame_text(buffer: &Buffer) -> String {
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_once<P>(app: &App, sats: &TrackedSatellites<P>) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app, sats)).unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn test_repeated_draws_are_identical() {
        let fake = FakePropagator::with(&[(25544, 420.5), (20580, 1500.0)]);
        let (sats, _) = TrackedSatellites::from_records(observer(), &fake, records());
        let app = App::new(10);
        assert_eq!(render_once(&app, &sats), render_once(&app, &sats));
    }

    #[test]
    fn test_frame_shows_ranked_rows_and_legend() {
        let fake = FakePropagator::with(&[(25544, 420.5), (20580, 1500.0)]);
        let (sats, _) = TrackedSatellites::from_records(observer(), &fake, records());
        let app = App::new(10);
        let text = frame_text(&render_once(&app, &sats));

        assert!(text.contains("}-- satnow v"));
        assert!(text.contains("RANGE (KM)"));
        assert!(text.contains("->    1    25544  ISS (ZARYA)"));
        assert!(text.contains("2    20580  HST"));
        assert!(text.contains("1 unavailable"));
        assert!(text.contains("[Quit: (q)/Esc]"));

        let iss_row = text.lines().position(|l| l.contains("25544")).unwrap();
        let hst_row = text.lines().position(|l| l.contains("20580")).unwrap();
        let noaa_row = text.lines().position(|l| l.contains("43013")).unwrap();
        assert!(iss_row < hst_row && hst_row < noaa_row);
    }

    #[test]
    fn test_detail_overlay_is_drawn_over_the_list() {
        let fake = FakePropagator::with(&[(25544, 420.5), (20580, 1500.0)]);
        let (mut sats, _) = TrackedSatellites::from_records(observer(), &fake, records());
        let mut app = App::new(10);
        app.handle_action(Action::ToggleDetail, &mut sats);
        let text = frame_text(&render_once(&app, &sats));

        assert!(text.contains("Details: ISS (ZARYA)"));
        assert!(text.contains("Designator:"));
        assert!(text.contains("[Close: (d)/Esc]"));
    }

    #[test]
    fn test_empty_store_hint() {
        let fake = FakePropagator::default();
        let sats = TrackedSatellites::new(observer(), &fake);
        let text = frame_text(&render_once(&App::new(10), &sats));
        assert!(text.contains("No objects stored."));
        assert!(text.contains("0 objects"));
    }
}
