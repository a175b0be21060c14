use crate::config::{APP_NAME, VERSION};
use crate::propagation::LookAngle;
use crate::tracking::{Tracked, TrackedSatellites};
use crate::tui::app::{App, State};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const NAME_WIDTH: usize = 24;

struct Areas {
    title: Rect,
    table: Rect,
    status: Rect,
    legend: Rect,
}

fn split(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(3),    // Table
            Constraint::Length(1), // Status
            Constraint::Length(3), // Legend
        ])
        .split(area);
    Areas {
        title: chunks[0],
        table: chunks[1],
        status: chunks[2],
        legend: chunks[3],
    }
}

fn table_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// How many list rows fit in a frame of the given size.
pub fn viewport_rows(area: Rect) -> usize {
    let inner = table_block().inner(split(area).table);
    // One line goes to the column header.
    (inner.height as usize).saturating_sub(1)
}

pub fn render<P>(f: &mut Frame, app: &App, sats: &TrackedSatellites<P>) {
    let areas = split(f.area());
    render_title(f, areas.title);
    render_table(f, areas.table, app, sats);
    render_status(f, areas.status, sats);
    render_legend(f, areas.legend, app);
}

fn render_title(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        format!("}}-- {} v{} --{{", APP_NAME, VERSION),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )))
    .centered()
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(title, area);
}

fn render_table<P>(f: &mut Frame, area: Rect, app: &App, sats: &TrackedSatellites<P>) {
    let block = table_block().title(format!(" Objects ({}) ", sats.len()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "   {:>4}  {:>7}  {:<NAME_WIDTH$}  {:>9}  {:>9}  {:>11}",
            "#", "CATALOG", "NAME", "AZIMUTH", "ELEVATION", "RANGE (KM)"
        ),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))];

    if sats.is_empty() {
        lines.push(Line::from(Span::styled(
            "   No objects stored. Run with --update <source list> first.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let visible = (inner.height as usize).saturating_sub(1);
    lines.extend(
        sats.iter()
            .enumerate()
            .skip(app.offset())
            .take(visible)
            .map(|(row, tracked)| {
                let selected = row == app.cursor();
                let style = if selected {
                    Style::default().fg(Color::White).add_modifier(Modifier::REVERSED)
                } else if tracked.look.is_available() {
                    Style::default().fg(Color::Gray)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Line::from(Span::styled(format_row(row + 1, tracked, selected), style))
            }),
    );

    f.render_widget(Paragraph::new(lines), inner);
}

fn format_row(rank: usize, tracked: &Tracked, selected: bool) -> String {
    let marker = if selected { "->" } else { "  " };
    let name: String = tracked.record.display_name().chars().take(NAME_WIDTH).collect();
    let (az, el, range) = format_look(&tracked.look);
    format!(
        "{} {:>4}  {:>7}  {:<NAME_WIDTH$}  {:>9}  {:>9}  {:>11}",
        marker,
        rank,
        tracked.record.catalog_id(),
        name,
        az,
        el,
        range
    )
}

fn format_look(look: &LookAngle) -> (String, String, String) {
    if look.is_available() {
        (
            format!("{:.3}", look.azimuth),
            format!("{:.3}", look.elevation),
            format!("{:.3}", look.range),
        )
    } else {
        ("-".into(), "-".into(), "unavailable".into())
    }
}

fn render_status<P>(f: &mut Frame, area: Rect, sats: &TrackedSatellites<P>) {
    let observer = sats.observer();
    let status = format!(
        " Observer {:.4}°, {:.4}°, {:.0} m │ {} objects │ {} unavailable │ {}",
        observer.latitude(),
        observer.longitude(),
        observer.altitude(),
        sats.len(),
        sats.unavailable_count(),
        sats.computed_at().format("%Y-%m-%d %H:%M:%S UTC"),
    );
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(status, Style::default().fg(Color::White)))),
        area,
    );
}

fn render_legend(f: &mut Frame, area: Rect, app: &App) {
    let legend = match app.state() {
        State::Detail(_) => " [Close: (d)/Esc] [Quit: (q)] ",
        _ => " [Quit: (q)/Esc] [Update: (space)] [Movement: ↑↓ (pg)up/(pg)down] [Details: (d)] ",
    };
    let para = Paragraph::new(Line::from(Span::styled(
        legend,
        Style::default().fg(Color::DarkGray),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(para, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::tests::{FakePropagator, observer, records};

    #[test]
    fn test_viewport_matches_layout() {
        // 3 title + 1 status + 3 legend, 2 table borders, 1 header.
        assert_eq!(viewport_rows(Rect::new(0, 0, 100, 30)), 30 - 7 - 2 - 1);
    }

    #[test]
    fn test_row_formatting() {
        let fake = FakePropagator::with(&[(25544, 420.5)]);
        let (sats, _) = TrackedSatellites::from_records(observer(), &fake, records());

        let first = format_row(1, &sats[0], true);
        assert!(first.starts_with("->    1    25544  ISS (ZARYA)"));
        assert!(first.ends_with("    420.500"));

        let last = format_row(3, &sats[2], false);
        assert!(last.starts_with("      3"));
        assert!(last.ends_with("unavailable"));
    }
}
