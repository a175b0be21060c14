use crate::tui::app::DetailSnapshot;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::fmt::Display;

const WIDTH: u16 = 78;
const LABEL_WIDTH: usize = 22;

pub fn render(f: &mut Frame, snapshot: &DetailSnapshot) {
    let lines = detail_lines(snapshot);
    let area = centered(f.area(), WIDTH, lines.len() as u16 + 2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Details: {} ", snapshot.record.display_name()));

    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn detail_lines(snapshot: &DetailSnapshot) -> Vec<Line<'static>> {
    let record = &snapshot.record;
    let el = record.elements();
    let look = &snapshot.look;
    let raw = Style::default().fg(Color::White);

    let mut lines = vec![
        field("Name", record.name()),
        Line::from(Span::styled(format!(" {}", record.line1()), raw)),
        Line::from(Span::styled(format!(" {}", record.line2()), raw)),
        Line::from(""),
        field("NORAD", record.catalog_id()),
        field("Classification", el.classification),
        field("Designator", &el.designator),
        field(
            "Epoch",
            or_dash(el.epoch.map(|e| e.format("%Y-%m-%d %H:%M:%S%.3f UTC"))),
        ),
        field("Mean motion dot", or_dash(el.mean_motion_dot)),
        field("Mean motion ddot", or_dash(el.mean_motion_ddot)),
        field("BSTAR", or_dash(el.bstar)),
        field("Inclination", or_dash(el.inclination)),
        field("RAAN", or_dash(el.right_ascension)),
        field("Eccentricity", or_dash(el.eccentricity)),
        field("Arg of perigee", or_dash(el.argument_of_perigee)),
        field("Mean anomaly", or_dash(el.mean_anomaly)),
        field("Mean motion", or_dash(el.mean_motion)),
        field("Revolution number", or_dash(el.revolution_number)),
        Line::from(""),
    ];

    if look.is_available() {
        lines.push(field("Azimuth", format!("{:.3}", look.azimuth)));
        lines.push(field("Elevation", format!("{:.3}", look.elevation)));
        lines.push(field("Range (km)", format!("{:.3}", look.range)));
    } else {
        lines.push(field("Look angle", "unavailable"));
    }
    lines.push(field(
        "Rank",
        format!(
            "{} (at {})",
            snapshot.rank,
            snapshot.computed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ));
    lines
}

fn field(label: &str, value: impl Display) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {:<LABEL_WIDTH$}", format!("{}:", label)),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value.to_string(), Style::default().fg(Color::Gray)),
    ])
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
