use ratatui::layout::Constraint;
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::model::ClosedConnectionRecord;
use crate::tui::theme::Theme;
use crate::tui::widgets::format::{format_bytes, format_clock};

/// Render the closed-connection ledger, newest first.
///
/// Rows are group-shaped so the columns line up with the live table, plus a
/// Closed column with the wall-clock time the session vanished.
pub fn render(
    frame: &mut Frame,
    area: ratatui::layout::Rect,
    records: &[ClosedConnectionRecord],
    selected: usize,
    theme: &Theme,
) {
    let header = Row::new(
        ["Closed", "Host", "Source", "Rule", "Up", "Down"]
            .into_iter()
            .map(Cell::from),
    )
    .style(theme.header_style());

    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let style = if i == selected {
                theme.selected_style()
            } else {
                Default::default()
            };
            let g = &rec.group;
            let host = g.metadata.destination_label();
            Row::new(vec![
                Cell::from(format_clock(rec.closed_at)),
                Cell::from(if host.is_empty() { "-" } else { host }.to_string()),
                Cell::from(if g.metadata.source_ip.is_empty() {
                    "-".to_string()
                } else {
                    g.metadata.source_ip.clone()
                }),
                Cell::from(g.rule.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(format_bytes(g.upload)),
                Cell::from(format_bytes(g.download)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(9),  // Closed
        Constraint::Min(24),    // Host
        Constraint::Min(16),    // Source
        Constraint::Length(12), // Rule
        Constraint::Length(9),  // Up
        Constraint::Length(9),  // Down
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Closed ({}) ", records.len())),
        )
        .row_highlight_style(theme.selected_style());

    frame.render_widget(table, area);
}
