use ratatui::layout::Constraint;
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{ConnectionGroup, RateSample};
use crate::tui::theme::Theme;
use crate::tui::widgets::format::{format_bytes, format_rate};
use crate::view::SortSpec;

fn rate_of(rates: &FxHashMap<String, RateSample>, id: &str) -> RateSample {
    rates.get(id).copied().unwrap_or_default()
}

/// Render the live connections table.
///
/// Columns: Host | Source | Rule | Conns | Up Rate | Down Rate | Up | Down.
/// One row per group; expanded groups list their details beneath, indented.
/// `selected` is the group index (details are not selectable).
#[allow(clippy::too_many_arguments)]
pub fn render(
    frame: &mut Frame,
    area: ratatui::layout::Rect,
    groups: &[ConnectionGroup],
    group_rates: &FxHashMap<String, RateSample>,
    detail_rates: &FxHashMap<String, RateSample>,
    expanded: &FxHashSet<String>,
    selected: usize,
    sort: SortSpec,
    theme: &Theme,
) {
    let header = Row::new(
        ["Host", "Source", "Rule", "Conns", "Up Rate", "Down Rate", "Up", "Down"]
            .into_iter()
            .map(Cell::from),
    )
    .style(theme.header_style());

    let mut table_rows: Vec<Row> = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        let style = if i == selected {
            theme.selected_style()
        } else {
            Default::default()
        };
        let rate = rate_of(group_rates, &group.id);
        let marker = if expanded.contains(&group.id) {
            "- "
        } else if group.details.len() > 1 {
            "+ "
        } else {
            "  "
        };
        table_rows.push(
            Row::new(vec![
                Cell::from(format!("{marker}{}", display_or_dash(group.metadata.destination_label()))),
                Cell::from(display_or_dash(&group.metadata.source_ip).to_string()),
                Cell::from(group.rule.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(group.connection_count.to_string()),
                Cell::from(format_rate(rate.upload)),
                Cell::from(format_rate(rate.download)),
                Cell::from(format_bytes(group.upload)),
                Cell::from(format_bytes(group.download)),
            ])
            .style(style),
        );

        if expanded.contains(&group.id) {
            for detail in &group.details {
                let rate = rate_of(detail_rates, &detail.id);
                table_rows.push(
                    Row::new(vec![
                        Cell::from(format!("    {}", display_or_dash(detail.metadata.destination_label()))),
                        Cell::from(format!(
                            "{}:{}",
                            display_or_dash(&detail.metadata.source_ip),
                            display_or_dash(&detail.metadata.source_port),
                        )),
                        Cell::from(detail.rule.clone().unwrap_or_else(|| "-".to_string())),
                        Cell::from("".to_string()),
                        Cell::from(format_rate(rate.upload)),
                        Cell::from(format_rate(rate.download)),
                        Cell::from(format_bytes(detail.upload)),
                        Cell::from(format_bytes(detail.download)),
                    ])
                    .style(theme.dim_style()),
                );
            }
        }
    }

    let widths = [
        Constraint::Min(24),    // Host
        Constraint::Min(16),    // Source
        Constraint::Length(12), // Rule
        Constraint::Length(6),  // Conns
        Constraint::Length(11), // Up Rate
        Constraint::Length(11), // Down Rate
        Constraint::Length(9),  // Up
        Constraint::Length(9),  // Down
    ];

    let title = format!(
        " Connections ({}) sort: {} {} ",
        groups.len(),
        sort.key.title(),
        sort.dir.arrow()
    );
    let table = Table::new(table_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(theme.selected_style());

    frame.render_widget(table, area);
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
