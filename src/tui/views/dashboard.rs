use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::model::prune::prune;
use crate::state::MonitorState;
use crate::tui::theme::Theme;
use crate::tui::widgets::format::{format_bytes, format_rate};
use crate::tui::widgets::sparkline::sparkline_string;

/// Render the dashboard: window-scoped aggregates on top, the rolling
/// upload/download charts below.
///
/// Aggregates come from a pruned copy of the live snapshot so that sessions
/// idle for longer than the window stop counting. The two charts share one
/// vertical scale so their heights are comparable.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    monitor: &MonitorState,
    now_ms: i64,
    window_ms: i64,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(3),
            Constraint::Min(3),
        ])
        .split(area);

    render_summary(frame, chunks[0], monitor, now_ms, window_ms, theme);

    let up: Vec<u64> = monitor.traffic.iter().map(|s| s.up).collect();
    let down: Vec<u64> = monitor.traffic.iter().map(|s| s.down).collect();
    let shared_max = up.iter().chain(down.iter()).copied().max().unwrap_or(0);

    render_chart(frame, chunks[1], "Upload", &up, shared_max, theme.upload_color());
    render_chart(frame, chunks[2], "Download", &down, shared_max, theme.download_color());
}

fn render_summary(
    frame: &mut Frame,
    area: Rect,
    monitor: &MonitorState,
    now_ms: i64,
    window_ms: i64,
    theme: &Theme,
) {
    let windowed = prune(&monitor.snapshot, now_ms, window_ms);

    let up_rate: f64 = monitor.group_rates.values().map(|r| r.upload).sum();
    let down_rate: f64 = monitor.group_rates.values().map(|r| r.download).sum();

    let label_style = theme.dim_style();
    let value_style = theme.value_style();

    let lines = vec![
        Line::from(vec![
            Span::styled("Status     ", label_style),
            Span::styled(monitor.status.to_string(), value_style),
        ]),
        Line::from(vec![
            Span::styled("Rates      ", label_style),
            Span::styled(format!("↑ {}", format_rate(up_rate)), value_style),
            Span::raw("   "),
            Span::styled(format!("↓ {}", format_rate(down_rate)), value_style),
        ]),
        Line::from(vec![
            Span::styled("Window     ", label_style),
            Span::styled(
                format!(
                    "↑ {}   ↓ {}   {} sessions / {} groups",
                    format_bytes(windowed.upload_total),
                    format_bytes(windowed.download_total),
                    windowed.session_count(),
                    windowed.groups.len(),
                ),
                value_style,
            ),
        ]),
        Line::from(vec![
            Span::styled("Totals     ", label_style),
            Span::styled(
                format!(
                    "↑ {}   ↓ {}",
                    format_bytes(monitor.snapshot.upload_total),
                    format_bytes(monitor.snapshot.download_total),
                ),
                value_style,
            ),
        ]),
    ];

    let title = format!(" Dashboard ({}s window) ", window_ms / 1_000);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn render_chart(
    frame: &mut Frame,
    area: Rect,
    name: &str,
    series: &[u64],
    scale_max: u64,
    color: Color,
) {
    let width = area.width.saturating_sub(2) as usize;
    let chart = sparkline_string(series, width, Some(scale_max));

    let latest = series.last().copied().unwrap_or(0);
    let title = format!(" {} {}  peak {} ", name, format_bytes(latest), format_bytes(scale_max));

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(chart, Style::default().fg(color))))
            .block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
