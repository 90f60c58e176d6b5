pub mod event;
pub mod theme;
pub mod views;
pub mod widgets;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs};
use ratatui::Terminal;
use rustc_hash::FxHashSet;

use crate::api;
use crate::error::FlowdeckError;
use crate::model::ConnectionGroup;
use crate::state::{DetailScope, MonitorState, SharedMonitor};
use crate::view::{build_view, matches_search, sort_groups, GroupMode, SortKey, SortSpec};

use self::event::{Event, EventHandler};
use self::theme::Theme;
use self::views::View;
use self::widgets::SearchBar;

const MIN_COLS: u16 = 80;
const MIN_ROWS: u16 = 24;

/// Commands the console sends upstream to the pipeline thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMsg {
    /// Suspend ingestion; the last published frame stays on screen.
    Pause,
    /// Resume ingestion after a pause.
    Resume,
    /// Close the given sessions by numeric wire id, then re-fetch.
    Close(Vec<u64>),
    /// Shut the pipeline down.
    Quit,
}

/// Console application state.
pub struct App {
    pub current_view: View,
    pub sort: SortSpec,
    pub group_mode: GroupMode,
    pub search_bar: SearchBar,
    pub expanded: FxHashSet<String>,
    pub selected: usize,
    pub paused: bool,
    pub should_quit: bool,
    pub show_help: bool,
    pub theme: Theme,
    /// Sequence number of the last drawn state; a frame tick with the same
    /// number is skipped entirely.
    last_drawn_seq: Option<u64>,
    /// Set by input and resize events, which need a redraw even when no new
    /// state arrived.
    dirty: bool,
}

impl App {
    pub fn new(
        sort_key: SortKey,
        group_mode: GroupMode,
        no_color: bool,
        initial_search: Option<&str>,
    ) -> Self {
        let search_bar = match initial_search {
            Some(query) => SearchBar::with_query(query),
            None => SearchBar::new(),
        };

        let theme = Theme::new(no_color || std::env::var("NO_COLOR").is_ok());

        Self {
            current_view: View::Connections,
            sort: SortSpec::new(sort_key),
            group_mode,
            search_bar,
            expanded: FxHashSet::default(),
            selected: 0,
            paused: false,
            should_quit: false,
            show_help: false,
            theme,
            last_drawn_seq: None,
            dirty: true,
        }
    }

    /// The grouped, searched, sorted live table for the current settings.
    fn visible_groups(&self, state: &MonitorState) -> Vec<ConnectionGroup> {
        let mut groups = build_view(&state.snapshot.groups, self.group_mode);
        let query = self.search_bar.query();
        if !query.is_empty() {
            groups.retain(|g| matches_search(g, query));
        }
        sort_groups(&mut groups, self.sort, &state.group_rates);
        groups
    }

    fn switch_view(&mut self, view: View) {
        self.current_view = view;
        self.selected = 0;
        self.dirty = true;
    }
}

/// Run the interactive console event loop.
///
/// Takes ownership of the terminal and runs until the user quits. The shared
/// monitor cell is read on each tick; a redraw happens only when its sequence
/// number moved past the last drawn frame or an input event arrived.
pub fn run_tui(
    monitor: SharedMonitor,
    detail_scope: DetailScope,
    control: Sender<ControlMsg>,
    tick: Duration,
    sort_key: SortKey,
    group_mode: GroupMode,
    window_ms: i64,
    no_color: bool,
    initial_search: Option<&str>,
) -> Result<(), FlowdeckError> {
    // Check terminal size before entering alternate screen.
    let (cols, rows) = crossterm::terminal::size().map_err(|e| {
        FlowdeckError::Tui(io::Error::other(format!("cannot query terminal size: {e}")))
    })?;
    if cols < MIN_COLS || rows < MIN_ROWS {
        return Err(FlowdeckError::Tui(io::Error::other(format!(
            "terminal too small ({cols}x{rows}), minimum {MIN_COLS}x{MIN_ROWS}"
        ))));
    }

    // Spawn the input pump before touching terminal modes so a spawn
    // failure leaves the terminal untouched.
    let events = EventHandler::new(tick)?;

    enable_raw_mode().map_err(|e| FlowdeckError::Tui(io::Error::other(e.to_string())))?;
    io::stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| FlowdeckError::Tui(io::Error::other(e.to_string())))?;

    let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| FlowdeckError::Tui(io::Error::other(e.to_string())))?;

    let mut app = App::new(sort_key, group_mode, no_color, initial_search);

    let result = run_event_loop(
        &mut terminal,
        &mut app,
        &events,
        &monitor,
        &detail_scope,
        &control,
        window_ms,
    );

    // Restore terminal regardless of success/failure.
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
    let _ = control.send(ControlMsg::Quit);

    result
}

fn run_event_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    monitor: &SharedMonitor,
    detail_scope: &DetailScope,
    control: &Sender<ControlMsg>,
    window_ms: i64,
) -> Result<(), FlowdeckError> {
    loop {
        let state = monitor.load();

        // Render coalescing: a burst of snapshots between two ticks costs
        // one draw, and a quiet tick costs none.
        if app.dirty || app.last_drawn_seq != Some(state.seq) {
            terminal
                .draw(|frame| render(frame, app, &state, window_ms))
                .map_err(|e| FlowdeckError::Tui(io::Error::other(e.to_string())))?;
            app.last_drawn_seq = Some(state.seq);
            app.dirty = false;
        }

        if app.should_quit {
            return Ok(());
        }

        match events.next() {
            Ok(Event::Key(key)) => {
                app.dirty = true;
                // Search bar captures keys when active.
                if app.search_bar.handle_key(key) {
                    continue;
                }
                handle_key(app, key, &state, detail_scope, control);
            }
            Ok(Event::Resize(_, _)) => {
                app.dirty = true;
            }
            Ok(Event::Tick) => {
                // The loop head re-reads the shared cell; nothing else to do.
            }
            Err(_) => {
                // Event channel disconnected.
                app.should_quit = true;
            }
        }
    }
}

fn handle_key(
    app: &mut App,
    key: crossterm::event::KeyEvent,
    state: &MonitorState,
    detail_scope: &DetailScope,
    control: &Sender<ControlMsg>,
) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // View switching
        KeyCode::Tab => app.switch_view(app.current_view.next()),
        KeyCode::BackTab => app.switch_view(app.current_view.prev()),
        KeyCode::Char('1') => app.switch_view(View::Connections),
        KeyCode::Char('2') => app.switch_view(View::Closed),
        KeyCode::Char('3') => app.switch_view(View::Dashboard),

        // Search
        KeyCode::Char('/') => {
            app.search_bar.activate();
        }

        // Sort: s cycles the column, S reverses the direction.
        KeyCode::Char('s') => {
            app.sort = app.sort.click(app.sort.key.next());
        }
        KeyCode::Char('S') => {
            app.sort = app.sort.click(app.sort.key);
        }

        // Grouping axis. Bucket ids change meaning across axes, so the
        // expanded set is cleared and republished.
        KeyCode::Char('m') => {
            app.group_mode = app.group_mode.next();
            app.expanded.clear();
            app.selected = 0;
            publish_scope(app, detail_scope);
        }

        // Expand/collapse the selected group.
        KeyCode::Enter => {
            if app.current_view == View::Connections {
                let groups = app.visible_groups(state);
                if let Some(group) = groups.get(app.selected) {
                    if !app.expanded.remove(&group.id) {
                        app.expanded.insert(group.id.clone());
                    }
                    publish_scope(app, detail_scope);
                }
            }
        }

        // Close every session of the selected group.
        KeyCode::Char('x') => {
            if app.current_view == View::Connections {
                let groups = app.visible_groups(state);
                if let Some(group) = groups.get(app.selected) {
                    let ids = api::numeric_ids(group.details.iter().map(|d| d.id.as_str()));
                    if !ids.is_empty() {
                        let _ = control.send(ControlMsg::Close(ids));
                    }
                }
            }
        }

        // Pause/resume ingestion.
        KeyCode::Char('p') => {
            app.paused = !app.paused;
            let msg = if app.paused {
                ControlMsg::Pause
            } else {
                ControlMsg::Resume
            };
            let _ = control.send(msg);
        }

        // Navigation
        KeyCode::Up => {
            app.selected = app.selected.saturating_sub(1);
        }
        KeyCode::Down => {
            app.selected = app.selected.saturating_add(1);
        }
        KeyCode::PageUp => {
            app.selected = app.selected.saturating_sub(20);
        }
        KeyCode::PageDown => {
            app.selected = app.selected.saturating_add(20);
        }
        KeyCode::Home => {
            app.selected = 0;
        }
        KeyCode::End => {
            app.selected = usize::MAX;
        }

        // Help overlay
        KeyCode::Char('?') => {
            app.show_help = !app.show_help;
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            }
        }

        _ => {}
    }
}

fn publish_scope(app: &App, detail_scope: &DetailScope) {
    detail_scope.store(Arc::new(app.expanded.clone()));
}

fn render(frame: &mut ratatui::Frame, app: &mut App, state: &MonitorState, window_ms: i64) {
    let size = frame.area();

    if size.width < MIN_COLS || size.height < MIN_ROWS {
        let msg = format!(
            "Terminal too small ({0}x{1}). Minimum: {MIN_COLS}x{MIN_ROWS}. Please resize.",
            size.width, size.height
        );
        let paragraph = Paragraph::new(msg)
            .style(app.theme.alert_style())
            .block(Block::default().borders(Borders::ALL).title("flowdeck"));
        frame.render_widget(paragraph, size);
        return;
    }

    // Layout: tab bar (3 lines) + search bar (3 lines) + content (rest).
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
        ])
        .split(size);

    render_tabs(frame, chunks[0], app, state);
    frame.render_widget(app.search_bar.widget(&app.theme), chunks[1]);

    match app.current_view {
        View::Connections => {
            let groups = app.visible_groups(state);
            if !groups.is_empty() {
                app.selected = app.selected.min(groups.len() - 1);
            } else {
                app.selected = 0;
            }
            views::connections::render(
                frame,
                chunks[2],
                &groups,
                &state.group_rates,
                &state.detail_rates,
                &app.expanded,
                app.selected,
                app.sort,
                &app.theme,
            );
        }
        View::Closed => {
            if !state.closed.is_empty() {
                app.selected = app.selected.min(state.closed.len() - 1);
            } else {
                app.selected = 0;
            }
            views::closed::render(frame, chunks[2], &state.closed, app.selected, &app.theme);
        }
        View::Dashboard => {
            views::dashboard::render(
                frame,
                chunks[2],
                state,
                state.received_at_ms,
                window_ms,
                &app.theme,
            );
        }
    }

    if app.show_help {
        render_help_overlay(frame, size, &app.theme);
    }
}

fn render_tabs(frame: &mut ratatui::Frame, area: Rect, app: &App, state: &MonitorState) {
    let titles: Vec<Line<'_>> = [View::Connections, View::Closed, View::Dashboard]
        .iter()
        .map(|v| {
            let style = if *v == app.current_view {
                app.theme.accent_style()
            } else {
                app.theme.dim_style()
            };
            Line::from(Span::styled(v.title(), style))
        })
        .collect();

    let status = if app.paused {
        "paused".to_string()
    } else {
        state.status.to_string()
    };
    let title = format!(" flowdeck [{status}] {} ", app.group_mode.title());

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(app.current_view.index())
        .highlight_style(app.theme.accent_style())
        .divider(Span::raw(" | "));

    frame.render_widget(tabs, area);
}

fn render_help_overlay(frame: &mut ratatui::Frame, area: Rect, theme: &Theme) {
    let help_width = 50u16.min(area.width.saturating_sub(4));
    let help_height = 22u16.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help_text = vec![
        Line::from(Span::styled("Keyboard Shortcuts", theme.accent_style())),
        Line::from(""),
        Line::from("  q / Ctrl-C    Quit"),
        Line::from("  Tab           Next view"),
        Line::from("  Shift-Tab     Previous view"),
        Line::from("  1-3           Jump to view"),
        Line::from("  /             Open search"),
        Line::from("  Esc           Close search/help"),
        Line::from("  s             Cycle sort column"),
        Line::from("  S             Reverse sort"),
        Line::from("  m             Cycle grouping axis"),
        Line::from("  Enter         Expand/collapse group"),
        Line::from("  x             Close selected group"),
        Line::from("  p             Pause/resume updates"),
        Line::from("  Up/Down       Navigate rows"),
        Line::from("  PgUp/PgDn     Page scroll"),
        Line::from("  Home/End      Jump to top/bottom"),
        Line::from("  ?             Toggle this help"),
        Line::from(""),
        Line::from(Span::styled("Press ? or Esc to close", theme.dim_style())),
    ];

    let mut block = Block::default().borders(Borders::ALL).title(" Help ");
    if !theme.no_color {
        block = block.style(Style::default().bg(Color::Black));
    }
    let help = Paragraph::new(help_text).block(block);

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}
