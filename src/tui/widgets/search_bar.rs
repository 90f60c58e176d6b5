use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::theme::Theme;

/// Free-text search input for the live table.
///
/// When active it captures keyboard input; the current query is retrieved
/// with `query()` and applied as a case-insensitive substring match over
/// the whole group subtree. Deactivating with Enter keeps the query,
/// Escape clears it.
pub struct SearchBar {
    input: String,
    active: bool,
}

impl SearchBar {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            active: false,
        }
    }

    /// Seed the query programmatically, e.g. from `--search`.
    pub fn with_query(query: &str) -> Self {
        Self {
            input: query.to_string(),
            active: false,
        }
    }

    /// The current query; empty means no filtering.
    pub fn query(&self) -> &str {
        &self.input
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Handles a key event while active. Returns `true` if consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.active {
            return false;
        }

        match key.code {
            KeyCode::Char(c) => {
                // Ctrl+U clears the input
                if c == 'u' && key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.input.clear();
                } else {
                    self.input.push(c);
                }
                true
            }
            KeyCode::Backspace => {
                self.input.pop();
                true
            }
            KeyCode::Esc => {
                self.input.clear();
                self.active = false;
                true
            }
            KeyCode::Enter => {
                self.active = false;
                true
            }
            _ => true, // consume but ignore other keys while active
        }
    }

    /// A `Paragraph` for the search row of the layout.
    pub fn widget(&self, theme: &Theme) -> Paragraph<'_> {
        let (label, style) = if self.active {
            ("Search: ", theme.accent_style())
        } else if self.input.is_empty() {
            ("Press / to search", theme.dim_style())
        } else {
            ("Search: ", theme.applied_style())
        };

        let cursor = if self.active { "_" } else { "" };

        let line = Line::from(vec![
            Span::styled(label, style),
            Span::styled(self.input.as_str(), theme.value_style()),
            Span::styled(cursor, theme.accent_style()),
        ]);

        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title("Search"),
        )
    }
}

impl Default for SearchBar {
    fn default() -> Self {
        Self::new()
    }
}
