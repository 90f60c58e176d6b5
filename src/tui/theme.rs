use ratatui::style::{Color, Modifier, Style};

/// Color theme for console rendering.
///
/// Respects the NO_COLOR convention: when `no_color` is set, styles fall
/// back to modifiers only and chart colors to `Color::Reset`.
pub struct Theme {
    pub no_color: bool,
}

impl Theme {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Table and column headers.
    pub fn header_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::BOLD);
        }
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    /// The selected row.
    pub fn selected_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::REVERSED);
        }
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    /// De-emphasized text: detail rows, inactive tabs, summary labels.
    pub fn dim_style(&self) -> Style {
        if self.no_color {
            return Style::default();
        }
        Style::default().fg(Color::DarkGray)
    }

    /// Highlighted interactive element: active tab, active input.
    pub fn accent_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::BOLD);
        }
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    /// An applied-but-inactive input, e.g. a search query in effect.
    pub fn applied_style(&self) -> Style {
        if self.no_color {
            return Style::default();
        }
        Style::default().fg(Color::Green)
    }

    /// Emphasized values in summary panes.
    pub fn value_style(&self) -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    /// Error text, e.g. the terminal-too-small notice.
    pub fn alert_style(&self) -> Style {
        if self.no_color {
            return Style::default().add_modifier(Modifier::BOLD);
        }
        Style::default().fg(Color::Red)
    }

    pub fn upload_color(&self) -> Color {
        if self.no_color {
            Color::Reset
        } else {
            Color::Green
        }
    }

    pub fn download_color(&self) -> Color {
        if self.no_color {
            Color::Reset
        } else {
            Color::Cyan
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colored_styles_carry_colors() {
        let theme = Theme::new(false);
        assert_eq!(theme.header_style().fg, Some(Color::Yellow));
        assert_eq!(theme.selected_style().bg, Some(Color::DarkGray));
        assert_eq!(theme.dim_style().fg, Some(Color::DarkGray));
        assert_eq!(theme.upload_color(), Color::Green);
        assert_eq!(theme.download_color(), Color::Cyan);
    }

    #[test]
    fn no_color_styles_have_no_colors() {
        let theme = Theme::new(true);
        for style in [
            theme.header_style(),
            theme.selected_style(),
            theme.dim_style(),
            theme.accent_style(),
            theme.applied_style(),
            theme.value_style(),
            theme.alert_style(),
        ] {
            assert_eq!(style.fg, None);
            assert_eq!(style.bg, None);
        }
        assert_eq!(theme.upload_color(), Color::Reset);
        assert_eq!(theme.download_color(), Color::Reset);
    }

    #[test]
    fn no_color_selection_stays_distinguishable() {
        let theme = Theme::new(true);
        assert!(theme
            .selected_style()
            .add_modifier
            .contains(Modifier::REVERSED));
        assert!(theme.header_style().add_modifier.contains(Modifier::BOLD));
    }
}
