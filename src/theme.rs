use ratatui::style::{Color, Modifier, Style};

/// Colors of the note editor screen
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Foreground color for the formatting toolbar
    pub toolbar_fg: Color,

    /// Background color for the formatting toolbar
    pub toolbar_bg: Color,

    /// Foreground color for a toggle that is on
    pub toggle_on_fg: Color,

    /// Background color for a toggle that is on
    pub toggle_on_bg: Color,

    /// Color of the dictation indicator while listening
    pub listening_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Foreground color for menu items
    pub menu_fg: Color,

    /// Background color for menu
    pub menu_bg: Color,

    /// Foreground color for selected menu entry
    pub menu_selected_fg: Color,

    /// Background color for selected menu entry
    pub menu_selected_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            toolbar_fg: Color::Black,
            toolbar_bg: Color::Gray,
            toggle_on_fg: Color::White,
            toggle_on_bg: Color::Blue,
            listening_color: Color::LightRed,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            menu_fg: Color::White,
            menu_bg: Color::Black,
            menu_selected_fg: Color::Black,
            menu_selected_bg: Color::White,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the filename in the status bar
    pub fn filename_style(&self) -> Style {
        self.status_bar_style().fg(self.filename_color)
    }

    pub fn toolbar_style(&self) -> Style {
        Style::default().fg(self.toolbar_fg).bg(self.toolbar_bg)
    }

    /// Style of a toolbar toggle; `on` only for a concrete true value.
    pub fn toggle_style(&self, on: bool) -> Style {
        if on {
            Style::default()
                .fg(self.toggle_on_fg)
                .bg(self.toggle_on_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            self.toolbar_style()
        }
    }

    pub fn listening_style(&self) -> Style {
        self.toolbar_style()
            .fg(self.listening_color)
            .add_modifier(Modifier::BOLD)
    }

    /// Get the style for selected text
    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Get the style for the menu/popup
    pub fn menu_style(&self) -> Style {
        Style::default().fg(self.menu_fg).bg(self.menu_bg)
    }

    /// Get the style for a selected menu entry
    pub fn menu_selected_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_fg)
            .bg(self.menu_selected_bg)
    }
}
