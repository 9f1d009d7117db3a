use ratatui::style::{Color, Modifier, Style};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    #[allow(dead_code)]
    Light,
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    #[allow(dead_code)]
    pub mode: ThemeMode,
    pub bg: Color,
    #[allow(dead_code)]
    pub fg: Color,
    pub primary: Color,
    pub accent: Color,
    pub frame: Color,
    pub selected: Color,
    pub success: Color,
    pub error: Color,
    pub muted: Color,
}

impl Theme {
    pub fn bench_dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            bg: Color::Rgb(22, 24, 28),
            fg: Color::White,
            primary: Color::Rgb(0, 200, 140),
            accent: Color::Rgb(64, 160, 255),
            frame: Color::Rgb(90, 90, 100),
            selected: Color::Rgb(255, 150, 40),
            success: Color::Green,
            error: Color::Red,
            muted: Color::DarkGray,
        }
    }

    #[allow(dead_code)]
    pub fn bench_light() -> Self {
        Self {
            mode: ThemeMode::Light,
            bg: Color::Rgb(245, 245, 247),
            fg: Color::Rgb(20, 20, 22),
            primary: Color::Rgb(0, 140, 100),
            accent: Color::Rgb(40, 120, 220),
            frame: Color::Rgb(200, 200, 210),
            selected: Color::Rgb(220, 110, 0),
            success: Color::Rgb(0, 150, 0),
            error: Color::Rgb(200, 0, 0),
            muted: Color::Rgb(120, 120, 130),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::bench_dark()
    }
}

impl Theme {
    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.selected)
    }

    #[allow(dead_code)]
    pub fn border_unfocused(&self) -> Style {
        Style::default().fg(self.frame)
    }

    pub fn text_active_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_editing_bold(&self) -> Style {
        Style::default()
            .fg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn list_cursor_style(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn toast_color(&self, level: crate::ui::ToastLevel) -> Color {
        match level {
            crate::ui::ToastLevel::Success => self.success,
            crate::ui::ToastLevel::Error => self.error,
            crate::ui::ToastLevel::Info => self.accent,
        }
    }
}

// Free helpers for widgets that have no theme handle at draw time.
pub fn border_focused() -> Style {
    Theme::default().border_focused()
}

pub fn text_active_bold() -> Style {
    Theme::default().text_active_bold()
}

pub fn text_editing_bold() -> Style {
    Theme::default().text_editing_bold()
}

pub fn text_muted() -> Style {
    Theme::default().text_muted()
}

pub fn text_error() -> Style {
    Theme::default().text_error()
}

pub fn toast_color(level: crate::ui::ToastLevel) -> Color {
    Theme::default().toast_color(level)
}

pub fn list_cursor_style() -> Style {
    Theme::default().list_cursor_style()
}
