use crossterm::tty::IsTty;
use ratatui::style::{Color, Modifier, Style};
use std::env;
use std::io;

const THEME_ENV: &str = "SCANWIZ_THEME";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorLevel {
    None,
    Ansi16,
    Ansi256,
    TrueColor,
}

#[derive(Clone, Copy, Debug)]
pub struct ThemeSettings {
    pub mode: ThemeMode,
    pub color_level: ColorLevel,
}

pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub on_accent: Color,
    pub muted: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub border: Color,
    pub surface: Color,
    pub selected: Color,
    pub color_level: ColorLevel,
}

impl Default for Theme {
    fn default() -> Self {
        Self::for_mode(ThemeMode::Dark, ColorLevel::Ansi16)
    }
}

impl ThemeSettings {
    /// Mode from `SCANWIZ_THEME`, then `COLORFGBG`, else dark.
    #[must_use]
    pub fn resolve() -> Self {
        let color_level = ColorLevel::detect();
        let mode = ThemeMode::resolve(color_level);
        Self { mode, color_level }
    }
}

impl ThemeMode {
    fn resolve(color_level: ColorLevel) -> Self {
        if let Some(mode) = env::var(THEME_ENV).ok().and_then(|v| Self::parse(&v)) {
            return mode;
        }
        if color_level == ColorLevel::None {
            return ThemeMode::Dark;
        }
        env::var("COLORFGBG")
            .ok()
            .and_then(|v| Self::from_colorfgbg(&v))
            .unwrap_or(ThemeMode::Dark)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(ThemeMode::Dark),
            "light" => Some(ThemeMode::Light),
            _ => None,
        }
    }

    /// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`); low ANSI indices are dark.
    fn from_colorfgbg(value: &str) -> Option<Self> {
        let bg = value.split(';').next_back()?.parse::<u8>().ok()?;
        Some(if bg <= 6 || bg == 8 {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        })
    }

    #[must_use]
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }
}

impl ColorLevel {
    #[must_use]
    pub fn detect() -> Self {
        if env::var_os("NO_COLOR").is_some() || !io::stdout().is_tty() {
            return ColorLevel::None;
        }
        Self::from_term(
            &env::var("COLORTERM").unwrap_or_default(),
            &env::var("TERM").unwrap_or_default(),
        )
    }

    fn from_term(colorterm: &str, term: &str) -> Self {
        let colorterm = colorterm.to_ascii_lowercase();
        if colorterm.contains("truecolor") || colorterm.contains("24bit") {
            ColorLevel::TrueColor
        } else if term.contains("256color") {
            ColorLevel::Ansi256
        } else {
            ColorLevel::Ansi16
        }
    }
}

impl Theme {
    #[must_use]
    pub fn for_mode(mode: ThemeMode, color_level: ColorLevel) -> Self {
        let [bg, fg, accent, on_accent, muted, success, warning, error, info, border, surface, selected] =
            match (mode, color_level) {
                (_, ColorLevel::None) => [Color::Reset; 12],
                (ThemeMode::Dark, ColorLevel::TrueColor) => [
                    Color::Rgb(18, 20, 24),
                    Color::Rgb(226, 228, 233),
                    Color::Rgb(125, 207, 255),
                    Color::Rgb(18, 20, 24),
                    Color::Rgb(110, 116, 130),
                    Color::Rgb(120, 220, 140),
                    Color::Rgb(240, 200, 100),
                    Color::Rgb(250, 100, 100),
                    Color::Rgb(190, 150, 255),
                    Color::Rgb(70, 76, 90),
                    Color::Rgb(28, 31, 38),
                    Color::Rgb(48, 54, 68),
                ],
                (ThemeMode::Dark, ColorLevel::Ansi256) => [
                    Color::Indexed(234),
                    Color::Indexed(253),
                    Color::Indexed(117),
                    Color::Indexed(234),
                    Color::Indexed(244),
                    Color::Indexed(114),
                    Color::Indexed(221),
                    Color::Indexed(203),
                    Color::Indexed(141),
                    Color::Indexed(239),
                    Color::Indexed(235),
                    Color::Indexed(238),
                ],
                (ThemeMode::Dark, ColorLevel::Ansi16) => [
                    Color::Black,
                    Color::White,
                    Color::LightCyan,
                    Color::Black,
                    Color::DarkGray,
                    Color::LightGreen,
                    Color::Yellow,
                    Color::LightRed,
                    Color::LightMagenta,
                    Color::DarkGray,
                    Color::Black,
                    Color::DarkGray,
                ],
                (ThemeMode::Light, ColorLevel::TrueColor) => [
                    Color::Rgb(250, 250, 252),
                    Color::Rgb(32, 34, 40),
                    Color::Rgb(0, 110, 190),
                    Color::Rgb(250, 250, 252),
                    Color::Rgb(130, 134, 145),
                    Color::Rgb(20, 130, 50),
                    Color::Rgb(180, 120, 0),
                    Color::Rgb(200, 30, 30),
                    Color::Rgb(120, 60, 200),
                    Color::Rgb(205, 208, 215),
                    Color::Rgb(243, 244, 247),
                    Color::Rgb(222, 228, 240),
                ],
                (ThemeMode::Light, ColorLevel::Ansi256) => [
                    Color::Indexed(231),
                    Color::Indexed(235),
                    Color::Indexed(25),
                    Color::Indexed(231),
                    Color::Indexed(245),
                    Color::Indexed(28),
                    Color::Indexed(136),
                    Color::Indexed(160),
                    Color::Indexed(91),
                    Color::Indexed(251),
                    Color::Indexed(255),
                    Color::Indexed(253),
                ],
                (ThemeMode::Light, ColorLevel::Ansi16) => [
                    Color::White,
                    Color::Black,
                    Color::Blue,
                    Color::White,
                    Color::DarkGray,
                    Color::Green,
                    Color::Yellow,
                    Color::Red,
                    Color::Magenta,
                    Color::Gray,
                    Color::White,
                    Color::Gray,
                ],
            };

        Self {
            bg,
            fg,
            accent,
            on_accent,
            muted,
            success,
            warning,
            error,
            info,
            border,
            surface,
            selected,
            color_level,
        }
    }

    #[must_use]
    pub fn is_monochrome(&self) -> bool {
        self.color_level == ColorLevel::None
    }

    /// Inverted label style for keys and badges; reverse video without colors.
    #[must_use]
    pub fn badge(&self, color: Color) -> Style {
        if self.is_monochrome() {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.on_accent)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        }
    }
}
