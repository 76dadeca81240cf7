mod app;
mod colors;
mod widgets;

pub use app::{App, UiError};
pub use colors::{ColorLevel, Theme, ThemeMode, ThemeSettings};
