//! Terminal colours for each kind of message.
//!
//! A [`Theme`] is built once from configuration and handed to every
//! component that prints, so nothing reads styling from global state.

use crossterm::style::{Color, Stylize};

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    error: Color,
    success: Color,
    info: Color,
    command: Color,
    spinner: Color,
    muted: Color,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self {
            enabled: color,
            error: Color::Rgb { r: 0xFF, g: 0x6B, b: 0x6B },
            success: Color::Rgb { r: 0x4E, g: 0xCD, b: 0xC4 },
            info: Color::Rgb { r: 0x45, g: 0xB7, b: 0xD1 },
            command: Color::Rgb { r: 0x96, g: 0xCE, b: 0xB4 },
            spinner: Color::Rgb { r: 0xFF, g: 0xD9, b: 0x3D },
            muted: Color::Rgb { r: 0xB4, g: 0xB4, b: 0xB4 },
        }
    }

    /// No escape sequences at all.
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, self.error, true)
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, self.success, true)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, self.info, false)
    }

    pub fn command(&self, text: &str) -> String {
        self.paint(text, self.command, true)
    }

    pub fn spinner(&self, text: &str) -> String {
        self.paint(text, self.spinner, false)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(text, self.muted, false)
    }

    /// Captured stderr of a child process.
    pub fn stderr(&self, text: &str) -> String {
        self.paint(text, self.error, false)
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let styled = text.with(color);
        if bold {
            styled.bold().to_string()
        } else {
            styled.to_string()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(true)
    }
}
