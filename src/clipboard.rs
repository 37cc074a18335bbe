//! Clipboard access.
//!
//! Two backends sit behind [`ClipboardWriter`]: the operating system
//! clipboard via arboard, and OSC 52 escape sequences that ask the terminal
//! to set its clipboard. [`AutoClipboard`] combines them.
//!
//! On X11 and Wayland the arboard selection is served by this process and
//! disappears when it exits. `suggest` exits right after copying, so there
//! the auto backend also sends the text over OSC 52.

use crate::config::ClipboardBackend;
use crate::error::ClipboardError;
use arboard::Clipboard;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::{self, Write};
use tracing::{debug, warn};

/// A place the suggested command can be copied to.
pub trait ClipboardWriter {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The operating system clipboard.
#[derive(Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// Terminal clipboard through an OSC 52 escape sequence.
pub struct Osc52Clipboard<W: Write = io::Stdout> {
    output: W,
}

impl Osc52Clipboard {
    pub fn stdout() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn with_output(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> ClipboardWriter for Osc52Clipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.output
            .write_all(encode_osc52(text).as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

pub fn encode_osc52(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Whether a system clipboard write survives this process exiting.
pub fn system_selection_outlives_process() -> bool {
    !cfg!(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))
}

/// System clipboard first, OSC 52 when the system clipboard is unavailable
/// or its copy would vanish on exit.
pub struct AutoClipboard {
    system: Box<dyn ClipboardWriter>,
    terminal: Box<dyn ClipboardWriter>,
    system_persists: bool,
}

impl AutoClipboard {
    pub fn new() -> Self {
        Self::with_backends(
            Box::new(SystemClipboard),
            Box::new(Osc52Clipboard::stdout()),
            system_selection_outlives_process(),
        )
    }

    pub fn with_backends(
        system: Box<dyn ClipboardWriter>,
        terminal: Box<dyn ClipboardWriter>,
        system_persists: bool,
    ) -> Self {
        Self {
            system,
            terminal,
            system_persists,
        }
    }
}

impl Default for AutoClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardWriter for AutoClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        match self.system.write_text(text) {
            Ok(()) if self.system_persists => Ok(()),
            Ok(()) => {
                debug!("System selection ends with the process, also sending OSC 52");
                self.terminal.write_text(text)
            }
            Err(e) => {
                warn!("System clipboard failed ({}), falling back to OSC 52", e);
                self.terminal.write_text(text)
            }
        }
    }
}

/// Builds the writer for the configured backend.
pub fn from_backend(backend: ClipboardBackend) -> Box<dyn ClipboardWriter> {
    match backend {
        ClipboardBackend::System => Box::new(SystemClipboard),
        ClipboardBackend::Osc52 => Box::new(Osc52Clipboard::stdout()),
        ClipboardBackend::Auto => Box::new(AutoClipboard::new()),
    }
}
