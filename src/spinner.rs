//! Busy indicator shown while a suggestion is being generated.

use crate::style::Theme;
use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;
use tracing::debug;

/// Spinner animation frames - braille pattern spinner
pub const SPINNER_BRAILLE: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Something that can show progress while the foreground flow waits.
pub trait BusyIndicator {
    fn start(&mut self);
    /// Advance one frame.
    fn tick(&mut self);
    /// Remove the indicator from the display.
    fn stop(&mut self);

    fn frame_duration(&self) -> Duration {
        FRAME_DURATION
    }
}

/// Animated braille spinner, drawn on stderr by default.
///
/// The cursor is hidden while the spinner runs and shown again on `stop`,
/// or on drop if the spinner is still running.
pub struct Spinner<W: Write = io::Stderr> {
    current_frame: usize,
    message: String,
    theme: Theme,
    output: W,
    running: bool,
}

impl Spinner {
    pub fn new(theme: Theme) -> Self {
        Self::with_output(io::stderr(), theme)
    }
}

impl<W: Write> Spinner<W> {
    pub fn with_output(output: W, theme: Theme) -> Self {
        Self {
            current_frame: 0,
            message: String::new(),
            theme,
            output,
            running: false,
        }
    }

    pub fn with_message(mut self, msg: &str) -> Self {
        self.message = msg.to_string();
        self
    }

    fn frame(&self) -> char {
        SPINNER_BRAILLE[self.current_frame % SPINNER_BRAILLE.len()]
    }

    fn render(&mut self) -> io::Result<()> {
        let line = format!(
            "  {} {}",
            self.theme.spinner(&self.frame().to_string()),
            self.theme.info(&self.message)
        );
        execute!(
            self.output,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.output.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        execute!(self.output, MoveToColumn(0), Clear(ClearType::CurrentLine), Show)
    }

    fn report(result: io::Result<()>) {
        if let Err(e) = result {
            debug!("Spinner draw failed: {}", e);
        }
    }
}

impl<W: Write> BusyIndicator for Spinner<W> {
    /// Hides the cursor and draws the first frame
    fn start(&mut self) {
        self.running = true;
        let hidden = execute!(self.output, Hide);
        Self::report(hidden.and_then(|_| self.render()));
    }

    fn tick(&mut self) {
        self.current_frame = (self.current_frame + 1) % SPINNER_BRAILLE.len();
        let drawn = self.render();
        Self::report(drawn);
    }

    /// Clears the line and shows the cursor again
    fn stop(&mut self) {
        self.running = false;
        let cleared = self.clear();
        Self::report(cleared);
    }
}

impl<W: Write> Drop for Spinner<W> {
    fn drop(&mut self) {
        if self.running {
            self.stop();
        }
    }
}

/// Indicator that draws nothing; used when stderr is not a terminal.
#[derive(Debug, Default)]
pub struct NoopIndicator;

impl BusyIndicator for NoopIndicator {
    fn start(&mut self) {}
    fn tick(&mut self) {}
    fn stop(&mut self) {}
}
