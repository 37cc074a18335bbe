//! Modal menu that asks the user what to do with a suggestion.
//!
//! [`MenuState`] is the pure cursor state machine. Two front ends drive it:
//! [`InteractiveMenu`] reads arrow keys in raw mode when stdin is a terminal,
//! and [`LineMenu`] reads a numbered choice per line otherwise.

use crate::style::Theme;
use crate::suggestion::Suggestion;
use anyhow::Result;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    terminal::{self, Clear, ClearType},
};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Something the user can do from a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    Copy,
    Retry,
    Exit,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Run => "Run command",
            Action::Copy => "Copy to clipboard",
            Action::Retry => "Suggest new command",
            Action::Exit => "Exit",
        }
    }
}

/// Actions offered for a fresh suggestion.
pub const SUGGESTION_ACTIONS: [Action; 3] = [Action::Run, Action::Copy, Action::Exit];

/// Actions offered after the command failed.
pub const RETRY_ACTIONS: [Action; 2] = [Action::Retry, Action::Exit];

/// A user input the menu understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    Up,
    Down,
    Confirm,
    Quit,
}

/// Cursor over a fixed list of actions.
///
/// The cursor is always a valid index, and the menu resolves at most once:
/// keys applied after resolution are ignored.
#[derive(Debug, Clone)]
pub struct MenuState {
    options: Vec<Action>,
    cursor: usize,
    resolved: Option<Action>,
}

impl MenuState {
    /// An empty option list resolves straight to [`Action::Exit`].
    pub fn new(options: &[Action]) -> Self {
        Self {
            options: options.to_vec(),
            cursor: 0,
            resolved: options.is_empty().then_some(Action::Exit),
        }
    }

    pub fn options(&self) -> &[Action] {
        &self.options
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn resolved(&self) -> Option<Action> {
        self.resolved
    }

    /// Applies one key and returns the resolution, if the menu is resolved.
    pub fn apply(&mut self, key: MenuKey) -> Option<Action> {
        if self.resolved.is_some() {
            return self.resolved;
        }

        match key {
            MenuKey::Up => self.cursor = self.cursor.saturating_sub(1),
            MenuKey::Down => self.cursor = (self.cursor + 1).min(self.options.len() - 1),
            MenuKey::Confirm => self.resolved = Some(self.options[self.cursor]),
            MenuKey::Quit => self.resolved = Some(Action::Exit),
        }

        self.resolved
    }
}

/// Presents a suggestion with a set of actions and returns the chosen one.
pub trait ChoicePrompt {
    fn present(&mut self, suggestion: &Suggestion, options: &[Action]) -> Result<Action>;
}

/// Source of menu keys.
pub trait KeySource {
    /// Blocks for the next key press. `Ok(None)` means a key the menu
    /// ignores.
    fn next_key(&mut self) -> Result<Option<MenuKey>>;
}

/// Reads key presses from the terminal via crossterm.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> Result<Option<MenuKey>> {
        match event::read()? {
            Event::Key(key) => Ok(map_key_event(key)),
            _ => Ok(None),
        }
    }
}

/// Maps a crossterm key event to a menu key.
pub fn map_key_event(key: KeyEvent) -> Option<MenuKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(MenuKey::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(MenuKey::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(MenuKey::Down),
        KeyCode::Enter | KeyCode::Char(' ') => Some(MenuKey::Confirm),
        KeyCode::Esc | KeyCode::Char('q') => Some(MenuKey::Quit),
        _ => None,
    }
}

// =============================================================================
// Arrow-key menu
// =============================================================================

/// Restores cooked mode when dropped, including on early return.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Arrow-key menu for interactive terminals.
pub struct InteractiveMenu<K: KeySource> {
    keys: K,
    theme: Theme,
}

impl InteractiveMenu<TerminalKeys> {
    pub fn new(theme: Theme) -> Self {
        Self::with_keys(TerminalKeys, theme)
    }
}

impl<K: KeySource> InteractiveMenu<K> {
    pub fn with_keys(keys: K, theme: Theme) -> Self {
        Self { keys, theme }
    }

    /// Drives the menu with injected output (testable core of `present`).
    pub fn present_with_io<W: Write>(
        &mut self,
        suggestion: &Suggestion,
        options: &[Action],
        output: &mut W,
    ) -> Result<Action> {
        let mut state = MenuState::new(options);
        if let Some(action) = state.resolved() {
            return Ok(action);
        }

        let mut drawn = render_options(&state, &self.theme, output)?;

        let action = loop {
            let Some(key) = self.keys.next_key()? else {
                continue;
            };
            debug!("Menu key {:?} for `{}`", key, suggestion.command);

            if let Some(action) = state.apply(key) {
                break action;
            }

            queue!(output, MoveUp(drawn as u16), MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
            drawn = render_options(&state, &self.theme, output)?;
        };

        write!(output, "\r\n")?;
        output.flush()?;
        info!("User chose '{}'", action.label());
        Ok(action)
    }
}

impl<K: KeySource> ChoicePrompt for InteractiveMenu<K> {
    fn present(&mut self, suggestion: &Suggestion, options: &[Action]) -> Result<Action> {
        let mut output = io::stdout();
        let _raw = RawModeGuard::enable()?;
        self.present_with_io(suggestion, options, &mut output)
    }
}

/// Draws the option list and hint line. Returns the number of lines below
/// the first one, which is how far to move up before redrawing.
fn render_options<W: Write>(state: &MenuState, theme: &Theme, output: &mut W) -> Result<usize> {
    for (i, action) in state.options().iter().enumerate() {
        if i == state.cursor() {
            write!(output, "{}\r\n", theme.command(&format!("> {}", action.label())))?;
        } else {
            write!(output, "  {}\r\n", action.label())?;
        }
    }
    write!(
        output,
        "{}",
        theme.muted("(↑/↓ to move, Enter to select, q to quit)")
    )?;
    output.flush()?;
    Ok(state.options().len())
}

// =============================================================================
// Line-based menu
// =============================================================================

/// Numbered menu for non-interactive input (pipes, scripts).
pub struct LineMenu<R: BufRead, W: Write> {
    input: R,
    output: W,
    theme: Theme,
}

impl<R: BufRead, W: Write> LineMenu<R, W> {
    pub fn new(input: R, output: W, theme: Theme) -> Self {
        Self { input, output, theme }
    }

    fn display_options(&mut self, options: &[Action]) -> Result<()> {
        writeln!(self.output)?;
        for (i, action) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, action.label())?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> ChoicePrompt for LineMenu<R, W> {
    fn present(&mut self, suggestion: &Suggestion, options: &[Action]) -> Result<Action> {
        let mut state = MenuState::new(options);
        if let Some(action) = state.resolved() {
            return Ok(action);
        }

        self.display_options(options)?;
        let numbers: Vec<String> = (1..=options.len()).map(|n| n.to_string()).collect();

        loop {
            write!(self.output, "\n{}", self.theme.info(&format!("Choose an option ({}): ", numbers.join("/"))))?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // End of input behaves like the quit key
                writeln!(self.output)?;
                return Ok(state.apply(MenuKey::Quit).unwrap_or(Action::Exit));
            }

            let choice = line.trim();
            if choice.eq_ignore_ascii_case("q") {
                return Ok(state.apply(MenuKey::Quit).unwrap_or(Action::Exit));
            }

            match choice.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => {
                    for _ in 1..n {
                        state.apply(MenuKey::Down);
                    }
                    if let Some(action) = state.apply(MenuKey::Confirm) {
                        info!("User chose '{}' for `{}`", action.label(), suggestion.command);
                        return Ok(action);
                    }
                }
                _ => {
                    writeln!(
                        self.output,
                        "Invalid choice. Please enter {}.",
                        numbers.join(", ")
                    )?;
                }
            }
        }
    }
}
