use std::io::IsTerminal;

/// Geometry used when stdout is not a real interactive terminal.
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 30;

/// Local terminal window geometry, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
}

impl WindowSize {
    /// Read the current window size, falling back to 80x30 when stdout is
    /// not a tty (or the size query fails).
    pub fn current() -> Self {
        if std::io::stdout().is_terminal() {
            if let Ok((cols, rows)) = crossterm::terminal::size() {
                return Self { cols, rows };
            }
        }
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}
