use crossterm::terminal;
use std::io::{self, Write};

pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J";
pub const CURSOR_HOME: &[u8] = b"\x1b[H";
pub const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
pub const SHOW_CURSOR: &[u8] = b"\x1b[?25h";
pub const RESET_COLORS: &[u8] = b"\x1b[0m";

pub const FALLBACK_CELLS: (u32, u32) = (80, 24);
pub const FALLBACK_PIXELS: (u32, u32) = (1920, 1080);

/// Character columns and rows of the attached terminal.
#[must_use]
pub fn cell_size() -> (u32, u32) {
    match terminal::size() {
        Ok((cols, rows)) if cols > 0 && rows > 0 => (u32::from(cols), u32::from(rows)),
        _ => FALLBACK_CELLS,
    }
}

/// Pixel dimensions of the terminal window, when the driver reports them.
#[must_use]
pub fn pixel_size() -> (u32, u32) {
    match terminal::window_size() {
        Ok(size) if size.width > 0 && size.height > 0 => {
            (u32::from(size.width), u32::from(size.height))
        }
        _ => FALLBACK_PIXELS,
    }
}

/// Restores cursor visibility and colors when dropped, so every exit path
/// (including panics inside a playback job) leaves the terminal usable.
/// Creation writes nothing; the playback writer owns the hide sequence.
pub struct CursorGuard {
    restored: bool,
}

impl CursorGuard {
    #[must_use]
    pub fn armed() -> Self {
        Self { restored: false }
    }

    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        let mut stdout = io::stdout();
        let _ = stdout.write_all(SHOW_CURSOR);
        let _ = stdout.write_all(RESET_COLORS);
        let _ = stdout.flush();
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
