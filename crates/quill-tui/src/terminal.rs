//! Raw mode and the alternate screen.
//!
//! Whichever of Drop, the Ctrl+C hook or the panic hook runs first puts the
//! terminal back; later calls find nothing to undo.

use std::io::{self, Stdout, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{execute, queue};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub type Screen = Terminal<CrosstermBackend<Stdout>>;

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Enters raw mode and the alternate screen.
///
/// # Errors
/// The terminal refused raw mode or the escape sequences could not be written.
pub fn setup_terminal() -> Result<Screen> {
    enable_raw_mode().context("enable raw mode")?;
    ACTIVE.store(true, Ordering::SeqCst);

    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen).context("switch to alternate screen")?;
    Terminal::new(CrosstermBackend::new(out)).context("create ratatui terminal")
}

/// Bracketed paste, plus mouse capture for wheel scrolling and panel clicks.
///
/// # Errors
/// The escape sequences could not be written.
pub fn enable_input_features() -> Result<()> {
    execute!(io::stdout(), EnableMouseCapture, EnableBracketedPaste)
        .context("enable paste and mouse capture")
}

/// # Errors
/// The escape sequences could not be written.
pub fn disable_input_features() -> Result<()> {
    execute!(io::stdout(), DisableBracketedPaste, DisableMouseCapture)
        .context("disable paste and mouse capture")
}

/// Leaves the alternate screen and raw mode. Does nothing when the terminal
/// was never set up or has already been restored.
///
/// # Errors
/// The escape sequences could not be written or raw mode could not be left.
pub fn restore_terminal() -> Result<()> {
    if !ACTIVE.swap(false, Ordering::SeqCst) {
        return Ok(());
    }
    let mut out = io::stdout();
    // Input modes go first, while raw mode is still on.
    let _ = queue!(out, DisableBracketedPaste, DisableMouseCapture);
    queue!(out, LeaveAlternateScreen).context("leave alternate screen")?;
    out.flush().context("flush terminal")?;
    disable_raw_mode().context("disable raw mode")
}

/// Restores the terminal before the previous hook prints the panic.
pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}
