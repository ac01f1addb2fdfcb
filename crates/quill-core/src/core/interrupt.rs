//! Ctrl+C handling.
//!
//! The first Ctrl+C raises a process-wide flag that the running turn
//! observes. A second one while the flag is still raised exits with
//! status 130 after running the registered terminal restore hook.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Notify;

static RAISED: AtomicBool = AtomicBool::new(false);
static WAKER: OnceLock<Notify> = OnceLock::new();
static RESTORE_TERMINAL: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

/// Returned by a turn that was cancelled.
#[derive(Debug)]
pub struct InterruptedError;

impl fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

fn waker() -> &'static Notify {
    WAKER.get_or_init(Notify::new)
}

/// Routes the process Ctrl+C signal to `trigger_ctrl_c`.
///
/// # Errors
/// A handler is already installed.
pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger_ctrl_c).context("Failed to set Ctrl+C handler")
}

/// What a Ctrl+C press does. The TUI calls it directly for key presses.
pub fn trigger_ctrl_c() {
    let already_raised = RAISED.swap(true, Ordering::SeqCst);
    if !already_raised {
        waker().notify_waiters();
        return;
    }
    if let Some(restore) = RESTORE_TERMINAL.get() {
        restore();
    }
    std::process::exit(130);
}

pub fn is_interrupted() -> bool {
    RAISED.load(Ordering::SeqCst)
}

/// Resolves once the flag is raised; immediately if it already is.
pub async fn wait_for_interrupt() {
    while !is_interrupted() {
        let notified = waker().notified();
        tokio::pin!(notified);
        // Register before re-checking so a raise in between is not missed.
        notified.as_mut().enable();
        if is_interrupted() {
            break;
        }
        notified.await;
    }
}

/// Lowers the flag once the interruption has been handled.
pub fn reset() {
    RAISED.store(false, Ordering::SeqCst);
}

/// Installs the hook run before a forced exit. Only the first call counts.
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_TERMINAL.set(Box::new(hook));
}
