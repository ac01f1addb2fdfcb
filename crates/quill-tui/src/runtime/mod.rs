//! The interactive loop around the reducer.
//!
//! `update` decides and `render` draws; everything that touches the
//! terminal, the document file or the agent task happens here, and its
//! outcome comes back as a `UiEvent`.

mod handlers;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use quill_core::config::Config;
use quill_core::core::interrupt;
use quill_core::document::SharedDocument;
use tokio::sync::mpsc::error::TryRecvError;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Redraw cadence while a turn streams or the user is typing.
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Redraw cadence otherwise.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

pub struct TuiRuntime {
    terminal: terminal::Screen,
    pub state: AppState,
    next_tick: Instant,
    last_input: Instant,
}

impl TuiRuntime {
    /// Switches to the alternate screen and builds the initial state.
    ///
    /// # Errors
    /// The terminal could not be put into raw mode.
    pub fn new(
        config: Config,
        document: SharedDocument,
        document_path: PathBuf,
        extra_instructions: Option<String>,
    ) -> Result<Self> {
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("enter alternate screen")?;
        let now = Instant::now();
        Ok(Self {
            terminal,
            state: AppState::new(config, document, document_path, extra_instructions),
            next_tick: now,
            last_input: now,
        })
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    /// Terminal I/O failed.
    pub fn run(&mut self) -> Result<()> {
        terminal::enable_input_features()?;
        let outcome = self.run_until_quit();
        let _ = terminal::disable_input_features();
        outcome
    }

    fn run_until_quit(&mut self) -> Result<()> {
        let mut redraw = true;
        while !self.state.should_quit {
            // Ctrl+C outside a turn has nothing to cancel.
            if interrupt::is_interrupted() && !self.state.agent_state.is_running() {
                let effects = update::quit(&mut self.state);
                self.execute_effects(effects);
                return Ok(());
            }

            let area = self.terminal.size()?;
            self.dispatch_event(UiEvent::Frame {
                width: area.width,
                height: area.height,
            });

            for event in self.next_events()? {
                match event {
                    UiEvent::Terminal(_) => self.last_input = Instant::now(),
                    UiEvent::Tick => redraw = true,
                    _ => {}
                }
                self.dispatch_event(event);
            }

            if redraw {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                redraw = false;
            }
        }
        Ok(())
    }

    fn cadence(&self) -> Duration {
        let typing = self.last_input.elapsed() < IDLE_POLL_DURATION;
        if typing || self.state.agent_state.is_running() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        }
    }

    /// Agent events first, then any pending terminal input, then a `Tick`
    /// once the cadence has elapsed. Blocks on input only when the agent
    /// had nothing to say.
    fn next_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = self.drain_agent();

        let wait = if events.is_empty() {
            self.next_tick.saturating_duration_since(Instant::now())
        } else {
            Duration::ZERO
        };
        let mut timeout = wait;
        while event::poll(timeout)? {
            events.push(UiEvent::Terminal(event::read()?));
            timeout = Duration::ZERO;
        }

        let now = Instant::now();
        if now >= self.next_tick {
            events.push(UiEvent::Tick);
            self.next_tick = now + self.cadence();
        }
        Ok(events)
    }

    /// Everything the running turn has sent so far. The channel closing is
    /// reported once, as `AgentFinished`.
    fn drain_agent(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        let Some(rx) = self.state.agent_state.receiver_mut() else {
            return events;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(UiEvent::Agent((*event).clone())),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    events.push(UiEvent::AgentFinished);
                    break;
                }
            }
        }
        events
    }

    fn dispatch_event(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event);
        self.execute_effects(effects);
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            let feedback = match effect {
                UiEffect::Quit => {
                    self.state.should_quit = true;
                    None
                }
                UiEffect::StartAgentTurn => Some(handlers::spawn_agent_turn(&self.state)),
                UiEffect::InterruptAgent => {
                    handlers::interrupt_agent(&self.state);
                    None
                }
                UiEffect::SaveDocument { path } => Some(handlers::save_document(&self.state, path)),
                UiEffect::OpenDocument { path } => handlers::open_document(&path),
            };
            if let Some(event) = feedback {
                self.dispatch_event(event);
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
