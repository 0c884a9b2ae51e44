//! # Operator Handshake
//!
//! ```text
//! Uninitialized ──acquire_console──▶ ConsoleAcquired ──announce──▶ AwaitingInput
//!       │                                                              │
//!       └──(no console, Abort policy)──▶ Completed ◀──await_operator───┘
//! ```
//!
//! `await_operator` is the only suspension point: it blocks the loader's
//! thread until a line arrives, without timeout or cancellation.

use crate::config::{ConsoleFailurePolicy, EntryConfig};
use payload_abi::ExitStatus;
use payload_console::{ConsoleBackend, ConsoleResource, ConsoleState};
use std::io;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    ConsoleAcquired,
    AwaitingInput,
    Completed,
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("no console available (os error {code})")]
    ConsoleUnavailable { code: u32 },
    #[error("failed to write the marker: {0}")]
    Marker(#[source] io::Error),
    #[error("failed to read the operator's line: {0}")]
    Input(#[source] io::Error),
    #[error("console input is closed")]
    InputClosed,
}

pub struct Handshake<'c, 'p, B> {
    console: &'c ConsoleResource<B>,
    config: EntryConfig<'p>,
    phase: Phase,
}

impl<'c, 'p, B: ConsoleBackend> Handshake<'c, 'p, B> {
    #[must_use]
    pub const fn new(console: &'c ConsoleResource<B>, config: EntryConfig<'p>) -> Self {
        Self {
            console,
            config,
            phase: Phase::Uninitialized,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Make sure the process has a console. Once the platform granted one it
    /// is not asked again.
    ///
    /// # Errors
    /// [`HandshakeError::ConsoleUnavailable`] if the platform refused. The phase
    /// still advances; the failure policy is applied by [`run`](Self::run).
    pub fn acquire_console(&mut self) -> Result<ConsoleState, HandshakeError> {
        debug_assert_eq!(self.phase, Phase::Uninitialized);
        let state = self.console.acquire();
        self.phase = Phase::ConsoleAcquired;
        match state {
            ConsoleState::Unavailable { code } => Err(HandshakeError::ConsoleUnavailable { code }),
            state => Ok(state),
        }
    }

    /// Print the marker. The gate is entered even if printing failed.
    ///
    /// # Errors
    /// [`HandshakeError::Marker`] if the console rejected the write.
    pub fn announce(&mut self) -> Result<(), HandshakeError> {
        debug_assert_eq!(self.phase, Phase::ConsoleAcquired);
        let written = self.console.write_line(self.config.marker);
        self.phase = Phase::AwaitingInput;
        written.map_err(HandshakeError::Marker)
    }

    /// Block until the operator enters a line. Its content is discarded.
    ///
    /// # Errors
    /// [`HandshakeError::InputClosed`] at end of input and
    /// [`HandshakeError::Input`] on a read error; both end the wait.
    pub fn await_operator(&mut self) -> Result<(), HandshakeError> {
        debug_assert_eq!(self.phase, Phase::AwaitingInput);
        let mut line = String::new();
        let read = self.console.read_line(&mut line);
        self.phase = Phase::Completed;
        match read {
            Ok(0) => Err(HandshakeError::InputClosed),
            Ok(n) => {
                log::trace!("operator line of {n} bytes");
                Ok(())
            }
            Err(e) => Err(HandshakeError::Input(e)),
        }
    }

    /// Walk all phases and produce the status for the loader.
    ///
    /// Failures along the way are logged, never returned.
    pub fn run(mut self) -> ExitStatus {
        match self.acquire_console() {
            Ok(state) => log::debug!("console ready: {state:?}"),
            Err(e) => match self.config.on_console_failure {
                ConsoleFailurePolicy::Abort => {
                    log::warn!("{e}; giving up");
                    return ExitStatus::CONSOLE_UNAVAILABLE;
                }
                ConsoleFailurePolicy::Proceed => log::warn!("{e}; continuing"),
            },
        }

        if let Err(e) = self.announce() {
            log::warn!("{e}");
        }

        match self.await_operator() {
            Ok(()) => log::info!("operator confirmed the handshake"),
            Err(e) => log::warn!("{e}"),
        }

        self.config.exit_status
    }
}
