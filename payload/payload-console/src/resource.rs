use crate::{AcquireOnce, ConsoleBackend, ConsoleState};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::io;

/// The process-wide console: a backend plus the console it handed out.
///
/// Only a successful allocation is remembered. After a refusal the next
/// [`acquire`](ConsoleResource::acquire) asks the backend again. The console
/// is never torn down; process exit reclaims it.
pub struct ConsoleResource<B> {
    backend: B,
    state: AcquireOnce<ConsoleState>,
    allocations: AtomicUsize,
}

impl<B> ConsoleResource<B> {
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            state: AcquireOnce::new(),
            allocations: AtomicUsize::new(0),
        }
    }

    /// The console state, if [`acquire`](Self::acquire) obtained one already.
    #[must_use]
    pub fn state(&self) -> Option<ConsoleState> {
        self.state.get().copied()
    }

    /// How many times the backend was asked to allocate.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Acquire)
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ConsoleBackend> ConsoleResource<B> {
    /// Make sure the process has a console. Idempotent once it succeeded.
    pub fn acquire(&self) -> ConsoleState {
        let acquired = self.state.get_or_try_init(|| {
            self.allocations.fetch_add(1, Ordering::AcqRel);
            let state = self.backend.allocate();
            log::debug!("console allocation: {state:?}");
            if state.is_available() {
                Ok(state)
            } else {
                Err(state)
            }
        });

        match acquired {
            Ok(state) => *state,
            Err(refused) => refused,
        }
    }

    /// # Errors
    /// Errors of the backend's output stream.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.backend.write_line(line)
    }

    /// # Errors
    /// Errors of the backend's input stream.
    pub fn read_line(&self, buf: &mut String) -> io::Result<usize> {
        self.backend.read_line(buf)
    }
}
