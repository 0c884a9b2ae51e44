//! # Payload Console Support
//!
//! The payload talks to a human operator through a text console that may not
//! exist yet when the loader starts our thread. This crate wraps the two
//! platform capabilities we consume (allocate a console, read a line) behind a
//! narrow trait and keeps the process-wide console as a once-only singleton.
//!
//! ## Core Components
//!
//! ### Console Backend ([`ConsoleBackend`])
//! * **Allocate**: attach or allocate a console for the process
//! * **Write**: print one line, flushed
//! * **Read**: block until one line of input arrives
//!
//! [`HostConsole`] implements it with `AllocConsole` and the standard streams
//! on Windows, and with the inherited standard streams elsewhere.
//!
//! ### Console Resource ([`ConsoleResource`])
//! Couples a backend with an [`AcquireOnce`] cell so that allocation happens
//! at most once per process, no matter how often the entry point runs:
//!
//! ```text
//! acquire() ──▶ AcquireOnce ──(first call)──▶ backend.allocate()
//!                    │                              │
//!                    └──(later calls)── cached ConsoleState
//! ```
//!
//! ### Debug Trace ([`debug_trace!`]) and Logger ([`DebugLogger`])
//! Diagnostics never go to the operator console. They are routed to
//! `OutputDebugStringA` on Windows and to stderr elsewhere, so the console only
//! ever shows the handshake marker.
//!
//! ## Usage Patterns
//!
//! ```rust,no_run
//! use log::LevelFilter;
//! use payload_console::{DebugLogger, host_console};
//!
//! let _ = DebugLogger::install(LevelFilter::Info);
//!
//! let console = host_console();
//! let state = console.acquire();
//! log::info!("console: {state:?}");
//! console.write_line("Hello").ok();
//! let mut line = String::new();
//! console.read_line(&mut line).ok();
//! ```

#![allow(unsafe_code)]

mod backend;
mod host;
mod logger;
mod once;
mod resource;

pub use backend::{ConsoleBackend, ConsoleState};
pub use host::{HostConsole, host_console};
pub use logger::DebugLogger;
pub use once::AcquireOnce;
pub use resource::ConsoleResource;

/// Upper bound for a single formatted trace message; longer messages are
/// emitted in several pieces.
pub const TRACE_CHUNK: usize = 512;

#[cfg(feature = "trace")]
#[doc(hidden)]
pub mod debug_fmt {
    use crate::TRACE_CHUNK;
    use core::fmt::{self, Write};

    /// Buffers formatted output and hands it to the platform debug channel.
    pub struct DebugSink {
        buf: [u8; TRACE_CHUNK],
        len: usize,
    }

    impl DebugSink {
        #[must_use]
        pub const fn new() -> Self {
            Self {
                buf: [0; TRACE_CHUNK],
                len: 0,
            }
        }

        /// Emit whatever is buffered.
        pub fn flush(&mut self) {
            if self.len > 0 {
                emit(&mut self.buf, self.len);
                self.len = 0;
            }
        }
    }

    impl Default for DebugSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Write for DebugSink {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            // Last byte is kept free for the NUL terminator on Windows.
            let capacity = TRACE_CHUNK - 1;
            for &b in s.as_bytes() {
                if self.len == capacity {
                    self.flush();
                }
                // Interior NULs would cut the message short.
                self.buf[self.len] = if b == 0 { b'?' } else { b };
                self.len += 1;
            }
            Ok(())
        }
    }

    impl Drop for DebugSink {
        fn drop(&mut self) {
            self.flush();
        }
    }

    #[cfg(windows)]
    fn emit(buf: &mut [u8; TRACE_CHUNK], len: usize) {
        use winapi::um::debugapi::OutputDebugStringA;
        buf[len] = 0;
        // SAFETY: NUL-terminated above, `len < TRACE_CHUNK`.
        unsafe { OutputDebugStringA(buf.as_ptr().cast()) }
    }

    #[cfg(not(windows))]
    fn emit(buf: &mut [u8; TRACE_CHUNK], len: usize) {
        use std::io::Write as _;
        // Best-effort; a closed stderr must not take the payload down.
        let _ = std::io::stderr().lock().write_all(&buf[..len]);
    }

    #[doc(hidden)]
    pub fn debug_write(args: fmt::Arguments) {
        let mut sink = DebugSink::new();
        // Ignore errors; this is best-effort debug output.
        let _ = fmt::write(&mut sink, args);
        sink.flush();
    }
}

#[cfg(not(feature = "trace"))]
#[doc(hidden)]
pub mod debug_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn debug_write(_: fmt::Arguments) {
        // no-op when feature disabled
    }
}

/// Formatted output to the platform debug channel, never to the operator console.
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {{
        $crate::debug_fmt::debug_write(core::format_args!($($arg)*));
    }};
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::debug_fmt::DebugSink;
    use core::fmt::Write;

    #[test]
    fn sink_accepts_messages_longer_than_a_chunk() {
        let mut sink = DebugSink::new();
        let long = "x".repeat(super::TRACE_CHUNK * 3);
        assert!(sink.write_str(&long).is_ok());
        sink.flush();
    }

    #[test]
    fn sink_accepts_interior_nul() {
        let mut sink = DebugSink::new();
        assert!(write!(sink, "a\0b").is_ok());
    }
}
