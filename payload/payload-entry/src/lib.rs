//! # Injected Payload Entry Point
//!
//! This library is built as a `cdylib` whose single interesting export,
//! [`payload_main`], is started by an external loader on a thread of its own.
//! The loader has mapped our code and data but has not necessarily run any
//! runtime bootstrap; the entry point therefore relies on nothing but the
//! console capability and the logger it installs itself.
//!
//! ## Handoff Sequence
//!
//! ```text
//! loader thread ──▶ payload_main(address, size)
//!                     │ install DebugLogger (first call only)
//!                     │ ParameterBlock::from_raw(address, size)
//!                     │ EntryConfig::resolve(block)
//!                     │ Handshake::run
//!                     │   ├─ acquire console (kept once granted)
//!                     │   ├─ print marker
//!                     │   └─ wait for one line
//!                     ▼
//!                  exit code ──▶ loader (thread exit code query)
//! ```
//!
//! Panics are stopped at the export and reported as
//! [`ExitStatus::PANICKED`]; they never unwind into the loader's thread start
//! routine.
//!
//! ## Features
//! * `trace` (default): diagnostics to the platform debug channel
//! * `verbose`: log at `Trace` instead of `Info`

#![allow(unsafe_code)]

pub mod config;
pub mod handshake;

pub use config::{ConsoleFailurePolicy, DEFAULT_MARKER, EntryConfig};
pub use handshake::{Handshake, HandshakeError, Phase};

use core::ffi::c_void;
use payload_abi::{ExitStatus, ParameterBlock, PayloadEntryFn};
use payload_console::{ConsoleBackend, ConsoleResource, DebugLogger, host_console};
use std::panic::{self, AssertUnwindSafe};

/// Run the whole entry contract against `console`.
///
/// This is what [`payload_main`] does with the process console; tests use it
/// with scripted backends.
#[must_use]
pub fn invoke<B: ConsoleBackend>(
    console: &ConsoleResource<B>,
    block: ParameterBlock<'_>,
) -> ExitStatus {
    let config = EntryConfig::resolve(block);
    Handshake::new(console, config).run()
}

/// Run `f`, turning a panic into [`ExitStatus::PANICKED`].
#[must_use]
pub fn guarded(f: impl FnOnce() -> ExitStatus) -> ExitStatus {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::error!("payload panicked; reporting {}", ExitStatus::PANICKED);
        ExitStatus::PANICKED
    })
}

/// The entry symbol the loader starts a thread on.
///
/// # Safety
/// If `address` is non-null and `size` positive, `size` bytes at `address`
/// must stay readable until this function returns.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn payload_main(address: *const c_void, size: i32) -> i32 {
    // Only the first call per process installs the logger.
    let _ = DebugLogger::install(EntryConfig::DEFAULT.log_level);
    log::info!("entered with parameter block at {address:p}, {size} bytes");

    // SAFETY: forwarded from our caller.
    let block = unsafe { ParameterBlock::from_raw(address, size) };
    let status = guarded(|| invoke(host_console(), block));

    log::info!("returning {status}");
    status.code()
}

// The export must match the contract the loader was written against.
const _: PayloadEntryFn = payload_main;

#[cfg(windows)]
mod dll {
    use winapi::shared::minwindef::{BOOL, DWORD, HINSTANCE, LPVOID, TRUE};
    use winapi::um::libloaderapi::DisableThreadLibraryCalls;
    use winapi::um::winnt::DLL_PROCESS_ATTACH;

    /// Runs under the loader lock; do nothing beyond opting out of thread
    /// notifications. All real work happens in [`payload_main`](crate::payload_main).
    #[unsafe(no_mangle)]
    #[allow(non_snake_case)]
    pub extern "system" fn DllMain(module: HINSTANCE, reason: DWORD, _reserved: LPVOID) -> BOOL {
        if reason == DLL_PROCESS_ATTACH {
            // SAFETY: `module` is the handle the OS passed for this image.
            unsafe { DisableThreadLibraryCalls(module) };
        }
        TRUE
    }
}
