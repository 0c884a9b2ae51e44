//! # Payload Entry Point

use core::ffi::c_void;

/// Payload entry function pointer.
///
/// # ABI
/// The ABI is `system` so that the symbol can be used directly as a thread
/// start routine by a loader in another process. The first argument is the
/// parameter block address (may be null), the second its size in bytes.
pub type PayloadEntryFn = unsafe extern "system" fn(*const c_void, i32) -> i32;

/// Name of the exported entry symbol, NUL-terminated for `GetProcAddress`/`dlsym`.
pub const ENTRY_SYMBOL: &[u8] = b"payload_main\0";

/// Status code handed back to the loader as the thread's exit code.
///
/// The value carries no structure on the payload side; its meaning is a
/// convention between payload and loader.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExitStatus(i32);

impl ExitStatus {
    /// The operator confirmed the handshake.
    pub const HANDSHAKE_COMPLETE: Self = Self(42);

    /// No console could be obtained and the payload was told to give up.
    pub const CONSOLE_UNAVAILABLE: Self = Self(-1);

    /// The payload panicked; the panic was stopped at the entry point.
    pub const PANICKED: Self = Self(-2);

    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::HANDSHAKE_COMPLETE
    }
}

impl From<ExitStatus> for i32 {
    fn from(status: ExitStatus) -> Self {
        status.code()
    }
}

impl From<i32> for ExitStatus {
    fn from(code: i32) -> Self {
        Self::new(code)
    }
}

impl core::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The loader sees the exit code through a 32-bit query; keep the ABI honest.
const _: () = assert!(size_of::<ExitStatus>() == size_of::<i32>());
