use crate::{ConsoleBackend, ConsoleResource, ConsoleState};
use std::io::{self, BufRead, Write};

/// The console of the process we live in.
///
/// On Windows a process started without one (a GUI application, a service)
/// gets a fresh console from `AllocConsole`. Elsewhere the inherited standard
/// streams already are the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostConsole;

static HOST_CONSOLE: ConsoleResource<HostConsole> = ConsoleResource::new(HostConsole);

/// The process-wide console singleton.
#[must_use]
pub fn host_console() -> &'static ConsoleResource<HostConsole> {
    &HOST_CONSOLE
}

/// Classify the error code of a failed `AllocConsole`.
///
/// `ERROR_ACCESS_DENIED` means the process already owns a console, including
/// one without a window.
#[cfg(windows)]
fn refusal(code: u32) -> ConsoleState {
    use winapi::shared::winerror::ERROR_ACCESS_DENIED;

    if code == ERROR_ACCESS_DENIED {
        ConsoleState::AlreadyAttached
    } else {
        ConsoleState::Unavailable { code }
    }
}

impl ConsoleBackend for HostConsole {
    #[cfg(windows)]
    fn allocate(&self) -> ConsoleState {
        use winapi::um::consoleapi::AllocConsole;
        use winapi::um::errhandlingapi::GetLastError;

        // SAFETY: neither call has preconditions.
        unsafe {
            if AllocConsole() != 0 {
                ConsoleState::Allocated
            } else {
                refusal(GetLastError())
            }
        }
    }

    #[cfg(not(windows))]
    fn allocate(&self) -> ConsoleState {
        ConsoleState::AlreadyAttached
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        // std re-resolves the standard handles on each call, so this also works
        // for a console that was allocated after the stream was first touched.
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }

    fn read_line(&self, buf: &mut String) -> io::Result<usize> {
        io::stdin().lock().read_line(buf)
    }
}
