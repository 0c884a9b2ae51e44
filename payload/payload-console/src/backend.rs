use std::io;

/// Outcome of asking the platform for a console.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsoleState {
    /// A new console was created for this process.
    Allocated,
    /// The process already had a console; it is used as-is.
    AlreadyAttached,
    /// No console could be obtained. `code` is the raw OS error, if any.
    Unavailable { code: u32 },
}

impl ConsoleState {
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable { .. })
    }
}

/// The console capability the payload consumes.
///
/// Implementations are black boxes; their buffering and failure semantics are
/// their own. `allocate` is called at most once per [`ConsoleResource`](crate::ConsoleResource).
pub trait ConsoleBackend {
    /// Attach or allocate a console for the current process.
    fn allocate(&self) -> ConsoleState;

    /// Print `line` followed by a newline and flush.
    ///
    /// # Errors
    /// Any error of the underlying output stream.
    fn write_line(&self, line: &str) -> io::Result<()>;

    /// Block until one line of input is available and append it to `buf`.
    ///
    /// Returns the number of bytes read; `0` means the input is closed.
    ///
    /// # Errors
    /// Any error of the underlying input stream.
    fn read_line(&self, buf: &mut String) -> io::Result<usize>;
}

impl<B: ConsoleBackend + ?Sized> ConsoleBackend for &B {
    fn allocate(&self) -> ConsoleState {
        (**self).allocate()
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn read_line(&self, buf: &mut String) -> io::Result<usize> {
        (**self).read_line(buf)
    }
}
