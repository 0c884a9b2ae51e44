use crate::{AcquireOnce, debug_trace};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct DebugLogger {
    max_level: LevelFilter,
}

impl DebugLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Install the process-wide logger.
    ///
    /// Only the first call has an effect; the entry point may run more than
    /// once per process and simply ignores the error on later calls.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a logger is already installed.
    pub fn install(max_level: LevelFilter) -> Result<&'static Self, SetLoggerError> {
        static LOGGER: AcquireOnce<DebugLogger> = AcquireOnce::new();

        let logger = LOGGER.get_or_init(|| Self::new(max_level));
        log::set_logger(logger)?;
        log::set_max_level(logger.max_level);
        Ok(logger)
    }
}

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        debug_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // every record is emitted as it is formatted
    }
}
