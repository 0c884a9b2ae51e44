//! # Handshake Configuration

use log::LevelFilter;
use payload_abi::{EntryParams, ExitStatus, ParameterBlock};

/// Marker printed when the loader hands over control.
pub const DEFAULT_MARKER: &str = "Hello from Rust!";

/// What to do if the platform refuses to give us a console.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsoleFailurePolicy {
    /// Print and wait anyway; the platform calls may silently no-op.
    Proceed,
    /// Skip the gate and return [`ExitStatus::CONSOLE_UNAVAILABLE`].
    Abort,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntryConfig<'a> {
    pub marker: &'a str,
    pub exit_status: ExitStatus,
    pub on_console_failure: ConsoleFailurePolicy,
    pub log_level: LevelFilter,
}

impl EntryConfig<'static> {
    pub const DEFAULT: Self = Self {
        marker: DEFAULT_MARKER,
        exit_status: ExitStatus::HANDSHAKE_COMPLETE,
        on_console_failure: ConsoleFailurePolicy::Proceed,
        log_level: if cfg!(feature = "verbose") {
            LevelFilter::Trace
        } else {
            LevelFilter::Info
        },
    };
}

impl Default for EntryConfig<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'a> EntryConfig<'a> {
    /// Apply the overrides a loader put into the parameter block.
    #[must_use]
    pub fn with_params<'p>(self, params: &EntryParams<'p>) -> EntryConfig<'p>
    where
        'a: 'p,
    {
        EntryConfig {
            marker: params.marker.unwrap_or(self.marker),
            exit_status: params.exit_status.unwrap_or(self.exit_status),
            on_console_failure: if params.abort_without_console {
                ConsoleFailurePolicy::Abort
            } else {
                self.on_console_failure
            },
            log_level: self.log_level,
        }
    }

    /// Defaults, overridden by the parameter block if it carries valid params.
    ///
    /// A malformed block is logged and treated as absent.
    #[must_use]
    pub fn resolve(block: ParameterBlock<'a>) -> Self {
        let defaults = EntryConfig::DEFAULT;
        if block.is_absent() {
            log::debug!("no parameter block");
            return defaults;
        }

        match EntryParams::parse(block) {
            Ok(Some(params)) => {
                log::debug!("parameter block overrides: {params:?}");
                defaults.with_params(&params)
            }
            Ok(None) => {
                log::debug!("untagged parameter block of {} bytes, ignored", block.len());
                defaults
            }
            Err(e) => {
                log::warn!("ignoring malformed parameter block: {e}");
                defaults
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(params: &EntryParams<'_>) -> Vec<u8> {
        let mut buf = vec![0u8; params.encoded_len()];
        params.encode_into(&mut buf).unwrap();
        buf
    }

    #[test]
    fn defaults() {
        let config = EntryConfig::default();
        assert_eq!(config.marker, DEFAULT_MARKER);
        assert_eq!(config.exit_status.code(), 42);
        assert_eq!(config.on_console_failure, ConsoleFailurePolicy::Proceed);
    }

    #[test]
    fn absent_block_resolves_to_defaults() {
        assert_eq!(EntryConfig::resolve(ParameterBlock::absent()), EntryConfig::DEFAULT);
    }

    #[test]
    fn overrides_apply() {
        let blob = encode(&EntryParams {
            exit_status: Some(ExitStatus::new(0)),
            marker: Some("payload up"),
            abort_without_console: true,
        });
        let config = EntryConfig::resolve(ParameterBlock::from_bytes(&blob));
        assert_eq!(config.marker, "payload up");
        assert_eq!(config.exit_status, ExitStatus::new(0));
        assert_eq!(config.on_console_failure, ConsoleFailurePolicy::Abort);
    }

    #[test]
    fn partial_overrides_keep_defaults() {
        let blob = encode(&EntryParams {
            marker: Some("only the marker"),
            ..EntryParams::default()
        });
        let config = EntryConfig::resolve(ParameterBlock::from_bytes(&blob));
        assert_eq!(config.marker, "only the marker");
        assert_eq!(config.exit_status, ExitStatus::HANDSHAKE_COMPLETE);
        assert_eq!(config.on_console_failure, ConsoleFailurePolicy::Proceed);
    }

    #[test]
    fn malformed_block_resolves_to_defaults() {
        let mut blob = encode(&EntryParams {
            exit_status: Some(ExitStatus::new(1)),
            ..EntryParams::default()
        });
        blob.truncate(12);
        assert_eq!(
            EntryConfig::resolve(ParameterBlock::from_bytes(&blob)),
            EntryConfig::DEFAULT
        );
    }

    #[test]
    fn untagged_block_resolves_to_defaults() {
        let blob = [0xAAu8; 64];
        assert_eq!(
            EntryConfig::resolve(ParameterBlock::from_bytes(&blob)),
            EntryConfig::DEFAULT
        );
    }
}
