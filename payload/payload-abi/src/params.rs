//! # Entry Parameters
//!
//! Optional, tagged header a loader can place at the start of the parameter
//! block to configure the handshake. All fields are little-endian and read
//! field by field; nothing relies on the target's layout or alignment.
//!
//! ```text
//! offset  size  field
//!      0     8  magic            "HSPARAMS"
//!      8     4  version          PARAMS_VERSION
//!     12     4  flags            ParamFlags
//!     16     4  exit status      i32, used if flags.exit_status
//!     20     4  marker length    u32, bytes
//!     24     n  marker           UTF-8, used if flags.marker
//! ```

use crate::block::ParameterBlock;
use crate::entry::ExitStatus;
use bitfield_struct::bitfield;

/// Magic signature identifying a parameter block the payload understands.
///
/// The ASCII bytes spell `"HSPARAMS"` (handshake parameters) in memory order.
pub const PARAMS_MAGIC: u64 = u64::from_le_bytes(*b"HSPARAMS");

/// Current wire format version.
pub const PARAMS_VERSION: u32 = 1;

/// Size of the fixed header preceding the marker bytes.
pub const HEADER_LEN: usize = 24;

const MAGIC_OFF: usize = 0;
const VERSION_OFF: usize = 8;
const FLAGS_OFF: usize = 12;
const STATUS_OFF: usize = 16;
const MARKER_LEN_OFF: usize = 20;

/// Which header fields carry overrides.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ParamFlags {
    /// Bit 0 — the exit status field replaces the default status.
    pub exit_status: bool,

    /// Bit 1 — the marker bytes replace the default marker.
    pub marker: bool,

    /// Bit 2 — return immediately if no console can be obtained.
    pub abort_without_console: bool,

    /// Bits 3–31 — Reserved (must be 0).
    #[bits(29)]
    __: u32,
}

impl ParamFlags {
    /// Mask of all defined bits.
    pub const KNOWN: u32 = 0b111;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("parameter block of {len} bytes is shorter than the 24 byte header")]
    Truncated { len: usize },
    #[error("unsupported parameter block version {0}")]
    UnsupportedVersion(u32),
    #[error("reserved flag bits set in {0:#010x}")]
    ReservedFlags(u32),
    #[error("marker of {len} bytes exceeds the {available} bytes after the header")]
    MarkerOutOfBounds { len: usize, available: usize },
    #[error("marker is not valid UTF-8")]
    MarkerNotUtf8,
    #[error("{needed} encoded bytes do not fit into a buffer of {available} bytes")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("encoded parameter block does not fit the 32-bit size argument")]
    TooLarge,
}

/// Decoded overrides. Every field left at its default means "no override".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct EntryParams<'a> {
    pub exit_status: Option<ExitStatus>,
    pub marker: Option<&'a str>,
    pub abort_without_console: bool,
}

#[inline]
fn read_array<const N: usize>(buf: &[u8], off: usize) -> Option<[u8; N]> {
    let end = off.checked_add(N)?;
    buf.get(off..end)?.try_into().ok()
}

#[inline]
fn read_u32_le(buf: &[u8], off: usize) -> Option<u32> {
    read_array(buf, off).map(u32::from_le_bytes)
}

#[inline]
fn read_u64_le(buf: &[u8], off: usize) -> Option<u64> {
    read_array(buf, off).map(u64::from_le_bytes)
}

impl<'a> EntryParams<'a> {
    /// Interpret the parameter block.
    ///
    /// Returns `Ok(None)` if the block is absent or does not start with
    /// [`PARAMS_MAGIC`]; such a block is not meant for us.
    ///
    /// # Errors
    /// A tagged block that is truncated, has an unknown version, sets reserved
    /// flags or carries a marker outside the block or not in UTF-8.
    pub fn parse(block: ParameterBlock<'a>) -> Result<Option<Self>, ParamsError> {
        let buf = block.as_bytes();

        match read_u64_le(buf, MAGIC_OFF) {
            Some(PARAMS_MAGIC) => {}
            _ => return Ok(None),
        }

        let truncated = ParamsError::Truncated { len: buf.len() };
        if buf.len() < HEADER_LEN {
            return Err(truncated);
        }

        let version = read_u32_le(buf, VERSION_OFF).ok_or(truncated)?;
        if version != PARAMS_VERSION {
            return Err(ParamsError::UnsupportedVersion(version));
        }

        let raw_flags = read_u32_le(buf, FLAGS_OFF).ok_or(truncated)?;
        if raw_flags & !ParamFlags::KNOWN != 0 {
            return Err(ParamsError::ReservedFlags(raw_flags));
        }
        let flags = ParamFlags::from_bits(raw_flags);

        let exit_status = if flags.exit_status() {
            let code = read_array(buf, STATUS_OFF)
                .map(i32::from_le_bytes)
                .ok_or(truncated)?;
            Some(ExitStatus::new(code))
        } else {
            None
        };

        let marker = if flags.marker() {
            let len = read_u32_le(buf, MARKER_LEN_OFF).ok_or(truncated)? as usize;
            let available = buf.len() - HEADER_LEN;
            let bytes = HEADER_LEN
                .checked_add(len)
                .and_then(|end| buf.get(HEADER_LEN..end))
                .ok_or(ParamsError::MarkerOutOfBounds { len, available })?;
            Some(core::str::from_utf8(bytes).map_err(|_| ParamsError::MarkerNotUtf8)?)
        } else {
            None
        };

        Ok(Some(Self {
            exit_status,
            marker,
            abort_without_console: flags.abort_without_console(),
        }))
    }

    #[must_use]
    pub const fn flags(&self) -> ParamFlags {
        ParamFlags::new()
            .with_exit_status(self.exit_status.is_some())
            .with_marker(self.marker.is_some())
            .with_abort_without_console(self.abort_without_console)
    }

    /// Number of bytes [`encode_into`](Self::encode_into) writes.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self.marker {
            Some(marker) => HEADER_LEN + marker.len(),
            None => HEADER_LEN,
        }
    }

    /// Write the tagged block into `buf`, returning the number of bytes used.
    ///
    /// # Errors
    /// [`ParamsError::TooLarge`] if the block cannot be described by the entry
    /// point's 32-bit size argument, [`ParamsError::BufferTooSmall`] if `buf`
    /// is too short.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, ParamsError> {
        let needed = self.encoded_len();
        if i32::try_from(needed).is_err() {
            return Err(ParamsError::TooLarge);
        }
        if buf.len() < needed {
            return Err(ParamsError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }

        let marker = self.marker.unwrap_or_default().as_bytes();
        let marker_len = u32::try_from(marker.len()).map_err(|_| ParamsError::TooLarge)?;
        let status = self.exit_status.map_or(0, ExitStatus::code);

        buf[MAGIC_OFF..VERSION_OFF].copy_from_slice(&PARAMS_MAGIC.to_le_bytes());
        buf[VERSION_OFF..FLAGS_OFF].copy_from_slice(&PARAMS_VERSION.to_le_bytes());
        buf[FLAGS_OFF..STATUS_OFF].copy_from_slice(&self.flags().into_bits().to_le_bytes());
        buf[STATUS_OFF..MARKER_LEN_OFF].copy_from_slice(&status.to_le_bytes());
        buf[MARKER_LEN_OFF..HEADER_LEN].copy_from_slice(&marker_len.to_le_bytes());
        buf[HEADER_LEN..needed].copy_from_slice(marker);
        Ok(needed)
    }
}
