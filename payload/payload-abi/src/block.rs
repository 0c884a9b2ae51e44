//! # Parameter Block

use core::ffi::c_void;

/// Read-only view of the loader-supplied parameter region.
///
/// The view never extends past the size the loader passed in. A null address,
/// a zero size and a negative size all produce the absent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterBlock<'a> {
    bytes: &'a [u8],
}

impl<'a> ParameterBlock<'a> {
    /// The block a loader passes when it has nothing to say.
    #[must_use]
    pub const fn absent() -> Self {
        Self { bytes: &[] }
    }

    /// Wraps an in-process buffer, e.g. one produced by the encoder.
    #[must_use]
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Builds the view from the raw entry point arguments.
    ///
    /// # Safety
    /// If `address` is non-null and `size` is positive, `size` bytes starting at
    /// `address` must be readable and must not be written for `'a`.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn from_raw(address: *const c_void, size: i32) -> Self {
        let Ok(len) = usize::try_from(size) else {
            return Self::absent();
        };

        if address.is_null() || len == 0 {
            return Self::absent();
        }

        // SAFETY: non-null, u8 has no alignment requirement, `len` fits in an
        // i32 and readability is the caller's contract.
        let bytes = unsafe { core::slice::from_raw_parts(address.cast::<u8>(), len) };
        Self { bytes }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Default for ParameterBlock<'_> {
    fn default() -> Self {
        Self::absent()
    }
}
