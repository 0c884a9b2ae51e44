//! # Payload Entry ABI
//!
//! This crate defines the contract between an external loader and the payload
//! it places into a target process. The loader never links against the
//! payload; it resolves a single exported symbol, starts a thread at that
//! address with a raw parameter buffer, and later reads the thread's exit code.
//! Everything both sides have to agree on lives here.
//!
//! ## Overview
//!
//! ```text
//! Loader (other process)                 Target process
//! ──────────────────────                 ──────────────────────────────
//! write payload image      ───────────▶  payload mapped, not bootstrapped
//! write parameter block    ───────────▶  [address, address + size)
//! start thread at symbol   ───────────▶  payload_main(address, size)
//!                                            │ acquire console
//!                                            │ print marker
//!                                            │ wait for one line
//! query thread exit code   ◀───────────  return ExitStatus
//! ```
//!
//! ## Entry Point Convention
//! ```rust
//! # use core::ffi::c_void;
//! pub type PayloadEntryFn = unsafe extern "system" fn(*const c_void, i32) -> i32;
//! ```
//!
//! * **Calling Convention**: the platform's thread-start convention (`system`)
//! * **Parameters**: pointer to the parameter block and its length in bytes
//! * **Return**: the [`ExitStatus`](entry::ExitStatus) code
//!
//! The two-argument shape (pointer + size) instead of the three-argument module
//! load signature marks the symbol as meant for a custom loader.
//!
//! ## Parameter Block
//!
//! The block is owned by the loader for the duration of the call. A null
//! address or a size of zero is the common case and means "no parameters".
//! The payload only interprets a block that starts with
//! [`PARAMS_MAGIC`](params::PARAMS_MAGIC); anything else is opaque and
//! ignored. See [`params`] for the wire layout.
//!
//! ## Usage Patterns
//!
//! ### Loader side
//! ```rust
//! use payload_abi::params::EntryParams;
//!
//! let params = EntryParams {
//!     marker: Some("ready"),
//!     ..EntryParams::default()
//! };
//! let mut block = [0u8; 64];
//! let len = params.encode_into(&mut block).expect("block fits");
//! assert_eq!(len, params.encoded_len());
//! ```
//!
//! ### Payload side
//! ```rust
//! use payload_abi::{block::ParameterBlock, params::EntryParams};
//!
//! let block = ParameterBlock::absent();
//! assert_eq!(EntryParams::parse(block), Ok(None));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod block;
pub mod entry;
pub mod params;

pub use block::ParameterBlock;
pub use entry::{ENTRY_SYMBOL, ExitStatus, PayloadEntryFn};
pub use params::{EntryParams, ParamFlags, ParamsError};
