//! Fixed-width command frames for the SCALP module bus.
//!
//! Every frame exchanged between flight-computer modules, or stored in their
//! EEPROM, has the same size `F` across an image:
//! - A 5-byte header: destination, origin, transaction id, command, status
//! - `F - 5` argument bytes, zero-padded
//!
//! The command catalog maps command codes to names and argument counts for
//! diagnostics; it never changes the byte layout.

pub mod catalog;
pub mod codec;
pub mod container;
pub mod error;

pub use catalog::{
    by_keyword, check_arity, command_name, describe, lookup, Arity, ArityCheck, CommandDescriptor,
    CommandKind, CATALOG, CONTAINER, NULL,
};
pub use codec::{
    decode_frame, encode_frame, Args, Frame, FrameLayout, Status, DEFAULT_FRAME_SIZE, HEADER_SIZE,
    MAX_ARGS, MAX_FRAME_SIZE, MIN_FRAME_SIZE, T_ID_UNSET,
};
pub use container::{storage, ContainerRef};
pub use error::{FrameError, Result};
