//! Output shapes of a laid-out image.
//!
//! Emitters are read-only views: every byte they print comes from the
//! records' codec encoding.

pub mod hex;
pub mod listing;

use std::io::Write;

use crate::config::{HexConfig, ListingConfig};
use crate::error::Result;
use crate::layout::Image;

pub use hex::{checksum, parse_hex, write_hex, HexFile, HexRecord};
pub use listing::write_listing;

/// Artifact kinds an image can be emitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// C source initializing the EEPROM section.
    Listing,
    /// Intel HEX records for an EEPROM programmer.
    Hex,
    /// Raw EEPROM bytes.
    Bin,
}

/// Write `image` in the requested shape.
pub fn emit<W: Write>(
    image: &Image,
    kind: Emit,
    listing: &ListingConfig,
    hex: &HexConfig,
    out: &mut W,
) -> Result<()> {
    match kind {
        Emit::Listing => write_listing(image, listing, out),
        Emit::Hex => write_hex(image, hex, out),
        Emit::Bin => {
            out.write_all(&image.to_bytes())?;
            Ok(())
        }
    }
}

/// Render `image` fully in memory.
pub fn render(image: &Image, kind: Emit, listing: &ListingConfig, hex: &HexConfig) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(image.byte_len() * 8);
    emit(image, kind, listing, hex, &mut buf)?;
    Ok(buf)
}
