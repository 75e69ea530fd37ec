//! EEPROM image compiler for SCALP event slot tables.
//!
//! A module's slot table declares, for every boot-time event, the frames to
//! dispatch. This crate lays those frames out into an EEPROM
//! image the firmware reads at boot:
//!
//! - [`table`]: slot tables, from TOML or built in code, and their validation
//! - [`layout`]: address allocation and container synthesis
//! - [`emit`]: C listing, Intel HEX and raw binary output
//! - [`inspect`]: reading an image back into frames

pub mod config;
pub mod emit;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod table;

pub use config::{HexConfig, ImageConfig, ListingConfig, DEFAULT_BASE_ADDRESS};
pub use emit::{emit, parse_hex, render, write_hex, write_listing, Emit, HexFile, HexRecord};
pub use error::{ErrorClass, ImageError, Result};
pub use inspect::{inspect_bytes, Inspection, InspectedFrame};
pub use layout::{allocate, Image, Record, Zone, ADDRESS_SPACE};
pub use table::{CommandRef, FrameSpec, Slot, SlotSpec, SlotTable, TableFile};
