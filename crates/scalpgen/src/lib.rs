//! EEPROM image compiler for SCALP flight computer command frames.
//!
//! A module's boot behavior is a table of event slots, each holding the
//! frames to dispatch when that event fires. scalpgen lays such a table out
//! as a fixed-stride EEPROM image (slot zone, then extended zone reached
//! through container frames) and emits it as a C listing or Intel HEX.
//!
//! # Crate Structure
//!
//! - [`frame`]: fixed-width frame codec and command catalog
//! - [`image`]: slot tables, layout allocation, emitters and read-back

/// Re-export frame types.
pub mod frame {
    pub use scalpgen_frame::*;
}

/// Re-export image types.
pub mod image {
    pub use scalpgen_image::*;
}
