use scalpgen_frame::DEFAULT_FRAME_SIZE;
use serde::Deserialize;

/// Geometry and addressing of one module's EEPROM image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Module name, printed in listings.
    #[serde(default = "default_name")]
    pub name: String,
    /// Declared number of event slots. Must equal the number of slots given.
    pub slots_nb: usize,
    /// Frame size `F` in bytes.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// Bus address of the module itself, used for synthesized containers.
    #[serde(default)]
    pub self_addr: u8,
    /// EEPROM capacity in bytes. `None` only enforces the 16-bit address space.
    #[serde(default)]
    pub eeprom_size: Option<usize>,
}

fn default_name() -> String {
    "eeprom".to_string()
}

fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            slots_nb: 0,
            frame_size: DEFAULT_FRAME_SIZE,
            self_addr: 0,
            eeprom_size: None,
        }
    }
}

/// Names used in the generated C listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Header declaring the frame struct.
    pub include: String,
    /// C struct tag of a frame.
    pub struct_name: String,
    /// Name of the generated array.
    pub array_name: String,
    /// Linker section reserved for EEPROM content.
    pub section: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            include: "dispatcher.h".to_string(),
            struct_name: "scalp".to_string(),
            array_name: "eeprom_scalps".to_string(),
            section: ".eeprom".to_string(),
        }
    }
}

/// Intel HEX output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HexConfig {
    /// Linear base address of the EEPROM in the programmer's address space.
    /// Only the upper 16 bits are emitted, in the extended address record.
    pub base_address: u32,
    /// Terminate the file with an end-of-file record.
    pub eof_record: bool,
}

/// AVR toolchains map EEPROM at 0x0081_0000.
pub const DEFAULT_BASE_ADDRESS: u32 = 0x0081_0000;

impl Default for HexConfig {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS,
            eof_record: false,
        }
    }
}

impl HexConfig {
    /// Upper address word carried by the extended linear address record.
    pub fn extended_address(&self) -> u16 {
        (self.base_address >> 16) as u16
    }
}
