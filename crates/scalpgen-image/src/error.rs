use scalpgen_frame::FrameError;

/// Errors that can occur while compiling or reading an EEPROM image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The declared slot count disagrees with the slots given.
    #[error("slots number inconsistent between declaration ({declared}) and instantiation ({actual})")]
    SlotCount { declared: usize, actual: usize },

    /// A slot holds no frame; its event would resolve to nothing at boot.
    #[error("slot {slot} holds no frame")]
    EmptySlot { slot: usize },

    /// A slot's explicit index disagrees with its position in the table.
    #[error("slot {slot} declares index {declared}")]
    SlotIndex { slot: usize, declared: usize },

    /// Container frames count relayed frames in a single byte.
    #[error("slot {slot} holds {count} frames (max 255)")]
    SlotTooLong { slot: usize, count: usize },

    /// A frame declaration is invalid (unknown command, bad arity, bad value).
    #[error("slot {slot}, frame {frame}: {message}")]
    InvalidFrame {
        slot: usize,
        frame: usize,
        message: String,
    },

    /// Any other configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// A frame cannot be encoded in the image's layout.
    #[error("slot {slot}, frame {frame}: {source}")]
    Encoding {
        slot: usize,
        frame: usize,
        #[source]
        source: FrameError,
    },

    /// The laid-out image does not fit the addressable or configured space.
    #[error("image of {size} bytes exceeds the {limit}-byte limit")]
    Capacity { size: usize, limit: usize },

    /// An allocator invariant was violated.
    #[error("internal allocator error: {0}")]
    Internal(String),

    /// The slot table file could not be read.
    #[error("failed to load slot table: {0}")]
    Load(String),

    /// The slot table file is not a valid table document.
    #[error("invalid slot table: {0}")]
    Parse(#[from] toml::de::Error),

    /// An Intel HEX file is malformed.
    #[error("hex line {line}: {message}")]
    Hex { line: usize, message: String },

    /// Raw bytes do not decode into frames.
    #[error("frame at 0x{address:04x}: {source}")]
    Decode {
        address: usize,
        #[source]
        source: FrameError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used to report failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Encoding,
    Layout,
    Internal,
    Input,
}

impl ImageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ImageError::SlotCount { .. }
            | ImageError::EmptySlot { .. }
            | ImageError::SlotIndex { .. }
            | ImageError::SlotTooLong { .. }
            | ImageError::InvalidFrame { .. }
            | ImageError::Config(_) => ErrorClass::Configuration,
            ImageError::Encoding { .. } => ErrorClass::Encoding,
            ImageError::Capacity { .. } => ErrorClass::Layout,
            ImageError::Internal(_) => ErrorClass::Internal,
            ImageError::Load(_)
            | ImageError::Parse(_)
            | ImageError::Hex { .. }
            | ImageError::Decode { .. }
            | ImageError::Io(_) => ErrorClass::Input,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
