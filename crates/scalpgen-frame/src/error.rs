/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame size is outside what the status length bits can describe.
    #[error("frame size {size} out of range ({min}..={max})")]
    InvalidFrameSize { size: usize, min: usize, max: usize },

    /// More argument bytes than the frame layout can carry.
    #[error("too many argument bytes ({len}, capacity {capacity})")]
    ArgvTooLong { len: usize, capacity: usize },

    /// The payload length packed in `status` disagrees with the argument bytes.
    #[error("status declares {declared} argument bytes, frame carries {actual}")]
    LengthMismatch { declared: u8, actual: usize },

    /// `0xff` is the placeholder written for frames without a transaction id.
    #[error("transaction id 0xff is reserved for unset frames")]
    ReservedTransactionId,

    /// Bits 4:3 of the status byte are reserved and must be zero.
    #[error("reserved status bits set (status 0x{0:02x})")]
    ReservedStatusBits(u8),

    /// The declared payload length exceeds the layout's argument capacity.
    #[error("status declares {declared} argument bytes, layout carries at most {capacity}")]
    LengthOverflow { declared: u8, capacity: usize },

    /// The byte slice handed to the decoder is not exactly one frame.
    #[error("frame must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// A byte past the declared payload is nonzero.
    #[error("nonzero padding byte 0x{value:02x} at offset {offset}")]
    NonZeroPadding { offset: usize, value: u8 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
