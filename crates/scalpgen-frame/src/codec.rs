use std::fmt;
use std::ops::Index;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Header: dest (1) + orig (1) + t_id (1) + cmde (1) + status (1) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Widest argument buffer the 3-bit payload length can describe.
pub const MAX_ARGS: usize = 7;

/// Smallest frame able to carry a container (offset hi, offset lo, count).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 3;

/// Largest frame whose payload length still fits in `status` bits 2:0.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_ARGS;

/// Default frame size: 6 argument bytes, as read by the flight modules.
pub const DEFAULT_FRAME_SIZE: usize = 11;

/// Byte written in place of the transaction id of frames that have none.
pub const T_ID_UNSET: u8 = 0xff;

/// Bit masks of the packed status byte.
pub mod status {
    /// Error flag.
    pub const ERROR: u8 = 0b1000_0000;
    /// Response flag: response (1) or command (0).
    pub const RESPONSE: u8 = 0b0100_0000;
    /// Storage target of a container: read from EEPROM (1).
    pub const STORAGE: u8 = 0b0010_0000;
    /// Reserved bits (4:3).
    pub const RESERVED_MASK: u8 = 0b0001_1000;
    /// Payload length (bits 2:0).
    pub const LEN_MASK: u8 = 0b0000_0111;
}

/// Packed status byte of a frame.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Status(u8);

impl Status {
    /// Build a status from its raw byte, reserved bits included.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Build a command status carrying `len` argument bytes.
    pub fn with_len(len: u8) -> Self {
        Self(len & status::LEN_MASK)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_error(self) -> bool {
        self.0 & status::ERROR != 0
    }

    pub fn is_response(self) -> bool {
        self.0 & status::RESPONSE != 0
    }

    /// Container target flag: the relayed sequence lives in EEPROM.
    pub fn reads_eeprom(self) -> bool {
        self.0 & status::STORAGE != 0
    }

    /// Declared payload length.
    pub fn len(self) -> u8 {
        self.0 & status::LEN_MASK
    }

    pub fn reserved_bits(self) -> u8 {
        self.0 & status::RESERVED_MASK
    }

    pub fn set_error(&mut self, on: bool) {
        self.set(status::ERROR, on);
    }

    pub fn set_response(&mut self, on: bool) {
        self.set(status::RESPONSE, on);
    }

    pub fn set_eeprom(&mut self, on: bool) {
        self.set(status::STORAGE, on);
    }

    pub fn set_len(&mut self, len: u8) {
        self.0 = (self.0 & !status::LEN_MASK) | (len & status::LEN_MASK);
    }

    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("error", &self.is_error())
            .field("response", &self.is_response())
            .field("eeprom", &self.reads_eeprom())
            .field("len", &self.len())
            .finish()
    }
}

/// Fixed-capacity argument buffer. Bytes past `len` are always zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Args {
    buf: [u8; MAX_ARGS],
    len: u8,
}

impl Args {
    pub fn from_slice(args: &[u8]) -> Result<Self> {
        if args.len() > MAX_ARGS {
            return Err(FrameError::ArgvTooLong {
                len: args.len(),
                capacity: MAX_ARGS,
            });
        }
        let mut buf = [0u8; MAX_ARGS];
        buf[..args.len()].copy_from_slice(args);
        Ok(Self {
            buf,
            len: args.len() as u8,
        })
    }

    /// Infallible constructor for argument counts known at compile time.
    pub fn from_array<const N: usize>(args: [u8; N]) -> Self {
        const { assert!(N <= MAX_ARGS, "too many argument bytes") };
        let mut buf = [0u8; MAX_ARGS];
        buf[..N].copy_from_slice(&args);
        Self { buf, len: N as u8 }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Byte geometry shared by every frame of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    size: usize,
}

impl FrameLayout {
    pub fn new(size: usize) -> Result<Self> {
        if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&size) {
            return Err(FrameError::InvalidFrameSize {
                size,
                min: MIN_FRAME_SIZE,
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(Self { size })
    }

    /// Total frame size `F` in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Argument bytes per frame (`F - 5`).
    pub fn arg_capacity(&self) -> usize {
        self.size - HEADER_SIZE
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            size: DEFAULT_FRAME_SIZE,
        }
    }
}

/// A command frame exchanged between modules and persisted to EEPROM.
///
/// Every command kind shares this one representation; the command code
/// selects how `args` and `status` are interpreted (see [`crate::catalog`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Destination module address.
    pub dest: u8,
    /// Origin module address.
    pub orig: u8,
    /// Transaction identifier, `None` for frames that never expect a reply.
    pub t_id: Option<u8>,
    /// Command code.
    pub cmde: u8,
    /// Packed flags and payload length.
    pub status: Status,
    args: Args,
}

impl Frame {
    /// Create a command frame; the status length follows `args`.
    pub fn new(dest: u8, orig: u8, t_id: Option<u8>, cmde: u8, args: &[u8]) -> Result<Self> {
        let args = Args::from_slice(args)?;
        Ok(Self {
            dest,
            orig,
            t_id,
            cmde,
            status: Status::with_len(args.len() as u8),
            args,
        })
    }

    /// Create a command frame from a fixed argument array.
    pub fn with_args<const N: usize>(
        dest: u8,
        orig: u8,
        t_id: Option<u8>,
        cmde: u8,
        args: [u8; N],
    ) -> Self {
        let args = Args::from_array(args);
        Self {
            dest,
            orig,
            t_id,
            cmde,
            status: Status::with_len(args.len() as u8),
            args,
        }
    }

    /// Create a frame with an explicit status byte, which may disagree with `args`.
    pub fn from_parts(
        dest: u8,
        orig: u8,
        t_id: Option<u8>,
        cmde: u8,
        status: Status,
        args: &[u8],
    ) -> Result<Self> {
        Ok(Self {
            dest,
            orig,
            t_id,
            cmde,
            status,
            args: Args::from_slice(args)?,
        })
    }

    pub fn args(&self) -> &[u8] {
        self.args.as_slice()
    }

    /// Encode into a freshly allocated buffer of exactly `layout.size()` bytes.
    pub fn encode(&self, layout: FrameLayout) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(layout.size());
        encode_frame(self, layout, &mut buf)?;
        Ok(buf.freeze())
    }
}

static ZERO: u8 = 0;
static UNSET: u8 = T_ID_UNSET;

impl Index<usize> for Frame {
    type Output = u8;

    /// The i-th serialized byte. Padding past the arguments reads as zero.
    ///
    /// A frame does not know its layout: indexes up to the widest frame
    /// (`MAX_FRAME_SIZE`) are accepted, so bytes past a narrower `F` read as
    /// padding. Check against [`FrameLayout::size`] when that matters.
    fn index(&self, index: usize) -> &u8 {
        match index {
            0 => &self.dest,
            1 => &self.orig,
            2 => match &self.t_id {
                Some(t_id) => t_id,
                None => &UNSET,
            },
            3 => &self.cmde,
            4 => &self.status.0,
            i if i < HEADER_SIZE + MAX_ARGS => {
                let arg = i - HEADER_SIZE;
                if arg < self.args.len() {
                    &self.args.buf[arg]
                } else {
                    &ZERO
                }
            }
            i => panic!("frame byte index {i} out of range (must be < {MAX_FRAME_SIZE})"),
        }
    }
}

/// Encode a frame into the fixed-width record format.
///
/// Record format (`F` = `layout.size()`):
/// ```text
/// ┌──────┬──────┬──────┬──────┬────────┬──────────────────────┐
/// │ dest │ orig │ t_id │ cmde │ status │ argv (F-5, 0-padded) │
/// └──────┴──────┴──────┴──────┴────────┴──────────────────────┘
/// status: bit7 error | bit6 response | bit5 eeprom | bits2:0 length
/// ```
pub fn encode_frame(frame: &Frame, layout: FrameLayout, dst: &mut BytesMut) -> Result<()> {
    let capacity = layout.arg_capacity();
    let args = frame.args();
    if args.len() > capacity {
        return Err(FrameError::ArgvTooLong {
            len: args.len(),
            capacity,
        });
    }
    if frame.status.len() as usize != args.len() {
        return Err(FrameError::LengthMismatch {
            declared: frame.status.len(),
            actual: args.len(),
        });
    }
    if frame.status.reserved_bits() != 0 {
        return Err(FrameError::ReservedStatusBits(frame.status.bits()));
    }
    if frame.t_id == Some(T_ID_UNSET) {
        return Err(FrameError::ReservedTransactionId);
    }

    dst.reserve(layout.size());
    dst.put_u8(frame.dest);
    dst.put_u8(frame.orig);
    dst.put_u8(frame.t_id.unwrap_or(T_ID_UNSET));
    dst.put_u8(frame.cmde);
    dst.put_u8(frame.status.bits());
    dst.put_slice(args);
    dst.put_bytes(0, capacity - args.len());
    Ok(())
}

/// Decode exactly one frame from `src`.
pub fn decode_frame(src: &[u8], layout: FrameLayout) -> Result<Frame> {
    if src.len() != layout.size() {
        return Err(FrameError::WrongLength {
            expected: layout.size(),
            actual: src.len(),
        });
    }

    let status = Status::from_bits(src[4]);
    if status.reserved_bits() != 0 {
        return Err(FrameError::ReservedStatusBits(status.bits()));
    }
    let len = status.len() as usize;
    if len > layout.arg_capacity() {
        return Err(FrameError::LengthOverflow {
            declared: status.len(),
            capacity: layout.arg_capacity(),
        });
    }
    if let Some((pos, &value)) = src[HEADER_SIZE + len..]
        .iter()
        .enumerate()
        .find(|(_, b)| **b != 0)
    {
        return Err(FrameError::NonZeroPadding {
            offset: HEADER_SIZE + len + pos,
            value,
        });
    }

    let t_id = match src[2] {
        T_ID_UNSET => None,
        t_id => Some(t_id),
    };
    Frame::from_parts(
        src[0],
        src[1],
        t_id,
        src[3],
        status,
        &src[HEADER_SIZE..HEADER_SIZE + len],
    )
}
