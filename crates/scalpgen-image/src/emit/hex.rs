//! Intel HEX records.
//!
//! ```text
//! :LL AAAA TT DD..DD CC
//!  │   │    │   │     └ checksum: two's complement of the low byte of the sum
//!  │   │    │   └ data (LL bytes)
//!  │   │    └ record type (00 data, 01 EOF, 04 extended linear address)
//!  │   └ 16-bit address, big endian
//!  └ byte count
//! ```

use std::fmt::Write as _;
use std::io::Write;

use crate::config::HexConfig;
use crate::error::{ImageError, Result};
use crate::layout::Image;

pub const DATA: u8 = 0x00;
pub const END_OF_FILE: u8 = 0x01;
pub const EXTENDED_LINEAR_ADDRESS: u8 = 0x04;

/// `(0x100 - (sum mod 256)) mod 256` over every byte preceding the checksum.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// One record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    pub kind: u8,
    pub address: u16,
    pub data: Vec<u8>,
}

impl HexRecord {
    pub fn data(address: u16, data: &[u8]) -> Self {
        Self {
            kind: DATA,
            address,
            data: data.to_vec(),
        }
    }

    pub fn extended_linear_address(upper: u16) -> Self {
        Self {
            kind: EXTENDED_LINEAR_ADDRESS,
            address: 0,
            data: upper.to_be_bytes().to_vec(),
        }
    }

    pub fn end_of_file() -> Self {
        Self {
            kind: END_OF_FILE,
            address: 0,
            data: Vec::new(),
        }
    }

    /// Bytes covered by the checksum: count, address, type, data.
    fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(4 + self.data.len());
        body.push(self.data.len() as u8);
        body.extend_from_slice(&self.address.to_be_bytes());
        body.push(self.kind);
        body.extend_from_slice(&self.data);
        body
    }

    /// The record as a line, without the line terminator.
    pub fn to_line(&self) -> String {
        let body = self.body();
        let mut line = String::with_capacity(1 + 2 * (body.len() + 1));
        line.push(':');
        for b in &body {
            let _ = write!(line, "{b:02x}");
        }
        let _ = write!(line, "{:02x}", checksum(&body));
        line
    }
}

/// Write the image as Intel HEX: one extended linear address record, then
/// one data record per frame at address `index * F`.
pub fn write_hex<W: Write>(image: &Image, config: &HexConfig, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{}",
        HexRecord::extended_linear_address(config.extended_address()).to_line()
    )?;

    for record in image.records() {
        let address = u16::try_from(record.address).map_err(|_| {
            ImageError::Internal(format!("record address 0x{:x} exceeds 16 bits", record.address))
        })?;
        writeln!(out, "{}", HexRecord::data(address, &record.bytes).to_line())?;
    }

    if config.eof_record {
        writeln!(out, "{}", HexRecord::end_of_file().to_line())?;
    }
    Ok(())
}

/// A parsed Intel HEX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexFile {
    pub records: Vec<HexRecord>,
}

impl HexFile {
    /// Upper address word of the first extended linear address record.
    pub fn extended_address(&self) -> Option<u16> {
        self.records
            .iter()
            .find(|r| r.kind == EXTENDED_LINEAR_ADDRESS && r.data.len() == 2)
            .map(|r| u16::from_be_bytes([r.data[0], r.data[1]]))
    }

    /// Reassemble data records into one contiguous block starting at 0.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data: Vec<&HexRecord> = self.records.iter().filter(|r| r.kind == DATA).collect();
        data.sort_by_key(|r| r.address);

        let mut bytes = Vec::new();
        for record in data {
            if record.address as usize != bytes.len() {
                return Err(ImageError::Hex {
                    line: 0,
                    message: format!(
                        "data at 0x{:04x} does not follow 0x{:04x}: gap or overlap",
                        record.address,
                        bytes.len()
                    ),
                });
            }
            bytes.extend_from_slice(&record.data);
        }
        Ok(bytes)
    }
}

/// Parse Intel HEX text, verifying every checksum.
pub fn parse_hex(text: &str) -> Result<HexFile> {
    let mut records = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let bad = |message: String| ImageError::Hex {
            line: line_no,
            message,
        };

        let digits = line
            .strip_prefix(':')
            .ok_or_else(|| bad("missing ':' start code".to_string()))?;
        if !digits.is_ascii() || digits.len() % 2 != 0 || digits.len() < 10 {
            return Err(bad(format!("malformed record `{line}`")));
        }
        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map_err(|err| bad(format!("invalid hex digit: {err}")))?;

        let count = bytes[0] as usize;
        if bytes.len() != count + 5 {
            return Err(bad(format!(
                "byte count {count} disagrees with record length {}",
                bytes.len() - 5
            )));
        }
        let (body, sum) = bytes.split_at(bytes.len() - 1);
        let expected = checksum(body);
        if sum[0] != expected {
            return Err(bad(format!(
                "checksum 0x{:02x}, expected 0x{expected:02x}",
                sum[0]
            )));
        }

        let record = HexRecord {
            kind: body[3],
            address: u16::from_be_bytes([body[1], body[2]]),
            data: body[4..].to_vec(),
        };
        match record.kind {
            DATA | EXTENDED_LINEAR_ADDRESS => records.push(record),
            END_OF_FILE => break,
            other => {
                tracing::warn!(line = line_no, kind = other, "skipping unsupported hex record");
            }
        }
    }

    Ok(HexFile { records })
}
