use std::io::Read;
use std::path::Path;

use scalpgen_frame::{by_keyword, check_arity, ArityCheck, Frame, FrameError, FrameLayout, Status};
use serde::Deserialize;

use crate::config::{HexConfig, ImageConfig, ListingConfig};
use crate::error::{ImageError, Result};

/// Slot tables larger than this are refused before parsing.
pub const MAX_TABLE_FILE_SIZE: usize = 256 * 1024;

/// One event slot: the frames dispatched when its event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Optional label, printed in listings.
    pub name: Option<String>,
    pub frames: Vec<Frame>,
}

impl Slot {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { name: None, frames }
    }

    pub fn named(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: Some(name.into()),
            frames,
        }
    }

    pub fn is_relocated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Ordered event slots of one module, with the geometry of its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    config: ImageConfig,
    layout: FrameLayout,
    slots: Vec<Slot>,
}

impl SlotTable {
    /// Pair slots with their image configuration.
    ///
    /// Only the frame size is checked here; everything else is checked by
    /// [`SlotTable::validate`] before allocation.
    pub fn new(config: ImageConfig, slots: Vec<Slot>) -> Result<Self> {
        let layout = FrameLayout::new(config.frame_size)
            .map_err(|err| ImageError::Config(err.to_string()))?;
        Ok(Self {
            config,
            layout,
            slots,
        })
    }

    /// Parse a TOML slot table document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        TableFile::from_toml_str(text)?.into_table()
    }

    /// Load a TOML slot table file.
    pub fn from_path(path: &Path) -> Result<Self> {
        TableFile::from_path(path)?.into_table()
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_nb(&self) -> usize {
        self.config.slots_nb
    }

    /// Check everything allocation relies on. No image is built from a
    /// table that fails here.
    pub fn validate(&self) -> Result<()> {
        if self.slots.len() != self.config.slots_nb {
            return Err(ImageError::SlotCount {
                declared: self.config.slots_nb,
                actual: self.slots.len(),
            });
        }

        for (slot_idx, slot) in self.slots.iter().enumerate() {
            if slot.frames.is_empty() {
                return Err(ImageError::EmptySlot { slot: slot_idx });
            }
            if slot.frames.len() > u8::MAX as usize {
                return Err(ImageError::SlotTooLong {
                    slot: slot_idx,
                    count: slot.frames.len(),
                });
            }

            for (frame_idx, frame) in slot.frames.iter().enumerate() {
                match check_arity(frame.cmde, frame.args().len()) {
                    ArityCheck::Ok => {}
                    ArityCheck::UnknownCommand => {
                        tracing::warn!(
                            slot = slot_idx,
                            frame = frame_idx,
                            cmde = frame.cmde,
                            "command code not in catalog, argument count unchecked"
                        );
                    }
                    ArityCheck::Mismatch { descriptor, argc } => {
                        return Err(ImageError::InvalidFrame {
                            slot: slot_idx,
                            frame: frame_idx,
                            message: format!(
                                "{} takes {} argument(s), got {argc}",
                                descriptor.name, descriptor.arity
                            ),
                        });
                    }
                }

                frame
                    .encode(self.layout)
                    .map_err(|source| ImageError::Encoding {
                        slot: slot_idx,
                        frame: frame_idx,
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

/// On-disk slot table document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableFile {
    pub image: ImageConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub hex: HexConfig,
    #[serde(default)]
    pub slots: Vec<SlotSpec>,
}

/// Declaration of one slot.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSpec {
    #[serde(default)]
    pub name: Option<String>,
    /// Expected position in the table, checked when present.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
}

/// Declaration of one frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpec {
    /// Defaults to the module's own address.
    #[serde(default)]
    pub dest: Option<u8>,
    /// Defaults to the module's own address.
    #[serde(default)]
    pub orig: Option<u8>,
    #[serde(default)]
    pub t_id: Option<u8>,
    pub cmde: CommandRef,
    /// Argument values; negatives are stored as two's complement.
    #[serde(default)]
    pub args: Vec<i64>,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub response: bool,
    /// Explicit payload length; must match `args` when given.
    #[serde(default)]
    pub len: Option<u8>,
}

/// A command given by numeric code or catalog keyword.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandRef {
    Code(u8),
    Keyword(String),
}

impl TableFile {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|err| ImageError::Load(format!("{}: {err}", path.display())))?;
        let metadata = file
            .metadata()
            .map_err(|err| ImageError::Load(format!("{}: {err}", path.display())))?;
        if metadata.len() > MAX_TABLE_FILE_SIZE as u64 {
            return Err(ImageError::Load(format!(
                "{}: file too large ({} bytes, max {MAX_TABLE_FILE_SIZE})",
                path.display(),
                metadata.len()
            )));
        }

        let read_limit = u64::try_from(MAX_TABLE_FILE_SIZE.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| ImageError::Load(format!("{}: {err}", path.display())))?;
        if content.len() > MAX_TABLE_FILE_SIZE {
            return Err(ImageError::Load(format!(
                "{}: file grew past {MAX_TABLE_FILE_SIZE} bytes while reading",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), bytes = content.len(), "loaded slot table");
        Self::from_toml_str(&content)
    }

    /// Build frames from their declarations.
    pub fn into_table(self) -> Result<SlotTable> {
        let self_addr = self.image.self_addr;
        let mut slots = Vec::with_capacity(self.slots.len());

        for (slot_idx, spec) in self.slots.into_iter().enumerate() {
            if let Some(declared) = spec.index {
                if declared != slot_idx {
                    return Err(ImageError::SlotIndex {
                        slot: slot_idx,
                        declared,
                    });
                }
            }

            let frames = spec
                .frames
                .iter()
                .enumerate()
                .map(|(frame_idx, frame)| frame.build(self_addr, slot_idx, frame_idx))
                .collect::<Result<Vec<_>>>()?;
            slots.push(Slot {
                name: spec.name,
                frames,
            });
        }

        SlotTable::new(self.image, slots)
    }
}

impl FrameSpec {
    fn build(&self, self_addr: u8, slot: usize, frame: usize) -> Result<Frame> {
        let invalid = |message: String| ImageError::InvalidFrame {
            slot,
            frame,
            message,
        };

        let cmde = match &self.cmde {
            CommandRef::Code(code) => *code,
            CommandRef::Keyword(keyword) => by_keyword(keyword)
                .map(|d| d.code)
                .ok_or_else(|| invalid(format!("unknown command `{keyword}`")))?,
        };

        let args = self
            .args
            .iter()
            .map(|&value| match value {
                0..=255 => Ok(value as u8),
                -128..=-1 => Ok(value as i8 as u8),
                _ => Err(invalid(format!(
                    "argument {value} does not fit in a byte (-128..=255)"
                ))),
            })
            .collect::<Result<Vec<u8>>>()?;

        if let Some(len) = self.len {
            if len as usize != args.len() {
                return Err(ImageError::Encoding {
                    slot,
                    frame,
                    source: FrameError::LengthMismatch {
                        declared: len,
                        actual: args.len(),
                    },
                });
            }
        }

        let mut status = Status::with_len(args.len() as u8);
        status.set_error(self.error);
        status.set_response(self.response);

        Frame::from_parts(
            self.dest.unwrap_or(self_addr),
            self.orig.unwrap_or(self_addr),
            self.t_id,
            cmde,
            status,
            &args,
        )
        .map_err(|source| ImageError::Encoding {
            slot,
            frame,
            source,
        })
    }
}
