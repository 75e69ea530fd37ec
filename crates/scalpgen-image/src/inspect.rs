use scalpgen_frame::{decode_frame, describe, ContainerRef, Frame, FrameLayout};

use crate::error::{ImageError, Result};
use crate::layout::Zone;

/// One decoded frame of an existing image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedFrame {
    pub address: usize,
    pub zone: Zone,
    pub frame: Frame,
    pub description: String,
    pub relay: Option<ContainerRef>,
}

/// Result of reading an image back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub layout: FrameLayout,
    pub slots_nb: usize,
    pub frames: Vec<InspectedFrame>,
    /// Containers that do not resolve to a sequence inside the extended zone.
    pub problems: Vec<String>,
}

impl Inspection {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Decode raw EEPROM content.
///
/// When `slots_nb` is unknown, the slot zone is taken to end at the lowest
/// offset any leading container relays to.
pub fn inspect_bytes(bytes: &[u8], layout: FrameLayout, slots_nb: Option<usize>) -> Result<Inspection> {
    let size = layout.size();
    let trailing = bytes.len() % size;
    if trailing != 0 {
        return Err(ImageError::Decode {
            address: bytes.len() - trailing,
            source: scalpgen_frame::FrameError::WrongLength {
                expected: size,
                actual: trailing,
            },
        });
    }

    let frames = bytes
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| {
            decode_frame(chunk, layout).map_err(|source| ImageError::Decode {
                address: index * size,
                source,
            })
        })
        .collect::<Result<Vec<Frame>>>()?;

    let slots_nb = slots_nb.unwrap_or_else(|| infer_slots_nb(&frames, size));
    if slots_nb > frames.len() {
        return Err(ImageError::Config(format!(
            "image holds {} frames, fewer than {slots_nb} slots",
            frames.len()
        )));
    }

    let ext_start = slots_nb * size;
    let end = frames.len() * size;
    let mut problems = Vec::new();
    let inspected = frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| {
            let zone = if index < slots_nb {
                Zone::Slot
            } else {
                Zone::Extended
            };
            let relay = frame.as_container();
            if let (Zone::Slot, Some(c)) = (zone, relay) {
                let offset = c.offset as usize;
                let span_end = offset + c.count as usize * size;
                if offset % size != 0 {
                    problems.push(format!(
                        "slot {index}: container offset 0x{offset:04x} is not frame-aligned"
                    ));
                } else if offset < ext_start || span_end > end {
                    problems.push(format!(
                        "slot {index}: container relays 0x{offset:04x}..0x{span_end:04x}, outside extended zone 0x{ext_start:04x}..0x{end:04x}"
                    ));
                } else if c.count == 0 {
                    problems.push(format!("slot {index}: container relays no frame"));
                }
            }
            InspectedFrame {
                address: index * size,
                zone,
                description: describe(&frame),
                frame,
                relay,
            }
        })
        .collect();

    Ok(Inspection {
        layout,
        slots_nb,
        frames: inspected,
        problems,
    })
}

fn infer_slots_nb(frames: &[Frame], size: usize) -> usize {
    let mut boundary = frames.len();
    for (index, frame) in frames.iter().enumerate() {
        if index >= boundary {
            break;
        }
        if let Some(c) = frame.as_container() {
            let target = c.offset as usize / size;
            if target > index {
                boundary = boundary.min(target);
            }
        }
    }
    boundary
}
