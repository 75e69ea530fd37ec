//! Address allocation.
//!
//! The image is split in two contiguous zones:
//! - slot zone `[0, slots_nb * F)`: one frame per slot, either the slot's only
//!   frame or a container relaying to the extended zone
//! - extended zone `[slots_nb * F, ..)`: the full sequences of multi-frame
//!   slots, in slot order
//!
//! Container offsets are assigned in one forward pass, from a running offset
//! seeded at the end of the slot zone.

use bytes::{Bytes, BytesMut};
use scalpgen_frame::{encode_frame, Frame, FrameLayout};

use crate::error::{ImageError, Result};
use crate::table::SlotTable;

/// Offsets held by containers are 16-bit.
pub const ADDRESS_SPACE: usize = 1 << 16;

/// Zone a record was placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Slot,
    Extended,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Slot => "slot",
            Zone::Extended => "extended",
        }
    }
}

/// A frame at its final address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Byte address in EEPROM (`index * F`).
    pub address: usize,
    pub zone: Zone,
    /// Slot the frame was declared in (or stands in for, for containers).
    pub slot: usize,
    pub frame: Frame,
    /// Encoded bytes, exactly `F` long.
    pub bytes: Bytes,
}

/// A laid-out EEPROM image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    name: String,
    slots_nb: usize,
    layout: FrameLayout,
    slot_names: Vec<Option<String>>,
    records: Vec<Record>,
}

impl Image {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots_nb(&self) -> usize {
        self.slots_nb
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Label of a slot, if it was given one.
    pub fn slot_name(&self, slot: usize) -> Option<&str> {
        self.slot_names.get(slot).and_then(|n| n.as_deref())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of frame records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Image size in bytes.
    pub fn byte_len(&self) -> usize {
        self.records.len() * self.layout.size()
    }

    /// Records of the extended zone.
    pub fn extended(&self) -> &[Record] {
        &self.records[self.slots_nb.min(self.records.len())..]
    }

    /// The raw EEPROM content.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.byte_len());
        for record in &self.records {
            buf.extend_from_slice(&record.bytes);
        }
        buf.freeze()
    }

    /// The record starting at `address`, if one does.
    pub fn record_at(&self, address: usize) -> Option<&Record> {
        if address % self.layout.size() != 0 {
            return None;
        }
        self.records.get(address / self.layout.size())
    }
}

/// Lay out a slot table into an image.
pub fn allocate(table: &SlotTable) -> Result<Image> {
    table.validate()?;

    let layout = table.layout();
    let size = layout.size();
    let slots_nb = table.slots_nb();
    let self_addr = table.config().self_addr;

    let relocated: usize = table
        .slots()
        .iter()
        .filter(|s| s.is_relocated())
        .map(|s| s.frames.len())
        .sum();
    let total = (slots_nb + relocated) * size;
    let limit = table
        .config()
        .eeprom_size
        .map_or(ADDRESS_SPACE, |cap| cap.min(ADDRESS_SPACE));
    if total > limit {
        return Err(ImageError::Capacity { size: total, limit });
    }

    // (slot, frame index within slot, frame)
    let mut slot_zone: Vec<(usize, usize, Frame)> = Vec::with_capacity(slots_nb);
    let mut ext_zone: Vec<(usize, usize, Frame)> = Vec::with_capacity(relocated);
    // (slot, container offset, count)
    let mut relays: Vec<(usize, usize, usize)> = Vec::new();
    let mut offset = slots_nb * size;

    for (slot_idx, slot) in table.slots().iter().enumerate() {
        match slot.frames.as_slice() {
            [frame] => {
                slot_zone.push((slot_idx, 0, *frame));
            }
            frames => {
                let address = u16::try_from(offset).map_err(|_| {
                    ImageError::Internal(format!("offset 0x{offset:x} past the address space"))
                })?;
                let count = u8::try_from(frames.len()).map_err(|_| ImageError::SlotTooLong {
                    slot: slot_idx,
                    count: frames.len(),
                })?;

                tracing::debug!(
                    slot = slot_idx,
                    offset,
                    count,
                    "relocating slot to extended zone"
                );
                slot_zone.push((slot_idx, 0, Frame::container(self_addr, address, count, layout)));
                relays.push((slot_idx, offset, frames.len()));
                ext_zone.extend(
                    frames
                        .iter()
                        .enumerate()
                        .map(|(frame_idx, frame)| (slot_idx, frame_idx, *frame)),
                );
                offset += frames.len() * size;
            }
        }
    }

    let mut records = Vec::with_capacity(slot_zone.len() + ext_zone.len());
    let placed = slot_zone
        .into_iter()
        .map(|p| (Zone::Slot, p))
        .chain(ext_zone.into_iter().map(|p| (Zone::Extended, p)));
    for (index, (zone, (slot, frame_idx, frame))) in placed.enumerate() {
        let mut buf = BytesMut::with_capacity(size);
        encode_frame(&frame, layout, &mut buf).map_err(|source| ImageError::Encoding {
            slot,
            frame: frame_idx,
            source,
        })?;
        records.push(Record {
            address: index * size,
            zone,
            slot,
            frame,
            bytes: buf.freeze(),
        });
    }

    let image = Image {
        name: table.config().name.clone(),
        slots_nb,
        layout,
        slot_names: table.slots().iter().map(|s| s.name.clone()).collect(),
        records,
    };
    verify_relays(&image, &relays)?;

    tracing::info!(
        image = %image.name,
        slots = slots_nb,
        relocated_slots = relays.len(),
        records = image.len(),
        bytes = image.byte_len(),
        "image laid out"
    );
    Ok(image)
}

fn verify_relays(image: &Image, relays: &[(usize, usize, usize)]) -> Result<()> {
    for &(slot, offset, count) in relays {
        let container = image.records.get(slot).and_then(|r| r.frame.as_container());
        match container {
            Some(c) if c.offset as usize == offset && c.count as usize == count && c.from_eeprom() => {}
            other => {
                return Err(ImageError::Internal(format!(
                    "slot {slot}: container {other:?} does not relay to 0x{offset:04x} x{count}"
                )));
            }
        }

        let first = offset / image.layout.size();
        let sequence = image.records.get(first..first + count).unwrap_or(&[]);
        let in_place = sequence.len() == count
            && sequence
                .iter()
                .all(|r| r.slot == slot && r.zone == Zone::Extended)
            && sequence.first().map(|r| r.address) == Some(offset);
        if !in_place {
            return Err(ImageError::Internal(format!(
                "slot {slot}: relayed sequence not found at 0x{offset:04x}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;
    use crate::table::Slot;
    use scalpgen_frame::catalog::{CONTAINER, LED, LOG, NULL, STATE};
    use scalpgen_frame::decode_frame;

    fn config(slots_nb: usize) -> ImageConfig {
        ImageConfig {
            name: "test".to_string(),
            slots_nb,
            frame_size: 8,
            self_addr: 0x21,
            eeprom_size: None,
        }
    }

    fn frame(cmde: u8, arg: u8) -> Frame {
        Frame::with_args(0x01, 0x02, Some(arg), cmde, [arg])
    }

    #[test]
    fn relocates_multi_frame_slot() {
        let (a, b, c) = (frame(STATE, 1), frame(LOG, 2), frame(STATE, 3));
        let d = Frame::with_args(0x01, 0x02, None, LED, [0xa1, 0x00, 25]);
        let table =
            SlotTable::new(config(2), vec![Slot::new(vec![a, b, c]), Slot::new(vec![d])])
                .unwrap();

        let image = allocate(&table).unwrap();
        assert_eq!(image.len(), 5);
        assert_eq!(image.byte_len(), 40);

        let relay = image.records()[0].frame.as_container().unwrap();
        assert_eq!(relay.offset, 16);
        assert_eq!(relay.count, 3);
        assert!(relay.from_eeprom());
        assert_eq!(image.records()[0].frame.dest, 0x21);
        assert_eq!(image.records()[0].frame.orig, 0x21);
        assert_eq!(image.records()[0].frame.t_id, None);

        assert_eq!(image.records()[1].bytes, d.encode(table.layout()).unwrap());
        assert_eq!(image.record_at(16).unwrap().frame, a);
        assert_eq!(image.record_at(24).unwrap().frame, b);
        assert_eq!(image.record_at(32).unwrap().frame, c);
        assert_eq!(image.extended().len(), 3);
        assert!(image.extended().iter().all(|r| r.zone == Zone::Extended));
    }

    #[test]
    fn wide_layout_container_carries_storage_argument() {
        let mut cfg = config(2);
        cfg.frame_size = 11;
        cfg.self_addr = 0x00;
        let slots = vec![
            Slot::new(vec![frame(STATE, 1), frame(STATE, 2)]),
            Slot::new(vec![Frame::with_args(0, 0, None, NULL, [])]),
        ];
        let image = allocate(&SlotTable::new(cfg, slots).unwrap()).unwrap();
        assert_eq!(
            image.records()[0].bytes.as_ref(),
            &[0x00, 0x00, 0xff, CONTAINER, 0x04, 0x00, 0x16, 0x02, 0x01, 0x00, 0x00]
        );
        assert_eq!(image.record_at(22).unwrap().frame, frame(STATE, 1));
    }

    #[test]
    fn offsets_accumulate_across_slots() {
        let slots = vec![
            Slot::new(vec![frame(STATE, 1), frame(STATE, 2)]),
            Slot::new(vec![Frame::with_args(0, 0, None, NULL, [])]),
            Slot::new(vec![frame(LOG, 3), frame(LOG, 4), frame(LOG, 5)]),
        ];
        let table = SlotTable::new(config(3), slots).unwrap();
        let image = allocate(&table).unwrap();

        assert_eq!(image.len(), 3 + 2 + 3);
        let first = image.records()[0].frame.as_container().unwrap();
        let third = image.records()[2].frame.as_container().unwrap();
        assert_eq!((first.offset, first.count), (24, 2));
        assert_eq!((third.offset, third.count), (40, 3));
        assert_eq!(image.record_at(40).unwrap().frame, frame(LOG, 3));
        assert_eq!(image.records()[1].frame.cmde, NULL);
    }

    #[test]
    fn every_record_is_decodable() {
        let slots = vec![
            Slot::new(vec![frame(STATE, 1), frame(LOG, 2)]),
            Slot::new(vec![frame(STATE, 9)]),
        ];
        let table = SlotTable::new(config(2), slots).unwrap();
        let image = allocate(&table).unwrap();
        for record in image.records() {
            assert_eq!(record.bytes.len(), 8);
            assert_eq!(decode_frame(&record.bytes, image.layout()).unwrap(), record.frame);
        }
        assert_eq!(image.to_bytes().len(), image.byte_len());
        assert_eq!(image.records()[0].frame.cmde, CONTAINER);
    }

    #[test]
    fn slot_count_mismatch_produces_no_image() {
        let table = SlotTable::new(config(3), vec![
            Slot::new(vec![frame(STATE, 1)]),
            Slot::new(vec![frame(STATE, 2)]),
        ])
        .unwrap();
        assert!(matches!(
            allocate(&table),
            Err(ImageError::SlotCount {
                declared: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn capacity_limit_is_enforced() {
        let mut cfg = config(1);
        cfg.eeprom_size = Some(16);
        let table = SlotTable::new(
            cfg,
            vec![Slot::new(vec![frame(STATE, 1), frame(STATE, 2)])],
        )
        .unwrap();
        assert!(matches!(
            allocate(&table),
            Err(ImageError::Capacity { size: 24, limit: 16 })
        ));
    }

    #[test]
    fn address_space_limit_is_enforced() {
        let slots_nb = ADDRESS_SPACE / 8 + 1;
        let slots = (0..slots_nb)
            .map(|_| Slot::new(vec![Frame::with_args(0, 0, None, STATE, [1])]))
            .collect();
        let table = SlotTable::new(config(slots_nb), slots).unwrap();
        assert!(matches!(
            allocate(&table),
            Err(ImageError::Capacity { .. })
        ));
    }

    #[test]
    fn allocation_is_deterministic() {
        let slots = vec![
            Slot::new(vec![frame(STATE, 1), frame(LOG, 2)]),
            Slot::new(vec![frame(STATE, 3)]),
        ];
        let table = SlotTable::new(config(2), slots).unwrap();
        let first = allocate(&table).unwrap();
        let second = allocate(&table).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_bytes(), second.to_bytes());
    }
}
