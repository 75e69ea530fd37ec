//! Container (relay) frames.
//!
//! A container stands in for an event slot holding more than one frame: it
//! records where the full sequence starts and how many frames it spans.
//!
//! Argument layout: offset high byte, offset low byte, frame count, storage
//! selector. In layouts too narrow for the fourth byte (`F = 8`) the selector
//! is dropped and the status storage bit marks an EEPROM target instead.

use crate::catalog::CONTAINER;
use crate::codec::{Frame, FrameLayout};

/// Storage selectors read by the dispatcher from `argv[3]`.
pub mod storage {
    /// Sequence held in RAM.
    pub const RAM: u8 = 0x00;
    /// Sequence stored in EEPROM.
    pub const EEPROM: u8 = 0x01;
    /// Sequence predefined in the module's firmware.
    pub const PRE_DEF: u8 = 0x02;

    pub fn name(selector: u8) -> Option<&'static str> {
        match selector {
            RAM => Some("ram"),
            EEPROM => Some("eeprom"),
            PRE_DEF => Some("pre_def"),
            _ => None,
        }
    }
}

/// Decoded arguments of a container frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerRef {
    /// Absolute byte address of the first relayed frame.
    pub offset: u16,
    /// Number of relayed frames.
    pub count: u8,
    /// Storage selector, see [`storage`].
    pub storage: u8,
}

impl ContainerRef {
    pub fn from_eeprom(&self) -> bool {
        self.storage == storage::EEPROM
    }
}

impl Frame {
    /// Build a self-addressed container pointing at `count` frames stored in
    /// EEPROM at byte `offset`.
    pub fn container(self_addr: u8, offset: u16, count: u8, layout: FrameLayout) -> Frame {
        let [hi, lo] = offset.to_be_bytes();
        if layout.arg_capacity() >= 4 {
            return Frame::with_args(
                self_addr,
                self_addr,
                None,
                CONTAINER,
                [hi, lo, count, storage::EEPROM],
            );
        }
        let mut frame = Frame::with_args(self_addr, self_addr, None, CONTAINER, [hi, lo, count]);
        frame.status.set_eeprom(true);
        frame
    }

    /// Interpret this frame as a container, if it is one.
    pub fn as_container(&self) -> Option<ContainerRef> {
        if self.cmde != CONTAINER {
            return None;
        }
        match *self.args() {
            [hi, lo, count, selector] => Some(ContainerRef {
                offset: u16::from_be_bytes([hi, lo]),
                count,
                storage: selector,
            }),
            [hi, lo, count] => Some(ContainerRef {
                offset: u16::from_be_bytes([hi, lo]),
                count,
                storage: if self.status.reads_eeprom() {
                    storage::EEPROM
                } else {
                    storage::RAM
                },
            }),
            _ => None,
        }
    }
}
