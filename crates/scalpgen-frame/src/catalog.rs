//! Built-in command codes.
//!
//! The catalog only drives diagnostics and argument-count validation; byte
//! layout is the same for every command (see [`crate::codec`]).

use std::fmt::{self, Write as _};

use crate::codec::Frame;
use crate::container::storage;

/// Empty command, used to fill spare slots.
pub const NULL: u8 = 0x00;

/// Relay to a frame sequence stored elsewhere.
pub const CONTAINER: u8 = 0x01;

/// Flight state change.
pub const STATE: u8 = 0x02;

/// Log filter.
pub const LOG: u8 = 0x03;

/// LED blink timing.
pub const LED: u8 = 0x04;

/// Drive a servo to a stored position.
pub const SERVO_CMD: u8 = 0x05;

/// Save or read a servo position.
pub const SERVO_INFO: u8 = 0x06;

/// Save or read the flight time-out.
pub const MINUT_TIME_OUT: u8 = 0x07;

/// Take-off detection threshold.
pub const TAKE_OFF_THRES: u8 = 0x08;

/// Application start signal.
pub const APPLI_START: u8 = 0x09;

/// Closed set of command kinds known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Null,
    Container,
    State,
    Log,
    Led,
    ServoCmd,
    ServoInfo,
    MinutTimeOut,
    TakeOffThreshold,
    AppliStart,
}

/// Allowed number of argument bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: u8,
    pub max: u8,
}

impl Arity {
    pub const fn exact(n: u8) -> Self {
        Self { min: n, max: n }
    }

    pub const fn range(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn accepts(self, argc: usize) -> bool {
        (self.min as usize..=self.max as usize).contains(&argc)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

/// One argument as printed in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// Printed as a two's-complement signed byte.
    pub signed: bool,
}

const fn hex(name: &'static str) -> Field {
    Field {
        name,
        signed: false,
    }
}

const fn signed(name: &'static str) -> Field {
    Field { name, signed: true }
}

/// Static description of a command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub kind: CommandKind,
    pub code: u8,
    /// Human-readable name, e.g. `ServoInfo`.
    pub name: &'static str,
    /// Identifier used in slot tables, e.g. `servo_info`.
    pub keyword: &'static str,
    pub arity: Arity,
    /// Argument names, in order. Variadic commands repeat the last one.
    pub fields: &'static [Field],
}

pub static CATALOG: [CommandDescriptor; 10] = [
    CommandDescriptor {
        kind: CommandKind::Null,
        code: NULL,
        name: "Null",
        keyword: "null",
        arity: Arity::exact(0),
        fields: &[],
    },
    CommandDescriptor {
        kind: CommandKind::Container,
        code: CONTAINER,
        name: "Container",
        keyword: "container",
        arity: Arity::range(3, 4),
        fields: &[hex("offs_hi"), hex("offs_lo"), hex("count"), hex("storage")],
    },
    CommandDescriptor {
        kind: CommandKind::State,
        code: STATE,
        name: "State",
        keyword: "state",
        arity: Arity::range(1, 2),
        fields: &[hex("state"), hex("arg")],
    },
    CommandDescriptor {
        kind: CommandKind::Log,
        code: LOG,
        name: "Log",
        keyword: "log",
        arity: Arity::range(1, 3),
        fields: &[hex("filter")],
    },
    CommandDescriptor {
        kind: CommandKind::Led,
        code: LED,
        name: "Led",
        keyword: "led",
        arity: Arity::exact(3),
        fields: &[hex("mask"), hex("on"), hex("off")],
    },
    CommandDescriptor {
        kind: CommandKind::ServoCmd,
        code: SERVO_CMD,
        name: "ServoCmd",
        keyword: "servo_cmd",
        arity: Arity::exact(2),
        fields: &[hex("servo"), hex("position")],
    },
    CommandDescriptor {
        kind: CommandKind::ServoInfo,
        code: SERVO_INFO,
        name: "ServoInfo",
        keyword: "servo_info",
        arity: Arity::exact(4),
        fields: &[hex("servo"), hex("op"), hex("sel"), signed("angle")],
    },
    CommandDescriptor {
        kind: CommandKind::MinutTimeOut,
        code: MINUT_TIME_OUT,
        name: "MinutTimeOut",
        keyword: "minut_time_out",
        arity: Arity::exact(2),
        fields: &[hex("op"), hex("tenths")],
    },
    CommandDescriptor {
        kind: CommandKind::TakeOffThreshold,
        code: TAKE_OFF_THRES,
        name: "TakeOffThreshold",
        keyword: "take_off_thres",
        arity: Arity::exact(2),
        fields: &[hex("duration"), hex("accel")],
    },
    CommandDescriptor {
        kind: CommandKind::AppliStart,
        code: APPLI_START,
        name: "AppliStart",
        keyword: "appli_start",
        arity: Arity::exact(0),
        fields: &[],
    },
];

impl CommandKind {
    /// Catalog entries are stored in declaration order of the variants.
    pub fn descriptor(self) -> &'static CommandDescriptor {
        &CATALOG[self as usize]
    }

    pub fn code(self) -> u8 {
        self.descriptor().code
    }

    pub fn from_code(code: u8) -> Option<Self> {
        lookup(code).map(|d| d.kind)
    }
}

/// Find the descriptor of a command code.
pub fn lookup(code: u8) -> Option<&'static CommandDescriptor> {
    CATALOG.iter().find(|d| d.code == code)
}

/// Find a descriptor by slot-table keyword or display name (case-insensitive).
pub fn by_keyword(keyword: &str) -> Option<&'static CommandDescriptor> {
    CATALOG
        .iter()
        .find(|d| d.keyword.eq_ignore_ascii_case(keyword) || d.name.eq_ignore_ascii_case(keyword))
}

/// Human-readable name of a command code.
pub fn command_name(code: u8) -> &'static str {
    lookup(code).map(|d| d.name).unwrap_or("Unknown")
}

/// Outcome of checking a frame's argument count against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityCheck {
    Ok,
    /// The command code is not in the catalog; nothing to check against.
    UnknownCommand,
    Mismatch {
        descriptor: &'static CommandDescriptor,
        argc: usize,
    },
}

pub fn check_arity(cmde: u8, argc: usize) -> ArityCheck {
    match lookup(cmde) {
        None => ArityCheck::UnknownCommand,
        Some(d) if d.arity.accepts(argc) => ArityCheck::Ok,
        Some(d) => ArityCheck::Mismatch {
            descriptor: d,
            argc,
        },
    }
}

/// Diagnostic rendering of a frame, e.g. `ServoInfo(servo=0xc0, op=0x5a, sel=0x09, angle=-15)`.
pub fn describe(frame: &Frame) -> String {
    let mut out = String::new();
    match (lookup(frame.cmde), frame.as_container()) {
        (_, Some(c)) => {
            let _ = write!(out, "Container(offset=0x{:04x}, count={}, ", c.offset, c.count);
            match storage::name(c.storage) {
                Some(name) => out.push_str(name),
                None => {
                    let _ = write!(out, "storage=0x{:02x}", c.storage);
                }
            }
            out.push(')');
        }
        (Some(d), None) if d.fields.is_empty() && frame.args().is_empty() => {
            out.push_str(d.name);
        }
        (Some(d), None) => {
            out.push_str(d.name);
            out.push('(');
            for (i, arg) in frame.args().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match d.fields.get(i).or(d.fields.last()) {
                    Some(field) if field.signed => {
                        let _ = write!(out, "{}={}", field.name, *arg as i8);
                    }
                    Some(field) => {
                        let _ = write!(out, "{}=0x{:02x}", field.name, arg);
                    }
                    None => {
                        let _ = write!(out, "0x{arg:02x}");
                    }
                }
            }
            out.push(')');
        }
        (None, None) => {
            let _ = write!(out, "Unknown(0x{:02x})", frame.cmde);
            if !frame.args().is_empty() {
                let _ = write!(out, "{:02x?}", frame.args());
            }
        }
    }

    if frame.status.is_error() {
        out.push_str(" [error]");
    }
    if frame.status.is_response() {
        out.push_str(" [response]");
    }
    out
}

/// Returns true if the code is claimed by the catalog.
pub fn is_builtin(code: u8) -> bool {
    lookup(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameLayout;

    #[test]
    fn codes_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in &CATALOG[i + 1..] {
                assert_ne!(a.code, b.code, "{} and {}", a.name, b.name);
                assert_ne!(a.keyword, b.keyword);
            }
        }
    }

    #[test]
    fn catalog_order_matches_kinds() {
        for (i, d) in CATALOG.iter().enumerate() {
            assert_eq!(d.kind as usize, i, "{}", d.name);
        }
    }

    #[test]
    fn kind_roundtrips_through_code() {
        for d in &CATALOG {
            assert_eq!(CommandKind::from_code(d.code), Some(d.kind));
            assert_eq!(d.kind.code(), d.code);
        }
        assert_eq!(CommandKind::from_code(0xee), None);
    }

    #[test]
    fn keyword_lookup_accepts_name() {
        assert_eq!(by_keyword("servo_info").map(|d| d.code), Some(SERVO_INFO));
        assert_eq!(by_keyword("ServoInfo").map(|d| d.code), Some(SERVO_INFO));
        assert!(by_keyword("warp_drive").is_none());
    }

    #[test]
    fn arity_checks() {
        assert_eq!(check_arity(SERVO_INFO, 4), ArityCheck::Ok);
        assert!(matches!(
            check_arity(SERVO_INFO, 3),
            ArityCheck::Mismatch { argc: 3, .. }
        ));
        assert_eq!(check_arity(LOG, 2), ArityCheck::Ok);
        assert_eq!(check_arity(0x7f, 6), ArityCheck::UnknownCommand);
        assert_eq!(check_arity(CONTAINER, 3), ArityCheck::Ok);
        assert_eq!(check_arity(CONTAINER, 4), ArityCheck::Ok);
        assert!(matches!(check_arity(CONTAINER, 5), ArityCheck::Mismatch { .. }));
        assert_eq!(Arity::range(1, 3).to_string(), "1..=3");
    }

    #[test]
    fn describe_servo_info_signed_angle() {
        let frame = Frame::with_args(0, 0, None, SERVO_INFO, [0xc0, 0x5a, 0x09, (-15i8) as u8]);
        assert_eq!(
            describe(&frame),
            "ServoInfo(servo=0xc0, op=0x5a, sel=0x09, angle=-15)"
        );
    }

    #[test]
    fn describe_container_and_null() {
        assert_eq!(
            describe(&Frame::container(0, 0x16, 7, FrameLayout::new(8).unwrap())),
            "Container(offset=0x0016, count=7, eeprom)"
        );
        assert_eq!(
            describe(&Frame::container(0, 0x16, 7, FrameLayout::default())),
            "Container(offset=0x0016, count=7, eeprom)"
        );
        assert_eq!(
            describe(&Frame::with_args(0, 0, None, CONTAINER, [0, 0x16, 2, storage::PRE_DEF])),
            "Container(offset=0x0016, count=2, pre_def)"
        );
        assert_eq!(
            describe(&Frame::with_args(0, 0, None, CONTAINER, [0, 0x16, 2, 0x7e])),
            "Container(offset=0x0016, count=2, storage=0x7e)"
        );
        assert_eq!(describe(&Frame::with_args(0, 0, None, NULL, [])), "Null");
    }

    #[test]
    fn describe_unknown_and_flags() {
        let mut frame = Frame::with_args(0, 0, Some(1), 0x42, [0x01, 0xab]);
        frame.status.set_error(true);
        assert_eq!(describe(&frame), "Unknown(0x42)[01, ab] [error]");
    }

    #[test]
    fn describe_variadic_log() {
        let frame = Frame::with_args(0, 0, None, LOG, [0x01, 0x02]);
        assert_eq!(describe(&frame), "Log(filter=0x01, filter=0x02)");
    }
}
