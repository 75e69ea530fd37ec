use std::io::Write;

use scalpgen_frame::{describe, HEADER_SIZE};

use crate::config::ListingConfig;
use crate::error::Result;
use crate::layout::{Image, Record, Zone};

/// Write the image as a C array placed in the EEPROM linker section.
///
/// Each record gets a comment with its address, raw bytes and decoded
/// fields, followed by a designated initializer. The extended zone is
/// announced by a marker comment at index `slots_nb`.
pub fn write_listing<W: Write>(image: &Image, config: &ListingConfig, out: &mut W) -> Result<()> {
    writeln!(out, "#include \"{}\"", config.include)?;
    writeln!(out)?;
    writeln!(
        out,
        "const struct {} {}[] __attribute__ ((section (\"{}\")))= {{",
        config.struct_name, config.array_name, config.section
    )?;
    writeln!(out, "//-> {} :", image.name())?;

    for (index, record) in image.records().iter().enumerate() {
        if index == image.slots_nb() {
            writeln!(out, "\n\t//-- start of extended zone --")?;
        }
        write_record(image, record, out)?;
    }

    writeln!(out, "}};")?;
    Ok(())
}

fn write_record<W: Write>(image: &Image, record: &Record, out: &mut W) -> Result<()> {
    let size = image.layout().size();
    let frame = &record.frame;

    match (record.zone, image.slot_name(record.slot)) {
        (Zone::Slot, Some(name)) => writeln!(out, "\t// slot {} ({name})", record.slot)?,
        (Zone::Slot, None) => writeln!(out, "\t// slot {}", record.slot)?,
        (Zone::Extended, _) => {}
    }

    write!(out, "\t//0x{:02x} ({:3}):", record.address, record.address)?;
    for i in 0..size {
        write!(out, " 0x{:02x}", frame[i])?;
    }
    writeln!(out, " : {}", describe(frame))?;

    let status = frame.status;
    write!(
        out,
        "\t//  dest=0x{:02x} orig=0x{:02x} t_id={} cmde=0x{:02x} status=0x{:02x} (err={} resp={} eeprom={} len={}) argv=[",
        frame.dest,
        frame.orig,
        frame
            .t_id
            .map_or_else(|| "unset".to_string(), |t| format!("0x{t:02x}")),
        frame.cmde,
        status.bits(),
        u8::from(status.is_error()),
        u8::from(status.is_response()),
        u8::from(status.reads_eeprom()),
        status.len(),
    )?;
    for (i, arg) in frame.args().iter().enumerate() {
        if i > 0 {
            write!(out, " ")?;
        }
        write!(out, "{arg:02x}")?;
    }
    writeln!(out, "]")?;

    let bytes = &record.bytes;
    write!(
        out,
        "\t{{ .dest = 0x{:02x}, .orig = 0x{:02x}, .t_id = 0x{:02x}, .cmde = 0x{:02x}, .status = 0x{:02x}, .argv = {{",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]
    )?;
    for arg in &bytes[HEADER_SIZE..] {
        write!(out, "0x{arg:02x}, ")?;
    }
    writeln!(out, "}}\n\t}},")?;
    Ok(())
}
