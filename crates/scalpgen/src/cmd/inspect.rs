use serde::Serialize;

use scalpgen_frame::FrameLayout;
use scalpgen_image::{inspect_bytes, parse_hex, Inspection};

use crate::cmd::{usage, InspectArgs};
use crate::exit::{image_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex_bytes, new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct RelayOutput {
    offset: u16,
    count: u8,
    storage: u8,
    from_eeprom: bool,
}

#[derive(Serialize)]
struct FrameOutput {
    address: usize,
    zone: &'static str,
    bytes: String,
    description: String,
    relay: Option<RelayOutput>,
}

#[derive(Serialize)]
struct InspectOutput {
    schema_id: &'static str,
    frame_size: usize,
    slots_nb: usize,
    extended_address: Option<u16>,
    frames: Vec<FrameOutput>,
    problems: Vec<String>,
    consistent: bool,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let layout = FrameLayout::new(args.frame_size)
        .map_err(|err| usage(format!("--frame-size: {err}")))?;
    let context = format!("inspect {}", args.image.display());

    let (bytes, extended_address) = if args.binary {
        let bytes = std::fs::read(&args.image).map_err(|err| io_error(&context, err))?;
        (bytes, None)
    } else {
        let text = std::fs::read_to_string(&args.image).map_err(|err| io_error(&context, err))?;
        let hex = parse_hex(&text).map_err(|err| image_error(&context, err))?;
        let bytes = hex.to_bytes().map_err(|err| image_error(&context, err))?;
        (bytes, hex.extended_address())
    };

    let inspection =
        inspect_bytes(&bytes, layout, args.slots).map_err(|err| image_error(&context, err))?;
    for problem in &inspection.problems {
        tracing::warn!("{problem}");
    }

    let consistent = inspection.is_consistent();
    print_inspect(&summarize(&inspection, &bytes, extended_address), format);
    Ok(if consistent { SUCCESS } else { DATA_INVALID })
}

fn summarize(inspection: &Inspection, bytes: &[u8], extended_address: Option<u16>) -> InspectOutput {
    let size = inspection.layout.size();
    let frames = inspection
        .frames
        .iter()
        .map(|f| FrameOutput {
            address: f.address,
            zone: f.zone.as_str(),
            bytes: hex_bytes(&bytes[f.address..f.address + size]),
            description: f.description.clone(),
            relay: f.relay.map(|c| RelayOutput {
                offset: c.offset,
                count: c.count,
                storage: c.storage,
                from_eeprom: c.from_eeprom(),
            }),
        })
        .collect();

    InspectOutput {
        schema_id: "scalpgen/cli/v1/inspect-report",
        frame_size: size,
        slots_nb: inspection.slots_nb,
        extended_address,
        frames,
        problems: inspection.problems.clone(),
        consistent: inspection.is_consistent(),
    }
}

fn print_inspect(out: &InspectOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "ZONE", "BYTES", "FRAME"]);
            for f in &out.frames {
                table.add_row(vec![
                    format!("0x{:04x}", f.address),
                    f.zone.to_string(),
                    f.bytes.clone(),
                    f.description.clone(),
                ]);
            }
            println!("{table}");
            print_verdict(out);
        }
        OutputFormat::Pretty => {
            if let Some(upper) = out.extended_address {
                println!("Base address: 0x{upper:04x}0000");
            }
            println!(
                "Slots: {}  Frames: {}  Frame size: {}",
                out.slots_nb,
                out.frames.len(),
                out.frame_size
            );
            for f in &out.frames {
                println!("  0x{:04x} {:<8} {}", f.address, f.zone, f.description);
            }
            print_verdict(out);
        }
        OutputFormat::Raw => {
            for f in &out.frames {
                println!("{:04x} {}", f.address, f.bytes);
            }
        }
    }
}

fn print_verdict(out: &InspectOutput) {
    if out.consistent {
        println!("all containers resolve inside the extended zone");
    } else {
        for problem in &out.problems {
            println!("problem: {problem}");
        }
    }
}
