use serde::Serialize;

use scalpgen_image::{allocate, Image};

use crate::cmd::{load_table, CheckArgs};
use crate::exit::{image_error, CliResult, SUCCESS};
use crate::output::{hex_bytes, new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct RecordOutput {
    address: usize,
    zone: &'static str,
    slot: usize,
    bytes: String,
    description: String,
}

#[derive(Serialize)]
struct CheckOutput {
    schema_id: &'static str,
    name: String,
    slots_nb: usize,
    frame_size: usize,
    image_bytes: usize,
    records: Vec<RecordOutput>,
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let loaded = load_table(&args.table)?;
    let image = allocate(&loaded.table).map_err(|err| image_error("check", err))?;
    print_check(&summarize(&image), format);
    Ok(SUCCESS)
}

fn summarize(image: &Image) -> CheckOutput {
    let records = image
        .records()
        .iter()
        .map(|r| RecordOutput {
            address: r.address,
            zone: r.zone.as_str(),
            slot: r.slot,
            bytes: hex_bytes(&r.bytes),
            description: scalpgen_frame::describe(&r.frame),
        })
        .collect();

    CheckOutput {
        schema_id: "scalpgen/cli/v1/layout-report",
        name: image.name().to_string(),
        slots_nb: image.slots_nb(),
        frame_size: image.layout().size(),
        image_bytes: image.byte_len(),
        records,
    }
}

fn print_check(out: &CheckOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "ZONE", "SLOT", "BYTES", "FRAME"]);
            for r in &out.records {
                table.add_row(vec![
                    format!("0x{:04x}", r.address),
                    r.zone.to_string(),
                    r.slot.to_string(),
                    r.bytes.clone(),
                    r.description.clone(),
                ]);
            }
            println!("{table}");
            println!(
                "{}: {} slots, {} frames of {} bytes, {} bytes total",
                out.name,
                out.slots_nb,
                out.records.len(),
                out.frame_size,
                out.image_bytes
            );
        }
        OutputFormat::Pretty => {
            println!("Layout of {}:", out.name);
            for r in &out.records {
                println!(
                    "  0x{:04x} {:<8} slot {:<3} {}",
                    r.address, r.zone, r.slot, r.description
                );
            }
            println!("  {} bytes", out.image_bytes);
        }
        OutputFormat::Raw => {
            for r in &out.records {
                println!("{:04x} {}", r.address, r.bytes);
            }
        }
    }
}
