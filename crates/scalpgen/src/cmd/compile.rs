use serde::Serialize;

use scalpgen_image::{allocate, render, Emit};

use crate::cmd::{load_table, CompileArgs, EmitKind};
use crate::exit::{image_error, io_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, write_artifact, OutputFormat};

#[derive(Serialize)]
struct CompileOutput {
    schema_id: &'static str,
    name: String,
    emit: &'static str,
    output: String,
    slots_nb: usize,
    frame_size: usize,
    frames: usize,
    extended_frames: usize,
    image_bytes: usize,
    artifact_bytes: usize,
}

pub fn run(args: CompileArgs, format: OutputFormat) -> CliResult<i32> {
    let mut loaded = load_table(&args.table)?;
    if args.eof_record {
        loaded.hex.eof_record = true;
    }
    if let Some(base) = args.base_address {
        loaded.hex.base_address = base;
    }

    let kind = args
        .emit
        .or_else(|| args.output.as_deref().and_then(EmitKind::from_path))
        .unwrap_or(EmitKind::Listing);

    let image = allocate(&loaded.table).map_err(|err| image_error("compile", err))?;
    // Nothing touches the filesystem until the whole artifact exists.
    let artifact = render(&image, Emit::from(kind), &loaded.listing, &loaded.hex)
        .map_err(|err| image_error("render", err))?;

    let Some(path) = args.output else {
        write_artifact(&mut std::io::stdout().lock(), &artifact)
            .map_err(|err| io_error("write stdout", err))?;
        return Ok(SUCCESS);
    };

    std::fs::write(&path, &artifact)
        .map_err(|err| io_error(&format!("write {}", path.display()), err))?;
    tracing::info!(
        path = %path.display(),
        emit = kind.as_str(),
        bytes = artifact.len(),
        "artifact written"
    );

    let out = CompileOutput {
        schema_id: "scalpgen/cli/v1/compile-summary",
        name: image.name().to_string(),
        emit: kind.as_str(),
        output: path.display().to_string(),
        slots_nb: image.slots_nb(),
        frame_size: image.layout().size(),
        frames: image.len(),
        extended_frames: image.extended().len(),
        image_bytes: image.byte_len(),
        artifact_bytes: artifact.len(),
    };
    print_compile(&out, format);
    Ok(SUCCESS)
}

fn print_compile(out: &CompileOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["IMAGE", "EMIT", "SLOTS", "F", "FRAMES", "BYTES", "OUTPUT"]);
            table.add_row(vec![
                out.name.clone(),
                out.emit.to_string(),
                out.slots_nb.to_string(),
                out.frame_size.to_string(),
                format!("{} ({} extended)", out.frames, out.extended_frames),
                out.image_bytes.to_string(),
                out.output.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Compiled {}:", out.name);
            println!("  Emit:        {}", out.emit);
            println!("  Slots:       {}", out.slots_nb);
            println!("  Frame size:  {}", out.frame_size);
            println!(
                "  Frames:      {} ({} extended)",
                out.frames, out.extended_frames
            );
            println!("  Image bytes: {}", out.image_bytes);
            println!("  Output:      {} ({} bytes)", out.output, out.artifact_bytes);
        }
        OutputFormat::Raw => println!("{}", out.output),
    }
}
