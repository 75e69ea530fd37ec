use clap::{Args, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use scalpgen_image::{Emit, HexConfig, ListingConfig, SlotTable, TableFile};

use crate::exit::{image_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod catalog;
pub mod check;
pub mod compile;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a slot table into an EEPROM artifact.
    Compile(CompileArgs),
    /// Validate a slot table and print its layout without writing anything.
    Check(CheckArgs),
    /// Decode an existing image and verify its container relays.
    Inspect(InspectArgs),
    /// Print the command catalog.
    Catalog(CatalogArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Compile(args) => compile::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Catalog(args) => catalog::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmitKind {
    /// C source initializing the EEPROM section.
    Listing,
    /// Intel HEX for the EEPROM programmer.
    Hex,
    /// Raw image bytes.
    Bin,
}

impl EmitKind {
    /// Guess the artifact kind from an output file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "hex" | "ihex" | "eep" => Some(Self::Hex),
            "bin" | "raw" => Some(Self::Bin),
            "c" | "h" | "inc" => Some(Self::Listing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Hex => "hex",
            Self::Bin => "bin",
        }
    }
}

impl From<EmitKind> for Emit {
    fn from(kind: EmitKind) -> Self {
        match kind {
            EmitKind::Listing => Emit::Listing,
            EmitKind::Hex => Emit::Hex,
            EmitKind::Bin => Emit::Bin,
        }
    }
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Slot table (TOML).
    pub table: PathBuf,
    /// Write the artifact here instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Artifact kind. Default: from the output extension, else listing.
    #[arg(long, value_name = "KIND")]
    pub emit: Option<EmitKind>,
    /// Terminate Intel HEX output with an end-of-file record.
    #[arg(long)]
    pub eof_record: bool,
    /// Override the HEX base address (e.g. 0x810000).
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    pub base_address: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Slot table (TOML).
    pub table: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Intel HEX image, or raw bytes with --binary.
    pub image: PathBuf,
    /// Frame size the image was compiled with.
    #[arg(long, value_name = "N", default_value_t = scalpgen_frame::DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,
    /// Number of event slots. Default: inferred from the container relays.
    #[arg(long, value_name = "N")]
    pub slots: Option<usize>,
    /// Read the image as raw bytes instead of Intel HEX.
    #[arg(long)]
    pub binary: bool,
}

#[derive(Args, Debug, Default)]
pub struct CatalogArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// A slot table with the output options declared next to it.
pub struct LoadedTable {
    pub table: SlotTable,
    pub listing: ListingConfig,
    pub hex: HexConfig,
}

pub fn load_table(path: &Path) -> CliResult<LoadedTable> {
    let context = format!("load {}", path.display());
    let file = TableFile::from_path(path).map_err(|err| image_error(&context, err))?;
    let listing = file.listing.clone();
    let hex = file.hex;
    let table = file
        .into_table()
        .map_err(|err| image_error(&context, err))?;
    Ok(LoadedTable {
        table,
        listing,
        hex,
    })
}

fn parse_address(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u32::from_str_radix(&digits.replace('_', ""), 16),
        None => input.replace('_', "").parse(),
    };
    parsed.map_err(|_| format!("invalid address: {input}"))
}

pub fn usage(message: impl Into<String>) -> CliError {
    CliError::new(USAGE, message)
}
