use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("scalpgen {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: scalpgen");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("SCALPGEN_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("SCALPGEN_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "frame_size: {}..={} (default {})",
        scalpgen_frame::MIN_FRAME_SIZE,
        scalpgen_frame::MAX_FRAME_SIZE,
        scalpgen_frame::DEFAULT_FRAME_SIZE
    );
    println!("commands: {}", scalpgen_frame::CATALOG.len());

    Ok(SUCCESS)
}
