//! `attachkit discover` — List instruction files.

use std::path::PathBuf;

use attachkit_config::AppConfig;
use attachkit_instructions::{FsInstructionSource, InstructionFileSource};

pub async fn run(roots: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if !config.instructions.enabled {
        println!("Instruction files are disabled (instructions.enabled = false)");
        return Ok(());
    }

    let roots = super::roots_or_cwd(roots);
    let locations = config.instructions.locations();
    let source = FsInstructionSource::new(config.instructions.extension.clone());
    let files = source.list(&roots, &locations).await?;

    println!("Instruction files ({})", files.len());
    println!("==================");
    println!("  Locations: {}", locations.join(", "));
    for file in &files {
        println!("  {}", file.path());
    }
    if files.is_empty() {
        println!("  (none found)");
    }

    Ok(())
}
