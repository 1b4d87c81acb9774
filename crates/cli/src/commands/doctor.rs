//! `attachkit doctor` — Diagnose configuration and instruction locations.

use attachkit_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 attachkit Doctor — Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");
                config
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
                AppConfig::default()
            }
        }
    } else {
        println!("  ⚠️  No config file — using defaults");
        AppConfig::default()
    };

    if config.attachments.max_files == 0 {
        println!("  ⚠️  attachments.max_files is 0 — every file attachment will be queued");
        issues += 1;
    }

    // Check instruction locations relative to the current directory
    let cwd = std::env::current_dir()?;
    for location in config.instructions.locations() {
        let dir = cwd.join(&location);
        if dir.is_dir() {
            println!("  ✅ Instruction location '{location}' exists");
        } else {
            println!("  ⚠️  Instruction location '{location}' not found in {}", cwd.display());
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
