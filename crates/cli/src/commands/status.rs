//! `attachkit status` — Show effective configuration.

use attachkit_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("📎 attachkit Status");
    println!("==================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  File limit:    {}", config.attachments.max_files);
    println!(
        "  Instructions:  {}",
        if config.instructions.enabled { "enabled" } else { "disabled" }
    );
    println!("  Locations:     {}", config.instructions.locations().join(", "));
    println!("  Extension:     {}", config.instructions.extension);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — defaults in effect. Example:\n");
        for line in AppConfig::default_toml().lines() {
            println!("    {line}");
        }
    }

    Ok(())
}
