//! Init command handler

use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Edit config.toml and run again.");
    } else {
        println!(
            "Config file already exists at {}",
            Config::default_config_path().display()
        );
    }
    Ok(())
}
