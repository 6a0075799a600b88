use std::path::Path;

use anyhow::Result;

use scrollwright_core::AppConfig;

pub fn run(config: &AppConfig, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            config.save(path)?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    if path.exists() {
        println!("# Loaded from {}", path.display());
    } else {
        println!("# Defaults ({} not found)", path.display());
    }
    println!("{}", toml::to_string_pretty(config)?);

    Ok(())
}
