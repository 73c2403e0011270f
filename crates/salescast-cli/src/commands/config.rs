//! Settings inspection command

use std::path::Path;

use anyhow::{Context, Result};
use salescast_core::config::default_config_path;
use salescast_core::Settings;

use super::print_json;

pub fn cmd_config(config: Option<&Path>, show_path: bool, json: bool) -> Result<()> {
    if show_path {
        match default_config_path() {
            Some(path) => {
                let state = if path.exists() { "exists" } else { "not created" };
                println!("{} ({})", path.display(), state);
            }
            None => println!("No config directory available on this platform"),
        }
        return Ok(());
    }

    let settings = Settings::load(config).context("Failed to load settings")?;

    if json {
        return print_json(&settings);
    }

    let source = match config {
        Some(path) => path.display().to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };

    println!("# Settings from {}", source);
    println!(
        "{}",
        toml::to_string_pretty(&settings).context("Failed to format settings")?
    );
    Ok(())
}
