//! Init command - initialize configuration file.

use tilegrab::config::{config_file_path, ConfigFile, ENV_API_KEY};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    // Keep existing settings when re-running init.
    let config = ConfigFile::load().unwrap_or_default();
    config.save().map_err(|e| CliError::Config(e.to_string()))?;

    let path = config_file_path();
    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize tilegrab settings.");
    println!("Set your MapTiler API key there or via the {} variable.", ENV_API_KEY);
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
