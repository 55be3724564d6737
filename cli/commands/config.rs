use anyhow::{Context, Result};
use repo2text_core::Config;
use repo2text_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

/// Prints a complete default config, ready to save as `.repo2text/repo2text.toml`.
pub fn handle_config_command() -> Result<()> {
    let toml = Config::default()
        .to_toml_string()
        .context("Failed to serialize default configuration")?;
    println!(
        "# Save as {}/{} in the project root.\n{}",
        DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME, toml
    );
    Ok(())
}
