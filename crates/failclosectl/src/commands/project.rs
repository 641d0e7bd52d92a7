use anyhow::{Context, Result};
use std::path::Path;

use failclose_core::resolve_project_name;

use super::load_config;

/// Print the project name the gate resolves from the configuration
pub fn execute(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let project = resolve_project_name(&config).context("Cannot resolve project name")?;
    println!("{}", project);
    Ok(())
}
