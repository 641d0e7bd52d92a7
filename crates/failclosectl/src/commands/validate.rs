//! Validate a rules file against the configured apps and project

use anyhow::{Context, Result};
use std::path::Path;

use failclose_core::SafetyEngine;

use super::{load_config, load_rules};

pub fn execute(config_path: &Path, rules: Option<&Path>) -> Result<()> {
    let engine = SafetyEngine::from_config(load_config(config_path)?);
    let rules = load_rules(&engine, rules)?;

    engine.validate(&rules).context("Invalid rules")?;

    println!("Rules OK: {} app entries", rules.len());
    for app in rules.apps() {
        match rules.get(app) {
            Some([]) => println!("  {}: all handlers", app),
            Some(handlers) => println!("  {}: {}", app, handlers.join(", ")),
            None => {}
        }
    }
    Ok(())
}
