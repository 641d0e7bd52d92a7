pub mod check;
pub mod demo;
pub mod project;
pub mod validate;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use failclose_core::{FailCloseConfig, RuleSet, RulesFile, RulesSource, SafetyEngine};

/// Load the gate configuration file
pub(crate) fn load_config(path: &Path) -> Result<FailCloseConfig> {
    let config = FailCloseConfig::from_yaml_file(path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}

/// Load rules from an explicit file, or from the engine's configured source
pub(crate) fn load_rules(engine: &SafetyEngine, rules: Option<&Path>) -> Result<Arc<RuleSet>> {
    let rules = match rules {
        Some(path) => RulesFile::new(path).load(),
        None => engine.load_rules(),
    };
    rules.context("Failed to load rules")
}
