//! Explain the decision for a single handler

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use failclose_core::{HandlerRef, SafetyDecision, SafetyEngine, Verdict};

use super::{load_config, load_rules};

#[derive(Debug, Serialize)]
struct CheckReport {
    handler: String,
    app: String,
    marked_safe: bool,
    allowed: bool,
    reason: Option<String>,
}

pub fn execute(
    config_path: &Path,
    handler: &str,
    safe: bool,
    rules: Option<&Path>,
    output: &str,
) -> Result<()> {
    let mut handler: HandlerRef = handler.parse()?;
    if safe {
        handler = handler.mark_safe();
    }

    let engine = SafetyEngine::from_config(load_config(config_path)?);
    let rules = load_rules(&engine, rules)?;

    let Verdict { app, decision } = engine
        .explain(&handler, Some(&*rules))
        .with_context(|| format!("Cannot decide for {}", handler))?;

    let report = CheckReport {
        handler: handler.to_string(),
        app,
        marked_safe: handler.is_marked_safe(),
        allowed: decision.is_allowed(),
        reason: match decision {
            SafetyDecision::Allow(reason) => Some(reason.to_string()),
            SafetyDecision::Deny => None,
        },
    };

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => {
            println!("Handler:      {}", report.handler);
            println!("App:          {}", report.app);
            println!("Marked safe:  {}", report.marked_safe);
            println!("Decision:     {}", decision);
        }
        other => anyhow::bail!("Unknown output format: {} (expected text or json)", other),
    }

    Ok(())
}
