//! Demo command - serves a two-route application behind the gate
//!
//! `/pretty/` is marked safe and always answers. `/ugly/` is not, so it is
//! forbidden unless the rules whitelist it.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use failclose_core::RuleSet;
use failclose_gate::{mark_safe, FailCloseConfig, Gate, HandlerRef};
use tower_http::trace::TraceLayer;
use tracing::info;

const DEMO_APP: &str = "demo";
const DEMO_MODULE: &str = "demo.views";

async fn pretty() -> impl IntoResponse {
    "Salutations from the pretty view!"
}

async fn ugly() -> impl IntoResponse {
    "Ugly view says 'Hi' too."
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Gate for the demo: the demo app is always installed, and without a
/// permissions_module the RuleSet is empty.
pub(crate) fn demo_gate(mut config: FailCloseConfig) -> Gate {
    if !config.installed_apps.iter().any(|app| app == DEMO_APP) {
        config.installed_apps.push(DEMO_APP.to_string());
    }

    let has_rules_source = config.permissions_module.is_some();
    let gate = Gate::from_config(config);
    if has_rules_source {
        gate
    } else {
        gate.with_rules(RuleSet::new())
    }
}

pub(crate) fn demo_router(gate: &Gate) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/pretty/",
            get(pretty).layer(gate.guard(mark_safe(HandlerRef::new(DEMO_MODULE, "pretty")))),
        )
        .route(
            "/ugly/",
            get(ugly).layer(gate.guard(HandlerRef::new(DEMO_MODULE, "ugly"))),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn execute(config_path: &Path, host: &str, port: u16) -> Result<()> {
    let config = if config_path.exists() {
        super::load_config(config_path)?
    } else {
        info!("No config at {}, using defaults", config_path.display());
        FailCloseConfig::new()
    };

    let gate = demo_gate(config);
    let app = demo_router(&gate);

    let allowed = gate.check_routes().context("Gate configuration is invalid")?;
    info!("{} of {} guarded routes allowed", allowed, gate.routes().len());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", host, port))?;

    println!("Demo server starting on http://{}", addr);
    println!("  GET /pretty/  - marked safe");
    println!("  GET /ugly/    - forbidden unless whitelisted");
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\nShutdown signal received, stopping server...");
            }
        })
        .await
        .context("Server error")?;

    println!("Server stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use failclose_core::AppRegistry;

    #[test]
    fn test_demo_gate_installs_demo_app() {
        let gate = demo_gate(FailCloseConfig::new());
        let _app = demo_router(&gate);

        assert!(gate.engine().registry().is_registered(DEMO_APP));
        assert_eq!(gate.check_routes().unwrap(), 1);
    }

    #[test]
    fn test_demo_gate_does_not_duplicate_app() {
        let gate = demo_gate(FailCloseConfig::new().with_installed_app("demo"));
        assert_eq!(gate.engine().config().installed_apps, vec!["demo".to_string()]);
    }
}
