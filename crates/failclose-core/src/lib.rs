// Failclose Core - Fail-closed safety decisions for request handlers
//
// Every handler is forbidden unless it is explicitly declared safe, either
// with `mark_safe` at definition time or through a RuleSet that whitelists
// whole applications or individual handlers.

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod registry;
pub mod resolver;
pub mod rules;

pub use config::FailCloseConfig;
pub use engine::{AllowReason, SafetyDecision, SafetyEngine, Verdict};
pub use error::{FailCloseError, FailCloseResult};
pub use handler::{mark_safe, HandlerRef};
pub use registry::{AppLookup, AppRegistry, InstalledApps};
pub use resolver::{resolve_app_name, resolve_project_name};
pub use rules::{validate_rules, PermissionsFile, RuleSet, RulesFile, RulesSource, StaticRules};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
