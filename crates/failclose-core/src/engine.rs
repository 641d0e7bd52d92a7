//! Safety decision engine
//!
//! Combines the RuleSet with the per-handler safe flag. Evaluation order:
//! 1. validate the RuleSet
//! 2. resolve the handler's application
//! 3. app entry with an empty list, or listing the handler: allow
//! 4. handler marked safe: allow
//! 5. deny
//!
//! An app entry that does not list the handler falls through to step 4;
//! rules only ever add permissions.

use std::fmt;
use std::sync::Arc;

use crate::config::FailCloseConfig;
use crate::error::{FailCloseError, FailCloseResult};
use crate::handler::HandlerRef;
use crate::registry::AppRegistry;
use crate::resolver::{resolve_app_name, resolve_project_name};
use crate::rules::{validate_rules, RuleSet, RulesFile, RulesSource};

/// Why a handler was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// The whole application is whitelisted
    AppWhitelisted,
    /// The handler is listed under its application
    HandlerListed,
    /// The handler was marked safe
    MarkedSafe,
}

impl fmt::Display for AllowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppWhitelisted => write!(f, "app whitelisted"),
            Self::HandlerListed => write!(f, "handler listed in rules"),
            Self::MarkedSafe => write!(f, "marked safe"),
        }
    }
}

/// Verdict for a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyDecision {
    Allow(AllowReason),
    Deny,
}

impl SafetyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny)
    }
}

impl fmt::Display for SafetyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow(reason) => write!(f, "allow ({})", reason),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// A decision together with the application it was made in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub app: String,
    pub decision: SafetyDecision,
}

/// Decides whether handlers may be called
#[derive(Clone)]
pub struct SafetyEngine {
    config: Arc<FailCloseConfig>,
    registry: Arc<dyn AppRegistry>,
    rules_source: Option<Arc<dyn RulesSource>>,
}

impl SafetyEngine {
    /// Create an engine. The rules source is the configured
    /// `permissions_module`, if any.
    pub fn new(config: FailCloseConfig, registry: Arc<dyn AppRegistry>) -> Self {
        let rules_source = config
            .permissions_module
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| Arc::new(RulesFile::new(path.clone())) as Arc<dyn RulesSource>);

        Self {
            config: Arc::new(config),
            registry,
            rules_source,
        }
    }

    /// Create an engine whose registry is the configured `installed_apps`
    pub fn from_config(config: FailCloseConfig) -> Self {
        let registry = Arc::new(config.installed_apps());
        Self::new(config, registry)
    }

    /// Replace the rules source
    pub fn with_rules_source(mut self, source: Arc<dyn RulesSource>) -> Self {
        self.rules_source = Some(source);
        self
    }

    pub fn config(&self) -> &FailCloseConfig {
        &self.config
    }

    pub fn registry(&self) -> &dyn AppRegistry {
        self.registry.as_ref()
    }

    fn rules_source(&self) -> FailCloseResult<&dyn RulesSource> {
        self.rules_source.as_deref().ok_or_else(|| {
            FailCloseError::config("No rules supplied and no permissions_module configured")
        })
    }

    /// RuleSet from the configured source, loaded once and then cached
    pub fn load_rules(&self) -> FailCloseResult<Arc<RuleSet>> {
        self.rules_source()?.load()
    }

    /// Re-read the configured source. On failure the cached rules stay in
    /// effect and the error is returned.
    pub fn reload_rules(&self) -> FailCloseResult<Arc<RuleSet>> {
        let source = self.rules_source()?;
        let rules = source.reload()?;
        tracing::info!(
            "Reloaded {} rule entries from {}",
            rules.len(),
            source.describe()
        );
        Ok(rules)
    }

    pub fn project_name(&self) -> FailCloseResult<String> {
        resolve_project_name(&self.config)
    }

    pub fn app_name(&self, handler: &HandlerRef) -> FailCloseResult<String> {
        resolve_app_name(handler, self.registry.as_ref(), &self.config)
    }

    pub fn validate(&self, rules: &RuleSet) -> FailCloseResult<()> {
        validate_rules(rules, self.registry.as_ref(), &self.config)
    }

    /// Check if a handler may be called
    pub fn is_safe(&self, handler: &HandlerRef, rules: Option<&RuleSet>) -> FailCloseResult<bool> {
        Ok(self.evaluate(handler, rules)?.is_allowed())
    }

    /// Decide for a handler, with the reason when allowed
    pub fn evaluate(
        &self,
        handler: &HandlerRef,
        rules: Option<&RuleSet>,
    ) -> FailCloseResult<SafetyDecision> {
        Ok(self.explain(handler, rules)?.decision)
    }

    /// Decide for a handler and report the application it resolved to
    pub fn explain(&self, handler: &HandlerRef, rules: Option<&RuleSet>) -> FailCloseResult<Verdict> {
        let loaded;
        let rules = match rules {
            Some(rules) => rules,
            None => {
                loaded = self.load_rules()?;
                &*loaded
            }
        };

        self.validate(rules)?;
        let app = self.app_name(handler)?;

        let decision = decide(handler, &app, rules);
        tracing::debug!("Handler {} (app '{}'): {}", handler, app, decision);
        Ok(Verdict { app, decision })
    }
}

fn decide(handler: &HandlerRef, app: &str, rules: &RuleSet) -> SafetyDecision {
    if let Some(handlers) = rules.get(app) {
        if handlers.is_empty() {
            return SafetyDecision::Allow(AllowReason::AppWhitelisted);
        }
        if handlers.iter().any(|name| *name == handler.name) {
            return SafetyDecision::Allow(AllowReason::HandlerListed);
        }
    }

    if handler.is_marked_safe() {
        return SafetyDecision::Allow(AllowReason::MarkedSafe);
    }

    SafetyDecision::Deny
}

impl fmt::Debug for SafetyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyEngine")
            .field("config", &self.config)
            .field(
                "rules_source",
                &self.rules_source.as_ref().map(|source| source.describe()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::mark_safe;
    use crate::registry::InstalledApps;
    use crate::rules::StaticRules;

    fn engine() -> SafetyEngine {
        let config = FailCloseConfig::new()
            .with_project_name("foobar")
            .with_installed_app("failclose");
        SafetyEngine::from_config(config)
    }

    fn ugly() -> HandlerRef {
        HandlerRef::new("failclose.tests.urls", "ugly")
    }

    #[test]
    fn test_with_no_rules() {
        let err = engine().is_safe(&ugly(), None).unwrap_err();
        assert!(matches!(err, FailCloseError::Configuration(_)));
        assert!(matches!(
            engine().reload_rules(),
            Err(FailCloseError::Configuration(_))
        ));
    }

    #[test]
    fn test_unsafe_handler() {
        assert!(!engine().is_safe(&ugly(), Some(&RuleSet::new())).unwrap());
    }

    #[test]
    fn test_decorated_handler() {
        let handler = mark_safe(ugly());
        assert_eq!(
            engine().evaluate(&handler, Some(&RuleSet::new())).unwrap(),
            SafetyDecision::Allow(AllowReason::MarkedSafe)
        );
    }

    #[test]
    fn test_handler_in_rules() {
        let rules = RuleSet::new().allow_handlers("failclose", ["ugly"]);
        assert_eq!(
            engine().evaluate(&ugly(), Some(&rules)).unwrap(),
            SafetyDecision::Allow(AllowReason::HandlerListed)
        );
    }

    #[test]
    fn test_handler_in_whitelisted_app() {
        let rules = RuleSet::new().allow_app("failclose");
        assert_eq!(
            engine().evaluate(&ugly(), Some(&rules)).unwrap(),
            SafetyDecision::Allow(AllowReason::AppWhitelisted)
        );
    }

    #[test]
    fn test_app_namespaces_are_followed() {
        let rules = RuleSet::new().allow_handlers("foobar", ["ugly"]);
        assert!(!engine().is_safe(&ugly(), Some(&rules)).unwrap());
    }

    #[test]
    fn test_unlisted_handler_falls_through_to_flag() {
        let rules = RuleSet::new().allow_handlers("failclose", ["pretty"]);

        assert!(!engine().is_safe(&ugly(), Some(&rules)).unwrap());
        assert_eq!(
            engine().evaluate(&mark_safe(ugly()), Some(&rules)).unwrap(),
            SafetyDecision::Allow(AllowReason::MarkedSafe)
        );
    }

    #[test]
    fn test_rules_take_precedence_in_reason() {
        let rules = RuleSet::new().allow_app("failclose");
        assert_eq!(
            engine().evaluate(&mark_safe(ugly()), Some(&rules)).unwrap(),
            SafetyDecision::Allow(AllowReason::AppWhitelisted)
        );
    }

    #[test]
    fn test_invalid_rules_error_before_decision() {
        let rules = RuleSet::new().allow_app("shire");
        let err = engine().is_safe(&mark_safe(ugly()), Some(&rules)).unwrap_err();
        assert!(err.to_string().contains("shire"));
    }

    #[test]
    fn test_unresolvable_handler_errors() {
        let handler = mark_safe(HandlerRef::new("mordor.views", "gate"));
        assert!(engine().is_safe(&handler, Some(&RuleSet::new())).is_err());
    }

    #[test]
    fn test_injected_rules_source() {
        let rules = StaticRules::new(RuleSet::new().allow_app("failclose"));
        let engine = engine().with_rules_source(Arc::new(rules));
        assert!(engine.is_safe(&ugly(), None).unwrap());
    }

    #[test]
    fn test_explain_reports_resolved_app() {
        let rules = RuleSet::new().allow_app("foobar");
        let handler = HandlerRef::new("foobar.views", "index");

        let verdict = engine().explain(&handler, Some(&rules)).unwrap();
        assert_eq!(verdict.app, "foobar");
        assert_eq!(verdict.decision, SafetyDecision::Allow(AllowReason::AppWhitelisted));

        let verdict = engine().explain(&ugly(), Some(&rules)).unwrap();
        assert_eq!(verdict.app, "failclose");
        assert_eq!(verdict.decision, SafetyDecision::Deny);
    }

    #[test]
    fn test_custom_registry() {
        let registry = Arc::new(InstalledApps::from_paths(["demo"]));
        let engine = SafetyEngine::new(FailCloseConfig::new(), registry);
        let handler = HandlerRef::new("demo.views", "pretty");

        assert!(engine.is_safe(&mark_safe(handler.clone()), Some(&RuleSet::new())).unwrap());
        assert!(!engine.is_safe(&handler, Some(&RuleSet::new())).unwrap());
    }
}
