//! RuleSet - the allow-list keyed by application
//!
//! Maps an application label to the handler names whitelisted in it:
//! - empty list: every handler of the application is whitelisted
//! - non-empty list: only the listed handlers are whitelisted
//!
//! The project identifier is a valid key too, for handlers defined at
//! project level outside any application.

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::FailCloseConfig;
use crate::error::{FailCloseError, FailCloseResult};
use crate::registry::AppRegistry;
use crate::resolver::resolve_project_name;

/// Allow-list of handlers per application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whitelist every handler of an application
    pub fn allow_app(mut self, app: impl Into<String>) -> Self {
        self.rules.insert(app.into(), Vec::new());
        self
    }

    /// Whitelist the given handlers of an application
    pub fn allow_handlers<I, S>(mut self, app: impl Into<String>, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .insert(app.into(), handlers.into_iter().map(Into::into).collect());
        self
    }

    /// Whitelisted handler names for an application, if it has an entry
    pub fn get(&self, app: &str) -> Option<&[String]> {
        self.rules.get(app).map(Vec::as_slice)
    }

    /// Application labels in iteration order
    pub fn apps(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse a bare mapping from YAML (or JSON, which is valid YAML)
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

impl<K, V, S> FromIterator<(K, V)> for RuleSet
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            rules: iter
                .into_iter()
                .map(|(app, handlers)| {
                    (app.into(), handlers.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }
}

/// Permissions file layout
///
/// ```yaml
/// rules:
///   failclose: [pretty]
///   foobar: []
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsFile {
    #[serde(default)]
    pub rules: RuleSet,
}

/// Where the engine gets its RuleSet when the caller does not supply one
pub trait RulesSource: Send + Sync {
    fn load(&self) -> FailCloseResult<Arc<RuleSet>>;

    /// Fetch the rules again from their origin. Sources without an
    /// external origin return what `load` returns.
    fn reload(&self) -> FailCloseResult<Arc<RuleSet>> {
        self.load()
    }

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}

/// Fixed in-memory rules
#[derive(Debug, Clone, Default)]
pub struct StaticRules {
    rules: Arc<RuleSet>,
}

impl StaticRules {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

impl From<RuleSet> for StaticRules {
    fn from(rules: RuleSet) -> Self {
        Self::new(rules)
    }
}

impl RulesSource for StaticRules {
    fn load(&self) -> FailCloseResult<Arc<RuleSet>> {
        Ok(Arc::clone(&self.rules))
    }

    fn describe(&self) -> String {
        format!("in-memory rules ({} apps)", self.rules.len())
    }
}

/// Permissions file on disk.
///
/// Read and parsed on the first `load`, then served from memory. Later edits
/// to the file take effect only through `reload`, which keeps the previous
/// rules when the new content cannot be read or parsed.
#[derive(Debug)]
pub struct RulesFile {
    path: PathBuf,
    cached: ArcSwapOption<RuleSet>,
}

impl RulesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: ArcSwapOption::empty(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> FailCloseResult<RuleSet> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| FailCloseError::Io {
            path: self.path.clone(),
            source,
        })?;

        let file: PermissionsFile =
            serde_yaml::from_str(&content).map_err(|source| FailCloseError::Parse {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            "Loaded {} rule entries from {}",
            file.rules.len(),
            self.path.display()
        );
        Ok(file.rules)
    }
}

impl RulesSource for RulesFile {
    fn load(&self) -> FailCloseResult<Arc<RuleSet>> {
        if let Some(rules) = self.cached.load_full() {
            return Ok(rules);
        }
        self.reload()
    }

    fn reload(&self) -> FailCloseResult<Arc<RuleSet>> {
        let rules = Arc::new(self.read()?);
        self.cached.store(Some(Arc::clone(&rules)));
        Ok(rules)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Check that every key names an installed application or the project.
///
/// Fails on the first offending key. The project identifier is resolved
/// only when a key is not an installed application.
pub fn validate_rules(
    rules: &RuleSet,
    registry: &dyn AppRegistry,
    config: &FailCloseConfig,
) -> FailCloseResult<()> {
    let mut unknown = rules
        .apps()
        .filter(|app| !registry.is_registered(app))
        .peekable();

    if unknown.peek().is_none() {
        return Ok(());
    }

    let project = resolve_project_name(config)?;
    for app in unknown {
        if app != project {
            return Err(FailCloseError::config(format!(
                "Rules reference '{}', which is neither an installed app nor the project '{}'",
                app, project
            )));
        }
    }

    Ok(())
}
