// Failclose Core - Gate configuration
//
// Everything the gate reads from the host's settings, as one explicit value
// passed to the engine at construction instead of ambient process state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FailCloseError, FailCloseResult};
use crate::registry::InstalledApps;

/// Gate configuration
///
/// Example:
/// ```yaml
/// project_name: foobar
/// root_urlconf: foobar.urls
/// permissions_module: ${FAILCLOSE_RULES}
/// forbidden_url: /login/
/// installed_apps:
///   - django.contrib.auth
///   - demo
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailCloseConfig {
    /// Explicit project identifier; wins over `root_urlconf` when non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Root routing module, "<project>.urls"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_urlconf: Option<String>,

    /// Permissions file holding the RuleSet, read on every decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions_module: Option<PathBuf>,

    /// Where denied requests are redirected; 403 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_url: Option<String>,

    /// Installed application module paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed_apps: Vec<String>,
}

impl FailCloseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_root_urlconf(mut self, urlconf: impl Into<String>) -> Self {
        self.root_urlconf = Some(urlconf.into());
        self
    }

    pub fn with_permissions_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.permissions_module = Some(path.into());
        self
    }

    pub fn with_forbidden_url(mut self, url: impl Into<String>) -> Self {
        self.forbidden_url = Some(url.into());
        self
    }

    pub fn with_installed_app(mut self, app: impl Into<String>) -> Self {
        self.installed_apps.push(app.into());
        self
    }

    /// Parse from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.expand_env_vars();
        Ok(config)
    }

    /// Load from YAML file.
    ///
    /// A relative `permissions_module` is resolved against the directory
    /// holding the configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> FailCloseResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FailCloseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&content).map_err(|source| FailCloseError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let (Some(rules), Some(dir)) = (config.permissions_module.as_mut(), path.parent()) {
            if rules.is_relative() {
                *rules = dir.join(&*rules);
            }
        }

        tracing::debug!("Loaded failclose config from {}", path.display());
        Ok(config)
    }

    /// Non-empty explicit project name
    pub fn explicit_project_name(&self) -> Option<&str> {
        self.project_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Non-empty forbidden URL
    pub fn forbidden_url(&self) -> Option<&str> {
        self.forbidden_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Registry built from `installed_apps`
    pub fn installed_apps(&self) -> InstalledApps {
        InstalledApps::from_paths(&self.installed_apps)
    }

    /// Expand ${VAR_NAME} references in string settings
    pub fn expand_env_vars(&mut self) {
        for value in [
            &mut self.project_name,
            &mut self.root_urlconf,
            &mut self.forbidden_url,
        ]
        .into_iter()
        .flatten()
        {
            *value = expand_env_var(value);
        }

        if let Some(ref permissions) = self.permissions_module {
            let expanded = expand_env_var(&permissions.to_string_lossy());
            self.permissions_module = Some(PathBuf::from(expanded));
        }

        for app in &mut self.installed_apps {
            *app = expand_env_var(app);
        }
    }
}

/// Expand ${VAR_NAME} patterns in a string; unset variables are left as is
fn expand_env_var(value: &str) -> String {
    let Ok(re) = regex::Regex::new(r"\$\{([^}]+)\}") else {
        return value.to_string();
    };

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        let var_name = &cap[1];
        if let Ok(var_value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &var_value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
project_name: foobar
root_urlconf: foobar.urls
permissions_module: permissions.yaml
forbidden_url: /login/
installed_apps:
  - django.contrib.auth
  - failclose
"#;

        let config = FailCloseConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.explicit_project_name(), Some("foobar"));
        assert_eq!(config.root_urlconf.as_deref(), Some("foobar.urls"));
        assert_eq!(config.forbidden_url(), Some("/login/"));
        assert_eq!(config.installed_apps.len(), 2);
        assert!(config.installed_apps().labels().contains(&"auth"));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = FailCloseConfig::from_yaml("{}").unwrap();
        assert_eq!(config, FailCloseConfig::default());
        assert!(config.explicit_project_name().is_none());
        assert!(config.forbidden_url().is_none());
    }

    #[test]
    fn test_blank_settings_count_as_unset() {
        let config = FailCloseConfig::new()
            .with_project_name("  ")
            .with_forbidden_url("");

        assert!(config.explicit_project_name().is_none());
        assert!(config.forbidden_url().is_none());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("FAILCLOSE_TEST_PROJECT", "mordor");
        let config = FailCloseConfig::from_yaml(
            "project_name: ${FAILCLOSE_TEST_PROJECT}\nforbidden_url: ${FAILCLOSE_TEST_UNSET_VAR}\n",
        )
        .unwrap();

        assert_eq!(config.explicit_project_name(), Some("mordor"));
        assert_eq!(config.forbidden_url(), Some("${FAILCLOSE_TEST_UNSET_VAR}"));
    }

    #[test]
    fn test_relative_permissions_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("failclose.yaml");
        std::fs::write(&config_path, "permissions_module: rules/permissions.yaml\n").unwrap();

        let config = FailCloseConfig::from_yaml_file(&config_path).unwrap();
        assert_eq!(
            config.permissions_module,
            Some(dir.path().join("rules/permissions.yaml"))
        );
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = FailCloseConfig::from_yaml_file("/nonexistent/failclose.yaml").unwrap_err();
        assert!(matches!(err, FailCloseError::Io { .. }));
    }
}
