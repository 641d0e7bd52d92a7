// Failclose Core - Application registry
//
// The gate never owns the list of applications. The host answers
// "does application X exist?" through `AppRegistry`; a miss is a normal
// answer and never fatal on its own.

use std::collections::BTreeSet;

/// Answer to a registry lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppLookup {
    /// The application is installed
    Registered,
    /// No application with that label
    NotFound,
    /// The registry could not answer (e.g. the app failed to import)
    Unavailable(String),
}

impl AppLookup {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// Capability for querying the host's installed applications
pub trait AppRegistry: Send + Sync {
    /// Look up an application by label
    fn lookup(&self, app: &str) -> AppLookup;

    /// Check if an application is registered; misses of any kind are `false`
    fn is_registered(&self, app: &str) -> bool {
        self.lookup(app).is_registered()
    }
}

/// Registry backed by a static list of installed applications.
///
/// Applications are listed by module path and known by their label, the
/// last dotted segment: "django.contrib.auth" is registered as "auth".
#[derive(Debug, Clone, Default)]
pub struct InstalledApps {
    labels: BTreeSet<String>,
}

impl InstalledApps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut apps = Self::new();
        for path in paths {
            apps.install(path.as_ref());
        }
        apps
    }

    /// Install an application by module path
    pub fn install(&mut self, path: &str) {
        if let Some(label) = app_label(path) {
            tracing::debug!("Installed app: {} (label '{}')", path, label);
            self.labels.insert(label.to_string());
        }
    }

    /// Get installed labels
    pub fn labels(&self) -> Vec<&str> {
        self.labels.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl AppRegistry for InstalledApps {
    fn lookup(&self, app: &str) -> AppLookup {
        if self.labels.contains(app) {
            AppLookup::Registered
        } else {
            AppLookup::NotFound
        }
    }
}

fn app_label(path: &str) -> Option<&str> {
    path.trim().rsplit('.').next().filter(|label| !label.is_empty())
}
