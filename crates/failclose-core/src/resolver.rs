//! Handler identity resolution
//!
//! Works out which application a handler belongs to, falling back to the
//! project identifier for handlers defined at project level.

use crate::config::FailCloseConfig;
use crate::error::{FailCloseError, FailCloseResult};
use crate::handler::HandlerRef;
use crate::registry::{AppLookup, AppRegistry};

/// Resolve the project identifier.
///
/// An explicit `project_name` wins. Otherwise `root_urlconf` must be of the
/// form "<project>.<module>" and the first segment is returned.
pub fn resolve_project_name(config: &FailCloseConfig) -> FailCloseResult<String> {
    if let Some(name) = config.explicit_project_name() {
        return Ok(name.to_string());
    }

    let urlconf = config.root_urlconf.as_deref().unwrap_or_default().trim();
    let segments: Vec<&str> = urlconf.split('.').collect();

    match segments.as_slice() {
        [project, module] if !project.is_empty() && !module.is_empty() => Ok(project.to_string()),
        _ => Err(FailCloseError::config(format!(
            "Cannot derive the project name from root_urlconf '{}'; set project_name",
            urlconf
        ))),
    }
}

/// Resolve the application a handler belongs to.
///
/// Scans the handler's module path in order and returns the first segment
/// the registry reports as installed. Misses are tolerated. If nothing
/// matches but the project identifier is one of the segments, the handler
/// is project-level and the project identifier is returned.
pub fn resolve_app_name(
    handler: &HandlerRef,
    registry: &dyn AppRegistry,
    config: &FailCloseConfig,
) -> FailCloseResult<String> {
    for segment in handler.segments() {
        match registry.lookup(segment) {
            AppLookup::Registered => {
                tracing::debug!("Handler {} belongs to app '{}'", handler, segment);
                return Ok(segment.to_string());
            }
            AppLookup::NotFound => {}
            AppLookup::Unavailable(reason) => {
                tracing::debug!("App lookup for '{}' unavailable: {}", segment, reason);
            }
        }
    }

    let project = resolve_project_name(config)?;
    if handler.segments().any(|segment| segment == project) {
        tracing::debug!("Handler {} is project-level ('{}')", handler, project);
        return Ok(project);
    }

    Err(FailCloseError::config(format!(
        "Handler '{}' at '{}' does not belong to an installed app or the project '{}'",
        handler.name, handler.qualified_path, project
    )))
}
