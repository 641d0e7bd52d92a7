//! Handler identity and the `mark_safe` annotation
//!
//! A `HandlerRef` names a request handler by the dotted module path it is
//! defined in plus its bare name. The safe flag is a typed field set once
//! at definition time, before the handler is reachable from routing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FailCloseError;

/// Reference to a request handler
///
/// The safe flag can only be set, through `mark_safe`:
///
/// ```compile_fail
/// use failclose_core::{mark_safe, HandlerRef};
///
/// let mut handler = mark_safe(HandlerRef::new("demo.views", "pretty"));
/// handler.marked_safe = false;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Dotted module path (e.g. "project.app.views")
    pub qualified_path: String,

    /// Bare handler name (e.g. "index")
    pub name: String,

    #[serde(default)]
    marked_safe: bool,
}

impl HandlerRef {
    pub fn new(qualified_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualified_path: qualified_path.into(),
            name: name.into(),
            marked_safe: false,
        }
    }

    /// Mark this handler as safe to be called
    pub fn mark_safe(mut self) -> Self {
        self.marked_safe = true;
        self
    }

    pub fn is_marked_safe(&self) -> bool {
        self.marked_safe
    }

    /// Path segments in order, empty segments skipped
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.qualified_path.split('.').filter(|s| !s.is_empty())
    }
}

/// Marks a handler as safe to be called.
///
/// Pure tagging: the identity and name of the handler are preserved.
pub fn mark_safe(handler: HandlerRef) -> HandlerRef {
    handler.mark_safe()
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualified_path.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.qualified_path, self.name)
        }
    }
}

impl FromStr for HandlerRef {
    type Err = FailCloseError;

    /// Parse "demo.views.pretty" into path "demo.views" and name "pretty"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.rsplit_once('.') {
            Some((path, name)) if !path.is_empty() && !name.is_empty() => {
                Ok(Self::new(path, name))
            }
            _ => Err(FailCloseError::config(format!(
                "Handler '{}' must be a dotted path of the form <module>.<name>",
                s
            ))),
        }
    }
}
