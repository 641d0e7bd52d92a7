//! Failclose Gate - fail-closed access control for axum routes
//!
//! Every guarded route asks the `SafetyEngine` before its handler runs:
//! - allowed: the handler runs and its response is returned unchanged
//! - denied: redirect to the configured forbidden URL, or 403
//! - misconfigured: 500 and an error event, never a silent 403

mod gate;
mod layer;

pub use gate::{intercept_before_dispatch, try_intercept_before_dispatch, Gate};
pub use layer::{FailCloseLayer, FailCloseService};

pub use failclose_core::{mark_safe, FailCloseConfig, HandlerRef, RuleSet, SafetyEngine};
