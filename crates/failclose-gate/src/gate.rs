//! Gate - request interception in front of handler dispatch
//!
//! The gate owns the engine and the forbidden-response policy, hands out a
//! `FailCloseLayer` per guarded route, and remembers every guarded handler
//! so configuration defects can be surfaced at startup.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use failclose_core::{
    FailCloseConfig, FailCloseError, FailCloseResult, HandlerRef, RuleSet, SafetyDecision,
    SafetyEngine,
};
use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::layer::FailCloseLayer;

/// Access gate shared by every guarded route
#[derive(Debug, Clone)]
pub struct Gate {
    engine: Arc<SafetyEngine>,
    /// Static rules; the engine's rules source is used when unset
    rules: Option<Arc<RuleSet>>,
    routes: Arc<RwLock<Vec<HandlerRef>>>,
}

impl Gate {
    pub fn new(engine: SafetyEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            rules: None,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Gate whose registry is the configured `installed_apps`
    pub fn from_config(config: FailCloseConfig) -> Self {
        Self::new(SafetyEngine::from_config(config))
    }

    /// Evaluate against fixed rules instead of the engine's rules source
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(Arc::new(rules));
        self
    }

    pub fn engine(&self) -> &SafetyEngine {
        &self.engine
    }

    /// Layer guarding a single route
    pub fn guard(&self, handler: HandlerRef) -> FailCloseLayer {
        {
            let mut routes = self.routes.write();
            if !routes.contains(&handler) {
                routes.push(handler.clone());
            }
        }
        FailCloseLayer::new(self.clone(), handler)
    }

    /// Handlers guarded so far
    pub fn routes(&self) -> Vec<HandlerRef> {
        self.routes.read().clone()
    }

    pub fn evaluate(&self, handler: &HandlerRef) -> FailCloseResult<SafetyDecision> {
        self.engine.evaluate(handler, self.rules.as_deref())
    }

    /// Pick up edits to the permissions file. Requests keep using the
    /// previous rules if the file cannot be read or parsed.
    pub fn reload_rules(&self) -> FailCloseResult<usize> {
        Ok(self.engine.reload_rules()?.len())
    }

    /// Evaluate every guarded handler once.
    ///
    /// Returns the number of handlers allowed, or the first configuration
    /// error. Meant to run before serving traffic.
    pub fn check_routes(&self) -> FailCloseResult<usize> {
        let mut allowed = 0;
        for handler in self.routes() {
            let decision = self.evaluate(&handler)?;
            info!("Route {}: {}", handler, decision);
            if decision.is_allowed() {
                allowed += 1;
            }
        }
        Ok(allowed)
    }

    /// Response for a denied request: redirect to `forbidden_url` when
    /// configured, 403 otherwise
    pub fn forbidden_response(&self) -> Response {
        match self.engine.config().forbidden_url() {
            Some(url) => {
                (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
            }
            None => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        }
    }
}

/// Decide for `handler` and either dispatch `request` or answer with the
/// forbidden response.
///
/// On allow the handler's response is returned unchanged. Configuration
/// errors are returned to the caller, never turned into a 403.
pub async fn intercept_before_dispatch<F, Fut, R>(
    gate: &Gate,
    handler: &HandlerRef,
    request: Request,
    dispatch: F,
) -> FailCloseResult<Response>
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = R>,
    R: IntoResponse,
{
    let dispatched = try_intercept_before_dispatch(gate, handler, request, move |req| async move {
        Ok::<_, Infallible>(dispatch(req).await.into_response())
    })
    .await?;

    Ok(match dispatched {
        Ok(response) => response,
        Err(never) => match never {},
    })
}

/// `intercept_before_dispatch` for a fallible dispatcher such as a tower
/// service. The dispatcher's own error is passed through untouched.
pub async fn try_intercept_before_dispatch<F, Fut, E>(
    gate: &Gate,
    handler: &HandlerRef,
    request: Request,
    dispatch: F,
) -> FailCloseResult<Result<Response, E>>
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Result<Response, E>>,
{
    let decision = gate.evaluate(handler)?;

    if decision.is_allowed() {
        info!(
            "Allowed {} {} -> {} ({})",
            request.method(),
            request.uri(),
            handler,
            decision
        );
        Ok(dispatch(request).await)
    } else {
        warn!("Denied {} {} -> {}", request.method(), request.uri(), handler);
        Ok(Ok(gate.forbidden_response()))
    }
}

/// Operator-facing response for a configuration defect
pub(crate) fn configuration_error_response(handler: &HandlerRef, err: &FailCloseError) -> Response {
    error!("failclose is misconfigured while guarding {}: {}", handler, err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Access gate misconfigured").into_response()
}
