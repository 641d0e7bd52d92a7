//! Per-route tower layer
//!
//! ```ignore
//! let gate = Gate::from_config(config);
//! let app = Router::new()
//!     .route("/pretty/", get(pretty).layer(gate.guard(mark_safe(HandlerRef::new("demo.views", "pretty")))))
//!     .route("/ugly/", get(ugly).layer(gate.guard(HandlerRef::new("demo.views", "ugly"))));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use failclose_core::HandlerRef;
use tower::{Layer, Service};

use crate::gate::{configuration_error_response, try_intercept_before_dispatch, Gate};

/// Layer that runs the failclose decision before the wrapped route
#[derive(Debug, Clone)]
pub struct FailCloseLayer {
    gate: Gate,
    handler: Arc<HandlerRef>,
}

impl FailCloseLayer {
    pub fn new(gate: Gate, handler: HandlerRef) -> Self {
        Self {
            gate,
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }
}

impl<S> Layer<S> for FailCloseLayer {
    type Service = FailCloseService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FailCloseService {
            inner,
            gate: self.gate.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Service produced by `FailCloseLayer`
#[derive(Debug, Clone)]
pub struct FailCloseService<S> {
    inner: S,
    gate: Gate,
    handler: Arc<HandlerRef>,
}

impl<S> Service<Request> for FailCloseService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let gate = self.gate.clone();
        let handler = Arc::clone(&self.handler);

        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match try_intercept_before_dispatch(&gate, &handler, req, |req| inner.call(req)).await {
                Ok(dispatched) => dispatched,
                Err(err) => Ok(configuration_error_response(&handler, &err)),
            }
        })
    }
}
