//! Trust-context Tower middleware.
//!
//! `TrustLayer` and `TrustService` wrap the backend's routes with trust
//! validation: the dispatcher-injected headers must be present, the
//! asserted tenant must be the tenant this backend serves, and when a
//! gateway token is configured it must match. A backend never treats
//! direct, unmediated traffic as if it came from the dispatcher.
//!
//! On success the parsed [`TrustContext`] is inserted into request
//! extensions where handlers read it.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use tollgate_core::context::constant_eq;
use tollgate_core::{TenantId, TrustContext};
use tower::{Layer, Service};

pub use tollgate_core::context::HEADER_GATEWAY_TOKEN;

/// What this backend requires of inbound requests.
#[derive(Debug, Clone)]
struct TrustPolicy {
    tenant_id: TenantId,
    gateway_token: Option<String>,
}

/// Tower `Layer` that wraps services with trust-context validation.
#[derive(Clone)]
pub struct TrustLayer {
    policy: Arc<TrustPolicy>,
}

impl TrustLayer {
    /// Creates a layer for the tenant this backend serves.
    pub fn new(tenant_id: TenantId, gateway_token: Option<String>) -> Self {
        Self {
            policy: Arc::new(TrustPolicy {
                tenant_id,
                gateway_token,
            }),
        }
    }
}

impl<S> Layer<S> for TrustLayer {
    type Service = TrustService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TrustService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Tower `Service` that validates the trust context before forwarding.
#[derive(Clone)]
pub struct TrustService<S> {
    inner: S,
    policy: Arc<TrustPolicy>,
}

impl<S> Service<Request<Body>> for TrustService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let policy = self.policy.clone();

        Box::pin(async move {
            // Shared secret, when configured.
            if let Some(expected) = &policy.gateway_token {
                let presented = req
                    .headers()
                    .get(HEADER_GATEWAY_TOKEN)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if !constant_eq(presented, expected) {
                    return Ok(reject(
                        StatusCode::UNAUTHORIZED,
                        "missing or invalid gateway token",
                    ));
                }
            }

            // All trust headers must be present and well-formed.
            let headers = req.headers();
            let ctx = match TrustContext::from_header_lookup(|name| {
                headers.get(name).and_then(|v| v.to_str().ok())
            }) {
                Ok(ctx) => ctx,
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected request without trust context");
                    return Ok(reject(StatusCode::UNAUTHORIZED, &e.to_string()));
                }
            };

            // The asserted tenant must be the one this backend serves.
            if ctx.tenant_id != policy.tenant_id {
                tracing::warn!(
                    target: "tollgate::audit",
                    asserted = %ctx.tenant_id,
                    served = %policy.tenant_id,
                    "Rejected request for foreign tenant"
                );
                return Ok(reject(StatusCode::FORBIDDEN, "tenant mismatch"));
            }

            req.extensions_mut().insert(ctx);
            let resp = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

/// Builds a rejection response with a JSON error body.
fn reject(status: StatusCode, message: &str) -> axum::response::Response {
    let body = serde_json::json!({
        "error": {
            "category": "untrusted",
            "message": message,
        }
    });
    (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response()
}
