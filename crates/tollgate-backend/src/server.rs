//! Backend server assembly.
//!
//! [`BackendServer::new`] is the one way to build a tenant backend: a
//! fixed assembly function over a capability registry and a
//! [`BackendConfig`]. The per-invocation order is part of the template
//! and cannot be altered by tenant definitions:
//!
//! 1. trust middleware (headers, tenant match, gateway token)
//! 2. pipeline stages (rate limit, audit)
//! 3. registry resolution
//! 4. handler invocation under a bounded timeout
//! 5. normalization into the response envelope

use axum::extract::{Extension, Json, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tollgate_core::{
    HandlerFailure, InvocationRequest, InvocationResponse, Result, TenantId, TrustContext,
};
use tollgate_registry::CapabilityRegistry;

use crate::config::BackendConfig;
use crate::introspect;
use crate::pipeline::Pipeline;
use crate::trust::TrustLayer;

/// Shared request-handling state.
#[derive(Clone)]
pub struct AppState {
    /// The tenant this backend serves.
    pub tenant_id: TenantId,
    /// The tenant-scoped registry.
    pub registry: Arc<CapabilityRegistry>,
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) handler_timeout: Duration,
}

/// A runnable tenant backend.
pub struct BackendServer {
    config: BackendConfig,
    state: AppState,
}

impl BackendServer {
    /// Assembles a backend for one tenant.
    ///
    /// The tenant identity, timeouts, and middleware options all come
    /// from `config`; the capability set comes from `registry`. Nothing
    /// else varies between tenants.
    pub fn new(config: BackendConfig, registry: CapabilityRegistry) -> Self {
        let state = AppState {
            tenant_id: config.tenant_id.clone(),
            registry: Arc::new(registry),
            pipeline: Arc::new(Pipeline::standard(config.rate_limit.clone())),
            handler_timeout: config.handler_timeout,
        };
        Self { config, state }
    }

    /// Builds the axum router.
    ///
    /// `/health` and `/info` answer unauthenticated; `/invoke` and
    /// `/capabilities` sit behind the trust layer.
    pub fn router(&self) -> Router {
        let trust = TrustLayer::new(
            self.config.tenant_id.clone(),
            self.config.gateway_token.clone(),
        );

        let open = Router::new()
            .route("/health", get(introspect::health))
            .route("/info", get(introspect::info))
            .with_state(self.state.clone());

        let protected = Router::new()
            .route("/invoke", post(invoke))
            .route("/capabilities", get(introspect::capabilities))
            .layer(trust)
            .with_state(self.state.clone());

        open.merge(protected)
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            tenant = %self.config.tenant_id,
            addr = %self.config.bind_addr,
            capabilities = self.state.registry.capability_names().len(),
            "Backend listening"
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// `POST /invoke` — the single tool invocation endpoint.
///
/// Handler-level outcomes (success, typed failure, unknown capability,
/// timeout) all answer 200 with the envelope carrying the semantics;
/// only pipeline rejections use non-2xx statuses.
async fn invoke(
    State(state): State<AppState>,
    Extension(ctx): Extension<TrustContext>,
    Json(request): Json<InvocationRequest>,
) -> Response {
    if let Err(reject) = state.pipeline.apply(&ctx, &request) {
        let body = serde_json::json!({
            "error": { "category": "pipeline", "message": reject.message }
        });
        return (reject.status, Json(body)).into_response();
    }

    let Some(handler) = state.registry.resolve(&request.capability) else {
        return Json(InvocationResponse::failure(
            HandlerFailure::unknown_capability(&request.capability),
        ))
        .into_response();
    };

    let outcome = tokio::time::timeout(
        state.handler_timeout,
        handler.invoke(request.arguments.clone(), &ctx),
    )
    .await;

    let response = match outcome {
        Err(_) => {
            tracing::warn!(
                request = %ctx.request_id,
                capability = %request.capability,
                "Handler exceeded execution timeout"
            );
            InvocationResponse::failure(HandlerFailure::timeout(format!(
                "{} exceeded {}s",
                request.capability,
                state.handler_timeout.as_secs_f64()
            )))
        }
        Ok(Err(failure)) => InvocationResponse::failure(failure),
        Ok(Ok(result)) => InvocationResponse::success(result),
    };

    Json(response).into_response()
}
