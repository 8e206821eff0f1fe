//! Standard introspection endpoints.
//!
//! Every backend exposes the same three: `/health` (liveness only, no
//! auth), `/info` (identity and version), and `/capabilities` (the
//! tenant's allowed capability names — safe to expose because it reflects
//! only what is already permitted, and it sits behind the trust layer).

use axum::Json;
use axum::extract::{Extension, State};
use serde::Serialize;
use tollgate_core::TrustContext;

use crate::server::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process can answer.
    pub status: &'static str,
}

/// Identity response.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Server name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// The tenant this backend serves.
    pub tenant: String,
}

/// Capability listing response.
#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    /// Allowed capability names, sorted.
    pub capabilities: Vec<String>,
}

/// `GET /health` — process liveness only.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /info` — version and identity.
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "tollgate-backend",
        version: env!("CARGO_PKG_VERSION"),
        tenant: state.tenant_id.to_string(),
    })
}

/// `GET /capabilities` — the tenant's allowed capability names.
pub async fn capabilities(
    State(state): State<AppState>,
    Extension(ctx): Extension<TrustContext>,
) -> Json<CapabilitiesResponse> {
    tracing::debug!(request = %ctx.request_id, "Capability listing requested");
    Json(CapabilitiesResponse {
        capabilities: state
            .registry
            .capability_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect(),
    })
}
