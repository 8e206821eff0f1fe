//! Dispatcher server assembly.
//!
//! `POST /command` implements the full dispatch sequence: decode the
//! payload, verify the platform token, parse the command text, resolve
//! channel → tenant → backend, forward with trust headers, and render
//! the backend's envelope into a chat reply. Failures at any step map
//! through [`Error::user_message`] so channel users see actionable text
//! for their own mistakes and generic text for everything else.

use axum::Router;
use axum::body::Body;
use axum::extract::{FromRequest, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json};
use http::{Request, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tollgate_core::context::constant_eq;
use tollgate_core::{
    ChannelId, CommandReply, Error, ErrorKind, InvocationResponse, ReplyType, Result, TrustContext,
};
use tollgate_directory::TenantDirectory;

use crate::command::{self, SlashPayload};
use crate::config::DispatcherConfig;
use crate::forward::Forwarder;

/// Shared dispatcher state.
#[derive(Clone)]
struct AppState {
    directory: Arc<TenantDirectory>,
    forwarder: Arc<Forwarder>,
    config: Arc<DispatcherConfig>,
}

/// A runnable dispatcher.
pub struct DispatcherServer {
    state: AppState,
}

impl DispatcherServer {
    /// Assembles a dispatcher over a tenant directory.
    pub fn new(config: DispatcherConfig, directory: TenantDirectory) -> Result<Self> {
        let forwarder = Forwarder::new(config.gateway_token.clone(), config.forward.clone())?;
        Ok(Self {
            state: AppState {
                directory: Arc::new(directory),
                forwarder: Arc::new(forwarder),
                config: Arc::new(config),
            },
        })
    }

    /// The tenant directory, for operator-driven reloads.
    pub fn directory(&self) -> Arc<TenantDirectory> {
        self.state.directory.clone()
    }

    /// Builds the axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/command", post(handle_command))
            .route("/health", get(health))
            .route("/admin/routes", get(admin_routes))
            .with_state(self.state.clone())
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn serve(self) -> Result<()> {
        let addr = self.state.config.bind_addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            addr = %addr,
            channels = self.state.directory.snapshot().channel_count(),
            "Dispatcher listening"
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// `POST /command` — the slash-command entry point.
///
/// Always answers 200 with a [`CommandReply`] body once the payload
/// decodes, because chat platforms render the body only on success; the
/// sole exception is a failed verification token, which is a hard 401.
async fn handle_command(State(state): State<AppState>, req: Request<Body>) -> Response {
    let payload = match decode_payload(req).await {
        Ok(payload) => payload,
        Err(err) => return Json(CommandReply::ephemeral(err.user_message())).into_response(),
    };

    if let Some(expected) = &state.config.verification_token {
        let presented = payload.token.as_deref().unwrap_or("");
        if !constant_eq(presented, expected) {
            tracing::warn!(
                channel = %payload.channel_id,
                "Rejected command with invalid verification token"
            );
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let reply = match dispatch(&state, &payload).await {
        Ok(reply) => reply,
        Err(err) => {
            log_dispatch_error(&payload, &err);
            CommandReply::ephemeral(err.user_message())
        }
    };
    Json(reply).into_response()
}

/// Steps 3–6 of the dispatch sequence: parse, resolve, forward, render.
async fn dispatch(state: &AppState, payload: &SlashPayload) -> Result<CommandReply> {
    let invocation = command::parse_command(&payload.text)?;

    let channel = ChannelId::new(payload.channel_id.as_str());
    let tenant = state.directory.resolve_tenant(&channel)?;
    let backend = state.directory.resolve_backend(&tenant)?;

    let ctx = TrustContext::new(tenant.clone(), channel, payload.user_id.as_str());
    tracing::info!(
        request = %ctx.request_id,
        tenant = %tenant,
        channel = %ctx.channel_id,
        capability = %invocation.capability,
        "Dispatching command"
    );

    let response = state.forwarder.forward(&backend, &ctx, &invocation).await?;
    Ok(render_reply(
        &response,
        state.config.reply_type,
        state.config.max_reply_chars,
    ))
}

/// Decodes the inbound payload from form encoding or JSON.
async fn decode_payload(req: Request<Body>) -> Result<SlashPayload> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let Json(payload) = Json::<SlashPayload>::from_request(req, &())
            .await
            .map_err(|e| Error::malformed(format!("invalid command payload: {e}")))?;
        Ok(payload)
    } else {
        let Form(payload) = Form::<SlashPayload>::from_request(req, &())
            .await
            .map_err(|e| Error::malformed(format!("invalid command payload: {e}")))?;
        Ok(payload)
    }
}

/// Renders the backend envelope into the chat-facing reply.
///
/// Successes use the configured display scope; failures are always
/// ephemeral so error text never lands in the channel transcript.
fn render_reply(
    response: &InvocationResponse,
    reply_type: ReplyType,
    max_chars: usize,
) -> CommandReply {
    if response.ok {
        let text = match &response.result {
            Some(value) if !value.is_null() => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            _ => "(no output)".to_string(),
        };
        CommandReply::new(reply_type, truncate_reply(text, max_chars))
    } else {
        let text = response
            .error
            .as_ref()
            .map_or_else(|| "tool failed".to_string(), |f| f.message.clone());
        CommandReply::ephemeral(truncate_reply(text, max_chars))
    }
}

/// Caps reply text at `max_chars` characters, appending a marker.
fn truncate_reply(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("\n[output truncated]");
    out
}

fn log_dispatch_error(payload: &SlashPayload, err: &Error) {
    match err.kind() {
        ErrorKind::Client => {
            tracing::debug!(channel = %payload.channel_id, error = %err, "Command rejected");
        }
        ErrorKind::Configuration => {
            tracing::error!(channel = %payload.channel_id, error = %err, "Dispatch misconfigured");
        }
        ErrorKind::Transport => {
            tracing::warn!(channel = %payload.channel_id, error = %err, "Forward failed");
        }
    }
}

// ============================================================================
// Operator endpoints
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
struct RouteEntry {
    backend_url: String,
    capabilities: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RoutesResponse {
    channels: BTreeMap<String, String>,
    tenants: BTreeMap<String, RouteEntry>,
}

/// `GET /admin/routes` — current bindings and backend addresses. Carries
/// no tokens or secrets.
async fn admin_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    let table = state.directory.snapshot();
    Json(RoutesResponse {
        channels: table
            .channels()
            .map(|(channel, tenant)| (channel.to_string(), tenant.to_string()))
            .collect(),
        tenants: table
            .tenants()
            .map(|(tenant, entry)| {
                (
                    tenant.to_string(),
                    RouteEntry {
                        backend_url: entry.backend_url.clone(),
                        capabilities: entry
                            .capabilities
                            .iter()
                            .map(ToString::to_string)
                            .collect(),
                    },
                )
            })
            .collect(),
    })
}
