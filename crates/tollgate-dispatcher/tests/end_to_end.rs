//! End-to-end dispatch scenarios over real backend servers.
//!
//! Each test spins up one or more tenant backends on ephemeral ports,
//! points a dispatcher's routing table at them, and drives the
//! dispatcher router with slash-command payloads.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use axum::body::Body;
use http::{Request, StatusCode, header::CONTENT_TYPE};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tollgate_backend::{BackendConfig, BackendServer};
use tollgate_core::{
    CapabilityName, ChannelId, HandlerFailure, ReplyType, TenantId, TrustContext,
};
use tollgate_directory::{RoutingTable, TenantDirectory, TenantEntry};
use tollgate_dispatcher::{DispatcherConfig, DispatcherServer, ForwardPolicy};
use tollgate_registry::{CapabilityRegistry, ToolHandler};
use tower::ServiceExt;

// ============================================================================
// Test handlers
// ============================================================================

/// Canned pod listing, standing in for a kubectl-backed handler.
struct PodsHandler;

#[async_trait]
impl ToolHandler for PodsHandler {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("k8s.listPods")
    }

    fn description(&self) -> &str {
        "lists pods"
    }

    async fn invoke(
        &self,
        arguments: Value,
        _ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        let namespace = arguments
            .get("ns")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string();
        Ok(json!({
            "namespace": namespace,
            "pods": [{"name": "web-0", "phase": "Running"}]
        }))
    }
}

/// Echoes the tenant identity the backend observed.
struct TenantEchoHandler;

#[async_trait]
impl ToolHandler for TenantEchoHandler {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("test.whoami")
    }

    fn description(&self) -> &str {
        "reports the observed tenant"
    }

    async fn invoke(&self, _arguments: Value, ctx: &TrustContext) -> Result<Value, HandlerFailure> {
        Ok(json!({"tenant": ctx.tenant_id.to_string()}))
    }
}

/// Never finishes within any test timeout.
struct StuckHandler;

#[async_trait]
impl ToolHandler for StuckHandler {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("test.stuck")
    }

    fn description(&self) -> &str {
        "hangs"
    }

    async fn invoke(
        &self,
        _arguments: Value,
        _ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    }
}

/// Registered on backends to prove the allowlist, not registration,
/// decides visibility.
struct BucketsHandler;

#[async_trait]
impl ToolHandler for BucketsHandler {
    fn capability(&self) -> CapabilityName {
        CapabilityName::new("aws.listBuckets")
    }

    fn description(&self) -> &str {
        "lists buckets"
    }

    async fn invoke(
        &self,
        _arguments: Value,
        _ctx: &TrustContext,
    ) -> Result<Value, HandlerFailure> {
        Ok(json!({"buckets": []}))
    }
}

// ============================================================================
// Harness
// ============================================================================

fn registry(allowed: &[&str]) -> CapabilityRegistry {
    let allowed = allowed.iter().map(|n| CapabilityName::new(*n)).collect();
    CapabilityRegistry::builder(allowed)
        .register(Arc::new(PodsHandler))
        .unwrap()
        .register(Arc::new(TenantEchoHandler))
        .unwrap()
        .register(Arc::new(StuckHandler))
        .unwrap()
        .register(Arc::new(BucketsHandler))
        .unwrap()
        .build()
}

/// Serves a backend for `tenant` on an ephemeral port, returning its URL.
async fn spawn_backend(tenant: &str, allowed: &[&str], gateway_token: Option<&str>) -> String {
    let config = BackendConfig {
        gateway_token: gateway_token.map(str::to_string),
        rate_limit: None,
        ..BackendConfig::new(TenantId::new(tenant), "127.0.0.1:0".parse().unwrap())
    };
    let router = BackendServer::new(config, registry(allowed)).router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn dispatcher(
    bindings: &[(&str, &str, &str)],
    config: DispatcherConfig,
) -> DispatcherServer {
    let mut channels = HashMap::new();
    let mut tenants = HashMap::new();
    for (channel, tenant, url) in bindings {
        channels.insert(ChannelId::new(*channel), TenantId::new(*tenant));
        tenants.insert(
            TenantId::new(*tenant),
            TenantEntry::new(
                *url,
                ["k8s.listPods", "test.whoami", "test.stuck", "aws.listBuckets"],
            ),
        );
    }
    let table = RoutingTable::new(channels, tenants).unwrap();
    DispatcherServer::new(config, TenantDirectory::new(table)).unwrap()
}

fn quick_config() -> DispatcherConfig {
    DispatcherConfig {
        forward: ForwardPolicy {
            timeout: Duration::from_millis(400),
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
        },
        ..DispatcherConfig::new("127.0.0.1:0".parse().unwrap())
    }
}

fn command(channel: &str, text: &str) -> Request<Body> {
    // '=' inside the text field must itself be form-encoded.
    let encoded = text.replace('=', "%3D").replace(' ', "+");
    Request::builder()
        .method("POST")
        .uri("/command")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "channel_id={channel}&user_id=u1&text={encoded}"
        )))
        .unwrap()
}

async fn reply_json(resp: axum::response::Response) -> Value {
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_happy_path_list_pods() {
    let backend = spawn_backend("cust01", &["k8s.listPods"], None).await;
    let config = DispatcherConfig {
        reply_type: ReplyType::InChannel,
        ..quick_config()
    };
    let dispatcher = dispatcher(&[("c1", "cust01", backend.as_str())], config);

    let reply = reply_json(
        dispatcher
            .router()
            .oneshot(command("c1", "k8s.listPods ns=default"))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(reply["response_type"], "in_channel");
    let text = reply["text"].as_str().unwrap();
    assert!(text.contains("web-0"));
    assert!(text.contains("default"));
}

#[tokio::test]
async fn test_forbidden_capability_reads_as_unknown_tool() {
    // aws.listBuckets is registered on the backend but not in cust01's
    // allowed set; a user must not be able to tell it apart from a tool
    // that does not exist at all.
    let backend = spawn_backend("cust01", &["k8s.listPods"], None).await;
    let dispatcher = dispatcher(&[("c1", "cust01", backend.as_str())], quick_config());
    let router = dispatcher.router();

    let forbidden = reply_json(
        router
            .clone()
            .oneshot(command("c1", "aws.listBuckets"))
            .await
            .unwrap(),
    )
    .await;
    let nonexistent = reply_json(
        router
            .oneshot(command("c1", "gcp.listDisks"))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(forbidden["response_type"], "ephemeral");
    assert_eq!(forbidden["text"], "unknown tool: aws.listBuckets");
    assert_eq!(nonexistent["text"], "unknown tool: gcp.listDisks");
}

#[tokio::test]
async fn test_unregistered_channel_is_actionable_client_error() {
    let backend = spawn_backend("cust01", &["k8s.listPods"], None).await;
    let dispatcher = dispatcher(&[("c1", "cust01", backend.as_str())], quick_config());

    let reply = reply_json(
        dispatcher
            .router()
            .oneshot(command("c-unbound", "k8s.listPods"))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(reply["response_type"], "ephemeral");
    let text = reply["text"].as_str().unwrap();
    assert!(text.contains("not registered"));
    assert!(text.contains("c-unbound"));
}

#[tokio::test]
async fn test_forward_timeout_does_not_block_other_requests() {
    // cust01's handler hangs past the dispatcher's forward timeout;
    // cust02 must answer normally while cust01's request is pending.
    let slow = spawn_backend("cust01", &["test.stuck"], None).await;
    let fast = spawn_backend("cust02", &["test.whoami"], None).await;
    let dispatcher = dispatcher(
        &[
            ("c1", "cust01", slow.as_str()),
            ("c2", "cust02", fast.as_str()),
        ],
        quick_config(),
    );
    let router = dispatcher.router();

    let (slow_reply, fast_reply) = tokio::join!(
        router.clone().oneshot(command("c1", "test.stuck")),
        router.clone().oneshot(command("c2", "test.whoami")),
    );

    let fast_reply = reply_json(fast_reply.unwrap()).await;
    assert!(fast_reply["text"].as_str().unwrap().contains("cust02"));

    let slow_reply = reply_json(slow_reply.unwrap()).await;
    let text = slow_reply["text"].as_str().unwrap();
    // Generic transport message, no backend address leaked.
    assert!(text.contains("did not respond"));
    assert!(!text.contains("127.0.0.1"));
}

#[tokio::test]
async fn test_concurrent_channels_observe_only_their_tenant() {
    let mut bindings = Vec::new();
    let mut urls = Vec::new();
    for i in 1..=3 {
        let tenant = format!("cust0{i}");
        let url = spawn_backend(&tenant, &["test.whoami"], None).await;
        urls.push((format!("c{i}"), tenant, url));
    }
    for (channel, tenant, url) in &urls {
        bindings.push((channel.as_str(), tenant.as_str(), url.as_str()));
    }
    let dispatcher = dispatcher(&bindings, quick_config());
    let router = dispatcher.router();

    let mut tasks = Vec::new();
    for (channel, tenant, _) in &urls {
        let router = router.clone();
        let channel = channel.clone();
        let tenant = tenant.clone();
        tasks.push(tokio::spawn(async move {
            let reply = reply_json(
                router
                    .oneshot(command(&channel, "test.whoami"))
                    .await
                    .unwrap(),
            )
            .await;
            (tenant, reply)
        }));
    }

    for task in tasks {
        let (tenant, reply) = task.await.unwrap();
        let text = reply["text"].as_str().unwrap();
        assert!(text.contains(&tenant), "{tenant} saw: {text}");
    }
}

#[tokio::test]
async fn test_gateway_token_round_trip() {
    let backend = spawn_backend("cust01", &["test.whoami"], Some("s3cret")).await;

    // Matching secret: forwarded requests are accepted.
    let good = DispatcherConfig {
        gateway_token: Some("s3cret".to_string()),
        ..quick_config()
    };
    let reply = reply_json(
        dispatcher(&[("c1", "cust01", backend.as_str())], good)
            .router()
            .oneshot(command("c1", "test.whoami"))
            .await
            .unwrap(),
    )
    .await;
    assert!(reply["text"].as_str().unwrap().contains("cust01"));

    // Missing secret: the backend refuses, the user sees only a generic
    // unavailability message.
    let bad = quick_config();
    let reply = reply_json(
        dispatcher(&[("c1", "cust01", backend.as_str())], bad)
            .router()
            .oneshot(command("c1", "test.whoami"))
            .await
            .unwrap(),
    )
    .await;
    let text = reply["text"].as_str().unwrap();
    assert!(text.contains("service unavailable"));
    assert!(!text.contains("token"));
}

#[tokio::test]
async fn test_routing_reload_takes_effect_for_new_requests() {
    let first = spawn_backend("cust01", &["test.whoami"], None).await;
    let second = spawn_backend("cust02", &["test.whoami"], None).await;
    let dispatcher = dispatcher(&[("c1", "cust01", first.as_str())], quick_config());
    let directory = dispatcher.directory();
    let router = dispatcher.router();

    let reply = reply_json(
        router
            .clone()
            .oneshot(command("c1", "test.whoami"))
            .await
            .unwrap(),
    )
    .await;
    assert!(reply["text"].as_str().unwrap().contains("cust01"));

    // Rebind c1 to cust02 in one atomic swap.
    let channels = HashMap::from([(ChannelId::new("c1"), TenantId::new("cust02"))]);
    let tenants = HashMap::from([(
        TenantId::new("cust02"),
        TenantEntry::new(second.as_str(), ["test.whoami"]),
    )]);
    directory.reload(RoutingTable::new(channels, tenants).unwrap());

    let reply = reply_json(
        router
            .oneshot(command("c1", "test.whoami"))
            .await
            .unwrap(),
    )
    .await;
    assert!(reply["text"].as_str().unwrap().contains("cust02"));
}
