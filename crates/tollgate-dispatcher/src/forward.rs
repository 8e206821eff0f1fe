//! Trusted forwarding to tenant backends.
//!
//! The forwarder POSTs the invocation to the backend's `/invoke` endpoint
//! with the trust headers and, when configured, the shared gateway
//! secret. Retries are bounded and apply only to connect-class failures:
//! a request that never reached the backend is safe to resend, anything
//! that may have executed is not.

use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tollgate_core::context::HEADER_GATEWAY_TOKEN;
use tollgate_core::{Error, InvocationRequest, InvocationResponse, Result, TrustContext};

/// Timeout and retry settings for dispatcher→backend calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPolicy {
    /// End-to-end bound on each forwarded request.
    pub timeout: Duration,
    /// Extra attempts after the first, for connect failures only.
    pub max_retries: usize,
    /// Initial backoff delay; doubles per attempt.
    pub initial_backoff: Duration,
}

impl Default for ForwardPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// HTTP client wrapper that forwards invocations to backends.
pub struct Forwarder {
    client: reqwest::Client,
    gateway_token: Option<String>,
    policy: ForwardPolicy,
}

impl Forwarder {
    /// Builds a forwarder with the given policy.
    pub fn new(gateway_token: Option<String>, policy: ForwardPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build forward client: {e}")))?;
        Ok(Self {
            client,
            gateway_token,
            policy,
        })
    }

    /// Forwards an invocation to a backend and decodes the envelope.
    pub async fn forward(
        &self,
        backend_url: &str,
        ctx: &TrustContext,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse> {
        let url = format!("{}/invoke", backend_url.trim_end_matches('/'));
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.policy.initial_backoff)
            .with_max_times(self.policy.max_retries);

        (|| self.send_once(&url, ctx, request))
            .retry(backoff)
            .when(Error::is_retryable)
            .notify(|err, delay| {
                tracing::warn!(
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying forward after connect failure"
                );
            })
            .await
    }

    async fn send_once(
        &self,
        url: &str,
        ctx: &TrustContext,
        request: &InvocationRequest,
    ) -> Result<InvocationResponse> {
        let mut req = self.client.post(url).json(request);
        for (name, value) in ctx.header_pairs() {
            req = req.header(name, value);
        }
        if let Some(token) = &self.gateway_token {
            req = req.header(HEADER_GATEWAY_TOKEN, token);
        }

        let resp = req.send().await.map_err(classify_send_error)?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(Error::transport(
                format!("backend answered {status}"),
                false,
            ));
        }
        if !status.is_success() {
            // A trust or pipeline rejection from our own backend means the
            // deployment is inconsistent, not that the user did anything
            // wrong.
            return Err(Error::config(format!(
                "backend rejected forwarded request: {status}"
            )));
        }

        resp.json::<InvocationResponse>()
            .await
            .map_err(|e| Error::config(format!("backend answered with invalid envelope: {e}")))
    }
}

/// Maps a reqwest error onto the transport taxonomy.
///
/// Only connect failures are marked retryable: the request provably never
/// left the dispatcher. A timeout may have executed on the backend, so it
/// surfaces once.
fn classify_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::transport(format!("forward timed out: {e}"), false)
    } else {
        Error::transport(format!("forward failed: {e}"), e.is_connect())
    }
}
