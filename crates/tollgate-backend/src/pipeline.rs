//! The fixed invocation pipeline.
//!
//! After the trust middleware admits a request, every invocation passes
//! through an explicit ordered list of stages before the registry is
//! consulted. Each stage either passes or short-circuits with a
//! [`StageReject`]; tenants choose which optional stages are enabled but
//! cannot reorder them.

use http::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tollgate_core::{ChannelId, InvocationRequest, TrustContext};

use crate::config::RateLimitConfig;

/// A stage's short-circuit outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReject {
    /// HTTP status the backend answers with.
    pub status: StatusCode,
    /// Message rendered into the error body.
    pub message: String,
}

/// One step of the invocation pipeline.
///
/// Stages are synchronous checks over the trust context and the
/// invocation; anything needing I/O belongs in a handler, not a stage.
pub trait Stage: Send + Sync {
    /// Stage name, for logs.
    fn name(&self) -> &'static str;

    /// Passes the request through or rejects it.
    fn apply(&self, ctx: &TrustContext, request: &InvocationRequest) -> Result<(), StageReject>;
}

/// The ordered stage list. Construction sites fix the order; there is no
/// way to insert a stage in the middle after the fact.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Builds the standard pipeline: rate limiting (when configured),
    /// then audit logging. This ordering is part of the template.
    pub fn standard(rate_limit: Option<RateLimitConfig>) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if let Some(config) = rate_limit {
            stages.push(Box::new(RateLimitStage::new(config)));
        }
        stages.push(Box::new(AuditStage));
        Self { stages }
    }

    /// Applies every stage in order, stopping at the first rejection.
    pub fn apply(
        &self,
        ctx: &TrustContext,
        request: &InvocationRequest,
    ) -> Result<(), StageReject> {
        for stage in &self.stages {
            if let Err(reject) = stage.apply(ctx, request) {
                tracing::debug!(
                    stage = stage.name(),
                    status = %reject.status,
                    "Pipeline stage rejected invocation"
                );
                return Err(reject);
            }
        }
        Ok(())
    }

    /// Number of stages in the pipeline.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// ============================================================================
// RateLimitStage
// ============================================================================

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Per-channel token bucket.
///
/// One slow or chatty channel exhausts its own budget, not the
/// backend's.
pub struct RateLimitStage {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<ChannelId, Bucket>>,
}

impl RateLimitStage {
    /// Creates the stage with the given limits.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn try_take(&self, channel: &ChannelId) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let refill_per_sec = f64::from(self.config.per_minute) / 60.0;
        let burst = f64::from(self.config.burst);

        let bucket = buckets.entry(channel.clone()).or_insert(Bucket {
            tokens: burst,
            refilled_at: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_per_sec).min(burst);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    fn apply(&self, ctx: &TrustContext, _request: &InvocationRequest) -> Result<(), StageReject> {
        if self.try_take(&ctx.channel_id) {
            Ok(())
        } else {
            Err(StageReject {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: "rate limit exceeded for this channel".to_string(),
            })
        }
    }
}

// ============================================================================
// AuditStage
// ============================================================================

/// Logs every admitted invocation with its full correlation trail.
/// Never rejects.
pub struct AuditStage;

impl Stage for AuditStage {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn apply(&self, ctx: &TrustContext, request: &InvocationRequest) -> Result<(), StageReject> {
        tracing::info!(
            target: "tollgate::audit",
            request = %ctx.request_id,
            tenant = %ctx.tenant_id,
            channel = %ctx.channel_id,
            user = %ctx.user_id,
            capability = %request.capability,
            "Invocation admitted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(channel: &str) -> TrustContext {
        TrustContext::new("cust01".into(), channel.into(), "u1")
    }

    fn request() -> InvocationRequest {
        InvocationRequest::new("k8s.listPods", json!({}))
    }

    #[test]
    fn test_standard_pipeline_ordering() {
        let with_limit = Pipeline::standard(Some(RateLimitConfig::default()));
        assert_eq!(with_limit.len(), 2);

        let without_limit = Pipeline::standard(None);
        assert_eq!(without_limit.len(), 1);
    }

    #[test]
    fn test_audit_stage_always_passes() {
        let stage = AuditStage;
        assert!(stage.apply(&ctx("c1"), &request()).is_ok());
    }

    #[test]
    fn test_rate_limit_allows_burst_then_rejects() {
        let stage = RateLimitStage::new(RateLimitConfig {
            per_minute: 1,
            burst: 3,
        });
        let ctx = ctx("c1");

        for _ in 0..3 {
            assert!(stage.apply(&ctx, &request()).is_ok());
        }
        let reject = stage.apply(&ctx, &request()).unwrap_err();
        assert_eq!(reject.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_rate_limit_is_per_channel() {
        let stage = RateLimitStage::new(RateLimitConfig {
            per_minute: 1,
            burst: 1,
        });

        assert!(stage.apply(&ctx("c1"), &request()).is_ok());
        assert!(stage.apply(&ctx("c1"), &request()).is_err());
        // A different channel has its own bucket.
        assert!(stage.apply(&ctx("c2"), &request()).is_ok());
    }

    #[test]
    fn test_pipeline_short_circuits_at_first_rejection() {
        let pipeline = Pipeline::standard(Some(RateLimitConfig {
            per_minute: 1,
            burst: 1,
        }));
        let ctx = ctx("c1");

        assert!(pipeline.apply(&ctx, &request()).is_ok());
        let reject = pipeline.apply(&ctx, &request()).unwrap_err();
        assert_eq!(reject.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
