// Audit sink seam - compliance notification for workflow transitions
// Best-effort: a sink failure is logged and never rolls back the
// transition that already committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::workflow::RequestAction;

#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn record_transition(
        &self,
        request_number: &str,
        action: RequestAction,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Default recorder: structured log lines on the `audit` target, picked up
/// by whatever subscriber telemetry installed.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditRecorder;

impl TracingAuditRecorder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditRecorder for TracingAuditRecorder {
    async fn record_transition(
        &self,
        request_number: &str,
        action: RequestAction,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        info!(
            target: "audit",
            request_number = %request_number,
            action = %action,
            actor_id = %actor_id,
            at = %at.to_rfc3339(),
            "Change-request transition"
        );
        Ok(())
    }
}
