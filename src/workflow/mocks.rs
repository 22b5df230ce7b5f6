// Mock collaborators for testing - no side effects

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::audit::AuditRecorder;
use crate::ledger::{
    InMemoryLedgerStore, LedgerEntry, LedgerStore, NewLedgerEntry, RequestStatus, StoreError,
};

use super::RequestAction;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransition {
    pub request_number: String,
    pub action: RequestAction,
    pub actor_id: String,
    pub at: DateTime<Utc>,
}

/// Audit sink that remembers every notification it receives.
#[derive(Default)]
pub struct RecordingAuditRecorder {
    events: Mutex<Vec<RecordedTransition>>,
}

impl RecordingAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<RecordedTransition> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl AuditRecorder for RecordingAuditRecorder {
    async fn record_transition(
        &self,
        request_number: &str,
        action: RequestAction,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.events.lock().await.push(RecordedTransition {
            request_number: request_number.to_string(),
            action,
            actor_id: actor_id.to_string(),
            at,
        });
        Ok(())
    }
}

/// Audit sink that always fails. Workflow transitions must survive it.
#[derive(Debug, Default)]
pub struct FailingAuditRecorder;

#[async_trait]
impl AuditRecorder for FailingAuditRecorder {
    async fn record_transition(
        &self,
        _request_number: &str,
        _action: RequestAction,
        _actor_id: &str,
        _at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        anyhow::bail!("audit sink unavailable")
    }
}

/// Ledger store whose status updates fail a configured number of times
/// before recovering. Exercises the coordinator's retry and partial-sync
/// paths.
pub struct FlakyLedgerStore {
    inner: InMemoryLedgerStore,
    set_status_failures: AtomicU32,
}

impl FlakyLedgerStore {
    /// Fail the next `times` set_status calls, then behave normally.
    pub fn failing_set_status(times: u32) -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            set_status_failures: AtomicU32::new(times),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyLedgerStore {
    async fn create_or_get(&self, new_entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        self.inner.create_or_get(new_entry).await
    }

    async fn set_status(
        &self,
        request_number: &str,
        new_status: RequestStatus,
    ) -> Result<LedgerEntry, StoreError> {
        let remaining = self.set_status_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.set_status_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Backend(
                "injected ledger write failure".to_string(),
            ));
        }
        self.inner.set_status(request_number, new_status).await
    }

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        self.inner.find_by_request_number(request_number).await
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        self.inner.list().await
    }
}
