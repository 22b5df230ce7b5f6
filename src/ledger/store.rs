// Ledger persistence seam. The in-memory store is the default backing for
// tests and single-process use; the sqlx-backed store lives behind the
// `database` feature in crate::database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{LedgerEntry, NewLedgerEntry, RequestKind, RequestStatus};

/// Failures raised by the persistence layer (ledger, trail and form stores
/// share the vocabulary).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record found for request number {request_number}")]
    NotFound { request_number: String },
    #[error("request number {request_number} already exists")]
    DuplicateRequestNumber { request_number: String },
    #[error("illegal status change for {request_number}: {from} -> {to}")]
    InvalidTransition {
        request_number: String,
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("validation failed: {reason}")]
    Validation { reason: String },
    #[error("form {request_number} is no longer editable")]
    InvalidState { request_number: String },
    #[error("could not allocate a request number for {kind} after {attempts} attempts")]
    RequestNumberExhausted { kind: RequestKind, attempts: u32 },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Idempotent create. If an entry with the same request number already
    /// exists it is returned unchanged; nothing is overwritten.
    async fn create_or_get(&self, new_entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Apply a status change, enforcing the transition rules. Bumps
    /// `updated_at` on success.
    async fn set_status(
        &self,
        request_number: &str,
        new_status: RequestStatus,
    ) -> Result<LedgerEntry, StoreError>;

    /// Exact, case-sensitive lookup.
    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// All entries, for approval queues and reconciliation sweeps.
    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_or_get(&self, new_entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(&new_entry.request_number) {
            debug!(
                request_number = %existing.request_number,
                status = %existing.status,
                "Ledger entry already present, returning unchanged"
            );
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            request_number: new_entry.request_number.clone(),
            kind: new_entry.kind,
            ship_id: new_entry.ship_id,
            requested_by: new_entry.requested_by,
            requested_at: new_entry.requested_at,
            purpose: new_entry.purpose,
            description: new_entry.description,
            status: RequestStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        info!(
            request_number = %entry.request_number,
            kind = %entry.kind,
            "Created ledger entry"
        );
        entries.insert(new_entry.request_number, entry.clone());
        Ok(entry)
    }

    async fn set_status(
        &self,
        request_number: &str,
        new_status: RequestStatus,
    ) -> Result<LedgerEntry, StoreError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(request_number)
            .ok_or_else(|| StoreError::NotFound {
                request_number: request_number.to_string(),
            })?;

        if !entry.status.can_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                request_number: request_number.to_string(),
                from: entry.status,
                to: new_status,
            });
        }

        info!(
            request_number = %entry.request_number,
            from = %entry.status,
            to = %new_status,
            "Ledger status change"
        );
        entry.status = new_status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(request_number).cloned())
    }

    async fn list(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let entries = self.entries.lock().await;
        let mut all: Vec<LedgerEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
