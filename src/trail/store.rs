use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::ledger::StoreError;

use super::types::{TrailAction, TrailEntry};

#[async_trait]
pub trait TrailStore: Send + Sync {
    /// Append one stage. The stage number is computed as max + 1 under the
    /// same lock as the insert, so concurrent appends for one entry can
    /// never produce duplicates or gaps. Reject requires a comment.
    async fn append(
        &self,
        ledger_entry_id: Uuid,
        action: TrailAction,
        actor_id: &str,
        comment: Option<String>,
    ) -> Result<TrailEntry, StoreError>;

    /// Full history for one ledger entry, stage ascending. Re-queryable at
    /// any time; no cursor state.
    async fn history(&self, ledger_entry_id: Uuid) -> Result<Vec<TrailEntry>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryTrailStore {
    entries: Mutex<HashMap<Uuid, Vec<TrailEntry>>>,
}

impl InMemoryTrailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrailStore for InMemoryTrailStore {
    async fn append(
        &self,
        ledger_entry_id: Uuid,
        action: TrailAction,
        actor_id: &str,
        comment: Option<String>,
    ) -> Result<TrailEntry, StoreError> {
        if action == TrailAction::Reject
            && comment.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(StoreError::Validation {
                reason: "a rejection must carry a comment".to_string(),
            });
        }

        let mut entries = self.entries.lock().await;
        let history = entries.entry(ledger_entry_id).or_default();
        let stage = history.iter().map(|e| e.stage).max().unwrap_or(0) + 1;

        let entry = TrailEntry {
            id: Uuid::new_v4(),
            ledger_entry_id,
            stage,
            action,
            action_by: actor_id.to_string(),
            action_at: Utc::now(),
            comment,
        };
        info!(
            ledger_entry_id = %ledger_entry_id,
            stage = stage,
            action = %action,
            action_by = %actor_id,
            "Appended approval trail entry"
        );
        history.push(entry.clone());
        Ok(entry)
    }

    async fn history(&self, ledger_entry_id: Uuid) -> Result<Vec<TrailEntry>, StoreError> {
        let entries = self.entries.lock().await;
        let mut history = entries.get(&ledger_entry_id).cloned().unwrap_or_default();
        history.sort_by_key(|e| e.stage);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_start_at_one_and_increase() {
        tokio_test::block_on(async {
            let store = InMemoryTrailStore::new();
            let entry_id = Uuid::new_v4();

            let first = store
                .append(entry_id, TrailAction::Submit, "u1", None)
                .await
                .unwrap();
            let second = store
                .append(entry_id, TrailAction::Approve, "u2", None)
                .await
                .unwrap();

            assert_eq!(first.stage, 1);
            assert_eq!(second.stage, 2);
        });
    }

    #[test]
    fn histories_are_independent_per_entry() {
        tokio_test::block_on(async {
            let store = InMemoryTrailStore::new();
            let a = Uuid::new_v4();
            let b = Uuid::new_v4();

            store.append(a, TrailAction::Submit, "u1", None).await.unwrap();
            store.append(b, TrailAction::Submit, "u3", None).await.unwrap();
            store.append(a, TrailAction::Approve, "u2", None).await.unwrap();

            let history_a = store.history(a).await.unwrap();
            let history_b = store.history(b).await.unwrap();
            assert_eq!(history_a.len(), 2);
            assert_eq!(history_b.len(), 1);
            assert_eq!(history_b[0].stage, 1);
        });
    }

    #[test]
    fn reject_without_comment_is_refused() {
        tokio_test::block_on(async {
            let store = InMemoryTrailStore::new();
            let entry_id = Uuid::new_v4();

            let err = store
                .append(entry_id, TrailAction::Reject, "u2", None)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation { .. }));

            let err = store
                .append(entry_id, TrailAction::Reject, "u2", Some("   ".to_string()))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation { .. }));

            assert!(store.history(entry_id).await.unwrap().is_empty());
        });
    }
}
