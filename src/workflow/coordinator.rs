use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn, Instrument};

use crate::audit::AuditRecorder;
use crate::forms::{FormDetails, FormRecord, FormStore, NewForm};
use crate::identity::UserIdentity;
use crate::ledger::{LedgerEntry, LedgerStore, NewLedgerEntry, RequestStatus, StoreError};
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::trail::{TrailAction, TrailEntry, TrailStore};

use super::errors::WorkflowError;
use super::RequestAction;

/// Coordinates every lifecycle-changing operation across the specialized
/// form, its ledger entry, the approval trail and the audit sink.
///
/// The form is validated first because it is the record the user interacts
/// with; the ledger is then resolved through the weak request-number join,
/// synthesized when missing, and moved through the matching status change.
/// If the ledger cannot be brought along after the form mutation committed,
/// the failure surfaces as [`WorkflowError::PartialSync`] rather than being
/// swallowed.
pub struct WorkflowCoordinator {
    pub(super) forms: Arc<dyn FormStore>,
    pub(super) ledger: Arc<dyn LedgerStore>,
    pub(super) trail: Arc<dyn TrailStore>,
    pub(super) audit: Arc<dyn AuditRecorder>,
    // Serializes transitions per request number; distinct numbers proceed
    // independently.
    request_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WorkflowCoordinator {
    pub fn new(
        forms: Arc<dyn FormStore>,
        ledger: Arc<dyn LedgerStore>,
        trail: Arc<dyn TrailStore>,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            forms,
            ledger,
            trail,
            audit,
            request_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new specialized form plus its Draft ledger entry. The
    /// acting user becomes the requester. Any authenticated user may
    /// create requests.
    pub async fn create(
        &self,
        mut new_form: NewForm,
        actor: &UserIdentity,
    ) -> Result<FormRecord, WorkflowError> {
        new_form.requester_user_id = actor.id.clone();
        let kind = new_form.details.kind();

        let form = self
            .forms
            .create(new_form)
            .await
            .map_err(|e| WorkflowError::from_store("(unassigned)", e))?;

        self.ledger
            .create_or_get(ledger_entry_from_form(&form))
            .await
            .map_err(|e| WorkflowError::from_store(&form.request_number, e))?;

        self.notify_audit(&form.request_number, RequestAction::Create, &actor.id)
            .await;
        info!(
            request_number = %form.request_number,
            kind = %kind,
            requester = %actor.id,
            "Created change request"
        );
        Ok(form)
    }

    /// Replace a draft form's detail bag. Requester only; refused once the
    /// form has been submitted.
    pub async fn update_details(
        &self,
        request_number: &str,
        details: FormDetails,
        actor: &UserIdentity,
    ) -> Result<FormRecord, WorkflowError> {
        let _guard = self.lock_request(request_number).await;
        let form = self.load_form(request_number).await?;

        if form.requester_user_id != actor.id {
            return Err(WorkflowError::PermissionDenied {
                request_number: request_number.to_string(),
                action: RequestAction::Edit,
                actor_id: actor.id.clone(),
                reason: "only the requester may edit a draft".to_string(),
            });
        }

        self.forms
            .update_details(form.id, details)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))
    }

    /// Submit a draft form for review. Requester only. The form's pending
    /// flag is raised and the ledger entry (created here if the join finds
    /// nothing) moves to Submitted.
    pub async fn submit(
        &self,
        request_number: &str,
        actor: &UserIdentity,
    ) -> Result<FormRecord, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("submit", request_number, &actor.id, &correlation_id);
        async move {
            let _guard = self.lock_request(request_number).await;
            let form = self.load_form(request_number).await?;

            if !form.is_draft_shaped() {
                return Err(WorkflowError::InvalidTransition {
                    request_number: request_number.to_string(),
                    action: RequestAction::Submit,
                    reason: "only a draft form can be submitted".to_string(),
                });
            }
            if form.requester_user_id != actor.id {
                return Err(WorkflowError::PermissionDenied {
                    request_number: request_number.to_string(),
                    action: RequestAction::Submit,
                    actor_id: actor.id.clone(),
                    reason: "only the original requester may submit".to_string(),
                });
            }
            // The flag pair cannot tell a rejected form from a draft; the
            // ledger can. Check it pre-flight so resubmission dies as an
            // atomic no-op instead of a divergence.
            if let Some(entry) = self
                .ledger
                .find_by_request_number(request_number)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?
            {
                if entry.status != RequestStatus::Draft {
                    return Err(WorkflowError::InvalidTransition {
                        request_number: request_number.to_string(),
                        action: RequestAction::Submit,
                        reason: format!(
                            "ledger status is {}, submit requires a draft",
                            entry.status
                        ),
                    });
                }
            }

            let form = self
                .forms
                .mark_under_review(form.id)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?;

            let entry = self
                .ledger_transition(&form, RequestAction::Submit, RequestStatus::Submitted)
                .await?;

            self.append_trail(&entry, TrailAction::Submit, &actor.id, None)
                .await?;
            self.notify_audit(request_number, RequestAction::Submit, &actor.id)
                .await;
            info!(
                request_number = %request_number,
                actor = %actor.id,
                "Change request submitted"
            );
            Ok(form)
        }
        .instrument(span)
        .await
    }

    /// Administrator opens a submitted request for review. Ledger-only:
    /// the form's single pending flag cannot see the difference between
    /// Submitted and UnderReview, and no trail entry is recorded.
    pub async fn begin_review(
        &self,
        request_number: &str,
        actor: &UserIdentity,
    ) -> Result<LedgerEntry, WorkflowError> {
        let _guard = self.lock_request(request_number).await;
        if !actor.is_administrator() {
            return Err(WorkflowError::PermissionDenied {
                request_number: request_number.to_string(),
                action: RequestAction::BeginReview,
                actor_id: actor.id.clone(),
                reason: "opening a review requires the administrator role".to_string(),
            });
        }

        let form = self.load_form(request_number).await?;
        let entry = self.resolve_ledger(&form).await.map_err(|e| {
            WorkflowError::from_store(request_number, e)
        })?;
        if entry.status != RequestStatus::Submitted {
            return Err(WorkflowError::InvalidTransition {
                request_number: request_number.to_string(),
                action: RequestAction::BeginReview,
                reason: format!(
                    "review can only be opened on a submitted request, status is {}",
                    entry.status
                ),
            });
        }

        let entry = self
            .ledger
            .set_status(request_number, RequestStatus::UnderReview)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))?;
        self.notify_audit(request_number, RequestAction::BeginReview, &actor.id)
            .await;
        Ok(entry)
    }

    /// Approve a pending request. Administrator only, and never the
    /// original requester.
    pub async fn approve(
        &self,
        request_number: &str,
        actor: &UserIdentity,
    ) -> Result<FormRecord, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("approve", request_number, &actor.id, &correlation_id);
        async move {
            let _guard = self.lock_request(request_number).await;
            let form = self.load_form(request_number).await?;
            self.check_decision_preconditions(&form, RequestAction::Approve, actor)?;

            let form = self
                .forms
                .mark_approved(form.id)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?;

            let entry = self
                .ledger_transition(&form, RequestAction::Approve, RequestStatus::Approved)
                .await?;

            self.append_trail(&entry, TrailAction::Approve, &actor.id, None)
                .await?;
            self.notify_audit(request_number, RequestAction::Approve, &actor.id)
                .await;
            info!(
                request_number = %request_number,
                actor = %actor.id,
                "Change request approved"
            );
            Ok(form)
        }
        .instrument(span)
        .await
    }

    /// Reject a pending request with a reason. Same gating as approve; the
    /// comment is mandatory and checked before any mutation.
    pub async fn reject(
        &self,
        request_number: &str,
        actor: &UserIdentity,
        comment: &str,
    ) -> Result<FormRecord, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("reject", request_number, &actor.id, &correlation_id);
        async move {
            let _guard = self.lock_request(request_number).await;
            let form = self.load_form(request_number).await?;
            self.check_decision_preconditions(&form, RequestAction::Reject, actor)?;

            if comment.trim().is_empty() {
                return Err(WorkflowError::Validation {
                    request_number: request_number.to_string(),
                    reason: "a rejection requires a reason".to_string(),
                });
            }

            let form = self
                .forms
                .mark_rejected(form.id)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?;

            let entry = self
                .ledger_transition(&form, RequestAction::Reject, RequestStatus::Rejected)
                .await?;

            self.append_trail(
                &entry,
                TrailAction::Reject,
                &actor.id,
                Some(comment.to_string()),
            )
            .await?;
            self.notify_audit(request_number, RequestAction::Reject, &actor.id)
                .await;
            info!(
                request_number = %request_number,
                actor = %actor.id,
                "Change request rejected"
            );
            Ok(form)
        }
        .instrument(span)
        .await
    }

    /// Mark an approved request as carried out. Ledger-only: the form has
    /// no completion flag and keeps its approved state.
    pub async fn implement(
        &self,
        request_number: &str,
        actor: &UserIdentity,
    ) -> Result<LedgerEntry, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("implement", request_number, &actor.id, &correlation_id);
        async move {
            let _guard = self.lock_request(request_number).await;
            if !actor.is_administrator() {
                return Err(WorkflowError::PermissionDenied {
                    request_number: request_number.to_string(),
                    action: RequestAction::Implement,
                    actor_id: actor.id.clone(),
                    reason: "marking a request implemented requires the administrator role"
                        .to_string(),
                });
            }

            let form = self.load_form(request_number).await?;
            let entry = self
                .resolve_ledger(&form)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?;
            if entry.status != RequestStatus::Approved {
                return Err(WorkflowError::InvalidTransition {
                    request_number: request_number.to_string(),
                    action: RequestAction::Implement,
                    reason: format!(
                        "only an approved request can be implemented, status is {}",
                        entry.status
                    ),
                });
            }

            let entry = self
                .ledger
                .set_status(request_number, RequestStatus::Completed)
                .await
                .map_err(|e| WorkflowError::from_store(request_number, e))?;

            self.append_trail(&entry, TrailAction::Implement, &actor.id, None)
                .await?;
            self.notify_audit(request_number, RequestAction::Implement, &actor.id)
                .await;
            info!(
                request_number = %request_number,
                actor = %actor.id,
                "Change request implemented"
            );
            Ok(entry)
        }
        .instrument(span)
        .await
    }

    /// Current ledger entry behind a request number, if any.
    pub async fn status_of(
        &self,
        request_number: &str,
    ) -> Result<Option<LedgerEntry>, WorkflowError> {
        self.ledger
            .find_by_request_number(request_number)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))
    }

    /// Approval history for a request, stage ascending.
    pub async fn history(&self, request_number: &str) -> Result<Vec<TrailEntry>, WorkflowError> {
        let entry = self
            .ledger
            .find_by_request_number(request_number)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))?
            .ok_or_else(|| WorkflowError::NotFound {
                request_number: request_number.to_string(),
            })?;
        self.trail
            .history(entry.id)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))
    }

    /// Ledger entries waiting on an administrator, oldest first. Feeds the
    /// uniform approval queue across all four form kinds.
    pub async fn review_queue(&self) -> Result<Vec<LedgerEntry>, WorkflowError> {
        let mut pending: Vec<LedgerEntry> = self
            .ledger
            .list()
            .await
            .map_err(|e| WorkflowError::from_store("(queue)", e))?
            .into_iter()
            .filter(|entry| entry.status.is_pending())
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(pending)
    }

    fn check_decision_preconditions(
        &self,
        form: &FormRecord,
        action: RequestAction,
        actor: &UserIdentity,
    ) -> Result<(), WorkflowError> {
        if !form.is_under_review || form.is_approved {
            return Err(WorkflowError::InvalidTransition {
                request_number: form.request_number.clone(),
                action,
                reason: "only a pending request can be decided".to_string(),
            });
        }
        if !actor.is_administrator() {
            return Err(WorkflowError::PermissionDenied {
                request_number: form.request_number.clone(),
                action,
                actor_id: actor.id.clone(),
                reason: "decisions require the administrator role".to_string(),
            });
        }
        if actor.id == form.requester_user_id {
            return Err(WorkflowError::PermissionDenied {
                request_number: form.request_number.clone(),
                action,
                actor_id: actor.id.clone(),
                reason: "requesters cannot decide their own request".to_string(),
            });
        }
        Ok(())
    }

    /// Load the specialized form behind a request number, mapping a missing
    /// row to [`WorkflowError::NotFound`].
    pub(super) async fn load_form(
        &self,
        request_number: &str,
    ) -> Result<FormRecord, WorkflowError> {
        self.forms
            .find_by_request_number(request_number)
            .await
            .map_err(|e| WorkflowError::from_store(request_number, e))?
            .ok_or_else(|| WorkflowError::NotFound {
                request_number: request_number.to_string(),
            })
    }

    /// Resolve the ledger entry behind a form, synthesizing one from the
    /// form's fields when the join finds nothing. Recovers histories where
    /// the ledger row was never created.
    pub(super) async fn resolve_ledger(
        &self,
        form: &FormRecord,
    ) -> Result<LedgerEntry, StoreError> {
        if let Some(entry) = self
            .ledger
            .find_by_request_number(&form.request_number)
            .await?
        {
            return Ok(entry);
        }
        warn!(
            request_number = %form.request_number,
            "No ledger entry behind form; synthesizing one"
        );
        self.ledger
            .create_or_get(ledger_entry_from_form(form))
            .await
    }

    /// Apply a ledger status change after the form-side mutation already
    /// committed. One retry through the resolution fallback; a second
    /// failure means the two records have genuinely diverged and is
    /// surfaced as PartialSync.
    async fn ledger_transition(
        &self,
        form: &FormRecord,
        action: RequestAction,
        target: RequestStatus,
    ) -> Result<LedgerEntry, WorkflowError> {
        match self.try_ledger_transition(form, target).await {
            Ok(entry) => Ok(entry),
            Err(first) => {
                warn!(
                    request_number = %form.request_number,
                    action = %action,
                    error = %first,
                    "Ledger update failed after form mutation; retrying via resolution fallback"
                );
                match self.try_ledger_transition(form, target).await {
                    Ok(entry) => {
                        info!(
                            request_number = %form.request_number,
                            action = %action,
                            "Ledger update recovered on retry"
                        );
                        Ok(entry)
                    }
                    Err(second) => {
                        error!(
                            request_number = %form.request_number,
                            action = %action,
                            error = %second,
                            "Ledger update failed after retry; form and ledger have diverged"
                        );
                        Err(WorkflowError::PartialSync {
                            request_number: form.request_number.clone(),
                            action,
                            source: second,
                        })
                    }
                }
            }
        }
    }

    async fn try_ledger_transition(
        &self,
        form: &FormRecord,
        target: RequestStatus,
    ) -> Result<LedgerEntry, StoreError> {
        self.resolve_ledger(form).await?;
        self.ledger
            .set_status(&form.request_number, target)
            .await
    }

    async fn append_trail(
        &self,
        entry: &LedgerEntry,
        action: TrailAction,
        actor_id: &str,
        comment: Option<String>,
    ) -> Result<TrailEntry, WorkflowError> {
        self.trail
            .append(entry.id, action, actor_id, comment)
            .await
            .map_err(|e| WorkflowError::from_store(&entry.request_number, e))
    }

    /// Audit is best-effort: a sink failure is logged and never rolls back
    /// the transition that just committed.
    async fn notify_audit(&self, request_number: &str, action: RequestAction, actor_id: &str) {
        if let Err(err) = self
            .audit
            .record_transition(request_number, action, actor_id, Utc::now())
            .await
        {
            warn!(
                request_number = %request_number,
                action = %action,
                error = %err,
                "Audit sink rejected transition record; continuing"
            );
        }
    }

    pub(super) async fn lock_request(&self, request_number: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.request_locks.lock().await;
            locks
                .entry(request_number.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

fn ledger_entry_from_form(form: &FormRecord) -> NewLedgerEntry {
    NewLedgerEntry {
        request_number: form.request_number.clone(),
        kind: form.kind(),
        ship_id: form.ship_id.clone(),
        requested_by: form.requester_user_id.clone(),
        requested_at: form.created_at,
        purpose: form.purpose.clone(),
        description: form.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{HardwareChange, InMemoryFormStore};
    use crate::identity::Role;
    use crate::ledger::InMemoryLedgerStore;
    use crate::trail::InMemoryTrailStore;
    use crate::workflow::mocks::RecordingAuditRecorder;

    fn coordinator() -> (WorkflowCoordinator, Arc<RecordingAuditRecorder>) {
        let audit = Arc::new(RecordingAuditRecorder::new());
        let coordinator = WorkflowCoordinator::new(
            Arc::new(InMemoryFormStore::new()),
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryTrailStore::new()),
            audit.clone(),
        );
        (coordinator, audit)
    }

    fn requester() -> UserIdentity {
        UserIdentity::new("u1", Role::User)
    }

    fn admin() -> UserIdentity {
        UserIdentity::new("u2", Role::Administrator)
    }

    fn hardware_form() -> NewForm {
        NewForm {
            requester_user_id: String::new(),
            ship_id: Some("ship-7".to_string()),
            purpose: "Replace radar console".to_string(),
            description: "Bridge console swap".to_string(),
            details: FormDetails::Hardware(HardwareChange::default()),
        }
    }

    #[test]
    fn create_writes_both_records() {
        tokio_test::block_on(async {
            let (coordinator, audit) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();

            let entry = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .expect("ledger entry should exist");
            assert_eq!(entry.status, RequestStatus::Draft);
            assert_eq!(entry.requested_by, "u1");
            assert_eq!(audit.events().await.len(), 1);
        });
    }

    #[test]
    fn submit_requires_the_original_requester() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();

            let err = coordinator
                .submit(&form.request_number, &admin())
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::PermissionDenied { .. }));

            let submitted = coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();
            assert!(submitted.is_under_review);
        });
    }

    #[test]
    fn submit_synthesizes_a_missing_ledger_entry() {
        tokio_test::block_on(async {
            // Form created directly in the store, the way legacy data looks
            // when the ledger row was never written.
            let forms = Arc::new(InMemoryFormStore::new());
            let mut new_form = hardware_form();
            new_form.requester_user_id = "u1".to_string();
            let form = forms.create(new_form).await.unwrap();

            let coordinator = WorkflowCoordinator::new(
                forms,
                Arc::new(InMemoryLedgerStore::new()),
                Arc::new(InMemoryTrailStore::new()),
                Arc::new(RecordingAuditRecorder::new()),
            );

            coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();

            let entry = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .expect("ledger entry should have been synthesized");
            assert_eq!(entry.status, RequestStatus::Submitted);
            assert_eq!(coordinator.history(&form.request_number).await.unwrap().len(), 1);
        });
    }

    #[test]
    fn approve_is_gated_on_role_and_self_approval() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();
            coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();

            let err = coordinator
                .approve(&form.request_number, &requester())
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::PermissionDenied { .. }));

            let self_admin = UserIdentity::new("u1", Role::Administrator);
            let err = coordinator
                .approve(&form.request_number, &self_admin)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::PermissionDenied { .. }));

            let approved = coordinator
                .approve(&form.request_number, &admin())
                .await
                .unwrap();
            assert!(approved.is_approved && !approved.is_under_review);
        });
    }

    #[test]
    fn approve_on_a_draft_changes_nothing() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();
            let before = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();

            let err = coordinator
                .approve(&form.request_number, &admin())
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

            let after = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(before, after);
            assert!(coordinator
                .history(&form.request_number)
                .await
                .unwrap()
                .is_empty());
        });
    }

    #[test]
    fn reject_requires_a_reason_and_clears_the_flags() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();
            coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();

            let err = coordinator
                .reject(&form.request_number, &admin(), "  ")
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::Validation { .. }));

            let rejected = coordinator
                .reject(&form.request_number, &admin(), "vendor is not certified")
                .await
                .unwrap();
            assert!(rejected.is_draft_shaped());

            let entry = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(entry.status, RequestStatus::Rejected);

            let history = coordinator.history(&form.request_number).await.unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[1].action, TrailAction::Reject);
            assert_eq!(
                history[1].comment.as_deref(),
                Some("vendor is not certified")
            );
        });
    }

    #[test]
    fn implement_requires_an_approved_ledger() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();
            coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();

            let err = coordinator
                .implement(&form.request_number, &admin())
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

            coordinator
                .approve(&form.request_number, &admin())
                .await
                .unwrap();
            let entry = coordinator
                .implement(&form.request_number, &admin())
                .await
                .unwrap();
            assert_eq!(entry.status, RequestStatus::Completed);
        });
    }

    #[test]
    fn begin_review_moves_only_the_ledger() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let form = coordinator.create(hardware_form(), &requester()).await.unwrap();
            coordinator
                .submit(&form.request_number, &requester())
                .await
                .unwrap();

            let entry = coordinator
                .begin_review(&form.request_number, &admin())
                .await
                .unwrap();
            assert_eq!(entry.status, RequestStatus::UnderReview);

            // Ledger distinguishes the two pending states; the form cannot,
            // and no trail entry is recorded for the hop.
            let refreshed = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();
            assert!(refreshed.status.is_pending());
            assert_eq!(
                coordinator.history(&entry.request_number).await.unwrap().len(),
                1
            );
        });
    }

    #[test]
    fn review_queue_lists_pending_oldest_first() {
        tokio_test::block_on(async {
            let (coordinator, _) = coordinator();
            let first = coordinator.create(hardware_form(), &requester()).await.unwrap();
            let second = coordinator.create(hardware_form(), &requester()).await.unwrap();
            coordinator.submit(&first.request_number, &requester()).await.unwrap();
            coordinator.submit(&second.request_number, &requester()).await.unwrap();

            let queue = coordinator.review_queue().await.unwrap();
            assert_eq!(queue.len(), 2);
            assert_eq!(queue[0].request_number, first.request_number);
        });
    }
}
