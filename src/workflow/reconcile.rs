// Reconciliation - first-class repair for the weak form/ledger join
// The form is the richer source of truth: missing ledger entries are
// synthesized, mismatched ones are walked forward through legal status
// changes only. What cannot be repaired legally is reported, not forced.

use serde::Serialize;
use tracing::{info, warn};

use crate::forms::{FormRecord, FormStore};
use crate::ledger::{LedgerStore, RequestStatus, StoreError};

use super::coordinator::WorkflowCoordinator;
use super::errors::WorkflowError;

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationIssue {
    pub request_number: String,
    pub ledger_status: RequestStatus,
    pub is_under_review: bool,
    pub is_approved: bool,
    pub reason: String,
}

/// Outcome of one reconciliation sweep across every form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub scanned: usize,
    pub clean: usize,
    /// Request numbers whose ledger entry had to be synthesized.
    pub created: Vec<String>,
    /// Request numbers whose ledger status was moved to match the form.
    pub repaired: Vec<String>,
    /// Divergences no legal transition sequence can fix.
    pub unrepairable: Vec<ReconciliationIssue>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.created.is_empty() && self.repaired.is_empty() && self.unrepairable.is_empty()
    }
}

impl WorkflowCoordinator {
    /// Sweep all forms and repair the ledger side of any divergence.
    pub async fn reconcile(&self) -> Result<ReconciliationReport, WorkflowError> {
        let forms = self
            .forms
            .list()
            .await
            .map_err(|e| WorkflowError::from_store("(reconcile)", e))?;

        let mut report = ReconciliationReport {
            scanned: forms.len(),
            ..Default::default()
        };

        for form in forms {
            let _guard = self.lock_request(&form.request_number).await;

            let entry = self
                .ledger
                .find_by_request_number(&form.request_number)
                .await
                .map_err(|e| WorkflowError::from_store(&form.request_number, e))?;

            match entry {
                None => {
                    let entry = self
                        .resolve_ledger(&form)
                        .await
                        .map_err(|e| WorkflowError::from_store(&form.request_number, e))?;
                    let target = implied_status(&form);
                    match self.advance_ledger_to(&form, entry.status, target).await {
                        Ok(()) => {
                            info!(
                                request_number = %form.request_number,
                                target = %target,
                                "Reconciliation synthesized a missing ledger entry"
                            );
                            report.created.push(form.request_number.clone());
                        }
                        Err(err) => report.unrepairable.push(issue(&form, entry.status, &err)),
                    }
                }
                Some(entry) if statuses_correspond(&form, entry.status) => {
                    report.clean += 1;
                }
                Some(entry) => {
                    let target = implied_status(&form);
                    match self.advance_ledger_to(&form, entry.status, target).await {
                        Ok(()) => {
                            info!(
                                request_number = %form.request_number,
                                from = %entry.status,
                                to = %target,
                                "Reconciliation repaired a diverged ledger entry"
                            );
                            report.repaired.push(form.request_number.clone());
                        }
                        Err(err) => {
                            warn!(
                                request_number = %form.request_number,
                                ledger_status = %entry.status,
                                error = %err,
                                "Divergence cannot be repaired through legal transitions"
                            );
                            report.unrepairable.push(issue(&form, entry.status, &err));
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    async fn advance_ledger_to(
        &self,
        form: &FormRecord,
        mut current: RequestStatus,
        target: RequestStatus,
    ) -> Result<(), StoreError> {
        while current != target {
            let Some(next) = next_step_toward(current, target) else {
                return Err(StoreError::InvalidTransition {
                    request_number: form.request_number.clone(),
                    from: current,
                    to: target,
                });
            };
            let entry = self.ledger.set_status(&form.request_number, next).await?;
            current = entry.status;
        }
        Ok(())
    }
}

fn issue(form: &FormRecord, status: RequestStatus, err: &StoreError) -> ReconciliationIssue {
    ReconciliationIssue {
        request_number: form.request_number.clone(),
        ledger_status: status,
        is_under_review: form.is_under_review,
        is_approved: form.is_approved,
        reason: err.to_string(),
    }
}

/// Quiescent-state correspondence between the form's flag pair and the
/// ledger status. Completed keeps the approved-era flags (the form has no
/// completion flag), and a flags-cleared form matches both Draft and the
/// terminal Rejected.
fn statuses_correspond(form: &FormRecord, status: RequestStatus) -> bool {
    if form.is_approved {
        matches!(status, RequestStatus::Approved | RequestStatus::Completed)
    } else if form.is_under_review {
        status.is_pending()
    } else {
        matches!(status, RequestStatus::Draft | RequestStatus::Rejected)
    }
}

/// The minimal ledger status a form's flags imply.
fn implied_status(form: &FormRecord) -> RequestStatus {
    if form.is_approved {
        RequestStatus::Approved
    } else if form.is_under_review {
        RequestStatus::Submitted
    } else {
        RequestStatus::Draft
    }
}

/// One legal step from `current` toward `target`, or None when no legal
/// path exists (the ledger never moves backwards or out of a terminal
/// state during repair).
fn next_step_toward(current: RequestStatus, target: RequestStatus) -> Option<RequestStatus> {
    use RequestStatus::*;
    match (current, target) {
        (Draft, Submitted | UnderReview | Approved | Completed) => Some(Submitted),
        (Submitted, UnderReview) => Some(UnderReview),
        (Submitted | UnderReview, Approved | Completed) => Some(Approved),
        (Submitted | UnderReview, Rejected) => Some(Rejected),
        (Approved, Completed) => Some(Completed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::forms::{FormDetails, FormStore, InMemoryFormStore, NewForm, SoftwareChange};
    use crate::ledger::{InMemoryLedgerStore, LedgerStore};
    use crate::trail::InMemoryTrailStore;
    use crate::workflow::mocks::RecordingAuditRecorder;

    fn software_form() -> NewForm {
        NewForm {
            requester_user_id: "u1".to_string(),
            ship_id: None,
            purpose: "Upgrade chart plotter firmware".to_string(),
            description: "Vendor security release".to_string(),
            details: FormDetails::Software(SoftwareChange::default()),
        }
    }

    fn coordinator_with(forms: Arc<InMemoryFormStore>) -> WorkflowCoordinator {
        WorkflowCoordinator::new(
            forms,
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryTrailStore::new()),
            Arc::new(RecordingAuditRecorder::new()),
        )
    }

    #[test]
    fn missing_ledger_entries_are_synthesized_and_walked() {
        tokio_test::block_on(async {
            let forms = Arc::new(InMemoryFormStore::new());
            let form = forms.create(software_form()).await.unwrap();
            forms.mark_under_review(form.id).await.unwrap();
            forms.mark_approved(form.id).await.unwrap();

            let coordinator = coordinator_with(forms);
            let report = coordinator.reconcile().await.unwrap();

            assert_eq!(report.scanned, 1);
            assert_eq!(report.created, vec![form.request_number.clone()]);
            assert!(report.unrepairable.is_empty());

            let entry = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(entry.status, RequestStatus::Approved);
        });
    }

    #[test]
    fn stale_ledger_status_is_repaired_toward_the_form() {
        tokio_test::block_on(async {
            let forms = Arc::new(InMemoryFormStore::new());
            let form = forms.create(software_form()).await.unwrap();
            let coordinator = coordinator_with(forms.clone());

            // Ledger exists but was left behind at Draft while the form
            // says pending.
            coordinator.reconcile().await.unwrap();
            forms.mark_under_review(form.id).await.unwrap();

            let report = coordinator.reconcile().await.unwrap();
            assert_eq!(report.repaired, vec![form.request_number.clone()]);

            let entry = coordinator
                .status_of(&form.request_number)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(entry.status, RequestStatus::Submitted);
        });
    }

    #[test]
    fn ledger_ahead_of_the_form_is_reported_not_forced() {
        tokio_test::block_on(async {
            let forms = Arc::new(InMemoryFormStore::new());
            let form = forms.create(software_form()).await.unwrap();
            forms.mark_under_review(form.id).await.unwrap();

            let coordinator = coordinator_with(forms);
            // Walk the ledger all the way to Approved while the form still
            // says pending: repair would require moving backwards.
            coordinator.reconcile().await.unwrap();
            coordinator
                .ledger
                .set_status(&form.request_number, RequestStatus::Approved)
                .await
                .unwrap();

            let report = coordinator.reconcile().await.unwrap();
            assert_eq!(report.unrepairable.len(), 1);
            assert_eq!(
                report.unrepairable[0].request_number,
                form.request_number
            );
        });
    }

    #[test]
    fn rejected_ledger_with_cleared_flags_is_clean() {
        tokio_test::block_on(async {
            let forms = Arc::new(InMemoryFormStore::new());
            let form = forms.create(software_form()).await.unwrap();
            forms.mark_under_review(form.id).await.unwrap();

            let coordinator = coordinator_with(forms.clone());
            coordinator.reconcile().await.unwrap();
            coordinator
                .ledger
                .set_status(&form.request_number, RequestStatus::Rejected)
                .await
                .unwrap();
            forms.mark_rejected(form.id).await.unwrap();

            let report = coordinator.reconcile().await.unwrap();
            assert_eq!(report.clean, 1);
            assert!(report.is_clean());
        });
    }
}
