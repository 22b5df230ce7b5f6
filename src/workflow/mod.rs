// Workflow Coordinator - the core of the change-request lifecycle
// Every lifecycle-changing operation updates a specialized form's flags and
// propagates the equivalent transition to the matching ledger entry,
// creating the entry when the weak request-number join has nothing behind it.

pub mod coordinator;
pub mod errors;
pub mod mocks;
pub mod reconcile;

use serde::{Deserialize, Serialize};

use crate::trail::TrailAction;

pub use coordinator::WorkflowCoordinator;
pub use errors::WorkflowError;
pub use reconcile::{ReconciliationIssue, ReconciliationReport};

/// The full transition alphabet, as reported to the audit sink and carried
/// in errors. A superset of the trail's four actions: Create never reaches
/// the trail, and BeginReview exists only on the ledger side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction {
    Create,
    Edit,
    Submit,
    BeginReview,
    Approve,
    Reject,
    Implement,
}

impl RequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestAction::Create => "create",
            RequestAction::Edit => "edit",
            RequestAction::Submit => "submit",
            RequestAction::BeginReview => "begin-review",
            RequestAction::Approve => "approve",
            RequestAction::Reject => "reject",
            RequestAction::Implement => "implement",
        }
    }
}

impl std::fmt::Display for RequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TrailAction> for RequestAction {
    fn from(action: TrailAction) -> Self {
        match action {
            TrailAction::Submit => RequestAction::Submit,
            TrailAction::Approve => RequestAction::Approve,
            TrailAction::Reject => RequestAction::Reject,
            TrailAction::Implement => RequestAction::Implement,
        }
    }
}
