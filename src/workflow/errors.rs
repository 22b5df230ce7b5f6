use thiserror::Error;

use crate::identity::IdentityError;
use crate::ledger::{RequestKind, StoreError};

use super::RequestAction;

/// Workflow failure taxonomy. Every variant names the request number and
/// the attempted action where one exists, so callers never see a bare
/// "failed" without context.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Missing or malformed input; surfaced before any state change.
    #[error("validation failed for {request_number}: {reason}")]
    Validation {
        request_number: String,
        reason: String,
    },

    /// Lifecycle precondition violated; rejected before any mutation.
    #[error("cannot {action} {request_number}: {reason}")]
    InvalidTransition {
        request_number: String,
        action: RequestAction,
        reason: String,
    },

    /// Wrong actor or role; rejected before any mutation.
    #[error("{actor_id} may not {action} {request_number}: {reason}")]
    PermissionDenied {
        request_number: String,
        action: RequestAction,
        actor_id: String,
        reason: String,
    },

    /// No form or ledger entry behind the request number; fatal for the
    /// operation.
    #[error("no change request found for {request_number}")]
    NotFound { request_number: String },

    /// Form edits are allowed only while the form is still a draft.
    #[error("form {request_number} can only be edited while in draft")]
    InvalidState { request_number: String },

    #[error("could not allocate a request number for {kind} after {attempts} attempts")]
    RequestNumberExhausted { kind: RequestKind, attempts: u32 },

    /// The one error the coordinator itself can cause: the form-side
    /// mutation committed but the ledger could not be brought along, even
    /// through the resolution fallback. Never swallowed; reconcile() can
    /// repair the ledger side later.
    #[error(
        "{request_number}: form updated for {action} but the ledger update failed after retry; \
         records have diverged: {source}"
    )]
    PartialSync {
        request_number: String,
        action: RequestAction,
        #[source]
        source: StoreError,
    },

    #[error("acting identity could not be resolved: {0}")]
    Identity(#[from] IdentityError),

    /// Store failure outside the partial-sync window.
    #[error("storage failure for {request_number}: {source}")]
    Store {
        request_number: String,
        #[source]
        source: StoreError,
    },
}

impl WorkflowError {
    /// Wrap a store error, lifting the variants that have a direct
    /// workflow-level meaning.
    pub(crate) fn from_store(request_number: &str, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { request_number } => WorkflowError::NotFound { request_number },
            StoreError::InvalidState { request_number } => {
                WorkflowError::InvalidState { request_number }
            }
            StoreError::RequestNumberExhausted { kind, attempts } => {
                WorkflowError::RequestNumberExhausted { kind, attempts }
            }
            StoreError::Validation { reason } => WorkflowError::Validation {
                request_number: request_number.to_string(),
                reason,
            },
            other => WorkflowError::Store {
                request_number: request_number.to_string(),
                source: other,
            },
        }
    }
}
