use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::RequestKind;

/// Before/after field pairs for a hardware change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareChange {
    pub manufacturer_before: Option<String>,
    pub manufacturer_after: Option<String>,
    pub model_before: Option<String>,
    pub model_after: Option<String>,
    pub os_before: Option<String>,
    pub os_after: Option<String>,
}

/// Before/after field pairs for a software change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareChange {
    pub name_before: Option<String>,
    pub name_after: Option<String>,
    pub version_before: Option<String>,
    pub version_after: Option<String>,
}

/// Free-text plan for a system-level change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPlanChange {
    pub plan_details: String,
    pub affected_systems: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    Pass,
    Fail,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub item: String,
    pub outcome: ReviewOutcome,
    pub remarks: Option<String>,
}

/// Structured item results for a security-review statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReview {
    pub items: Vec<ReviewItem>,
}

/// Kind-specific detail bag. All four kinds share one record shape, one
/// lifecycle flag pair and one request-number namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormDetails {
    Hardware(HardwareChange),
    Software(SoftwareChange),
    SystemPlan(SystemPlanChange),
    SecurityReview(SecurityReview),
}

impl FormDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            FormDetails::Hardware(_) => RequestKind::Hardware,
            FormDetails::Software(_) => RequestKind::Software,
            FormDetails::SystemPlan(_) => RequestKind::SystemPlan,
            FormDetails::SecurityReview(_) => RequestKind::SecurityReview,
        }
    }

    /// Empty detail bag for a kind, for forms created before data entry.
    pub fn empty_for(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Hardware => FormDetails::Hardware(HardwareChange::default()),
            RequestKind::Software => FormDetails::Software(SoftwareChange::default()),
            RequestKind::SystemPlan => FormDetails::SystemPlan(SystemPlanChange::default()),
            RequestKind::SecurityReview => {
                FormDetails::SecurityReview(SecurityReview::default())
            }
        }
    }
}

/// One specialized request form. `is_under_review` / `is_approved` are the
/// form's whole view of the lifecycle; the matching ledger entry holds the
/// finer-grained status. `is_approved` implies the form passed through
/// review, and implies `!is_under_review`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: Uuid,
    pub request_number: String,
    pub requester_user_id: String,
    pub ship_id: Option<String>,
    pub purpose: String,
    pub description: String,
    pub details: FormDetails,
    pub is_under_review: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormRecord {
    pub fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    /// Both flags false: either never submitted or rejected. The ledger
    /// disambiguates.
    pub fn is_draft_shaped(&self) -> bool {
        !self.is_under_review && !self.is_approved
    }
}

/// Input for creating a form. The store assigns id, request number, flags
/// and timestamps.
#[derive(Debug, Clone)]
pub struct NewForm {
    pub requester_user_id: String,
    pub ship_id: Option<String>,
    pub purpose: String,
    pub description: String,
    pub details: FormDetails,
}
