use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four specialized request families. The kind decides the request
/// number prefix and which detail bag a form carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Hardware,
    Software,
    SystemPlan,
    SecurityReview,
}

impl RequestKind {
    /// Prefix used in externally visible request numbers.
    pub fn prefix(&self) -> &'static str {
        match self {
            RequestKind::Hardware => "HW",
            RequestKind::Software => "SW",
            RequestKind::SystemPlan => "SP",
            RequestKind::SecurityReview => "SER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Hardware => "hardware change",
            RequestKind::Software => "software change",
            RequestKind::SystemPlan => "system-change plan",
            RequestKind::SecurityReview => "security-review statement",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

impl std::str::FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HW" | "HARDWARE" => Ok(RequestKind::Hardware),
            "SW" | "SOFTWARE" => Ok(RequestKind::Software),
            "SP" | "SYSTEM-PLAN" | "SYSTEMPLAN" => Ok(RequestKind::SystemPlan),
            "SER" | "SECURITY-REVIEW" | "SECURITYREVIEW" => Ok(RequestKind::SecurityReview),
            other => Err(format!("unknown request kind '{other}'")),
        }
    }
}

/// Ledger status. Linear except for the rejection branch:
/// Draft -> Submitted -> UnderReview -> Approved -> Completed, with
/// Rejected reachable from Submitted or UnderReview. An administrator may
/// also approve straight out of Submitted without opening a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Completed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }

    /// Submitted and UnderReview both read as "pending" on the form side,
    /// which only has a single under-review flag.
    pub fn is_pending(self) -> bool {
        matches!(self, RequestStatus::Submitted | RequestStatus::UnderReview)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, UnderReview)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (Approved, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::UnderReview => "under-review",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RequestStatus::Draft),
            "submitted" => Ok(RequestStatus::Submitted),
            "under-review" => Ok(RequestStatus::UnderReview),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "completed" => Ok(RequestStatus::Completed),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

/// Canonical, kind-agnostic record of one change request. Dashboards and
/// approval queues read this; the specialized form carries the kind-specific
/// detail. The two are joined only by `request_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub request_number: String,
    pub kind: RequestKind,
    pub ship_id: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub purpose: String,
    pub description: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a ledger entry. Status always starts at Draft.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub request_number: String,
    pub kind: RequestKind,
    pub ship_id: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub purpose: String,
    pub description: String,
}
