use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The recorded action alphabet. The trail holds approval-relevant actions
/// only; Create and the administrator's open-for-review hop never appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailAction {
    Submit,
    Approve,
    Reject,
    Implement,
}

impl TrailAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrailAction::Submit => "submit",
            TrailAction::Approve => "approve",
            TrailAction::Reject => "reject",
            TrailAction::Implement => "implement",
        }
    }
}

impl std::fmt::Display for TrailAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrailAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submit" => Ok(TrailAction::Submit),
            "approve" => Ok(TrailAction::Approve),
            "reject" => Ok(TrailAction::Reject),
            "implement" => Ok(TrailAction::Implement),
            other => Err(format!("unknown trail action '{other}'")),
        }
    }
}

/// One stage in the append-only approval history of a ledger entry.
/// Stages are strictly increasing per entry, starting at 1; entries are
/// never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub id: Uuid,
    pub ledger_entry_id: Uuid,
    pub stage: u32,
    pub action: TrailAction,
    pub action_by: String,
    pub action_at: DateTime<Utc>,
    pub comment: Option<String>,
}
