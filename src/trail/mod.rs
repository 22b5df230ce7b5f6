// Approval Trail - append-only history of stage actions per ledger entry

pub mod store;
pub mod types;

pub use store::{InMemoryTrailStore, TrailStore};
pub use types::{TrailAction, TrailEntry};
