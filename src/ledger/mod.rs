// Request Ledger - kind-agnostic change-request records
// Every specialized form has exactly one ledger entry; the two are joined
// only by the request number, and the workflow coordinator bridges the gap.

pub mod store;
pub mod types;

pub use store::{InMemoryLedgerStore, LedgerStore, StoreError};
pub use types::{LedgerEntry, NewLedgerEntry, RequestKind, RequestStatus};
