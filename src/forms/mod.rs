// Specialized Forms - the four kind-specific request families
// One generic record with a tagged detail bag; the lifecycle flag pair and
// the request-number namespace are shared across kinds.

pub mod number;
pub mod store;
pub mod types;

pub use store::{FormStore, InMemoryFormStore, DEFAULT_NUMBER_ATTEMPTS};
pub use types::{
    FormDetails, FormRecord, HardwareChange, NewForm, ReviewItem, ReviewOutcome, SecurityReview,
    SoftwareChange, SystemPlanChange,
};
