// Request number generation: <PREFIX>-<yyyyMM>-<ddHHmm>, retried with
// random alphanumeric padding when two requests land in the same minute.

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::ledger::RequestKind;

/// Extra characters appended on retry so numbers stay collision-resistant
/// within one minute.
const RETRY_PAD_LEN: usize = 2;

/// Generate a candidate request number. Attempt 0 is the plain
/// day+time suffix; later attempts append random padding.
pub fn generate(kind: RequestKind, now: DateTime<Utc>, attempt: u32) -> String {
    let base = format!(
        "{}-{}-{}",
        kind.prefix(),
        now.format("%Y%m"),
        now.format("%d%H%M")
    );
    if attempt == 0 {
        return base;
    }

    let mut rng = rand::rng();
    let pad: String = (0..RETRY_PAD_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect();
    format!("{base}{pad}")
}

/// Recover the kind from a request number's prefix, if it carries one.
pub fn kind_of(request_number: &str) -> Option<RequestKind> {
    let prefix = request_number.split('-').next()?;
    prefix.parse().ok()
}
