//! Core domain types: run/stage statuses, verdicts, and stage outcomes.

mod outcome;
mod status;
mod verdict;

pub use outcome::StageOutcome;
pub use status::{RunStatus, StageStatus};
pub use verdict::Verdict;
