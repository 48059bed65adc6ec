//! Quality-gate verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict an external quality-gate oracle can return.
///
/// Anything other than `Pass` blocks the pipeline when the gate stage
/// carries the abort policy; `Error` is treated as a non-passing verdict,
/// not as a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The analysis met the gate's conditions.
    Pass,
    /// The analysis violated at least one gate condition.
    Fail,
    /// The oracle could not compute a verdict.
    Error,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl Verdict {
    /// Returns true if the verdict allows the pipeline to proceed.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}
