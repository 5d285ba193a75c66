//! Aggregate outcome of a fan-out call.

use serde::{Deserialize, Serialize};

/// How a completed `publish` or `execute_all` call went overall.
///
/// Calls that are rejected outright (unknown names, duplicate registrations)
/// return an `Err` instead and never produce an `Outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No unit of work failed. Also used when there was nothing to do.
    Success,
    /// Some units failed, at least one succeeded.
    PartialFailure,
    /// Every unit of work failed.
    Failure,
}

impl Outcome {
    /// Classifies `failed` failures out of `total` units.
    pub fn classify(total: usize, failed: usize) -> Self {
        match failed {
            0 => Self::Success,
            f if f >= total => Self::Failure,
            _ => Self::PartialFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
