//! Display-only generation progress estimate.
//!
//! The pipeline reports no native progress signal, so progress is
//! estimated from wall-clock time against an expected duration. The
//! estimate is capped below 100% until a terminal state is observed and
//! must never gate any lifecycle decision.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synthetic stage label assigned by elapsed-time thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Planning,
    Coding,
    Testing,
    Refining,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Coding => "coding",
            Self::Testing => "testing",
            Self::Refining => "refining",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Planning => "analyzing the requirement",
            Self::Coding => "generating code",
            Self::Testing => "running generated tests",
            Self::Refining => "refining the result",
        }
    }
}

/// Progress estimate for an in-flight generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEstimate {
    /// Percentage in [0, 95]
    pub percent: u8,
    pub stage: GenerationStage,
}

const PLANNING_CUTOFF: Duration = Duration::from_secs(60);
const CODING_CUTOFF: Duration = Duration::from_secs(180);
const TESTING_CUTOFF: Duration = Duration::from_secs(240);
const PROGRESS_CAP: u8 = 95;

/// Estimate progress from elapsed time and the expected total duration.
pub fn estimate(elapsed: Duration, expected: Duration) -> ProgressEstimate {
    let expected_secs = expected.as_secs_f64().max(1.0);
    let raw = (elapsed.as_secs_f64() / expected_secs * 100.0) as u64;
    let percent = raw.min(u64::from(PROGRESS_CAP)) as u8;

    let stage = if elapsed < PLANNING_CUTOFF {
        GenerationStage::Planning
    } else if elapsed < CODING_CUTOFF {
        GenerationStage::Coding
    } else if elapsed < TESTING_CUTOFF {
        GenerationStage::Testing
    } else {
        GenerationStage::Refining
    };

    ProgressEstimate { percent, stage }
}
