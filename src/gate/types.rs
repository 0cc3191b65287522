//! Decision Gate Types
//!
//! Data structures only - no gating logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ClassifierScore;
use crate::rules::RuleVerdict;

// ============================================================================
// VERDICT & OUTCOME
// ============================================================================

/// Final allow/block decision for one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "allowed",
            Verdict::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened when (and if) the statement ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Returned a result set
    Rows {
        count: usize,
        rows: Vec<serde_json::Value>,
    },
    /// Non-returning statement; affected-row count
    RowCount(usize),
    /// Execution was attempted and failed (engine error or no connection)
    Error(String),
    /// Blocked; execution never attempted
    Skipped,
}

impl ExecutionOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionOutcome::Error(_))
    }
}

/// One evaluated statement. Immutable after creation; appended to the
/// decision history exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub statement: String,
    pub rule_verdict: RuleVerdict,
    pub score: ClassifierScore,
    pub verdict: Verdict,
    /// Score fell in the suspicious band: allowed but surfaced for audit
    pub flagged: bool,
    pub outcome: ExecutionOutcome,
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        self.verdict == Verdict::Blocked
    }
}

// ============================================================================
// THRESHOLD BANDS
// ============================================================================

/// Which band a probability falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Safe,
    Suspicious,
    LikelyThreat,
}

/// Probability cut-points separating ALLOWED / flagged-ALLOWED / BLOCKED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdBand {
    /// Below this = safe
    pub low: f32,
    /// At or above this = blocked
    pub high: f32,
}

impl Default for ThresholdBand {
    fn default() -> Self {
        Self {
            low: crate::constants::DEFAULT_LOW_THRESHOLD,
            high: crate::constants::DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl ThresholdBand {
    /// Lower cut-points, more blocking
    pub fn high_sensitivity() -> Self {
        Self { low: 0.3, high: 0.6 }
    }

    /// Higher cut-points, fewer blocks
    pub fn low_sensitivity() -> Self {
        Self { low: 0.6, high: 0.9 }
    }

    pub fn band(&self, probability: f32) -> ScoreBand {
        if probability >= self.high {
            ScoreBand::LikelyThreat
        } else if probability >= self.low {
            ScoreBand::Suspicious
        } else {
            ScoreBand::Safe
        }
    }
}
