//! Decision Gate - Final Allow/Block Authority
//!
//! Pipeline: rules first (cheap, deterministic, authoritative), then the
//! statistical classifier banded by thresholds. Allowed statements run in
//! a scoped transaction; every call appends exactly one decision to the
//! history before returning it.

pub mod executor;
pub mod types;

#[cfg(test)]
mod tests;

pub use executor::{ExecError, ExecOutput, NullExecutor, SqlExecutor, SqliteExecutor};
pub use types::{Decision, ExecutionOutcome, ScoreBand, ThresholdBand, Verdict};

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::history::{DecisionStore, StoreError};
use crate::model::SqlClassifier;
use crate::rules::RuleEngine;

#[derive(Debug, Error)]
pub enum GateError {
    /// The decision could not be durably recorded; it must not be
    /// reported as recorded.
    #[error("decision history append failed: {0}")]
    Store(#[from] StoreError),
}

/// The sole entry point for statement evaluation.
pub struct DecisionGate {
    rules: RuleEngine,
    classifier: Arc<SqlClassifier>,
    executor: Arc<dyn SqlExecutor>,
    history: Arc<dyn DecisionStore>,
    band: ThresholdBand,
}

impl DecisionGate {
    pub fn new(
        rules: RuleEngine,
        classifier: Arc<SqlClassifier>,
        executor: Arc<dyn SqlExecutor>,
        history: Arc<dyn DecisionStore>,
    ) -> Self {
        Self::with_band(rules, classifier, executor, history, ThresholdBand::default())
    }

    pub fn with_band(
        rules: RuleEngine,
        classifier: Arc<SqlClassifier>,
        executor: Arc<dyn SqlExecutor>,
        history: Arc<dyn DecisionStore>,
        band: ThresholdBand,
    ) -> Self {
        Self {
            rules,
            classifier,
            executor,
            history,
            band,
        }
    }

    pub fn classifier(&self) -> &Arc<SqlClassifier> {
        &self.classifier
    }

    pub fn history(&self) -> &Arc<dyn DecisionStore> {
        &self.history
    }

    /// Blocking cut-point currently in force: the calibrated artifact
    /// threshold when a model is active, the configured band otherwise.
    pub fn effective_high(&self) -> f32 {
        self.classifier.threshold().unwrap_or(self.band.high)
    }

    /// Evaluate one statement, execute it if allowed, record the decision.
    pub fn decide(&self, raw: &str) -> Result<Decision, GateError> {
        let rule_verdict = self.rules.evaluate(raw);
        // Scored even when rules already decided; the log wants both signals.
        let score = self.classifier.score(raw);

        let high = self.effective_high();
        let low = self.band.low;

        let (verdict, flagged, outcome) = if !rule_verdict.is_safe {
            log::warn!("Blocked by rules: {}", rule_verdict.reason);
            (Verdict::Blocked, false, ExecutionOutcome::Skipped)
        } else if score.probability >= high {
            log::warn!(
                "Blocked by classifier: probability {:.3} >= {:.3}",
                score.probability,
                high
            );
            (Verdict::Blocked, false, ExecutionOutcome::Skipped)
        } else {
            let flagged = score.probability >= low;
            if flagged {
                log::warn!(
                    "Suspicious but allowed: probability {:.3} in [{:.3}, {:.3})",
                    score.probability,
                    low,
                    high
                );
            }
            (Verdict::Allowed, flagged, self.run(raw))
        };

        let decision = Decision {
            id: Uuid::new_v4(),
            statement: raw.to_string(),
            rule_verdict,
            score,
            verdict,
            flagged,
            outcome,
            decided_at: Utc::now(),
        };

        self.history.append(&decision)?;
        log::debug!("Decision {} recorded: {}", decision.id, decision.verdict);
        Ok(decision)
    }

    /// Execution failures become outcomes, never gate errors: the block
    /// decision is about threat classification, not SQL validity.
    fn run(&self, raw: &str) -> ExecutionOutcome {
        match self.executor.execute(raw) {
            Ok(ExecOutput::Rows(rows)) => ExecutionOutcome::Rows {
                count: rows.len(),
                rows,
            },
            Ok(ExecOutput::Affected(n)) => ExecutionOutcome::RowCount(n),
            Err(e) => {
                log::debug!("Execution outcome error: {e}");
                ExecutionOutcome::Error(e.to_string())
            }
        }
    }
}
