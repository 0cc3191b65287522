//! Feedback Loop Driver
//!
//! Closes the loop: synthetic or replayed traffic flows through the
//! decision gate, outcomes accumulate in counters and in the decision
//! history, and the training pipeline runs on schedule. Loop state lives
//! in one controller-owned object; start/stop are idempotent with
//! distinct no-op outcomes.

pub mod traffic;

pub use traffic::{generate_malicious_queries, generate_safe_queries, SyntheticTraffic, TrafficSource};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::gate::DecisionGate;
use crate::training::{Trainer, TrainingError, TrainingOutcome};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Loop cadence and retraining schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Pause between statements (milliseconds)
    pub interval_ms: u64,
    /// Retrain after every N decisions; None disables scheduled retraining
    pub retrain_every: Option<u64>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            interval_ms: constants::DEFAULT_LOOP_INTERVAL_MS,
            retrain_every: Some(250),
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    Stopped,
    Running,
}

/// Result of a `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of a `stop` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Observability snapshot of the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSnapshot {
    pub status: LoopStatus,
    pub allowed: u64,
    pub blocked: u64,
    pub total: u64,
    pub retrains: u64,
}

/// Counters and the running flag, shared with the worker thread.
#[derive(Default)]
struct LoopState {
    running: AtomicBool,
    allowed: AtomicU64,
    blocked: AtomicU64,
    retrains: AtomicU64,
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Controller for the traffic/retraining loop.
pub struct FeedbackDriver {
    gate: Arc<DecisionGate>,
    trainer: Arc<Trainer>,
    traffic: Arc<dyn TrafficSource>,
    config: FeedbackConfig,
    state: Arc<LoopState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FeedbackDriver {
    pub fn new(
        gate: Arc<DecisionGate>,
        trainer: Arc<Trainer>,
        traffic: Arc<dyn TrafficSource>,
        config: FeedbackConfig,
    ) -> Self {
        Self {
            gate,
            trainer,
            traffic,
            config,
            state: Arc::new(LoopState::default()),
            handle: Mutex::new(None),
        }
    }

    /// Start the loop. Counters reset on a fresh start; starting a running
    /// loop is a reported no-op.
    pub fn start(&self) -> StartOutcome {
        if self
            .state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return StartOutcome::AlreadyRunning;
        }

        self.state.allowed.store(0, Ordering::SeqCst);
        self.state.blocked.store(0, Ordering::SeqCst);
        self.state.retrains.store(0, Ordering::SeqCst);

        let gate = self.gate.clone();
        let trainer = self.trainer.clone();
        let traffic = self.traffic.clone();
        let state = self.state.clone();
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            log::info!("Feedback loop started ({} ms cadence)", config.interval_ms);
            while state.running.load(Ordering::SeqCst) {
                let sql = traffic.next_statement();
                match gate.decide(&sql) {
                    Ok(decision) => {
                        if decision.is_blocked() {
                            state.blocked.fetch_add(1, Ordering::SeqCst);
                        } else {
                            state.allowed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    Err(e) => {
                        log::error!("Feedback loop decide failed: {e}");
                        state.blocked.fetch_add(1, Ordering::SeqCst);
                    }
                }

                let total =
                    state.allowed.load(Ordering::SeqCst) + state.blocked.load(Ordering::SeqCst);
                if let Some(every) = config.retrain_every {
                    if every > 0 && total % every == 0 {
                        match trainer.retrain(gate.history().as_ref(), gate.classifier()) {
                            Ok(outcome) => {
                                state.retrains.fetch_add(1, Ordering::SeqCst);
                                log::info!(
                                    "Scheduled retrain complete: ROC-AUC {:.3}, threshold {:.3}",
                                    outcome.roc_auc,
                                    outcome.threshold
                                );
                            }
                            Err(e) => log::warn!("Scheduled retrain skipped: {e}"),
                        }
                    }
                }

                if config.interval_ms > 0 {
                    thread::sleep(Duration::from_millis(config.interval_ms));
                }
            }
            log::info!("Feedback loop stopped");
        });

        *self.handle.lock() = Some(handle);
        StartOutcome::Started
    }

    /// Stop issuing traffic. Prompt, but an in-flight decide or retrain
    /// runs to completion. Stopping a stopped loop is a reported no-op.
    pub fn stop(&self) -> StopOutcome {
        if self
            .state
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return StopOutcome::NotRunning;
        }
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        StopOutcome::Stopped
    }

    /// On-demand retrain, independent of the schedule.
    pub fn retrain_now(&self) -> Result<TrainingOutcome, TrainingError> {
        let outcome = self
            .trainer
            .retrain(self.gate.history().as_ref(), self.gate.classifier())?;
        self.state.retrains.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    pub fn status(&self) -> LoopStatus {
        if self.state.running.load(Ordering::SeqCst) {
            LoopStatus::Running
        } else {
            LoopStatus::Stopped
        }
    }

    pub fn snapshot(&self) -> LoopSnapshot {
        let allowed = self.state.allowed.load(Ordering::SeqCst);
        let blocked = self.state.blocked.load(Ordering::SeqCst);
        LoopSnapshot {
            status: self.status(),
            allowed,
            blocked,
            total: allowed + blocked,
            retrains: self.state.retrains.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{DecisionGate, NullExecutor};
    use crate::history::MemoryDecisionStore;
    use crate::model::SqlClassifier;
    use crate::rules::{RuleConfig, RuleEngine};
    use crate::training::TrainingConfig;

    fn driver() -> FeedbackDriver {
        let gate = Arc::new(DecisionGate::new(
            RuleEngine::new(RuleConfig::default()),
            Arc::new(SqlClassifier::new()),
            Arc::new(NullExecutor),
            Arc::new(MemoryDecisionStore::new()),
        ));
        FeedbackDriver::new(
            gate,
            Arc::new(Trainer::new(TrainingConfig::default())),
            Arc::new(SyntheticTraffic::new(20)),
            FeedbackConfig {
                interval_ms: 1,
                retrain_every: None,
            },
        )
    }

    #[test]
    fn test_start_is_idempotent() {
        let driver = driver();
        assert_eq!(driver.start(), StartOutcome::Started);
        assert_eq!(driver.start(), StartOutcome::AlreadyRunning);
        driver.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let driver = driver();
        assert_eq!(driver.stop(), StopOutcome::NotRunning);
        driver.start();
        assert_eq!(driver.stop(), StopOutcome::Stopped);
        assert_eq!(driver.stop(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_counters_accumulate_while_running() {
        let driver = driver();
        driver.start();
        std::thread::sleep(Duration::from_millis(100));
        driver.stop();

        let snapshot = driver.snapshot();
        assert_eq!(snapshot.status, LoopStatus::Stopped);
        assert!(snapshot.total > 0);
        assert_eq!(snapshot.total, snapshot.allowed + snapshot.blocked);
    }

    #[test]
    fn test_decisions_reach_history() {
        let driver = driver();
        driver.start();
        std::thread::sleep(Duration::from_millis(100));
        driver.stop();

        let recorded = driver.gate.history().len().unwrap();
        assert_eq!(recorded as u64, driver.snapshot().total);
    }

    #[test]
    fn test_retrain_now_fails_cleanly_on_empty_history() {
        let driver = driver();
        assert!(matches!(
            driver.retrain_now(),
            Err(TrainingError::NoTrainingData)
        ));
        assert_eq!(driver.snapshot().retrains, 0);
    }
}
