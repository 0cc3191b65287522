//! SQL Gate Core - Two-Stage SQL Threat Detection
//!
//! Classifies arbitrary SQL as safe or threat before it reaches a
//! connected database, and keeps itself current by learning from its own
//! decision history.
//!
//! Pipeline: raw SQL -> [`normalizer`] -> [`rules`] + [`model`] ->
//! [`gate`] -> execution + logged decision -> [`history`] ->
//! [`training`] (periodic) -> new model artifact, hot-swapped into the
//! classifier. The [`driver`] closes the loop with synthetic traffic.

pub mod constants;
pub mod driver;
pub mod gate;
pub mod history;
pub mod model;
pub mod normalizer;
pub mod rules;
pub mod tokenizer;
pub mod training;

pub use driver::{FeedbackConfig, FeedbackDriver, LoopSnapshot, LoopStatus, StartOutcome, StopOutcome};
pub use gate::{Decision, DecisionGate, ExecutionOutcome, GateError, ThresholdBand, Verdict};
pub use history::{DecisionStore, MemoryDecisionStore, SqliteDecisionStore};
pub use model::{ClassifierScore, ScoreSource, SqlClassifier};
pub use normalizer::normalize;
pub use rules::{RuleConfig, RuleEngine, RuleVerdict};
pub use training::{Trainer, TrainingConfig, TrainingError, TrainingOutcome};
