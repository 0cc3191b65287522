//! Training Pipeline - Refit, Calibrate, Publish
//!
//! Reads labeled decision history, fits the vectorizer + logistic model
//! with a reproducible stratified split and a cross-validated grid search,
//! calibrates the blocking threshold against a precision target, persists
//! a new artifact, and atomically publishes it.

pub mod metrics;
pub mod pipeline;
pub mod split;


pub use metrics::{ClassificationReport, ClassMetrics, PrPoint};
pub use pipeline::{Trainer, TrainingConfig, TrainingError, TrainingOutcome};
