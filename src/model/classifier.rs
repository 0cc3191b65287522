//! Statistical Classifier - Inference over the Active Artifact
//!
//! Holds the single active `ModelArtifact` behind an RwLock'd Arc. Readers
//! clone the Arc and score outside the lock; `publish` swaps the pointer,
//! so in-flight predictions always complete against one consistent
//! artifact. `score` never fails: faults and the untrained state degrade
//! to probability 0.0 with a type-visible source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::normalize;

use super::artifact::{ArtifactStore, ModelArtifact};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no trained model is active")]
    Untrained,
    #[error("inference fault: {0}")]
    Inference(#[from] super::ModelError),
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Where a probability came from; makes the conservative fallback visible
/// instead of an implicit swallowed exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreSource {
    /// Produced by the active model
    Model,
    /// No model active yet
    Untrained,
    /// Inference failed; probability degraded to 0.0
    Fault(String),
}

/// Suspicion probability for one statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierScore {
    /// P(threat) in [0, 1]
    pub probability: f32,
    pub source: ScoreSource,
}

/// Status snapshot for observability surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierStatus {
    pub trained: bool,
    pub trained_at: Option<DateTime<Utc>>,
    pub vocabulary_size: usize,
    pub threshold: Option<f32>,
    pub roc_auc: Option<f32>,
    pub predictions: u64,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// The inference half of the two-stage detector.
pub struct SqlClassifier {
    active: RwLock<Option<Arc<ModelArtifact>>>,
    predictions: AtomicU64,
}

impl SqlClassifier {
    /// Start untrained; every score is 0.0 until the first publish.
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
            predictions: AtomicU64::new(0),
        }
    }

    /// Start from the newest persisted artifact if one loads cleanly.
    pub fn from_store(store: &ArtifactStore) -> Self {
        let classifier = Self::new();
        match store.load_latest() {
            Ok(Some(artifact)) => {
                log::info!(
                    "Loaded model artifact trained at {} ({} features)",
                    artifact.trained_at,
                    artifact.vectorizer.vocabulary_len()
                );
                classifier.publish(artifact);
            }
            Ok(None) => {
                log::info!("No model artifact found - classifier starts untrained");
            }
            Err(e) => {
                log::warn!("Model artifact load failed: {e} - classifier starts untrained");
            }
        }
        classifier
    }

    /// Atomically swap in a new artifact. In-flight scores keep the Arc
    /// they already cloned; the old artifact is never observed again by
    /// new calls.
    pub fn publish(&self, artifact: ModelArtifact) {
        let artifact = Arc::new(artifact);
        *self.active.write() = Some(artifact.clone());
        log::info!(
            "Model artifact published (threshold {:.3}, roc_auc {:.3})",
            artifact.threshold,
            artifact.metrics.roc_auc
        );
    }

    pub fn active(&self) -> Option<Arc<ModelArtifact>> {
        self.active.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.active.read().is_some()
    }

    /// Calibrated blocking threshold of the active artifact.
    pub fn threshold(&self) -> Option<f32> {
        self.active.read().as_ref().map(|a| a.threshold)
    }

    /// Fallible scoring path; callers wanting the conservative fallback
    /// use `score` instead.
    pub fn try_score(&self, raw: &str) -> Result<f32, PredictError> {
        let artifact = self.active().ok_or(PredictError::Untrained)?;
        let normalized = normalize(raw);
        let vector = artifact.vectorizer.transform(&normalized)?;
        Ok(artifact.predict_proba(&vector)?)
    }

    /// Score a statement. Never fails: untrained or faulted inference
    /// yields probability 0.0 and records why.
    pub fn score(&self, raw: &str) -> ClassifierScore {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        match self.try_score(raw) {
            Ok(probability) => ClassifierScore {
                probability,
                source: ScoreSource::Model,
            },
            Err(PredictError::Untrained) => ClassifierScore {
                probability: 0.0,
                source: ScoreSource::Untrained,
            },
            Err(e) => {
                log::warn!("Classifier inference fault, degrading to 0.0: {e}");
                ClassifierScore {
                    probability: 0.0,
                    source: ScoreSource::Fault(e.to_string()),
                }
            }
        }
    }

    pub fn status(&self) -> ClassifierStatus {
        let active = self.active.read();
        ClassifierStatus {
            trained: active.is_some(),
            trained_at: active.as_ref().map(|a| a.trained_at),
            vocabulary_size: active
                .as_ref()
                .map(|a| a.vectorizer.vocabulary_len())
                .unwrap_or(0),
            threshold: active.as_ref().map(|a| a.threshold),
            roc_auc: active.as_ref().map(|a| a.metrics.roc_auc),
            predictions: self.predictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::{ArtifactMetrics, ARTIFACT_FORMAT_VERSION};
    use crate::model::vectorizer::TfidfVectorizer;

    /// Artifact whose only strong signal is the "or" token family.
    fn tautology_artifact() -> ModelArtifact {
        let docs = vec![
            "select name from customer where id = val_str or val_str = val_str".to_string(),
            "select title from film where id = val_str or val_str = val_str".to_string(),
            "select name from customer limit val_num".to_string(),
            "select title from film limit val_num".to_string(),
        ];
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&docs).unwrap();

        let n = vectorizer.vocabulary_len();
        let mut weights = vec![0.0f32; n];
        let tautology = vectorizer.transform("val_str or val_str = val_str").unwrap();
        for (index, _) in tautology {
            weights[index] = 12.0;
        }
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            vocab_hash: vectorizer.vocab_hash(),
            vectorizer,
            weights,
            bias: -4.0,
            threshold: 0.8,
            metrics: ArtifactMetrics::default(),
        }
    }

    #[test]
    fn test_untrained_scores_zero() {
        let classifier = SqlClassifier::new();
        let score = classifier.score("SELECT * FROM customer;");
        assert_eq!(score.probability, 0.0);
        assert_eq!(score.source, ScoreSource::Untrained);
    }

    #[test]
    fn test_trained_scores_use_model() {
        let classifier = SqlClassifier::new();
        classifier.publish(tautology_artifact());

        let benign = classifier.score("SELECT name FROM customer LIMIT 10;");
        assert_eq!(benign.source, ScoreSource::Model);
        assert!(benign.probability < 0.5);

        let tautology = classifier.score("SELECT name FROM customer WHERE id = '' OR '1'='1';");
        assert_eq!(tautology.source, ScoreSource::Model);
        assert!(tautology.probability >= 0.8);
    }

    #[test]
    fn test_publish_swaps_artifact() {
        let classifier = SqlClassifier::new();
        classifier.publish(tautology_artifact());
        let before = classifier.active().unwrap();

        let mut replacement = tautology_artifact();
        replacement.threshold = 0.65;
        classifier.publish(replacement);

        let after = classifier.active().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(classifier.threshold(), Some(0.65));
    }

    #[test]
    fn test_inference_fault_degrades_to_zero() {
        let classifier = SqlClassifier::new();
        let mut broken = tautology_artifact();
        broken.weights.pop(); // dimension mismatch
        classifier.publish(broken);

        let score = classifier.score("SELECT name FROM customer;");
        assert_eq!(score.probability, 0.0);
        assert!(matches!(score.source, ScoreSource::Fault(_)));
    }

    #[test]
    fn test_prediction_counter() {
        let classifier = SqlClassifier::new();
        classifier.score("SELECT 1;");
        classifier.score("SELECT 2;");
        assert_eq!(classifier.status().predictions, 2);
    }
}
