//! Retraining Orchestration

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::history::{DecisionStore, LabeledStatement, StoreError};
use crate::model::artifact::{ArtifactError, ArtifactMetrics, ArtifactStore, ModelArtifact, ARTIFACT_FORMAT_VERSION};
use crate::model::{LogisticConfig, LogisticModel, ModelError, SparseVector, SqlClassifier, TfidfVectorizer};
use crate::normalizer::normalize;

use super::metrics::{self, ClassificationReport};
use super::split::{stratified_kfold, stratified_split};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no training data in decision history")]
    NoTrainingData,
    #[error("decision history contains a single class")]
    SingleClass,
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("history read failed: {0}")]
    Store(#[from] StoreError),
    #[error("artifact persistence failed: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Pipeline hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Held-out fraction of the labeled set
    pub test_size: f32,
    /// Folds for the cross-validated grid search
    pub cv_folds: usize,
    /// Regularization-strength candidates
    pub c_grid: Vec<f32>,
    /// Precision the calibrated threshold must reach
    pub target_precision: f32,
    /// Split/fold seed for reproducibility
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: constants::DEFAULT_TEST_SIZE,
            cv_folds: constants::DEFAULT_CV_FOLDS,
            c_grid: constants::DEFAULT_C_GRID.to_vec(),
            target_precision: constants::DEFAULT_TARGET_PRECISION,
            seed: constants::DEFAULT_TRAIN_SEED,
        }
    }
}

/// What `retrain` hands back to the caller.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: ClassificationReport,
    pub roc_auc: f32,
    pub threshold: f32,
    /// No cut-point met the precision target; previous threshold kept
    pub calibration_degraded: bool,
    pub best_c: f32,
    pub train_samples: usize,
    pub test_samples: usize,
    pub artifact_path: Option<PathBuf>,
    pub trained_at: DateTime<Utc>,
}

/// Owns artifact creation. Long-running by design; never holds a lock
/// that would block inference, only the final publish swap does.
pub struct Trainer {
    config: TrainingConfig,
    artifacts: Option<ArtifactStore>,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            artifacts: None,
        }
    }

    /// Also persist each new artifact through this store.
    pub fn with_store(config: TrainingConfig, artifacts: ArtifactStore) -> Self {
        Self {
            config,
            artifacts: Some(artifacts),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Rebuild the model from decision history and publish it.
    ///
    /// Failures before the publish step leave the active artifact (and any
    /// persisted files) untouched.
    pub fn retrain(
        &self,
        history: &dyn DecisionStore,
        classifier: &Arc<SqlClassifier>,
    ) -> Result<TrainingOutcome, TrainingError> {
        let labeled = history.labeled()?;
        self.retrain_on(&labeled, classifier)
    }

    /// Same pipeline over an externally supplied labeled set.
    pub fn retrain_on(
        &self,
        labeled: &[LabeledStatement],
        classifier: &Arc<SqlClassifier>,
    ) -> Result<TrainingOutcome, TrainingError> {
        if labeled.is_empty() {
            return Err(TrainingError::NoTrainingData);
        }
        let labels: Vec<u8> = labeled.iter().map(|l| l.label).collect();
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == labels.len() {
            return Err(TrainingError::SingleClass);
        }

        log::info!(
            "Retraining on {} decisions ({} blocked, {} allowed)",
            labels.len(),
            positives,
            labels.len() - positives
        );

        // The exact inference-time normalization; the two paths share one
        // implementation by construction.
        let docs: Vec<String> = labeled.iter().map(|l| normalize(&l.statement)).collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let (train_idx, test_idx) = stratified_split(&labels, self.config.test_size, &mut rng);

        let train_docs: Vec<String> = train_idx.iter().map(|&i| docs[i].clone()).collect();
        let train_labels: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();
        let test_docs: Vec<String> = test_idx.iter().map(|&i| docs[i].clone()).collect();
        let test_labels: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();

        // Fitted on the training partition only; the held-out partition is
        // only ever transformed.
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&train_docs)?;
        let train_x = vectorizer.transform_all(&train_docs)?;
        let test_x = vectorizer.transform_all(&test_docs)?;
        let n_features = vectorizer.vocabulary_len();

        let best_c = self.grid_search(&train_x, &train_labels, n_features, &mut rng)?;
        log::info!("Grid search selected C = {best_c}");

        let model = LogisticModel::fit(
            &train_x,
            &train_labels,
            n_features,
            &LogisticConfig::with_c(best_c),
        )?;

        let mut y_pred = Vec::with_capacity(test_x.len());
        let mut y_prob = Vec::with_capacity(test_x.len());
        for row in &test_x {
            y_prob.push(model.predict_proba(row)?);
            y_pred.push(model.predict(row)?);
        }

        let report = metrics::classification_report(&test_labels, &y_pred);
        let roc_auc = metrics::roc_auc(&test_labels, &y_prob);
        log::info!("Held-out ROC-AUC: {roc_auc:.4}");

        let (threshold, calibration_degraded) =
            match metrics::calibrate_threshold(&test_labels, &y_prob, self.config.target_precision) {
                Some(threshold) => (threshold, false),
                None => {
                    let previous = classifier
                        .threshold()
                        .unwrap_or(constants::DEFAULT_HIGH_THRESHOLD);
                    log::warn!(
                        "Calibration degraded: no cut-point reaches precision {:.2}, keeping threshold {previous:.3}",
                        self.config.target_precision
                    );
                    (previous, true)
                }
            };

        let trained_at = Utc::now();
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at,
            vocab_hash: vectorizer.vocab_hash(),
            vectorizer,
            weights: model.weights.clone(),
            bias: model.bias,
            threshold,
            metrics: ArtifactMetrics {
                roc_auc,
                f1: report.positive.f1,
                best_c,
                train_samples: train_idx.len(),
                test_samples: test_idx.len(),
            },
        };

        let artifact_path = match &self.artifacts {
            Some(store) => Some(store.save(&artifact)?),
            None => None,
        };

        // The one synchronization point with inference: a pointer swap.
        classifier.publish(artifact);

        Ok(TrainingOutcome {
            report,
            roc_auc,
            threshold,
            calibration_degraded,
            best_c,
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            artifact_path,
            trained_at,
        })
    }

    /// Mean cross-validated F1 per regularization candidate; folds are
    /// fixed once so every candidate sees the same partitions.
    fn grid_search(
        &self,
        train_x: &[SparseVector],
        train_labels: &[u8],
        n_features: usize,
        rng: &mut StdRng,
    ) -> Result<f32, TrainingError> {
        let folds = stratified_kfold(train_labels, self.config.cv_folds, rng);

        let mut best: Option<(f32, f32)> = None;
        for &c in &self.config.c_grid {
            let config = LogisticConfig::with_c(c);
            let mut f1_sum = 0.0f32;
            let mut fold_count = 0usize;

            for (fit_idx, val_idx) in &folds {
                let fit_x: Vec<SparseVector> = fit_idx.iter().map(|&i| train_x[i].clone()).collect();
                let fit_y: Vec<u8> = fit_idx.iter().map(|&i| train_labels[i]).collect();
                let val_y: Vec<u8> = val_idx.iter().map(|&i| train_labels[i]).collect();

                let model = match LogisticModel::fit(&fit_x, &fit_y, n_features, &config) {
                    Ok(model) => model,
                    // A degenerate fold (single class) is skipped, not fatal.
                    Err(ModelError::SingleClass) => continue,
                    Err(e) => return Err(e.into()),
                };

                let mut val_pred = Vec::with_capacity(val_idx.len());
                for &i in val_idx {
                    val_pred.push(model.predict(&train_x[i])?);
                }
                f1_sum += metrics::f1_score(&val_y, &val_pred);
                fold_count += 1;
            }

            let mean_f1 = if fold_count > 0 { f1_sum / fold_count as f32 } else { 0.0 };
            log::debug!("Grid candidate C = {c}: mean CV F1 = {mean_f1:.4}");
            if best.map_or(true, |(_, best_f1)| mean_f1 > best_f1) {
                best = Some((c, mean_f1));
            }
        }

        Ok(best.map(|(c, _)| c).unwrap_or(1.0))
    }
}
