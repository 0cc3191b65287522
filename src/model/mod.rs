//! Statistical Classifier - Vectorizer, Model, Artifact
//!
//! Text vectorization (TF-IDF over word uni/bigrams) feeding a binary
//! logistic model that estimates the probability a statement is malicious.
//! The trained state travels as a versioned, checksummed `ModelArtifact`.

pub mod artifact;
pub mod classifier;
pub mod logistic;
pub mod vectorizer;

pub use artifact::{ArtifactMetrics, ArtifactStore, ModelArtifact};
pub use classifier::{ClassifierScore, ClassifierStatus, ScoreSource, SqlClassifier};
pub use logistic::{LogisticConfig, LogisticModel};
pub use vectorizer::{TfidfVectorizer, VectorizerConfig};

use thiserror::Error;

/// Sparse feature vector: `(feature index, value)` pairs, indices ascending.
pub type SparseVector = Vec<(usize, f32)>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("vectorizer is not fitted")]
    NotFitted,
    #[error("no terms survived document-frequency pruning")]
    EmptyVocabulary,
    #[error("training set contains a single class")]
    SingleClass,
    #[error("feature dimension mismatch: model has {model}, input has {input}")]
    DimensionMismatch { model: usize, input: usize },
}
