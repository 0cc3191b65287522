//! Model Artifact - Versioned Persistence
//!
//! The trained bundle (vectorizer state, weights, bias, operating
//! threshold, metrics) persists as a checksummed JSON envelope written
//! temp-then-rename. Loading verifies the sha256 before the artifact is
//! trusted. One artifact is active at a time; publication is the
//! classifier's atomic swap, not a file operation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::vectorizer::TfidfVectorizer;
use super::{ModelError, SparseVector};

/// Bump when the serialized layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("artifact checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),
}

/// Held-out evaluation summary stored with the artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    pub roc_auc: f32,
    pub f1: f32,
    pub best_c: f32,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// The versioned model bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub vectorizer: TfidfVectorizer,
    pub weights: Vec<f32>,
    pub bias: f32,
    /// Calibrated blocking threshold
    pub threshold: f32,
    /// CRC32 of the ordered vocabulary
    pub vocab_hash: u32,
    pub metrics: ArtifactMetrics,
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z.clamp(-30.0, 30.0)).exp())
}

impl ModelArtifact {
    /// Threat probability for an already-vectorized statement.
    pub fn predict_proba(&self, x: &SparseVector) -> Result<f32, ModelError> {
        if self.weights.len() != self.vectorizer.vocabulary_len() {
            return Err(ModelError::DimensionMismatch {
                model: self.weights.len(),
                input: self.vectorizer.vocabulary_len(),
            });
        }
        let mut z = self.bias;
        for &(index, value) in x {
            let weight = self.weights.get(index).ok_or(ModelError::DimensionMismatch {
                model: self.weights.len(),
                input: index + 1,
            })?;
            z += weight * value;
        }
        Ok(sigmoid(z))
    }
}

/// On-disk envelope: payload + integrity checksum.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope {
    checksum: String,
    artifact: ModelArtifact,
}

fn checksum_of(artifact: &ModelArtifact) -> Result<String, ArtifactError> {
    let payload = serde_json::to_vec(artifact)?;
    Ok(hex::encode(Sha256::digest(&payload)))
}

/// Directory of timestamped artifact files; newest filename wins.
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::from_path(crate::constants::get_data_dir().join("models"))
    }

    pub fn from_path(base_dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&base_dir) {
            log::error!("Failed to create artifact directory: {e}");
        }
        Self { base_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.base_dir
    }

    /// Persist a new artifact file and return its path.
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf, ArtifactError> {
        let envelope = ArtifactEnvelope {
            checksum: checksum_of(artifact)?,
            artifact: artifact.clone(),
        };

        let filename = format!("model-{}.json", artifact.trained_at.format("%Y-%m-%d-%H%M%S"));
        let path = self.base_dir.join(filename);
        let tmp_path = path.with_extension("json.tmp");

        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(&serde_json::to_vec(&envelope)?)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &path)?;

        log::info!("Model artifact saved to {}", path.display());
        Ok(path)
    }

    /// Load and verify one artifact file.
    pub fn load(&self, path: &Path) -> Result<ModelArtifact, ArtifactError> {
        let bytes = fs::read(path)?;
        let envelope: ArtifactEnvelope = serde_json::from_slice(&bytes)?;

        let actual = checksum_of(&envelope.artifact)?;
        if actual != envelope.checksum {
            return Err(ArtifactError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            });
        }
        if envelope.artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(envelope.artifact.format_version));
        }
        Ok(envelope.artifact)
    }

    /// Load the newest artifact, if any exists.
    pub fn load_latest(&self) -> Result<Option<ModelArtifact>, ArtifactError> {
        let Some(path) = self.find_latest_file()? else {
            return Ok(None);
        };
        self.load(&path).map(Some)
    }

    fn find_latest_file(&self) -> Result<Option<PathBuf>, ArtifactError> {
        let mut entries = fs::read_dir(&self.base_dir)?
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect::<Vec<_>>();

        if entries.is_empty() {
            return Ok(None);
        }

        // Timestamped filenames sort chronologically.
        entries.sort();
        Ok(entries.last().cloned())
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_artifact() -> ModelArtifact {
        let docs = vec![
            "select name from customer".to_string(),
            "select name from film".to_string(),
            "drop table from customer".to_string(),
            "drop table from film".to_string(),
        ];
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit(&docs).unwrap();
        let n = vectorizer.vocabulary_len();
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: "2026-01-15T10:30:00Z".parse().unwrap(),
            vocab_hash: vectorizer.vocab_hash(),
            vectorizer,
            weights: vec![0.25; n],
            bias: -0.5,
            threshold: 0.8,
            metrics: ArtifactMetrics {
                roc_auc: 0.97,
                f1: 0.95,
                best_c: 1.0,
                train_samples: 160,
                test_samples: 40,
            },
        }
    }

    #[test]
    fn test_save_load_round_trip_exact() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::from_path(dir.path().to_path_buf());
        let artifact = sample_artifact();

        let path = store.save(&artifact).unwrap();
        let loaded = store.load(&path).unwrap();

        assert_eq!(loaded.weights, artifact.weights);
        assert_eq!(loaded.bias, artifact.bias);
        assert_eq!(loaded.threshold, artifact.threshold);
        assert_eq!(loaded.vocab_hash, artifact.vocab_hash);
        assert_eq!(loaded.trained_at, artifact.trained_at);
        assert_eq!(
            loaded.vectorizer.transform("select name").unwrap(),
            artifact.vectorizer.transform("select name").unwrap()
        );
    }

    #[test]
    fn test_tampered_file_fails_checksum() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::from_path(dir.path().to_path_buf());
        let path = store.save(&sample_artifact()).unwrap();

        let tampered = fs::read_to_string(&path).unwrap().replace("-0.5", "-0.75");
        fs::write(&path, tampered).unwrap();

        assert!(matches!(
            store.load(&path),
            Err(ArtifactError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_load_latest_picks_newest() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::from_path(dir.path().to_path_buf());

        let mut older = sample_artifact();
        older.trained_at = "2026-01-01T00:00:00Z".parse().unwrap();
        older.bias = -1.0;
        let mut newer = sample_artifact();
        newer.trained_at = "2026-02-01T00:00:00Z".parse().unwrap();
        newer.bias = -2.0;

        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let latest = store.load_latest().unwrap().unwrap();
        assert_eq!(latest.bias, -2.0);
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::from_path(dir.path().to_path_buf());
        assert!(store.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::from_path(dir.path().to_path_buf());
        store.save(&sample_artifact()).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
