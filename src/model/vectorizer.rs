//! TF-IDF Vectorizer
//!
//! Word-level unigrams and bigrams, document-frequency pruning, smoothed
//! inverse document frequency, L2-normalized rows. Fitted state (vocabulary
//! and idf weights) is serializable and rides inside the model artifact.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ModelError, SparseVector};

/// Word tokens: runs of two or more word characters.
static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Vectorizer hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Smallest n-gram length
    pub ngram_min: usize,
    /// Largest n-gram length
    pub ngram_max: usize,
    /// Drop terms appearing in fewer documents than this
    pub min_df: usize,
    /// Drop terms appearing in more than this fraction of documents
    pub max_df: f32,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 2,
            min_df: 2,
            max_df: 0.95,
        }
    }
}

/// TF-IDF vectorizer. `fit` learns vocabulary + idf from a corpus;
/// `transform` maps one document to a sparse L2-normalized vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub config: VectorizerConfig,
    /// Term -> feature index, alphabetically ordered
    vocabulary: BTreeMap<String, usize>,
    /// Smoothed idf per feature index
    idf: Vec<f32>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(VectorizerConfig::default())
    }
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// CRC32 over the ordered vocabulary, carried in artifact metadata so a
    /// loaded artifact can be told apart from one trained on another corpus.
    pub fn vocab_hash(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for term in self.vocabulary.keys() {
            hasher.update(term.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize()
    }

    /// Split a document into n-gram terms.
    fn analyze(&self, doc: &str) -> Vec<String> {
        let words: Vec<&str> = WORD_TOKEN.find_iter(doc).map(|m| m.as_str()).collect();
        let mut terms = Vec::new();
        for n in self.config.ngram_min..=self.config.ngram_max {
            if n == 0 || words.len() < n {
                continue;
            }
            for window in words.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Learn vocabulary and idf weights from the corpus.
    pub fn fit(&mut self, docs: &[String]) -> Result<(), ModelError> {
        let n_docs = docs.len();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let unique: HashSet<String> = self.analyze(doc).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let max_df_count = (self.config.max_df * n_docs as f32).floor() as usize;
        let mut kept: BTreeMap<String, usize> = BTreeMap::new();
        for (term, df) in &document_frequency {
            if *df >= self.config.min_df && *df <= max_df_count {
                kept.insert(term.clone(), 0);
            }
        }
        if kept.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }
        for (index, (_, slot)) in kept.iter_mut().enumerate() {
            *slot = index;
        }

        let mut idf = vec![0.0f32; kept.len()];
        for (term, index) in &kept {
            let df = document_frequency[term] as f32;
            idf[*index] = ((1.0 + n_docs as f32) / (1.0 + df)).ln() + 1.0;
        }

        self.vocabulary = kept;
        self.idf = idf;
        Ok(())
    }

    /// Map one document to a sparse tf-idf vector, L2-normalized.
    /// Terms outside the vocabulary are ignored; an all-unknown document
    /// yields the empty vector.
    pub fn transform(&self, doc: &str) -> Result<SparseVector, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }

        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for term in self.analyze(doc) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();

        let norm: f32 = vector.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    pub fn transform_all(&self, docs: &[String]) -> Result<Vec<SparseVector>, ModelError> {
        docs.iter().map(|d| self.transform(d)).collect()
    }
}
