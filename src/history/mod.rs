//! Decision History - Append-Only Training Ground Truth
//!
//! Ordered-by-time log of every decision the gate has made; the sole
//! training source. Grows monotonically, never mutated. The SQLite store
//! is the durable default; the in-memory store serves tests and embedders
//! that bring their own persistence.

pub mod memory;
pub mod sqlite;


pub use memory::MemoryDecisionStore;
pub use sqlite::SqliteDecisionStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::gate::types::Decision;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store error: {0}")]
    Backend(String),
    #[error("history serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One training example read back from history.
#[derive(Debug, Clone)]
pub struct LabeledStatement {
    pub statement: String,
    /// blocked = 1, allowed = 0
    pub label: u8,
}

/// Append/read contract for the decision log. Implementations serialize
/// concurrent appends internally; each append is durable before it
/// returns.
pub trait DecisionStore: Send + Sync {
    fn append(&self, decision: &Decision) -> Result<(), StoreError>;

    /// All decisions in time order, optionally bounded below.
    fn read_all(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Decision>, StoreError>;

    /// Training view: statement text labeled by final verdict.
    fn labeled(&self) -> Result<Vec<LabeledStatement>, StoreError> {
        Ok(self
            .read_all(None)?
            .into_iter()
            .map(|d| LabeledStatement {
                label: u8::from(d.is_blocked()),
                statement: d.statement,
            })
            .collect())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read_all(None)?.len())
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
