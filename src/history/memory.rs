//! In-memory decision store for tests and embedders.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::gate::types::Decision;

use super::{DecisionStore, StoreError};

#[derive(Default)]
pub struct MemoryDecisionStore {
    decisions: RwLock<Vec<Decision>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for MemoryDecisionStore {
    fn append(&self, decision: &Decision) -> Result<(), StoreError> {
        self.decisions.write().push(decision.clone());
        Ok(())
    }

    fn read_all(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Decision>, StoreError> {
        let decisions = self.decisions.read();
        Ok(decisions
            .iter()
            .filter(|d| since.map_or(true, |t| d.decided_at >= t))
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.decisions.read().len())
    }
}
