//! Rule Engine - Deterministic Blocklist Matching
//!
//! First line of defense: a pure, configuration-driven denylist over the
//! lexical tokens of a statement. Independent of the statistical model and
//! authoritative for known-bad syntax.

pub mod config;
pub mod engine;

pub use config::RuleConfig;
pub use engine::RuleEngine;

use serde::{Deserialize, Serialize};

/// Verdict of the rule engine for one statement.
///
/// Never persisted on its own, only as part of a `Decision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub is_safe: bool,
    pub reason: String,
}

impl RuleVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            reason: "Safe".to_string(),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            reason: reason.into(),
        }
    }
}
