//! Rule Engine Configuration
//!
//! Blocklist sets only - no matching logic.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BLOCKED_COMMANDS, DEFAULT_BLOCKED_TOKENS};

/// Configured denylists for the rule engine.
///
/// Entries are compared against cleaned tokens (separators stripped,
/// upper-cased), so they must be stored upper-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Forbidden leading commands (destructive DDL/DML)
    pub blocked_commands: HashSet<String>,
    /// Forbidden keyword/comment tokens anywhere in the statement
    pub blocked_tokens: HashSet<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            blocked_commands: DEFAULT_BLOCKED_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blocked_tokens: DEFAULT_BLOCKED_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleConfig {
    /// Empty blocklists; every statement passes to the classifier.
    pub fn permissive() -> Self {
        Self {
            blocked_commands: HashSet::new(),
            blocked_tokens: HashSet::new(),
        }
    }

    pub fn with_blocked_command(mut self, command: &str) -> Self {
        self.blocked_commands.insert(command.to_uppercase());
        self
    }

    pub fn with_blocked_token(mut self, token: &str) -> Self {
        self.blocked_tokens.insert(token.to_uppercase());
        self
    }
}
