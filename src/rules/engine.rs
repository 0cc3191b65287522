//! Blocklist Matching Logic
//!
//! Input: raw statement text. Output: `RuleVerdict`.
//! Scanning is left-to-right and returns on the first match; violations are
//! never aggregated. Malformed or empty input is unsafe, not an error.

use crate::tokenizer::{GenericSqlTokenizer, SqlToken, TokenClass, Tokenize};

use super::config::RuleConfig;
use super::RuleVerdict;

/// Strip statement separators and upper-case a token for set membership.
fn clean_token(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '(' | ')' | ','))
        .collect::<String>()
        .trim()
        .to_uppercase()
}

/// Deterministic blocklist matcher. For a fixed config, `evaluate` is a
/// pure function of the statement text.
pub struct RuleEngine {
    config: RuleConfig,
    tokenizer: Box<dyn Tokenize>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config,
            tokenizer: Box::new(GenericSqlTokenizer),
        }
    }

    /// Swap in a different lexer; any `Tokenize` implementation works.
    pub fn with_tokenizer(config: RuleConfig, tokenizer: Box<dyn Tokenize>) -> Self {
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Evaluate one statement against the blocklists.
    pub fn evaluate(&self, raw: &str) -> RuleVerdict {
        let tokens = match self.tokenizer.tokenize(raw) {
            Ok(tokens) => tokens,
            Err(e) => return RuleVerdict::blocked(format!("Error parsing SQL: {e}")),
        };

        let Some(first) = tokens.iter().find(|t| t.class != TokenClass::Comment) else {
            return RuleVerdict::blocked("Empty or invalid SQL");
        };

        let first_command = clean_token(&first.text);
        if self.config.blocked_commands.contains(&first_command) {
            return RuleVerdict::blocked(format!("Blocked command: {first_command}"));
        }

        for token in &tokens {
            match token.class {
                TokenClass::Keyword => {
                    let value = clean_token(&token.text);
                    if self.config.blocked_tokens.contains(&value) {
                        return RuleVerdict::blocked(format!("Blocked token: {value}"));
                    }
                }
                TokenClass::Comment => {
                    if let Some(value) = self.scan_comment(token) {
                        return RuleVerdict::blocked(format!("Blocked token: {value}"));
                    }
                }
                _ => {}
            }
        }

        RuleVerdict::safe()
    }

    pub fn is_safe(&self, raw: &str) -> bool {
        self.evaluate(raw).is_safe
    }

    /// Comments are dropped from the command scan but their contents are
    /// still matched: the whole cleaned text first, then each word of it.
    fn scan_comment(&self, token: &SqlToken) -> Option<String> {
        let whole = clean_token(&token.text);
        if self.config.blocked_tokens.contains(&whole) {
            return Some(whole);
        }
        for word in whole.split_whitespace() {
            if self.config.blocked_tokens.contains(word) {
                return Some(word.to_string());
            }
        }
        None
    }
}
