//! SQL Text Normalizer
//!
//! Canonicalizes raw SQL into a feature-stable string: literal spans and
//! numerals become fixed placeholders, whitespace collapses, case folds.
//! The SAME function runs during training-set construction and at
//! inference; the two paths must never diverge, so there is exactly one
//! implementation in the crate.

use once_cell::sync::Lazy;
use regex::Regex;

static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"'.*?'").unwrap());
static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"".*?""#).unwrap());
static INT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static HEX_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0x[0-9A-Fa-f]+\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// String-literal placeholder
pub const STR_PLACEHOLDER: &str = " VAL_STR ";

/// Numeric-literal placeholder
pub const NUM_PLACEHOLDER: &str = " VAL_NUM ";

/// Normalize a raw SQL statement.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`. The placeholder
/// words contain no quotes or digits, so a second pass leaves them alone.
pub fn normalize(raw: &str) -> String {
    let s = SINGLE_QUOTED.replace_all(raw, STR_PLACEHOLDER);
    let s = DOUBLE_QUOTED.replace_all(&s, STR_PLACEHOLDER);
    let s = INT_LITERAL.replace_all(&s, NUM_PLACEHOLDER);
    let s = HEX_LITERAL.replace_all(&s, NUM_PLACEHOLDER);
    let s = WHITESPACE.replace_all(&s, " ");
    s.to_lowercase().trim().to_string()
}
