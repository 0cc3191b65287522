//! Lexical Tokenizer Seam
//!
//! The rule engine consumes `{class, text}` tokens through the `Tokenize`
//! trait; any compliant SQL lexer satisfies the contract. The default
//! implementation wraps the `sqlparser` tokenizer with a generic dialect.

use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use thiserror::Error;

/// Lexical class of a token, coarse enough for blocklist scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Recognized SQL keyword
    Keyword,
    /// Unquoted or quoted identifier
    Identifier,
    /// String-like literal
    Literal,
    /// Numeric literal
    Number,
    /// Single- or multi-line comment, marker included in the text
    Comment,
    /// Operators, separators, everything else
    Punctuation,
}

/// One lexical token of a statement.
#[derive(Debug, Clone)]
pub struct SqlToken {
    pub class: TokenClass,
    pub text: String,
}

#[derive(Debug, Error)]
#[error("tokenizer error: {0}")]
pub struct TokenizeError(pub String);

/// Tokenizer capability consumed by the rule engine.
pub trait Tokenize: Send + Sync {
    /// Lex a statement into tokens. Whitespace is dropped; comments are kept.
    fn tokenize(&self, sql: &str) -> Result<Vec<SqlToken>, TokenizeError>;
}

/// `sqlparser`-backed tokenizer over the generic dialect.
#[derive(Debug, Default)]
pub struct GenericSqlTokenizer;

impl Tokenize for GenericSqlTokenizer {
    fn tokenize(&self, sql: &str) -> Result<Vec<SqlToken>, TokenizeError> {
        let dialect = GenericDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize()
            .map_err(|e| TokenizeError(e.to_string()))?;

        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token {
                Token::Word(w) => {
                    let class = if w.quote_style.is_none() && w.keyword != Keyword::NoKeyword {
                        TokenClass::Keyword
                    } else {
                        TokenClass::Identifier
                    };
                    out.push(SqlToken { class, text: w.value });
                }
                Token::Number(n, _) => out.push(SqlToken {
                    class: TokenClass::Number,
                    text: n,
                }),
                Token::SingleQuotedString(s)
                | Token::DoubleQuotedString(s)
                | Token::NationalStringLiteral(s)
                | Token::EscapedStringLiteral(s)
                | Token::HexStringLiteral(s) => out.push(SqlToken {
                    class: TokenClass::Literal,
                    text: s,
                }),
                Token::Whitespace(Whitespace::SingleLineComment { comment, prefix }) => {
                    out.push(SqlToken {
                        class: TokenClass::Comment,
                        text: format!("{prefix}{comment}"),
                    });
                }
                Token::Whitespace(Whitespace::MultiLineComment(comment)) => {
                    out.push(SqlToken {
                        class: TokenClass::Comment,
                        text: format!("/*{comment}*/"),
                    });
                }
                Token::Whitespace(_) | Token::EOF => {}
                other => out.push(SqlToken {
                    class: TokenClass::Punctuation,
                    text: other.to_string(),
                }),
            }
        }
        Ok(out)
    }
}
