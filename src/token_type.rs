//! Primitive typing of raw string tokens
//!
//! Used for partition values taken from path components and as the
//! fallback classifier for untyped cells.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type of a raw token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Int,
    Float,
    Date,
    String,
}

impl TokenType {
    /// Label written to catalogs and partition keys
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Int => "int",
            TokenType::Float => "float",
            TokenType::Date => "date",
            TokenType::String => "string",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a token, first match wins: digits, float literal, date, string.
///
/// Total: every failed parse falls through to the next candidate.
pub fn classify(token: &str) -> TokenType {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        TokenType::Int
    } else if token.trim().parse::<f64>().is_ok() {
        TokenType::Float
    } else if looks_like_date(token) {
        TokenType::Date
    } else {
        TokenType::String
    }
}

fn looks_like_date(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && dateparser::parse(token).is_ok()
}
