//! Fatal errors of the text-format frontend.

use crate::model::ModelError;
use crate::parser::numbers::LiteralError;
use crate::parser::tokens::{ParseContext, Token};
use thiserror::Error;

/// An error raised during lexing or parsing.
///
/// Every variant carries the nearest [`ParseContext`]; parsing is fatal on the
/// first error and performs no recovery.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// The tokenizer could not form a token at this position.
    #[error("{context}: {message}")]
    Tokenization {
        context: ParseContext,
        message: String,
    },
    /// A committed parser met a token it cannot accept.
    #[error("{context}: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        context: ParseContext,
        found: String,
        expected: String,
    },
    /// A required parenthesis (or other punctuation) is absent.
    #[error("{context}: missing {expected}")]
    MissingPunctuation {
        context: ParseContext,
        expected: &'static str,
    },
    /// A keyword in operator position that names no known operation.
    #[error("{context}: unknown operator '{keyword}'")]
    UnknownKeyword {
        context: ParseContext,
        keyword: String,
    },
    /// A value that does not fit its target width or scope:
    /// literal magnitudes, limits with `max < min`, branch depths.
    #[error("{context}: {message}")]
    ValueOutOfRange {
        context: ParseContext,
        message: String,
    },
    /// A module-level well-formedness violation
    /// (duplicate declarations, duplicate or unknown identifiers).
    #[error("{context}: {source}")]
    Malformed {
        context: ParseContext,
        source: ModelError,
    },
    /// An identifier the grammar rejects, such as a bare `$`.
    #[error("{context}: invalid identifier")]
    InvalidIdentifier { context: ParseContext },
    /// The token stream ended inside an unfinished production.
    #[error("{context}: unexpected end of input")]
    UnexpectedEnd { context: ParseContext },
}

impl ParseError {
    /// An unexpected-token error describing the found token and the expectation.
    pub fn unexpected(token: &Token, expected: impl Into<String>) -> Self {
        ParseError::UnexpectedToken {
            context: token.context().clone(),
            found: token.kind().describe(),
            expected: expected.into(),
        }
    }

    /// A literal interpretation failure at the given token.
    pub fn out_of_range(token: &Token, source: LiteralError) -> Self {
        ParseError::ValueOutOfRange {
            context: token.context().clone(),
            message: source.to_string(),
        }
    }

    /// A module assembly failure at the given context.
    pub fn malformed(context: ParseContext, source: ModelError) -> Self {
        ParseError::Malformed { context, source }
    }
}
