//! Tokens of the WebAssembly text format.
//!
//! Each token records the source context it originated from,
//! so that every later parse error can point at a file, line, and column.
//!
//! See <https://webassembly.github.io/spec/core/text/lexical.html#tokens>

use crate::parser::numbers::{FloatToken, IntegerToken};
use std::fmt;
use std::sync::Arc;

/// The source position a token (and any diagnostic about it) originates from.
/// Lines and columns are 1-based.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::ParseContext;
///
/// let context = ParseContext::new("add.wat", 3, 9);
///
/// assert_eq!(context.to_string(), "add.wat:3:9");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseContext {
    filename: Arc<str>,
    line: u32,
    column: u32,
}

impl ParseContext {
    /// Creates a new context at the given position.
    pub fn new(filename: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        ParseContext {
            filename: filename.into(),
            line,
            column,
        }
    }

    /// The name of the source this context points into.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The 1-based line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The 1-based column number.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

/// The kinds of token the tokenizer produces.
/// Comments and whitespace yield no tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// A lowercase letter followed by identifier characters, e.g. `i32.const`.
    Keyword(String),
    /// A `$`-prefixed symbolic identifier, stored without the sigil.
    Identifier(String),
    /// An integer literal, sign-normalized but not yet width-checked.
    Integer(IntegerToken),
    /// A float literal; its value is interpreted lazily at a known width.
    Float(FloatToken),
    /// A string literal with escape sequences already decoded.
    /// Stored as bytes: `\xx` escapes may form data that is not UTF-8;
    /// name positions re-check UTF-8 validity at the call site.
    Str(Vec<u8>),
    /// A sequence of identifier characters matching no other category.
    /// The parser surfaces these as errors at the call site.
    Reserved(String),
}

impl TokenKind {
    /// A short rendering for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LeftParen => "'('".to_string(),
            TokenKind::RightParen => "')'".to_string(),
            TokenKind::Keyword(keyword) => format!("keyword '{}'", keyword),
            TokenKind::Identifier(id) => format!("identifier '${}'", id),
            TokenKind::Integer(_) => "integer literal".to_string(),
            TokenKind::Float(_) => "float literal".to_string(),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Reserved(text) => format!("reserved token '{}'", text),
        }
    }
}

/// A single token together with its originating context.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    kind: TokenKind,
    context: ParseContext,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, context: ParseContext) -> Self {
        Token { kind, context }
    }

    /// The kind of this token.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// The source context of this token.
    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    /// The keyword text, when this token is a keyword.
    pub fn as_keyword(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}
