//! Index-based navigation over the token vector.
//!
//! Parsers follow a try-then-commit protocol: a production first checks its
//! gate tokens (an opening parenthesis plus a keyword) without consuming,
//! via [`TokenCursor::try_enter`] or a saved position that is restored with
//! [`TokenCursor::reset`]. Once committed past the gate, every missing
//! expected token is a fatal [`ParseError`].

use crate::model::{Id, Index};
use crate::parser::tokens::{ParseContext, Token, TokenKind};
use crate::parser::ParseError;

/// A cursor over the lexed token vector.
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    position: usize,
    end: ParseContext,
}

impl<'a> TokenCursor<'a> {
    /// Creates a cursor positioned at the first token.
    /// `end` is the context reported when input runs out mid-production.
    pub fn new(tokens: &'a [Token], end: ParseContext) -> Self {
        TokenCursor {
            tokens,
            position: 0,
            end,
        }
    }

    /// The current position, for later rollback.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rolls back to a previously saved position.
    pub fn reset(&mut self, position: usize) {
        self.position = position;
    }

    /// Whether every token has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// The token at the current position, if any.
    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    /// The token `offset` positions ahead, if any.
    pub fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.position + offset)
    }

    /// The context of the current token, or the end context.
    pub fn context(&self) -> ParseContext {
        self.peek()
            .map(|token| token.context().clone())
            .unwrap_or_else(|| self.end.clone())
    }

    /// Consumes and returns the current token, if any.
    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;

        Some(token)
    }

    /// Consumes the current token, failing at end of input.
    pub fn expect_any(&mut self) -> Result<&'a Token, ParseError> {
        self.advance().ok_or(ParseError::UnexpectedEnd {
            context: self.end.clone(),
        })
    }

    /// Whether the current token is an opening parenthesis.
    pub fn at_left_paren(&self) -> bool {
        matches!(self.peek().map(Token::kind), Some(TokenKind::LeftParen))
    }

    /// Whether the current token is a closing parenthesis.
    pub fn at_right_paren(&self) -> bool {
        matches!(self.peek().map(Token::kind), Some(TokenKind::RightParen))
    }

    /// The gate check: consumes `(` and the given keyword when both are next,
    /// leaving the cursor untouched otherwise.
    pub fn try_enter(&mut self, keyword: &str) -> bool {
        let gate = matches!(self.peek().map(Token::kind), Some(TokenKind::LeftParen))
            && self
                .peek_at(1)
                .and_then(Token::as_keyword)
                .map_or(false, |k| k == keyword);

        if gate {
            self.position += 2;
        }

        gate
    }

    /// Requires a closing parenthesis.
    pub fn expect_right_paren(&mut self) -> Result<(), ParseError> {
        match self.peek().map(Token::kind) {
            Some(TokenKind::RightParen) => {
                self.position += 1;
                Ok(())
            }
            _ => Err(ParseError::MissingPunctuation {
                context: self.context(),
                expected: "')'",
            }),
        }
    }

    /// Requires an opening parenthesis.
    pub fn expect_left_paren(&mut self) -> Result<(), ParseError> {
        match self.peek().map(Token::kind) {
            Some(TokenKind::LeftParen) => {
                self.position += 1;
                Ok(())
            }
            _ => Err(ParseError::MissingPunctuation {
                context: self.context(),
                expected: "'('",
            }),
        }
    }

    /// The current token's keyword text, without consuming.
    pub fn peek_keyword(&self) -> Option<&'a str> {
        self.peek().and_then(Token::as_keyword)
    }

    /// Consumes the given keyword when it is next.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword() == Some(keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Requires the given keyword.
    pub fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token.as_keyword() == Some(keyword) => {
                self.position += 1;
                Ok(())
            }
            Some(token) => Err(ParseError::unexpected(token, format!("'{}'", keyword))),
            None => Err(ParseError::UnexpectedEnd {
                context: self.end.clone(),
            }),
        }
    }

    /// Consumes a symbolic identifier when one is next.
    pub fn take_id(&mut self) -> Option<Id> {
        match self.peek().map(Token::kind) {
            Some(TokenKind::Identifier(name)) => {
                let id = Id::new(name.clone());
                self.position += 1;

                Some(id)
            }
            _ => None,
        }
    }

    /// Requires an unsigned 32-bit integer literal.
    pub fn expect_u32(&mut self) -> Result<u32, ParseError> {
        let token = self.expect_any()?;

        match token.kind() {
            TokenKind::Integer(integer) => integer
                .to_u32()
                .map_err(|source| ParseError::out_of_range(token, source)),
            _ => Err(ParseError::unexpected(token, "an unsigned integer")),
        }
    }

    /// Consumes a numeric or symbolic index when one is next.
    pub fn take_index(&mut self) -> Result<Option<Index>, ParseError> {
        match self.peek().map(Token::kind) {
            Some(TokenKind::Identifier(name)) => {
                let index = Index::Symbolic(Id::new(name.clone()));
                self.position += 1;

                Ok(Some(index))
            }
            Some(TokenKind::Integer(_)) => Ok(Some(Index::Numeric(self.expect_u32()?))),
            _ => Ok(None),
        }
    }

    /// Requires a numeric or symbolic index.
    pub fn expect_index(&mut self) -> Result<Index, ParseError> {
        match self.take_index()? {
            Some(index) => Ok(index),
            None => match self.peek() {
                Some(token) => Err(ParseError::unexpected(token, "an index")),
                None => Err(ParseError::UnexpectedEnd {
                    context: self.end.clone(),
                }),
            },
        }
    }

    /// Requires a string literal, returning its decoded bytes.
    pub fn expect_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let token = self.expect_any()?;

        match token.kind() {
            TokenKind::Str(bytes) => Ok(bytes.clone()),
            _ => Err(ParseError::unexpected(token, "a string literal")),
        }
    }

    /// Requires a string literal holding valid UTF-8, as name positions do.
    pub fn expect_name(&mut self) -> Result<String, ParseError> {
        let context = self.context();
        let bytes = self.expect_string()?;

        String::from_utf8(bytes).map_err(|_| ParseError::Tokenization {
            context,
            message: "name is not valid UTF-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;

    fn cursor(tokens: &[Token]) -> TokenCursor<'_> {
        TokenCursor::new(tokens, ParseContext::new("test.wat", 1, 1))
    }

    #[test]
    fn gate_consumes_only_on_match() {
        let tokens = tokenize("(module)", "test.wat").unwrap();
        let mut cursor = cursor(&tokens);

        assert!(!cursor.try_enter("func"));
        assert_eq!(cursor.position(), 0);
        assert!(cursor.try_enter("module"));
        assert_eq!(cursor.position(), 2);
        assert!(cursor.expect_right_paren().is_ok());
        assert!(cursor.is_at_end());
    }

    #[test]
    fn rollback_restores_position() {
        let tokens = tokenize("(func $f)", "test.wat").unwrap();
        let mut cursor = cursor(&tokens);
        let saved = cursor.position();

        assert!(cursor.try_enter("func"));
        cursor.reset(saved);

        assert!(cursor.at_left_paren());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn indices_may_be_numeric_or_symbolic() {
        let tokens = tokenize("3 $three", "test.wat").unwrap();
        let mut cursor = cursor(&tokens);

        assert_eq!(cursor.expect_index().unwrap(), Index::Numeric(3));
        assert_eq!(
            cursor.expect_index().unwrap(),
            Index::Symbolic(Id::new("three"))
        );
        assert!(cursor.expect_index().is_err());
    }

    #[test]
    fn missing_paren_is_reported_with_context() {
        let tokens = tokenize("(module", "test.wat").unwrap();
        let mut cursor = cursor(&tokens);

        assert!(cursor.try_enter("module"));
        assert!(matches!(
            cursor.expect_right_paren(),
            Err(ParseError::MissingPunctuation { .. })
        ));
    }

    #[test]
    fn names_must_be_utf8() {
        let tokens = tokenize(r#""\ff\fe""#, "test.wat").unwrap();
        let mut strings = cursor(&tokens);
        assert!(strings.expect_name().is_err());

        let tokens = tokenize(r#""ok""#, "test.wat").unwrap();
        let mut names = cursor(&tokens);
        assert_eq!(names.expect_name().unwrap(), "ok");
    }
}
