//! The tokenizer of the text format.
//!
//! For any non-whitespace position, every recognizer is attempted and the one
//! with the greatest accepted length wins; ties favor the more specific
//! category (number over keyword over identifier over the reserved catch-all).
//! Whitespace and comments yield no tokens; block comments nest.
//!
//! See <https://webassembly.github.io/spec/core/text/lexical.html>

use crate::parser::numbers::{number, NumberToken};
use crate::parser::tokens::{ParseContext, Token, TokenKind};
use crate::parser::ParseError;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, satisfy};
use nom::combinator::recognize;
use nom::sequence::pair;
use nom::IResult;
use std::sync::Arc;

/// The characters allowed inside keywords, identifiers, and reserved tokens.
///
/// See <https://webassembly.github.io/spec/core/text/values.html#text-idchar>
pub fn is_idchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '/'
                | ':'
                | '<'
                | '='
                | '>'
                | '?'
                | '@'
                | '\\'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
        )
}

/// A lowercase letter followed by identifier characters.
fn keyword(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_lowercase()),
        nom::bytes::complete::take_while(is_idchar),
    ))(input)
}

/// `$` followed by at least one identifier character.
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('$'), take_while1(is_idchar)))(input)
}

/// The catch-all: any run of identifier characters.
fn reserved(input: &str) -> IResult<&str, &str> {
    take_while1(is_idchar)(input)
}

/// Converts source text into a token stream.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::{tokenize, TokenKind};
///
/// let tokens = tokenize("(module)", "empty.wat").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|token| token.kind().clone()).collect();
///
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::LeftParen,
///         TokenKind::Keyword("module".to_string()),
///         TokenKind::RightParen,
///     ]
/// );
/// ```
pub fn tokenize(source: &str, filename: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source, filename).run()
}

struct Lexer<'a> {
    rest: &'a str,
    filename: Arc<str>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, filename: &str) -> Self {
        Lexer {
            rest: source,
            filename: filename.into(),
            line: 1,
            column: 1,
        }
    }

    fn context(&self) -> ParseContext {
        ParseContext::new(self.filename.clone(), self.line, self.column)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Tokenization {
            context: self.context(),
            message: message.into(),
        }
    }

    /// Consumes `count` bytes, updating the line and column counters.
    fn advance(&mut self, count: usize) {
        for c in self.rest[..count].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }

        self.rest = &self.rest[count..];
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;

            if self.rest.is_empty() {
                return Ok(tokens);
            }

            tokens.push(self.next_token()?);
        }
    }

    /// Skips whitespace and comments; fails on an unterminated block comment
    /// with the context of the outermost opener.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            if let Some(c) = self.rest.chars().next() {
                if matches!(c, ' ' | '\t' | '\r' | '\n') {
                    self.advance(c.len_utf8());
                    continue;
                }
            }

            if let Some(stripped) = self.rest.strip_prefix(";;") {
                let length = stripped.find('\n').map_or(stripped.len(), |at| at);
                self.advance(2 + length);
                continue;
            }

            if self.rest.starts_with("(;") {
                self.skip_block_comment()?;
                continue;
            }

            return Ok(());
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let opener = self.context();
        let mut depth = 0usize;

        while !self.rest.is_empty() {
            if self.rest.starts_with("(;") {
                depth += 1;
                self.advance(2);
            } else if self.rest.starts_with(";)") {
                depth -= 1;
                self.advance(2);

                if depth == 0 {
                    return Ok(());
                }
            } else {
                let c = self.rest.chars().next().expect("rest is non-empty");
                self.advance(c.len_utf8());
            }
        }

        Err(ParseError::Tokenization {
            context: opener,
            message: "unterminated block comment".to_string(),
        })
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let context = self.context();

        if self.rest.starts_with('(') {
            self.advance(1);
            return Ok(Token::new(TokenKind::LeftParen, context));
        }

        if self.rest.starts_with(')') {
            self.advance(1);
            return Ok(Token::new(TokenKind::RightParen, context));
        }

        if self.rest.starts_with('"') {
            let (bytes, length) = self.take_string()?;
            self.advance(length);
            return Ok(Token::new(TokenKind::Str(bytes), context));
        }

        // Longest match across the idchar-built categories;
        // ties resolve in the order the candidates are listed.
        let mut winner: Option<(usize, TokenKind)> = None;
        let candidates = [
            number(self.rest)
                .ok()
                .map(|(rest, token)| (self.rest.len() - rest.len(), match token {
                    NumberToken::Integer(integer) => TokenKind::Integer(integer),
                    NumberToken::Float(float) => TokenKind::Float(float),
                })),
            keyword(self.rest)
                .ok()
                .map(|(rest, text)| (self.rest.len() - rest.len(), TokenKind::Keyword(text.to_string()))),
            identifier(self.rest)
                .ok()
                .map(|(rest, text)| (self.rest.len() - rest.len(), TokenKind::Identifier(text[1..].to_string()))),
            reserved(self.rest)
                .ok()
                .map(|(rest, text)| (self.rest.len() - rest.len(), TokenKind::Reserved(text.to_string()))),
        ];

        for candidate in candidates.into_iter().flatten() {
            match &winner {
                Some((length, _)) if *length >= candidate.0 => {}
                _ => winner = Some(candidate),
            }
        }

        match winner {
            Some((length, kind)) => {
                if let TokenKind::Reserved(text) = &kind {
                    if text == "$" {
                        return Err(self.error("empty identifier"));
                    }

                    let numeric_start = text
                        .trim_start_matches(['+', '-'])
                        .starts_with(|c: char| c.is_ascii_digit());

                    if numeric_start {
                        return Err(self.error(format!("illegal character in number '{}'", text)));
                    }
                }

                self.advance(length);
                Ok(Token::new(kind, context))
            }
            None => {
                let c = self.rest.chars().next().expect("rest is non-empty");
                Err(self.error(format!("unexpected character {:?}", c)))
            }
        }
    }

    /// Decodes a string literal starting at the opening quote.
    /// Returns the decoded bytes and the source length including both quotes.
    fn take_string(&self) -> Result<(Vec<u8>, usize), ParseError> {
        let mut bytes = Vec::new();
        let mut chars = self.rest.char_indices();
        chars.next(); // opening quote

        while let Some((at, c)) = chars.next() {
            match c {
                '"' => return Ok((bytes, at + 1)),
                '\n' => return Err(self.error("unterminated string literal")),
                '\\' => match chars.next() {
                    Some((_, 'n')) => bytes.push(b'\n'),
                    Some((_, 'r')) => bytes.push(b'\r'),
                    Some((_, 't')) => bytes.push(b'\t'),
                    Some((_, '"')) => bytes.push(b'"'),
                    Some((_, '\'')) => bytes.push(b'\''),
                    Some((_, '\\')) => bytes.push(b'\\'),
                    Some((_, high)) if high.is_ascii_hexdigit() => match chars.next() {
                        Some((_, low)) if low.is_ascii_hexdigit() => {
                            let high = high.to_digit(16).expect("checked hex digit");
                            let low = low.to_digit(16).expect("checked hex digit");
                            bytes.push((high * 16 + low) as u8);
                        }
                        _ => return Err(self.error("invalid string escape")),
                    },
                    _ => return Err(self.error("invalid string escape")),
                },
                c => {
                    let mut buffer = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
                }
            }
        }

        Err(self.error("unterminated string literal"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.wat")
            .unwrap()
            .into_iter()
            .map(|token| token.kind().clone())
            .collect()
    }

    #[test]
    fn empty_module() {
        assert_eq!(
            kinds("(module)"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Keyword("module".to_string()),
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn keywords_contain_dots() {
        assert_eq!(
            kinds("i32.const"),
            vec![TokenKind::Keyword("i32.const".to_string())]
        );
    }

    #[test]
    fn identifiers_drop_the_sigil() {
        assert_eq!(
            kinds("$add $a1!#"),
            vec![
                TokenKind::Identifier("add".to_string()),
                TokenKind::Identifier("a1!#".to_string()),
            ]
        );
    }

    #[test]
    fn empty_identifier_is_an_error() {
        assert!(matches!(
            tokenize("$", "test.wat"),
            Err(ParseError::Tokenization { .. })
        ));
        assert!(matches!(
            tokenize("$ x", "test.wat"),
            Err(ParseError::Tokenization { .. })
        ));
    }

    #[test]
    fn numbers_win_ties_with_keywords() {
        let tokens = kinds("inf nan 1.5 -0x1p2");

        assert!(matches!(tokens[0], TokenKind::Float(_)));
        assert!(matches!(tokens[1], TokenKind::Float(_)));
        assert!(matches!(tokens[2], TokenKind::Float(_)));
        assert!(matches!(tokens[3], TokenKind::Float(_)));
    }

    #[test]
    fn malformed_numbers_fail_tokenization() {
        assert!(tokenize("1a", "test.wat").is_err());
        assert!(tokenize("0x", "test.wat").is_err());
        assert!(tokenize("1__2", "test.wat").is_err());
    }

    #[test]
    fn longer_keyword_beats_shorter_number() {
        // "nan:" followed by non-hex text lexes as one keyword token,
        // which the parser rejects in operator position.
        assert_eq!(
            kinds("nan:unpayloaded"),
            vec![TokenKind::Keyword("nan:unpayloaded".to_string())]
        );
    }

    #[test]
    fn reserved_tokens_flow_to_the_parser() {
        assert_eq!(
            kinds("$x\\y"),
            vec![TokenKind::Identifier("x\\y".to_string())]
        );
        assert_eq!(
            kinds("!?"),
            vec![TokenKind::Reserved("!?".to_string())]
        );
    }

    #[test]
    fn line_comments_are_stripped() {
        assert_eq!(kinds(";; nothing\n42"), kinds("42"));
    }

    #[test]
    fn block_comments_nest() {
        assert_eq!(kinds("(; outer (; inner ;) still outer ;) 42"), kinds("42"));
    }

    #[test]
    fn unterminated_block_comment_reports_the_outermost_opener() {
        let error = tokenize("\n  (; open (; closed ;)", "test.wat").unwrap_err();

        match error {
            ParseError::Tokenization { context, message } => {
                assert_eq!(context.line(), 2);
                assert_eq!(context.column(), 3);
                assert!(message.contains("unterminated"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn strings_decode_escapes() {
        assert_eq!(
            kinds(r#""a\n\t\"\\\5A""#),
            vec![TokenKind::Str(b"a\n\t\"\\\x5A".to_vec())]
        );
    }

    #[test]
    fn strings_may_hold_non_utf8_bytes() {
        assert_eq!(
            kinds(r#""\ff\fe""#),
            vec![TokenKind::Str(vec![0xFF, 0xFE])]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("\"abc", "test.wat").is_err());
        assert!(tokenize("\"abc\ndef\"", "test.wat").is_err());
    }

    #[test]
    fn context_tracks_lines_and_columns() {
        let tokens = tokenize("(module\n  (memory 1))", "test.wat").unwrap();

        assert_eq!(tokens[0].context().line(), 1);
        assert_eq!(tokens[0].context().column(), 1);
        assert_eq!(tokens[2].context().line(), 2);
        assert_eq!(tokens[2].context().column(), 3);
        assert_eq!(tokens[3].context().column(), 4);
    }

    #[quickcheck]
    fn comment_invariance(padding: u8) -> bool {
        // Inserting a correctly-nested comment between tokens leaves the
        // token kinds unchanged.
        let comment = format!("(; {} ;)", "x".repeat(usize::from(padding) % 16));
        let plain = "(func $f (result i32) i32.const 7)";
        let commented = format!("(func $f {} (result i32) i32.const 7)", comment);

        kinds(plain) == kinds(&commented)
    }
}
