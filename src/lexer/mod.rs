//! Lexer for the lpg language
//!
//! Tokenizes with logos, then post-processes the stream:
//! - runs of blank lines collapse into the last newline token
//! - comments are kept only when they start a line (they become comment expressions)
//! - an `Eof` token terminates the stream

mod tokens;

pub use tokens::{Token, TokenKind};

use crate::common::SourceLocation;
use crate::diagnostics::ParseError;
use logos::Logos;

/// Maps byte offsets to line/column positions
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(index, _)| index + 1));
        Self { line_starts }
    }

    fn location(&self, source: &str, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = source[self.line_starts[line]..offset].chars().count();
        SourceLocation::new(line as u32, column as u32)
    }
}

/// Tokenize lpg source text
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let index = LineIndex::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens: Vec<Token> = Vec::new();
    let mut line_has_code = false;

    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        let location = index.location(source, span.start);
        let kind = kind.map_err(|_| ParseError::InvalidToken {
            text: text.to_string(),
            location,
        })?;
        match kind {
            TokenKind::Newline => {
                line_has_code = false;
                if let Some(last) = tokens.last_mut() {
                    if last.kind == TokenKind::Newline {
                        last.location = location;
                        last.text = text.to_string();
                        continue;
                    }
                }
                if tokens.is_empty() {
                    continue;
                }
            }
            TokenKind::Comment if line_has_code => continue,
            _ => line_has_code = true,
        }
        tokens.push(Token {
            kind,
            location,
            text: text.to_string(),
        });
    }

    if matches!(tokens.last(), Some(token) if token.kind == TokenKind::Newline) {
        tokens.pop();
    }
    let end = index.location(source, source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        location: end,
        text: String::new(),
    });
    tracing::trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn blank_lines_collapse() {
        assert_eq!(
            kinds("a\n\n    \nb"),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn trailing_comment_is_dropped() {
        assert_eq!(
            kinds("a // note\n// whole line"),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Comment,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn newline_carries_indentation() {
        let tokens = lex("a\n        b").expect("lexing should succeed");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[1].indentation(), 2);
        assert_eq!(tokens[2].location, SourceLocation::new(1, 8));
    }
}
