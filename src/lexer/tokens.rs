//! Token definitions for the lpg lexer

use crate::common::SourceLocation;
use logos::Logos;
use serde::{Deserialize, Serialize};

/// A token with its kind, location, and text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub text: String,
}

impl Token {
    /// Indentation level (in units of four spaces) introduced by a newline token
    pub fn indentation(&self) -> usize {
        debug_assert_eq!(self.kind, TokenKind::Newline);
        self.text.chars().filter(|c| *c == ' ').count() / 4
    }
}

/// Token kinds recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Serialize, Deserialize)]
#[logos(skip r"[ \t\r]+")]
pub enum TokenKind {
    /// A line break followed by the leading spaces of the next line
    #[regex(r"\n[ ]*")]
    Newline,

    #[regex(r"//[^\n]*")]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    // Keywords
    #[token("let")]
    Let,
    #[token("return")]
    Return,
    #[token("match")]
    Match,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("interface")]
    Interface,
    #[token("struct")]
    Struct,
    #[token("enum")]
    Enum,
    #[token("impl")]
    Impl,
    #[token("for")]
    For,
    #[token("type_of")]
    TypeOf,
    #[token("import")]
    Import,
    #[token("new_array")]
    NewArray,

    // Literals
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,
    #[regex(r"'[^'\n]*'")]
    RawString,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // Operators
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    Eof,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Newline => "<newline>",
            TokenKind::Comment => "<comment>",
            TokenKind::Let => "let",
            TokenKind::Return => "return",
            TokenKind::Match => "match",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Loop => "loop",
            TokenKind::Break => "break",
            TokenKind::Interface => "interface",
            TokenKind::Struct => "struct",
            TokenKind::Enum => "enum",
            TokenKind::Impl => "impl",
            TokenKind::For => "for",
            TokenKind::TypeOf => "type_of",
            TokenKind::Import => "import",
            TokenKind::NewArray => "new_array",
            TokenKind::Integer => "<int>",
            TokenKind::String => "<string>",
            TokenKind::RawString => "<raw string>",
            TokenKind::Identifier => "<ident>",
            TokenKind::EqEq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Bang => "!",
            TokenKind::Eq => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Eof => "<eof>",
        }
    }

    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::EqEq
                | TokenKind::Ne
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Plus
                | TokenKind::Minus
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
