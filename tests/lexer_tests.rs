//! Lexer tests

use lpg::common::SourceLocation;
use lpg::diagnostics::ParseError;
use lpg::lexer::{lex, TokenKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source).unwrap().into_iter().map(|t| t.kind).collect()
}

// ==================== Basics ====================

#[test]
fn test_lex_empty() {
    let tokens = lex("").unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
}

#[test]
fn test_lex_keywords() {
    assert_eq!(
        kinds("let return match case default loop break interface struct enum impl for type_of import new_array"),
        vec![
            TokenKind::Let,
            TokenKind::Return,
            TokenKind::Match,
            TokenKind::Case,
            TokenKind::Default,
            TokenKind::Loop,
            TokenKind::Break,
            TokenKind::Interface,
            TokenKind::Struct,
            TokenKind::Enum,
            TokenKind::Impl,
            TokenKind::For,
            TokenKind::TypeOf,
            TokenKind::Import,
            TokenKind::NewArray,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_keyword_prefix_is_identifier() {
    assert_eq!(kinds("letter"), vec![TokenKind::Identifier, TokenKind::Eof]);
    assert_eq!(kinds("imports"), vec![TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn test_lex_operators() {
    assert_eq!(
        kinds("== != < <= > >= + - ! ="),
        vec![
            TokenKind::EqEq,
            TokenKind::Ne,
            TokenKind::Lt,
            TokenKind::Le,
            TokenKind::Gt,
            TokenKind::Ge,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Bang,
            TokenKind::Eq,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_punctuation() {
    assert_eq!(
        kinds("( ) [ ] { } : , ."),
        vec![
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::Eof,
        ]
    );
}

// ==================== Literals ====================

#[test]
fn test_lex_integer_keeps_text() {
    let tokens = lex("340282366920938463463374607431768211455").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[0].text, "340282366920938463463374607431768211455");
}

#[test]
fn test_lex_strings() {
    let tokens = lex(r#""a\"b" 'raw\n'"#).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].text, r#""a\"b""#);
    assert_eq!(tokens[1].kind, TokenKind::RawString);
    assert_eq!(tokens[1].text, r"'raw\n'");
}

#[test]
fn test_lex_block_comment_on_its_own_line() {
    assert_eq!(
        kinds("/* one\ntwo */\na"),
        vec![
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

// ==================== Layout ====================

#[test]
fn test_lex_leading_and_trailing_newlines_are_dropped() {
    assert_eq!(kinds("\n\na\n\n"), vec![TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn test_lex_locations_are_zero_based() {
    let tokens = lex("let a = 1\n    b").unwrap();
    assert_eq!(tokens[0].location, SourceLocation::new(0, 0));
    assert_eq!(tokens[1].location, SourceLocation::new(0, 4));
    assert_eq!(tokens[3].location, SourceLocation::new(0, 8));
    let b = tokens.iter().find(|t| t.text == "b").unwrap();
    assert_eq!(b.location, SourceLocation::new(1, 4));
}

// ==================== Errors ====================

#[test]
fn test_lex_invalid_character() {
    let error = lex("a @ b").unwrap_err();
    assert_eq!(
        error,
        ParseError::InvalidToken {
            text: "@".to_string(),
            location: SourceLocation::new(0, 2),
        }
    );
}

#[test]
fn test_lex_unterminated_string() {
    assert!(lex("\"abc").is_err());
}

proptest! {
    #[test]
    fn decimal_numbers_are_one_token(value in any::<u128>()) {
        let text = value.to_string();
        let tokens = lex(&text).unwrap();
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::Integer);
        prop_assert_eq!(&tokens[0].text, &text);
    }

    #[test]
    fn identifiers_that_are_not_keywords(name in "[a-z_][a-z0-9_]{0,12}") {
        prop_assume!(!matches!(
            name.as_str(),
            "let" | "return" | "match" | "case" | "default" | "loop" | "break" | "interface"
                | "struct" | "enum" | "impl" | "for" | "type_of" | "import" | "new_array"
        ));
        prop_assert_eq!(kinds(&name), vec![TokenKind::Identifier, TokenKind::Eof]);
    }
}
