//! Parser for the lpg language
//!
//! A recursive descent parser over the token stream. Blocks are delimited by
//! indentation: a newline token carries the indentation level of the next
//! line, and every parse function receives the level of the block it is in.

use crate::ast::*;
use crate::common::SourceLocation;
use crate::diagnostics::ParseError;
use crate::lexer::{Token, TokenKind};

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a token stream into the top-level sequence of a file
pub fn parse(tokens: &[Token]) -> Result<Sequence> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

/// Lex and parse in one step
pub fn parse_source(source: &str) -> Result<Sequence> {
    let tokens = crate::lexer::lex(source)?;
    parse(&tokens)
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    eof: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let end = tokens.last().map(|t| t.location).unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                location: end,
                text: String::new(),
            },
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_n(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn location(&self) -> SourceLocation {
        self.current().location
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.as_str()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current();
        let found = if token.text.is_empty() || token.kind == TokenKind::Newline {
            token.kind.as_str().to_string()
        } else {
            token.text.clone()
        };
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            location: token.location,
        }
    }

    /// True if the next token is a newline opening a block at `indentation`
    fn at_block(&self, indentation: usize) -> bool {
        let token = self.current();
        token.kind == TokenKind::Newline && token.indentation() == indentation
    }

    fn parse_identifier(&mut self) -> Result<Identifier> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Identifier::new(token.text, token.location))
    }

    // ==================== SEQUENCES ====================

    fn parse_program(&mut self) -> Result<Sequence> {
        let start = self.location();
        if self.at(TokenKind::Eof) {
            return Ok(Sequence::new(Vec::new(), start));
        }
        let sequence = self.parse_sequence(0, start)?;
        if !self.at(TokenKind::Eof) {
            return Err(self.unexpected("end of file"));
        }
        Ok(sequence)
    }

    /// Parses statements separated by newlines at exactly `indentation`
    fn parse_sequence(&mut self, indentation: usize, source: SourceLocation) -> Result<Sequence> {
        let mut elements = Vec::new();
        loop {
            elements.push(self.parse_statement(indentation)?);
            match self.peek() {
                TokenKind::Newline => {
                    let level = self.current().indentation();
                    if level == indentation {
                        self.advance();
                        continue;
                    }
                    if level > indentation {
                        return Err(ParseError::UnexpectedIndentation {
                            location: self.peek_n(1).location,
                        });
                    }
                    break;
                }
                TokenKind::Eof => break,
                _ => return Err(self.unexpected("end of line")),
            }
        }
        Ok(Sequence::new(elements, source))
    }

    /// Parses the indented block that follows a header at `indentation`
    fn parse_block(&mut self, indentation: usize) -> Result<Sequence> {
        if !self.at_block(indentation + 1) {
            return Err(self.unexpected("an indented block"));
        }
        self.advance();
        let source = self.location();
        self.parse_sequence(indentation + 1, source)
    }

    /// Lines of a definition body (`enum`, `struct`, `interface`, `impl`); may be empty
    fn parse_lines<T>(
        &mut self,
        indentation: usize,
        mut parse_line: impl FnMut(&mut Self, usize) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut lines = Vec::new();
        while self.at_block(indentation + 1) {
            self.advance();
            if self.at(TokenKind::Comment) {
                self.advance();
                continue;
            }
            lines.push(parse_line(self, indentation + 1)?);
        }
        Ok(lines)
    }

    // ==================== STATEMENTS ====================

    fn parse_statement(&mut self, indentation: usize) -> Result<Expression> {
        match self.peek() {
            TokenKind::Let => self.parse_declaration(indentation),
            TokenKind::Return => {
                let source = self.advance().location;
                let value = self.parse_expression(indentation)?;
                Ok(Expression::Return {
                    value: Box::new(value),
                    source,
                })
            }
            TokenKind::Loop => {
                self.advance();
                let body = self.parse_block(indentation)?;
                Ok(Expression::Loop(body))
            }
            TokenKind::Break => Ok(Expression::Break(self.advance().location)),
            TokenKind::Comment => {
                let token = self.advance();
                Ok(Expression::Comment {
                    text: comment_text(&token.text),
                    source: token.location,
                })
            }
            _ => self.parse_expression(indentation),
        }
    }

    fn parse_declaration(&mut self, indentation: usize) -> Result<Expression> {
        self.expect(TokenKind::Let)?;
        let name = self.parse_identifier()?;
        let optional_type = if self.at(TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_postfix(indentation)?))
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let initializer = self.parse_expression(indentation)?;
        Ok(Expression::Declare(Declare {
            name,
            optional_type,
            initializer: Box::new(initializer),
        }))
    }

    // ==================== EXPRESSIONS ====================

    fn parse_expression(&mut self, indentation: usize) -> Result<Expression> {
        self.parse_binary(indentation, 0)
    }

    fn parse_binary(&mut self, indentation: usize, min_precedence: u8) -> Result<Expression> {
        let mut left = self.parse_postfix(indentation)?;
        while let Some(operator) = binary_operator(self.peek()) {
            let precedence = precedence(operator);
            if precedence < min_precedence {
                break;
            }
            let source = self.advance().location;
            let right = self.parse_binary(indentation, precedence + 1)?;
            left = Expression::Binary(Binary {
                left: Box::new(left),
                right: Box::new(right),
                operator,
                source,
            });
        }
        Ok(left)
    }

    fn parse_postfix(&mut self, indentation: usize) -> Result<Expression> {
        let mut result = self.parse_primary(indentation)?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    let arguments = self.parse_arguments(indentation, TokenKind::RParen)?;
                    let closing_parenthesis = self.expect(TokenKind::RParen)?.location;
                    result = Expression::Call(Call {
                        callee: Box::new(result),
                        arguments,
                        closing_parenthesis,
                    });
                }
                TokenKind::LBrace => {
                    let source = self.advance().location;
                    let arguments = self.parse_arguments(indentation, TokenKind::RBrace)?;
                    self.expect(TokenKind::RBrace)?;
                    result = Expression::InstantiateStruct(InstantiateStruct {
                        structure: Box::new(result),
                        arguments,
                        source,
                    });
                }
                TokenKind::LBracket => {
                    let source = self.advance().location;
                    let arguments = self.parse_arguments(indentation, TokenKind::RBracket)?;
                    self.expect(TokenKind::RBracket)?;
                    result = Expression::GenericInstantiation(GenericInstantiation {
                        generic: Box::new(result),
                        arguments,
                        source,
                    });
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = match self.peek() {
                        TokenKind::Identifier | TokenKind::Integer => {
                            let token = self.advance();
                            Identifier::new(token.text, token.location)
                        }
                        _ => return Err(self.unexpected("a member name")),
                    };
                    result = Expression::AccessStructure(AccessStructure {
                        object: Box::new(result),
                        member,
                    });
                }
                _ => return Ok(result),
            }
        }
    }

    /// Comma separated expressions up to (not including) `closing`
    fn parse_arguments(&mut self, indentation: usize, closing: TokenKind) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.at(closing) {
            return Ok(arguments);
        }
        loop {
            if self.at(TokenKind::Let) {
                self.advance();
                arguments.push(Expression::Placeholder(self.parse_identifier()?));
            } else {
                arguments.push(self.parse_expression(indentation)?);
            }
            if self.at(TokenKind::Comma) {
                self.advance();
                continue;
            }
            return Ok(arguments);
        }
    }

    fn parse_primary(&mut self, indentation: usize) -> Result<Expression> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = token
                    .text
                    .parse::<u128>()
                    .map_err(|_| ParseError::IntegerOutOfRange {
                        location: token.location,
                    })?;
                Ok(Expression::IntegerLiteral {
                    value,
                    source: token.location,
                })
            }
            TokenKind::String => {
                self.advance();
                let inner = &token.text[1..token.text.len() - 1];
                let value = decode_string_literal(inner).ok_or(
                    ParseError::InvalidEscapeSequence {
                        location: token.location,
                    },
                )?;
                Ok(Expression::String {
                    value,
                    source: token.location,
                })
            }
            TokenKind::RawString => {
                self.advance();
                Ok(Expression::String {
                    value: token.text[1..token.text.len() - 1].to_string(),
                    source: token.location,
                })
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expression::identifier(token.text, token.location))
            }
            TokenKind::Bang => {
                self.advance();
                let expr = self.parse_postfix(indentation)?;
                Ok(Expression::Not {
                    expr: Box::new(expr),
                    source: token.location,
                })
            }
            TokenKind::LParen => self.parse_lambda(indentation, Vec::new(), token.location),
            TokenKind::LBracket => {
                let generic_parameters = self.parse_generic_parameters()?;
                self.parse_lambda(indentation, generic_parameters, token.location)
            }
            TokenKind::LBrace => {
                self.advance();
                let elements = self.parse_arguments(indentation, TokenKind::RBrace)?;
                self.expect(TokenKind::RBrace)?;
                Ok(Expression::Tuple {
                    elements,
                    source: token.location,
                })
            }
            TokenKind::Match => self.parse_match(indentation),
            TokenKind::Interface => self.parse_interface(indentation),
            TokenKind::Struct => self.parse_struct(indentation),
            TokenKind::Enum => self.parse_enum(indentation),
            TokenKind::Impl => self.parse_impl(indentation),
            TokenKind::TypeOf => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let target = self.parse_expression(indentation)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expression::TypeOf {
                    target: Box::new(target),
                    source: token.location,
                })
            }
            TokenKind::Import => {
                self.advance();
                Ok(Expression::Import(self.parse_identifier()?))
            }
            TokenKind::NewArray => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let element = self.parse_expression(indentation)?;
                self.expect(TokenKind::RParen)?;
                Ok(Expression::NewArray {
                    element: Box::new(element),
                    source: token.location,
                })
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    // ==================== FUNCTIONS ====================

    /// `[A, B]`
    fn parse_generic_parameters(&mut self) -> Result<Vec<String>> {
        self.expect(TokenKind::LBracket)?;
        let mut names = Vec::new();
        while !self.at(TokenKind::RBracket) {
            names.push(self.parse_identifier()?.value);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(names)
    }

    fn parse_optional_generic_parameters(&mut self) -> Result<Vec<String>> {
        if self.at(TokenKind::LBracket) {
            self.parse_generic_parameters()
        } else {
            Ok(Vec::new())
        }
    }

    /// `(a: T, b: U)` followed by an optional `: R`
    fn parse_function_header(&mut self, indentation: usize) -> Result<FunctionHeader> {
        self.expect(TokenKind::LParen)?;
        let mut parameters = Vec::new();
        while !self.at(TokenKind::RParen) {
            let name = self.parse_identifier()?;
            self.expect(TokenKind::Colon)?;
            let parameter_type = self.parse_postfix(indentation)?;
            parameters.push(Parameter {
                name,
                parameter_type,
            });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let return_type = if self.at(TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_postfix(indentation)?))
        } else {
            None
        };
        Ok(FunctionHeader {
            parameters,
            return_type,
        })
    }

    fn parse_lambda(
        &mut self,
        indentation: usize,
        generic_parameters: Vec<String>,
        source: SourceLocation,
    ) -> Result<Expression> {
        let header = self.parse_function_header(indentation)?;
        let result = self.parse_body(indentation)?;
        Ok(Expression::Lambda(Lambda {
            generic_parameters,
            header,
            result: Box::new(result),
            source,
        }))
    }

    /// Either an indented block or a single statement on the same line
    fn parse_body(&mut self, indentation: usize) -> Result<Expression> {
        if self.at(TokenKind::Newline) {
            return Ok(Expression::Sequence(self.parse_block(indentation)?));
        }
        self.parse_statement(indentation)
    }

    // ==================== MATCH ====================

    fn parse_match(&mut self, indentation: usize) -> Result<Expression> {
        let source = self.expect(TokenKind::Match)?.location;
        let input = self.parse_expression(indentation)?;
        let cases = self.parse_lines(indentation, |parser, level| parser.parse_match_case(level))?;
        Ok(Expression::Match(Match {
            input: Box::new(input),
            cases,
            source,
        }))
    }

    fn parse_match_case(&mut self, indentation: usize) -> Result<MatchCase> {
        let source = self.location();
        let key = match self.peek() {
            TokenKind::Case => {
                self.advance();
                MatchCaseKey::Value(self.parse_expression(indentation)?)
            }
            TokenKind::Default => {
                self.advance();
                MatchCaseKey::Default
            }
            _ => return Err(self.unexpected("`case` or `default`")),
        };
        self.expect(TokenKind::Colon)?;
        let action = if self.at(TokenKind::Newline) {
            self.parse_block(indentation)?
        } else {
            let action_source = self.location();
            Sequence::new(vec![self.parse_statement(indentation)?], action_source)
        };
        Ok(MatchCase {
            key,
            action,
            source,
        })
    }

    // ==================== DEFINITIONS ====================

    fn parse_interface(&mut self, indentation: usize) -> Result<Expression> {
        let source = self.expect(TokenKind::Interface)?.location;
        let generic_parameters = self.parse_optional_generic_parameters()?;
        let methods = self.parse_lines(indentation, |parser, level| {
            let name = parser.parse_identifier()?;
            let header = parser.parse_function_header(level)?;
            Ok(InterfaceMethod { name, header })
        })?;
        Ok(Expression::Interface(InterfaceDefinition {
            generic_parameters,
            methods,
            source,
        }))
    }

    fn parse_struct(&mut self, indentation: usize) -> Result<Expression> {
        let source = self.expect(TokenKind::Struct)?.location;
        let generic_parameters = self.parse_optional_generic_parameters()?;
        let elements = self.parse_lines(indentation, |parser, level| {
            let name = parser.parse_identifier()?;
            parser.expect(TokenKind::Colon)?;
            let element_type = parser.parse_expression(level)?;
            Ok(StructElement { name, element_type })
        })?;
        Ok(Expression::Struct(StructDefinition {
            generic_parameters,
            elements,
            source,
        }))
    }

    fn parse_enum(&mut self, indentation: usize) -> Result<Expression> {
        let source = self.expect(TokenKind::Enum)?.location;
        let generic_parameters = self.parse_optional_generic_parameters()?;
        let elements = self.parse_lines(indentation, |parser, level| {
            let name = parser.parse_identifier()?;
            let state = if parser.at(TokenKind::LParen) {
                parser.advance();
                let state = parser.parse_expression(level)?;
                parser.expect(TokenKind::RParen)?;
                Some(state)
            } else {
                None
            };
            Ok(EnumElement { name, state })
        })?;
        Ok(Expression::Enum(EnumDefinition {
            generic_parameters,
            elements,
            source,
        }))
    }

    fn parse_impl(&mut self, indentation: usize) -> Result<Expression> {
        let source = self.expect(TokenKind::Impl)?.location;
        let generic_parameters = self.parse_optional_generic_parameters()?;
        let interface = self.parse_postfix(indentation)?;
        self.expect(TokenKind::For)?;
        let self_type = self.parse_postfix(indentation)?;
        let methods = self.parse_lines(indentation, |parser, level| {
            let name = parser.parse_identifier()?;
            let header = parser.parse_function_header(level)?;
            let body = parser.parse_block(level)?;
            Ok(MethodDefinition { name, header, body })
        })?;
        Ok(Expression::Impl(ImplDefinition {
            generic_parameters,
            interface: Box::new(interface),
            self_type: Box::new(self_type),
            methods,
            source,
        }))
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::EqEq => Some(BinaryOperator::Equals),
        TokenKind::Ne => Some(BinaryOperator::NotEquals),
        TokenKind::Lt => Some(BinaryOperator::Less),
        TokenKind::Le => Some(BinaryOperator::LessOrEquals),
        TokenKind::Gt => Some(BinaryOperator::Greater),
        TokenKind::Ge => Some(BinaryOperator::GreaterOrEquals),
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        _ => None,
    }
}

/// Comparisons bind looser than `+` and `-`; all operators are left associative
fn precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::Add | BinaryOperator::Subtract => 2,
        _ => 1,
    }
}

fn comment_text(raw: &str) -> String {
    if let Some(line) = raw.strip_prefix("//") {
        return line.to_string();
    }
    raw.strip_prefix("/*")
        .and_then(|inner| inner.strip_suffix("*/"))
        .unwrap_or(raw)
        .to_string()
}

/// Resolves backslash escapes; `None` for an unknown escape
pub fn decode_string_literal(inner: &str) -> Option<String> {
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            _ => return None,
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode_string_literal(r#"a\n\"b\""#).as_deref(), Some("a\n\"b\""));
        assert_eq!(decode_string_literal(r"\q"), None);
    }

    #[test]
    fn comparison_binds_looser_than_addition() {
        let sequence = parse_source("a + b == c").expect("should parse");
        match &sequence.elements[0] {
            Expression::Binary(binary) => {
                assert_eq!(binary.operator, BinaryOperator::Equals);
                assert!(matches!(
                    binary.left.as_ref(),
                    Expression::Binary(Binary {
                        operator: BinaryOperator::Add,
                        ..
                    })
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
