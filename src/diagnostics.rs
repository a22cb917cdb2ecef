//! Diagnostic reporting with source locations
//!
//! The checker reports [`SemanticError`]s (a kind plus a location) through a
//! callback. This module turns them, and parse errors, into rich miette
//! diagnostics for the command line.

use crate::common::SourceLocation;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Source file for error reporting
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: Arc<str>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
        }
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.to_string())
    }

    /// A one-character span at `location`
    pub fn span_at(&self, location: SourceLocation) -> SourceSpan {
        let offset = location.offset_in(&self.content);
        let length = usize::from(offset < self.content.len());
        SourceSpan::new(offset.into(), length)
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SourceFile {}

/// Every way a program can be semantically wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    UnknownElement,
    ExpectedCompileTimeType,
    NoMembersOnEnumElements,
    TypeMismatch,
    MissingArgument,
    ExtraneousArgument,
    BreakOutsideOfLoop,
    DeclarationWithExistingName,
    MissingMatchCase,
    DuplicateMatchCase,
    ExpectedInterface,
    DuplicateImpl,
    CannotCaptureRuntimeVariable,
    NotCallable,
    DuplicateMethodName,
    ExpectedStructure,
    MatchUnsupported,
    DuplicateEnumElement,
    ExpectedGenericType,
    ExpectedCompileTimeValue,
    ImportFailed,
    ExpressionRecursionLimitReached,
    MissingMethod,
    ExtraMethod,
    CompileTimeMemoryLimitReached,
    StackOverflow,
    InstructionLimitReached,
    MissingDefault,
    DuplicateDefaultCase,
    GenericImplParameterMismatch,
    PlaceholderNotSupportedHere,
}

impl SemanticErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            SemanticErrorKind::UnknownElement => "unknown element",
            SemanticErrorKind::ExpectedCompileTimeType => "expected a type known at compile time",
            SemanticErrorKind::NoMembersOnEnumElements => "enum elements have no members",
            SemanticErrorKind::TypeMismatch => "type mismatch",
            SemanticErrorKind::MissingArgument => "missing argument",
            SemanticErrorKind::ExtraneousArgument => "extraneous argument",
            SemanticErrorKind::BreakOutsideOfLoop => "break outside of a loop",
            SemanticErrorKind::DeclarationWithExistingName => "a variable with this name already exists",
            SemanticErrorKind::MissingMatchCase => "missing match case",
            SemanticErrorKind::DuplicateMatchCase => "duplicate match case",
            SemanticErrorKind::ExpectedInterface => "expected an interface",
            SemanticErrorKind::DuplicateImpl => "duplicate implementation",
            SemanticErrorKind::CannotCaptureRuntimeVariable => "cannot capture a runtime variable here",
            SemanticErrorKind::NotCallable => "this value is not callable",
            SemanticErrorKind::DuplicateMethodName => "duplicate method name",
            SemanticErrorKind::ExpectedStructure => "expected a structure",
            SemanticErrorKind::MatchUnsupported => "match is not supported on this value",
            SemanticErrorKind::DuplicateEnumElement => "duplicate enum element",
            SemanticErrorKind::ExpectedGenericType => "expected a generic type",
            SemanticErrorKind::ExpectedCompileTimeValue => "expected a value known at compile time",
            SemanticErrorKind::ImportFailed => "import failed",
            SemanticErrorKind::ExpressionRecursionLimitReached => {
                "expression nesting is too deep"
            }
            SemanticErrorKind::MissingMethod => "missing method",
            SemanticErrorKind::ExtraMethod => "method is not part of the interface",
            SemanticErrorKind::CompileTimeMemoryLimitReached => {
                "compile time evaluation ran out of memory"
            }
            SemanticErrorKind::StackOverflow => "compile time evaluation overflowed the stack",
            SemanticErrorKind::InstructionLimitReached => {
                "compile time evaluation executed too many instructions"
            }
            SemanticErrorKind::MissingDefault => "missing default case",
            SemanticErrorKind::DuplicateDefaultCase => "duplicate default case",
            SemanticErrorKind::GenericImplParameterMismatch => {
                "generic impl parameters do not match"
            }
            SemanticErrorKind::PlaceholderNotSupportedHere => "placeholder is not supported here",
        }
    }
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A semantic error relative to the file being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub location: SourceLocation,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

/// A semantic error together with the file it occurred in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteSemanticError {
    pub error: SemanticError,
    pub source: SourceFile,
    /// What went wrong elsewhere, e.g. the syntax error of an imported module
    pub note: Option<String>,
}

/// Lexical and syntactic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid token `{text}`")]
    InvalidToken {
        text: String,
        location: SourceLocation,
    },

    #[error("expected {expected}, found `{found}`")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("integer literal out of range")]
    IntegerOutOfRange { location: SourceLocation },

    #[error("invalid escape sequence in string literal")]
    InvalidEscapeSequence { location: SourceLocation },

    #[error("unexpected indentation")]
    UnexpectedIndentation { location: SourceLocation },
}

impl ParseError {
    pub fn location(&self) -> SourceLocation {
        match self {
            ParseError::InvalidToken { location, .. }
            | ParseError::UnexpectedToken { location, .. }
            | ParseError::IntegerOutOfRange { location }
            | ParseError::InvalidEscapeSequence { location }
            | ParseError::UnexpectedIndentation { location } => *location,
        }
    }
}

/// Compiler diagnostic
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CompileError {
    #[error("{kind}")]
    #[diagnostic(code(check::semantic))]
    Semantic {
        kind: SemanticErrorKind,
        #[label("{kind}")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
        #[help]
        note: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

impl CompileError {
    pub fn from_semantic(error: &CompleteSemanticError) -> Self {
        CompileError::Semantic {
            kind: error.error.kind,
            span: error.source.span_at(error.error.location),
            src: error.source.to_named_source(),
            note: error.note.clone(),
        }
    }

    pub fn from_parse(error: &ParseError, source: &SourceFile) -> Self {
        CompileError::Syntax {
            message: error.to_string(),
            span: source.span_at(error.location()),
            src: source.to_named_source(),
        }
    }
}

/// Error reporter that collects diagnostics
#[derive(Default)]
pub struct Reporter {
    errors: Vec<CompileError>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Print all diagnostics
    pub fn emit_all(&self) {
        for error in &self.errors {
            eprintln!("{:?}", miette::Report::new(error.clone()));
        }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_error_span_points_at_location() {
        let source = SourceFile::new("test.lpg", "let a = b\n");
        let error = CompleteSemanticError {
            error: SemanticError::new(
                SemanticErrorKind::UnknownElement,
                SourceLocation::new(0, 8),
            ),
            source: source.clone(),
            note: None,
        };
        match CompileError::from_semantic(&error) {
            CompileError::Semantic {
                kind, span, note, ..
            } => {
                assert_eq!(kind, SemanticErrorKind::UnknownElement);
                assert_eq!(span.offset(), 8);
                assert_eq!(span.len(), 1);
                assert_eq!(note, None);
            }
            other => panic!("unexpected diagnostic {:?}", other),
        }
    }
}
