//! Abstract Syntax Tree for the lpg language
//!
//! The checker consumes this tree. Every node carries the location of its
//! first token so diagnostics can point back into the source.

use crate::common::SourceLocation;
use serde::{Deserialize, Serialize};

/// A name together with where it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub value: String,
    pub source: SourceLocation,
}

impl Identifier {
    pub fn new(value: impl Into<String>, source: SourceLocation) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// An ordered block of expressions; the last one is the value of the block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub elements: Vec<Expression>,
    pub source: SourceLocation,
}

impl Sequence {
    pub fn new(elements: Vec<Expression>, source: SourceLocation) -> Self {
        Self { elements, source }
    }
}

// ==================== FUNCTIONS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    pub parameter_type: Expression,
}

/// Parameter list and optional declared result type of a lambda or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionHeader {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    /// Names in `[A, B]`; empty for ordinary lambdas
    pub generic_parameters: Vec<String>,
    pub header: FunctionHeader,
    pub result: Box<Expression>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub closing_parenthesis: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    Less,
    LessOrEquals,
    Greater,
    GreaterOrEquals,
    Add,
    Subtract,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEquals => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEquals => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub operator: BinaryOperator,
    /// Location of the operator token
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declare {
    pub name: Identifier,
    pub optional_type: Option<Box<Expression>>,
    pub initializer: Box<Expression>,
}

// ==================== MATCH ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchCaseKey {
    Value(Expression),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCase {
    pub key: MatchCaseKey,
    pub action: Sequence,
    /// Location of the `case`/`default` keyword
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub input: Box<Expression>,
    pub cases: Vec<MatchCase>,
    pub source: SourceLocation,
}

// ==================== DEFINITIONS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethod {
    pub name: Identifier,
    pub header: FunctionHeader,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    pub generic_parameters: Vec<String>,
    pub methods: Vec<InterfaceMethod>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructElement {
    pub name: Identifier,
    pub element_type: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDefinition {
    pub generic_parameters: Vec<String>,
    pub elements: Vec<StructElement>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumElement {
    pub name: Identifier,
    /// Payload type expression for `name(T)`
    pub state: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub generic_parameters: Vec<String>,
    pub elements: Vec<EnumElement>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub name: Identifier,
    pub header: FunctionHeader,
    pub body: Sequence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplDefinition {
    pub generic_parameters: Vec<String>,
    pub interface: Box<Expression>,
    pub self_type: Box<Expression>,
    pub methods: Vec<MethodDefinition>,
    pub source: SourceLocation,
}

// ==================== OTHER EXPRESSIONS ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantiateStruct {
    pub structure: Box<Expression>,
    pub arguments: Vec<Expression>,
    /// Location of the opening brace
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericInstantiation {
    pub generic: Box<Expression>,
    pub arguments: Vec<Expression>,
    /// Location of the opening bracket
    pub source: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessStructure {
    pub object: Box<Expression>,
    pub member: Identifier,
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Lambda(Lambda),
    Call(Call),
    IntegerLiteral {
        value: u128,
        source: SourceLocation,
    },
    String {
        value: String,
        source: SourceLocation,
    },
    Identifier(Identifier),
    Not {
        expr: Box<Expression>,
        source: SourceLocation,
    },
    Binary(Binary),
    Return {
        value: Box<Expression>,
        source: SourceLocation,
    },
    Loop(Sequence),
    Break(SourceLocation),
    Sequence(Sequence),
    Declare(Declare),
    Match(Match),
    Comment {
        text: String,
        source: SourceLocation,
    },
    Interface(InterfaceDefinition),
    Struct(StructDefinition),
    Impl(ImplDefinition),
    InstantiateStruct(InstantiateStruct),
    Enum(EnumDefinition),
    /// `let name` inside call arguments, only meaningful as a match pattern
    Placeholder(Identifier),
    TypeOf {
        target: Box<Expression>,
        source: SourceLocation,
    },
    Import(Identifier),
    NewArray {
        element: Box<Expression>,
        source: SourceLocation,
    },
    GenericInstantiation(GenericInstantiation),
    AccessStructure(AccessStructure),
    Tuple {
        elements: Vec<Expression>,
        source: SourceLocation,
    },
}

impl Expression {
    /// Location of the first token belonging to this expression
    pub fn source_begin(&self) -> SourceLocation {
        match self {
            Expression::Lambda(lambda) => lambda.source,
            Expression::Call(call) => call.callee.source_begin(),
            Expression::IntegerLiteral { source, .. }
            | Expression::String { source, .. }
            | Expression::Not { source, .. }
            | Expression::Return { source, .. }
            | Expression::Comment { source, .. }
            | Expression::TypeOf { source, .. }
            | Expression::NewArray { source, .. }
            | Expression::Tuple { source, .. }
            | Expression::Break(source) => *source,
            Expression::Identifier(identifier)
            | Expression::Placeholder(identifier)
            | Expression::Import(identifier) => identifier.source,
            Expression::Binary(binary) => binary.left.source_begin(),
            Expression::Loop(body) | Expression::Sequence(body) => body.source,
            Expression::Declare(declare) => declare.name.source,
            Expression::Match(match_) => match_.source,
            Expression::Interface(definition) => definition.source,
            Expression::Struct(definition) => definition.source,
            Expression::Impl(definition) => definition.source,
            Expression::Enum(definition) => definition.source,
            Expression::InstantiateStruct(instantiate) => instantiate.structure.source_begin(),
            Expression::GenericInstantiation(instantiation) => {
                instantiation.generic.source_begin()
            }
            Expression::AccessStructure(access) => access.object.source_begin(),
        }
    }

    pub fn identifier(value: impl Into<String>, source: SourceLocation) -> Self {
        Expression::Identifier(Identifier::new(value, source))
    }
}
