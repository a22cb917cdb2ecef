//! Core type definitions

use super::range::IntegerRange;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(
    /// Index into `CheckedProgram::functions`; 0 is the program entry
    FunctionId
);
dense_id!(StructId);
dense_id!(EnumId);
dense_id!(InterfaceId);
dense_id!(GenericEnumId);
dense_id!(GenericStructId);
dense_id!(GenericInterfaceId);
dense_id!(GenericLambdaId);

/// Signature of something callable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionPointerType {
    /// `None` while the result is still being inferred
    pub result: Option<Type>,
    pub parameters: Vec<Type>,
    pub captures: Vec<Type>,
    /// Receiver type of interface methods
    pub self_type: Option<Type>,
}

impl FunctionPointerType {
    pub fn new(result: Type, parameters: Vec<Type>) -> Self {
        Self {
            result: Some(result),
            parameters,
            captures: Vec::new(),
            self_type: None,
        }
    }
}

/// Core type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Unit,
    String,
    /// The type of first-class types
    Type,
    IntegerRange(IntegerRange),
    Tuple(Vec<Type>),
    Structure(StructId),
    Enumeration(EnumId),
    Interface(InterfaceId),
    FunctionPointer(Box<FunctionPointerType>),
    /// The unique type of one particular lambda
    Lambda(FunctionId),
    EnumConstructor {
        enumeration: EnumId,
        which: u32,
    },
    GenericEnum(GenericEnumId),
    GenericStruct(GenericStructId),
    GenericInterface(GenericInterfaceId),
    GenericLambda(GenericLambdaId),
}

impl Type {
    pub fn integer(minimum: u128, maximum: u128) -> Type {
        Type::IntegerRange(IntegerRange::new(minimum, maximum))
    }

    pub fn function_pointer(signature: FunctionPointerType) -> Type {
        Type::FunctionPointer(Box::new(signature))
    }

    pub fn as_integer_range(&self) -> Option<IntegerRange> {
        match self {
            Type::IntegerRange(range) => Some(*range),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Unit => "unit",
            Type::String => "string",
            Type::Type => "type",
            Type::IntegerRange(_) => "integer",
            Type::Tuple(_) => "tuple",
            Type::Structure(_) => "structure",
            Type::Enumeration(_) => "enumeration",
            Type::Interface(_) => "interface",
            Type::FunctionPointer(_) => "function pointer",
            Type::Lambda(_) => "lambda",
            Type::EnumConstructor { .. } => "enum constructor",
            Type::GenericEnum(_) => "generic enum",
            Type::GenericStruct(_) => "generic struct",
            Type::GenericInterface(_) => "generic interface",
            Type::GenericLambda(_) => "generic lambda",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => write!(f, "unit"),
            Type::String => write!(f, "string"),
            Type::Type => write!(f, "type"),
            Type::IntegerRange(range) => write!(f, "{}", range),
            Type::Tuple(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "}}")
            }
            Type::Structure(id) => write!(f, "struct#{}", id),
            Type::Enumeration(id) => write!(f, "enum#{}", id),
            Type::Interface(id) => write!(f, "interface#{}", id),
            Type::FunctionPointer(signature) => {
                write!(f, "(")?;
                for (i, parameter) in signature.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ")")?;
                match &signature.result {
                    Some(result) => write!(f, ": {}", result),
                    None => write!(f, ": ?"),
                }
            }
            Type::Lambda(id) => write!(f, "lambda#{}", id),
            Type::EnumConstructor { enumeration, which } => {
                write!(f, "constructor#{}.{}", enumeration, which)
            }
            Type::GenericEnum(id) => write!(f, "generic_enum#{}", id),
            Type::GenericStruct(id) => write!(f, "generic_struct#{}", id),
            Type::GenericInterface(id) => write!(f, "generic_interface#{}", id),
            Type::GenericLambda(id) => write!(f, "generic_lambda#{}", id),
        }
    }
}

/// Structural equality; nominal types compare by id
pub fn type_equals(a: &Type, b: &Type) -> bool {
    a == b
}

/// Whether a value of `from` can be used where `to` is expected without any conversion code
pub fn is_implicitly_convertible(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::IntegerRange(from), Type::IntegerRange(to)) => to.contains(from),
        (Type::Tuple(from), Type::Tuple(to)) => {
            from.len() == to.len()
                && from
                    .iter()
                    .zip(to)
                    .all(|(from, to)| is_implicitly_convertible(from, to))
        }
        (Type::FunctionPointer(from), Type::FunctionPointer(to)) => from == to,
        (Type::Unit, Type::Unit) | (Type::String, Type::String) | (Type::Type, Type::Type) => true,
        _ => from == to,
    }
}
