//! Values shared by the checker and the interpreter

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::program::CheckedProgram;
use crate::stdlib::Builtin;
use crate::types::{
    FunctionId, FunctionPointerType, GenericEnumId, GenericInterfaceId, GenericLambdaId,
    GenericStructId, InterfaceId, Type,
};

/// Something that can be called
#[derive(Debug, Clone)]
pub enum FunctionPointerValue {
    /// A checked function together with the values it captured
    Internal {
        function: FunctionId,
        captures: Vec<Value>,
    },
    /// A native function
    External {
        builtin: Builtin,
        captures: Vec<Value>,
        signature: Box<FunctionPointerType>,
    },
}

impl FunctionPointerValue {
    pub fn captures(&self) -> &[Value] {
        match self {
            FunctionPointerValue::Internal { captures, .. }
            | FunctionPointerValue::External { captures, .. } => captures,
        }
    }
}

impl PartialEq for FunctionPointerValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FunctionPointerValue::Internal {
                    function: f,
                    captures: c,
                },
                FunctionPointerValue::Internal {
                    function: g,
                    captures: d,
                },
            ) => f == g && values_equal(c, d),
            (
                FunctionPointerValue::External {
                    builtin: f,
                    captures: c,
                    ..
                },
                FunctionPointerValue::External {
                    builtin: g,
                    captures: d,
                    ..
                },
            ) => f == g && values_equal(c, d),
            _ => false,
        }
    }
}

/// Identifies one implementation of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplementationRef {
    pub interface: InterfaceId,
    /// Index into `Interface::implementations`
    pub index: u32,
}

/// Contents of an array object
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub elements: Vec<Value>,
    pub element_type: Type,
}

/// A value of the language
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Integer(u128),
    String(String),
    FunctionPointer(FunctionPointerValue),
    Structure(Vec<Value>),
    Tuple(Vec<Value>),
    EnumElement {
        which: u32,
        state_type: Type,
        state: Option<Box<Value>>,
    },
    /// A payload element that has not been applied to its payload yet
    EnumConstructor,
    Type(Type),
    /// An interface object
    TypeErased {
        implementation: ImplementationRef,
        self_value: Box<Value>,
    },
    /// Shared and mutable; never frozen into a literal
    Array(Rc<RefCell<ArrayValue>>),
    GenericEnum(GenericEnumId),
    GenericStruct(GenericStructId),
    GenericInterface(GenericInterfaceId),
    GenericLambda(GenericLambdaId),
}

impl Value {
    pub fn from_bool(value: bool) -> Value {
        Value::EnumElement {
            which: u32::from(value),
            state_type: Type::Unit,
            state: None,
        }
    }

    pub fn enum_element(which: u32) -> Value {
        Value::EnumElement {
            which,
            state_type: Type::Unit,
            state: None,
        }
    }

    pub fn enum_element_with_state(which: u32, state_type: Type, state: Value) -> Value {
        Value::EnumElement {
            which,
            state_type,
            state: Some(Box::new(state)),
        }
    }

    pub fn function(function: FunctionId, captures: Vec<Value>) -> Value {
        Value::FunctionPointer(FunctionPointerValue::Internal { function, captures })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::FunctionPointer(_) => "function pointer",
            Value::Structure(_) => "structure",
            Value::Tuple(_) => "tuple",
            Value::EnumElement { .. } => "enum element",
            Value::EnumConstructor => "enum constructor",
            Value::Type(_) => "type",
            Value::TypeErased { .. } => "type erased",
            Value::Array(_) => "array",
            Value::GenericEnum(_) => "generic enum",
            Value::GenericStruct(_) => "generic struct",
            Value::GenericInterface(_) => "generic interface",
            Value::GenericLambda(_) => "generic lambda",
        }
    }

    pub fn as_integer(&self) -> Option<u128> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Interprets a `boolean` enum element
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::EnumElement {
                which, state: None, ..
            } => Some(*which != 0),
            _ => None,
        }
    }

    /// True if this value or anything inside it may change after creation
    pub fn is_mutable(&self) -> bool {
        match self {
            Value::Array(_) => true,
            Value::Structure(members) | Value::Tuple(members) => {
                members.iter().any(Value::is_mutable)
            }
            Value::FunctionPointer(pointer) => pointer.captures().iter().any(Value::is_mutable),
            Value::EnumElement {
                state: Some(state), ..
            } => state.is_mutable(),
            Value::TypeErased { self_value, .. } => self_value.is_mutable(),
            _ => false,
        }
    }

    /// Bytes charged against the compile-time heap budget when this value is created
    pub fn heap_size(&self) -> usize {
        let own = std::mem::size_of::<Value>();
        match self {
            Value::String(s) => own + s.len(),
            Value::Structure(members) | Value::Tuple(members) => {
                own + members.iter().map(Value::heap_size).sum::<usize>()
            }
            Value::FunctionPointer(pointer) => {
                own + pointer.captures().iter().map(Value::heap_size).sum::<usize>()
            }
            Value::EnumElement {
                state: Some(state), ..
            } => own + state.heap_size(),
            Value::TypeErased { self_value, .. } => own + self_value.heap_size(),
            _ => own,
        }
    }
}

/// Deep equality; arrays compare by identity
pub fn value_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Unit, Value::Unit) | (Value::EnumConstructor, Value::EnumConstructor) => true,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::FunctionPointer(a), Value::FunctionPointer(b)) => a == b,
        (Value::Structure(a), Value::Structure(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            values_equal(a, b)
        }
        (
            Value::EnumElement {
                which: a, state: s, ..
            },
            Value::EnumElement {
                which: b, state: t, ..
            },
        ) => {
            a == b
                && match (s, t) {
                    (Some(s), Some(t)) => value_equals(s, t),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Value::Type(a), Value::Type(b)) => a == b,
        (
            Value::TypeErased {
                implementation: a,
                self_value: s,
            },
            Value::TypeErased {
                implementation: b,
                self_value: t,
            },
        ) => a == b && value_equals(s, t),
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::GenericEnum(a), Value::GenericEnum(b)) => a == b,
        (Value::GenericStruct(a), Value::GenericStruct(b)) => a == b,
        (Value::GenericInterface(a), Value::GenericInterface(b)) => a == b,
        (Value::GenericLambda(a), Value::GenericLambda(b)) => a == b,
        _ => false,
    }
}

pub fn values_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| value_equals(a, b))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        value_equals(self, other)
    }
}

/// Whether `value` has the shape described by `ty`
pub fn value_conforms_to_type(program: &CheckedProgram, value: &Value, ty: &Type) -> bool {
    match (value, ty) {
        (Value::Unit, Type::Unit) => true,
        (Value::String(_), Type::String) => true,
        (Value::Type(_), Type::Type) => true,
        (Value::Integer(n), Type::IntegerRange(range)) => range.contains_integer(*n),
        (Value::Tuple(elements), Type::Tuple(types)) => {
            elements.len() == types.len()
                && elements
                    .iter()
                    .zip(types)
                    .all(|(element, ty)| value_conforms_to_type(program, element, ty))
        }
        (Value::Structure(members), Type::Structure(id)) => {
            let Some(structure) = program.structs.get(id.index()) else {
                return false;
            };
            members.len() == structure.members.len()
                && members
                    .iter()
                    .zip(&structure.members)
                    .all(|(value, member)| value_conforms_to_type(program, value, &member.what))
        }
        (Value::EnumElement { which, state, .. }, Type::Enumeration(id)) => {
            let Some(enumeration) = program.enums.get(id.index()) else {
                return false;
            };
            let Some(element) = enumeration.elements.get(*which as usize) else {
                return false;
            };
            match (state, &element.state) {
                (None, None) => true,
                (Some(state), Some(state_type)) => {
                    value_conforms_to_type(program, state, state_type)
                }
                _ => false,
            }
        }
        (Value::EnumConstructor, Type::EnumConstructor { .. }) => true,
        (Value::FunctionPointer(FunctionPointerValue::Internal { function, .. }), Type::Lambda(id)) => {
            function == id
        }
        (Value::FunctionPointer(_), Type::FunctionPointer(_)) => true,
        (Value::TypeErased { implementation, .. }, Type::Interface(id)) => {
            implementation.interface == *id
        }
        (Value::Array(_), Type::Interface(_)) => true,
        (Value::GenericEnum(_), Type::GenericEnum(_))
        | (Value::GenericStruct(_), Type::GenericStruct(_))
        | (Value::GenericInterface(_), Type::GenericInterface(_))
        | (Value::GenericLambda(_), Type::GenericLambda(_)) => true,
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", value)?;
            }
            Ok(())
        }
        match self {
            Value::Unit => write!(f, "unit"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::FunctionPointer(FunctionPointerValue::Internal { function, captures }) => {
                write!(f, "function#{}", function)?;
                if !captures.is_empty() {
                    write!(f, "[")?;
                    list(f, captures)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            Value::FunctionPointer(FunctionPointerValue::External { builtin, .. }) => {
                write!(f, "builtin {}", builtin.name())
            }
            Value::Structure(members) => {
                write!(f, "struct{{")?;
                list(f, members)?;
                write!(f, "}}")
            }
            Value::Tuple(elements) => {
                write!(f, "{{")?;
                list(f, elements)?;
                write!(f, "}}")
            }
            Value::EnumElement { which, state, .. } => {
                write!(f, "element#{}", which)?;
                if let Some(state) = state {
                    write!(f, "({})", state)?;
                }
                Ok(())
            }
            Value::EnumConstructor => write!(f, "enum constructor"),
            Value::Type(t) => write!(f, "{}", t),
            Value::TypeErased {
                implementation,
                self_value,
            } => write!(
                f,
                "erased<interface#{}, impl {}>({})",
                implementation.interface, implementation.index, self_value
            ),
            Value::Array(array) => {
                let array = array.borrow();
                write!(f, "[")?;
                list(f, &array.elements)?;
                write!(f, "]")
            }
            Value::GenericEnum(id) => write!(f, "generic_enum#{}", id),
            Value::GenericStruct(id) => write!(f, "generic_struct#{}", id),
            Value::GenericInterface(id) => write!(f, "generic_interface#{}", id),
            Value::GenericLambda(id) => write!(f, "generic_lambda#{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_are_mutable_and_compared_by_identity() {
        let array = Rc::new(RefCell::new(ArrayValue {
            elements: vec![Value::Integer(1)],
            element_type: Type::integer(0, 1),
        }));
        let a = Value::Tuple(vec![Value::Array(array.clone())]);
        let b = Value::Tuple(vec![Value::Array(array)]);
        assert!(a.is_mutable());
        assert!(value_equals(&a, &b));
        let fresh = Value::Array(Rc::new(RefCell::new(ArrayValue {
            elements: vec![Value::Integer(1)],
            element_type: Type::integer(0, 1),
        })));
        assert!(!value_equals(&Value::Tuple(vec![fresh]), &b));
    }

    #[test]
    fn booleans_are_enum_elements() {
        assert_eq!(Value::from_bool(true).as_bool(), Some(true));
        assert_eq!(Value::enum_element(0).as_bool(), Some(false));
        assert!(!Value::from_bool(false).is_mutable());
    }
}
