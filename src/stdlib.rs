//! Standard library: the global structure, well-known enums and native functions

use crate::interp::eval::{InterpretError, Interpreter};
use crate::interp::value::{ArrayValue, FunctionPointerValue, Value};
use crate::program::{
    CheckedProgram, Enumeration, EnumerationElement, Structure, StructureMember,
};
use crate::types::{EnumId, FunctionPointerType, IntegerRange, StructId, Type};

pub const BOOLEAN: EnumId = EnumId(0);
pub const SUBTRACT_RESULT: EnumId = EnumId(1);
pub const ADD_RESULT: EnumId = EnumId(2);
pub const ADD_U32_RESULT: EnumId = EnumId(3);
pub const ADD_U64_RESULT: EnumId = EnumId(4);

/// The global structure is always the first structure of a program
pub const GLOBALS: StructId = StructId(0);

/// Method indices of the built-in `array` interface
pub mod array_methods {
    pub const SIZE: u32 = 0;
    pub const LOAD: u32 = 1;
    pub const STORE: u32 = 2;
    pub const APPEND: u32 = 3;
    pub const CLEAR: u32 = 4;
    pub const POP: u32 = 5;
}

/// Indices of the global structure members that operators lower to
pub mod global_members {
    pub const BOOLEAN: u32 = 3;
    pub const INTEGER_LESS: u32 = 5;
    pub const INTEGER_EQUALS: u32 = 6;
    pub const NOT: u32 = 7;
    pub const STRING_EQUALS: u32 = 9;
    pub const INTEGER_ADD: u32 = 30;
    pub const INTEGER_SUBTRACT: u32 = 31;
}

/// Native functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    SideEffect,
    IntegerToString,
    TypeEquals,
    Assert,
    IntegerLess,
    IntegerEquals,
    Not,
    Concat,
    StringEquals,
    Int,
    Fail,
    Subtract,
    Add,
    AddU32,
    AddU64,
    AndU64,
    OrU64,
    XorU64,
    NotU64,
    ShiftLeftU64,
    ShiftRightU64,
    IntegerAdd,
    IntegerSubtract,
    /// Calls method `method` on the interface object captured as the only capture
    InvokeMethod { method: u32 },
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::SideEffect => "side_effect",
            Builtin::IntegerToString => "integer_to_string",
            Builtin::TypeEquals => "type_equals",
            Builtin::Assert => "assert",
            Builtin::IntegerLess => "integer_less",
            Builtin::IntegerEquals => "integer_equals",
            Builtin::Not => "not",
            Builtin::Concat => "concat",
            Builtin::StringEquals => "string_equals",
            Builtin::Int => "int",
            Builtin::Fail => "fail",
            Builtin::Subtract => "subtract",
            Builtin::Add => "add",
            Builtin::AddU32 => "add_u32",
            Builtin::AddU64 => "add_u64",
            Builtin::AndU64 => "and_u64",
            Builtin::OrU64 => "or_u64",
            Builtin::XorU64 => "xor_u64",
            Builtin::NotU64 => "not_u64",
            Builtin::ShiftLeftU64 => "shift_left_u64",
            Builtin::ShiftRightU64 => "shift_right_u64",
            Builtin::IntegerAdd => "integer_add",
            Builtin::IntegerSubtract => "integer_subtract",
            Builtin::InvokeMethod { .. } => "invoke_method",
        }
    }

    /// Functions whose effect must happen at run time
    pub fn is_runtime_only(&self) -> bool {
        matches!(self, Builtin::SideEffect | Builtin::Assert | Builtin::Fail)
    }

    pub fn call(
        self,
        interpreter: &mut Interpreter<'_>,
        captures: &[Value],
        arguments: Vec<Value>,
    ) -> Result<Value, InterpretError> {
        if self.is_runtime_only() && interpreter.is_compile_time() {
            return Err(InterpretError::Unavailable);
        }
        let integer = |index: usize| -> Result<u128, InterpretError> {
            arguments
                .get(index)
                .and_then(Value::as_integer)
                .ok_or(InterpretError::Unavailable)
        };
        let string = |index: usize| -> Result<&str, InterpretError> {
            arguments
                .get(index)
                .and_then(Value::as_string)
                .ok_or(InterpretError::Unavailable)
        };
        let u64_result = |value: u128| Ok(Value::Integer(value & u128::from(u64::MAX)));
        match self {
            Builtin::SideEffect => Ok(Value::Unit),
            Builtin::IntegerToString => {
                let text = integer(0)?.to_string();
                interpreter.allocate(text.len())?;
                Ok(Value::String(text))
            }
            Builtin::TypeEquals => match (arguments.first(), arguments.get(1)) {
                (Some(Value::Type(a)), Some(Value::Type(b))) => Ok(Value::from_bool(a == b)),
                _ => Err(InterpretError::Unavailable),
            },
            Builtin::Assert => match arguments.first().and_then(Value::as_bool) {
                Some(true) => Ok(Value::Unit),
                _ => Err(InterpretError::Failed("assertion failed".to_string())),
            },
            Builtin::IntegerLess => Ok(Value::from_bool(integer(0)? < integer(1)?)),
            Builtin::IntegerEquals => Ok(Value::from_bool(integer(0)? == integer(1)?)),
            Builtin::Not => match arguments.first().and_then(Value::as_bool) {
                Some(value) => Ok(Value::from_bool(!value)),
                None => Err(InterpretError::Unavailable),
            },
            Builtin::Concat => {
                let result = format!("{}{}", string(0)?, string(1)?);
                interpreter.allocate(result.len())?;
                Ok(Value::String(result))
            }
            Builtin::StringEquals => Ok(Value::from_bool(string(0)? == string(1)?)),
            Builtin::Int => {
                let (first, second) = (integer(0)?, integer(1)?);
                Ok(Value::Type(Type::IntegerRange(IntegerRange::new(
                    first.min(second),
                    first.max(second),
                ))))
            }
            Builtin::Fail => Err(InterpretError::Failed("fail was called".to_string())),
            Builtin::Subtract => Ok(arithmetic_result(integer(0)?.checked_sub(integer(1)?))),
            Builtin::Add => Ok(arithmetic_result(integer(0)?.checked_add(integer(1)?))),
            Builtin::AddU32 => Ok(arithmetic_result(
                integer(0)?
                    .checked_add(integer(1)?)
                    .filter(|sum| *sum <= u128::from(u32::MAX)),
            )),
            Builtin::AddU64 => Ok(arithmetic_result(
                integer(0)?
                    .checked_add(integer(1)?)
                    .filter(|sum| *sum <= u128::from(u64::MAX)),
            )),
            Builtin::AndU64 => u64_result(integer(0)? & integer(1)?),
            Builtin::OrU64 => u64_result(integer(0)? | integer(1)?),
            Builtin::XorU64 => u64_result(integer(0)? ^ integer(1)?),
            Builtin::NotU64 => u64_result(!integer(0)?),
            Builtin::ShiftLeftU64 => {
                let shift = integer(1)?;
                debug_assert!(shift < 64);
                u64_result(integer(0)? << (shift % 64))
            }
            Builtin::ShiftRightU64 => {
                let shift = integer(1)?;
                debug_assert!(shift < 64);
                u64_result(integer(0)? >> (shift % 64))
            }
            Builtin::IntegerAdd => integer(0)?
                .checked_add(integer(1)?)
                .map(Value::Integer)
                .ok_or_else(|| InterpretError::Failed("integer overflow".to_string())),
            Builtin::IntegerSubtract => integer(0)?
                .checked_sub(integer(1)?)
                .map(Value::Integer)
                .ok_or_else(|| InterpretError::Failed("integer underflow".to_string())),
            Builtin::InvokeMethod { method } => {
                let receiver = captures.first().cloned().ok_or(InterpretError::Unavailable)?;
                invoke_method(interpreter, receiver, method, arguments)
            }
        }
    }
}

/// `ok(value)` or the error element of the `*_result` enums
fn arithmetic_result(value: Option<u128>) -> Value {
    match value {
        Some(value) => Value::enum_element_with_state(
            0,
            Type::IntegerRange(IntegerRange::full()),
            Value::Integer(value),
        ),
        None => Value::enum_element(1),
    }
}

fn invoke_method(
    interpreter: &mut Interpreter<'_>,
    receiver: Value,
    method: u32,
    arguments: Vec<Value>,
) -> Result<Value, InterpretError> {
    match receiver {
        Value::TypeErased {
            implementation,
            self_value,
        } => {
            let program = interpreter.program();
            let callee = program
                .interface(implementation.interface)
                .implementations
                .get(implementation.index as usize)
                .and_then(|entry| entry.implementation.methods.get(method as usize))
                .ok_or(InterpretError::Unavailable)?;
            interpreter.call_function(callee, Some(*self_value), arguments)
        }
        Value::Array(array) => {
            let index = |position: usize| -> Result<usize, InterpretError> {
                arguments
                    .get(position)
                    .and_then(Value::as_integer)
                    .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                    .ok_or(InterpretError::Unavailable)
            };
            match method {
                array_methods::SIZE => Ok(Value::Integer(array.borrow().elements.len() as u128)),
                array_methods::LOAD => {
                    let position = index(0)?;
                    let array = array.borrow();
                    Ok(match array.elements.get(position) {
                        Some(element) => Value::enum_element_with_state(
                            0,
                            array.element_type.clone(),
                            element.clone(),
                        ),
                        None => Value::enum_element(1),
                    })
                }
                array_methods::STORE => {
                    let position = index(0)?;
                    let element = arguments.get(1).cloned().ok_or(InterpretError::Unavailable)?;
                    let mut array = array.borrow_mut();
                    match array.elements.get_mut(position) {
                        Some(slot) => {
                            *slot = element;
                            Ok(Value::from_bool(true))
                        }
                        None => Ok(Value::from_bool(false)),
                    }
                }
                array_methods::APPEND => {
                    let element = arguments.into_iter().next().ok_or(InterpretError::Unavailable)?;
                    interpreter.allocate(element.heap_size())?;
                    array.borrow_mut().elements.push(element);
                    Ok(Value::from_bool(true))
                }
                array_methods::CLEAR => {
                    array.borrow_mut().elements.clear();
                    Ok(Value::Unit)
                }
                array_methods::POP => {
                    let count = index(0)?;
                    let mut array: std::cell::RefMut<'_, ArrayValue> = array.borrow_mut();
                    if count > array.elements.len() {
                        return Ok(Value::from_bool(false));
                    }
                    let remaining = array.elements.len() - count;
                    array.elements.truncate(remaining);
                    Ok(Value::from_bool(true))
                }
                _ => Err(InterpretError::Unavailable),
            }
        }
        _ => Err(InterpretError::Unavailable),
    }
}

fn boolean() -> Type {
    Type::Enumeration(BOOLEAN)
}

fn signature(result: Option<Type>, parameters: Vec<Type>) -> FunctionPointerType {
    FunctionPointerType {
        result,
        parameters,
        captures: Vec::new(),
        self_type: None,
    }
}

/// Adds the well-known enumerations (ids 0 to 4) and the global structure (id 0)
/// to an empty program; returns the runtime values of the globals.
pub fn install(program: &mut CheckedProgram) -> Vec<Value> {
    debug_assert!(program.enums.is_empty() && program.structs.is_empty());
    let simple = |name: &str| EnumerationElement {
        name: name.to_string(),
        state: None,
    };
    let ok = |maximum: u128| EnumerationElement {
        name: "ok".to_string(),
        state: Some(Type::integer(0, maximum)),
    };
    program.add_enumeration(Enumeration {
        elements: vec![simple("false"), simple("true")],
    });
    program.add_enumeration(Enumeration {
        elements: vec![ok(u128::MAX), simple("underflow")],
    });
    program.add_enumeration(Enumeration {
        elements: vec![ok(u128::MAX), simple("overflow")],
    });
    program.add_enumeration(Enumeration {
        elements: vec![ok(u128::from(u32::MAX)), simple("overflow")],
    });
    program.add_enumeration(Enumeration {
        elements: vec![ok(u128::from(u64::MAX)), simple("overflow")],
    });

    let any = Type::integer(0, u128::MAX);
    let u32_ = Type::integer(0, u128::from(u32::MAX));
    let u64_ = Type::integer(0, u128::from(u64::MAX));
    let shift = Type::integer(0, 63);
    let binary = |result: Type, operand: &Type| signature(Some(result), vec![operand.clone(), operand.clone()]);

    let mut globals = GlobalsBuilder::default();
    globals.function("side_effect", Builtin::SideEffect, signature(Some(Type::Unit), vec![]));
    globals.function(
        "integer_to_string",
        Builtin::IntegerToString,
        signature(Some(Type::String), vec![any.clone()]),
    );
    globals.function("type_equals", Builtin::TypeEquals, binary(boolean(), &Type::Type));
    globals.type_("boolean", boolean());
    globals.function("assert", Builtin::Assert, signature(Some(Type::Unit), vec![boolean()]));
    globals.function("integer_less", Builtin::IntegerLess, binary(boolean(), &any));
    globals.function("integer_equals", Builtin::IntegerEquals, binary(boolean(), &any));
    globals.function("not", Builtin::Not, signature(Some(boolean()), vec![boolean()]));
    globals.function("concat", Builtin::Concat, binary(Type::String, &Type::String));
    globals.function("string_equals", Builtin::StringEquals, binary(boolean(), &Type::String));
    globals.function("int", Builtin::Int, binary(Type::Type, &any));
    globals.function("fail", Builtin::Fail, signature(None, vec![]));
    globals.type_("subtract_result", Type::Enumeration(SUBTRACT_RESULT));
    globals.function(
        "subtract",
        Builtin::Subtract,
        binary(Type::Enumeration(SUBTRACT_RESULT), &any),
    );
    globals.type_("add_result", Type::Enumeration(ADD_RESULT));
    globals.function("add", Builtin::Add, binary(Type::Enumeration(ADD_RESULT), &any));
    globals.type_("add_u32_result", Type::Enumeration(ADD_U32_RESULT));
    globals.function(
        "add_u32",
        Builtin::AddU32,
        binary(Type::Enumeration(ADD_U32_RESULT), &u32_),
    );
    globals.type_("add_u64_result", Type::Enumeration(ADD_U64_RESULT));
    globals.function(
        "add_u64",
        Builtin::AddU64,
        binary(Type::Enumeration(ADD_U64_RESULT), &u64_),
    );
    globals.function("and_u64", Builtin::AndU64, binary(u64_.clone(), &u64_));
    globals.function("or_u64", Builtin::OrU64, binary(u64_.clone(), &u64_));
    globals.function("xor_u64", Builtin::XorU64, binary(u64_.clone(), &u64_));
    globals.function("not_u64", Builtin::NotU64, signature(Some(u64_.clone()), vec![u64_.clone()]));
    globals.function(
        "shift_left_u64",
        Builtin::ShiftLeftU64,
        signature(Some(u64_.clone()), vec![u64_.clone(), shift.clone()]),
    );
    globals.function(
        "shift_right_u64",
        Builtin::ShiftRightU64,
        signature(Some(u64_.clone()), vec![u64_, shift]),
    );
    globals.type_("string", Type::String);
    globals.type_("type", Type::Type);
    globals.type_("unit", Type::Unit);
    globals.constant("unit_value", Type::Unit, Value::Unit);
    globals.function("integer_add", Builtin::IntegerAdd, binary(any.clone(), &any));
    globals.function("integer_subtract", Builtin::IntegerSubtract, binary(any.clone(), &any));

    let id = program.add_structure(Structure {
        members: globals.members,
    });
    debug_assert_eq!(id, GLOBALS);
    globals.values
}

/// Runtime values of the global structure, for running a checked program
pub fn global_values() -> Vec<Value> {
    install(&mut CheckedProgram::default())
}

#[derive(Default)]
struct GlobalsBuilder {
    members: Vec<StructureMember>,
    values: Vec<Value>,
}

impl GlobalsBuilder {
    fn constant(&mut self, name: &str, what: Type, value: Value) {
        self.members.push(StructureMember {
            what,
            name: name.to_string(),
            compile_time_value: Some(value.clone()),
        });
        self.values.push(value);
    }

    fn type_(&mut self, name: &str, what: Type) {
        self.constant(name, Type::Type, Value::Type(what));
    }

    /// Runtime-only functions get no compile-time value so calls to them are never folded
    fn function(&mut self, name: &str, builtin: Builtin, signature: FunctionPointerType) {
        let value = Value::FunctionPointer(FunctionPointerValue::External {
            builtin,
            captures: Vec::new(),
            signature: Box::new(signature.clone()),
        });
        self.members.push(StructureMember {
            what: Type::function_pointer(signature),
            name: name.to_string(),
            compile_time_value: (!builtin.is_runtime_only()).then(|| value.clone()),
        });
        self.values.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_members_are_in_order() {
        let mut program = CheckedProgram::default();
        let values = install(&mut program);
        let names: Vec<&str> = program.structs[0]
            .members
            .iter()
            .map(|member| member.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "side_effect",
                "integer_to_string",
                "type_equals",
                "boolean",
                "assert",
                "integer_less",
                "integer_equals",
                "not",
                "concat",
                "string_equals",
                "int",
                "fail",
                "subtract_result",
                "subtract",
                "add_result",
                "add",
                "add_u32_result",
                "add_u32",
                "add_u64_result",
                "add_u64",
                "and_u64",
                "or_u64",
                "xor_u64",
                "not_u64",
                "shift_left_u64",
                "shift_right_u64",
                "string",
                "type",
                "unit",
                "unit_value",
                "integer_add",
                "integer_subtract",
            ]
        );
        assert_eq!(values.len(), names.len());
        assert_eq!(names[global_members::BOOLEAN as usize], "boolean");
        assert_eq!(names[global_members::INTEGER_LESS as usize], "integer_less");
        assert_eq!(names[global_members::INTEGER_EQUALS as usize], "integer_equals");
        assert_eq!(names[global_members::NOT as usize], "not");
        assert_eq!(names[global_members::STRING_EQUALS as usize], "string_equals");
        assert_eq!(names[global_members::INTEGER_ADD as usize], "integer_add");
        assert_eq!(names[global_members::INTEGER_SUBTRACT as usize], "integer_subtract");
        assert_eq!(program.enums.len(), 5);
        assert!(program.structs[0].members[0].compile_time_value.is_none());
    }
}
