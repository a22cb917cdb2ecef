//! Register machine interpreter for checked functions
//!
//! Used by the checker to fold compile-time calls and to run module
//! initializers, and by `lpgc run` to execute a whole program. All resource
//! counters live in [`Counters`] so that one budget spans many calls.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::interp::value::{ArrayValue, FunctionPointerValue, Value};
use crate::ir::{Instruction, InstructionSequence, MatchCaseKind, RegisterId};
use crate::program::CheckedProgram;
use crate::types::FunctionId;

/// Why an evaluation did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    /// Depends on something that only exists at run time, or on a function still being checked
    #[error("value is not available at this time")]
    Unavailable,
    #[error("out of memory")]
    OutOfMemory,
    #[error("stack overflow")]
    StackOverflow,
    #[error("instruction limit reached")]
    InstructionLimitReached,
    /// `assert`, `fail` or an arithmetic fault at run time
    #[error("{0}")]
    Failed(String),
}

/// How a sequence finished normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
    Return,
}

pub type RunSequenceResult = Result<Flow, InterpretError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_recursion: usize,
    pub max_executed_instructions: u64,
    pub max_memory: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_recursion: 100,
            max_executed_instructions: 10_000,
            max_memory: 16 * 1024 * 1024,
        }
    }
}

/// Shared across every interpreter invocation of one `check`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub current_recursion: usize,
    pub executed_instructions: u64,
    pub allocated_bytes: usize,
}

/// Registers and environment of one running function
struct CallFrame<'c> {
    registers: Vec<Value>,
    captures: &'c [Value],
    function: FunctionId,
    return_value: Option<Value>,
}

impl CallFrame<'_> {
    fn get(&self, register: RegisterId) -> Value {
        self.registers[register.index()].clone()
    }

    fn set(&mut self, register: RegisterId, value: Value) {
        self.registers[register.index()] = value;
    }
}

/// Interpreter over a checked program
pub struct Interpreter<'a> {
    program: &'a CheckedProgram,
    globals: &'a [Value],
    limits: Limits,
    counters: &'a mut Counters,
    compile_time: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        program: &'a CheckedProgram,
        globals: &'a [Value],
        limits: Limits,
        counters: &'a mut Counters,
    ) -> Self {
        Self {
            program,
            globals,
            limits,
            counters,
            compile_time: true,
        }
    }

    /// Runtime mode lets `side_effect`, `assert` and `fail` execute
    pub fn at_run_time(mut self) -> Self {
        self.compile_time = false;
        self
    }

    pub fn is_compile_time(&self) -> bool {
        self.compile_time
    }

    pub fn program(&self) -> &'a CheckedProgram {
        self.program
    }

    /// Charges `bytes` against the heap budget
    pub fn allocate(&mut self, bytes: usize) -> Result<(), InterpretError> {
        let total = self.counters.allocated_bytes.saturating_add(bytes);
        if total > self.limits.max_memory {
            tracing::debug!(total, "compile time memory limit reached");
            return Err(InterpretError::OutOfMemory);
        }
        self.counters.allocated_bytes = total;
        Ok(())
    }

    fn count_instruction(&mut self) -> Result<(), InterpretError> {
        if self.counters.executed_instructions >= self.limits.max_executed_instructions {
            tracing::debug!("instruction limit reached");
            return Err(InterpretError::InstructionLimitReached);
        }
        self.counters.executed_instructions += 1;
        Ok(())
    }

    /// Calls anything callable
    pub fn call_function(
        &mut self,
        callee: &FunctionPointerValue,
        self_value: Option<Value>,
        arguments: Vec<Value>,
    ) -> Result<Value, InterpretError> {
        match callee {
            FunctionPointerValue::Internal { function, captures } => {
                self.call_checked_function(*function, captures, self_value, arguments)
            }
            FunctionPointerValue::External {
                builtin, captures, ..
            } => {
                if self.counters.current_recursion >= self.limits.max_recursion {
                    return Err(InterpretError::StackOverflow);
                }
                self.counters.current_recursion += 1;
                let result = builtin.call(self, captures, arguments);
                self.counters.current_recursion -= 1;
                result
            }
        }
    }

    pub fn call_checked_function(
        &mut self,
        id: FunctionId,
        captures: &[Value],
        self_value: Option<Value>,
        arguments: Vec<Value>,
    ) -> Result<Value, InterpretError> {
        let program = self.program;
        let Some(callee) = program.functions.get(id.index()) else {
            return Err(InterpretError::Unavailable);
        };
        if callee.number_of_registers == 0 {
            // still being checked
            return Err(InterpretError::Unavailable);
        }
        if self.counters.current_recursion >= self.limits.max_recursion {
            return Err(InterpretError::StackOverflow);
        }
        debug_assert_eq!(callee.signature.parameters.len(), arguments.len());
        debug_assert_eq!(callee.signature.self_type.is_some(), self_value.is_some());

        let mut registers = vec![Value::Unit; callee.number_of_registers as usize];
        let mut next = 0;
        if let Some(self_value) = self_value {
            registers[next] = self_value;
            next += 1;
        }
        for (argument, parameter) in arguments.into_iter().zip(&callee.signature.parameters) {
            debug_assert!(crate::interp::value::value_conforms_to_type(
                program, &argument, parameter
            ));
            registers[next] = argument;
            next += 1;
        }

        let mut frame = CallFrame {
            registers,
            captures,
            function: id,
            return_value: None,
        };
        self.counters.current_recursion += 1;
        let result = self.run_sequence(&callee.body, &mut frame);
        self.counters.current_recursion -= 1;
        match result? {
            Flow::Break => Err(InterpretError::Failed(
                "break outside of a loop".to_string(),
            )),
            Flow::Continue | Flow::Return => {
                frame.return_value.ok_or(InterpretError::Unavailable)
            }
        }
    }

    fn run_sequence(
        &mut self,
        sequence: &InstructionSequence,
        frame: &mut CallFrame<'_>,
    ) -> RunSequenceResult {
        if sequence.is_empty() {
            self.count_instruction()?;
        }
        for instruction in sequence.iter() {
            self.count_instruction()?;
            match self.run_instruction(instruction, frame)? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Continue)
    }

    fn run_instruction(&mut self, instruction: &Instruction, frame: &mut CallFrame<'_>) -> RunSequenceResult {
        match instruction {
            Instruction::Call(call) => {
                let callee = frame.get(call.callee);
                let arguments = call.arguments.iter().map(|r| frame.get(*r)).collect();
                let Value::FunctionPointer(callee) = callee else {
                    return Err(InterpretError::Unavailable);
                };
                let result = self.call_function(&callee, None, arguments)?;
                frame.set(call.result, result);
            }
            Instruction::Return {
                returned_value,
                unit_goes_into,
            } => {
                frame.return_value = Some(frame.get(*returned_value));
                frame.set(*unit_goes_into, Value::Unit);
                return Ok(Flow::Return);
            }
            Instruction::ReadStruct {
                from_object,
                member,
                into,
            } => {
                let value = match &frame.registers[from_object.index()] {
                    Value::Structure(members) | Value::Tuple(members) => {
                        members.get(*member as usize).cloned()
                    }
                    _ => None,
                };
                frame.set(*into, value.ok_or(InterpretError::Unavailable)?);
            }
            Instruction::Global(into) => {
                frame.set(*into, Value::Structure(self.globals.to_vec()));
            }
            Instruction::Loop {
                unit_goes_into,
                body,
            } => {
                loop {
                    match self.run_sequence(body, frame)? {
                        Flow::Continue => {}
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                    }
                }
                frame.set(*unit_goes_into, Value::Unit);
            }
            Instruction::Break(into) => {
                frame.set(*into, Value::Unit);
                return Ok(Flow::Break);
            }
            Instruction::Literal { into, value, .. } => {
                frame.set(*into, value.clone());
            }
            Instruction::Tuple { elements, result } => {
                let value = Value::Tuple(elements.iter().map(|r| frame.get(*r)).collect());
                self.allocate(value.heap_size())?;
                frame.set(*result, value);
            }
            Instruction::InstantiateStruct {
                into, arguments, ..
            } => {
                let value = Value::Structure(arguments.iter().map(|r| frame.get(*r)).collect());
                self.allocate(value.heap_size())?;
                frame.set(*into, value);
            }
            Instruction::EnumConstruct {
                into,
                which,
                state,
                state_type,
                ..
            } => {
                let value = Value::enum_element_with_state(*which, state_type.clone(), frame.get(*state));
                self.allocate(value.heap_size())?;
                frame.set(*into, value);
            }
            Instruction::Match(match_) => {
                let key = frame.get(match_.key);
                for case in &match_.cases {
                    let matches = match &case.kind {
                        MatchCaseKind::StatefulEnum { element, where_ } => match &key {
                            Value::EnumElement {
                                which,
                                state: Some(state),
                                ..
                            } if which == element => {
                                frame.set(*where_, state.as_ref().clone());
                                true
                            }
                            _ => false,
                        },
                        MatchCaseKind::Value(value) => {
                            crate::interp::value::value_equals(&key, &frame.registers[value.index()])
                        }
                        MatchCaseKind::Default => true,
                    };
                    if !matches {
                        continue;
                    }
                    let flow = self.run_sequence(&case.action, frame)?;
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                    if let Some(value) = case.value {
                        let value = frame.get(value);
                        frame.set(match_.result, value);
                    }
                    return Ok(Flow::Continue);
                }
                unreachable!("match without a matching case");
            }
            Instruction::GetCaptures(into) => {
                frame.set(*into, Value::Structure(frame.captures.to_vec()));
            }
            Instruction::LambdaWithCaptures {
                into,
                lambda,
                captures,
            } => {
                let captures: Vec<Value> = captures.iter().map(|r| frame.get(*r)).collect();
                let value = Value::function(*lambda, captures);
                self.allocate(value.heap_size())?;
                frame.set(*into, value);
            }
            Instruction::CurrentFunction(into) => {
                let value = Value::function(frame.function, frame.captures.to_vec());
                frame.set(*into, value);
            }
            Instruction::GetMethod {
                interface,
                from,
                method,
                into,
            } => {
                let description = self
                    .program
                    .interface(*interface)
                    .methods
                    .get(*method as usize)
                    .ok_or(InterpretError::Unavailable)?;
                let signature = crate::types::FunctionPointerType {
                    result: Some(description.result.clone()),
                    parameters: description.parameters.clone(),
                    captures: vec![crate::types::Type::Interface(*interface)],
                    self_type: None,
                };
                let value = Value::FunctionPointer(FunctionPointerValue::External {
                    builtin: crate::stdlib::Builtin::InvokeMethod { method: *method },
                    captures: vec![frame.get(*from)],
                    signature: Box::new(signature),
                });
                frame.set(*into, value);
            }
            Instruction::EraseType {
                self_,
                into,
                implementation,
            } => {
                let value = Value::TypeErased {
                    implementation: *implementation,
                    self_value: Box::new(frame.get(*self_)),
                };
                self.allocate(value.heap_size())?;
                frame.set(*into, value);
            }
            Instruction::NewArray { into, element_type } => {
                self.allocate(std::mem::size_of::<ArrayValue>())?;
                let array = ArrayValue {
                    elements: Vec::new(),
                    element_type: element_type.clone(),
                };
                frame.set(*into, Value::Array(Rc::new(RefCell::new(array))));
            }
        }
        Ok(Flow::Continue)
    }
}
