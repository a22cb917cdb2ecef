//! Instruction set of the register IR

use crate::interp::value::{ImplementationRef, Value};
use crate::types::{EnumId, FunctionId, InterfaceId, StructId, Type};
use std::fmt;

/// Register index inside one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterId(pub u32);

impl RegisterId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// An ordered, growable list of instructions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstructionSequence {
    pub elements: Vec<Instruction>,
}

impl InstructionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.elements.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drops everything after the first `length` instructions
    pub fn truncate(&mut self, length: usize) {
        debug_assert!(length <= self.elements.len());
        self.elements.truncate(length);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.elements.iter()
    }
}

impl From<Vec<Instruction>> for InstructionSequence {
    fn from(elements: Vec<Instruction>) -> Self {
        Self { elements }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallInstruction {
    pub callee: RegisterId,
    pub arguments: Vec<RegisterId>,
    pub result: RegisterId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchCaseKind {
    /// Compare the key with the value in this register
    Value(RegisterId),
    /// Matches one payload element; the payload is written to `where_`
    StatefulEnum { element: u32, where_: RegisterId },
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub kind: MatchCaseKind,
    pub action: InstructionSequence,
    /// Where the arm's value lives after `action`; `None` when the arm does not produce one
    pub value: Option<RegisterId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchInstruction {
    pub key: RegisterId,
    pub cases: Vec<MatchCase>,
    pub result: RegisterId,
    pub result_type: Type,
}

/// A single IR instruction. Every register is written at most once.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Call(CallInstruction),
    Return {
        returned_value: RegisterId,
        unit_goes_into: RegisterId,
    },
    ReadStruct {
        from_object: RegisterId,
        member: u32,
        into: RegisterId,
    },
    /// Loads the global structure
    Global(RegisterId),
    Loop {
        unit_goes_into: RegisterId,
        body: InstructionSequence,
    },
    Break(RegisterId),
    Literal {
        into: RegisterId,
        value: Value,
        value_type: Type,
    },
    Tuple {
        elements: Vec<RegisterId>,
        result: RegisterId,
    },
    InstantiateStruct {
        into: RegisterId,
        structure: StructId,
        arguments: Vec<RegisterId>,
    },
    EnumConstruct {
        into: RegisterId,
        enumeration: EnumId,
        which: u32,
        state: RegisterId,
        state_type: Type,
    },
    Match(MatchInstruction),
    /// Loads the capture structure of the running function
    GetCaptures(RegisterId),
    LambdaWithCaptures {
        into: RegisterId,
        lambda: FunctionId,
        captures: Vec<RegisterId>,
    },
    /// A pointer to the running function with its own captures
    CurrentFunction(RegisterId),
    GetMethod {
        interface: InterfaceId,
        from: RegisterId,
        method: u32,
        into: RegisterId,
    },
    EraseType {
        self_: RegisterId,
        into: RegisterId,
        implementation: ImplementationRef,
    },
    NewArray {
        into: RegisterId,
        element_type: Type,
    },
}

impl Instruction {
    pub fn literal(into: RegisterId, value: Value, value_type: Type) -> Self {
        Instruction::Literal {
            into,
            value,
            value_type,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Call(_) => "call",
            Instruction::Return { .. } => "return",
            Instruction::ReadStruct { .. } => "read_struct",
            Instruction::Global(_) => "global",
            Instruction::Loop { .. } => "loop",
            Instruction::Break(_) => "break",
            Instruction::Literal { .. } => "literal",
            Instruction::Tuple { .. } => "tuple",
            Instruction::InstantiateStruct { .. } => "instantiate_struct",
            Instruction::EnumConstruct { .. } => "enum_construct",
            Instruction::Match(_) => "match",
            Instruction::GetCaptures(_) => "get_captures",
            Instruction::LambdaWithCaptures { .. } => "lambda_with_captures",
            Instruction::CurrentFunction(_) => "current_function",
            Instruction::GetMethod { .. } => "get_method",
            Instruction::EraseType { .. } => "erase_type",
            Instruction::NewArray { .. } => "new_array",
        }
    }
}
