//! Per-function checking state: registers, local variables, captures and
//! checkpoints

use std::path::PathBuf;

use crate::diagnostics::SourceFile;
use crate::interp::Value;
use crate::ir::{Instruction, InstructionSequence, RegisterId};
use crate::types::Type;

use super::Checker;

/// A local variable that already has a register
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub type_: Type,
    pub compile_time_value: Option<Value>,
    pub where_: RegisterId,
}

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    /// The initializer of the `let` is still being checked
    Declared,
    /// Usable before its `let` has finished, like an interface naming itself in its methods
    EarlyInitialized(Slot),
    Initialized(Slot),
    /// The lambda whose body is being checked, seen from inside that body
    LambdaBeingChecked(Type),
}

#[derive(Debug, Clone)]
pub(crate) struct LocalVariable {
    pub name: String,
    pub binding: Binding,
}

/// Where a captured value comes from, relative to the enclosing function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CaptureAddress {
    Local(RegisterId),
    /// Index into the enclosing function's own captures
    Capture(u32),
}

#[derive(Debug, Clone)]
pub(crate) struct Capture {
    pub from: CaptureAddress,
    pub what: Type,
}

/// State of one function while its body is being checked
#[derive(Debug)]
pub(crate) struct FunctionState {
    /// Index of the enclosing function in `Checker::frames`
    pub parent: Option<usize>,
    /// Runtime values of enclosing functions may be captured
    pub may_capture: bool,
    pub locals: Vec<LocalVariable>,
    /// One entry per allocated register
    pub compile_time_values: Vec<Option<Value>>,
    pub debug_names: Vec<String>,
    /// Inferred from `return` or declared explicitly
    pub return_type: Option<Type>,
    /// `return_type` came from the lambda header and may not be widened
    pub return_type_is_declared: bool,
    pub is_in_loop: bool,
    pub captures: Vec<Capture>,
    /// Emitted in front of the body, e.g. `current_function` for recursive lambdas
    pub prologue: Vec<Instruction>,
    pub source: SourceFile,
    pub import_directory: Option<PathBuf>,
}

impl FunctionState {
    pub(crate) fn new(
        parent: Option<usize>,
        may_capture: bool,
        source: SourceFile,
        import_directory: Option<PathBuf>,
    ) -> Self {
        Self {
            parent,
            may_capture,
            locals: Vec::new(),
            compile_time_values: Vec::new(),
            debug_names: Vec::new(),
            return_type: None,
            return_type_is_declared: false,
            is_in_loop: false,
            captures: Vec::new(),
            prologue: Vec::new(),
            source,
            import_directory,
        }
    }

    pub(crate) fn register_count(&self) -> u32 {
        self.compile_time_values.len() as u32
    }

    pub(crate) fn find_local(&self, name: &str) -> Option<usize> {
        self.locals.iter().rposition(|local| local.name == name)
    }

    fn allocate_register(&mut self) -> RegisterId {
        let id = RegisterId(self.register_count());
        self.compile_time_values.push(None);
        id
    }
}

/// Transactional mark inside the current function; see [`Checker::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    instructions: usize,
    registers: usize,
    debug_names: usize,
    prologue: usize,
}

/// Outcome of looking a name up through the chain of enclosing functions
#[derive(Debug, Clone)]
pub(crate) enum LocalLookup {
    Unknown,
    /// A runtime variable of an enclosing function that may not be captured here
    Forbidden,
    AtAddress {
        address: CaptureAddress,
        type_: Type,
        compile_time_value: Option<Value>,
    },
    CompileTime {
        type_: Type,
        value: Value,
    },
}

impl Checker<'_> {
    /// The function being checked; there always is one
    pub(crate) fn frame(&self) -> &FunctionState {
        &self.frames[self.current_frame_index()]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut FunctionState {
        let index = self.current_frame_index();
        &mut self.frames[index]
    }

    pub(crate) fn current_frame_index(&self) -> usize {
        self.frames.len() - 1
    }

    pub(crate) fn allocate_register(&mut self) -> RegisterId {
        self.frame_mut().allocate_register()
    }

    pub(crate) fn write_compile_time_value(&mut self, register: RegisterId, value: Value) {
        self.frame_mut().compile_time_values[register.index()] = Some(value);
    }

    pub(crate) fn read_compile_time_value(&self, register: RegisterId) -> Option<Value> {
        self.frame()
            .compile_time_values
            .get(register.index())
            .cloned()
            .flatten()
    }

    pub(crate) fn define_debug_name(&mut self, register: RegisterId, name: &str) {
        let names = &mut self.frame_mut().debug_names;
        if names.len() <= register.index() {
            names.resize(register.index() + 1, String::new());
        }
        names[register.index()] = name.to_string();
    }

    pub(crate) fn checkpoint(&self, body: &InstructionSequence) -> Checkpoint {
        let frame = self.frame();
        Checkpoint {
            instructions: body.len(),
            registers: frame.compile_time_values.len(),
            debug_names: frame.debug_names.len(),
            prologue: frame.prologue.len(),
        }
    }

    /// Forgets every instruction and register created since `checkpoint`
    pub(crate) fn restore(&mut self, body: &mut InstructionSequence, checkpoint: Checkpoint) {
        body.truncate(checkpoint.instructions);
        let frame = self.frame_mut();
        debug_assert!(checkpoint.registers <= frame.compile_time_values.len());
        frame.compile_time_values.truncate(checkpoint.registers);
        frame.debug_names.truncate(checkpoint.debug_names);
        frame.prologue.truncate(checkpoint.prologue);
    }

    pub(crate) fn add_local(&mut self, name: &str, binding: Binding) {
        self.frame_mut().locals.push(LocalVariable {
            name: name.to_string(),
            binding,
        });
    }

    /// Adds an initialized compile-time constant, used for generic parameters and closures
    pub(crate) fn add_constant(&mut self, name: &str, type_: Type, value: Value) {
        let where_ = self.allocate_register();
        self.write_compile_time_value(where_, value.clone());
        self.add_local(
            name,
            Binding::Initialized(Slot {
                type_,
                compile_time_value: Some(value),
                where_,
            }),
        );
    }

    /// Makes a declared name usable before its initializer finishes
    pub(crate) fn initialize_early(&mut self, name: &str, type_: Type, value: Value, where_: RegisterId) {
        let frame = self.frame_mut();
        if let Some(index) = frame.find_local(name) {
            let local = &mut frame.locals[index];
            debug_assert!(matches!(local.binding, Binding::Declared));
            local.binding = Binding::EarlyInitialized(Slot {
                type_,
                compile_time_value: Some(value),
                where_,
            });
        }
    }

    /// Looks `name` up in frame `index` and, failing that, in its enclosing frames
    pub(crate) fn read_local_variable(&mut self, index: usize, name: &str) -> LocalLookup {
        let frame = &mut self.frames[index];
        if let Some(position) = frame.find_local(name) {
            return match &frame.locals[position].binding {
                Binding::Declared => LocalLookup::Unknown,
                Binding::EarlyInitialized(slot) | Binding::Initialized(slot) => {
                    LocalLookup::AtAddress {
                        address: CaptureAddress::Local(slot.where_),
                        type_: slot.type_.clone(),
                        compile_time_value: slot.compile_time_value.clone(),
                    }
                }
                Binding::LambdaBeingChecked(type_) => {
                    let type_ = type_.clone();
                    let where_ = frame.allocate_register();
                    frame.prologue.push(Instruction::CurrentFunction(where_));
                    LocalLookup::AtAddress {
                        address: CaptureAddress::Local(where_),
                        type_,
                        compile_time_value: None,
                    }
                }
            };
        }
        let Some(parent) = frame.parent else {
            return LocalLookup::Unknown;
        };
        match self.read_local_variable(parent, name) {
            LocalLookup::AtAddress {
                type_,
                compile_time_value: Some(value),
                ..
            } => LocalLookup::CompileTime { type_, value },
            LocalLookup::AtAddress {
                address,
                type_,
                compile_time_value: None,
            } => {
                if !self.frames[index].may_capture {
                    return LocalLookup::Forbidden;
                }
                let capture = self.require_capture(index, address, type_.clone());
                LocalLookup::AtAddress {
                    address: CaptureAddress::Capture(capture),
                    type_,
                    compile_time_value: None,
                }
            }
            other => other,
        }
    }

    /// Index of the capture of `address` in frame `index`, added if new
    fn require_capture(&mut self, index: usize, address: CaptureAddress, what: Type) -> u32 {
        let captures = &mut self.frames[index].captures;
        if let Some(existing) = captures.iter().position(|capture| capture.from == address) {
            return existing as u32;
        }
        captures.push(Capture { from: address, what });
        (captures.len() - 1) as u32
    }

    /// Drops locals declared after the first `count`
    pub(crate) fn truncate_locals(&mut self, count: usize) {
        self.frame_mut().locals.truncate(count);
    }

    pub(crate) fn local_count(&self) -> usize {
        self.frame().locals.len()
    }
}
