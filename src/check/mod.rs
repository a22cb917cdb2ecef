//! Type checker and IR generator for lpg
//!
//! [`check`] walks the syntax tree of a program, reports semantic errors
//! through a callback and lowers everything it accepts into the register IR
//! of a [`CheckedProgram`]. It handles:
//! - Name lookup through nested functions, including captures
//! - Compile-time evaluation of calls by running already checked functions
//! - Nominal types (structures, enumerations, interfaces) and generics
//! - Pattern matching with exhaustiveness checks
//! - Module imports

mod convert;
mod definitions;
mod expression;
mod generics;
mod import;
mod lambda;
mod matching;
mod state;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::ast::{Expression, Sequence};
use crate::common::SourceLocation;
use crate::config::CheckConfig;
use crate::diagnostics::{CompleteSemanticError, SemanticError, SemanticErrorKind, SourceFile};
use crate::interp::{Counters, Value};
use crate::ir::{Instruction, InstructionSequence, RegisterId};
use crate::modules::ModuleLoader;
use crate::program::{CheckedFunction, CheckedProgram};
use crate::stdlib;
use crate::types::{EnumId, FunctionId, FunctionPointerType, InterfaceId, Type};

use generics::{GenericDefinition, GenericImpl, GenericInterface, Instantiation};
use lambda::{FunctionBody, FunctionCheck};
use state::FunctionState;

/// Type hint passed down into an expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expectation {
    /// The value will be converted to this type, if any
    Exact(Option<Type>),
    /// The expression is a callee whose result should be of this enumeration,
    /// so payload element names resolve to their constructors
    EnumConstructors(EnumId),
}

impl Expectation {
    pub(crate) fn none() -> Self {
        Expectation::Exact(None)
    }

    pub(crate) fn exact(expected: Type) -> Self {
        Expectation::Exact(Some(expected))
    }

    pub(crate) fn exact_type(&self) -> Option<&Type> {
        match self {
            Expectation::Exact(expected) => expected.as_ref(),
            Expectation::EnumConstructors(_) => None,
        }
    }
}

/// How control leaves an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// Execution continues after the expression
    Value,
    /// The expression always returns from the current function
    Return,
    /// The expression never finishes, like a call of `fail`
    Exit,
}

/// Result of checking one expression
#[derive(Debug, Clone)]
pub(crate) struct Evaluated {
    pub completion: Completion,
    /// Register holding the value
    pub where_: RegisterId,
    pub type_: Type,
    pub compile_time_value: Option<Value>,
    /// Evaluating the expression has no observable effect
    pub is_pure: bool,
}

impl Evaluated {
    pub(crate) fn value(
        where_: RegisterId,
        type_: Type,
        compile_time_value: Option<Value>,
        is_pure: bool,
    ) -> Self {
        Self {
            completion: Completion::Value,
            where_,
            type_,
            compile_time_value,
            is_pure,
        }
    }

    /// Fails silently unless execution continues after the expression
    pub(crate) fn into_value(self) -> Evaluation {
        match self.completion {
            Completion::Value => Ok(self),
            Completion::Return | Completion::Exit => Err(Failed),
        }
    }
}

/// Checking failed and every diagnostic has already been reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Failed;

pub(crate) type Evaluation = Result<Evaluated, Failed>;

/// Memoized state of an `import`
#[derive(Debug, Clone)]
enum ModuleState {
    Loading,
    Loaded { value: Value, type_: Type },
    Failed,
}

/// Context of one [`check`] call
pub struct Checker<'a> {
    program: CheckedProgram,
    /// Runtime values of the global structure
    globals: Vec<Value>,
    config: &'a CheckConfig,
    /// Budget of the compile-time interpreter, shared by every fold
    counters: Counters,
    expression_depth: usize,
    on_error: &'a mut dyn FnMut(CompleteSemanticError),
    /// Errors reported so far, including those inside imported modules
    error_count: usize,
    loader: &'a ModuleLoader,
    modules: IndexMap<String, ModuleState>,
    generic_enums: Vec<GenericDefinition<crate::ast::EnumDefinition>>,
    generic_structs: Vec<GenericDefinition<crate::ast::StructDefinition>>,
    generic_interfaces: Vec<GenericInterface>,
    generic_lambdas: Vec<GenericDefinition<crate::ast::Lambda>>,
    instantiations: Vec<Instantiation>,
    generic_impls_for_regular_interfaces: Vec<(InterfaceId, GenericImpl)>,
    /// Interfaces whose method list is complete
    interfaces_defined: FxHashSet<InterfaceId>,
    /// Innermost function last
    frames: Vec<FunctionState>,
}

/// Checks a parsed program. Every semantic error is passed to `on_error`;
/// the returned program always has an entry function 0.
pub fn check(
    root: &Sequence,
    source: SourceFile,
    import_directory: Option<&Path>,
    loader: &ModuleLoader,
    config: &CheckConfig,
    on_error: &mut dyn FnMut(CompleteSemanticError),
) -> CheckedProgram {
    let mut checker = Checker::new(loader, config, on_error);
    checker.check_root(root, source, import_directory.map(Path::to_path_buf));
    checker.program
}

impl<'a> Checker<'a> {
    fn new(
        loader: &'a ModuleLoader,
        config: &'a CheckConfig,
        on_error: &'a mut dyn FnMut(CompleteSemanticError),
    ) -> Self {
        let mut program = CheckedProgram::default();
        let globals = stdlib::install(&mut program);
        Self {
            program,
            globals,
            config,
            counters: Counters::default(),
            expression_depth: 0,
            on_error,
            error_count: 0,
            loader,
            modules: IndexMap::new(),
            generic_enums: Vec::new(),
            generic_structs: Vec::new(),
            generic_interfaces: Vec::new(),
            generic_lambdas: Vec::new(),
            instantiations: Vec::new(),
            generic_impls_for_regular_interfaces: Vec::new(),
            interfaces_defined: FxHashSet::default(),
            frames: Vec::new(),
        }
    }

    fn check_root(&mut self, root: &Sequence, source: SourceFile, import_directory: Option<PathBuf>) {
        let _span = tracing::debug_span!("check", file = %source.name).entered();
        let entry = self.program.reserve_function();
        debug_assert_eq!(entry, FunctionId(0));
        let checked = self.check_function(FunctionCheck {
            parent: None,
            body: FunctionBody::Sequence(root),
            parameters: Vec::new(),
            self_type: None,
            may_capture: true,
            explicit_return_type: None,
            early_name: None,
            function_id: Some(entry),
            source,
            import_directory,
        });
        self.program.functions[entry.index()] = match checked {
            Ok((function, captures)) => {
                debug_assert!(captures.is_empty());
                function
            }
            Err(Failed) => unit_function(),
        };
        tracing::debug!(
            functions = self.program.functions.len(),
            structs = self.program.structs.len(),
            enums = self.program.enums.len(),
            interfaces = self.program.interfaces.len(),
            "checked program"
        );
    }

    pub(crate) fn report(&mut self, kind: SemanticErrorKind, location: SourceLocation) {
        self.report_with_note(kind, location, None);
    }

    pub(crate) fn report_with_note(
        &mut self,
        kind: SemanticErrorKind,
        location: SourceLocation,
        note: Option<String>,
    ) {
        let source = self.frame().source.clone();
        tracing::trace!(%kind, %location, file = %source.name, "semantic error");
        self.error_count += 1;
        (self.on_error)(CompleteSemanticError {
            error: SemanticError::new(kind, location),
            source,
            note,
        });
    }

    pub(crate) fn evaluate_expression(
        &mut self,
        body: &mut InstructionSequence,
        expression: &Expression,
        early_name: Option<&str>,
        expected: Expectation,
    ) -> Evaluation {
        if self.expression_depth >= self.config.max_expression_recursion {
            self.report(
                SemanticErrorKind::ExpressionRecursionLimitReached,
                expression.source_begin(),
            );
            return Err(Failed);
        }
        self.expression_depth += 1;
        let result = self.evaluate_expression_core(body, expression, early_name, expected);
        self.expression_depth -= 1;
        result
    }

    fn evaluate_expression_core(
        &mut self,
        body: &mut InstructionSequence,
        expression: &Expression,
        early_name: Option<&str>,
        expected: Expectation,
    ) -> Evaluation {
        match expression {
            Expression::Lambda(lambda) => self.evaluate_lambda(body, lambda, early_name, None),
            Expression::Call(call) => self.evaluate_call(body, call, &expected),
            Expression::IntegerLiteral { value, .. } => {
                Ok(self.emit_literal(body, Value::Integer(*value), Type::integer(*value, *value)))
            }
            Expression::String { value, .. } => {
                Ok(self.emit_literal(body, Value::String(value.clone()), Type::String))
            }
            Expression::Identifier(identifier) => self.read_variable(body, identifier, &expected),
            Expression::Not { expr, .. } => self.evaluate_not(body, expr),
            Expression::Binary(binary) => self.evaluate_binary(body, binary),
            Expression::Return { value, .. } => self.evaluate_return(body, value),
            Expression::Loop(sequence) => self.evaluate_loop(body, sequence),
            Expression::Break(source) => self.evaluate_break(body, *source),
            Expression::Sequence(sequence) => self.check_sequence(body, sequence, expected),
            Expression::Declare(declare) => self.evaluate_declare(body, declare),
            Expression::Match(match_) => self.evaluate_match(body, match_, expected),
            Expression::Comment { .. } => Ok(self.make_unit(body)),
            Expression::Interface(definition) => {
                self.evaluate_interface(body, definition, early_name)
            }
            Expression::Struct(definition) => self.evaluate_struct(body, definition, early_name),
            Expression::Impl(definition) => self.evaluate_impl(body, definition),
            Expression::InstantiateStruct(instantiate) => {
                self.evaluate_instantiate_struct(body, instantiate)
            }
            Expression::Enum(definition) => self.evaluate_enum(body, definition),
            Expression::Placeholder(identifier) => {
                self.report(SemanticErrorKind::PlaceholderNotSupportedHere, identifier.source);
                Err(Failed)
            }
            Expression::TypeOf { target, .. } => self.evaluate_type_of(body, target),
            Expression::Import(name) => self.evaluate_import(body, name),
            Expression::NewArray { element, .. } => self.evaluate_new_array(body, element),
            Expression::GenericInstantiation(instantiation) => {
                self.evaluate_generic_instantiation(body, instantiation)
            }
            Expression::AccessStructure(access) => self.evaluate_access_structure(body, access),
            Expression::Tuple { elements, .. } => self.evaluate_tuple(body, elements, &expected),
        }
    }

    /// Emits a literal whose value is known at compile time
    pub(crate) fn emit_literal(
        &mut self,
        body: &mut InstructionSequence,
        value: Value,
        type_: Type,
    ) -> Evaluated {
        let into = self.allocate_register();
        self.emit_literal_into(body, into, value, type_)
    }

    /// Like [`Checker::emit_literal`] for a register allocated earlier
    pub(crate) fn emit_literal_into(
        &mut self,
        body: &mut InstructionSequence,
        into: RegisterId,
        value: Value,
        type_: Type,
    ) -> Evaluated {
        self.write_compile_time_value(into, value.clone());
        body.push(Instruction::literal(into, value.clone(), type_.clone()));
        Evaluated::value(into, type_, Some(value), true)
    }

    pub(crate) fn make_unit(&mut self, body: &mut InstructionSequence) -> Evaluated {
        self.emit_literal(body, Value::Unit, Type::Unit)
    }

    /// Evaluates an expression that has to be a type known at compile time
    pub(crate) fn expect_compile_time_type(
        &mut self,
        body: &mut InstructionSequence,
        expression: &Expression,
    ) -> Result<Type, Failed> {
        let evaluated = self
            .evaluate_expression(body, expression, None, Expectation::none())?
            .into_value()?;
        match evaluated.compile_time_value {
            Some(Value::Type(type_)) => Ok(type_),
            _ => {
                self.report(
                    SemanticErrorKind::ExpectedCompileTimeType,
                    expression.source_begin(),
                );
                Err(Failed)
            }
        }
    }
}

/// Entry function used when the program itself failed to check
fn unit_function() -> CheckedFunction {
    CheckedFunction {
        signature: FunctionPointerType::new(Type::Unit, Vec::new()),
        body: vec![
            Instruction::literal(RegisterId(0), Value::Unit, Type::Unit),
            Instruction::Return {
                returned_value: RegisterId(0),
                unit_goes_into: RegisterId(1),
            },
        ]
        .into(),
        register_debug_names: vec![String::new(), String::new()],
        number_of_registers: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn check_text(text: &str) -> (CheckedProgram, Vec<SemanticError>) {
        let root = parse_source(text).expect("valid syntax");
        let mut errors = Vec::new();
        let program = check(
            &root,
            SourceFile::new("test.lpg", text),
            None,
            &ModuleLoader::default(),
            &CheckConfig::default(),
            &mut |error| errors.push(error.error),
        );
        (program, errors)
    }

    #[test]
    fn empty_program_returns_unit() {
        let (program, errors) = check_text("");
        assert!(errors.is_empty());
        let entry = program.function(FunctionId(0));
        assert_eq!(entry.signature.result, Some(Type::Unit));
        assert!(matches!(entry.body.elements.last(), Some(Instruction::Return { .. })));
    }

    #[test]
    fn failed_program_still_has_an_entry() {
        let (program, errors) = check_text("let a = b\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, SemanticErrorKind::UnknownElement);
        assert_eq!(program.function(FunctionId(0)).number_of_registers, 2);
    }

    #[test]
    fn nesting_limit_is_reported_once() {
        let mut text = String::new();
        for _ in 0..150 {
            text.push('!');
        }
        text.push_str("boolean.true\n");
        let (_, errors) = check_text(&text);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, SemanticErrorKind::ExpressionRecursionLimitReached);
    }
}
