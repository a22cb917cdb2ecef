//! Optimizer tests: dead registers and unreachable functions

use lpg::diagnostics::SourceFile;
use lpg::interp::{Counters, FunctionPointerValue, InterpretError, Interpreter, Value};
use lpg::ir::Instruction;
use lpg::types::FunctionId;
use lpg::{CheckConfig, CheckedProgram, ModuleLoader};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn check_ok(source: &str) -> CheckedProgram {
    let root = lpg::parser::parse_source(source).unwrap();
    let mut errors = Vec::new();
    let program = lpg::check(
        &root,
        SourceFile::new("test.lpg", source),
        None,
        &ModuleLoader::default(),
        &CheckConfig::default(),
        &mut |error| errors.push(error.error),
    );
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    program
}

fn optimized(source: &str) -> CheckedProgram {
    let mut program = check_ok(source);
    lpg::optimize::optimize(&mut program);
    program
}

fn run(program: &CheckedProgram) -> Result<Value, InterpretError> {
    let globals = lpg::stdlib::global_values();
    let mut counters = Counters::default();
    let entry = FunctionPointerValue::Internal {
        function: FunctionId(0),
        captures: Vec::new(),
    };
    Interpreter::new(
        program,
        &globals,
        CheckConfig::default().interpreter_limits(),
        &mut counters,
    )
    .at_run_time()
    .call_function(&entry, None, Vec::new())
}

fn literals(program: &CheckedProgram, function: FunctionId) -> Vec<Value> {
    program
        .function(function)
        .body
        .iter()
        .filter_map(|instruction| match instruction {
            Instruction::Literal { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect()
}

// ==================== Dead Code ====================

#[test]
fn test_unused_declarations_are_removed() {
    let program = optimized("let a = 1\nlet b = 2\n3");
    let entry = program.function(FunctionId(0));
    assert_eq!(literals(&program, FunctionId(0)), vec![Value::Integer(3)]);
    assert_eq!(entry.body.len(), 2);
    assert_eq!(entry.number_of_registers, 2);
    assert_eq!(entry.register_debug_names.len(), 2);
}

#[test]
fn test_side_effects_survive() {
    let program = optimized("side_effect()\n1");
    let entry = program.function(FunctionId(0));
    let calls = entry
        .body
        .iter()
        .filter(|instruction| instruction.name() == "call")
        .count();
    assert_eq!(calls, 1);
}

#[test]
fn test_parameters_survive_when_unused() {
    let source = r#"
let f = (a: int(0, 9), b: int(0, 9))
    side_effect()
    a
f(1, 2)
"#;
    let program = optimized(source);
    let f = program.function(FunctionId(1));
    assert_eq!(f.signature.parameters.len(), 2);
    assert!(f.number_of_registers >= 2);
    assert_eq!(run(&program), Ok(Value::Integer(1)));
}

// ==================== Unused Functions ====================

#[test]
fn test_folded_calls_drop_their_function() {
    let mut program = check_ok("let f = () 5\nlet g = () 6\nf()");
    assert_eq!(program.functions.len(), 3);
    lpg::optimize::optimize(&mut program);
    assert_eq!(program.functions.len(), 1);
    assert_eq!(literals(&program, FunctionId(0)), vec![Value::Integer(5)]);
}

#[test]
fn test_surviving_functions_are_renumbered() {
    let source = r#"
let unused = () 1
let used = (a: int(0, 9))
    side_effect()
    a
used(3)
"#;
    let mut program = check_ok(source);
    assert_eq!(program.functions.len(), 3);
    lpg::optimize::optimize(&mut program);
    assert_eq!(program.functions.len(), 2);
    assert!(literals(&program, FunctionId(0)).contains(&Value::function(FunctionId(1), Vec::new())));
    assert_eq!(run(&program), Ok(Value::Integer(3)));
}

#[test]
fn test_interface_methods_are_kept() {
    let source = r#"
let named = interface
    name(): string
impl named for string
    name()
        "text"
1
"#;
    let program = optimized(source);
    assert_eq!(program.functions.len(), 2);
    let interface = program.interfaces.last().unwrap();
    assert_eq!(
        interface.implementations[0].implementation.methods[0],
        FunctionPointerValue::Internal {
            function: FunctionId(1),
            captures: Vec::new(),
        }
    );
}

#[test]
fn test_closures_keep_their_function() {
    let source = r#"
let make = (a: int(0, 9))
    side_effect()
    () a
let get = make(6)
get()
"#;
    let program = optimized(source);
    assert_eq!(program.functions.len(), 3);
    assert_eq!(run(&program), Ok(Value::Integer(6)));
}

// ==================== Stability ====================

#[test]
fn test_optimizing_twice_changes_nothing() {
    let source = r#"
let unused = () 1
let f = (a: int(0, 9))
    side_effect()
    let dead = 4
    a
f(2)
"#;
    let once = optimized(source);
    let mut twice = once.clone();
    lpg::optimize::optimize(&mut twice);
    assert_eq!(once, twice);
}

proptest! {
    #[test]
    fn optimized_programs_compute_the_same_result(n in 0u64..=50) {
        let source = format!(
            "let f = (a: int(0, 50))\n    side_effect()\n    let dead = 7\n    a + a\nf({})",
            n
        );
        let mut program = check_ok(&source);
        let before = run(&program);
        let registers = program.function(FunctionId(1)).number_of_registers;
        lpg::optimize::optimize(&mut program);
        prop_assert!(program.function(FunctionId(1)).number_of_registers < registers);
        prop_assert_eq!(run(&program), before);
        prop_assert_eq!(run(&program), Ok(Value::Integer(u128::from(n) * 2)));
    }
}
