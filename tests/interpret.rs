//! Interpreter integration tests
//!
//! Tests the full pipeline: source → parse → check → interpret at run time

use lpg::diagnostics::SourceFile;
use lpg::interp::{Counters, FunctionPointerValue, InterpretError, Interpreter, Value};
use lpg::types::FunctionId;
use lpg::{CheckConfig, ModuleLoader};
use pretty_assertions::assert_eq;

/// Helper to check and run source code, returning the entry's result
fn interpret(source: &str) -> Result<Value, String> {
    let root = lpg::parser::parse_source(source).map_err(|e| format!("Parse error: {}", e))?;
    let mut errors = Vec::new();
    let mut program = lpg::check(
        &root,
        SourceFile::new("test.lpg", source),
        None,
        &ModuleLoader::default(),
        &CheckConfig::default(),
        &mut |error| errors.push(error.error.kind),
    );
    if !errors.is_empty() {
        return Err(format!("Semantic errors: {:?}", errors));
    }
    lpg::optimize::optimize(&mut program);
    let globals = lpg::stdlib::global_values();
    let mut counters = Counters::default();
    let entry = FunctionPointerValue::Internal {
        function: FunctionId(0),
        captures: Vec::new(),
    };
    Interpreter::new(
        &program,
        &globals,
        CheckConfig::default().interpreter_limits(),
        &mut counters,
    )
    .at_run_time()
    .call_function(&entry, None, Vec::new())
    .map_err(|e| format!("Runtime error: {}", e))
}

/// Helper to check that interpretation succeeds
fn assert_interprets(source: &str) {
    if let Err(e) = interpret(source) {
        panic!("Interpretation failed: {}", e);
    }
}

/// Helper to check the result is an integer
fn assert_result_int(source: &str, expected: u128) {
    match interpret(source) {
        Ok(Value::Integer(n)) => assert_eq!(n, expected, "Expected {}, got {}", expected, n),
        Ok(v) => panic!("Expected Integer({}), got {:?}", expected, v),
        Err(e) => panic!("Interpretation failed: {}", e),
    }
}

/// Helper to check the result is a boolean
fn assert_result_bool(source: &str, expected: bool) {
    match interpret(source) {
        Ok(v) => assert_eq!(v.as_bool(), Some(expected), "got {:?}", v),
        Err(e) => panic!("Interpretation failed: {}", e),
    }
}

fn assert_result_string(source: &str, expected: &str) {
    match interpret(source) {
        Ok(Value::String(s)) => assert_eq!(s, expected),
        Ok(v) => panic!("Expected String({:?}), got {:?}", expected, v),
        Err(e) => panic!("Interpretation failed: {}", e),
    }
}

// ==================== Basic Expression Tests ====================

#[test]
fn test_interpret_literal_int() {
    assert_result_int("42", 42);
}

#[test]
fn test_interpret_arithmetic() {
    assert_result_int("let a = 10\nlet b = 4\na - b + 1", 7);
}

#[test]
fn test_interpret_comparison() {
    assert_result_bool("3 < 5", true);
    assert_result_bool("3 >= 5", false);
}

#[test]
fn test_interpret_concat() {
    assert_result_string("concat(\"ab\", \"cd\")", "abcd");
}

#[test]
fn test_interpret_integer_to_string() {
    assert_result_string("integer_to_string(120)", "120");
}

// ==================== Function Tests ====================

#[test]
fn test_interpret_runtime_parameters() {
    let source = r#"
let add = (a: int(0, 10), b: int(0, 10)) a + b
let sum = (a: int(0, 10))
    side_effect()
    add(a, 3)
sum(4)
"#;
    assert_result_int(source, 7);
}

#[test]
fn test_interpret_closure() {
    let source = r#"
let make = (a: int(0, 9))
    side_effect()
    () a
let get = make(6)
get()
"#;
    assert_result_int(source, 6);
}

#[test]
fn test_interpret_recursion() {
    let source = r#"
let stars = (n: int(0, 3)): string
    side_effect()
    match n
        case 0: ""
        case 1: concat("*", stars(0))
        case 2: concat("*", stars(1))
        case 3: concat("*", stars(2))
stars(3)
"#;
    assert_result_string(source, "***");
}

// ==================== Control Flow Tests ====================

#[test]
fn test_interpret_loop_with_break() {
    let source = r#"
let f = ()
    loop
        side_effect()
        break
    9
f()
"#;
    assert_result_int(source, 9);
}

#[test]
fn test_interpret_early_return() {
    let source = r#"
let f = (b: boolean)
    side_effect()
    match b
        case true:
            return 1
        case false: 2
f(boolean.true)
"#;
    assert_result_int(source, 1);
}

#[test]
fn test_interpret_string_match() {
    let source = r#"
let f = (s: string)
    side_effect()
    match s
        case "a": 1
        case "b": 2
        default: 3
{f("b"), f("z")}
"#;
    assert_eq!(
        interpret(source),
        Ok(Value::Tuple(vec![Value::Integer(2), Value::Integer(3)]))
    );
}

#[test]
fn test_interpret_stateful_enum() {
    let source = r#"
let shape = enum
    circle(int(0, 9))
    empty
let radius = (s: shape)
    side_effect()
    match s
        case circle(let r): r
        case empty: 0
{radius(shape.circle(5)), radius(shape.empty)}
"#;
    assert_eq!(
        interpret(source),
        Ok(Value::Tuple(vec![Value::Integer(5), Value::Integer(0)]))
    );
}

// ==================== Assertion Tests ====================

#[test]
fn test_interpret_assert_success() {
    assert_interprets("assert(integer_equals(2, 2))");
}

#[test]
fn test_interpret_assert_failure() {
    let result = interpret("assert(integer_equals(2, 3))");
    assert_eq!(result, Err("Runtime error: assertion failed".to_string()));
}

#[test]
fn test_interpret_fail() {
    let result = interpret("let f = () fail()\nf()");
    assert_eq!(result, Err("Runtime error: fail was called".to_string()));
}

#[test]
fn test_interpret_failure_stops_the_program() {
    let result = interpret("assert(boolean.false)\n1");
    assert!(result.is_err());
}

// ==================== Interface Tests ====================

#[test]
fn test_interpret_interface_dispatch() {
    let source = r#"
let printable = interface
    show(): string
impl printable for string
    show()
        concat("s:", self)
let number = struct
    value: int(0, 9)
impl printable for number
    show()
        integer_to_string(self.value)
let show = (p: printable) p.show()
{show("a"), show(number{7})}
"#;
    assert_eq!(
        interpret(source),
        Ok(Value::Tuple(vec![
            Value::String("s:a".to_string()),
            Value::String("7".to_string()),
        ]))
    );
}

#[test]
fn test_interpret_interface_method_arguments() {
    let source = r#"
let adder = interface
    add(amount: int(0, 5)): int(0, 20)
let base = struct
    value: int(0, 15)
impl adder for base
    add(amount: int(0, 5))
        self.value + amount
let apply = (a: adder) a.add(4)
apply(base{10})
"#;
    assert_result_int(source, 14);
}

// ==================== Module Tests ====================

#[test]
fn test_interpret_std_minimum() {
    assert_result_int("let std = import std\nstd.minimum(8, 3)", 3);
}

#[test]
fn test_interpret_array_store() {
    let source = r#"
let a = new_array(int(0, 9))
a.append(1)
a.store(0, 5)
let stored = a.store(3, 5)
let loaded = match a.load(0)
    case some(let value): value
    case none: 0
{loaded, stored}
"#;
    assert_eq!(
        interpret(source),
        Ok(Value::Tuple(vec![Value::Integer(5), Value::from_bool(false)]))
    );
}

// ==================== Limit Tests ====================

#[test]
fn test_interpret_runtime_instruction_limit() {
    let source = r#"
let spin = (): unit
    loop
        side_effect()
spin()
"#;
    let result = interpret(source);
    assert_eq!(
        result,
        Err(format!("Runtime error: {}", InterpretError::InstructionLimitReached))
    );
}
