//! Semantic error tests
//!
//! Every error kind the checker reports, with the location it points at.

use lpg::common::SourceLocation;
use lpg::diagnostics::{CompleteSemanticError, SemanticError, SemanticErrorKind, SourceFile};
use lpg::types::{FunctionId, Type};
use lpg::{CheckConfig, CheckedProgram, ModuleLoader};
use pretty_assertions::assert_eq;

fn check_with(
    source: &str,
    loader: &ModuleLoader,
    config: &CheckConfig,
) -> (CheckedProgram, Vec<CompleteSemanticError>) {
    let root = lpg::parser::parse_source(source).unwrap();
    let mut errors = Vec::new();
    let program = lpg::check(
        &root,
        SourceFile::new("test.lpg", source),
        None,
        loader,
        config,
        &mut |error| errors.push(error),
    );
    (program, errors)
}

fn errors(source: &str) -> Vec<SemanticError> {
    check_with(source, &ModuleLoader::default(), &CheckConfig::default())
        .1
        .into_iter()
        .map(|error| error.error)
        .collect()
}

fn kinds(source: &str) -> Vec<SemanticErrorKind> {
    errors(source).into_iter().map(|error| error.kind).collect()
}

fn at(kind: SemanticErrorKind, line: u32, column: u32) -> SemanticError {
    SemanticError::new(kind, SourceLocation::new(line, column))
}

// ==================== Names ====================

#[test]
fn test_unknown_element() {
    assert_eq!(errors("a"), vec![at(SemanticErrorKind::UnknownElement, 0, 0)]);
}

#[test]
fn test_errors_do_not_stop_checking() {
    let (program, errors) = check_with("a\nb", &ModuleLoader::default(), &CheckConfig::default());
    let errors: Vec<_> = errors.into_iter().map(|error| error.error).collect();
    assert_eq!(
        errors,
        vec![
            at(SemanticErrorKind::UnknownElement, 0, 0),
            at(SemanticErrorKind::UnknownElement, 1, 0),
        ]
    );
    assert_eq!(
        program.function(FunctionId(0)).signature.result,
        Some(Type::Unit)
    );
}

#[test]
fn test_declaration_with_existing_name() {
    assert_eq!(
        errors("let a = 1\nlet a = 2"),
        vec![at(SemanticErrorKind::DeclarationWithExistingName, 1, 4)]
    );
}

#[test]
fn test_shadowing_in_a_nested_function_is_allowed() {
    assert_eq!(kinds("let a = 1\nlet f = (a: string) a\nf"), vec![]);
}

#[test]
fn test_placeholder_outside_of_a_pattern() {
    assert_eq!(
        errors("{let x}"),
        vec![at(SemanticErrorKind::PlaceholderNotSupportedHere, 0, 5)]
    );
}

// ==================== Control flow ====================

#[test]
fn test_break_outside_of_loop() {
    assert_eq!(errors("break"), vec![at(SemanticErrorKind::BreakOutsideOfLoop, 0, 0)]);
}

#[test]
fn test_break_in_nested_lambda_is_outside_of_loop() {
    let source = "loop\n    let f = ()\n        break\n    break";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::BreakOutsideOfLoop, 2, 8)]);
}

#[test]
fn test_break_outside_of_loop_in_a_called_lambda() {
    let source = "let f = ()\n    break\n    1\nf()\n";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::BreakOutsideOfLoop, 1, 4)]);
}

// ==================== Types ====================

#[test]
fn test_subtraction_that_may_be_negative() {
    assert_eq!(errors("3 - 5"), vec![at(SemanticErrorKind::TypeMismatch, 0, 2)]);
}

#[test]
fn test_adding_a_string() {
    assert_eq!(kinds("\"a\" + 1"), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn test_comparing_different_types() {
    assert_eq!(kinds("\"a\" == 1"), vec![SemanticErrorKind::TypeMismatch]);
    assert_eq!(kinds("\"a\" < \"b\""), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn test_declared_type_too_narrow() {
    assert_eq!(
        errors("let a: int(0, 3) = 5"),
        vec![at(SemanticErrorKind::TypeMismatch, 0, 19)]
    );
}

#[test]
fn test_not_on_an_integer() {
    assert_eq!(errors("!1"), vec![at(SemanticErrorKind::TypeMismatch, 0, 1)]);
}

#[test]
fn test_explicit_return_type_is_not_widened() {
    let source = "let f = (a: int(0, 9)): int(0, 5)\n    a";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn test_type_position_needs_a_type() {
    assert_eq!(
        errors("let f = (a: 1) a"),
        vec![at(SemanticErrorKind::ExpectedCompileTimeType, 0, 12)]
    );
}

// ==================== Calls ====================

/// Registers and instructions of the entry function
fn entry_shape(source: &str) -> (u32, usize) {
    let (program, _) = check_with(source, &ModuleLoader::default(), &CheckConfig::default());
    let entry = program.function(FunctionId(0));
    (entry.number_of_registers, entry.body.len())
}

#[test]
fn test_failed_calls_leave_no_code_behind() {
    assert_eq!(entry_shape("let a = 1\na()\n2"), entry_shape("let a = 1\n2"));
    assert_eq!(entry_shape("3(1)\n2"), entry_shape("2"));
    let f = "let f = (a: int(0, 9)) a\n";
    assert_eq!(
        entry_shape(&format!("{}f(\"x\")\n2", f)),
        entry_shape(&format!("{}2", f))
    );
}

#[test]
fn test_missing_argument() {
    assert_eq!(
        errors("let f = (a: int(0, 9)) a\nf()"),
        vec![at(SemanticErrorKind::MissingArgument, 1, 2)]
    );
}

#[test]
fn test_extraneous_argument() {
    assert_eq!(
        errors("let f = (a: int(0, 9)) a\nf(1, 2)"),
        vec![at(SemanticErrorKind::ExtraneousArgument, 1, 5)]
    );
}

#[test]
fn test_argument_of_the_wrong_type() {
    assert_eq!(
        errors("let f = (a: int(0, 9)) a\nf(\"x\")"),
        vec![at(SemanticErrorKind::TypeMismatch, 1, 2)]
    );
}

#[test]
fn test_not_callable() {
    assert_eq!(
        errors("let a = 1\na()"),
        vec![at(SemanticErrorKind::NotCallable, 1, 0)]
    );
}

// ==================== Members ====================

#[test]
fn test_no_members_on_enum_elements() {
    assert_eq!(
        errors("boolean.true.x"),
        vec![at(SemanticErrorKind::NoMembersOnEnumElements, 0, 13)]
    );
}

#[test]
fn test_unknown_member() {
    assert_eq!(
        errors("{1, 2}.2"),
        vec![at(SemanticErrorKind::UnknownElement, 0, 7)]
    );
}

#[test]
fn test_expected_structure() {
    assert_eq!(
        errors("string{1}"),
        vec![at(SemanticErrorKind::ExpectedStructure, 0, 0)]
    );
}

#[test]
fn test_structure_argument_count() {
    let source = "let point = struct\n    x: int(0, 9)\n    y: int(0, 9)\n";
    assert_eq!(
        kinds(&format!("{}point{{1}}", source)),
        vec![SemanticErrorKind::MissingArgument]
    );
    assert_eq!(
        kinds(&format!("{}point{{1, 2, 3}}", source)),
        vec![SemanticErrorKind::ExtraneousArgument]
    );
}

// ==================== Match ====================

#[test]
fn test_missing_match_case_points_at_match() {
    let source = "let f = (b: boolean)\n    match b\n        case true: 1";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::MissingMatchCase, 1, 4)]);
}

#[test]
fn test_duplicate_match_case_points_at_key() {
    let source = "let f = (b: boolean)\n    match b\n        case true: 1\n        case true: 2";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::DuplicateMatchCase, 3, 13)]);
}

#[test]
fn test_integer_key_outside_of_range() {
    let source = "let f = (n: int(0, 1))\n    match n\n        case 0: 0\n        case 1: 1\n        case 2: 2";
    assert_eq!(kinds(source), vec![SemanticErrorKind::DuplicateMatchCase]);
}

#[test]
fn test_match_key_must_be_known() {
    let source = "let f = (n: int(0, 1), m: int(0, 1))\n    match n\n        case m: 0\n        default: 1";
    assert_eq!(
        errors(source),
        vec![at(SemanticErrorKind::ExpectedCompileTimeValue, 2, 13)]
    );
}

#[test]
fn test_match_on_stateful_element_value() {
    let source = [
        "let shape = enum",
        "    circle(int(0, 9))",
        "    empty",
        "let f = (s: shape)",
        "    match s",
        "        case shape.circle(1): 1",
        "        default: 0",
    ]
    .join("\n");
    assert_eq!(kinds(&source), vec![SemanticErrorKind::MatchUnsupported]);
}

#[test]
fn test_match_on_a_structure() {
    let source = "let point = struct\n    x: int(0, 9)\nmatch point{1}\n    default: 0";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn test_duplicate_default_case() {
    let source = "let f = (n: int(0, 9))\n    match n\n        default: 0\n        default: 1";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::DuplicateDefaultCase, 3, 8)]);
}

#[test]
fn test_missing_default_on_string() {
    let source = "let f = (s: string)\n    match s\n        case \"a\": 0";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::MissingDefault, 1, 4)]);
}

// ==================== Definitions ====================

#[test]
fn test_duplicate_enum_element() {
    assert_eq!(
        kinds("enum\n    a\n    a"),
        vec![SemanticErrorKind::DuplicateEnumElement]
    );
}

#[test]
fn test_duplicate_interface_method() {
    assert_eq!(
        errors("interface\n    f(): unit\n    f(): unit"),
        vec![at(SemanticErrorKind::DuplicateMethodName, 2, 4)]
    );
}

fn interface_with(methods: &[&str], rest: &str) -> String {
    let mut source = String::from("let i = interface\n");
    for method in methods {
        source.push_str(&format!("    {}(): int(0, 9)\n", method));
    }
    source.push_str(rest);
    source
}

#[test]
fn test_expected_interface() {
    assert_eq!(
        errors("impl string for string\n    f()\n        1"),
        vec![at(SemanticErrorKind::ExpectedInterface, 0, 5)]
    );
}

#[test]
fn test_duplicate_impl() {
    let source = interface_with(
        &["f"],
        "impl i for string\n    f()\n        1\nimpl i for string\n    f()\n        2",
    );
    assert_eq!(errors(&source), vec![at(SemanticErrorKind::DuplicateImpl, 5, 11)]);
}

#[test]
fn test_missing_method() {
    let source = interface_with(&["f", "g"], "impl i for string\n    f()\n        1");
    assert_eq!(kinds(&source), vec![SemanticErrorKind::MissingMethod]);
}

#[test]
fn test_extra_method() {
    let source = interface_with(
        &["f"],
        "impl i for string\n    f()\n        1\n    g()\n        2",
    );
    assert_eq!(errors(&source), vec![at(SemanticErrorKind::ExtraMethod, 5, 4)]);
}

#[test]
fn test_method_defined_twice() {
    let source = interface_with(
        &["f"],
        "impl i for string\n    f()\n        1\n    f()\n        2",
    );
    assert_eq!(errors(&source), vec![at(SemanticErrorKind::DuplicateMethodName, 5, 4)]);
}

#[test]
fn test_method_parameters_must_match() {
    let source = interface_with(&["f"], "impl i for string\n    f(a: string)\n        1");
    assert_eq!(errors(&source), vec![at(SemanticErrorKind::TypeMismatch, 3, 4)]);
}

#[test]
fn test_method_cannot_capture_runtime_variable() {
    let source = [
        "let f = (a: int(0, 9))",
        "    let i = interface",
        "        get(): int(0, 9)",
        "    impl i for string",
        "        get()",
        "            a",
        "    0",
    ]
    .join("\n");
    assert_eq!(
        errors(&source),
        vec![at(SemanticErrorKind::CannotCaptureRuntimeVariable, 5, 12)]
    );
}

#[test]
fn test_method_may_read_compile_time_values() {
    let source = [
        "let k = 3",
        "let i = interface",
        "    get(): int(0, 9)",
        "impl i for string",
        "    get()",
        "        k",
    ]
    .join("\n");
    assert_eq!(kinds(&source), vec![]);
}

// ==================== Compile-time execution ====================

#[test]
fn test_instruction_limit_reached() {
    let source = "let spin = (): unit\n    loop\n        let a = 1\nspin()";
    assert_eq!(
        errors(source),
        vec![at(SemanticErrorKind::InstructionLimitReached, 3, 5)]
    );
}

#[test]
fn test_stack_overflow() {
    let source = "let forever = (): unit\n    forever()\nforever()";
    assert_eq!(errors(source), vec![at(SemanticErrorKind::StackOverflow, 2, 8)]);
}

#[test]
fn test_runtime_failure_is_not_an_error() {
    assert_eq!(kinds("let f = () fail()\nf()"), vec![]);
    assert_eq!(kinds("assert(boolean.false)"), vec![]);
}

#[test]
fn test_expression_recursion_limit() {
    let depth = 150;
    let source = format!("{}1{}", "{".repeat(depth), "}".repeat(depth));
    assert_eq!(
        kinds(&source),
        vec![SemanticErrorKind::ExpressionRecursionLimitReached]
    );
}

#[test]
fn test_expression_recursion_limit_is_configurable() {
    let config = CheckConfig {
        max_expression_recursion: 3,
        ..CheckConfig::default()
    };
    let (_, errors) = check_with("{{{{1}}}}", &ModuleLoader::default(), &config);
    let errors: Vec<_> = errors.into_iter().map(|error| error.error).collect();
    assert_eq!(
        errors,
        vec![at(SemanticErrorKind::ExpressionRecursionLimitReached, 0, 3)]
    );
    assert_eq!(kinds("{{{{1}}}}"), vec![]);
}

// ==================== Imports ====================

#[test]
fn test_import_of_unknown_module() {
    assert_eq!(
        errors("import missing"),
        vec![at(SemanticErrorKind::ImportFailed, 0, 7)]
    );
}

#[test]
fn test_errors_inside_a_module_are_reported_in_its_file() {
    let loader = ModuleLoader::default().with_module("broken", "nope");
    let (_, errors) = check_with("import broken", &loader, &CheckConfig::default());
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].error, at(SemanticErrorKind::UnknownElement, 0, 0));
    assert_eq!(errors[0].source.name, "broken.lpg");
    assert_eq!(errors[1].error, at(SemanticErrorKind::ImportFailed, 0, 7));
    assert_eq!(errors[1].source.name, "test.lpg");
}

#[test]
fn test_module_with_syntax_error() {
    let loader = ModuleLoader::default().with_module("bad", "let = 1\n");
    let (program, errors) = check_with("import bad", &loader, &CheckConfig::default());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error, at(SemanticErrorKind::ImportFailed, 0, 7));
    let note = errors[0].note.as_deref().unwrap_or_default();
    assert!(note.starts_with("bad.lpg:1:"), "note was {:?}", note);
    assert_eq!(program.functions.len(), 1);
}

#[test]
fn test_missing_module_has_a_note() {
    let (_, errors) = check_with("import missing", &ModuleLoader::default(), &CheckConfig::default());
    assert_eq!(
        errors[0].note.as_deref(),
        Some("module `missing` was not found")
    );
}

#[test]
fn test_failed_module_leaves_no_function() {
    let loader = ModuleLoader::default().with_module("broken", "nope");
    let (program, _) = check_with("import broken\n1", &loader, &CheckConfig::default());
    assert_eq!(program.functions.len(), 1);
}

#[test]
fn test_failed_module_is_not_retried() {
    let loader = ModuleLoader::default().with_module("broken", "nope");
    let (_, errors) = check_with(
        "import broken\nimport broken",
        &loader,
        &CheckConfig::default(),
    );
    let kinds: Vec<_> = errors.into_iter().map(|error| error.error.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SemanticErrorKind::UnknownElement,
            SemanticErrorKind::ImportFailed,
            SemanticErrorKind::ImportFailed,
        ]
    );
}

#[test]
fn test_module_importing_itself() {
    let loader = ModuleLoader::default().with_module("cycle", "import cycle");
    let (_, errors) = check_with("import cycle", &loader, &CheckConfig::default());
    let kinds: Vec<_> = errors.into_iter().map(|error| error.error.kind).collect();
    assert_eq!(
        kinds,
        vec![SemanticErrorKind::ImportFailed, SemanticErrorKind::ImportFailed]
    );
}

// ==================== Messages ====================

#[test]
fn test_messages() {
    insta::assert_snapshot!(SemanticErrorKind::UnknownElement.to_string(), @"unknown element");
    insta::assert_snapshot!(SemanticErrorKind::MissingMatchCase.to_string(), @"missing match case");
    insta::assert_snapshot!(
        SemanticErrorKind::CannotCaptureRuntimeVariable.to_string(),
        @"cannot capture a runtime variable here"
    );
    insta::assert_snapshot!(
        SemanticErrorKind::GenericImplParameterMismatch.to_string(),
        @"generic impl parameters do not match"
    );
}
