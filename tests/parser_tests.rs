//! Parser tests

use lpg::ast::*;
use lpg::common::SourceLocation;
use lpg::diagnostics::ParseError;
use lpg::parser::parse_source;
use pretty_assertions::assert_eq;

fn parse(source: &str) -> Sequence {
    parse_source(source).unwrap()
}

fn single(source: &str) -> Expression {
    let mut sequence = parse(source);
    assert_eq!(sequence.elements.len(), 1, "expected one top level expression");
    sequence.elements.remove(0)
}

fn name_of(expression: &Expression) -> &str {
    match expression {
        Expression::Identifier(identifier) => &identifier.value,
        other => panic!("Expected identifier, got {:?}", other),
    }
}

// ==================== Sequences ====================

#[test]
fn test_parse_empty_file() {
    let sequence = parse("");
    assert!(sequence.elements.is_empty());
}

#[test]
fn test_parse_statements_in_order() {
    let sequence = parse("let a = 1\nlet b = a\nb");
    assert_eq!(sequence.elements.len(), 3);
    assert!(matches!(sequence.elements[0], Expression::Declare(_)));
    assert!(matches!(sequence.elements[1], Expression::Declare(_)));
    assert_eq!(name_of(&sequence.elements[2]), "b");
}

#[test]
fn test_parse_declaration_with_type() {
    if let Expression::Declare(declare) = single("let a: int(0, 9) = 3") {
        assert_eq!(declare.name.value, "a");
        assert_eq!(declare.name.source, SourceLocation::new(0, 4));
        assert!(matches!(
            declare.optional_type.as_deref(),
            Some(Expression::Call(_))
        ));
        assert!(matches!(
            *declare.initializer,
            Expression::IntegerLiteral { value: 3, .. }
        ));
    } else {
        panic!("Expected declaration");
    }
}

#[test]
fn test_parse_comment_line_becomes_expression() {
    let sequence = parse("// hello\n1");
    assert_eq!(
        sequence.elements[0],
        Expression::Comment {
            text: " hello".to_string(),
            source: SourceLocation::new(0, 0),
        }
    );
}

// ==================== Literals ====================

#[test]
fn test_parse_string_escapes() {
    assert_eq!(
        single(r#""a\tb\n""#),
        Expression::String {
            value: "a\tb\n".to_string(),
            source: SourceLocation::new(0, 0),
        }
    );
}

#[test]
fn test_parse_raw_string_keeps_backslashes() {
    assert_eq!(
        single(r"'a\nb'"),
        Expression::String {
            value: r"a\nb".to_string(),
            source: SourceLocation::new(0, 0),
        }
    );
}

#[test]
fn test_parse_largest_integer() {
    assert!(matches!(
        single("340282366920938463463374607431768211455"),
        Expression::IntegerLiteral { value: u128::MAX, .. }
    ));
}

#[test]
fn test_parse_tuple() {
    if let Expression::Tuple { elements, .. } = single("{1, \"a\", b}") {
        assert_eq!(elements.len(), 3);
        assert_eq!(name_of(&elements[2]), "b");
    } else {
        panic!("Expected tuple");
    }
}

// ==================== Operators ====================

#[test]
fn test_parse_operators_are_left_associative() {
    if let Expression::Binary(outer) = single("a - b + c") {
        assert_eq!(outer.operator, BinaryOperator::Add);
        assert_eq!(name_of(&outer.right), "c");
        if let Expression::Binary(inner) = outer.left.as_ref() {
            assert_eq!(inner.operator, BinaryOperator::Subtract);
        } else {
            panic!("Expected nested binary");
        }
    } else {
        panic!("Expected binary");
    }
}

#[test]
fn test_parse_comparison_binds_loosest() {
    if let Expression::Binary(binary) = single("1 + 2 <= 3 - 1") {
        assert_eq!(binary.operator, BinaryOperator::LessOrEquals);
        assert_eq!(binary.source, SourceLocation::new(0, 6));
        assert!(matches!(*binary.left, Expression::Binary(_)));
        assert!(matches!(*binary.right, Expression::Binary(_)));
    } else {
        panic!("Expected binary");
    }
}

#[test]
fn test_parse_not_applies_to_postfix_expression() {
    if let Expression::Not { expr, .. } = single("!f(a)") {
        assert!(matches!(*expr, Expression::Call(_)));
    } else {
        panic!("Expected not");
    }
}

// ==================== Postfix ====================

#[test]
fn test_parse_call_records_closing_parenthesis() {
    if let Expression::Call(call) = single("f(1, 2)") {
        assert_eq!(name_of(&call.callee), "f");
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.closing_parenthesis, SourceLocation::new(0, 6));
    } else {
        panic!("Expected call");
    }
}

#[test]
fn test_parse_generic_then_struct_instantiation() {
    if let Expression::InstantiateStruct(instantiate) = single("pair[int(0, 1), string]{1, \"a\"}") {
        assert_eq!(instantiate.arguments.len(), 2);
        if let Expression::GenericInstantiation(generic) = instantiate.structure.as_ref() {
            assert_eq!(name_of(&generic.generic), "pair");
            assert_eq!(generic.arguments.len(), 2);
        } else {
            panic!("Expected generic instantiation");
        }
    } else {
        panic!("Expected struct instantiation");
    }
}

#[test]
fn test_parse_member_access_chain() {
    if let Expression::AccessStructure(outer) = single("a.b.0") {
        assert_eq!(outer.member.value, "0");
        if let Expression::AccessStructure(inner) = outer.object.as_ref() {
            assert_eq!(inner.member.value, "b");
            assert_eq!(name_of(&inner.object), "a");
        } else {
            panic!("Expected member access");
        }
    } else {
        panic!("Expected member access");
    }
}

#[test]
fn test_parse_placeholder_argument() {
    if let Expression::Call(call) = single("some(let value)") {
        assert_eq!(
            call.arguments,
            vec![Expression::Placeholder(Identifier::new(
                "value",
                SourceLocation::new(0, 9)
            ))]
        );
    } else {
        panic!("Expected call");
    }
}

#[test]
fn test_parse_import_type_of_and_new_array() {
    let sequence = parse("import std\ntype_of(a)\nnew_array(string)");
    assert!(matches!(&sequence.elements[0], Expression::Import(name) if name.value == "std"));
    assert!(matches!(sequence.elements[1], Expression::TypeOf { .. }));
    assert!(matches!(sequence.elements[2], Expression::NewArray { .. }));
}

// ==================== Lambdas ====================

#[test]
fn test_parse_lambda_with_inline_body() {
    if let Expression::Declare(declare) = single("let f = (a: int(0, 9), b: string): string b") {
        if let Expression::Lambda(lambda) = declare.initializer.as_ref() {
            assert!(lambda.generic_parameters.is_empty());
            let names: Vec<&str> = lambda
                .header
                .parameters
                .iter()
                .map(|parameter| parameter.name.value.as_str())
                .collect();
            assert_eq!(names, vec!["a", "b"]);
            assert!(lambda.header.return_type.is_some());
            assert_eq!(name_of(&lambda.result), "b");
        } else {
            panic!("Expected lambda");
        }
    } else {
        panic!("Expected declaration");
    }
}

#[test]
fn test_parse_generic_lambda_with_block() {
    let source = r#"
let f = [T](value: T): T
    let copy = value
    copy
f
"#;
    let sequence = parse(source);
    assert_eq!(sequence.elements.len(), 2);
    if let Expression::Declare(declare) = &sequence.elements[0] {
        if let Expression::Lambda(lambda) = declare.initializer.as_ref() {
            assert_eq!(lambda.generic_parameters, vec!["T".to_string()]);
            if let Expression::Sequence(body) = lambda.result.as_ref() {
                assert_eq!(body.elements.len(), 2);
            } else {
                panic!("Expected block body");
            }
        } else {
            panic!("Expected lambda");
        }
    } else {
        panic!("Expected declaration");
    }
}

#[test]
fn test_parse_nested_blocks() {
    let source = r#"
loop
    loop
        break
    break
"#;
    if let Expression::Loop(outer) = single(source) {
        assert_eq!(outer.elements.len(), 2);
        assert!(matches!(outer.elements[0], Expression::Loop(_)));
        assert!(matches!(outer.elements[1], Expression::Break(_)));
    } else {
        panic!("Expected loop");
    }
}

// ==================== Match ====================

#[test]
fn test_parse_match_cases() {
    let source = r#"
match value
    case 0: "zero"
    case some(let inner):
        side_effect()
        inner
    default: "other"
"#;
    if let Expression::Match(match_) = single(source) {
        assert_eq!(name_of(&match_.input), "value");
        assert_eq!(match_.cases.len(), 3);
        assert!(matches!(match_.cases[0].key, MatchCaseKey::Value(_)));
        assert_eq!(match_.cases[1].action.elements.len(), 2);
        assert_eq!(match_.cases[2].key, MatchCaseKey::Default);
        assert_eq!(match_.cases[2].source, SourceLocation::new(6, 4));
    } else {
        panic!("Expected match");
    }
}

// ==================== Definitions ====================

#[test]
fn test_parse_enum_elements() {
    let source = r#"
enum[T]
    some(T)
    none
"#;
    if let Expression::Enum(definition) = single(source) {
        assert_eq!(definition.generic_parameters, vec!["T".to_string()]);
        assert_eq!(definition.elements.len(), 2);
        assert!(definition.elements[0].state.is_some());
        assert_eq!(definition.elements[1].name.value, "none");
        assert!(definition.elements[1].state.is_none());
    } else {
        panic!("Expected enum");
    }
}

#[test]
fn test_parse_struct_members() {
    let source = r#"
struct
    x: int(0, 9)
    // comment lines are skipped
    label: string
"#;
    if let Expression::Struct(definition) = single(source) {
        let names: Vec<&str> = definition
            .elements
            .iter()
            .map(|element| element.name.value.as_str())
            .collect();
        assert_eq!(names, vec!["x", "label"]);
    } else {
        panic!("Expected struct");
    }
}

#[test]
fn test_parse_empty_struct() {
    if let Expression::Struct(definition) = single("struct") {
        assert!(definition.elements.is_empty());
    } else {
        panic!("Expected struct");
    }
}

#[test]
fn test_parse_interface_methods() {
    let source = r#"
interface
    size(): int(0, 9)
    store(index: int(0, 9), value: string): boolean
"#;
    if let Expression::Interface(definition) = single(source) {
        assert_eq!(definition.methods.len(), 2);
        assert!(definition.methods[0].header.parameters.is_empty());
        assert_eq!(definition.methods[1].header.parameters.len(), 2);
        assert!(definition.methods[1].header.return_type.is_some());
    } else {
        panic!("Expected interface");
    }
}

#[test]
fn test_parse_generic_impl() {
    let source = r#"
impl[T] container[T] for box[T]
    get(): T
        self.content
"#;
    if let Expression::Impl(definition) = single(source) {
        assert_eq!(definition.generic_parameters, vec!["T".to_string()]);
        assert!(matches!(*definition.interface, Expression::GenericInstantiation(_)));
        assert!(matches!(*definition.self_type, Expression::GenericInstantiation(_)));
        assert_eq!(definition.methods.len(), 1);
        assert_eq!(definition.methods[0].name.value, "get");
        assert_eq!(definition.methods[0].body.elements.len(), 1);
    } else {
        panic!("Expected impl");
    }
}

// ==================== Errors ====================

#[test]
fn test_parse_two_expressions_on_one_line() {
    let error = parse_source("a b").unwrap_err();
    assert_eq!(error.location(), SourceLocation::new(0, 2));
    insta::assert_snapshot!(error.to_string(), @"expected end of line, found `b`");
}

#[test]
fn test_parse_unexpected_indentation() {
    let error = parse_source("a\n    b").unwrap_err();
    assert_eq!(
        error,
        ParseError::UnexpectedIndentation {
            location: SourceLocation::new(1, 4)
        }
    );
}

#[test]
fn test_parse_loop_requires_block() {
    let error = parse_source("loop break").unwrap_err();
    insta::assert_snapshot!(error.to_string(), @"expected an indented block, found `break`");
}

#[test]
fn test_parse_integer_out_of_range() {
    let error = parse_source("340282366920938463463374607431768211456").unwrap_err();
    assert_eq!(
        error,
        ParseError::IntegerOutOfRange {
            location: SourceLocation::new(0, 0)
        }
    );
}

#[test]
fn test_parse_unknown_escape() {
    assert!(matches!(
        parse_source(r#""\q""#),
        Err(ParseError::InvalidEscapeSequence { .. })
    ));
}

#[test]
fn test_parse_missing_closing_parenthesis() {
    let error = parse_source("f(1, 2").unwrap_err();
    insta::assert_snapshot!(error.to_string(), @"expected ), found `<eof>`");
}
