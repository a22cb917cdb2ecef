//! Register IR produced by the checker
//!
//! Functions are flat sequences of instructions over a per-function register
//! file. Only `loop` and `match` nest sequences.

pub mod instruction;

pub use instruction::*;

use crate::program::CheckedProgram;
use std::fmt::Write;

/// Human readable listing of a whole program
pub fn print_program(program: &CheckedProgram) -> String {
    let mut out = String::new();
    for (index, function) in program.functions.iter().enumerate() {
        let _ = write!(out, "function {} (", index);
        for (i, parameter) in function.signature.parameters.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}", parameter);
        }
        out.push(')');
        if let Some(result) = &function.signature.result {
            let _ = write!(out, ": {}", result);
        }
        if !function.signature.captures.is_empty() {
            out.push_str(" captures {");
            for (i, capture) in function.signature.captures.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", capture);
            }
            out.push('}');
        }
        let _ = writeln!(out, " registers {}", function.number_of_registers);
        print_sequence(&mut out, &function.body, &function.register_debug_names, 1);
    }
    out
}

/// Appends one line per instruction, nested sequences indented
pub fn print_sequence(
    out: &mut String,
    sequence: &InstructionSequence,
    debug_names: &[String],
    depth: usize,
) {
    for instruction in sequence.iter() {
        print_instruction(out, instruction, debug_names, depth);
    }
}

fn register(debug_names: &[String], id: RegisterId) -> String {
    match debug_names.get(id.index()) {
        Some(name) if !name.is_empty() => format!("{}({})", id, name),
        _ => id.to_string(),
    }
}

fn registers(debug_names: &[String], ids: &[RegisterId]) -> String {
    ids.iter()
        .map(|id| register(debug_names, *id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_instruction(out: &mut String, instruction: &Instruction, names: &[String], depth: usize) {
    let indent = "    ".repeat(depth);
    let r = |id: RegisterId| register(names, id);
    let _ = match instruction {
        Instruction::Call(call) => writeln!(
            out,
            "{}{} = call {}({})",
            indent,
            r(call.result),
            r(call.callee),
            registers(names, &call.arguments)
        ),
        Instruction::Return {
            returned_value,
            unit_goes_into,
        } => writeln!(
            out,
            "{}{} = return {}",
            indent,
            r(*unit_goes_into),
            r(*returned_value)
        ),
        Instruction::ReadStruct {
            from_object,
            member,
            into,
        } => writeln!(
            out,
            "{}{} = read_struct {}.{}",
            indent,
            r(*into),
            r(*from_object),
            member
        ),
        Instruction::Global(into) => writeln!(out, "{}{} = global", indent, r(*into)),
        Instruction::Loop {
            unit_goes_into,
            body,
        } => {
            let _ = writeln!(out, "{}{} = loop", indent, r(*unit_goes_into));
            print_sequence(out, body, names, depth + 1);
            Ok(())
        }
        Instruction::Break(into) => writeln!(out, "{}{} = break", indent, r(*into)),
        Instruction::Literal {
            into,
            value,
            value_type,
        } => writeln!(
            out,
            "{}{} = literal {}: {}",
            indent,
            r(*into),
            value,
            value_type
        ),
        Instruction::Tuple { elements, result } => writeln!(
            out,
            "{}{} = tuple {{{}}}",
            indent,
            r(*result),
            registers(names, elements)
        ),
        Instruction::InstantiateStruct {
            into,
            structure,
            arguments,
        } => writeln!(
            out,
            "{}{} = instantiate_struct#{} {{{}}}",
            indent,
            r(*into),
            structure,
            registers(names, arguments)
        ),
        Instruction::EnumConstruct {
            into,
            enumeration,
            which,
            state,
            ..
        } => writeln!(
            out,
            "{}{} = enum_construct#{}.{}({})",
            indent,
            r(*into),
            enumeration,
            which,
            r(*state)
        ),
        Instruction::Match(match_) => {
            let _ = writeln!(
                out,
                "{}{} = match {}: {}",
                indent,
                r(match_.result),
                r(match_.key),
                match_.result_type
            );
            for case in &match_.cases {
                let _ = match &case.kind {
                    MatchCaseKind::Value(key) => writeln!(out, "{}    case {}:", indent, r(*key)),
                    MatchCaseKind::StatefulEnum { element, where_ } => writeln!(
                        out,
                        "{}    case element#{}(let {}):",
                        indent,
                        element,
                        r(*where_)
                    ),
                    MatchCaseKind::Default => writeln!(out, "{}    default:", indent),
                };
                print_sequence(out, &case.action, names, depth + 2);
                if let Some(value) = case.value {
                    let _ = writeln!(out, "{}        -> {}", indent, r(value));
                }
            }
            Ok(())
        }
        Instruction::GetCaptures(into) => writeln!(out, "{}{} = get_captures", indent, r(*into)),
        Instruction::LambdaWithCaptures {
            into,
            lambda,
            captures,
        } => writeln!(
            out,
            "{}{} = lambda_with_captures function#{} [{}]",
            indent,
            r(*into),
            lambda,
            registers(names, captures)
        ),
        Instruction::CurrentFunction(into) => {
            writeln!(out, "{}{} = current_function", indent, r(*into))
        }
        Instruction::GetMethod {
            interface,
            from,
            method,
            into,
        } => writeln!(
            out,
            "{}{} = get_method interface#{}.{} on {}",
            indent,
            r(*into),
            interface,
            method,
            r(*from)
        ),
        Instruction::EraseType {
            self_,
            into,
            implementation,
        } => writeln!(
            out,
            "{}{} = erase_type {} as interface#{} impl {}",
            indent,
            r(*into),
            r(*self_),
            implementation.interface,
            implementation.index
        ),
        Instruction::NewArray { into, element_type } => writeln!(
            out,
            "{}{} = new_array {}",
            indent,
            r(*into),
            element_type
        ),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::value::Value;
    use crate::types::Type;

    #[test]
    fn literal_line() {
        let mut out = String::new();
        let sequence = InstructionSequence::from(vec![Instruction::literal(
            RegisterId(0),
            Value::Integer(2),
            Type::integer(2, 2),
        )]);
        print_sequence(&mut out, &sequence, &["two".to_string()], 0);
        insta::assert_snapshot!(out.trim_end(), @"r0(two) = literal 2: int(2, 2)");
    }
}
