//! Removal of functions that the entry function can never reach

use crate::interp::{FunctionPointerValue, Value};
use crate::ir::{Instruction, InstructionSequence};
use crate::program::{CheckedFunction, CheckedProgram};
use crate::types::{FunctionId, FunctionPointerType, Type};

type Visit<'v> = dyn FnMut(&mut FunctionId) + 'v;

/// Keeps function 0, everything it references and every interface method,
/// then renumbers the survivors densely
pub fn remove_unused_functions(program: &mut CheckedProgram) {
    let count = program.functions.len();
    if count == 0 {
        return;
    }
    let mut reachable = vec![false; count];
    let mut pending = vec![FunctionId(0)];
    visit_nominal_types(program, &mut |id| pending.push(*id));
    while let Some(id) = pending.pop() {
        if std::mem::replace(&mut reachable[id.index()], true) {
            continue;
        }
        visit_function(&mut program.functions[id.index()], &mut |id| pending.push(*id));
    }

    let mut renumbered = Vec::with_capacity(count);
    let mut next = 0u32;
    for is_reachable in &reachable {
        if *is_reachable {
            renumbered.push(Some(FunctionId(next)));
            next += 1;
        } else {
            renumbered.push(None);
        }
    }
    let functions = std::mem::take(&mut program.functions);
    program.functions = functions
        .into_iter()
        .zip(&reachable)
        .filter_map(|(function, keep)| keep.then_some(function))
        .collect();

    let mut rewrite = |id: &mut FunctionId| {
        let new = renumbered[id.index()];
        debug_assert!(new.is_some(), "{} is referenced but was removed", id);
        *id = new.unwrap_or(*id);
    };
    for function in &mut program.functions {
        visit_function(function, &mut rewrite);
    }
    visit_nominal_types(program, &mut rewrite);
    tracing::debug!(
        removed = count - program.functions.len(),
        kept = program.functions.len(),
        "removed unused functions"
    );
}

fn visit_function(function: &mut CheckedFunction, visit: &mut Visit<'_>) {
    visit_signature(&mut function.signature, visit);
    visit_sequence(&mut function.body, visit);
}

fn visit_nominal_types(program: &mut CheckedProgram, visit: &mut Visit<'_>) {
    for structure in &mut program.structs {
        for member in &mut structure.members {
            visit_type(&mut member.what, visit);
            if let Some(value) = &mut member.compile_time_value {
                visit_value(value, visit);
            }
        }
    }
    for enumeration in &mut program.enums {
        for state in enumeration.elements.iter_mut().filter_map(|element| element.state.as_mut()) {
            visit_type(state, visit);
        }
    }
    for interface in &mut program.interfaces {
        for method in &mut interface.methods {
            method.parameters.iter_mut().for_each(|parameter| visit_type(parameter, visit));
            visit_type(&mut method.result, visit);
        }
        for entry in &mut interface.implementations {
            visit_type(&mut entry.self_type, visit);
            for method in &mut entry.implementation.methods {
                visit_pointer(method, visit);
            }
        }
    }
}

fn visit_sequence(sequence: &mut InstructionSequence, visit: &mut Visit<'_>) {
    for instruction in &mut sequence.elements {
        match instruction {
            Instruction::Literal {
                value, value_type, ..
            } => {
                visit_value(value, visit);
                visit_type(value_type, visit);
            }
            Instruction::LambdaWithCaptures { lambda, .. } => visit(lambda),
            Instruction::EnumConstruct { state_type, .. } => visit_type(state_type, visit),
            Instruction::NewArray { element_type, .. } => visit_type(element_type, visit),
            Instruction::Loop { body, .. } => visit_sequence(body, visit),
            Instruction::Match(match_) => {
                visit_type(&mut match_.result_type, visit);
                for case in &mut match_.cases {
                    visit_sequence(&mut case.action, visit);
                }
            }
            Instruction::Call(_)
            | Instruction::Return { .. }
            | Instruction::ReadStruct { .. }
            | Instruction::Global(_)
            | Instruction::Break(_)
            | Instruction::Tuple { .. }
            | Instruction::InstantiateStruct { .. }
            | Instruction::GetCaptures(_)
            | Instruction::CurrentFunction(_)
            | Instruction::GetMethod { .. }
            | Instruction::EraseType { .. } => {}
        }
    }
}

fn visit_signature(signature: &mut FunctionPointerType, visit: &mut Visit<'_>) {
    if let Some(result) = &mut signature.result {
        visit_type(result, visit);
    }
    for type_ in signature.parameters.iter_mut().chain(&mut signature.captures) {
        visit_type(type_, visit);
    }
    if let Some(self_type) = &mut signature.self_type {
        visit_type(self_type, visit);
    }
}

fn visit_type(type_: &mut Type, visit: &mut Visit<'_>) {
    match type_ {
        Type::Lambda(function) => visit(function),
        Type::FunctionPointer(signature) => visit_signature(signature, visit),
        Type::Tuple(elements) => elements.iter_mut().for_each(|element| visit_type(element, visit)),
        _ => {}
    }
}

fn visit_pointer(pointer: &mut FunctionPointerValue, visit: &mut Visit<'_>) {
    match pointer {
        FunctionPointerValue::Internal { function, captures } => {
            visit(function);
            captures.iter_mut().for_each(|capture| visit_value(capture, visit));
        }
        FunctionPointerValue::External {
            captures, signature, ..
        } => {
            captures.iter_mut().for_each(|capture| visit_value(capture, visit));
            visit_signature(signature, visit);
        }
    }
}

fn visit_value(value: &mut Value, visit: &mut Visit<'_>) {
    match value {
        Value::FunctionPointer(pointer) => visit_pointer(pointer, visit),
        Value::Structure(elements) | Value::Tuple(elements) => {
            elements.iter_mut().for_each(|element| visit_value(element, visit))
        }
        Value::EnumElement {
            state_type, state, ..
        } => {
            visit_type(state_type, visit);
            if let Some(state) = state {
                visit_value(state, visit);
            }
        }
        Value::Type(type_) => visit_type(type_, visit),
        Value::TypeErased { self_value, .. } => visit_value(self_value, visit),
        Value::Array(array) => {
            let mut array = array.borrow_mut();
            visit_type(&mut array.element_type, visit);
            array.elements.iter_mut().for_each(|element| visit_value(element, visit));
        }
        Value::Unit
        | Value::Integer(_)
        | Value::String(_)
        | Value::EnumConstructor
        | Value::GenericEnum(_)
        | Value::GenericStruct(_)
        | Value::GenericInterface(_)
        | Value::GenericLambda(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::RegisterId;
    use crate::program::{Implementation, ImplementationEntry, Interface, MethodDescription};
    use pretty_assertions::assert_eq;

    fn returning(value: Value, value_type: Type) -> CheckedFunction {
        CheckedFunction {
            signature: FunctionPointerType::new(value_type.clone(), Vec::new()),
            body: vec![
                Instruction::literal(RegisterId(0), value, value_type),
                Instruction::Return {
                    returned_value: RegisterId(0),
                    unit_goes_into: RegisterId(1),
                },
            ]
            .into(),
            register_debug_names: vec![String::new(); 2],
            number_of_registers: 2,
        }
    }

    fn unit_function() -> CheckedFunction {
        returning(Value::Unit, Type::Unit)
    }

    #[test]
    fn unreachable_functions_are_removed_and_ids_rewritten() {
        let mut program = CheckedProgram {
            functions: vec![
                returning(Value::function(FunctionId(2), Vec::new()), Type::Lambda(FunctionId(2))),
                unit_function(),
                unit_function(),
            ],
            ..CheckedProgram::default()
        };
        remove_unused_functions(&mut program);
        assert_eq!(program.functions.len(), 2);
        assert_eq!(
            program.functions[0].body.elements[0],
            Instruction::literal(
                RegisterId(0),
                Value::function(FunctionId(1), Vec::new()),
                Type::Lambda(FunctionId(1))
            )
        );
        assert_eq!(program.functions[0].signature.result, Some(Type::Lambda(FunctionId(1))));
    }

    #[test]
    fn interface_methods_are_always_kept() {
        let mut program = CheckedProgram {
            functions: vec![unit_function(), unit_function(), unit_function()],
            ..CheckedProgram::default()
        };
        program.interfaces.push(Interface {
            methods: vec![MethodDescription {
                name: "m".to_string(),
                parameters: Vec::new(),
                result: Type::Unit,
            }],
            implementations: vec![ImplementationEntry {
                self_type: Type::String,
                implementation: Implementation {
                    methods: vec![FunctionPointerValue::Internal {
                        function: FunctionId(2),
                        captures: Vec::new(),
                    }],
                },
            }],
        });
        remove_unused_functions(&mut program);
        assert_eq!(program.functions.len(), 2);
        assert_eq!(
            program.interfaces[0].implementations[0].implementation.methods[0],
            FunctionPointerValue::Internal {
                function: FunctionId(1),
                captures: Vec::new(),
            }
        );
    }

    #[test]
    fn lambdas_with_captures_keep_their_function() {
        let mut entry = unit_function();
        entry.body.elements.insert(
            0,
            Instruction::LambdaWithCaptures {
                into: RegisterId(1),
                lambda: FunctionId(3),
                captures: vec![RegisterId(0)],
            },
        );
        let mut program = CheckedProgram {
            functions: vec![entry, unit_function(), unit_function(), unit_function()],
            ..CheckedProgram::default()
        };
        remove_unused_functions(&mut program);
        assert_eq!(program.functions.len(), 2);
        assert!(matches!(
            program.functions[0].body.elements[0],
            Instruction::LambdaWithCaptures {
                lambda: FunctionId(1),
                ..
            }
        ));
    }
}
