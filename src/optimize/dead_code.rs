//! Removal of unused registers and the instructions that only write them

use crate::ir::{Instruction, InstructionSequence, MatchCaseKind, RegisterId};
use crate::program::{CheckedFunction, CheckedProgram};

/// Repeats [`remove_one_layer`] on every function until nothing changes
pub fn remove_dead_code(program: &mut CheckedProgram) {
    for (index, function) in program.functions.iter_mut().enumerate() {
        let before = function.number_of_registers;
        let mut rounds = 0;
        while remove_one_layer(function) {
            rounds += 1;
        }
        tracing::trace!(
            function = index,
            rounds,
            before,
            after = function.number_of_registers,
            "removed dead code"
        );
    }
}

/// Returns whether a register was dropped
fn remove_one_layer(function: &mut CheckedFunction) -> bool {
    let count = function.number_of_registers as usize;
    if count == 0 {
        return false;
    }
    let mut used = vec![false; count];
    let inputs = function.input_register_count().min(count);
    used[..inputs].fill(true);
    mark_sequence(&function.body, &mut used);

    let mut renumbered = Vec::with_capacity(count);
    let mut names = Vec::with_capacity(count);
    let mut next = 0u32;
    for (register, is_used) in used.iter().enumerate() {
        if *is_used {
            renumbered.push(Some(RegisterId(next)));
            names.push(
                function
                    .register_debug_names
                    .get(register)
                    .cloned()
                    .unwrap_or_default(),
            );
            next += 1;
        } else {
            renumbered.push(None);
        }
    }
    let removed_any = next as usize != count;
    function.number_of_registers = next;
    function.register_debug_names = names;
    rewrite_sequence(&mut function.body, &renumbered);
    removed_any
}

fn mark_sequence(sequence: &InstructionSequence, used: &mut [bool]) {
    for instruction in sequence.iter() {
        match instruction {
            Instruction::Call(call) => {
                mark(used, call.callee);
                mark_all(used, &call.arguments);
                // calls stay even when their result is unused
                mark(used, call.result);
            }
            Instruction::Return {
                returned_value,
                unit_goes_into,
            } => {
                mark(used, *returned_value);
                mark(used, *unit_goes_into);
            }
            Instruction::ReadStruct { from_object, .. } => mark(used, *from_object),
            Instruction::Global(_)
            | Instruction::Literal { .. }
            | Instruction::GetCaptures(_)
            | Instruction::CurrentFunction(_)
            | Instruction::NewArray { .. } => {}
            Instruction::Loop {
                unit_goes_into,
                body,
            } => {
                mark(used, *unit_goes_into);
                mark_sequence(body, used);
            }
            Instruction::Break(into) => mark(used, *into),
            Instruction::Tuple { elements, .. } => mark_all(used, elements),
            Instruction::InstantiateStruct { arguments, .. } => mark_all(used, arguments),
            Instruction::EnumConstruct { state, .. } => mark(used, *state),
            Instruction::Match(match_) => {
                // a match may return or break even when its result is unused
                mark(used, match_.result);
                mark(used, match_.key);
                for case in &match_.cases {
                    match case.kind {
                        MatchCaseKind::Value(key) => mark(used, key),
                        MatchCaseKind::StatefulEnum { where_, .. } => mark(used, where_),
                        MatchCaseKind::Default => {}
                    }
                    if let Some(value) = case.value {
                        mark(used, value);
                    }
                    mark_sequence(&case.action, used);
                }
            }
            Instruction::LambdaWithCaptures { captures, .. } => mark_all(used, captures),
            Instruction::GetMethod { from, .. } => mark(used, *from),
            Instruction::EraseType { self_, .. } => mark(used, *self_),
        }
    }
}

fn mark(used: &mut [bool], register: RegisterId) {
    used[register.index()] = true;
}

fn mark_all(used: &mut [bool], registers: &[RegisterId]) {
    for register in registers {
        mark(used, *register);
    }
}

/// A register that is read somewhere, so it always survives
fn renumber_read(register: &mut RegisterId, renumbered: &[Option<RegisterId>]) {
    let kept = renumber(register, renumbered);
    debug_assert!(kept, "{} is read but was removed", register);
}

/// Returns false when the register was removed
fn renumber(register: &mut RegisterId, renumbered: &[Option<RegisterId>]) -> bool {
    match renumbered[register.index()] {
        Some(new) => {
            *register = new;
            true
        }
        None => false,
    }
}

fn rewrite_sequence(sequence: &mut InstructionSequence, renumbered: &[Option<RegisterId>]) {
    sequence
        .elements
        .retain_mut(|instruction| rewrite_instruction(instruction, renumbered));
}

/// Renumbers the registers of one instruction; false means it can be dropped
fn rewrite_instruction(instruction: &mut Instruction, renumbered: &[Option<RegisterId>]) -> bool {
    let read = |register: &mut RegisterId| renumber_read(register, renumbered);
    let write = |register: &mut RegisterId| renumber(register, renumbered);
    match instruction {
        Instruction::Call(call) => {
            read(&mut call.callee);
            call.arguments.iter_mut().for_each(read);
            read(&mut call.result);
            true
        }
        Instruction::Return {
            returned_value,
            unit_goes_into,
        } => {
            read(returned_value);
            read(unit_goes_into);
            true
        }
        Instruction::ReadStruct {
            from_object, into, ..
        } => {
            read(from_object);
            write(into)
        }
        Instruction::Global(into)
        | Instruction::GetCaptures(into)
        | Instruction::CurrentFunction(into)
        | Instruction::Literal { into, .. }
        | Instruction::NewArray { into, .. } => write(into),
        Instruction::Loop {
            unit_goes_into,
            body,
        } => {
            rewrite_sequence(body, renumbered);
            read(unit_goes_into);
            !body.is_empty()
        }
        Instruction::Break(into) => {
            read(into);
            true
        }
        Instruction::Tuple { elements, result } => {
            elements.iter_mut().for_each(read);
            write(result)
        }
        Instruction::InstantiateStruct {
            into, arguments, ..
        } => {
            arguments.iter_mut().for_each(read);
            write(into)
        }
        Instruction::EnumConstruct { into, state, .. } => {
            read(state);
            write(into)
        }
        Instruction::Match(match_) => {
            read(&mut match_.key);
            for case in &mut match_.cases {
                match &mut case.kind {
                    MatchCaseKind::Value(key) => read(key),
                    MatchCaseKind::StatefulEnum { where_, .. } => read(where_),
                    MatchCaseKind::Default => {}
                }
                if let Some(value) = &mut case.value {
                    read(value);
                }
                rewrite_sequence(&mut case.action, renumbered);
            }
            read(&mut match_.result);
            true
        }
        Instruction::LambdaWithCaptures { into, captures, .. } => {
            captures.iter_mut().for_each(read);
            write(into)
        }
        Instruction::GetMethod { from, into, .. } => {
            read(from);
            write(into)
        }
        Instruction::EraseType { self_, into, .. } => {
            read(self_);
            write(into)
        }
    }
}
