//! `match` on enumerations, integers and strings

use crate::ast::{Expression, Identifier, Match, MatchCaseKey};
use crate::common::SourceLocation;
use crate::diagnostics::SemanticErrorKind;
use crate::interp::Value;
use crate::ir::{Instruction, InstructionSequence, MatchCase, MatchCaseKind, MatchInstruction, RegisterId};
use crate::types::{EnumId, IntegerRange, IntervalSet, Type};

use super::state::{Binding, Slot};
use super::{Checker, Completion, Evaluated, Evaluation, Expectation, Failed};

/// Values of the scrutinee that no case has claimed yet
enum Coverage {
    Enumeration { id: EnumId, handled: Vec<bool> },
    Integer(IntervalSet),
    String(Vec<String>),
}

enum ArmKey {
    Value { register: RegisterId, value: Value },
    StatefulEnum { which: u32, where_: RegisterId },
    Default,
}

struct CheckedArm {
    key: ArmKey,
    action: InstructionSequence,
    evaluated: Evaluated,
    source: SourceLocation,
}

/// Common type of two match arms
fn merge_types(current: &Type, next: &Type) -> Option<Type> {
    if current == next {
        return Some(current.clone());
    }
    let (a, b) = current.as_integer_range().zip(next.as_integer_range())?;
    Some(Type::IntegerRange(a.combine(&b)))
}

impl Checker<'_> {
    pub(crate) fn evaluate_match(
        &mut self,
        body: &mut InstructionSequence,
        match_: &Match,
        expected: Expectation,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let input = self.evaluate_expression(body, &match_.input, None, Expectation::none())?;
        if input.completion != Completion::Value {
            return Ok(input);
        }
        let mut coverage = match &input.type_ {
            Type::Enumeration(id) => {
                let size = self.program.enumeration(*id).elements.len();
                if size == 0 {
                    self.report(SemanticErrorKind::MatchUnsupported, match_.source);
                    return Err(Failed);
                }
                Coverage::Enumeration {
                    id: *id,
                    handled: vec![false; size],
                }
            }
            Type::IntegerRange(range) => Coverage::Integer(IntervalSet::new(*range)),
            Type::String => Coverage::String(Vec::new()),
            _ => {
                self.report(SemanticErrorKind::TypeMismatch, match_.source);
                return Err(Failed);
            }
        };

        let mut arms = Vec::with_capacity(match_.cases.len());
        let mut has_default = false;
        for case in &match_.cases {
            let locals = self.local_count();
            let key = match &case.key {
                MatchCaseKey::Default => {
                    if has_default {
                        self.report(SemanticErrorKind::DuplicateDefaultCase, case.source);
                        return Err(Failed);
                    }
                    has_default = true;
                    Ok(ArmKey::Default)
                }
                MatchCaseKey::Value(key) => {
                    self.check_match_key(body, key, &input.type_, &mut coverage)
                }
            };
            let checked = key.and_then(|key| {
                let mut action = InstructionSequence::new();
                let evaluated = self.check_sequence(&mut action, &case.action, expected.clone())?;
                Ok(CheckedArm {
                    key,
                    action,
                    evaluated,
                    source: case
                        .action
                        .elements
                        .first()
                        .map_or(case.action.source, Expression::source_begin),
                })
            });
            self.truncate_locals(locals);
            arms.push(checked?);
        }

        // `default` only completes string matches
        let case_count = match_.cases.len() as u128;
        let is_exhaustive = match &coverage {
            Coverage::Enumeration { handled, .. } => {
                !has_default
                    && case_count == handled.len() as u128
                    && handled.iter().all(|handled| *handled)
            }
            Coverage::Integer(unhandled) => {
                let size = input.type_.as_integer_range().and_then(|range| range.size());
                !has_default && unhandled.is_empty() && size == Some(case_count)
            }
            Coverage::String(_) => {
                if !has_default {
                    self.report(SemanticErrorKind::MissingDefault, match_.source);
                    return Err(Failed);
                }
                true
            }
        };
        if !is_exhaustive {
            self.report(SemanticErrorKind::MissingMatchCase, match_.source);
            return Err(Failed);
        }

        let mut result_type: Option<Type> = None;
        for arm in &arms {
            if arm.evaluated.completion != Completion::Value {
                continue;
            }
            let merged = match &result_type {
                None => Some(arm.evaluated.type_.clone()),
                Some(current) => merge_types(current, &arm.evaluated.type_),
            };
            if merged.is_none() {
                self.report(SemanticErrorKind::TypeMismatch, arm.source);
                return Err(Failed);
            }
            result_type = merged;
        }
        let result_type = result_type.unwrap_or(Type::Unit);
        let completion = if arms.iter().all(|arm| arm.evaluated.completion != Completion::Value) {
            Completion::Return
        } else {
            Completion::Value
        };

        if let Some(value) = Self::chosen_arm_value(&input, &arms) {
            self.restore(body, before);
            let mut literal = self.emit_literal(body, value, result_type);
            literal.completion = completion;
            return Ok(literal);
        }

        let mut cases = Vec::with_capacity(arms.len());
        let mut default_case = None;
        for arm in arms {
            let value = (arm.evaluated.completion == Completion::Value).then_some(arm.evaluated.where_);
            let kind = match arm.key {
                ArmKey::Value { register, .. } => MatchCaseKind::Value(register),
                ArmKey::StatefulEnum { which, where_ } => MatchCaseKind::StatefulEnum {
                    element: which,
                    where_,
                },
                ArmKey::Default => {
                    default_case = Some(MatchCase {
                        kind: MatchCaseKind::Default,
                        action: arm.action,
                        value,
                    });
                    continue;
                }
            };
            cases.push(MatchCase {
                kind,
                action: arm.action,
                value,
            });
        }
        cases.extend(default_case);
        let result = self.allocate_register();
        body.push(Instruction::Match(MatchInstruction {
            key: input.where_,
            cases,
            result,
            result_type: result_type.clone(),
        }));
        Ok(Evaluated {
            completion,
            where_: result,
            type_: result_type,
            compile_time_value: None,
            is_pure: false,
        })
    }

    /// The value of the whole match when the scrutinee is known and the arm it
    /// selects is a pure compile-time value
    fn chosen_arm_value(input: &Evaluated, arms: &[CheckedArm]) -> Option<Value> {
        let scrutinee = input.compile_time_value.as_ref().filter(|_| input.is_pure)?;
        let by_key = arms.iter().find(|arm| match &arm.key {
            ArmKey::Value { value, .. } => value == scrutinee,
            _ => false,
        });
        let chosen = match by_key {
            Some(arm) => arm,
            None => {
                let binds_payload = arms.iter().any(|arm| match (&arm.key, scrutinee) {
                    (ArmKey::StatefulEnum { which, .. }, Value::EnumElement { which: element, .. }) => {
                        which == element
                    }
                    _ => false,
                });
                if binds_payload {
                    return None;
                }
                arms.iter().find(|arm| matches!(arm.key, ArmKey::Default))?
            }
        };
        if chosen.evaluated.completion != Completion::Value || !chosen.evaluated.is_pure {
            return None;
        }
        chosen.evaluated.compile_time_value.clone()
    }

    fn check_match_key(
        &mut self,
        body: &mut InstructionSequence,
        key: &Expression,
        input_type: &Type,
        coverage: &mut Coverage,
    ) -> Result<ArmKey, Failed> {
        let location = key.source_begin();
        if let Coverage::Enumeration { id, handled } = coverage {
            if let Some((which, placeholder)) = self.check_for_pattern(body, key, *id)? {
                if std::mem::replace(&mut handled[which as usize], true) {
                    self.report(SemanticErrorKind::DuplicateMatchCase, location);
                    return Err(Failed);
                }
                let state_type = self.program.enumeration(*id).elements[which as usize]
                    .state
                    .clone()
                    .unwrap_or(Type::Unit);
                return self.bind_placeholder(placeholder, state_type, which);
            }
        }

        let evaluated = self
            .evaluate_expression(body, key, None, Expectation::exact(input_type.clone()))?
            .into_value()?;
        let compatible = match (input_type, &evaluated.type_) {
            (Type::IntegerRange(_), Type::IntegerRange(_)) => true,
            (expected, actual) => expected == actual,
        };
        if !compatible {
            self.report(SemanticErrorKind::TypeMismatch, location);
            return Err(Failed);
        }
        let Some(value) = evaluated.compile_time_value else {
            self.report(SemanticErrorKind::ExpectedCompileTimeValue, location);
            return Err(Failed);
        };
        let is_new = match (coverage, &value) {
            (
                Coverage::Enumeration { handled, .. },
                Value::EnumElement {
                    which, state: None, ..
                },
            ) => !std::mem::replace(&mut handled[*which as usize], true),
            (Coverage::Enumeration { .. }, _) => {
                self.report(SemanticErrorKind::MatchUnsupported, location);
                return Err(Failed);
            }
            (Coverage::Integer(unhandled), Value::Integer(integer)) => {
                let claimed = evaluated
                    .type_
                    .as_integer_range()
                    .unwrap_or(IntegerRange::single(*integer));
                unhandled.remove(claimed)
            }
            (Coverage::String(seen), Value::String(string)) => {
                if seen.contains(string) {
                    false
                } else {
                    seen.push(string.clone());
                    true
                }
            }
            _ => {
                self.report(SemanticErrorKind::TypeMismatch, location);
                return Err(Failed);
            }
        };
        if !is_new {
            self.report(SemanticErrorKind::DuplicateMatchCase, location);
            return Err(Failed);
        }
        Ok(ArmKey::Value {
            register: evaluated.where_,
            value,
        })
    }

    /// Recognizes `element(let name)`; returns the element index and the name
    fn check_for_pattern<'k>(
        &mut self,
        body: &mut InstructionSequence,
        key: &'k Expression,
        enumeration: EnumId,
    ) -> Result<Option<(u32, &'k Identifier)>, Failed> {
        let Expression::Call(call) = key else {
            return Ok(None);
        };
        let [Expression::Placeholder(placeholder)] = call.arguments.as_slice() else {
            return Ok(None);
        };
        let before = self.checkpoint(body);
        let callee = self.evaluate_expression(
            body,
            &call.callee,
            None,
            Expectation::EnumConstructors(enumeration),
        );
        self.restore(body, before);
        match callee?.type_ {
            Type::EnumConstructor {
                enumeration: found,
                which,
            } => {
                if found != enumeration {
                    self.report(SemanticErrorKind::TypeMismatch, key.source_begin());
                    return Err(Failed);
                }
                Ok(Some((which, placeholder)))
            }
            _ => Ok(None),
        }
    }

    fn bind_placeholder(
        &mut self,
        placeholder: &Identifier,
        state_type: Type,
        which: u32,
    ) -> Result<ArmKey, Failed> {
        if self.frame().find_local(&placeholder.value).is_some() {
            self.report(SemanticErrorKind::DeclarationWithExistingName, placeholder.source);
            return Err(Failed);
        }
        let where_ = self.allocate_register();
        self.add_local(
            &placeholder.value,
            Binding::Initialized(Slot {
                type_: state_type,
                compile_time_value: None,
                where_,
            }),
        );
        self.define_debug_name(where_, &placeholder.value);
        Ok(ArmKey::StatefulEnum { which, where_ })
    }
}
