//! Names, calls, operators, control flow and the other basic expressions

use crate::ast::{AccessStructure, Binary, BinaryOperator, Call, Declare, Expression, Identifier, Sequence};
use crate::common::SourceLocation;
use crate::diagnostics::SemanticErrorKind;
use crate::interp::{FunctionPointerValue, InterpretError, Interpreter, Value};
use crate::ir::{CallInstruction, Instruction, InstructionSequence, RegisterId};
use crate::stdlib::{global_members, BOOLEAN, GLOBALS};
use crate::types::{FunctionPointerType, Type};

use super::state::{Binding, CaptureAddress, Checkpoint, LocalLookup, Slot};
use super::{Checker, Completion, Evaluated, Evaluation, Expectation, Failed};

fn boolean() -> Type {
    Type::Enumeration(BOOLEAN)
}

/// Parameters and result of something callable
struct CallableSignature {
    parameters: Vec<Type>,
    /// `None` for functions that never return
    result: Option<Type>,
}

impl Checker<'_> {
    // ==================== NAMES ====================

    pub(crate) fn read_variable(
        &mut self,
        body: &mut InstructionSequence,
        identifier: &Identifier,
        expected: &Expectation,
    ) -> Evaluation {
        let name = identifier.value.as_str();
        let before = self.checkpoint(body);
        let frame = self.current_frame_index();
        match self.read_local_variable(frame, name) {
            LocalLookup::AtAddress {
                address: CaptureAddress::Local(where_),
                type_,
                compile_time_value,
            } => return Ok(Evaluated::value(where_, type_, compile_time_value, true)),
            LocalLookup::AtAddress {
                address: CaptureAddress::Capture(index),
                type_,
                ..
            } => {
                let where_ = self.read_capture(body, index);
                return Ok(Evaluated::value(where_, type_, None, true));
            }
            LocalLookup::CompileTime { type_, value } => {
                return Ok(self.emit_literal(body, value, type_));
            }
            LocalLookup::Forbidden => {
                self.report(SemanticErrorKind::CannotCaptureRuntimeVariable, identifier.source);
                return Err(Failed);
            }
            LocalLookup::Unknown => {}
        }

        if let Some(Type::Enumeration(id)) = expected.exact_type() {
            let id = *id;
            let enumeration = self.program.enumeration(id);
            if let Some(which) = enumeration.element_index(name) {
                if enumeration.elements[which].state.is_none() {
                    return Ok(self.emit_literal(
                        body,
                        Value::enum_element(which as u32),
                        Type::Enumeration(id),
                    ));
                }
            }
        }
        if let Expectation::EnumConstructors(id) = expected {
            let enumeration = self.program.enumeration(*id);
            if let Some(which) = enumeration.element_index(name) {
                if enumeration.elements[which].state.is_some() {
                    let type_ = Type::EnumConstructor {
                        enumeration: *id,
                        which: which as u32,
                    };
                    return Ok(self.emit_literal(body, Value::EnumConstructor, type_));
                }
            }
        }
        if let Some(member) = self.program.structure(GLOBALS).member_index(name) {
            return Ok(self.read_global(body, member as u32));
        }
        self.restore(body, before);
        self.report(SemanticErrorKind::UnknownElement, identifier.source);
        Err(Failed)
    }

    /// Loads capture `index` of the function being checked
    pub(crate) fn read_capture(&mut self, body: &mut InstructionSequence, index: u32) -> RegisterId {
        let captures = self.allocate_register();
        body.push(Instruction::GetCaptures(captures));
        let into = self.allocate_register();
        body.push(Instruction::ReadStruct {
            from_object: captures,
            member: index,
            into,
        });
        into
    }

    fn read_global(&mut self, body: &mut InstructionSequence, member: u32) -> Evaluated {
        let description = &self.program.structure(GLOBALS).members[member as usize];
        let type_ = description.what.clone();
        if let Some(value) = description.compile_time_value.clone() {
            return self.emit_literal(body, value, type_);
        }
        let global = self.allocate_register();
        body.push(Instruction::Global(global));
        let into = self.allocate_register();
        body.push(Instruction::ReadStruct {
            from_object: global,
            member,
            into,
        });
        Evaluated::value(into, type_, None, true)
    }

    // ==================== CONTROL FLOW ====================

    pub(crate) fn evaluate_return(
        &mut self,
        body: &mut InstructionSequence,
        value: &Expression,
    ) -> Evaluation {
        let expected = Expectation::Exact(self.frame().return_type.clone());
        let evaluated = self.evaluate_expression(body, value, None, expected)?;
        if evaluated.completion != Completion::Value {
            return Ok(evaluated);
        }
        let returned = match self.frame().return_type.clone() {
            Some(previous) => {
                let may_widen = !self.frame().return_type_is_declared;
                let converted =
                    self.convert(body, evaluated, &previous, may_widen, value.source_begin())?;
                self.frame_mut().return_type = Some(converted.type_.clone());
                converted
            }
            None => {
                self.frame_mut().return_type = Some(evaluated.type_.clone());
                evaluated
            }
        };
        let unit_goes_into = self.allocate_register();
        body.push(Instruction::Return {
            returned_value: returned.where_,
            unit_goes_into,
        });
        Ok(Evaluated {
            completion: Completion::Return,
            where_: unit_goes_into,
            type_: Type::Unit,
            compile_time_value: None,
            is_pure: false,
        })
    }

    pub(crate) fn evaluate_loop(
        &mut self,
        body: &mut InstructionSequence,
        sequence: &Sequence,
    ) -> Evaluation {
        let was_in_loop = std::mem::replace(&mut self.frame_mut().is_in_loop, true);
        let mut loop_body = InstructionSequence::new();
        let checked = self.check_sequence(&mut loop_body, sequence, Expectation::none());
        self.frame_mut().is_in_loop = was_in_loop;
        checked?;
        let unit_goes_into = self.allocate_register();
        body.push(Instruction::Loop {
            unit_goes_into,
            body: loop_body,
        });
        Ok(Evaluated::value(unit_goes_into, Type::Unit, None, true))
    }

    pub(crate) fn evaluate_break(
        &mut self,
        body: &mut InstructionSequence,
        source: SourceLocation,
    ) -> Evaluation {
        if !self.frame().is_in_loop {
            self.report(SemanticErrorKind::BreakOutsideOfLoop, source);
            return Err(Failed);
        }
        let into = self.allocate_register();
        body.push(Instruction::Break(into));
        Ok(Evaluated::value(into, Type::Unit, None, false))
    }

    /// Checks the elements in order. Only the last one receives `expected`;
    /// locals declared inside go out of scope at the end.
    pub(crate) fn check_sequence(
        &mut self,
        body: &mut InstructionSequence,
        sequence: &Sequence,
        expected: Expectation,
    ) -> Evaluation {
        let Some(last) = sequence.elements.len().checked_sub(1) else {
            return Ok(self.make_unit(body));
        };
        let locals = self.local_count();
        let mut is_pure = true;
        let mut completion = Completion::Value;
        let mut result = Err(Failed);
        for (index, element) in sequence.elements.iter().enumerate() {
            let expectation = if index == last {
                expected.clone()
            } else {
                Expectation::none()
            };
            result = self.evaluate_expression(body, element, None, expectation);
            if let Ok(evaluated) = &result {
                is_pure &= evaluated.is_pure;
                if completion == Completion::Value {
                    completion = evaluated.completion;
                }
            }
        }
        self.truncate_locals(locals);
        let mut evaluated = result?;
        evaluated.completion = completion;
        evaluated.is_pure = is_pure;
        Ok(evaluated)
    }

    pub(crate) fn evaluate_declare(
        &mut self,
        body: &mut InstructionSequence,
        declare: &Declare,
    ) -> Evaluation {
        let name = declare.name.value.as_str();
        let is_possible = self.frame().find_local(name).is_none();
        if is_possible {
            self.add_local(name, Binding::Declared);
        } else {
            self.report(SemanticErrorKind::DeclarationWithExistingName, declare.name.source);
        }

        let declared_type = match &declare.optional_type {
            Some(type_expression) => {
                let before = self.checkpoint(body);
                let type_ = self.expect_compile_time_type(body, type_expression);
                self.restore(body, before);
                type_.ok()
            }
            None => None,
        };

        let before = self.checkpoint(body);
        let initializer = self
            .evaluate_expression(
                body,
                &declare.initializer,
                is_possible.then_some(name),
                Expectation::Exact(declared_type.clone()),
            )?
            .into_value()?;
        let mut initializer = match &declared_type {
            Some(type_) => self.convert(
                body,
                initializer,
                type_,
                false,
                declare.initializer.source_begin(),
            )?,
            None => initializer,
        };
        if let (Some(value), true) = (initializer.compile_time_value.clone(), initializer.is_pure) {
            self.restore(body, before);
            initializer = self.emit_literal(body, value, initializer.type_);
        }

        if is_possible {
            self.define_debug_name(initializer.where_, name);
            if let Some(index) = self.frame().find_local(name) {
                self.frame_mut().locals[index].binding = Binding::Initialized(Slot {
                    type_: initializer.type_,
                    compile_time_value: initializer.compile_time_value,
                    where_: initializer.where_,
                });
            }
        }
        let mut unit = self.make_unit(body);
        unit.is_pure = false;
        Ok(unit)
    }

    // ==================== CALLS ====================

    fn callable_signature(&self, callee: &Type) -> Option<CallableSignature> {
        match callee {
            Type::Lambda(id) => {
                let signature = &self.program.function(*id).signature;
                Some(CallableSignature {
                    parameters: signature.parameters.clone(),
                    result: signature.result.clone(),
                })
            }
            Type::FunctionPointer(signature) => Some(CallableSignature {
                parameters: signature.parameters.clone(),
                result: signature.result.clone(),
            }),
            Type::EnumConstructor { enumeration, which } => {
                let element = &self.program.enumeration(*enumeration).elements[*which as usize];
                Some(CallableSignature {
                    parameters: element.state.iter().cloned().collect(),
                    result: Some(Type::Enumeration(*enumeration)),
                })
            }
            _ => None,
        }
    }

    /// Runs a function with the compile-time interpreter
    pub(crate) fn interpret_call(
        &mut self,
        callee: &FunctionPointerValue,
        arguments: Vec<Value>,
    ) -> Result<Value, InterpretError> {
        let limits = self.config.interpreter_limits();
        Interpreter::new(&self.program, &self.globals, limits, &mut self.counters)
            .call_function(callee, None, arguments)
    }

    /// Reports resource exhaustion of the compile-time interpreter
    pub(crate) fn report_interpret_error(&mut self, error: &InterpretError, location: SourceLocation) {
        let kind = match error {
            InterpretError::OutOfMemory => SemanticErrorKind::CompileTimeMemoryLimitReached,
            InterpretError::StackOverflow => SemanticErrorKind::StackOverflow,
            InterpretError::InstructionLimitReached => SemanticErrorKind::InstructionLimitReached,
            InterpretError::Unavailable | InterpretError::Failed(_) => {
                tracing::trace!(%error, %location, "call not folded");
                return;
            }
        };
        self.report(kind, location);
    }

    fn fold_call(
        &mut self,
        callee: &Value,
        callee_type: &Type,
        arguments: Vec<Value>,
        location: SourceLocation,
    ) -> Option<Value> {
        if let Type::EnumConstructor { enumeration, which } = callee_type {
            let state_type = self.program.enumeration(*enumeration).elements[*which as usize]
                .state
                .clone()?;
            let state = arguments.into_iter().next()?;
            return Some(Value::enum_element_with_state(*which, state_type, state));
        }
        let Value::FunctionPointer(pointer) = callee else {
            return None;
        };
        if let FunctionPointerValue::Internal { function, .. } = pointer {
            if self.program.function(*function).number_of_registers == 0 {
                return None;
            }
        }
        match self.interpret_call(pointer, arguments) {
            Ok(value) if !value.is_mutable() => Some(value),
            Ok(_) => None,
            Err(error) => {
                self.report_interpret_error(&error, location);
                None
            }
        }
    }

    pub(crate) fn evaluate_call(
        &mut self,
        body: &mut InstructionSequence,
        call: &Call,
        expected: &Expectation,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let callee_expectation = match expected.exact_type() {
            Some(Type::Enumeration(id)) => Expectation::EnumConstructors(*id),
            _ => Expectation::none(),
        };
        let callee = self
            .evaluate_expression(body, &call.callee, None, callee_expectation)?
            .into_value()?;
        let Some(signature) = self.callable_signature(&callee.type_) else {
            self.restore(body, before);
            self.report(SemanticErrorKind::NotCallable, call.callee.source_begin());
            return Err(Failed);
        };

        let mut arguments = Vec::with_capacity(signature.parameters.len());
        let mut compile_time_arguments = Some(Vec::with_capacity(signature.parameters.len()));
        let mut is_pure = callee.is_pure;
        for (index, argument) in call.arguments.iter().enumerate() {
            let Some(parameter) = signature.parameters.get(index) else {
                self.report(SemanticErrorKind::ExtraneousArgument, argument.source_begin());
                break;
            };
            let converted = self
                .evaluate_expression(body, argument, None, Expectation::exact(parameter.clone()))
                .and_then(Evaluated::into_value)
                .and_then(|evaluated| {
                    self.convert(body, evaluated, parameter, false, argument.source_begin())
                });
            let Ok(converted) = converted else {
                self.restore(body, before);
                return Err(Failed);
            };
            is_pure &= converted.is_pure;
            arguments.push(converted.where_);
            compile_time_arguments = compile_time_arguments.and_then(|mut values| {
                values.push(converted.compile_time_value?);
                Some(values)
            });
        }
        if call.arguments.len() < signature.parameters.len() {
            self.restore(body, before);
            self.report(SemanticErrorKind::MissingArgument, call.closing_parenthesis);
            return Err(Failed);
        }

        let folded = match (&callee.compile_time_value, compile_time_arguments) {
            (Some(callee_value), Some(values)) => {
                self.fold_call(callee_value, &callee.type_, values, call.closing_parenthesis)
            }
            _ => None,
        };
        if let (Some(value), Some(result_type), true) = (&folded, &signature.result, is_pure) {
            self.restore(body, before);
            let mut literal = self.emit_literal(body, value.clone(), result_type.clone());
            literal.is_pure = false;
            return Ok(literal);
        }

        let result = self.allocate_register();
        match &callee.type_ {
            Type::EnumConstructor { enumeration, which } => {
                let (Some(state), Some(state_type)) = (arguments.first(), signature.parameters.first())
                else {
                    return Err(Failed);
                };
                body.push(Instruction::EnumConstruct {
                    into: result,
                    enumeration: *enumeration,
                    which: *which,
                    state: *state,
                    state_type: state_type.clone(),
                });
            }
            _ => body.push(Instruction::Call(CallInstruction {
                callee: callee.where_,
                arguments,
                result,
            })),
        }
        if let Some(value) = &folded {
            self.write_compile_time_value(result, value.clone());
        }
        match signature.result {
            Some(result_type) => Ok(Evaluated::value(result, result_type, folded, false)),
            None => Ok(Evaluated {
                completion: Completion::Exit,
                where_: result,
                type_: Type::Unit,
                compile_time_value: None,
                is_pure: false,
            }),
        }
    }

    // ==================== OPERATORS ====================

    /// Calls a function of the global structure, folding the call when every
    /// operand is known. A fold of pure operands replaces everything emitted
    /// since `before` with a literal.
    fn call_global(
        &mut self,
        body: &mut InstructionSequence,
        before: Checkpoint,
        member: u32,
        operands: Vec<Evaluated>,
        result_type: Type,
    ) -> Evaluated {
        let is_pure = operands.iter().all(|operand| operand.is_pure);
        let values: Option<Vec<Value>> = operands
            .iter()
            .map(|operand| operand.compile_time_value.clone())
            .collect();
        let callee = self.program.structure(GLOBALS).members[member as usize]
            .compile_time_value
            .clone();
        let folded = match (values, callee) {
            (Some(values), Some(Value::FunctionPointer(pointer))) => {
                self.interpret_call(&pointer, values).ok()
            }
            _ => None,
        };
        if let (Some(value), true) = (&folded, is_pure) {
            self.restore(body, before);
            return self.emit_literal(body, value.clone(), result_type);
        }
        let global = self.allocate_register();
        body.push(Instruction::Global(global));
        let callee = self.allocate_register();
        body.push(Instruction::ReadStruct {
            from_object: global,
            member,
            into: callee,
        });
        let result = self.allocate_register();
        body.push(Instruction::Call(CallInstruction {
            callee,
            arguments: operands.iter().map(|operand| operand.where_).collect(),
            result,
        }));
        if let Some(value) = &folded {
            self.write_compile_time_value(result, value.clone());
        }
        Evaluated::value(result, result_type, folded, false)
    }

    pub(crate) fn evaluate_not(
        &mut self,
        body: &mut InstructionSequence,
        operand: &Expression,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let evaluated = self
            .evaluate_expression(body, operand, None, Expectation::exact(boolean()))?
            .into_value()?;
        if evaluated.type_ != boolean() {
            self.report(SemanticErrorKind::TypeMismatch, operand.source_begin());
            return Err(Failed);
        }
        Ok(self.call_global(body, before, global_members::NOT, vec![evaluated], boolean()))
    }

    pub(crate) fn evaluate_binary(
        &mut self,
        body: &mut InstructionSequence,
        binary: &Binary,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let left = self
            .evaluate_expression(body, &binary.left, None, Expectation::none())
            .and_then(Evaluated::into_value);
        let right = self
            .evaluate_expression(body, &binary.right, None, Expectation::none())
            .and_then(Evaluated::into_value);
        let (left, right) = (left?, right?);
        let ranges = left
            .type_
            .as_integer_range()
            .zip(right.type_.as_integer_range());

        match binary.operator {
            BinaryOperator::Add | BinaryOperator::Subtract => {
                let (range, member) = match (binary.operator, ranges) {
                    (BinaryOperator::Add, Some((a, b))) => (a.add(&b), global_members::INTEGER_ADD),
                    (_, Some((a, b))) => (a.subtract(&b), global_members::INTEGER_SUBTRACT),
                    (_, None) => (None, global_members::INTEGER_ADD),
                };
                let Some(range) = range else {
                    self.report(SemanticErrorKind::TypeMismatch, binary.source);
                    return Err(Failed);
                };
                Ok(self.call_global(body, before, member, vec![left, right], Type::IntegerRange(range)))
            }
            BinaryOperator::Equals | BinaryOperator::NotEquals => {
                let member = match (&left.type_, &right.type_) {
                    (Type::IntegerRange(_), Type::IntegerRange(_)) => global_members::INTEGER_EQUALS,
                    (Type::String, Type::String) => global_members::STRING_EQUALS,
                    _ => {
                        self.report(SemanticErrorKind::TypeMismatch, binary.source);
                        return Err(Failed);
                    }
                };
                let equal = self.call_global(body, before, member, vec![left, right], boolean());
                if binary.operator == BinaryOperator::Equals {
                    return Ok(equal);
                }
                Ok(self.call_global(body, before, global_members::NOT, vec![equal], boolean()))
            }
            BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessOrEquals
            | BinaryOperator::GreaterOrEquals => {
                if ranges.is_none() {
                    self.report(SemanticErrorKind::TypeMismatch, binary.source);
                    return Err(Failed);
                }
                let (first, second, negate) = match binary.operator {
                    BinaryOperator::Less => (left, right, false),
                    BinaryOperator::Greater => (right, left, false),
                    BinaryOperator::LessOrEquals => (right, left, true),
                    _ => (left, right, true),
                };
                let less = self.call_global(
                    body,
                    before,
                    global_members::INTEGER_LESS,
                    vec![first, second],
                    boolean(),
                );
                if !negate {
                    return Ok(less);
                }
                Ok(self.call_global(body, before, global_members::NOT, vec![less], boolean()))
            }
        }
    }

    // ==================== MEMBERS AND VALUES ====================

    pub(crate) fn evaluate_access_structure(
        &mut self,
        body: &mut InstructionSequence,
        access: &AccessStructure,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let object = self
            .evaluate_expression(body, &access.object, None, Expectation::none())?
            .into_value()?;
        let member = &access.member;
        match object.type_.clone() {
            Type::Structure(id) => {
                let structure = self.program.structure(id);
                let Some(index) = structure.member_index(&member.value) else {
                    return self.unknown_member(member);
                };
                let description = &structure.members[index];
                let type_ = description.what.clone();
                let known = description.compile_time_value.clone().or_else(|| {
                    match &object.compile_time_value {
                        Some(Value::Structure(values)) => values.get(index).cloned(),
                        _ => None,
                    }
                });
                Ok(self.read_element(body, before, &object, index as u32, type_, known))
            }
            Type::Tuple(elements) => {
                let Some(index) = member
                    .value
                    .parse::<usize>()
                    .ok()
                    .filter(|index| *index < elements.len())
                else {
                    return self.unknown_member(member);
                };
                let known = match &object.compile_time_value {
                    Some(Value::Tuple(values)) => values.get(index).cloned(),
                    _ => None,
                };
                let type_ = elements[index].clone();
                Ok(self.read_element(body, before, &object, index as u32, type_, known))
            }
            Type::Interface(id) => {
                if !self.interfaces_defined.contains(&id) {
                    return self.unknown_member(member);
                }
                let interface = self.program.interface(id);
                let Some(index) = interface.method_index(&member.value) else {
                    return self.unknown_member(member);
                };
                let method = &interface.methods[index];
                let type_ = Type::function_pointer(FunctionPointerType {
                    result: Some(method.result.clone()),
                    parameters: method.parameters.clone(),
                    captures: vec![Type::Interface(id)],
                    self_type: None,
                });
                let into = self.allocate_register();
                body.push(Instruction::GetMethod {
                    interface: id,
                    from: object.where_,
                    method: index as u32,
                    into,
                });
                Ok(Evaluated::value(into, type_, None, false))
            }
            Type::Type => {
                let Some(Value::Type(target)) = object.compile_time_value else {
                    self.restore(body, before);
                    self.report(SemanticErrorKind::ExpectedCompileTimeType, member.source);
                    return Err(Failed);
                };
                let Type::Enumeration(id) = target else {
                    return self.unknown_member(member);
                };
                self.restore(body, before);
                let enumeration = self.program.enumeration(id);
                let Some(which) = enumeration.element_index(&member.value) else {
                    return self.unknown_member(member);
                };
                if enumeration.elements[which].state.is_none() {
                    return Ok(self.emit_literal(
                        body,
                        Value::enum_element(which as u32),
                        Type::Enumeration(id),
                    ));
                }
                let type_ = Type::EnumConstructor {
                    enumeration: id,
                    which: which as u32,
                };
                Ok(self.emit_literal(body, Value::EnumConstructor, type_))
            }
            Type::Enumeration(_) => {
                self.report(SemanticErrorKind::NoMembersOnEnumElements, member.source);
                Err(Failed)
            }
            _ => self.unknown_member(member),
        }
    }

    fn unknown_member(&mut self, member: &Identifier) -> Evaluation {
        self.report(SemanticErrorKind::UnknownElement, member.source);
        Err(Failed)
    }

    /// Reads element `index` of a structure or tuple object
    fn read_element(
        &mut self,
        body: &mut InstructionSequence,
        before: Checkpoint,
        object: &Evaluated,
        index: u32,
        type_: Type,
        known: Option<Value>,
    ) -> Evaluated {
        if let Some(value) = known {
            if object.is_pure {
                self.restore(body, before);
            }
            let mut literal = self.emit_literal(body, value, type_);
            literal.is_pure = object.is_pure;
            return literal;
        }
        let into = self.allocate_register();
        body.push(Instruction::ReadStruct {
            from_object: object.where_,
            member: index,
            into,
        });
        Evaluated::value(into, type_, None, object.is_pure)
    }

    pub(crate) fn evaluate_type_of(
        &mut self,
        body: &mut InstructionSequence,
        target: &Expression,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let locals = self.local_count();
        let evaluated = self.evaluate_expression(body, target, None, Expectation::none());
        self.restore(body, before);
        self.truncate_locals(locals);
        let type_ = evaluated?.type_;
        Ok(self.emit_literal(body, Value::Type(type_), Type::Type))
    }

    pub(crate) fn evaluate_tuple(
        &mut self,
        body: &mut InstructionSequence,
        elements: &[Expression],
        expected: &Expectation,
    ) -> Evaluation {
        let hints = match expected.exact_type() {
            Some(Type::Tuple(types)) if types.len() == elements.len() => Some(types.clone()),
            _ => None,
        };
        let before = self.checkpoint(body);
        let mut evaluated = Vec::with_capacity(elements.len());
        let mut failed = false;
        for (index, element) in elements.iter().enumerate() {
            let expectation = match &hints {
                Some(types) => Expectation::exact(types[index].clone()),
                None => Expectation::none(),
            };
            match self
                .evaluate_expression(body, element, None, expectation)
                .and_then(Evaluated::into_value)
            {
                Ok(element) => evaluated.push(element),
                Err(Failed) => failed = true,
            }
        }
        if failed {
            return Err(Failed);
        }
        let type_ = Type::Tuple(evaluated.iter().map(|element| element.type_.clone()).collect());
        let is_pure = evaluated.iter().all(|element| element.is_pure);
        let values: Option<Vec<Value>> = evaluated
            .iter()
            .map(|element| element.compile_time_value.clone())
            .collect();
        if let (Some(values), true) = (&values, is_pure) {
            self.restore(body, before);
            return Ok(self.emit_literal(body, Value::Tuple(values.clone()), type_));
        }
        let result = self.allocate_register();
        body.push(Instruction::Tuple {
            elements: evaluated.iter().map(|element| element.where_).collect(),
            result,
        });
        let value = values.map(Value::Tuple);
        if let Some(value) = &value {
            self.write_compile_time_value(result, value.clone());
        }
        Ok(Evaluated::value(result, type_, value, is_pure))
    }
}
