//! Checking of function bodies, lambdas and function headers

use std::path::PathBuf;

use crate::ast::{Expression, FunctionHeader, Lambda, Sequence};
use crate::common::SourceLocation;
use crate::diagnostics::SourceFile;
use crate::interp::Value;
use crate::ir::{Instruction, InstructionSequence};
use crate::program::CheckedFunction;
use crate::types::{FunctionId, FunctionPointerType, Type};

use super::state::{Binding, Capture, CaptureAddress, FunctionState, Slot};
use super::{Checker, Completion, Evaluated, Evaluation, Expectation, Failed};

#[derive(Debug, Clone, Copy)]
pub(crate) enum FunctionBody<'t> {
    Expression(&'t Expression),
    Sequence(&'t Sequence),
}

impl FunctionBody<'_> {
    fn source_begin(&self) -> SourceLocation {
        match self {
            FunctionBody::Expression(expression) => expression.source_begin(),
            FunctionBody::Sequence(sequence) => sequence
                .elements
                .last()
                .map_or(sequence.source, Expression::source_begin),
        }
    }
}

/// Everything needed to check one function
pub(crate) struct FunctionCheck<'t> {
    /// Frame index of the enclosing function
    pub parent: Option<usize>,
    pub body: FunctionBody<'t>,
    pub parameters: Vec<(String, Type)>,
    pub self_type: Option<Type>,
    pub may_capture: bool,
    pub explicit_return_type: Option<Type>,
    /// Name the function is being bound to, which makes recursion possible
    pub early_name: Option<&'t str>,
    pub function_id: Option<FunctionId>,
    pub source: SourceFile,
    pub import_directory: Option<PathBuf>,
}

/// Parameter and result types of a function header
#[derive(Debug, Clone)]
pub(crate) struct EvaluatedHeader {
    pub parameters: Vec<(String, Type)>,
    pub return_type: Option<Type>,
}

impl EvaluatedHeader {
    pub(crate) fn parameter_types(&self) -> Vec<Type> {
        self.parameters.iter().map(|(_, type_)| type_.clone()).collect()
    }
}

impl Checker<'_> {
    /// Checks a function body in a new frame. The returned captures are
    /// addresses inside the enclosing frame.
    pub(crate) fn check_function(
        &mut self,
        request: FunctionCheck<'_>,
    ) -> Result<(CheckedFunction, Vec<Capture>), Failed> {
        let mut frame = FunctionState::new(
            request.parent,
            request.may_capture,
            request.source.clone(),
            request.import_directory.clone(),
        );
        frame.return_type = request.explicit_return_type.clone();
        frame.return_type_is_declared = request.explicit_return_type.is_some();
        self.frames.push(frame);
        let result = self.check_function_in_frame(&request);
        self.frames.pop();
        result
    }

    fn check_function_in_frame(
        &mut self,
        request: &FunctionCheck<'_>,
    ) -> Result<(CheckedFunction, Vec<Capture>), Failed> {
        if let (Some(name), Some(id), Some(_)) = (
            request.early_name,
            request.function_id,
            &request.explicit_return_type,
        ) {
            self.add_local(name, Binding::LambdaBeingChecked(Type::Lambda(id)));
        }
        let inputs = request
            .self_type
            .iter()
            .map(|type_| ("self", type_))
            .chain(request.parameters.iter().map(|(name, type_)| (name.as_str(), type_)));
        for (name, type_) in inputs {
            let where_ = self.allocate_register();
            self.add_local(
                name,
                Binding::Initialized(Slot {
                    type_: type_.clone(),
                    compile_time_value: None,
                    where_,
                }),
            );
            self.define_debug_name(where_, name);
        }

        let mut body = InstructionSequence::new();
        let expected = Expectation::Exact(request.explicit_return_type.clone());
        let evaluated = match request.body {
            FunctionBody::Expression(expression) => {
                self.evaluate_expression(&mut body, expression, None, expected)?
            }
            FunctionBody::Sequence(sequence) => self.check_sequence(&mut body, sequence, expected)?,
        };

        let result_type = match evaluated.completion {
            Completion::Exit => match &request.explicit_return_type {
                // calls and self references were already checked against the declared type
                Some(explicit) => explicit.clone(),
                None => {
                    let unit = self.make_unit(&mut body);
                    self.emit_return(&mut body, unit.where_);
                    Type::Unit
                }
            },
            Completion::Return => self.frame().return_type.clone().unwrap_or(Type::Unit),
            Completion::Value => {
                let source = request.body.source_begin();
                let converted = match self.frame().return_type.clone() {
                    Some(previous) => {
                        let may_widen = !self.frame().return_type_is_declared;
                        self.convert(&mut body, evaluated, &previous, may_widen, source)?
                    }
                    None => evaluated,
                };
                self.emit_return(&mut body, converted.where_);
                converted.type_
            }
        };

        let frame = self.frame_mut();
        let mut instructions = std::mem::take(&mut frame.prologue);
        instructions.append(&mut body.elements);
        let captures = std::mem::take(&mut frame.captures);
        let number_of_registers = frame.register_count();
        let mut register_debug_names = std::mem::take(&mut frame.debug_names);
        register_debug_names.resize(number_of_registers as usize, String::new());
        let signature = FunctionPointerType {
            result: Some(result_type),
            parameters: request
                .parameters
                .iter()
                .map(|(_, type_)| type_.clone())
                .collect(),
            captures: captures.iter().map(|capture| capture.what.clone()).collect(),
            self_type: request.self_type.clone(),
        };
        Ok((
            CheckedFunction {
                signature,
                body: instructions.into(),
                register_debug_names,
                number_of_registers,
            },
            captures,
        ))
    }

    pub(crate) fn emit_return(&mut self, body: &mut InstructionSequence, value: crate::ir::RegisterId) {
        let unit_goes_into = self.allocate_register();
        body.push(Instruction::Return {
            returned_value: value,
            unit_goes_into,
        });
    }

    /// Evaluates parameter and result types without leaving code behind
    pub(crate) fn evaluate_function_header(
        &mut self,
        body: &mut InstructionSequence,
        header: &FunctionHeader,
    ) -> Result<EvaluatedHeader, Failed> {
        let mut parameters = Vec::with_capacity(header.parameters.len());
        for parameter in &header.parameters {
            let before = self.checkpoint(body);
            let type_ = self.expect_compile_time_type(body, &parameter.parameter_type);
            self.restore(body, before);
            parameters.push((parameter.name.value.clone(), type_?));
        }
        let return_type = match &header.return_type {
            Some(expression) => {
                let before = self.checkpoint(body);
                let type_ = self.expect_compile_time_type(body, expression);
                self.restore(body, before);
                Some(type_?)
            }
            None => None,
        };
        Ok(EvaluatedHeader {
            parameters,
            return_type,
        })
    }

    pub(crate) fn evaluate_lambda(
        &mut self,
        body: &mut InstructionSequence,
        lambda: &Lambda,
        early_name: Option<&str>,
        predetermined_id: Option<FunctionId>,
    ) -> Evaluation {
        if !lambda.generic_parameters.is_empty() {
            return Ok(self.register_generic_lambda(body, lambda, early_name));
        }
        let header = self.evaluate_function_header(body, &lambda.header)?;
        let id = predetermined_id.unwrap_or_else(|| self.program.reserve_function());
        {
            let signature = &mut self.program.functions[id.index()].signature;
            signature.parameters = header.parameter_types();
            signature.result = header.return_type.clone();
        }
        let parent = self.current_frame_index();
        let source = self.frame().source.clone();
        let import_directory = self.frame().import_directory.clone();
        let (function, captures) = self.check_function(FunctionCheck {
            parent: Some(parent),
            body: FunctionBody::Expression(&lambda.result),
            parameters: header.parameters,
            self_type: None,
            may_capture: true,
            explicit_return_type: header.return_type,
            early_name,
            function_id: Some(id),
            source,
            import_directory,
        })?;
        tracing::trace!(function = %id, captures = captures.len(), "checked lambda");
        self.program.functions[id.index()] = function;

        let type_ = Type::Lambda(id);
        if captures.is_empty() {
            let mut evaluated = self.emit_literal(body, Value::function(id, Vec::new()), type_);
            evaluated.is_pure = false;
            return Ok(evaluated);
        }
        let registers: Vec<_> = captures
            .iter()
            .map(|capture| match capture.from {
                CaptureAddress::Local(register) => register,
                CaptureAddress::Capture(index) => self.read_capture(body, index),
            })
            .collect();
        let values: Option<Vec<Value>> = registers
            .iter()
            .map(|register| self.read_compile_time_value(*register))
            .collect();
        if let Some(values) = values {
            return Ok(self.emit_literal(body, Value::function(id, values), type_));
        }
        let into = self.allocate_register();
        body.push(Instruction::LambdaWithCaptures {
            into,
            lambda: id,
            captures: registers,
        });
        Ok(Evaluated::value(into, type_, None, false))
    }
}
