//! Generic enumerations, structures, interfaces, lambdas and impls
//!
//! A generic definition is stored as syntax together with the compile-time
//! locals it refers to (its closures). `G[args]` checks a copy of the
//! definition in a fresh frame where the parameters and closures are
//! constants, and memoizes the result by argument values.

use std::path::PathBuf;

use crate::ast::{
    EnumDefinition, Expression, FunctionHeader, GenericInstantiation, ImplDefinition,
    InterfaceDefinition, Lambda, MatchCaseKey, Sequence, StructDefinition,
};
use crate::common::SourceLocation;
use crate::diagnostics::{SemanticErrorKind, SourceFile};
use crate::interp::Value;
use crate::ir::{InstructionSequence, RegisterId};
use crate::types::{
    GenericEnumId, GenericInterfaceId, GenericLambdaId, GenericStructId, InterfaceId, Type,
};

use super::state::{Binding, FunctionState};
use super::{Checker, Evaluated, Evaluation, Expectation, Failed};

/// A compile-time local of the defining scope that a generic refers to
#[derive(Debug, Clone)]
pub(crate) struct Closure {
    pub name: String,
    pub what: Type,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct GenericDefinition<T> {
    pub tree: T,
    pub closures: Vec<Closure>,
    pub source: SourceFile,
    pub import_directory: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct GenericInterface {
    pub definition: GenericDefinition<InterfaceDefinition>,
    pub impls: Vec<GenericImpl>,
}

#[derive(Debug, Clone)]
pub(crate) enum GenericImplSelf {
    /// `impl[T] I[T] for X`
    Regular(Type),
    /// `impl[T] I[T] for S[T]` or `impl[T] I for S[T]`
    Generic(GenericInstantiation),
}

#[derive(Debug, Clone)]
pub(crate) struct GenericImpl {
    pub definition: GenericDefinition<ImplDefinition>,
    pub self_: GenericImplSelf,
}

/// Memo entry for `generic[arguments]`
#[derive(Debug, Clone)]
pub(crate) struct Instantiation {
    /// One of the `Value::Generic*` variants
    pub generic: Value,
    pub arguments: Vec<Value>,
    pub argument_types: Vec<Type>,
    pub result: Value,
    pub result_type: Type,
}

#[derive(Debug, Clone, Copy)]
enum GenericRef {
    Enum(GenericEnumId),
    Struct(GenericStructId),
    Interface(GenericInterfaceId),
    Lambda(GenericLambdaId),
}

impl GenericRef {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::GenericEnum(id) => Some(GenericRef::Enum(*id)),
            Value::GenericStruct(id) => Some(GenericRef::Struct(*id)),
            Value::GenericInterface(id) => Some(GenericRef::Interface(*id)),
            Value::GenericLambda(id) => Some(GenericRef::Lambda(*id)),
            _ => None,
        }
    }
}

// ==================== CLOSURE DISCOVERY ====================

/// Walks a generic definition collecting the compile-time locals it names
struct ClosureSearch<'s, 'a> {
    checker: &'s Checker<'a>,
    /// Names bound by the definition itself
    bound: &'s [String],
    found: Vec<Closure>,
    runtime_references: Vec<SourceLocation>,
}

impl ClosureSearch<'_, '_> {
    fn identifier(&mut self, name: &str, source: SourceLocation) {
        if self.bound.iter().any(|bound| bound == name)
            || self.found.iter().any(|closure| closure.name == name)
        {
            return;
        }
        match self.checker.compile_time_local(name) {
            None => {}
            Some(Some((what, value))) => self.found.push(Closure {
                name: name.to_string(),
                what,
                value,
            }),
            Some(None) => self.runtime_references.push(source),
        }
    }

    fn sequence(&mut self, sequence: &Sequence) {
        for element in &sequence.elements {
            self.expression(element);
        }
    }

    fn header(&mut self, header: &FunctionHeader) {
        for parameter in &header.parameters {
            self.expression(&parameter.parameter_type);
        }
        if let Some(return_type) = &header.return_type {
            self.expression(return_type);
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Lambda(lambda) => {
                self.header(&lambda.header);
                self.expression(&lambda.result);
            }
            Expression::Call(call) => {
                self.expression(&call.callee);
                call.arguments.iter().for_each(|argument| self.expression(argument));
            }
            Expression::IntegerLiteral { .. }
            | Expression::String { .. }
            | Expression::Break(_)
            | Expression::Comment { .. }
            | Expression::Placeholder(_)
            | Expression::Import(_) => {}
            Expression::Identifier(identifier) => {
                self.identifier(&identifier.value, identifier.source)
            }
            Expression::Not { expr, .. } => self.expression(expr),
            Expression::Binary(binary) => {
                self.expression(&binary.left);
                self.expression(&binary.right);
            }
            Expression::Return { value, .. } => self.expression(value),
            Expression::Loop(sequence) | Expression::Sequence(sequence) => self.sequence(sequence),
            Expression::Declare(declare) => {
                if let Some(declared) = &declare.optional_type {
                    self.expression(declared);
                }
                self.expression(&declare.initializer);
            }
            Expression::Match(match_) => {
                self.expression(&match_.input);
                for case in &match_.cases {
                    if let MatchCaseKey::Value(key) = &case.key {
                        self.expression(key);
                    }
                    self.sequence(&case.action);
                }
            }
            Expression::Interface(definition) => {
                definition.methods.iter().for_each(|method| self.header(&method.header));
            }
            Expression::Struct(definition) => {
                for element in &definition.elements {
                    self.expression(&element.element_type);
                }
            }
            Expression::Impl(definition) => {
                self.expression(&definition.interface);
                self.expression(&definition.self_type);
                for method in &definition.methods {
                    self.header(&method.header);
                    self.sequence(&method.body);
                }
            }
            Expression::InstantiateStruct(instantiate) => {
                self.expression(&instantiate.structure);
                instantiate.arguments.iter().for_each(|argument| self.expression(argument));
            }
            Expression::Enum(definition) => {
                for state in definition.elements.iter().filter_map(|element| element.state.as_ref()) {
                    self.expression(state);
                }
            }
            Expression::TypeOf { target, .. } => self.expression(target),
            Expression::NewArray { element, .. } => self.expression(element),
            Expression::GenericInstantiation(instantiation) => {
                self.expression(&instantiation.generic);
                instantiation.arguments.iter().for_each(|argument| self.expression(argument));
            }
            Expression::AccessStructure(access) => self.expression(&access.object),
            Expression::Tuple { elements, .. } => {
                elements.iter().for_each(|element| self.expression(element));
            }
        }
    }
}

fn parameter_names(header: &FunctionHeader) -> impl Iterator<Item = String> + '_ {
    header.parameters.iter().map(|parameter| parameter.name.value.clone())
}

impl Checker<'_> {
    /// `None` when `name` is not a local of any enclosing frame, `Some(None)`
    /// when it is one without a compile-time value
    fn compile_time_local(&self, name: &str) -> Option<Option<(Type, Value)>> {
        let mut index = self.frames.len().checked_sub(1);
        while let Some(current) = index {
            let frame = &self.frames[current];
            if let Some(position) = frame.find_local(name) {
                return match &frame.locals[position].binding {
                    Binding::Declared => None,
                    Binding::EarlyInitialized(slot) | Binding::Initialized(slot) => Some(
                        slot.compile_time_value
                            .clone()
                            .map(|value| (slot.type_.clone(), value)),
                    ),
                    Binding::LambdaBeingChecked(_) => Some(None),
                };
            }
            index = frame.parent;
        }
        None
    }

    fn find_closures(
        &mut self,
        bound: &[String],
        visit: impl FnOnce(&mut ClosureSearch<'_, '_>),
    ) -> Vec<Closure> {
        let mut search = ClosureSearch {
            checker: self,
            bound,
            found: Vec::new(),
            runtime_references: Vec::new(),
        };
        visit(&mut search);
        let ClosureSearch {
            found,
            runtime_references,
            ..
        } = search;
        for location in runtime_references {
            self.report(SemanticErrorKind::ExpectedCompileTimeType, location);
        }
        found
    }

    fn generic_definition<T>(&self, tree: T, closures: Vec<Closure>) -> GenericDefinition<T> {
        GenericDefinition {
            tree,
            closures,
            source: self.frame().source.clone(),
            import_directory: self.frame().import_directory.clone(),
        }
    }

    /// Allocates the register of a generic's literal and lets its name be
    /// used inside its own definition
    fn begin_generic(&mut self, early_name: Option<&str>, value: &Value, type_: &Type) -> RegisterId {
        let into = self.allocate_register();
        if let Some(name) = early_name {
            self.initialize_early(name, type_.clone(), value.clone(), into);
        }
        into
    }

    // ==================== DEFINITIONS ====================

    pub(crate) fn register_generic_lambda(
        &mut self,
        body: &mut InstructionSequence,
        lambda: &Lambda,
        early_name: Option<&str>,
    ) -> Evaluated {
        let id = GenericLambdaId(self.generic_lambdas.len() as u32);
        let (value, type_) = (Value::GenericLambda(id), Type::GenericLambda(id));
        let into = self.begin_generic(early_name, &value, &type_);
        let mut bound = lambda.generic_parameters.clone();
        bound.extend(parameter_names(&lambda.header));
        let closures = self.find_closures(&bound, |search| {
            search.header(&lambda.header);
            search.expression(&lambda.result);
        });
        let definition = self.generic_definition(lambda.clone(), closures);
        self.generic_lambdas.push(definition);
        tracing::debug!(generic = %id, "defined generic lambda");
        self.emit_literal_into(body, into, value, type_)
    }

    pub(crate) fn register_generic_struct(
        &mut self,
        body: &mut InstructionSequence,
        definition: &StructDefinition,
        early_name: Option<&str>,
    ) -> Evaluated {
        let id = GenericStructId(self.generic_structs.len() as u32);
        let (value, type_) = (Value::GenericStruct(id), Type::GenericStruct(id));
        let into = self.begin_generic(early_name, &value, &type_);
        let closures = self.find_closures(&definition.generic_parameters, |search| {
            for element in &definition.elements {
                search.expression(&element.element_type);
            }
        });
        let stored = self.generic_definition(definition.clone(), closures);
        self.generic_structs.push(stored);
        tracing::debug!(generic = %id, "defined generic struct");
        self.emit_literal_into(body, into, value, type_)
    }

    pub(crate) fn register_generic_enum(
        &mut self,
        body: &mut InstructionSequence,
        definition: &EnumDefinition,
    ) -> Evaluated {
        let id = GenericEnumId(self.generic_enums.len() as u32);
        let closures = self.find_closures(&definition.generic_parameters, |search| {
            for state in definition.elements.iter().filter_map(|element| element.state.as_ref()) {
                search.expression(state);
            }
        });
        let stored = self.generic_definition(definition.clone(), closures);
        self.generic_enums.push(stored);
        tracing::debug!(generic = %id, "defined generic enum");
        self.emit_literal(body, Value::GenericEnum(id), Type::GenericEnum(id))
    }

    pub(crate) fn register_generic_interface(
        &mut self,
        body: &mut InstructionSequence,
        definition: &InterfaceDefinition,
        early_name: Option<&str>,
    ) -> Evaluated {
        let id = GenericInterfaceId(self.generic_interfaces.len() as u32);
        let (value, type_) = (Value::GenericInterface(id), Type::GenericInterface(id));
        let into = self.begin_generic(early_name, &value, &type_);
        let mut bound = definition.generic_parameters.clone();
        for method in &definition.methods {
            bound.extend(parameter_names(&method.header));
        }
        let closures = self.find_closures(&bound, |search| {
            for method in &definition.methods {
                search.header(&method.header);
            }
        });
        let stored = self.generic_definition(definition.clone(), closures);
        self.generic_interfaces.push(GenericInterface {
            definition: stored,
            impls: Vec::new(),
        });
        tracing::debug!(generic = %id, "defined generic interface");
        self.emit_literal_into(body, into, value, type_)
    }

    // ==================== INSTANTIATION ====================

    pub(crate) fn evaluate_generic_instantiation(
        &mut self,
        body: &mut InstructionSequence,
        instantiation: &GenericInstantiation,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let generic = self
            .evaluate_expression(body, &instantiation.generic, None, Expectation::none())?
            .into_value()?;
        let mut arguments = Vec::with_capacity(instantiation.arguments.len());
        let mut argument_types = Vec::with_capacity(instantiation.arguments.len());
        for argument in &instantiation.arguments {
            let evaluated = self
                .evaluate_expression(body, argument, None, Expectation::none())?
                .into_value()?;
            let Some(value) = evaluated.compile_time_value else {
                self.report(SemanticErrorKind::ExpectedCompileTimeValue, argument.source_begin());
                return Err(Failed);
            };
            arguments.push(value);
            argument_types.push(evaluated.type_);
        }
        let location = instantiation.generic.source_begin();
        let Some(generic) = generic.compile_time_value else {
            self.report(SemanticErrorKind::ExpectedCompileTimeValue, location);
            return Err(Failed);
        };
        self.restore(body, before);
        self.instantiate(body, generic, arguments, argument_types, location)
    }

    /// `generic[arguments]` as a literal, checking the definition on first use
    pub(crate) fn instantiate(
        &mut self,
        body: &mut InstructionSequence,
        generic: Value,
        arguments: Vec<Value>,
        argument_types: Vec<Type>,
        location: SourceLocation,
    ) -> Evaluation {
        let Some(reference) = GenericRef::from_value(&generic) else {
            self.report(SemanticErrorKind::ExpectedGenericType, location);
            return Err(Failed);
        };
        let parameter_count = match reference {
            GenericRef::Enum(id) => self.generic_enums[id.index()].tree.generic_parameters.len(),
            GenericRef::Struct(id) => self.generic_structs[id.index()].tree.generic_parameters.len(),
            GenericRef::Interface(id) => self.generic_interfaces[id.index()]
                .definition
                .tree
                .generic_parameters
                .len(),
            GenericRef::Lambda(id) => self.generic_lambdas[id.index()].tree.generic_parameters.len(),
        };
        if arguments.len() < parameter_count {
            self.report(SemanticErrorKind::MissingArgument, location);
            return Err(Failed);
        }
        if arguments.len() > parameter_count {
            self.report(SemanticErrorKind::ExtraneousArgument, location);
            return Err(Failed);
        }
        if let Some(existing) = self
            .instantiations
            .iter()
            .find(|existing| existing.generic == generic && existing.arguments == arguments)
        {
            let (value, type_) = (existing.result.clone(), existing.result_type.clone());
            return Ok(self.emit_literal(body, value, type_));
        }

        let _span = tracing::debug_span!("instantiate", ?reference, arguments = arguments.len()).entered();
        let (result, result_type) = match reference {
            GenericRef::Enum(id) => {
                let definition = self.generic_enums[id.index()].clone();
                let tree = EnumDefinition {
                    generic_parameters: Vec::new(),
                    ..definition.tree.clone()
                };
                let evaluated = self.in_generic_frame(
                    &definition,
                    &definition.tree.generic_parameters,
                    &arguments,
                    &argument_types,
                    |checker, scratch| checker.evaluate_enum(scratch, &tree),
                )?;
                let result = evaluated.compile_time_value.ok_or(Failed)?;
                self.remember(&generic, &arguments, &argument_types, &result, &Type::Type);
                (result, Type::Type)
            }
            GenericRef::Struct(id) => {
                let definition = self.generic_structs[id.index()].clone();
                let tree = StructDefinition {
                    generic_parameters: Vec::new(),
                    ..definition.tree.clone()
                };
                let evaluated = self.in_generic_frame(
                    &definition,
                    &definition.tree.generic_parameters,
                    &arguments,
                    &argument_types,
                    |checker, scratch| checker.evaluate_struct(scratch, &tree, None),
                )?;
                let result = evaluated.compile_time_value.ok_or(Failed)?;
                self.remember(&generic, &arguments, &argument_types, &result, &Type::Type);
                (result, Type::Type)
            }
            GenericRef::Interface(id) => {
                let definition = self.generic_interfaces[id.index()].definition.clone();
                let tree = InterfaceDefinition {
                    generic_parameters: Vec::new(),
                    ..definition.tree.clone()
                };
                let predicted = InterfaceId(self.program.interfaces.len() as u32);
                let result = Value::Type(Type::Interface(predicted));
                let memo = self.remember(&generic, &arguments, &argument_types, &result, &Type::Type);
                let evaluated = self.in_generic_frame(
                    &definition,
                    &definition.tree.generic_parameters,
                    &arguments,
                    &argument_types,
                    |checker, scratch| checker.evaluate_interface(scratch, &tree, None),
                );
                if evaluated.is_err() {
                    self.instantiations.remove(memo);
                    return Err(Failed);
                }
                (result, Type::Type)
            }
            GenericRef::Lambda(id) => {
                let definition = self.generic_lambdas[id.index()].clone();
                let tree = Lambda {
                    generic_parameters: Vec::new(),
                    ..definition.tree.clone()
                };
                let function = self.program.reserve_function();
                let result = Value::function(function, Vec::new());
                let result_type = Type::Lambda(function);
                let memo = self.remember(&generic, &arguments, &argument_types, &result, &result_type);
                let evaluated = self.in_generic_frame(
                    &definition,
                    &definition.tree.generic_parameters,
                    &arguments,
                    &argument_types,
                    |checker, scratch| checker.evaluate_lambda(scratch, &tree, None, Some(function)),
                );
                if evaluated.is_err() {
                    self.instantiations.remove(memo);
                    return Err(Failed);
                }
                (result, result_type)
            }
        };
        tracing::debug!(result = ?result, "instantiated generic");
        Ok(self.emit_literal(body, result, result_type))
    }

    /// Adds a memo entry and returns its index
    fn remember(
        &mut self,
        generic: &Value,
        arguments: &[Value],
        argument_types: &[Type],
        result: &Value,
        result_type: &Type,
    ) -> usize {
        self.instantiations.push(Instantiation {
            generic: generic.clone(),
            arguments: arguments.to_vec(),
            argument_types: argument_types.to_vec(),
            result: result.clone(),
            result_type: result_type.clone(),
        });
        self.instantiations.len() - 1
    }

    /// Runs `check` in a frame that sees only the generic's parameters and closures
    fn in_generic_frame<T, R>(
        &mut self,
        definition: &GenericDefinition<T>,
        parameters: &[String],
        arguments: &[Value],
        argument_types: &[Type],
        check: impl FnOnce(&mut Self, &mut InstructionSequence) -> R,
    ) -> R {
        self.frames.push(FunctionState::new(
            None,
            false,
            definition.source.clone(),
            definition.import_directory.clone(),
        ));
        for ((name, value), type_) in parameters.iter().zip(arguments).zip(argument_types) {
            self.add_constant(name, type_.clone(), value.clone());
        }
        for closure in &definition.closures {
            self.add_constant(&closure.name, closure.what.clone(), closure.value.clone());
        }
        let mut scratch = InstructionSequence::new();
        let result = check(self, &mut scratch);
        self.frames.pop();
        result
    }

    // ==================== GENERIC IMPLS ====================

    pub(crate) fn evaluate_generic_impl(
        &mut self,
        body: &mut InstructionSequence,
        definition: &ImplDefinition,
    ) -> Evaluation {
        let before = self.checkpoint(body);
        let registered = self.register_generic_impl(body, definition);
        self.restore(body, before);
        registered?;
        Ok(self.make_unit(body))
    }

    fn register_generic_impl(
        &mut self,
        body: &mut InstructionSequence,
        definition: &ImplDefinition,
    ) -> Result<(), Failed> {
        match (&*definition.interface, &*definition.self_type) {
            (Expression::GenericInstantiation(interface), Expression::GenericInstantiation(self_tree)) => {
                let generic = self.generic_interface_of(body, interface, definition)?;
                let impl_ = self.generic_impl(definition, GenericImplSelf::Generic(self_tree.clone()));
                self.generic_interfaces[generic.index()].impls.push(impl_);
            }
            (interface, Expression::GenericInstantiation(self_tree)) => {
                let Type::Interface(interface_id) = self.expect_compile_time_type(body, interface)? else {
                    self.report(SemanticErrorKind::ExpectedInterface, interface.source_begin());
                    return Err(Failed);
                };
                let impl_ = self.generic_impl(definition, GenericImplSelf::Generic(self_tree.clone()));
                self.generic_impls_for_regular_interfaces.push((interface_id, impl_));
            }
            (Expression::GenericInstantiation(interface), self_expression) => {
                let generic = self.generic_interface_of(body, interface, definition)?;
                let self_type = self.expect_compile_time_type(body, self_expression)?;
                let impl_ = self.generic_impl(definition, GenericImplSelf::Regular(self_type));
                self.generic_interfaces[generic.index()].impls.push(impl_);
            }
            _ => {
                self.report(SemanticErrorKind::GenericImplParameterMismatch, definition.source);
                return Err(Failed);
            }
        }
        tracing::debug!(methods = definition.methods.len(), "defined generic impl");
        Ok(())
    }

    fn generic_impl(&mut self, definition: &ImplDefinition, self_: GenericImplSelf) -> GenericImpl {
        let mut bound = definition.generic_parameters.clone();
        bound.push("self".to_string());
        for method in &definition.methods {
            bound.extend(parameter_names(&method.header));
        }
        let closures = self.find_closures(&bound, |search| {
            search.expression(&definition.interface);
            search.expression(&definition.self_type);
            for method in &definition.methods {
                search.header(&method.header);
                search.sequence(&method.body);
            }
        });
        GenericImpl {
            definition: self.generic_definition(definition.clone(), closures),
            self_,
        }
    }

    /// Evaluates `I` in `impl[A, B] I[A, B] ...`, whose arguments have to
    /// repeat the impl's parameters in order
    fn generic_interface_of(
        &mut self,
        body: &mut InstructionSequence,
        interface: &GenericInstantiation,
        definition: &ImplDefinition,
    ) -> Result<GenericInterfaceId, Failed> {
        if interface.arguments.len() != definition.generic_parameters.len() {
            self.report(
                SemanticErrorKind::GenericImplParameterMismatch,
                interface.generic.source_begin(),
            );
            return Err(Failed);
        }
        for (argument, parameter) in interface.arguments.iter().zip(&definition.generic_parameters) {
            match argument {
                Expression::Identifier(identifier) if identifier.value == *parameter => {}
                other => {
                    self.report(
                        SemanticErrorKind::GenericImplParameterMismatch,
                        other.source_begin(),
                    );
                    return Err(Failed);
                }
            }
        }
        let evaluated = self
            .evaluate_expression(body, &interface.generic, None, Expectation::none())?
            .into_value()?;
        match evaluated.compile_time_value {
            Some(Value::GenericInterface(id)) => Ok(id),
            _ => {
                self.report(
                    SemanticErrorKind::ExpectedGenericType,
                    interface.generic.source_begin(),
                );
                Err(Failed)
            }
        }
    }

    /// Index of the implementation of `interface` for `self_type`, instantiating
    /// a matching generic impl if there is no regular one
    pub(crate) fn require_implementation(
        &mut self,
        interface: InterfaceId,
        self_type: &Type,
    ) -> Option<usize> {
        if let Some(index) = self.program.interface(interface).find_implementation(self_type) {
            return Some(index);
        }
        let interface_value = Value::Type(Type::Interface(interface));
        let instantiated_from = self
            .instantiations
            .iter()
            .find(|instantiation| instantiation.result == interface_value)
            .cloned();
        if let Some(instantiation) = instantiated_from {
            let Value::GenericInterface(generic) = instantiation.generic else {
                return None;
            };
            let impls = self.generic_interfaces[generic.index()].impls.clone();
            for impl_ in &impls {
                match &impl_.self_ {
                    GenericImplSelf::Regular(regular) if regular == self_type => {
                        return self.instantiate_generic_impl(
                            interface,
                            impl_,
                            &instantiation.arguments,
                            &instantiation.argument_types,
                            self_type,
                        );
                    }
                    GenericImplSelf::Regular(_) => {}
                    GenericImplSelf::Generic(self_tree) => {
                        if let Some((arguments, types)) =
                            self.infer_generic_arguments(self_tree, self_type, impl_)
                        {
                            return self
                                .instantiate_generic_impl(interface, impl_, &arguments, &types, self_type);
                        }
                    }
                }
            }
            return None;
        }
        let candidates: Vec<GenericImpl> = self
            .generic_impls_for_regular_interfaces
            .iter()
            .filter(|(target, _)| *target == interface)
            .map(|(_, impl_)| impl_.clone())
            .collect();
        for impl_ in &candidates {
            let GenericImplSelf::Generic(self_tree) = &impl_.self_ else {
                continue;
            };
            if let Some((arguments, types)) = self.infer_generic_arguments(self_tree, self_type, impl_) {
                return self.instantiate_generic_impl(interface, impl_, &arguments, &types, self_type);
            }
        }
        None
    }

    /// Finds the arguments that instantiated `self_type` from the generic in `S[...]`
    fn infer_generic_arguments(
        &mut self,
        self_tree: &GenericInstantiation,
        self_type: &Type,
        impl_: &GenericImpl,
    ) -> Option<(Vec<Value>, Vec<Type>)> {
        let generic = self.in_generic_frame(&impl_.definition, &[], &[], &[], |checker, scratch| {
            checker.evaluate_expression(scratch, &self_tree.generic, None, Expectation::none())
        });
        let generic = generic.ok()?.compile_time_value?;
        let self_value = Value::Type(self_type.clone());
        let instantiation = self
            .instantiations
            .iter()
            .find(|instantiation| instantiation.generic == generic && instantiation.result == self_value)?;
        if instantiation.arguments.len() != impl_.definition.tree.generic_parameters.len() {
            return None;
        }
        Some((instantiation.arguments.clone(), instantiation.argument_types.clone()))
    }

    fn instantiate_generic_impl(
        &mut self,
        interface: InterfaceId,
        impl_: &GenericImpl,
        arguments: &[Value],
        argument_types: &[Type],
        self_type: &Type,
    ) -> Option<usize> {
        let _span = tracing::debug_span!("instantiate_impl", %interface, %self_type).entered();
        let tree = &impl_.definition.tree;
        self.in_generic_frame(
            &impl_.definition,
            &tree.generic_parameters,
            arguments,
            argument_types,
            |checker, scratch| {
                checker.evaluate_impl_core(
                    scratch,
                    &tree.methods,
                    self_type.clone(),
                    interface,
                    tree.self_type.source_begin(),
                    tree.source,
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_generic_values_can_be_instantiated() {
        assert!(matches!(
            GenericRef::from_value(&Value::GenericLambda(GenericLambdaId(2))),
            Some(GenericRef::Lambda(GenericLambdaId(2)))
        ));
        assert!(GenericRef::from_value(&Value::Type(Type::Unit)).is_none());
    }
}
