//! Structures, enumerations, interfaces and their implementations

use crate::ast::{
    EnumDefinition, ImplDefinition, InstantiateStruct, InterfaceDefinition, MethodDefinition,
    StructDefinition,
};
use crate::common::SourceLocation;
use crate::diagnostics::SemanticErrorKind;
use crate::interp::{FunctionPointerValue, Value};
use crate::ir::{Instruction, InstructionSequence};
use crate::program::{
    EnumerationElement, Implementation, ImplementationEntry, Interface, MethodDescription,
    Structure, StructureMember,
};
use crate::types::{is_implicitly_convertible, InterfaceId, Type};

use super::lambda::{FunctionBody, FunctionCheck};
use super::{Checker, Evaluated, Evaluation, Expectation, Failed};

impl Checker<'_> {
    // ==================== NOMINAL TYPES ====================

    pub(crate) fn evaluate_struct(
        &mut self,
        body: &mut InstructionSequence,
        definition: &StructDefinition,
        early_name: Option<&str>,
    ) -> Evaluation {
        if !definition.generic_parameters.is_empty() {
            return Ok(self.register_generic_struct(body, definition, early_name));
        }
        let mut members = Vec::with_capacity(definition.elements.len());
        for element in &definition.elements {
            let before = self.checkpoint(body);
            let what = self.expect_compile_time_type(body, &element.element_type);
            self.restore(body, before);
            members.push(StructureMember {
                what: what?,
                name: element.name.value.clone(),
                compile_time_value: None,
            });
        }
        let id = self.program.add_structure(Structure { members });
        tracing::trace!(structure = %id, "defined structure");
        Ok(self.emit_literal(body, Value::Type(Type::Structure(id)), Type::Type))
    }

    pub(crate) fn evaluate_enum(
        &mut self,
        body: &mut InstructionSequence,
        definition: &EnumDefinition,
    ) -> Evaluation {
        if !definition.generic_parameters.is_empty() {
            return Ok(self.register_generic_enum(body, definition));
        }
        let id = self.program.add_enumeration(Default::default());
        let mut elements: Vec<EnumerationElement> = Vec::with_capacity(definition.elements.len());
        for element in &definition.elements {
            let state = match &element.state {
                Some(expression) => {
                    let before = self.checkpoint(body);
                    let state = self.expect_compile_time_type(body, expression);
                    self.restore(body, before);
                    Some(state?)
                }
                None => None,
            };
            if elements.iter().any(|existing| existing.name == element.name.value) {
                self.report(SemanticErrorKind::DuplicateEnumElement, definition.source);
                return Err(Failed);
            }
            elements.push(EnumerationElement {
                name: element.name.value.clone(),
                state,
            });
        }
        self.program.enums[id.index()].elements = elements;
        tracing::trace!(enumeration = %id, "defined enumeration");
        Ok(self.emit_literal(body, Value::Type(Type::Enumeration(id)), Type::Type))
    }

    /// Also used when instantiating generic interfaces, which rely on the new
    /// interface being appended before anything else happens
    pub(crate) fn evaluate_interface(
        &mut self,
        body: &mut InstructionSequence,
        definition: &InterfaceDefinition,
        early_name: Option<&str>,
    ) -> Evaluation {
        if !definition.generic_parameters.is_empty() {
            return Ok(self.register_generic_interface(body, definition, early_name));
        }
        let id = self.program.add_interface(Interface::default());
        let value = Value::Type(Type::Interface(id));
        let into = self.allocate_register();
        if let Some(name) = early_name {
            self.initialize_early(name, Type::Type, value.clone(), into);
        }

        let mut methods: Vec<MethodDescription> = Vec::with_capacity(definition.methods.len());
        for method in &definition.methods {
            let Ok(header) = self.evaluate_function_header(body, &method.header) else {
                continue;
            };
            if methods.iter().any(|existing| existing.name == method.name.value) {
                self.report(SemanticErrorKind::DuplicateMethodName, method.name.source);
                continue;
            }
            methods.push(MethodDescription {
                name: method.name.value.clone(),
                parameters: header.parameter_types(),
                result: header.return_type.unwrap_or(Type::Unit),
            });
        }
        self.program.interfaces[id.index()].methods = methods;
        self.interfaces_defined.insert(id);
        tracing::trace!(interface = %id, "defined interface");
        Ok(self.emit_literal_into(body, into, value, Type::Type))
    }

    // ==================== IMPLEMENTATIONS ====================

    pub(crate) fn evaluate_impl(
        &mut self,
        body: &mut InstructionSequence,
        definition: &ImplDefinition,
    ) -> Evaluation {
        if !definition.generic_parameters.is_empty() {
            return self.evaluate_generic_impl(body, definition);
        }
        let before = self.checkpoint(body);
        let interface = match self.expect_compile_time_type(body, &definition.interface) {
            Ok(Type::Interface(interface)) => interface,
            Ok(_) => {
                self.restore(body, before);
                self.report(
                    SemanticErrorKind::ExpectedInterface,
                    definition.interface.source_begin(),
                );
                return Err(Failed);
            }
            Err(Failed) => {
                self.restore(body, before);
                return Err(Failed);
            }
        };
        let self_type = self.expect_compile_time_type(body, &definition.self_type);
        self.restore(body, before);
        self.evaluate_impl_core(
            body,
            &definition.methods,
            self_type?,
            interface,
            definition.self_type.source_begin(),
            definition.source,
        );
        Ok(self.make_unit(body))
    }

    /// Checks the methods of an implementation of `interface` for `self_type`
    /// and returns the index of the new implementation
    pub(crate) fn evaluate_impl_core(
        &mut self,
        body: &mut InstructionSequence,
        methods: &[MethodDefinition],
        self_type: Type,
        interface: InterfaceId,
        self_source: SourceLocation,
        impl_source: SourceLocation,
    ) -> Option<usize> {
        if self
            .program
            .interface(interface)
            .find_implementation(&self_type)
            .is_some()
        {
            self.report(SemanticErrorKind::DuplicateImpl, self_source);
            return None;
        }
        let index = {
            let implementations = &mut self.program.interfaces[interface.index()].implementations;
            implementations.push(ImplementationEntry {
                self_type: self_type.clone(),
                implementation: Implementation {
                    methods: Vec::new(),
                },
            });
            implementations.len() - 1
        };

        let descriptions = self.program.interface(interface).methods.clone();
        let mut defined: Vec<Option<FunctionPointerValue>> = vec![None; descriptions.len()];
        for method in methods {
            let Some(position) = descriptions
                .iter()
                .position(|description| description.name == method.name.value)
            else {
                self.report(SemanticErrorKind::ExtraMethod, method.name.source);
                return None;
            };
            if defined[position].is_some() {
                self.report(SemanticErrorKind::DuplicateMethodName, method.name.source);
                return None;
            }
            let pointer =
                self.evaluate_method_definition(body, method, &self_type, &descriptions[position])?;
            defined[position] = Some(pointer);
        }
        let Some(methods) = defined.into_iter().collect::<Option<Vec<_>>>() else {
            self.report(SemanticErrorKind::MissingMethod, impl_source);
            return None;
        };
        self.program.interfaces[interface.index()].implementations[index]
            .implementation
            .methods = methods;
        tracing::debug!(%interface, self_type = %self_type, index, "implemented interface");
        Some(index)
    }

    fn evaluate_method_definition(
        &mut self,
        body: &mut InstructionSequence,
        method: &MethodDefinition,
        self_type: &Type,
        description: &MethodDescription,
    ) -> Option<FunctionPointerValue> {
        let header = self.evaluate_function_header(body, &method.header).ok()?;
        if let (Some(declared), Some(expression)) = (&header.return_type, &method.header.return_type) {
            if !is_implicitly_convertible(declared, &description.result) {
                self.report(SemanticErrorKind::TypeMismatch, expression.source_begin());
                return None;
            }
        }
        if header.parameter_types() != description.parameters {
            self.report(SemanticErrorKind::TypeMismatch, method.name.source);
            return None;
        }
        let id = self.program.reserve_function();
        let parent = self.current_frame_index();
        let source = self.frame().source.clone();
        let import_directory = self.frame().import_directory.clone();
        let (function, captures) = self
            .check_function(FunctionCheck {
                parent: Some(parent),
                body: FunctionBody::Sequence(&method.body),
                parameters: header.parameters,
                self_type: Some(self_type.clone()),
                may_capture: false,
                explicit_return_type: Some(description.result.clone()),
                early_name: None,
                function_id: Some(id),
                source,
                import_directory,
            })
            .ok()?;
        debug_assert!(captures.is_empty());
        self.program.functions[id.index()] = function;
        Some(FunctionPointerValue::Internal {
            function: id,
            captures: Vec::new(),
        })
    }

    // ==================== INSTANTIATION ====================

    pub(crate) fn evaluate_instantiate_struct(
        &mut self,
        body: &mut InstructionSequence,
        instantiate: &InstantiateStruct,
    ) -> Evaluation {
        let location = instantiate.structure.source_begin();
        let before = self.checkpoint(body);
        let structure = self.expect_compile_time_type(body, &instantiate.structure);
        self.restore(body, before);
        let Type::Structure(id) = structure? else {
            self.report(SemanticErrorKind::ExpectedStructure, location);
            return Err(Failed);
        };
        let members: Vec<Type> = self
            .program
            .structure(id)
            .members
            .iter()
            .map(|member| member.what.clone())
            .collect();
        if instantiate.arguments.len() < members.len() {
            self.report(SemanticErrorKind::MissingArgument, location);
            return Err(Failed);
        }
        if instantiate.arguments.len() > members.len() {
            self.report(SemanticErrorKind::ExtraneousArgument, location);
            return Err(Failed);
        }

        let mut registers = Vec::with_capacity(members.len());
        let mut values = Some(Vec::with_capacity(members.len()));
        let mut is_pure = true;
        for (argument, member) in instantiate.arguments.iter().zip(&members) {
            let evaluated = self
                .evaluate_expression(body, argument, None, Expectation::exact(member.clone()))?
                .into_value()?;
            let converted = self.convert(body, evaluated, member, false, argument.source_begin())?;
            is_pure &= converted.is_pure;
            registers.push(converted.where_);
            values = values.and_then(|mut values| {
                values.push(converted.compile_time_value?);
                Some(values)
            });
        }

        let type_ = Type::Structure(id);
        if let (Some(values), true) = (&values, is_pure) {
            self.restore(body, before);
            return Ok(self.emit_literal(body, Value::Structure(values.clone()), type_));
        }
        let into = self.allocate_register();
        body.push(Instruction::InstantiateStruct {
            into,
            structure: id,
            arguments: registers,
        });
        let value = values.map(Value::Structure);
        if let Some(value) = &value {
            self.write_compile_time_value(into, value.clone());
        }
        Ok(Evaluated::value(into, type_, value, is_pure))
    }
}
