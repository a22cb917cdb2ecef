//! `import name` and `new_array(T)`

use crate::ast::{Expression, Identifier, Sequence};
use crate::common::SourceLocation;
use crate::diagnostics::SemanticErrorKind;
use crate::interp::{FunctionPointerValue, Value};
use crate::modules::LoadedModule;
use crate::ir::{Instruction, InstructionSequence};
use crate::parser::parse_source;
use crate::types::{FunctionId, Type};

use super::lambda::{FunctionBody, FunctionCheck};
use super::{Checker, Evaluated, Evaluation, Failed, ModuleState};

impl Checker<'_> {
    pub(crate) fn evaluate_import(
        &mut self,
        body: &mut InstructionSequence,
        name: &Identifier,
    ) -> Evaluation {
        match self.modules.get(&name.value) {
            Some(ModuleState::Loaded { value, type_ }) => {
                let (value, type_) = (value.clone(), type_.clone());
                return Ok(self.emit_literal(body, value, type_));
            }
            Some(ModuleState::Loading | ModuleState::Failed) => {
                self.report(SemanticErrorKind::ImportFailed, name.source);
                return Err(Failed);
            }
            None => {}
        }
        self.modules.insert(name.value.clone(), ModuleState::Loading);
        match self.load_module(&name.value, name.source) {
            Ok((value, type_)) => {
                self.modules.insert(
                    name.value.clone(),
                    ModuleState::Loaded {
                        value: value.clone(),
                        type_: type_.clone(),
                    },
                );
                Ok(self.emit_literal(body, value, type_))
            }
            Err(note) => {
                self.modules.insert(name.value.clone(), ModuleState::Failed);
                self.report_with_note(SemanticErrorKind::ImportFailed, name.source, note);
                Err(Failed)
            }
        }
    }

    /// Checks a module as a function without parameters and runs it. The
    /// error may carry a note for the `import_failed` diagnostic.
    fn load_module(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> Result<(Value, Type), Option<String>> {
        let _span = tracing::debug_span!("import", module = name).entered();
        let loader = self.loader;
        let Some(module) = loader.load(name, self.frame().import_directory.as_deref()) else {
            return Err(Some(format!("module `{}` was not found", name)));
        };
        let root = parse_source(&module.source.content).map_err(|error| {
            tracing::debug!(%error, file = %module.source.name, "module does not parse");
            Some(format!("{}:{}: {}", module.source.name, error.location(), error))
        })?;

        let id = self.program.reserve_function();
        let loaded = self.run_module(id, &module, &root, location);
        if loaded.is_err() {
            self.program.release_function(id);
        }
        loaded.map_err(|Failed| None)
    }

    fn run_module(
        &mut self,
        id: FunctionId,
        module: &LoadedModule,
        root: &Sequence,
        location: SourceLocation,
    ) -> Result<(Value, Type), Failed> {
        let errors_before = self.error_count;
        let checked = self.check_function(FunctionCheck {
            parent: None,
            body: FunctionBody::Sequence(root),
            parameters: Vec::new(),
            self_type: None,
            may_capture: false,
            explicit_return_type: None,
            early_name: None,
            function_id: Some(id),
            source: module.source.clone(),
            import_directory: module.import_directory.clone(),
        });
        let (function, _) = checked?;
        if self.error_count != errors_before {
            return Err(Failed);
        }
        let type_ = function.signature.result.clone().unwrap_or(Type::Unit);
        self.program.functions[id.index()] = function;

        let entry = FunctionPointerValue::Internal {
            function: id,
            captures: Vec::new(),
        };
        match self.interpret_call(&entry, Vec::new()) {
            Ok(value) if !value.is_mutable() => {
                tracing::debug!(%type_, "imported module");
                Ok((value, type_))
            }
            Ok(_) => Err(Failed),
            Err(error) => {
                self.report_interpret_error(&error, location);
                Err(Failed)
            }
        }
    }

    /// `new_array(T)` is an empty instance of `array[T]` from the `array` module
    pub(crate) fn evaluate_new_array(
        &mut self,
        body: &mut InstructionSequence,
        element: &Expression,
    ) -> Evaluation {
        let location = element.source_begin();
        let before = self.checkpoint(body);
        let element_type = self.expect_compile_time_type(body, element);
        self.restore(body, before);
        let element_type = element_type?;

        let before = self.checkpoint(body);
        let interface = self.array_interface(body, element_type.clone(), location);
        self.restore(body, before);
        let interface = interface?;

        let into = self.allocate_register();
        body.push(Instruction::NewArray {
            into,
            element_type,
        });
        Ok(Evaluated::value(into, Type::Interface(interface), None, false))
    }

    fn array_interface(
        &mut self,
        body: &mut InstructionSequence,
        element_type: Type,
        location: SourceLocation,
    ) -> Result<crate::types::InterfaceId, Failed> {
        let module = self.evaluate_import(body, &Identifier::new("array", location))?;
        let generic = match module.compile_time_value {
            Some(Value::Structure(members)) => members.into_iter().next(),
            _ => None,
        };
        let Some(generic @ Value::GenericInterface(_)) = generic else {
            self.report(SemanticErrorKind::ImportFailed, location);
            return Err(Failed);
        };
        let instantiated = self.instantiate(
            body,
            generic,
            vec![Value::Type(element_type)],
            vec![Type::Type],
            location,
        )?;
        match instantiated.compile_time_value {
            Some(Value::Type(Type::Interface(id))) => Ok(id),
            _ => {
                self.report(SemanticErrorKind::ImportFailed, location);
                Err(Failed)
            }
        }
    }
}
