//! The output of checking: functions plus the nominal type tables

use crate::interp::value::{FunctionPointerValue, Value};
use crate::ir::InstructionSequence;
use crate::types::{EnumId, FunctionId, FunctionPointerType, InterfaceId, StructId, Type};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedFunction {
    pub signature: FunctionPointerType,
    pub body: InstructionSequence,
    pub register_debug_names: Vec<String>,
    pub number_of_registers: u32,
}

impl CheckedFunction {
    /// Placeholder for a reserved function id whose body is not checked yet
    pub fn reserved() -> Self {
        Self {
            signature: FunctionPointerType {
                result: None,
                parameters: Vec::new(),
                captures: Vec::new(),
                self_type: None,
            },
            body: InstructionSequence::new(),
            register_debug_names: Vec::new(),
            number_of_registers: 0,
        }
    }

    /// Registers holding `self` and the parameters when the function starts
    pub fn input_register_count(&self) -> usize {
        self.signature.parameters.len() + usize::from(self.signature.self_type.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureMember {
    pub what: Type,
    pub name: String,
    /// Known when every instance holds the same value, as in the global structure
    pub compile_time_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    pub members: Vec<StructureMember>,
}

impl Structure {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|member| member.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationElement {
    pub name: String,
    pub state: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enumeration {
    pub elements: Vec<EnumerationElement>,
}

impl Enumeration {
    pub fn element_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|element| element.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescription {
    pub name: String,
    pub parameters: Vec<Type>,
    pub result: Type,
}

/// Methods of one `impl`, at the interface's method indices
#[derive(Debug, Clone, PartialEq)]
pub struct Implementation {
    pub methods: Vec<FunctionPointerValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplementationEntry {
    pub self_type: Type,
    pub implementation: Implementation,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interface {
    pub methods: Vec<MethodDescription>,
    pub implementations: Vec<ImplementationEntry>,
}

impl Interface {
    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|method| method.name == name)
    }

    pub fn find_implementation(&self, self_type: &Type) -> Option<usize> {
        self.implementations
            .iter()
            .position(|entry| &entry.self_type == self_type)
    }
}

/// Everything a checked program consists of
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckedProgram {
    pub functions: Vec<CheckedFunction>,
    pub structs: Vec<Structure>,
    pub interfaces: Vec<Interface>,
    pub enums: Vec<Enumeration>,
}

impl CheckedProgram {
    pub fn function(&self, id: FunctionId) -> &CheckedFunction {
        &self.functions[id.index()]
    }

    pub fn structure(&self, id: StructId) -> &Structure {
        &self.structs[id.index()]
    }

    pub fn enumeration(&self, id: EnumId) -> &Enumeration {
        &self.enums[id.index()]
    }

    pub fn interface(&self, id: InterfaceId) -> &Interface {
        &self.interfaces[id.index()]
    }

    pub fn reserve_function(&mut self) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(CheckedFunction::reserved());
        id
    }

    /// Drops a reserved function again if nothing was added after it
    pub fn release_function(&mut self, id: FunctionId) {
        if id.index() + 1 == self.functions.len() {
            self.functions.pop();
        }
    }

    pub fn add_enumeration(&mut self, enumeration: Enumeration) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(enumeration);
        id
    }

    pub fn add_structure(&mut self, structure: Structure) -> StructId {
        let id = StructId(self.structs.len() as u32);
        self.structs.push(structure);
        id
    }

    pub fn add_interface(&mut self, interface: Interface) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len() as u32);
        self.interfaces.push(interface);
        id
    }
}
