//! Implicit conversions between types

use crate::common::SourceLocation;
use crate::diagnostics::SemanticErrorKind;
use crate::interp::value::ImplementationRef;
use crate::ir::{Instruction, InstructionSequence};
use crate::types::{is_implicitly_convertible, InterfaceId, Type};

use super::{Checker, Evaluated, Evaluation, Failed};

impl Checker<'_> {
    /// Converts an evaluated value to `to`, reporting `type_mismatch` at
    /// `source` when that is impossible. With `may_widen` an integer range
    /// that does not fit is widened instead.
    pub(crate) fn convert(
        &mut self,
        body: &mut InstructionSequence,
        from: Evaluated,
        to: &Type,
        may_widen: bool,
        source: SourceLocation,
    ) -> Evaluation {
        if from.type_ == *to {
            return Ok(from);
        }
        match to {
            Type::IntegerRange(target) => {
                let Some(range) = from.type_.as_integer_range() else {
                    return self.mismatch(source);
                };
                let type_ = if target.contains(&range) {
                    to.clone()
                } else if may_widen {
                    Type::IntegerRange(target.combine(&range))
                } else {
                    return self.mismatch(source);
                };
                Ok(Evaluated { type_, ..from })
            }
            Type::Tuple(_) if is_implicitly_convertible(&from.type_, to) => Ok(Evaluated {
                type_: to.clone(),
                ..from
            }),
            Type::Interface(interface) => self.convert_to_interface(body, from, *interface, source),
            _ => self.mismatch(source),
        }
    }

    fn convert_to_interface(
        &mut self,
        body: &mut InstructionSequence,
        from: Evaluated,
        interface: InterfaceId,
        source: SourceLocation,
    ) -> Evaluation {
        if !self.interfaces_defined.contains(&interface) {
            return self.mismatch(source);
        }
        let Some(index) = self.require_implementation(interface, &from.type_) else {
            return self.mismatch(source);
        };
        let into = self.allocate_register();
        body.push(Instruction::EraseType {
            self_: from.where_,
            into,
            implementation: ImplementationRef {
                interface,
                index: index as u32,
            },
        });
        Ok(Evaluated::value(into, Type::Interface(interface), None, from.is_pure))
    }

    fn mismatch(&mut self, source: SourceLocation) -> Evaluation {
        self.report(SemanticErrorKind::TypeMismatch, source);
        Err(Failed)
    }
}
