//! A lowered function's flat TAC instruction stream (spec §4.D "a
//! single flat instruction stream").
//!
//! Modeled on `cranelift_codegen::ir::Function` at a much smaller
//! scale: where Cranelift splits a function into a `DataFlowGraph`
//! (value/instruction data) and a `Layout` (EBB/instruction ordering),
//! this IR has no basic-block structure of its own prior to the
//! optimizer building one from leaders (spec §4.E), so a single
//! append-only `Vec<Instruction>` plays both roles.

use crate::tac::entities::{Label, Temp};
use crate::tac::instructions::Instruction;
use cranelift_entity::EntityRef;

/// A single lowered function/method body.
#[derive(Clone, Debug, Default)]
pub struct TacFunction {
    /// The name this function is addressed by in the data section /
    /// Udon label space (spec §3.5); `None` for the implicit top-level
    /// `_start` body.
    pub name: Option<String>,
    /// Append-only instruction buffer (spec §4.D "Instruction
    /// buffer").
    pub instructions: Vec<Instruction>,
    next_temp: u32,
    next_label: u32,
}

impl TacFunction {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            next_temp: 0,
            next_label: 0,
        }
    }

    /// Allocate a new, function-unique temporary id (spec §4.D
    /// "Counters").
    pub fn new_temp(&mut self) -> Temp {
        let t = Temp::new(self.next_temp as usize);
        self.next_temp += 1;
        t
    }

    /// Allocate a new, program-unique label id.
    ///
    /// Labels are unique *program-wide* (spec §3.2 invariant), so the
    /// lowerer shares one counter across all functions rather than
    /// resetting it per function; see [`crate::lower::context::LowerCtx`].
    pub fn new_label_from(counter: &mut u32) -> Label {
        let l = Label::new(*counter as usize);
        *counter += 1;
        l
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_unique_and_increasing() {
        let mut f = TacFunction::new(Some("foo".to_string()));
        let t0 = f.new_temp();
        let t1 = f.new_temp();
        assert_ne!(t0, t1);
        assert_eq!(t0.index() + 1, t1.index());
    }
}
