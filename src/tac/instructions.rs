//! TAC instructions (spec §3.3).
//!
//! One flat `enum` rather than Cranelift's data-driven
//! `InstructionData`/opcode-table split: this IR has a fixed, small
//! instruction set (unlike a real target ISA's hundreds of opcodes),
//! so a single `enum` with named fields reads better than a generic
//! opcode-plus-operands encoding.

use crate::tac::entities::{Label, Operand, Temp};
use crate::types::TypeSymbol;

/// How a static/user function is called (spec §3.3 "Call").
#[derive(Clone, Debug, PartialEq)]
pub enum CallTarget {
    /// A resolved extern signature string (spec §4.B).
    Extern(String),
    /// A user-defined function that was not inlined, referenced by
    /// name (only possible for non-recursive, non-inlined statics;
    /// everything else is inlined or lowered to an extern call).
    UserFunction(String),
}

/// A single TAC instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// `dest = src` where `src` is an arbitrary operand (as opposed
    /// to `Copy`, which is specifically variable/temp-to-variable/temp).
    Assignment { dest: Operand, src: Operand },
    /// A plain copy between two storage locations.
    Copy { dest: Operand, src: Operand },
    BinaryOp {
        dest: Operand,
        op: String,
        left: Operand,
        right: Operand,
    },
    UnaryOp {
        dest: Operand,
        op: String,
        operand: Operand,
    },
    Cast {
        dest: Operand,
        src: Operand,
        to: TypeSymbol,
    },
    /// *ifFalse cond goto label* (spec §3.3 semantics).
    ConditionalJump { cond: Operand, target: Label },
    UnconditionalJump { target: Label },
    Label(Label),
    Call {
        dest: Option<Operand>,
        target: CallTarget,
        args: Vec<Operand>,
    },
    MethodCall {
        dest: Option<Operand>,
        receiver: Operand,
        target: CallTarget,
        args: Vec<Operand>,
    },
    PropertyGet {
        dest: Operand,
        receiver: Operand,
        property: String,
        getter: String,
    },
    PropertySet {
        receiver: Operand,
        property: String,
        setter: String,
        value: Operand,
    },
    Return { value: Option<Operand> },
    ArrayAccess {
        dest: Operand,
        array: Operand,
        index: Operand,
        getter: String,
    },
    ArrayAssignment {
        array: Operand,
        index: Operand,
        value: Operand,
        setter: String,
    },
}

impl Instruction {
    /// Is this instruction a block terminator for CFG-leader purposes
    /// (spec §4.E "CFG construction")?
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::UnconditionalJump { .. }
                | Instruction::ConditionalJump { .. }
                | Instruction::Return { .. }
        )
    }

    /// The operand this instruction defines, if any — used by
    /// liveness (spec §4.E pass 8) and GVN (pass 5).
    pub fn def(&self) -> Option<&Operand> {
        match self {
            Instruction::Assignment { dest, .. }
            | Instruction::Copy { dest, .. }
            | Instruction::BinaryOp { dest, .. }
            | Instruction::UnaryOp { dest, .. }
            | Instruction::Cast { dest, .. }
            | Instruction::PropertyGet { dest, .. }
            | Instruction::ArrayAccess { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } | Instruction::MethodCall { dest, .. } => dest.as_ref(),
            _ => None,
        }
    }

    /// The operands this instruction uses (reads), in instruction order.
    pub fn uses(&self) -> Vec<&Operand> {
        match self {
            Instruction::Assignment { src, .. } | Instruction::Copy { src, .. } => vec![src],
            Instruction::BinaryOp { left, right, .. } => vec![left, right],
            Instruction::UnaryOp { operand, .. } => vec![operand],
            Instruction::Cast { src, .. } => vec![src],
            Instruction::ConditionalJump { cond, .. } => vec![cond],
            Instruction::UnconditionalJump { .. } | Instruction::Label(_) => vec![],
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::MethodCall { receiver, args, .. } => {
                let mut v = vec![receiver];
                v.extend(args.iter());
                v
            }
            Instruction::PropertyGet { receiver, .. } => vec![receiver],
            Instruction::PropertySet { receiver, value, .. } => vec![receiver, value],
            Instruction::Return { value } => value.iter().collect(),
            Instruction::ArrayAccess { array, index, .. } => vec![array, index],
            Instruction::ArrayAssignment { array, index, value, .. } => vec![array, index, value],
        }
    }

    /// Is this instruction a "pure producer" — no observable side
    /// effect beyond writing its destination (spec §4.E passes 6, 8,
    /// 11)? Extern calls are conservatively impure unless explicitly
    /// known pure (the constant-fold whitelist, spec §4.E pass 1);
    /// this is the coarser, IR-shape-only notion used by DCE/LICM, not
    /// the fold whitelist.
    pub fn is_pure_producer(&self) -> bool {
        matches!(
            self,
            Instruction::Assignment { .. }
                | Instruction::Copy { .. }
                | Instruction::BinaryOp { .. }
                | Instruction::UnaryOp { .. }
                | Instruction::Cast { .. }
        )
    }

    /// Rewrite this instruction's destination temp in place (used by
    /// single-use elision, spec §4.E pass 6).
    pub fn set_dest(&mut self, new_dest: Operand) {
        match self {
            Instruction::Assignment { dest, .. }
            | Instruction::Copy { dest, .. }
            | Instruction::BinaryOp { dest, .. }
            | Instruction::UnaryOp { dest, .. }
            | Instruction::Cast { dest, .. }
            | Instruction::PropertyGet { dest, .. }
            | Instruction::ArrayAccess { dest, .. } => *dest = new_dest,
            Instruction::Call { dest, .. } | Instruction::MethodCall { dest, .. } => {
                *dest = Some(new_dest)
            }
            _ => {}
        }
    }

    /// All temporaries referenced anywhere in this instruction
    /// (def or use) — used by the linear-scan allocator (spec §4.E
    /// pass 15) to build live intervals.
    pub fn referenced_temps(&self) -> Vec<Temp> {
        let mut out = Vec::new();
        if let Some(d) = self.def() {
            if let Some(t) = d.as_temp() {
                out.push(t);
            }
        }
        for u in self.uses() {
            if let Some(t) = u.as_temp() {
                out.push(t);
            }
        }
        out
    }
}
