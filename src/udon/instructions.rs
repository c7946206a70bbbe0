//! Component F: the Udon instruction set (spec §3.4).
//!
//! Each variant has a fixed byte size used for address computation
//! (spec §3.4) — the VM ABI sets these sizes; the assembler only
//! needs them to compute offsets consistently, the same role
//! `cranelift_codegen::binemit::CodeSink` sizes play for real machine
//! code.

/// A reference to a Udon data-section entry, by its allocated name.
pub type DataName = String;

/// Either a resolved label name or a literal 8-hex-digit address;
/// resolved to the latter by the assembler (spec §4.G.2).
#[derive(Clone, Debug, PartialEq)]
pub enum JumpTarget {
    Label(String),
    Address(u32),
}

/// One Udon VM instruction (spec §3.4).
#[derive(Clone, Debug, PartialEq)]
pub enum UdonInstruction {
    Push(DataName),
    Pop,
    Copy,
    /// An interned extern signature name, plus whether it's known pure
    /// (carried through from the TAC `Call`/`MethodCall` resolution,
    /// informational only at this stage — purity was already spent by
    /// the optimizer's constant folder).
    Extern { signature: DataName, is_pure: bool },
    Jump(JumpTarget),
    JumpIfFalse(JumpTarget),
    Label(String),
    Annotation(String),
}

impl UdonInstruction {
    /// Byte size used for address computation (spec §3.4). `Label`
    /// itself has no size — addresses are recorded at the label, they
    /// don't advance the cursor.
    pub fn byte_size(&self) -> u32 {
        match self {
            UdonInstruction::Push(_) => 8,
            UdonInstruction::Pop => 4,
            UdonInstruction::Copy => 4,
            UdonInstruction::Extern { .. } => 8,
            UdonInstruction::Jump(_) => 8,
            UdonInstruction::JumpIfFalse(_) => 16,
            UdonInstruction::Label(_) => 0,
            UdonInstruction::Annotation(_) => 0,
        }
    }
}
