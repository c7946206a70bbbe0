//! Component F: TAC -> Udon lowering (spec §4.F, §3.4).

pub mod instructions;
pub mod lower;

pub use instructions::{JumpTarget, UdonInstruction};
pub use lower::{lower_function, UdonModule};
