//! Component C: the TAC intermediate representation (spec §3.2, §3.3).

pub mod entities;
pub mod function;
pub mod instructions;
pub mod printer;

pub use entities::{ConstValue, Label, Operand, Temp};
pub use function::TacFunction;
pub use instructions::{CallTarget, Instruction};
