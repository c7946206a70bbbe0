//! A compiler that lowers a statically-typed, class-based surface
//! language into VRChat Udon's `.uasm` text assembly format (spec §1,
//! §2).
//!
//! The pipeline runs straight through components A-G: parse (owned by
//! a caller-supplied [`ast::Program`]), lower to TAC ([`lower`]),
//! optimize ([`opt`]), lower TAC to Udon instructions ([`udon`]), and
//! assemble the final text ([`asm`]). [`compile::compile`] is the one
//! entry point that runs all of it.

pub mod asm;
pub mod ast;
pub mod catalog;
pub mod compile;
pub mod config;
pub mod externs;
pub mod lower;
pub mod opt;
pub mod result;
pub mod tac;
pub mod types;
pub mod udon;
pub mod vrc_events;

pub use compile::compile;
pub use config::{CompileOptions, NumberIsFiniteStrategy};
pub use result::{CodegenError, CodegenResult};
