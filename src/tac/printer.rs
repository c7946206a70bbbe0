//! A textual printer for TAC (spec §4.C "printer").
//!
//! Mirrors the relationship `cranelift_codegen::write::write_function`
//! has to `ir::Function`: a separate module rather than a `Display`
//! impl directly on [`TacFunction`], since the teacher reserves
//! `Display` for single entities and uses a free function for whole-
//! function output (so callers can choose plain vs. annotated
//! writers, spec's `write.rs`-style `FuncWriter` split). Optimizer
//! unit tests assert against this output rather than against
//! instruction-shape pattern matches (SPEC_FULL.md §1.4).

use std::fmt::Write;

use crate::tac::function::TacFunction;
use crate::tac::instructions::{CallTarget, Instruction};

/// Render every instruction of `func` as one line of text per
/// instruction, in buffer order.
pub fn write_function(func: &TacFunction) -> String {
    let mut s = String::new();
    if let Some(name) = &func.name {
        writeln!(s, "function {}:", name).unwrap();
    }
    for inst in &func.instructions {
        writeln!(s, "    {}", format_instruction(inst)).unwrap();
    }
    s
}

fn format_instruction(inst: &Instruction) -> String {
    match inst {
        Instruction::Assignment { dest, src } => format!("{} = {}", dest, src),
        Instruction::Copy { dest, src } => format!("{} := {}", dest, src),
        Instruction::BinaryOp { dest, op, left, right } => {
            format!("{} = {} {} {}", dest, left, op, right)
        }
        Instruction::UnaryOp { dest, op, operand } => format!("{} = {}{}", dest, op, operand),
        Instruction::Cast { dest, src, to } => format!("{} = ({}) {}", dest, to, src),
        Instruction::ConditionalJump { cond, target } => {
            format!("ifFalse {} goto {}", cond, target)
        }
        Instruction::UnconditionalJump { target } => format!("goto {}", target),
        Instruction::Label(label) => format!("{}:", label),
        Instruction::Call { dest, target, args } => {
            let args_str = args
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let call = format!("{}({})", format_target(target), args_str);
            match dest {
                Some(d) => format!("{} = {}", d, call),
                None => call,
            }
        }
        Instruction::MethodCall {
            dest,
            receiver,
            target,
            args,
        } => {
            let args_str = args
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let call = format!("{}.{}({})", receiver, format_target(target), args_str);
            match dest {
                Some(d) => format!("{} = {}", d, call),
                None => call,
            }
        }
        Instruction::PropertyGet {
            dest,
            receiver,
            property,
            ..
        } => format!("{} = {}.{}", dest, receiver, property),
        Instruction::PropertySet {
            receiver,
            property,
            value,
            ..
        } => format!("{}.{} = {}", receiver, property, value),
        Instruction::Return { value } => match value {
            Some(v) => format!("return {}", v),
            None => "return".to_string(),
        },
        Instruction::ArrayAccess {
            dest, array, index, ..
        } => format!("{} = {}[{}]", dest, array, index),
        Instruction::ArrayAssignment {
            array, index, value, ..
        } => format!("{}[{}] = {}", array, index, value),
    }
}

fn format_target(target: &CallTarget) -> String {
    match target {
        CallTarget::Extern(sig) => sig.clone(),
        CallTarget::UserFunction(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::Operand;
    use crate::types::TypeSymbol;

    #[test]
    fn prints_a_copy() {
        let mut f = TacFunction::new(None);
        f.push(Instruction::Copy {
            dest: Operand::Variable {
                name: "x".to_string(),
                ty: TypeSymbol::Single,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            },
            src: Operand::number_const(10.0),
        });
        let text = write_function(&f);
        assert_eq!(text.trim(), "x := 10");
    }
}
