//! Pass 4: algebraic simplification (spec §4.E pass 4).
//!
//! `x + 0`, `x - 0`, `x * 1`, `x * 0`, `x / 1`, unary plus, and
//! self-casts (`cast T -> T` where `src`'s type already equals `to`).

use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

pub fn run(func: &mut TacFunction) {
    for inst in func.instructions.iter_mut() {
        match inst {
            Instruction::BinaryOp { dest, op, left, right } => {
                if let Some(v) = simplify_binary(op, left, right) {
                    *inst = Instruction::Copy { dest: dest.clone(), src: v };
                }
            }
            Instruction::UnaryOp { dest, op, operand } if op == "+" => {
                *inst = Instruction::Copy { dest: dest.clone(), src: operand.clone() };
            }
            Instruction::Cast { dest, src, to } if src.ty() == *to => {
                *inst = Instruction::Copy { dest: dest.clone(), src: src.clone() };
            }
            _ => {}
        }
    }
}

fn as_number(op: &Operand) -> Option<f64> {
    match op {
        Operand::Constant { value: ConstValue::Number(n), .. } => Some(*n),
        _ => None,
    }
}

fn simplify_binary(op: &str, left: &Operand, right: &Operand) -> Option<Operand> {
    match op {
        "+" if as_number(right) == Some(0.0) => Some(left.clone()),
        "+" if as_number(left) == Some(0.0) => Some(right.clone()),
        "-" if as_number(right) == Some(0.0) => Some(left.clone()),
        "*" if as_number(right) == Some(1.0) => Some(left.clone()),
        "*" if as_number(left) == Some(1.0) => Some(right.clone()),
        "*" if as_number(right) == Some(0.0) => Some(right.clone()),
        "*" if as_number(left) == Some(0.0) => Some(left.clone()),
        "/" if as_number(right) == Some(1.0) => Some(left.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSymbol;

    fn var(name: &str) -> Operand {
        Operand::Variable {
            name: name.to_string(),
            ty: TypeSymbol::Single,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        }
    }

    #[test]
    fn x_plus_zero_elides() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::BinaryOp {
            dest,
            op: "+".to_string(),
            left: var("x"),
            right: Operand::number_const(0.0),
        });
        run(&mut f);
        assert!(matches!(&f.instructions[0], Instruction::Copy { src, .. } if *src == var("x")));
    }

    #[test]
    fn self_cast_elides() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::Cast { dest, src: var("x"), to: TypeSymbol::Single });
        run(&mut f);
        assert!(matches!(&f.instructions[0], Instruction::Copy { .. }));
    }
}
