//! Pass 3: boolean simplification (spec §4.E pass 3).
//!
//! `x && true -> x`, `x || false -> x`, `x == true -> x`,
//! `x != true -> !x`, and their dual forms with the constant on the
//! left.

use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

pub fn run(func: &mut TacFunction) {
    for inst in func.instructions.iter_mut() {
        if let Instruction::BinaryOp { dest, op, left, right } = inst {
            if let Some(simplified) = simplify(op, left, right) {
                *inst = match simplified {
                    Simplified::Pass(operand) => Instruction::Copy { dest: dest.clone(), src: operand },
                    Simplified::Negate(operand) => Instruction::UnaryOp {
                        dest: dest.clone(),
                        op: "!".to_string(),
                        operand,
                    },
                };
            }
        }
    }
}

enum Simplified {
    Pass(Operand),
    Negate(Operand),
}

fn as_bool_const(op: &Operand) -> Option<bool> {
    match op {
        Operand::Constant { value: ConstValue::Bool(b), .. } => Some(*b),
        _ => None,
    }
}

fn simplify(op: &str, left: &Operand, right: &Operand) -> Option<Simplified> {
    let (const_side, other, const_is_left) = match (as_bool_const(left), as_bool_const(right)) {
        (Some(b), _) => (b, right.clone(), true),
        (_, Some(b)) => (b, left.clone(), false),
        _ => return None,
    };
    let _ = const_is_left;
    match (op, const_side) {
        ("&&", true) => Some(Simplified::Pass(other)),
        ("||", false) => Some(Simplified::Pass(other)),
        ("==", true) => Some(Simplified::Pass(other)),
        ("!=", true) => Some(Simplified::Negate(other)),
        ("==", false) => Some(Simplified::Negate(other)),
        ("!=", false) => Some(Simplified::Pass(other)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSymbol;

    #[test]
    fn and_true_passes_through() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Boolean };
        let x = Operand::Variable {
            name: "x".to_string(),
            ty: TypeSymbol::Boolean,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        f.push(Instruction::BinaryOp {
            dest,
            op: "&&".to_string(),
            left: x.clone(),
            right: Operand::bool_const(true),
        });
        run(&mut f);
        assert!(matches!(&f.instructions[0], Instruction::Copy { src, .. } if *src == x));
    }

    #[test]
    fn not_equal_true_negates() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Boolean };
        let x = Operand::Variable {
            name: "x".to_string(),
            ty: TypeSymbol::Boolean,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        f.push(Instruction::BinaryOp {
            dest,
            op: "!=".to_string(),
            left: x.clone(),
            right: Operand::bool_const(true),
        });
        run(&mut f);
        assert!(matches!(&f.instructions[0], Instruction::UnaryOp { op, operand, .. } if op == "!" && *operand == x));
    }
}
