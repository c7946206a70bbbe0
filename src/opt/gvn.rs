//! Pass 5: global value numbering / CSE (spec §4.E pass 5).
//!
//! Per-basic-block equivalence classes keyed by
//! `(op, operandKey(l), operandKey(r), destUdonType)` — the destination
//! type is part of the key because two `BinaryOp`s with identical
//! operands but different result types (e.g. one `Single`, one
//! `Int32`) are not the same Udon extern call and must not be CSE'd
//! together — with commutative operands sorted so `a+b` and `b+a` hash
//! identically. Entries are killed on any redefinition of a component
//! operand.

use std::collections::HashMap;

use crate::opt::cfg::Cfg;
use crate::tac::entities::Operand;
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

const COMMUTATIVE: &[&str] = &["+", "*", "==", "!=", "&&", "||"];

pub fn run(func: &mut TacFunction) {
    let cfg = Cfg::build(func);
    for block in &cfg.blocks {
        let mut table: HashMap<String, Operand> = HashMap::new();
        for i in block.start..block.end {
            let inst = func.instructions[i].clone();
            if let Instruction::BinaryOp { dest, op, left, right } = &inst {
                let key = value_key(op, left, right, &dest.ty().udon_type());
                if let Some(existing) = table.get(&key) {
                    func.instructions[i] = Instruction::Copy { dest: dest.clone(), src: existing.clone() };
                } else {
                    table.insert(key, dest.clone());
                }
            }
            if let Some(def) = func.instructions[i].def() {
                table.retain(|_, v| v != def);
            }
        }
    }
}

fn value_key(op: &str, left: &Operand, right: &Operand, dest_udon_type: &str) -> String {
    let (a, b) = if COMMUTATIVE.contains(&op) {
        let mut keys = [left.value_key(), right.value_key()];
        keys.sort();
        (keys[0].clone(), keys[1].clone())
    } else {
        (left.value_key(), right.value_key())
    };
    format!("{}|{}|{}|{}", op, a, b, dest_udon_type)
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
    fn repeated_expr_reuses_first_computation() {
        let mut f = TacFunction::new(None);
        let t0 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        let t1 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::BinaryOp { dest: t0.clone(), op: "+".to_string(), left: var("a"), right: var("b") });
        f.push(Instruction::BinaryOp { dest: t1, op: "+".to_string(), left: var("b"), right: var("a") });
        run(&mut f);
        assert!(matches!(&f.instructions[1], Instruction::Copy { src, .. } if *src == t0));
    }

    #[test]
    fn same_operands_different_dest_type_are_not_coalesced() {
        let mut f = TacFunction::new(None);
        let t0 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        let t1 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Int32 };
        f.push(Instruction::BinaryOp { dest: t0, op: "+".to_string(), left: var("a"), right: var("b") });
        f.push(Instruction::BinaryOp { dest: t1, op: "+".to_string(), left: var("a"), right: var("b") });
        run(&mut f);
        assert!(matches!(&f.instructions[1], Instruction::BinaryOp { .. }));
    }
}
