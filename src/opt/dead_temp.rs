//! Pass 13: dead-temporary elimination, iterated to a fixpoint
//! (spec §4.E pass 13).
//!
//! Distinct from pass 8's CFG-liveness dead-store elimination: this is
//! the cheaper whole-function "is this temp ever used anywhere"
//! sweep, repeated until a pass removes nothing, since eliminating one
//! dead producer can make an earlier one dead in turn.

use std::collections::HashSet;

use crate::tac::entities::Temp;
use crate::tac::function::TacFunction;

pub fn run(func: &mut TacFunction) {
    loop {
        let mut used: HashSet<Temp> = HashSet::new();
        for inst in &func.instructions {
            for u in inst.uses() {
                if let Some(t) = u.as_temp() {
                    used.insert(t);
                }
            }
        }
        let before = func.instructions.len();
        func.instructions.retain(|inst| {
            if !inst.is_pure_producer() {
                return true;
            }
            match inst.def().and_then(|d| d.as_temp()) {
                Some(t) => used.contains(&t),
                None => true,
            }
        });
        if func.instructions.len() == before {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::Operand;
    use crate::tac::instructions::Instruction;
    use crate::types::TypeSymbol;

    #[test]
    fn unused_temp_chain_is_removed() {
        let mut f = TacFunction::new(None);
        let t0 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        let t1 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::BinaryOp { dest: t0.clone(), op: "+".to_string(), left: Operand::number_const(1.0), right: Operand::number_const(2.0) });
        f.push(Instruction::BinaryOp { dest: t1, op: "*".to_string(), left: t0, right: Operand::number_const(3.0) });
        run(&mut f);
        assert!(f.instructions.is_empty());
    }
}
