//! Pass 6: single-use temporary elision (spec §4.E pass 6).
//!
//! If a pure producer's destination temporary is used exactly once,
//! and the very next instruction is a copy from that temporary,
//! rewrite the producer's destination in place and drop the copy —
//! the same "fold into consumer" move `cranelift_codegen`'s alias
//! analysis makes for single-use values, done here syntactically
//! since this IR has no SSA use-list to consult.

use std::collections::HashMap;

use crate::tac::entities::Temp;
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

pub fn run(func: &mut TacFunction) {
    let mut use_counts: HashMap<Temp, u32> = HashMap::new();
    for inst in &func.instructions {
        for u in inst.uses() {
            if let Some(t) = u.as_temp() {
                *use_counts.entry(t).or_insert(0) += 1;
            }
        }
    }

    let mut i = 0;
    while i + 1 < func.instructions.len() {
        let producer_is_pure = func.instructions[i].is_pure_producer();
        let producer_temp = func.instructions[i].def().and_then(|d| d.as_temp());
        if producer_is_pure {
            if let Some(t) = producer_temp {
                if use_counts.get(&t).copied().unwrap_or(0) == 1 {
                    if let Instruction::Copy { dest, src } = &func.instructions[i + 1] {
                        if src.as_temp() == Some(t) {
                            let new_dest = dest.clone();
                            func.instructions[i].set_dest(new_dest);
                            func.instructions.remove(i + 1);
                            continue;
                        }
                    }
                }
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::Operand;
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
    fn single_use_temp_folds_into_dest() {
        let mut f = TacFunction::new(None);
        let t0 = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::BinaryOp { dest: t0.clone(), op: "+".to_string(), left: var("a"), right: var("b") });
        f.push(Instruction::Copy { dest: var("result"), src: t0 });
        run(&mut f);
        assert_eq!(f.instructions.len(), 1);
        assert!(matches!(&f.instructions[0], Instruction::BinaryOp { dest, .. } if *dest == var("result")));
    }
}
