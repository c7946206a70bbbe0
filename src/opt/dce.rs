//! Passes 7-9: no-op copy removal, dead-store elimination, and
//! dead-code elimination (spec §4.E).

use std::collections::HashSet;

use crate::opt::cfg::Cfg;
use crate::tac::entities::Temp;
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

/// Pass 7: drop `dest = dest`.
pub fn remove_noop_copies(func: &mut TacFunction) {
    func.instructions.retain(|inst| !matches!(inst, Instruction::Copy { dest, src } if dest == src));
}

/// Pass 9: anything after an unconditional jump or return, up to (not
/// including) the next label, is unreachable and dropped.
pub fn remove_unreachable_tail(func: &mut TacFunction) {
    let mut keep = vec![true; func.instructions.len()];
    let mut dead = false;
    for (i, inst) in func.instructions.iter().enumerate() {
        if dead {
            if matches!(inst, Instruction::Label(_)) {
                dead = false;
            } else {
                keep[i] = false;
                continue;
            }
        }
        if matches!(inst, Instruction::UnconditionalJump { .. } | Instruction::Return { .. }) {
            dead = true;
        }
    }
    let mut kept = keep.into_iter();
    func.instructions.retain(|_| kept.next().unwrap());
}

/// Pass 8: iterative backward liveness fixpoint; drop pure producers
/// whose destination temp is neither live-in nor live-out of its
/// block.
pub fn remove_dead_stores(func: &mut TacFunction) {
    let cfg = Cfg::build(func);
    let n = cfg.blocks.len();
    let mut live_in: Vec<HashSet<Temp>> = vec![HashSet::new(); n];
    let mut live_out: Vec<HashSet<Temp>> = vec![HashSet::new(); n];

    let mut changed = true;
    while changed {
        changed = false;
        for b in (0..n).rev() {
            let mut out = HashSet::new();
            for &s in &cfg.blocks[b].successors {
                out.extend(live_in[s].iter().copied());
            }
            if out != live_out[b] {
                live_out[b] = out.clone();
                changed = true;
            }
            let mut inp = out;
            for i in (cfg.blocks[b].start..cfg.blocks[b].end).rev() {
                let inst = &func.instructions[i];
                if let Some(t) = inst.def().and_then(|d| d.as_temp()) {
                    inp.remove(&t);
                }
                for u in inst.uses() {
                    if let Some(t) = u.as_temp() {
                        inp.insert(t);
                    }
                }
            }
            if inp != live_in[b] {
                live_in[b] = inp;
                changed = true;
            }
        }
    }

    let mut keep = vec![true; func.instructions.len()];
    for (b, block) in cfg.blocks.iter().enumerate() {
        let mut live = live_out[b].clone();
        for i in (block.start..block.end).rev() {
            let inst = &func.instructions[i];
            if inst.is_pure_producer() {
                if let Some(t) = inst.def().and_then(|d| d.as_temp()) {
                    if !live.contains(&t) {
                        keep[i] = false;
                    }
                }
            }
            if let Some(t) = inst.def().and_then(|d| d.as_temp()) {
                live.remove(&t);
            }
            for u in inst.uses() {
                if let Some(t) = u.as_temp() {
                    live.insert(t);
                }
            }
        }
    }
    let mut kept = keep.into_iter();
    func.instructions.retain(|_| kept.next().unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::Operand;
    use crate::types::TypeSymbol;

    #[test]
    fn noop_copy_is_dropped() {
        let mut f = TacFunction::new(None);
        let x = Operand::Variable {
            name: "x".to_string(),
            ty: TypeSymbol::Single,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        f.push(Instruction::Copy { dest: x.clone(), src: x });
        remove_noop_copies(&mut f);
        assert!(f.instructions.is_empty());
    }

    #[test]
    fn unreachable_tail_is_dropped() {
        use crate::tac::entities::Label;
        use cranelift_entity::EntityRef;
        let mut f = TacFunction::new(None);
        f.push(Instruction::Return { value: None });
        f.push(Instruction::Copy { dest: Operand::number_const(0.0), src: Operand::number_const(0.0) });
        f.push(Instruction::Label(Label::new(0)));
        f.push(Instruction::Return { value: None });
        remove_unreachable_tail(&mut f);
        assert_eq!(f.instructions.len(), 3);
    }
}
