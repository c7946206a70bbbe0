//! Dominator computation (spec §4.E "Dominators"), used by LICM
//! (pass 11) to find natural loops.
//!
//! Standard iterative fixpoint, the same shape as
//! `cranelift_codegen::dominator_tree::DominatorTree` computes before
//! it collapses to immediate dominators — this stays at the full
//! dominator-set representation since natural-loop discovery below
//! only needs set membership, not an idom tree walk.

use std::collections::HashSet;

use crate::opt::cfg::Cfg;

/// `dom(b)` for every block, computed to a fixpoint.
#[derive(Clone, Debug)]
pub struct Dominators {
    sets: Vec<HashSet<usize>>,
}

impl Dominators {
    pub fn compute(cfg: &Cfg) -> Dominators {
        let n = cfg.blocks.len();
        let entry = cfg.entry();
        let universe: HashSet<usize> = (0..n).collect();
        let mut sets: Vec<HashSet<usize>> = (0..n)
            .map(|b| if b == entry { [entry].into_iter().collect() } else { universe.clone() })
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for b in 0..n {
                if b == entry {
                    continue;
                }
                let preds = &cfg.blocks[b].predecessors;
                let new_set = if preds.is_empty() {
                    let mut s = HashSet::new();
                    s.insert(b);
                    s
                } else {
                    let mut iter = preds.iter();
                    let first = *iter.next().unwrap();
                    let mut acc = sets[first].clone();
                    for &p in iter {
                        acc = acc.intersection(&sets[p]).copied().collect();
                    }
                    acc.insert(b);
                    acc
                };
                if new_set != sets[b] {
                    sets[b] = new_set;
                    changed = true;
                }
            }
        }
        Dominators { sets }
    }

    pub fn dominates(&self, a: usize, b: usize) -> bool {
        self.sets[b].contains(&a)
    }

    /// Natural loops: a back edge `b -> h` where `h` dominates `b`
    /// (spec §4.E pass 11). Returns `(header, back_edge_block)` pairs.
    pub fn back_edges(&self, cfg: &Cfg) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for (b, block) in cfg.blocks.iter().enumerate() {
            for &s in &block.successors {
                if self.dominates(s, b) {
                    edges.push((s, b));
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::{Label, Operand};
    use crate::tac::function::TacFunction;
    use crate::tac::instructions::Instruction;
    use cranelift_entity::EntityRef;

    #[test]
    fn loop_back_edge_is_detected() {
        let header = Label::new(0);
        let mut f = TacFunction::new(None);
        f.push(Instruction::Label(header));
        f.push(Instruction::ConditionalJump { cond: Operand::bool_const(true), target: Label::new(1) });
        f.push(Instruction::UnconditionalJump { target: header });
        f.push(Instruction::Label(Label::new(1)));
        f.push(Instruction::Return { value: None });

        let cfg = Cfg::build(&f);
        let doms = Dominators::compute(&cfg);
        let edges = doms.back_edges(&cfg);
        assert!(!edges.is_empty());
    }
}
