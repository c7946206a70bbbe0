//! Pass 10: jump simplification (spec §4.E pass 10).
//!
//! (a) coalesces runs of adjacent labels at the same address into one
//! canonical name, (b) threads jumps through chains of labels that
//! themselves immediately jump elsewhere, (c) deletes jumps to the
//! label immediately following them, and (d) merges a straight-line
//! block into its single predecessor when neither has any other
//! neighbor.

use std::collections::HashMap;

use crate::opt::cfg::Cfg;
use crate::tac::entities::Label;
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

pub fn run(func: &mut TacFunction) {
    coalesce_adjacent_labels(func);
    thread_jump_chains(func);
    remove_jumps_to_next_label(func);
    merge_straight_line_blocks(func);
}

/// A run of `Label` instructions with nothing between them all denote
/// the same address; canonicalise every later one to the first.
fn coalesce_adjacent_labels(func: &mut TacFunction) {
    let mut canonical: HashMap<Label, Label> = HashMap::new();
    let mut i = 0;
    while i < func.instructions.len() {
        if let Instruction::Label(first) = func.instructions[i] {
            let mut j = i + 1;
            while let Some(Instruction::Label(other)) = func.instructions.get(j).copied() {
                canonical.insert(other, first);
                j += 1;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    if canonical.is_empty() {
        return;
    }
    for inst in func.instructions.iter_mut() {
        retarget(inst, &canonical);
        if let Instruction::Label(l) = inst {
            if let Some(&c) = canonical.get(l) {
                *l = c;
            }
        }
    }
    let mut seen = std::collections::HashSet::new();
    func.instructions.retain(|inst| match inst {
        Instruction::Label(l) => seen.insert(*l),
        _ => true,
    });
}

fn retarget(inst: &mut Instruction, canonical: &HashMap<Label, Label>) {
    match inst {
        Instruction::ConditionalJump { target, .. } | Instruction::UnconditionalJump { target } => {
            if let Some(&c) = canonical.get(target) {
                *target = c;
            }
        }
        _ => {}
    }
}

/// If `target` is a label immediately followed by an unconditional
/// jump to `target2`, every reference to `target` can jump straight
/// to `target2` instead. Bounded to avoid looping on a (malformed)
/// cycle of empty labels.
fn thread_jump_chains(func: &mut TacFunction) {
    let mut label_index: HashMap<Label, usize> = HashMap::new();
    for (i, inst) in func.instructions.iter().enumerate() {
        if let Instruction::Label(l) = inst {
            label_index.insert(*l, i);
        }
    }
    let resolve = |mut target: Label| -> Label {
        for _ in 0..func.instructions.len().max(1) {
            let Some(&idx) = label_index.get(&target) else { break };
            match func.instructions.get(idx + 1) {
                Some(Instruction::UnconditionalJump { target: next }) if *next != target => {
                    target = *next;
                }
                _ => break,
            }
        }
        target
    };
    for inst in func.instructions.iter_mut() {
        match inst {
            Instruction::ConditionalJump { target, .. } | Instruction::UnconditionalJump { target } => {
                *target = resolve(*target);
            }
            _ => {}
        }
    }
}

fn remove_jumps_to_next_label(func: &mut TacFunction) {
    let mut keep = vec![true; func.instructions.len()];
    for i in 0..func.instructions.len() {
        if let Instruction::UnconditionalJump { target } = &func.instructions[i] {
            if let Some(Instruction::Label(next)) = func.instructions.get(i + 1) {
                if next == target {
                    keep[i] = false;
                }
            }
        }
    }
    let mut kept = keep.into_iter();
    func.instructions.retain(|_| kept.next().unwrap());
}

/// A block that falls straight through into the only block that falls
/// into it from nowhere else has nothing to branch on between them —
/// the label marking the successor's start is dead and merging it away
/// collapses the two into one block for any later pass that rebuilds
/// the CFG (spec §4.E pass 10d).
fn merge_straight_line_blocks(func: &mut TacFunction) {
    loop {
        let cfg = Cfg::build(func);
        let mut dead_label_idx = None;
        for (bi, block) in cfg.blocks.iter().enumerate() {
            if block.successors.len() != 1 {
                continue;
            }
            let si = block.successors[0];
            if si == bi || block.end != cfg.blocks[si].start {
                continue;
            }
            let succ = &cfg.blocks[si];
            if succ.predecessors.len() != 1 || succ.predecessors[0] != bi {
                continue;
            }
            if matches!(func.instructions.get(succ.start), Some(Instruction::Label(_))) {
                dead_label_idx = Some(succ.start);
                break;
            }
        }
        match dead_label_idx {
            Some(idx) => {
                func.instructions.remove(idx);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::Operand;
    use cranelift_entity::EntityRef;

    #[test]
    fn jump_to_immediately_following_label_is_dropped() {
        let l0 = Label::new(0);
        let mut f = TacFunction::new(None);
        f.push(Instruction::UnconditionalJump { target: l0 });
        f.push(Instruction::Label(l0));
        f.push(Instruction::Return { value: None });
        run(&mut f);
        assert!(!f.instructions.iter().any(|i| matches!(i, Instruction::UnconditionalJump { .. })));
    }

    #[test]
    fn unreferenced_label_between_straight_line_blocks_is_merged_away() {
        let l0 = Label::new(0);
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: crate::types::TypeSymbol::Single };
        f.push(Instruction::Copy { dest, src: Operand::number_const(1.0) });
        f.push(Instruction::Label(l0));
        f.push(Instruction::Return { value: None });
        run(&mut f);
        assert!(!f.instructions.iter().any(|i| matches!(i, Instruction::Label(_))));
    }

    #[test]
    fn adjacent_labels_coalesce() {
        let l0 = Label::new(0);
        let l1 = Label::new(1);
        let mut f = TacFunction::new(None);
        f.push(Instruction::UnconditionalJump { target: l1 });
        f.push(Instruction::Label(l0));
        f.push(Instruction::Label(l1));
        f.push(Instruction::Return { value: None });
        run(&mut f);
        let labels: Vec<_> = f.instructions.iter().filter(|i| matches!(i, Instruction::Label(_))).collect();
        assert_eq!(labels.len(), 1);
    }
}
