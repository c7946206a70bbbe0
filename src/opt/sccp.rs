//! Pass 2: sparse conditional constant propagation with unreachable-
//! block pruning (spec §4.E pass 2).
//!
//! A worklist algorithm over a per-variable lattice
//! `Unknown < Constant < Copy` combined with block reachability:
//! conditional jumps whose condition resolves to a known constant are
//! rewritten (constant-false: replaced with an unconditional jump to
//! the fallthrough; constant-true: dropped entirely, since control
//! simply falls through), and blocks no reachability analysis ever
//! marks live are removed wholesale.

use std::collections::{HashMap, VecDeque};

use crate::opt::cfg::Cfg;
use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

#[derive(Clone, Debug, PartialEq)]
enum LatticeValue {
    Unknown,
    Constant(ConstValue),
    /// Tracks its known-constant predecessor without fully resolving
    /// it, the same "Copy" rung `cranelift_codegen`'s SCCP equivalent
    /// (aliasing analysis) uses between "not yet known" and "proven
    /// constant".
    Copy(String),
}

fn key_of(op: &Operand) -> Option<String> {
    op.as_variable_name().map(|s| s.to_string())
}

pub fn run(func: &mut TacFunction) {
    let cfg = Cfg::build(func);
    let n = cfg.blocks.len();
    let mut reachable = vec![false; n];
    if n > 0 {
        reachable[cfg.entry()] = true;
    }
    let mut lattice: HashMap<String, LatticeValue> = HashMap::new();
    let mut worklist: VecDeque<usize> = (0..n).filter(|&b| reachable[b]).collect();

    while let Some(b) = worklist.pop_front() {
        for i in cfg.blocks[b].start..cfg.blocks[b].end {
            let inst = &func.instructions[i];
            if let Some(key) = inst.def().and_then(key_of) {
                let value = evaluate(inst, &lattice);
                let old = lattice.get(&key).cloned().unwrap_or(LatticeValue::Unknown);
                if value != old {
                    lattice.insert(key, value);
                }
            }
        }
        for &s in &cfg.blocks[b].successors {
            if !reachable[s] {
                reachable[s] = true;
                worklist.push_back(s);
            }
        }
    }

    // Rewrite conditional jumps whose condition is a proven constant:
    // true never takes the branch ("ifFalse cond goto target", spec
    // §3.3) and is simply dropped; false always takes it and becomes
    // unconditional.
    let mut keep = vec![true; func.instructions.len()];
    for (i, inst) in func.instructions.iter_mut().enumerate() {
        if let Instruction::ConditionalJump { cond, target } = inst {
            if let Some(b) = resolved_bool(cond, &lattice) {
                if b {
                    keep[i] = false;
                } else {
                    *inst = Instruction::UnconditionalJump { target: *target };
                }
            }
        }
    }

    // Remove unreachable blocks (their labels stay, as dangling labels
    // are harmless and later jump-simplification/assembly passes treat
    // an unreferenced label as dead weight, not an error).
    for (b, block) in cfg.blocks.iter().enumerate() {
        if !reachable[b] {
            for i in block.start..block.end {
                if !matches!(func.instructions[i], Instruction::Label(_)) {
                    keep[i] = false;
                }
            }
        }
    }
    let mut kept = keep.into_iter();
    func.instructions.retain(|_| kept.next().unwrap());
}

fn evaluate(inst: &Instruction, lattice: &HashMap<String, LatticeValue>) -> LatticeValue {
    match inst {
        Instruction::Copy { src, .. } | Instruction::Assignment { src, .. } => resolve_operand(src, lattice),
        _ => LatticeValue::Unknown,
    }
}

fn resolve_operand(op: &Operand, lattice: &HashMap<String, LatticeValue>) -> LatticeValue {
    match op {
        Operand::Constant { value, .. } => LatticeValue::Constant(value.clone()),
        Operand::Variable { name, .. } => match lattice.get(name) {
            Some(LatticeValue::Constant(v)) => LatticeValue::Constant(v.clone()),
            _ => LatticeValue::Copy(name.clone()),
        },
        _ => LatticeValue::Unknown,
    }
}

fn resolved_bool(op: &Operand, lattice: &HashMap<String, LatticeValue>) -> Option<bool> {
    match resolve_operand(op, lattice) {
        LatticeValue::Constant(ConstValue::Bool(b)) => Some(b),
        _ => {
            if let Operand::Constant { value: ConstValue::Bool(b), .. } = op {
                Some(*b)
            } else {
                None
            }
        }
    }
}
