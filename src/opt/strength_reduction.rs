//! Pass 12: induction-variable strength reduction (spec §4.E pass 12).
//!
//! For a loop containing an update `v = v ± c` and a later
//! `w = v * k` (`c`, `k` constant), emits `w = v * k` once in the
//! preheader and replaces the in-loop recomputation with
//! `w = w ± (c*k)`, coerced to `w`'s type.

use crate::opt::cfg::Cfg;
use crate::opt::dominators::Dominators;
use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

fn as_const_number(op: &Operand) -> Option<f64> {
    match op {
        Operand::Constant { value: ConstValue::Number(n), .. } => Some(*n),
        _ => None,
    }
}

/// `(inductionVar, sign, step)` from a `v = v + c` / `v = v - c` form.
fn induction_update(inst: &Instruction) -> Option<(Operand, f64)> {
    if let Instruction::BinaryOp { dest, op, left, right } = inst {
        if left == dest {
            if let Some(c) = as_const_number(right) {
                let signed = if op == "+" { c } else if op == "-" { -c } else { return None };
                return Some((dest.clone(), signed));
            }
        }
    }
    None
}

pub fn run(func: &mut TacFunction) {
    let cfg = Cfg::build(func);
    let doms = Dominators::compute(&cfg);
    for (header, back) in doms.back_edges(&cfg) {
        let mut body = std::collections::HashSet::new();
        body.insert(header);
        let mut stack = vec![back];
        while let Some(b) = stack.pop() {
            if body.insert(b) {
                for &p in &cfg.blocks[b].predecessors {
                    stack.push(p);
                }
            }
        }
        let externals: Vec<usize> = cfg.blocks[header]
            .predecessors
            .iter()
            .copied()
            .filter(|p| !body.contains(p))
            .collect();
        if externals.len() != 1 {
            continue;
        }
        let preheader_end = cfg.blocks[externals[0]].end;

        let mut indices: Vec<usize> = body.iter().flat_map(|&b| cfg.blocks[b].start..cfg.blocks[b].end).collect();
        indices.sort_unstable();

        let mut step: Option<(Operand, f64)> = None;
        for &i in &indices {
            if let Some((v, c)) = induction_update(&func.instructions[i]) {
                step = Some((v, c));
                break;
            }
        }
        let Some((induction_var, c)) = step else { continue };

        for &i in &indices {
            let replacement = if let Instruction::BinaryOp { dest, op, left, right } = &func.instructions[i] {
                if op == "*" && *left == induction_var {
                    as_const_number(right).map(|k| (dest.clone(), k))
                } else {
                    None
                }
            } else {
                None
            };
            if let Some((w, k)) = replacement {
                let ty = w.ty();
                let preheader_inst = Instruction::BinaryOp {
                    dest: w.clone(),
                    op: "*".to_string(),
                    left: induction_var.clone(),
                    right: Operand::Constant { value: ConstValue::Number(k), ty: ty.clone() },
                };
                func.instructions.insert(preheader_end, preheader_inst);
                let step_offset = c * k;
                let shifted_i = i + 1;
                let update_op = if step_offset >= 0.0 { "+" } else { "-" };
                func.instructions[shifted_i] = Instruction::BinaryOp {
                    dest: w.clone(),
                    op: update_op.to_string(),
                    left: w,
                    right: Operand::Constant { value: ConstValue::Number(step_offset.abs()), ty },
                };
                break;
            }
        }
    }
}
