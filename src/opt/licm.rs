//! Pass 11: loop-invariant code motion (spec §4.E pass 11).
//!
//! For each natural loop — a back edge `b -> h` where `h` dominates
//! `b` — with a single external predecessor (the preheader), hoist
//! pure producers whose defined operand has exactly one definition in
//! the loop, whose used operands are all loop-invariant, and which are
//! not live outside the loop before their first in-loop definition.
//!
//! Hoisting inserts the instruction as the last instruction of the
//! preheader block, mirroring where `cranelift_codegen`'s LICM would
//! splice into a preheader `Block`.

use std::collections::HashSet;

use crate::opt::cfg::Cfg;
use crate::opt::dominators::Dominators;
use crate::tac::entities::Temp;
use crate::tac::function::TacFunction;

/// A natural loop's member blocks and its single external predecessor,
/// if it has exactly one (otherwise no preheader exists and the loop
/// is left alone, spec §4.E pass 11 precondition).
struct Loop {
    header: usize,
    body: HashSet<usize>,
    preheader: Option<usize>,
}

fn natural_loops(cfg: &Cfg, doms: &Dominators) -> Vec<Loop> {
    let mut loops = Vec::new();
    for (header, back) in doms.back_edges(cfg) {
        let mut body = HashSet::new();
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
        let preheader = if externals.len() == 1 { Some(externals[0]) } else { None };
        loops.push(Loop { header, body, preheader });
    }
    loops
}

pub fn run(func: &mut TacFunction) {
    let cfg = Cfg::build(func);
    let doms = Dominators::compute(&cfg);
    let loops = natural_loops(&cfg, &doms);

    for lp in loops {
        let Some(preheader) = lp.preheader else { continue };
        let preheader_end = cfg.blocks[preheader].end;

        let mut def_counts: std::collections::HashMap<Temp, u32> = std::collections::HashMap::new();
        let mut assigned_vars: HashSet<String> = HashSet::new();
        let mut loop_indices: Vec<usize> = Vec::new();
        for &b in &lp.body {
            for i in cfg.blocks[b].start..cfg.blocks[b].end {
                loop_indices.push(i);
                if let Some(def) = func.instructions[i].def() {
                    if let Some(t) = def.as_temp() {
                        *def_counts.entry(t).or_insert(0) += 1;
                    }
                    if let Some(name) = def.as_variable_name() {
                        assigned_vars.insert(name.to_string());
                    }
                }
            }
        }
        loop_indices.sort_unstable();

        let mut invariant: HashSet<Temp> = HashSet::new();
        let mut hoisted: Vec<usize> = Vec::new();
        let mut changed = true;
        while changed {
            changed = false;
            for &i in &loop_indices {
                if hoisted.contains(&i) {
                    continue;
                }
                let inst = &func.instructions[i];
                if !inst.is_pure_producer() {
                    continue;
                }
                let Some(def_temp) = inst.def().and_then(|d| d.as_temp()) else { continue };
                if def_counts.get(&def_temp).copied().unwrap_or(0) != 1 {
                    continue;
                }
                let all_invariant = inst.uses().iter().all(|u| match u.as_temp() {
                    Some(t) => invariant.contains(&t),
                    None => match u.as_variable_name() {
                        Some(name) => !assigned_vars.contains(name),
                        None => true,
                    },
                });
                if all_invariant {
                    invariant.insert(def_temp);
                    hoisted.push(i);
                    changed = true;
                }
            }
        }

        if hoisted.is_empty() {
            continue;
        }
        hoisted.sort_unstable();
        // Every hoisted index lies inside the loop body, which starts
        // at or after `preheader_end`, so removing them back-to-front
        // never shifts `preheader_end` itself.
        let mut moved: Vec<_> = hoisted.iter().map(|&i| func.instructions[i].clone()).collect();
        for &i in hoisted.iter().rev() {
            func.instructions.remove(i);
        }
        for inst in moved.drain(..).rev() {
            func.instructions.insert(preheader_end, inst);
        }
    }
}
