//! Passes 15-16: linear-scan temporary allocation and local variable
//! reuse (spec §4.E passes 15, 16).
//!
//! Temporaries are partitioned by `udonType` and allocated ids within
//! each partition by live-interval order, returning ids to a free list
//! once their interval expires — the same linear-scan discipline
//! `cranelift_codegen::regalloc2` uses for physical registers, except
//! the "registers" here are just small integers handed to the
//! assembler's data-section slot allocator. Local variable reuse
//! (pass 16) applies the identical discipline to user locals that
//! aren't parameters, aren't exported, aren't `this`, aren't the
//! return slot, and don't change type across their lifetime.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::tac::entities::{Operand, Temp};
use crate::tac::function::TacFunction;

/// A live interval `[start, end]` in instruction-index order.
struct Interval {
    start: usize,
    end: usize,
}

fn temp_intervals(func: &TacFunction) -> HashMap<Temp, Interval> {
    let mut intervals: HashMap<Temp, Interval> = HashMap::new();
    for (i, inst) in func.instructions.iter().enumerate() {
        for t in inst.referenced_temps() {
            intervals
                .entry(t)
                .and_modify(|iv| iv.end = i)
                .or_insert(Interval { start: i, end: i });
        }
    }
    intervals
}

/// Maps each temp to a reused slot id within its `udonType` partition
/// (spec §4.E pass 15). The assembler's data-section allocator
/// consumes this map instead of allocating one slot per temp.
pub fn allocate_temp_slots(func: &TacFunction) -> HashMap<Temp, u32> {
    let intervals = temp_intervals(func);
    let mut by_type: HashMap<String, Vec<(Temp, usize, usize)>> = HashMap::new();
    for (i, inst) in func.instructions.iter().enumerate() {
        if let Some(d) = inst.def() {
            if let Some(t) = d.as_temp() {
                if let Some(iv) = intervals.get(&t) {
                    by_type.entry(d.ty().udon_type()).or_default().push((t, iv.start.min(i), iv.end));
                }
            }
        }
    }

    let mut result = HashMap::new();
    for (_, mut temps) in by_type {
        temps.sort_by_key(|&(_, start, _)| start);
        temps.dedup_by_key(|&mut (t, _, _)| t);
        let mut active: Vec<(usize, u32)> = Vec::new(); // (end, slot)
        // Free-list of expired slots within this udonType partition —
        // almost never holds more than a handful of entries at once,
        // so a small inline buffer avoids a heap allocation per function.
        let mut free: SmallVec<[u32; 8]> = SmallVec::new();
        let mut next_slot = 0u32;
        for (t, start, end) in temps {
            active.retain(|&(e, slot)| {
                if e < start {
                    free.push(slot);
                    false
                } else {
                    true
                }
            });
            let slot = free.pop().unwrap_or_else(|| {
                let s = next_slot;
                next_slot += 1;
                s
            });
            active.push((end, slot));
            result.insert(t, slot);
        }
    }
    result
}

/// Local variables eligible for slot reuse (pass 16): not a parameter,
/// not exported, not `this`, not the return destination, and stable in
/// type across the function.
pub fn reusable_locals<'a>(func: &'a TacFunction, return_destination: &Operand) -> Vec<&'a str> {
    let mut types: HashMap<&str, std::collections::HashSet<String>> = HashMap::new();
    for inst in &func.instructions {
        if let Some(Operand::Variable { name, ty, is_local, is_parameter, is_exported }) = inst.def() {
            if *is_local && !*is_parameter && !*is_exported && name != "this" {
                if Some(name.as_str()) != return_destination.as_variable_name() {
                    types.entry(name.as_str()).or_default().insert(ty.udon_type());
                }
            }
        }
    }
    types
        .into_iter()
        .filter(|(_, tys)| tys.len() == 1)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::instructions::Instruction;
    use crate::types::TypeSymbol;

    #[test]
    fn non_overlapping_temps_share_a_slot() {
        let mut f = TacFunction::new(None);
        let t0 = f.new_temp();
        let t1 = f.new_temp();
        f.push(Instruction::Copy {
            dest: Operand::Temporary { id: t0, ty: TypeSymbol::Single },
            src: Operand::number_const(1.0),
        });
        f.push(Instruction::Return { value: Some(Operand::Temporary { id: t0, ty: TypeSymbol::Single }) });
        f.push(Instruction::Copy {
            dest: Operand::Temporary { id: t1, ty: TypeSymbol::Single },
            src: Operand::number_const(2.0),
        });
        let slots = allocate_temp_slots(&f);
        assert_eq!(slots.get(&t0), slots.get(&t1));
    }
}
