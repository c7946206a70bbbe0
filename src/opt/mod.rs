//! Component E: the TAC optimizer (spec §4.E).
//!
//! Pass order is part of the contract (spec §5 "the pass pipeline
//! order itself is part of the contract") — passes never fail, they
//! either transform or pass through unchanged.

pub mod algebraic;
pub mod bool_simplify;
pub mod cfg;
pub mod cow;
pub mod dce;
pub mod dead_temp;
pub mod dominators;
pub mod elision;
pub mod fold;
pub mod gvn;
pub mod jump_simplify;
pub mod licm;
pub mod regalloc;
pub mod sccp;
pub mod strength_reduction;

use std::collections::HashMap;

use crate::tac::entities::{Operand, Temp};
use crate::tac::function::TacFunction;

/// The slot assignments produced by passes 15-16, handed to
/// [`crate::udon`] so the data-section allocator can reuse storage
/// instead of one entry per temporary/local.
#[derive(Clone, Debug, Default)]
pub struct AllocationPlan {
    pub temp_slots: HashMap<Temp, u32>,
    pub reusable_locals: Vec<String>,
}

/// Run the fixed 16-pass pipeline over one lowered function in place,
/// returning the register/local-reuse plan the optimizer's final two
/// passes compute (spec §4.E passes 15-16).
pub fn optimize(func: &mut TacFunction, return_destination: &Operand) -> AllocationPlan {
    fold::run(func);                         // 1
    sccp::run(func);                         // 2
    bool_simplify::run(func);                // 3
    algebraic::run(func);                    // 4
    gvn::run(func);                          // 5
    elision::run(func);                      // 6
    dce::remove_noop_copies(func);           // 7
    dce::remove_dead_stores(func);           // 8
    dce::remove_unreachable_tail(func);      // 9
    jump_simplify::run(func);                // 10
    licm::run(func);                         // 11
    strength_reduction::run(func);           // 12
    dead_temp::run(func);                    // 13
    cow::run(func);                          // 14

    let temp_slots = regalloc::allocate_temp_slots(func); // 15
    let reusable_locals = regalloc::reusable_locals(func, return_destination) // 16
        .into_iter()
        .map(str::to_string)
        .collect();

    AllocationPlan { temp_slots, reusable_locals }
}
