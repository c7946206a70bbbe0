//! Label address resolution (spec §4.G.2).
//!
//! One forward walk of the Udon instruction stream, accumulating a
//! byte cursor: labels record `name -> address`, non-label
//! instructions advance the cursor by their declared size. Labels
//! sharing an address are grouped and a single canonical name is
//! chosen per group, the same "pick one name to stand for the merged
//! set" move jump-threading already made at the TAC level
//! ([`crate::opt::jump_simplify`]), just redone here on byte addresses
//! instead of label identities.

use std::collections::HashMap;

use crate::udon::instructions::{JumpTarget, UdonInstruction};
use crate::vrc_events::VrcEventRegistry;

/// The halt sentinel address (spec §6.4): an unresolved jump target is
/// rewritten to this and a warning logged (spec §4.G.3, §7
/// `UnresolvedLabel`).
pub const HALT_ADDRESS: u32 = 0xFFFF_FFFC;

/// Label -> canonical name, and canonical name -> address, after
/// resolution.
pub struct ResolvedLabels {
    pub canonical_of: HashMap<String, String>,
    pub address_of: HashMap<String, u32>,
}

/// Priority used to pick one canonical name among labels that share an
/// address (spec §4.G.2): VRChat event label > `_start` > user-export >
/// other.
fn priority(name: &str, events: &dyn VrcEventRegistry, exported: &std::collections::HashSet<String>) -> u8 {
    if events.is_vrc_event_label(name) {
        3
    } else if name == "_start" {
        2
    } else if exported.contains(name) {
        1
    } else {
        0
    }
}

pub fn resolve(
    instructions: &[UdonInstruction],
    events: &dyn VrcEventRegistry,
    exported: &[String],
) -> ResolvedLabels {
    let exported_set: std::collections::HashSet<String> = exported.iter().cloned().collect();
    let mut groups: HashMap<u32, Vec<String>> = HashMap::new();
    let mut cursor = 0u32;
    for inst in instructions {
        match inst {
            UdonInstruction::Label(name) => {
                groups.entry(cursor).or_default().push(name.clone());
            }
            other => cursor += other.byte_size(),
        }
    }

    let mut canonical_of = HashMap::new();
    let mut address_of = HashMap::new();
    for (addr, names) in &groups {
        let canonical = names
            .iter()
            .max_by_key(|n| priority(n, events, &exported_set))
            .expect("label group is never empty")
            .clone();
        address_of.insert(canonical.clone(), *addr);
        for n in names {
            canonical_of.insert(n.clone(), canonical.clone());
        }
    }

    ResolvedLabels { canonical_of, address_of }
}

impl ResolvedLabels {
    /// Resolve a jump target to its literal address, or the halt
    /// sentinel with a logged warning if the label was never defined
    /// (spec §7 `UnresolvedLabel`, §4.G.3).
    pub fn resolve_target(&self, target: &JumpTarget) -> u32 {
        match target {
            JumpTarget::Address(a) => *a,
            JumpTarget::Label(name) => {
                let canonical = self.canonical_of.get(name).cloned().unwrap_or_else(|| name.clone());
                match self.address_of.get(&canonical) {
                    Some(a) => *a,
                    None => {
                        log::warn!("unresolved label `{}`, rewriting to halt address", name);
                        HALT_ADDRESS
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vrc_events::StaticEventRegistry;

    #[test]
    fn resolves_simple_forward_jump() {
        let events = StaticEventRegistry::new();
        let instructions = vec![
            UdonInstruction::Jump(JumpTarget::Label("L0".to_string())),
            UdonInstruction::Label("L0".to_string()),
            UdonInstruction::Pop,
        ];
        let resolved = resolve(&instructions, &events, &[]);
        assert_eq!(resolved.resolve_target(&JumpTarget::Label("L0".to_string())), 8);
    }

    #[test]
    fn unresolved_label_becomes_halt() {
        let events = StaticEventRegistry::new();
        let resolved = resolve(&[], &events, &[]);
        assert_eq!(resolved.resolve_target(&JumpTarget::Label("nope".to_string())), HALT_ADDRESS);
    }

    /// S5: two labels at the same address, jumped to from two different
    /// places, resolve to the same address with one canonical name
    /// chosen by priority (exported user label beats a plain one).
    #[test]
    fn colocated_labels_canonicalise_by_priority() {
        let events = StaticEventRegistry::new();
        let instructions = vec![
            UdonInstruction::Jump(JumpTarget::Label("L1".to_string())),
            UdonInstruction::Jump(JumpTarget::Label("L2".to_string())),
            UdonInstruction::Label("L1".to_string()),
            UdonInstruction::Label("L2".to_string()),
            UdonInstruction::Pop,
        ];
        let exported = vec!["L2".to_string()];
        let resolved = resolve(&instructions, &events, &exported);

        let a1 = resolved.resolve_target(&JumpTarget::Label("L1".to_string()));
        let a2 = resolved.resolve_target(&JumpTarget::Label("L2".to_string()));
        assert_eq!(a1, a2);
        assert_eq!(resolved.canonical_of.get("L1"), Some(&"L2".to_string()));
        assert_eq!(resolved.canonical_of.get("L2"), Some(&"L2".to_string()));
    }
}
