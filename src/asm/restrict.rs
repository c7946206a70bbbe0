//! Restricted-type initial-value lowering (spec §4.G.1).
//!
//! Some Udon data types can't be declared with a non-default literal
//! initial value — currently just `SystemBoolean`. A data entry that
//! wants to start out `true` has its stored initial value replaced
//! with `null`, and an init sequence computing `true` is spliced in
//! right after `_start` instead. The two helper constants the init
//! sequence needs (`0` and the `op_Equality` extern signature) are
//! shared across every restricted entry via [`DataSection::allocate_unique`],
//! the same interning move [`DataSection::intern_constant`] already
//! makes for ordinary constants.

use crate::asm::data::DataSection;
use crate::tac::entities::ConstValue;
use crate::udon::instructions::UdonInstruction;

/// Rewrite `data`'s restricted-type entries to `null` initial values
/// and return the init instructions to splice in after `_start`'s
/// label (spec §4.G.1). Only entries that actually wanted `true` need
/// an init sequence; an entry that wanted `false` already matches the
/// type's zero value and needs nothing.
pub fn lower_restricted_initial_values(data: &mut DataSection) -> Vec<UdonInstruction> {
    let restricted_true: Vec<String> = data
        .entries()
        .iter()
        .filter(|e| e.udon_type == "SystemBoolean" && e.value == ConstValue::Bool(true))
        .map(|e| e.name.clone())
        .collect();

    if restricted_true.is_empty() {
        return Vec::new();
    }

    for entry in restricted_true.iter() {
        overwrite_initial_value(data, entry, ConstValue::Null);
    }

    let zero = data.allocate_unique("__asm_restrict_int32_0", "SystemInt32", ConstValue::Number(0.0));
    let eq_sig = "SystemInt32.__op_Equality__SystemInt32_SystemInt32__SystemBoolean".to_string();
    let eq_name = data.intern_extern_signature(&eq_sig);

    let mut init = Vec::new();
    for target in restricted_true {
        init.push(UdonInstruction::Push(zero.clone()));
        init.push(UdonInstruction::Push(zero.clone()));
        init.push(UdonInstruction::Push(eq_name.clone()));
        init.push(UdonInstruction::Extern { signature: eq_sig.clone(), is_pure: true });
        init.push(UdonInstruction::Push(target));
        init.push(UdonInstruction::Copy);
    }
    init
}

fn overwrite_initial_value(data: &mut DataSection, name: &str, value: ConstValue) {
    for entry in data.entries_mut() {
        if entry.name == name {
            entry.value = value;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::data::SyncMode;

    #[test]
    fn true_boolean_becomes_null_with_init_sequence() {
        let mut data = DataSection::new();
        data.declare_variable("flag", "SystemBoolean", ConstValue::Bool(true), true, Some(SyncMode::None));
        let init = lower_restricted_initial_values(&mut data);
        assert!(!init.is_empty());
        assert_eq!(
            data.entries().iter().find(|e| e.name == "flag").unwrap().value,
            ConstValue::Null
        );
    }

    #[test]
    fn false_boolean_needs_no_init() {
        let mut data = DataSection::new();
        data.declare_variable("flag", "SystemBoolean", ConstValue::Bool(false), true, Some(SyncMode::None));
        let init = lower_restricted_initial_values(&mut data);
        assert!(init.is_empty());
    }
}
