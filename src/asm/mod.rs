//! Component G: the assembler (spec §4.G).

pub mod data;
pub mod emit;
pub mod labels;
pub mod restrict;
pub mod values;

use crate::udon::lower::UdonModule;
use crate::vrc_events::VrcEventRegistry;

/// Run the assembler's four responsibilities over a fully-lowered Udon
/// module and produce the final `.uasm` text (spec §4.G).
pub fn assemble(module: UdonModule, events: &dyn VrcEventRegistry) -> String {
    let UdonModule { mut instructions, data, exported_labels } = module;

    let mut data_section = data::DataSection::from_entries(data);
    let init = restrict::lower_restricted_initial_values(&mut data_section);
    if !init.is_empty() {
        splice_after_start(&mut instructions, init);
    }

    let resolved = labels::resolve(&instructions, events, &exported_labels);
    emit::emit(data_section.entries(), &instructions, &resolved, &exported_labels)
}

/// Insert `init` right after the `_start` label declaration (spec
/// §4.G.1) — or at the very front if no `_start` label exists (a
/// behaviour with no `_start` method still gets its field
/// initialisers run first thing).
fn splice_after_start(instructions: &mut Vec<crate::udon::instructions::UdonInstruction>, init: Vec<crate::udon::instructions::UdonInstruction>) {
    use crate::udon::instructions::UdonInstruction;
    let pos = instructions
        .iter()
        .position(|i| matches!(i, UdonInstruction::Label(name) if name == "_start"))
        .map(|p| p + 1)
        .unwrap_or(0);
    instructions.splice(pos..pos, init);
}
