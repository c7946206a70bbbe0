//! `.uasm` text emission (spec §4.G.3, §6.4 grammar).

use crate::asm::data::DataEntry;
use crate::asm::labels::ResolvedLabels;
use crate::asm::values;
use crate::udon::instructions::{JumpTarget, UdonInstruction};

const INDENT: &str = "    ";

/// Render an address as `0x` + 8 upper-case hex digits (spec §6.4,
/// §8 invariant 4).
pub fn format_address(addr: u32) -> String {
    format!("0x{:08X}", addr)
}

fn format_data_section(entries: &[DataEntry]) -> String {
    let mut sorted: Vec<&DataEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.byte_address.unwrap_or(0));

    let mut out = String::from(".data_start\n");
    for entry in sorted {
        out.push_str(&format!(
            "{}{}: %{}, {}\n",
            INDENT,
            entry.name,
            entry.udon_type,
            values::serialize(&entry.udon_type, &entry.value)
        ));
        // spec §8 invariant 3: .export/.sync emitted iff the name does
        // not start with `__`.
        if !entry.is_internal() {
            if entry.is_export {
                out.push_str(&format!("{}.export {}\n", INDENT, entry.name));
            }
            if let Some(sync) = entry.sync {
                out.push_str(&format!("{}.sync {}, {}\n", INDENT, entry.name, sync.as_str()));
            }
        }
    }
    out.push_str(".data_end\n");
    out
}

fn format_code_section(
    instructions: &[UdonInstruction],
    resolved: &ResolvedLabels,
    exported_labels: &[String],
) -> String {
    let mut out = String::from(".code_start\n");
    for inst in instructions {
        match inst {
            UdonInstruction::Push(name) => out.push_str(&format!("{}PUSH, {}\n", INDENT, name)),
            UdonInstruction::Pop => out.push_str(&format!("{}POP\n", INDENT)),
            UdonInstruction::Copy => out.push_str(&format!("{}COPY\n", INDENT)),
            UdonInstruction::Extern { signature, .. } => {
                out.push_str(&format!("{}EXTERN, {}\n", INDENT, signature))
            }
            UdonInstruction::Jump(target) => {
                out.push_str(&format!("{}JUMP, {}\n", INDENT, format_address(resolved.resolve_target(target))))
            }
            UdonInstruction::JumpIfFalse(target) => out.push_str(&format!(
                "{}JUMP_IF_FALSE, {}\n",
                INDENT,
                format_address(resolved.resolve_target(target))
            )),
            UdonInstruction::Label(name) => {
                let canonical = resolved.canonical_of.get(name).cloned().unwrap_or_else(|| name.clone());
                if canonical == *name {
                    out.push_str(&format!("{}{}:\n", INDENT, canonical));
                    if exported_labels.iter().any(|e| {
                        resolved.canonical_of.get(e).cloned().unwrap_or_else(|| e.clone()) == canonical
                    }) {
                        out.push_str(&format!("{}.export {}\n", INDENT, canonical));
                    }
                }
            }
            UdonInstruction::Annotation(text) => out.push_str(&format!("{}ANNOTATION, {}\n", INDENT, text)),
        }
    }
    out.push_str(".code_end");
    out
}

/// Assemble the final `.uasm` document (spec §4.G.3, §6.4).
pub fn emit(
    data: &[DataEntry],
    instructions: &[UdonInstruction],
    resolved: &ResolvedLabels,
    exported_labels: &[String],
) -> String {
    format!(
        "{}{}",
        format_data_section(data),
        format_code_section(instructions, resolved, exported_labels)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::labels;
    use crate::tac::entities::ConstValue;
    use crate::vrc_events::StaticEventRegistry;

    #[test]
    fn address_format_is_ten_characters() {
        assert_eq!(format_address(0).len(), 10);
        assert_eq!(format_address(0xFFFF_FFFC), "0xFFFFFFFC");
    }

    #[test]
    fn internal_entries_never_export() {
        let entries = vec![DataEntry {
            name: "__const_0".to_string(),
            udon_type: "SystemSingle".to_string(),
            value: ConstValue::Number(1.0),
            byte_address: Some(0),
            is_export: true,
            sync: None,
        }];
        let rendered = format_data_section(&entries);
        assert!(!rendered.contains(".export"));
    }

    #[test]
    fn emits_push_push_copy_sequence() {
        let instructions = vec![
            UdonInstruction::Push("__const_0".to_string()),
            UdonInstruction::Push("x".to_string()),
            UdonInstruction::Copy,
        ];
        let events = StaticEventRegistry::new();
        let resolved = labels::resolve(&instructions, &events, &[]);
        let rendered = emit(&[], &instructions, &resolved, &[]);
        assert!(rendered.contains("PUSH, __const_0"));
        assert!(rendered.contains("COPY"));
    }
}
