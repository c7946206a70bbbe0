//! The Udon data section (spec §3.5, §3.6).

use crate::tac::entities::ConstValue;

/// `none|linear|smooth`, per spec §3.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    None,
    Linear,
    Smooth,
}

impl Default for SyncMode {
    fn default() -> Self {
        SyncMode::None
    }
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::None => "none",
            SyncMode::Linear => "linear",
            SyncMode::Smooth => "smooth",
        }
    }
}

/// One `(name, byteAddress, udonTypeName, initialValue)` entry
/// (spec §3.5). `byte_address` is filled in by the assembler's label/
/// address resolution pass ([`crate::asm::labels`]); it is `None`
/// until then.
#[derive(Clone, Debug)]
pub struct DataEntry {
    pub name: String,
    pub udon_type: String,
    pub value: ConstValue,
    pub byte_address: Option<u32>,
    /// Names beginning with `__` are internal: never exported, never
    /// synced (spec §3.5 invariant).
    pub is_export: bool,
    pub sync: Option<SyncMode>,
}

impl DataEntry {
    pub fn is_internal(&self) -> bool {
        self.name.starts_with("__")
    }
}

/// Accumulates distinct data-section entries in TAC traversal order,
/// de-duplicating constants by `(udonType, value)` (spec §4.F).
#[derive(Default)]
pub struct DataSection {
    entries: Vec<DataEntry>,
}

impl DataSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-built entry list (e.g. the flat list accumulated
    /// across every function by [`crate::udon::lower::lower_function`])
    /// back into a `DataSection` so the assembler can keep interning
    /// its own helper constants into the same namespace.
    pub fn from_entries(entries: Vec<DataEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DataEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [DataEntry] {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<DataEntry> {
        self.entries
    }

    /// Declare a named variable slot (idempotent: re-declaring the
    /// same name is a no-op, since TAC traversal will see the same
    /// variable at every use site after its first).
    pub fn declare_variable(
        &mut self,
        name: &str,
        udon_type: &str,
        initial: ConstValue,
        is_export: bool,
        sync: Option<SyncMode>,
    ) {
        if self.entries.iter().any(|e| e.name == name) {
            return;
        }
        self.entries.push(DataEntry {
            name: name.to_string(),
            udon_type: udon_type.to_string(),
            value: initial,
            byte_address: None,
            is_export,
            sync,
        });
    }

    /// Intern a constant, returning the data-section name that now
    /// holds it. Constants de-duplicate by `(udonType, value)` (spec
    /// §4.F); the allocated name is internal (`__const_N`) since
    /// surface constants never need to be addressable by the user's
    /// own names.
    pub fn intern_constant(&mut self, udon_type: &str, value: ConstValue) -> String {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.udon_type == udon_type && e.value == value)
        {
            return existing.name.clone();
        }
        let name = format!("__const_{}", self.entries.len());
        self.entries.push(DataEntry {
            name: name.clone(),
            udon_type: udon_type.to_string(),
            value,
            byte_address: None,
            is_export: false,
            sync: None,
        });
        name
    }

    /// Intern an extern signature string as a hidden `__extern_*`
    /// string constant (spec §4.F).
    pub fn intern_extern_signature(&mut self, signature: &str) -> String {
        self.intern_constant("SystemString", ConstValue::Str(signature.to_string()))
    }

    /// Allocate a fresh, uniquely-named internal data entry — used by
    /// the assembler's restricted-type lowering for its shared helper
    /// constants (spec §4.G.1).
    pub fn allocate_unique(&mut self, prefix: &str, udon_type: &str, initial: ConstValue) -> String {
        let mut candidate = prefix.to_string();
        let mut n = 0u32;
        while self.entries.iter().any(|e| e.name == candidate) {
            candidate = format!("{}_{}", prefix, n);
            n += 1;
        }
        self.entries.push(DataEntry {
            name: candidate.clone(),
            udon_type: udon_type.to_string(),
            value: initial,
            byte_address: None,
            is_export: false,
            sync: None,
        });
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_dedupe_by_type_and_value() {
        let mut data = DataSection::new();
        let a = data.intern_constant("SystemSingle", ConstValue::Number(1.0));
        let b = data.intern_constant("SystemSingle", ConstValue::Number(1.0));
        assert_eq!(a, b);
        assert_eq!(data.entries().len(), 1);
    }

    #[test]
    fn variable_names_are_unique() {
        let mut data = DataSection::new();
        data.declare_variable("x", "SystemSingle", ConstValue::Number(0.0), true, Some(SyncMode::None));
        data.declare_variable("x", "SystemSingle", ConstValue::Number(0.0), true, Some(SyncMode::None));
        assert_eq!(data.entries().len(), 1);
    }
}
