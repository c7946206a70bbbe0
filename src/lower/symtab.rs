//! The lowerer's symbol table (spec §4.D "Symbol table with lexical
//! scopes").
//!
//! `enter_scope`/`exit_scope` are balanced, the same discipline
//! `cranelift_frontend::frontend::FunctionBuilder`'s SSA variable
//! definitions use around block boundaries, except here scopes are
//! pure name-resolution stacks rather than SSA-def tracking (this IR
//! has real mutable variables, not blockless SSA).

use std::collections::HashMap;

use crate::types::TypeSymbol;

/// A resolved variable binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub ty: TypeSymbol,
    pub is_parameter: bool,
    pub is_exported: bool,
}

/// A stack of lexical scopes mapping surface names to TAC variable
/// bindings.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Binding>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    /// Push a fresh, empty scope.
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope. Panics if called more times than
    /// `enter_scope` — scopes must balance (spec §4.D invariant).
    pub fn exit_scope(&mut self) {
        assert!(
            self.scopes.len() > 1,
            "exit_scope called without a matching enter_scope"
        );
        self.scopes.pop();
    }

    /// Declare `name` in the innermost scope. Variable names are
    /// unique within the surrounding scope (spec §3.2 invariant); this
    /// overwrites a prior binding of the same name in the same scope,
    /// mirroring how a re-`let` would be a parse error upstream — the
    /// lowerer trusts that invariant rather than re-checking it.
    pub fn declare(&mut self, binding: Binding) {
        self.scopes
            .last_mut()
            .expect("at least one scope is always active")
            .insert(binding.name.clone(), binding);
    }

    /// Resolve `name` against the innermost scope outward.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Pre-scan every `let`/parameter declaration appearing directly
    /// in a block (not nested blocks) before visiting its statements,
    /// so forward references within the block resolve (spec §4.D
    /// "scan-then-visit"). Callers pass the declared bindings found by
    /// a shallow walk of the block's statement list.
    pub fn prescan(&mut self, bindings: impl IntoIterator<Item = Binding>) {
        for b in bindings {
            self.declare(b);
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str) -> Binding {
        Binding {
            name: name.to_string(),
            ty: TypeSymbol::Single,
            is_parameter: false,
            is_exported: false,
        }
    }

    #[test]
    fn balanced_scopes_shadow_correctly() {
        let mut st = SymbolTable::new();
        st.declare(binding("x"));
        st.enter_scope();
        st.declare(Binding {
            ty: TypeSymbol::Boolean,
            ..binding("x")
        });
        assert_eq!(st.resolve("x").unwrap().ty, TypeSymbol::Boolean);
        st.exit_scope();
        assert_eq!(st.resolve("x").unwrap().ty, TypeSymbol::Single);
    }

    #[test]
    #[should_panic]
    fn unbalanced_exit_panics() {
        let mut st = SymbolTable::new();
        st.exit_scope();
    }

    #[test]
    fn unresolved_name_is_none() {
        let st = SymbolTable::new();
        assert!(st.resolve("nope").is_none());
    }
}
