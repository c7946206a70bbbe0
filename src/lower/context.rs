//! Lowering state (spec §4.D): loop/try/inline-return stacks, the
//! inline instance map, recursion contexts, and the current return
//! destination.
//!
//! This plays the role `cranelift_frontend::frontend::FunctionBuilder`
//! plays for its SSA variable map and its `ssa::SSABuilder` — one
//! mutable struct threaded through every `lower_*` call, rather than
//! smuggling state through thread-locals or globals (SPEC_FULL.md
//! §1, "Monkey-patched `this` overrides... model as an explicit
//! stack, not a mutable global").

use std::collections::HashMap;

use crate::lower::symtab::SymbolTable;
use crate::tac::entities::{Label, Operand};
use crate::tac::function::TacFunction;

/// `(breakLabel, continueLabel)` for one enclosing loop (spec §4.D
/// "Loop stack").
#[derive(Clone, Copy, Debug)]
pub struct LoopEntry {
    pub break_label: Label,
    pub continue_label: Label,
}

/// `(errorFlagVar, errorValueVar, errorTargetLabel)` for one enclosing
/// `try` (spec §4.D "Try stack"; semantics in spec §4.State machines).
#[derive(Clone, Debug)]
pub struct TryEntry {
    pub error_flag_var: Operand,
    pub error_value_var: Operand,
    pub error_target_label: Label,
}

/// Where an inlined static method's `return` should go (spec §4.D
/// "Inline return stack"): copy to `dest_slot`, then jump to
/// `continuation_label`.
#[derive(Clone, Debug)]
pub struct InlineReturnEntry {
    pub dest_slot: Option<Operand>,
    pub continuation_label: Label,
}

/// A recursive method's per-call depth counter and parallel shadow
/// arrays for its locals (spec §4.D "Recursion context").
#[derive(Clone, Debug)]
pub struct RecursionContext {
    pub depth_counter_var: String,
    /// Shadow array data-section name per local variable name.
    pub shadow_arrays: HashMap<String, String>,
}

/// All the mutable state the lowerer carries while walking one class's
/// methods. One `LowerCtx` per class is created by
/// [`crate::lower::lower_program`]; the label counter is shared across
/// every `LowerCtx` in a program since labels must be unique program-
/// wide (spec §3.2 invariant).
pub struct LowerCtx<'a> {
    pub symtab: SymbolTable,
    pub func: TacFunction,
    /// Shared across every function in the program.
    pub label_counter: &'a mut u32,
    pub loop_stack: Vec<LoopEntry>,
    /// `break` targets only, nested one level deeper than `loop_stack`
    /// wherever a `switch` is in scope: a bare `continue` must pass
    /// through a `switch` to the nearest enclosing loop (spec.md §4.D
    /// "Loop stack"; `switch` is not itself a loop for `continue`'s
    /// purposes), but `break` inside that same `switch` must stop at
    /// it. Every loop pushes to both stacks in lockstep; a `switch`
    /// pushes only here.
    pub break_stack: Vec<Label>,
    pub try_stack: Vec<TryEntry>,
    pub inline_return_stack: Vec<InlineReturnEntry>,
    /// `new Foo(...)` inside an inlined class creates a synthetic
    /// prefix `__inst_Foo_N`; field accesses on the resulting handle
    /// rewrite to `__inst_Foo_N_<field>` (spec §4.D "Inline instance
    /// map"). Keyed by the surface-level binding name the `new`
    /// expression was assigned to.
    pub inline_instances: HashMap<String, String>,
    next_inline_instance: u32,
    pub recursion: Option<RecursionContext>,
    /// Either the class method's layout-declared return slot, or the
    /// default `__returnValue_return` variable (spec §4.D "Current
    /// return destination").
    pub return_destination: Operand,
    /// Stack of `currentThisOverride` bindings pushed/popped around
    /// each inlined callback (SPEC_FULL.md "Monkey-patched `this`").
    pub this_override_stack: Vec<Operand>,
    /// Property name -> field-change callback method name, for the
    /// class currently being lowered (spec §4.D "Field-change
    /// callbacks"). Populated once per class before its methods are
    /// lowered.
    pub field_change_callbacks: HashMap<String, String>,
}

impl<'a> LowerCtx<'a> {
    pub fn new(func_name: Option<String>, label_counter: &'a mut u32, default_return: Operand) -> Self {
        Self {
            symtab: SymbolTable::new(),
            func: TacFunction::new(func_name),
            label_counter,
            loop_stack: Vec::new(),
            break_stack: Vec::new(),
            try_stack: Vec::new(),
            inline_return_stack: Vec::new(),
            inline_instances: HashMap::new(),
            next_inline_instance: 0,
            recursion: None,
            return_destination: default_return,
            this_override_stack: Vec::new(),
            field_change_callbacks: HashMap::new(),
        }
    }

    pub fn new_label(&mut self) -> Label {
        TacFunction::new_label_from(self.label_counter)
    }

    /// Allocate a fresh `__inst_<Class>_<N>` prefix for an inlined
    /// `new` expression.
    pub fn new_inline_instance_prefix(&mut self, class_name: &str) -> String {
        let prefix = format!("__inst_{}_{}", class_name, self.next_inline_instance);
        self.next_inline_instance += 1;
        prefix
    }

    /// Enter a real loop: its `break`/`continue` targets travel
    /// together, so both stacks push in lockstep.
    pub fn push_loop(&mut self, entry: LoopEntry) {
        self.break_stack.push(entry.break_label);
        self.loop_stack.push(entry);
    }

    pub fn pop_loop(&mut self) {
        self.loop_stack.pop();
        self.break_stack.pop();
    }

    /// Enter a `switch`: only `break` resolves to it, so only
    /// `break_stack` is pushed — a `continue` lexically inside the
    /// switch body still resolves via `loop_stack` to the nearest
    /// enclosing real loop.
    pub fn push_switch_break(&mut self, break_label: Label) {
        self.break_stack.push(break_label);
    }

    pub fn pop_switch_break(&mut self) {
        self.break_stack.pop();
    }

    pub fn current_this(&self) -> Option<&Operand> {
        self.this_override_stack.last()
    }

    pub fn push_this_override(&mut self, this_value: Operand) {
        self.this_override_stack.push(this_value);
    }

    pub fn pop_this_override(&mut self) {
        self.this_override_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSymbol;

    fn dummy_var(name: &str) -> Operand {
        Operand::Variable {
            name: name.to_string(),
            ty: TypeSymbol::Object,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        }
    }

    #[test]
    fn label_counter_is_shared_and_monotonic() {
        let mut counter = 0u32;
        let l1;
        let l2;
        {
            let mut ctx = LowerCtx::new(None, &mut counter, dummy_var("__returnValue_return"));
            l1 = ctx.new_label();
        }
        {
            let mut ctx = LowerCtx::new(None, &mut counter, dummy_var("__returnValue_return"));
            l2 = ctx.new_label();
        }
        assert_ne!(l1, l2);
    }

    #[test]
    fn inline_instance_prefixes_are_unique() {
        let mut counter = 0u32;
        let mut ctx = LowerCtx::new(None, &mut counter, dummy_var("r"));
        let a = ctx.new_inline_instance_prefix("Foo");
        let b = ctx.new_inline_instance_prefix("Foo");
        assert_ne!(a, b);
    }
}
