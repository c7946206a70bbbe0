//! Ambient compile-time configuration (SPEC_FULL.md §1.3).
//!
//! A handful of small, `Copy` knobs threaded through [`crate::compile`]
//! rather than a builder macro: `cranelift-codegen`'s `settings`
//! module is the closest analogue in the teacher, but that crate's
//! settings are backend/ISA flags generated from a table; ours are
//! few enough to hand-write as plain fields.

/// Resolves the `Number.isFinite` open question (spec §9): the source
/// lowers it two different, both semantically-defensible ways, and
/// they differ on NaN-producing values. Never picked silently —
/// pick one explicitly when constructing [`CompileOptions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberIsFiniteStrategy {
    /// `x == x` (false for NaN, true for ±Infinity — the loose form).
    SelfEquality,
    /// NaN and ±Infinity both lower to `false` (the strict form).
    /// This is the default: it matches IEEE 754 `isfinite` rather
    /// than just excluding NaN.
    Strict,
}

impl Default for NumberIsFiniteStrategy {
    fn default() -> Self {
        NumberIsFiniteStrategy::Strict
    }
}

/// Compiler-wide options threaded through lowering and optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// See [`NumberIsFiniteStrategy`].
    pub number_is_finite_strategy: NumberIsFiniteStrategy,
    /// Emit `ANNOTATION` opcodes carrying source-level markers in the
    /// Udon instruction stream. Off by default; an ambient nicety for
    /// debugging generated `.uasm`, not required by any rule in the
    /// spec.
    pub emit_debug_annotations: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            number_is_finite_strategy: NumberIsFiniteStrategy::default(),
            emit_debug_annotations: false,
        }
    }
}
