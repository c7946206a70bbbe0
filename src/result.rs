//! The error taxonomy used throughout the compiler.
//!
//! Every fallible entry point in this crate returns a [`CodegenResult`].
//! There is no recovery at compile time: the first fatal error aborts
//! the compilation (see the pipeline orchestration in [`crate::compile`]).
//! `UnresolvedLabel` is deliberately absent here — the assembler treats
//! it as a warning, not a fatal error, and logs it via `log::warn!`
//! instead of returning an `Err`.

use crate::ast::SourceSpan;
use std::fmt;

/// A single attempted `(type, member, params)` extern lookup, kept around
/// so `ExternMissing` can be pretty-printed with the exact signature the
/// resolver tried to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternLookup {
    /// Host type name the lookup was performed against.
    pub type_name: String,
    /// Member (method/getter/setter/ctor) name.
    pub member_name: String,
    /// Host parameter type names, in call order.
    pub param_types: Vec<String>,
}

impl fmt::Display for ExternLookup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.type_name,
            self.member_name,
            self.param_types.join(", ")
        )
    }
}

/// The fatal error taxonomy of this compiler (spec §7).
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodegenError {
    /// A required extern signature is not present in the catalog.
    #[error("no extern signature for {lookup} (at {span})")]
    ExternMissing {
        /// The lookup that failed.
        lookup: ExternLookup,
        /// Where in the source this lookup was attempted.
        span: SourceSpan,
    },

    /// A source construct the lowerer refuses to translate.
    #[error("unsupported feature: {what} (at {span})")]
    UnsupportedFeature {
        /// Human-readable description of the refused construct.
        what: String,
        /// Where in the source the construct appeared.
        span: SourceSpan,
    },

    /// An identifier wasn't found in the symbol table or host globals.
    #[error("undefined symbol `{name}` in {context} (at {span})")]
    UndefinedSymbol {
        /// The identifier that failed to resolve.
        name: String,
        /// Enclosing class/method, for diagnostics.
        context: String,
        /// Where the identifier was referenced.
        span: SourceSpan,
    },

    /// `break`/`continue` with an empty loop stack.
    #[error("`{keyword}` outside of a loop (at {span})")]
    ControlFlowOutsideLoop {
        /// Either `break` or `continue`.
        keyword: String,
        /// Where the statement appeared.
        span: SourceSpan,
    },

    /// An invariant of the input AST was violated.
    #[error("malformed input: {what} (at {span})")]
    MalformedAST {
        /// What invariant was violated.
        what: String,
        /// Where the offending node is.
        span: SourceSpan,
    },
}

/// The result type returned by every fallible stage of the pipeline.
pub type CodegenResult<T> = Result<T, CodegenError>;
