//! Top-level pipeline orchestration (spec §2, §5).
//!
//! `compile` wires components A-G in a straight line: lower the whole
//! program to TAC, optimize each function independently, lower every
//! optimized function into the shared Udon instruction stream and data
//! section, then hand the assembled module to [`crate::asm::assemble`].
//! Mirrors the relationship `cranelift_codegen::Context::compile` has
//! to its own function-at-a-time pipeline, just without a shared
//! `Context` object to reuse across calls — every [`compile`] call is
//! self-contained (spec §5 "the catalog is loaded once... and never
//! mutated again for the lifetime of any compile call").

use crate::asm;
use crate::ast::Program;
use crate::catalog::ExternCatalog;
use crate::config::CompileOptions;
use crate::externs::ExternResolver;
use crate::lower;
use crate::opt;
use crate::result::CodegenResult;
use crate::udon;
use crate::udon::lower::UdonModule;
use crate::vrc_events::VrcEventRegistry;

/// Compile a parsed [`Program`] all the way down to `.uasm` text.
pub fn compile(
    program: &Program,
    catalog: &dyn ExternCatalog,
    events: &dyn VrcEventRegistry,
    options: CompileOptions,
) -> CodegenResult<String> {
    let module = lower_to_udon(program, catalog, events, options)?;
    Ok(asm::assemble(module, events))
}

/// Run components D-F, stopping short of assembly — split out so
/// tests and tooling can inspect the Udon module before text emission.
pub fn lower_to_udon(
    program: &Program,
    catalog: &dyn ExternCatalog,
    events: &dyn VrcEventRegistry,
    options: CompileOptions,
) -> CodegenResult<UdonModule> {
    let lowered = lower::lower_program(program, catalog, events, options)?;
    let resolver = ExternResolver::new(catalog);

    let mut data = asm::data::DataSection::new();
    let mut instructions = Vec::new();
    let mut exported_labels = Vec::new();

    for mut method in lowered.methods {
        let default_return = crate::tac::entities::Operand::Variable {
            name: format!("__returnValue_{}", method.method_name),
            ty: method.return_type.clone(),
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        let plan = opt::optimize(&mut method.func, &default_return);
        let lowered_instructions = udon::lower_function(
            &method.class_name,
            &method.method_name,
            &method.func,
            &plan,
            &resolver,
            events,
            &mut data,
            &mut exported_labels,
        )?;
        instructions.extend(lowered_instructions);
    }

    Ok(UdonModule { instructions, data: data.into_entries(), exported_labels })
}
