//! Read-only lowering environment: the extern resolver, compile
//! options, and the VRChat event registry, bundled together since
//! every expression/statement lowering function needs all three but
//! none of them change while a class is being lowered.

use crate::ast::{ClassDecl, Program};
use crate::catalog::ExternCatalog;
use crate::config::CompileOptions;
use crate::externs::ExternResolver;
use crate::vrc_events::VrcEventRegistry;

pub struct LowerEnv<'a> {
    pub resolver: ExternResolver<'a>,
    pub events: &'a dyn VrcEventRegistry,
    pub options: CompileOptions,
    /// The whole compilation unit, so `new Foo(...)` can be resolved
    /// against a sibling class for inlining (spec §4.D "Inline
    /// instance map") rather than only against the extern catalog.
    pub program: &'a Program,
}

impl<'a> LowerEnv<'a> {
    pub fn new(
        catalog: &'a dyn ExternCatalog,
        events: &'a dyn VrcEventRegistry,
        options: CompileOptions,
        program: &'a Program,
    ) -> Self {
        Self {
            resolver: ExternResolver::new(catalog),
            events,
            options,
            program,
        }
    }

    /// A non-`UdonBehaviour` sibling class is always inlined, never
    /// instantiated as a real object (spec GLOSSARY).
    pub fn find_inlinable_class(&self, name: &str) -> Option<&ClassDecl> {
        self.program
            .classes
            .iter()
            .find(|c| c.name == name && !c.is_udon_behaviour)
    }
}
