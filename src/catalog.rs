//! The extern catalog / type metadata registry contract (spec §6.2).
//!
//! The catalog itself — the flat name sets of every `UnityEngine.*` /
//! `System.*` / `VRC.*` method signature Udon exposes — is an external
//! collaborator (spec §1). This module only defines the trait
//! [`ExternCatalog`] that [`crate::externs::ExternResolver`] consumes,
//! plus an in-memory implementation useful for tests and small
//! embeddings.

use std::collections::HashMap;

/// How a member is accessed, per spec §4.B.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Method,
    Getter,
    Setter,
    Ctor,
}

/// A flat, read-shared registry of `(type, member, access) -> signature`
/// resolutions plus the runtime type-id table used by `GetComponent`.
///
/// Implementations must be safe for concurrent reads (spec §5): the
/// catalog is loaded once at host startup and never mutated again for
/// the lifetime of any [`crate::compile::compile`] call.
pub trait ExternCatalog {
    /// Resolve `(typeName, memberName, accessKind)` to the catalog's
    /// canonical signature string, or `None` if no such member exists.
    ///
    /// Overload resolution by parameter/return type is the catalog's
    /// responsibility; callers that need a specific overload pass
    /// `param_types`/`return_type` hints the catalog implementation may
    /// use however it likes (a real catalog indexes by the full tuple;
    /// the in-memory [`StaticCatalog`] below does too).
    fn resolve_extern_signature(
        &self,
        type_name: &str,
        member_name: &str,
        access: AccessKind,
        param_types: &[&str],
        return_type: &str,
    ) -> Option<String>;

    /// Compute the integer type tag used by the runtime's `GetComponent`
    /// shim for `type_name`.
    fn compute_type_id(&self, type_name: &str) -> u64;
}

/// A simple in-memory catalog, keyed by the full resolution tuple.
///
/// Useful for unit/integration tests and for small embeddings that
/// load their catalog from a generated table at startup rather than
/// querying a live Unity reflection surface.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    signatures: HashMap<(String, String, AccessKindKey, Vec<String>, String), String>,
    type_ids: HashMap<String, u64>,
}

/// `AccessKind` isn't `Hash`-derivable as a map key component directly
/// alongside tuples without naming it, so this newtype wraps it; kept
/// private since it's purely a key-shape detail of `StaticCatalog`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct AccessKindKey(AccessKind);

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature for later resolution.
    pub fn insert(
        &mut self,
        type_name: impl Into<String>,
        member_name: impl Into<String>,
        access: AccessKind,
        param_types: Vec<String>,
        return_type: impl Into<String>,
        signature: impl Into<String>,
    ) -> &mut Self {
        let return_type = return_type.into();
        self.signatures.insert(
            (
                type_name.into(),
                member_name.into(),
                AccessKindKey(access),
                param_types,
                return_type,
            ),
            signature.into(),
        );
        self
    }

    /// Register a runtime type id for `type_name`.
    pub fn insert_type_id(&mut self, type_name: impl Into<String>, id: u64) -> &mut Self {
        self.type_ids.insert(type_name.into(), id);
        self
    }
}

impl ExternCatalog for StaticCatalog {
    fn resolve_extern_signature(
        &self,
        type_name: &str,
        member_name: &str,
        access: AccessKind,
        param_types: &[&str],
        return_type: &str,
    ) -> Option<String> {
        let key = (
            type_name.to_string(),
            member_name.to_string(),
            AccessKindKey(access),
            param_types.iter().map(|s| s.to_string()).collect(),
            return_type.to_string(),
        );
        self.signatures.get(&key).cloned()
    }

    fn compute_type_id(&self, type_name: &str) -> u64 {
        self.type_ids.get(type_name).copied().unwrap_or(0)
    }
}
