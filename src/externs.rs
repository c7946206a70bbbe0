//! Component B: the extern resolver (spec §4.B).
//!
//! Nearly every TAC operation reduces to a chosen extern, so this
//! small module sits at the seam between [`crate::types`] and
//! [`crate::catalog::ExternCatalog`]: given a `(type, member, access,
//! params, return)` tuple it produces the catalog's canonical
//! signature string, and given a signature string it parses the
//! trailing return-type token back into a [`crate::types::TypeSymbol`].
//! Signatures are strings *only* — their textual form is canonical
//! (spec §4.B) — so this module never tries to model them as a
//! richer type.

use crate::ast::SourceSpan;
use crate::catalog::{AccessKind, ExternCatalog};
use crate::result::{CodegenError, CodegenResult, ExternLookup};
use crate::types::TypeSymbol;

/// Resolves extern signatures against a [`ExternCatalog`], tracking
/// nothing of its own — this is a thin, stateless wrapper, the same
/// relationship `cranelift_codegen::isa::TargetIsa` has to the
/// register/encoding tables it queries.
pub struct ExternResolver<'a> {
    catalog: &'a dyn ExternCatalog,
}

impl<'a> ExternResolver<'a> {
    pub fn new(catalog: &'a dyn ExternCatalog) -> Self {
        Self { catalog }
    }

    /// Build the canonical extern signature string for
    /// `(typeName, memberName, accessKind, paramHostTypes, returnHostType)`,
    /// failing with `ExternMissing` if the catalog doesn't know it.
    ///
    /// The signature format itself (`<HostType>.__<member>__<p1>_<p2>__<ret>`)
    /// is owned by the catalog; this resolver only asks for it and
    /// fails loudly if it isn't there. `require_extern` is the
    /// fallible entry point named by spec §4.B.
    pub fn require_extern(
        &self,
        type_name: &str,
        member_name: &str,
        access: AccessKind,
        param_types: &[&str],
        return_type: &str,
        span: SourceSpan,
    ) -> CodegenResult<String> {
        self.catalog
            .resolve_extern_signature(type_name, member_name, access, param_types, return_type)
            .ok_or_else(|| CodegenError::ExternMissing {
                lookup: ExternLookup {
                    type_name: type_name.to_string(),
                    member_name: member_name.to_string(),
                    param_types: param_types.iter().map(|s| s.to_string()).collect(),
                },
                span,
            })
    }

    /// Convenience form taking [`TypeSymbol`]s rather than raw host
    /// type name strings.
    pub fn require_extern_typed(
        &self,
        receiver: &TypeSymbol,
        member_name: &str,
        access: AccessKind,
        param_types: &[TypeSymbol],
        return_type: &TypeSymbol,
        span: SourceSpan,
    ) -> CodegenResult<String> {
        let param_names: Vec<String> = param_types.iter().map(|t| t.udon_type()).collect();
        let param_refs: Vec<&str> = param_names.iter().map(String::as_str).collect();
        self.require_extern(
            &receiver.udon_type(),
            member_name,
            access,
            &param_refs,
            &return_type.udon_type(),
            span,
        )
    }

    /// Runtime type id used by `GetComponent`-style externs.
    pub fn compute_type_id(&self, type_name: &str) -> u64 {
        self.catalog.compute_type_id(type_name)
    }
}

/// Parse the trailing return-type token of a canonical extern
/// signature string back into a [`TypeSymbol`] (spec §4.B
/// `resolveExternReturnType`, e.g. `SystemBoolean` -> `Boolean`).
///
/// This is independent of any particular catalog: the signature
/// format is fixed (`...__<ReturnToken>`), so the resolver can parse
/// it without consulting the catalog again.
pub fn resolve_extern_return_type(signature: &str) -> TypeSymbol {
    let token = signature.rsplit("__").next().unwrap_or(signature);
    udon_token_to_type(token)
}

fn udon_token_to_type(token: &str) -> TypeSymbol {
    match token {
        "SystemBoolean" => TypeSymbol::Boolean,
        "SystemByte" => TypeSymbol::Byte,
        "SystemSByte" => TypeSymbol::SByte,
        "SystemInt16" => TypeSymbol::Int16,
        "SystemUInt16" => TypeSymbol::UInt16,
        "SystemInt32" => TypeSymbol::Int32,
        "SystemUInt32" => TypeSymbol::UInt32,
        "SystemInt64" => TypeSymbol::Int64,
        "SystemUInt64" => TypeSymbol::UInt64,
        "SystemSingle" => TypeSymbol::Single,
        "SystemDouble" => TypeSymbol::Double,
        "SystemString" => TypeSymbol::String,
        "SystemVoid" => TypeSymbol::Void,
        "SystemObject" => TypeSymbol::Object,
        "VRCDataList" => TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)),
        "VRCDataDictionary" => TypeSymbol::Collection {
            key: Box::new(TypeSymbol::Object),
            value: Box::new(TypeSymbol::Object),
        },
        other if other.starts_with("UnityEngine") => {
            TypeSymbol::Extern(other.trim_start_matches("UnityEngine").to_string())
        }
        other if other.ends_with("Array") => {
            let elem = &other[..other.len() - "Array".len()];
            TypeSymbol::ArrayOf(Box::new(udon_token_to_type(elem)))
        }
        other => TypeSymbol::Extern(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;

    fn span() -> SourceSpan {
        SourceSpan::default()
    }

    #[test]
    fn requires_present_extern() {
        let mut catalog = StaticCatalog::new();
        catalog.insert(
            "UnityEngineMathf",
            "Abs",
            AccessKind::Method,
            vec!["SystemSingle".to_string()],
            "SystemSingle",
            "UnityEngineMathf.__Abs__SystemSingle__SystemSingle",
        );
        let resolver = ExternResolver::new(&catalog);
        let sig = resolver
            .require_extern(
                "UnityEngineMathf",
                "Abs",
                AccessKind::Method,
                &["SystemSingle"],
                "SystemSingle",
                span(),
            )
            .unwrap();
        assert_eq!(sig, "UnityEngineMathf.__Abs__SystemSingle__SystemSingle");
    }

    #[test]
    fn missing_extern_is_fatal() {
        let catalog = StaticCatalog::new();
        let resolver = ExternResolver::new(&catalog);
        let err = resolver
            .require_extern("Foo", "Bar", AccessKind::Method, &[], "SystemVoid", span())
            .unwrap_err();
        assert!(matches!(err, CodegenError::ExternMissing { .. }));
    }

    #[test]
    fn return_type_roundtrip() {
        assert_eq!(
            resolve_extern_return_type("UnityEngineMathf.__Abs__SystemSingle__SystemSingle"),
            TypeSymbol::Single
        );
        assert_eq!(
            resolve_extern_return_type("SystemInt32.__Parse__SystemString__SystemInt32"),
            TypeSymbol::Int32
        );
        assert_eq!(
            resolve_extern_return_type("Type.__op_Equality__SystemObject_SystemObject__SystemBoolean"),
            TypeSymbol::Boolean
        );
    }
}
