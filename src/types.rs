//! Component A: canonical type symbols (spec §3.1, §4.A).
//!
//! A [`TypeSymbol`] is the one type representation every later stage
//! shares: the lowerer annotates every TAC operand with one, the
//! optimizer's constant folder dispatches numeric arithmetic on it,
//! and the assembler uses [`TypeSymbol::udon_type`] as the catalog tag
//! for data-section entries. Modeled on the relationship between
//! `cranelift_codegen::ir::Type` and `isa::RegClass`: one small `Copy`
//! value that's cheap to carry on every operand, with a handful of
//! named, parameterised variants rather than an open string.

use std::fmt;

/// A canonical type symbol (spec §3.1).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeSymbol {
    Boolean,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    String,
    Void,
    Object,
    /// A named host extern type, e.g. `Vector3`, `GameObject`, `DataList`.
    Extern(String),
    ArrayOf(Box<TypeSymbol>),
    DataListOf(Box<TypeSymbol>),
    Collection {
        key: Box<TypeSymbol>,
        value: Box<TypeSymbol>,
    },
    /// A user-defined class; only meaningful prior to inlining — by
    /// the time TAC reaches the optimizer every user-class value has
    /// been rewritten to its inlined field variables (spec §4.D,
    /// "Inline instance map") or is itself an `Extern("UdonBehaviour")`
    /// indirect handle.
    UserClass(String),
}

impl TypeSymbol {
    /// `number` in the surface language always lowers to `Single`
    /// (spec §3.1 invariant).
    pub fn number() -> Self {
        TypeSymbol::Single
    }

    /// The catalog tag used by the resolver and the assembler
    /// (spec §3.1 "`udonType`"). This is the `System`/`UnityEngine`
    /// style PascalCase host name with no dots, e.g. `SystemSingle`,
    /// `SystemInt32`, `DataList`.
    pub fn udon_type(&self) -> String {
        match self {
            TypeSymbol::Boolean => "SystemBoolean".to_string(),
            TypeSymbol::Byte => "SystemByte".to_string(),
            TypeSymbol::SByte => "SystemSByte".to_string(),
            TypeSymbol::Int16 => "SystemInt16".to_string(),
            TypeSymbol::UInt16 => "SystemUInt16".to_string(),
            TypeSymbol::Int32 => "SystemInt32".to_string(),
            TypeSymbol::UInt32 => "SystemUInt32".to_string(),
            TypeSymbol::Int64 => "SystemInt64".to_string(),
            TypeSymbol::UInt64 => "SystemUInt64".to_string(),
            TypeSymbol::Single => "SystemSingle".to_string(),
            TypeSymbol::Double => "SystemDouble".to_string(),
            TypeSymbol::String => "SystemString".to_string(),
            TypeSymbol::Void => "SystemVoid".to_string(),
            TypeSymbol::Object => "SystemObject".to_string(),
            TypeSymbol::Extern(name) => host_type_name(name),
            TypeSymbol::ArrayOf(elem) => format!("{}Array", elem.udon_type()),
            TypeSymbol::DataListOf(_) => "VRCDataList".to_string(),
            TypeSymbol::Collection { .. } => "VRCDataDictionary".to_string(),
            TypeSymbol::UserClass(_) => "VRCUdonUdonBehaviour".to_string(),
        }
    }

    /// Is this a value-category type (spec §4.E pass 14,
    /// copy-on-write expansion)? Everything except numeric/boolean/
    /// string is value-category: `DataList`, `DataDictionary`, and
    /// user structs alias on copy and must be cloned before mutation.
    pub fn is_value_category(&self) -> bool {
        !matches!(
            self,
            TypeSymbol::Boolean
                | TypeSymbol::Byte
                | TypeSymbol::SByte
                | TypeSymbol::Int16
                | TypeSymbol::UInt16
                | TypeSymbol::Int32
                | TypeSymbol::UInt32
                | TypeSymbol::Int64
                | TypeSymbol::UInt64
                | TypeSymbol::Single
                | TypeSymbol::Double
                | TypeSymbol::String
                | TypeSymbol::Void
        )
    }

    /// Is this one of the restricted types the assembler cannot emit
    /// a non-default initial value for directly (spec §4.G.1)?
    /// Currently only `Boolean`.
    pub fn is_restricted_initial_value(&self) -> bool {
        matches!(self, TypeSymbol::Boolean)
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.udon_type())
    }
}

fn host_type_name(extern_name: &str) -> String {
    match extern_name {
        "DataList" => "VRCDataList".to_string(),
        "DataDictionary" => "VRCDataDictionary".to_string(),
        "DataToken" => "VRCDataToken".to_string(),
        "SystemType" => "SystemType".to_string(),
        "UdonBehaviour" => "VRCUdonUdonBehaviour".to_string(),
        other => format!("UnityEngine{}", other),
    }
}

/// Map a surface-language type name (as written by the user, possibly
/// with a parameterised textual form) to a canonical [`TypeSymbol`]
/// (spec §4.A).
///
/// Unknown types fall back to `Object` and are logged, not thrown —
/// this function never fails.
pub fn map_surface_type(text: &str) -> TypeSymbol {
    let text = text.trim();
    if let Some(inner) = strip_generic(text, "Array") {
        return TypeSymbol::ArrayOf(Box::new(map_surface_type(inner)));
    }
    if let Some(inner) = strip_generic(text, "UdonList") {
        return TypeSymbol::DataListOf(Box::new(map_surface_type(inner)));
    }
    if let Some(inner) = strip_generic(text, "Map") {
        if let Some((k, v)) = split_top_level_comma(inner) {
            return TypeSymbol::Collection {
                key: Box::new(map_surface_type(k)),
                value: Box::new(map_surface_type(v)),
            };
        }
    }
    if let Some(inner) = strip_generic(text, "Set") {
        return TypeSymbol::Collection {
            key: Box::new(map_surface_type(inner)),
            value: Box::new(TypeSymbol::Boolean),
        };
    }

    match text {
        "boolean" => TypeSymbol::Boolean,
        "byte" => TypeSymbol::Byte,
        "sbyte" => TypeSymbol::SByte,
        "short" => TypeSymbol::Int16,
        "ushort" => TypeSymbol::UInt16,
        "int" => TypeSymbol::Int32,
        "uint" => TypeSymbol::UInt32,
        "bigint" | "long" => TypeSymbol::Int64,
        "ulong" => TypeSymbol::UInt64,
        "number" => TypeSymbol::Single,
        "double" => TypeSymbol::Double,
        "string" => TypeSymbol::String,
        "void" => TypeSymbol::Void,
        "object" | "" => TypeSymbol::Object,
        "DataList" | "DataDictionary" | "DataToken" | "SystemType" => {
            TypeSymbol::Extern(text.to_string())
        }
        known_extern if known_extern.chars().next().map_or(false, |c| c.is_uppercase()) => {
            TypeSymbol::Extern(text.to_string())
        }
        unknown => {
            log::debug!("unrecognised surface type `{}`, falling back to Object", unknown);
            TypeSymbol::Object
        }
    }
}

/// `mapCatalogType`: the host type name used in extern-signature
/// construction for a given symbol (spec §4.A).
pub fn map_catalog_type(ty: &TypeSymbol) -> String {
    ty.udon_type()
}

/// `toUdonTypeName`: normalise a host type name (as produced by
/// `map_catalog_type` or read back from a signature string) to the
/// catalog tag the assembler expects in a `%udonType,` position.
pub fn to_udon_type_name(host_name: &str) -> String {
    host_name.to_string()
}

fn strip_generic<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let prefix = format!("{}<", name);
    if text.starts_with(&prefix) && text.ends_with('>') {
        Some(&text[prefix.len()..text.len() - 1])
    } else {
        None
    }
}

/// Split `"K,V"` at the top-level comma (not inside nested `<...>`).
fn split_top_level_comma(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return Some((text[..i].trim(), text[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives() {
        assert_eq!(map_surface_type("number"), TypeSymbol::Single);
        assert_eq!(map_surface_type("boolean"), TypeSymbol::Boolean);
        assert_eq!(map_surface_type("bigint"), TypeSymbol::Int64);
        assert_eq!(map_surface_type("string"), TypeSymbol::String);
    }

    #[test]
    fn unknown_falls_back_to_object() {
        assert_eq!(map_surface_type("whatever_this_is"), TypeSymbol::Object);
    }

    #[test]
    fn parameterised_forms() {
        assert_eq!(
            map_surface_type("Array<number>"),
            TypeSymbol::ArrayOf(Box::new(TypeSymbol::Single))
        );
        assert_eq!(
            map_surface_type("Map<string,number>"),
            TypeSymbol::Collection {
                key: Box::new(TypeSymbol::String),
                value: Box::new(TypeSymbol::Single),
            }
        );
    }

    #[test]
    fn udon_type_tags() {
        assert_eq!(TypeSymbol::Single.udon_type(), "SystemSingle");
        assert_eq!(TypeSymbol::Boolean.udon_type(), "SystemBoolean");
        assert_eq!(
            TypeSymbol::Extern("GameObject".to_string()).udon_type(),
            "UnityEngineGameObject"
        );
        assert_eq!(
            TypeSymbol::Extern("DataList".to_string()).udon_type(),
            "VRCDataList"
        );
    }

    #[test]
    fn value_category() {
        assert!(!TypeSymbol::Single.is_value_category());
        assert!(!TypeSymbol::Boolean.is_value_category());
        assert!(!TypeSymbol::String.is_value_category());
        assert!(TypeSymbol::Extern("DataList".to_string()).is_value_category());
        assert!(TypeSymbol::UserClass("Foo".to_string()).is_value_category());
    }
}
