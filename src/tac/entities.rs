//! TAC entity references and operands (spec §3.2).
//!
//! `Temp` and `Label` are opaque `u32`-backed references the same way
//! `cranelift_codegen::ir::entities::Value`/`Ebb` are: a newtype around
//! a dense index rather than a pointer, so operands stay `Copy` and
//! cheap to clone (spec §3.3 "instructions own their operands;
//! operands are value-like and may be cloned freely").

use cranelift_entity::{entity_impl, EntityRef};
use std::fmt;

use crate::types::TypeSymbol;

/// A compiler-generated temporary, unique within a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(u32);
entity_impl!(Temp, "t");

/// A program-wide-unique label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);
entity_impl!(Label, "L");

/// A compile-time constant value (spec §3.2).
///
/// `null` always carries type `Object` (spec §3.2 invariant); that's
/// enforced at construction in [`crate::lower`], not here, since this
/// is a plain value type with no validating constructor.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i64),
    Str(String),
    /// A string that denotes a type name (`typeof`/`nameof` results,
    /// and `SystemType`-typed constants the assembler emits verbatim).
    TypeName(String),
    /// A struct literal constant (e.g. a constant-folded `Vector3`),
    /// stored as its field values in declaration order.
    Struct {
        type_name: String,
        fields: Vec<ConstValue>,
    },
}

/// A TAC operand (spec §3.2).
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// `isLocal`/`isParameter`/`isExported` flags travel with the
    /// name since they determine export/sync behavior far downstream
    /// in the assembler (spec §3.5, §3.6).
    Variable {
        name: String,
        ty: TypeSymbol,
        is_local: bool,
        is_parameter: bool,
        is_exported: bool,
    },
    Temporary { id: Temp, ty: TypeSymbol },
    Constant { value: ConstValue, ty: TypeSymbol },
    Label(Label),
}

impl Operand {
    pub fn ty(&self) -> TypeSymbol {
        match self {
            Operand::Variable { ty, .. } | Operand::Temporary { ty, .. } | Operand::Constant { ty, .. } => {
                ty.clone()
            }
            Operand::Label(_) => TypeSymbol::Void,
        }
    }

    pub fn as_variable_name(&self) -> Option<&str> {
        match self {
            Operand::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Operand::Temporary { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn null() -> Operand {
        Operand::Constant {
            value: ConstValue::Null,
            ty: TypeSymbol::Object,
        }
    }

    pub fn bool_const(b: bool) -> Operand {
        Operand::Constant {
            value: ConstValue::Bool(b),
            ty: TypeSymbol::Boolean,
        }
    }

    pub fn number_const(n: f64) -> Operand {
        Operand::Constant {
            value: ConstValue::Number(n),
            ty: TypeSymbol::Single,
        }
    }

    /// A unique key identifying an operand's *value identity* for
    /// use in GVN/CSE hash keys (spec §4.E pass 5) — two operands with
    /// the same key always denote the same runtime value at the point
    /// they're compared.
    pub fn value_key(&self) -> String {
        match self {
            Operand::Variable { name, .. } => format!("var:{}", name),
            Operand::Temporary { id, .. } => format!("tmp:{}", id),
            Operand::Constant { value, .. } => format!("const:{:?}", value),
            Operand::Label(l) => format!("label:{}", l),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Variable { name, .. } => write!(f, "{}", name),
            Operand::Temporary { id, .. } => write!(f, "{}", id),
            Operand::Constant { value, .. } => write!(f, "{}", value),
            Operand::Label(l) => write!(f, "{}", l),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Number(n) => write!(f, "{}", n),
            ConstValue::BigInt(n) => write!(f, "{}L", n),
            ConstValue::Str(s) => write!(f, "{:?}", s),
            ConstValue::TypeName(s) => write!(f, "typeof({})", s),
            ConstValue::Struct { type_name, fields } => {
                write!(f, "{}(", type_name)?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_display() {
        let t = Temp::new(3);
        assert_eq!(t.to_string(), "t3");
    }

    #[test]
    fn label_display() {
        let l = Label::new(7);
        assert_eq!(l.to_string(), "L7");
    }

    #[test]
    fn value_key_distinguishes_kinds() {
        let v = Operand::Variable {
            name: "x".to_string(),
            ty: TypeSymbol::Single,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        let t = Operand::Temporary {
            id: Temp::new(0),
            ty: TypeSymbol::Single,
        };
        assert_ne!(v.value_key(), t.value_key());
    }
}
