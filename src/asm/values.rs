//! Value serialization (spec §4.G.4).
//!
//! Turns a [`ConstValue`] plus its `udonType` tag into the literal text
//! that goes after the type name on a `.data_start` line. Floats always
//! round-trip through a decimal point, integers clamp to their type's
//! range (`UInt32` keeping its bit pattern when constructed from a
//! negative value), `SystemType` strings and already-`0x`-prefixed
//! integer constants pass through verbatim, and everything else is
//! JSON-stringified.

use crate::tac::entities::ConstValue;

/// Serialize `value` (already known to be of type `udon_type`) to its
/// `.uasm` literal text.
pub fn serialize(udon_type: &str, value: &ConstValue) -> String {
    match value {
        ConstValue::Null => "null".to_string(),
        ConstValue::Bool(b) => b.to_string(),
        ConstValue::Number(n) => {
            if udon_type == "SystemSingle" || udon_type == "SystemDouble" {
                serialize_float(*n)
            } else {
                serialize_integer(udon_type, *n as i64)
            }
        }
        ConstValue::BigInt(n) => serialize_integer(udon_type, *n),
        ConstValue::Str(s) => {
            if udon_type == "SystemType" || s.starts_with("0x") || s.starts_with("0X") {
                s.clone()
            } else {
                json_quote(s)
            }
        }
        ConstValue::TypeName(s) => s.clone(),
        ConstValue::Struct { fields, .. } => {
            let rendered: Vec<String> = fields.iter().map(|f| serialize(udon_type, f)).collect();
            format!("[{}]", rendered.join(","))
        }
    }
}

/// Always include a decimal point, even for whole numbers, so the host
/// loader never mistakes a float literal for an integer one (spec
/// §4.G.4).
fn serialize_float(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// Clamp to the type's representable range. `SystemUInt32` is the one
/// type where a negative source value is reinterpreted by its bit
/// pattern rather than clamped to zero (spec §4.G.4) — `-1` becomes
/// `4294967295`, not `0`.
fn serialize_integer(udon_type: &str, n: i64) -> String {
    match udon_type {
        "SystemByte" => (n.clamp(u8::MIN as i64, u8::MAX as i64) as u8).to_string(),
        "SystemSByte" => (n.clamp(i8::MIN as i64, i8::MAX as i64) as i8).to_string(),
        "SystemInt16" => (n.clamp(i16::MIN as i64, i16::MAX as i64) as i16).to_string(),
        "SystemUInt16" => (n.clamp(u16::MIN as i64, u16::MAX as i64) as u16).to_string(),
        "SystemInt32" => (n.clamp(i32::MIN as i64, i32::MAX as i64) as i32).to_string(),
        "SystemUInt32" => (n as i32 as u32).to_string(),
        "SystemInt64" => n.to_string(),
        "SystemUInt64" => (n as u64).to_string(),
        _ => n.to_string(),
    }
}

fn json_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_float_keeps_decimal_point() {
        assert_eq!(serialize("SystemSingle", &ConstValue::Number(3.0)), "3.0");
    }

    #[test]
    fn uint32_preserves_bit_pattern_for_negative_input() {
        assert_eq!(serialize("SystemUInt32", &ConstValue::Number(-1.0)), "4294967295");
    }

    #[test]
    fn strings_are_json_quoted_unless_hex_or_systemtype() {
        assert_eq!(serialize("SystemString", &ConstValue::Str("hi".to_string())), "\"hi\"");
        assert_eq!(serialize("SystemString", &ConstValue::Str("0xFF".to_string())), "0xFF");
        assert_eq!(serialize("SystemType", &ConstValue::Str("UnityEngine.GameObject".to_string())), "UnityEngine.GameObject");
    }

    #[test]
    fn byte_clamps_out_of_range() {
        assert_eq!(serialize("SystemByte", &ConstValue::Number(300.0)), "255");
    }
}
