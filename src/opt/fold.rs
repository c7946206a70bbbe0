//! Pass 1: constant folding (spec §4.E pass 1).
//!
//! Folds constants through binary/unary ops, casts to primitive types,
//! value-type constructors, and a whitelist of pure `Mathf` externs.
//! Arithmetic precision follows the destination's type; `UInt32`
//! wraps modulo 2^32, matching the runtime's actual storage width.

use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::{CallTarget, Instruction};
use crate::types::TypeSymbol;

/// Pure `Mathf.*` externs safe to evaluate at compile time when every
/// argument is constant (spec §4.E pass 1 whitelist).
const PURE_MATHF_WHITELIST: &[&str] = &[
    "Abs", "Ceil", "Floor", "Round", "Clamp", "Lerp", "Min", "Max", "Pow", "Sin", "Cos", "Sqrt", "Tan",
];

pub fn run(func: &mut TacFunction) {
    for inst in func.instructions.iter_mut() {
        fold_instruction(inst);
    }
}

fn fold_instruction(inst: &mut Instruction) {
    match inst {
        Instruction::BinaryOp { dest, op, left, right } => {
            if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
                if let Some(v) = fold_numeric_binary(op, l, r, &dest.ty()) {
                    *inst = Instruction::Copy { dest: dest.clone(), src: v };
                    return;
                }
            }
            if let (Some(l), Some(r)) = (as_bool(left), as_bool(right)) {
                if let Some(v) = fold_bool_binary(op, l, r) {
                    *inst = Instruction::Copy { dest: dest.clone(), src: v };
                }
            }
        }
        Instruction::UnaryOp { dest, op, operand } => {
            if let Some(n) = as_number(operand) {
                if let Some(v) = fold_numeric_unary(op, n, &dest.ty()) {
                    *inst = Instruction::Copy { dest: dest.clone(), src: v };
                    return;
                }
            }
            if let Some(b) = as_bool(operand) {
                if op == "!" {
                    *inst = Instruction::Copy { dest: dest.clone(), src: Operand::bool_const(!b) };
                }
            }
        }
        Instruction::Cast { dest, src, to } => {
            if let Some(n) = as_number(src) {
                let folded = coerce_numeric(n, to);
                *inst = Instruction::Copy { dest: dest.clone(), src: folded };
            }
        }
        Instruction::Call { dest: Some(dest), target: CallTarget::Extern(sig), args } => {
            if let Some(name) = mathf_member(sig) {
                if PURE_MATHF_WHITELIST.contains(&name) {
                    if let Some(nums) = args.iter().map(as_number).collect::<Option<Vec<_>>>() {
                        if let Some(v) = fold_mathf(name, &nums, &dest.ty()) {
                            *inst = Instruction::Copy { dest: dest.clone(), src: v };
                        }
                    }
                }
                return;
            }
            if let Some(struct_name) = value_type_ctor(sig) {
                if let Some(fields) = args.iter().map(as_number).collect::<Option<Vec<_>>>() {
                    let fields = fields.into_iter().map(ConstValue::Number).collect();
                    let src = Operand::Constant {
                        value: ConstValue::Struct { type_name: struct_name.to_string(), fields },
                        ty: dest.ty(),
                    };
                    *inst = Instruction::Copy { dest: dest.clone(), src };
                }
            }
        }
        _ => {}
    }
}

fn mathf_member(signature: &str) -> Option<&str> {
    let rest = signature.strip_prefix("UnityEngineMathf.__")?;
    rest.split("__").next()
}

/// `Vector3`/`Color` are plain value-type constructors (spec §4.E
/// pass 1): a `new Vector3(1, 2, 3)` with every argument constant is
/// exactly as foldable as an arithmetic expression, since the
/// constructor has no side effect beyond packing its fields.
const VALUE_TYPE_CTORS: &[&str] = &["Vector3", "Color"];

fn value_type_ctor(signature: &str) -> Option<&'static str> {
    VALUE_TYPE_CTORS.iter().copied().find(|name| {
        signature.starts_with(&format!("UnityEngine{}.__ctor__", name))
    })
}

pub(crate) fn as_number(op: &Operand) -> Option<f64> {
    match op {
        Operand::Constant { value: ConstValue::Number(n), .. } => Some(*n),
        Operand::Constant { value: ConstValue::BigInt(n), .. } => Some(*n as f64),
        _ => None,
    }
}

fn as_bool(op: &Operand) -> Option<bool> {
    match op {
        Operand::Constant { value: ConstValue::Bool(b), .. } => Some(*b),
        _ => None,
    }
}

pub(crate) fn coerce_numeric(n: f64, ty: &TypeSymbol) -> Operand {
    match ty {
        TypeSymbol::UInt32 => {
            let wrapped = (n as i64 as u32) as f64;
            Operand::Constant { value: ConstValue::Number(wrapped), ty: ty.clone() }
        }
        TypeSymbol::Int64 | TypeSymbol::UInt64 => {
            Operand::Constant { value: ConstValue::BigInt(n as i64), ty: ty.clone() }
        }
        _ => Operand::Constant { value: ConstValue::Number(n), ty: ty.clone() },
    }
}

fn fold_numeric_binary(op: &str, l: f64, r: f64, dest_ty: &TypeSymbol) -> Option<Operand> {
    let v = match op {
        "+" => l + r,
        "-" => l - r,
        "*" => l * r,
        "/" => l / r,
        "%" => l % r,
        "<" => return Some(Operand::bool_const(l < r)),
        "<=" => return Some(Operand::bool_const(l <= r)),
        ">" => return Some(Operand::bool_const(l > r)),
        ">=" => return Some(Operand::bool_const(l >= r)),
        "==" => return Some(Operand::bool_const(l == r)),
        "!=" => return Some(Operand::bool_const(l != r)),
        _ => return None,
    };
    Some(coerce_numeric(v, dest_ty))
}

fn fold_numeric_unary(op: &str, n: f64, dest_ty: &TypeSymbol) -> Option<Operand> {
    let v = match op {
        "-" => -n,
        "+" => n,
        _ => return None,
    };
    Some(coerce_numeric(v, dest_ty))
}

fn fold_bool_binary(op: &str, l: bool, r: bool) -> Option<Operand> {
    let v = match op {
        "&&" => l && r,
        "||" => l || r,
        "==" => l == r,
        "!=" => l != r,
        _ => return None,
    };
    Some(Operand::bool_const(v))
}

fn fold_mathf(name: &str, args: &[f64], dest_ty: &TypeSymbol) -> Option<Operand> {
    let v = match (name, args) {
        ("Abs", [a]) => a.abs(),
        ("Ceil", [a]) => a.ceil(),
        ("Floor", [a]) => a.floor(),
        ("Round", [a]) => a.round(),
        ("Sqrt", [a]) => a.sqrt(),
        ("Sin", [a]) => a.sin(),
        ("Cos", [a]) => a.cos(),
        ("Tan", [a]) => a.tan(),
        ("Pow", [a, b]) => a.powf(*b),
        ("Min", [a, b]) => a.min(*b),
        ("Max", [a, b]) => a.max(*b),
        ("Clamp", [a, lo, hi]) => a.clamp(*lo, *hi),
        ("Lerp", [a, b, t]) => a + (b - a) * t.clamp(0.0, 1.0),
        _ => return None,
    };
    Some(coerce_numeric(v, dest_ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_constant_addition() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Single };
        f.push(Instruction::BinaryOp {
            dest: dest.clone(),
            op: "+".to_string(),
            left: Operand::number_const(1.0),
            right: Operand::number_const(2.0),
        });
        run(&mut f);
        match &f.instructions[0] {
            Instruction::Copy { src, .. } => assert_eq!(as_number(src), Some(3.0)),
            other => panic!("expected folded copy, got {:?}", other),
        }
    }

    #[test]
    fn vector3_ctor_with_constant_args_folds() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::Extern("Vector3".to_string()) };
        f.push(Instruction::Call {
            dest: Some(dest),
            target: CallTarget::Extern(
                "UnityEngineVector3.__ctor__SystemSingle_SystemSingle_SystemSingle__UnityEngineVector3".to_string(),
            ),
            args: vec![Operand::number_const(1.0), Operand::number_const(2.0), Operand::number_const(3.0)],
        });
        run(&mut f);
        match &f.instructions[0] {
            Instruction::Copy { src: Operand::Constant { value: ConstValue::Struct { type_name, fields }, .. }, .. } => {
                assert_eq!(type_name, "Vector3");
                assert_eq!(fields.len(), 3);
            }
            other => panic!("expected folded struct constant, got {:?}", other),
        }
    }

    #[test]
    fn uint32_wraps() {
        let mut f = TacFunction::new(None);
        let dest = Operand::Temporary { id: f.new_temp(), ty: TypeSymbol::UInt32 };
        f.push(Instruction::BinaryOp {
            dest,
            op: "-".to_string(),
            left: Operand::Constant { value: ConstValue::Number(0.0), ty: TypeSymbol::UInt32 },
            right: Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::UInt32 },
        });
        run(&mut f);
        match &f.instructions[0] {
            Instruction::Copy { src, .. } => assert_eq!(as_number(src), Some(u32::MAX as f64)),
            other => panic!("expected folded copy, got {:?}", other),
        }
    }
}
