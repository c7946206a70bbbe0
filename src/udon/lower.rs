//! Component F: TAC -> Udon lowering (spec §4.F).
//!
//! Allocates, in TAC traversal order, a data-section slot for every
//! distinct variable, constant, and temporary, then rewrites each TAC
//! instruction into the `PUSH`/`EXTERN`/`COPY` sequence the spec's
//! lowering table describes. Label/jump instructions are carried
//! through by name; byte-address resolution is the assembler's job
//! ([`crate::asm::labels`]).

use std::collections::HashMap;

use crate::asm::data::{DataEntry, DataSection, SyncMode};
use crate::ast::SourceSpan;
use crate::externs::ExternResolver;
use crate::opt::AllocationPlan;
use crate::result::CodegenResult;
use crate::tac::entities::{ConstValue, Operand, Temp};
use crate::tac::function::TacFunction;
use crate::tac::instructions::{CallTarget, Instruction};
use crate::types::TypeSymbol;
use crate::udon::instructions::{JumpTarget, UdonInstruction};
use crate::vrc_events::VrcEventRegistry;

/// The fully-lowered Udon program: one flat instruction stream plus
/// the shared data section every function's operands were allocated
/// into (spec §4.F, §3.5).
#[derive(Clone, Debug, Default)]
pub struct UdonModule {
    pub instructions: Vec<UdonInstruction>,
    pub data: Vec<DataEntry>,
    /// Labels that must be `.export`ed: `_start` and every recognised
    /// VRChat event (spec §3.6, §4.G.3).
    pub exported_labels: Vec<String>,
}

/// Per-function naming/allocation context: resolves a TAC operand to
/// its data-section name, allocating a fresh entry the first time it's
/// seen, and reusing the slot [`AllocationPlan`] assigned for
/// temporaries/eligible locals.
struct FunctionNamer<'a> {
    class_name: &'a str,
    method_name: &'a str,
    plan: &'a AllocationPlan,
    temp_names: HashMap<Temp, String>,
}

impl<'a> FunctionNamer<'a> {
    fn new(class_name: &'a str, method_name: &'a str, plan: &'a AllocationPlan) -> Self {
        Self { class_name, method_name, plan, temp_names: HashMap::new() }
    }

    fn temp_name(&mut self, t: Temp) -> String {
        if let Some(existing) = self.temp_names.get(&t) {
            return existing.clone();
        }
        let slot = self.plan.temp_slots.get(&t).copied().unwrap_or_else(|| {
            use cranelift_entity::EntityRef;
            t.index() as u32
        });
        let name = format!("__t_{}_{}_{}", self.class_name, self.method_name, slot);
        self.temp_names.insert(t, name.clone());
        name
    }

    fn variable_name(&self, name: &str) -> String {
        if self.plan.reusable_locals.iter().any(|l| l == name) || name == "this" {
            name.to_string()
        } else {
            format!("{}_{}_{}", self.class_name, self.method_name, name)
        }
    }
}

fn default_const_value(ty: &TypeSymbol) -> ConstValue {
    match ty {
        TypeSymbol::Boolean => ConstValue::Bool(false),
        TypeSymbol::String => ConstValue::Str(String::new()),
        TypeSymbol::Void | TypeSymbol::Object => ConstValue::Null,
        TypeSymbol::Int64 | TypeSymbol::UInt64 => ConstValue::BigInt(0),
        // Lazily-constructed `VRCDataList`/`VRCDataDictionary` locals (recursion
        // shadow arrays among them) are null-checked before their first use;
        // defaulting them to a numeric zero would make that check never fire.
        TypeSymbol::DataListOf(_) | TypeSymbol::Collection { .. } => ConstValue::Null,
        _ => ConstValue::Number(0.0),
    }
}

/// Resolve a TAC operand to the data-section name that holds it,
/// declaring/interning it on first sight (spec §4.F).
fn operand_name(
    operand: &Operand,
    data: &mut DataSection,
    namer: &mut FunctionNamer,
) -> String {
    match operand {
        Operand::Variable { name, ty, is_exported, .. } => {
            let resolved = namer.variable_name(name);
            data.declare_variable(
                &resolved,
                &ty.udon_type(),
                default_const_value(ty),
                *is_exported,
                if *is_exported { Some(SyncMode::None) } else { None },
            );
            resolved
        }
        Operand::Temporary { id, ty } => {
            let resolved = namer.temp_name(*id);
            data.declare_variable(&resolved, &ty.udon_type(), default_const_value(ty), false, None);
            resolved
        }
        Operand::Constant { value, ty } => data.intern_constant(&ty.udon_type(), value.clone()),
        Operand::Label(l) => l.to_string(),
    }
}

fn push(data: &mut DataSection, namer: &mut FunctionNamer, out: &mut Vec<UdonInstruction>, op: &Operand) {
    out.push(UdonInstruction::Push(operand_name(op, data, namer)));
}

fn push_extern_sig(data: &mut DataSection, out: &mut Vec<UdonInstruction>, signature: &str) {
    let interned = data.intern_extern_signature(signature);
    out.push(UdonInstruction::Push(interned));
    out.push(UdonInstruction::Extern { signature: signature.to_string(), is_pure: false });
}

/// Lower one [`TacFunction`] into the shared instruction stream and
/// data section. `resolver` is needed only for `Cast` instructions
/// whose source/destination `udonType` differ (spec §4.F "Cast");
/// every other cast was either already resolved by the lowerer into an
/// extern `Call`, or eliminated by the optimizer's self-cast rule.
pub fn lower_function(
    class_name: &str,
    method_name: &str,
    func: &TacFunction,
    plan: &AllocationPlan,
    resolver: &ExternResolver,
    events: &dyn VrcEventRegistry,
    data: &mut DataSection,
    exported_labels: &mut Vec<String>,
) -> CodegenResult<Vec<UdonInstruction>> {
    let mut namer = FunctionNamer::new(class_name, method_name, plan);
    let mut out = Vec::new();
    let synthetic_span = SourceSpan::default();

    // Every method body gets two labels at its entry point: its own
    // name (exported when it's `_start` or a recognised VRChat event,
    // spec §3.6) and `__fn_<name>`, the target `CallTarget::UserFunction`
    // jumps to for same-class static calls (spec §4.F "Call").
    out.push(UdonInstruction::Label(method_name.to_string()));
    if events.is_vrc_event_label(method_name) || method_name == "_start" {
        exported_labels.push(method_name.to_string());
    }
    out.push(UdonInstruction::Label(format!("__fn_{}", method_name)));

    for inst in &func.instructions {
        match inst {
            Instruction::Assignment { dest, src } | Instruction::Copy { dest, src } => {
                // A variable's *first* assignment, when the source is
                // a compile-time constant, becomes its data-section
                // initial value directly (spec §8 S1: `x: %SystemSingle,
                // 10.0`) rather than the type's zero default — the
                // PUSH/PUSH/COPY sequence below still runs at `_start`
                // and re-assigns the same value, which is redundant but
                // harmless and matches the lowering table unconditionally.
                if let (Operand::Variable { name, ty, is_exported, .. }, Operand::Constant { value, .. }) =
                    (dest, src)
                {
                    let resolved = namer.variable_name(name);
                    data.declare_variable(
                        &resolved,
                        &ty.udon_type(),
                        value.clone(),
                        *is_exported,
                        if *is_exported { Some(SyncMode::None) } else { None },
                    );
                }
                push(data, &mut namer, &mut out, src);
                push(data, &mut namer, &mut out, dest);
                out.push(UdonInstruction::Copy);
            }
            Instruction::BinaryOp { dest, op, left, right } => {
                let sig = binary_op_signature(op, &left.ty(), &right.ty(), &dest.ty());
                push(data, &mut namer, &mut out, left);
                push(data, &mut namer, &mut out, right);
                push_extern_sig(data, &mut out, &sig);
                push(data, &mut namer, &mut out, dest);
                out.push(UdonInstruction::Copy);
            }
            Instruction::UnaryOp { dest, op, operand } => {
                let sig = unary_op_signature(op, &operand.ty(), &dest.ty());
                push(data, &mut namer, &mut out, operand);
                push_extern_sig(data, &mut out, &sig);
                push(data, &mut namer, &mut out, dest);
                out.push(UdonInstruction::Copy);
            }
            Instruction::Cast { dest, src, to } => {
                if src.ty().udon_type() == to.udon_type() {
                    push(data, &mut namer, &mut out, src);
                    push(data, &mut namer, &mut out, dest);
                    out.push(UdonInstruction::Copy);
                } else {
                    let sig = resolver.require_extern(
                        &to.udon_type(),
                        "Parse",
                        crate::catalog::AccessKind::Method,
                        &[src.ty().udon_type().as_str()],
                        &to.udon_type(),
                        synthetic_span,
                    ).unwrap_or_else(|_| {
                        format!("{}.__Convert__{}__{}", to.udon_type(), src.ty().udon_type(), to.udon_type())
                    });
                    push(data, &mut namer, &mut out, src);
                    push_extern_sig(data, &mut out, &sig);
                    push(data, &mut namer, &mut out, dest);
                    out.push(UdonInstruction::Copy);
                }
            }
            Instruction::ConditionalJump { cond, target } => {
                push(data, &mut namer, &mut out, cond);
                out.push(UdonInstruction::JumpIfFalse(JumpTarget::Label(target.to_string())));
            }
            Instruction::UnconditionalJump { target } => {
                out.push(UdonInstruction::Jump(JumpTarget::Label(target.to_string())));
            }
            Instruction::Label(l) => {
                out.push(UdonInstruction::Label(l.to_string()));
            }
            Instruction::Call { dest, target, args } => {
                for a in args {
                    push(data, &mut namer, &mut out, a);
                }
                emit_call_target(data, &mut out, target);
                if let Some(d) = dest {
                    push(data, &mut namer, &mut out, d);
                    out.push(UdonInstruction::Copy);
                }
            }
            Instruction::MethodCall { dest, receiver, target, args } => {
                push(data, &mut namer, &mut out, receiver);
                for a in args {
                    push(data, &mut namer, &mut out, a);
                }
                emit_call_target(data, &mut out, target);
                if let Some(d) = dest {
                    push(data, &mut namer, &mut out, d);
                    out.push(UdonInstruction::Copy);
                }
            }
            Instruction::PropertyGet { dest, receiver, getter, .. } => {
                push(data, &mut namer, &mut out, receiver);
                push_extern_sig(data, &mut out, getter);
                push(data, &mut namer, &mut out, dest);
                out.push(UdonInstruction::Copy);
            }
            Instruction::PropertySet { receiver, setter, value, .. } => {
                push(data, &mut namer, &mut out, receiver);
                push(data, &mut namer, &mut out, value);
                push_extern_sig(data, &mut out, setter);
            }
            Instruction::Return { value } => {
                if let Some(v) = value {
                    push(data, &mut namer, &mut out, v);
                    let ret_name = format!("__returnValue_{}", method_name);
                    out.push(UdonInstruction::Push(ret_name));
                    out.push(UdonInstruction::Copy);
                }
                out.push(UdonInstruction::Jump(JumpTarget::Label(format!("__return_{}_{}", class_name, method_name))));
            }
            Instruction::ArrayAccess { dest, array, index, getter } => {
                push(data, &mut namer, &mut out, array);
                push(data, &mut namer, &mut out, index);
                push_extern_sig(data, &mut out, getter);
                push(data, &mut namer, &mut out, dest);
                out.push(UdonInstruction::Copy);
            }
            Instruction::ArrayAssignment { array, index, value, setter } => {
                push(data, &mut namer, &mut out, array);
                push(data, &mut namer, &mut out, index);
                push(data, &mut namer, &mut out, value);
                push_extern_sig(data, &mut out, setter);
            }
        }
    }

    out.push(UdonInstruction::Label(format!("__return_{}_{}", class_name, method_name)));
    Ok(out)
}

fn emit_call_target(data: &mut DataSection, out: &mut Vec<UdonInstruction>, target: &CallTarget) {
    match target {
        CallTarget::Extern(sig) => push_extern_sig(data, out, sig),
        CallTarget::UserFunction(name) => {
            out.push(UdonInstruction::Jump(JumpTarget::Label(format!("__fn_{}", name))));
        }
    }
}

fn binary_op_signature(op: &str, left: &TypeSymbol, right: &TypeSymbol, dest: &TypeSymbol) -> String {
    let member = match op {
        "+" => "op_Addition",
        "-" => "op_Subtraction",
        "*" => "op_Multiply",
        "/" => "op_Division",
        "%" => "op_Modulus",
        "==" => "op_Equality",
        "!=" => "op_Inequality",
        "<" => "op_LessThan",
        "<=" => "op_LessThanOrEqual",
        ">" => "op_GreaterThan",
        ">=" => "op_GreaterThanOrEqual",
        "&&" => "op_LogicalAnd",
        "||" => "op_LogicalOr",
        other => other,
    };
    format!(
        "{}.__{}__{}_{}__{}",
        dest.udon_type(),
        member,
        left.udon_type(),
        right.udon_type(),
        dest.udon_type()
    )
}

fn unary_op_signature(op: &str, operand: &TypeSymbol, dest: &TypeSymbol) -> String {
    let member = match op {
        "-" => "op_UnaryNegation",
        "!" => "op_LogicalNot",
        "+" => "op_UnaryPlus",
        other => other,
    };
    format!("{}.__{}__{}__{}", dest.udon_type(), member, operand.udon_type(), dest.udon_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::tac::instructions::Instruction;
    use crate::vrc_events::StaticEventRegistry;

    #[test]
    fn copy_lowers_to_push_push_copy() {
        let mut f = TacFunction::new(Some("test".to_string()));
        let dest = Operand::Variable {
            name: "x".to_string(),
            ty: TypeSymbol::Single,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        f.push(Instruction::Copy { dest, src: Operand::number_const(1.0) });

        let catalog = StaticCatalog::new();
        let resolver = ExternResolver::new(&catalog);
        let events = StaticEventRegistry::new();
        let mut data = DataSection::new();
        let mut exported = Vec::new();
        let plan = AllocationPlan::default();
        let out = lower_function("Foo", "bar", &f, &plan, &resolver, &events, &mut data, &mut exported).unwrap();
        assert!(matches!(out[0], UdonInstruction::Label(_)));
        assert!(matches!(out[1], UdonInstruction::Label(_)));
        assert!(matches!(out[2], UdonInstruction::Push(_)));
        assert!(matches!(out[3], UdonInstruction::Push(_)));
        assert!(matches!(out[4], UdonInstruction::Copy));
    }

    #[test]
    fn every_method_emits_its_own_entry_label_and_fn_label() {
        let f = TacFunction::new(Some("test".to_string()));
        let catalog = StaticCatalog::new();
        let resolver = ExternResolver::new(&catalog);
        let events = StaticEventRegistry::new();
        let mut data = DataSection::new();
        let mut exported = Vec::new();
        let plan = AllocationPlan::default();
        let out = lower_function("Foo", "Bar", &f, &plan, &resolver, &events, &mut data, &mut exported).unwrap();
        assert!(matches!(&out[0], UdonInstruction::Label(n) if n == "Bar"));
        assert!(matches!(&out[1], UdonInstruction::Label(n) if n == "__fn_Bar"));
    }

    #[test]
    fn start_and_vrc_event_labels_are_exported() {
        let f = TacFunction::new(Some("test".to_string()));
        let catalog = StaticCatalog::new();
        let resolver = ExternResolver::new(&catalog);
        let events = StaticEventRegistry::with_builtins();
        let mut data = DataSection::new();
        let mut exported = Vec::new();
        let plan = AllocationPlan::default();
        lower_function("Foo", "_start", &f, &plan, &resolver, &events, &mut data, &mut exported).unwrap();
        assert!(exported.iter().any(|l| l == "_start"));
    }
}
