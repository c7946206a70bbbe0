//! Component D: AST → TAC lowering (spec §4.D).
//!
//! Mirrors how `cranelift_frontend::FunctionBuilder` sits on top of
//! `cranelift_codegen::ir::Function`: the submodules here own the
//! mutable lowering state ([`context`], [`env`], [`symtab`]) and the
//! two traversal halves ([`stmt`], [`expr`]); this module only wires
//! them together into the per-class, per-method entry points.

pub mod context;
pub mod env;
pub mod expr;
pub mod stmt;
pub mod symtab;

pub use context::{InlineReturnEntry, LoopEntry, LowerCtx, RecursionContext, TryEntry};
pub use env::LowerEnv;
pub use symtab::{Binding, SymbolTable};

use std::collections::HashMap;

use crate::ast::{ClassDecl, MethodDecl, Program, Stmt};
use crate::catalog::AccessKind;
use crate::result::CodegenResult;
use crate::tac::entities::{ConstValue, Operand};
use crate::tac::function::TacFunction;
use crate::tac::instructions::{CallTarget, Instruction};
use crate::types::{map_surface_type, TypeSymbol};

use self::expr::new_temp;

/// One lowered method body plus the metadata the later stages need to
/// address it (spec §3.5 "Data Section", §4.F).
#[derive(Clone, Debug)]
pub struct LoweredMethod {
    pub class_name: String,
    pub method_name: String,
    pub is_static: bool,
    pub return_type: TypeSymbol,
    pub func: TacFunction,
}

/// A fully-lowered compilation unit: one [`TacFunction`] per
/// non-inlined method of every `UdonBehaviour` class (spec §4.D;
/// non-`UdonBehaviour` classes only ever contribute inlined field/
/// method bodies at their call sites and produce no top-level
/// function of their own).
#[derive(Clone, Debug, Default)]
pub struct LoweredProgram {
    pub methods: Vec<LoweredMethod>,
}

/// Lower an entire [`Program`] to TAC (spec §4.D entry point).
///
/// Only `UdonBehaviour` classes produce methods directly; sibling
/// classes are inlined at their `new` call sites
/// ([`LowerEnv::find_inlinable_class`]) and never lowered on their
/// own, since Udon has no notion of a plain value-type instance.
pub fn lower_program(
    program: &Program,
    catalog: &dyn crate::catalog::ExternCatalog,
    events: &dyn crate::vrc_events::VrcEventRegistry,
    options: crate::config::CompileOptions,
) -> CodegenResult<LoweredProgram> {
    let env = LowerEnv::new(catalog, events, options, program);
    let mut label_counter = 0u32;
    let mut out = LoweredProgram::default();

    for class in &program.classes {
        if !class.is_udon_behaviour {
            continue;
        }
        let callbacks = field_change_callbacks(class);
        for method in &class.methods {
            let func = lower_method(&env, &mut label_counter, class, method, &callbacks)?;
            out.methods.push(LoweredMethod {
                class_name: class.name.clone(),
                method_name: method.name.clone(),
                is_static: method.is_static,
                return_type: map_surface_type(&method.return_type),
                func,
            });
        }
        if !callbacks.is_empty() && !class.methods.iter().any(|m| m.name == "OnDeserialization") {
            let func = synthesize_on_deserialization(&env, &mut label_counter, class, &callbacks)?;
            out.methods.push(LoweredMethod {
                class_name: class.name.clone(),
                method_name: "OnDeserialization".to_string(),
                is_static: false,
                return_type: TypeSymbol::Void,
                func,
            });
        }
    }
    Ok(out)
}

/// Build a synthetic `OnDeserialization` body when a class declares
/// field-change callbacks but never wrote the event handler itself
/// (spec §4.D "Field-change callbacks"): for each callback property,
/// compare its current value against a shadow `__prev_<prop>`, and on
/// inequality update the shadow and invoke the callback. VRChat calls
/// `OnDeserialization` after every network sync, which is the only
/// point a synced property can change without going through the
/// direct-assignment dispatch that fires a callback on `this.<prop> = v`.
fn synthesize_on_deserialization(
    env: &LowerEnv,
    label_counter: &mut u32,
    class: &ClassDecl,
    callbacks: &HashMap<String, String>,
) -> CodegenResult<TacFunction> {
    let default_return = local_operand("__returnValue_OnDeserialization", TypeSymbol::Void);
    let func_name = Some(format!("{}_OnDeserialization", class.name));
    let mut ctx = LowerCtx::new(func_name, label_counter, default_return);
    ctx.symtab.declare(Binding {
        name: "this".to_string(),
        ty: TypeSymbol::Extern("UdonBehaviour".to_string()),
        is_parameter: true,
        is_exported: false,
    });

    let receiver = expr::this_operand();
    for prop in &class.properties {
        let Some(callback) = callbacks.get(&prop.name) else { continue };
        let prop_ty = map_surface_type(&prop.type_name);

        let getter_sig = env.resolver.require_extern_typed(
            &receiver.ty(),
            &prop.name,
            AccessKind::Getter,
            &[],
            &prop_ty,
            prop.span,
        )?;
        let current = new_temp(&mut ctx, prop_ty.clone());
        ctx.func.push(Instruction::PropertyGet {
            dest: current.clone(),
            receiver: receiver.clone(),
            property: prop.name.clone(),
            getter: getter_sig,
        });

        let shadow = local_operand(&format!("__prev_{}", prop.name), prop_ty.clone());
        let changed = new_temp(&mut ctx, TypeSymbol::Boolean);
        ctx.func.push(Instruction::BinaryOp {
            dest: changed.clone(),
            op: "!=".to_string(),
            left: current.clone(),
            right: shadow.clone(),
        });
        let unchanged = ctx.new_label();
        ctx.func.push(Instruction::ConditionalJump { cond: changed, target: unchanged });
        ctx.func.push(Instruction::Copy { dest: shadow, src: current });
        ctx.func.push(Instruction::Call { dest: None, target: CallTarget::UserFunction(callback.clone()), args: vec![] });
        ctx.func.push(Instruction::Label(unchanged));
    }

    Ok(ctx.func)
}

/// Property name -> field-change callback method name (spec §4.D
/// "Field-change callbacks"), built once per class before its methods
/// are lowered.
fn field_change_callbacks(class: &ClassDecl) -> HashMap<String, String> {
    class
        .properties
        .iter()
        .filter_map(|p| p.field_change_callback.clone().map(|cb| (p.name.clone(), cb)))
        .collect()
}

fn lower_method(
    env: &LowerEnv,
    label_counter: &mut u32,
    class: &ClassDecl,
    method: &MethodDecl,
    callbacks: &HashMap<String, String>,
) -> CodegenResult<TacFunction> {
    let return_ty = map_surface_type(&method.return_type);
    let default_return = Operand::Variable {
        name: format!("__returnValue_{}", method.name),
        ty: return_ty,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };

    let func_name = Some(format!("{}_{}", class.name, method.name));
    let mut ctx = LowerCtx::new(func_name, label_counter, default_return);
    ctx.field_change_callbacks = callbacks.clone();

    if !method.is_static {
        ctx.symtab.declare(Binding {
            name: "this".to_string(),
            ty: crate::types::TypeSymbol::Extern("UdonBehaviour".to_string()),
            is_parameter: true,
            is_exported: false,
        });
    }
    for param in &method.params {
        ctx.symtab.declare(Binding {
            name: param.name.clone(),
            ty: map_surface_type(&param.type_name),
            is_parameter: true,
            is_exported: false,
        });
    }

    if method.is_recursive {
        push_recursion_prologue(env, &mut ctx, method)?;
    }

    stmt::lower_stmt(env, &mut ctx, &*method.body)?;

    if method.is_recursive {
        push_recursion_epilogue(env, &mut ctx, method)?;
    }

    Ok(ctx.func)
}

/// Every `let`-declared local plus every parameter of a recursive
/// method, in declaration order (spec §4.D "all locals"). Parameters
/// count too: a reentrant call would otherwise clobber the caller's
/// argument values just as surely as it would its `let` locals.
fn collect_recursion_locals(method: &MethodDecl) -> Vec<(String, TypeSymbol)> {
    let mut locals: Vec<(String, TypeSymbol)> = method
        .params
        .iter()
        .map(|p| (p.name.clone(), map_surface_type(&p.type_name)))
        .collect();
    collect_stmt_locals(&method.body, &mut locals);
    locals
}

fn collect_stmt_locals(stmt: &Stmt, out: &mut Vec<(String, TypeSymbol)>) {
    match stmt {
        Stmt::Block(stmts, _) => {
            for s in stmts {
                collect_stmt_locals(s, out);
            }
        }
        Stmt::VariableDecl { name, type_name, .. } => {
            out.push((name.clone(), map_surface_type(type_name)));
        }
        Stmt::If { consequent, alternate, .. } => {
            collect_stmt_locals(consequent, out);
            if let Some(alt) = alternate {
                collect_stmt_locals(alt, out);
            }
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::ForOf { body, .. } => {
            collect_stmt_locals(body, out);
        }
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                collect_stmt_locals(init, out);
            }
            collect_stmt_locals(body, out);
        }
        Stmt::Switch { cases, .. } => {
            for case in cases {
                for s in &case.body {
                    collect_stmt_locals(s, out);
                }
            }
        }
        Stmt::TryCatch { try_block, catch_block, finally_block, .. } => {
            collect_stmt_locals(try_block, out);
            collect_stmt_locals(catch_block, out);
            if let Some(f) = finally_block {
                collect_stmt_locals(f, out);
            }
        }
        Stmt::Expression(..) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Return(..) | Stmt::Throw(..) => {}
    }
}

fn local_operand(name: &str, ty: TypeSymbol) -> Operand {
    Operand::Variable { name: name.to_string(), ty, is_local: true, is_parameter: false, is_exported: false }
}

/// Like [`local_operand`], but looks up whether `name` is actually a
/// parameter binding in `ctx.symtab` first — the optimizer's register
/// allocator (spec §4.E pass 16) treats a parameter's storage
/// differently from an ordinary local's, so every `Operand` naming the
/// same surface variable has to agree on `is_parameter`, not just the
/// one [`lower::expr::lower_identifier`] builds while lowering the
/// method body itself.
fn local_ref(ctx: &LowerCtx, name: &str, ty: TypeSymbol) -> Operand {
    let is_parameter = ctx.symtab.resolve(name).map(|b| b.is_parameter).unwrap_or(false);
    Operand::Variable { name: name.to_string(), ty, is_local: true, is_parameter, is_exported: false }
}

/// Recursive methods get a depth counter and per-local shadow arrays
/// (spec §4.D "Recursion context"). The counter and every shadow array
/// are additional data-section entries the assembler allocates like
/// any other variable; each shadow array is a `VRCDataList` that the
/// prologue pushes the local's pre-call value onto (lazily
/// constructing the list on first entry) and the epilogue pops back
/// off, so a reentrant call can't clobber an outer call's locals.
fn push_recursion_prologue(env: &LowerEnv, ctx: &mut LowerCtx, method: &MethodDecl) -> CodegenResult<()> {
    let span = method.span;
    let depth_var = format!("__recur_depth_{}", method.name);
    let depth_operand = local_operand(&depth_var, TypeSymbol::Int32);
    let one = Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 };
    ctx.func.push(Instruction::BinaryOp {
        dest: depth_operand.clone(),
        op: "+".to_string(),
        left: depth_operand,
        right: one,
    });

    let mut shadow_arrays = HashMap::new();
    let list_ty = TypeSymbol::DataListOf(Box::new(TypeSymbol::Object));
    let ctor_sig = env.resolver.require_extern("VRCDataList", "ctor", AccessKind::Ctor, &[], "VRCDataList", span)?;
    let add_sig = env.resolver.require_extern(
        "VRCDataList",
        "Add",
        AccessKind::Method,
        &["VRCDataToken"],
        "SystemVoid",
        span,
    )?;

    for (name, ty) in collect_recursion_locals(method) {
        let shadow_name = format!("__shadow_{}_{}", method.name, name);
        let shadow_var = local_operand(&shadow_name, list_ty.clone());

        let is_null = new_temp(ctx, TypeSymbol::Boolean);
        ctx.func.push(Instruction::BinaryOp {
            dest: is_null.clone(),
            op: "==".to_string(),
            left: shadow_var.clone(),
            right: Operand::null(),
        });
        let already_built = ctx.new_label();
        ctx.func.push(Instruction::ConditionalJump { cond: is_null, target: already_built });
        ctx.func.push(Instruction::Call {
            dest: Some(shadow_var.clone()),
            target: CallTarget::Extern(ctor_sig.clone()),
            args: vec![],
        });
        ctx.func.push(Instruction::Label(already_built));

        let current = local_ref(ctx, &name, ty);
        let wrapped = expr::wrap_data_token(env, ctx, current, span)?;
        ctx.func.push(Instruction::MethodCall {
            dest: None,
            receiver: shadow_var.clone(),
            target: CallTarget::Extern(add_sig.clone()),
            args: vec![wrapped],
        });

        shadow_arrays.insert(name, shadow_name);
    }

    ctx.recursion = Some(RecursionContext { depth_counter_var: depth_var, shadow_arrays });
    Ok(())
}

fn push_recursion_epilogue(env: &LowerEnv, ctx: &mut LowerCtx, method: &MethodDecl) -> CodegenResult<()> {
    let span = method.span;
    let Some(recursion) = ctx.recursion.take() else {
        return Ok(());
    };

    let count_sig = env.resolver.require_extern(
        "VRCDataList",
        "Count",
        AccessKind::Getter,
        &[],
        "SystemInt32",
        span,
    )?;
    let get_sig = env.resolver.require_extern(
        "VRCDataList",
        "Get",
        AccessKind::Method,
        &["SystemInt32"],
        "SystemObject",
        span,
    )?;
    let remove_sig = env.resolver.require_extern(
        "VRCDataList",
        "RemoveAt",
        AccessKind::Method,
        &["SystemInt32"],
        "SystemVoid",
        span,
    )?;
    let one = Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 };

    for (name, ty) in collect_recursion_locals(method) {
        let shadow_name = recursion.shadow_arrays.get(&name).cloned().unwrap_or(shadow_name_fallback(method, &name));
        let list_ty = TypeSymbol::DataListOf(Box::new(TypeSymbol::Object));
        let shadow_var = local_operand(&shadow_name, list_ty);

        let count = new_temp(ctx, TypeSymbol::Int32);
        ctx.func.push(Instruction::PropertyGet {
            dest: count.clone(),
            receiver: shadow_var.clone(),
            property: "Count".to_string(),
            getter: count_sig.clone(),
        });
        let idx = new_temp(ctx, TypeSymbol::Int32);
        ctx.func.push(Instruction::BinaryOp { dest: idx.clone(), op: "-".to_string(), left: count, right: one.clone() });

        let raw = new_temp(ctx, TypeSymbol::Object);
        ctx.func.push(Instruction::ArrayAccess {
            dest: raw.clone(),
            array: shadow_var.clone(),
            index: idx.clone(),
            getter: get_sig.clone(),
        });
        let local = local_ref(ctx, &name, ty.clone());
        if ty == TypeSymbol::Object {
            ctx.func.push(Instruction::Copy { dest: local, src: raw });
        } else {
            ctx.func.push(Instruction::Cast { dest: local, src: raw, to: ty });
        }

        ctx.func.push(Instruction::MethodCall {
            dest: None,
            receiver: shadow_var,
            target: CallTarget::Extern(remove_sig.clone()),
            args: vec![idx],
        });
    }

    let depth_operand = local_operand(&recursion.depth_counter_var, TypeSymbol::Int32);
    ctx.func.push(Instruction::BinaryOp {
        dest: depth_operand.clone(),
        op: "-".to_string(),
        left: depth_operand,
        right: one,
    });
    Ok(())
}

/// `collect_recursion_locals` is deterministic from `method` alone, so
/// the epilogue recomputing the same shadow-array name the prologue
/// already stored in `recursion.shadow_arrays` is only ever a sanity
/// fallback, never the live path.
fn shadow_name_fallback(method: &MethodDecl, local_name: &str) -> String {
    format!("__shadow_{}_{}", method.name, local_name)
}
