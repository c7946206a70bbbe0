//! Statement lowering (spec §4.D).

use crate::ast::{SourceSpan, Stmt, SwitchCase};
use crate::lower::context::{LoopEntry, TryEntry};
use crate::lower::env::LowerEnv;
use crate::lower::expr::lower_expr;
use crate::lower::symtab::Binding;
use crate::lower::LowerCtx;
use crate::result::{CodegenError, CodegenResult};
use crate::tac::entities::{ConstValue, Operand};
use crate::tac::instructions::{CallTarget, Instruction};
use crate::types::{map_surface_type, TypeSymbol};

pub fn lower_stmt(env: &LowerEnv, ctx: &mut LowerCtx, stmt: &Stmt) -> CodegenResult<()> {
    match stmt {
        Stmt::Block(stmts, _) => lower_block(env, ctx, stmts),
        Stmt::VariableDecl { name, type_name, initializer, span } => {
            lower_variable_decl(env, ctx, name, type_name, initializer.as_deref(), *span)
        }
        Stmt::Expression(expr, _) => {
            lower_expr(env, ctx, expr)?;
            Ok(())
        }
        Stmt::If { test, consequent, alternate, .. } => {
            lower_if(env, ctx, test, consequent, alternate.as_deref())
        }
        Stmt::While { test, body, .. } => lower_while(env, ctx, test, body),
        Stmt::DoWhile { body, test, .. } => lower_do_while(env, ctx, body, test),
        Stmt::For { init, test, update, body, .. } => {
            lower_for(env, ctx, init.as_deref(), test.as_deref(), update.as_deref(), body)
        }
        Stmt::ForOf { var_name, iterable, body, span } => {
            lower_for_of(env, ctx, var_name, iterable, body, *span)
        }
        Stmt::Switch { discriminant, cases, .. } => lower_switch(env, ctx, discriminant, cases),
        Stmt::Break(span) => lower_break(ctx, *span),
        Stmt::Continue(span) => lower_continue(ctx, *span),
        Stmt::Return(value, _) => lower_return(env, ctx, value.as_deref()),
        Stmt::TryCatch { try_block, catch_var, catch_block, finally_block, .. } => {
            lower_try_catch(env, ctx, try_block, catch_var.as_deref(), catch_block, finally_block.as_deref())
        }
        Stmt::Throw(expr, span) => lower_throw(env, ctx, expr, *span),
    }
}

fn lower_block(env: &LowerEnv, ctx: &mut LowerCtx, stmts: &[std::rc::Rc<Stmt>]) -> CodegenResult<()> {
    ctx.symtab.enter_scope();
    // scan-then-visit: every `let` directly in this block is declared
    // before any statement is lowered, so forward references resolve
    // (spec §4.D).
    let declared: Vec<Binding> = stmts
        .iter()
        .filter_map(|s| match s.as_ref() {
            Stmt::VariableDecl { name, type_name, .. } => Some(Binding {
                name: name.clone(),
                ty: map_surface_type(type_name),
                is_parameter: false,
                is_exported: false,
            }),
            _ => None,
        })
        .collect();
    ctx.symtab.prescan(declared);
    for s in stmts {
        lower_stmt(env, ctx, s)?;
    }
    ctx.symtab.exit_scope();
    Ok(())
}

fn lower_variable_decl(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    name: &str,
    type_name: &str,
    initializer: Option<&crate::ast::Expr>,
    span: SourceSpan,
) -> CodegenResult<()> {
    if let Some(crate::ast::Expr::New { class_name, args, .. }) = initializer {
        if let Some(class) = env.find_inlinable_class(class_name) {
            let prefix = crate::lower::expr::inline_new_instance(env, ctx, class, args, span)?;
            ctx.inline_instances.insert(name.to_string(), prefix);
            return Ok(());
        }
    }
    let ty = map_surface_type(type_name);
    let var = Operand::Variable {
        name: name.to_string(),
        ty: ty.clone(),
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    if let Some(init) = initializer {
        let value = lower_expr(env, ctx, init)?;
        ctx.func.push(Instruction::Copy { dest: var, src: value });
    } else {
        ctx.func.push(Instruction::Copy { dest: var, src: default_value(&ty) });
    }
    Ok(())
}

pub(crate) fn default_value(ty: &TypeSymbol) -> Operand {
    match ty {
        TypeSymbol::Boolean => Operand::bool_const(false),
        TypeSymbol::String => Operand::Constant { value: ConstValue::Str(String::new()), ty: ty.clone() },
        TypeSymbol::Single
        | TypeSymbol::Double
        | TypeSymbol::Byte
        | TypeSymbol::SByte
        | TypeSymbol::Int16
        | TypeSymbol::UInt16
        | TypeSymbol::Int32
        | TypeSymbol::UInt32 => Operand::Constant { value: ConstValue::Number(0.0), ty: ty.clone() },
        TypeSymbol::Int64 | TypeSymbol::UInt64 => Operand::Constant { value: ConstValue::BigInt(0), ty: ty.clone() },
        _ => Operand::null(),
    }
}

fn lower_if(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    test: &crate::ast::Expr,
    consequent: &Stmt,
    alternate: Option<&Stmt>,
) -> CodegenResult<()> {
    let cond = lower_expr(env, ctx, test)?;
    let else_label = ctx.new_label();
    ctx.func.push(Instruction::ConditionalJump { cond, target: else_label });
    lower_stmt(env, ctx, consequent)?;
    if let Some(alt) = alternate {
        let end_label = ctx.new_label();
        ctx.func.push(Instruction::UnconditionalJump { target: end_label });
        ctx.func.push(Instruction::Label(else_label));
        lower_stmt(env, ctx, alt)?;
        ctx.func.push(Instruction::Label(end_label));
    } else {
        ctx.func.push(Instruction::Label(else_label));
    }
    Ok(())
}

fn lower_while(env: &LowerEnv, ctx: &mut LowerCtx, test: &crate::ast::Expr, body: &Stmt) -> CodegenResult<()> {
    let top_label = ctx.new_label();
    let end_label = ctx.new_label();
    ctx.func.push(Instruction::Label(top_label));
    let cond = lower_expr(env, ctx, test)?;
    ctx.func.push(Instruction::ConditionalJump { cond, target: end_label });
    ctx.push_loop(LoopEntry { break_label: end_label, continue_label: top_label });
    lower_stmt(env, ctx, body)?;
    ctx.pop_loop();
    ctx.func.push(Instruction::UnconditionalJump { target: top_label });
    ctx.func.push(Instruction::Label(end_label));
    Ok(())
}

fn lower_do_while(env: &LowerEnv, ctx: &mut LowerCtx, body: &Stmt, test: &crate::ast::Expr) -> CodegenResult<()> {
    let top_label = ctx.new_label();
    let continue_label = ctx.new_label();
    let end_label = ctx.new_label();
    ctx.func.push(Instruction::Label(top_label));
    ctx.push_loop(LoopEntry { break_label: end_label, continue_label });
    lower_stmt(env, ctx, body)?;
    ctx.pop_loop();
    ctx.func.push(Instruction::Label(continue_label));
    let cond = lower_expr(env, ctx, test)?;
    ctx.func.push(Instruction::ConditionalJump { cond, target: end_label });
    ctx.func.push(Instruction::UnconditionalJump { target: top_label });
    ctx.func.push(Instruction::Label(end_label));
    Ok(())
}

fn lower_for(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    init: Option<&Stmt>,
    test: Option<&crate::ast::Expr>,
    update: Option<&crate::ast::Expr>,
    body: &Stmt,
) -> CodegenResult<()> {
    ctx.symtab.enter_scope();
    if let Some(init) = init {
        lower_stmt(env, ctx, init)?;
    }
    let top_label = ctx.new_label();
    let continue_label = ctx.new_label();
    let end_label = ctx.new_label();
    ctx.func.push(Instruction::Label(top_label));
    if let Some(test) = test {
        let cond = lower_expr(env, ctx, test)?;
        ctx.func.push(Instruction::ConditionalJump { cond, target: end_label });
    }
    ctx.push_loop(LoopEntry { break_label: end_label, continue_label });
    lower_stmt(env, ctx, body)?;
    ctx.pop_loop();
    ctx.func.push(Instruction::Label(continue_label));
    if let Some(update) = update {
        lower_expr(env, ctx, update)?;
    }
    ctx.func.push(Instruction::UnconditionalJump { target: top_label });
    ctx.func.push(Instruction::Label(end_label));
    ctx.symtab.exit_scope();
    Ok(())
}

/// `for (const x of iterable)` over a `DataList` element range or a
/// `DataDictionary`'s keys (spec §4.D).
fn lower_for_of(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    var_name: &str,
    iterable: &crate::ast::Expr,
    body: &Stmt,
    span: SourceSpan,
) -> CodegenResult<()> {
    let collection = lower_expr(env, ctx, iterable)?;
    let list = match collection.ty() {
        TypeSymbol::DataListOf(_) => collection,
        TypeSymbol::Collection { .. } => {
            let keys_sig = env.resolver.require_extern(
                "VRCDataDictionary",
                "GetKeys",
                crate::catalog::AccessKind::Method,
                &[],
                "VRCDataList",
                span,
            )?;
            let dest = crate::lower::expr::new_temp(ctx, TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)));
            ctx.func.push(Instruction::MethodCall {
                dest: Some(dest.clone()),
                receiver: collection,
                target: CallTarget::Extern(keys_sig),
                args: vec![],
            });
            dest
        }
        other => {
            return Err(CodegenError::UnsupportedFeature {
                what: format!("for-of over a {} value", other),
                span,
            })
        }
    };
    let count_sig = env.resolver.require_extern(
        "VRCDataList",
        "Count",
        crate::catalog::AccessKind::Getter,
        &[],
        "SystemInt32",
        span,
    )?;
    let count = crate::lower::expr::new_temp(ctx, TypeSymbol::Int32);
    ctx.func.push(Instruction::PropertyGet {
        dest: count.clone(),
        receiver: list.clone(),
        property: "Count".to_string(),
        getter: count_sig,
    });
    let i = Operand::Variable {
        name: format!("__forof_i_{}", ctx.func.new_temp()),
        ty: TypeSymbol::Int32,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    ctx.func.push(Instruction::Copy {
        dest: i.clone(),
        src: Operand::Constant { value: ConstValue::Number(0.0), ty: TypeSymbol::Int32 },
    });
    let top_label = ctx.new_label();
    let continue_label = ctx.new_label();
    let end_label = ctx.new_label();
    ctx.func.push(Instruction::Label(top_label));
    let in_range = crate::lower::expr::new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::BinaryOp {
        dest: in_range.clone(),
        op: "<".to_string(),
        left: i.clone(),
        right: count,
    });
    ctx.func.push(Instruction::ConditionalJump { cond: in_range, target: end_label });
    let get_sig = env.resolver.require_extern(
        "VRCDataList",
        "Get",
        crate::catalog::AccessKind::Method,
        &["SystemInt32"],
        "SystemObject",
        span,
    )?;
    let elem_var = Operand::Variable {
        name: var_name.to_string(),
        ty: TypeSymbol::Object,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    ctx.func.push(Instruction::ArrayAccess {
        dest: elem_var.clone(),
        array: list,
        index: i.clone(),
        getter: get_sig,
    });
    ctx.symtab.enter_scope();
    ctx.symtab.declare(Binding {
        name: var_name.to_string(),
        ty: TypeSymbol::Object,
        is_parameter: false,
        is_exported: false,
    });
    ctx.push_loop(LoopEntry { break_label: end_label, continue_label });
    lower_stmt(env, ctx, body)?;
    ctx.pop_loop();
    ctx.symtab.exit_scope();
    ctx.func.push(Instruction::Label(continue_label));
    let next_i = crate::lower::expr::new_temp(ctx, TypeSymbol::Int32);
    ctx.func.push(Instruction::BinaryOp {
        dest: next_i.clone(),
        op: "+".to_string(),
        left: i.clone(),
        right: Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 },
    });
    ctx.func.push(Instruction::Copy { dest: i, src: next_i });
    ctx.func.push(Instruction::UnconditionalJump { target: top_label });
    ctx.func.push(Instruction::Label(end_label));
    Ok(())
}

/// `switch`: a chain of equality tests against the discriminant, one
/// per `case`, falling through to `default` if present (spec §4.D).
/// JS `case` fallthrough between arms is preserved by not inserting
/// an implicit `break` — `Break` statements are what exit the switch.
fn lower_switch(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    discriminant: &crate::ast::Expr,
    cases: &[SwitchCase],
) -> CodegenResult<()> {
    let disc = lower_expr(env, ctx, discriminant)?;
    let end_label = ctx.new_label();
    let mut case_labels = Vec::with_capacity(cases.len());
    for _ in cases {
        case_labels.push(ctx.new_label());
    }
    let default_index = cases.iter().position(|c| c.test.is_none());

    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            let test_val = lower_expr(env, ctx, test)?;
            let test_val = coerce_case_test(ctx, test_val, &disc.ty());
            let matches = crate::lower::expr::new_temp(ctx, TypeSymbol::Boolean);
            ctx.func.push(Instruction::BinaryOp {
                dest: matches.clone(),
                op: "==".to_string(),
                left: disc.clone(),
                right: test_val,
            });
            let not_matches = crate::lower::expr::new_temp(ctx, TypeSymbol::Boolean);
            ctx.func.push(Instruction::UnaryOp { dest: not_matches.clone(), op: "!".to_string(), operand: matches });
            let next_test_label = ctx.new_label();
            ctx.func.push(Instruction::ConditionalJump { cond: not_matches, target: next_test_label });
            ctx.func.push(Instruction::UnconditionalJump { target: case_labels[i] });
            ctx.func.push(Instruction::Label(next_test_label));
        }
    }
    if let Some(di) = default_index {
        ctx.func.push(Instruction::UnconditionalJump { target: case_labels[di] });
    } else {
        ctx.func.push(Instruction::UnconditionalJump { target: end_label });
    }

    ctx.push_switch_break(end_label);
    for (i, case) in cases.iter().enumerate() {
        ctx.func.push(Instruction::Label(case_labels[i]));
        for stmt in &case.body {
            lower_stmt(env, ctx, stmt)?;
        }
    }
    ctx.pop_switch_break();
    ctx.func.push(Instruction::Label(end_label));
    Ok(())
}

/// Coerce a `case` test value to the discriminant's type when they
/// differ (spec §4.D "switch" type-coercion rule): a constant test
/// value is coerced at lowering time the same way [`crate::opt::fold`]
/// would fold it; a non-constant test expression gets an explicit
/// `Cast` instruction instead, since its value isn't known here.
fn coerce_case_test(ctx: &mut LowerCtx, test_val: Operand, disc_ty: &TypeSymbol) -> Operand {
    if &test_val.ty() == disc_ty {
        return test_val;
    }
    if let Operand::Constant { .. } = &test_val {
        if let Some(n) = crate::opt::fold::as_number(&test_val) {
            return crate::opt::fold::coerce_numeric(n, disc_ty);
        }
        return test_val;
    }
    let casted = crate::lower::expr::new_temp(ctx, disc_ty.clone());
    ctx.func.push(Instruction::Cast { dest: casted.clone(), src: test_val, to: disc_ty.clone() });
    casted
}

fn lower_break(ctx: &mut LowerCtx, span: SourceSpan) -> CodegenResult<()> {
    let target = ctx
        .break_stack
        .last()
        .copied()
        .ok_or(CodegenError::ControlFlowOutsideLoop { keyword: "break".to_string(), span })?;
    ctx.func.push(Instruction::UnconditionalJump { target });
    Ok(())
}

fn lower_continue(ctx: &mut LowerCtx, span: SourceSpan) -> CodegenResult<()> {
    let target = ctx
        .loop_stack
        .last()
        .map(|e| e.continue_label)
        .ok_or(CodegenError::ControlFlowOutsideLoop { keyword: "continue".to_string(), span })?;
    ctx.func.push(Instruction::UnconditionalJump { target });
    Ok(())
}

fn lower_return(env: &LowerEnv, ctx: &mut LowerCtx, value: Option<&crate::ast::Expr>) -> CodegenResult<()> {
    if let Some(entry) = ctx.inline_return_stack.last().cloned() {
        if let Some(value) = value {
            let v = lower_expr(env, ctx, value)?;
            if let Some(dest) = entry.dest_slot {
                ctx.func.push(Instruction::Copy { dest, src: v });
            }
        }
        ctx.func.push(Instruction::UnconditionalJump { target: entry.continuation_label });
        return Ok(());
    }
    let value = match value {
        Some(v) => Some(lower_expr(env, ctx, v)?),
        None => None,
    };
    if let Some(v) = &value {
        ctx.func.push(Instruction::Copy { dest: ctx.return_destination.clone(), src: v.clone() });
    }
    ctx.func.push(Instruction::Return { value });
    Ok(())
}

/// `try`/`catch`/`finally` modeled as an explicit error-flag state
/// machine (spec §4 "State machines"): `throw` sets the nearest
/// enclosing try's error flag/value and jumps straight to its catch
/// label, rather than unwinding a real call stack — this target VM
/// has no native exception mechanism.
fn lower_try_catch(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    try_block: &Stmt,
    catch_var: Option<&str>,
    catch_block: &Stmt,
    finally_block: Option<&Stmt>,
) -> CodegenResult<()> {
    let catch_label = ctx.new_label();
    let after_label = ctx.new_label();
    let suffix = ctx.func.new_temp();
    let error_flag_var = Operand::Variable {
        name: format!("__try_err_flag_{}", suffix),
        ty: TypeSymbol::Boolean,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    let error_value_var = Operand::Variable {
        name: format!("__try_err_value_{}", suffix),
        ty: TypeSymbol::Object,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    ctx.func.push(Instruction::Copy { dest: error_flag_var.clone(), src: Operand::bool_const(false) });

    ctx.try_stack.push(TryEntry {
        error_flag_var: error_flag_var.clone(),
        error_value_var: error_value_var.clone(),
        error_target_label: catch_label,
    });
    lower_stmt(env, ctx, try_block)?;
    ctx.try_stack.pop();
    ctx.func.push(Instruction::UnconditionalJump { target: after_label });

    ctx.func.push(Instruction::Label(catch_label));
    ctx.symtab.enter_scope();
    if let Some(name) = catch_var {
        ctx.symtab.declare(Binding {
            name: name.to_string(),
            ty: TypeSymbol::Object,
            is_parameter: false,
            is_exported: false,
        });
        ctx.func.push(Instruction::Copy {
            dest: Operand::Variable {
                name: name.to_string(),
                ty: TypeSymbol::Object,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            },
            src: error_value_var,
        });
    }
    lower_stmt(env, ctx, catch_block)?;
    ctx.symtab.exit_scope();

    ctx.func.push(Instruction::Label(after_label));
    if let Some(finally) = finally_block {
        lower_stmt(env, ctx, finally)?;
    }
    Ok(())
}

fn lower_throw(env: &LowerEnv, ctx: &mut LowerCtx, expr: &crate::ast::Expr, span: SourceSpan) -> CodegenResult<()> {
    let value = lower_expr(env, ctx, expr)?;
    let entry = ctx
        .try_stack
        .last()
        .cloned()
        .ok_or_else(|| CodegenError::UnsupportedFeature {
            what: "`throw` outside of a `try` block".to_string(),
            span,
        })?;
    ctx.func.push(Instruction::Copy { dest: entry.error_value_var, src: value });
    ctx.func.push(Instruction::Copy { dest: entry.error_flag_var, src: Operand::bool_const(true) });
    ctx.func.push(Instruction::UnconditionalJump { target: entry.error_target_label });
    Ok(())
}
