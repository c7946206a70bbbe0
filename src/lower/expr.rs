//! Expression lowering (spec §4.D "Lowering rules").

use crate::ast::{Expr, Literal, Param, SourceSpan, Stmt};
use crate::catalog::AccessKind;
use crate::config::NumberIsFiniteStrategy;
use crate::lower::context::LowerCtx;
use crate::lower::env::LowerEnv;
use crate::lower::stmt::lower_stmt;
use crate::result::{CodegenError, CodegenResult};
use crate::tac::entities::{ConstValue, Operand};
use crate::tac::instructions::{CallTarget, Instruction};
use crate::types::TypeSymbol;

/// Lower `expr`, returning the operand holding its result.
pub fn lower_expr(env: &LowerEnv, ctx: &mut LowerCtx, expr: &Expr) -> CodegenResult<Operand> {
    match expr {
        Expr::Literal(lit, _span) => Ok(lower_literal(lit)),
        Expr::Identifier(name, span) => lower_identifier(env, ctx, name, *span),
        Expr::This(_) => Ok(ctx
            .current_this()
            .cloned()
            .unwrap_or_else(|| this_operand())),
        Expr::Super(_) => Ok(this_operand()),
        Expr::Binary { op, left, right, span } => lower_binary(env, ctx, op, left, right, *span),
        Expr::Unary { op, operand, span } => lower_unary(env, ctx, op, operand, *span),
        Expr::Update { op, operand, prefix, span } => {
            lower_update(env, ctx, op, operand, *prefix, *span)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
            span,
        } => lower_conditional(env, ctx, test, consequent, alternate, *span),
        Expr::NullCoalescing { left, right, span } => lower_null_coalescing(env, ctx, left, right, *span),
        Expr::OptionalChaining {
            target,
            member,
            call_args,
            span,
        } => lower_optional_chaining(env, ctx, target, member.as_deref(), call_args.as_deref(), *span),
        Expr::Template { parts, exprs, span } => lower_template(env, ctx, parts, exprs, *span),
        Expr::ArrayLiteral { elements, span } => lower_array_literal(env, ctx, elements, *span),
        Expr::ObjectLiteral { fields, span } => lower_object_literal(env, ctx, fields, *span),
        Expr::PropertyAccess { target, name, span } => {
            lower_property_access(env, ctx, target, name, *span)
        }
        Expr::ArrayAccess { target, index, span } => lower_array_access(env, ctx, target, index, *span),
        Expr::Call { callee, args, span } => lower_call(env, ctx, callee, args, *span),
        Expr::As { expr, type_name, span } => lower_as(env, ctx, expr, type_name, *span),
        Expr::Assignment { target, op, value, span } => {
            lower_assignment(env, ctx, target, op, value, *span)
        }
        Expr::Delete { target, span } => lower_delete(env, ctx, target, *span),
        Expr::Typeof { type_name, span } => lower_typeof(env, ctx, type_name, *span),
        Expr::Nameof { name, .. } => Ok(Operand::Constant {
            value: ConstValue::Str(name.clone()),
            ty: TypeSymbol::String,
        }),
        Expr::Function { span, .. } => Err(CodegenError::UnsupportedFeature {
            what: "inline function used outside of a recognised callback position".to_string(),
            span: *span,
        }),
        Expr::New { class_name, args, span } => lower_new(env, ctx, class_name, args, *span),
    }
}

pub(crate) fn this_operand() -> Operand {
    Operand::Variable {
        name: "this".to_string(),
        ty: TypeSymbol::Extern("UdonBehaviour".to_string()),
        is_local: false,
        is_parameter: false,
        is_exported: false,
    }
}

fn lower_literal(lit: &Literal) -> Operand {
    match lit {
        Literal::Null => Operand::null(),
        Literal::Bool(b) => Operand::bool_const(*b),
        Literal::Number(n) => Operand::number_const(*n),
        Literal::BigInt(n) => Operand::Constant {
            value: ConstValue::BigInt(*n),
            ty: TypeSymbol::Int64,
        },
        Literal::Str(s) => Operand::Constant {
            value: ConstValue::Str(s.clone()),
            ty: TypeSymbol::String,
        },
    }
}

fn lower_identifier(
    _env: &LowerEnv,
    ctx: &mut LowerCtx,
    name: &str,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    if let Some(prefix) = ctx.inline_instances.get(name) {
        // A bare reference to an inlined instance handle; field access
        // rewriting happens in `lower_property_access`, this path is
        // only reached when the handle itself is used as a value
        // (e.g. passed to a non-inlined sink), which this IR can't
        // express since the instance has no single runtime value.
        return Err(CodegenError::UnsupportedFeature {
            what: format!(
                "inlined instance `{}` (prefix `{}`) used as a bare value",
                name, prefix
            ),
            span,
        });
    }
    if let Some(binding) = ctx.symtab.resolve(name) {
        return Ok(Operand::Variable {
            name: binding.name.clone(),
            ty: binding.ty.clone(),
            is_local: true,
            is_parameter: binding.is_parameter,
            is_exported: binding.is_exported,
        });
    }
    Err(CodegenError::UndefinedSymbol {
        name: name.to_string(),
        context: ctx
            .func
            .name
            .clone()
            .unwrap_or_else(|| "<top level>".to_string()),
        span,
    })
}

fn lower_binary(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    op: &str,
    left: &Expr,
    right: &Expr,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    // `instanceof` constant-folds to a conservative default (spec
    // §4.D) rather than emitting any instruction at all.
    if op == "instanceof" {
        return Ok(Operand::bool_const(false));
    }
    let l = lower_expr(env, ctx, left)?;
    let r = lower_expr(env, ctx, right)?;
    let result_ty = dominant_numeric_type(&l.ty(), &r.ty());
    let dest_ty = match op {
        "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => TypeSymbol::Boolean,
        _ => result_ty,
    };
    let dest = new_temp(ctx, dest_ty);
    ctx.func.push(Instruction::BinaryOp {
        dest: dest.clone(),
        op: op.to_string(),
        left: l,
        right: r,
    });
    let _ = &env.resolver; // the TAC-level binary op is resolved to an extern later, in udon lowering
    Ok(dest)
}

fn lower_unary(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    op: &str,
    operand: &Expr,
    _span: SourceSpan,
) -> CodegenResult<Operand> {
    let v = lower_expr(env, ctx, operand)?;
    let dest_ty = if op == "!" { TypeSymbol::Boolean } else { v.ty() };
    let dest = new_temp(ctx, dest_ty);
    ctx.func.push(Instruction::UnaryOp {
        dest: dest.clone(),
        op: op.to_string(),
        operand: v,
    });
    Ok(dest)
}

fn lower_update(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    op: &str,
    operand: &Expr,
    prefix: bool,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let target = lower_expr(env, ctx, operand)?;
    let one = Operand::number_const(1.0);
    let arith_op = if op == "++" { "+" } else { "-" };
    let new_value = new_temp(ctx, target.ty());
    ctx.func.push(Instruction::BinaryOp {
        dest: new_value.clone(),
        op: arith_op.to_string(),
        left: target.clone(),
        right: one,
    });
    assign_to_target(env, ctx, operand, new_value.clone(), span)?;
    Ok(if prefix { new_value } else { target })
}

fn lower_conditional(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    test: &Expr,
    consequent: &Expr,
    alternate: &Expr,
    _span: SourceSpan,
) -> CodegenResult<Operand> {
    let cond = lower_expr(env, ctx, test)?;
    let else_label = ctx.new_label();
    let join_label = ctx.new_label();
    ctx.func.push(Instruction::ConditionalJump {
        cond,
        target: else_label,
    });
    let then_val = lower_expr(env, ctx, consequent)?;
    let result = new_temp(ctx, then_val.ty());
    ctx.func.push(Instruction::Copy {
        dest: result.clone(),
        src: then_val,
    });
    ctx.func.push(Instruction::UnconditionalJump { target: join_label });
    ctx.func.push(Instruction::Label(else_label));
    let else_val = lower_expr(env, ctx, alternate)?;
    ctx.func.push(Instruction::Copy {
        dest: result.clone(),
        src: else_val,
    });
    ctx.func.push(Instruction::Label(join_label));
    Ok(result)
}

fn lower_null_coalescing(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    left: &Expr,
    right: &Expr,
    _span: SourceSpan,
) -> CodegenResult<Operand> {
    let l = lower_expr(env, ctx, left)?;
    // Result type inherits from the left operand (spec §4.D).
    let result = new_temp(ctx, l.ty());
    ctx.func.push(Instruction::Copy {
        dest: result.clone(),
        src: l.clone(),
    });
    let is_null = new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::BinaryOp {
        dest: is_null.clone(),
        op: "==".to_string(),
        left: l,
        right: Operand::null(),
    });
    let join_label = ctx.new_label();
    // ifFalse is_null goto join -- i.e. only fall through to the
    // right-hand side when the left side actually was null.
    let skip_label = ctx.new_label();
    ctx.func.push(Instruction::ConditionalJump {
        cond: is_null,
        target: skip_label,
    });
    let r = lower_expr(env, ctx, right)?;
    ctx.func.push(Instruction::Copy { dest: result.clone(), src: r });
    ctx.func.push(Instruction::UnconditionalJump { target: join_label });
    ctx.func.push(Instruction::Label(skip_label));
    ctx.func.push(Instruction::Label(join_label));
    Ok(result)
}

fn lower_optional_chaining(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    member: Option<&str>,
    call_args: Option<&[std::rc::Rc<Expr>]>,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let base = lower_expr(env, ctx, target)?;
    let is_null = new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::BinaryOp {
        dest: is_null.clone(),
        op: "==".to_string(),
        left: base.clone(),
        right: Operand::null(),
    });
    let not_null = new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::UnaryOp {
        dest: not_null.clone(),
        op: "!".to_string(),
        operand: is_null,
    });
    let null_branch = ctx.new_label();
    let join_label = ctx.new_label();
    // ifFalse not_null goto null_branch -- i.e. jump to the null
    // branch exactly when the base was null.
    ctx.func.push(Instruction::ConditionalJump {
        cond: not_null,
        target: null_branch,
    });
    let computed = if let Some(m) = member {
        if call_args.is_some() {
            // `a?.b()`: lower as a method call on the already-lowered base.
            let args = call_args.unwrap();
            let mut lowered_args = Vec::with_capacity(args.len());
            for a in args {
                lowered_args.push(lower_expr(env, ctx, a)?);
            }
            let sig = env.resolver.require_extern_typed(
                &base.ty(),
                m,
                AccessKind::Method,
                &lowered_args.iter().map(Operand::ty).collect::<Vec<_>>(),
                &TypeSymbol::Object,
                span,
            )?;
            let dest = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::MethodCall {
                dest: Some(dest.clone()),
                receiver: base.clone(),
                target: CallTarget::Extern(sig),
                args: lowered_args,
            });
            dest
        } else {
            let getter = env.resolver.require_extern_typed(
                &base.ty(),
                m,
                AccessKind::Getter,
                &[],
                &TypeSymbol::Object,
                span,
            )?;
            let dest = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::PropertyGet {
                dest: dest.clone(),
                receiver: base.clone(),
                property: m.to_string(),
                getter,
            });
            dest
        }
    } else {
        base.clone()
    };
    let result = new_temp(ctx, TypeSymbol::Object);
    ctx.func.push(Instruction::Copy {
        dest: result.clone(),
        src: computed,
    });
    ctx.func.push(Instruction::UnconditionalJump { target: join_label });
    ctx.func.push(Instruction::Label(null_branch));
    // Null assignment uses the `Object`-typed null constant (spec §4.D).
    ctx.func.push(Instruction::Copy {
        dest: result.clone(),
        src: Operand::null(),
    });
    ctx.func.push(Instruction::Label(join_label));
    Ok(result)
}

fn lower_template(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    parts: &[String],
    exprs: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    // If every interpolated expression is a literal, the whole thing
    // constant-folds to a single string (spec §4.D, scenario S6).
    let mut literal_pieces: Option<Vec<String>> = Some(Vec::new());
    for e in exprs {
        match e.as_ref() {
            Expr::Literal(Literal::Str(s), _) => {
                if let Some(v) = literal_pieces.as_mut() {
                    v.push(s.clone());
                }
            }
            Expr::Literal(Literal::Number(n), _) => {
                if let Some(v) = literal_pieces.as_mut() {
                    v.push(format_number_literal(*n));
                }
            }
            Expr::Literal(Literal::Bool(b), _) => {
                if let Some(v) = literal_pieces.as_mut() {
                    v.push(b.to_string());
                }
            }
            _ => literal_pieces = None,
        }
    }
    if let Some(pieces) = literal_pieces {
        let mut joined = String::new();
        for (i, part) in parts.iter().enumerate() {
            joined.push_str(part);
            if let Some(p) = pieces.get(i) {
                joined.push_str(p);
            }
        }
        return Ok(Operand::Constant {
            value: ConstValue::Str(joined),
            ty: TypeSymbol::String,
        });
    }

    // Otherwise: a chain of String.Concat(left, right) externs,
    // non-string operands first `.ToString()`-ified.
    let mut acc: Option<Operand> = None;
    let mut push_piece = |ctx: &mut LowerCtx, env: &LowerEnv, piece: Operand, acc: &mut Option<Operand>| -> CodegenResult<()> {
        let piece = stringify(env, ctx, piece, span)?;
        *acc = Some(match acc.take() {
            None => piece,
            Some(prev) => {
                let dest = new_temp(ctx, TypeSymbol::String);
                let sig = env.resolver.require_extern(
                    "SystemString",
                    "Concat",
                    AccessKind::Method,
                    &["SystemString", "SystemString"],
                    "SystemString",
                    span,
                )?;
                ctx.func.push(Instruction::Call {
                    dest: Some(dest.clone()),
                    target: CallTarget::Extern(sig),
                    args: vec![prev, piece],
                });
                dest
            }
        });
        Ok(())
    };
    for (i, part) in parts.iter().enumerate() {
        if !part.is_empty() {
            push_piece(
                ctx,
                env,
                Operand::Constant {
                    value: ConstValue::Str(part.clone()),
                    ty: TypeSymbol::String,
                },
                &mut acc,
            )?;
        }
        if let Some(e) = exprs.get(i) {
            let v = lower_expr(env, ctx, e)?;
            push_piece(ctx, env, v, &mut acc)?;
        }
    }
    Ok(acc.unwrap_or_else(|| Operand::Constant {
        value: ConstValue::Str(String::new()),
        ty: TypeSymbol::String,
    }))
}

fn stringify(env: &LowerEnv, ctx: &mut LowerCtx, v: Operand, span: SourceSpan) -> CodegenResult<Operand> {
    if v.ty() == TypeSymbol::String {
        return Ok(v);
    }
    let sig = env.resolver.require_extern_typed(
        &v.ty(),
        "ToString",
        AccessKind::Method,
        &[],
        &TypeSymbol::String,
        span,
    )?;
    let dest = new_temp(ctx, TypeSymbol::String);
    ctx.func.push(Instruction::MethodCall {
        dest: Some(dest.clone()),
        receiver: v,
        target: CallTarget::Extern(sig),
        args: vec![],
    });
    Ok(dest)
}

fn format_number_literal(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn lower_array_literal(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    elements: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let dest = new_temp(ctx, TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)));
    let ctor_sig = env.resolver.require_extern(
        "VRCDataList",
        "ctor",
        AccessKind::Ctor,
        &[],
        "VRCDataList",
        span,
    )?;
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(ctor_sig),
        args: vec![],
    });
    let add_sig = env.resolver.require_extern(
        "VRCDataList",
        "Add",
        AccessKind::Method,
        &["VRCDataToken"],
        "SystemVoid",
        span,
    )?;
    for el in elements {
        let v = lower_expr(env, ctx, el)?;
        let token = wrap_data_token(env, ctx, v, span)?;
        ctx.func.push(Instruction::MethodCall {
            dest: None,
            receiver: dest.clone(),
            target: CallTarget::Extern(add_sig.clone()),
            args: vec![token],
        });
    }
    Ok(dest)
}

pub(crate) fn wrap_data_token(env: &LowerEnv, ctx: &mut LowerCtx, v: Operand, span: SourceSpan) -> CodegenResult<Operand> {
    let sig = env.resolver.require_extern_typed(
        &TypeSymbol::Extern("DataToken".to_string()),
        "ctor",
        AccessKind::Ctor,
        &[v.ty()],
        &TypeSymbol::Extern("DataToken".to_string()),
        span,
    )?;
    let dest = new_temp(ctx, TypeSymbol::Extern("DataToken".to_string()));
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(sig),
        args: vec![v],
    });
    Ok(dest)
}

fn lower_object_literal(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    fields: &[(String, std::rc::Rc<Expr>)],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let dest = new_temp(
        ctx,
        TypeSymbol::Collection {
            key: Box::new(TypeSymbol::String),
            value: Box::new(TypeSymbol::Object),
        },
    );
    let ctor_sig = env.resolver.require_extern(
        "VRCDataDictionary",
        "ctor",
        AccessKind::Ctor,
        &[],
        "VRCDataDictionary",
        span,
    )?;
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(ctor_sig),
        args: vec![],
    });
    let set_sig = env.resolver.require_extern(
        "VRCDataDictionary",
        "SetValue",
        AccessKind::Method,
        &["VRCDataToken", "VRCDataToken"],
        "SystemVoid",
        span,
    )?;
    for (name, value_expr) in fields {
        let key = wrap_data_token(
            env,
            ctx,
            Operand::Constant {
                value: ConstValue::Str(name.clone()),
                ty: TypeSymbol::String,
            },
            span,
        )?;
        let v = lower_expr(env, ctx, value_expr)?;
        let value = wrap_data_token(env, ctx, v, span)?;
        ctx.func.push(Instruction::MethodCall {
            dest: None,
            receiver: dest.clone(),
            target: CallTarget::Extern(set_sig.clone()),
            args: vec![key, value],
        });
    }
    Ok(dest)
}

fn lower_property_access(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    name: &str,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    // Rewrite field access on an inlined instance handle to its
    // synthetic `__inst_Foo_N_<field>` variable (spec §4.D "Inline
    // instance map").
    if let Expr::Identifier(ident, _) = target {
        if let Some(prefix) = ctx.inline_instances.get(ident).cloned() {
            let var_name = format!("{}_{}", prefix, name);
            return Ok(Operand::Variable {
                name: var_name,
                ty: TypeSymbol::Object,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            });
        }
    }
    let receiver = lower_expr(env, ctx, target)?;
    let getter = env.resolver.require_extern_typed(
        &receiver.ty(),
        name,
        AccessKind::Getter,
        &[],
        &TypeSymbol::Object,
        span,
    )?;
    let dest = new_temp(ctx, crate::externs::resolve_extern_return_type(&getter));
    ctx.func.push(Instruction::PropertyGet {
        dest: dest.clone(),
        receiver,
        property: name.to_string(),
        getter,
    });
    Ok(dest)
}

fn lower_array_access(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    index: &Expr,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let array = lower_expr(env, ctx, target)?;
    let idx = lower_expr(env, ctx, index)?;
    let getter = env.resolver.require_extern_typed(
        &array.ty(),
        "Get",
        AccessKind::Method,
        &[idx.ty()],
        &TypeSymbol::Object,
        span,
    )?;
    let dest = new_temp(ctx, crate::externs::resolve_extern_return_type(&getter));
    ctx.func.push(Instruction::ArrayAccess {
        dest: dest.clone(),
        array,
        index: idx,
        getter,
    });
    Ok(dest)
}

fn lower_as(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    expr: &Expr,
    type_name: &str,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let v = lower_expr(env, ctx, expr)?;
    let to = crate::types::map_surface_type(type_name);
    if v.ty() == to {
        return Ok(v);
    }
    let dest = new_temp(ctx, to.clone());
    ctx.func.push(Instruction::Cast { dest: dest.clone(), src: v, to });
    let _ = span;
    Ok(dest)
}

fn lower_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    callee: &Expr,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    match callee {
        Expr::Identifier(name, _) => lower_global_call(env, ctx, name, args, span),
        Expr::PropertyAccess { target, name, .. } => {
            if let Expr::Identifier(obj, _) = target.as_ref() {
                match obj.as_str() {
                    "Math" => return lower_math_call(env, ctx, name, args, span),
                    "console" => return lower_console_call(env, ctx, name, args, span),
                    "Object" => return lower_object_static_call(env, ctx, name, args, span),
                    "Date" if name == "now" => return Ok(Operand::number_const(0.0)),
                    "Number" if name == "isFinite" => return lower_number_is_finite(env, ctx, args, span),
                    _ => {}
                }
            }
            lower_method_call(env, ctx, target, name, args, span)
        }
        Expr::This(_) => Err(CodegenError::MalformedAST {
            what: "`this` is not callable".to_string(),
            span,
        }),
        _ => Err(CodegenError::UnsupportedFeature {
            what: "call through a computed callee expression".to_string(),
            span,
        }),
    }
}

/// A bare identifier call: casts (`Number`/`BigInt`), parsing helpers,
/// `Array(n)`, `setImmediate`, or a same-class static method (spec
/// §4.D).
fn lower_global_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    name: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    match name {
        "Number" => {
            let v = lower_expr(env, ctx, args.first().ok_or_else(|| CodegenError::MalformedAST {
                what: "Number() requires one argument".to_string(),
                span,
            })?)?;
            if v.ty() == TypeSymbol::Single {
                return Ok(v);
            }
            let dest = new_temp(ctx, TypeSymbol::Single);
            ctx.func.push(Instruction::Cast { dest: dest.clone(), src: v, to: TypeSymbol::Single });
            Ok(dest)
        }
        "BigInt" => {
            let v = lower_expr(env, ctx, args.first().ok_or_else(|| CodegenError::MalformedAST {
                what: "BigInt() requires one argument".to_string(),
                span,
            })?)?;
            let dest = new_temp(ctx, TypeSymbol::Int64);
            ctx.func.push(Instruction::Cast { dest: dest.clone(), src: v, to: TypeSymbol::Int64 });
            Ok(dest)
        }
        "parseInt" | "parseFloat" => {
            // Radix-10-only restriction (spec §4.D): a second argument
            // selecting another radix is unsupported.
            if args.len() > 1 {
                return Err(CodegenError::UnsupportedFeature {
                    what: format!("{} with a non-default radix", name),
                    span,
                });
            }
            let ret = if name == "parseInt" { TypeSymbol::Int32 } else { TypeSymbol::Single };
            // Zero-arg form is a constant, not a call (spec §4.D:
            // `parseInt()` -> `0`, `parseFloat()` -> `NaN`).
            let Some(arg) = args.first() else {
                let value = if name == "parseInt" { 0.0 } else { f64::NAN };
                return Ok(Operand::Constant { value: ConstValue::Number(value), ty: ret });
            };
            let v = lower_expr(env, ctx, arg)?;
            let sig = env.resolver.require_extern(
                &ret.udon_type(),
                "Parse",
                AccessKind::Method,
                &["SystemString"],
                &ret.udon_type(),
                span,
            )?;
            let dest = new_temp(ctx, ret);
            ctx.func.push(Instruction::Call {
                dest: Some(dest.clone()),
                target: CallTarget::Extern(sig),
                args: vec![v],
            });
            Ok(dest)
        }
        "Array" => lower_array_ctor(env, ctx, args, span),
        "setImmediate" => lower_set_immediate(env, ctx, args, span),
        _ => {
            let mut lowered_args = Vec::with_capacity(args.len());
            for a in args {
                lowered_args.push(lower_expr(env, ctx, a)?);
            }
            let dest = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::Call {
                dest: Some(dest.clone()),
                target: CallTarget::UserFunction(name.to_string()),
                args: lowered_args,
            });
            Ok(dest)
        }
    }
}

/// `setImmediate(() => this.method())`: restricted to a zero-arg
/// `this.<method>()` callback body (spec §4.D).
fn lower_set_immediate(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let callback = args.first().ok_or_else(|| CodegenError::MalformedAST {
        what: "setImmediate() requires a callback argument".to_string(),
        span,
    })?;
    let Expr::Function { params, body, .. } = callback.as_ref() else {
        return Err(CodegenError::UnsupportedFeature {
            what: "setImmediate() callback must be an inline function".to_string(),
            span,
        });
    };
    if !params.is_empty() {
        return Err(CodegenError::UnsupportedFeature {
            what: "setImmediate() callback must take no parameters".to_string(),
            span,
        });
    }
    let is_simple_this_call = matches!(
        body.as_ref(),
        Stmt::Block(stmts, _) if stmts.len() == 1 && matches!(
            stmts[0].as_ref(),
            Stmt::Expression(e, _) if matches!(
                e.as_ref(),
                Expr::Call { callee, .. } if matches!(callee.as_ref(), Expr::PropertyAccess { target, .. } if matches!(target.as_ref(), Expr::This(_)))
            )
        )
    ) || matches!(
        body.as_ref(),
        Stmt::Expression(e, _) if matches!(
            e.as_ref(),
            Expr::Call { callee, .. } if matches!(callee.as_ref(), Expr::PropertyAccess { target, .. } if matches!(target.as_ref(), Expr::This(_)))
        )
    );
    if !is_simple_this_call {
        return Err(CodegenError::UnsupportedFeature {
            what: "setImmediate() callback must be exactly `this.<method>()`".to_string(),
            span,
        });
    }
    let sig = env.resolver.require_extern(
        "VRCUdonUdonBehaviour",
        "SendCustomEventDelayedFrames",
        AccessKind::Method,
        &["SystemString", "SystemInt32"],
        "SystemVoid",
        span,
    )?;
    let method_name = match body.as_ref() {
        Stmt::Block(stmts, _) => match stmts[0].as_ref() {
            Stmt::Expression(e, _) => match e.as_ref() {
                Expr::Call { callee, .. } => match callee.as_ref() {
                    Expr::PropertyAccess { name, .. } => name.clone(),
                    _ => unreachable!(),
                },
                _ => unreachable!(),
            },
            _ => unreachable!(),
        },
        Stmt::Expression(e, _) => match e.as_ref() {
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::PropertyAccess { name, .. } => name.clone(),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        },
        _ => unreachable!(),
    };
    ctx.func.push(Instruction::MethodCall {
        dest: None,
        receiver: this_operand(),
        target: CallTarget::Extern(sig),
        args: vec![
            Operand::Constant {
                value: ConstValue::Str(method_name),
                ty: TypeSymbol::String,
            },
            Operand::Constant {
                value: ConstValue::Number(0.0),
                ty: TypeSymbol::Int32,
            },
        ],
    });
    Ok(Operand::null())
}

/// `Number.isFinite(x)` (spec §9 open question, resolved via
/// [`NumberIsFiniteStrategy`]).
fn lower_number_is_finite(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let v = lower_expr(env, ctx, args.first().ok_or_else(|| CodegenError::MalformedAST {
        what: "Number.isFinite() requires one argument".to_string(),
        span,
    })?)?;
    match env.options.number_is_finite_strategy {
        NumberIsFiniteStrategy::SelfEquality => {
            let dest = new_temp(ctx, TypeSymbol::Boolean);
            ctx.func.push(Instruction::BinaryOp {
                dest: dest.clone(),
                op: "==".to_string(),
                left: v.clone(),
                right: v,
            });
            Ok(dest)
        }
        NumberIsFiniteStrategy::Strict => {
            let sig = env.resolver.require_extern(
                "SystemSingle",
                "IsFinite",
                AccessKind::Method,
                &["SystemSingle"],
                "SystemBoolean",
                span,
            )?;
            let dest = new_temp(ctx, TypeSymbol::Boolean);
            ctx.func.push(Instruction::Call {
                dest: Some(dest.clone()),
                target: CallTarget::Extern(sig),
                args: vec![v],
            });
            Ok(dest)
        }
    }
}

fn lower_math_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    member: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    // `Math.random()` constant-folds to `0` (spec §4.D, conservative
    // fold — there is no RNG source in this IR).
    if member == "random" {
        return Ok(Operand::number_const(0.0));
    }
    let mut lowered_args = Vec::with_capacity(args.len());
    for a in args {
        lowered_args.push(lower_expr(env, ctx, a)?);
    }
    if member == "imul" {
        if lowered_args.len() != 2 {
            return Err(CodegenError::MalformedAST {
                what: "Math.imul() requires two arguments".to_string(),
                span,
            });
        }
        let a = cast_to(ctx, lowered_args[0].clone(), TypeSymbol::Int32);
        let b = cast_to(ctx, lowered_args[1].clone(), TypeSymbol::Int32);
        let dest = new_temp(ctx, TypeSymbol::Int32);
        ctx.func.push(Instruction::BinaryOp {
            dest: dest.clone(),
            op: "*".to_string(),
            left: a,
            right: b,
        });
        return Ok(dest);
    }
    if member == "max" || member == "min" {
        if lowered_args.is_empty() {
            return Ok(Operand::number_const(if member == "max" {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }));
        }
        // Constant-fold left to right when every argument is a
        // literal (spec §4.D); otherwise emit a left-to-right chain
        // of pairwise `Mathf.Max`/`Mathf.Min` extern calls.
        let all_const = lowered_args.iter().all(|a| {
            matches!(a, Operand::Constant { value: ConstValue::Number(_), .. })
        });
        if all_const {
            let mut acc = match &lowered_args[0] {
                Operand::Constant { value: ConstValue::Number(n), .. } => *n,
                _ => unreachable!(),
            };
            for a in &lowered_args[1..] {
                if let Operand::Constant { value: ConstValue::Number(n), .. } = a {
                    acc = if member == "max" { acc.max(*n) } else { acc.min(*n) };
                }
            }
            return Ok(Operand::number_const(acc));
        }
        let extern_member = if member == "max" { "Max" } else { "Min" };
        let sig = env.resolver.require_extern(
            "UnityEngineMathf",
            extern_member,
            AccessKind::Method,
            &["SystemSingle", "SystemSingle"],
            "SystemSingle",
            span,
        )?;
        let mut iter = lowered_args.into_iter();
        let mut acc = iter.next().unwrap();
        for next in iter {
            let dest = new_temp(ctx, TypeSymbol::Single);
            ctx.func.push(Instruction::Call {
                dest: Some(dest.clone()),
                target: CallTarget::Extern(sig.clone()),
                args: vec![acc, next],
            });
            acc = dest;
        }
        return Ok(acc);
    }
    // Everything else: a direct `Math.X` -> `Mathf.X` extern mapping.
    let mathf_name = capitalize(member);
    let param_types: Vec<String> = lowered_args.iter().map(|a| a.ty().udon_type()).collect();
    let param_refs: Vec<&str> = param_types.iter().map(String::as_str).collect();
    let sig = env.resolver.require_extern(
        "UnityEngineMathf",
        &mathf_name,
        AccessKind::Method,
        &param_refs,
        "SystemSingle",
        span,
    )?;
    let dest = new_temp(ctx, TypeSymbol::Single);
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(sig),
        args: lowered_args,
    });
    Ok(dest)
}

fn cast_to(ctx: &mut LowerCtx, v: Operand, to: TypeSymbol) -> Operand {
    if v.ty() == to {
        return v;
    }
    let dest = new_temp(ctx, to.clone());
    ctx.func.push(Instruction::Cast { dest: dest.clone(), src: v, to });
    dest
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `console.log/info/warn/error` -> `Debug.Log`/`LogWarning`/`LogError`
/// (spec §4.D). Multiple arguments are joined with a single space,
/// matching `console.log`'s own formatting.
fn lower_console_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    member: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let debug_member = match member {
        "warn" => "LogWarning",
        "error" => "LogError",
        _ => "Log",
    };
    let mut message: Option<Operand> = None;
    for a in args {
        let v = lower_expr(env, ctx, a)?;
        let s = stringify(env, ctx, v, span)?;
        message = Some(match message.take() {
            None => s,
            Some(prev) => {
                let sep = Operand::Constant {
                    value: ConstValue::Str(" ".to_string()),
                    ty: TypeSymbol::String,
                };
                let concat_sig = env.resolver.require_extern(
                    "SystemString",
                    "Concat",
                    AccessKind::Method,
                    &["SystemString", "SystemString"],
                    "SystemString",
                    span,
                )?;
                let with_sep = new_temp(ctx, TypeSymbol::String);
                ctx.func.push(Instruction::Call {
                    dest: Some(with_sep.clone()),
                    target: CallTarget::Extern(concat_sig.clone()),
                    args: vec![prev, sep],
                });
                let dest = new_temp(ctx, TypeSymbol::String);
                ctx.func.push(Instruction::Call {
                    dest: Some(dest.clone()),
                    target: CallTarget::Extern(concat_sig),
                    args: vec![with_sep, s],
                });
                dest
            }
        });
    }
    let message = message.unwrap_or_else(|| Operand::Constant {
        value: ConstValue::Str(String::new()),
        ty: TypeSymbol::String,
    });
    let sig = env.resolver.require_extern(
        "UnityEngineDebug",
        debug_member,
        AccessKind::Method,
        &["SystemString"],
        "SystemVoid",
        span,
    )?;
    ctx.func.push(Instruction::Call {
        dest: None,
        target: CallTarget::Extern(sig),
        args: vec![message],
    });
    Ok(Operand::null())
}

/// `Object.keys/values/entries(x)` over a `DataDictionary` (spec
/// §4.D). `keys`/`values` map straight onto `GetKeys`/`GetValues`;
/// `entries` is lowered as an explicit key-index loop since there is
/// no single extern that produces `[key, value]` pairs.
fn lower_object_static_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    member: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let target = args.first().ok_or_else(|| CodegenError::MalformedAST {
        what: format!("Object.{}() requires one argument", member),
        span,
    })?;
    let dict = lower_expr(env, ctx, target)?;
    match member {
        "keys" => {
            let sig = env.resolver.require_extern(
                "VRCDataDictionary",
                "GetKeys",
                AccessKind::Method,
                &[],
                "VRCDataList",
                span,
            )?;
            let dest = new_temp(ctx, TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)));
            ctx.func.push(Instruction::MethodCall {
                dest: Some(dest.clone()),
                receiver: dict,
                target: CallTarget::Extern(sig),
                args: vec![],
            });
            Ok(dest)
        }
        "values" => {
            let sig = env.resolver.require_extern(
                "VRCDataDictionary",
                "GetValues",
                AccessKind::Method,
                &[],
                "VRCDataList",
                span,
            )?;
            let dest = new_temp(ctx, TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)));
            ctx.func.push(Instruction::MethodCall {
                dest: Some(dest.clone()),
                receiver: dict,
                target: CallTarget::Extern(sig),
                args: vec![],
            });
            Ok(dest)
        }
        "entries" => lower_object_entries(env, ctx, dict, span),
        _ => Err(CodegenError::UnsupportedFeature {
            what: format!("Object.{}()", member),
            span,
        }),
    }
}

fn lower_object_entries(env: &LowerEnv, ctx: &mut LowerCtx, dict: Operand, span: SourceSpan) -> CodegenResult<Operand> {
    let list_ty = TypeSymbol::DataListOf(Box::new(TypeSymbol::Object));
    let keys_sig = env.resolver.require_extern(
        "VRCDataDictionary",
        "GetKeys",
        AccessKind::Method,
        &[],
        "VRCDataList",
        span,
    )?;
    let keys = new_temp(ctx, list_ty.clone());
    ctx.func.push(Instruction::MethodCall {
        dest: Some(keys.clone()),
        receiver: dict.clone(),
        target: CallTarget::Extern(keys_sig),
        args: vec![],
    });
    let list_ctor = env.resolver.require_extern("VRCDataList", "ctor", AccessKind::Ctor, &[], "VRCDataList", span)?;
    let result = new_temp(ctx, list_ty.clone());
    ctx.func.push(Instruction::Call {
        dest: Some(result.clone()),
        target: CallTarget::Extern(list_ctor.clone()),
        args: vec![],
    });
    let count_sig = env.resolver.require_extern(
        "VRCDataList",
        "Count",
        AccessKind::Getter,
        &[],
        "SystemInt32",
        span,
    )?;
    let count = new_temp(ctx, TypeSymbol::Int32);
    ctx.func.push(Instruction::PropertyGet {
        dest: count.clone(),
        receiver: keys.clone(),
        property: "Count".to_string(),
        getter: count_sig,
    });
    let i = Operand::Variable {
        name: format!("__objentries_i_{}", ctx.func.new_temp()),
        ty: TypeSymbol::Int32,
        is_local: true,
        is_parameter: false,
        is_exported: false,
    };
    ctx.func.push(Instruction::Copy {
        dest: i.clone(),
        src: Operand::Constant { value: ConstValue::Number(0.0), ty: TypeSymbol::Int32 },
    });
    let loop_label = ctx.new_label();
    let end_label = ctx.new_label();
    ctx.func.push(Instruction::Label(loop_label));
    let in_range = new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::BinaryOp {
        dest: in_range.clone(),
        op: "<".to_string(),
        left: i.clone(),
        right: count,
    });
    ctx.func.push(Instruction::ConditionalJump { cond: in_range, target: end_label });

    let key_get_sig = env.resolver.require_extern(
        "VRCDataList",
        "Get",
        AccessKind::Method,
        &["SystemInt32"],
        "SystemObject",
        span,
    )?;
    let key = new_temp(ctx, TypeSymbol::Object);
    ctx.func.push(Instruction::ArrayAccess {
        dest: key.clone(),
        array: keys.clone(),
        index: i.clone(),
        getter: key_get_sig,
    });
    let value_get_sig = env.resolver.require_extern(
        "VRCDataDictionary",
        "GetValue",
        AccessKind::Method,
        &["SystemObject"],
        "SystemObject",
        span,
    )?;
    let value = new_temp(ctx, TypeSymbol::Object);
    ctx.func.push(Instruction::MethodCall {
        dest: Some(value.clone()),
        receiver: dict,
        target: CallTarget::Extern(value_get_sig),
        args: vec![key.clone()],
    });

    let pair = new_temp(ctx, list_ty);
    ctx.func.push(Instruction::Call {
        dest: Some(pair.clone()),
        target: CallTarget::Extern(list_ctor),
        args: vec![],
    });
    let add_sig = env.resolver.require_extern(
        "VRCDataList",
        "Add",
        AccessKind::Method,
        &["VRCDataToken"],
        "SystemVoid",
        span,
    )?;
    let key_token = wrap_data_token(env, ctx, key, span)?;
    ctx.func.push(Instruction::MethodCall {
        dest: None,
        receiver: pair.clone(),
        target: CallTarget::Extern(add_sig.clone()),
        args: vec![key_token],
    });
    let value_token = wrap_data_token(env, ctx, value, span)?;
    ctx.func.push(Instruction::MethodCall {
        dest: None,
        receiver: pair.clone(),
        target: CallTarget::Extern(add_sig.clone()),
        args: vec![value_token],
    });
    let pair_token = wrap_data_token(env, ctx, pair, span)?;
    ctx.func.push(Instruction::MethodCall {
        dest: None,
        receiver: result.clone(),
        target: CallTarget::Extern(add_sig),
        args: vec![pair_token],
    });

    let next_i = new_temp(ctx, TypeSymbol::Int32);
    ctx.func.push(Instruction::BinaryOp {
        dest: next_i.clone(),
        op: "+".to_string(),
        left: i.clone(),
        right: Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 },
    });
    ctx.func.push(Instruction::Copy { dest: i, src: next_i });
    ctx.func.push(Instruction::UnconditionalJump { target: loop_label });
    ctx.func.push(Instruction::Label(end_label));
    Ok(result)
}

/// A method call on an arbitrary receiver, including `Set`/`Map`/
/// array `.forEach(callback)` inlining (spec §4.D).
fn lower_method_call(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    name: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    if matches!(target, Expr::This(_)) {
        let mut lowered_args = Vec::with_capacity(args.len());
        for a in args {
            lowered_args.push(lower_expr(env, ctx, a)?);
        }
        let dest = new_temp(ctx, TypeSymbol::Object);
        ctx.func.push(Instruction::Call {
            dest: Some(dest.clone()),
            target: CallTarget::UserFunction(name.to_string()),
            args: lowered_args,
        });
        return Ok(dest);
    }
    let receiver = lower_expr(env, ctx, target)?;
    if name == "forEach" {
        if let Some(Expr::Function { params, body, .. }) = args.first().map(|a| a.as_ref()) {
            let this_arg = match args.get(1) {
                Some(expr) => Some(lower_expr(env, ctx, expr)?),
                None => None,
            };
            return lower_foreach(env, ctx, receiver, params, body, this_arg, span);
        }
    }
    let mut lowered_args = Vec::with_capacity(args.len());
    for a in args {
        lowered_args.push(lower_expr(env, ctx, a)?);
    }
    let param_types: Vec<TypeSymbol> = lowered_args.iter().map(Operand::ty).collect();
    let sig = env.resolver.require_extern_typed(
        &receiver.ty(),
        name,
        AccessKind::Method,
        &param_types,
        &TypeSymbol::Object,
        span,
    )?;
    let ret_ty = crate::externs::resolve_extern_return_type(&sig);
    let dest = new_temp(ctx, ret_ty);
    ctx.func.push(Instruction::MethodCall {
        dest: Some(dest.clone()),
        receiver,
        target: CallTarget::Extern(sig),
        args: lowered_args,
    });
    Ok(dest)
}

/// Inline a `list.forEach((value, index) => ...)` /
/// `dict.forEach((value, key) => ...)` call as an explicit
/// index/key-driven loop (spec §4.D "`forEach` inlining").
fn lower_foreach(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    receiver: Operand,
    params: &[Param],
    body: &Stmt,
    this_arg: Option<Operand>,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    match receiver.ty() {
        TypeSymbol::DataListOf(_) => {
            let count_sig = env.resolver.require_extern(
                "VRCDataList",
                "Count",
                AccessKind::Getter,
                &[],
                "SystemInt32",
                span,
            )?;
            let count = new_temp(ctx, TypeSymbol::Int32);
            ctx.func.push(Instruction::PropertyGet {
                dest: count.clone(),
                receiver: receiver.clone(),
                property: "Count".to_string(),
                getter: count_sig,
            });
            let i = Operand::Variable {
                name: format!("__foreach_i_{}", ctx.func.new_temp()),
                ty: TypeSymbol::Int32,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            };
            ctx.func.push(Instruction::Copy {
                dest: i.clone(),
                src: Operand::Constant { value: ConstValue::Number(0.0), ty: TypeSymbol::Int32 },
            });
            let loop_label = ctx.new_label();
            let end_label = ctx.new_label();
            ctx.func.push(Instruction::Label(loop_label));
            let in_range = new_temp(ctx, TypeSymbol::Boolean);
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
                AccessKind::Method,
                &["SystemInt32"],
                "SystemObject",
                span,
            )?;
            let value = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::ArrayAccess {
                dest: value.clone(),
                array: receiver,
                index: i.clone(),
                getter: get_sig,
            });
            let mut bound = vec![value];
            if params.len() > 1 {
                bound.push(i.clone());
            }
            lower_inline_callback(env, ctx, params, body, bound, this_arg.clone())?;
            let next_i = new_temp(ctx, TypeSymbol::Int32);
            ctx.func.push(Instruction::BinaryOp {
                dest: next_i.clone(),
                op: "+".to_string(),
                left: i.clone(),
                right: Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 },
            });
            ctx.func.push(Instruction::Copy { dest: i, src: next_i });
            ctx.func.push(Instruction::UnconditionalJump { target: loop_label });
            ctx.func.push(Instruction::Label(end_label));
            Ok(Operand::null())
        }
        TypeSymbol::Collection { .. } => {
            let keys_sig = env.resolver.require_extern(
                "VRCDataDictionary",
                "GetKeys",
                AccessKind::Method,
                &[],
                "VRCDataList",
                span,
            )?;
            let keys = new_temp(ctx, TypeSymbol::DataListOf(Box::new(TypeSymbol::Object)));
            ctx.func.push(Instruction::MethodCall {
                dest: Some(keys.clone()),
                receiver: receiver.clone(),
                target: CallTarget::Extern(keys_sig),
                args: vec![],
            });
            let count_sig = env.resolver.require_extern(
                "VRCDataList",
                "Count",
                AccessKind::Getter,
                &[],
                "SystemInt32",
                span,
            )?;
            let count = new_temp(ctx, TypeSymbol::Int32);
            ctx.func.push(Instruction::PropertyGet {
                dest: count.clone(),
                receiver: keys.clone(),
                property: "Count".to_string(),
                getter: count_sig,
            });
            let i = Operand::Variable {
                name: format!("__foreach_i_{}", ctx.func.new_temp()),
                ty: TypeSymbol::Int32,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            };
            ctx.func.push(Instruction::Copy {
                dest: i.clone(),
                src: Operand::Constant { value: ConstValue::Number(0.0), ty: TypeSymbol::Int32 },
            });
            let loop_label = ctx.new_label();
            let end_label = ctx.new_label();
            ctx.func.push(Instruction::Label(loop_label));
            let in_range = new_temp(ctx, TypeSymbol::Boolean);
            ctx.func.push(Instruction::BinaryOp {
                dest: in_range.clone(),
                op: "<".to_string(),
                left: i.clone(),
                right: count,
            });
            ctx.func.push(Instruction::ConditionalJump { cond: in_range, target: end_label });
            let key_get_sig = env.resolver.require_extern(
                "VRCDataList",
                "Get",
                AccessKind::Method,
                &["SystemInt32"],
                "SystemObject",
                span,
            )?;
            let key = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::ArrayAccess {
                dest: key.clone(),
                array: keys.clone(),
                index: i.clone(),
                getter: key_get_sig,
            });
            let value_get_sig = env.resolver.require_extern(
                "VRCDataDictionary",
                "GetValue",
                AccessKind::Method,
                &["SystemObject"],
                "SystemObject",
                span,
            )?;
            let value = new_temp(ctx, TypeSymbol::Object);
            ctx.func.push(Instruction::MethodCall {
                dest: Some(value.clone()),
                receiver: receiver.clone(),
                target: CallTarget::Extern(value_get_sig),
                args: vec![key.clone()],
            });
            // JS `Map.forEach(value, key)` / `Set.forEach(value, value)` order.
            let mut bound = vec![value];
            if params.len() > 1 {
                bound.push(key);
            }
            lower_inline_callback(env, ctx, params, body, bound, this_arg)?;
            let next_i = new_temp(ctx, TypeSymbol::Int32);
            ctx.func.push(Instruction::BinaryOp {
                dest: next_i.clone(),
                op: "+".to_string(),
                left: i.clone(),
                right: Operand::Constant { value: ConstValue::Number(1.0), ty: TypeSymbol::Int32 },
            });
            ctx.func.push(Instruction::Copy { dest: i, src: next_i });
            ctx.func.push(Instruction::UnconditionalJump { target: loop_label });
            ctx.func.push(Instruction::Label(end_label));
            Ok(Operand::null())
        }
        other => Err(CodegenError::UnsupportedFeature {
            what: format!("forEach() on a {} receiver", other),
            span,
        }),
    }
}

fn lower_assignment(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    op: &str,
    value: &Expr,
    span: SourceSpan,
) -> CodegenResult<Operand> {
    if op == "=" {
        if let (Expr::Identifier(name, _), Expr::New { class_name, args, .. }) = (target, value) {
            if let Some(class) = env.find_inlinable_class(class_name) {
                let prefix = inline_new_instance(env, ctx, class, args, span)?;
                ctx.inline_instances.insert(name.clone(), prefix);
                return Ok(Operand::null());
            }
        }
    }
    let rhs = if op == "=" {
        lower_expr(env, ctx, value)?
    } else {
        let base_op = op.trim_end_matches('=');
        let current = lower_expr(env, ctx, target)?;
        let rhs_val = lower_expr(env, ctx, value)?;
        let dest = new_temp(ctx, current.ty());
        ctx.func.push(Instruction::BinaryOp {
            dest: dest.clone(),
            op: base_op.to_string(),
            left: current,
            right: rhs_val,
        });
        dest
    };
    assign_to_target(env, ctx, target, rhs.clone(), span)?;
    Ok(rhs)
}

/// Common tail shared by plain and compound assignment: write `value`
/// into whatever `target` denotes (variable, inlined-instance field,
/// property, or array element), including field-change callback
/// dispatch (spec §4.D "Field-change callbacks").
fn assign_to_target(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    target: &Expr,
    value: Operand,
    span: SourceSpan,
) -> CodegenResult<()> {
    match target {
        Expr::Identifier(name, ident_span) => {
            let dest = lower_identifier(env, ctx, name, *ident_span)?;
            ctx.func.push(Instruction::Copy { dest, src: value });
            Ok(())
        }
        Expr::PropertyAccess { target: recv, name, .. } => {
            if let Expr::Identifier(ident, _) = recv.as_ref() {
                if let Some(prefix) = ctx.inline_instances.get(ident).cloned() {
                    let var_name = format!("{}_{}", prefix, name);
                    ctx.func.push(Instruction::Copy {
                        dest: Operand::Variable {
                            name: var_name,
                            ty: value.ty(),
                            is_local: true,
                            is_parameter: false,
                            is_exported: false,
                        },
                        src: value,
                    });
                    return Ok(());
                }
            }
            let receiver = lower_expr(env, ctx, recv)?;
            let setter = env.resolver.require_extern_typed(
                &receiver.ty(),
                name,
                AccessKind::Setter,
                &[value.ty()],
                &TypeSymbol::Void,
                span,
            )?;
            ctx.func.push(Instruction::PropertySet {
                receiver: receiver.clone(),
                property: name.clone(),
                setter,
                value,
            });
            // Field-change callback dispatch (spec §4.D): only fires
            // for direct `this.<property> = ...` assignments, never
            // for assignments through another receiver.
            if matches!(recv.as_ref(), Expr::This(_)) {
                if let Some(callback) = ctx.field_change_callbacks.get(name).cloned() {
                    ctx.func.push(Instruction::Call {
                        dest: None,
                        target: CallTarget::UserFunction(callback),
                        args: vec![],
                    });
                }
            }
            Ok(())
        }
        Expr::ArrayAccess { target: arr, index, .. } => {
            let array = lower_expr(env, ctx, arr)?;
            let idx = lower_expr(env, ctx, index)?;
            let setter = env.resolver.require_extern_typed(
                &array.ty(),
                "Set",
                AccessKind::Method,
                &[idx.ty(), value.ty()],
                &TypeSymbol::Void,
                span,
            )?;
            ctx.func.push(Instruction::ArrayAssignment {
                array,
                index: idx,
                value,
                setter,
            });
            Ok(())
        }
        _ => Err(CodegenError::MalformedAST {
            what: "assignment target is not an lvalue".to_string(),
            span,
        }),
    }
}

fn lower_delete(env: &LowerEnv, ctx: &mut LowerCtx, target: &Expr, span: SourceSpan) -> CodegenResult<Operand> {
    match target {
        Expr::PropertyAccess { target: recv, name, .. } => {
            let receiver = lower_expr(env, ctx, recv)?;
            if matches!(receiver.ty(), TypeSymbol::Collection { .. }) {
                let key = wrap_data_token(
                    env,
                    ctx,
                    Operand::Constant {
                        value: ConstValue::Str(name.clone()),
                        ty: TypeSymbol::String,
                    },
                    span,
                )?;
                let sig = env.resolver.require_extern(
                    "VRCDataDictionary",
                    "Remove",
                    AccessKind::Method,
                    &["VRCDataToken"],
                    "SystemBoolean",
                    span,
                )?;
                ctx.func.push(Instruction::MethodCall {
                    dest: None,
                    receiver,
                    target: CallTarget::Extern(sig),
                    args: vec![key],
                });
            } else if receiver.ty() == TypeSymbol::Extern("UdonBehaviour".to_string()) {
                let sig = env.resolver.require_extern(
                    "VRCUdonUdonBehaviour",
                    "SetProgramVariable",
                    AccessKind::Method,
                    &["SystemString", "SystemObject"],
                    "SystemVoid",
                    span,
                )?;
                ctx.func.push(Instruction::MethodCall {
                    dest: None,
                    receiver,
                    target: CallTarget::Extern(sig),
                    args: vec![
                        Operand::Constant {
                            value: ConstValue::Str(name.clone()),
                            ty: TypeSymbol::String,
                        },
                        Operand::null(),
                    ],
                });
            } else {
                let setter = env.resolver.require_extern_typed(
                    &receiver.ty(),
                    name,
                    AccessKind::Setter,
                    &[TypeSymbol::Object],
                    &TypeSymbol::Void,
                    span,
                )?;
                ctx.func.push(Instruction::PropertySet {
                    receiver,
                    property: name.clone(),
                    setter,
                    value: Operand::null(),
                });
            }
        }
        Expr::ArrayAccess { target: arr, index, .. } => {
            let array = lower_expr(env, ctx, arr)?;
            let idx = lower_expr(env, ctx, index)?;
            let setter = env.resolver.require_extern_typed(
                &array.ty(),
                "Set",
                AccessKind::Method,
                &[idx.ty(), TypeSymbol::Object],
                &TypeSymbol::Void,
                span,
            )?;
            ctx.func.push(Instruction::ArrayAssignment {
                array,
                index: idx,
                value: Operand::null(),
                setter,
            });
        }
        _ => {
            return Err(CodegenError::MalformedAST {
                what: "`delete` target must be a property or array element".to_string(),
                span,
            })
        }
    }
    // `delete` always yields `true` (spec §4.D).
    Ok(Operand::bool_const(true))
}

fn lower_typeof(env: &LowerEnv, ctx: &mut LowerCtx, type_name: &str, span: SourceSpan) -> CodegenResult<Operand> {
    let sig = env.resolver.require_extern(
        "SystemType",
        "GetType",
        AccessKind::Method,
        &["SystemString"],
        "SystemType",
        span,
    )?;
    let dest = new_temp(ctx, TypeSymbol::Extern("SystemType".to_string()));
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(sig),
        args: vec![Operand::Constant {
            value: ConstValue::TypeName(type_name.to_string()),
            ty: TypeSymbol::String,
        }],
    });
    Ok(dest)
}

/// Inline `new Foo(args...)` for a sibling non-`UdonBehaviour` class:
/// allocate a fresh `__inst_Foo_N` prefix and assign each property its
/// positional constructor argument, its declared initializer, or its
/// type's default value, in that priority order (spec §4.D "Inline
/// instance map"). Returns the new prefix; the caller is responsible
/// for recording it in `ctx.inline_instances` under the binding name.
pub(crate) fn inline_new_instance(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    class: &crate::ast::ClassDecl,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<String> {
    let _ = span;
    let prefix = ctx.new_inline_instance_prefix(&class.name);
    for (i, prop) in class.properties.iter().enumerate() {
        let ty = crate::types::map_surface_type(&prop.type_name);
        let value = if let Some(arg) = args.get(i) {
            lower_expr(env, ctx, arg)?
        } else if let Some(init) = &prop.initializer {
            lower_expr(env, ctx, init)?
        } else {
            crate::lower::stmt::default_value(&ty)
        };
        let field_var = Operand::Variable {
            name: format!("{}_{}", prefix, prop.name),
            ty,
            is_local: true,
            is_parameter: false,
            is_exported: false,
        };
        ctx.func.push(Instruction::Copy { dest: field_var, src: value });
    }
    Ok(prefix)
}

fn lower_new(env: &LowerEnv, ctx: &mut LowerCtx, class_name: &str, args: &[std::rc::Rc<Expr>], span: SourceSpan) -> CodegenResult<Operand> {
    match class_name {
        "Array" => lower_array_ctor(env, ctx, args, span),
        "Set" | "Map" => lower_set_or_map_ctor(env, ctx, class_name, args, span),
        _ if env.find_inlinable_class(class_name).is_some() => {
            // A sibling class is always inlined (spec §4.D), but only
            // at a `let x = new Foo()` / `x = new Foo()` binding site
            // (`lower_variable_decl`/`lower_assignment`), since an
            // inlined instance has no single runtime value to hand
            // back as an `Operand`. Reaching this arm means `new Foo()`
            // appeared somewhere else (an argument, a nested
            // expression, ...), which this compiler doesn't support.
            Err(CodegenError::UnsupportedFeature {
                what: format!(
                    "`new {}` used outside of a direct variable binding",
                    class_name
                ),
                span,
            })
        }
        _ => {
            let ty = TypeSymbol::Extern(class_name.to_string());
            let mut lowered_args = Vec::with_capacity(args.len());
            for a in args {
                lowered_args.push(lower_expr(env, ctx, a)?);
            }
            let param_types: Vec<TypeSymbol> = lowered_args.iter().map(Operand::ty).collect();
            let sig = env
                .resolver
                .require_extern_typed(&ty, "ctor", AccessKind::Ctor, &param_types, &ty, span)?;
            let dest = new_temp(ctx, ty);
            ctx.func.push(Instruction::Call {
                dest: Some(dest.clone()),
                target: CallTarget::Extern(sig),
                args: lowered_args,
            });
            Ok(dest)
        }
    }
}

/// `Array(n)` / `new Array(n)` with a numeric argument (spec §4.D).
fn lower_array_ctor(env: &LowerEnv, ctx: &mut LowerCtx, args: &[std::rc::Rc<Expr>], span: SourceSpan) -> CodegenResult<Operand> {
    let elem_ty = TypeSymbol::Object;
    let dest = new_temp(ctx, TypeSymbol::DataListOf(Box::new(elem_ty)));
    let ctor_sig = env.resolver.require_extern(
        "VRCDataList",
        "ctor",
        AccessKind::Ctor,
        &[],
        "VRCDataList",
        span,
    )?;
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(ctor_sig),
        args: vec![],
    });
    let Some(n_expr) = args.first() else {
        return Ok(dest);
    };
    if let Expr::Literal(Literal::Number(n), _) = n_expr.as_ref() {
        // Constant argument: decide statically, by the same
        // `is_integer` rule the non-constant branch below evaluates at
        // runtime (spec §4.D) — no element is pushed for a whole-number
        // `n`, only for a fractional one.
        if n.floor() != *n {
            let add_sig = env.resolver.require_extern(
                "VRCDataList",
                "Add",
                AccessKind::Method,
                &["VRCDataToken"],
                "SystemVoid",
                span,
            )?;
            let token = wrap_data_token(env, ctx, Operand::number_const(*n), span)?;
            ctx.func.push(Instruction::MethodCall {
                dest: None,
                receiver: dest.clone(),
                target: CallTarget::Extern(add_sig),
                args: vec![token],
            });
        }
        return Ok(dest);
    }
    // Non-constant float argument: runtime `floor(x) == x` check
    // decides between "empty list" and "single-element list" (spec §4.D).
    let n = lower_expr(env, ctx, n_expr)?;
    let floor_sig = env.resolver.require_extern(
        "UnityEngineMathf",
        "Floor",
        AccessKind::Method,
        &["SystemSingle"],
        "SystemSingle",
        span,
    )?;
    let floored = new_temp(ctx, TypeSymbol::Single);
    ctx.func.push(Instruction::Call {
        dest: Some(floored.clone()),
        target: CallTarget::Extern(floor_sig),
        args: vec![n.clone()],
    });
    let is_integer = new_temp(ctx, TypeSymbol::Boolean);
    ctx.func.push(Instruction::BinaryOp {
        dest: is_integer.clone(),
        op: "==".to_string(),
        left: floored,
        right: n.clone(),
    });
    let skip_label = ctx.new_label();
    ctx.func.push(Instruction::ConditionalJump {
        cond: is_integer,
        target: skip_label,
    });
    let add_sig = env.resolver.require_extern(
        "VRCDataList",
        "Add",
        AccessKind::Method,
        &["VRCDataToken"],
        "SystemVoid",
        span,
    )?;
    let token = wrap_data_token(env, ctx, n, span)?;
    ctx.func.push(Instruction::MethodCall {
        dest: None,
        receiver: dest.clone(),
        target: CallTarget::Extern(add_sig),
        args: vec![token],
    });
    ctx.func.push(Instruction::Label(skip_label));
    Ok(dest)
}

fn lower_set_or_map_ctor(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    _kind: &str,
    args: &[std::rc::Rc<Expr>],
    span: SourceSpan,
) -> CodegenResult<Operand> {
    let dest = new_temp(
        ctx,
        TypeSymbol::Collection {
            key: Box::new(TypeSymbol::Object),
            value: Box::new(TypeSymbol::Object),
        },
    );
    let ctor_sig = env.resolver.require_extern(
        "VRCDataDictionary",
        "ctor",
        AccessKind::Ctor,
        &[],
        "VRCDataDictionary",
        span,
    )?;
    ctx.func.push(Instruction::Call {
        dest: Some(dest.clone()),
        target: CallTarget::Extern(ctor_sig),
        args: vec![],
    });
    // If an iterable was supplied, a lowered loop walks it and
    // populates via `SetValue` (spec §4.D). Populating from a
    // compile-time `ArrayLiteral` is the common case and is unrolled
    // directly instead of emitting a real loop over a list we already
    // know the contents of at lowering time; any other iterable
    // (a variable, an existing collection, a non-literal expression)
    // can't be unrolled this way and isn't otherwise supported.
    if let Some(iterable) = args.first() {
        let Expr::ArrayLiteral { elements, .. } = iterable.as_ref() else {
            return Err(CodegenError::UnsupportedFeature {
                what: format!("`new {}` from a non-literal iterable", _kind),
                span,
            });
        };
        let set_sig = env.resolver.require_extern(
            "VRCDataDictionary",
            "SetValue",
            AccessKind::Method,
            &["VRCDataToken", "VRCDataToken"],
            "SystemVoid",
            span,
        )?;
        for el in elements {
            // `Map` entries are `[key, value]` pairs; `Set` elements
            // serve as both their own key and value.
            let (key, value) = if _kind == "Map" {
                let Expr::ArrayLiteral { elements: pair, .. } = el.as_ref() else {
                    return Err(CodegenError::UnsupportedFeature {
                        what: "Map entry that isn't a `[key, value]` literal pair".to_string(),
                        span,
                    });
                };
                if pair.len() != 2 {
                    return Err(CodegenError::MalformedAST {
                        what: "Map entry must have exactly two elements".to_string(),
                        span,
                    });
                }
                let k = lower_expr(env, ctx, &pair[0])?;
                let v = lower_expr(env, ctx, &pair[1])?;
                (wrap_data_token(env, ctx, k, span)?, wrap_data_token(env, ctx, v, span)?)
            } else {
                let v = lower_expr(env, ctx, el)?;
                let key = wrap_data_token(env, ctx, v.clone(), span)?;
                let value = wrap_data_token(env, ctx, v, span)?;
                (key, value)
            };
            ctx.func.push(Instruction::MethodCall {
                dest: None,
                receiver: dest.clone(),
                target: CallTarget::Extern(set_sig.clone()),
                args: vec![key, value],
            });
        }
    }
    Ok(dest)
}

/// Lower an inline callback's body (`Map.forEach`, `Set.forEach`,
/// `setImmediate`'s `this.<method>()` form) with `params` bound to the
/// given already-lowered argument values, and `this_arg` pushed onto
/// the `this`-override stack (spec §4.D).
pub fn lower_inline_callback(
    env: &LowerEnv,
    ctx: &mut LowerCtx,
    params: &[Param],
    body: &Stmt,
    bound_args: Vec<Operand>,
    this_arg: Option<Operand>,
) -> CodegenResult<()> {
    ctx.symtab.enter_scope();
    ctx.push_this_override(this_arg.unwrap_or_else(|| Operand::null()));
    for (param, value) in params.iter().zip(bound_args.into_iter()) {
        let ty = crate::types::map_surface_type(&param.type_name);
        ctx.symtab.declare(crate::lower::symtab::Binding {
            name: param.name.clone(),
            ty: ty.clone(),
            is_parameter: true,
            is_exported: false,
        });
        ctx.func.push(Instruction::Copy {
            dest: Operand::Variable {
                name: param.name.clone(),
                ty,
                is_local: true,
                is_parameter: true,
                is_exported: false,
            },
            src: value,
        });
    }
    lower_stmt(env, ctx, body)?;
    ctx.pop_this_override();
    ctx.symtab.exit_scope();
    Ok(())
}

pub(crate) fn new_temp(ctx: &mut LowerCtx, ty: TypeSymbol) -> Operand {
    let id = ctx.func.new_temp();
    Operand::Temporary { id, ty }
}

fn dominant_numeric_type(a: &TypeSymbol, b: &TypeSymbol) -> TypeSymbol {
    use TypeSymbol::*;
    // All numeric arithmetic follows the dominant operand's type
    // (spec §3.1). Widen to the wider of the two; default to `Single`
    // when neither side looks numeric (e.g. comparing two `Object`s).
    fn rank(t: &TypeSymbol) -> u8 {
        match t {
            Byte | SByte | Int16 | UInt16 => 1,
            Int32 | UInt32 => 2,
            Int64 | UInt64 => 3,
            Single => 4,
            Double => 5,
            _ => 0,
        }
    }
    if rank(a) >= rank(b) && rank(a) > 0 {
        a.clone()
    } else if rank(b) > 0 {
        b.clone()
    } else {
        Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Program;
    use crate::catalog::StaticCatalog;
    use crate::vrc_events::StaticEventRegistry;

    fn env<'a>(catalog: &'a StaticCatalog, events: &'a StaticEventRegistry, program: &'a Program) -> LowerEnv<'a> {
        LowerEnv::new(catalog, events, Default::default(), program)
    }

    #[test]
    fn numeric_literal_lowers_to_single() {
        let catalog = StaticCatalog::new();
        let events = StaticEventRegistry::new();
        let program = Program::default();
        let e = env(&catalog, &events, &program);
        let mut counter = 0u32;
        let mut ctx = LowerCtx::new(
            None,
            &mut counter,
            Operand::Variable {
                name: "__returnValue_return".to_string(),
                ty: TypeSymbol::Object,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            },
        );
        let op = lower_expr(&e, &mut ctx, &Expr::Literal(Literal::Number(10.0), SourceSpan::default()))
            .unwrap();
        assert_eq!(op.ty(), TypeSymbol::Single);
    }

    #[test]
    fn instanceof_folds_to_false() {
        let catalog = StaticCatalog::new();
        let events = StaticEventRegistry::new();
        let program = Program::default();
        let e = env(&catalog, &events, &program);
        let mut counter = 0u32;
        let mut ctx = LowerCtx::new(
            None,
            &mut counter,
            Operand::Variable {
                name: "r".to_string(),
                ty: TypeSymbol::Object,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            },
        );
        let span = SourceSpan::default();
        let op = lower_expr(
            &e,
            &mut ctx,
            &Expr::Binary {
                op: "instanceof".to_string(),
                left: std::rc::Rc::new(Expr::Literal(Literal::Null, span)),
                right: std::rc::Rc::new(Expr::Identifier("GameObject".to_string(), span)),
                span,
            },
        )
        .unwrap();
        assert_eq!(op, Operand::bool_const(false));
        assert!(ctx.func.is_empty());
    }

    #[test]
    fn template_with_all_literal_parts_folds() {
        let catalog = StaticCatalog::new();
        let events = StaticEventRegistry::new();
        let program = Program::default();
        let e = env(&catalog, &events, &program);
        let mut counter = 0u32;
        let mut ctx = LowerCtx::new(
            None,
            &mut counter,
            Operand::Variable {
                name: "r".to_string(),
                ty: TypeSymbol::Object,
                is_local: true,
                is_parameter: false,
                is_exported: false,
            },
        );
        let span = SourceSpan::default();
        let op = lower_expr(
            &e,
            &mut ctx,
            &Expr::Template {
                parts: vec!["hi-".to_string(), "".to_string()],
                exprs: vec![std::rc::Rc::new(Expr::Literal(Literal::Number(1.0), span))],
                span,
            },
        )
        .unwrap();
        assert_eq!(
            op,
            Operand::Constant {
                value: ConstValue::Str("hi-1".to_string()),
                ty: TypeSymbol::String,
            }
        );
        assert!(ctx.func.is_empty());
    }
}
