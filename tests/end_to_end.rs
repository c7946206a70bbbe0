//! End-to-end scenarios and testable properties (spec §8).

use std::rc::Rc;

use udonc::ast::{ClassDecl, Expr, Literal, MethodDecl, Param, Program, PropertyDecl, SourceSpan, Stmt};
use udonc::catalog::{AccessKind, StaticCatalog};
use udonc::config::CompileOptions;
use udonc::vrc_events::StaticEventRegistry;

fn span() -> SourceSpan {
    SourceSpan::default()
}

fn start_method(body: Vec<Rc<Stmt>>) -> MethodDecl {
    MethodDecl {
        name: "_start".to_string(),
        params: vec![],
        return_type: "void".to_string(),
        body: Rc::new(Stmt::Block(body, span())),
        is_static: false,
        is_recursive: false,
        decorators: vec![],
        span: span(),
    }
}

fn behaviour(methods: Vec<MethodDecl>) -> Program {
    Program {
        classes: vec![ClassDecl {
            name: "Scenario".to_string(),
            properties: vec![],
            methods,
            is_udon_behaviour: true,
            span: span(),
        }],
        enums: vec![],
    }
}

fn catalog_with_arithmetic() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    catalog.insert(
        "UnityEngineSingle",
        "op_Addition",
        AccessKind::Method,
        vec!["SystemSingle".to_string(), "SystemSingle".to_string()],
        "SystemSingle",
        "UnityEngineSingle.__op_Addition__SystemSingle_SystemSingle__SystemSingle",
    );
    catalog.insert(
        "UnityEngineSingle",
        "op_LessThan",
        AccessKind::Method,
        vec!["SystemSingle".to_string(), "SystemSingle".to_string()],
        "SystemBoolean",
        "UnityEngineSingle.__op_LessThan__SystemSingle_SystemSingle__SystemBoolean",
    );
    catalog
}

/// S1: `let x: number = 10;` assembles a `SystemSingle` data entry and
/// a `PUSH, x` / `COPY` pair.
#[test]
fn s1_simple_variable_declaration() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "x".to_string(),
        type_name: "number".to_string(),
        initializer: Some(Rc::new(Expr::Literal(Literal::Number(10.0), span()))),
        span: span(),
    })])]);

    let catalog = StaticCatalog::new();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("%SystemSingle, 10.0"), "{}", text);
    assert!(text.contains("PUSH,"));
    assert!(text.contains("COPY"));
}

/// S2: `let r: number = 5 + 3;` folds to a constant at compile time
/// (spec §4.E pass 1), so no extern call needs to survive — this also
/// exercises invariant 6 (pure-extern fold whitelist).
#[test]
fn s2_constant_binary_expression_folds() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "r".to_string(),
        type_name: "number".to_string(),
        initializer: Some(Rc::new(Expr::Binary {
            op: "+".to_string(),
            left: Rc::new(Expr::Literal(Literal::Number(5.0), span())),
            right: Rc::new(Expr::Literal(Literal::Number(3.0), span())),
            span: span(),
        })),
        span: span(),
    })])]);

    let catalog = catalog_with_arithmetic();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("8.0"), "{}", text);
    assert!(!text.contains("op_Addition"), "{}", text);
}

/// S3: a conditional introduces at least one `JUMP_IF_FALSE` and at
/// least one label declaration.
#[test]
fn s3_if_statement_emits_conditional_jump_and_label() {
    let program = behaviour(vec![start_method(vec![
        Rc::new(Stmt::VariableDecl {
            name: "x".to_string(),
            type_name: "number".to_string(),
            initializer: Some(Rc::new(Expr::Literal(Literal::Number(10.0), span()))),
            span: span(),
        }),
        Rc::new(Stmt::If {
            test: Rc::new(Expr::Binary {
                op: "<".to_string(),
                left: Rc::new(Expr::Identifier("x".to_string(), span())),
                right: Rc::new(Expr::Literal(Literal::Number(20.0), span())),
                span: span(),
            }),
            consequent: Rc::new(Stmt::Block(
                vec![Rc::new(Stmt::VariableDecl {
                    name: "y".to_string(),
                    type_name: "number".to_string(),
                    initializer: Some(Rc::new(Expr::Literal(Literal::Number(5.0), span()))),
                    span: span(),
                })],
                span(),
            )),
            alternate: None,
            span: span(),
        }),
    ])]);

    let catalog = catalog_with_arithmetic();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("JUMP_IF_FALSE, 0x"), "{}", text);
    assert!(text.contains(":\n"), "{}", text);
}

/// S4: a `true`-initialised boolean lowers to a `null` data entry plus
/// a post-`_start` init sequence using the restricted-type helpers.
#[test]
fn s4_restricted_boolean_initial_value() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "a".to_string(),
        type_name: "boolean".to_string(),
        initializer: Some(Rc::new(Expr::Literal(Literal::Bool(true), span()))),
        span: span(),
    })])]);

    let catalog = StaticCatalog::new();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("%SystemBoolean, null"), "{}", text);
    assert!(text.contains("__asm_restrict_int32_0"), "{}", text);
    assert!(text.contains("op_Equality"), "{}", text);
}

/// Invariant 4: every address literal is exactly `0x` + 8 upper-case
/// hex digits.
#[test]
fn invariant_address_literals_are_ten_characters() {
    let program = behaviour(vec![start_method(vec![
        Rc::new(Stmt::VariableDecl {
            name: "x".to_string(),
            type_name: "number".to_string(),
            initializer: Some(Rc::new(Expr::Literal(Literal::Number(1.0), span()))),
            span: span(),
        }),
        Rc::new(Stmt::If {
            test: Rc::new(Expr::Binary {
                op: "<".to_string(),
                left: Rc::new(Expr::Identifier("x".to_string(), span())),
                right: Rc::new(Expr::Literal(Literal::Number(20.0), span())),
                span: span(),
            }),
            consequent: Rc::new(Stmt::Block(vec![], span())),
            alternate: None,
            span: span(),
        }),
    ])]);

    let catalog = catalog_with_arithmetic();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    for line in text.lines() {
        if let Some(addr) = line.trim().strip_prefix("JUMP_IF_FALSE, ") {
            assert_eq!(addr.len(), 10, "{:?}", addr);
            assert!(addr.starts_with("0x"));
            assert!(addr[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }
}

/// Invariant 3: `.export`/`.sync` lines are emitted iff the data
/// entry's name doesn't start with `__`.
#[test]
fn invariant_internal_names_never_export_or_sync() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "visible".to_string(),
        type_name: "number".to_string(),
        initializer: Some(Rc::new(Expr::Literal(Literal::Number(3.0), span()))),
        span: span(),
    })])]);

    let catalog = StaticCatalog::new();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(".export ").or_else(|| line.strip_prefix(".sync ")) {
            let name = rest.split(',').next().unwrap();
            assert!(!name.starts_with("__"), "{:?} should not export/sync", name);
        }
    }
}

/// S6: a template literal with no interpolated sub-expressions (every
/// part is already known) folds to a single string constant, with no
/// `Concat`-style extern surviving.
#[test]
fn s6_all_literal_template_folds_to_one_string_constant() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "s".to_string(),
        type_name: "string".to_string(),
        initializer: Some(Rc::new(Expr::Template {
            parts: vec!["hi-".to_string(), "".to_string()],
            exprs: vec![Rc::new(Expr::Literal(Literal::Number(1.0), span()))],
            span: span(),
        })),
        span: span(),
    })])]);

    let catalog = StaticCatalog::new();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("\"hi-1\""), "{}", text);
    assert!(!text.contains("Concat"), "{}", text);
}

/// Invariant 2: every jump target the compiler emits resolves to a
/// defined label or a literal address — never the unresolved-label
/// halt fallback, for a program with no dangling references.
#[test]
fn invariant_every_jump_resolves_to_a_real_address() {
    let program = behaviour(vec![start_method(vec![
        Rc::new(Stmt::VariableDecl {
            name: "x".to_string(),
            type_name: "number".to_string(),
            initializer: Some(Rc::new(Expr::Literal(Literal::Number(10.0), span()))),
            span: span(),
        }),
        Rc::new(Stmt::If {
            test: Rc::new(Expr::Binary {
                op: "<".to_string(),
                left: Rc::new(Expr::Identifier("x".to_string(), span())),
                right: Rc::new(Expr::Literal(Literal::Number(20.0), span())),
                span: span(),
            }),
            consequent: Rc::new(Stmt::Block(vec![], span())),
            alternate: None,
            span: span(),
        }),
    ])]);

    let catalog = catalog_with_arithmetic();
    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    let halt = format!("0x{:08X}", udonc::asm::labels::HALT_ADDRESS);
    let mut saw_jump = false;
    for line in text.lines() {
        if let Some(addr) = line.trim().strip_prefix("JUMP_IF_FALSE, ") {
            saw_jump = true;
            assert_ne!(addr, halt, "jump target fell back to the halt address: {}", text);
        }
    }
    assert!(saw_jump, "{}", text);
}

/// Invariant 8: applying the pipeline to equivalent inputs twice over
/// (two separate `compile` calls on the same program) yields the same
/// instruction stream.
/// A method declared recursive gets a depth counter and a per-local
/// shadow `VRCDataList` (spec §4.D "Recursion context"), alongside the
/// usual `__fn_<name>` entry label every method gets (spec §4.D
/// "Call").
#[test]
fn recursive_method_gets_depth_counter_and_shadow_array() {
    let fact = MethodDecl {
        name: "fact".to_string(),
        params: vec![Param { name: "n".to_string(), type_name: "number".to_string() }],
        return_type: "number".to_string(),
        body: Rc::new(Stmt::Block(
            vec![Rc::new(Stmt::Return(Some(Rc::new(Expr::Identifier("n".to_string(), span()))), span()))],
            span(),
        )),
        is_static: true,
        is_recursive: true,
        decorators: vec![],
        span: span(),
    };
    let program = behaviour(vec![start_method(vec![]), fact]);

    let mut catalog = StaticCatalog::new();
    catalog.insert("VRCDataList", "ctor", AccessKind::Ctor, vec![], "VRCDataList", "VRCDataList.__ctor____VRCDataList");
    catalog.insert(
        "VRCDataList",
        "Add",
        AccessKind::Method,
        vec!["VRCDataToken".to_string()],
        "SystemVoid",
        "VRCDataList.__Add__VRCDataToken__SystemVoid",
    );
    catalog.insert("VRCDataList", "Count", AccessKind::Getter, vec![], "SystemInt32", "VRCDataList.__Count____SystemInt32");
    catalog.insert(
        "VRCDataList",
        "Get",
        AccessKind::Method,
        vec!["SystemInt32".to_string()],
        "SystemObject",
        "VRCDataList.__Get__SystemInt32__SystemObject",
    );
    catalog.insert(
        "VRCDataList",
        "RemoveAt",
        AccessKind::Method,
        vec!["SystemInt32".to_string()],
        "SystemVoid",
        "VRCDataList.__RemoveAt__SystemInt32__SystemVoid",
    );
    catalog.insert(
        "VRCDataToken",
        "ctor",
        AccessKind::Ctor,
        vec!["SystemSingle".to_string()],
        "VRCDataToken",
        "VRCDataToken.__ctor__SystemSingle__VRCDataToken",
    );

    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("__recur_depth_fact"), "{}", text);
    assert!(text.contains("__shadow_fact_n"), "{}", text);
    assert!(text.contains("__fn_fact:"), "{}", text);
}

/// A class with a field-change callback but no hand-written
/// `OnDeserialization` gets one synthesised (spec §4.D "Field-change
/// callbacks"), comparing against a shadow `__prev_<prop>` and
/// dispatching the callback on change.
#[test]
fn ondeserialization_is_synthesised_for_callback_properties() {
    let program = Program {
        classes: vec![ClassDecl {
            name: "Scenario".to_string(),
            properties: vec![PropertyDecl {
                name: "health".to_string(),
                type_name: "number".to_string(),
                initializer: None,
                is_serialize_field: true,
                field_change_callback: Some("onHealthChanged".to_string()),
                span: span(),
            }],
            methods: vec![
                start_method(vec![]),
                MethodDecl {
                    name: "onHealthChanged".to_string(),
                    params: vec![],
                    return_type: "void".to_string(),
                    body: Rc::new(Stmt::Block(vec![], span())),
                    is_static: false,
                    is_recursive: false,
                    decorators: vec![],
                    span: span(),
                },
            ],
            is_udon_behaviour: true,
            span: span(),
        }],
        enums: vec![],
    };

    let mut catalog = StaticCatalog::new();
    catalog.insert(
        "VRCUdonUdonBehaviour",
        "health",
        AccessKind::Getter,
        vec![],
        "SystemSingle",
        "VRCUdonUdonBehaviour.__health____SystemSingle",
    );

    let events = StaticEventRegistry::with_builtins();
    let text = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();

    assert!(text.contains("__fn_OnDeserialization:"), "{}", text);
    assert!(text.contains("__prev_health"), "{}", text);
}

#[test]
fn invariant_compilation_is_deterministic() {
    let program = behaviour(vec![start_method(vec![Rc::new(Stmt::VariableDecl {
        name: "x".to_string(),
        type_name: "number".to_string(),
        initializer: Some(Rc::new(Expr::Literal(Literal::Number(42.0), span()))),
        span: span(),
    })])]);

    let catalog = StaticCatalog::new();
    let events = StaticEventRegistry::with_builtins();
    let a = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();
    let b = udonc::compile(&program, &catalog, &events, CompileOptions::default()).unwrap();
    assert_eq!(a, b);
}
