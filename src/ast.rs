//! The input AST contract (spec §6.1).
//!
//! This module is deliberately a thin data model: the surface-language
//! parser that produces these trees is an external collaborator
//! (spec §1, "deliberately out of scope"). Everything here exists so
//! [`crate::lower`] has something concrete to pattern-match on.

use std::rc::Rc;

/// A location in the original source, carried for diagnostics only.
///
/// Line 0 is reserved for synthetic nodes the lowerer itself creates
/// (inlined callback bodies, synthesized `OnDeserialization` methods);
/// it never points at real source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// 1-based line number, or 0 for synthetic nodes.
    pub line: u32,
    /// 1-based column number, or 0 for synthetic nodes.
    pub column: u32,
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// A parameter in a method or inline-function signature.
#[derive(Clone, Debug)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Textual surface type, fed to [`crate::types::map_surface_type`].
    pub type_name: String,
}

/// A class property declaration.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    /// Property name.
    pub name: String,
    /// Textual surface type.
    pub type_name: String,
    /// Field initializer, if any.
    pub initializer: Option<Rc<Expr>>,
    /// Whether `[SerializeField]`/exported for the Udon inspector.
    pub is_serialize_field: bool,
    /// Name of the field-change callback method, if this property
    /// declares one (spec §4.D "Field-change callbacks").
    pub field_change_callback: Option<String>,
    pub span: SourceSpan,
}

/// A method declaration.
#[derive(Clone, Debug)]
pub struct MethodDecl {
    /// Method name.
    pub name: String,
    /// Formal parameters.
    pub params: Vec<Param>,
    /// Textual surface return type (`"void"` for none).
    pub return_type: String,
    /// Method body.
    pub body: Rc<Stmt>,
    /// Whether the method is declared `static`.
    pub is_static: bool,
    /// Whether the method is declared recursive (spec §4.D "Recursion
    /// context").
    pub is_recursive: bool,
    /// Raw decorator names (e.g. `"SerializeField"`); interpretation
    /// of most decorators other than recursion/export markers belongs
    /// to the external parser, not this compiler.
    pub decorators: Vec<String>,
    pub span: SourceSpan,
}

/// A class declaration — the top-level unit this compiler lowers.
#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: String,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    /// Whether this class is an UdonBehaviour entry point (spec
    /// GLOSSARY). Non-entry classes are only ever inlined.
    pub is_udon_behaviour: bool,
    pub span: SourceSpan,
}

/// An enum declaration; lowers to a set of named integer constants.
#[derive(Clone, Debug)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<(String, Option<i64>)>,
    pub span: SourceSpan,
}

/// The root of a compilation unit.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
    pub enums: Vec<EnumDecl>,
}

/// A literal constant as it appears in the surface language.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    /// Always `Single` unless the surrounding expression form says
    /// otherwise (`BigInt(...)`, an explicit `as bigint`, ...).
    Number(f64),
    BigInt(i64),
    Str(String),
}

/// Expression nodes (spec §6.1).
#[derive(Clone, Debug)]
pub enum Expr {
    Literal(Literal, SourceSpan),
    Identifier(String, SourceSpan),
    This(SourceSpan),
    Super(SourceSpan),
    Binary {
        op: String,
        left: Rc<Expr>,
        right: Rc<Expr>,
        span: SourceSpan,
    },
    Unary {
        op: String,
        operand: Rc<Expr>,
        span: SourceSpan,
    },
    /// `x++`, `--x`, etc. `prefix` distinguishes `++x` from `x++`.
    Update {
        op: String,
        operand: Rc<Expr>,
        prefix: bool,
        span: SourceSpan,
    },
    Conditional {
        test: Rc<Expr>,
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
        span: SourceSpan,
    },
    /// `a ?? b`.
    NullCoalescing {
        left: Rc<Expr>,
        right: Rc<Expr>,
        span: SourceSpan,
    },
    /// `a?.b` / `a?.b()`; `member` is `None` for a bare `a?.()` call form.
    OptionalChaining {
        target: Rc<Expr>,
        member: Option<String>,
        call_args: Option<Vec<Rc<Expr>>>,
        span: SourceSpan,
    },
    /// Adjacent literal parts plus interpolated expressions, in
    /// alternating order starting and ending with (possibly empty)
    /// literal parts: `parts.len() == exprs.len() + 1`.
    Template {
        parts: Vec<String>,
        exprs: Vec<Rc<Expr>>,
        span: SourceSpan,
    },
    ArrayLiteral {
        elements: Vec<Rc<Expr>>,
        span: SourceSpan,
    },
    ObjectLiteral {
        fields: Vec<(String, Rc<Expr>)>,
        span: SourceSpan,
    },
    PropertyAccess {
        target: Rc<Expr>,
        name: String,
        span: SourceSpan,
    },
    ArrayAccess {
        target: Rc<Expr>,
        index: Rc<Expr>,
        span: SourceSpan,
    },
    Call {
        callee: Rc<Expr>,
        args: Vec<Rc<Expr>>,
        span: SourceSpan,
    },
    /// `expr as Type`.
    As {
        expr: Rc<Expr>,
        type_name: String,
        span: SourceSpan,
    },
    Assignment {
        target: Rc<Expr>,
        op: String,
        value: Rc<Expr>,
        span: SourceSpan,
    },
    Delete {
        target: Rc<Expr>,
        span: SourceSpan,
    },
    /// `typeof T` (type-reflection form; spec §4.D, not the JS operator).
    Typeof {
        type_name: String,
        span: SourceSpan,
    },
    Nameof {
        name: String,
        span: SourceSpan,
    },
    /// An inline/arrow function literal, used as a callback argument.
    Function {
        params: Vec<Param>,
        body: Rc<Stmt>,
        /// `None` for an arrow function (lexical `this`).
        this_arg: Option<Rc<Expr>>,
        span: SourceSpan,
    },
    /// `new Foo(args...)`.
    New {
        class_name: String,
        args: Vec<Rc<Expr>>,
        span: SourceSpan,
    },
}

impl Expr {
    pub fn span(&self) -> SourceSpan {
        match self {
            Expr::Literal(_, s)
            | Expr::Identifier(_, s)
            | Expr::This(s)
            | Expr::Super(s)
            | Expr::Binary { span: s, .. }
            | Expr::Unary { span: s, .. }
            | Expr::Update { span: s, .. }
            | Expr::Conditional { span: s, .. }
            | Expr::NullCoalescing { span: s, .. }
            | Expr::OptionalChaining { span: s, .. }
            | Expr::Template { span: s, .. }
            | Expr::ArrayLiteral { span: s, .. }
            | Expr::ObjectLiteral { span: s, .. }
            | Expr::PropertyAccess { span: s, .. }
            | Expr::ArrayAccess { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::As { span: s, .. }
            | Expr::Assignment { span: s, .. }
            | Expr::Delete { span: s, .. }
            | Expr::Typeof { span: s, .. }
            | Expr::Nameof { span: s, .. }
            | Expr::Function { span: s, .. }
            | Expr::New { span: s, .. } => *s,
        }
    }
}

/// A `case`/`default` arm of a `switch`.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    /// `None` for the `default` arm.
    pub test: Option<Rc<Expr>>,
    pub body: Vec<Rc<Stmt>>,
}

/// Statement nodes (spec §6.1).
#[derive(Clone, Debug)]
pub enum Stmt {
    Block(Vec<Rc<Stmt>>, SourceSpan),
    VariableDecl {
        name: String,
        type_name: String,
        initializer: Option<Rc<Expr>>,
        span: SourceSpan,
    },
    Expression(Rc<Expr>, SourceSpan),
    If {
        test: Rc<Expr>,
        consequent: Rc<Stmt>,
        alternate: Option<Rc<Stmt>>,
        span: SourceSpan,
    },
    While {
        test: Rc<Expr>,
        body: Rc<Stmt>,
        span: SourceSpan,
    },
    DoWhile {
        body: Rc<Stmt>,
        test: Rc<Expr>,
        span: SourceSpan,
    },
    For {
        init: Option<Rc<Stmt>>,
        test: Option<Rc<Expr>>,
        update: Option<Rc<Expr>>,
        body: Rc<Stmt>,
        span: SourceSpan,
    },
    ForOf {
        var_name: String,
        iterable: Rc<Expr>,
        body: Rc<Stmt>,
        span: SourceSpan,
    },
    Switch {
        discriminant: Rc<Expr>,
        cases: Vec<SwitchCase>,
        span: SourceSpan,
    },
    Break(SourceSpan),
    Continue(SourceSpan),
    Return(Option<Rc<Expr>>, SourceSpan),
    TryCatch {
        try_block: Rc<Stmt>,
        catch_var: Option<String>,
        catch_block: Rc<Stmt>,
        finally_block: Option<Rc<Stmt>>,
        span: SourceSpan,
    },
    Throw(Rc<Expr>, SourceSpan),
}

impl Stmt {
    pub fn span(&self) -> SourceSpan {
        match self {
            Stmt::Block(_, s)
            | Stmt::VariableDecl { span: s, .. }
            | Stmt::Expression(_, s)
            | Stmt::If { span: s, .. }
            | Stmt::While { span: s, .. }
            | Stmt::DoWhile { span: s, .. }
            | Stmt::For { span: s, .. }
            | Stmt::ForOf { span: s, .. }
            | Stmt::Switch { span: s, .. }
            | Stmt::Break(s)
            | Stmt::Continue(s)
            | Stmt::Return(_, s)
            | Stmt::TryCatch { span: s, .. }
            | Stmt::Throw(_, s) => *s,
        }
    }
}
