//! Abstract syntax tree for the Vela front-end
//!
//! Two principal sum types, [`Expr`] and [`Stmt`], plus [`TypeExpr`] for
//! parsed type annotations and [`Ty`] for the value-level types the resolver
//! synthesizes. Every expression carries a [`Resolved`] record that the type
//! resolver fills in.
//!
//! Ownership is strictly tree-shaped: a statement list owns its statements,
//! statements own their expressions. Cross-references (a module's class and
//! function tables, a class's constructor/destructor) are indices into the
//! owning vectors, never pointers.

use crate::frontend::lexer::tokens::Token;

/// Implicit numeric conversion recorded by the resolver so a code generator
/// can emit the conversion instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericConversion {
    #[default]
    None,
    IntToFloat,
    FloatToInt,
}

/// Member/method visibility inside a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

// ============================================================================
// Value-level types (synthesized by the resolver)
// ============================================================================

/// A resolved type with qualifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Ty {
    pub kind: TyKind,
    pub is_const: bool,
    pub is_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TyKind {
    Bool,
    Int,
    Float,
    Str,
    Null,
    Class(String),
    List(Box<Ty>),
    Tuple(Vec<Ty>),
    Range { inclusive: bool },
    /// A function or constructor name usable only as a call target.
    Callable(String),
    /// Sentinel produced after a type error; compatible with everything so a
    /// single mistake does not cascade.
    Error,
}

impl Ty {
    pub fn new(kind: TyKind) -> Self {
        Self {
            kind,
            is_const: false,
            is_ref: false,
        }
    }

    pub fn with_flags(kind: TyKind, is_const: bool, is_ref: bool) -> Self {
        Self { kind, is_const, is_ref }
    }

    /// Literal values are constants that are not references.
    pub fn literal(kind: TyKind) -> Self {
        Self {
            kind,
            is_const: true,
            is_ref: false,
        }
    }

    pub fn error() -> Self {
        Self::new(TyKind::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TyKind::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, TyKind::Int | TyKind::Float | TyKind::Error)
    }

    pub fn is_int(&self) -> bool {
        matches!(self.kind, TyKind::Int | TyKind::Error)
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, TyKind::Float)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TyKind::Bool | TyKind::Error)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, TyKind::Null)
    }

    /// Aggregate values are copied on assignment unless bound by reference.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.kind,
            TyKind::Class(_) | TyKind::List(_) | TyKind::Tuple(_) | TyKind::Str
        )
    }

    /// Structural equality, ignoring `const`/`ref` qualifiers. The error
    /// sentinel matches everything.
    pub fn same_base(&self, other: &Ty) -> bool {
        match (&self.kind, &other.kind) {
            (TyKind::Error, _) | (_, TyKind::Error) => true,
            (TyKind::List(a), TyKind::List(b)) => a.same_base(b),
            (TyKind::Tuple(a), TyKind::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same_base(y))
            }
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        if self.is_ref {
            write!(f, "ref ")?;
        }
        match &self.kind {
            TyKind::Bool => write!(f, "bool"),
            TyKind::Int => write!(f, "int"),
            TyKind::Float => write!(f, "float"),
            TyKind::Str => write!(f, "string"),
            TyKind::Null => write!(f, "null"),
            TyKind::Class(name) => write!(f, "{}", name),
            TyKind::List(element) => write!(f, "[{}]", element),
            TyKind::Tuple(elements) => {
                write!(f, "{{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "}}")
            }
            TyKind::Range { inclusive: true } => write!(f, "range (inclusive)"),
            TyKind::Range { inclusive: false } => write!(f, "range"),
            TyKind::Callable(name) => write!(f, "fn '{}'", name),
            TyKind::Error => write!(f, "<error>"),
        }
    }
}

// ============================================================================
// Parsed type annotations
// ============================================================================

/// A type as written in the source, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub is_const: bool,
    pub is_ref: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Primitive(Primitive),
    /// Class name or type alias; resolved later.
    Named(Token),
    List {
        element: Box<TypeExpr>,
        size: Option<Box<Expr>>,
    },
    Tuple(Vec<TypeExpr>),
    /// `typeof expr` — the checked type of the expression, not its value.
    Typeof(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
    Null,
}

// ============================================================================
// Expressions
// ============================================================================

/// Per-expression annotation filled in by the type resolver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolved {
    /// The operator or name token this node answers to in diagnostics.
    pub token: Token,
    /// The checked type; `Some` for every successfully resolved expression.
    pub ty: Option<Ty>,
    /// Referenced function or method name, if this expression names one.
    pub func: Option<String>,
    /// Referenced class, for member accesses, construction, and `this`.
    pub class: Option<String>,
    /// Registry index of the module a scope access resolved into.
    pub module: Option<usize>,
    /// Widening applied to this expression's value at its use site.
    pub conversion: NumericConversion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub resolved: Resolved,
}

impl Expr {
    pub fn new(kind: ExprKind, token: Token) -> Self {
        Self {
            kind,
            resolved: Resolved {
                token,
                ..Resolved::default()
            },
        }
    }

    /// True for expressions that denote a storage location.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Variable { .. } | ExprKind::Get { .. } | ExprKind::Index { .. } | ExprKind::This { .. }
        )
    }
}

/// A call/list/tuple element together with its recorded coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub expr: Expr,
    pub conversion: NumericConversion,
    pub requires_copy: bool,
}

impl Element {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            conversion: NumericConversion::None,
            requires_copy: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `name = value`, including compound forms; the operator token lives in
    /// the resolved record.
    Assign {
        target: Token,
        value: Box<Expr>,
        conversion: NumericConversion,
        requires_copy: bool,
    },
    Binary {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Element>,
        is_native: bool,
    },
    Comma {
        exprs: Vec<Expr>,
    },
    /// Member access `object.name`; `name` may be an integer token for tuple
    /// fields.
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Grouping {
        expr: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    List {
        elements: Vec<Element>,
    },
    /// `object[index] = value`
    ListAssign {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        conversion: NumericConversion,
        requires_copy: bool,
    },
    Literal {
        value: LiteralValue,
    },
    /// Short-circuiting `and` / `or`; the operator token lives in the
    /// resolved record.
    Logical {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `scope::name`
    ScopeAccess {
        scope: Box<Expr>,
        name: Token,
    },
    /// A name directly followed by `::`.
    ScopeName {
        name: Token,
    },
    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
        conversion: NumericConversion,
        requires_copy: bool,
    },
    Super {
        keyword: Token,
        name: Token,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    This {
        keyword: Token,
    },
    Tuple {
        elements: Vec<Element>,
    },
    Unary {
        op: Token,
        operand: Box<Expr>,
    },
    Variable {
        name: Token,
    },
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Break(Token),
    Class(ClassDecl),
    Continue(Token),
    Expression(Expr),
    Function(FunctionDecl),
    If {
        keyword: Token,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
        /// Number of locals in scope above the enclosing function when this
        /// return runs; filled by the resolver for the code generator.
        locals_popped: usize,
        /// Name of the enclosing function; filled by the resolver.
        function: Option<String>,
    },
    Switch {
        condition: Expr,
        cases: Vec<(Expr, Stmt)>,
        default_case: Option<Box<Stmt>>,
    },
    TypeAlias {
        name: Token,
        aliased: TypeExpr,
    },
    Var(VarDecl),
    While {
        keyword: Token,
        /// `None` for loops desugared from a `for` without a condition.
        condition: Option<Expr>,
        body: Box<Stmt>,
    },
}

/// `var | const | ref name [: type] [= initializer]`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub keyword: Token,
    pub name: Token,
    pub declared_type: Option<TypeExpr>,
    pub initializer: Option<Expr>,
    pub conversion: NumericConversion,
    pub requires_copy: bool,
}

/// `fn name(param: type, ...) -> type { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub return_type: TypeExpr,
    pub params: Vec<(Token, TypeExpr)>,
    pub body: Vec<Stmt>,
}

/// `class Name { (visibility member|method)* }`
///
/// `ctor`/`dtor` index into `methods`; a destructor's name is normalized to
/// the class name prefixed with `~`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,
    /// Reserved; no inheritance syntax exists, so this is never populated and
    /// `super` is rejected during resolution.
    pub superclass: Option<Token>,
    pub ctor: Option<usize>,
    pub dtor: Option<usize>,
    pub members: Vec<(VarDecl, Visibility)>,
    pub methods: Vec<(FunctionDecl, Visibility)>,
}
