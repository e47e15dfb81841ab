//! Expression AST nodes

use super::{Span, Spanned, Type};
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    IntLit(i64),
    /// Boolean literal
    BoolLit(bool),
    /// String literal
    StringLit(String),
    /// Unit value `()`
    Unit,

    /// Variable or object reference
    Var(String),

    /// Method receiver
    SelfRef,

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Conditional: if cond { then_branch } else { else_branch }
    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },

    /// Let binding: let name = value; body
    Let {
        name: Spanned<String>,
        ty: Option<Spanned<Type>>,
        value: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    /// Function call or constructor call: `greet(m)`, `Cat("Lucy")`
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// Field access: expr.field
    FieldAccess {
        expr: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },

    /// Method call: expr.method(args)
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// `when` expression
    When {
        scrutinee: Box<Spanned<Expr>>,
        arms: Vec<WhenArm>,
    },
}

/// A single arm in a `when` expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhenArm {
    /// Alternatives joined by `|`. An `else` arm has exactly one `Pattern::Else`.
    pub patterns: Vec<Spanned<Pattern>>,
    pub body: Spanned<Expr>,
    pub span: Span,
}

impl WhenArm {
    pub fn is_else(&self) -> bool {
        self.patterns.iter().any(|p| matches!(p.node, Pattern::Else))
    }
}

/// Pattern for `when` arms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Fallback arm: `else`
    Else,
    /// Type test: `is Cat`
    Is(String),
    /// Literal pattern: 42, "text", true
    Literal(LiteralPattern),
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Else => write!(f, "else"),
            Pattern::Is(class) => write!(f, "is {class}"),
            Pattern::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

/// Literal patterns for `when`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralPattern {
    Int(i64),
    Bool(bool),
    String(String),
}

impl LiteralPattern {
    pub fn ty(&self) -> Type {
        match self {
            LiteralPattern::Int(_) => Type::Int,
            LiteralPattern::Bool(_) => Type::Bool,
            LiteralPattern::String(_) => Type::Str,
        }
    }
}

impl std::fmt::Display for LiteralPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralPattern::Int(n) => write!(f, "{n}"),
            LiteralPattern::Bool(b) => write!(f, "{b}"),
            LiteralPattern::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "not"),
        }
    }
}
