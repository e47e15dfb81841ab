//! Abstract Syntax Tree definitions

mod expr;
mod span;
mod types;

pub use expr::*;
pub use span::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A program is a sequence of top-level items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Module(ModuleDef),
    ClassDef(ClassDef),
    FnDef(FnDef),
}

/// Module block: `module zoo { ... }`. Each source file is also wrapped in one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: Spanned<String>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// What other classes may do with a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    /// `class` - cannot be extended
    Final,
    /// `open class` - extendable from any module
    Open,
    /// `abstract class` - extendable from any module, not instantiable
    Abstract,
    /// `sealed class` - abstract, direct subclasses only in its own module
    Sealed,
    /// `object` - final singleton
    Object,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClassKind::Final => "class",
            ClassKind::Open => "open class",
            ClassKind::Abstract => "abstract class",
            ClassKind::Sealed => "sealed class",
            ClassKind::Object => "object",
        }
    }

    /// Can another class name this one as its supertype?
    pub fn is_extendable(self) -> bool {
        matches!(self, ClassKind::Open | ClassKind::Abstract | ClassKind::Sealed)
    }

    /// May declare abstract methods and cannot be constructed
    pub fn is_abstract(self) -> bool {
        matches!(self, ClassKind::Abstract | ClassKind::Sealed)
    }
}

/// Class or object declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub kind: ClassKind,
    pub name: Spanned<String>,
    /// Constructor parameters
    pub params: Vec<Param>,
    pub parent: Option<SuperCall>,
    pub methods: Vec<MethodDef>,
    pub span: Span,
}

/// Supertype with its constructor arguments: `: Mammal(name)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperCall {
    pub name: Spanned<String>,
    pub args: Vec<Spanned<Expr>>,
    pub span: Span,
}

/// Method declared in a class body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub is_override: bool,
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub ret_ty: Spanned<Type>,
    /// `None` for abstract methods
    pub body: Option<Spanned<Expr>>,
    pub span: Span,
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDef {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub ret_ty: Spanned<Type>,
    pub body: Spanned<Expr>,
    pub span: Span,
}

/// Function, method or constructor parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<Type>,
}
