//! Declaration nodes.
//!
//! The tree builder hands the semantic core one [`File`] per source file.
//! Function declarations are reference counted because the checker keeps
//! them alive in its definition arena and re-walks generic bodies once per
//! instantiation.

use std::sync::Arc;

use meridian_core::Span;

use crate::stmt::Block;
use crate::token::{Expr, Ident};
use crate::types::TypeExpr;

/// One parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// Path used in diagnostics.
    pub path: String,
    pub decls: Vec<Decl>,
}

impl File {
    pub fn new(path: impl Into<String>, decls: Vec<Decl>) -> Self {
        Self {
            path: path.into(),
            decls,
        }
    }
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Use(UseDecl),
    Fn(Arc<FnDecl>),
    Var(VarDecl),
    Struct(Arc<StructDecl>),
    Trait(TraitDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Impl(ImplDecl),
}

/// `use std::math`, `use std::math::{sin, cos}`, `use std::math::*`
#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub path: Vec<Ident>,
    pub kind: UseKind,
    pub span: Span,
}

impl UseDecl {
    /// Package path with `/` separators, the form sessions register.
    pub fn package_path(&self) -> String {
        self.path
            .iter()
            .map(|id| id.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UseKind {
    /// The last path segment becomes a namespace.
    Namespace,
    /// Every public definition lands in the side table.
    Wildcard,
    /// Listed public definitions are imported by name.
    Select(Vec<Ident>),
}

/// Method receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Receiver {
    /// `&self`
    pub by_ref: bool,
    /// `mut self` / `mut &self`
    pub mutable: bool,
    pub span: Span,
}

/// Function or method declaration. Anonymous functions have an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Ident,
    pub public: bool,
    pub generics: Vec<Ident>,
    pub receiver: Option<Receiver>,
    pub params: Vec<ParamDecl>,
    /// `None` for void.
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

impl FnDecl {
    pub fn is_anonymous(&self) -> bool {
        self.name.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub mutable: bool,
    pub variadic: bool,
    pub default: Option<Expr>,
}

/// Variable declaration, global or local.
///
/// More than one name destructures a tuple-valued initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub names: Vec<Ident>,
    pub public: bool,
    pub mutable: bool,
    pub constant: bool,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Ident,
    pub public: bool,
    pub generics: Vec<Ident>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Ident,
    pub public: bool,
    pub mutable: bool,
    pub ty: TypeExpr,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub name: Ident,
    pub public: bool,
    pub methods: Vec<TraitMethodDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitMethodDecl {
    pub name: Ident,
    pub receiver: Receiver,
    pub params: Vec<ParamDecl>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

/// `enum Color: u8 { Red, Green = 4, Blue }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Ident,
    pub public: bool,
    /// Integer base type, `int` when absent.
    pub base: Option<TypeExpr>,
    pub items: Vec<EnumItemDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumItemDecl {
    pub name: Ident,
    pub value: Option<Expr>,
}

/// `type Name: T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Ident,
    pub public: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `impl S { .. }` or `impl Trait for S { .. }`
#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    pub target: Ident,
    pub trait_name: Option<Ident>,
    pub methods: Vec<Arc<FnDecl>>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_path_joins_segments() {
        let decl = UseDecl {
            path: vec![Ident::new("std", Span::default()), Ident::new("math", Span::default())],
            kind: UseKind::Namespace,
            span: Span::default(),
        };
        assert_eq!(decl.package_path(), "std/math");
    }
}
