//! Input node model for the Meridian semantic core.
//!
//! The lexer and the tree builder live outside the semantic core; this crate
//! only defines what they hand over:
//!
//! - [`token`]: typed tokens. Expressions travel as token spans that the
//!   evaluator re-parses on demand.
//! - [`types`]: structured type expressions, plus [`parse_type`] for type
//!   syntax embedded in expression tokens (casts, composite literals).
//! - [`stmt`] and [`decl`]: statements and top-level declarations.

pub mod decl;
pub mod stmt;
pub mod token;
pub mod types;

#[cfg(feature = "test-support")]
pub mod testing;

pub use decl::{
    Decl, EnumDecl, EnumItemDecl, FieldDecl, File, FnDecl, ImplDecl, ParamDecl, Receiver,
    StructDecl, TraitDecl, TraitMethodDecl, TypeAliasDecl, UseDecl, UseKind, VarDecl,
};
pub use meridian_core::Span;
pub use stmt::{
    AssignOp, AssignStmt, Block, CondBranch, IfStmt, IterKind, IterStmt, MatchCase, MatchStmt,
    Stmt, StmtKind,
};
pub use token::{Expr, Ident, Op, Token, TokenKind, matching_close, split_top_level};
pub use types::{ArraySizeExpr, FnTypeParam, TypeExpr, TypeExprKind, parse_type, parse_whole};
