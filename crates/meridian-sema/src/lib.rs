//! Meridian semantic core
//!
//! Resolves names, checks types and instantiates generics for a Meridian
//! package graph, then hands back a typed output model for code emission.
//!
//! ## Architecture
//!
//! - **Declaration pass**: every package's top-level names are collected into
//!   the [`Registry`] before any body is looked at.
//! - **Resolution on demand**: signatures, struct layouts and constants are
//!   resolved the first time something refers to them, so declaration order
//!   never matters and cycles are detected as they are walked.
//! - **Bodies**: function bodies are walked once per concrete generic tuple.
//!   Argument and element compatibility checks are queued as leaf checks and
//!   run at the end of each body, optionally on a rayon pool.
//!
//! ## Modules
//!
//! - [`binder`]: argument binding for calls and struct literals
//! - [`control_flow`]: goto, label, break and fallthrough validation
//! - [`conversion`]: assignability, casts and constant range checks
//! - [`defs`]: the definition arena and its typed ids
//! - [`generics`]: instantiation bookkeeping and type inference
//! - [`leaf`]: deferred leaf checks
//! - [`model`]: the typed output model
//! - [`operators`]: unary and binary operator solving with constant folding
//! - [`return_checker`]: "returns on every path" analysis
//! - [`scope`]: block-structured local scopes
//! - [`session`]: packages, options and the diagnostics they produce
//! - [`types`] / [`value`]: canonical types and evaluated values

pub mod binder;
mod checker;
pub mod control_flow;
pub mod conversion;
pub mod defs;
mod expr;
pub mod generics;
pub mod leaf;
pub mod model;
pub mod operators;
pub mod options;
mod resolver;
pub mod return_checker;
pub mod scope;
pub mod session;
mod stmt;
pub mod types;
pub mod value;

pub use binder::{Arg, Bound, BoundArgs, DefaultArg, Param, Strategy, bind};
pub use checker::Builtin;
pub use control_flow::validate;
pub use conversion::{check_assignable, check_castable, check_mutability};
pub use defs::{
    AliasDef, AliasId, DefMeta, Definition, EnumDef, EnumId, FieldDef, FnDef, FnId, GlobalDef,
    GlobalId, PackageId, Registry, ResolveState, StructDef, StructId, TraitDef, TraitId,
    TraitMethod,
};
pub use generics::{Combines, bind_generics, infer};
pub use leaf::{LeafCheck, LeafKind, LeafQueue};
pub use model::{
    CaseModel, CheckedPackage, ExprModel, FnModel, GlobalModel, LoopModel, StmtModel,
};
pub use operators::{precedence, solve_binary, solve_unary};
pub use options::CheckOptions;
pub use return_checker::has_return_path;
pub use session::{PackageState, Session};
pub use types::{ArraySize, Bindings, FnSig, Prim, SigParam, Type, TypeKind};
pub use value::{ConstValue, Value, ValueFlags};

pub use meridian_core::{Diagnostic, Diagnostics, ErrorKey, ErrorSink, SessionError, Severity, Span};
