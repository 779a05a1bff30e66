//! Definition arena.
//!
//! Every package-level definition lives in one [`Registry`] owned by the
//! session and is addressed by a typed index. Struct definitions refer to
//! each other only through [`StructId`], which keeps cycle detection a plain
//! visited-set walk over indices.

use std::ops::{Index, IndexMut};
use std::sync::Arc;

use meridian_ast::{EnumDecl, Expr, FnDecl, Span, StructDecl, TraitDecl, TypeExpr, VarDecl};
use rustc_hash::FxHashMap;

use crate::binder::{DefaultArg, Param};
use crate::generics::Combines;
use crate::model::ExprModel;
use crate::types::{FnSig, Prim, Type};
use crate::value::ConstValue;

macro_rules! define_ids {
    ($($(#[$doc:meta])* $name:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub(crate) u32);

            impl $name {
                #[inline]
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

define_ids! {
    /// Index of a package in the session.
    PackageId;
    StructId;
    TraitId;
    EnumId;
    FnId;
    GlobalId;
    AliasId;
}

/// What an identifier in a definition table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Definition {
    Global(GlobalId),
    Fn(FnId),
    Struct(StructId),
    Trait(TraitId),
    Enum(EnumId),
    Alias(AliasId),
    Namespace(PackageId),
}

impl Definition {
    /// Whether the definition names a type.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Definition::Struct(_)
                | Definition::Trait(_)
                | Definition::Enum(_)
                | Definition::Alias(_)
        )
    }
}

/// Lazy resolution progress, used to catch declarations that depend on
/// themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveState {
    #[default]
    Pending,
    Resolving,
    Done,
    Failed,
}

/// Data every definition carries.
#[derive(Debug, Clone)]
pub struct DefMeta {
    pub name: String,
    pub public: bool,
    pub package: PackageId,
    /// Index of the declaring file within its package.
    pub file: usize,
    pub span: Span,
    /// Set when a lookup resolves to this definition.
    pub used: bool,
}

impl DefMeta {
    pub fn new(
        name: impl Into<String>,
        public: bool,
        package: PackageId,
        file: usize,
        span: Span,
    ) -> Self {
        Self {
            name: name.into(),
            public,
            package,
            file,
            span,
            used: false,
        }
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// A function or method.
#[derive(Debug, Clone)]
pub struct FnDef {
    pub meta: DefMeta,
    pub decl: Arc<FnDecl>,
    /// Struct owning this method.
    pub owner: Option<StructId>,
    /// Generic parameter names: the function's own, or the owner's for
    /// methods of a generic struct.
    pub generics: Vec<Arc<str>>,
    /// Resolved parameters; generic placeholders stay unbound.
    pub params: Vec<Param>,
    pub ret: Type,
    pub state: ResolveState,
    /// Concrete tuples this function has been instantiated with.
    pub combines: Combines,
    /// Number of times the body has been walked.
    pub body_checks: usize,
    pub checked: bool,
}

impl FnDef {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn is_method(&self) -> bool {
        self.owner.is_some()
    }

    /// `&self` receiver.
    pub fn by_ref(&self) -> bool {
        self.decl.receiver.is_some_and(|r| r.by_ref)
    }

    /// Signature without the receiver.
    pub fn sig(&self) -> FnSig {
        FnSig {
            params: self.params.iter().map(Param::sig_param).collect(),
            ret: self.ret.clone(),
        }
    }
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub public: bool,
    pub mutable: bool,
    /// May mention the struct's generic placeholders.
    pub ty: Type,
    pub default: Option<Expr>,
    /// Evaluated default; fields without one are zero-initialized.
    pub default_value: Option<DefaultArg>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub meta: DefMeta,
    pub decl: Arc<StructDecl>,
    pub generics: Vec<Arc<str>>,
    pub fields: Vec<FieldDef>,
    pub methods: FxHashMap<String, FnId>,
    pub implements: Vec<TraitId>,
    pub state: ResolveState,
    pub combines: Combines,
    pub checked: bool,
}

impl StructDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }
}

/// A trait method requirement.
#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: String,
    pub by_ref: bool,
    pub sig: FnSig,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TraitDef {
    pub meta: DefMeta,
    pub decl: TraitDecl,
    pub methods: Vec<TraitMethod>,
    pub state: ResolveState,
}

impl TraitDef {
    /// Values of this trait must be references when any method takes `&self`.
    pub fn has_ref_method(&self) -> bool {
        self.methods.iter().any(|m| m.by_ref)
    }

    pub fn method(&self, name: &str) -> Option<&TraitMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub meta: DefMeta,
    pub decl: EnumDecl,
    pub base: Prim,
    pub items: Vec<(String, i128)>,
    pub state: ResolveState,
}

impl EnumDef {
    pub fn item(&self, name: &str) -> Option<i128> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// One name of a top-level variable declaration.
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub meta: DefMeta,
    pub decl: Arc<VarDecl>,
    pub ty: Option<Type>,
    pub constant: Option<ConstValue>,
    /// `const` holding a literal that still adapts to the type it meets.
    pub untyped: bool,
    pub init: Option<ExprModel>,
    pub state: ResolveState,
}

impl GlobalDef {
    pub fn is_const(&self) -> bool {
        self.decl.constant
    }

    pub fn is_mutable(&self) -> bool {
        self.decl.mutable
    }
}

#[derive(Debug, Clone)]
pub struct AliasDef {
    pub meta: DefMeta,
    pub ty_expr: TypeExpr,
    pub ty: Option<Type>,
    pub state: ResolveState,
}

// ============================================================================
// Registry
// ============================================================================

/// Arena of every definition in a session.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    pub(crate) fns: Vec<FnDef>,
    pub(crate) structs: Vec<StructDef>,
    pub(crate) traits: Vec<TraitDef>,
    pub(crate) enums: Vec<EnumDef>,
    pub(crate) globals: Vec<GlobalDef>,
    pub(crate) aliases: Vec<AliasDef>,
}

macro_rules! arena {
    ($field:ident, $id:ident, $def:ident, $add:ident) => {
        impl Registry {
            pub(crate) fn $add(&mut self, def: $def) -> $id {
                self.$field.push(def);
                $id((self.$field.len() - 1) as u32)
            }
        }

        impl Index<$id> for Registry {
            type Output = $def;

            fn index(&self, id: $id) -> &$def {
                &self.$field[id.index()]
            }
        }

        impl IndexMut<$id> for Registry {
            fn index_mut(&mut self, id: $id) -> &mut $def {
                &mut self.$field[id.index()]
            }
        }
    };
}

arena!(fns, FnId, FnDef, add_fn);
arena!(structs, StructId, StructDef, add_struct);
arena!(traits, TraitId, TraitDef, add_trait);
arena!(enums, EnumId, EnumDef, add_enum);
arena!(globals, GlobalId, GlobalDef, add_global);
arena!(aliases, AliasId, AliasDef, add_alias);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Common data of a definition. Namespaces have none.
    pub fn meta(&self, def: Definition) -> Option<&DefMeta> {
        Some(match def {
            Definition::Global(id) => &self[id].meta,
            Definition::Fn(id) => &self[id].meta,
            Definition::Struct(id) => &self[id].meta,
            Definition::Trait(id) => &self[id].meta,
            Definition::Enum(id) => &self[id].meta,
            Definition::Alias(id) => &self[id].meta,
            Definition::Namespace(_) => return None,
        })
    }

    pub fn meta_mut(&mut self, def: Definition) -> Option<&mut DefMeta> {
        Some(match def {
            Definition::Global(id) => &mut self[id].meta,
            Definition::Fn(id) => &mut self[id].meta,
            Definition::Struct(id) => &mut self[id].meta,
            Definition::Trait(id) => &mut self[id].meta,
            Definition::Enum(id) => &mut self[id].meta,
            Definition::Alias(id) => &mut self[id].meta,
            Definition::Namespace(_) => return None,
        })
    }

    pub fn mark_used(&mut self, def: Definition) {
        if let Some(meta) = self.meta_mut(def) {
            meta.used = true;
        }
    }

    /// Free function named `name` in `package`.
    pub fn find_fn(&self, package: PackageId, name: &str) -> Option<&FnDef> {
        self.fns
            .iter()
            .find(|f| f.owner.is_none() && f.meta.package == package && f.meta.name == name)
    }

    /// Method `name` of the struct named `owner` in `package`.
    pub fn find_method(&self, package: PackageId, owner: &str, name: &str) -> Option<&FnDef> {
        let owner = self.find_struct(package, owner)?;
        owner.methods.get(name).map(|id| &self[*id])
    }

    pub fn find_struct(&self, package: PackageId, name: &str) -> Option<&StructDef> {
        self.structs
            .iter()
            .find(|s| s.meta.package == package && s.meta.name == name)
    }

    pub fn find_global(&self, package: PackageId, name: &str) -> Option<&GlobalDef> {
        self.globals
            .iter()
            .find(|g| g.meta.package == package && g.meta.name == name)
    }

    pub fn find_enum(&self, package: PackageId, name: &str) -> Option<&EnumDef> {
        self.enums
            .iter()
            .find(|e| e.meta.package == package && e.meta.name == name)
    }

    /// Whether the struct implements the trait.
    pub fn implements(&self, s: StructId, t: TraitId) -> bool {
        self[s].implements.contains(&t)
    }

    pub fn fn_count(&self) -> usize {
        self.fns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> DefMeta {
        DefMeta::new(name, true, PackageId(0), 0, Span::default())
    }

    fn alias(name: &str) -> AliasDef {
        AliasDef {
            meta: meta(name),
            ty_expr: TypeExpr::named("int", Span::default()),
            ty: None,
            state: ResolveState::Pending,
        }
    }

    #[test]
    fn ids_index_their_arena() {
        let mut reg = Registry::new();
        let a = reg.add_alias(alias("A"));
        let b = reg.add_alias(alias("B"));
        assert_eq!(a.index(), 0);
        assert_eq!(reg[b].meta.name, "B");
    }

    #[test]
    fn mark_used_sets_flag() {
        let mut reg = Registry::new();
        let id = reg.add_alias(alias("A"));
        assert!(!reg[id].meta.used);
        reg.mark_used(Definition::Alias(id));
        assert!(reg[id].meta.used);
        reg.mark_used(Definition::Namespace(PackageId(0)));
    }

    #[test]
    fn type_definitions() {
        assert!(Definition::Alias(AliasId(0)).is_type());
        assert!(!Definition::Fn(FnId(0)).is_type());
    }
}
