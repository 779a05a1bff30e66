//! Generic instantiation.
//!
//! Generic functions and structs are monomorphized on first use. Each
//! definition keeps its [`Combines`]: the concrete type tuples it has been
//! instantiated with. A tuple that is already combined reuses the existing
//! instance, so a generic body is walked once per distinct tuple no matter
//! how many call sites use it.
//!
//! Body walks for new instances are queued as [`PendingBody`] items and
//! drained by the body pass, which keeps instantiation out of the middle of
//! whatever expression triggered it.

use std::sync::Arc;

use meridian_ast::Span;
use meridian_core::{Diagnostic, ErrorKey};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use xxhash_rust::xxh64::Xxh64;

use crate::checker::{Check, Checker};
use crate::defs::{FnId, ResolveState, StructId};
use crate::leaf::LeafKind;
use crate::types::{Bindings, Type, TypeKind};
use crate::value::Value;

// ============================================================================
// Combine memo
// ============================================================================

/// Concrete type tuples a generic definition was instantiated with.
#[derive(Debug, Default, Clone)]
pub struct Combines {
    tuples: Vec<Vec<Type>>,
    by_key: FxHashMap<u64, Vec<usize>>,
}

/// Hash of a tuple's kind strings.
fn combine_key(tuple: &[Type]) -> u64 {
    let mut hasher = Xxh64::new(0);
    for ty in tuple {
        hasher.update(ty.to_string().as_bytes());
        hasher.update(&[0]);
    }
    hasher.digest()
}

impl Combines {
    /// Index of a structurally equal tuple.
    pub fn find(&self, tuple: &[Type]) -> Option<usize> {
        self.by_key
            .get(&combine_key(tuple))?
            .iter()
            .copied()
            .find(|&i| self.tuples[i] == tuple)
    }

    /// Record `tuple`; returns its index and whether it was new.
    pub fn insert(&mut self, tuple: Vec<Type>) -> (usize, bool) {
        if let Some(i) = self.find(&tuple) {
            return (i, false);
        }
        let index = self.tuples.len();
        self.by_key.entry(combine_key(&tuple)).or_default().push(index);
        self.tuples.push(tuple);
        (index, true)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Type]> {
        self.tuples.iter().map(Vec::as_slice)
    }
}

/// Pair generic names with a tuple.
pub fn bind_generics(names: &[Arc<str>], tuple: &[Type]) -> Bindings {
    names.iter().cloned().zip(tuple.iter().cloned()).collect()
}

// ============================================================================
// Inference
// ============================================================================

/// Infer generic bindings by matching `actual` against `pattern`.
///
/// Structural mismatches are left to the assignability check that follows;
/// only conflicting or impossible bindings fail here.
pub fn infer(pattern: &Type, actual: &Type, bindings: &mut Bindings) -> Result<(), ErrorKey> {
    match (&pattern.kind, &actual.kind) {
        (TypeKind::Generic(name), _) => {
            if actual.is_nil() {
                return Err(ErrorKey::NilForAutotype);
            }
            if actual.is_void() {
                return Err(ErrorKey::VoidForAutotype);
            }
            match bindings.get(name) {
                Some(bound) if bound != actual => Err(ErrorKey::DynamicTypeAnnotationFailed),
                Some(_) => Ok(()),
                None => {
                    bindings.insert(name.clone(), actual.clone());
                    Ok(())
                }
            }
        }
        (TypeKind::Ptr(p), TypeKind::Ptr(a))
        | (TypeKind::Ref(p), TypeKind::Ref(a))
        | (TypeKind::Slice(p), TypeKind::Slice(a)) => infer(p, a, bindings),
        (TypeKind::Slice(p), TypeKind::Array { elem, .. }) => infer(p, elem, bindings),
        (TypeKind::Array { elem: p, .. }, TypeKind::Array { elem: a, .. }) => infer(p, a, bindings),
        (TypeKind::Map { key: pk, value: pv }, TypeKind::Map { key: ak, value: av }) => {
            infer(pk, ak, bindings)?;
            infer(pv, av, bindings)
        }
        (TypeKind::Fn(p), TypeKind::Fn(a)) if p.params.len() == a.params.len() => {
            for (pp, ap) in p.params.iter().zip(&a.params) {
                infer(&pp.ty, &ap.ty, bindings)?;
            }
            if p.ret.has_generics() {
                infer(&p.ret, &a.ret, bindings)?;
            }
            Ok(())
        }
        (TypeKind::Struct(p), TypeKind::Struct(a)) if p.id == a.id => {
            for (pg, ag) in p.generics.iter().zip(&a.generics) {
                infer(pg, ag, bindings)?;
            }
            Ok(())
        }
        (TypeKind::Tuple(p), TypeKind::Tuple(a)) if p.len() == a.len() => {
            for (pi, ai) in p.iter().zip(a) {
                infer(pi, ai, bindings)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Instantiation
// ============================================================================

/// A function body waiting to be walked with concrete generics.
#[derive(Debug, Clone)]
pub(crate) struct PendingBody {
    pub fn_id: FnId,
    pub generics: Vec<Type>,
    /// Instantiation nesting of the walk that requested this body.
    pub depth: usize,
}

impl Checker<'_> {
    /// Check a generic argument count against a definition's parameters.
    pub(crate) fn check_generic_arity(
        &mut self,
        name: &str,
        expected: usize,
        given: usize,
        span: Span,
    ) -> Check<()> {
        if expected == 0 && given > 0 {
            return Err(self.report(Diagnostic::new(ErrorKey::NotHasGenerics, span).arg(name)));
        }
        if given > expected {
            return Err(self.report(Diagnostic::new(ErrorKey::GenericsOverflow, span).arg(name)));
        }
        if given < expected {
            return Err(self.report(Diagnostic::new(ErrorKey::MissingGenerics, span).arg(name)));
        }
        Ok(())
    }

    fn check_depth(&mut self, name: &str, span: Span) -> Check<()> {
        if self.depth >= self.opts().max_instantiation_depth {
            return Err(self.report(
                Diagnostic::new(ErrorKey::IllegalCycleInDeclaration, span).arg(name),
            ));
        }
        Ok(())
    }

    /// Record a concrete instance of a generic struct.
    ///
    /// A new tuple queues every method body for a walk with the struct's
    /// generics bound, and the generic field defaults for a check against
    /// the bound field types. Structs whose fields are not resolved yet get
    /// their defaults queued by `ensure_struct` instead.
    pub(crate) fn instantiate_struct(
        &mut self,
        id: StructId,
        tuple: &[Type],
        span: Span,
    ) -> Check<()> {
        if tuple.is_empty() || tuple.iter().any(Type::has_generics) {
            return Ok(());
        }
        let name = self.reg()[id].meta.name.clone();
        let (_, new) = self.reg_mut()[id].combines.insert(tuple.to_vec());
        if !new {
            trace!(name = %name, "struct instance reused");
            return Ok(());
        }
        self.check_depth(&name, span)?;
        debug!(name = %name, generics = tuple.len(), "instantiating struct");
        if self.reg()[id].state == ResolveState::Done {
            self.queue_generic_defaults(id, tuple);
        }
        let mut methods: Vec<FnId> = self.reg()[id].methods.values().copied().collect();
        methods.sort();
        for method in methods {
            self.instantiate_fn(method, tuple.to_vec(), span)?;
        }
        Ok(())
    }

    /// Queue the defaults of fields typed by generics, substituted with
    /// `tuple`.
    pub(crate) fn queue_generic_defaults(&mut self, id: StructId, tuple: &[Type]) {
        let def = &self.reg()[id];
        let bindings = bind_generics(&def.generics, tuple);
        let (pkg, file) = (def.meta.package, def.meta.file);
        let checks: Vec<(Type, Value, Span)> = def
            .fields
            .iter()
            .filter(|f| f.ty.has_generics())
            .filter_map(|f| {
                let default = f.default_value.as_ref()?;
                let span = f.default.as_ref()?.span;
                let mut value = default.value.clone();
                value.ty = value.ty.substitute(&bindings);
                Some((f.ty.substitute(&bindings), value, span))
            })
            .collect();
        if checks.is_empty() {
            return;
        }
        trace!(struct_id = ?id, count = checks.len(), "queueing generic field defaults");
        self.in_def_context(pkg, file, |c| {
            for (target, value, span) in checks {
                c.queue_leaf(LeafKind::FieldDefault, target, value, span);
            }
        });
    }

    /// Record a concrete instance of a generic function, queueing its body
    /// the first time the tuple is seen.
    pub(crate) fn instantiate_fn(&mut self, id: FnId, tuple: Vec<Type>, span: Span) -> Check<()> {
        if tuple.is_empty() || tuple.iter().any(Type::has_generics) {
            return Ok(());
        }
        let name = self.reg()[id].meta.name.clone();
        let (_, new) = self.reg_mut()[id].combines.insert(tuple.clone());
        if !new {
            trace!(name = %name, "function instance reused");
            return Ok(());
        }
        self.check_depth(&name, span)?;
        debug!(name = %name, "queueing generic instance");
        self.pending.push_back(PendingBody {
            fn_id: id,
            generics: tuple,
            depth: self.depth + 1,
        });
        Ok(())
    }

    /// Report structs that contain themselves by value.
    pub(crate) fn check_struct_cycles(&mut self, ids: &[StructId]) {
        for &id in ids {
            let def = &self.reg()[id];
            let start = Type::from(TypeKind::Struct(crate::types::StructRef {
                id,
                name: Arc::from(def.meta.name.as_str()),
                generics: def.generics.iter().map(|g| Type::generic(g.clone())).collect(),
            }));
            let mut path = Vec::new();
            if self.contains_by_value(id, &start, &mut path) {
                let (name, span) = (def.meta.name.clone(), def.meta.span);
                self.report(Diagnostic::new(ErrorKey::IllegalCycleInDeclaration, span).arg(name));
            }
        }
    }

    fn contains_by_value(&self, start: StructId, ty: &Type, path: &mut Vec<StructId>) -> bool {
        match &ty.kind {
            TypeKind::Struct(s) => {
                if path.contains(&s.id) {
                    return s.id == start;
                }
                let def = &self.reg()[s.id];
                let bindings = bind_generics(&def.generics, &s.generics);
                path.push(s.id);
                let found = def
                    .fields
                    .iter()
                    .any(|f| self.contains_by_value(start, &f.ty.substitute(&bindings), path));
                path.pop();
                found
            }
            TypeKind::Array { elem, .. } => self.contains_by_value(start, elem, path),
            TypeKind::Tuple(items) => items.iter().any(|t| self.contains_by_value(start, t, path)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FnSig, Prim, SigParam};

    fn t(name: &str) -> Type {
        Type::generic(name)
    }

    #[test]
    fn combines_reuse_equal_tuples() {
        let mut combines = Combines::default();
        assert_eq!(combines.insert(vec![Type::int(), Type::str()]), (0, true));
        assert_eq!(combines.insert(vec![Type::int(), Type::bool()]), (1, true));
        assert_eq!(combines.insert(vec![Type::int(), Type::str()]), (0, false));
        assert_eq!(combines.len(), 2);
        assert_eq!(combines.find(&[Type::int(), Type::bool()]), Some(1));
        assert_eq!(combines.find(&[Type::bool()]), None);
    }

    #[test]
    fn infers_through_containers() {
        let mut b = Bindings::default();
        let pattern = Type::map(t("K"), Type::slice(t("V")));
        let actual = Type::map(Type::str(), Type::slice(Type::prim(Prim::U8)));
        infer(&pattern, &actual, &mut b).unwrap();
        assert_eq!(b.get("K"), Some(&Type::str()));
        assert_eq!(b.get("V"), Some(&Type::prim(Prim::U8)));
    }

    #[test]
    fn infers_through_function_types() {
        let mut b = Bindings::default();
        let pattern = Type::func(FnSig {
            params: vec![SigParam {
                ty: t("T"),
                mutable: false,
                variadic: false,
            }],
            ret: t("R"),
        });
        let actual = Type::func(FnSig {
            params: vec![SigParam {
                ty: Type::int(),
                mutable: false,
                variadic: false,
            }],
            ret: Type::bool(),
        });
        infer(&pattern, &actual, &mut b).unwrap();
        assert_eq!(b.get("R"), Some(&Type::bool()));
    }

    #[test]
    fn conflicting_bindings_fail() {
        let mut b = Bindings::default();
        infer(&t("T"), &Type::int(), &mut b).unwrap();
        assert_eq!(
            infer(&t("T"), &Type::str(), &mut b),
            Err(ErrorKey::DynamicTypeAnnotationFailed)
        );
        assert_eq!(infer(&t("U"), &Type::nil(), &mut b), Err(ErrorKey::NilForAutotype));
    }

    #[test]
    fn array_feeds_slice_pattern() {
        let mut b = Bindings::default();
        let actual = Type::array(Type::int(), crate::types::ArraySize::Fixed(2));
        infer(&Type::slice(t("T")), &actual, &mut b).unwrap();
        assert_eq!(b.get("T"), Some(&Type::int()));
    }
}
