//! Registration, imports and declarations.
//!
//! Registration only records names, so declarations may refer to each
//! other in any order. Everything that needs resolved types (struct fields,
//! signatures, enum values, global initializers) is resolved lazily through
//! the `ensure_*` functions, which track [`ResolveState`] to turn
//! self-dependence into `illegal_cycle_in_declaration`.

use std::sync::Arc;

use meridian_ast::{Decl, FnDecl, Ident, ImplDecl, ParamDecl, Span, TypeExpr, UseDecl, UseKind};
use meridian_core::{Diagnostic, ErrorKey};
use tracing::{debug, trace};

use crate::binder::{DefaultArg, Param};
use crate::checker::{Check, Checker, Reported, Resolved};
use crate::conversion::range;
use crate::defs::{
    AliasDef, AliasId, DefMeta, Definition, EnumDef, EnumId, FieldDef, FnDef, FnId, GlobalDef,
    GlobalId, PackageId, ResolveState, StructDef, StructId, TraitDef, TraitId, TraitMethod,
};
use crate::generics::Combines;
use crate::leaf::LeafKind;
use crate::model::GlobalModel;
use crate::scope::LocalKind;
use crate::session::PackageState;
use crate::types::{FnSig, Prim, Type};
use crate::value::ConstValue;

/// An `impl Trait for S` block waiting for its conformance check.
#[derive(Debug, Clone)]
pub(crate) struct TraitImpl {
    target: StructId,
    trait_name: Ident,
    file: usize,
    span: Span,
}

pub(super) fn owned_by<T>(items: &[T], pkg: PackageId, meta: impl Fn(&T) -> &DefMeta) -> Vec<u32> {
    items
        .iter()
        .enumerate()
        .filter(|(_, def)| meta(def).package == pkg)
        .map(|(i, _)| i as u32)
        .collect()
}

impl Checker<'_> {
    // ========================================================================
    // Registration
    // ========================================================================

    /// Fail with `exist_id` when `ident` is already defined in the package.
    fn check_free(&mut self, ident: &Ident) -> Check<()> {
        if self.session.packages[self.pkg.index()].defs.contains_key(&ident.name) {
            return self.fail(Diagnostic::new(ErrorKey::ExistId, ident.span).arg(&ident.name));
        }
        Ok(())
    }

    fn define(&mut self, ident: &Ident, def: Definition) {
        self.session.packages[self.pkg.index()]
            .defs
            .insert(ident.name.clone(), def);
    }

    fn def_meta(&self, ident: &Ident, public: bool) -> DefMeta {
        DefMeta::new(ident.name.clone(), public, self.pkg, self.file, ident.span)
    }

    fn new_fn(
        &self,
        decl: &Arc<FnDecl>,
        owner: Option<StructId>,
        generics: Vec<Arc<str>>,
    ) -> FnDef {
        FnDef {
            meta: self.def_meta(&decl.name, decl.public),
            decl: decl.clone(),
            owner,
            generics,
            params: Vec::new(),
            ret: Type::void(),
            state: ResolveState::Pending,
            combines: Combines::default(),
            body_checks: 0,
            checked: false,
        }
    }

    /// Record every top-level name, then attach `impl` methods to their
    /// structs. Returns the trait implementations to verify later.
    pub(super) fn register(&mut self) -> Vec<TraitImpl> {
        let files = self.session.packages[self.pkg.index()].files.clone();
        let mut impls = Vec::new();
        for (index, file) in files.iter().enumerate() {
            self.file = index;
            for decl in &file.decls {
                match decl {
                    Decl::Use(_) => {}
                    Decl::Impl(imp) => impls.push((index, imp.clone())),
                    _ => {
                        let _ = self.register_decl(decl);
                    }
                }
            }
        }

        let mut trait_impls = Vec::new();
        for (index, imp) in impls {
            self.file = index;
            if let Ok(Some(t)) = self.register_impl(&imp) {
                trait_impls.push(t);
            }
        }
        self.file = 0;
        trait_impls
    }

    fn register_decl(&mut self, decl: &Decl) -> Check<()> {
        match decl {
            Decl::Fn(f) => {
                self.check_free(&f.name)?;
                let generics = f.generics.iter().map(|g| Arc::from(g.name.as_str())).collect();
                let def = self.new_fn(f, None, generics);
                let id = self.reg_mut().add_fn(def);
                self.define(&f.name, Definition::Fn(id));
            }
            Decl::Var(v) => {
                let decl = Arc::new(v.clone());
                for name in v.names.iter().filter(|n| !n.is_blank()) {
                    if self.check_free(name).is_err() {
                        continue;
                    }
                    let meta = self.def_meta(name, v.public);
                    let id = self.reg_mut().add_global(GlobalDef {
                        meta,
                        decl: decl.clone(),
                        ty: None,
                        constant: None,
                        untyped: false,
                        init: None,
                        state: ResolveState::Pending,
                    });
                    self.define(name, Definition::Global(id));
                }
            }
            Decl::Struct(s) => {
                self.check_free(&s.name)?;
                let meta = self.def_meta(&s.name, s.public);
                let id = self.reg_mut().add_struct(StructDef {
                    meta,
                    decl: s.clone(),
                    generics: s.generics.iter().map(|g| Arc::from(g.name.as_str())).collect(),
                    fields: Vec::new(),
                    methods: Default::default(),
                    implements: Vec::new(),
                    state: ResolveState::Pending,
                    combines: Combines::default(),
                    checked: false,
                });
                self.define(&s.name, Definition::Struct(id));
            }
            Decl::Trait(t) => {
                self.check_free(&t.name)?;
                let meta = self.def_meta(&t.name, t.public);
                let id = self.reg_mut().add_trait(TraitDef {
                    meta,
                    decl: t.clone(),
                    methods: Vec::new(),
                    state: ResolveState::Pending,
                });
                self.define(&t.name, Definition::Trait(id));
            }
            Decl::Enum(e) => {
                self.check_free(&e.name)?;
                let meta = self.def_meta(&e.name, e.public);
                let id = self.reg_mut().add_enum(EnumDef {
                    meta,
                    decl: e.clone(),
                    base: Prim::Int,
                    items: Vec::new(),
                    state: ResolveState::Pending,
                });
                self.define(&e.name, Definition::Enum(id));
            }
            Decl::TypeAlias(a) => {
                self.check_free(&a.name)?;
                let meta = self.def_meta(&a.name, a.public);
                let id = self.reg_mut().add_alias(AliasDef {
                    meta,
                    ty_expr: a.ty.clone(),
                    ty: None,
                    state: ResolveState::Pending,
                });
                self.define(&a.name, Definition::Alias(id));
            }
            Decl::Use(_) | Decl::Impl(_) => {}
        }
        Ok(())
    }

    fn register_impl(&mut self, imp: &ImplDecl) -> Check<Option<TraitImpl>> {
        let target = match self.session.packages[self.pkg.index()].defs.get(&imp.target.name) {
            Some(Definition::Struct(id)) => *id,
            Some(_) => {
                return self.fail(
                    Diagnostic::new(ErrorKey::NotType, imp.target.span).arg(&imp.target.name),
                );
            }
            None => {
                return self.fail(
                    Diagnostic::new(ErrorKey::IdNotExist, imp.target.span).arg(&imp.target.name),
                );
            }
        };
        let generics = self.reg()[target].generics.clone();
        for method in &imp.methods {
            let name = &method.name;
            if !method.generics.is_empty() {
                self.report(Diagnostic::new(ErrorKey::NotHasGenerics, name.span).arg(&name.name));
                continue;
            }
            let def = &self.reg()[target];
            let taken = def.methods.contains_key(&name.name)
                || def.decl.fields.iter().any(|f| f.name.name == name.name);
            if taken {
                self.report(Diagnostic::new(ErrorKey::ExistId, name.span).arg(&name.name));
                continue;
            }
            let def = self.new_fn(method, Some(target), generics.clone());
            let id = self.reg_mut().add_fn(def);
            self.reg_mut()[target].methods.insert(name.name.clone(), id);
        }
        Ok(imp.trait_name.clone().map(|trait_name| TraitImpl {
            target,
            trait_name,
            file: self.file,
            span: imp.span,
        }))
    }

    // ========================================================================
    // Imports
    // ========================================================================

    pub(super) fn import(&mut self) {
        let files = self.session.packages[self.pkg.index()].files.clone();
        for (index, file) in files.iter().enumerate() {
            self.file = index;
            for decl in &file.decls {
                if let Decl::Use(u) = decl {
                    let _ = self.import_use(u);
                }
            }
        }
        self.file = 0;
    }

    fn import_use(&mut self, decl: &UseDecl) -> Check<()> {
        let path = decl.package_path();
        let Some(dep) = self.session.package_id(&path) else {
            return self.fail(Diagnostic::new(ErrorKey::UseNotFound, decl.span).arg(path));
        };
        if dep == self.pkg || self.session.check_package(dep) == PackageState::Checking {
            return self.fail(Diagnostic::new(ErrorKey::IllegalImportCycle, decl.span).arg(path));
        }
        trace!(package = %path, "importing");

        match &decl.kind {
            UseKind::Namespace => {
                let Some(last) = decl.path.last() else {
                    return self.fail(
                        Diagnostic::new(ErrorKey::InvalidSyntax, decl.span).arg("use"),
                    );
                };
                self.import_name(last, Definition::Namespace(dep))
            }
            UseKind::Select(names) => {
                for name in names {
                    let Ok(def) = self.namespace_member(dep, &name.name, name.span) else {
                        continue;
                    };
                    let _ = self.import_name(name, def);
                }
                Ok(())
            }
            UseKind::Wildcard => {
                let mut public: Vec<(String, Definition)> = self.session.packages[dep.index()]
                    .defs
                    .iter()
                    .filter(|(_, def)| self.reg().meta(**def).is_some_and(|m| m.public))
                    .map(|(name, def)| (name.clone(), *def))
                    .collect();
                public.sort_by(|a, b| a.0.cmp(&b.0));
                for (name, def) in public {
                    let side = &mut self.session.packages[self.pkg.index()].scopes[self.file].side;
                    match side.get(&name).copied() {
                        Some(existing) if existing != def => {
                            self.report(
                                Diagnostic::new(ErrorKey::AmbiguousSideId, decl.span).arg(name),
                            );
                        }
                        Some(_) => {}
                        None => {
                            side.insert(name, def);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn import_name(&mut self, ident: &Ident, def: Definition) -> Check<()> {
        let package = &mut self.session.packages[self.pkg.index()];
        let scope = &mut package.scopes[self.file];
        if package.defs.contains_key(&ident.name) || scope.imports.contains_key(&ident.name) {
            return self.fail(Diagnostic::new(ErrorKey::ExistId, ident.span).arg(&ident.name));
        }
        scope.imports.insert(ident.name.clone(), def);
        Ok(())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Resolve every declaration of the package, in dependency-friendly
    /// order, then verify trait implementations and struct layouts.
    pub(super) fn declare(&mut self, trait_impls: Vec<TraitImpl>) {
        let pkg = self.pkg;
        let reg = self.reg();
        let aliases = owned_by(&reg.aliases, pkg, |d| &d.meta);
        let enums = owned_by(&reg.enums, pkg, |d| &d.meta);
        let traits = owned_by(&reg.traits, pkg, |d| &d.meta);
        let structs = owned_by(&reg.structs, pkg, |d| &d.meta);
        let fns = owned_by(&reg.fns, pkg, |d| &d.meta);
        let globals = owned_by(&reg.globals, pkg, |d| &d.meta);

        for id in aliases {
            let _ = self.ensure_alias(AliasId(id));
        }
        for id in enums {
            let _ = self.ensure_enum(EnumId(id));
        }
        for id in traits {
            let _ = self.ensure_trait(TraitId(id));
        }
        let structs: Vec<StructId> = structs.into_iter().map(StructId).collect();
        for &id in &structs {
            let _ = self.ensure_struct(id);
        }
        for id in fns {
            let _ = self.ensure_fn(FnId(id));
        }
        for imp in trait_impls {
            let _ = self.check_trait_impl(&imp);
        }
        for id in &globals {
            let _ = self.ensure_global(GlobalId(*id));
        }
        self.emit_globals(&globals);
        self.check_struct_cycles(&structs);
        debug!(structs = structs.len(), "declarations resolved");
    }

    fn emit_globals(&mut self, ids: &[u32]) {
        let mut out = Vec::new();
        for &id in ids {
            let g = &self.reg()[GlobalId(id)];
            let Some(ty) = &g.ty else {
                continue;
            };
            out.push(GlobalModel {
                name: g.meta.name.clone(),
                ty: ty.to_string(),
                init: g.init.clone(),
                constant: g.is_const(),
            });
        }
        self.session.packages[self.pkg.index()].output.globals.extend(out);
    }

    /// Common state handling of the lazy resolvers.
    ///
    /// Returns `Ok(true)` when resolution should proceed.
    fn enter(&mut self, state: ResolveState, name: &str, span: Span) -> Check<bool> {
        match state {
            ResolveState::Pending => Ok(true),
            ResolveState::Done => Ok(false),
            ResolveState::Failed => Err(Reported),
            ResolveState::Resolving => {
                self.fail(Diagnostic::new(ErrorKey::IllegalCycleInDeclaration, span).arg(name))
            }
        }
    }

    /// Declare generic placeholders of a definition in the current scope.
    fn declare_placeholders(&mut self, names: &[Arc<str>], span: Span) {
        self.scope.push_scope();
        for name in names {
            let _ = self
                .scope
                .declare(name, LocalKind::Generic(Type::generic(name.clone())), span);
        }
    }

    // ------------------------------------------------------------------------
    // Enums
    // ------------------------------------------------------------------------

    pub(crate) fn ensure_enum(&mut self, id: EnumId) -> Check<()> {
        let def = &self.reg()[id];
        let (name, span, pkg, file, state) = (
            def.meta.name.clone(),
            def.meta.span,
            def.meta.package,
            def.meta.file,
            def.state,
        );
        let decl = def.decl.clone();
        if !self.enter(state, &name, span)? {
            return Ok(());
        }
        self.reg_mut()[id].state = ResolveState::Resolving;
        let int_bits = self.int_bits();

        let result = self.in_def_context(pkg, file, |c| -> Check<(Prim, Vec<(String, i128)>)> {
            let base = match &decl.base {
                Some(expr) => {
                    let ty = c.resolve_type(expr)?;
                    match ty.prim_kind() {
                        Some(p) if p.is_integer() => p,
                        _ => return c.fail(
                            Diagnostic::new(ErrorKey::InvalidType, expr.span).arg(ty.spelled()),
                        ),
                    }
                }
                None => Prim::Int,
            };
            let mut items: Vec<(String, i128)> = Vec::new();
            let mut next = 0i128;
            for item in &decl.items {
                if items.iter().any(|(n, _)| *n == item.name.name) {
                    c.report(
                        Diagnostic::new(ErrorKey::ExistId, item.name.span).arg(&item.name.name),
                    );
                    continue;
                }
                let value = match &item.value {
                    Some(expr) => c.eval_const_int(expr)?,
                    None => next,
                };
                let constant = ConstValue::Int(value);
                c.or_report(range::check_fits(base, &constant, int_bits, item.name.span))?;
                items.push((item.name.name.clone(), value));
                next = value + 1;
            }
            Ok((base, items))
        });

        let def = &mut self.reg_mut()[id];
        match result {
            Ok((base, items)) => {
                def.base = base;
                def.items = items;
                def.state = ResolveState::Done;
                Ok(())
            }
            Err(reported) => {
                def.state = ResolveState::Failed;
                Err(reported)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Traits
    // ------------------------------------------------------------------------

    pub(crate) fn ensure_trait(&mut self, id: TraitId) -> Check<()> {
        let def = &self.reg()[id];
        let (name, span, pkg, file, state) = (
            def.meta.name.clone(),
            def.meta.span,
            def.meta.package,
            def.meta.file,
            def.state,
        );
        let decl = def.decl.clone();
        if !self.enter(state, &name, span)? {
            return Ok(());
        }
        self.reg_mut()[id].state = ResolveState::Resolving;

        let result = self.in_def_context(pkg, file, |c| -> Check<Vec<TraitMethod>> {
            let mut methods: Vec<TraitMethod> = Vec::new();
            for m in &decl.methods {
                if methods.iter().any(|x| x.name == m.name.name) {
                    c.report(Diagnostic::new(ErrorKey::ExistId, m.name.span).arg(&m.name.name));
                    continue;
                }
                let params = c.resolve_params(&m.params, false)?;
                let ret = c.resolve_ret(m.ret.as_ref())?;
                methods.push(TraitMethod {
                    name: m.name.name.clone(),
                    by_ref: m.receiver.by_ref,
                    sig: FnSig {
                        params: params.iter().map(Param::sig_param).collect(),
                        ret,
                    },
                    span: m.span,
                });
            }
            Ok(methods)
        });

        let def = &mut self.reg_mut()[id];
        match result {
            Ok(methods) => {
                def.methods = methods;
                def.state = ResolveState::Done;
                Ok(())
            }
            Err(reported) => {
                def.state = ResolveState::Failed;
                Err(reported)
            }
        }
    }

    fn check_trait_impl(&mut self, imp: &TraitImpl) -> Check<()> {
        let saved = std::mem::replace(&mut self.file, imp.file);
        let result = self.verify_trait_impl(imp);
        self.file = saved;
        result
    }

    fn verify_trait_impl(&mut self, imp: &TraitImpl) -> Check<()> {
        let trait_id = match self.lookup(&imp.trait_name.name, imp.trait_name.span)? {
            Resolved::Def(Definition::Trait(id)) => id,
            _ => {
                return self.fail(
                    Diagnostic::new(ErrorKey::NotType, imp.trait_name.span)
                        .arg(&imp.trait_name.name),
                );
            }
        };
        self.ensure_trait(trait_id)?;
        let required = self.reg()[trait_id].methods.clone();
        let trait_name = self.reg()[trait_id].meta.name.clone();
        let mut conforms = true;
        for m in &required {
            let Some(fid) = self.reg()[imp.target].methods.get(&m.name).copied() else {
                self.report(
                    Diagnostic::new(ErrorKey::NotImplTraitDef, imp.span)
                        .arg(&trait_name)
                        .arg(&m.name),
                );
                conforms = false;
                continue;
            };
            if self.ensure_fn(fid).is_err() {
                conforms = false;
                continue;
            }
            let f = &self.reg()[fid];
            let matches = f.decl.receiver.is_some() && f.by_ref() == m.by_ref && f.sig() == m.sig;
            if !matches {
                let span = f.meta.span;
                self.report(
                    Diagnostic::new(ErrorKey::TraitMethodMismatch, span)
                        .arg(&m.name)
                        .arg(&trait_name),
                );
                conforms = false;
            }
        }
        if !conforms {
            return Err(Reported);
        }
        self.reg_mut()[imp.target].implements.push(trait_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Structs
    // ------------------------------------------------------------------------

    /// Resolve the fields of a struct on first use.
    pub(crate) fn ensure_struct(&mut self, id: StructId) -> Check<()> {
        let def = &self.reg()[id];
        let (name, span, pkg, file, state) = (
            def.meta.name.clone(),
            def.meta.span,
            def.meta.package,
            def.meta.file,
            def.state,
        );
        let (decl, generics) = (def.decl.clone(), def.generics.clone());
        if !self.enter(state, &name, span)? {
            return Ok(());
        }
        self.reg_mut()[id].state = ResolveState::Resolving;
        trace!(name = %name, "resolving struct");

        let (fields, failed) = self.in_def_context(pkg, file, |c| {
            c.declare_placeholders(&generics, span);
            let mut fields: Vec<FieldDef> = Vec::new();
            let mut failed = false;
            for field in &decl.fields {
                let fname = &field.name;
                if fields.iter().any(|f| f.name == fname.name) {
                    c.report(Diagnostic::new(ErrorKey::ExistId, fname.span).arg(&fname.name));
                    continue;
                }
                let Ok(ty) = c.resolve_type(&field.ty) else {
                    failed = true;
                    continue;
                };
                let default_value = match &field.default {
                    Some(expr) => match c.eval_value(expr) {
                        Ok((value, model)) => {
                            if !ty.has_generics() {
                                c.queue_leaf(
                                    LeafKind::FieldDefault,
                                    ty.clone(),
                                    value.clone(),
                                    expr.span,
                                );
                            }
                            Some(DefaultArg { value, model })
                        }
                        Err(_) => {
                            failed = true;
                            None
                        }
                    },
                    None => None,
                };
                fields.push(FieldDef {
                    name: fname.name.clone(),
                    public: field.public,
                    mutable: field.mutable,
                    ty,
                    default: field.default.clone(),
                    default_value,
                    span: fname.span,
                });
            }
            (fields, failed)
        });

        let def = &mut self.reg_mut()[id];
        def.fields = fields;
        def.state = ResolveState::Done;
        let tuples: Vec<Vec<Type>> = def.combines.iter().map(<[Type]>::to_vec).collect();
        for tuple in &tuples {
            self.queue_generic_defaults(id, tuple);
        }
        if failed { Err(Reported) } else { Ok(()) }
    }

    // ------------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------------

    /// Resolve parameters. Defaults are evaluated and, unless the
    /// parameter type still mentions a placeholder, queued as leaf checks.
    pub(super) fn resolve_params(
        &mut self,
        decls: &[ParamDecl],
        with_defaults: bool,
    ) -> Check<Vec<Param>> {
        let mut params: Vec<Param> = Vec::with_capacity(decls.len());
        for (i, p) in decls.iter().enumerate() {
            if params.iter().any(|q| q.name == p.name.name) {
                return self.fail(Diagnostic::new(ErrorKey::ExistId, p.name.span).arg(&p.name.name));
            }
            if p.variadic && i + 1 != decls.len() {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidSyntax, p.name.span).arg(&p.name.name),
                );
            }
            let ty = self.resolve_type(&p.ty)?;
            let default = match (&p.default, with_defaults) {
                (Some(expr), true) => {
                    let (value, model) = self.eval_value(expr)?;
                    if !ty.has_generics() {
                        self.queue_leaf(LeafKind::Argument, ty.clone(), value.clone(), expr.span);
                    }
                    Some(DefaultArg { value, model })
                }
                _ => None,
            };
            params.push(Param {
                name: p.name.name.clone(),
                ty,
                mutable: p.mutable,
                variadic: p.variadic,
                default,
                hidden: false,
            });
        }
        Ok(params)
    }

    /// Resolve a function signature on first use.
    pub(crate) fn ensure_fn(&mut self, id: FnId) -> Check<()> {
        let def = &self.reg()[id];
        let (name, span, pkg, file, state) = (
            def.meta.name.clone(),
            def.meta.span,
            def.meta.package,
            def.meta.file,
            def.state,
        );
        let (decl, generics) = (def.decl.clone(), def.generics.clone());
        if !self.enter(state, &name, span)? {
            return Ok(());
        }
        self.reg_mut()[id].state = ResolveState::Resolving;

        let result = self.in_def_context(pkg, file, |c| -> Check<(Vec<Param>, Type)> {
            c.declare_placeholders(&generics, span);
            let params = c.resolve_params(&decl.params, true)?;
            let ret = c.resolve_ret(decl.ret.as_ref())?;
            Ok((params, ret))
        });

        let def = &mut self.reg_mut()[id];
        match result {
            Ok((params, ret)) => {
                def.params = params;
                def.ret = ret;
                def.state = ResolveState::Done;
                Ok(())
            }
            Err(reported) => {
                def.state = ResolveState::Failed;
                Err(reported)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------------

    /// Resolve a global's type and initializer on first use.
    ///
    /// Every name of a destructuring declaration is resolved together.
    pub(crate) fn ensure_global(&mut self, id: GlobalId) -> Check<Type> {
        let def = &self.reg()[id];
        let (name, span, pkg, file, state) = (
            def.meta.name.clone(),
            def.meta.span,
            def.meta.package,
            def.meta.file,
            def.state,
        );
        let decl = def.decl.clone();
        if !self.enter(state, &name, span)? {
            return self.reg()[id].ty.clone().ok_or(Reported);
        }
        let siblings: Vec<GlobalId> = self
            .reg()
            .globals
            .iter()
            .enumerate()
            .filter(|(_, g)| Arc::ptr_eq(&g.decl, &decl))
            .map(|(i, _)| GlobalId(i as u32))
            .collect();
        for &g in &siblings {
            self.reg_mut()[g].state = ResolveState::Resolving;
        }

        let result = self.in_def_context(pkg, file, |c| c.check_var_decl(&decl));
        match result {
            Ok(init) => {
                for &g in &siblings {
                    let index = decl
                        .names
                        .iter()
                        .position(|n| n.name == self.reg()[g].meta.name)
                        .unwrap_or(0);
                    let slot = init.slots.get(index).cloned();
                    let single = decl.names.len() == 1;
                    let def = &mut self.reg_mut()[g];
                    match slot {
                        Some(slot) => {
                            def.ty = Some(slot.ty);
                            def.constant = slot.constant;
                            def.untyped = slot.untyped;
                            def.init = if single { init.model.clone() } else { None };
                            def.state = ResolveState::Done;
                        }
                        None => def.state = ResolveState::Failed,
                    }
                }
                self.reg()[id].ty.clone().ok_or(Reported)
            }
            Err(reported) => {
                for &g in &siblings {
                    self.reg_mut()[g].state = ResolveState::Failed;
                }
                Err(reported)
            }
        }
    }

    /// Resolve an optional declared type.
    pub(crate) fn resolve_declared(&mut self, ty: Option<&TypeExpr>) -> Check<Option<Type>> {
        ty.map(|t| self.resolve_type(t)).transpose()
    }
}
