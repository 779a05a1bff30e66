//! Package checker.
//!
//! A [`Checker`] walks one package of a [`Session`] through its passes:
//!
//! 1. **Registration**: every top-level name lands in the package table.
//! 2. **Imports**: `use` declarations fill per-file tables, checking the
//!    imported packages first.
//! 3. **Declarations**: aliases, enums, struct fields, trait and function
//!    signatures and globals are resolved, then the first barrier runs.
//! 4. **Bodies**: non-generic function bodies are walked; generic instances
//!    queued along the way are drained last.
//!
//! Errors are pushed into the session sink exactly once. The function that
//! pushed returns `Err(Reported)`, and callers propagate it with `?` so one
//! mistake does not cascade into a chain of follow-up diagnostics.

use std::collections::VecDeque;
use std::sync::Arc;

use meridian_core::{Diagnostic, ErrorKey, ErrorSink, Span};
use tracing::debug;

use crate::defs::{Definition, PackageId, Registry, StructId};
use crate::generics::PendingBody;
use crate::leaf::{LeafCheck, LeafKind, LeafQueue};
use crate::options::CheckOptions;
use crate::scope::{Local, LocalScope};
use crate::session::Session;
use crate::types::{Prim, Type};
use crate::value::Value;

mod bodies;
mod declare;

/// Marker for an error that has already been pushed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reported;

pub(crate) type Check<T> = Result<T, Reported>;

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `len(x)`
    Len,
    /// `append(slice, items...)`
    Append,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "len" => Some(Builtin::Len),
            "append" => Some(Builtin::Append),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Append => "append",
        }
    }
}

/// What an identifier resolved to.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Local(Local),
    Def(Definition),
    /// Primitive or `any` type name.
    Type(Type),
    Builtin(Builtin),
}

/// The function whose body is being walked.
#[derive(Debug, Clone)]
pub(crate) struct FnContext {
    pub ret: Type,
    /// Only the first walk of a body reports structural problems.
    pub first_walk: bool,
    pub owner: Option<StructId>,
}

pub(crate) struct Checker<'s> {
    pub(crate) session: &'s mut Session,
    pub(crate) pkg: PackageId,
    /// Index of the current file within `pkg`.
    pub(crate) file: usize,
    pub(crate) scope: LocalScope,
    pub(crate) func: Option<FnContext>,
    pub(crate) leaf: LeafQueue,
    pub(crate) pending: VecDeque<PendingBody>,
    /// Generic instantiation nesting of the current walk.
    pub(crate) depth: usize,
}

impl<'s> Checker<'s> {
    pub(crate) fn new(session: &'s mut Session, pkg: PackageId) -> Self {
        Self {
            session,
            pkg,
            file: 0,
            scope: LocalScope::new(),
            func: None,
            leaf: LeafQueue::new(),
            pending: VecDeque::new(),
            depth: 0,
        }
    }

    /// Run every pass over the package.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn run(mut self) {
        let trait_impls = self.register();
        self.import();
        self.declare(trait_impls);
        self.flush_leaf();
        self.check_bodies();
        self.drain_pending();
        debug!(
            package = %self.session.packages[self.pkg.index()].path,
            errors = self.session.diagnostics.error_count(),
            "package checked"
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub(crate) fn reg(&self) -> &Registry {
        &self.session.registry
    }

    pub(crate) fn reg_mut(&mut self) -> &mut Registry {
        &mut self.session.registry
    }

    pub(crate) fn opts(&self) -> &CheckOptions {
        &self.session.options
    }

    pub(crate) fn int_bits(&self) -> u32 {
        self.session.options.int_bits
    }

    /// Path of the file being checked.
    pub(crate) fn path(&self) -> Arc<str> {
        let package = &self.session.packages[self.pkg.index()];
        match package.scopes.get(self.file) {
            Some(scope) => scope.path.clone(),
            None => Arc::from(package.path.as_str()),
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Push an error attributed to the current file.
    pub(crate) fn report(&mut self, diag: Diagnostic) -> Reported {
        let diag = if diag.path.is_empty() {
            diag.in_file(self.path())
        } else {
            diag
        };
        self.session.diagnostics.push(diag);
        Reported
    }

    /// Shorthand for `Err(self.report(..))`.
    pub(crate) fn fail<T>(&mut self, diag: Diagnostic) -> Check<T> {
        Err(self.report(diag))
    }

    /// Push the error of a pure check, if any.
    pub(crate) fn or_report(&mut self, result: Result<(), Diagnostic>) -> Check<()> {
        result.map_err(|diag| self.report(diag))
    }

    pub(crate) fn warn(&mut self, diag: Diagnostic) {
        let diag = diag.in_file(self.path());
        self.session.diagnostics.warn(diag);
    }

    /// Queue an assignability check for the next barrier.
    pub(crate) fn queue_leaf(&mut self, kind: LeafKind, target: Type, value: Value, span: Span) {
        let path = self.path();
        self.leaf.push(LeafCheck {
            kind,
            target,
            value,
            span,
            path,
        });
    }

    /// Run the queued leaf checks and merge their failures.
    pub(crate) fn flush_leaf(&mut self) {
        let session = &mut *self.session;
        self.leaf
            .flush(&session.registry, &session.options, &mut session.diagnostics);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Resolve an identifier: locals, package definitions, file imports,
    /// wildcard imports, built-in type names, built-in functions.
    pub(crate) fn lookup(&mut self, name: &str, span: Span) -> Check<Resolved> {
        if let Some(local) = self.scope.lookup(name) {
            return Ok(Resolved::Local(local.clone()));
        }
        if let Some(def) = self.lookup_def(name) {
            return Ok(Resolved::Def(def));
        }
        if name == "any" {
            return Ok(Resolved::Type(Type::any()));
        }
        if let Some(prim) = Prim::from_name(name) {
            return Ok(Resolved::Type(Type::prim(prim)));
        }
        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Resolved::Builtin(builtin));
        }
        self.fail(Diagnostic::new(ErrorKey::IdNotExist, span).arg(name))
    }

    /// Package-level lookup, skipping locals. Marks the definition used.
    pub(crate) fn lookup_def(&mut self, name: &str) -> Option<Definition> {
        let package = &self.session.packages[self.pkg.index()];
        let scope = package.scopes.get(self.file);
        let def = package
            .defs
            .get(name)
            .or_else(|| scope.and_then(|s| s.imports.get(name)))
            .or_else(|| scope.and_then(|s| s.side.get(name)))
            .copied()?;
        self.reg_mut().mark_used(def);
        Some(def)
    }

    /// Public definition `name` of an imported package.
    pub(crate) fn namespace_member(
        &mut self,
        pkg: PackageId,
        name: &str,
        span: Span,
    ) -> Check<Definition> {
        let Some(def) = self.session.packages[pkg.index()].defs.get(name).copied() else {
            return self.fail(Diagnostic::new(ErrorKey::IdNotExist, span).arg(name));
        };
        let public = self.reg().meta(def).is_some_and(|m| m.public);
        if !public {
            return self.fail(Diagnostic::new(ErrorKey::IdentIsNotAccessible, span).arg(name));
        }
        self.reg_mut().mark_used(def);
        Ok(def)
    }

    /// Run `f` in the context a definition was declared in: its package and
    /// file, with no function and no locals.
    pub(crate) fn in_def_context<T>(
        &mut self,
        pkg: PackageId,
        file: usize,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved_pkg = std::mem::replace(&mut self.pkg, pkg);
        let saved_file = std::mem::replace(&mut self.file, file);
        let saved_scope = std::mem::take(&mut self.scope);
        let saved_func = self.func.take();
        let out = f(self);
        self.pkg = saved_pkg;
        self.file = saved_file;
        self.scope = saved_scope;
        self.func = saved_func;
        out
    }
}
