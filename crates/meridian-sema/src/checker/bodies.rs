//! Function bodies.
//!
//! Non-generic bodies are walked in declaration order. A generic body is
//! walked once per concrete tuple, when the pending queue is drained; only
//! the first walk reports label, unused-local and return-path problems,
//! since those do not depend on the generic arguments.

use std::sync::Arc;

use meridian_ast::{FnDecl, Ident, Span};
use meridian_core::{Diagnostic, ErrorKey};
use tracing::{debug, trace};

use super::declare::owned_by;
use crate::binder::Param;
use crate::checker::{Check, Checker, FnContext};
use crate::control_flow::validate;
use crate::defs::{FnId, StructId};
use crate::expr::{Operand, Target};
use crate::generics::bind_generics;
use crate::model::{ExprModel, FnModel};
use crate::return_checker::has_return_path;
use crate::scope::{Local, LocalKind, LocalVar};
use crate::types::{Bindings, FnSig, StructRef, Type, TypeKind};
use crate::value::Value;

fn param_var(ty: Type, mutable: bool) -> LocalVar {
    LocalVar {
        ty,
        mutable,
        constant: None,
        is_const: false,
        param: true,
        untyped: false,
        pointee_const: false,
    }
}

impl Checker<'_> {
    /// Walk every non-generic function body of the package.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn check_bodies(&mut self) {
        let ids = owned_by(&self.reg().fns, self.pkg, |d| &d.meta);
        for id in ids.into_iter().map(FnId) {
            if self.session.should_stop() {
                debug!("error limit reached, skipping remaining bodies");
                break;
            }
            if self.reg()[id].is_generic() {
                continue;
            }
            self.check_fn_body(id, Vec::new());
        }
        for id in owned_by(&self.reg().structs, self.pkg, |d| &d.meta) {
            self.reg_mut()[StructId(id)].checked = true;
        }
    }

    /// Walk queued generic instances until none are left.
    pub(super) fn drain_pending(&mut self) {
        while let Some(body) = self.pending.pop_front() {
            if self.session.should_stop() {
                self.pending.clear();
                break;
            }
            self.depth = body.depth;
            self.check_fn_body(body.fn_id, body.generics);
        }
        self.depth = 0;
    }

    fn check_fn_body(&mut self, id: FnId, tuple: Vec<Type>) {
        if self.ensure_fn(id).is_err() {
            return;
        }
        let def = &self.reg()[id];
        let (pkg, file) = (def.meta.package, def.meta.file);
        let (decl, names, owner) = (def.decl.clone(), def.generics.clone(), def.owner);
        let (params, ret) = (def.params.clone(), def.ret.clone());
        let first_walk = def.body_checks == 0;
        self.reg_mut()[id].body_checks += 1;
        trace!(name = %decl.name.name, generics = tuple.len(), "walking body");

        let bindings = bind_generics(&names, &tuple);
        let ret = ret.substitute(&bindings);
        let self_ty = owner.map(|sid| self.struct_type(sid, tuple.clone()));
        let body = self.in_def_context(pkg, file, |c| {
            c.scope.push_scope();
            for (name, ty) in names.iter().zip(&tuple) {
                let _ = c.scope.declare(name, LocalKind::Generic(ty.clone()), decl.span);
            }
            if let (Some(receiver), Some(self_ty)) = (decl.receiver, self_ty.clone()) {
                let ty = if receiver.by_ref {
                    Type::reference(self_ty)
                } else {
                    self_ty
                };
                let name = Ident::new("self", receiver.span);
                let _ = c.declare_var(&name, param_var(ty, receiver.mutable));
            }
            c.declare_params(&decl, &params, &bindings);
            c.func = Some(FnContext {
                ret: ret.clone(),
                first_walk,
                owner,
            });
            c.walk_fn_body(&decl, &ret)
        });
        self.flush_leaf();

        let model = FnModel {
            name: decl.name.name.clone(),
            generics: if owner.is_none() {
                tuple.iter().map(Type::to_string).collect()
            } else {
                Vec::new()
            },
            owner: self_ty.map(|t| t.to_string()),
            params: params
                .iter()
                .map(|p| (p.name.clone(), p.slot_type().substitute(&bindings).to_string()))
                .collect(),
            ret: ret.to_string(),
            body,
        };
        self.session.packages[pkg.index()].output.functions.push(model);
        self.reg_mut()[id].checked = true;
    }

    fn struct_type(&self, id: StructId, generics: Vec<Type>) -> Type {
        TypeKind::Struct(StructRef {
            id,
            name: Arc::from(self.reg()[id].meta.name.as_str()),
            generics,
        })
        .into()
    }

    fn declare_params(&mut self, decl: &FnDecl, params: &[Param], bindings: &Bindings) {
        for (p, pd) in params.iter().zip(&decl.params) {
            let ty = p.slot_type().substitute(bindings);
            let _ = self.declare_var(&pd.name, param_var(ty, p.mutable));
        }
    }

    /// Validate jumps, check the statements and close the function scope.
    fn walk_fn_body(&mut self, decl: &FnDecl, ret: &Type) -> Vec<crate::model::StmtModel> {
        let first_walk = self.func.as_ref().is_some_and(|f| f.first_walk);
        if first_walk {
            for diag in validate(&decl.body) {
                self.report(diag);
            }
        }
        let body = self.check_stmts(&decl.body.stmts);
        self.close_scope();
        if first_walk && !ret.is_void() && !has_return_path(&decl.body) {
            let name = if decl.is_anonymous() { "fn" } else { decl.name.name.as_str() };
            self.report(Diagnostic::new(ErrorKey::MissingRet, decl.span).arg(name));
        }
        body
    }

    /// Close a block, reporting its unused locals on the first walk.
    pub(crate) fn close_scope(&mut self) {
        let closed = self.scope.pop_scope();
        if !self.func.as_ref().is_some_and(|f| f.first_walk) {
            return;
        }
        for local in closed.iter().filter(|l| Local::reportable_unused(l)) {
            let diag = Diagnostic::new(ErrorKey::DeclaredButNotUsed, local.span).arg(&local.name);
            if self.opts().unused_as_error {
                self.report(diag);
            } else {
                self.warn(diag.warning());
            }
        }
    }

    /// Check an anonymous function literal in the enclosing scope.
    pub(crate) fn lambda(&mut self, decl: &Arc<FnDecl>, span: Span) -> Check<Operand> {
        let params = self.resolve_params(&decl.params, false)?;
        let ret = self.resolve_ret(decl.ret.as_ref())?;
        let first_walk = self.func.as_ref().is_none_or(|f| f.first_walk);
        let owner = self.func.as_ref().and_then(|f| f.owner);
        let saved = self.func.replace(FnContext {
            ret: ret.clone(),
            first_walk,
            owner,
        });
        self.scope.push_scope();
        self.declare_params(decl, &params, &Bindings::default());
        let body = self.walk_fn_body(decl, &ret);
        self.func = saved;

        let sig = FnSig {
            params: params.iter().map(Param::sig_param).collect(),
            ret: ret.clone(),
        };
        Ok(Operand {
            value: Value::rvalue(Type::func(sig)),
            model: ExprModel::Lambda {
                by_ref: false,
                params: params
                    .iter()
                    .map(|p| (p.name.clone(), p.slot_type().to_string()))
                    .collect(),
                ret: ret.to_string(),
                body,
            },
            target: Target::Plain,
            span,
        })
    }
}
