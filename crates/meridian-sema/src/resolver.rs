//! Type resolution.
//!
//! Converts syntactic [`TypeExpr`] nodes into canonical [`Type`]s using the
//! same lookup order as expressions. Named types bind to their definition;
//! generic struct references with concrete arguments are instantiated on
//! the way.
//!
//! ## Rejected shapes
//!
//! - `&&T`: reference to reference
//! - `*&T`: pointer to reference
//! - `&[N]T`: reference to array

use std::sync::Arc;

use meridian_ast::{ArraySizeExpr, Ident, TypeExpr, TypeExprKind};
use meridian_core::{Diagnostic, ErrorKey, Span};
use tracing::trace;

use crate::checker::{Check, Checker, Reported, Resolved};
use crate::defs::{AliasId, Definition, ResolveState};
use crate::scope::LocalKind;
use crate::types::{ArraySize, FnSig, NamedRef, SigParam, StructRef, Type, TypeKind};
use crate::value::ConstValue;

impl Checker<'_> {
    /// Resolve a type expression.
    pub(crate) fn resolve_type(&mut self, expr: &TypeExpr) -> Check<Type> {
        match &expr.kind {
            TypeExprKind::Named { name, generics } => {
                let resolved = self.lookup(&name.name, name.span)?;
                self.named_type(resolved, name, generics)
            }
            TypeExprKind::Qualified {
                namespace,
                name,
                generics,
            } => {
                let Resolved::Def(Definition::Namespace(pkg)) =
                    self.lookup(&namespace.name, namespace.span)?
                else {
                    return self.fail(
                        Diagnostic::new(ErrorKey::NotType, namespace.span).arg(&namespace.name),
                    );
                };
                let def = self.namespace_member(pkg, &name.name, name.span)?;
                self.named_type(Resolved::Def(def), name, generics)
            }
            TypeExprKind::Ptr(inner) => {
                let inner = self.resolve_type(inner)?;
                if inner.is_ref() {
                    return self.fail(
                        Diagnostic::new(ErrorKey::InvalidType, expr.span).arg(format!("*{inner}")),
                    );
                }
                Ok(Type::ptr(inner))
            }
            TypeExprKind::Ref(inner) => {
                let inner = self.resolve_type(inner)?;
                if matches!(inner.kind, TypeKind::Ref(_) | TypeKind::Array { .. }) {
                    return self.fail(
                        Diagnostic::new(ErrorKey::InvalidType, expr.span).arg(format!("&{inner}")),
                    );
                }
                Ok(Type::reference(inner))
            }
            TypeExprKind::Slice(elem) => Ok(Type::slice(self.resolve_type(elem)?)),
            TypeExprKind::Array { elem, size } => {
                let elem = self.resolve_type(elem)?;
                let size = match size {
                    ArraySizeExpr::Auto => ArraySize::Auto,
                    ArraySizeExpr::Expr(e) => {
                        let n = self.eval_const_int(e)?;
                        match u64::try_from(n) {
                            Ok(n) => ArraySize::Fixed(n),
                            Err(_) => {
                                return self.fail(
                                    Diagnostic::new(ErrorKey::OverflowLimits, e.span)
                                        .arg(n.to_string())
                                        .arg("uint"),
                                );
                            }
                        }
                    }
                };
                Ok(Type::array(elem, size))
            }
            TypeExprKind::Map { key, value } => {
                let key = self.resolve_type(key)?;
                let value = self.resolve_type(value)?;
                Ok(Type::map(key, value))
            }
            TypeExprKind::Fn { params, ret } => {
                let mut sig_params = Vec::with_capacity(params.len());
                for p in params {
                    sig_params.push(SigParam {
                        ty: self.resolve_type(&p.ty)?,
                        mutable: p.mutable,
                        variadic: p.variadic,
                    });
                }
                let ret = match ret {
                    Some(r) => self.resolve_type(r)?,
                    None => Type::void(),
                };
                Ok(Type::func(FnSig {
                    params: sig_params,
                    ret,
                }))
            }
            TypeExprKind::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.resolve_type(item)?);
                }
                Ok(Type::tuple(out))
            }
        }
    }

    /// Resolve an optional return type; `None` is void.
    pub(crate) fn resolve_ret(&mut self, ret: Option<&TypeExpr>) -> Check<Type> {
        match ret {
            Some(t) => self.resolve_type(t),
            None => Ok(Type::void()),
        }
    }

    fn named_type(
        &mut self,
        resolved: Resolved,
        name: &Ident,
        generics: &[TypeExpr],
    ) -> Check<Type> {
        let mut args = Vec::with_capacity(generics.len());
        for g in generics {
            args.push(self.resolve_type(g)?);
        }
        match resolved {
            Resolved::Type(ty) => {
                self.check_generic_arity(&name.name, 0, args.len(), name.span)?;
                Ok(ty)
            }
            Resolved::Local(local) => match local.kind {
                LocalKind::Alias(ty) | LocalKind::Generic(ty) => {
                    self.check_generic_arity(&name.name, 0, args.len(), name.span)?;
                    Ok(ty)
                }
                LocalKind::Var(_) => self.fail(
                    Diagnostic::new(ErrorKey::NotType, name.span).arg(&name.name),
                ),
            },
            Resolved::Def(def) => self.def_type(def, args, name.span),
            Resolved::Builtin(b) => self.fail(
                Diagnostic::new(ErrorKey::NotType, name.span).arg(b.name()),
            ),
        }
    }

    /// Type named by a definition, with explicit generic arguments.
    pub(crate) fn def_type(
        &mut self,
        def: Definition,
        generics: Vec<Type>,
        span: Span,
    ) -> Check<Type> {
        match def {
            Definition::Struct(id) => {
                let (name, expected) = {
                    let s = &self.reg()[id];
                    (s.meta.name.clone(), s.generics.len())
                };
                self.check_generic_arity(&name, expected, generics.len(), span)?;
                self.instantiate_struct(id, &generics, span)?;
                Ok(TypeKind::Struct(StructRef {
                    id,
                    name: Arc::from(name.as_str()),
                    generics,
                })
                .into())
            }
            Definition::Trait(id) => {
                let name = self.reg()[id].meta.name.clone();
                self.check_generic_arity(&name, 0, generics.len(), span)?;
                Ok(TypeKind::Trait(NamedRef {
                    id,
                    name: Arc::from(name.as_str()),
                })
                .into())
            }
            Definition::Enum(id) => {
                let name = self.reg()[id].meta.name.clone();
                self.check_generic_arity(&name, 0, generics.len(), span)?;
                Ok(TypeKind::Enum(NamedRef {
                    id,
                    name: Arc::from(name.as_str()),
                })
                .into())
            }
            Definition::Alias(id) => {
                let name = self.reg()[id].meta.name.clone();
                self.check_generic_arity(&name, 0, generics.len(), span)?;
                self.ensure_alias(id)
            }
            Definition::Global(_) | Definition::Fn(_) | Definition::Namespace(_) => {
                let name = match self.reg().meta(def) {
                    Some(meta) => meta.name.clone(),
                    None => "namespace".to_string(),
                };
                self.fail(Diagnostic::new(ErrorKey::NotType, span).arg(name))
            }
        }
    }

    /// Resolve a package-level alias on first use.
    pub(crate) fn ensure_alias(&mut self, id: AliasId) -> Check<Type> {
        let alias = &self.reg()[id];
        match alias.state {
            ResolveState::Done => {
                return alias.ty.clone().ok_or(Reported);
            }
            ResolveState::Failed => return Err(Reported),
            ResolveState::Resolving => {
                let (name, span) = (alias.meta.name.clone(), alias.meta.span);
                self.reg_mut()[id].state = ResolveState::Failed;
                return self.fail(
                    Diagnostic::new(ErrorKey::IllegalCycleInDeclaration, span).arg(name),
                );
            }
            ResolveState::Pending => {}
        }
        let (pkg, file, name, ty_expr) = (
            alias.meta.package,
            alias.meta.file,
            alias.meta.name.clone(),
            alias.ty_expr.clone(),
        );
        trace!(alias = %name, "resolving alias");
        self.reg_mut()[id].state = ResolveState::Resolving;
        let resolved = self.in_def_context(pkg, file, |c| c.resolve_type(&ty_expr));
        let def = &mut self.reg_mut()[id];
        if def.state == ResolveState::Failed {
            return Err(Reported);
        }
        match resolved {
            Ok(ty) => {
                let ty = ty.with_original(name);
                def.ty = Some(ty.clone());
                def.state = ResolveState::Done;
                Ok(ty)
            }
            Err(reported) => {
                def.state = ResolveState::Failed;
                Err(reported)
            }
        }
    }

    /// Evaluate an expression that must be a constant integer.
    pub(crate) fn eval_const_int(&mut self, expr: &meridian_ast::Expr) -> Check<i128> {
        let (value, _) = self.eval_value(expr)?;
        match &value.constant {
            Some(ConstValue::Int(n)) if value.ty.is_integer() || value.is_untyped() => Ok(*n),
            _ => self.fail(Diagnostic::new(ErrorKey::ExprNotConst, expr.span)),
        }
    }
}
