//! Variable declarations.
//!
//! Locals and globals share one checker: it resolves the declared type,
//! evaluates the initializer and decides the type each name ends up with.

use meridian_ast::VarDecl;
use meridian_core::{Diagnostic, ErrorKey};

use crate::checker::{Check, Checker};
use crate::conversion::{check_assignable, check_mutability};
use crate::model::ExprModel;
use crate::types::{ArraySize, Type, TypeKind};
use crate::value::{ConstValue, Value};

/// What one declared name resolves to.
#[derive(Debug, Clone)]
pub(crate) struct VarSlot {
    pub ty: Type,
    /// Folded value of a `const`.
    pub constant: Option<ConstValue>,
    pub untyped: bool,
    /// Pointer taken from immutable storage.
    pub pointee_const: bool,
}

/// Checked form of a declaration.
#[derive(Debug, Clone)]
pub(crate) struct VarInit {
    /// One slot per declared name, in order.
    pub slots: Vec<VarSlot>,
    pub model: Option<ExprModel>,
}

/// Fill the size of `[...]T` from an array value.
fn backfill_auto(declared: Type, value: &Type) -> Type {
    match (&declared.kind, &value.kind) {
        (
            TypeKind::Array {
                elem,
                size: ArraySize::Auto,
            },
            TypeKind::Array {
                size: size @ ArraySize::Fixed(_),
                ..
            },
        ) => Type::array((**elem).clone(), *size),
        _ => declared,
    }
}

impl Checker<'_> {
    pub(crate) fn check_var_decl(&mut self, decl: &VarDecl) -> Check<VarInit> {
        let declared = self.resolve_declared(decl.ty.as_ref())?;
        let first = decl.names.first().map(|n| n.name.clone()).unwrap_or_default();

        let Some(init) = &decl.init else {
            if decl.constant {
                return self.fail(
                    Diagnostic::new(ErrorKey::ConstVarNotHaveValue, decl.span).arg(first),
                );
            }
            let Some(ty) = declared else {
                return self.fail(Diagnostic::new(ErrorKey::MissingExpr, decl.span));
            };
            if matches!(
                ty.kind,
                TypeKind::Array {
                    size: ArraySize::Auto,
                    ..
                }
            ) {
                return self.fail(
                    Diagnostic::new(ErrorKey::AutoSizedArrayWithoutInit, decl.span).arg(first),
                );
            }
            if decl.names.len() > 1 {
                return self.fail(Diagnostic::new(ErrorKey::MissingExpr, decl.span));
            }
            return Ok(VarInit {
                slots: vec![VarSlot {
                    ty,
                    constant: None,
                    untyped: false,
                    pointee_const: false,
                }],
                model: None,
            });
        };

        let (value, model) = self.eval_value(init)?;
        if value.is_type_literal() {
            return self.fail(
                Diagnostic::new(ErrorKey::InvalidExpr, init.span).arg(value.ty.spelled()),
            );
        }

        if decl.names.len() > 1 {
            let components = value.ty.components();
            if components.len() < decl.names.len() {
                return self.fail(
                    Diagnostic::new(ErrorKey::MissingMultiAssignValues, init.span)
                        .arg(decl.names.len().to_string())
                        .arg(components.len().to_string()),
                );
            }
            if components.len() > decl.names.len() {
                return self.fail(
                    Diagnostic::new(ErrorKey::OverflowMultiAssignIdentifiers, init.span)
                        .arg(decl.names.len().to_string())
                        .arg(components.len().to_string()),
                );
            }
            let mut slots = Vec::with_capacity(components.len());
            for component in components {
                let ty = match &declared {
                    Some(ty) => {
                        let result =
                            check_assignable(
                                self.reg(),
                                self.opts(),
                                ty,
                                &Value::rvalue(component),
                                init.span,
                            );
                        self.or_report(result)?;
                        ty.clone()
                    }
                    None => component,
                };
                slots.push(VarSlot {
                    ty,
                    constant: None,
                    untyped: false,
                    pointee_const: false,
                });
            }
            return Ok(VarInit {
                slots,
                model: Some(model),
            });
        }

        let ty = match declared.clone() {
            Some(ty) => {
                let ty = backfill_auto(ty, &value.ty);
                let result = check_assignable(self.reg(), self.opts(), &ty, &value, init.span);
                self.or_report(result)?;
                ty
            }
            None => {
                if value.ty.is_nil() {
                    return self.fail(
                        Diagnostic::new(ErrorKey::NilForAutotype, init.span).arg(first),
                    );
                }
                if value.ty.is_void() {
                    return self.fail(
                        Diagnostic::new(ErrorKey::VoidForAutotype, init.span).arg(first),
                    );
                }
                value.ty.clone()
            }
        };
        self.or_report(check_mutability(decl.mutable, &value, init.span))?;

        if decl.constant && value.constant.is_none() {
            return self.fail(Diagnostic::new(ErrorKey::ExprNotConst, init.span));
        }
        let untyped = decl.constant && declared.is_none() && value.is_untyped();
        Ok(VarInit {
            slots: vec![VarSlot {
                ty,
                constant: if decl.constant { value.constant.clone() } else { None },
                untyped,
                pointee_const: value.points_to_const(),
            }],
            model: Some(model),
        })
    }
}
