//! Conditionals, loops and `match`.

use meridian_ast::{Expr, IfStmt, IterKind, IterStmt, MatchStmt, Op};
use meridian_core::{Diagnostic, ErrorKey};

use crate::checker::{Check, Checker};
use crate::model::{CaseModel, ExprModel, LoopModel, StmtModel};
use crate::operators::solve_binary;
use crate::scope::LocalVar;
use crate::types::{Prim, Type, TypeKind};
use crate::value::Value;

impl Checker<'_> {
    /// Evaluate an expression that must be a `bool`.
    fn condition(&mut self, expr: &Expr) -> Check<ExprModel> {
        let (value, model) = self.eval_value(expr)?;
        if !value.ty.is_bool() {
            return self.fail(
                Diagnostic::new(ErrorKey::IncompatibleTypes, expr.span)
                    .arg(value.ty.spelled())
                    .arg("bool"),
            );
        }
        Ok(model)
    }

    pub(super) fn if_stmt(&mut self, stmt: &IfStmt) -> StmtModel {
        let mut branches = Vec::with_capacity(stmt.branches.len());
        for branch in &stmt.branches {
            let cond = self.condition(&branch.cond);
            let body = self.check_block(&branch.body);
            if let Ok(cond) = cond {
                branches.push((cond, body));
            }
        }
        let default = stmt.default.as_ref().map(|b| self.check_block(b));
        StmtModel::If { branches, default }
    }

    pub(super) fn iter_stmt(&mut self, stmt: &IterStmt) -> Check<StmtModel> {
        let kind = match &stmt.kind {
            IterKind::Infinite => LoopModel::Infinite,
            IterKind::While(cond) => {
                let cond = self.condition(cond);
                let body = self.check_block(&stmt.body);
                return Ok(StmtModel::Loop {
                    kind: LoopModel::While(cond?),
                    body,
                });
            }
            IterKind::Range { key, value, expr } => {
                let (ranged, model) = self.eval_value(expr)?;
                let (key_ty, value_ty) = match &ranged.ty.deref_ref().kind {
                    TypeKind::Slice(elem) | TypeKind::Array { elem, .. } => (
                        Type::int(),
                        (**elem).clone(),
                    ),
                    TypeKind::Map { key, value } => ((**key).clone(), (**value).clone()),
                    TypeKind::Prim(Prim::Str) => (Type::int(), Type::prim(Prim::U8)),
                    _ => {
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidExpr, expr.span)
                                .arg(ranged.ty.spelled()),
                        );
                    }
                };
                self.scope.push_scope();
                for (name, ty) in [(key, key_ty), (value, value_ty)] {
                    if let Some(name) = name {
                        let _ = self.declare_var(
                            name,
                            LocalVar {
                                ty,
                                mutable: false,
                                constant: None,
                                is_const: false,
                                param: true,
                                untyped: false,
                                pointee_const: false,
                            },
                        );
                    }
                }
                let body = self.check_block(&stmt.body);
                self.close_scope();
                return Ok(StmtModel::Loop {
                    kind: LoopModel::Range {
                        key: key.as_ref().map(|k| k.name.clone()),
                        value: value.as_ref().map(|v| v.name.clone()),
                        expr: model,
                    },
                    body,
                });
            }
        };
        let body = self.check_block(&stmt.body);
        Ok(StmtModel::Loop { kind, body })
    }

    pub(super) fn match_stmt(&mut self, stmt: &MatchStmt) -> Check<StmtModel> {
        let subject = match &stmt.subject {
            Some(expr) => Some(self.eval_value(expr)?),
            None => None,
        };
        let int_bits = self.int_bits();
        let mut cases = Vec::new();
        for case in stmt.all_cases() {
            let mut exprs = Vec::with_capacity(case.exprs.len());
            let mut failed = false;
            for expr in &case.exprs {
                let checked = match &subject {
                    Some((subject, _)) => self.eval_value(expr).and_then(|(value, model)| {
                        let compared: Result<Value, Diagnostic> =
                            solve_binary(Op::EqEq, subject, &value, int_bits, expr.span);
                        compared.map(|_| model).map_err(|d| self.report(d))
                    }),
                    None => self.condition(expr),
                };
                match checked {
                    Ok(model) => exprs.push(model),
                    Err(_) => failed = true,
                }
            }
            let body = self.check_block(&case.body);
            if !failed {
                cases.push(CaseModel { exprs, body });
            }
        }
        Ok(StmtModel::Match {
            subject: subject.map(|(_, model)| model),
            cases,
        })
    }
}
