//! Assignment statements.

use meridian_ast::{AssignStmt, Expr, Span, TokenKind};
use meridian_core::{Diagnostic, ErrorKey};

use crate::checker::{Check, Checker};
use crate::conversion::{check_assignable, check_mutability};
use crate::model::{ExprModel, StmtModel};
use crate::operators::solve_binary;
use crate::value::Value;

/// `_` on the left of an assignment discards its value.
fn is_blank(expr: &Expr) -> bool {
    matches!(expr.tokens.as_slice(), [tok] if tok.kind == TokenKind::Ident && tok.lexeme == "_")
}

impl Checker<'_> {
    /// A store needs writable, non-constant storage.
    pub(crate) fn check_store_target(&mut self, target: &Value, span: Span) -> Check<()> {
        if !target.is_lvalue() {
            return self.fail(Diagnostic::new(ErrorKey::AssignRequireLvalue, span));
        }
        if target.is_constant() {
            return self.fail(Diagnostic::new(ErrorKey::AssignConst, span));
        }
        if !target.is_mutable() {
            return self.fail(Diagnostic::new(ErrorKey::AssignmentToNonMut, span));
        }
        Ok(())
    }

    pub(super) fn assign_stmt(&mut self, stmt: &AssignStmt, span: Span) -> Check<StmtModel> {
        let mut targets: Vec<Option<(Value, Span)>> = Vec::with_capacity(stmt.targets.len());
        let mut target_models = Vec::with_capacity(stmt.targets.len());
        for expr in &stmt.targets {
            if is_blank(expr) {
                targets.push(None);
                target_models.push(ExprModel::ident("std::ignore"));
                continue;
            }
            let (value, model) = self.eval_value(expr)?;
            self.check_store_target(&value, expr.span)?;
            targets.push(Some((value, expr.span)));
            target_models.push(model);
        }

        let mut values = Vec::with_capacity(stmt.values.len());
        let mut value_models = Vec::with_capacity(stmt.values.len());
        for expr in &stmt.values {
            let (value, model) = self.eval_value(expr)?;
            values.push((value, expr.span));
            value_models.push(model);
        }

        // One multi-value call spreads over every target.
        if let [(value, value_span)] = values.as_slice()
            && targets.len() > 1
            && value.ty.is_tuple()
        {
            let value_span = *value_span;
            values = value
                .ty
                .components()
                .into_iter()
                .map(|ty| (Value::rvalue(ty), value_span))
                .collect();
        }
        if values.len() < targets.len() {
            return self.fail(
                Diagnostic::new(ErrorKey::MissingMultiAssignValues, span)
                    .arg(targets.len().to_string())
                    .arg(values.len().to_string()),
            );
        }
        if values.len() > targets.len() {
            return self.fail(
                Diagnostic::new(ErrorKey::OverflowMultiAssignIdentifiers, span)
                    .arg(targets.len().to_string())
                    .arg(values.len().to_string()),
            );
        }

        if let Some(op) = stmt.op.binary() {
            if targets.len() != 1 {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidSyntax, span).arg(stmt.op.as_str()),
                );
            }
            if let (Some((target, _)), (value, value_span)) = (&targets[0], &values[0]) {
                let combined = solve_binary(op, target, value, self.int_bits(), *value_span);
                let combined = combined.map_err(|d| self.report(d))?;
                let result = check_assignable(
                    self.reg(),
                    self.opts(),
                    &target.ty,
                    &combined,
                    *value_span,
                );
                self.or_report(result)?;
            }
        } else {
            for (target, (value, value_span)) in targets.iter().zip(&values) {
                let Some((target, _)) = target else {
                    continue;
                };
                let result = check_assignable(
                    self.reg(),
                    self.opts(),
                    &target.ty,
                    value,
                    *value_span,
                );
                self.or_report(result)?;
                self.or_report(check_mutability(true, value, *value_span))?;
                if target.ty.is_ptr() && value.points_to_const() && !target.points_to_const() {
                    return self.fail(
                        Diagnostic::new(ErrorKey::AssignmentNonMutToMut, *value_span)
                            .arg(value.ty.spelled()),
                    );
                }
            }
        }

        Ok(StmtModel::Assign {
            targets: target_models,
            op: stmt.op.as_str(),
            values: value_models,
        })
    }
}
