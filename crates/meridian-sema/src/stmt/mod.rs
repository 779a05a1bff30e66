//! Statement checking.
//!
//! Each statement either yields its output model or reports and yields
//! nothing. A failing statement never stops the rest of its block.

use meridian_ast::{Block, Expr, Ident, Stmt, StmtKind, TypeAliasDecl, VarDecl};
use meridian_core::{Diagnostic, ErrorKey, Span};

use crate::checker::{Check, Checker};
use crate::leaf::LeafKind;
use crate::model::{ExprModel, StmtModel};
use crate::scope::{LocalKind, LocalVar};

mod assign;
mod branch;
mod var;

use var::{VarInit, VarSlot};

impl Checker<'_> {
    /// Check a nested block in its own scope.
    pub(crate) fn check_block(&mut self, block: &Block) -> Vec<StmtModel> {
        self.scope.push_scope();
        let out = self.check_stmts(&block.stmts);
        self.close_scope();
        out
    }

    /// Check statements in the current scope.
    pub(crate) fn check_stmts(&mut self, stmts: &[Stmt]) -> Vec<StmtModel> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            if let Ok(Some(model)) = self.check_stmt(stmt) {
                out.push(model);
            }
        }
        out
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Check<Option<StmtModel>> {
        Ok(Some(match &stmt.kind {
            StmtKind::Expr(expr) => self.expr_stmt(expr)?,
            StmtKind::Var(decl) => self.var_stmt(decl)?,
            StmtKind::TypeAlias(alias) => {
                self.alias_stmt(alias)?;
                return Ok(None);
            }
            StmtKind::Assign(assign) => self.assign_stmt(assign, stmt.span)?,
            StmtKind::Postfix { target, increment } => self.postfix_stmt(target, *increment)?,
            StmtKind::Ret(values) => self.ret_stmt(values, stmt.span)?,
            StmtKind::Block(block) => StmtModel::Block(self.check_block(block)),
            StmtKind::If(stmt) => self.if_stmt(stmt),
            StmtKind::Iter(stmt) => self.iter_stmt(stmt)?,
            StmtKind::Match(stmt) => self.match_stmt(stmt)?,
            StmtKind::Label(label) => StmtModel::Label(label.name.clone()),
            StmtKind::Goto(label) => StmtModel::Goto(label.name.clone()),
            StmtKind::Break(label) => StmtModel::Break(label.as_ref().map(|l| l.name.clone())),
            StmtKind::Continue(label) => StmtModel::Continue(
                label.as_ref().map(|l| l.name.clone()),
            ),
            StmtKind::Fallthrough => StmtModel::Fallthrough,
        }))
    }

    fn expr_stmt(&mut self, expr: &Expr) -> Check<StmtModel> {
        let (_, model) = self.eval_value(expr)?;
        if !model.is_call() {
            return self.fail(Diagnostic::new(ErrorKey::ExprNotFuncCall, expr.span));
        }
        Ok(StmtModel::Expr(model))
    }

    /// Declare a local variable.
    pub(crate) fn declare_var(&mut self, name: &Ident, var: LocalVar) -> Check<()> {
        if self.scope.declare(&name.name, LocalKind::Var(var), name.span).is_err() {
            return self.fail(Diagnostic::new(ErrorKey::ExistId, name.span).arg(&name.name));
        }
        Ok(())
    }

    /// Report a name the current block already declares.
    fn check_shadowing(&mut self, name: &Ident) -> Check<()> {
        if self.scope.can_shadow(&name.name) {
            return Ok(());
        }
        self.fail(Diagnostic::new(ErrorKey::ExistId, name.span).arg(&name.name))
    }

    fn var_stmt(&mut self, decl: &VarDecl) -> Check<StmtModel> {
        for name in &decl.names {
            self.check_shadowing(name)?;
        }
        let VarInit { slots, model } = self.check_var_decl(decl)?;
        for (name, slot) in decl.names.iter().zip(&slots) {
            let VarSlot {
                ty,
                constant,
                untyped,
                pointee_const,
            } = slot.clone();
            self.declare_var(
                name,
                LocalVar {
                    ty,
                    mutable: decl.mutable,
                    constant,
                    is_const: decl.constant,
                    param: false,
                    untyped,
                    pointee_const,
                },
            )?;
        }
        if decl.names.len() > 1 {
            return Ok(StmtModel::Destructure {
                names: decl.names.iter().map(|n| n.name.clone()).collect(),
                init: model.unwrap_or_else(|| ExprModel::lit("{}")),
            });
        }
        let ty = slots.first().map(|s| s.ty.to_string()).unwrap_or_default();
        Ok(StmtModel::Var {
            name: decl.names.first().map(|n| n.name.clone()).unwrap_or_default(),
            ty,
            init: model,
            constant: decl.constant,
        })
    }

    fn alias_stmt(&mut self, alias: &TypeAliasDecl) -> Check<()> {
        self.check_shadowing(&alias.name)?;
        let ty = self.resolve_type(&alias.ty)?.with_original(alias.name.name.as_str());
        if self
            .scope
            .declare(&alias.name.name, LocalKind::Alias(ty), alias.name.span)
            .is_err()
        {
            return self.fail(
                Diagnostic::new(ErrorKey::ExistId, alias.name.span).arg(&alias.name.name),
            );
        }
        Ok(())
    }

    fn postfix_stmt(&mut self, target: &Expr, increment: bool) -> Check<StmtModel> {
        let (value, model) = self.eval_value(target)?;
        self.check_store_target(&value, target.span)?;
        if !value.ty.is_numeric() {
            let op = if increment { "++" } else { "--" };
            return self.fail(
                Diagnostic::new(ErrorKey::OperatorNotForType, target.span)
                    .arg(op)
                    .arg(value.ty.spelled()),
            );
        }
        Ok(StmtModel::Postfix {
            target: model,
            increment,
        })
    }

    fn ret_stmt(&mut self, values: &[Expr], span: Span) -> Check<StmtModel> {
        let Some(ret) = self.func.as_ref().map(|f| f.ret.clone()) else {
            return self.fail(Diagnostic::new(ErrorKey::InvalidSyntax, span).arg("ret"));
        };
        if values.is_empty() {
            if !ret.is_void() {
                return self.fail(
                    Diagnostic::new(ErrorKey::RequireReturnValue, span).arg(ret.spelled()),
                );
            }
            return Ok(StmtModel::Ret(None));
        }
        if ret.is_void() {
            return self.fail(Diagnostic::new(ErrorKey::VoidFunctionReturnValue, span));
        }

        let mut evaluated = Vec::with_capacity(values.len());
        for expr in values {
            let (value, model) = self.eval_value(expr)?;
            evaluated.push((value, model, expr.span));
        }
        let expected = ret.components();

        // A single multi-value call returned as a whole.
        if let [(value, model, value_span)] = evaluated.as_slice()
            && expected.len() > 1
            && value.ty.is_tuple()
        {
            self.queue_leaf(LeafKind::Return, ret.clone(), value.clone(), *value_span);
            return Ok(StmtModel::Ret(Some(model.clone())));
        }
        if evaluated.len() < expected.len() {
            return self.fail(
                Diagnostic::new(ErrorKey::MissingMultiReturn, span)
                    .arg(expected.len().to_string())
                    .arg(evaluated.len().to_string()),
            );
        }
        if evaluated.len() > expected.len() {
            return self.fail(
                Diagnostic::new(ErrorKey::OverflowReturn, span)
                    .arg(expected.len().to_string())
                    .arg(evaluated.len().to_string()),
            );
        }

        let mut models = Vec::with_capacity(evaluated.len());
        for ((value, model, value_span), target) in evaluated.into_iter().zip(expected) {
            self.queue_leaf(LeafKind::Return, target, value, value_span);
            models.push(model);
        }
        let model = if models.len() == 1 {
            models.remove(0)
        } else {
            ExprModel::Tuple(models)
        };
        Ok(StmtModel::Ret(Some(model)))
    }
}
