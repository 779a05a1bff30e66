//! Composite literals: `[]T{...}`, `[N]T{...}`, `[K:V]{...}` and
//! `Struct{...}`.

use meridian_ast::{Span, Token, TokenKind, split_top_level};
use meridian_core::{Diagnostic, ErrorKey};

use super::access::top_level_colon;
use super::call::bare_braces;
use super::{Operand, span_of};
use crate::binder::{Bound, DefaultArg, Param, Strategy, bind};
use crate::checker::{Check, Checker};
use crate::generics::bind_generics;
use crate::leaf::LeafKind;
use crate::model::ExprModel;
use crate::types::{ArraySize, StructRef, Type, TypeKind};
use crate::value::Value;

impl Checker<'_> {
    /// `T{...}` where the operand names `T`.
    pub(super) fn composite(
        &mut self,
        operand: Operand,
        inner: &[Token],
        whole: Span,
    ) -> Check<Operand> {
        let span = operand.span.merge(whole);
        self.composite_of(&operand.value.ty, inner, whole, span)
    }

    pub(super) fn composite_of(
        &mut self,
        ty: &Type,
        inner: &[Token],
        whole: Span,
        span: Span,
    ) -> Check<Operand> {
        match &ty.kind {
            TypeKind::Array { elem, size } => {
                let (items, models) = self.elements(elem, inner, whole)?;
                let ty = match size {
                    ArraySize::Fixed(n) => {
                        if items.len() as u64 > *n {
                            let extra = items[*n as usize].1;
                            return self.fail(
                                Diagnostic::new(ErrorKey::ArgumentOverflow, extra)
                                    .arg(ty.spelled()),
                            );
                        }
                        ty.clone()
                    }
                    ArraySize::Auto => Type::array(
                        (**elem).clone(),
                        ArraySize::Fixed(items.len() as u64),
                    ),
                };
                self.queue_elements(elem, items);
                let model = ExprModel::Composite {
                    ty: ty.to_string(),
                    items: models,
                };
                Ok(Operand::plain(Value::rvalue(ty), model, span))
            }
            TypeKind::Slice(elem) => {
                let (items, models) = self.elements(elem, inner, whole)?;
                self.queue_elements(elem, items);
                let model = ExprModel::Composite {
                    ty: ty.to_string(),
                    items: models,
                };
                Ok(Operand::plain(Value::rvalue(ty.clone()), model, span))
            }
            TypeKind::Map { key, value } => {
                let mut pairs = Vec::new();
                for part in split_top_level(inner, &TokenKind::Comma) {
                    let Some(colon) = top_level_colon(part) else {
                        let span = span_of(part, whole);
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidSyntax, span).arg("map entry"),
                        );
                    };
                    let (k, k_model, k_span) = self.element(key, &part[..colon], whole)?;
                    let (v, v_model, v_span) = self.element(value, &part[colon + 1..], whole)?;
                    self.queue_leaf(LeafKind::Argument, (**key).clone(), k, k_span);
                    self.queue_leaf(LeafKind::Argument, (**value).clone(), v, v_span);
                    pairs.push((k_model, v_model));
                }
                let model = ExprModel::MapLit {
                    ty: ty.to_string(),
                    pairs,
                };
                Ok(Operand::plain(Value::rvalue(ty.clone()), model, span))
            }
            TypeKind::Struct(s) => self.struct_lit(s, ty, inner, whole, span),
            _ => self.fail(Diagnostic::new(ErrorKey::InvalidExpr, span).arg(ty.spelled())),
        }
    }

    /// One element; a bare `{...}` takes the element type.
    fn element(
        &mut self,
        elem: &Type,
        tokens: &[Token],
        whole: Span,
    ) -> Check<(Value, ExprModel, Span)> {
        let span = span_of(tokens, whole);
        let (value, model) = match bare_braces(tokens) {
            Some(body) => {
                let operand = self.composite_of(elem, body, span, span)?;
                (operand.value, operand.model)
            }
            None => {
                let operand = self.eval_tokens(tokens, span)?;
                self.finish(operand)?
            }
        };
        if value.is_type_literal() {
            return self.fail(Diagnostic::new(ErrorKey::InvalidExpr, span).arg(value.ty.spelled()));
        }
        Ok((value, model, span))
    }

    fn elements(
        &mut self,
        elem: &Type,
        inner: &[Token],
        whole: Span,
    ) -> Check<(Vec<(Value, Span)>, Vec<ExprModel>)> {
        let mut items = Vec::new();
        let mut models = Vec::new();
        for part in split_top_level(inner, &TokenKind::Comma) {
            let (value, model, span) = self.element(elem, part, whole)?;
            items.push((value, span));
            models.push(model);
        }
        Ok((items, models))
    }

    fn queue_elements(&mut self, elem: &Type, items: Vec<(Value, Span)>) {
        for (value, span) in items {
            self.queue_leaf(LeafKind::Argument, elem.clone(), value, span);
        }
    }

    fn struct_lit(
        &mut self,
        s: &StructRef,
        ty: &Type,
        inner: &[Token],
        whole: Span,
        span: Span,
    ) -> Check<Operand> {
        if s.generics.iter().any(Type::has_generics) {
            return self.fail(Diagnostic::new(ErrorKey::MissingGenerics, span).arg(s.name.as_ref()));
        }
        self.ensure_struct(s.id)?;
        let def = &self.reg()[s.id];
        let bindings = bind_generics(&def.generics, &s.generics);
        let foreign = def.meta.package != self.pkg;
        let params: Vec<Param> = def
            .fields
            .iter()
            .map(|f| {
                let ty = f.ty.substitute(&bindings);
                let default = f.default_value.clone().unwrap_or_else(|| DefaultArg {
                    value: Value::rvalue(ty.clone()),
                    model: ExprModel::lit("{}"),
                });
                Param {
                    name: f.name.clone(),
                    ty,
                    mutable: false,
                    variadic: false,
                    default: Some(default),
                    hidden: !f.public && foreign,
                }
            })
            .collect();

        let args = self.call_args(inner, whole, Some(&params))?;
        let bound =
            bind(&s.name, &params, args, Strategy::Struct, whole).map_err(|d| self.report(d))?;
        for (slot, param) in bound.slots.iter().zip(&params) {
            if let Bound::Arg(arg) = slot {
                self.queue_leaf(LeafKind::Argument, param.ty.clone(), arg.value.clone(), arg.span);
            }
        }
        let fields = params
            .iter()
            .map(|p| p.name.clone())
            .zip(bound.models(&params))
            .collect();
        let model = ExprModel::StructLit {
            ty: ty.to_string(),
            fields,
        };
        Ok(Operand::plain(Value::rvalue(ty.clone()), model, span))
    }
}
