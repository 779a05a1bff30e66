//! Calls, casts and built-in functions.

use meridian_ast::{Ident, Span, Token, TokenKind, matching_close, split_top_level};
use meridian_core::{Diagnostic, ErrorKey};
use ordered_float::OrderedFloat;
use tracing::trace;

use super::{Operand, Target, span_of};
use crate::binder::{Arg, Bound, BoundArgs, Param, Strategy, bind};
use crate::checker::{Builtin, Check, Checker};
use crate::conversion::range::check_fits;
use crate::conversion::{check_castable, check_mutability};
use crate::defs::FnId;
use crate::generics::{bind_generics, infer};
use crate::leaf::LeafKind;
use crate::model::ExprModel;
use crate::types::{ArraySize, Bindings, Prim, Type, TypeKind};
use crate::value::{ConstValue, Value};

/// Tokens of a bare `{...}` item, without the braces.
pub(super) fn bare_braces(tokens: &[Token]) -> Option<&[Token]> {
    match tokens.first() {
        Some(first) if first.kind == TokenKind::LBrace => {
            let close = matching_close(tokens, 0)?;
            (close + 1 == tokens.len()).then(|| &tokens[1..close])
        }
        _ => None,
    }
}

/// Constant produced by converting `constant` to `target`.
fn fold_cast(constant: &ConstValue, target: &Type) -> Option<ConstValue> {
    match (constant, &target.kind) {
        (ConstValue::Int(v), TypeKind::Prim(p)) if p.is_integer() => Some(ConstValue::Int(*v)),
        (ConstValue::Float(v), TypeKind::Prim(p)) if p.is_integer() => Some(
            ConstValue::Int(v.0.trunc() as i128),
        ),
        (ConstValue::Int(v), TypeKind::Prim(p)) if p.is_float() => Some(
            ConstValue::Float(OrderedFloat(*v as f64)),
        ),
        (ConstValue::Float(v), TypeKind::Prim(p)) if p.is_float() => Some(ConstValue::Float(*v)),
        (ConstValue::Bool(b), TypeKind::Prim(Prim::Bool)) => Some(ConstValue::Bool(*b)),
        (ConstValue::Str(s), TypeKind::Prim(Prim::Str)) => Some(ConstValue::Str(s.clone())),
        (ConstValue::Int(v), TypeKind::Enum(_)) => Some(ConstValue::Int(*v)),
        _ => None,
    }
}

impl Checker<'_> {
    pub(super) fn call(
        &mut self,
        operand: Operand,
        inner: &[Token],
        whole: Span,
    ) -> Check<Operand> {
        let span = operand.span.merge(whole);
        if operand.value.is_type_literal() {
            return self.cast(operand.value.ty, inner, whole, span);
        }
        match operand.target.clone() {
            Target::Builtin(Builtin::Len) => self.len(inner, whole, span),
            Target::Builtin(Builtin::Append) => self.append(inner, whole, span),
            Target::Func { id, generics } => self.call_fn(
                id,
                generics,
                operand.model,
                inner,
                whole,
                span,
            ),
            Target::Namespace(_) => {
                let text = operand.model.to_string();
                self.fail(Diagnostic::new(ErrorKey::NotCallable, operand.span).arg(text))
            }
            Target::Plain => {
                let Some(sig) = operand.value.ty.as_fn().cloned() else {
                    return self.fail(
                        Diagnostic::new(ErrorKey::NotCallable, operand.span)
                            .arg(operand.value.ty.spelled()),
                    );
                };
                let params: Vec<Param> = sig
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Param::from_sig(i, p))
                    .collect();
                let args = self.call_args(inner, whole, Some(&params))?;
                let strategy = Strategy::for_call(&args);
                let name = operand.model.to_string();
                let bound =
                    bind(&name, &params, args, strategy, whole).map_err(|d| self.report(d))?;
                self.finish_call(&params, &bound, sig.ret.clone(), operand.model, span)
            }
        }
    }

    /// Evaluate call arguments. `x: value` targets parameter `x`. A bare
    /// `{...}` argument is typed by the parameter it lands in.
    pub(super) fn call_args(
        &mut self,
        inner: &[Token],
        whole: Span,
        params: Option<&[Param]>,
    ) -> Check<Vec<Arg>> {
        let parts = split_top_level(inner, &TokenKind::Comma);
        let mut args = Vec::with_capacity(parts.len());
        for (i, part) in parts.into_iter().enumerate() {
            let (target, tokens) = match part {
                [name, colon, rest @ ..]
                    if name.kind == TokenKind::Ident && colon.kind == TokenKind::Colon =>
                {
                    (Some(Ident::new(name.lexeme.as_str(), name.span)), rest)
                }
                _ => (None, part),
            };
            let span = span_of(tokens, whole);
            let expected = params.and_then(|params| match &target {
                Some(t) => params.iter().find(|p| p.name == t.name),
                None => params.get(i),
            });
            let (value, model) = match (bare_braces(tokens), expected) {
                (Some(body), Some(param)) if !param.ty.has_generics() => {
                    let operand = self.composite_of(&param.ty, body, span, span)?;
                    (operand.value, operand.model)
                }
                _ => {
                    let operand = self.eval_tokens(tokens, span)?;
                    self.finish(operand)?
                }
            };
            if value.is_type_literal() {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidExpr, span).arg(value.ty.spelled()),
                );
            }
            args.push(Arg {
                target,
                value,
                model,
                span,
            });
        }
        Ok(args)
    }

    fn cast(&mut self, target: Type, inner: &[Token], whole: Span, span: Span) -> Check<Operand> {
        let parts = split_top_level(inner, &TokenKind::Comma);
        let part = match parts.as_slice() {
            [] => return self.fail(Diagnostic::new(ErrorKey::MissingExpr, whole)),
            [part] => *part,
            [_, extra, ..] => {
                let diag = Diagnostic::new(ErrorKey::ArgumentOverflow, span_of(extra, whole))
                    .arg(target.spelled());
                return self.fail(diag);
            }
        };
        let operand = self.eval_tokens(part, whole)?;
        let (value, model) = self.finish(operand)?;
        let result = check_castable(self.reg(), self.opts(), &target, &value, span);
        self.or_report(result)?;

        let folded = value.constant.as_ref().and_then(|c| fold_cast(c, &target));
        if let (Some(c @ ConstValue::Int(_)), Some(prim)) = (&folded, target.prim_kind()) {
            let fits = check_fits(prim, c, self.int_bits(), span);
            self.or_report(fits)?;
        }
        let result = match folded {
            Some(c) => Value::constant(target.clone(), c),
            None => Value::rvalue(target.clone()),
        };
        let model = ExprModel::Cast {
            ty: target.to_string(),
            expr: Box::new(model),
        };
        Ok(Operand::plain(result, model, span))
    }

    /// The single argument of a one-argument builtin.
    fn single_arg(&mut self, name: &str, mut args: Vec<Arg>, whole: Span) -> Check<Arg> {
        match args.len() {
            0 => self.fail(Diagnostic::new(ErrorKey::MissingArgumentFor, whole).arg(name)),
            1 => Ok(args.remove(0)),
            _ => self.fail(Diagnostic::new(ErrorKey::ArgumentOverflow, args[1].span).arg(name)),
        }
    }

    fn len(&mut self, inner: &[Token], whole: Span, span: Span) -> Check<Operand> {
        let args = self.call_args(inner, whole, None)?;
        let arg = self.single_arg("len", args, whole)?;
        let value = match &arg.value.ty.deref_ref().kind {
            TypeKind::Array {
                size: ArraySize::Fixed(n),
                ..
            } => Value::constant(Type::int(), ConstValue::Int(i128::from(*n))),
            TypeKind::Slice(_) | TypeKind::Map { .. } => Value::rvalue(Type::int()),
            TypeKind::Prim(Prim::Str) => match &arg.value.constant {
                Some(ConstValue::Str(s)) => Value::constant(
                    Type::int(),
                    ConstValue::Int(s.len() as i128),
                ),
                _ => Value::rvalue(Type::int()),
            },
            _ => {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidExpr, arg.span).arg(arg.value.ty.spelled()),
                );
            }
        };
        let model = ExprModel::call(ExprModel::ident("len"), vec![arg.model]);
        Ok(Operand::plain(value, model, span))
    }

    fn append(&mut self, inner: &[Token], whole: Span, span: Span) -> Check<Operand> {
        let mut args = self.call_args(inner, whole, None)?;
        if args.is_empty() {
            return self.fail(Diagnostic::new(ErrorKey::MissingArgumentFor, whole).arg("append"));
        }
        let dest = args.remove(0);
        let TypeKind::Slice(elem) = &dest.value.ty.kind else {
            return self.fail(
                Diagnostic::new(ErrorKey::InvalidExpr, dest.span).arg(dest.value.ty.spelled()),
            );
        };
        let elem = (**elem).clone();
        match args.as_slice() {
            [spread] if spread.value.is_variadic() => {
                self.queue_leaf(
                    LeafKind::Argument,
                    dest.value.ty.clone(),
                    spread.value.clone(),
                    spread.span,
                );
            }
            items => {
                if let Some(spread) = items.iter().find(|a| a.value.is_variadic()) {
                    return self.fail(
                        Diagnostic::new(ErrorKey::MoreArgsWithVariadiced, spread.span),
                    );
                }
                for item in items {
                    self.queue_leaf(
                        LeafKind::Argument,
                        elem.clone(),
                        item.value.clone(),
                        item.span,
                    );
                }
            }
        }
        let mut models = vec![dest.model];
        models.extend(args.into_iter().map(|a| a.model));
        let model = ExprModel::call(ExprModel::ident("append"), models);
        Ok(Operand::plain(Value::rvalue(dest.value.ty), model, span))
    }

    /// Call a declared function or method.
    ///
    /// `explicit` holds bracketed generics of a free function or the tuple
    /// of a method's owner. Missing generics of a free function are
    /// inferred from the arguments.
    fn call_fn(
        &mut self,
        id: FnId,
        explicit: Vec<Type>,
        callee: ExprModel,
        inner: &[Token],
        whole: Span,
        span: Span,
    ) -> Check<Operand> {
        self.ensure_fn(id)?;
        let def = &self.reg()[id];
        let (name, names, params, ret) = (
            def.meta.name.clone(),
            def.generics.clone(),
            def.params.clone(),
            def.ret.clone(),
        );
        let inferred = def.owner.is_none() && def.is_generic() && explicit.is_empty();

        let mut bindings = bind_generics(&names, &explicit);
        let typed: Vec<Param> = params.iter().map(|p| self.concrete(p, &bindings)).collect();
        let args = self.call_args(inner, whole, Some(&typed))?;
        let strategy = Strategy::for_call(&args);
        let bound = bind(&name, &params, args, strategy, whole).map_err(|d| self.report(d))?;

        let mut callee = callee;
        if inferred {
            self.infer_generics(&name, &params, &bound, &mut bindings, whole)?;
            let mut tuple = Vec::with_capacity(names.len());
            for n in &names {
                match bindings.get(n) {
                    Some(ty) => tuple.push(ty.clone()),
                    None => return self.fail(
                        Diagnostic::new(ErrorKey::MissingGenerics, whole).arg(name),
                    ),
                }
            }
            trace!(name = %name, "inferred generics");
            callee = ExprModel::Instance {
                name: name.clone(),
                generics: tuple.iter().map(Type::to_string).collect(),
            };
            self.instantiate_fn(id, tuple, span)?;
        }

        let concrete: Vec<Param> = params.iter().map(|p| self.concrete(p, &bindings)).collect();
        self.finish_call(&concrete, &bound, ret.substitute(&bindings), callee, span)
    }

    fn concrete(&self, param: &Param, bindings: &Bindings) -> Param {
        Param {
            ty: param.ty.substitute(bindings),
            ..param.clone()
        }
    }

    fn infer_generics(
        &mut self,
        name: &str,
        params: &[Param],
        bound: &BoundArgs,
        bindings: &mut Bindings,
        whole: Span,
    ) -> Check<()> {
        for (slot, param) in bound.slots.iter().zip(params) {
            let pairs: Vec<(Type, &Type, Span)> = match slot {
                Bound::Arg(arg) => vec![(param.ty.clone(), &arg.value.ty, arg.span)],
                Bound::Variadic(args) => {
                    args.iter().map(|a| (param.ty.clone(), &a.value.ty, a.span)).collect()
                }
                Bound::Spread(arg) => {
                    vec![(Type::slice(param.ty.clone()), &arg.value.ty, arg.span)]
                }
                Bound::Forwarded { ty, .. } => vec![(param.slot_type(), ty, whole)],
                Bound::Default(_) => Vec::new(),
            };
            for (pattern, actual, span) in pairs {
                if let Err(key) = infer(&pattern, actual, bindings) {
                    return self.fail(Diagnostic::new(key, span).arg(name));
                }
            }
        }
        Ok(())
    }

    /// Queue argument checks and build the call value.
    fn finish_call(
        &mut self,
        params: &[Param],
        bound: &BoundArgs,
        ret: Type,
        callee: ExprModel,
        span: Span,
    ) -> Check<Operand> {
        let forwarded_span = bound.forwarded.as_ref().map_or(span, |a| a.span);
        for (slot, param) in bound.slots.iter().zip(params) {
            if param.ty.has_generics() {
                continue;
            }
            match slot {
                Bound::Arg(arg) => {
                    self.queue_leaf(
                        LeafKind::Argument,
                        param.ty.clone(),
                        arg.value.clone(),
                        arg.span,
                    );
                    self.or_report(check_mutability(param.mutable, &arg.value, arg.span))?;
                }
                Bound::Variadic(args) => {
                    for arg in args {
                        self.queue_leaf(
                            LeafKind::Argument,
                            param.ty.clone(),
                            arg.value.clone(),
                            arg.span,
                        );
                        self.or_report(check_mutability(param.mutable, &arg.value, arg.span))?;
                    }
                }
                Bound::Spread(arg) => {
                    self.queue_leaf(
                        LeafKind::Argument,
                        param.slot_type(),
                        arg.value.clone(),
                        arg.span,
                    );
                }
                Bound::Forwarded { ty, .. } => {
                    self.queue_leaf(
                        LeafKind::Argument,
                        param.slot_type(),
                        Value::rvalue(ty.clone()),
                        forwarded_span,
                    );
                }
                Bound::Default(_) => {}
            }
        }
        let model = ExprModel::call(callee, bound.models(params));
        Ok(Operand::plain(Value::rvalue(ret), model, span))
    }
}

#[cfg(test)]
mod tests {
    use meridian_ast::testing::*;
    use meridian_core::ErrorKey;

    use crate::{CheckOptions, Session};

    fn check(
        decls: Vec<meridian_ast::Decl>,
        stmts: Vec<meridian_ast::Stmt>,
    ) -> (Vec<ErrorKey>, Session) {
        let mut all = decls;
        all.push(func("main").body(stmts).decl());
        let mut session = Session::new(CheckOptions::default().with_parallel_leaf_checks(false));
        session.add_package("app", vec![file("app/main.mer", all)]).unwrap();
        let _ = session.check("app");
        let keys = session.diagnostics().errors().iter().map(|d| d.key).collect();
        (keys, session)
    }

    fn main_body(session: &Session) -> String {
        session
            .output("app")
            .and_then(|out| out.instances("main").next())
            .map(|f| f.to_string())
            .unwrap_or_default()
    }

    fn identity() -> meridian_ast::Decl {
        func("id").generics(&["T"]).param("x", "T").ret("T").body(vec![ret(&["x"])]).decl()
    }

    #[test]
    fn positional_and_targeted_calls() {
        let add = func("add").param("a", "int").param_default("b", "int", "10").ret("int");
        let add = add.body(vec![ret(&["a + b"])]).decl();
        let (keys, s) = check(
            vec![add],
            vec![
                let_("x", "add(1, 2)"),
                let_("y", "add(1)"),
                let_("z", "add(b: 3, a: 4)"),
                let_("w", "add()"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::MissingArgumentFor]);
        let body = main_body(&s);
        assert!(body.contains("add(1, 10)"), "{body}");
        assert!(body.contains("add(4, 3)"), "{body}");
    }

    #[test]
    fn argument_types_are_checked_at_the_barrier() {
        let f = func("f").param("s", "str").body(vec![]).decl();
        let (keys, _) = check(vec![f], vec![expr_stmt("f(1)"), expr_stmt("f(\"ok\")")]);
        assert_eq!(keys, vec![ErrorKey::IncompatibleTypes]);
    }

    #[test]
    fn generic_inference_and_instances() {
        let id = identity();
        let (keys, s) = check(
            vec![id],
            vec![
                let_("a", "id(1)"),
                let_("b", "id(\"s\")"),
                let_("c", "id(2)"),
                let_("d", "id[f64](1)"),
                let_("e", "id(nil)"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::NilForAutotype]);
        let out = s.output("app").unwrap();
        let mut instances: Vec<_> = out.instances("id").map(|f| f.generics.join(",")).collect();
        instances.sort();
        assert_eq!(instances, vec!["f64", "int", "str"]);
        assert!(main_body(&s).contains("id<int>(1)"));
    }

    #[test]
    fn generic_function_needs_generics_as_value() {
        let id = identity();
        let (keys, _) = check(vec![id], vec![let_("f", "id"), let_("g", "id[int]")]);
        assert_eq!(keys, vec![ErrorKey::MissingGenerics]);
    }

    #[test]
    fn variadic_arguments() {
        let sum = func("sum")
            .variadic_param("xs", "int")
            .ret("int")
            .body(vec![ret(&["len(xs)"])])
            .decl();
        let (keys, s) = check(
            vec![sum],
            vec![
                let_("a", "sum(1, 2, 3)"),
                let_typed("v", "[]int", Some("[]int{1, 2}")),
                let_("b", "sum(v...)"),
                let_("c", "sum(1, v...)"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::MoreArgsWithVariadiced]);
        assert!(main_body(&s).contains("sum([]int{1, 2, 3})"), "{}", main_body(&s));
    }

    #[test]
    fn casts() {
        let (keys, _) = check(
            vec![],
            vec![
                let_("a", "u8(255)"),
                let_("b", "u8(256)"),
                let_("c", "f64(3)"),
                let_("d", "bool(1)"),
                let_("e", "int(1, 2)"),
            ],
        );
        assert_eq!(
            keys,
            vec![
                ErrorKey::OverflowLimits,
                ErrorKey::TypeNotSupportsCastingTo,
                ErrorKey::ArgumentOverflow
            ]
        );
    }

    #[test]
    fn builtins() {
        let (keys, _) = check(
            vec![],
            vec![
                let_typed("a", "[4]int", None),
                const_("n", Some("len(a)")),
                let_typed("s", "[]int", None),
                let_("t", "append(s, 1, 2)"),
                let_("u", "append(s, \"x\")"),
                let_("v", "len(1)"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::InvalidExpr, ErrorKey::IncompatibleTypes]);
    }

    #[test]
    fn calling_a_non_function() {
        let (keys, _) = check(vec![], vec![let_("x", "1"), expr_stmt("x()")]);
        assert_eq!(keys, vec![ErrorKey::NotCallable]);
    }

    #[test]
    fn function_values() {
        let (keys, _) = check(
            vec![],
            vec![let_typed("f", "fn(int): int", None), let_("a", "f(1)"), let_("b", "f(\"s\")")],
        );
        assert_eq!(keys, vec![ErrorKey::IncompatibleTypes]);
    }
}
