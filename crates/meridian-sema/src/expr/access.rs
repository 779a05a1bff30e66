//! Identifiers, member access, indexing and slicing.

use std::sync::Arc;

use meridian_ast::{Op, Span, Token, TokenKind, parse_whole, split_top_level};
use meridian_core::{Diagnostic, ErrorKey};

use super::{Operand, Target, span_of};
use crate::checker::{Check, Checker, Resolved};
use crate::conversion::check_assignable;
use crate::defs::Definition;
use crate::generics::bind_generics;
use crate::model::ExprModel;
use crate::scope::LocalKind;
use crate::types::{ArraySize, Prim, StructRef, Type, TypeKind};
use crate::value::{ConstValue, Value, ValueFlags};

/// Value of a named storage location.
fn stored(
    ty: Type,
    mutable: bool,
    is_const: bool,
    constant: Option<ConstValue>,
    untyped: bool,
) -> Value {
    let mut value = Value::lvalue(ty, mutable && !is_const);
    if is_const {
        value.flags.insert(ValueFlags::CONSTANT);
        value.flags.set(ValueFlags::UNTYPED, untyped);
        value.constant = constant;
    }
    value
}

/// Index of a `:` outside any nested bracket.
pub(super) fn top_level_colon(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match &tok.kind {
            k if k.is_open() => depth += 1,
            k if k.is_close() => depth = depth.saturating_sub(1),
            TokenKind::Colon if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

impl Checker<'_> {
    pub(super) fn ident_operand(&mut self, tok: &Token) -> Check<Operand> {
        let name = tok.lexeme.as_str();
        let span = tok.span;
        match self.lookup(name, span)? {
            Resolved::Local(local) => match local.kind {
                LocalKind::Var(var) => {
                    let mut value = stored(
                        var.ty,
                        var.mutable,
                        var.is_const,
                        var.constant,
                        var.untyped,
                    );
                    value.flags.set(ValueFlags::POINTEE_CONST, var.pointee_const);
                    Ok(Operand::plain(value, ExprModel::ident(name), span))
                }
                LocalKind::Alias(ty) | LocalKind::Generic(ty) => {
                    Ok(Operand::type_literal(ty, span))
                }
            },
            Resolved::Type(ty) => Ok(Operand::type_literal(ty, span)),
            Resolved::Builtin(builtin) => Ok(Operand {
                value: Value::void(),
                model: ExprModel::ident(name),
                target: Target::Builtin(builtin),
                span,
            }),
            Resolved::Def(def) => self.def_operand(def, ExprModel::ident(name), span),
        }
    }

    /// Operand for a package-level definition.
    fn def_operand(&mut self, def: Definition, model: ExprModel, span: Span) -> Check<Operand> {
        match def {
            Definition::Global(id) => {
                let ty = self.ensure_global(id)?;
                let g = &self.reg()[id];
                let value = stored(ty, g.is_mutable(), g.is_const(), g.constant.clone(), g.untyped);
                Ok(Operand::plain(value, model, span))
            }
            Definition::Fn(id) => {
                self.ensure_fn(id)?;
                let sig = self.reg()[id].sig();
                Ok(Operand {
                    value: Value::rvalue(Type::func(sig)),
                    model,
                    target: Target::Func {
                        id,
                        generics: Vec::new(),
                    },
                    span,
                })
            }
            Definition::Struct(id) if self.reg()[id].is_generic() => {
                // Placeholders until `[...]` or a literal supplies the tuple.
                let def = &self.reg()[id];
                let ty = TypeKind::Struct(StructRef {
                    id,
                    name: Arc::from(def.meta.name.as_str()),
                    generics: def.generics.iter().map(|g| Type::generic(g.clone())).collect(),
                })
                .into();
                Ok(Operand::type_literal(ty, span))
            }
            Definition::Struct(_)
            | Definition::Trait(_)
            | Definition::Enum(_)
            | Definition::Alias(_) => {
                let ty = self.def_type(def, Vec::new(), span)?;
                Ok(Operand::type_literal(ty, span))
            }
            Definition::Namespace(pkg) => Ok(Operand {
                value: Value::void(),
                model,
                target: Target::Namespace(pkg),
                span,
            }),
        }
    }

    pub(super) fn member(
        &mut self,
        operand: Operand,
        name: &str,
        name_span: Span,
    ) -> Check<Operand> {
        let span = operand.span.merge(name_span);
        if let Target::Namespace(pkg) = operand.target {
            let def = self.namespace_member(pkg, name, name_span)?;
            let model = ExprModel::ident(format!("{}::{name}", operand.model));
            return self.def_operand(def, model, span);
        }
        let (value, base) = self.finish(operand)?;
        let missing = |ty: &Type| {
            Diagnostic::new(ErrorKey::ObjHaveNotId, name_span)
                .arg(name)
                .arg(ty.spelled())
        };

        if value.is_type_literal() {
            return match &value.ty.kind {
                TypeKind::Enum(e) => {
                    self.ensure_enum(e.id)?;
                    let Some(item) = self.reg()[e.id].item(name) else {
                        return self.fail(missing(&value.ty));
                    };
                    let model = ExprModel::ident(format!("{}::{name}", value.ty));
                    let item = Value::constant(value.ty.clone(), ConstValue::Int(item));
                    Ok(Operand::plain(item, model, span))
                }
                TypeKind::Struct(s) => {
                    let method = self.reg()[s.id].methods.get(name).copied();
                    let Some(method) = method.filter(|&m| self.reg()[m].decl.receiver.is_none())
                    else {
                        return self.fail(missing(&value.ty));
                    };
                    self.ensure_fn(method)?;
                    let bindings = bind_generics(&self.reg()[method].generics, &s.generics);
                    let sig = self.reg()[method].sig().substitute(&bindings);
                    Ok(Operand {
                        value: Value::rvalue(Type::func(sig)),
                        model: ExprModel::ident(format!("{}::{name}", value.ty)),
                        target: Target::Func {
                            id: method,
                            generics: s.generics.clone(),
                        },
                        span,
                    })
                }
                _ => self.fail(missing(&value.ty)),
            };
        }

        let (through, inner) = match &value.ty.kind {
            TypeKind::Ptr(inner) | TypeKind::Ref(inner) => (true, (**inner).clone()),
            _ => (false, value.ty.clone()),
        };
        let base = if value.ty.is_ptr() {
            ExprModel::unary(Op::Star, base)
        } else {
            base
        };
        match &inner.kind {
            TypeKind::Struct(s) => {
                self.ensure_struct(s.id)?;
                let def = &self.reg()[s.id];
                let bindings = bind_generics(&def.generics, &s.generics);
                if let Some(field) = def.field(name) {
                    if !field.public && def.meta.package != self.pkg {
                        let diag =
                            Diagnostic::new(ErrorKey::IdentIsNotAccessible, name_span).arg(name);
                        return self.fail(diag);
                    }
                    let ty = field.ty.substitute(&bindings);
                    let result = if value.is_lvalue() || through {
                        Value::lvalue(ty, value.is_mutable() || through || field.mutable)
                    } else {
                        Value::rvalue(ty)
                    };
                    return Ok(Operand::plain(result, ExprModel::member(base, name), span));
                }
                let method = def.methods.get(name).copied();
                let Some(method) = method.filter(|&m| self.reg()[m].decl.receiver.is_some()) else {
                    return self.fail(missing(&value.ty));
                };
                self.ensure_fn(method)?;
                let m = &self.reg()[method];
                if m.by_ref() && !through {
                    let diag =
                        Diagnostic::new(ErrorKey::RefMethodUsedWithNonRefInstance, name_span)
                            .arg(name);
                    return self.fail(diag);
                }
                let sig = m.sig().substitute(&bindings);
                Ok(Operand {
                    value: Value::rvalue(Type::func(sig)),
                    model: ExprModel::member(base, name),
                    target: Target::Func {
                        id: method,
                        generics: s.generics.clone(),
                    },
                    span,
                })
            }
            TypeKind::Trait(t) => {
                self.ensure_trait(t.id)?;
                let Some(method) = self.reg()[t.id].method(name) else {
                    return self.fail(missing(&value.ty));
                };
                let sig = method.sig.clone();
                Ok(Operand::plain(
                    Value::rvalue(Type::func(sig)),
                    ExprModel::member(base, name),
                    span,
                ))
            }
            _ => self.fail(missing(&value.ty)),
        }
    }

    /// Generic arguments written in brackets.
    fn type_args(&mut self, tokens: &[Token], span: Span) -> Check<Vec<Type>> {
        let mut tuple = Vec::new();
        for part in split_top_level(tokens, &TokenKind::Comma) {
            let Some(ty) = parse_whole(part) else {
                let text = part.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>().join(" ");
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidSyntax, span_of(part, span)).arg(text),
                );
            };
            tuple.push(self.resolve_type(&ty)?);
        }
        Ok(tuple)
    }

    /// `base[...]`: explicit generics, slicing or indexing.
    pub(super) fn bracket(
        &mut self,
        operand: Operand,
        inner: &[Token],
        whole: Span,
    ) -> Check<Operand> {
        let span = operand.span.merge(whole);

        if let Target::Func { id, generics } = &operand.target {
            let def = &self.reg()[*id];
            if def.owner.is_none() && def.is_generic() && generics.is_empty() {
                let (id, name, expected) = (*id, def.meta.name.clone(), def.generics.len());
                let tuple = self.type_args(inner, whole)?;
                self.check_generic_arity(&name, expected, tuple.len(), whole)?;
                self.instantiate_fn(id, tuple.clone(), whole)?;
                let def = &self.reg()[id];
                let sig = def.sig().substitute(&bind_generics(&def.generics, &tuple));
                let model = ExprModel::Instance {
                    name,
                    generics: tuple.iter().map(Type::to_string).collect(),
                };
                return Ok(Operand {
                    value: Value::rvalue(Type::func(sig)),
                    model,
                    target: Target::Func { id, generics: tuple },
                    span,
                });
            }
        }

        if operand.value.is_type_literal() {
            let ty = &operand.value.ty;
            let open = match &ty.kind {
                TypeKind::Struct(s) if self.reg()[s.id].is_generic() => {
                    s.generics.iter().all(|g| matches!(g.kind, TypeKind::Generic(_)))
                }
                _ => false,
            };
            let Some(s) = ty.as_struct().filter(|_| open) else {
                return self.fail(
                    Diagnostic::new(ErrorKey::NotHasGenerics, whole).arg(ty.spelled()),
                );
            };
            let id = s.id;
            let tuple = self.type_args(inner, whole)?;
            let ty = self.def_type(Definition::Struct(id), tuple, whole)?;
            return Ok(Operand::type_literal(ty, span));
        }

        let (value, base) = self.finish(operand)?;
        if let Some(colon) = top_level_colon(inner) {
            return self.slice(value, base, &inner[..colon], &inner[colon + 1..], whole, span);
        }

        let (index, index_model) = {
            let operand = self.eval_tokens(inner, whole)?;
            self.finish(operand)?
        };
        let index_span = span_of(inner, whole);
        let through = value.ty.is_ref();
        let writable = value.is_mutable() || through;
        let addressable = value.is_lvalue() || through;
        let element = |ty: Type| {
            if addressable {
                Value::lvalue(ty, writable)
            } else {
                Value::rvalue(ty)
            }
        };
        let result = match &value.ty.deref_ref().kind {
            TypeKind::Map { key, value: item } => {
                let result = check_assignable(self.reg(), self.opts(), key, &index, index_span);
                self.or_report(result)?;
                element((**item).clone())
            }
            TypeKind::Ptr(inner) => {
                self.require_index(&index, index_span, None)?;
                Value::lvalue((**inner).clone(), true)
            }
            TypeKind::Array { elem, size } => {
                let limit = match size {
                    ArraySize::Fixed(n) => Some(*n),
                    ArraySize::Auto => None,
                };
                self.require_index(&index, index_span, limit)?;
                element((**elem).clone())
            }
            TypeKind::Slice(elem) => {
                self.require_index(&index, index_span, None)?;
                element((**elem).clone())
            }
            TypeKind::Prim(Prim::Str) => {
                self.require_index(&index, index_span, None)?;
                Value::rvalue(Type::prim(Prim::U8))
            }
            _ => {
                return self.fail(
                    Diagnostic::new(ErrorKey::NotSupportsIndexing, whole).arg(value.ty.spelled()),
                );
            }
        };
        let model = ExprModel::Index {
            base: Box::new(base),
            index: Box::new(index_model),
        };
        Ok(Operand::plain(result, model, span))
    }

    /// An index must be an integer; a constant one must be in range.
    fn require_index(&mut self, index: &Value, span: Span, limit: Option<u64>) -> Check<()> {
        if !index.ty.is_integer() {
            return self.fail(
                Diagnostic::new(ErrorKey::IncompatibleTypes, span)
                    .arg(index.ty.spelled())
                    .arg("int"),
            );
        }
        if let Some(ConstValue::Int(n)) = index.constant {
            let over = limit.is_some_and(|limit| n >= i128::from(limit));
            if n < 0 || over {
                let bound = limit.map_or_else(|| "int".to_string(), |l| format!("[0, {l})"));
                return self.fail(
                    Diagnostic::new(ErrorKey::OverflowLimits, span).arg(n.to_string()).arg(bound),
                );
            }
        }
        Ok(())
    }

    fn slice(
        &mut self,
        value: Value,
        base: ExprModel,
        start: &[Token],
        end: &[Token],
        whole: Span,
        span: Span,
    ) -> Check<Operand> {
        let ty = match &value.ty.deref_ref().kind {
            TypeKind::Array { elem, .. } => Type::slice((**elem).clone()),
            TypeKind::Slice(_) => value.ty.deref_ref().clone(),
            TypeKind::Prim(Prim::Str) => Type::str(),
            _ => {
                return self.fail(
                    Diagnostic::new(ErrorKey::NotSupportsSlicing, whole).arg(value.ty.spelled()),
                );
            }
        };
        let mut bounds = [None, None];
        for (slot, tokens) in bounds.iter_mut().zip([start, end]) {
            if tokens.is_empty() {
                continue;
            }
            let operand = self.eval_tokens(tokens, whole)?;
            let (bound, model) = self.finish(operand)?;
            self.require_index(&bound, span_of(tokens, whole), None)?;
            *slot = Some(Box::new(model));
        }
        let [start, end] = bounds;
        let model = ExprModel::Slice {
            base: Box::new(base),
            start,
            end,
        };
        Ok(Operand::plain(Value::rvalue(ty), model, span))
    }
}

#[cfg(test)]
mod tests {
    use meridian_ast::testing::*;
    use meridian_core::ErrorKey;

    use super::top_level_colon;
    use crate::{CheckOptions, Session};

    fn check(
        decls: Vec<meridian_ast::Decl>,
        stmts: Vec<meridian_ast::Stmt>,
    ) -> (Vec<ErrorKey>, String) {
        let mut all = decls;
        all.push(func("main").body(stmts).decl());
        let mut session = Session::new(CheckOptions::default().with_parallel_leaf_checks(false));
        session.add_package("app", vec![file("app/main.mer", all)]).unwrap();
        let _ = session.check("app");
        let keys = session.diagnostics().errors().iter().map(|d| d.key).collect();
        let body = session
            .output("app")
            .and_then(|out| out.instances("main").next().cloned())
            .map(|f| f.to_string())
            .unwrap_or_default();
        (keys, body)
    }

    #[test]
    fn colon_inside_brackets_is_not_a_slice() {
        assert_eq!(top_level_colon(&lex("a:b")), Some(1));
        assert_eq!(top_level_colon(&lex("[int:int]{}")), None);
        assert_eq!(top_level_colon(&lex(":")), Some(0));
    }

    #[test]
    fn fields_and_privacy() {
        let point = struct_("Point").pub_field("x", "int").field("y", "int").decl();
        let (keys, body) = check(
            vec![point],
            vec![let_mut("p", "Point{x: 1, y: 2}"), assign(&["p.x"], &["3"]), let_("a", "p.y")],
        );
        assert!(keys.is_empty(), "{keys:?}");
        assert!(body.contains("p.x = 3"), "{body}");
    }

    #[test]
    fn immutable_base_rejects_field_store() {
        let point = struct_("Point").pub_field("x", "int").decl();
        let (keys, _) = check(
            vec![point],
            vec![let_("p", "Point{x: 1}"), assign(&["p.x"], &["3"])],
        );
        assert_eq!(keys, vec![ErrorKey::AssignmentToNonMut]);
    }

    #[test]
    fn unknown_member() {
        let point = struct_("Point").pub_field("x", "int").decl();
        let (keys, _) = check(vec![point], vec![let_("p", "Point{x: 1}"), let_("a", "p.z")]);
        assert_eq!(keys, vec![ErrorKey::ObjHaveNotId]);
    }

    #[test]
    fn enum_items_are_constants() {
        let color = enum_("Color", None, &[("Red", None), ("Green", Some("4"))]);
        let (keys, body) = check(
            vec![color],
            vec![let_("c", "Color.Green"), let_("n", "Color.Blue")],
        );
        assert_eq!(keys, vec![ErrorKey::ObjHaveNotId]);
        assert!(body.contains("Color c = Color::Green"), "{body}");
    }

    #[test]
    fn indexing() {
        let (keys, _) = check(
            vec![],
            vec![
                let_typed("a", "[3]int", None),
                let_("x", "a[2]"),
                let_("y", "a[3]"),
                let_("z", "a[true]"),
                let_("n", "7"),
                let_("w", "n[0]"),
            ],
        );
        assert_eq!(
            keys,
            vec![
                ErrorKey::OverflowLimits,
                ErrorKey::IncompatibleTypes,
                ErrorKey::NotSupportsIndexing
            ]
        );
    }

    #[test]
    fn maps_check_key_type() {
        let (keys, _) = check(
            vec![],
            vec![
                let_("m", "[str:int]{\"a\": 1}"),
                let_("x", "m[\"a\"]"),
                let_("y", "m[1]"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::IncompatibleTypes]);
    }

    #[test]
    fn slicing() {
        let (keys, body) = check(
            vec![],
            vec![
                let_typed("a", "[4]int", None),
                let_typed("s", "[]int", Some("a[1:3]")),
                let_("t", "s[:2]"),
                let_("u", "\"abc\"[1:]"),
                let_("b", "true"),
                let_("v", "b[0:1]"),
            ],
        );
        assert_eq!(keys, vec![ErrorKey::NotSupportsSlicing]);
        assert!(body.contains("a.slice(1, 3)"), "{body}");
        assert!(body.contains("s.slice(0, 2)"), "{body}");
    }
}
