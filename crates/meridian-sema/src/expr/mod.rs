//! Expression evaluation.
//!
//! Expressions arrive as token spans. The scanner cuts a span into operands
//! separated by binary operators; each operand is a chain of unary
//! prefixes, one primary and any number of postfix accessors (member,
//! call, index, composite body, spread). The binary operators are then
//! folded highest tier first, leftmost first, until one value remains.
//!
//! Intermediate results are [`Operand`]s: a value plus what the expression
//! names when it is not a plain value (a function, a builtin, an imported
//! package). [`Checker::finish`] turns an operand into a value usable on its
//! own, rejecting the ones that are not.

use meridian_ast::{Expr, Op, Span, Token, TokenKind, matching_close, parse_type, split_top_level};
use meridian_core::{Diagnostic, ErrorKey};

use crate::checker::{Builtin, Check, Checker};
use crate::defs::{FnId, PackageId};
use crate::model::ExprModel;
use crate::operators::{precedence, solve_binary, solve_unary};
use crate::types::{Type, TypeKind};
use crate::value::{Value, ValueFlags};

mod access;
mod call;
mod composite;
mod literal;

/// What an operand names besides its value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    Plain,
    /// A function or method. `generics` holds explicit generic arguments of
    /// a free function, or the owner's tuple for a method.
    Func { id: FnId, generics: Vec<Type> },
    Builtin(Builtin),
    /// An imported package.
    Namespace(PackageId),
}

/// An evaluated sub-expression.
#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub value: Value,
    pub model: ExprModel,
    pub target: Target,
    pub span: Span,
}

impl Operand {
    pub(crate) fn plain(value: Value, model: ExprModel, span: Span) -> Self {
        Self {
            value,
            model,
            target: Target::Plain,
            span,
        }
    }

    fn type_literal(ty: Type, span: Span) -> Self {
        let model = ExprModel::TypeName(ty.to_string());
        Self::plain(Value::type_literal(ty), model, span)
    }
}

/// Span covering `tokens`, or `fallback` when empty.
pub(crate) fn span_of(tokens: &[Token], fallback: Span) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => fallback,
    }
}

impl Checker<'_> {
    /// Evaluate an expression to an operand.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Check<Operand> {
        self.eval_tokens(&expr.tokens, expr.span)
    }

    /// Evaluate an expression that must stand on its own as a value.
    pub(crate) fn eval_value(&mut self, expr: &Expr) -> Check<(Value, ExprModel)> {
        let operand = self.eval(expr)?;
        self.finish(operand)
    }

    /// Turn an operand into a standalone value.
    pub(crate) fn finish(&mut self, operand: Operand) -> Check<(Value, ExprModel)> {
        match &operand.target {
            Target::Plain => {}
            Target::Func { id, generics } => {
                let def = &self.reg()[*id];
                if def.owner.is_none() && def.is_generic() && generics.is_empty() {
                    let name = def.meta.name.clone();
                    return self.fail(
                        Diagnostic::new(ErrorKey::MissingGenerics, operand.span).arg(name),
                    );
                }
            }
            Target::Builtin(b) => {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidExpr, operand.span).arg(b.name()),
                );
            }
            Target::Namespace(_) => {
                let text = operand.model.to_string();
                return self.fail(Diagnostic::new(ErrorKey::InvalidExpr, operand.span).arg(text));
            }
        }
        Ok((operand.value, operand.model))
    }

    pub(crate) fn eval_tokens(&mut self, tokens: &[Token], span: Span) -> Check<Operand> {
        if tokens.is_empty() {
            return self.fail(Diagnostic::new(ErrorKey::MissingExpr, span));
        }
        let mut operands = Vec::new();
        let mut ops: Vec<(Op, Span)> = Vec::new();
        let mut i = 0;
        loop {
            let (operand, next) = self.unit(tokens, i, span)?;
            operands.push(operand);
            i = next;
            let Some(tok) = tokens.get(i) else {
                break;
            };
            match &tok.kind {
                TokenKind::Op(op) if op.is_binary() => {
                    ops.push((*op, tok.span));
                    i += 1;
                    if i >= tokens.len() {
                        return self.fail(Diagnostic::new(ErrorKey::MissingExpr, tok.span));
                    }
                }
                _ => {
                    return self.fail(
                        Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme),
                    );
                }
            }
        }

        while !ops.is_empty() {
            let mut at = 0;
            for (index, (op, _)) in ops.iter().enumerate() {
                if precedence(*op) > precedence(ops[at].0) {
                    at = index;
                }
            }
            let (op, op_span) = ops.remove(at);
            let right = operands.remove(at + 1);
            let left = operands.remove(at);
            let folded = self.binary(op, left, right, op_span)?;
            operands.insert(at, folded);
        }
        match operands.pop() {
            Some(operand) => Ok(operand),
            None => self.fail(Diagnostic::new(ErrorKey::MissingExpr, span)),
        }
    }

    /// One operand: unary prefixes, a primary and its postfix accessors.
    /// Returns the operand and the index after it.
    fn unit(&mut self, tokens: &[Token], start: usize, span: Span) -> Check<(Operand, usize)> {
        let Some(tok) = tokens.get(start) else {
            return self.fail(Diagnostic::new(ErrorKey::MissingExpr, span));
        };
        if let TokenKind::Op(op) = tok.kind {
            if start + 1 >= tokens.len() {
                return self.fail(Diagnostic::new(ErrorKey::MissingExpr, tok.span));
            }
            // `&&x` lexes as one token.
            if op == Op::AndAnd {
                let (inner, end) = self.unit(tokens, start + 1, span)?;
                let once = self.unary(Op::Amp, inner, tok.span)?;
                return Ok((self.unary(Op::Amp, once, tok.span)?, end));
            }
            if !op.is_unary() {
                return self.fail(
                    Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme),
                );
            }
            let (inner, end) = self.unit(tokens, start + 1, span)?;
            return Ok((self.unary(op, inner, tok.span)?, end));
        }

        let (mut operand, mut i) = self.primary(tokens, start)?;
        while let Some(tok) = tokens.get(i) {
            match &tok.kind {
                TokenKind::Dot => {
                    let Some(name) = tokens.get(i + 1).filter(|t| t.kind == TokenKind::Ident) else {
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg("."),
                        );
                    };
                    operand = self.member(operand, &name.lexeme, name.span)?;
                    i += 2;
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    if tok.kind == TokenKind::LBrace && !operand.value.is_type_literal() {
                        break;
                    }
                    let Some(close) = matching_close(tokens, i) else {
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme),
                        );
                    };
                    let inner = &tokens[i + 1..close];
                    let whole = tok.span.merge(tokens[close].span);
                    operand = match tok.kind {
                        TokenKind::LParen => self.call(operand, inner, whole)?,
                        TokenKind::LBracket => self.bracket(operand, inner, whole)?,
                        _ => self.composite(operand, inner, whole)?,
                    };
                    i = close + 1;
                }
                TokenKind::Ellipsis => {
                    operand.value.flags.insert(ValueFlags::VARIADIC);
                    i += 1;
                }
                _ => break,
            }
        }
        Ok((operand, i))
    }

    fn primary(&mut self, tokens: &[Token], start: usize) -> Check<(Operand, usize)> {
        let tok = &tokens[start];
        match &tok.kind {
            TokenKind::LBracket | TokenKind::Fn => {
                let Some((ty_expr, used)) = parse_type(&tokens[start..]) else {
                    return self.fail(
                        Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme),
                    );
                };
                let ty = self.resolve_type(&ty_expr)?;
                let end = start + used;
                Ok((Operand::type_literal(ty, span_of(&tokens[start..end], tok.span)), end))
            }
            TokenKind::LParen => {
                let Some(close) = matching_close(tokens, start) else {
                    return self.fail(Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg("("));
                };
                let inner = &tokens[start + 1..close];
                let whole = tok.span.merge(tokens[close].span);
                let parts = split_top_level(inner, &TokenKind::Comma);
                if parts.len() < 2 {
                    let mut operand = self.eval_tokens(inner, whole)?;
                    operand.span = whole;
                    return Ok((operand, close + 1));
                }
                let mut types = Vec::with_capacity(parts.len());
                let mut models = Vec::with_capacity(parts.len());
                for part in parts {
                    let operand = self.eval_tokens(part, whole)?;
                    let (value, model) = self.finish(operand)?;
                    if value.is_type_literal() || value.ty.is_void() {
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidExpr, whole).arg(value.ty.spelled()),
                        );
                    }
                    types.push(value.ty);
                    models.push(model);
                }
                let value = Value::rvalue(Type::tuple(types));
                Ok((Operand::plain(value, ExprModel::Tuple(models), whole), close + 1))
            }
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Rune
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => {
                let (value, model) = literal::literal(tok).map_err(|d| self.report(d))?;
                Ok((Operand::plain(value, model, tok.span), start + 1))
            }
            TokenKind::Ident => Ok((self.ident_operand(tok)?, start + 1)),
            TokenKind::AnonFn(decl) => Ok((self.lambda(decl, tok.span)?, start + 1)),
            _ => self.fail(Diagnostic::new(ErrorKey::InvalidSyntax, tok.span).arg(&tok.lexeme)),
        }
    }

    fn unary(&mut self, op: Op, operand: Operand, span: Span) -> Check<Operand> {
        let span = span.merge(operand.span);
        let (value, model) = self.finish(operand)?;
        match op {
            Op::Star => {
                if value.is_type_literal() {
                    return Ok(Operand::type_literal(Type::ptr(value.ty), span));
                }
                match &value.ty.kind {
                    TypeKind::Ptr(inner) => {
                        let value = Value::lvalue((**inner).clone(), !value.points_to_const());
                        Ok(Operand::plain(value, ExprModel::unary(op, model), span))
                    }
                    _ => self.fail(
                        Diagnostic::new(ErrorKey::OperatorNotForType, span)
                            .arg(op.as_str())
                            .arg(value.ty.spelled()),
                    ),
                }
            }
            Op::Amp => {
                if value.is_type_literal() {
                    if matches!(value.ty.kind, TypeKind::Ref(_) | TypeKind::Array { .. }) {
                        return self.fail(
                            Diagnostic::new(ErrorKey::InvalidType, span)
                                .arg(format!("&{}", value.ty)),
                        );
                    }
                    return Ok(Operand::type_literal(Type::reference(value.ty), span));
                }
                match model {
                    ExprModel::Lambda {
                        params, ret, body, ..
                    } => {
                        let model = ExprModel::Lambda {
                            by_ref: true,
                            params,
                            ret,
                            body,
                        };
                        Ok(Operand::plain(value, model, span))
                    }
                    model @ ExprModel::StructLit { .. } => {
                        let value = Value::rvalue(Type::reference(value.ty));
                        Ok(Operand::plain(value, ExprModel::unary(op, model), span))
                    }
                    model if value.is_lvalue() => {
                        let mut ptr = Value::rvalue(Type::ptr(value.ty.clone()));
                        ptr.flags.set(ValueFlags::POINTEE_CONST, !value.is_mutable());
                        Ok(Operand::plain(ptr, ExprModel::unary(op, model), span))
                    }
                    _ => self.fail(
                        Diagnostic::new(ErrorKey::InvalidExpr, span).arg(value.ty.spelled()),
                    ),
                }
            }
            _ => {
                let result =
                    solve_unary(op, &value, self.int_bits(), span).map_err(|d| self.report(d))?;
                Ok(Operand::plain(result, ExprModel::unary(op, model), span))
            }
        }
    }

    fn binary(&mut self, op: Op, left: Operand, right: Operand, span: Span) -> Check<Operand> {
        let whole = left.span.merge(right.span);
        let (lv, lm) = self.finish(left)?;
        let (rv, rm) = self.finish(right)?;
        let value = solve_binary(op, &lv, &rv, self.int_bits(), span).map_err(|d| self.report(d))?;
        Ok(Operand::plain(value, ExprModel::binary(op, lm, rm), whole))
    }
}

#[cfg(test)]
mod tests {
    use meridian_ast::testing::*;
    use meridian_core::ErrorKey;

    use crate::value::ConstValue;
    use crate::{CheckOptions, Session};

    /// Check `stmts` as the body of `fn main()` after `decls`.
    fn run(decls: Vec<meridian_ast::Decl>, stmts: Vec<meridian_ast::Stmt>) -> Session {
        let mut all = decls;
        all.push(func("main").body(stmts).decl());
        let mut session = Session::new(CheckOptions::default().with_parallel_leaf_checks(false));
        session.add_package("app", vec![file("app/main.mer", all)]).unwrap();
        session.check("app").unwrap();
        session
    }

    fn body_of(session: &Session) -> String {
        let out = session.output("app").unwrap();
        let main = out.instances("main").next().unwrap();
        main.body.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("\n")
    }

    fn errors(session: &Session) -> Vec<ErrorKey> {
        session.diagnostics().errors().iter().map(|d| d.key).collect()
    }

    #[test]
    fn precedence_folds_tighter_tiers_first() {
        let s = run(
            vec![],
            vec![
                let_("a", "1"),
                let_("b", "2"),
                let_("c", "3"),
                let_typed("n", "u32", Some("2")),
                let_("x", "a + b * c"),
                let_("y", "a << n | c"),
                let_("z", "a - b - c"),
            ],
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let body = body_of(&s);
        assert!(body.contains("(a + (b * c))"), "{body}");
        assert!(body.contains("((a << n) | c)"), "{body}");
        assert!(body.contains("((a - b) - c)"), "{body}");
    }

    #[test]
    fn constants_fold_through_locals() {
        let s = run(
            vec![global("N", None, Some("4 * 8"), false, true)],
            vec![let_typed("a", "[N]int", None)],
        );
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
        let global = s.registry().find_global(s.package_id("app").unwrap(), "N").unwrap();
        assert_eq!(global.constant, Some(ConstValue::Int(32)));
        assert!(body_of(&s).contains("[32]int"));
    }

    #[test]
    fn trailing_operator_is_missing_expression() {
        let s = run(vec![], vec![let_("a", "1 +")]);
        assert_eq!(errors(&s), vec![ErrorKey::MissingExpr]);
    }

    #[test]
    fn pointers_and_references() {
        let s = run(
            vec![],
            vec![
                let_mut("x", "1"),
                let_("p", "&x"),
                assign(&["*p"], &["2"]),
                let_("q", "&1"),
            ],
        );
        assert_eq!(errors(&s), vec![ErrorKey::InvalidExpr]);
        assert!(body_of(&s).contains("(*p) = 2"), "{}", body_of(&s));
    }

    #[test]
    fn pointers_keep_pointee_mutability() {
        let s = run(
            vec![],
            vec![
                let_("x", "1"),
                let_mut("y", "2"),
                let_("p", "&x"),
                assign(&["*p"], &["3"]),
                let_mut("q", "&y"),
                assign(&["*q"], &["4"]),
                assign(&["q"], &["&x"]),
                let_("r", "p"),
                assign(&["*r"], &["5"]),
            ],
        );
        assert_eq!(
            errors(&s),
            vec![
                ErrorKey::AssignmentToNonMut,
                ErrorKey::AssignmentNonMutToMut,
                ErrorKey::AssignmentToNonMut,
            ]
        );
    }

    #[test]
    fn tuples_need_values() {
        let s = run(vec![], vec![let_tuple(&["a", "b"], "(1, \"s\")"), let_("t", "(a, b)")]);
        assert!(errors(&s).is_empty(), "{:?}", errors(&s));
    }

    #[test]
    fn reference_to_reference_type_is_rejected() {
        let s = run(vec![], vec![let_("_", "(&&int)(nil)")]);
        assert_eq!(errors(&s), vec![ErrorKey::InvalidType]);
    }
}
