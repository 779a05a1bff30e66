//! Syntactic type expressions.
//!
//! Declarations carry [`TypeExpr`] nodes built by the tree builder.
//! Expressions embed type syntax as tokens (`[]int{1, 2}`, `(u8)(x)`), which
//! [`parse_type`] turns into the same node shape.

use meridian_core::Span;

use crate::token::{Expr, Ident, Op, Token, TokenKind, matching_close, split_top_level};

/// A syntactic type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

/// The shape of a syntactic type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `Name` or `Name[T1, T2]`
    Named { name: Ident, generics: Vec<TypeExpr> },
    /// `pkg.Name` or `pkg.Name[T]`
    Qualified {
        namespace: Ident,
        name: Ident,
        generics: Vec<TypeExpr>,
    },
    /// `*T`
    Ptr(Box<TypeExpr>),
    /// `&T`
    Ref(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T` or `[...]T`
    Array {
        elem: Box<TypeExpr>,
        size: ArraySizeExpr,
    },
    /// `[K:V]`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `fn(T, mut U, ...V): R`
    Fn {
        params: Vec<FnTypeParam>,
        ret: Option<Box<TypeExpr>>,
    },
    /// `(T1, T2)`
    Tuple(Vec<TypeExpr>),
}

/// Size part of an array type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArraySizeExpr {
    /// `[...]T`, filled in from the initializer.
    Auto,
    /// A constant expression.
    Expr(Expr),
}

/// A parameter of a function type.
#[derive(Debug, Clone, PartialEq)]
pub struct FnTypeParam {
    pub ty: TypeExpr,
    pub mutable: bool,
    pub variadic: bool,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A plain named type without generics.
    pub fn named(name: &str, span: Span) -> Self {
        Self::new(
            TypeExprKind::Named {
                name: Ident::new(name, span),
                generics: Vec::new(),
            },
            span,
        )
    }
}

/// Parse a type from the start of `tokens`.
///
/// Returns the type and the number of tokens it consumed, or `None` when the
/// tokens do not start with type syntax.
pub fn parse_type(tokens: &[Token]) -> Option<(TypeExpr, usize)> {
    let first = tokens.first()?;
    let span = first.span;
    match &first.kind {
        TokenKind::Op(Op::Star) => {
            let (inner, used) = parse_type(&tokens[1..])?;
            Some((TypeExpr::new(TypeExprKind::Ptr(Box::new(inner)), span), used + 1))
        }
        TokenKind::Op(Op::Amp) => {
            let (inner, used) = parse_type(&tokens[1..])?;
            Some((TypeExpr::new(TypeExprKind::Ref(Box::new(inner)), span), used + 1))
        }
        // `&&T` lexes as one token; keep both levels so the resolver can reject it.
        TokenKind::Op(Op::AndAnd) => {
            let (inner, used) = parse_type(&tokens[1..])?;
            let once = TypeExpr::new(TypeExprKind::Ref(Box::new(inner)), span);
            Some((TypeExpr::new(TypeExprKind::Ref(Box::new(once)), span), used + 1))
        }
        TokenKind::LBracket => parse_bracketed(tokens),
        TokenKind::LParen => {
            let close = matching_close(tokens, 0)?;
            let parts = split_top_level(&tokens[1..close], &TokenKind::Comma);
            let mut items = Vec::with_capacity(parts.len());
            for part in parts {
                items.push(parse_whole(part)?);
            }
            match items.len() {
                0 => None,
                1 => items.pop().map(|t| (t, close + 1)),
                _ => Some((TypeExpr::new(TypeExprKind::Tuple(items), span), close + 1)),
            }
        }
        TokenKind::Fn => parse_fn_type(tokens),
        TokenKind::Ident => parse_named(tokens),
        _ => None,
    }
}

/// Parse a slice that must consist of exactly one type.
pub fn parse_whole(tokens: &[Token]) -> Option<TypeExpr> {
    match parse_type(tokens) {
        Some((ty, used)) if used == tokens.len() => Some(ty),
        _ => None,
    }
}

fn parse_bracketed(tokens: &[Token]) -> Option<(TypeExpr, usize)> {
    let span = tokens[0].span;
    let close = matching_close(tokens, 0)?;
    let inside = &tokens[1..close];

    let halves = split_top_level(inside, &TokenKind::Colon);
    if halves.len() == 2 {
        let key = parse_whole(halves[0])?;
        let value = parse_whole(halves[1])?;
        let kind = TypeExprKind::Map {
            key: Box::new(key),
            value: Box::new(value),
        };
        return Some((TypeExpr::new(kind, span), close + 1));
    }

    let (elem, used) = parse_type(&tokens[close + 1..])?;
    let elem = Box::new(elem);
    let kind = match inside {
        [] => TypeExprKind::Slice(elem),
        [tok] if tok.kind == TokenKind::Ellipsis => TypeExprKind::Array {
            elem,
            size: ArraySizeExpr::Auto,
        },
        size => TypeExprKind::Array {
            elem,
            size: ArraySizeExpr::Expr(Expr::new(size.to_vec())),
        },
    };
    Some((TypeExpr::new(kind, span), close + 1 + used))
}

fn parse_named(tokens: &[Token]) -> Option<(TypeExpr, usize)> {
    let first = &tokens[0];
    let span = first.span;
    let mut pos = 1;
    let mut namespace = None;
    let mut name = Ident::new(first.lexeme.clone(), first.span);

    if tokens.get(pos).is_some_and(|t| t.kind == TokenKind::Dot)
        && let Some(next) = tokens.get(pos + 1)
        && next.kind == TokenKind::Ident
    {
        namespace = Some(name);
        name = Ident::new(next.lexeme.clone(), next.span);
        pos += 2;
    }

    let mut generics = Vec::new();
    if tokens.get(pos).is_some_and(|t| t.kind == TokenKind::LBracket) {
        let close = matching_close(tokens, pos)?;
        for part in split_top_level(&tokens[pos + 1..close], &TokenKind::Comma) {
            generics.push(parse_whole(part)?);
        }
        pos = close + 1;
    }

    let kind = match namespace {
        Some(namespace) => TypeExprKind::Qualified {
            namespace,
            name,
            generics,
        },
        None => TypeExprKind::Named { name, generics },
    };
    Some((TypeExpr::new(kind, span), pos))
}

fn parse_fn_type(tokens: &[Token]) -> Option<(TypeExpr, usize)> {
    let span = tokens[0].span;
    if tokens.get(1)?.kind != TokenKind::LParen {
        return None;
    }
    let close = matching_close(tokens, 1)?;
    let mut params = Vec::new();
    for part in split_top_level(&tokens[2..close], &TokenKind::Comma) {
        let mut part = part;
        let mut mutable = false;
        let mut variadic = false;
        if part.first().is_some_and(|t| t.kind == TokenKind::Ident && t.lexeme == "mut") {
            mutable = true;
            part = &part[1..];
        }
        if part.first().is_some_and(|t| t.kind == TokenKind::Ellipsis) {
            variadic = true;
            part = &part[1..];
        }
        params.push(FnTypeParam {
            ty: parse_whole(part)?,
            mutable,
            variadic,
        });
    }
    let mut pos = close + 1;
    let mut ret = None;
    if tokens.get(pos).is_some_and(|t| t.kind == TokenKind::Colon) {
        let (ty, used) = parse_type(&tokens[pos + 1..])?;
        ret = Some(Box::new(ty));
        pos += 1 + used;
    }
    Some((TypeExpr::new(TypeExprKind::Fn { params, ret }, span), pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, Span::default())
    }

    fn ident(name: &str) -> Token {
        t(TokenKind::Ident, name)
    }

    #[test]
    fn parses_slice_of_pointer() {
        let toks = vec![
            t(TokenKind::LBracket, "["),
            t(TokenKind::RBracket, "]"),
            t(TokenKind::Op(Op::Star), "*"),
            ident("int"),
        ];
        let (ty, used) = parse_type(&toks).unwrap();
        assert_eq!(used, 4);
        let TypeExprKind::Slice(inner) = ty.kind else {
            panic!("expected slice");
        };
        assert!(matches!(inner.kind, TypeExprKind::Ptr(_)));
    }

    #[test]
    fn parses_map() {
        let toks = vec![
            t(TokenKind::LBracket, "["),
            ident("str"),
            t(TokenKind::Colon, ":"),
            ident("int"),
            t(TokenKind::RBracket, "]"),
            t(TokenKind::LBrace, "{"),
        ];
        let (ty, used) = parse_type(&toks).unwrap();
        assert_eq!(used, 5);
        assert!(matches!(ty.kind, TypeExprKind::Map { .. }));
    }

    #[test]
    fn parses_auto_sized_array() {
        let toks = vec![
            t(TokenKind::LBracket, "["),
            t(TokenKind::Ellipsis, "..."),
            t(TokenKind::RBracket, "]"),
            ident("u8"),
        ];
        let (ty, _) = parse_type(&toks).unwrap();
        assert!(matches!(
            ty.kind,
            TypeExprKind::Array {
                size: ArraySizeExpr::Auto,
                ..
            }
        ));
    }

    #[test]
    fn parses_generic_name() {
        let toks = vec![
            ident("Box"),
            t(TokenKind::LBracket, "["),
            ident("int"),
            t(TokenKind::RBracket, "]"),
        ];
        let (ty, used) = parse_type(&toks).unwrap();
        assert_eq!(used, 4);
        let TypeExprKind::Named { generics, .. } = ty.kind else {
            panic!("expected named");
        };
        assert_eq!(generics.len(), 1);
    }

    #[test]
    fn double_ampersand_is_two_references() {
        let toks = vec![t(TokenKind::Op(Op::AndAnd), "&&"), ident("int")];
        let (ty, _) = parse_type(&toks).unwrap();
        let TypeExprKind::Ref(inner) = ty.kind else {
            panic!("expected reference");
        };
        assert!(matches!(inner.kind, TypeExprKind::Ref(_)));
    }

    #[test]
    fn literal_is_not_a_type() {
        assert!(parse_type(&[t(TokenKind::Int, "1")]).is_none());
    }
}
