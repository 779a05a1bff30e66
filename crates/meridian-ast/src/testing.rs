//! Test helpers: a small lexer and node builders.
//!
//! Tests write expressions and types as text and assemble statements with the
//! builder functions below. Every lexed snippet gets its own source line, so
//! nodes built later in a test sort after nodes built earlier, which is what
//! the goto and diagnostic-order checks compare.

use std::cell::Cell;
use std::sync::Arc;

use meridian_core::Span;

use crate::decl::{
    Decl, EnumDecl, EnumItemDecl, FieldDecl, File, FnDecl, ImplDecl, ParamDecl, Receiver,
    StructDecl, TraitDecl, TraitMethodDecl, TypeAliasDecl, UseDecl, UseKind, VarDecl,
};
use crate::stmt::{
    AssignOp, AssignStmt, Block, CondBranch, IfStmt, IterKind, IterStmt, MatchCase, MatchStmt,
    Stmt, StmtKind,
};
use crate::token::{Expr, Ident, Op, Token, TokenKind};
use crate::types::{TypeExpr, parse_whole};

thread_local! {
    static NEXT_LINE: Cell<u32> = const { Cell::new(1) };
}

/// Reserve the next source line.
pub fn next_line() -> u32 {
    NEXT_LINE.with(|line| {
        let current = line.get();
        line.set(current + 1);
        current
    })
}

/// Span on a fresh line.
pub fn fresh_span() -> Span {
    Span::new(next_line(), 1, 1)
}

// ============================================================================
// Lexer
// ============================================================================

/// Lex `src` onto a fresh line.
pub fn lex(src: &str) -> Vec<Token> {
    lex_at(src, next_line())
}

/// Lex `src` as if it started at column 1 of `line`.
///
/// Panics on characters outside the expression alphabet.
pub fn lex_at(src: &str, line: u32) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let start = i;
        let span = |end: usize| Span::new(line, start as u32 + 1, (end - start) as u32);

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &src[start..i];
            let kind = match word {
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                "nil" => TokenKind::Nil,
                "fn" => TokenKind::Fn,
                _ => TokenKind::Ident,
            };
            tokens.push(Token::new(kind, word, span(i)));
            continue;
        }

        if c.is_ascii_digit() {
            let mut kind = TokenKind::Int;
            if src[i..].starts_with("0x") || src[i..].starts_with("0X") {
                i += 2;
                while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
                    i += 1;
                }
            } else {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                    i += 1;
                }
                if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                    kind = TokenKind::Float;
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    kind = TokenKind::Float;
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                        i += 1;
                    }
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            tokens.push(Token::new(kind, &src[start..i], span(i)));
            continue;
        }

        if c == '"' || c == '\'' {
            i += 1;
            while i < bytes.len() && bytes[i] as char != c {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            let kind = if c == '"' { TokenKind::Str } else { TokenKind::Rune };
            tokens.push(Token::new(kind, &src[start..i.min(bytes.len())], span(i)));
            continue;
        }

        if src[i..].starts_with("...") {
            i += 3;
            tokens.push(Token::new(TokenKind::Ellipsis, "...", span(i)));
            continue;
        }

        if let Some((op, len)) = lex_op(&src[i..]) {
            i += len;
            tokens.push(Token::new(TokenKind::Op(op), op.as_str(), span(i)));
            continue;
        }

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            other => panic!("unexpected character {other:?} in {src:?}"),
        };
        i += 1;
        tokens.push(Token::new(kind, &src[start..i], span(i)));
    }
    tokens
}

fn lex_op(rest: &str) -> Option<(Op, usize)> {
    const TWO: [(&str, Op); 8] = [
        ("<<", Op::Shl),
        (">>", Op::Shr),
        ("<=", Op::LtEq),
        (">=", Op::GtEq),
        ("==", Op::EqEq),
        ("!=", Op::NotEq),
        ("&&", Op::AndAnd),
        ("||", Op::OrOr),
    ];
    for (text, op) in TWO {
        if rest.starts_with(text) {
            return Some((op, 2));
        }
    }
    let op = match rest.chars().next()? {
        '+' => Op::Plus,
        '-' => Op::Minus,
        '*' => Op::Star,
        '/' => Op::Slash,
        '%' => Op::Percent,
        '&' => Op::Amp,
        '|' => Op::Pipe,
        '^' => Op::Caret,
        '<' => Op::Lt,
        '>' => Op::Gt,
        '!' => Op::Bang,
        _ => return None,
    };
    Some((op, 1))
}

// ============================================================================
// Expressions and types
// ============================================================================

pub fn expr(src: &str) -> Expr {
    Expr::new(lex(src))
}

/// Expression from prepared tokens, e.g. ones holding an anonymous function.
pub fn expr_tokens(tokens: Vec<Token>) -> Expr {
    Expr::new(tokens)
}

/// Token wrapping an anonymous function literal.
pub fn anon_fn(decl: Arc<FnDecl>) -> Token {
    Token::new(TokenKind::AnonFn(decl), "fn", fresh_span())
}

/// Parse a type written as text. Panics on malformed type syntax.
pub fn ty(src: &str) -> TypeExpr {
    let tokens = lex(src);
    match parse_whole(&tokens) {
        Some(ty) => ty,
        None => panic!("not a type: {src:?}"),
    }
}

pub fn ident(name: &str) -> Ident {
    Ident::new(name, fresh_span())
}

// ============================================================================
// Statements
// ============================================================================

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, fresh_span())
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block::new(stmts, fresh_span())
}

fn var(
    names: &[&str],
    mutable: bool,
    constant: bool,
    ty_src: Option<&str>,
    init: Option<&str>,
) -> Stmt {
    let span = fresh_span();
    let decl = VarDecl {
        names: names.iter().map(|n| Ident::new(*n, span)).collect(),
        public: false,
        mutable,
        constant,
        ty: ty_src.map(ty),
        init: init.map(expr),
        span,
    };
    Stmt::new(StmtKind::Var(decl), span)
}

/// `let name = init`
pub fn let_(name: &str, init: &str) -> Stmt {
    var(&[name], false, false, None, Some(init))
}

/// `let name: ty = init` or `let name: ty`
pub fn let_typed(name: &str, ty_src: &str, init: Option<&str>) -> Stmt {
    var(&[name], false, false, Some(ty_src), init)
}

/// `let mut name = init`
pub fn let_mut(name: &str, init: &str) -> Stmt {
    var(&[name], true, false, None, Some(init))
}

/// `let mut name: ty = init` or `let mut name: ty`
pub fn let_mut_typed(name: &str, ty_src: &str, init: Option<&str>) -> Stmt {
    var(&[name], true, false, Some(ty_src), init)
}

/// `let (a, b) = init`
pub fn let_tuple(names: &[&str], init: &str) -> Stmt {
    var(names, false, false, None, Some(init))
}

/// `const name = init` (`init` may be absent to provoke errors).
pub fn const_(name: &str, init: Option<&str>) -> Stmt {
    var(&[name], false, true, None, init)
}

/// Expression statement.
pub fn expr_stmt(src: &str) -> Stmt {
    stmt(StmtKind::Expr(expr(src)))
}

/// `a, b = x, y`
pub fn assign(targets: &[&str], values: &[&str]) -> Stmt {
    compound(targets, AssignOp::Assign, values)
}

/// Assignment with an explicit operator.
pub fn compound(targets: &[&str], op: AssignOp, values: &[&str]) -> Stmt {
    stmt(StmtKind::Assign(AssignStmt {
        targets: targets.iter().map(|t| expr(t)).collect(),
        op,
        values: values.iter().map(|v| expr(v)).collect(),
    }))
}

/// `target++`
pub fn incr(target: &str) -> Stmt {
    stmt(StmtKind::Postfix {
        target: expr(target),
        increment: true,
    })
}

/// `target--`
pub fn decr(target: &str) -> Stmt {
    stmt(StmtKind::Postfix {
        target: expr(target),
        increment: false,
    })
}

/// `ret a, b`; an empty slice is a bare `ret`.
pub fn ret(values: &[&str]) -> Stmt {
    stmt(StmtKind::Ret(values.iter().map(|v| expr(v)).collect()))
}

pub fn block_stmt(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(block(stmts)))
}

pub fn if_(cond: &str, then: Vec<Stmt>) -> Stmt {
    if_chain(vec![(cond, then)], None)
}

pub fn if_else(cond: &str, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
    if_chain(vec![(cond, then)], Some(otherwise))
}

/// `if a {} else if b {} else {}`
pub fn if_chain(branches: Vec<(&str, Vec<Stmt>)>, default: Option<Vec<Stmt>>) -> Stmt {
    let span = fresh_span();
    let branches = branches
        .into_iter()
        .map(|(cond, body)| CondBranch {
            cond: expr(cond),
            body: block(body),
        })
        .collect();
    Stmt::new(
        StmtKind::If(IfStmt {
            branches,
            default: default.map(block),
        }),
        span,
    )
}

/// `for { }`
pub fn loop_(body: Vec<Stmt>) -> Stmt {
    let span = fresh_span();
    Stmt::new(
        StmtKind::Iter(IterStmt {
            kind: IterKind::Infinite,
            body: block(body),
        }),
        span,
    )
}

/// `for cond { }`
pub fn while_(cond: &str, body: Vec<Stmt>) -> Stmt {
    let span = fresh_span();
    let cond = expr(cond);
    Stmt::new(
        StmtKind::Iter(IterStmt {
            kind: IterKind::While(cond),
            body: block(body),
        }),
        span,
    )
}

/// `for key, value in src { }`
pub fn range_(key: Option<&str>, value: Option<&str>, src: &str, body: Vec<Stmt>) -> Stmt {
    let span = fresh_span();
    let kind = IterKind::Range {
        key: key.map(|k| Ident::new(k, span)),
        value: value.map(|v| Ident::new(v, span)),
        expr: expr(src),
    };
    Stmt::new(
        StmtKind::Iter(IterStmt {
            kind,
            body: block(body),
        }),
        span,
    )
}

/// One `match` case: its expressions and body.
pub type CaseSrc<'a> = (Vec<&'a str>, Vec<Stmt>);

/// `match subject { case ..: .. default: .. }`
pub fn match_(subject: Option<&str>, cases: Vec<CaseSrc<'_>>, default: Option<Vec<Stmt>>) -> Stmt {
    let span = fresh_span();
    let subject = subject.map(expr);
    let cases = cases
        .into_iter()
        .map(|(exprs, body)| {
            let case_span = fresh_span();
            MatchCase {
                exprs: exprs.into_iter().map(expr).collect(),
                body: block(body),
                span: case_span,
            }
        })
        .collect();
    let default = default.map(|body| {
        let case_span = fresh_span();
        MatchCase {
            exprs: Vec::new(),
            body: block(body),
            span: case_span,
        }
    });
    Stmt::new(
        StmtKind::Match(MatchStmt {
            subject,
            cases,
            default,
            span,
        }),
        span,
    )
}

pub fn label(name: &str) -> Stmt {
    let span = fresh_span();
    Stmt::new(StmtKind::Label(Ident::new(name, span)), span)
}

pub fn goto(name: &str) -> Stmt {
    let span = fresh_span();
    Stmt::new(StmtKind::Goto(Ident::new(name, span)), span)
}

pub fn brk(label: Option<&str>) -> Stmt {
    let span = fresh_span();
    Stmt::new(StmtKind::Break(label.map(|l| Ident::new(l, span))), span)
}

pub fn cont(label: Option<&str>) -> Stmt {
    let span = fresh_span();
    Stmt::new(StmtKind::Continue(label.map(|l| Ident::new(l, span))), span)
}

pub fn fallthrough() -> Stmt {
    stmt(StmtKind::Fallthrough)
}

/// Block-local `type name: ty`.
pub fn alias_stmt(name: &str, ty_src: &str) -> Stmt {
    let span = fresh_span();
    Stmt::new(
        StmtKind::TypeAlias(TypeAliasDecl {
            name: Ident::new(name, span),
            public: false,
            ty: ty(ty_src),
            span,
        }),
        span,
    )
}

// ============================================================================
// Declarations
// ============================================================================

fn param(name: &str, ty_src: &str) -> ParamDecl {
    ParamDecl {
        name: ident(name),
        ty: ty(ty_src),
        mutable: false,
        variadic: false,
        default: None,
    }
}

/// Builder for [`FnDecl`].
#[derive(Debug, Clone)]
pub struct FnBuilder {
    decl: FnDecl,
}

/// Start a function declaration. An empty name builds an anonymous function.
pub fn func(name: &str) -> FnBuilder {
    let span = fresh_span();
    FnBuilder {
        decl: FnDecl {
            name: Ident::new(name, span),
            public: false,
            generics: Vec::new(),
            receiver: None,
            params: Vec::new(),
            ret: None,
            body: Block::default(),
            span,
        },
    }
}

impl FnBuilder {
    pub fn public(mut self) -> Self {
        self.decl.public = true;
        self
    }

    pub fn generics(mut self, names: &[&str]) -> Self {
        self.decl.generics = names.iter().map(|n| ident(n)).collect();
        self
    }

    /// `self` receiver; `by_ref` gives `&self`.
    pub fn receiver(mut self, by_ref: bool, mutable: bool) -> Self {
        self.decl.receiver = Some(Receiver {
            by_ref,
            mutable,
            span: fresh_span(),
        });
        self
    }

    pub fn param(mut self, name: &str, ty_src: &str) -> Self {
        self.decl.params.push(param(name, ty_src));
        self
    }

    pub fn mut_param(mut self, name: &str, ty_src: &str) -> Self {
        let mut p = param(name, ty_src);
        p.mutable = true;
        self.decl.params.push(p);
        self
    }

    pub fn param_default(mut self, name: &str, ty_src: &str, default: &str) -> Self {
        let mut p = param(name, ty_src);
        p.default = Some(expr(default));
        self.decl.params.push(p);
        self
    }

    /// `...name T`
    pub fn variadic_param(mut self, name: &str, ty_src: &str) -> Self {
        let mut p = param(name, ty_src);
        p.variadic = true;
        self.decl.params.push(p);
        self
    }

    pub fn ret(mut self, ty_src: &str) -> Self {
        self.decl.ret = Some(ty(ty_src));
        self
    }

    pub fn body(mut self, stmts: Vec<Stmt>) -> Self {
        self.decl.body = block(stmts);
        self
    }

    pub fn build(self) -> Arc<FnDecl> {
        Arc::new(self.decl)
    }

    pub fn decl(self) -> Decl {
        Decl::Fn(self.build())
    }
}

/// Builder for [`StructDecl`].
#[derive(Debug, Clone)]
pub struct StructBuilder {
    decl: StructDecl,
}

pub fn struct_(name: &str) -> StructBuilder {
    let span = fresh_span();
    StructBuilder {
        decl: StructDecl {
            name: Ident::new(name, span),
            public: false,
            generics: Vec::new(),
            fields: Vec::new(),
            span,
        },
    }
}

impl StructBuilder {
    pub fn public(mut self) -> Self {
        self.decl.public = true;
        self
    }

    pub fn generics(mut self, names: &[&str]) -> Self {
        self.decl.generics = names.iter().map(|n| ident(n)).collect();
        self
    }

    fn push(
        mut self,
        name: &str,
        ty_src: &str,
        public: bool,
        mutable: bool,
        default: Option<&str>,
    ) -> Self {
        self.decl.fields.push(FieldDecl {
            name: ident(name),
            public,
            mutable,
            ty: ty(ty_src),
            default: default.map(expr),
        });
        self
    }

    pub fn field(self, name: &str, ty_src: &str) -> Self {
        self.push(name, ty_src, false, false, None)
    }

    pub fn pub_field(self, name: &str, ty_src: &str) -> Self {
        self.push(name, ty_src, true, false, None)
    }

    pub fn mut_field(self, name: &str, ty_src: &str) -> Self {
        self.push(name, ty_src, false, true, None)
    }

    pub fn field_default(self, name: &str, ty_src: &str, default: &str) -> Self {
        self.push(name, ty_src, false, false, Some(default))
    }

    pub fn decl(self) -> Decl {
        Decl::Struct(Arc::new(self.decl))
    }
}

/// Trait method signature: `(name, by_ref receiver, params, ret)`.
pub type TraitMethodSrc<'a> = (&'a str, bool, Vec<(&'a str, &'a str)>, Option<&'a str>);

pub fn trait_(name: &str, methods: Vec<TraitMethodSrc<'_>>) -> Decl {
    let span = fresh_span();
    let methods = methods
        .into_iter()
        .map(|(m, by_ref, params, ret)| {
            let m_span = fresh_span();
            TraitMethodDecl {
                name: Ident::new(m, m_span),
                receiver: Receiver {
                    by_ref,
                    mutable: false,
                    span: m_span,
                },
                params: params.into_iter().map(|(n, t)| param(n, t)).collect(),
                ret: ret.map(ty),
                span: m_span,
            }
        })
        .collect();
    Decl::Trait(TraitDecl {
        name: Ident::new(name, span),
        public: true,
        methods,
        span,
    })
}

/// `enum name: base { items }`; each item is a name with an optional value.
pub fn enum_(name: &str, base: Option<&str>, items: &[(&str, Option<&str>)]) -> Decl {
    let span = fresh_span();
    Decl::Enum(EnumDecl {
        name: Ident::new(name, span),
        public: true,
        base: base.map(ty),
        items: items
            .iter()
            .map(|(item, value)| EnumItemDecl {
                name: ident(item),
                value: value.map(expr),
            })
            .collect(),
        span,
    })
}

/// Top-level `let` / `let mut` / `const`.
pub fn global(
    name: &str,
    ty_src: Option<&str>,
    init: Option<&str>,
    mutable: bool,
    constant: bool,
) -> Decl {
    let Stmt { kind, .. } = var(&[name], mutable, constant, ty_src, init);
    match kind {
        StmtKind::Var(mut decl) => {
            decl.public = true;
            Decl::Var(decl)
        }
        _ => unreachable!(),
    }
}

/// `type name: ty` at package level.
pub fn alias(name: &str, ty_src: &str) -> Decl {
    let span = fresh_span();
    Decl::TypeAlias(TypeAliasDecl {
        name: Ident::new(name, span),
        public: true,
        ty: ty(ty_src),
        span,
    })
}

/// `use a::b`, `use a::b::*`, `use a::b::{x, y}`; `path` uses `::`.
pub fn use_(path: &str, kind: UseKind) -> Decl {
    let span = fresh_span();
    Decl::Use(UseDecl {
        path: path.split("::").map(|seg| Ident::new(seg, span)).collect(),
        kind,
        span,
    })
}

/// `use a::b::{names}`
pub fn use_select(path: &str, names: &[&str]) -> Decl {
    use_(path, UseKind::Select(names.iter().map(|n| ident(n)).collect()))
}

/// `impl target { .. }` or `impl trait for target { .. }`
pub fn impl_(target: &str, trait_name: Option<&str>, methods: Vec<Arc<FnDecl>>) -> Decl {
    let span = fresh_span();
    Decl::Impl(ImplDecl {
        target: Ident::new(target, span),
        trait_name: trait_name.map(|t| Ident::new(t, span)),
        methods,
        span,
    })
}

pub fn file(path: &str, decls: Vec<Decl>) -> File {
    File::new(path, decls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_longest_operator() {
        assert_eq!(
            kinds("a<<b||c"),
            vec![
                TokenKind::Ident,
                TokenKind::Op(Op::Shl),
                TokenKind::Ident,
                TokenKind::Op(Op::OrOr),
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            kinds("0xFF 1.5 2e3 \"s\" 'c' nil"),
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Str,
                TokenKind::Rune,
                TokenKind::Nil,
            ]
        );
    }

    #[test]
    fn spread_after_identifier() {
        assert_eq!(kinds("xs..."), vec![TokenKind::Ident, TokenKind::Ellipsis]);
    }

    #[test]
    fn later_snippets_sort_later() {
        let first = expr("a");
        let second = expr("b");
        assert!(first.span < second.span);
    }

    #[test]
    fn columns_are_one_based() {
        let toks = lex("ab + c");
        assert_eq!(toks[0].span.col, 1);
        assert_eq!(toks[1].span.col, 4);
        assert_eq!(toks[2].span.len, 1);
    }
}
