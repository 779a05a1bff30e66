//! Tokens and token-span expressions.

use std::fmt;
use std::sync::Arc;

use meridian_core::Span;

use crate::decl::FnDecl;

/// A token handed over by the lexer.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token.
    pub lexeme: String,
    /// Location in source.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Whether this token is the operator `op`.
    #[inline]
    pub fn is_op(&self, op: Op) -> bool {
        self.kind == TokenKind::Op(op)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All token kinds the semantic core understands.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// User-defined identifier (also `self`).
    Ident,
    /// Integer literal: `42`, `0xFF`
    Int,
    /// Float literal: `3.14`, `1e9`
    Float,
    /// String literal, lexeme includes the quotes.
    Str,
    /// Rune literal, lexeme includes the quotes.
    Rune,
    /// `true`
    True,
    /// `false`
    False,
    /// `nil`
    Nil,
    /// `fn` (only in type syntax inside expressions)
    Fn,
    /// Operator symbol.
    Op(Op),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// Anonymous function literal, already built by the tree builder.
    AnonFn(Arc<FnDecl>),
}

impl TokenKind {
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace)
    }

    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace)
    }
}

/// Operator symbols appearing in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Star => "*",
            Op::Slash => "/",
            Op::Percent => "%",
            Op::Amp => "&",
            Op::Pipe => "|",
            Op::Caret => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Lt => "<",
            Op::LtEq => "<=",
            Op::Gt => ">",
            Op::GtEq => ">=",
            Op::EqEq => "==",
            Op::NotEq => "!=",
            Op::AndAnd => "&&",
            Op::OrOr => "||",
            Op::Bang => "!",
        }
    }

    /// Whether the symbol can start a unary expression.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Op::Plus | Op::Minus | Op::Caret | Op::Bang | Op::Star | Op::Amp
        )
    }

    /// Whether the symbol can join two operands.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Op::Bang)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier with its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// The blank identifier `_` discards values.
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

/// An expression as a token span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub tokens: Vec<Token>,
    pub span: Span,
}

impl Expr {
    /// Build an expression, deriving its span from the first and last tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let span = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => Span::default(),
        };
        Self { tokens, span }
    }
}

/// Index of the bracket closing the one opened at `open`.
///
/// Brackets of every kind nest; a mismatched closer ends the search.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.kind.is_open() {
            depth += 1;
        } else if tok.kind.is_close() {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split a token slice on top-level tokens of `kind`.
///
/// An empty slice yields no parts; a trailing separator is ignored.
pub fn split_top_level<'t>(tokens: &'t [Token], kind: &TokenKind) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind.is_open() {
            depth += 1;
        } else if tok.kind.is_close() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && &tok.kind == kind {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, "", Span::default())
    }

    #[test]
    fn matching_close_nested() {
        let toks = vec![
            tok(TokenKind::LParen),
            tok(TokenKind::LBracket),
            tok(TokenKind::RBracket),
            tok(TokenKind::RParen),
            tok(TokenKind::Comma),
        ];
        assert_eq!(matching_close(&toks, 0), Some(3));
        assert_eq!(matching_close(&toks, 1), Some(2));
    }

    #[test]
    fn split_ignores_nested_commas() {
        let toks = vec![
            tok(TokenKind::Ident),
            tok(TokenKind::Comma),
            tok(TokenKind::LParen),
            tok(TokenKind::Ident),
            tok(TokenKind::Comma),
            tok(TokenKind::Ident),
            tok(TokenKind::RParen),
        ];
        let parts = split_top_level(&toks, &TokenKind::Comma);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].len(), 5);
    }

    #[test]
    fn blank_ident() {
        assert!(Ident::new("_", Span::default()).is_blank());
        assert!(!Ident::new("x", Span::default()).is_blank());
    }
}
