//! Statement nodes.

use meridian_core::Span;

use crate::decl::{TypeAliasDecl, VarDecl};
use crate::token::{Expr, Ident, Op};

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the statement introduces a variable into its block.
    pub fn is_declaration(&self) -> bool {
        matches!(self.kind, StmtKind::Var(_))
    }
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement; must be a call.
    Expr(Expr),
    /// `let`, `let mut` or `const`.
    Var(VarDecl),
    /// `a, b = x, y` and compound assignment.
    Assign(AssignStmt),
    /// `x++` / `x--`
    Postfix { target: Expr, increment: bool },
    /// `ret a, b`
    Ret(Vec<Expr>),
    /// `{ ... }`
    Block(Block),
    If(IfStmt),
    Iter(IterStmt),
    Match(MatchStmt),
    /// `name:`
    Label(Ident),
    /// `goto name`
    Goto(Ident),
    /// `break` or `break name`
    Break(Option<Ident>),
    /// `continue` or `continue name`
    Continue(Option<Ident>),
    Fallthrough,
    /// Block-local `type Name: T`.
    TypeAlias(TypeAliasDecl),
}

/// A sequence of statements with its own lexical scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<Op> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::Add => Op::Plus,
            AssignOp::Sub => Op::Minus,
            AssignOp::Mul => Op::Star,
            AssignOp::Div => Op::Slash,
            AssignOp::Rem => Op::Percent,
            AssignOp::BitAnd => Op::Amp,
            AssignOp::BitOr => Op::Pipe,
            AssignOp::BitXor => Op::Caret,
            AssignOp::Shl => Op::Shl,
            AssignOp::Shr => Op::Shr,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }
}

/// Assignment statement.
///
/// A target of `_` discards its value.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub targets: Vec<Expr>,
    pub op: AssignOp,
    pub values: Vec<Expr>,
}

/// `if` / `else if` / `else` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<CondBranch>,
    pub default: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub cond: Expr,
    pub body: Block,
}

/// Iteration header.
#[derive(Debug, Clone, PartialEq)]
pub enum IterKind {
    /// `for { }`
    Infinite,
    /// `for cond { }`
    While(Expr),
    /// `for k, v in expr { }`
    Range {
        key: Option<Ident>,
        value: Option<Ident>,
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterStmt {
    pub kind: IterKind,
    pub body: Block,
}

/// `match` statement.
///
/// Without a subject every case expression is a boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStmt {
    pub subject: Option<Expr>,
    pub cases: Vec<MatchCase>,
    pub default: Option<MatchCase>,
    pub span: Span,
}

impl MatchStmt {
    /// Cases in evaluation order, default last.
    pub fn all_cases(&self) -> impl Iterator<Item = &MatchCase> {
        self.cases.iter().chain(self.default.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    /// Empty for the default case.
    pub exprs: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}
