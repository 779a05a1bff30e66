//! Label, jump and `fallthrough` validation.
//!
//! Runs once per function body, before any statement is type checked. The
//! first pass numbers every block and records where labels and
//! declarations sit; the second walks the body with a stack of enclosing
//! loops and matches and checks every jump against it.

use meridian_ast::{Block, Ident, Stmt, StmtKind};
use meridian_core::{Diagnostic, ErrorKey};
use rustc_hash::FxHashMap;

/// Nested blocks of a statement, in walk order.
fn child_blocks(stmt: &Stmt) -> Vec<&Block> {
    match &stmt.kind {
        StmtKind::Block(block) => vec![block],
        StmtKind::If(stmt) => stmt
            .branches
            .iter()
            .map(|b| &b.body)
            .chain(stmt.default.iter())
            .collect(),
        StmtKind::Iter(stmt) => vec![&stmt.body],
        StmtKind::Match(stmt) => stmt.all_cases().map(|c| &c.body).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug)]
struct BlockInfo {
    /// Enclosing block and the index of the statement holding this block.
    parent: Option<(usize, usize)>,
    /// Indices of declaration statements.
    decls: Vec<usize>,
}

/// Where a label sits: block and statement index.
#[derive(Debug, Clone, Copy)]
struct LabelSite {
    block: usize,
    index: usize,
}

#[derive(Debug)]
struct Frame<'a> {
    is_loop: bool,
    label: Option<&'a str>,
}

/// Position of a statement directly inside a `match` case body.
#[derive(Debug, Clone, Copy)]
struct CaseCtx {
    last_case: bool,
}

struct Validator<'a> {
    blocks: Vec<BlockInfo>,
    labels: FxHashMap<&'a str, LabelSite>,
    frames: Vec<Frame<'a>>,
    next_block: usize,
    errors: Vec<Diagnostic>,
}

/// Validate every jump in a function body.
pub fn validate(body: &Block) -> Vec<Diagnostic> {
    let mut v = Validator {
        blocks: Vec::new(),
        labels: FxHashMap::default(),
        frames: Vec::new(),
        next_block: 0,
        errors: Vec::new(),
    };
    v.collect(body, None);
    v.walk(body, None);
    v.errors
}

impl<'a> Validator<'a> {
    fn collect(&mut self, block: &'a Block, parent: Option<(usize, usize)>) {
        let id = self.blocks.len();
        self.blocks.push(BlockInfo {
            parent,
            decls: block
                .stmts
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_declaration())
                .map(|(i, _)| i)
                .collect(),
        });
        for (index, stmt) in block.stmts.iter().enumerate() {
            if let StmtKind::Label(label) = &stmt.kind {
                if self.labels.contains_key(label.name.as_str()) {
                    self.errors
                        .push(Diagnostic::new(ErrorKey::LabelExist, label.span).arg(&label.name));
                } else {
                    self.labels.insert(&label.name, LabelSite { block: id, index });
                }
            }
            for child in child_blocks(stmt) {
                self.collect(child, Some((id, index)));
            }
        }
    }

    fn walk(&mut self, block: &'a Block, case: Option<CaseCtx>) {
        let id = self.next_block;
        self.next_block += 1;
        let count = block.stmts.len();
        for (index, stmt) in block.stmts.iter().enumerate() {
            let label = match index.checked_sub(1).map(|i| &block.stmts[i].kind) {
                Some(StmtKind::Label(l)) => Some(l.name.as_str()),
                _ => None,
            };
            match &stmt.kind {
                StmtKind::Break(None) => {
                    if self.frames.is_empty() {
                        self.errors
                            .push(Diagnostic::new(ErrorKey::BreakAtOutOfValidScope, stmt.span));
                    }
                }
                StmtKind::Continue(None) => {
                    if !self.frames.iter().any(|f| f.is_loop) {
                        self.errors
                            .push(Diagnostic::new(ErrorKey::ContinueAtOutOfValidScope, stmt.span));
                    }
                }
                StmtKind::Break(Some(target)) => self.labeled_jump(target, false),
                StmtKind::Continue(Some(target)) => self.labeled_jump(target, true),
                StmtKind::Fallthrough => match case {
                    Some(ctx) if index + 1 == count => {
                        if ctx.last_case {
                            self.errors.push(Diagnostic::new(
                                ErrorKey::FallthroughIntoFinalCase,
                                stmt.span,
                            ));
                        }
                    }
                    _ => self
                        .errors
                        .push(Diagnostic::new(ErrorKey::FallthroughWrongUse, stmt.span)),
                },
                StmtKind::Goto(target) => self.goto(target, id, index),
                StmtKind::Iter(iter) => {
                    self.frames.push(Frame { is_loop: true, label });
                    self.walk(&iter.body, None);
                    self.frames.pop();
                }
                StmtKind::Match(m) => {
                    self.frames.push(Frame { is_loop: false, label });
                    let cases: Vec<_> = m.all_cases().collect();
                    let last = cases.len().saturating_sub(1);
                    for (i, c) in cases.into_iter().enumerate() {
                        self.walk(&c.body, Some(CaseCtx { last_case: i == last }));
                    }
                    self.frames.pop();
                }
                _ => {
                    for child in child_blocks(stmt) {
                        self.walk(child, None);
                    }
                }
            }
        }
    }

    fn labeled_jump(&mut self, target: &Ident, is_continue: bool) {
        let frame = self
            .frames
            .iter()
            .rev()
            .find(|f| f.label == Some(target.name.as_str()));
        let key = match frame {
            Some(frame) if is_continue && !frame.is_loop => ErrorKey::InvalidLabel,
            Some(_) => return,
            None if self.labels.contains_key(target.name.as_str()) => ErrorKey::InvalidLabel,
            None => ErrorKey::LabelNotExist,
        };
        self.errors
            .push(Diagnostic::new(key, target.span).arg(&target.name));
    }

    fn goto(&mut self, target: &Ident, block: usize, index: usize) {
        let Some(site) = self.labels.get(target.name.as_str()).copied() else {
            self.errors
                .push(Diagnostic::new(ErrorKey::LabelNotExist, target.span).arg(&target.name));
            return;
        };
        // Climb from the goto until reaching the label's block.
        let (mut current, mut anchor) = (block, index);
        while current != site.block {
            match self.blocks[current].parent {
                Some((parent, at)) => {
                    current = parent;
                    anchor = at;
                }
                None => {
                    self.errors.push(
                        Diagnostic::new(ErrorKey::GotoIntoBlock, target.span).arg(&target.name),
                    );
                    return;
                }
            }
        }
        if site.index > anchor
            && self.blocks[site.block]
                .decls
                .iter()
                .any(|&d| d > anchor && d < site.index)
        {
            self.errors.push(
                Diagnostic::new(ErrorKey::GotoJumpsDeclarations, target.span).arg(&target.name),
            );
        }
    }
}
