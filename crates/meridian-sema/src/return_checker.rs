//! Return path analysis.

use meridian_ast::{Block, IterKind, Stmt, StmtKind};

/// Whether every path through `body` ends in a `ret`.
pub fn has_return_path(body: &Block) -> bool {
    body.stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Ret(_) => true,
        StmtKind::Block(block) => has_return_path(block),
        StmtKind::If(stmt) => match &stmt.default {
            Some(default) => {
                has_return_path(default) && stmt.branches.iter().all(|b| has_return_path(&b.body))
            }
            None => false,
        },
        StmtKind::Match(stmt) => {
            if stmt.default.is_none() {
                return false;
            }
            let cases: Vec<_> = stmt.all_cases().collect();
            // A case ending in `fallthrough` returns when the next one does.
            let mut next_returns = false;
            let mut all = true;
            for case in cases.iter().rev() {
                let falls = matches!(
                    case.body.stmts.last().map(|s| &s.kind),
                    Some(StmtKind::Fallthrough)
                );
                let returns = has_return_path(&case.body) || (falls && next_returns);
                all &= returns;
                next_returns = returns;
            }
            all
        }
        StmtKind::Iter(iter) => {
            matches!(iter.kind, IterKind::Infinite)
                && (has_return_path(&iter.body) || !breaks_out(&iter.body.stmts, 0))
        }
        _ => false,
    }
}

/// Whether a `break` in `stmts` leaves the loop being analyzed.
///
/// `nesting` counts the loops and matches entered since then; an unlabeled
/// `break` inside one of them stays there.
fn breaks_out(stmts: &[Stmt], nesting: usize) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break(None) => nesting == 0,
        StmtKind::Break(Some(_)) => true,
        StmtKind::Block(block) => breaks_out(&block.stmts, nesting),
        StmtKind::If(stmt) => {
            stmt.branches.iter().any(|b| breaks_out(&b.body.stmts, nesting))
                || stmt.default.as_ref().is_some_and(|d| breaks_out(&d.stmts, nesting))
        }
        StmtKind::Iter(iter) => breaks_out(&iter.body.stmts, nesting + 1),
        StmtKind::Match(stmt) => stmt.all_cases().any(|c| breaks_out(&c.body.stmts, nesting + 1)),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use meridian_ast::testing::*;

    use super::*;

    fn returns(stmts: Vec<meridian_ast::Stmt>) -> bool {
        has_return_path(&block(stmts))
    }

    #[test]
    fn plain_and_nested_returns() {
        assert!(returns(vec![ret(&["1"])]));
        assert!(returns(vec![block_stmt(vec![ret(&["1"])])]));
        assert!(!returns(vec![expr_stmt("f()")]));
    }

    #[test]
    fn if_needs_every_branch() {
        assert!(returns(vec![if_else("a", vec![ret(&["1"])], vec![ret(&["2"])])]));
        assert!(!returns(vec![if_("a", vec![ret(&["1"])])]));
        assert!(!returns(vec![if_else("a", vec![ret(&["1"])], vec![])]));
    }

    #[test]
    fn match_with_fallthrough() {
        let ok = match_(
            Some("x"),
            vec![(vec!["1"], vec![fallthrough()]), (vec!["2"], vec![ret(&["1"])])],
            Some(vec![ret(&["0"])]),
        );
        assert!(returns(vec![ok]));

        let no_default = match_(Some("x"), vec![(vec!["1"], vec![ret(&["1"])])], None);
        assert!(!returns(vec![no_default]));
    }

    #[test]
    fn infinite_loops() {
        assert!(returns(vec![loop_(vec![expr_stmt("f()")])]));
        assert!(!returns(vec![loop_(vec![if_("a", vec![brk(None)])])]));
        assert!(returns(vec![loop_(vec![loop_(vec![brk(None)])])]));
        assert!(!returns(vec![while_("a", vec![ret(&["1"])])]));
    }
}
