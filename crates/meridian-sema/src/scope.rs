//! Block-scoped local definitions.
//!
//! `LocalScope` tracks what a function body declares: variables, parameters,
//! block-local type aliases and the generic bindings of the instance being
//! walked. Package-level names live in the session's definition tables and
//! are consulted only after a local lookup misses.
//!
//! Shadowing works like nested blocks in most block-structured languages: an
//! inner block may reuse an outer name, the outer entry comes back when the
//! inner block closes, and a second declaration in the same block is an
//! error.

use meridian_ast::Span;
use rustc_hash::FxHashMap;

use crate::types::Type;
use crate::value::ConstValue;

// ============================================================================
// Types
// ============================================================================

/// A local variable or parameter.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub ty: Type,
    pub mutable: bool,
    /// Folded value of a `const` binding.
    pub constant: Option<ConstValue>,
    /// Declared with `const`.
    pub is_const: bool,
    pub param: bool,
    /// A `const` whose literal value still adapts to the type it meets.
    pub untyped: bool,
    /// Pointer taken from immutable storage.
    pub pointee_const: bool,
}

/// What a local name stands for.
#[derive(Debug, Clone)]
pub enum LocalKind {
    Var(LocalVar),
    /// Block-local `type Name: T`.
    Alias(Type),
    /// Generic parameter bound to a concrete type for this walk.
    Generic(Type),
}

/// One local entry.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: String,
    pub kind: LocalKind,
    /// Block depth the entry was declared at.
    pub depth: u32,
    pub span: Span,
    pub used: bool,
}

impl Local {
    /// Whether block close should report this entry as unused.
    pub fn reportable_unused(&self) -> bool {
        !self.used && self.name != "_" && matches!(&self.kind, LocalKind::Var(v) if !v.param)
    }
}

/// Redeclaration in the same block. Carries the earlier declaration's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redeclared(pub Span);

// ============================================================================
// LocalScope
// ============================================================================

#[derive(Debug, Default)]
pub struct LocalScope {
    /// Visible entries by name.
    entries: FxHashMap<String, Local>,

    /// Current block depth (0 = outside any function).
    depth: u32,

    /// Entries hidden by a shadowing declaration, with the depth the
    /// shadowing happened at.
    shadowed: Vec<(u32, Local)>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Block management
    // ========================================================================

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Close the current block, returning the entries it declared.
    pub fn pop_scope(&mut self) -> Vec<Local> {
        let depth = self.depth;
        let mut closed: Vec<Local> = Vec::new();
        self.entries.retain(|_, local| {
            if local.depth >= depth {
                closed.push(local.clone());
                false
            } else {
                true
            }
        });
        while let Some((shadow_depth, _)) = self.shadowed.last() {
            if *shadow_depth != depth {
                break;
            }
            if let Some((_, local)) = self.shadowed.pop() {
                self.entries.insert(local.name.clone(), local);
            }
        }
        self.depth = depth.saturating_sub(1);
        closed.sort_by_key(|l| l.span);
        closed
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    // ========================================================================
    // Declaration and lookup
    // ========================================================================

    /// Declare `name` in the current block.
    pub fn declare(&mut self, name: &str, kind: LocalKind, span: Span) -> Result<(), Redeclared> {
        if name == "_" {
            return Ok(());
        }
        if let Some(existing) = self.entries.get(name) {
            if existing.depth == self.depth {
                return Err(Redeclared(existing.span));
            }
            self.shadowed.push((self.depth, existing.clone()));
        }
        self.entries.insert(
            name.to_string(),
            Local {
                name: name.to_string(),
                kind,
                depth: self.depth,
                span,
                used: false,
            },
        );
        Ok(())
    }

    /// Whether a declaration of `name` in the current block would be legal.
    ///
    /// An outer entry can be shadowed; an entry of the current block,
    /// including a generic binding, cannot.
    pub fn can_shadow(&self, name: &str) -> bool {
        self.entries.get(name).is_none_or(|e| e.depth != self.depth)
    }

    /// Find `name`, marking it used.
    pub fn lookup(&mut self, name: &str) -> Option<&Local> {
        let local = self.entries.get_mut(name)?;
        local.used = true;
        Some(local)
    }

    /// Find `name` without touching its used flag.
    pub fn peek(&self, name: &str) -> Option<&Local> {
        self.entries.get(name)
    }

    /// Discard everything, returning to depth 0.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.shadowed.clear();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(ty: Type) -> LocalKind {
        LocalKind::Var(LocalVar {
            ty,
            mutable: false,
            constant: None,
            is_const: false,
            param: false,
            untyped: false,
            pointee_const: false,
        })
    }

    fn ty_of(local: &Local) -> String {
        match &local.kind {
            LocalKind::Var(v) => v.ty.to_string(),
            LocalKind::Alias(t) | LocalKind::Generic(t) => t.to_string(),
        }
    }

    #[test]
    fn redeclaration_in_same_block_fails() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare("x", var(Type::int()), Span::new(1, 1, 1)).unwrap();
        assert_eq!(
            scope.declare("x", var(Type::str()), Span::new(2, 1, 1)),
            Err(Redeclared(Span::new(1, 1, 1)))
        );
        assert!(!scope.can_shadow("x"));
    }

    #[test]
    fn inner_block_shadows_and_restores() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare("x", var(Type::int()), Span::new(1, 1, 1)).unwrap();
        scope.push_scope();
        assert!(scope.can_shadow("x"));
        scope.declare("x", var(Type::str()), Span::new(2, 1, 1)).unwrap();
        assert_eq!(ty_of(scope.lookup("x").unwrap()), "str");

        let closed = scope.pop_scope();
        assert_eq!(closed.len(), 1);
        assert_eq!(ty_of(scope.peek("x").unwrap()), "int");
        assert!(!scope.peek("x").unwrap().used);
    }

    #[test]
    fn generic_binding_blocks_same_block_declaration() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope.declare("T", LocalKind::Generic(Type::int()), Span::new(1, 1, 1)).unwrap();
        assert!(scope.declare("T", var(Type::int()), Span::new(2, 1, 1)).is_err());
        scope.push_scope();
        assert!(scope.declare("T", var(Type::int()), Span::new(3, 1, 1)).is_ok());
    }

    #[test]
    fn unused_reporting_skips_params_and_used() {
        let mut scope = LocalScope::new();
        scope.push_scope();
        scope
            .declare(
                "p",
                LocalKind::Var(LocalVar {
                    ty: Type::int(),
                    mutable: false,
                    constant: None,
                    is_const: false,
                    param: true,
                    untyped: false,
                    pointee_const: false,
                }),
                Span::new(1, 1, 1),
            )
            .unwrap();
        scope.declare("a", var(Type::int()), Span::new(2, 1, 1)).unwrap();
        scope.declare("b", var(Type::int()), Span::new(3, 1, 1)).unwrap();
        scope.lookup("b");
        let unused: Vec<String> = scope
            .pop_scope()
            .into_iter()
            .filter(Local::reportable_unused)
            .map(|l| l.name)
            .collect();
        assert_eq!(unused, vec!["a".to_string()]);
    }
}
