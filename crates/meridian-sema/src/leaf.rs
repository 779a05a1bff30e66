//! Barrier leaf checks.
//!
//! Assignability checks of call arguments, returned values and field
//! defaults do not touch scope tables, the combine memo or used flags, so
//! the walker queues them instead of running them inline. At a barrier (end
//! of a function body, end of a package's declaration phase) the queue is
//! flushed: checks run on the rayon pool, each producing a `Result`, and the
//! joining thread pushes the failures into the sink in queue order.

use std::sync::Arc;

use meridian_core::{Diagnostic, ErrorSink, Span};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::conversion::check_assignable;
use crate::defs::Registry;
use crate::options::CheckOptions;
use crate::types::Type;
use crate::value::Value;

/// What a leaf check validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Argument,
    Return,
    FieldDefault,
}

/// One deferred assignability check.
#[derive(Debug, Clone)]
pub struct LeafCheck {
    pub kind: LeafKind,
    pub target: Type,
    pub value: Value,
    pub span: Span,
    /// File the span belongs to.
    pub path: Arc<str>,
}

impl LeafCheck {
    fn run(&self, reg: &Registry, opts: &CheckOptions) -> Result<(), Diagnostic> {
        check_assignable(reg, opts, &self.target, &self.value, self.span).map_err(|d| {
            trace!(
                kind = ?self.kind,
                key = d.key.as_str(),
                line = self.span.line,
                "leaf check failed"
            );
            d.in_file(self.path.clone())
        })
    }
}

/// Checks waiting for the next barrier.
#[derive(Debug, Default)]
pub struct LeafQueue {
    pending: Vec<LeafCheck>,
}

impl LeafQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: LeafCheck) {
        self.pending.push(check);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every queued check and merge failures into `sink`.
    ///
    /// Returns the number of failed checks.
    pub fn flush(
        &mut self,
        reg: &Registry,
        opts: &CheckOptions,
        sink: &mut dyn ErrorSink,
    ) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let checks = std::mem::take(&mut self.pending);
        let parallel = opts.parallel_leaf_checks && checks.len() > 1;
        debug!(count = checks.len(), parallel, "flushing leaf checks");

        let results: Vec<Result<(), Diagnostic>> = if parallel {
            checks.par_iter().map(|c| c.run(reg, opts)).collect()
        } else {
            checks.iter().map(|c| c.run(reg, opts)).collect()
        };

        let mut failed = 0;
        for diag in results.into_iter().filter_map(Result::err) {
            sink.push(diag);
            failed += 1;
        }
        failed
    }
}
