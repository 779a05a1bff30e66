//! Diagnostic delivery.

use crate::{Diagnostic, ErrorKey, Severity};

/// Receives diagnostics from the semantic core.
///
/// Errors and warnings travel on separate channels so that a driver can
/// decide on its own whether warnings fail a build.
pub trait ErrorSink {
    /// Record an error.
    fn push(&mut self, diag: Diagnostic);

    /// Record a non-fatal warning.
    fn warn(&mut self, diag: Diagnostic);
}

/// Collecting sink used by sessions and tests.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether any error carries `key`.
    pub fn has_error(&self, key: ErrorKey) -> bool {
        self.errors.iter().any(|d| d.key == key)
    }

    /// Whether any warning carries `key`.
    pub fn has_warning(&self, key: ErrorKey) -> bool {
        self.warnings.iter().any(|d| d.key == key)
    }

    /// Errors ordered by file, then position.
    ///
    /// Barrier merges append leaf-check results after the walker's own
    /// errors, so the raw order is not source order.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut all: Vec<&Diagnostic> = self.errors.iter().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path).then(a.span.cmp(&b.span)));
        all
    }

    /// Move every diagnostic into another sink.
    pub fn drain_into(&mut self, sink: &mut dyn ErrorSink) {
        for diag in self.errors.drain(..) {
            sink.push(diag);
        }
        for diag in self.warnings.drain(..) {
            sink.warn(diag);
        }
    }
}

impl ErrorSink for Diagnostics {
    fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.errors.push(diag),
            Severity::Warning => self.warnings.push(diag),
        }
    }

    fn warn(&mut self, diag: Diagnostic) {
        self.warnings.push(diag.warning());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn channels_are_separate() {
        let mut sink = Diagnostics::new();
        sink.push(Diagnostic::new(ErrorKey::IdNotExist, Span::new(1, 1, 1)));
        sink.warn(Diagnostic::new(ErrorKey::DeclaredButNotUsed, Span::new(2, 1, 1)));

        assert_eq!(sink.error_count(), 1);
        assert!(sink.has_error(ErrorKey::IdNotExist));
        assert!(sink.has_warning(ErrorKey::DeclaredButNotUsed));
        assert!(!sink.has_error(ErrorKey::DeclaredButNotUsed));
    }

    #[test]
    fn sorted_by_position() {
        let mut sink = Diagnostics::new();
        sink.push(Diagnostic::new(ErrorKey::MissingRet, Span::new(9, 1, 1)));
        sink.push(Diagnostic::new(ErrorKey::IdNotExist, Span::new(3, 2, 1)));

        let keys: Vec<_> = sink.sorted().iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![ErrorKey::IdNotExist, ErrorKey::MissingRet]);
    }

    #[test]
    fn drain_moves_everything() {
        let mut first = Diagnostics::new();
        first.push(Diagnostic::new(ErrorKey::MissingRet, Span::default()));
        first.warn(Diagnostic::new(ErrorKey::DeclaredButNotUsed, Span::default()));

        let mut second = Diagnostics::new();
        first.drain_into(&mut second);

        assert!(!first.has_errors());
        assert_eq!(second.error_count(), 1);
        assert_eq!(second.warnings().len(), 1);
    }
}
