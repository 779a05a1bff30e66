//! Checker configuration.

/// Options shared by every pass of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Width of `int`, `uint` and `uintptr` (32 or 64).
    pub int_bits: u32,
    /// Run barrier leaf checks on the rayon pool instead of inline.
    pub parallel_leaf_checks: bool,
    /// Report unused locals as errors instead of warnings.
    pub unused_as_error: bool,
    /// Nesting limit for generic instantiation.
    pub max_instantiation_depth: usize,
    /// Error count after which [`Session::should_stop`](crate::Session::should_stop)
    /// turns true. The checker itself never stops early.
    pub max_errors: Option<usize>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            int_bits: 64,
            parallel_leaf_checks: true,
            unused_as_error: false,
            max_instantiation_depth: 64,
            max_errors: None,
        }
    }
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width of the platform-sized integers. Anything but 32 means 64.
    pub fn with_int_bits(mut self, bits: u32) -> Self {
        self.int_bits = if bits == 32 { 32 } else { 64 };
        self
    }

    pub fn with_parallel_leaf_checks(mut self, parallel: bool) -> Self {
        self.parallel_leaf_checks = parallel;
        self
    }

    pub fn with_unused_as_error(mut self, as_error: bool) -> Self {
        self.unused_as_error = as_error;
        self
    }

    pub fn with_max_instantiation_depth(mut self, depth: usize) -> Self {
        self.max_instantiation_depth = depth;
        self
    }

    pub fn with_max_errors(mut self, limit: usize) -> Self {
        self.max_errors = Some(limit);
        self
    }
}
