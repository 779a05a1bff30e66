//! Shared primitives for the Meridian semantic core.
//!
//! - [`Span`]: source positions carried by tokens, nodes and diagnostics
//! - [`ErrorKey`] / [`Diagnostic`]: symbolic, unformatted diagnostics
//! - [`ErrorSink`] / [`Diagnostics`]: where diagnostics are delivered

mod error;
mod sink;
mod span;

pub use error::{Diagnostic, ErrorKey, SessionError, Severity};
pub use sink::{Diagnostics, ErrorSink};
pub use span::Span;
