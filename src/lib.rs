//! Meridian semantic core.
//!
//! Facade over the workspace crates:
//!
//! - [`ast`]: the input node model handed over by the parser
//! - everything else is re-exported from `meridian-sema`: the [`Session`]
//!   entry point, [`CheckOptions`], the typed output model and the
//!   diagnostics it produces
//!
//! ```
//! use meridian::{CheckOptions, Session};
//!
//! let mut session = Session::new(CheckOptions::default().with_int_bits(32));
//! session.add_package("app", Vec::new()).unwrap();
//! let output = session.check("app").unwrap();
//! assert!(output.functions.is_empty());
//! assert!(!session.diagnostics().has_errors());
//! ```

pub use meridian_ast as ast;
pub use meridian_sema::*;
