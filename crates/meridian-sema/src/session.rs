//! Compilation session.
//!
//! A [`Session`] owns every registered package, the shared definition
//! registry and the diagnostic sink. Packages are registered up front with
//! their parsed files and checked on demand; importing a package checks it
//! first, so a package is only ever checked once per session.

use std::sync::Arc;

use meridian_ast::File;
use meridian_core::{Diagnostics, ErrorSink, SessionError};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::checker::Checker;
use crate::defs::{Definition, PackageId, Registry};
use crate::model::CheckedPackage;
use crate::options::CheckOptions;

/// Check progress of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageState {
    #[default]
    NotChecked,
    /// On the import stack; reaching it again is an import cycle.
    Checking,
    Checked,
}

/// Per-file lookup tables filled by `use` declarations.
#[derive(Debug, Clone)]
pub(crate) struct FileScope {
    pub path: Arc<str>,
    /// Namespaces and selectively imported names.
    pub imports: FxHashMap<String, Definition>,
    /// Wildcard imports, consulted last.
    pub side: FxHashMap<String, Definition>,
}

impl FileScope {
    fn new(path: &str) -> Self {
        Self {
            path: Arc::from(path),
            imports: FxHashMap::default(),
            side: FxHashMap::default(),
        }
    }
}

/// A directory of source files sharing one namespace.
#[derive(Debug)]
pub(crate) struct Package {
    pub path: String,
    pub files: Vec<Arc<File>>,
    /// Package-level definitions by name.
    pub defs: FxHashMap<String, Definition>,
    pub scopes: Vec<FileScope>,
    pub state: PackageState,
    pub output: CheckedPackage,
}

/// Registry of packages plus everything checking them produces.
#[derive(Debug)]
pub struct Session {
    pub(crate) options: CheckOptions,
    pub(crate) registry: Registry,
    pub(crate) packages: Vec<Package>,
    by_path: FxHashMap<String, PackageId>,
    pub(crate) diagnostics: Diagnostics,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CheckOptions::default())
    }
}

impl Session {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            registry: Registry::new(),
            packages: Vec::new(),
            by_path: FxHashMap::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Register a package under `path` (segments separated by `/`).
    pub fn add_package(
        &mut self,
        path: impl Into<String>,
        files: Vec<File>,
    ) -> Result<PackageId, SessionError> {
        let path = path.into();
        if self.by_path.contains_key(&path) {
            return Err(SessionError::DuplicatePackage { path });
        }
        let id = PackageId(self.packages.len() as u32);
        let scopes = files.iter().map(|f| FileScope::new(&f.path)).collect();
        self.packages.push(Package {
            path: path.clone(),
            files: files.into_iter().map(Arc::new).collect(),
            defs: FxHashMap::default(),
            scopes,
            state: PackageState::NotChecked,
            output: CheckedPackage::new(path.clone()),
        });
        self.by_path.insert(path, id);
        Ok(id)
    }

    pub fn package_id(&self, path: &str) -> Option<PackageId> {
        self.by_path.get(path).copied()
    }

    pub fn package_state(&self, id: PackageId) -> PackageState {
        self.packages[id.index()].state
    }

    /// Check the package at `path` (and, first, everything it imports).
    pub fn check(&mut self, path: &str) -> Result<&CheckedPackage, SessionError> {
        let id = self.package_id(path).ok_or_else(|| SessionError::UnknownPackage {
            path: path.to_string(),
        })?;
        self.check_package(id);
        Ok(&self.packages[id.index()].output)
    }

    /// Check every registered package in registration order.
    pub fn check_all(&mut self) {
        for index in 0..self.packages.len() {
            self.check_package(PackageId(index as u32));
        }
    }

    /// Check one package, returning the state it was in beforehand.
    ///
    /// `Checking` means the caller closed an import cycle; nothing is done.
    pub(crate) fn check_package(&mut self, id: PackageId) -> PackageState {
        let before = self.packages[id.index()].state;
        if before != PackageState::NotChecked {
            return before;
        }
        debug!(package = %self.packages[id.index()].path, "checking package");
        self.packages[id.index()].state = PackageState::Checking;
        Checker::new(self, id).run();
        self.packages[id.index()].state = PackageState::Checked;
        before
    }

    /// Output of a package that has been checked.
    pub fn output(&self, path: &str) -> Option<&CheckedPackage> {
        let id = self.package_id(path)?;
        let package = &self.packages[id.index()];
        (package.state == PackageState::Checked).then_some(&package.output)
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Move every collected diagnostic into an external sink.
    pub fn drain_diagnostics(&mut self, sink: &mut dyn ErrorSink) {
        self.diagnostics.drain_into(sink);
    }

    /// Whether the configured error limit has been reached.
    pub fn should_stop(&self) -> bool {
        self.options
            .max_errors
            .is_some_and(|limit| self.diagnostics.error_count() >= limit)
    }

    /// Look up a package-level definition by name.
    pub fn definition(&self, package: &str, name: &str) -> Option<Definition> {
        let id = self.package_id(package)?;
        self.packages[id.index()].defs.get(name).copied()
    }
}
