//! Code unit loading.
//!
//! # Responsibilities
//! - Turn a unit path on disk into a fresh extension instance
//! - Keep the loading mechanism behind one trait so the registry never
//!   depends on how units are produced
//!
//! # Design Decisions
//! - The default [`Catalog`] is a compiled-in table of factories keyed by the
//!   unit file's stem; the unit file must still exist on disk
//! - Every call builds a new instance, so reload never reuses state

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::extensions::contract::{BootstrapExtension, Extension};

/// Error raised while producing an extension instance.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no code unit named '{0}' is available")]
    UnknownUnit(String),
    #[error("invalid unit path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to instantiate '{name}': {reason}")]
    Instantiate { name: String, reason: String },
}

/// Host-provided loader: `path → instance | LoadError`.
pub trait ExtensionLoader: Send + Sync {
    fn load_bootstrap(&self, path: &Path) -> Result<Box<dyn BootstrapExtension>, LoadError>;

    fn load_extension(&self, path: &Path) -> Result<Box<dyn Extension>, LoadError>;
}

pub type ExtensionFactory =
    Arc<dyn Fn() -> Result<Box<dyn Extension>, LoadError> + Send + Sync>;

pub type BootstrapFactory =
    Arc<dyn Fn() -> Result<Box<dyn BootstrapExtension>, LoadError> + Send + Sync>;

/// Compiled-in registry of unit factories.
#[derive(Clone)]
pub struct Catalog {
    bootstrap: BootstrapFactory,
    units: HashMap<String, ExtensionFactory>,
}

impl Catalog {
    /// Create a catalog around the bootstrap factory.
    pub fn new<F>(bootstrap: F) -> Self
    where
        F: Fn() -> Result<Box<dyn BootstrapExtension>, LoadError> + Send + Sync + 'static,
    {
        Self {
            bootstrap: Arc::new(bootstrap),
            units: HashMap::new(),
        }
    }

    /// Register a unit factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Extension>, LoadError> + Send + Sync + 'static,
    {
        self.units.insert(name.into(), Arc::new(factory));
    }

    pub fn with_unit<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Extension>, LoadError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn unit_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.units.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("units", &self.unit_names())
            .finish()
    }
}

impl ExtensionLoader for Catalog {
    fn load_bootstrap(&self, path: &Path) -> Result<Box<dyn BootstrapExtension>, LoadError> {
        unit_name(path)?;
        (self.bootstrap)()
    }

    fn load_extension(&self, path: &Path) -> Result<Box<dyn Extension>, LoadError> {
        let name = unit_name(path)?;
        let factory = self
            .units
            .get(name)
            .ok_or_else(|| LoadError::UnknownUnit(name.to_string()))?;
        factory()
    }
}

/// The unit name is the file stem: `Modules/Echo.ext` → `Echo`.
fn unit_name(path: &Path) -> Result<&str, LoadError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| LoadError::InvalidPath(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::builtin::{EchoModule, StartupExtension, StartupSettings};

    fn catalog() -> Catalog {
        Catalog::new(|| Ok(Box::new(StartupExtension::new(StartupSettings::default()))))
            .with_unit("Echo", || Ok(Box::new(EchoModule::default())))
    }

    #[test]
    fn resolves_unit_by_file_stem() {
        let ext = catalog()
            .load_extension(Path::new("/srv/Modules/Echo.ext"))
            .unwrap();
        assert_eq!(ext.display_name(), "Echo");
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let err = catalog()
            .load_extension(Path::new("/srv/Modules/Missing.ext"))
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::UnknownUnit(name) if name == "Missing"));
    }

    #[test]
    fn path_without_stem_is_invalid() {
        let err = catalog().load_extension(Path::new("/")).err().unwrap();
        assert!(matches!(err, LoadError::InvalidPath(_)));
    }

    #[test]
    fn lists_registered_units() {
        assert_eq!(catalog().unit_names(), vec!["Echo"]);
    }
}
