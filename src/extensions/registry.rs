//! Module registry: name → loaded extension.
//!
//! # Responsibilities
//! - Load the bootstrap unit first and keep it registered as `"Startup"`
//! - Add, remove and hot-reload named modules from the modules directory
//! - Hand every instance a back-reference into the host
//!
//! # Design Decisions
//! - The map sits behind a `RwLock`; readers never observe a half-replaced
//!   record because a swap is a single insert under the write lock
//! - Instances are `Arc`-shared. A removed instance is disposed while still
//!   registered and unregistered afterwards; a replaced instance is disposed
//!   after the swap. A caller still holding a handle may be mid-call when
//!   `dispose` runs
//! - Only `initialize` fails hard; everything else degrades to `false` or a no-op

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::validation::is_valid_module_name;
use crate::config::ExtensionsConfig;
use crate::extensions::contract::{BootstrapExtension, Extension, HostHandle};
use crate::extensions::loader::{ExtensionLoader, LoadError};

/// Registry key of the bootstrap extension.
pub const BOOTSTRAP_NAME: &str = "Startup";

/// Error type for registry initialization.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Startup module not found at {}", .0.display())]
    BootstrapMissing(PathBuf),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Lifecycle of one registered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Loaded,
    Disposed,
}

/// A registered extension record.
///
/// Cloning shares the instance; the record disposes it at most once.
#[derive(Clone)]
pub struct ExtensionHandle {
    name: Arc<str>,
    source_path: Arc<Path>,
    instance: Arc<dyn Extension>,
    disposed: Arc<AtomicBool>,
}

impl ExtensionHandle {
    fn new(name: &str, source_path: &Path, instance: Arc<dyn Extension>) -> Self {
        Self {
            name: Arc::from(name),
            source_path: Arc::from(source_path),
            instance,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the instance was loaded from; reload reuses it.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn state(&self) -> ExtensionState {
        if self.disposed.load(Ordering::Acquire) {
            ExtensionState::Disposed
        } else {
            ExtensionState::Loaded
        }
    }

    /// Whether two handles refer to the same instance.
    pub fn same_instance(&self, other: &ExtensionHandle) -> bool {
        Arc::ptr_eq(&self.disposed, &other.disposed)
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.instance.dispose();
        }
    }
}

impl Deref for ExtensionHandle {
    type Target = dyn Extension;

    fn deref(&self) -> &Self::Target {
        self.instance.as_ref()
    }
}

impl fmt::Debug for ExtensionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHandle")
            .field("name", &self.name)
            .field("source_path", &self.source_path)
            .field("state", &self.state())
            .finish()
    }
}

pub(crate) struct RegistryInner {
    root: PathBuf,
    unit_extension: String,
    loader: Arc<dyn ExtensionLoader>,
    bootstrap: Arc<dyn BootstrapExtension>,
    modules: RwLock<HashMap<String, ExtensionHandle>>,
}

/// Shared handle to the module registry.
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Arc<RegistryInner>,
}

impl ModuleRegistry {
    /// Load the bootstrap unit and register it as [`BOOTSTRAP_NAME`].
    ///
    /// The bootstrap's `load` is not called; only modules added later are loaded.
    pub fn initialize(
        config: &ExtensionsConfig,
        loader: Arc<dyn ExtensionLoader>,
    ) -> Result<Self, RegistryError> {
        let path = config.bootstrap_path();
        if !path.is_file() {
            tracing::error!(path = %path.display(), "Startup module not found");
            return Err(RegistryError::BootstrapMissing(path));
        }

        let mut bootstrap = loader.load_bootstrap(&path)?;

        let inner = Arc::new_cyclic(|weak| {
            bootstrap.attach(HostHandle::new(weak.clone()));
            let bootstrap: Arc<dyn BootstrapExtension> = Arc::from(bootstrap);
            let record = ExtensionHandle::new(
                BOOTSTRAP_NAME,
                &path,
                Arc::clone(&bootstrap).into_extension(),
            );

            let mut modules = HashMap::new();
            modules.insert(BOOTSTRAP_NAME.to_string(), record);

            RegistryInner {
                root: config.root.clone(),
                unit_extension: config.unit_extension.clone(),
                loader,
                bootstrap,
                modules: RwLock::new(modules),
            }
        });

        tracing::info!(path = %path.display(), "Startup module registered");
        Ok(Self { inner })
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    pub fn bootstrap(&self) -> &Arc<dyn BootstrapExtension> {
        &self.inner.bootstrap
    }

    /// Directory modules are loaded from, as reported by the bootstrap.
    pub fn modules_directory(&self) -> PathBuf {
        self.inner.root.join(self.inner.bootstrap.modules_directory())
    }

    /// Unit path for `name` inside the modules directory.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.modules_directory()
            .join(format!("{}.{}", name, self.inner.unit_extension))
    }

    /// Load `name` from the modules directory, register it and call `load`.
    ///
    /// Returns the result of `load`. A missing unit, an instantiation
    /// failure or an already registered name yields `false` with the
    /// registry unchanged. A module whose `load` fails stays registered.
    pub fn add_module(&self, name: &str) -> bool {
        if !is_valid_module_name(name) {
            tracing::warn!(module = name, "Rejected module name");
            return false;
        }

        let path = self.module_path(name);
        if !path.is_file() {
            tracing::warn!(module = name, path = %path.display(), "Module not found");
            return false;
        }

        if self.read().contains_key(name) {
            tracing::warn!(module = name, "Module already registered");
            return false;
        }

        let record = match self.instantiate(name, &path) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(module = name, error = %e, "Module instantiation failed");
                return false;
            }
        };

        {
            let mut modules = self.write();
            if modules.contains_key(name) {
                tracing::warn!(module = name, "Module registered concurrently");
                return false;
            }
            modules.insert(name.to_string(), record.clone());
        }

        let loaded = record.load();
        if loaded {
            tracing::info!(module = name, "Module loaded");
        } else {
            tracing::warn!(module = name, "Module registered but failed to load");
        }
        loaded
    }

    /// Dispose and unregister `name`. Unknown names are a no-op.
    pub fn remove_module(&self, name: &str) {
        if name == BOOTSTRAP_NAME {
            tracing::warn!("Refusing to remove the Startup module");
            return;
        }

        let Some(record) = self.get_module(name) else {
            return;
        };

        // Dispose while still registered so the module can log through its host.
        record.dispose();

        let mut modules = self.write();
        if modules.get(name).is_some_and(|current| current.same_instance(&record)) {
            modules.remove(name);
            tracing::info!(module = name, "Module removed");
        }
    }

    /// Re-instantiate `name` from its stored source path and swap it in.
    ///
    /// Returns `Ok(None)` when `name` is not registered, otherwise the result
    /// of the new instance's `load`. On a loader error the current instance
    /// stays registered and is not disposed.
    pub fn reload_module(&self, name: &str) -> Result<Option<bool>, LoadError> {
        if name == BOOTSTRAP_NAME {
            tracing::warn!("Refusing to reload the Startup module");
            return Ok(None);
        }

        let Some(current) = self.get_module(name) else {
            return Ok(None);
        };

        let replacement = self.instantiate(name, current.source_path())?;

        let previous = {
            let mut modules = self.write();
            modules
                .get_mut(name)
                .map(|slot| std::mem::replace(slot, replacement.clone()))
        };

        let Some(previous) = previous else {
            return Ok(None);
        };
        previous.dispose();

        let loaded = replacement.load();
        tracing::info!(module = name, loaded, "Module reloaded");
        Ok(Some(loaded))
    }

    pub fn get_module(&self, name: &str) -> Option<ExtensionHandle> {
        self.read().get(name).cloned()
    }

    /// Whether `instance` reports the type name of a registered module.
    pub fn is_module(&self, instance: &dyn Extension) -> bool {
        match self.inner.modules.read() {
            Ok(modules) => modules.contains_key(instance.type_name()),
            Err(e) => {
                tracing::error!(error = %e, "Module registry lock poisoned");
                false
            }
        }
    }

    /// Registered names, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn instantiate(&self, name: &str, path: &Path) -> Result<ExtensionHandle, LoadError> {
        let mut instance = self.inner.loader.load_extension(path)?;
        instance.attach(self.host_handle());
        Ok(ExtensionHandle::new(name, path, Arc::from(instance)))
    }

    fn host_handle(&self) -> HostHandle {
        HostHandle::new(Arc::downgrade(&self.inner))
    }

    // The map is only mutated by single insert/remove calls, so a poisoned
    // lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ExtensionHandle>> {
        self.inner.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ExtensionHandle>> {
        self.inner.modules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("root", &self.inner.root)
            .field("modules", &self.module_names())
            .finish()
    }
}
