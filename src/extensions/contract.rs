//! Capability contract every loadable extension satisfies.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::extensions::registry::{ModuleRegistry, RegistryInner};

/// Failure reported by an extension entry point.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("extension is not attached to a host")]
    Detached,
    #[error("host is no longer running")]
    HostGone,
}

/// A unit of runtime-loadable behavior.
///
/// Instances are shared behind `Arc` once registered, so entry points take
/// `&self`. `dispose` may race with a call already in flight on a handle
/// obtained before removal; implementations must tolerate that.
pub trait Extension: Send + Sync {
    /// Name used to attribute log lines.
    fn display_name(&self) -> &str;

    /// Reported type name, compared against registry keys by
    /// [`ModuleRegistry::is_module`].
    fn type_name(&self) -> &str;

    /// Store the host back-reference. Called once, right after instantiation.
    fn attach(&mut self, host: HostHandle);

    /// Called once after registration. `false` means the extension is not
    /// usable, though it stays registered.
    fn load(&self) -> bool;

    /// Release held resources. Called before removal or replacement.
    fn dispose(&self);
}

/// The mandatory first-loaded extension.
pub trait BootstrapExtension: Extension {
    fn start(&self) -> Result<(), ExtensionError>;

    /// Whether a server certificate is configured.
    fn certificate_exists(&self) -> bool;

    /// Modules directory, relative to the host root.
    fn modules_directory(&self) -> &str;

    /// View the bootstrap as a plain extension for the registry map.
    fn into_extension(self: Arc<Self>) -> Arc<dyn Extension>;
}

/// Weak back-reference from an extension into its host.
#[derive(Clone)]
pub struct HostHandle {
    registry: Weak<RegistryInner>,
}

impl HostHandle {
    pub(crate) fn new(registry: Weak<RegistryInner>) -> Self {
        Self { registry }
    }

    /// A handle that never resolves to a host.
    pub fn detached() -> Self {
        Self { registry: Weak::new() }
    }

    fn registry(&self) -> Option<ModuleRegistry> {
        self.registry.upgrade().map(ModuleRegistry::from_inner)
    }

    pub fn is_alive(&self) -> bool {
        self.registry.strong_count() > 0
    }

    /// Emit a log line attributed to `source`.
    ///
    /// Lines from instances the registry does not recognize as modules are dropped.
    pub fn log(&self, source: &dyn Extension, message: &str) {
        let Some(registry) = self.registry() else {
            return;
        };
        if registry.is_module(source) {
            tracing::info!(
                target: "artemisa::module",
                module = source.display_name(),
                "{}",
                message
            );
        }
    }

    /// Add a module by name through the host registry.
    pub fn add_module(&self, name: &str) -> Result<bool, ExtensionError> {
        self.registry()
            .map(|registry| registry.add_module(name))
            .ok_or(ExtensionError::HostGone)
    }

    /// Remove a module by name through the host registry.
    pub fn remove_module(&self, name: &str) -> Result<(), ExtensionError> {
        self.registry()
            .map(|registry| registry.remove_module(name))
            .ok_or(ExtensionError::HostGone)
    }

    /// Names currently registered with the host.
    pub fn module_names(&self) -> Vec<String> {
        self.registry()
            .map(|registry| registry.module_names())
            .unwrap_or_default()
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
