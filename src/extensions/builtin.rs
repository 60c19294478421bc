//! Extensions compiled into the server binary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::extensions::contract::{BootstrapExtension, Extension, ExtensionError, HostHandle};
use crate::extensions::loader::Catalog;
use crate::extensions::registry::BOOTSTRAP_NAME;

/// Values the bootstrap extension reports to the host.
#[derive(Debug, Clone)]
pub struct StartupSettings {
    pub certificate_configured: bool,
    pub modules_directory: String,
    pub autoload: Vec<String>,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            certificate_configured: false,
            modules_directory: "Modules".to_string(),
            autoload: Vec::new(),
        }
    }
}

impl StartupSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            certificate_configured: config.tls.is_some(),
            modules_directory: config.extensions.directory.clone(),
            autoload: config.extensions.autoload.clone(),
        }
    }
}

/// Default bootstrap extension: reports configuration and autoloads modules on start.
#[derive(Debug)]
pub struct StartupExtension {
    settings: StartupSettings,
    host: Option<HostHandle>,
}

impl StartupExtension {
    pub fn new(settings: StartupSettings) -> Self {
        Self { settings, host: None }
    }
}

impl Extension for StartupExtension {
    fn display_name(&self) -> &str {
        BOOTSTRAP_NAME
    }

    fn type_name(&self) -> &str {
        BOOTSTRAP_NAME
    }

    fn attach(&mut self, host: HostHandle) {
        self.host = Some(host);
    }

    fn load(&self) -> bool {
        true
    }

    fn dispose(&self) {}
}

impl BootstrapExtension for StartupExtension {
    fn start(&self) -> Result<(), ExtensionError> {
        let host = self.host.as_ref().ok_or(ExtensionError::Detached)?;

        for name in &self.settings.autoload {
            if host.add_module(name)? {
                host.log(self, &format!("Autoloaded '{}'", name));
            } else {
                tracing::warn!(module = %name, "Autoload failed");
            }
        }

        host.log(self, &format!("Started with modules {:?}", host.module_names()));
        Ok(())
    }

    fn certificate_exists(&self) -> bool {
        self.settings.certificate_configured
    }

    fn modules_directory(&self) -> &str {
        &self.settings.modules_directory
    }

    fn into_extension(self: Arc<Self>) -> Arc<dyn Extension> {
        self
    }
}

/// Minimal module that reports its lifecycle through the host log.
#[derive(Debug, Default)]
pub struct EchoModule {
    host: Option<HostHandle>,
    loads: AtomicUsize,
    disposed: AtomicBool,
}

impl EchoModule {
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Relaxed)
    }

    fn log(&self, message: &str) {
        if let Some(host) = &self.host {
            host.log(self, message);
        }
    }
}

impl Extension for EchoModule {
    fn display_name(&self) -> &str {
        "Echo"
    }

    fn type_name(&self) -> &str {
        "Echo"
    }

    fn attach(&mut self, host: HostHandle) {
        self.host = Some(host);
    }

    fn load(&self) -> bool {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.log("ready");
        true
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Relaxed);
        self.log("disposed");
    }
}

/// Catalog holding the built-in bootstrap and modules for `config`.
pub fn default_catalog(config: &ServerConfig) -> Catalog {
    let settings = StartupSettings::from_config(config);
    Catalog::new(move || Ok(Box::new(StartupExtension::new(settings.clone()))))
        .with_unit("Echo", || Ok(Box::new(EchoModule::default())))
}
