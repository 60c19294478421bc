//! Modules directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::extensions::registry::ModuleRegistry;

/// Reloads registered modules when their unit file changes.
pub struct ExtensionWatcher {
    directory: PathBuf,
    unit_extension: String,
    registry: ModuleRegistry,
}

impl ExtensionWatcher {
    pub fn new(registry: ModuleRegistry, unit_extension: impl Into<String>) -> Self {
        Self {
            directory: registry.modules_directory(),
            unit_extension: unit_extension.into(),
            registry,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = self.directory.clone();
        let registry = self.registry;
        let unit_extension = self.unit_extension;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    for path in &event.paths {
                        let Some(name) = module_name(path, &unit_extension) else {
                            continue;
                        };
                        if registry.get_module(name).is_none() {
                            continue;
                        }
                        tracing::info!(module = name, "Unit change detected, reloading...");
                        if let Err(e) = registry.reload_module(name) {
                            tracing::error!(
                                module = name,
                                error = %e,
                                "Failed to reload module. Keeping current instance."
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?directory, "Extension watcher started");
        Ok(watcher)
    }
}

/// `Modules/Echo.ext` → `Echo` when the extension matches.
fn module_name<'a>(path: &'a Path, unit_extension: &str) -> Option<&'a str> {
    if path.extension()?.to_str()? != unit_extension {
        return None;
    }
    path.file_stem()?.to_str()
}
