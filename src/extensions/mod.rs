//! Extension subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig.extensions
//!     → registry.rs (initialize: bootstrap unit, registered as "Startup")
//!     → loader.rs (unit path → instance, via the compiled-in catalog)
//!     → contract.rs (attach host back-reference, load, dispose)
//!
//! At runtime:
//!     add / remove / reload by name (registry.rs)
//!     watcher.rs → reload when a unit file changes
//! ```
//!
//! # Design Decisions
//! - The registry is the only owner of extension instances
//! - Extensions hold a weak back-reference; they never keep the host alive
//! - Registry failures degrade to booleans; only initialization is fatal

pub mod builtin;
pub mod contract;
pub mod loader;
pub mod registry;
pub mod watcher;

pub use contract::{BootstrapExtension, Extension, ExtensionError, HostHandle};
pub use loader::{Catalog, ExtensionLoader, LoadError};
pub use registry::{ExtensionHandle, ExtensionState, ModuleRegistry, RegistryError, BOOTSTRAP_NAME};
