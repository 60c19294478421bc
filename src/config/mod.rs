//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with the server and every session
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup and never reassigned
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BodyFormat, ExtensionsConfig, ListenerConfig, ObservabilityConfig, ProtocolConfig,
    ServerConfig, TlsConfig,
};
