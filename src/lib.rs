//! Artemisa: an extensible line-protocol server.

pub mod config;
pub mod extensions;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod server;

pub use config::ServerConfig;
pub use extensions::ModuleRegistry;
pub use lifecycle::Shutdown;
pub use server::Server;
