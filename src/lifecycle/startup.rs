//! Startup errors.
//!
//! Any of these aborts the process before the listener accepts traffic.

use crate::extensions::RegistryError;
use crate::net::ListenerError;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}
