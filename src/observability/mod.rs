//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (connection_id, peer, module)
//! Extensions produce:
//!     → HostHandle::log → target "artemisa::module", only for registered modules
//! Consumers:
//!     → logging.rs (fmt subscriber on stdout)
//! ```

pub mod logging;

pub use logging::init;
