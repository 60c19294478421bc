//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind address, accept loop, connection limits)
//!     → tls.rs (TLS handshake when the bootstrap reports a certificate)
//!     → connection.rs (session: read line → route → write reply)
//!
//! Session States:
//!     Accepted → (Handshaking) → Reading → Dispatching → Writing → Reading | Closed
//! ```
//!
//! # Design Decisions
//! - Every connection runs in its own task; a stalled client holds only its own
//! - Reads are bounded by a timeout and a maximum line length
//! - TLS is optional and handled transparently

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnectionId, ConnectionState, ConnectionTracker, Session, SessionEnd, SessionLimits};
pub use listener::{resolve_bind_address, Listener, ListenerError};
pub use tls::load_tls_config;
