//! Request line protocol.
//!
//! # Data Flow
//! ```text
//! "GET /status?x=9"
//!     → request.rs (method, instruction path, parameters)
//!     → routing (method gate, reserved paths)
//!     → response.rs (envelope → status line + JSON body)
//! ```
//!
//! # Design Decisions
//! - One request line per exchange; no headers or bodies are read
//! - Replies carry `Content-Length` so clients can frame them on a
//!   connection that stays open

pub mod request;
pub mod response;

pub use request::{Request, RequestError};
pub use response::{Instruction, ResponseEnvelope};
