//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! request line
//!     → router.rs (parse, method gate, reserved paths)
//!     → Dispatch::{Reply, NotFound, EndExchange}
//! ```
//!
//! # Design Decisions
//! - Only GET and POST produce a reply
//! - Reserved paths end the exchange without writing anything
//! - Malformed lines surface as errors; the session decides what to do

pub mod router;

pub use router::{Dispatch, Router};
