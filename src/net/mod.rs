//! Network foundation subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → listener.rs (accept, enforce connection limit)
//!     → http::server (hyper http1 serving with upgrades)
//! ```

pub mod listener;

pub use listener::{ConnectionPermit, Listener, ListenerError};
