//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init metrics → Bind listener → Accept loop
//!
//! Shutdown (shutdown.rs):
//!     SIGINT or operational endpoint → broadcast → accept loop exits
//! ```
//!
//! # Design Decisions
//! - Bind and runtime-build failures are the only fatal class
//! - Shutdown stops accepting; in-flight work ends with the runtime

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
