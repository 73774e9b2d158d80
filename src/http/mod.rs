//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper http1 serving, upgrades enabled)
//!     → request.rs (request id for tracing)
//!     → proxy::router decides tunnel vs forward
//!     → response.rs (body plumbing, rejection replies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::RequestId;
pub use server::{HttpServer, ProxyState};
