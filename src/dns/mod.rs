//! DNS subsystem.
//!
//! # Data Flow
//! ```text
//! proxy dispatch needs an address for host H
//!     → cache.rs (TTL-bounded lookup)
//!     → on miss: resolver.rs (single-flight system lookup)
//!     → cache insert, result fanned out to all waiters
//!
//! Periodic sweep (spawned task, every TTL − 1 seconds):
//!     → cache.rs sweep() removes expired entries
//! ```
//!
//! # Design Decisions
//! - The cache is a pure data structure; metrics and logging live in callers
//! - One in-flight lookup per host, shared by concurrent requests
//! - Resolution failures are terminal for the request, never retried

pub mod cache;
pub mod resolver;

pub use cache::DnsCache;
pub use resolver::{HostLookup, ResolveError, Resolver, SystemLookup};
