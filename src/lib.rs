//! Forward HTTP/HTTPS Proxy
//!
//! A forward proxy built with Tokio and hyper. Plain HTTP requests are
//! re-issued upstream with rewritten headers; `CONNECT` requests become
//! opaque byte tunnels.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                    FORWARD PROXY                     │
//!                  │                                                      │
//!  Client Request  │  ┌─────────┐    ┌─────────┐    ┌──────────────┐     │
//!  ────────────────┼─▶│   net   │───▶│  http   │───▶│    proxy     │     │
//!                  │  │listener │    │ server  │    │   router     │     │
//!                  │  └─────────┘    └─────────┘    └──────┬───────┘     │
//!                  │                                       │             │
//!                  │              ┌────────────────────────┤             │
//!                  │              ▼                        ▼             │
//!                  │      ┌──────────────┐        ┌──────────────┐       │
//!                  │      │ forward path │        │ tunnel path  │───────┼──── Upstream
//!                  │      │ (hyper conn) │        │   (relay)    │       │     Server
//!                  │      └──────┬───────┘        └──────┬───────┘       │
//!                  │             │                       │               │
//!                  │      ┌──────┴───────────────────────┴──────┐        │
//!                  │      │ dns cache + resolver, session       │        │
//!                  │      │ registry                            │        │
//!                  │      └─────────────────────────────────────┘        │
//!                  │                                                     │
//!                  │  ┌───────────────────────────────────────────────┐  │
//!                  │  │            Cross-Cutting Concerns             │  │
//!                  │  │  ┌────────┐  ┌───────────┐  ┌──────────────┐  │  │
//!                  │  │  │ config │  │ lifecycle │  │observability │  │  │
//!                  │  │  └────────┘  └───────────┘  └──────────────┘  │  │
//!                  │  └───────────────────────────────────────────────┘  │
//!                  └─────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod dns;
pub mod http;
pub mod net;
pub mod proxy;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::server::{HttpServer, ProxyState};
pub use lifecycle::Shutdown;
