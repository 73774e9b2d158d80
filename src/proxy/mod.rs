//! Proxy engine subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed client request
//!     → router.rs (classify: CONNECT tunnel vs plain forward, target host/port)
//!     → dns (literal addresses skip resolution)
//!     → tunnel.rs (connect, 200, upgrade, relay.rs byte pump)
//!       or forward.rs (upstream http1 exchange, headers.rs rewrite)
//!     → registry.rs (tunnel session bookkeeping, RAII teardown)
//! ```
//!
//! # Design Decisions
//! - Tunnels connect upstream BEFORE replying 200, so a failed connect
//!   never produces a success line
//! - Failures after classification abort the client connection without a
//!   synthesized error response
//! - The relay never drops a stream that still has undelivered bytes

pub mod error;
pub mod forward;
pub mod headers;
pub mod registry;
pub mod relay;
pub mod router;
pub mod tunnel;

pub use error::ProxyError;
pub use registry::{SessionGuard, SessionId, SessionRegistry};

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Open the upstream TCP connection for either path, bounded by the
/// configured connect timeout.
pub(crate) async fn connect_upstream(
    target: SocketAddr,
    timeout: Duration,
) -> Result<TcpStream, ProxyError> {
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(ProxyError::UpstreamConnect { target, source }),
        Err(_) => Err(ProxyError::UpstreamConnect {
            target,
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        }),
    }
}
