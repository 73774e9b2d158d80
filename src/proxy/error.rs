//! Error taxonomy for the proxying path.

use std::net::SocketAddr;
use thiserror::Error;

use crate::dns::ResolveError;

/// Everything that can go wrong between accepting a request and
/// completing its upstream exchange.
///
/// Returned through hyper's service error path, which aborts the client
/// connection without a synthesized response; only the malformed-request
/// variants are answered with an explicit status before that point.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request names no target host at all.
    #[error("request has no target host")]
    MissingHost,

    /// The request's host/port information could not be parsed.
    #[error("invalid target authority: {0}")]
    InvalidAuthority(String),

    /// DNS resolution failed; terminal, not retried.
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// The upstream TCP connect failed or timed out.
    #[error("connect to {target} failed: {source}")]
    UpstreamConnect {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The forwarded exchange died before a response arrived.
    #[error("upstream exchange failed: {0}")]
    UpstreamProtocol(#[source] hyper::Error),
}

impl ProxyError {
    /// Short class label used for metrics.
    pub fn class(&self) -> &'static str {
        match self {
            ProxyError::MissingHost | ProxyError::InvalidAuthority(_) => "malformed",
            ProxyError::Resolution(_) => "resolution",
            ProxyError::UpstreamConnect { .. } => "upstream_connect",
            ProxyError::UpstreamProtocol(_) => "upstream_protocol",
        }
    }

    /// Whether the fault lies with the client request itself, answered with
    /// a 400 instead of an aborted connection.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProxyError::MissingHost | ProxyError::InvalidAuthority(_))
    }
}
