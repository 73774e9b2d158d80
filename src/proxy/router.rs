//! Request classification and target extraction.
//!
//! # Responsibilities
//! - Decide tunnel (CONNECT) vs plain forward for every request
//! - Extract the target host and port (authority, Host header fallback)
//! - Detect literal IPv4 hosts that skip resolution
//! - Reject requests with no usable host before any resolution happens
//!
//! # Design Decisions
//! - Default ports: 443 for CONNECT, 80 for everything else
//! - Classification is a pure function of the request head

use hyper::header::HOST;
use hyper::{Method, Request};
use std::net::Ipv4Addr;

use crate::proxy::error::ProxyError;

/// Which path a request takes through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// CONNECT: opaque bidirectional tunnel.
    Tunnel,
    /// Any other method: structured forward exchange.
    Forward,
}

/// A target host, either already an address or a name to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRef {
    Literal(Ipv4Addr),
    Name(String),
}

impl std::fmt::Display for HostRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostRef::Literal(addr) => write!(f, "{}", addr),
            HostRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// The classified destination of one client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: RouteKind,
    pub host: HostRef,
    pub port: u16,
}

const DEFAULT_TUNNEL_PORT: u16 = 443;
const DEFAULT_FORWARD_PORT: u16 = 80;

/// Methods the proxy serves; everything else is answered 405.
pub fn method_allowed(method: &Method) -> bool {
    matches!(
        method.as_str(),
        "GET" | "POST" | "HEAD" | "PUT" | "DELETE" | "OPTIONS" | "TRACE" | "PATCH" | "CONNECT"
    )
}

/// Classify a request and extract its target.
pub fn classify<B>(req: &Request<B>) -> Result<Target, ProxyError> {
    if req.method() == Method::CONNECT {
        let authority = req.uri().authority().ok_or(ProxyError::MissingHost)?;
        let host = authority.host();
        if host.is_empty() {
            return Err(ProxyError::MissingHost);
        }
        return Ok(Target {
            kind: RouteKind::Tunnel,
            host: parse_host(host),
            port: authority.port_u16().unwrap_or(DEFAULT_TUNNEL_PORT),
        });
    }

    // Absolute-form URI first, Host header for origin-form requests.
    let (host, port) = match req.uri().authority() {
        Some(authority) => (authority.host().to_string(), authority.port_u16()),
        None => {
            let raw = req
                .headers()
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .ok_or(ProxyError::MissingHost)?;
            split_host_port(raw)?
        }
    };
    if host.is_empty() {
        return Err(ProxyError::MissingHost);
    }

    Ok(Target {
        kind: RouteKind::Forward,
        host: parse_host(&host),
        port: port.unwrap_or(DEFAULT_FORWARD_PORT),
    })
}

fn parse_host(host: &str) -> HostRef {
    match host.parse::<Ipv4Addr>() {
        Ok(addr) => HostRef::Literal(addr),
        Err(_) => HostRef::Name(host.to_string()),
    }
}

/// Split a `Host` header value into name and optional port.
fn split_host_port(raw: &str) -> Result<(String, Option<u16>), ProxyError> {
    match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| ProxyError::InvalidAuthority(raw.to_string()))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((raw.to_string(), None)),
    }
}
