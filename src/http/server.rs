//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Serve each connection with hyper http1, upgrades enabled
//! - Dispatch requests: operational endpoint, classification, resolution,
//!   tunnel or forward branch
//! - Run the periodic DNS cache sweep
//! - Stop accepting on the shutdown signal
//!
//! # Design Decisions
//! - All proxy-wide state lives in one explicitly constructed `ProxyState`
//!   passed into every handler; no globals
//! - Resolution, connect, and protocol failures abort the client
//!   connection (hyper's service error path) with no synthesized response
//! - Only malformed requests get an explicit 400 before any I/O happens

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpStream;

use crate::config::ProxyConfig;
use crate::dns::cache::{spawn_sweeper, DnsCache};
use crate::dns::Resolver;
use crate::http::request::RequestId;
use crate::http::response::{self, full, ProxyBody};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionPermit, Listener, ListenerError};
use crate::observability::metrics;
use crate::proxy::router::{self, HostRef, RouteKind};
use crate::proxy::{forward, tunnel, ProxyError, SessionRegistry};

/// Proxy-wide state shared by every connection handler.
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<ProxyConfig>,
    pub cache: Arc<DnsCache>,
    pub resolver: Arc<Resolver>,
    pub registry: Arc<SessionRegistry>,
    pub shutdown: Arc<Shutdown>,
}

impl ProxyState {
    /// Build the default state for a configuration, using the system
    /// resolver.
    pub fn new(config: ProxyConfig) -> Self {
        let cache = Arc::new(DnsCache::new(config.dns.ttl()));
        let resolver = Arc::new(Resolver::new(cache.clone()));
        Self {
            config: Arc::new(config),
            cache,
            resolver,
            registry: Arc::new(SessionRegistry::new()),
            shutdown: Arc::new(Shutdown::new()),
        }
    }
}

/// HTTP server for the forward proxy.
pub struct HttpServer {
    state: ProxyState,
}

impl HttpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            state: ProxyState::new(config),
        }
    }

    /// Create a server over pre-built state (custom resolver, shared
    /// shutdown handle).
    pub fn with_state(state: ProxyState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ProxyState {
        &self.state
    }

    /// Run the server, accepting connections until shutdown is triggered.
    pub async fn run(self, listener: Listener) -> Result<(), ListenerError> {
        let mut shutdown_rx = self.state.shutdown.subscribe();

        let sweeper = spawn_sweeper(
            self.state.cache.clone(),
            self.state.config.dns.sweep_interval(),
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received, stopping accept loop");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer, permit)) => {
                            let state = self.state.clone();
                            tokio::spawn(serve_client(stream, peer, permit, state));
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "Accept failed");
                        }
                    }
                }
            }
        }

        sweeper.abort();
        tracing::info!(
            active_sessions = self.state.registry.active(),
            "HTTP server stopped"
        );
        Ok(())
    }
}

/// Serve one client connection.
async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    permit: ConnectionPermit,
    state: ProxyState,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| dispatch(state.clone(), peer, req));

    if let Err(err) = http1::Builder::new()
        .preserve_header_case(true)
        .title_case_headers(true)
        .half_close(true)
        .serve_connection(io, service)
        .with_upgrades()
        .await
    {
        tracing::debug!(peer_addr = %peer, error = %err, "Client connection ended with error");
    }

    drop(permit);
}

/// Route one request to the operational endpoint, the tunnel path, or the
/// forward path. Records metrics on the way out.
async fn dispatch(
    state: ProxyState,
    peer: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, ProxyError> {
    let request_id = RequestId::new();
    let start = Instant::now();
    let method = req.method().clone();

    let result = route_request(&state, peer, request_id, req).await;

    match &result {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
        }
        Err(err) => {
            metrics::record_aborted(method.as_str(), err.class());
            tracing::debug!(
                request_id = %request_id,
                peer_addr = %peer,
                error = %err,
                "Request dropped without a reply"
            );
        }
    }

    result
}

async fn route_request(
    state: &ProxyState,
    peer: SocketAddr,
    request_id: RequestId,
    req: Request<Incoming>,
) -> Result<Response<ProxyBody>, ProxyError> {
    // Operational endpoint: an origin-form path, never a proxied target.
    if req.uri().authority().is_none() && req.uri().path() == state.config.admin.shutdown_path {
        tracing::info!(
            request_id = %request_id,
            peer_addr = %peer,
            "Shutdown requested via operational endpoint"
        );
        state.shutdown.trigger();
        return Ok(Response::new(full("shutting down\n")));
    }

    if !router::method_allowed(req.method()) {
        return Ok(response::status(StatusCode::METHOD_NOT_ALLOWED));
    }

    let target = match router::classify(&req) {
        Ok(target) => target,
        Err(err) => {
            // Malformed requests are the one case rejected with a status.
            tracing::debug!(
                request_id = %request_id,
                peer_addr = %peer,
                error = %err,
                "Rejecting malformed request"
            );
            return Ok(response::status(StatusCode::BAD_REQUEST));
        }
    };

    tracing::debug!(
        request_id = %request_id,
        peer_addr = %peer,
        method = %req.method(),
        uri = %req.uri(),
        host = %target.host,
        port = target.port,
        "Dispatching request"
    );

    let addr = match &target.host {
        HostRef::Literal(addr) => *addr,
        HostRef::Name(name) => state.resolver.resolve(name).await?,
    };
    let upstream_addr = SocketAddr::from((addr, target.port));
    let connect_timeout = state.config.timeouts.connect();

    match target.kind {
        RouteKind::Tunnel => {
            let upstream =
                crate::proxy::connect_upstream(upstream_addr, connect_timeout).await?;
            let guard = state.registry.register(peer, upstream_addr);
            tracing::debug!(
                request_id = %request_id,
                session_id = %guard.id(),
                target = %upstream_addr,
                "Tunnel established"
            );
            tokio::spawn(tunnel::run(req, upstream, guard));
            Ok(tunnel::established_response())
        }
        RouteKind::Forward => {
            let response = forward::forward(req, upstream_addr, connect_timeout).await?;
            tracing::debug!(
                request_id = %request_id,
                target = %upstream_addr,
                status = response.status().as_u16(),
                "Forwarded response"
            );
            Ok(response)
        }
    }
}
