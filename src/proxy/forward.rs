//! Plain-HTTP forward path.
//!
//! # Responsibilities
//! - Open an http1 connection to the resolved upstream address
//! - Re-issue the client's request with rewritten headers, body streamed
//!   through verbatim
//! - Hand the upstream response back with rewritten headers and the
//!   status preserved
//!
//! # Design Decisions
//! - Method and URI are copied verbatim; only headers change
//! - A failed exchange surfaces as `UpstreamProtocol`, which aborts the
//!   client connection without a synthesized reply

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::time::Duration;

use crate::http::response::ProxyBody;
use crate::proxy::error::ProxyError;
use crate::proxy::{connect_upstream, headers};

/// Reproduce the client's request against the upstream and return its
/// response, rewritten for the client.
pub async fn forward(
    req: Request<Incoming>,
    target: SocketAddr,
    connect_timeout: Duration,
) -> Result<Response<ProxyBody>, ProxyError> {
    let stream = connect_upstream(target, connect_timeout).await?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(ProxyError::UpstreamProtocol)?;

    // The connection task drives the exchange; it ends when the response
    // body (and any keep-alive grace) is done.
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            tracing::debug!(error = %err, "Upstream connection ended with error");
        }
    });

    let (mut parts, body) = req.into_parts();
    parts.headers = headers::client_to_upstream(&parts.headers);
    let upstream_req = Request::from_parts(parts, body);

    let response = sender
        .send_request(upstream_req)
        .await
        .map_err(ProxyError::UpstreamProtocol)?;

    tracing::debug!(
        target = %target,
        status = response.status().as_u16(),
        "Upstream responded"
    );

    let (mut parts, body) = response.into_parts();
    parts.headers = headers::upstream_to_client(&parts.headers);
    Ok(Response::from_parts(parts, body.boxed()))
}
