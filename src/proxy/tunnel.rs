//! CONNECT tunnel path.
//!
//! # Responsibilities
//! - Open the raw upstream connection before anything is promised to the
//!   client
//! - Reply `200` with an empty body once the upstream is live
//! - After the client connection upgrades, splice both streams through
//!   the relay until either side finishes
//!
//! # Design Decisions
//! - Connect-then-reply ordering: a failed connect must never produce a
//!   success line
//! - The registry guard lives inside the relay task, so the session entry
//!   is released exactly when both streams are

use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::http::response::{empty, ProxyBody};
use crate::observability::metrics;
use crate::proxy::registry::SessionGuard;
use crate::proxy::relay;

/// The reply sent once the upstream connection is established.
pub fn established_response() -> Response<ProxyBody> {
    // 200 with no body; the tunnel starts after this is flushed.
    Response::new(empty())
}

/// Drive one tunnel: wait for the client connection to upgrade, then relay
/// opaque bytes until both sides are done. Runs as its own task.
pub async fn run(req: Request<Incoming>, upstream: TcpStream, guard: SessionGuard) {
    let session_id = guard.id();

    match hyper::upgrade::on(req).await {
        Ok(upgraded) => {
            metrics::record_tunnel_established();
            let summary = relay::run(TokioIo::new(upgraded), upstream).await;
            metrics::record_tunnel_closed(&summary);
            tracing::debug!(
                session_id = %session_id,
                client_to_upstream = summary.client_to_upstream,
                upstream_to_client = summary.upstream_to_client,
                "Tunnel closed"
            );
        }
        Err(err) => {
            // The client went away between our 200 and the upgrade.
            tracing::debug!(session_id = %session_id, error = %err, "Client upgrade failed");
        }
    }

    drop(guard);
}
