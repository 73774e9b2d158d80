//! Bidirectional byte relay between two established streams.
//!
//! # Responsibilities
//! - Copy bytes in both directions with no transformation
//! - On EOF or read error in one direction, drain what was read and
//!   half-close the destination's write side
//! - Release both streams only after both directions have finished
//!
//! # Design Decisions
//! - The two directions are joined, not raced: one side disconnecting must
//!   not cut short bytes still flowing the other way
//! - Flush-then-shutdown before a pump ends is the no-truncation invariant;
//!   a stream with undelivered bytes is never dropped

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

/// Byte counts for one finished relay, by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub client_to_upstream: u64,
    pub upstream_to_client: u64,
}

/// Relay bytes between the client and upstream streams until both
/// directions have reached EOF or failed, then release both.
pub async fn run<C, U>(client: C, upstream: U) -> RelaySummary
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let (client_to_upstream, upstream_to_client) = tokio::join!(
        pump(client_read, upstream_write),
        pump(upstream_read, client_write),
    );

    RelaySummary {
        client_to_upstream,
        upstream_to_client,
    }
}

/// Copy one direction until EOF or error, then drain and half-close the
/// destination. Returns the number of bytes delivered.
async fn pump<R, W>(mut from: ReadHalf<R>, mut to: WriteHalf<W>) -> u64
where
    R: AsyncRead,
    W: AsyncWrite,
{
    let mut buf = [0u8; 8 * 1024];
    let mut delivered: u64 = 0;

    loop {
        match from.read(&mut buf).await {
            // EOF and read error both end this direction; either way the
            // destination gets everything already read before the close.
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if to.write_all(&buf[..n]).await.is_err() {
                    break;
                }
                delivered += n as u64;
            }
        }
    }

    let _ = to.flush().await;
    let _ = to.shutdown().await;
    delivered
}
