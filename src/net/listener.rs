//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Graceful handling of accept errors

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A bounded TCP listener that limits concurrent client connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// accepting pauses until a slot is released by a finished connection.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore holding the free connection slots.
    slots: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listening for connections"
        );

        Ok(Self {
            inner: listener,
            slots: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream, the peer address, and a permit that must be held
    /// for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire a slot first so a full proxy stops accepting instead of
        // queueing connections it cannot serve.
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_slots = self.slots.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// A permit representing one occupied connection slot.
///
/// When dropped, the slot is released back to the listener. This keeps the
/// limit accurate even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(max_connections: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections,
        }
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let listener = Listener::bind(&test_config(4)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.available_slots(), 4);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let listener = Listener::bind(&test_config(1)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_slots(), 0);

        drop(permit);
        assert_eq!(listener.available_slots(), 1);
        drop(client);
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let config = ListenerConfig {
            bind_address: "not-an-address".into(),
            max_connections: 1,
        };
        assert!(matches!(
            Listener::bind(&config).await,
            Err(ListenerError::Bind(_))
        ));
    }
}
