//! Tunnel session registry and lifecycle tracking.
//!
//! # Responsibilities
//! - Assign a stable id to every established tunnel
//! - Map that id to the session's endpoints while the tunnel lives
//! - Release the entry when the relay finishes, via an RAII guard
//!
//! # Design Decisions
//! - Teardown is keyed by the session id, never by transport identity
//! - The guard travels with the relay task, so an entry cannot outlive
//!   the session even if the task fails

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Relaxed ordering is sufficient: only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// What the registry remembers about a live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub peer: SocketAddr,
    pub target: SocketAddr,
    pub established_at: Instant,
}

/// Registry of live tunnel sessions.
///
/// The session table is shared between the registry and every outstanding
/// guard, so a guard can release its entry without a handle back to the
/// registry itself.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, SessionInfo>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly established session. The returned guard removes the
    /// entry when dropped.
    pub fn register(&self, peer: SocketAddr, target: SocketAddr) -> SessionGuard {
        let id = SessionId::next();
        self.sessions.insert(
            id,
            SessionInfo {
                peer,
                target,
                established_at: Instant::now(),
            },
        );
        metrics::set_active_sessions(self.sessions.len());
        tracing::debug!(session_id = %id, peer_addr = %peer, target = %target, "Session registered");

        SessionGuard {
            sessions: Arc::clone(&self.sessions),
            id,
        }
    }

    /// Number of live sessions.
    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }
}

/// Guard tying a registry entry to its session's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    sessions: Arc<DashMap<SessionId, SessionInfo>>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        metrics::set_active_sessions(self.sessions.len());
        tracing::trace!(session_id = %self.id, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_session_ids_unique() {
        let registry = SessionRegistry::new();
        let a = registry.register(addr(1000), addr(443));
        let b = registry.register(addr(1001), addr(443));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_guard_removes_entry_on_drop() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.active(), 0);

        let first = registry.register(addr(1000), addr(443));
        let second = registry.register(addr(1001), addr(8443));
        assert_eq!(registry.active(), 2);
        assert!(registry.contains(first.id()));

        let first_id = first.id();
        drop(first);
        assert_eq!(registry.active(), 1);
        assert!(!registry.contains(first_id));
        assert!(registry.contains(second.id()));

        drop(second);
        assert_eq!(registry.active(), 0);
    }
}
