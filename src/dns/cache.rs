//! Host→address cache with TTL-based expiration.

use dashmap::DashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct CacheEntry {
    addr: Ipv4Addr,
    resolved_at: Instant,
}

/// TTL-bounded DNS cache.
///
/// At most one entry per host; an insert overwrites and restamps. Expired
/// entries are treated as misses by `lookup` but are only removed by the
/// periodic `sweep`, so lookup stays a read-mostly operation.
pub struct DnsCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a cached address. A hit requires the entry to be younger
    /// than the TTL; an expired entry is a miss and is left in place.
    pub fn lookup(&self, host: &str) -> Option<Ipv4Addr> {
        self.lookup_at(host, Instant::now())
    }

    /// Store an address for a host, unconditionally overwriting.
    pub fn insert(&self, host: &str, addr: Ipv4Addr) {
        self.insert_at(host, addr, Instant::now());
    }

    /// Remove every entry older than the TTL. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup_at(&self, host: &str, now: Instant) -> Option<Ipv4Addr> {
        let entry = self.entries.get(host)?;
        if now.saturating_duration_since(entry.resolved_at) < self.ttl {
            Some(entry.addr)
        } else {
            None
        }
    }

    fn insert_at(&self, host: &str, addr: Ipv4Addr, now: Instant) {
        self.entries.insert(
            host.to_string(),
            CacheEntry {
                addr,
                resolved_at: now,
            },
        );
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.resolved_at) <= self.ttl);
        before - self.entries.len()
    }
}

/// Spawn the periodic sweep task for a cache.
///
/// The first tick fires immediately and is skipped; subsequent ticks run the
/// sweep every `period`.
pub fn spawn_sweeper(cache: Arc<DnsCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let before = cache.len();
            let removed = cache.sweep();
            crate::observability::metrics::set_dns_cache_size(cache.len());
            tracing::debug!(before, removed, remaining = cache.len(), "DNS cache sweep");
        }
    })
}
