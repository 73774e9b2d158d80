//! Asynchronous host resolution with single-flight deduplication.
//!
//! # Responsibilities
//! - Answer from the DNS cache when possible
//! - Perform at most one concurrent system lookup per host
//! - Fan the one result out to every request waiting on that host
//! - Insert successful results into the cache
//!
//! # Design Decisions
//! - The actual lookup sits behind the `HostLookup` trait so tests can
//!   substitute a deterministic resolver
//! - Results travel over a broadcast channel, which is why `ResolveError`
//!   is `Clone` (the I/O cause is stringified)
//! - No retries: a failed resolution fails every waiting request

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::dns::cache::DnsCache;
use crate::observability::metrics;

/// Resolution failure, terminal for the requests waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The lookup completed but returned no IPv4 address.
    #[error("no address records for {host}")]
    NoAddress { host: String },
    /// The lookup itself failed.
    #[error("lookup for {host} failed: {message}")]
    Lookup { host: String, message: String },
}

/// The seam to the external resolver library.
pub trait HostLookup: Send + Sync + 'static {
    /// Resolve a hostname to one IPv4 address.
    fn lookup_ipv4(&self, host: String) -> BoxFuture<'static, Result<Ipv4Addr, ResolveError>>;
}

/// Production lookup backed by the runtime's `lookup_host`.
///
/// Takes the first IPv4 address; A records are the only record type the
/// proxy resolves.
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup_ipv4(&self, host: String) -> BoxFuture<'static, Result<Ipv4Addr, ResolveError>> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host.as_str(), 0))
                .await
                .map_err(|e| ResolveError::Lookup {
                    host: host.clone(),
                    message: e.to_string(),
                })?;

            let first = addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(v4) => Some(v4),
                    IpAddr::V6(_) => None,
                })
                .next();
            first.ok_or(ResolveError::NoAddress { host })
        })
    }
}

type SharedResult = Result<Ipv4Addr, ResolveError>;

/// Cache-fronted, single-flight resolver.
pub struct Resolver {
    cache: Arc<DnsCache>,
    lookup: Arc<dyn HostLookup>,
    in_flight: Arc<Mutex<HashMap<String, broadcast::Sender<SharedResult>>>>,
}

impl Resolver {
    /// Create a resolver using the system lookup.
    pub fn new(cache: Arc<DnsCache>) -> Self {
        Self::with_lookup(cache, Arc::new(SystemLookup))
    }

    /// Create a resolver with a custom lookup implementation.
    pub fn with_lookup(cache: Arc<DnsCache>, lookup: Arc<dyn HostLookup>) -> Self {
        Self {
            cache,
            lookup,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve a hostname, consulting the cache first.
    ///
    /// Concurrent calls for the same uncached host share one underlying
    /// lookup. A caller whose initiating lookup is abandoned (every waiter
    /// cancelled) observes a closed channel and fails.
    pub async fn resolve(&self, host: &str) -> SharedResult {
        if let Some(addr) = self.cache.lookup(host) {
            metrics::record_dns_cache(true);
            return Ok(addr);
        }
        metrics::record_dns_cache(false);

        let mut rx = {
            let mut in_flight = self
                .in_flight
                .lock()
                .expect("resolver in-flight lock poisoned");

            // The lookup may have completed between the cache miss above
            // and taking the lock.
            if let Some(addr) = self.cache.lookup(host) {
                return Ok(addr);
            }

            match in_flight.get(host) {
                Some(tx) => tx.subscribe(),
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    in_flight.insert(host.to_string(), tx);
                    self.spawn_lookup(host.to_string());
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Lookup {
                host: host.to_string(),
                message: "resolution abandoned".to_string(),
            }),
        }
    }

    fn spawn_lookup(&self, host: String) {
        let lookup = self.lookup.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let result = lookup.lookup_ipv4(host.clone()).await;

            match &result {
                Ok(addr) => {
                    cache.insert(&host, *addr);
                    metrics::set_dns_cache_size(cache.len());
                    metrics::record_resolution("ok");
                    tracing::debug!(host = %host, address = %addr, "Host resolved");
                }
                Err(err) => {
                    metrics::record_resolution("error");
                    tracing::debug!(host = %host, error = %err, "Host resolution failed");
                }
            }

            let tx = in_flight
                .lock()
                .expect("resolver in-flight lock poisoned")
                .remove(&host);
            // Waiters subscribed while the entry was present; anyone arriving
            // after the removal sees the cache instead.
            if let Some(tx) = tx {
                let _ = tx.send(result);
            }
        });
    }
}
