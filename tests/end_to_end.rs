//! End-to-end tests for the forward proxy.
//!
//! Fully hermetic: origins live on 127.0.0.1 and hostname resolution goes
//! through a deterministic `HostLookup` double, so no test touches real DNS
//! or the network.

use futures_util::future::BoxFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use forward_proxy::config::ProxyConfig;
use forward_proxy::dns::{DnsCache, HostLookup, ResolveError, Resolver};
use forward_proxy::http::{HttpServer, ProxyState};
use forward_proxy::lifecycle::Shutdown;
use forward_proxy::net::Listener;
use forward_proxy::proxy::SessionRegistry;

mod common;

/// Lookup double that resolves every name to one fixed address.
struct StaticLookup {
    addr: Ipv4Addr,
    calls: AtomicUsize,
}

impl StaticLookup {
    fn new(addr: Ipv4Addr) -> Arc<Self> {
        Arc::new(Self {
            addr,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HostLookup for StaticLookup {
    fn lookup_ipv4(&self, _host: String) -> BoxFuture<'static, Result<Ipv4Addr, ResolveError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let addr = self.addr;
        Box::pin(async move { Ok(addr) })
    }
}

/// Lookup double where every resolution fails.
struct FailingLookup;

impl HostLookup for FailingLookup {
    fn lookup_ipv4(&self, host: String) -> BoxFuture<'static, Result<Ipv4Addr, ResolveError>> {
        Box::pin(async move { Err(ResolveError::NoAddress { host }) })
    }
}

/// Spin up a proxy on an ephemeral port with the given lookup double.
async fn start_proxy(lookup: Arc<dyn HostLookup>) -> (SocketAddr, ProxyState) {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let cache = Arc::new(DnsCache::new(Duration::from_secs(600)));
    let resolver = Arc::new(Resolver::with_lookup(cache.clone(), lookup));
    let state = ProxyState {
        config: Arc::new(config),
        cache,
        resolver,
        registry: Arc::new(SessionRegistry::new()),
        shutdown: Arc::new(Shutdown::new()),
    };

    let server = HttpServer::with_state(state.clone());
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, state)
}

async fn read_until_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out)).await;
    out
}

/// Read one complete response: the header block plus a body framed by its
/// `Content-Length`. Leaves the connection open.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = out.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out reading response head")
            .unwrap();
        assert_ne!(n, 0, "connection closed before response head");
        out.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&out[..header_end]).to_lowercase();
    let content_length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or(0);

    while out.len() < header_end + content_length {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out reading response body")
            .unwrap();
        assert_ne!(n, 0, "connection closed mid-body");
        out.extend_from_slice(&buf[..n]);
    }

    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_forward_get_through_resolution_and_header_swap() {
    let (origin_addr, mut captured) = common::start_origin(
        "HTTP/1.1 200 OK\r\nContent-Length: 17\r\nConnection: close\r\n\r\nhello from origin",
    )
    .await;
    let lookup = StaticLookup::new(Ipv4Addr::LOCALHOST);
    let (proxy_addr, state) = start_proxy(lookup.clone()).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    let request = format!(
        "GET http://origin.test:{port}/ HTTP/1.1\r\n\
         Host: origin.test:{port}\r\n\
         Proxy-Connection: keep-alive\r\n\
         \r\n",
        port = origin_addr.port()
    );
    client.write_all(request.as_bytes()).await.unwrap();

    let reply = read_response(&mut client).await;
    let reply_lower = reply.to_lowercase();

    // Status and body pass through unchanged.
    assert!(reply.starts_with("HTTP/1.1 200"), "got: {reply}");
    assert!(reply.ends_with("hello from origin"), "got: {reply}");

    // upstream→client: Connection removed, Proxy-Connection added.
    assert!(!reply_lower.contains("\r\nconnection:"), "got: {reply}");
    assert!(
        reply_lower.contains("proxy-connection: keep-alive"),
        "got: {reply}"
    );

    // client→upstream: Proxy-Connection removed, Connection added, and the
    // request line carried the URI verbatim.
    let upstream_head = tokio::time::timeout(Duration::from_secs(5), captured.recv())
        .await
        .unwrap()
        .unwrap();
    let upstream_lower = upstream_head.to_lowercase();
    assert!(
        upstream_lower.starts_with(&format!(
            "get http://origin.test:{}/ http/1.1",
            origin_addr.port()
        )),
        "got: {upstream_head}"
    );
    assert!(!upstream_lower.contains("proxy-connection:"), "got: {upstream_head}");
    assert!(
        upstream_lower.contains("connection: keep-alive"),
        "got: {upstream_head}"
    );

    // The name was resolved through the adapter and cached.
    assert_eq!(lookup.calls(), 1);
    assert_eq!(state.cache.lookup("origin.test"), Some(Ipv4Addr::LOCALHOST));
}

#[tokio::test]
async fn test_forward_second_request_hits_cache() {
    let (origin_addr, _captured) = common::start_origin(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    )
    .await;
    let lookup = StaticLookup::new(Ipv4Addr::LOCALHOST);
    let (proxy_addr, _state) = start_proxy(lookup.clone()).await;

    for _ in 0..2 {
        let mut client = TcpStream::connect(proxy_addr).await.unwrap();
        let request = format!(
            "GET http://origin.test:{port}/ HTTP/1.1\r\nHost: origin.test:{port}\r\n\r\n",
            port = origin_addr.port()
        );
        client.write_all(request.as_bytes()).await.unwrap();
        let reply = read_response(&mut client).await;
        assert!(reply.starts_with("HTTP/1.1 200"), "got: {reply}");
    }

    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_connect_tunnel_carries_opaque_bytes() {
    let echo_addr = common::start_echo().await;
    let (proxy_addr, _state) = start_proxy(StaticLookup::new(Ipv4Addr::LOCALHOST)).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    let request = format!(
        "CONNECT 127.0.0.1:{port} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n\r\n",
        port = echo_addr.port()
    );
    client.write_all(request.as_bytes()).await.unwrap();

    // Read the established reply: headers only, empty body.
    let mut head = Vec::new();
    let mut buf = [0u8; 256];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(n, 0, "connection closed before 200");
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8(head).unwrap();
    assert!(head.starts_with("HTTP/1.1 200"), "got: {head}");

    // Opaque bytes flow both directions through the echo upstream.
    client.write_all(b"tunnel ping").await.unwrap();
    let mut reply = [0u8; 11];
    tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&reply, b"tunnel ping");
}

#[tokio::test]
async fn test_connect_tunnel_resolves_names() {
    let echo_addr = common::start_echo().await;
    let lookup = StaticLookup::new(Ipv4Addr::LOCALHOST);
    let (proxy_addr, _state) = start_proxy(lookup.clone()).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    let request = format!(
        "CONNECT secure.test:{port} HTTP/1.1\r\nHost: secure.test:{port}\r\n\r\n",
        port = echo_addr.port()
    );
    client.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut buf = [0u8; 256];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(n, 0, "connection closed before 200");
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8(head).unwrap();
    assert!(head.starts_with("HTTP/1.1 200"), "got: {head}");
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_connect_resolution_failure_closes_without_reply() {
    let (proxy_addr, _state) = start_proxy(Arc::new(FailingLookup)).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    client
        .write_all(b"CONNECT badhost.test:443 HTTP/1.1\r\nHost: badhost.test:443\r\n\r\n")
        .await
        .unwrap();

    let reply = read_until_close(&mut client).await;
    assert!(reply.is_empty(), "expected silent close, got: {reply:?}");
}

#[tokio::test]
async fn test_connect_refused_upstream_closes_without_reply() {
    // Bind-then-drop to get a port with nothing listening on it.
    let refused_port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let (proxy_addr, _state) = start_proxy(StaticLookup::new(Ipv4Addr::LOCALHOST)).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    let request = format!(
        "CONNECT 127.0.0.1:{refused_port} HTTP/1.1\r\nHost: 127.0.0.1:{refused_port}\r\n\r\n"
    );
    client.write_all(request.as_bytes()).await.unwrap();

    let reply = read_until_close(&mut client).await;
    assert!(reply.is_empty(), "expected silent close, got: {reply:?}");
}

#[tokio::test]
async fn test_shutdown_endpoint_stops_accepting() {
    let (proxy_addr, state) = start_proxy(StaticLookup::new(Ipv4Addr::LOCALHOST)).await;

    let mut client = TcpStream::connect(proxy_addr).await.unwrap();
    client
        .write_all(b"GET /proxy/shutdown HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();

    let reply = String::from_utf8(read_until_close(&mut client).await).unwrap();
    assert!(reply.starts_with("HTTP/1.1 200"), "got: {reply}");
    assert!(state.shutdown.triggered());

    // The accept loop exits and the listener is dropped; new connections
    // are refused from then on.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(TcpStream::connect(proxy_addr).await.is_err());
}
