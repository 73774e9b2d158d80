//! Directional header rewriting at the proxy boundary.
//!
//! # Responsibilities
//! - Copy header sets preserving order and duplicate keys
//! - client→upstream: add `Connection: keep-alive`, strip `Proxy-Connection`
//! - upstream→client: strip `Connection`, add `Proxy-Connection: keep-alive`

use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};

fn keep_alive() -> HeaderValue {
    HeaderValue::from_static("keep-alive")
}

fn proxy_connection() -> HeaderName {
    HeaderName::from_static("proxy-connection")
}

fn copy_all(src: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(src.len());
    for (name, value) in src.iter() {
        out.append(name.clone(), value.clone());
    }
    out
}

/// Rewrite request headers for the upstream exchange.
pub fn client_to_upstream(src: &HeaderMap) -> HeaderMap {
    let mut out = copy_all(src);
    out.append(CONNECTION, keep_alive());
    out.remove(proxy_connection());
    out
}

/// Rewrite response headers for the reply to the client.
pub fn upstream_to_client(src: &HeaderMap) -> HeaderMap {
    let mut out = copy_all(src);
    out.remove(CONNECTION);
    out.append(proxy_connection(), keep_alive());
    out
}
