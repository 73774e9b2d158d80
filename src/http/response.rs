//! Response construction helpers.

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::{Response, StatusCode};

/// Body type every dispatch branch converges on: forwarded upstream bodies
/// and locally synthesized ones, boxed behind one signature.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// An empty body.
pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// A complete in-memory body.
pub fn full<T: Into<Bytes>>(chunk: T) -> ProxyBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// A bare status-code reply with no body.
pub fn status(code: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = code;
    response
}
