//! The seam between the fetch core and the platform HTTP stack.
//!
//! Everything below a single request/response exchange — wire parsing, TLS,
//! DNS, connection pooling — lives behind [`HttpTransport`]. The production
//! implementation is [`ReqwestTransport`]; tests script exchanges through
//! [`MockHttpTransport`](crate::mocks::MockHttpTransport). The transport
//! never follows redirects and never decompresses: those semantics belong
//! to the core.

mod http;

pub use http::ReqwestTransport;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
// Leading `::` keeps the crate path distinct from the sibling `http` module.
use ::http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::body::ByteStream;
use crate::errors::FetchResult;

/// One outbound exchange handed to the platform stack.
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Fully guarded outbound headers.
    pub headers: HeaderMap,
    /// Serialized payload, when there is one.
    pub body: Option<TransportBody>,
}

/// The serialized form of an outbound payload.
pub enum TransportBody {
    /// A fully buffered payload; the guard has already pinned
    /// `Content-Length`.
    Full(Bytes),
    /// A streamed payload of unknown length, sent with chunked transfer
    /// encoding.
    Stream(ByteStream),
}

/// The raw result of one exchange: status line, headers, and the undecoded
/// body stream.
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers, untouched.
    pub headers: HeaderMap,
    /// The raw body byte stream.
    pub body: ByteStream,
}

/// A platform HTTP stack capable of performing single exchanges.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs one request/response exchange without following redirects
    /// or decoding the body.
    async fn exchange(&self, request: TransportRequest) -> FetchResult<TransportResponse>;
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| ".."))
            .finish()
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}
