//! Fetch entry points.
//!
//! [`fetch`] is the free-function entry over a process-wide default
//! [`Client`]. A [`Client`] owns the transport (and with it the connection
//! pool), so callers that need their own pooling, TLS or test transport
//! construct one explicitly.

mod driver;
mod headers;

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::errors::FetchResult;
use crate::request::IntoRequest;
use crate::response::Response;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Issues HTTP(S) requests described by a [`Request`](crate::Request).
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn HttpTransport>,
}

impl Client {
    /// Creates a client over a fresh default transport.
    pub fn new() -> FetchResult<Self> {
        Ok(Self {
            transport: Arc::new(ReqwestTransport::new()?),
        })
    }

    /// Creates a client over a caller-supplied transport; this is how a
    /// custom connection pool or a scripted test transport is injected.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Performs one fetch: validates the target, drives the redirect
    /// chain, and resolves with the final [`Response`] once its headers
    /// are in. The body is read lazily.
    pub async fn fetch(&self, target: impl IntoRequest) -> FetchResult<Response> {
        let request = target.into_request()?;
        driver::dispatch(self.transport.as_ref(), request).await
    }
}

/// Performs a fetch on the shared default client.
///
/// Accepts anything [`IntoRequest`]: a URL string for a plain GET, or a
/// [`Request`](crate::Request)/[`RequestBuilder`](crate::RequestBuilder)
/// carrying options.
pub async fn fetch(target: impl IntoRequest) -> FetchResult<Response> {
    default_client()?.fetch(target).await
}

fn default_client() -> FetchResult<&'static Client> {
    static DEFAULT: OnceCell<Client> = OnceCell::new();
    DEFAULT.get_or_try_init(Client::new)
}

/// Whether `status` is one of the five redirect status codes the driver
/// follows.
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}
