//! Production transport backed by `reqwest`.
//!
//! The client is built with redirects disabled and without any transparent
//! decompression, so the stack only contributes connection handling, TLS
//! and wire framing. Redirect following and content decoding stay in the
//! fetch core.

use std::error::Error as _;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::{HttpTransport, TransportBody, TransportRequest, TransportResponse};
use crate::body::ByteStream;
use crate::errors::{io_error_code, FetchError, FetchResult};

/// [`HttpTransport`] implementation over a `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport over a fresh connection pool.
    pub fn new() -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| FetchError::system(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`, reusing its connection pool and
    /// connector configuration.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn exchange(&self, request: TransportRequest) -> FetchResult<TransportResponse> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let url_text = url.to_string();

        debug!(method = %method, url = %url_text, "dispatching exchange");

        let mut builder = self.client.request(method, url).headers(headers);
        match body {
            Some(TransportBody::Full(bytes)) => {
                builder = builder.body(bytes);
            }
            Some(TransportBody::Stream(stream)) => {
                builder = builder.body(reqwest::Body::wrap_stream(stream));
            }
            None => {}
        }

        let response = builder
            .send()
            .await
            .map_err(|err| map_transport_error(&err, &url_text))?;

        let status = response.status();
        let headers = response.headers().clone();

        let stream_url = url_text;
        let body: ByteStream = Box::pin(response.bytes_stream().map(move |item| {
            item.map_err(|err| map_transport_error(&err, &stream_url))
        }));

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Maps a transport failure to a `system` error carrying the platform
/// error name when one can be recovered from the cause chain.
fn map_transport_error(err: &reqwest::Error, url: &str) -> FetchError {
    FetchError::System {
        message: format!("request to {} failed, reason: {}", url, err),
        code: find_error_code(err),
    }
}

fn find_error_code(err: &reqwest::Error) -> Option<String> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            if let Some(code) = io_error_code(io_err) {
                return Some(code);
            }
        }
        // DNS failures surface as hyper errors without an errno; recover
        // the conventional name from the message.
        let text = cause.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some("ENOTFOUND".to_string());
        }
        source = cause.source();
    }
    None
}
