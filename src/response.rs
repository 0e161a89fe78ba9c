//! Fetch response.
//!
//! A [`Response`] pairs the status line and headers of the final hop with
//! a lazy body stream (already routed through the decoder) and the shared
//! body-consumption machinery of [`FetchBody`].

use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};

use crate::body::{Body, FetchBody};
use crate::errors::{FetchError, FetchResult};
use crate::request::clone_body;

/// The result of a fetch, or a synthetic response built by the caller.
#[derive(Debug)]
pub struct Response {
    url: String,
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    body: Body,
    body_used: bool,
    redirected: bool,
    size: u64,
    timeout: Duration,
}

/// Options accepted when constructing a synthetic [`Response`].
#[derive(Debug, Clone)]
pub struct ResponseInit {
    /// The response URL; empty by default.
    pub url: String,
    /// Status code; 200 by default.
    pub status: u16,
    /// Status text; never synthesized from the code, the caller supplies
    /// it. `"OK"` by default.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self {
            url: String::new(),
            status: 200,
            status_text: "OK".to_string(),
            headers: HeaderMap::new(),
        }
    }
}

impl Response {
    /// Builds a response from a body and options.
    pub fn new(body: Body, init: ResponseInit) -> FetchResult<Self> {
        let status = StatusCode::from_u16(init.status)
            .map_err(|_| FetchError::usage(format!("Invalid status code: {}", init.status)))?;
        Ok(Self {
            url: init.url,
            status,
            status_text: init.status_text,
            headers: init.headers,
            body,
            body_used: false,
            redirected: false,
            size: 0,
            timeout: Duration::ZERO,
        })
    }

    /// Internal constructor used by the redirect driver for real network
    /// responses.
    pub(crate) fn from_exchange(
        url: String,
        status: StatusCode,
        headers: HeaderMap,
        body: Body,
        redirected: bool,
        size: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            url,
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            body_used: false,
            redirected,
            size,
            timeout,
        }
    }

    /// The final URL, after any redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase that accompanied the status.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Whether the status is in the 200-299 range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the chain that produced this response took at least one
    /// redirect.
    pub fn redirected(&self) -> bool {
        self.redirected
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The body as stored; consumption normally goes through the
    /// [`FetchBody`] methods instead.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable access to the stored body, for custom streaming
    /// consumption. Bypassing [`FetchBody`] leaves `body_used` untouched.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Duplicates this response.
    ///
    /// Fails when the body has been consumed. A stream body is tee'd into
    /// two independent streams yielding the same bytes; this response keeps
    /// one half and the clone receives the other.
    pub fn try_clone(&mut self) -> FetchResult<Response> {
        if self.body_used {
            return Err(FetchError::usage("cannot clone body after it is used"));
        }
        let body = clone_body(&mut self.body);
        Ok(Response {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body,
            body_used: false,
            redirected: self.redirected,
            size: self.size,
            timeout: self.timeout,
        })
    }
}

impl FetchBody for Response {
    fn body_used(&self) -> bool {
        self.body_used
    }

    fn take_body(&mut self) -> FetchResult<Body> {
        if self.body_used {
            return Err(FetchError::BodyAlreadyUsed {
                url: self.url.clone(),
            });
        }
        self.body_used = true;
        Ok(std::mem::take(&mut self.body))
    }

    fn body_url(&self) -> String {
        self.url.clone()
    }

    fn body_size_limit(&self) -> u64 {
        self.size
    }

    fn body_timeout(&self) -> Duration {
        self.timeout
    }

    fn body_content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }
}
