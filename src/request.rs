//! Fetch request description.
//!
//! A [`Request`] is an immutable description of a single HTTP exchange
//! attempt: method, absolute URL, headers, payload and the knobs that
//! govern the redirect chain and body consumption. Construction goes
//! through [`RequestBuilder`], which performs all synchronous argument
//! validation.

use std::time::Duration;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use url::Url;

use crate::body::{tee, Body, FetchBody, StreamBody};
use crate::errors::{FetchError, FetchResult};
use crate::DEFAULT_FOLLOW;

/// What to do when a hop answers with a redirect status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Follow the `Location` chain up to the `follow` limit.
    #[default]
    Follow,
    /// Return the redirect response to the caller verbatim.
    Manual,
    /// Fail the fetch with a `no-redirect` error.
    Error,
}

/// An immutable description of one HTTP exchange attempt.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
    pub(crate) body_used: bool,
    pub(crate) redirect: RedirectPolicy,
    pub(crate) follow: u32,
    pub(crate) counter: u32,
    pub(crate) compress: bool,
    pub(crate) size: u64,
    pub(crate) timeout: Duration,
}

impl Request {
    /// Creates a GET request for `url` with default options.
    pub fn new(url: impl Into<String>) -> FetchResult<Self> {
        Request::builder(url).build()
    }

    /// Starts building a request for `url`.
    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    /// Wraps an existing request, inheriting every attribute (the body is
    /// transferred, not copied) until overridden on the builder.
    pub fn wrap(request: Request) -> RequestBuilder {
        RequestBuilder::from_request(request)
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The outbound headers as constructed; the defaults the client adds
    /// per hop are not reflected here.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the outbound headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The payload as stored.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The redirect policy.
    pub fn redirect(&self) -> RedirectPolicy {
        self.redirect
    }

    /// Maximum number of redirects to follow.
    pub fn follow(&self) -> u32 {
        self.follow
    }

    /// Number of redirects already taken by the chain this request
    /// belongs to.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Whether transparent decompression is enabled.
    pub fn compress(&self) -> bool {
        self.compress
    }

    /// Response body size cap in bytes; 0 means unlimited.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Connect/headers and body-read timeout; zero means unlimited.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Duplicates this request.
    ///
    /// Fails when the body has been consumed. A one-shot stream body is
    /// tee'd: this request keeps one half, the clone gets the other, and
    /// both observe the same bytes.
    pub fn try_clone(&mut self) -> FetchResult<Request> {
        if self.body_used {
            return Err(FetchError::usage("cannot clone body after it is used"));
        }
        let body = clone_body(&mut self.body);
        Ok(Request {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
            body_used: false,
            redirect: self.redirect,
            follow: self.follow,
            counter: self.counter,
            compress: self.compress,
            size: self.size,
            timeout: self.timeout,
        })
    }
}

/// Duplicates a body in place: replayable and form bodies copy or share,
/// one-shot streams are tee'd with one half left behind for the owner.
pub(crate) fn clone_body(body: &mut Body) -> Body {
    if let Some(copy) = body.duplicate() {
        return copy;
    }
    match body {
        Body::Stream(stream_body) => match stream_body.take() {
            Some(inner) => {
                let (kept, given) = tee(inner);
                *body = Body::Stream(StreamBody::new(kept));
                Body::Stream(StreamBody::new(given))
            }
            None => Body::Stream(StreamBody::spent()),
        },
        _ => Body::None,
    }
}

impl FetchBody for Request {
    fn body_used(&self) -> bool {
        self.body_used
    }

    fn take_body(&mut self) -> FetchResult<Body> {
        if self.body_used {
            return Err(FetchError::BodyAlreadyUsed {
                url: self.url.to_string(),
            });
        }
        self.body_used = true;
        Ok(std::mem::take(&mut self.body))
    }

    fn body_url(&self) -> String {
        self.url.to_string()
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

/// Anything `fetch` accepts as its target: a URL string, a parsed URL, a
/// finished [`Request`] or a [`RequestBuilder`].
pub trait IntoRequest {
    /// Converts into a validated [`Request`].
    fn into_request(self) -> FetchResult<Request>;
}

impl IntoRequest for Request {
    fn into_request(self) -> FetchResult<Request> {
        Ok(self)
    }
}

impl IntoRequest for RequestBuilder {
    fn into_request(self) -> FetchResult<Request> {
        self.build()
    }
}

impl IntoRequest for &str {
    fn into_request(self) -> FetchResult<Request> {
        Request::new(self)
    }
}

impl IntoRequest for String {
    fn into_request(self) -> FetchResult<Request> {
        Request::new(self)
    }
}

impl IntoRequest for Url {
    fn into_request(self) -> FetchResult<Request> {
        Request::new(String::from(self))
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    url: Option<String>,
    base: Option<Request>,
    method: Option<String>,
    headers: Option<HeaderMap>,
    header_list: Vec<(String, String)>,
    body: Option<Body>,
    redirect: Option<RedirectPolicy>,
    follow: Option<u32>,
    compress: Option<bool>,
    size: Option<u64>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            base: None,
            method: None,
            headers: None,
            header_list: Vec::new(),
            body: None,
            redirect: None,
            follow: None,
            compress: None,
            size: None,
            timeout: None,
        }
    }

    fn from_request(request: Request) -> Self {
        Self {
            url: None,
            base: Some(request),
            method: None,
            headers: None,
            header_list: Vec::new(),
            body: None,
            redirect: None,
            follow: None,
            compress: None,
            size: None,
            timeout: None,
        }
    }

    /// Sets the HTTP method; case-insensitive.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Replaces the whole header map. Replacing never merges with
    /// inherited headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Appends one header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_list.push((name.into(), value.into()));
        self
    }

    /// Sets the request payload.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the redirect policy.
    pub fn redirect(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = Some(policy);
        self
    }

    /// Sets the maximum number of redirects to follow.
    pub fn follow(mut self, follow: u32) -> Self {
        self.follow = Some(follow);
        self
    }

    /// Enables or disables transparent decompression.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Caps the response body size in bytes; 0 means unlimited.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the connect/headers and body-read timeout; zero means
    /// unlimited.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the accumulated options and produces the request.
    pub fn build(self) -> FetchResult<Request> {
        let mut base = self.base;

        let url = match self.url {
            Some(text) => parse_url(&text)?,
            None => match &base {
                Some(inherited) => inherited.url.clone(),
                None => return Err(FetchError::usage("Only absolute URLs are supported")),
            },
        };

        let method = match self.method {
            Some(text) => Method::from_bytes(text.to_ascii_uppercase().as_bytes())
                .map_err(|_| FetchError::usage(format!("Invalid HTTP method: {}", text)))?,
            None => base
                .as_ref()
                .map(|inherited| inherited.method.clone())
                .unwrap_or(Method::GET),
        };

        let mut headers = self
            .headers
            .or_else(|| base.as_ref().map(|inherited| inherited.headers.clone()))
            .unwrap_or_default();
        for (name, value) in self.header_list {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::usage(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| FetchError::usage(format!("Invalid value for header: {}", name)))?;
            headers.append(name, value);
        }

        // The inherited body is transferred, never copied.
        let body = self
            .body
            .or_else(|| {
                base.as_mut()
                    .map(|inherited| std::mem::take(&mut inherited.body))
            })
            .unwrap_or(Body::None);
        if !body.is_none() && (method == Method::GET || method == Method::HEAD) {
            return Err(FetchError::usage(
                "Request with GET/HEAD method cannot have body",
            ));
        }

        Ok(Request {
            method,
            url,
            headers,
            body,
            body_used: base.as_ref().map(|b| b.body_used).unwrap_or(false),
            redirect: self
                .redirect
                .or_else(|| base.as_ref().map(|b| b.redirect))
                .unwrap_or_default(),
            follow: self
                .follow
                .or_else(|| base.as_ref().map(|b| b.follow))
                .unwrap_or(DEFAULT_FOLLOW),
            counter: base.as_ref().map(|b| b.counter).unwrap_or(0),
            compress: self
                .compress
                .or_else(|| base.as_ref().map(|b| b.compress))
                .unwrap_or(true),
            size: self
                .size
                .or_else(|| base.as_ref().map(|b| b.size))
                .unwrap_or(0),
            timeout: self
                .timeout
                .or_else(|| base.as_ref().map(|b| b.timeout))
                .unwrap_or(Duration::ZERO),
        })
    }
}

fn parse_url(text: &str) -> FetchResult<Url> {
    let url = Url::parse(text)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FetchError::usage("Only HTTP(S) protocols are supported"));
    }
    if url.host_str().is_none() {
        return Err(FetchError::usage("Only absolute URLs are supported"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_defaults() {
        let request = Request::new("http://example.com/path").unwrap();
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().as_str(), "http://example.com/path");
        assert_eq!(request.redirect(), RedirectPolicy::Follow);
        assert_eq!(request.follow(), 20);
        assert!(request.compress());
        assert_eq!(request.size(), 0);
        assert_eq!(request.timeout(), Duration::ZERO);
        assert_eq!(request.counter(), 0);
        assert!(!request.body_used());
    }

    #[test]
    fn test_method_is_uppercased() {
        let request = Request::builder("http://example.com/")
            .method("post")
            .body("a=1")
            .build()
            .unwrap();
        assert_eq!(request.method(), &Method::POST);
    }

    #[test]
    fn test_get_and_head_forbid_body() {
        for method in ["GET", "HEAD"] {
            let err = Request::builder("http://example.com/")
                .method(method)
                .body("nope")
                .build()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn test_url_validation() {
        let err = Request::new("/relative/only").unwrap_err();
        assert_eq!(err.to_string(), "Only absolute URLs are supported");

        let err = Request::new("ftp://example.com/file").unwrap_err();
        assert_eq!(err.to_string(), "Only HTTP(S) protocols are supported");
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let err = Request::builder("http://example.com/")
            .header("bad header\r\n", "v")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_wrap_inherits_and_overrides() {
        let inner = Request::builder("http://example.com/inner")
            .method("POST")
            .header("x-token", "abc")
            .body("payload")
            .follow(5)
            .compress(false)
            .build()
            .unwrap();

        let wrapped = Request::wrap(inner).build().unwrap();
        assert_eq!(wrapped.method(), &Method::POST);
        assert_eq!(wrapped.url().as_str(), "http://example.com/inner");
        assert_eq!(wrapped.headers().get("x-token").unwrap(), "abc");
        assert_eq!(wrapped.follow(), 5);
        assert!(!wrapped.compress());

        let overridden = Request::wrap(wrapped)
            .method("PUT")
            .headers(HeaderMap::new())
            .build()
            .unwrap();
        assert_eq!(overridden.method(), &Method::PUT);
        // Replacing headers does not merge.
        assert!(overridden.headers().get("x-token").is_none());
    }

    #[tokio::test]
    async fn test_wrap_propagates_body_used() {
        let mut inner = Request::builder("http://example.com/")
            .method("POST")
            .body("data")
            .build()
            .unwrap();
        let _ = inner.text().await.unwrap();
        assert!(inner.body_used());

        let wrapped = Request::wrap(inner).build().unwrap();
        assert!(wrapped.body_used());
    }

    #[tokio::test]
    async fn test_request_body_consumption() {
        let mut request = Request::builder("http://example.com/")
            .method("POST")
            .body("a=1")
            .build()
            .unwrap();
        assert_eq!(request.text().await.unwrap(), "a=1");

        let err = request.text().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_try_clone_replayable() {
        let mut request = Request::builder("http://example.com/")
            .method("POST")
            .body("shared")
            .build()
            .unwrap();
        let mut clone = request.try_clone().unwrap();

        assert_eq!(request.text().await.unwrap(), "shared");
        assert_eq!(clone.text().await.unwrap(), "shared");
    }

    #[tokio::test]
    async fn test_try_clone_after_consume_fails() {
        let mut request = Request::builder("http://example.com/")
            .method("POST")
            .body("gone")
            .build()
            .unwrap();
        let _ = request.buffer().await.unwrap();
        assert!(request.try_clone().is_err());
    }
}
