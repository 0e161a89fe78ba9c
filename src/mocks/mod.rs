//! Scripted transport for tests.
//!
//! [`MockHttpTransport`] plays back a queue of canned exchanges and records
//! every outbound request, including the fully serialized body, so tests
//! can assert on what actually reached the wire. Redirect chains are
//! scripted by queueing one response per hop.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;

use crate::body::ByteStream;
use crate::errors::{FetchError, FetchResult};
use crate::transport::{HttpTransport, TransportBody, TransportRequest, TransportResponse};

/// One canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: HeaderMap,
    chunks: Vec<FetchResult<Bytes>>,
    head_delay: Duration,
    chunk_delay: Duration,
}

impl MockResponse {
    /// A response with the given status and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            chunks: Vec::new(),
            head_delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
        }
    }

    /// A 200 response with no body.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// A 200 response with a text body.
    pub fn text(body: &str) -> Self {
        Self::ok().body(Bytes::from(body.to_string()))
    }

    /// A 200 response with a JSON body and matching content type.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        let body = serde_json::to_vec(data).expect("mock JSON fixture");
        Self::ok()
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(Bytes::from(body))
    }

    /// A redirect response pointing at `location`.
    pub fn redirect(status: u16, location: &str) -> Self {
        Self::new(status).header(LOCATION.as_str(), location)
    }

    /// Adds a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name: HeaderName = name.parse().expect("mock header name");
        let value: HeaderValue = value.parse().expect("mock header value");
        self.headers.append(name, value);
        self
    }

    /// Sets the whole body as one chunk.
    pub fn body(mut self, bytes: impl Into<Bytes>) -> Self {
        self.chunks = vec![Ok(bytes.into())];
        self
    }

    /// Appends one body chunk.
    pub fn chunk(mut self, bytes: impl Into<Bytes>) -> Self {
        self.chunks.push(Ok(bytes.into()));
        self
    }

    /// Appends a mid-stream transport error.
    pub fn error_chunk(mut self, error: FetchError) -> Self {
        self.chunks.push(Err(error));
        self
    }

    /// Delays the status/headers by `delay`, to exercise the per-hop
    /// request timeout.
    pub fn head_delay(mut self, delay: Duration) -> Self {
        self.head_delay = delay;
        self
    }

    /// Delays every body chunk by `delay`, to exercise the body timeout.
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
}

/// One outbound request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// The guarded outbound headers.
    pub headers: HeaderMap,
    /// The fully serialized body, `None` when there was no payload.
    pub body: Option<Vec<u8>>,
}

enum MockExchange {
    Respond(Box<MockResponse>),
    Fail(FetchError),
}

/// [`HttpTransport`] playing back canned exchanges in FIFO order.
pub struct MockHttpTransport {
    exchanges: Mutex<VecDeque<MockExchange>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpTransport {
    /// Creates an empty transport; exchanges answer 500 until scripted.
    pub fn new() -> Self {
        Self {
            exchanges: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response.
    pub fn add_response(&self, response: MockResponse) {
        self.exchanges
            .lock()
            .push_back(MockExchange::Respond(Box::new(response)));
    }

    /// Queues a transport-level failure.
    pub fn add_error(&self, error: FetchError) {
        self.exchanges.lock().push_back(MockExchange::Fail(error));
    }

    /// All requests recorded so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Drops all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

impl Default for MockHttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn exchange(&self, request: TransportRequest) -> FetchResult<TransportResponse> {
        let body = drain_body(request.body).await;
        self.requests.lock().push(RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            headers: request.headers,
            body,
        });

        let next = self.exchanges.lock().pop_front();
        let response = match next {
            Some(MockExchange::Respond(response)) => *response,
            Some(MockExchange::Fail(error)) => return Err(error),
            None => MockResponse::new(500).body(Bytes::from_static(b"no mock response queued")),
        };

        if !response.head_delay.is_zero() {
            tokio::time::sleep(response.head_delay).await;
        }

        let status = StatusCode::from_u16(response.status)
            .map_err(|_| FetchError::usage(format!("invalid mock status: {}", response.status)))?;

        Ok(TransportResponse {
            status,
            headers: response.headers,
            body: chunk_stream(response.chunks, response.chunk_delay),
        })
    }
}

async fn drain_body(body: Option<TransportBody>) -> Option<Vec<u8>> {
    match body {
        None => None,
        Some(TransportBody::Full(bytes)) => Some(bytes.to_vec()),
        Some(TransportBody::Stream(mut stream)) => {
            let mut drained = Vec::new();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => drained.extend_from_slice(&bytes),
                    Err(_) => break,
                }
            }
            Some(drained)
        }
    }
}

fn chunk_stream(chunks: Vec<FetchResult<Bytes>>, delay: Duration) -> ByteStream {
    let queue: VecDeque<FetchResult<Bytes>> = chunks.into();
    Box::pin(futures::stream::unfold(queue, move |mut queue| async move {
        let item = queue.pop_front()?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some((item, queue))
    }))
}
