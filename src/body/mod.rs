//! Polymorphic HTTP bodies and their one-shot consumption.
//!
//! A [`Body`] is one of six shapes. The first four are replayable (their
//! bytes can be serialized to the wire any number of times); an opaque byte
//! stream is one-shot; a multipart form serializes on demand. Consumption
//! into typed representations goes through the [`FetchBody`] trait shared by
//! [`Request`](crate::Request) and [`Response`](crate::Response), which owns
//! the `body_used` bookkeeping, the size cap and the body timeout.

mod blob;
mod form;

pub use blob::Blob;
pub use form::{FormData, MultipartForm};

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::errors::{FetchError, FetchResult};

/// A lazy stream of body bytes; transport errors surface as items.
pub type ByteStream = Pin<Box<dyn Stream<Item = FetchResult<Bytes>> + Send>>;

/// The payload of a request or response.
pub enum Body {
    /// No payload.
    None,
    /// A UTF-8 string, sent as `text/plain;charset=UTF-8` unless overridden.
    Text(String),
    /// An immutable byte buffer.
    Bytes(Bytes),
    /// A [`Blob`], carrying its own content type.
    Blob(Blob),
    /// An opaque byte stream; can reach the wire only once.
    Stream(StreamBody),
    /// A multipart form, serialized on demand.
    Form(Arc<dyn FormData>),
}

/// A one-shot stream payload. Taking the stream leaves a spent marker that
/// serializes as an empty body thereafter.
pub struct StreamBody {
    inner: Option<ByteStream>,
}

impl StreamBody {
    /// Wraps a stream for use as a body.
    pub fn new(stream: ByteStream) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    /// A stream body that has already been taken.
    pub(crate) fn spent() -> Self {
        Self { inner: None }
    }

    /// Takes the underlying stream; `None` once spent.
    pub(crate) fn take(&mut self) -> Option<ByteStream> {
        self.inner.take()
    }

    /// Whether the stream has already been taken.
    pub fn is_spent(&self) -> bool {
        self.inner.is_none()
    }
}

impl Body {
    /// Wraps an arbitrary byte stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = FetchResult<Bytes>> + Send + 'static,
    {
        Body::Stream(StreamBody::new(Box::pin(stream)))
    }

    /// Wraps a multipart form implementation.
    pub fn form<F: FormData + 'static>(form: F) -> Self {
        Body::Form(Arc::new(form))
    }

    /// True for the empty body.
    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }

    /// The content type implied by the body shape, used only when the
    /// caller did not set a `Content-Type` header.
    pub fn content_type(&self) -> Option<String> {
        match self {
            Body::Text(_) => Some("text/plain;charset=UTF-8".to_string()),
            Body::Blob(blob) => {
                if blob.content_type().is_empty() {
                    None
                } else {
                    Some(blob.content_type().to_string())
                }
            }
            Body::Form(form) => Some(format!("multipart/form-data;boundary={}", form.boundary())),
            Body::None | Body::Bytes(_) | Body::Stream(_) => None,
        }
    }

    /// The total payload length when it is inferable up front.
    pub fn total_bytes(&self) -> Option<u64> {
        match self {
            Body::None => Some(0),
            Body::Text(text) => Some(text.len() as u64),
            Body::Bytes(bytes) => Some(bytes.len() as u64),
            Body::Blob(blob) => Some(blob.size()),
            Body::Stream(_) => None,
            Body::Form(form) => form.known_length(),
        }
    }

    /// Duplicates a replayable or shared body. `None` for a one-shot
    /// stream, which the caller must tee instead.
    pub(crate) fn duplicate(&self) -> Option<Body> {
        match self {
            Body::None => Some(Body::None),
            Body::Text(text) => Some(Body::Text(text.clone())),
            Body::Bytes(bytes) => Some(Body::Bytes(bytes.clone())),
            Body::Blob(blob) => Some(Body::Blob(blob.clone())),
            Body::Form(form) => Some(Body::Form(Arc::clone(form))),
            Body::Stream(_) => None,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::None
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::None => f.write_str("None"),
            Body::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Blob(blob) => f.debug_tuple("Blob").field(blob).finish(),
            Body::Stream(stream) => f
                .debug_struct("Stream")
                .field("spent", &stream.is_spent())
                .finish(),
            Body::Form(form) => f
                .debug_struct("Form")
                .field("boundary", &form.boundary())
                .finish(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Blob> for Body {
    fn from(blob: Blob) -> Self {
        Body::Blob(blob)
    }
}

/// One-shot body consumption, shared by [`Request`](crate::Request) and
/// [`Response`](crate::Response).
///
/// The five consumption methods each materialize the full body exactly
/// once; any further call fails with an `already-used` error. Stream bodies
/// are accumulated under the holder's size cap and body timeout.
#[async_trait]
pub trait FetchBody: Send {
    /// Whether the body has been consumed.
    fn body_used(&self) -> bool;

    #[doc(hidden)]
    fn take_body(&mut self) -> FetchResult<Body>;

    #[doc(hidden)]
    fn body_url(&self) -> String;

    #[doc(hidden)]
    fn body_size_limit(&self) -> u64;

    #[doc(hidden)]
    fn body_timeout(&self) -> Duration;

    #[doc(hidden)]
    fn body_content_type(&self) -> Option<String>;

    /// Resolves to the full body bytes.
    async fn buffer(&mut self) -> FetchResult<Bytes> {
        let body = self.take_body()?;
        let url = self.body_url();
        consume(body, &url, self.body_size_limit(), self.body_timeout()).await
    }

    /// Resolves to an immutable byte view over the full body.
    async fn array_buffer(&mut self) -> FetchResult<Bytes> {
        self.buffer().await
    }

    /// Resolves to the body decoded as UTF-8. No other charset is honored,
    /// even when one is advertised; invalid sequences are replaced.
    async fn text(&mut self) -> FetchResult<String> {
        let bytes = self.buffer().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Resolves to the body parsed as JSON.
    async fn json<T: DeserializeOwned>(&mut self) -> FetchResult<T> {
        let url = self.body_url();
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(|err| FetchError::InvalidJson {
            url,
            message: err.to_string(),
        })
    }

    /// Resolves to a [`Blob`] tagged with the lower-cased `Content-Type`
    /// header when one is present.
    async fn blob(&mut self) -> FetchResult<Blob> {
        let content_type = self
            .body_content_type()
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();
        let bytes = self.buffer().await?;
        Ok(Blob::new(bytes, content_type))
    }
}

/// Materializes a body into bytes, enforcing the size cap and body timeout
/// on stream shapes. The timeout scope ends on every exit path, so only the
/// first terminal event (error, timeout, cap, clean end) takes effect.
pub(crate) async fn consume(
    body: Body,
    url: &str,
    size: u64,
    timeout: Duration,
) -> FetchResult<Bytes> {
    match body {
        Body::None => Ok(Bytes::new()),
        Body::Text(text) => Ok(Bytes::from(text)),
        Body::Bytes(bytes) => Ok(bytes),
        Body::Blob(blob) => Ok(blob.bytes()),
        Body::Stream(mut stream) => match stream.take() {
            Some(inner) => accumulate(inner, url, size, timeout).await,
            // A spent stream has nothing left to yield.
            None => Ok(Bytes::new()),
        },
        Body::Form(form) => accumulate(form.stream(), url, size, timeout).await,
    }
}

async fn accumulate(
    mut stream: ByteStream,
    url: &str,
    size: u64,
    timeout: Duration,
) -> FetchResult<Bytes> {
    let read = async {
        let mut accumulated: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            // Reject before appending so a single oversized chunk fails too.
            if size > 0 && (accumulated.len() + chunk.len()) as u64 > size {
                return Err(FetchError::MaxSize {
                    url: url.to_string(),
                    limit: size,
                });
            }
            accumulated.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(accumulated))
    };

    if timeout.is_zero() {
        read.await
    } else {
        match tokio::time::timeout(timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::BodyTimeout {
                url: url.to_string(),
                timeout: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Splits a stream into two independent streams yielding the same items.
///
/// A relay task drains the source and fans every item out to both halves;
/// neither half can starve the other, and a half whose receiver is dropped
/// simply stops receiving.
pub(crate) fn tee(stream: ByteStream) -> (ByteStream, ByteStream) {
    let (tx_a, rx_a) = mpsc::unbounded_channel::<FetchResult<Bytes>>();
    let (tx_b, rx_b) = mpsc::unbounded_channel::<FetchResult<Bytes>>();

    tokio::spawn(async move {
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            let _ = tx_a.send(item.clone());
            let _ = tx_b.send(item);
        }
    });

    (channel_stream(rx_a), channel_stream(rx_b))
}

fn channel_stream(receiver: mpsc::UnboundedReceiver<FetchResult<Bytes>>) -> ByteStream {
    Box::pin(futures::stream::unfold(receiver, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunked(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        ))
    }

    #[test]
    fn test_content_type_inference() {
        assert_eq!(
            Body::from("hi").content_type().as_deref(),
            Some("text/plain;charset=UTF-8")
        );
        assert_eq!(Body::from(Bytes::from_static(b"hi")).content_type(), None);
        assert_eq!(Body::None.content_type(), None);

        let blob = Blob::new("x", "Application/JSON");
        assert_eq!(
            Body::from(blob).content_type().as_deref(),
            Some("Application/JSON")
        );
        assert_eq!(Body::from(Blob::new("x", "")).content_type(), None);

        let form = MultipartForm::new().text("a", "1");
        let boundary = FormData::boundary(&form);
        assert_eq!(
            Body::form(form).content_type().unwrap(),
            format!("multipart/form-data;boundary={}", boundary)
        );
    }

    #[test]
    fn test_total_bytes_inference() {
        assert_eq!(Body::None.total_bytes(), Some(0));
        assert_eq!(Body::from("abc").total_bytes(), Some(3));
        assert_eq!(Body::from(vec![1u8, 2, 3, 4]).total_bytes(), Some(4));
        assert_eq!(Body::from(Blob::new("12345", "")).total_bytes(), Some(5));
        assert_eq!(Body::stream(stream::empty()).total_bytes(), None);
    }

    #[tokio::test]
    async fn test_consume_replayable_shapes() {
        let url = "http://example.com/";
        let zero = Duration::ZERO;

        let bytes = consume(Body::None, url, 0, zero).await.unwrap();
        assert!(bytes.is_empty());

        let bytes = consume(Body::from("héllo"), url, 0, zero).await.unwrap();
        assert_eq!(bytes, Bytes::from("héllo".as_bytes().to_vec()));

        let buf = Bytes::from_static(b"raw");
        let bytes = consume(Body::from(buf.clone()), url, 0, zero).await.unwrap();
        assert_eq!(bytes, buf);
    }

    #[tokio::test]
    async fn test_consume_stream_concatenates() {
        let body = Body::Stream(StreamBody::new(chunked(vec![b"hello ", b"world"])));
        let bytes = consume(body, "http://example.com/", 0, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_consume_spent_stream_is_empty() {
        let mut stream_body = StreamBody::new(chunked(vec![b"data"]));
        let _ = stream_body.take();
        let bytes = consume(
            Body::Stream(stream_body),
            "http://example.com/",
            0,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_size_cap_rejects_before_append() {
        // 6 bytes arriving in two chunks against a cap of 5: the second
        // chunk must be rejected without being buffered.
        let body = Body::Stream(StreamBody::new(chunked(vec![b"abc", b"def"])));
        let err = consume(body, "http://example.com/big", 5, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::MaxSize {
                url: "http://example.com/big".to_string(),
                limit: 5,
            }
        );

        // A single oversized chunk is rejected the same way.
        let body = Body::Stream(StreamBody::new(chunked(vec![b"abcdef"])));
        let err = consume(body, "http://example.com/big", 5, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MaxSize { limit: 5, .. }));
    }

    #[tokio::test]
    async fn test_size_cap_exact_fit_succeeds() {
        let body = Body::Stream(StreamBody::new(chunked(vec![b"abc", b"de"])));
        let bytes = consume(body, "http://example.com/", 5, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"abcde"));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let items: Vec<FetchResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(FetchError::system_with_code("socket hang up", "ECONNRESET")),
        ];
        let body = Body::stream(stream::iter(items));
        let err = consume(body, "http://example.com/", 0, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("ECONNRESET"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_body_timeout_fires() {
        let slow = Box::pin(futures::stream::unfold(0u8, |state| async move {
            if state == 0 {
                Some((Ok(Bytes::from_static(b"first")), 1))
            } else {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Some((Ok(Bytes::from_static(b"late")), 2))
            }
        })) as ByteStream;

        let err = consume(
            Body::Stream(StreamBody::new(slow)),
            "http://example.com/slow",
            0,
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            FetchError::BodyTimeout {
                url: "http://example.com/slow".to_string(),
                timeout: 200,
            }
        );
    }

    #[tokio::test]
    async fn test_tee_yields_identical_bytes() {
        let (mut a, mut b) = tee(chunked(vec![b"one", b"two", b"three"]));

        let mut got_a = Vec::new();
        while let Some(item) = a.next().await {
            got_a.extend_from_slice(&item.unwrap());
        }
        let mut got_b = Vec::new();
        while let Some(item) = b.next().await {
            got_b.extend_from_slice(&item.unwrap());
        }

        assert_eq!(got_a, b"onetwothree");
        assert_eq!(got_a, got_b);
    }
}
