//! Transparent response body decompression.
//!
//! The decoder inspects `Content-Encoding` and wraps the raw transport
//! stream in a streaming inflater when the payload is gzip or deflate
//! compressed. It never pre-buffers: size caps and body timeouts are
//! enforced later, when the body is consumed.
//!
//! Two compatibility quirks are preserved from the wider fetch ecosystem:
//! gzip streams with a truncated trailer still yield their full decoded
//! output, and `deflate` payloads are probed for a zlib header so that
//! legacy servers sending raw deflate keep working.

use std::io::Write;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};
use futures::{ready, Stream, StreamExt};
use http::header::CONTENT_ENCODING;
use http::{HeaderMap, Method, StatusCode};
use tracing::trace;

use crate::body::ByteStream;
use crate::errors::{FetchError, FetchResult};

/// Wraps the raw body stream in the transform selected by
/// `Content-Encoding`, or returns it unchanged when no decoding applies.
pub(crate) fn decode(
    body: ByteStream,
    headers: &HeaderMap,
    method: &Method,
    status: StatusCode,
    compress: bool,
    url: &str,
) -> ByteStream {
    // Body-less statuses and HEAD exchanges never carry an encoded payload,
    // and decoding is entirely opt-out via `compress`.
    if !compress || *method == Method::HEAD || matches!(status.as_u16(), 204 | 304) {
        return body;
    }

    let coding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());

    match coding.as_deref() {
        Some("gzip") | Some("x-gzip") => {
            trace!(url, "attaching gzip inflater");
            Box::pin(InflateStream::gzip(body, url))
        }
        Some("deflate") => {
            trace!(url, "attaching deflate inflater");
            Box::pin(InflateStream::deflate(body, url))
        }
        // Unknown or absent encodings pass through untouched.
        _ => body,
    }
}

/// Incremental inflater over one of the three deflate framings.
enum Inflater {
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
    Raw(DeflateDecoder<Vec<u8>>),
}

impl Inflater {
    fn gzip() -> Self {
        Inflater::Gzip(GzDecoder::new(Vec::new()))
    }

    /// Picks the deflate framing from the first payload byte: a zlib
    /// header starts with a CMF byte whose low nibble is 8 (the deflate
    /// method); anything else is treated as a raw stream.
    fn deflate_for(first_byte: u8) -> Self {
        if first_byte & 0x0F == 0x08 {
            Inflater::Zlib(ZlibDecoder::new(Vec::new()))
        } else {
            Inflater::Raw(DeflateDecoder::new(Vec::new()))
        }
    }

    /// Feeds one compressed chunk and returns whatever output it produced.
    fn push(&mut self, chunk: &[u8]) -> std::io::Result<Bytes> {
        let sink = match self {
            Inflater::Gzip(decoder) => {
                decoder.write_all(chunk)?;
                decoder.flush()?;
                decoder.get_mut()
            }
            Inflater::Zlib(decoder) => {
                decoder.write_all(chunk)?;
                decoder.flush()?;
                decoder.get_mut()
            }
            Inflater::Raw(decoder) => {
                decoder.write_all(chunk)?;
                decoder.flush()?;
                decoder.get_mut()
            }
        };
        Ok(Bytes::from(mem::take(sink)))
    }
}

enum InflateState {
    /// Waiting for the first non-empty chunk to pick the deflate framing.
    ProbeDeflate,
    Running(Inflater),
    Done,
}

/// Stream adapter yielding decoded bytes.
///
/// End-of-input is always treated as a clean end, even when the compressed
/// framing is incomplete; this is what tolerates gzip payloads whose
/// trailer was cut short.
struct InflateStream {
    inner: ByteStream,
    state: InflateState,
    url: String,
}

impl InflateStream {
    fn gzip(inner: ByteStream, url: &str) -> Self {
        Self {
            inner,
            state: InflateState::Running(Inflater::gzip()),
            url: url.to_string(),
        }
    }

    fn deflate(inner: ByteStream, url: &str) -> Self {
        Self {
            inner,
            state: InflateState::ProbeDeflate,
            url: url.to_string(),
        }
    }
}

impl Stream for InflateStream {
    type Item = FetchResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if matches!(this.state, InflateState::Done) {
                return Poll::Ready(None);
            }

            match ready!(this.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    if matches!(this.state, InflateState::ProbeDeflate) {
                        this.state = InflateState::Running(Inflater::deflate_for(chunk[0]));
                    }
                    let inflater = match &mut this.state {
                        InflateState::Running(inflater) => inflater,
                        _ => unreachable!("inflater installed above"),
                    };
                    match inflater.push(&chunk) {
                        Ok(decoded) if decoded.is_empty() => continue,
                        Ok(decoded) => return Poll::Ready(Some(Ok(decoded))),
                        Err(err) => {
                            this.state = InflateState::Done;
                            return Poll::Ready(Some(Err(inflate_error(&this.url, &err))));
                        }
                    }
                }
                Some(Err(err)) => {
                    this.state = InflateState::Done;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.state = InflateState::Done;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

fn inflate_error(url: &str, err: &std::io::Error) -> FetchError {
    FetchError::System {
        message: format!("invalid response body at: {} reason: {}", url, err),
        code: Some("Z_DATA_ERROR".to_string()),
    }
}
