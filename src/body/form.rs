//! Multipart form bodies.
//!
//! The client only requires the two capabilities in [`FormData`]: producing
//! the boundary for the `Content-Type` header, and reporting the total
//! length when it is knowable up front. [`MultipartForm`] is the built-in
//! implementation for fully buffered parts; streaming producers can
//! implement the trait themselves.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures::stream;

use super::ByteStream;

/// Capabilities a multipart form body must expose to the client.
///
/// Forms serialize on demand: [`stream`](FormData::stream) may be called
/// once per trip to the wire.
pub trait FormData: Send + Sync {
    /// The multipart boundary, used to build
    /// `multipart/form-data;boundary=<boundary>`.
    fn boundary(&self) -> String;

    /// Total encoded length in bytes, or `None` when the form cannot know
    /// it synchronously (e.g. parts backed by streams). Unknown-length
    /// forms are sent with chunked transfer encoding.
    fn known_length(&self) -> Option<u64>;

    /// Opens a fresh byte stream over the encoded form.
    fn stream(&self) -> ByteStream;
}

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

/// A buffered `multipart/form-data` payload.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
struct FormPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl MultipartForm {
    /// Creates an empty form with a unique boundary.
    pub fn new() -> Self {
        let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            boundary: format!("--------------------------{:024}", seq),
            parts: Vec::new(),
        }
    }

    /// Adds a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.to_string()),
        });
        self
    }

    /// Adds a file field with an explicit content type.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: Bytes) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            content_type: Some(content_type.to_string()),
            data,
        });
        self
    }

    /// Encodes the whole form into one buffer.
    fn encode(&self) -> Bytes {
        let mut body = Vec::new();

        for part in &self.parts {
            body.extend_from_slice(b"--");
            body.extend_from_slice(self.boundary.as_bytes());
            body.extend_from_slice(b"\r\n");

            body.extend_from_slice(b"Content-Disposition: form-data; name=\"");
            body.extend_from_slice(part.name.as_bytes());
            body.extend_from_slice(b"\"");
            if let Some(filename) = &part.filename {
                body.extend_from_slice(b"; filename=\"");
                body.extend_from_slice(filename.as_bytes());
                body.extend_from_slice(b"\"");
            }
            body.extend_from_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(b"Content-Type: ");
                body.extend_from_slice(content_type.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(b"\r\n");

            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(b"--");
        body.extend_from_slice(self.boundary.as_bytes());
        body.extend_from_slice(b"--\r\n");

        Bytes::from(body)
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData for MultipartForm {
    fn boundary(&self) -> String {
        self.boundary.clone()
    }

    fn known_length(&self) -> Option<u64> {
        Some(self.encode().len() as u64)
    }

    fn stream(&self) -> ByteStream {
        Box::pin(stream::once(futures::future::ready(Ok(self.encode()))))
    }
}
