//! Binary large object: an immutable byte container tagged with a MIME type.

use bytes::Bytes;

/// An immutable chunk of bytes carrying a MIME type, the result of
/// [`blob()`](crate::FetchBody::blob) and a valid request payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    content_type: String,
}

impl Blob {
    /// Creates a blob over `bytes` tagged with `content_type` (may be empty).
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// The size of the blob in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The MIME type this blob was tagged with; empty when unknown.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// A cheap handle to the backing bytes.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Borrows the backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the backing bytes as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("size", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}
