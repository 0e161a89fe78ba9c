//! Error types for the fetch client.
//!
//! Every failure produced after argument validation carries one of the
//! closed set of [`ErrorKind`] tags, mirroring the `type` field of a
//! WHATWG-fetch error object. Synchronous argument validation failures
//! (bad URL, forbidden body, malformed header names) use the
//! [`FetchError::Usage`] variant, the moral equivalent of a `TypeError`.

use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Main error type for the fetch client.
///
/// The enum is `Clone` so that a terminal stream error can be observed by
/// both halves of a tee'd body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Invalid arguments: bad URL, unsupported scheme, forbidden body,
    /// malformed header names. Raised synchronously during construction.
    #[error("{message}")]
    Usage {
        /// Description of the misuse
        message: String,
    },

    /// Underlying transport failure (connect, DNS, reset, inflate).
    #[error("{message}")]
    System {
        /// Description of the failure, including the request URL
        message: String,
        /// Platform error name (`ECONNREFUSED`, `ECONNRESET`, `ENOTFOUND`,
        /// `Z_DATA_ERROR`, ...) when one is known
        code: Option<String>,
    },

    /// The connect/headers phase exceeded the request timeout.
    #[error("network timeout at: {url}")]
    RequestTimeout {
        /// URL of the hop that timed out
        url: String,
    },

    /// The body read phase exceeded the request timeout.
    #[error("response timeout while trying to fetch {url} (over {timeout}ms)")]
    BodyTimeout {
        /// URL whose body was being read
        url: String,
        /// The configured limit in milliseconds
        timeout: u64,
    },

    /// The decoded body grew past the configured `size` cap.
    #[error("content size at {url} over limit: {limit}")]
    MaxSize {
        /// URL whose body was being read
        url: String,
        /// The configured cap in bytes
        limit: u64,
    },

    /// The redirect chain grew past the configured `follow` limit.
    #[error("maximum redirect reached at: {url}")]
    MaxRedirect {
        /// URL of the hop that would have exceeded the limit
        url: String,
    },

    /// A redirect arrived while the redirect policy was `Error`.
    #[error("uri requested responds with a redirect, redirect mode is set to error: {url}")]
    NoRedirect {
        /// URL that responded with the redirect
        url: String,
    },

    /// `Location` was missing or unparseable while following redirects.
    #[error("uri requested responds with an invalid redirect URL: {location}")]
    InvalidRedirect {
        /// The offending `Location` value (empty when absent)
        location: String,
    },

    /// `json()` could not parse the body.
    #[error("invalid json response body at {url} reason: {message}")]
    InvalidJson {
        /// URL whose body failed to parse
        url: String,
        /// The parser's message
        message: String,
    },

    /// The body was consumed a second time.
    #[error("body used already for: {url}")]
    BodyAlreadyUsed {
        /// URL of the request or response
        url: String,
    },
}

/// The closed set of error tags, one per [`FetchError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Argument validation failure (`TypeError` equivalent)
    Usage,
    /// Underlying transport failure
    System,
    /// Connect/headers phase timeout
    RequestTimeout,
    /// Body read phase timeout
    BodyTimeout,
    /// Body exceeded the size cap
    MaxSize,
    /// Redirect chain exceeded the follow limit
    MaxRedirect,
    /// Redirect received under the `Error` policy
    NoRedirect,
    /// Missing or unparseable `Location` under the `Follow` policy
    InvalidRedirect,
    /// JSON parse failure
    InvalidJson,
    /// Body consumed more than once
    AlreadyUsed,
}

impl ErrorKind {
    /// The wire-level tag string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Usage => "type-error",
            ErrorKind::System => "system",
            ErrorKind::RequestTimeout => "request-timeout",
            ErrorKind::BodyTimeout => "body-timeout",
            ErrorKind::MaxSize => "max-size",
            ErrorKind::MaxRedirect => "max-redirect",
            ErrorKind::NoRedirect => "no-redirect",
            ErrorKind::InvalidRedirect => "invalid-redirect",
            ErrorKind::InvalidJson => "invalid-json",
            ErrorKind::AlreadyUsed => "already-used",
        }
    }
}

impl FetchError {
    /// Returns the tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Usage { .. } => ErrorKind::Usage,
            FetchError::System { .. } => ErrorKind::System,
            FetchError::RequestTimeout { .. } => ErrorKind::RequestTimeout,
            FetchError::BodyTimeout { .. } => ErrorKind::BodyTimeout,
            FetchError::MaxSize { .. } => ErrorKind::MaxSize,
            FetchError::MaxRedirect { .. } => ErrorKind::MaxRedirect,
            FetchError::NoRedirect { .. } => ErrorKind::NoRedirect,
            FetchError::InvalidRedirect { .. } => ErrorKind::InvalidRedirect,
            FetchError::InvalidJson { .. } => ErrorKind::InvalidJson,
            FetchError::BodyAlreadyUsed { .. } => ErrorKind::AlreadyUsed,
        }
    }

    /// The platform error name when this is a system error.
    pub fn code(&self) -> Option<&str> {
        match self {
            FetchError::System { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Alias for [`code`](Self::code), matching the classic `errno` spelling.
    pub fn errno(&self) -> Option<&str> {
        self.code()
    }

    /// Convenience constructor for argument validation failures.
    pub fn usage(message: impl Into<String>) -> Self {
        FetchError::Usage {
            message: message.into(),
        }
    }

    /// Convenience constructor for transport failures without a code.
    pub fn system(message: impl Into<String>) -> Self {
        FetchError::System {
            message: message.into(),
            code: None,
        }
    }

    /// Convenience constructor for transport failures with a platform code.
    pub fn system_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        FetchError::System {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        match err {
            url::ParseError::RelativeUrlWithoutBase => {
                FetchError::usage("Only absolute URLs are supported")
            }
            other => FetchError::usage(format!("Invalid URL: {}", other)),
        }
    }
}

/// Maps a standard I/O error onto the platform error name the peer runtime
/// would have reported.
pub(crate) fn io_error_code(err: &std::io::Error) -> Option<String> {
    use std::io::ErrorKind as IoKind;

    let name = match err.kind() {
        IoKind::ConnectionRefused => "ECONNREFUSED",
        IoKind::ConnectionReset => "ECONNRESET",
        IoKind::ConnectionAborted => "ECONNABORTED",
        IoKind::TimedOut => "ETIMEDOUT",
        IoKind::BrokenPipe => "EPIPE",
        IoKind::NotFound => "ENOTFOUND",
        _ => return None,
    };
    Some(name.to_string())
}
