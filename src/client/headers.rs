//! Outbound header normalization.
//!
//! Applied once per hop, immediately before the exchange is handed to the
//! transport. User-supplied headers always win; only absent headers get
//! defaults, except `Content-Length`, which is overwritten whenever the
//! body length is inferable.

use http::header::{
    HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT,
};
use http::{HeaderMap, Method};

use crate::request::Request;

/// Builds the final outbound header map for one hop.
pub(crate) fn outbound_headers(request: &Request) -> HeaderMap {
    let mut headers = request.headers.clone();

    if !headers.contains_key(ACCEPT) {
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    }
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(crate::USER_AGENT));
    }
    if request.compress && !headers.contains_key(ACCEPT_ENCODING) {
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip,deflate"));
    }

    if !request.body.is_none() && !headers.contains_key(CONTENT_TYPE) {
        if let Some(content_type) = request.body.content_type() {
            if let Ok(value) = HeaderValue::from_str(&content_type) {
                headers.insert(CONTENT_TYPE, value);
            }
        }
    }

    // An inferable length always overwrites whatever the caller set; a
    // body of unknown length keeps the map untouched and is sent chunked.
    let content_length = if request.body.is_none() {
        match request.method {
            Method::POST | Method::PUT => Some(0),
            _ => None,
        }
    } else {
        request.body.total_bytes()
    };
    if let Some(length) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    headers
}
