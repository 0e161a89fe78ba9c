//! The redirect driver: one loop iteration per network hop.
//!
//! Each hop guards the outbound headers, serializes the body, performs the
//! exchange under the per-hop timeout, and either finishes (handing the raw
//! stream to the decoder) or rewrites the request for the next hop per the
//! 301/302/303/307/308 rules.

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::Method;
use tracing::debug;

use super::headers::outbound_headers;
use super::is_redirect;
use crate::body::Body;
use crate::decoder;
use crate::errors::{FetchError, FetchResult};
use crate::request::{RedirectPolicy, Request};
use crate::response::Response;
use crate::transport::{HttpTransport, TransportBody, TransportRequest, TransportResponse};

/// Drives `request` through its redirect chain and returns the final
/// response.
pub(crate) async fn dispatch(
    transport: &dyn HttpTransport,
    mut request: Request,
) -> FetchResult<Response> {
    loop {
        let hop_url = request.url.to_string();
        let outbound = TransportRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: outbound_headers(&request),
            body: serialize_body(&mut request.body),
        };

        debug!(
            method = %outbound.method,
            url = %hop_url,
            counter = request.counter,
            "dispatching hop"
        );

        // The timeout covers dispatch through headers-received and is
        // re-armed for every hop; the scope ending disarms it.
        let exchange = transport.exchange(outbound);
        let raw = if request.timeout.is_zero() {
            exchange.await?
        } else {
            match tokio::time::timeout(request.timeout, exchange).await {
                Ok(result) => result?,
                Err(_) => return Err(FetchError::RequestTimeout { url: hop_url }),
            }
        };

        if is_redirect(raw.status.as_u16()) {
            match request.redirect {
                // Returned verbatim: the Location header is neither
                // resolved nor synthesized, even when missing or invalid.
                RedirectPolicy::Manual => return Ok(finish(request, raw)),
                RedirectPolicy::Error => {
                    return Err(FetchError::NoRedirect { url: hop_url });
                }
                RedirectPolicy::Follow => {
                    request = next_hop(request, &raw)?;
                    continue;
                }
            }
        }

        return Ok(finish(request, raw));
    }
}

/// Applies the redirect rules and produces the request for the next hop.
fn next_hop(mut request: Request, raw: &TransportResponse) -> FetchResult<Request> {
    let hop_url = request.url.to_string();

    request.counter += 1;
    if request.counter > request.follow {
        return Err(FetchError::MaxRedirect { url: hop_url });
    }

    let location = raw
        .headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok());
    let next_url = match location {
        None => {
            return Err(FetchError::InvalidRedirect {
                location: String::new(),
            })
        }
        Some(value) => request
            .url
            .join(value)
            .map_err(|_| FetchError::InvalidRedirect {
                location: value.to_string(),
            })?,
    };
    if next_url.scheme() != "http" && next_url.scheme() != "https" {
        return Err(FetchError::usage("Only HTTP(S) protocols are supported"));
    }

    let status = raw.status.as_u16();
    let rewrite_to_get = (matches!(status, 301 | 302) && request.method == Method::POST)
        || (status == 303 && request.method != Method::GET && request.method != Method::HEAD);
    if rewrite_to_get {
        request.method = Method::GET;
        request.body = Body::None;
        request.headers.remove(CONTENT_LENGTH);
        request.headers.remove(CONTENT_TYPE);
    }

    // Credentials never travel to another host. Comparison is on hostname
    // only, so relative and protocol-relative Locations keep the header.
    if next_url.host_str() != request.url.host_str() {
        request.headers.remove(AUTHORIZATION);
    }

    debug!(
        status,
        from = %hop_url,
        to = %next_url,
        counter = request.counter,
        "following redirect"
    );

    request.url = next_url;
    Ok(request)
}

/// Builds the final response: the raw stream goes through the decoder and
/// the request's consumption knobs are carried over.
fn finish(request: Request, raw: TransportResponse) -> Response {
    let url = request.url.to_string();
    let body = decoder::decode(
        raw.body,
        &raw.headers,
        &request.method,
        raw.status,
        request.compress,
        &url,
    );
    Response::from_exchange(
        url,
        raw.status,
        raw.headers,
        Body::Stream(crate::body::StreamBody::new(body)),
        request.counter > 0,
        request.size,
        request.timeout,
    )
}

/// Serializes the body for one trip to the wire. Replayable shapes are
/// duplicated cheaply and survive for later hops; a one-shot stream is
/// taken and serializes as empty thereafter; forms open a fresh stream.
fn serialize_body(body: &mut Body) -> Option<TransportBody> {
    match body {
        Body::None => None,
        Body::Text(text) => Some(TransportBody::Full(Bytes::from(text.clone()))),
        Body::Bytes(bytes) => Some(TransportBody::Full(bytes.clone())),
        Body::Blob(blob) => Some(TransportBody::Full(blob.bytes())),
        Body::Stream(stream) => match stream.take() {
            Some(inner) => Some(TransportBody::Stream(inner)),
            None => Some(TransportBody::Full(Bytes::new())),
        },
        Body::Form(form) => Some(TransportBody::Stream(form.stream())),
    }
}
