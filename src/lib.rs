//! # fetch-client
//!
//! WHATWG-Fetch-compatible HTTP client core for server-side Rust.
//!
//! ## Features
//!
//! - One entry point: [`fetch`] a URL or a [`Request`], get a [`Response`]
//!   with a lazy body stream
//! - Full redirect semantics: 301/302/303 method rewriting, 307/308 body
//!   replay, authorization stripping across hosts, `follow` limits and
//!   `manual`/`error` policies
//! - Polymorphic bodies: text, bytes, [`Blob`], opaque byte streams and
//!   multipart forms, with one-shot consumption into
//!   bytes/text/JSON/blob representations
//! - Transparent gzip/deflate decompression, tolerant of truncated gzip
//!   trailers and of raw-deflate origins
//! - Per-request timeouts covering both the headers phase and the body
//!   read, and byte-size caps enforced while streaming
//! - A pluggable [`HttpTransport`] seam: `reqwest` in production, a
//!   scripted mock for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetch_client::{fetch, FetchBody, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut response = fetch("https://example.com/").await?;
//!     println!("{} {}", response.status(), response.url());
//!     let body = response.text().await?;
//!     println!("{}", body);
//!
//!     // Options ride on the request builder.
//!     let mut response = fetch(
//!         Request::builder("https://example.com/api")
//!             .method("POST")
//!             .body(r#"{"name":"value"}"#)
//!             .header("content-type", "application/json"),
//!     )
//!     .await?;
//!     let value: serde_json::Value = response.json().await?;
//!     println!("{}", value);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `client` - fetch entry points and the redirect driver
//! - `request` / `response` - the two sides of an exchange
//! - `body` - polymorphic bodies and one-shot consumption
//! - `transport` - the platform HTTP stack seam
//! - `errors` - error taxonomy with the closed kind set
//! - `mocks` / `fixtures` - scripted transport and canned payloads for
//!   tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod body;
pub mod client;
mod decoder;
pub mod errors;
pub mod fixtures;
pub mod mocks;
pub mod request;
pub mod response;
pub mod transport;

pub use body::{Blob, Body, ByteStream, FetchBody, FormData, MultipartForm, StreamBody};
pub use client::{fetch, is_redirect, Client};
pub use errors::{ErrorKind, FetchError, FetchResult};
pub use request::{IntoRequest, RedirectPolicy, Request, RequestBuilder};
pub use response::{Response, ResponseInit};
pub use transport::{
    HttpTransport, ReqwestTransport, TransportBody, TransportRequest, TransportResponse,
};

/// `User-Agent` value sent when the caller does not supply one.
pub const USER_AGENT: &str = concat!("fetch-client/", env!("CARGO_PKG_VERSION"));

/// Default maximum number of redirects to follow.
pub const DEFAULT_FOLLOW: u32 = 20;
