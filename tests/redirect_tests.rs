//! Tests for the redirect driver: method rewriting, authorization
//! stripping, follow limits and the manual/error policies.

use std::sync::Arc;

use fetch_client::mocks::{MockHttpTransport, MockResponse};
use fetch_client::{Client, ErrorKind, FetchBody, RedirectPolicy, Request};
use http::Method;

fn mock_client() -> (Client, Arc<MockHttpTransport>) {
    let transport = Arc::new(MockHttpTransport::new());
    (Client::with_transport(transport.clone()), transport)
}

#[tokio::test]
async fn test_301_on_post_rewrites_to_get_and_drops_body() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "/inspect"));
    transport.add_response(MockResponse::text("done"));

    let mut response = client
        .fetch(
            Request::builder("http://srv/redirect/301")
                .method("POST")
                .body("a=1"),
        )
        .await
        .unwrap();

    assert_eq!(response.url(), "http://srv/inspect");
    assert!(response.redirected());
    assert_eq!(response.text().await.unwrap(), "done");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, Method::GET);
    assert_eq!(requests[1].body, None);
    assert!(requests[1].headers.get("content-type").is_none());
    assert!(requests[1].headers.get("content-length").is_none());
}

#[tokio::test]
async fn test_302_on_post_rewrites_to_get() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "/next"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/").method("POST").body("a=1"))
        .await
        .unwrap();

    assert_eq!(transport.requests()[1].method, Method::GET);
}

#[tokio::test]
async fn test_301_on_non_post_preserves_method_and_body() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "/next"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(
            Request::builder("http://srv/")
                .method("DELETE")
                .body("payload"),
        )
        .await
        .unwrap();

    let second = &transport.requests()[1];
    assert_eq!(second.method, Method::DELETE);
    assert_eq!(second.body.as_deref(), Some(b"payload".as_ref()));
}

#[tokio::test]
async fn test_307_preserves_method_and_replays_body() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(307, "/inspect"));
    transport.add_response(MockResponse::ok());

    let response = client
        .fetch(
            Request::builder("http://srv/redirect/307")
                .method("POST")
                .body("a=1"),
        )
        .await
        .unwrap();
    assert_eq!(response.url(), "http://srv/inspect");

    let second = &transport.requests()[1];
    assert_eq!(second.method, Method::POST);
    assert_eq!(second.body.as_deref(), Some(b"a=1".as_ref()));
    assert_eq!(
        second.headers.get("content-type").unwrap(),
        "text/plain;charset=UTF-8"
    );
}

#[tokio::test]
async fn test_308_preserves_method_and_body() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(308, "/moved"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/").method("PUT").body("data"))
        .await
        .unwrap();

    let second = &transport.requests()[1];
    assert_eq!(second.method, Method::PUT);
    assert_eq!(second.body.as_deref(), Some(b"data".as_ref()));
}

#[tokio::test]
async fn test_303_rewrites_any_method_to_get() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(303, "/see-other"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/").method("PUT").body("data"))
        .await
        .unwrap();

    let second = &transport.requests()[1];
    assert_eq!(second.method, Method::GET);
    assert_eq!(second.body, None);
}

#[tokio::test]
async fn test_303_on_get_stays_get() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(303, "/see-other"));
    transport.add_response(MockResponse::ok());

    client.fetch("http://srv/").await.unwrap();

    assert_eq!(transport.requests()[1].method, Method::GET);
}

#[tokio::test]
async fn test_authorization_stripped_on_cross_host_redirect() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "http://other/landing"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/redirect").header("authorization", "abc"))
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].headers.get("authorization").unwrap(), "abc");
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_authorization_kept_on_same_host_redirect() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "http://srv:8080/landing"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/redirect").header("authorization", "abc"))
        .await
        .unwrap();

    // Hostname comparison is port-insensitive.
    assert_eq!(
        transport.requests()[1].headers.get("authorization").unwrap(),
        "abc"
    );
}

#[tokio::test]
async fn test_authorization_kept_on_relative_redirect() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "/landing"));
    transport.add_response(MockResponse::ok());

    client
        .fetch(Request::builder("http://srv/redirect").header("authorization", "abc"))
        .await
        .unwrap();

    assert_eq!(
        transport.requests()[1].headers.get("authorization").unwrap(),
        "abc"
    );
}

#[tokio::test]
async fn test_follow_zero_rejects_any_redirect() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "/next"));

    let err = client
        .fetch(Request::builder("http://srv/").follow(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaxRedirect);
}

#[tokio::test]
async fn test_chain_within_follow_limit_succeeds() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "/a"));
    transport.add_response(MockResponse::redirect(302, "/b"));
    transport.add_response(MockResponse::redirect(302, "/c"));
    transport.add_response(MockResponse::text("made it"));

    let mut response = client
        .fetch(Request::builder("http://srv/start").follow(3))
        .await
        .unwrap();
    assert_eq!(response.url(), "http://srv/c");
    assert_eq!(response.text().await.unwrap(), "made it");
}

#[tokio::test]
async fn test_chain_past_follow_limit_fails() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "/a"));
    transport.add_response(MockResponse::redirect(302, "/b"));
    transport.add_response(MockResponse::redirect(302, "/c"));
    transport.add_response(MockResponse::text("unreachable"));

    let err = client
        .fetch(Request::builder("http://srv/start").follow(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaxRedirect);
}

#[tokio::test]
async fn test_error_policy_rejects_redirect() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "/next"));

    let err = client
        .fetch(Request::builder("http://srv/").redirect(RedirectPolicy::Error))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoRedirect);
}

#[tokio::test]
async fn test_manual_policy_returns_redirect_verbatim() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "/next"));

    let response = client
        .fetch(Request::builder("http://srv/hop").redirect(RedirectPolicy::Manual))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 301);
    assert_eq!(response.url(), "http://srv/hop");
    // The Location value is handed back unresolved.
    assert_eq!(response.headers().get("location").unwrap(), "/next");
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_manual_policy_with_missing_location_still_returns() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::new(301));

    let response = client
        .fetch(Request::builder("http://srv/hop").redirect(RedirectPolicy::Manual))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 301);
    assert!(response.headers().get("location").is_none());
}

#[tokio::test]
async fn test_follow_with_missing_location_fails() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::new(301));

    let err = client.fetch("http://srv/hop").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRedirect);
}

#[tokio::test]
async fn test_follow_with_unparseable_location_fails() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(301, "http://["));

    let err = client.fetch("http://srv/hop").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRedirect);
}

#[tokio::test]
async fn test_redirect_to_non_http_scheme_fails() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "ftp://srv/file"));

    let err = client.fetch("http://srv/hop").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[tokio::test]
async fn test_final_url_is_last_fetched() {
    let (client, transport) = mock_client();
    transport.add_response(MockResponse::redirect(302, "http://srv/b"));
    transport.add_response(MockResponse::redirect(302, "http://elsewhere/c"));
    transport.add_response(MockResponse::ok());

    let response = client.fetch("http://srv/a").await.unwrap();
    assert_eq!(response.url(), "http://elsewhere/c");
    assert!(response.redirected());
}
