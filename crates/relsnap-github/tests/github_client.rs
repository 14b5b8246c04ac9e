//! GitHub client behaviour against a mock API server

use pretty_assertions::assert_eq;
use relsnap_core::{CatalogItem, RepositoryLocator};
use relsnap_github::{FetchError, GitHubClient, ReleaseFetcher, ReleaseOutcome, ReleaseProvider, RELEASE_MEDIA_TYPE};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hyper() -> RepositoryLocator {
    RepositoryLocator::new("vercel", "hyper").unwrap()
}

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(server.uri(), "relsnap-test").unwrap()
}

#[tokio::test]
async fn returns_release_body_verbatim() {
    let server = MockServer::start().await;
    let body = json!({
        "tag_name": "v3.4.1",
        "name": "3.4.1",
        "html_url": "https://github.com/vercel/hyper/releases/tag/v3.4.1",
        "body_html": "<p>Fixes</p>",
        "assets": []
    });

    Mock::given(method("GET"))
        .and(path("/repos/vercel/hyper/releases/latest"))
        .and(header("accept", RELEASE_MEDIA_TYPE))
        .and(header("user-agent", "relsnap-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let release = client(&server).latest_release(&hyper()).await.unwrap();
    assert_eq!(release.as_json(), &body);
    assert_eq!(release.tag_name(), Some("v3.4.1"));
}

#[tokio::test]
async fn sends_token_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/vercel/hyper/releases/latest"))
        .and(header("authorization", "token s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": "v1" })))
        .expect(1)
        .mount(&server)
        .await;

    let release = client(&server)
        .with_token("s3cret")
        .latest_release(&hyper())
        .await
        .unwrap();
    assert_eq!(release.tag_name(), Some("v1"));
}

#[tokio::test]
async fn missing_release_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let err = client(&server).latest_release(&hyper()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn exhausted_rate_limit_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).latest_release(&hyper()).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.to_string(), "rate limited by provider: API rate limit exceeded");
}

#[tokio::test]
async fn forbidden_without_rate_limit_is_a_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "42")
                .set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let err = client(&server).latest_release(&hyper()).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Status { status: 403, message: Some(ref m) } if m == "Bad credentials"
    ));
}

#[tokio::test]
async fn server_error_without_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).latest_release(&hyper()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 502, message: None }));
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn non_json_success_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server).latest_release(&hyper()).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = GitHubClient::new(uri, "relsnap-test")
        .unwrap()
        .latest_release(&hyper())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn fetcher_classifies_http_outcomes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/vercel/hyper/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": "v3" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/owner/no-releases/releases/latest"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReleaseFetcher::new(Arc::new(client(&server)));

    let found = fetcher
        .fetch_latest_release(&CatalogItem::new("hyper", "https://github.com/vercel/hyper"))
        .await;
    assert!(matches!(found, ReleaseOutcome::Found(_)));

    let missing = fetcher
        .fetch_latest_release(&CatalogItem::new("quiet", "https://github.com/owner/no-releases"))
        .await;
    assert!(matches!(missing, ReleaseOutcome::NotFound));
}

#[tokio::test]
async fn fetcher_does_not_call_provider_for_malformed_locator() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = ReleaseFetcher::new(Arc::new(client(&server)))
        .fetch_latest_release(&CatalogItem::new("broken", "not a locator"))
        .await;
    assert!(matches!(
        outcome,
        ReleaseOutcome::Error(FetchError::MalformedLocator(_))
    ));
}
