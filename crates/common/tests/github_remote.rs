//! Integration tests for the GitHub client and catalogs against a stubbed
//! remote. No network access and no real credentials involved.

use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::prelude::*;

const OWNER: &str = "acme";
const REPO: &str = "widgets";

fn release_json(id: u64, tag: &str, created: &str, published: Option<&str>) -> Value {
    json!({
        "id": id,
        "tag_name": tag,
        "created_at": created,
        "published_at": published,
    })
}

fn asset_json(id: u64, name: &str, size: u64, url: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": size,
        "url": url,
        "created_at": "2024-03-01T00:00:00Z",
        "updated_at": "2024-03-02T00:00:00Z",
    })
}

async fn client_for(server: &MockServer) -> GithubClient {
    let api_base = Url::parse(&server.uri()).unwrap();
    GithubClient::with_api_base(api_base, None)
}

fn release_catalog(client: GithubClient) -> ReleaseCatalog {
    ReleaseCatalog::new(client, OWNER.to_string(), REPO.to_string())
}

#[tokio::test]
async fn list_releases_follows_pagination() {
    let server = MockServer::start().await;

    let first_page: Vec<Value> = (0..100)
        .map(|i| release_json(i + 1, &format!("v0.{}.0", i), "2024-01-01T00:00:00Z", None))
        .collect();
    let second_page = vec![release_json(
        500,
        "v1.0.0",
        "2024-01-01T00:00:00Z",
        Some("2024-02-01T00:00:00Z"),
    )];

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&second_page))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let releases = client.list_releases(OWNER, REPO).await.unwrap();

    assert_eq!(releases.len(), 101);
    assert_eq!(releases.last().unwrap().tag_name, "v1.0.0");
}

#[tokio::test]
async fn get_repository_deserializes_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 99,
            "full_name": "acme/widgets",
            "created_at": "2020-05-05T12:00:00Z",
            "updated_at": "2024-06-06T12:00:00Z",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let repo = client.get_repository(OWNER, REPO).await.unwrap();

    assert_eq!(repo.id, 99);
    assert_eq!(repo.full_name, "acme/widgets");
    assert!(repo.created_at < repo.updated_at);
}

#[tokio::test]
async fn release_refresh_duplicate_tags_last_wins() {
    let server = MockServer::start().await;

    let releases = vec![
        release_json(1, "v1.0.0", "2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z")),
        release_json(2, "v1.0.0", "2024-01-03T00:00:00Z", Some("2024-01-04T00:00:00Z")),
    ];
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&releases))
        .mount(&server)
        .await;

    let catalog = release_catalog(client_for(&server).await);
    let snapshot = catalog.refresh().await.unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("v1.0.0").unwrap().release.id, 2);
}

#[tokio::test]
async fn lookup_absent_tag_is_none_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let catalog = release_catalog(client_for(&server).await);
    let found = catalog.lookup("v9.9.9").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn failed_refresh_leaves_prior_snapshot_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![release_json(
            1,
            "v1.0.0",
            "2024-01-01T00:00:00Z",
            Some("2024-01-02T00:00:00Z"),
        )]))
        .mount(&server)
        .await;

    let catalog = release_catalog(client_for(&server).await);
    catalog.refresh().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = catalog.refresh().await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 500, .. }));

    // The snapshot from the successful refresh is still current.
    let current = catalog.current().await;
    assert_eq!(current.len(), 1);
    assert!(current.contains_key("v1.0.0"));
}

#[tokio::test]
async fn remote_status_and_message_preserved_verbatim() {
    let server = MockServer::start().await;

    let message = "API rate limit exceeded for 127.0.0.1";
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(403).set_body_string(message))
        .mount(&server)
        .await;

    let catalog = release_catalog(client_for(&server).await);
    match catalog.refresh().await.unwrap_err() {
        RemoteError::Status { status, message: m } => {
            assert_eq!(status, 403);
            assert_eq!(m, message);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn asset_lookup_is_exact_and_first_match_wins() {
    let server = MockServer::start().await;
    let asset_url = format!("{}/download/11", server.uri());

    let assets = vec![
        asset_json(11, "tool.tar.gz", 4, &asset_url),
        asset_json(12, "tool.tar.gz", 9, &asset_url),
        asset_json(13, "TOOL.tar.gz", 5, &asset_url),
    ];
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases/77/assets", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&assets))
        .mount(&server)
        .await;

    let catalog = AssetCatalog::new(
        client_for(&server).await,
        OWNER.to_string(),
        REPO.to_string(),
        77,
    );

    let found = catalog.lookup("tool.tar.gz").await.unwrap().unwrap();
    assert_eq!(found.id, 11, "first match wins on duplicate names");

    // Case-sensitive: lowercase query does not match the uppercase name.
    assert!(catalog.lookup("Tool.tar.gz").await.unwrap().is_none());
}

#[tokio::test]
async fn download_asset_negotiates_octet_stream_and_returns_exact_bytes() {
    let server = MockServer::start().await;
    let content = b"0123456789";

    Mock::given(method("GET"))
        .and(path("/download/42"))
        .and(header("accept", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.as_slice()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let asset: Asset = serde_json::from_value(asset_json(
        42,
        "a.txt",
        content.len() as u64,
        &format!("{}/download/42", server.uri()),
    ))
    .unwrap();

    let body = client.download_asset(&asset).await.unwrap();
    assert_eq!(body, content);
    assert_eq!(body.len() as u64, asset.size);
}

#[tokio::test]
async fn download_asset_attaches_bearer_credential_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/42"))
        .and(header("authorization", "Bearer sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".as_slice()))
        .mount(&server)
        .await;

    let api_base = Url::parse(&server.uri()).unwrap();
    let client = GithubClient::with_api_base(api_base, Some("sekrit".to_string()));
    let asset: Asset = serde_json::from_value(asset_json(
        42,
        "a.txt",
        2,
        &format!("{}/download/42", server.uri()),
    ))
    .unwrap();

    assert_eq!(client.download_asset(&asset).await.unwrap(), b"ok");
}

#[tokio::test]
async fn download_failure_carries_remote_diagnostics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download/42"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let asset: Asset = serde_json::from_value(asset_json(
        42,
        "a.txt",
        2,
        &format!("{}/download/42", server.uri()),
    ))
    .unwrap();

    match client.download_asset(&asset).await.unwrap_err() {
        RemoteError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_refreshes_each_return_consistent_snapshots() {
    let server = MockServer::start().await;

    let releases = vec![
        release_json(1, "v1.0.0", "2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z")),
        release_json(2, "v2.0.0", "2024-02-01T00:00:00Z", Some("2024-02-02T00:00:00Z")),
    ];
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/releases", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&releases))
        .mount(&server)
        .await;

    let catalog = release_catalog(client_for(&server).await);
    let (a, b) = tokio::join!(catalog.refresh(), catalog.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());

    for snapshot in [&a, &b] {
        let mut tags: Vec<_> = snapshot.keys().cloned().collect();
        tags.sort();
        assert_eq!(tags, vec!["v1.0.0", "v2.0.0"]);
    }
}
