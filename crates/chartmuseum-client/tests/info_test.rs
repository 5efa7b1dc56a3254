//! Server information endpoints

mod common;

use common::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_index_returns_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Welcome to ChartMuseum!</html>"))
        .mount(&server)
        .await;

    let index = client(&server).info().index(&[]).await.unwrap();
    assert!(index.contains("Welcome to ChartMuseum!"));
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"healthy": true})))
        .mount(&server)
        .await;

    let health = client(&server).info().health(&[]).await.unwrap();
    assert!(health.healthy);
}

#[tokio::test]
async fn test_info_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "v0.16.2"})))
        .mount(&server)
        .await;

    let info = client(&server).info().info(&[]).await.unwrap();
    assert_eq!(info.version, "v0.16.2");
}

#[tokio::test]
async fn test_unhealthy_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"healthy": false})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_without_retries(&server).info().health(&[]).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(
        err.to_string(),
        format!("GET {}/health: 503 {{healthy: failed to parse unexpected error type: bool}}", server.uri())
    );
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/museum/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"healthy": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = chartmuseum_client::Client::anonymous(&format!("{}/museum", server.uri())).unwrap();
    assert!(client.info().health(&[]).await.unwrap().healthy);
}
