//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chartmuseum_client::{Client, ClientConfig, RetryConfig};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::MockServer;

/// Retry settings with millisecond backoff so failing tests stay fast
pub fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_linear_window(Duration::from_millis(10), Duration::from_millis(20))
        .with_rate_limit_window(Duration::from_millis(10), Duration::from_millis(20))
}

pub fn client(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri()).with_retry(fast_retry())).unwrap()
}

pub fn client_without_retries(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri()).with_retry(RetryConfig::disabled())).unwrap()
}

pub fn authed_client(server: &MockServer) -> Client {
    Client::new(
        ClientConfig::new(server.uri())
            .with_basic_auth("admin", "password")
            .with_retry(fast_retry()),
    )
    .unwrap()
}

/// Plain HTTP server whose responses promise `declared` body bytes but only
/// deliver `sent`, then hold the connection for `hold` before closing it
///
/// wiremock always writes whole bodies, so short and stalled bodies need a
/// socket of their own. Returns the base URL.
pub async fn short_body_server(declared: usize, sent: &'static [u8], hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared}\r\n\r\n"
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(sent).await;
                let _ = socket.flush().await;
                tokio::time::sleep(hold).await;
            });
        }
    });

    format!("http://{addr}")
}

pub fn client_for(base_url: &str) -> Client {
    Client::new(ClientConfig::new(base_url).with_retry(fast_retry())).unwrap()
}

/// One chart version as the server serializes it
pub fn chart_version(name: &str, version: &str) -> Value {
    json!({
        "name": name,
        "version": version,
        "apiVersion": "v2",
        "appVersion": "1.0",
        "description": format!("{name} chart"),
        "urls": [format!("charts/{name}-{version}.tgz")],
        "created": "2024-01-15T10:00:00Z",
        "digest": "sha256:3f1c2a"
    })
}

pub fn chart_versions(name: &str, versions: &[&str]) -> Value {
    Value::Array(versions.iter().map(|v| chart_version(name, v)).collect())
}

/// Write a real gzip'd tarball holding a minimal chart
pub fn chart_package(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(format!("{name}-{version}.tgz"));
    let file = File::create(&path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let chart_yaml = format!("apiVersion: v2\nname: {name}\nversion: {version}\n");
    let mut header = tar::Header::new_gnu();
    header.set_size(chart_yaml.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{name}/Chart.yaml"), chart_yaml.as_bytes())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    path
}

/// File names in `dir`, sorted
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
