#![allow(dead_code)]

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use appcenter::{App, AppCenterClient, AppClient, ClientConfig, PollPolicy, RetryPolicy};
use httpmock::Method::{GET, PATCH, POST};
use httpmock::{Mock, MockServer};
use serde_json::json;

pub const TOKEN: &str = "test-api-token";
pub const OWNER: &str = "acme";
pub const APP: &str = "field";
pub const UPLOAD_ID: &str = "up-1";
pub const ASSET_ID: &str = "asset-1";
pub const UPLOAD_TOKEN: &str = "sv=2020&sig=abc";
pub const RELEASE_ID: u64 = 42;

/// 25 bytes, split by the mocked metadata into 10 + 10 + 5
pub const CONTENT: &str = "abcdefghijklmnopqrstuvwxy";
pub const CHUNKS: [&str; 3] = ["abcdefghij", "klmnopqrst", "uvwxy"];

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn app() -> App {
    App::new(OWNER, APP)
}

pub fn api_path(rest: &str) -> String {
    format!("/v0.1/apps/{OWNER}/{APP}/{rest}")
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        wait_min: Duration::from_millis(1),
        wait_max: Duration::from_millis(2),
    }
}

pub fn client(server: &MockServer) -> AppClient {
    let mut config = ClientConfig::new(TOKEN).with_base_url(server.base_url());
    config.retry = fast_retry();
    config.poll = PollPolicy {
        interval_min: Duration::from_millis(1),
        interval_max: Duration::from_millis(2),
        max_attempts: 5,
        timeout: Duration::from_secs(5),
    };

    AppCenterClient::new(config).unwrap().app(app())
}

pub fn artifact(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("app-release.apk");
    std::fs::write(&path, CONTENT).unwrap();
    path
}

pub fn release_json() -> serde_json::Value {
    json!({
        "id": RELEASE_ID,
        "app_name": APP,
        "app_display_name": "Field Service",
        "app_os": "Android",
        "version": "412",
        "short_version": "2.3.0",
        "size": 25,
        "install_url": "https://install.appcenter.ms/orgs/acme/apps/field/releases/42",
        "download_url": "https://dl.appcenter.ms/app-release.apk",
        "enabled": true,
        "distribution_groups": [],
        "distribution_stores": []
    })
}

/// Mocks for every publish step, each expecting exactly one hit
pub struct PublishMocks<'a> {
    pub slot: Mock<'a>,
    pub metadata: Mock<'a>,
    pub chunks: Vec<Mock<'a>>,
    pub finished: Mock<'a>,
    pub patch: Mock<'a>,
    pub status: Mock<'a>,
    pub release: Mock<'a>,
}

pub async fn mock_slot(server: &MockServer) -> Mock<'_> {
    let upload_domain = server.base_url();
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(api_path("uploads/releases"))
                .header("x-api-token", TOKEN)
                .header("content-type", "application/json; charset=utf-8");
            then.status(201).json_body(json!({
                "id": UPLOAD_ID,
                "package_asset_id": ASSET_ID,
                "upload_domain": upload_domain,
                "token": UPLOAD_TOKEN,
                "url_encoded_token": "sv%3D2020%26sig%3Dabc"
            }));
        })
        .await
}

pub async fn mock_metadata(server: &MockServer, chunk_list: serde_json::Value) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/upload/set_metadata/{ASSET_ID}"))
                .query_param("file_name", "app-release.apk")
                .query_param("file_size", "25")
                .query_param("token", UPLOAD_TOKEN);
            then.status(200).json_body(json!({
                "id": ASSET_ID,
                "chunk_size": 10,
                "chunk_list": chunk_list,
                "blob_partitions": 1
            }));
        })
        .await
}

pub async fn mock_chunk<'a>(
    server: &'a MockServer,
    block: u64,
    body: &str,
    error: bool,
) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/upload/upload_chunk/{ASSET_ID}"))
                .query_param("block_number", block.to_string())
                .query_param("token", UPLOAD_TOKEN)
                .body(body);
            if error {
                then.status(200)
                    .json_body(json!({ "error": true, "error_code": "ChunkCorrupted" }));
            } else {
                then.status(200).json_body(json!({ "error": false }));
            }
        })
        .await
}

pub async fn mock_finished(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/upload/finished/{ASSET_ID}"))
                .query_param("token", UPLOAD_TOKEN);
            then.status(200).json_body(json!({ "error": false, "state": "Done" }));
        })
        .await
}

pub async fn mock_patch(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path(api_path(&format!("uploads/releases/{UPLOAD_ID}")))
                .json_body(json!({ "upload_status": "uploadFinished" }));
            then.status(200)
                .json_body(json!({ "id": UPLOAD_ID, "upload_status": "uploadFinished" }));
        })
        .await
}

pub async fn mock_status_ready(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(api_path(&format!("uploads/releases/{UPLOAD_ID}")));
            then.status(200).json_body(json!({
                "id": UPLOAD_ID,
                "upload_status": "readyToBePublished",
                "release_distinct_id": RELEASE_ID
            }));
        })
        .await
}

pub async fn mock_release(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(api_path(&format!("releases/{RELEASE_ID}")));
            then.status(200).json_body(release_json());
        })
        .await
}

/// A publish that succeeds end to end
pub async fn mock_publish(server: &MockServer) -> PublishMocks<'_> {
    let mut chunks = Vec::new();
    for (i, body) in CHUNKS.iter().enumerate() {
        chunks.push(mock_chunk(server, i as u64 + 1, body, false).await);
    }

    PublishMocks {
        slot: mock_slot(server).await,
        metadata: mock_metadata(server, json!([1, 2, 3])).await,
        chunks,
        finished: mock_finished(server).await,
        patch: mock_patch(server).await,
        status: mock_status_ready(server).await,
        release: mock_release(server).await,
    }
}
