mod common;

use std::time::{Duration, Instant};

use appcenter::{AppCenterError, PublishStage, ReleaseOptions};
use common::*;
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

#[tokio::test]
async fn publish_release_end_to_end() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let mocks = mock_publish(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let published = client(&server).publish_release(&options).await.unwrap();

    assert_eq!(published.upload.upload_id, UPLOAD_ID);
    assert_eq!(published.upload.release_id, RELEASE_ID);
    assert_eq!(published.upload.poll_attempts, 1);
    assert_eq!(published.release.id, RELEASE_ID);
    assert_eq!(published.release.version, "412");
    assert_eq!(
        published.release.download_url.as_deref(),
        Some("https://dl.appcenter.ms/app-release.apk")
    );

    mocks.slot.assert_hits_async(1).await;
    mocks.metadata.assert_hits_async(1).await;
    for chunk in &mocks.chunks {
        chunk.assert_hits_async(1).await;
    }
    mocks.finished.assert_hits_async(1).await;
    mocks.patch.assert_hits_async(1).await;
    mocks.status.assert_hits_async(1).await;
    mocks.release.assert_hits_async(1).await;
}

#[tokio::test]
async fn slot_request_carries_build_info() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let slot = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(api_path("uploads/releases"))
                .json_body(json!({ "build_version": "2.3.0", "build_number": "412" }));
            then.status(400).json_body(json!({ "code": "BadRequest" }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut options = ReleaseOptions::new(app(), artifact(&dir));
    options.build_version = Some("2.3.0".to_string());
    options.build_number = Some("412".to_string());

    let err = client(&server).publish_release(&options).await.unwrap_err();

    slot.assert_hits_async(1).await;
    assert_eq!(err.stage(), Some(PublishStage::RequestingSlot));
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn chunk_error_flag_fails_before_finalize() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let slot = mock_slot(&server).await;
    let metadata = mock_metadata(&server, json!([1, 2, 3])).await;
    let chunk_1 = mock_chunk(&server, 1, CHUNKS[0], false).await;
    let chunk_2 = mock_chunk(&server, 2, CHUNKS[1], true).await;
    let chunk_3 = mock_chunk(&server, 3, CHUNKS[2], false).await;
    let finished = mock_finished(&server).await;
    let patch = mock_patch(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let err = client(&server).publish_release(&options).await.unwrap_err();

    assert_eq!(err.stage(), Some(PublishStage::UploadingChunks));
    match err.root() {
        AppCenterError::ChunkRejected {
            chunk_id,
            error_code,
        } => {
            assert_eq!(*chunk_id, 2);
            assert_eq!(error_code, "ChunkCorrupted");
        }
        other => panic!("unexpected error: {other}"),
    }

    slot.assert_hits_async(1).await;
    metadata.assert_hits_async(1).await;
    // every chunk completes even though one failed
    chunk_1.assert_hits_async(1).await;
    chunk_2.assert_hits_async(1).await;
    chunk_3.assert_hits_async(1).await;
    finished.assert_hits_async(0).await;
    patch.assert_hits_async(0).await;
}

#[tokio::test]
async fn chunk_failure_waits_for_slow_chunks() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let delay = Duration::from_millis(1500);
    let server = MockServer::start_async().await;
    mock_slot(&server).await;
    mock_metadata(&server, json!([1, 2, 3])).await;
    let chunk_1 = mock_chunk(&server, 1, CHUNKS[0], true).await;
    let chunk_2 = mock_chunk(&server, 2, CHUNKS[1], false).await;
    let chunk_3 = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/upload/upload_chunk/{ASSET_ID}"))
                .query_param("block_number", "3")
                .body(CHUNKS[2]);
            then.status(200)
                .delay(delay)
                .json_body(json!({ "error": false }));
        })
        .await;
    let finished = mock_finished(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let started = Instant::now();
    let err = client(&server).publish_release(&options).await.unwrap_err();
    let elapsed = started.elapsed();

    // the first chunk is rejected right away but the error waits for chunk 3
    assert!(elapsed >= delay, "returned after {elapsed:?}");
    assert!(matches!(
        err.root(),
        AppCenterError::ChunkRejected { chunk_id: 1, .. }
    ));
    chunk_1.assert_hits_async(1).await;
    chunk_2.assert_hits_async(1).await;
    chunk_3.assert_hits_async(1).await;
    finished.assert_hits_async(0).await;
}

#[tokio::test]
async fn chunk_plan_mismatch_uploads_nothing() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    mock_slot(&server).await;
    mock_metadata(&server, json!([1, 2])).await;
    let chunk_1 = mock_chunk(&server, 1, CHUNKS[0], false).await;
    let finished = mock_finished(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let err = client(&server).publish_release(&options).await.unwrap_err();

    assert!(matches!(
        err.root(),
        AppCenterError::ChunkPlanMismatch {
            expected: 2,
            actual: 3
        }
    ));
    chunk_1.assert_hits_async(0).await;
    finished.assert_hits_async(0).await;
}

#[tokio::test]
async fn failed_processing_is_reported() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    mock_slot(&server).await;
    mock_metadata(&server, json!([1, 2, 3])).await;
    for (i, body) in CHUNKS.iter().enumerate() {
        mock_chunk(&server, i as u64 + 1, body, false).await;
    }
    mock_finished(&server).await;
    mock_patch(&server).await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(api_path(&format!("uploads/releases/{UPLOAD_ID}")));
            then.status(200).json_body(json!({
                "id": UPLOAD_ID,
                "upload_status": "error",
                "error_details": "Package is not signed"
            }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let err = client(&server).publish_release(&options).await.unwrap_err();

    status.assert_hits_async(1).await;
    assert_eq!(err.stage(), Some(PublishStage::PollingReadiness));
    assert!(err.to_string().contains("Package is not signed"));
}

#[tokio::test]
async fn polling_gives_up_after_max_attempts() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    mock_slot(&server).await;
    mock_metadata(&server, json!([1, 2, 3])).await;
    for (i, body) in CHUNKS.iter().enumerate() {
        mock_chunk(&server, i as u64 + 1, body, false).await;
    }
    mock_finished(&server).await;
    mock_patch(&server).await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(api_path(&format!("uploads/releases/{UPLOAD_ID}")));
            then.status(200)
                .json_body(json!({ "id": UPLOAD_ID, "upload_status": "uploadFinished" }));
        })
        .await;
    let release = mock_release(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), artifact(&dir));

    let err = client(&server).publish_release(&options).await.unwrap_err();

    // the test client allows five polls
    status.assert_hits_async(5).await;
    release.assert_hits_async(0).await;
    assert!(matches!(
        err.root(),
        AppCenterError::ReadinessTimeout { attempts: 5, .. }
    ));
}

#[tokio::test]
async fn missing_artifact_sends_nothing() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start_async().await;
    let slot = mock_slot(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let options = ReleaseOptions::new(app(), dir.path().join("missing.ipa"));

    let err = client(&server).publish_release(&options).await.unwrap_err();

    assert!(matches!(err, AppCenterError::InvalidArtifact(_)));
    slot.assert_hits_async(0).await;
}
