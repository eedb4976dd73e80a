//! Release publishing
//!
//! Drives one binary from upload slot to a distributable release:
//!
//! ```text
//! RequestingSlot -> SettingMetadata -> UploadingChunks -> FinalizingUpload
//!     -> PatchingRelease -> PollingReadiness -> Ready
//! ```
//!
//! Any failure stops the sequence and is reported as
//! [`AppCenterError::PublishFailed`] with the stage it happened in. The upload
//! slot is left on the server.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::endpoints::Endpoints;
use crate::error::{AppCenterError, Result};
use crate::file::LocalFile;
use crate::transport::{ApiRequest, Transport};
use crate::types::{
    App, ChunkPlan, ReleaseOptions, ReleaseUploadStatus, UploadSession, UPLOAD_FINISHED,
};
use crate::upload::{upload_domain_url, ChunkedUploader};

/// Step of the publish sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    RequestingSlot,
    SettingMetadata,
    UploadingChunks,
    FinalizingUpload,
    PatchingRelease,
    PollingReadiness,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishStage::RequestingSlot => write!(f, "requesting upload slot"),
            PublishStage::SettingMetadata => write!(f, "setting upload metadata"),
            PublishStage::UploadingChunks => write!(f, "uploading chunks"),
            PublishStage::FinalizingUpload => write!(f, "finalizing upload"),
            PublishStage::PatchingRelease => write!(f, "patching release"),
            PublishStage::PollingReadiness => write!(f, "polling readiness"),
        }
    }
}

/// Bounds and pacing for readiness polling
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Shortest wait between polls
    pub interval_min: Duration,
    /// Longest wait between polls
    pub interval_max: Duration,
    /// Polls before giving up
    pub max_attempts: u32,
    /// Overall time budget
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_min: Duration::from_secs(5),
            interval_max: Duration::from_secs(10),
            max_attempts: 120,
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PollPolicy {
    /// Uniformly jittered wait in `[interval_min, interval_max]`
    pub fn next_delay(&self) -> Duration {
        if self.interval_max <= self.interval_min {
            return self.interval_min;
        }
        rand::thread_rng().gen_range(self.interval_min..=self.interval_max)
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyRelease {
    /// Release upload id
    pub upload_id: String,
    /// Numeric release id used by every release endpoint
    pub release_id: u64,
    /// Status polls it took, including the ready one
    pub poll_attempts: u32,
}

/// Runs the upload and processing sequence for one binary
#[derive(Debug, Clone)]
pub struct ReleasePublisher {
    transport: Transport,
    endpoints: Endpoints,
    uploader: ChunkedUploader,
    poll: PollPolicy,
}

impl ReleasePublisher {
    pub(crate) fn new(transport: Transport, endpoints: Endpoints, poll: PollPolicy) -> Self {
        Self {
            uploader: ChunkedUploader::new(transport.clone()),
            transport,
            endpoints,
            poll,
        }
    }

    /// Upload `options.file_path` and wait until App Center made a release of it
    #[instrument(skip_all, fields(owner = %options.app.owner, app = %options.app.name))]
    pub async fn publish(&self, options: &ReleaseOptions) -> Result<ReadyRelease> {
        let file = LocalFile::open(&options.file_path).await?;
        let app = &options.app;

        let session = stage(PublishStage::RequestingSlot, self.request_slot(options)).await?;
        info!(
            upload_id = %session.id,
            package_asset_id = %session.package_asset_id,
            "Upload slot created"
        );

        let plan = stage(
            PublishStage::SettingMetadata,
            self.set_metadata(&session, &file),
        )
        .await?;

        stage(
            PublishStage::UploadingChunks,
            self.uploader.upload(&session, &file, &plan),
        )
        .await?;

        stage(PublishStage::FinalizingUpload, self.finish_upload(&session)).await?;
        stage(
            PublishStage::PatchingRelease,
            self.mark_upload_finished(app, &session),
        )
        .await?;

        let (release_id, poll_attempts) = stage(
            PublishStage::PollingReadiness,
            wait_until_ready(&self.poll, || self.upload_status(app, &session)),
        )
        .await?;

        info!(release_id, "Release created");

        Ok(ReadyRelease {
            upload_id: session.id,
            release_id,
            poll_attempts,
        })
    }

    async fn request_slot(&self, options: &ReleaseOptions) -> Result<UploadSession> {
        #[derive(Serialize)]
        struct SlotRequest<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            build_version: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            build_number: Option<&'a str>,
        }

        let url = self.endpoints.app(&options.app, &["uploads", "releases"]);
        let mut request = ApiRequest::new("create upload slot", Method::POST, url);

        if options.build_version.is_some() || options.build_number.is_some() {
            request = request.json(&SlotRequest {
                build_version: options.build_version.as_deref(),
                build_number: options.build_number.as_deref(),
            })?;
        }

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::CREATED)?
            .json()
    }

    async fn set_metadata(&self, session: &UploadSession, file: &LocalFile) -> Result<ChunkPlan> {
        info!(file_name = %file.file_name(), file_size = file.size(), "Setting upload metadata");

        let url = upload_domain_url(
            session,
            "set_metadata",
            &[
                ("file_name", file.file_name()),
                ("file_size", file.size().to_string()),
            ],
        )?;

        let plan: ChunkPlan = self
            .transport
            .send(ApiRequest::new("set upload metadata", Method::POST, url))
            .await?
            .expect_status(StatusCode::OK)?
            .json()?;

        info!(
            chunk_size = plan.chunk_size,
            chunks = plan.chunk_list.len(),
            "Upload metadata accepted"
        );
        Ok(plan)
    }

    async fn finish_upload(&self, session: &UploadSession) -> Result<()> {
        let url = upload_domain_url(session, "finished", &[])?;
        self.transport
            .send(ApiRequest::new("finish upload", Method::POST, url))
            .await?
            .expect_status(StatusCode::OK)?;

        info!("Upload finished");
        Ok(())
    }

    async fn mark_upload_finished(&self, app: &App, session: &UploadSession) -> Result<()> {
        let url = self
            .endpoints
            .app(app, &["uploads", "releases", session.id.as_str()]);
        let request = ApiRequest::new("patch release upload", Method::PATCH, url)
            .json(&serde_json::json!({ "upload_status": UPLOAD_FINISHED }))?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::OK)?;

        info!("Release patched");
        Ok(())
    }

    async fn upload_status(&self, app: &App, session: &UploadSession) -> Result<ReleaseUploadStatus> {
        let url = self
            .endpoints
            .app(app, &["uploads", "releases", session.id.as_str()]);

        self.transport
            .send(ApiRequest::new("get upload status", Method::GET, url))
            .await?
            .expect_status(StatusCode::OK)?
            .json()
    }
}

async fn stage<T>(stage: PublishStage, step: impl Future<Output = Result<T>>) -> Result<T> {
    debug!(stage = %stage, "Entering publish stage");
    step.await.map_err(|e| AppCenterError::PublishFailed {
        stage,
        source: Box::new(e),
    })
}

/// Poll until the upload is `readyToBePublished`
///
/// Returns the release id from the ready response and the number of polls.
/// Fails on a terminal error status, or once `max_attempts` polls or
/// `timeout` have been spent.
pub async fn wait_until_ready<F, Fut>(policy: &PollPolicy, mut fetch: F) -> Result<(u64, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ReleaseUploadStatus>>,
{
    info!("Waiting for the release to get ready");

    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let status = fetch().await?;

        if status.is_ready() {
            return match status.release_distinct_id {
                Some(id) => Ok((id, attempts)),
                None => Err(AppCenterError::ProcessingFailed {
                    details: format!("upload {} is ready but has no release id", status.id),
                }),
            };
        }

        if status.is_failed() {
            return Err(AppCenterError::ProcessingFailed {
                details: status
                    .error_details
                    .unwrap_or_else(|| format!("upload status {}", status.upload_status)),
            });
        }

        if attempts >= policy.max_attempts || start.elapsed() >= policy.timeout {
            return Err(AppCenterError::ReadinessTimeout {
                attempts,
                elapsed_secs: start.elapsed().as_secs(),
            });
        }

        let delay = policy.next_delay();
        info!(
            attempt = attempts,
            status = %status.upload_status,
            "Waiting for {}s",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }
}
