//! App-level operations: lookups and publishing

use reqwest::{Method, StatusCode};
use tracing::{info, instrument};

use crate::endpoints::Endpoints;
use crate::error::{AppCenterError, Result};
use crate::publish::{PollPolicy, ReadyRelease, ReleasePublisher};
use crate::release::ReleaseClient;
use crate::transport::{ApiRequest, Transport};
use crate::types::{check_entity_error, App, Group, Release, ReleaseOptions, Store};

/// A published release together with its upload bookkeeping
#[derive(Debug, Clone)]
pub struct PublishedRelease {
    pub upload: ReadyRelease,
    pub release: Release,
}

/// Operations on one App Center app
#[derive(Debug, Clone)]
pub struct AppClient {
    transport: Transport,
    endpoints: Endpoints,
    poll: PollPolicy,
    app: App,
}

impl AppClient {
    pub(crate) fn new(transport: Transport, endpoints: Endpoints, poll: PollPolicy, app: App) -> Self {
        Self {
            transport,
            endpoints,
            poll,
            app,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Distribution group by name
    pub async fn get_group(&self, name: &str) -> Result<Group> {
        let url = self.endpoints.app(&self.app, &["distribution_groups", name]);
        let group: Group = self
            .transport
            .send(ApiRequest::new("get group", Method::GET, url))
            .await?
            .expect_status(StatusCode::OK)?
            .json()?;

        check_entity_error(&group.error)?;
        Ok(group)
    }

    /// Distribution store by name
    pub async fn get_store(&self, name: &str) -> Result<Store> {
        let url = self.endpoints.app(&self.app, &["distribution_stores", name]);
        let store: Store = self
            .transport
            .send(ApiRequest::new("get store", Method::GET, url))
            .await?
            .expect_status(StatusCode::OK)?
            .json()?;

        check_entity_error(&store.error)?;
        Ok(store)
    }

    /// Release details
    pub async fn get_release(&self, release_id: u64) -> Result<Release> {
        let id = release_id.to_string();
        let url = self.endpoints.app(&self.app, &["releases", id.as_str()]);
        let release: Release = self
            .transport
            .send(ApiRequest::new("get release", Method::GET, url))
            .await?
            .expect_status(StatusCode::OK)?
            .json()?;

        check_entity_error(&release.error)?;
        Ok(release)
    }

    /// Upload the binary, wait for processing and fetch the release details
    #[instrument(skip_all, fields(file = %options.file_path.display()))]
    pub async fn publish_release(&self, options: &ReleaseOptions) -> Result<PublishedRelease> {
        if options.app != self.app {
            return Err(AppCenterError::Configuration(format!(
                "release options target {}/{}, client is scoped to {}/{}",
                options.app.owner, options.app.name, self.app.owner, self.app.name
            )));
        }

        let publisher =
            ReleasePublisher::new(self.transport.clone(), self.endpoints.clone(), self.poll);
        let upload = publisher.publish(options).await?;
        let release = self.get_release(upload.release_id).await?;

        info!(
            release_id = release.id,
            version = %release.version,
            short_version = %release.short_version,
            "Release published"
        );

        Ok(PublishedRelease { upload, release })
    }

    /// Attachment operations for an existing release
    pub fn release(&self, release_id: u64) -> ReleaseClient {
        ReleaseClient::new(
            self.transport.clone(),
            self.endpoints.clone(),
            self.app.clone(),
            release_id,
        )
    }
}
