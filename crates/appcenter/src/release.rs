//! Release attachments: groups, stores, testers, notes and symbols

use std::path::Path;

use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::file::LocalFile;
use crate::transport::{ApiRequest, Transport};
use crate::types::{App, Group, Release, ReleaseOptions, Store, SymbolType, SymbolUploadSlot};

#[derive(Serialize)]
struct GroupAssignment<'a> {
    id: &'a str,
    mandatory_update: bool,
    notify_testers: bool,
}

#[derive(Serialize)]
struct StoreAssignment<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct TesterAssignment<'a> {
    email: &'a str,
    mandatory_update: bool,
    notify_testers: bool,
}

#[derive(Serialize)]
struct SymbolUploadRequest<'a> {
    symbol_type: SymbolType,
    file_name: &'a str,
    build: &'a str,
    version: &'a str,
}

/// Operations on one release, addressed by its numeric id
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    transport: Transport,
    endpoints: Endpoints,
    app: App,
    release_id: u64,
}

impl ReleaseClient {
    pub(crate) fn new(transport: Transport, endpoints: Endpoints, app: App, release_id: u64) -> Self {
        Self {
            transport,
            endpoints,
            app,
            release_id,
        }
    }

    pub fn release_id(&self) -> u64 {
        self.release_id
    }

    fn url(&self, segments: &[&str]) -> Url {
        let id = self.release_id.to_string();
        let mut path = vec!["releases", id.as_str()];
        path.extend_from_slice(segments);
        self.endpoints.app(&self.app, &path)
    }

    /// Distribute the release to a group
    pub async fn add_group(&self, group: &Group, options: &ReleaseOptions) -> Result<()> {
        let request = ApiRequest::new("add group", Method::POST, self.url(&["groups"])).json(
            &GroupAssignment {
                id: &group.id,
                mandatory_update: options.mandatory,
                notify_testers: options.notify_testers,
            },
        )?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::CREATED)?;

        info!(group = %group.name, release_id = self.release_id, "Added release to group");
        Ok(())
    }

    /// Distribute the release to a store
    pub async fn add_store(&self, store: &Store) -> Result<()> {
        let request = ApiRequest::new("add store", Method::POST, self.url(&["stores"]))
            .json(&StoreAssignment { id: &store.id })?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::CREATED)?;

        info!(store = %store.name, release_id = self.release_id, "Added release to store");
        Ok(())
    }

    /// Distribute the release to a single tester
    pub async fn add_tester(&self, email: &str, options: &ReleaseOptions) -> Result<()> {
        let request = ApiRequest::new("add tester", Method::POST, self.url(&["testers"])).json(
            &TesterAssignment {
                email,
                mandatory_update: options.mandatory,
                notify_testers: options.notify_testers,
            },
        )?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::CREATED)?;

        info!(tester = %email, release_id = self.release_id, "Added release to tester");
        Ok(())
    }

    /// Replace the release notes
    pub async fn set_release_notes(&self, notes: &str) -> Result<()> {
        let request = ApiRequest::new("set release notes", Method::PUT, self.url(&[]))
            .json(&serde_json::json!({ "release_notes": notes }))?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::OK)?;

        info!(release_id = self.release_id, "Release notes updated");
        Ok(())
    }

    /// Upload a ProGuard mapping or dSYM archive for `release`
    ///
    /// Reserves a symbol upload, PUTs the file to the returned blob URL and
    /// commits it.
    #[instrument(skip_all, fields(release_id = self.release_id, path = %path.display()))]
    pub async fn upload_symbol(&self, release: &Release, path: &Path) -> Result<()> {
        let file = LocalFile::open(path).await?;
        let symbol_type = SymbolType::for_release(release);
        let file_name = file.file_name();

        let url = self.endpoints.app(&self.app, &["symbol_uploads"]);
        let request = ApiRequest::new("create symbol upload", Method::POST, url).json(
            &SymbolUploadRequest {
                symbol_type,
                file_name: &file_name,
                build: &release.version,
                version: &release.short_version,
            },
        )?;

        let slot: SymbolUploadSlot = self
            .transport
            .send(request)
            .await?
            .expect_status(StatusCode::OK)?
            .json()?;

        debug!(
            symbol_upload_id = %slot.symbol_upload_id,
            expires = ?slot.expiration_date,
            "Symbol upload reserved"
        );

        let blob_url = Url::parse(&slot.upload_url)?;
        let request = ApiRequest::new("upload symbol file", Method::PUT, blob_url)
            .header("x-ms-blob-type", HeaderValue::from_static("BlockBlob"))
            .bytes(file.bytes());

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::CREATED)?;

        let url = self
            .endpoints
            .app(&self.app, &["symbol_uploads", slot.symbol_upload_id.as_str()]);
        let request = ApiRequest::new("commit symbol upload", Method::PATCH, url)
            .json(&serde_json::json!({ "status": "committed" }))?;

        self.transport
            .send(request)
            .await?
            .expect_status(StatusCode::OK)?;

        info!(
            symbol_type = ?symbol_type,
            file_name = %file_name,
            "Symbol file uploaded"
        );
        Ok(())
    }
}
