//! Common types for App Center requests and responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppCenterError, Result};

/// Owner/name pair identifying an App Center app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// User or organization name
    pub owner: String,
    /// App name as used in API paths
    pub name: String,
}

impl App {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

/// Options for one deploy run
///
/// Built once from the step configuration and shared by every request of the
/// run.
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Target app
    pub app: App,

    /// Path to the binary (IPA, APK, AAB, ...)
    pub file_path: PathBuf,

    /// Force testers to install the release
    pub mandatory: bool,

    /// Notify testers about the new release
    pub notify_testers: bool,

    /// Build version sent with the upload slot request
    pub build_version: Option<String>,

    /// Build number sent with the upload slot request
    pub build_number: Option<String>,

    /// Distribution group names
    pub group_names: Vec<String>,

    /// Distribution store names
    pub store_names: Vec<String>,

    /// Tester emails
    pub testers: Vec<String>,

    /// Release notes
    pub release_notes: Option<String>,

    /// Mapping file (Android) or zipped dSYM (Apple) to upload as symbols
    pub symbol_path: Option<PathBuf>,
}

impl ReleaseOptions {
    pub fn new(app: App, file_path: impl Into<PathBuf>) -> Self {
        Self {
            app,
            file_path: file_path.into(),
            mandatory: false,
            notify_testers: false,
            build_version: None,
            build_number: None,
            group_names: Vec::new(),
            store_names: Vec::new(),
            testers: Vec::new(),
            release_notes: None,
            symbol_path: None,
        }
    }
}

// -----------------------------------------------------------------------------
// Upload session
// -----------------------------------------------------------------------------

/// Upload slot handed out by `POST .../uploads/releases`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSession {
    /// Release upload id, used to patch and poll the upload
    pub id: String,
    /// Asset id on the upload domain
    pub package_asset_id: String,
    /// Base URL of the upload service
    pub upload_domain: String,
    /// Upload token
    pub token: String,
    /// Same token, already URL-encoded by the server
    #[serde(default)]
    pub url_encoded_token: String,
}

/// Chunking instructions returned by the metadata call
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkPlan {
    #[serde(default)]
    pub id: Option<String>,
    /// Size of every chunk except the last, in bytes
    pub chunk_size: u64,
    /// Block numbers, one per chunk, in file order
    pub chunk_list: Vec<u64>,
    #[serde(default)]
    pub blob_partitions: Option<u64>,
}

/// Body of a chunk upload response
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChunkUploadResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// `upload_status` value once the release can be distributed
pub const READY_TO_BE_PUBLISHED: &str = "readyToBePublished";

/// `upload_status` value sent to commit an upload
pub const UPLOAD_FINISHED: &str = "uploadFinished";

/// Poll response of `GET .../uploads/releases/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseUploadStatus {
    #[serde(default)]
    pub id: String,
    pub upload_status: String,
    /// Set once the upload is ready
    #[serde(default)]
    pub release_distinct_id: Option<u64>,
    #[serde(default)]
    pub error_details: Option<String>,
}

impl ReleaseUploadStatus {
    pub fn is_ready(&self) -> bool {
        self.upload_status == READY_TO_BE_PUBLISHED
    }

    /// States that never turn into `readyToBePublished`
    pub fn is_failed(&self) -> bool {
        matches!(self.upload_status.as_str(), "error" | "malwareDetected")
    }
}

// -----------------------------------------------------------------------------
// Releases, groups, stores
// -----------------------------------------------------------------------------

/// Error object some App Center entities carry in their body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for EntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Turn an entity's embedded error into [`AppCenterError::Api`]
pub(crate) fn check_entity_error(error: &Option<EntityError>) -> Result<()> {
    match error {
        Some(e) if !e.code.is_empty() => Err(AppCenterError::Api {
            code: e.code.clone(),
            message: e.message.clone(),
        }),
        _ => Ok(()),
    }
}

/// Reference to a group or store a release is distributed to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Build information attached to a release
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

/// Release details from `GET .../releases/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub id: u64,
    pub app_name: String,
    pub app_display_name: String,
    /// Operating system, e.g. `Android` or `iOS`
    pub app_os: String,
    /// Build number / version code
    pub version: String,
    /// User-facing version
    pub short_version: String,
    pub release_notes: Option<String>,
    pub size: Option<u64>,
    pub min_os: Option<String>,
    pub bundle_identifier: Option<String>,
    pub fingerprint: Option<String>,
    pub uploaded_at: Option<String>,
    pub download_url: Option<String>,
    pub install_url: Option<String>,
    pub app_icon_url: Option<String>,
    pub enabled: bool,
    pub distribution_groups: Vec<DestinationRef>,
    pub distribution_stores: Vec<DestinationRef>,
    pub build: Option<BuildInfo>,
    pub error: Option<EntityError>,
}

impl Release {
    pub fn is_android(&self) -> bool {
        self.app_os == "Android"
    }
}

/// Distribution group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub origin: Option<String>,
    pub is_public: bool,
    pub error: Option<EntityError>,
}

/// Distribution store (Google Play, App Store Connect, Intune)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: Option<String>,
    pub track: Option<String>,
    pub service_connection_id: Option<String>,
    pub created_by: Option<String>,
    pub error: Option<EntityError>,
}

// -----------------------------------------------------------------------------
// Symbols
// -----------------------------------------------------------------------------

/// Kind of symbol file accepted by `symbol_uploads`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolType {
    /// ProGuard/R8 mapping file
    AndroidProguard,
    /// dSYM bundle
    Apple,
}

impl SymbolType {
    /// Symbol type matching a release's platform
    pub fn for_release(release: &Release) -> Self {
        if release.is_android() {
            SymbolType::AndroidProguard
        } else {
            SymbolType::Apple
        }
    }
}

/// Upload slot for a symbol file
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolUploadSlot {
    pub symbol_upload_id: String,
    /// Pre-signed blob URL
    pub upload_url: String,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
}
