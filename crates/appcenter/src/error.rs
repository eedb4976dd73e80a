//! App Center error types

use thiserror::Error;

use crate::publish::PublishStage;

/// App Center client errors
#[derive(Debug, Error)]
pub enum AppCenterError {
    /// No response was obtained (connection, TLS, timeout)
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response arrived with a status code the operation does not accept
    #[error(
        "{operation}: invalid status code: {status}, url: {url}, body: {}",
        .request_body.as_deref().unwrap_or("<empty>")
    )]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        url: String,
        request_body: Option<String>,
        response_body: String,
    },

    /// The response body does not have the expected shape
    #[error("{operation}: failed to decode response from {url}: {message}, response: {body}")]
    Decode {
        operation: &'static str,
        url: String,
        message: String,
        body: String,
    },

    /// The upload domain flagged a chunk as failed
    #[error("failed to upload chunk, chunk id: {chunk_id}, error code: {error_code}")]
    ChunkRejected { chunk_id: u64, error_code: String },

    /// The server returned a different number of chunk ids than the file has chunks
    #[error("chunk plan mismatch: server listed {expected} chunk(s), file has {actual}")]
    ChunkPlanMismatch { expected: usize, actual: usize },

    /// Chunk size of zero
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    /// An entity carried an explicit error object
    #[error("API error: {code}: {message}")]
    Api { code: String, message: String },

    /// Server-side processing of the upload ended in an error state
    #[error("release processing failed: {details}")]
    ProcessingFailed { details: String },

    /// Polling gave up before the release became ready
    #[error("timed out waiting for release readiness after {attempts} attempt(s) ({elapsed_secs}s)")]
    ReadinessTimeout { attempts: u32, elapsed_secs: u64 },

    /// A publish step failed
    #[error("publish failed while {stage}: {source}")]
    PublishFailed {
        stage: PublishStage,
        #[source]
        source: Box<AppCenterError>,
    },

    /// Invalid artifact
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A chunk upload task panicked or was cancelled
    #[error("chunk upload task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// The API token cannot be sent as a header value
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// URL parse error
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppCenterError {
    /// The innermost error, looking through [`AppCenterError::PublishFailed`]
    pub fn root(&self) -> &AppCenterError {
        match self {
            AppCenterError::PublishFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// The publish stage an error happened in, if it came from the publisher
    pub fn stage(&self) -> Option<PublishStage> {
        match self {
            AppCenterError::PublishFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// HTTP status of an unexpected-status error
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            AppCenterError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for App Center operations
pub type Result<T> = std::result::Result<T, AppCenterError>;
