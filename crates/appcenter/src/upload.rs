//! Parallel chunk upload to the App Center upload domain

use futures_util::future::join_all;
use reqwest::{Method, StatusCode, Url};
use tracing::{debug, info, warn};

use crate::error::{AppCenterError, Result};
use crate::file::{FileChunk, LocalFile};
use crate::transport::{ApiRequest, Transport};
use crate::types::{ChunkPlan, ChunkUploadResponse, UploadSession};

/// Uploads every chunk of a file concurrently
///
/// One task is spawned per chunk. All tasks run to completion before the
/// outcome is decided; a failed chunk does not cancel the others.
#[derive(Debug, Clone)]
pub struct ChunkedUploader {
    transport: Transport,
}

impl ChunkedUploader {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Upload `file` following the server's chunk plan
    ///
    /// Fails with the first failing chunk (in file order) once every chunk
    /// has finished.
    pub async fn upload(
        &self,
        session: &UploadSession,
        file: &LocalFile,
        plan: &ChunkPlan,
    ) -> Result<()> {
        let chunks = file.chunks(plan.chunk_size)?;
        if chunks.len() != plan.chunk_list.len() {
            return Err(AppCenterError::ChunkPlanMismatch {
                expected: plan.chunk_list.len(),
                actual: chunks.len(),
            });
        }

        let urls = plan
            .chunk_list
            .iter()
            .map(|&id| {
                upload_domain_url(
                    session,
                    "upload_chunk",
                    &[("block_number", id.to_string())],
                )
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            chunks = chunks.len(),
            chunk_size = plan.chunk_size,
            "Uploading chunks"
        );

        let tasks = plan
            .chunk_list
            .iter()
            .zip(chunks)
            .zip(urls)
            .map(|((&chunk_id, chunk), url)| {
                let transport = self.transport.clone();
                tokio::spawn(async move { upload_chunk(&transport, url, chunk_id, chunk).await })
            });

        let results = join_all(tasks).await;

        let mut first_error = None;
        let mut failed = 0usize;
        for (result, chunk_id) in results.into_iter().zip(&plan.chunk_list) {
            let outcome = result.map_err(AppCenterError::from).and_then(|r| r);
            if let Err(e) = outcome {
                failed += 1;
                warn!(chunk_id, error = %e, "Chunk upload failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => {
                warn!(failed, total = plan.chunk_list.len(), "Chunk upload incomplete");
                Err(e)
            }
            None => {
                info!("Chunk upload finished");
                Ok(())
            }
        }
    }
}

async fn upload_chunk(
    transport: &Transport,
    url: Url,
    chunk_id: u64,
    chunk: FileChunk,
) -> Result<()> {
    debug!(chunk_id, size = chunk.len(), "Uploading chunk");

    let request = ApiRequest::new("upload chunk", Method::POST, url).bytes(chunk.data());
    let response = transport.send(request).await?;

    let parsed = response.json::<ChunkUploadResponse>();
    if let Ok(ref body) = parsed {
        if body.error {
            return Err(AppCenterError::ChunkRejected {
                chunk_id,
                error_code: body.error_code.clone().unwrap_or_default(),
            });
        }
    }

    let response = response.expect_status(StatusCode::OK)?;
    if !response.body().trim().is_empty() {
        parsed?;
    }

    debug!(chunk_id, "Chunk uploaded");
    Ok(())
}

/// `{upload_domain}/upload/{action}/{package_asset_id}?...&token=...`
pub(crate) fn upload_domain_url(
    session: &UploadSession,
    action: &str,
    query: &[(&str, String)],
) -> Result<Url> {
    let mut url = Url::parse(&session.upload_domain)?;
    url.path_segments_mut()
        .map_err(|_| {
            AppCenterError::Configuration(format!(
                "upload domain is not a base URL: {}",
                session.upload_domain
            ))
        })?
        .pop_if_empty()
        .extend(["upload", action, session.package_asset_id.as_str()]);

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("token", &session.token);
    }

    Ok(url)
}
