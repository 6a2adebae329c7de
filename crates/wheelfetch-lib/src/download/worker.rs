use super::types::DownloadOutcome;
use crate::catalog::ArtifactDescriptor;
use crate::error::WheelFetchError;
use crate::progress::ProgressTracker;
use crate::verification::{
    ContentDigestHasher, DIGEST_CHUNK_SIZE, VerificationError, digest_file, digests_match,
};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Validates or fetches a single artifact.
#[derive(Clone)]
pub struct ArtifactDownloader {
    client: reqwest::Client,
    progress: Arc<ProgressTracker>,
    verify_downloads: bool,
}

impl ArtifactDownloader {
    pub fn new(client: reqwest::Client, progress: Arc<ProgressTracker>) -> Self {
        Self {
            client,
            progress,
            verify_downloads: false,
        }
    }

    /// Also compare the digest of freshly downloaded files within the same run.
    pub fn with_download_verification(mut self, verify_downloads: bool) -> Self {
        self.verify_downloads = verify_downloads;
        self
    }

    #[cfg(test)]
    fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Ensures `destination_dir/<name>` holds the artifact.
    ///
    /// An existing file whose SHA-256 matches the expected digest is kept and
    /// no request is made. A mismatching file is deleted before the transfer
    /// starts. A failed transfer leaves whatever was written in place; the
    /// next run detects it through the digest check.
    pub async fn process(
        &self,
        descriptor: &ArtifactDescriptor,
        destination_dir: &Path,
    ) -> Result<DownloadOutcome, WheelFetchError> {
        let name = descriptor.name.as_str();
        let url = descriptor.source_url.as_str();
        let output_path = destination_dir.join(name);

        if tokio::fs::try_exists(&output_path).await? {
            match descriptor.expected_digest.as_deref() {
                Some(expected) => {
                    let actual = digest_file(&output_path).await?;
                    if digests_match(&actual, expected) {
                        debug!(artifact = name, output = %output_path.display(), "File exists with matching digest, skipping download");
                        self.progress.advance_files_completed();
                        return Ok(DownloadOutcome::Skipped);
                    }

                    info!(artifact = name, output = %output_path.display(), expected, actual = %actual, "File exists with incorrect digest, deleting");
                    tokio::fs::remove_file(&output_path).await?;
                }
                None => {
                    debug!(artifact = name, output = %output_path.display(), "File exists but no digest is published, downloading again");
                }
            }
        }

        info!(artifact = name, url, output = %output_path.display(), "Downloading");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| WheelFetchError::transfer(name, url, e))?;

        let declared_total = response.content_length();
        self.progress.register_artifact(name, declared_total);

        // Unbuffered, so every counted byte has been handed to the file.
        let mut file = tokio::fs::File::create(&output_path)
            .await
            .map_err(|e| {
                WheelFetchError::transfer(
                    name,
                    url,
                    format!("failed to create {}: {e}", output_path.display()),
                )
            })?;

        let mut hasher = ContentDigestHasher::new();
        let mut bytes_written = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| WheelFetchError::transfer(name, url, e))?;

            for piece in chunk.chunks(DIGEST_CHUNK_SIZE) {
                file.write_all(piece).await.map_err(|e| {
                    WheelFetchError::transfer(
                        name,
                        url,
                        format!("failed to write {}: {e}", output_path.display()),
                    )
                })?;
                hasher.update(piece);
                bytes_written += piece.len() as u64;
                self.progress.advance_artifact_bytes(name, piece.len() as u64);
            }
        }

        file.flush().await.map_err(|e| {
            WheelFetchError::transfer(
                name,
                url,
                format!("failed to flush {}: {e}", output_path.display()),
            )
        })?;
        drop(file);

        self.progress.complete_artifact(name, bytes_written);

        if declared_total.is_some_and(|total| total != bytes_written) {
            warn!(artifact = name, declared = ?declared_total, received = bytes_written, "Content length differs from received byte count");
        }

        let digest = match descriptor.expected_digest.as_deref() {
            Some(expected) if self.verify_downloads => {
                hasher.verify(expected).map_err(|err| match err {
                    VerificationError::VerificationFailed { expected, actual } => {
                        WheelFetchError::ChecksumMismatch {
                            artifact: name.to_string(),
                            expected,
                            actual,
                        }
                    }
                })?
            }
            _ => hasher.finalize_hex(),
        };
        debug!(artifact = name, sha256 = %digest, bytes = bytes_written, "Transfer finished");

        self.progress.advance_files_completed();
        info!(artifact = name, bytes = bytes_written, "Downloaded");
        Ok(DownloadOutcome::Completed { bytes_written })
    }
}
