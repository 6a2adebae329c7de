use crate::catalog::{CatalogResolver, PyPiIndex};
use crate::cli::params::DownloadParams;
use crate::download::{RunSummary, build_http_client, download_and_check_all};
use crate::error::WheelFetchError;
use crate::progress::{DEFAULT_REFRESH_INTERVAL, ProgressRenderTask, ProgressTracker};
use std::sync::Arc;

pub async fn run_download(params: DownloadParams) -> Result<RunSummary, WheelFetchError> {
    let DownloadParams {
        package,
        index_url,
        version,
        download_dir,
        options,
        fail_on_error,
        progress_output,
    } = params;

    let client = build_http_client()?;
    let index = Arc::new(PyPiIndex::new(client.clone(), index_url));
    let resolver = CatalogResolver::new(index, package);

    let version = resolver.resolve_version(&version).await?;
    let catalog = resolver.list_artifacts(&version).await?;
    if catalog.is_empty() {
        return Err(WheelFetchError::NoArtifacts {
            package: resolver.package().to_string(),
            version,
        });
    }

    tokio::fs::create_dir_all(&download_dir)
        .await
        .map_err(|e| WheelFetchError::DownloadDirectoryCreation {
            path: download_dir.clone(),
            reason: e.to_string(),
        })?;

    tracing::info!(
        "Processing {} wheels for {}=={} into {}",
        catalog.len(),
        catalog.package(),
        catalog.version(),
        download_dir.display()
    );

    let progress = Arc::new(ProgressTracker::new(catalog.len()));
    let renderer = progress_output.map(|multi| {
        ProgressRenderTask::spawn(progress.clone(), multi, DEFAULT_REFRESH_INTERVAL)
    });

    let summary =
        download_and_check_all(&catalog, &download_dir, client, options, progress).await;

    if let Some(renderer) = renderer {
        renderer.finish().await;
    }

    for (descriptor, err) in summary.failures() {
        tracing::error!(artifact = %descriptor.name, "Error: {}", err);
    }

    tracing::info!(
        skipped = summary.skipped(),
        downloaded = summary.completed(),
        failed = summary.failed(),
        bytes = summary.bytes_written(),
        "All downloads complete."
    );

    if fail_on_error && summary.failed() > 0 {
        tracing::error!("Failed downloads: {}", summary.failed_names());
        return Err(WheelFetchError::DownloadsFailed {
            failed: summary.failed(),
            total: summary.len(),
        });
    }

    Ok(summary)
}
