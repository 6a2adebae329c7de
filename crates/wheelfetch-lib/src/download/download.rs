use super::types::{ArtifactReport, DownloadAndCheckOptions, RunSummary};
use super::worker::ArtifactDownloader;
use crate::catalog::Catalog;
use crate::error::WheelFetchError;
use crate::progress::ProgressTracker;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Longest silence tolerated between two reads of a response.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client shared by the index lookups and all artifact transfers.
pub fn build_http_client() -> Result<reqwest::Client, WheelFetchError> {
    http_client(READ_TIMEOUT)
}

fn http_client(read_timeout: Duration) -> Result<reqwest::Client, WheelFetchError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("wheelfetch/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(read_timeout)
        .build()?;
    Ok(client)
}

/// Number of workers used for `jobs` units of work under `limit`.
pub fn effective_parallelism(limit: usize, jobs: usize) -> usize {
    limit.min(jobs).max(1)
}

/// Runs `task` for every item with at most `parallelism` running at once.
///
/// Every item yields exactly one output, in completion order. A task's error
/// is just another output and never stops its siblings.
pub(crate) async fn run_bounded<T, O, F, Fut>(items: Vec<T>, parallelism: usize, task: F) -> Vec<O>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = O>,
{
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut futs = FuturesUnordered::new();

    for item in items {
        let semaphore = semaphore.clone();
        let fut = task(item);
        futs.push(async move {
            // The semaphore is never closed, so acquiring cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();
            fut.await
        });
    }

    let mut outputs = Vec::with_capacity(futs.len());
    while let Some(output) = futs.next().await {
        outputs.push(output);
    }
    outputs
}

/// Validates or downloads every artifact of `catalog` into `output_dir`.
///
/// Returns once every artifact has been processed. Per-artifact failures are
/// collected in the summary; nothing here aborts the run early.
pub async fn download_and_check_all(
    catalog: &Catalog,
    output_dir: impl AsRef<Path>,
    client: reqwest::Client,
    options: DownloadAndCheckOptions,
    progress: Arc<ProgressTracker>,
) -> RunSummary {
    let output_dir = output_dir.as_ref();
    let parallelism = effective_parallelism(options.concurrency, catalog.len());
    let downloader = ArtifactDownloader::new(client, progress)
        .with_download_verification(options.verify_downloads);

    tracing::info!(
        package = catalog.package(),
        version = catalog.version(),
        artifacts = catalog.len(),
        parallelism,
        "Starting..."
    );

    let reports = run_bounded(catalog.artifacts().to_vec(), parallelism, |descriptor| {
        let downloader = downloader.clone();
        async move {
            let result = downloader.process(&descriptor, output_dir).await;
            if let Err(err) = &result {
                warn!(artifact = %descriptor.name, "Download failed: {:#}", err);
            }
            ArtifactReport { descriptor, result }
        }
    })
    .await;

    RunSummary { reports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_effective_parallelism() {
        assert_eq!(effective_parallelism(8, 3), 3);
        assert_eq!(effective_parallelism(8, 20), 8);
        assert_eq!(effective_parallelism(8, 0), 1);
        assert_eq!(effective_parallelism(0, 5), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_bounded_respects_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = run_bounded((0..32).collect(), 3, |i: usize| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .await;

        assert_eq!(outputs.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_run_bounded_collects_every_item_despite_failures() {
        let outputs = run_bounded((0..10).collect(), 4, |i: u32| async move {
            if i % 3 == 0 { Err(i) } else { Ok(i) }
        })
        .await;

        let mut seen: Vec<u32> = outputs.iter().map(|r| *r.as_ref().unwrap_or_else(|e| e)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(outputs.iter().filter(|r| r.is_err()).count(), 4);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new("pkg", "1.0", vec![]).unwrap();
        let summary = download_and_check_all(
            &catalog,
            dir.path(),
            reqwest::Client::new(),
            DownloadAndCheckOptions::default(),
            Arc::new(ProgressTracker::new(0)),
        )
        .await;
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_artifacts_are_all_reported() {
        use crate::catalog::ArtifactDescriptor;

        let dir = tempfile::tempdir().unwrap();
        let artifacts = ["a.whl", "b.whl", "c.whl"]
            .map(|name| ArtifactDescriptor::new(name, format!("http://127.0.0.1:9/{name}"), None, 0))
            .to_vec();
        let catalog = Catalog::new("pkg", "1.0", artifacts).unwrap();
        let progress = Arc::new(ProgressTracker::new(catalog.len()));

        let summary = download_and_check_all(
            &catalog,
            dir.path(),
            reqwest::Client::new(),
            DownloadAndCheckOptions::default(),
            progress.clone(),
        )
        .await;

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.failed_names(), "a.whl, b.whl, c.whl");
        assert_eq!(progress.snapshot().files_completed, 0);
    }

    #[tokio::test]
    async fn test_stalled_body_fails_only_that_artifact() {
        use crate::catalog::ArtifactDescriptor;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n0123456789")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let dir = tempfile::tempdir().unwrap();
        let descriptor =
            ArtifactDescriptor::new("stall.whl", format!("http://{addr}/stall.whl"), None, 100);
        let catalog = Catalog::new("pkg", "1.0", vec![descriptor]).unwrap();
        let progress = Arc::new(ProgressTracker::new(1));

        let summary = tokio::time::timeout(
            Duration::from_secs(10),
            download_and_check_all(
                &catalog,
                dir.path(),
                http_client(Duration::from_millis(200)).unwrap(),
                DownloadAndCheckOptions::default(),
                progress.clone(),
            ),
        )
        .await
        .expect("a stalled transfer must not hang the run");
        server.abort();

        assert!(matches!(
            summary.outcome_of("stall.whl"),
            Some(Err(WheelFetchError::Transfer { .. }))
        ));
        assert_eq!(progress.snapshot().per_file["stall.whl"].bytes_transferred, 10);
        assert_eq!(progress.snapshot().files_completed, 0);
    }
}
