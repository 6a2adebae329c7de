#[allow(clippy::module_inception)]
mod download;
mod types;
mod worker;

pub use download::{build_http_client, download_and_check_all, effective_parallelism};
pub use types::{
    ArtifactReport, DownloadAndCheckOptions, DownloadOutcome, MAX_CONCURRENCY, RunSummary,
};
pub use worker::ArtifactDownloader;
