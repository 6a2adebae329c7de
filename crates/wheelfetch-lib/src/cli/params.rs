use crate::catalog::VersionSelector;
use crate::download::DownloadAndCheckOptions;
use indicatif::MultiProgress;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct DownloadParams {
    pub package: String,
    pub index_url: Url,
    pub version: VersionSelector,
    pub download_dir: PathBuf,
    pub options: DownloadAndCheckOptions,
    pub fail_on_error: bool,
    /// Where progress bars are drawn; `None` disables them.
    pub progress_output: Option<MultiProgress>,
}
