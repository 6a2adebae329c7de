use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PACKAGE: &str = "mediapipe";
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";
pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloaded_wheels";
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Optional settings file. Command line arguments take precedence over every
/// field set here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project whose wheels are fetched
    #[serde(default)]
    pub package: Option<String>,
    /// Base URL of a PyPI-compatible index exposing the JSON API
    #[serde(default)]
    pub index_url: Option<String>,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub verify_downloads: Option<bool>,
    /// Exit with failure when any artifact could not be downloaded
    #[serde(default)]
    pub fail_on_error: Option<bool>,
}
