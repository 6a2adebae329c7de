use crate::error::WheelFetchError;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

/// `packagetype` marker of binary wheels in the PyPI JSON API.
pub const WHEEL_PACKAGE_TYPE: &str = "bdist_wheel";

/// A file entry of a release as listed by the index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub url: String,
    pub packagetype: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digests: ReleaseFileDigests,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReleaseFileDigests {
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ReleaseFile {
    pub fn is_wheel(&self) -> bool {
        self.packagetype == WHEEL_PACKAGE_TYPE
    }
}

/// Metadata lookups the catalog resolver needs from a package index.
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// Newest published version of `package`.
    async fn latest_version(&self, package: &str) -> Result<String, WheelFetchError>;

    /// All distribution files of one release of `package`.
    async fn release_files(
        &self,
        package: &str,
        version: &str,
    ) -> Result<Vec<ReleaseFile>, WheelFetchError>;
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    info: ProjectInfo,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    #[serde(default)]
    urls: Vec<ReleaseFile>,
}

/// Client for the PyPI JSON API (`/pypi/<project>/json`).
#[derive(Debug, Clone)]
pub struct PyPiIndex {
    client: reqwest::Client,
    base_url: Url,
}

impl PyPiIndex {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, WheelFetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                WheelFetchError::metadata_unavailable(
                    self.base_url.as_str(),
                    "index URL cannot be used as a base",
                )
            })?
            .pop_if_empty()
            .push("pypi")
            .extend(segments)
            .push("json");
        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, WheelFetchError> {
        tracing::debug!(url = %url, "Querying package index");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| WheelFetchError::metadata_unavailable(url.as_str(), e))?
            .error_for_status()
            .map_err(|e| WheelFetchError::metadata_unavailable(url.as_str(), e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| WheelFetchError::metadata_unavailable(url.as_str(), e))?;

        serde_json::from_slice(&body).map_err(|e| {
            WheelFetchError::metadata_unavailable(url.as_str(), format!("invalid response: {e}"))
        })
    }
}

#[async_trait]
impl PackageIndex for PyPiIndex {
    async fn latest_version(&self, package: &str) -> Result<String, WheelFetchError> {
        let url = self.endpoint(&[package])?;
        let project: ProjectResponse = self.fetch_json(url).await?;
        Ok(project.info.version)
    }

    async fn release_files(
        &self,
        package: &str,
        version: &str,
    ) -> Result<Vec<ReleaseFile>, WheelFetchError> {
        let url = self.endpoint(&[package, version])?;
        let release: ReleaseResponse = self.fetch_json(url).await?;
        Ok(release.urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(base: &str) -> PyPiIndex {
        PyPiIndex::new(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn test_endpoint_for_bare_host() {
        let url = index("https://pypi.org").endpoint(&["mediapipe"]).unwrap();
        assert_eq!(url.as_str(), "https://pypi.org/pypi/mediapipe/json");
    }

    #[test]
    fn test_endpoint_for_prefixed_base() {
        let url = index("https://mirror.example/python/")
            .endpoint(&["mediapipe", "0.10.14"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://mirror.example/python/pypi/mediapipe/0.10.14/json"
        );
    }

    #[test]
    fn test_release_response_parsing() {
        let body = r#"{
            "info": {"version": "0.10.14"},
            "urls": [
                {
                    "filename": "mediapipe-0.10.14-cp312-cp312-manylinux_2_17_x86_64.whl",
                    "url": "https://files.example/a.whl",
                    "packagetype": "bdist_wheel",
                    "size": 35,
                    "digests": {"md5": "00", "sha256": "ABCDEF"}
                },
                {
                    "filename": "mediapipe-0.10.14.tar.gz",
                    "url": "https://files.example/src.tar.gz",
                    "packagetype": "sdist"
                }
            ]
        }"#;

        let release: ReleaseResponse = serde_json::from_str(body).unwrap();
        assert_eq!(release.urls.len(), 2);
        assert!(release.urls[0].is_wheel());
        assert_eq!(release.urls[0].size, Some(35));
        assert_eq!(release.urls[0].digests.sha256.as_deref(), Some("ABCDEF"));
        assert!(!release.urls[1].is_wheel());
        assert_eq!(release.urls[1].digests.sha256, None);
    }

    #[test]
    fn test_release_response_without_urls() {
        let release: ReleaseResponse = serde_json::from_str(r#"{"info": {}}"#).unwrap();
        assert!(release.urls.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_index_is_metadata_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = index("http://127.0.0.1:9")
            .latest_version("mediapipe")
            .await
            .unwrap_err();
        assert!(
            matches!(err, WheelFetchError::MetadataUnavailable { .. }),
            "unexpected error: {err:?}"
        );
    }
}
