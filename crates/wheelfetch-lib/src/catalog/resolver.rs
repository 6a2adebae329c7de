use super::index::PackageIndex;
use super::types::{ArtifactDescriptor, Catalog};
use crate::error::WheelFetchError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which release to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Exact(String),
}

impl FromStr for VersionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("latest") {
            Ok(Self::Latest)
        } else {
            Ok(Self::Exact(s.to_string()))
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(version) => f.write_str(version),
        }
    }
}

/// Resolves a version selector into the catalog of wheels for one package.
#[derive(Clone)]
pub struct CatalogResolver {
    index: Arc<dyn PackageIndex>,
    package: String,
}

impl CatalogResolver {
    pub fn new(index: Arc<dyn PackageIndex>, package: impl Into<String>) -> Self {
        Self {
            index,
            package: package.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub async fn resolve_version(
        &self,
        selector: &VersionSelector,
    ) -> Result<String, WheelFetchError> {
        match selector {
            VersionSelector::Exact(version) => Ok(version.clone()),
            VersionSelector::Latest => {
                tracing::info!("Fetching latest {} version...", self.package);
                let version = self.index.latest_version(&self.package).await?;
                tracing::info!("Latest version is {}", version);
                Ok(version)
            }
        }
    }

    /// Lists the wheels of `version`. A release without wheels yields an
    /// empty catalog rather than an error.
    pub async fn list_artifacts(&self, version: &str) -> Result<Catalog, WheelFetchError> {
        let files = self.index.release_files(&self.package, version).await?;
        let total_files = files.len();

        let artifacts: Vec<_> = files
            .into_iter()
            .filter(|file| file.is_wheel())
            .map(|file| {
                ArtifactDescriptor::new(
                    file.filename,
                    file.url,
                    file.digests.sha256,
                    file.size.unwrap_or(0),
                )
            })
            .collect();

        tracing::debug!(
            package = %self.package,
            version,
            files = total_files,
            wheels = artifacts.len(),
            "Listed release files"
        );

        Catalog::new(self.package.clone(), version, artifacts)
    }

    pub async fn resolve(&self, selector: &VersionSelector) -> Result<Catalog, WheelFetchError> {
        let version = self.resolve_version(selector).await?;
        self.list_artifacts(&version).await
    }
}
