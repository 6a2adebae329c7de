use crate::error::WheelFetchError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// One downloadable artifact as published by the package index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// File name, also used as the destination file name
    pub name: String,
    /// Absolute URL the artifact is fetched from
    pub source_url: String,
    /// Lowercase hex SHA-256, when the index publishes one
    pub expected_digest: Option<String>,
    /// Size declared by the index in bytes, 0 when unknown
    pub declared_size: u64,
}

impl ArtifactDescriptor {
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        expected_digest: Option<String>,
        declared_size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            expected_digest: expected_digest
                .map(|digest| digest.trim().to_ascii_lowercase())
                .filter(|digest| !digest.is_empty()),
            declared_size,
        }
    }
}

/// The artifacts to process for one resolved release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    package: String,
    version: String,
    artifacts: Vec<ArtifactDescriptor>,
}

impl Catalog {
    pub fn new(
        package: impl Into<String>,
        version: impl Into<String>,
        artifacts: Vec<ArtifactDescriptor>,
    ) -> Result<Self, WheelFetchError> {
        if let Some(bad) = artifacts.iter().find(|a| !is_plain_file_name(&a.name)) {
            return Err(WheelFetchError::InvalidCatalog {
                details: format!("artifact name {:?} is not a plain file name", bad.name),
            });
        }

        let duplicates = artifacts
            .iter()
            .map(|a| a.name.as_str())
            .duplicates()
            .join(", ");
        if !duplicates.is_empty() {
            return Err(WheelFetchError::InvalidCatalog {
                details: format!("duplicate artifact names: {duplicates}"),
            });
        }

        Ok(Self {
            package: package.into(),
            version: version.into(),
            artifacts,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn artifacts(&self) -> &[ArtifactDescriptor] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
