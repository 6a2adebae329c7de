use crate::catalog::ArtifactDescriptor;
use crate::error::WheelFetchError;
use itertools::Itertools;

/// Upper bound on simultaneous downloads accepted from users.
pub const MAX_CONCURRENCY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A file with the expected digest was already present.
    Skipped,
    Completed { bytes_written: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadAndCheckOptions {
    /// Maximum number of artifacts processed at once
    pub concurrency: usize,
    /// Compare the digest of freshly downloaded files within the same run
    pub verify_downloads: bool,
}

impl Default for DownloadAndCheckOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            verify_downloads: false,
        }
    }
}

/// Result of processing one catalog entry.
#[derive(Debug)]
pub struct ArtifactReport {
    pub descriptor: ArtifactDescriptor,
    pub result: Result<DownloadOutcome, WheelFetchError>,
}

/// All reports of a run, in completion order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ArtifactReport>,
}

impl RunSummary {
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes()
            .filter(|outcome| matches!(outcome, DownloadOutcome::Skipped))
            .count()
    }

    pub fn completed(&self) -> usize {
        self.outcomes()
            .filter(|outcome| matches!(outcome, DownloadOutcome::Completed { .. }))
            .count()
    }

    pub fn bytes_written(&self) -> u64 {
        self.outcomes()
            .map(|outcome| match outcome {
                DownloadOutcome::Completed { bytes_written } => *bytes_written,
                DownloadOutcome::Skipped => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ArtifactDescriptor, &WheelFetchError)> {
        self.reports
            .iter()
            .filter_map(|report| report.result.as_ref().err().map(|e| (&report.descriptor, e)))
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn failed_names(&self) -> String {
        self.failures()
            .map(|(descriptor, _)| descriptor.name.as_str())
            .sorted()
            .join(", ")
    }

    pub fn outcome_of(&self, name: &str) -> Option<&Result<DownloadOutcome, WheelFetchError>> {
        self.reports
            .iter()
            .find(|report| report.descriptor.name == name)
            .map(|report| &report.result)
    }

    fn outcomes(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.reports
            .iter()
            .filter_map(|report| report.result.as_ref().ok())
    }
}
