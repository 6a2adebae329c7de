use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Byte progress of a single artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactProgress {
    pub bytes_transferred: u64,
    /// `None` while the server has not declared a length
    pub bytes_total: Option<u64>,
    pub finished: bool,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub files_completed: usize,
    pub files_total: usize,
    pub per_file: BTreeMap<String, ArtifactProgress>,
}

/// Progress accumulator shared by all download workers of a run.
///
/// Every update takes one short lock over the whole state, so a snapshot never
/// observes a half-applied update. The lock is never held across an await
/// point.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new(files_total: usize) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot {
                files_total,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressSnapshot> {
        // Updates cannot leave the state half-written, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance_files_completed(&self) {
        self.state().files_completed += 1;
    }

    pub fn register_artifact(&self, name: &str, bytes_total: Option<u64>) {
        self.state().per_file.insert(
            name.to_string(),
            ArtifactProgress {
                bytes_total,
                ..Default::default()
            },
        );
    }

    pub fn advance_artifact_bytes(&self, name: &str, delta: u64) {
        let mut state = self.state();
        match state.per_file.get_mut(name) {
            Some(entry) => entry.bytes_transferred = entry.bytes_transferred.saturating_add(delta),
            None => {
                state.per_file.insert(
                    name.to_string(),
                    ArtifactProgress {
                        bytes_transferred: delta,
                        ..Default::default()
                    },
                );
            }
        }
    }

    /// Marks an artifact finished, replacing the declared total with the
    /// number of bytes actually observed.
    pub fn complete_artifact(&self, name: &str, observed_total: u64) {
        let mut state = self.state();
        let entry = state.per_file.entry(name.to_string()).or_default();
        entry.bytes_transferred = observed_total;
        entry.bytes_total = Some(observed_total);
        entry.finished = true;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state().clone()
    }
}
