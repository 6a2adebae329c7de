//! Terminal rendering of [`ProgressSnapshot`]s.
//!
//! The renderer only reads snapshots; it never feeds anything back into the
//! download engine.

use super::tracker::{ProgressSnapshot, ProgressTracker};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const MAX_LABEL: usize = 48;

struct ArtifactBar {
    bar: ProgressBar,
    sized: bool,
}

/// Combined overall + per-artifact progress display.
pub struct ProgressRenderer {
    multi: MultiProgress,
    overall: ProgressBar,
    artifacts: HashMap<String, ArtifactBar>,
}

impl ProgressRenderer {
    /// Draws into `multi`, which may be shared with a [`super::ProgressLogWriter`].
    pub fn new(multi: MultiProgress) -> Self {
        let overall = multi.add(ProgressBar::new(0));
        overall.set_style(overall_style());
        overall.set_message("Downloading wheels");
        Self {
            multi,
            overall,
            artifacts: HashMap::new(),
        }
    }

    pub fn render(&mut self, snapshot: &ProgressSnapshot) {
        self.overall.set_length(snapshot.files_total as u64);
        self.overall.set_position(snapshot.files_completed as u64);

        for (name, progress) in &snapshot.per_file {
            let entry = self.artifacts.entry(name.clone()).or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.set_message(format_label(name));
                ArtifactBar { bar, sized: false }
            });

            if entry.bar.is_finished() {
                continue;
            }

            if let Some(total) = progress.bytes_total {
                if !entry.sized {
                    entry.bar.set_style(bytes_style());
                    entry.sized = true;
                }
                entry.bar.set_length(total);
            }
            entry.bar.set_position(progress.bytes_transferred);

            if progress.finished {
                entry.bar.finish();
            }
        }
    }

    pub fn finish(&self) {
        self.overall.finish();
        for entry in self.artifacts.values() {
            if !entry.bar.is_finished() {
                entry.bar.abandon();
            }
        }
    }
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:.bold} {wide_bar} {pos}/{len} files")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn bytes_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} {bar:28.cyan/blue} {bytes:>10}/{total_bytes:<10} {bytes_per_sec:>12} {eta:>4}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg} {spinner} {bytes:>10} {bytes_per_sec:>12}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn format_label(raw: &str) -> String {
    if raw.chars().count() <= MAX_LABEL {
        return format!("{raw:<width$}", width = MAX_LABEL);
    }
    let mut label: String = raw.chars().take(MAX_LABEL - 1).collect();
    label.push('…');
    label
}

/// Background task redrawing the tracker's snapshot at a fixed interval.
pub struct ProgressRenderTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressRenderTask {
    pub fn spawn(
        tracker: Arc<ProgressTracker>,
        multi: MultiProgress,
        refresh_interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut renderer = ProgressRenderer::new(multi);
            let mut ticker = tokio::time::interval(refresh_interval);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => renderer.render(&tracker.snapshot()),
                }
            }
            renderer.render(&tracker.snapshot());
            renderer.finish();
        });
        Self { stop, handle }
    }

    /// Draws the final snapshot and waits for the render task to exit.
    pub async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            tracing::warn!("Progress renderer exited abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    fn hidden_multi() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn hidden() -> ProgressRenderer {
        ProgressRenderer::new(hidden_multi())
    }

    #[test]
    fn test_render_overall_counts() {
        let tracker = ProgressTracker::new(4);
        tracker.advance_files_completed();

        let mut renderer = hidden();
        renderer.render(&tracker.snapshot());

        assert_eq!(renderer.overall.length(), Some(4));
        assert_eq!(renderer.overall.position(), 1);
    }

    #[test]
    fn test_render_artifact_bars() {
        let tracker = ProgressTracker::new(2);
        tracker.register_artifact("a.whl", Some(100));
        tracker.advance_artifact_bytes("a.whl", 40);
        tracker.register_artifact("b.whl", None);
        tracker.advance_artifact_bytes("b.whl", 5);

        let mut renderer = hidden();
        renderer.render(&tracker.snapshot());

        let a = &renderer.artifacts["a.whl"];
        assert!(a.sized);
        assert_eq!(a.bar.length(), Some(100));
        assert_eq!(a.bar.position(), 40);

        let b = &renderer.artifacts["b.whl"];
        assert!(!b.sized);
        assert_eq!(b.bar.position(), 5);

        tracker.complete_artifact("b.whl", 9);
        renderer.render(&tracker.snapshot());
        let b = &renderer.artifacts["b.whl"];
        assert!(b.sized);
        assert!(b.bar.is_finished());
        assert_eq!(b.bar.position(), 9);
    }

    #[test]
    fn test_format_label_truncates() {
        let long = "x".repeat(MAX_LABEL + 10);
        let label = format_label(&long);
        assert_eq!(label.chars().count(), MAX_LABEL);
        assert!(label.ends_with('…'));
        assert_eq!(format_label("a.whl").chars().count(), MAX_LABEL);
    }

    #[tokio::test]
    async fn test_render_task_stops() {
        let tracker = Arc::new(ProgressTracker::new(1));
        let task = ProgressRenderTask::spawn(
            tracker.clone(),
            hidden_multi(),
            Duration::from_millis(5),
        );
        tracker.advance_files_completed();
        tokio::time::timeout(Duration::from_secs(5), task.finish())
            .await
            .expect("render task should stop promptly");
    }
}
