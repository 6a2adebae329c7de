//! Progress aggregation and rendering.

mod log_writer;
mod render;
mod tracker;

pub use log_writer::ProgressLogWriter;
pub use render::{DEFAULT_REFRESH_INTERVAL, ProgressRenderTask, ProgressRenderer};
pub use tracker::{ArtifactProgress, ProgressSnapshot, ProgressTracker};
