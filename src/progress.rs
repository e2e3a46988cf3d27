//! Progress-callback trait for stage and per-scene events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::VideoConfigBuilder::progress_callback`] to receive events
//! as the run moves through extraction, planning, per-scene preparation and
//! assembly. The CLI drives its progress bar from these events; library users
//! can forward them anywhere without the pipeline knowing how.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2video::{PipelineProgressCallback, VideoConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     prepared: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_scene_complete(&self, ordinal: usize, total: usize, _secs: f64) {
//!         let done = self.prepared.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("scene {}/{} ready ({done} so far)", ordinal + 1, total);
//!     }
//! }
//!
//! let config = VideoConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { prepared: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1` the scene events may arrive
/// from several tasks at once, so implementations must be `Send + Sync`.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the script is final (after preview truncation).
    ///
    /// # Arguments
    /// * `scene_count`    - scenes that will be rendered
    /// * `planned_secs`   - sum of planned target durations
    fn on_script_ready(&self, scene_count: usize, planned_secs: f64) {
        let _ = (scene_count, planned_secs);
    }

    /// Called before a scene's visual, narration and character are prepared.
    ///
    /// `ordinal` is 0-based.
    fn on_scene_start(&self, ordinal: usize, total: usize, title: &str) {
        let _ = (ordinal, total, title);
    }

    /// Called when a scene's assets are ready.
    ///
    /// `narration_secs` is the measured length of the synthesized clip.
    fn on_scene_complete(&self, ordinal: usize, total: usize, narration_secs: f64) {
        let _ = (ordinal, total, narration_secs);
    }

    /// Called when a stage fails; the run stops right after.
    fn on_failure(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once the video file is in place.
    fn on_run_complete(&self, output: &Path, total_secs: f64) {
        let _ = (output, total_secs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::VideoConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
