//! Configuration types for PDF-to-video generation.
//!
//! All run behaviour is controlled through [`VideoConfig`], built via its
//! [`VideoConfigBuilder`]. Video geometry, planning constants and tool paths
//! live here and are passed explicitly down to the stage that needs them;
//! nothing is read from process-wide state except the documented env vars.

use crate::error::Pdf2VideoError;
use crate::pipeline::speech::Synthesizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a PDF-to-video run.
///
/// Built via [`VideoConfig::builder()`] or using [`VideoConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2video::VideoConfig;
///
/// let config = VideoConfig::builder()
///     .resolution(1280, 720)
///     .fps(25)
///     .preview_scenes(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VideoConfig {
    /// Maximum number of scenes the planner emits. Default: 10.
    ///
    /// The earliest usable sections win; later ones are dropped.
    pub max_scenes: usize,

    /// Truncate the planned script to this many scenes before rendering.
    /// Default: None (render everything).
    pub preview_scenes: Option<usize>,

    /// Output frame width in pixels. Default: 1920.
    pub width: u32,

    /// Output frame height in pixels. Default: 1080.
    pub height: u32,

    /// Output frame rate. Default: 30.
    pub fps: u32,

    /// Script planning constants.
    pub planning: PlanningRules,

    /// Transition applied to every segment. Default: [`Transition::None`].
    pub transition: Transition,

    /// Character sprite scale relative to its 400 px canvas. Default: 0.3.
    pub character_scale: f32,

    /// Gap between the sprite and the bottom-right frame corner. Default: 50.
    pub character_margin: u32,

    /// Narration language code passed to the speech service. Default: "en".
    pub language: String,

    /// Per-request speech-service timeout in seconds. Default: 30.
    pub tts_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Explicit ffmpeg binary. If None, looked up on PATH.
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe binary. If None, looked up on PATH.
    pub ffprobe_path: Option<PathBuf>,

    /// TrueType/OpenType font for titles and diagram labels.
    /// If None, the bundled DejaVu Sans is used.
    pub font_file: Option<PathBuf>,

    /// Keep intermediate assets (frames, clips, segments) in this directory.
    /// If None, a temp directory is used and removed when the run ends.
    pub work_dir: Option<PathBuf>,

    /// Scenes prepared at once (render + synthesize). Default: 1.
    ///
    /// Results are always consumed in scene order regardless of this value.
    pub concurrency: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Pre-constructed speech synthesizer. If None, [`crate::GoogleTts`] is used.
    pub synthesizer: Option<Arc<dyn Synthesizer>>,

    /// Optional progress callback for stage and scene events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_scenes: 10,
            preview_scenes: None,
            width: 1920,
            height: 1080,
            fps: 30,
            planning: PlanningRules::default(),
            transition: Transition::default(),
            character_scale: 0.3,
            character_margin: 50,
            language: "en".to_string(),
            tts_timeout_secs: 30,
            download_timeout_secs: 120,
            ffmpeg_path: None,
            ffprobe_path: None,
            font_file: None,
            work_dir: None,
            concurrency: 1,
            password: None,
            synthesizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for VideoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoConfig")
            .field("max_scenes", &self.max_scenes)
            .field("preview_scenes", &self.preview_scenes)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .field("planning", &self.planning)
            .field("transition", &self.transition)
            .field("language", &self.language)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("font_file", &self.font_file)
            .field("work_dir", &self.work_dir)
            .field("concurrency", &self.concurrency)
            .field(
                "synthesizer",
                &self.synthesizer.as_ref().map(|s| s.name().to_string()),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl VideoConfig {
    /// Create a new builder for `VideoConfig`.
    pub fn builder() -> VideoConfigBuilder {
        VideoConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VideoConfig`].
#[derive(Debug)]
pub struct VideoConfigBuilder {
    config: VideoConfig,
}

impl VideoConfigBuilder {
    pub fn max_scenes(mut self, n: usize) -> Self {
        self.config.max_scenes = n;
        self
    }

    pub fn preview_scenes(mut self, n: usize) -> Self {
        self.config.preview_scenes = Some(n);
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = fps.clamp(1, 120);
        self
    }

    pub fn planning(mut self, rules: PlanningRules) -> Self {
        self.config.planning = rules;
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.config.transition = transition;
        self
    }

    pub fn character_scale(mut self, scale: f32) -> Self {
        self.config.character_scale = scale.clamp(0.05, 1.0);
        self
    }

    pub fn character_margin(mut self, px: u32) -> Self {
        self.config.character_margin = px;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tts_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tts_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = Some(path.into());
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffprobe_path = Some(path.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_file = Some(path.into());
        self
    }

    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.config.synthesizer = Some(synthesizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VideoConfig, Pdf2VideoError> {
        let c = &self.config;
        if c.max_scenes == 0 {
            return Err(Pdf2VideoError::InvalidConfig(
                "max_scenes must be ≥ 1".into(),
            ));
        }
        if c.preview_scenes == Some(0) {
            return Err(Pdf2VideoError::InvalidConfig(
                "preview_scenes must be ≥ 1".into(),
            ));
        }
        // libx264 with yuv420p needs even dimensions.
        if c.width < 64 || c.height < 64 || c.width % 2 != 0 || c.height % 2 != 0 {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "resolution must be even and at least 64×64, got {}×{}",
                c.width, c.height
            )));
        }
        if c.language.trim().is_empty() {
            return Err(Pdf2VideoError::InvalidConfig(
                "language must not be empty".into(),
            ));
        }
        c.planning.validate()?;
        if let Transition::Fade { millis } = c.transition {
            let shortest_ms = (c.planning.min_scene_secs * 1000.0) as u64;
            if millis * 2 > shortest_ms {
                return Err(Pdf2VideoError::InvalidConfig(format!(
                    "fade of {millis}ms does not fit twice into a {shortest_ms}ms scene"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Planning constants ───────────────────────────────────────────────────

/// Constants used by the script planner.
///
/// Together with the document and the scene limit these fully determine the
/// script, so two runs with equal rules produce byte-identical scripts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanningRules {
    /// Speech rate used to estimate narration time. Default: 150.
    pub words_per_minute: f64,
    /// Shortest scene, in seconds. Default: 5.0.
    pub min_scene_secs: f64,
    /// Narration cap per scene, in characters. Default: 300.
    pub max_narration_chars: usize,
    /// Sentences considered for narration per scene. Default: 5.
    pub max_sentences: usize,
    /// Sections with a shorter body are skipped. Default: 100.
    pub min_section_chars: usize,
    /// Sentences shorter than this are dropped as fragments. Default: 20.
    pub min_sentence_chars: usize,
}

impl Default for PlanningRules {
    fn default() -> Self {
        Self {
            words_per_minute: 150.0,
            min_scene_secs: 5.0,
            max_narration_chars: 300,
            max_sentences: 5,
            min_section_chars: 100,
            min_sentence_chars: 20,
        }
    }
}

impl PlanningRules {
    pub fn validate(&self) -> Result<(), Pdf2VideoError> {
        if !(self.words_per_minute.is_finite() && self.words_per_minute > 0.0) {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "words_per_minute must be > 0, got {}",
                self.words_per_minute
            )));
        }
        if !(self.min_scene_secs.is_finite() && self.min_scene_secs > 0.0) {
            return Err(Pdf2VideoError::InvalidConfig(format!(
                "min_scene_secs must be > 0, got {}",
                self.min_scene_secs
            )));
        }
        if self.max_narration_chars < 20 || self.max_sentences == 0 {
            return Err(Pdf2VideoError::InvalidConfig(
                "narration cap must allow at least one sentence".into(),
            ));
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Transition between consecutive scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transition {
    /// Hard cut. (default)
    #[default]
    None,
    /// Fade from and to black at both ends of every segment.
    Fade { millis: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = VideoConfig::default();
        assert_eq!((c.width, c.height, c.fps), (1920, 1080, 30));
        assert_eq!(c.max_scenes, 10);
        assert_eq!(c.planning.words_per_minute, 150.0);
        assert_eq!(c.planning.min_scene_secs, 5.0);
        assert_eq!(c.transition, Transition::None);
        assert!(VideoConfig::builder().build().is_ok());
    }

    #[test]
    fn odd_resolution_is_rejected() {
        let err = VideoConfig::builder().resolution(1921, 1080).build().unwrap_err();
        assert!(err.to_string().contains("1921"));
    }

    #[test]
    fn zero_preview_is_rejected() {
        assert!(VideoConfig::builder().preview_scenes(0).build().is_err());
    }

    #[test]
    fn fade_must_fit_shortest_scene() {
        assert!(VideoConfig::builder()
            .transition(Transition::Fade { millis: 500 })
            .build()
            .is_ok());
        assert!(VideoConfig::builder()
            .transition(Transition::Fade { millis: 3000 })
            .build()
            .is_err());
    }

    #[test]
    fn clamping_setters() {
        let c = VideoConfig::builder()
            .fps(0)
            .concurrency(0)
            .character_scale(5.0)
            .build()
            .unwrap();
        assert_eq!(c.fps, 1);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.character_scale, 1.0);
    }

    #[test]
    fn invalid_planning_rules() {
        let rules = PlanningRules {
            words_per_minute: 0.0,
            ..PlanningRules::default()
        };
        assert!(VideoConfig::builder().planning(rules).build().is_err());
    }
}
