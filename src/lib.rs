//! # edgequake-pdf2video
//!
//! Turn a technical PDF into a short narrated explainer video.
//!
//! ## Why this crate?
//!
//! Slide decks and papers already carry their own structure: numbered
//! headings, an introduction, a conclusion. This crate reads the text layer,
//! picks the usable sections, and turns each into one scene with a generated
//! diagram, a spoken summary and a small presenter character. The result is a
//! single MP4 you can skim in a minute instead of reading ten pages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   text layer via pdfium (spawn_blocking), split into sections
//!  ├─ 3. Plan      sections → timed scenes (narration, visual, pose)
//!  ├─ 4. Render    one diagram + one character sprite per scene
//!  ├─ 5. Narrate   speech per scene through a Synthesizer (network)
//!  └─ 6. Assemble  ffmpeg: one segment per scene, concatenated into the MP4
//! ```
//!
//! The planned script is plain JSON ([`save_script`] / [`load_script`]), so a
//! run can stop after planning and render later.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2video::{generate_video, VideoConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Needs ffmpeg/ffprobe on PATH and network access for narration.
//!     let config = VideoConfig::builder().preview_scenes(3).build()?;
//!     let report = generate_video("paper.pdf", "paper.mp4", &config).await?;
//!     eprintln!(
//!         "{} scenes, {:.1}s -> {}",
//!         report.script.len(),
//!         report.timeline.total_secs,
//!         report.output.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2video` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2video = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Used by | Lookup |
//! |------|---------|--------|
//! | libpdfium | extraction | `PDFIUM_LIB_PATH`, then the system library |
//! | `ffprobe` | narration length | `VideoConfig::ffprobe_path`, then `PATH` |
//! | `ffmpeg`  | assembly | `VideoConfig::ffmpeg_path`, then `PATH` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod script;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PlanningRules, Transition, VideoConfig, VideoConfigBuilder};
pub use document::{Document, Section, SectionLabel};
pub use error::{MediaError, Pdf2VideoError, Stage};
pub use generate::{extract, generate_video, generate_video_sync, plan_script, render_script, RunReport};
pub use pipeline::assemble::{Timeline, TimedSegment};
pub use pipeline::speech::{GoogleTts, NarrationClip, Synthesizer};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use script::{load_script, save_script, Pose, Scene, Script, Series, VisualDirective};
