//! End-to-end entry points: PDF in, video out.
//!
//! [`generate_video`] runs every stage in order. The stage functions are
//! also exposed on their own ([`extract`], [`plan_script`],
//! [`render_script`]) so callers can stop after planning, edit or keep the
//! script, and render it later without touching the PDF again.
//!
//! Any error aborts the run. The progress callback hears about it through
//! `on_failure` with the failing [`Stage`] before the error is returned.

use crate::config::VideoConfig;
use crate::document::Document;
use crate::error::{Pdf2VideoError, Stage};
use crate::pipeline::assemble::{self, SceneAssets, Timeline};
use crate::pipeline::character::render_character;
use crate::pipeline::speech::{synthesize_scene, GoogleTts, Synthesizer};
use crate::pipeline::text::Typeface;
use crate::pipeline::{extract as extract_stage, input, plan, visual};
use crate::script::{Scene, Script};
use futures::stream::{self, StreamExt, TryStreamExt};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    /// The script that was rendered (after preview truncation).
    pub script: Script,
    pub timeline: Timeline,
    /// Where intermediate assets were kept, when they were kept at all.
    pub kept_assets: Option<PathBuf>,
    pub elapsed_ms: u64,
}

/// Scratch space for one run.
enum WorkDir {
    /// Removed when dropped.
    Temp(TempDir),
    /// Caller-chosen; left in place.
    Persistent(PathBuf),
}

impl WorkDir {
    fn create(config: &VideoConfig) -> Result<Self, Pdf2VideoError> {
        match &config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Pdf2VideoError::Internal(format!("Cannot create work dir '{}': {}", dir.display(), e))
                })?;
                Ok(WorkDir::Persistent(dir.clone()))
            }
            None => tempfile::Builder::new()
                .prefix("pdf2video-")
                .tempdir()
                .map(WorkDir::Temp)
                .map_err(|e| Pdf2VideoError::Internal(format!("tempdir: {e}"))),
        }
    }

    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(t) => t.path(),
            WorkDir::Persistent(p) => p,
        }
    }

    fn kept(&self) -> Option<PathBuf> {
        match self {
            WorkDir::Temp(_) => None,
            WorkDir::Persistent(p) => Some(p.clone()),
        }
    }
}

/// Generate a narrated video from a PDF file or URL.
///
/// # Errors
/// Returns the first stage failure; [`Pdf2VideoError::stage`] names it. No
/// output file exists after an error.
pub async fn generate_video(
    input_str: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &VideoConfig,
) -> Result<RunReport, Pdf2VideoError> {
    let document = extract(input_str, config).await?;
    let script = plan_script(&document, config)?;
    render_script(&script, output, config).await
}

/// Synchronous wrapper around [`generate_video`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_video_sync(
    input_str: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &VideoConfig,
) -> Result<RunReport, Pdf2VideoError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2VideoError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_video(input_str, output, config))
}

/// Resolve the input and extract its text and sections.
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &VideoConfig,
) -> Result<Document, Pdf2VideoError> {
    let input_str = input_str.as_ref();
    info!("Extracting: {}", input_str);
    stage_start(config, Stage::Extraction);

    let result: Result<Document, Pdf2VideoError> = async {
        let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
        let mut document =
            extract_stage::extract_document(resolved.path(), config.password.as_deref()).await?;
        if input::is_url(input_str) {
            // the download is gone once `resolved` drops
            document.source = PathBuf::from(input_str);
        }
        Ok(document)
    }
    .await;

    finish_stage(config, Stage::Extraction, result)
}

/// Plan a script from an extracted document.
pub fn plan_script(document: &Document, config: &VideoConfig) -> Result<Script, Pdf2VideoError> {
    stage_start(config, Stage::Planning);
    let result = plan::plan_with(document, config.max_scenes, &config.planning);
    finish_stage(config, Stage::Planning, result)
}

/// Render, narrate and assemble `script` into `output`.
///
/// Applies `config.preview_scenes` first, so a saved full script can be
/// previewed without re-planning.
pub async fn render_script(
    script: &Script,
    output: impl AsRef<Path>,
    config: &VideoConfig,
) -> Result<RunReport, Pdf2VideoError> {
    let start = Instant::now();
    let output = output.as_ref();

    let script = match config.preview_scenes {
        Some(n) if n < script.len() => {
            info!("Preview: rendering {} of {} scenes", n, script.len());
            script.truncated(n)
        }
        _ => script.clone(),
    };
    if let Err(detail) = script.validate() {
        return fail(
            config,
            Pdf2VideoError::InvalidScript {
                path: PathBuf::from("<in-memory>"),
                detail,
            },
        );
    }
    if let Some(cb) = &config.progress_callback {
        cb.on_script_ready(script.len(), script.total_duration_secs());
    }

    let work = match WorkDir::create(config) {
        Ok(w) => w,
        Err(e) => return fail(config, e),
    };
    let synthesizer: Arc<dyn Synthesizer> = match &config.synthesizer {
        Some(s) => Arc::clone(s),
        None => Arc::new(GoogleTts::from_config(config)),
    };
    debug!("Work dir: {}, synthesizer: {}", work.path().display(), synthesizer.name());

    // ── Per-scene assets ─────────────────────────────────────────────────
    stage_start(config, Stage::Render);
    let face = match Typeface::from_config(config.font_file.as_deref()) {
        Ok(f) => f,
        Err(e) => return fail(config, e),
    };
    let total = script.len();
    let prepared: Result<Vec<SceneAssets>, Pdf2VideoError> = stream::iter(script.scenes.iter())
        .map(|scene| prepare_scene(scene, total, work.path(), &face, synthesizer.as_ref(), config))
        .buffered(config.concurrency)
        .try_collect()
        .await;
    let assets = match prepared {
        Ok(a) => a,
        Err(e) => return fail(config, e),
    };
    stage_complete(config, Stage::Render);

    // ── Assembly ─────────────────────────────────────────────────────────
    stage_start(config, Stage::Assembly);
    let result = assemble::assemble(&script.scenes, &assets, config, output).await;
    let report = finish_stage(config, Stage::Assembly, result)?;

    if let Some(cb) = &config.progress_callback {
        cb.on_run_complete(output, report.timeline.total_secs);
    }
    info!(
        "Video ready: {} ({} scenes, {:.1}s)",
        output.display(),
        script.len(),
        report.timeline.total_secs
    );

    Ok(RunReport {
        output: report.output,
        script,
        timeline: report.timeline,
        kept_assets: work.kept(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

/// Visual, character sprite and narration for one scene.
async fn prepare_scene(
    scene: &Scene,
    total: usize,
    dir: &Path,
    face: &Typeface,
    synthesizer: &dyn Synthesizer,
    config: &VideoConfig,
) -> Result<SceneAssets, Pdf2VideoError> {
    if let Some(cb) = &config.progress_callback {
        cb.on_scene_start(scene.ordinal, total, &scene.title);
    }

    let visual_path = dir.join(format!("visual_{:03}.png", scene.ordinal));
    let character_path = dir.join(format!("character_{:03}.png", scene.ordinal));
    let (ordinal, title, directive, pose) =
        (scene.ordinal, scene.title.clone(), scene.visual.clone(), scene.pose);
    let (vp, cp, face) = (visual_path.clone(), character_path.clone(), face.clone());

    tokio::task::spawn_blocking(move || {
        let visual = visual::render_visual(ordinal, &title, &directive, &face)?;
        save_png(&visual, &vp)?;
        save_png(&render_character(pose), &cp)
    })
    .await
    .map_err(|e| Pdf2VideoError::Internal(format!("Render task panicked: {}", e)))??;

    let narration = synthesize_scene(synthesizer, scene, dir).await?;

    if let Some(cb) = &config.progress_callback {
        cb.on_scene_complete(scene.ordinal, total, narration.duration_secs);
    }
    Ok(SceneAssets {
        ordinal: scene.ordinal,
        visual: visual_path,
        character: character_path,
        narration,
    })
}

fn save_png(img: &RgbaImage, path: &Path) -> Result<(), Pdf2VideoError> {
    img.save(path).map_err(|e| Pdf2VideoError::ImageWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

// ── Progress plumbing ────────────────────────────────────────────────────

fn stage_start(config: &VideoConfig, stage: Stage) {
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &VideoConfig, stage: Stage) {
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_complete(stage);
    }
}

fn fail<T>(config: &VideoConfig, err: Pdf2VideoError) -> Result<T, Pdf2VideoError> {
    if let Some(cb) = &config.progress_callback {
        cb.on_failure(err.stage(), &err.to_string());
    }
    Err(err)
}

fn finish_stage<T>(
    config: &VideoConfig,
    stage: Stage,
    result: Result<T, Pdf2VideoError>,
) -> Result<T, Pdf2VideoError> {
    match result {
        Ok(v) => {
            stage_complete(config, stage);
            Ok(v)
        }
        Err(e) => fail(config, e),
    }
}
