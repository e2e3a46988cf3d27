//! End-to-end integration tests for edgequake-pdf2video.
//!
//! These tests drive real ffmpeg/ffprobe binaries, libpdfium and (for the
//! narration test) the live speech service. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! PDF-based tests additionally need sample documents in `./test_cases/`.

use async_trait::async_trait;
use edgequake_pdf2video::pipeline::media::{locate_tool, probe_duration, run_tool};
use edgequake_pdf2video::pipeline::plan::plan;
use edgequake_pdf2video::{
    extract, generate_video, render_script, Document, GoogleTts, NarrationClip, Pdf2VideoError,
    Section, Synthesizer, Transition, VideoConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test unless E2E_ENABLED is set and ffmpeg/ffprobe are on PATH.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if locate_tool("ffmpeg", None).is_err() || locate_tool("ffprobe", None).is_err() {
            println!("SKIP: ffmpeg/ffprobe not found on PATH");
            return;
        }
    }};
    ($path:expr) => {{
        e2e_skip_unless_ready!();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Produces silent narration of a length proportional to the text, so runs
/// are offline but still exercise real audio muxing.
struct SilentSynthesizer;

#[async_trait]
impl Synthesizer for SilentSynthesizer {
    fn name(&self) -> &str {
        "silent"
    }

    async fn synthesize(&self, text: &str, dest: &Path) -> Result<NarrationClip, Pdf2VideoError> {
        let secs = (text.split_whitespace().count() as f64 / 5.0).max(1.0);
        let ffmpeg = locate_tool("ffmpeg", None).map_err(|e| Pdf2VideoError::AudioProbeFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let duration = format!("{secs:.2}");
        let dest_str = dest.to_string_lossy().to_string();
        run_tool(
            &ffmpeg,
            [
                "-y",
                "-f",
                "lavfi",
                "-i",
                "anullsrc=r=24000:cl=mono",
                "-t",
                duration.as_str(),
                "-c:a",
                "libmp3lame",
                dest_str.as_str(),
            ],
        )
        .await
        .map_err(|e| Pdf2VideoError::AudioProbeFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        Ok(NarrationClip {
            path: dest.to_path_buf(),
            duration_secs: secs,
        })
    }
}

fn sample_document() -> Document {
    let body = "Gallium nitride transistors switch faster than silicon parts. \
                They tolerate higher voltages and run cooler in compact chargers. \
                Radio amplifiers also benefit from their high electron mobility.";
    let sections = ["Introduction", "Applications", "Device Structure", "Performance", "Summary"]
        .iter()
        .enumerate()
        .map(|(i, h)| Section::new(i, *h, body))
        .collect();
    Document::from_sections(Some("GaN in Five Scenes".into()), sections)
}

fn small_config() -> VideoConfig {
    VideoConfig::builder()
        .resolution(640, 360)
        .fps(15)
        .synthesizer(Arc::new(SilentSynthesizer))
        .build()
        .expect("valid config")
}

// ── Assembly (ffmpeg, no network) ────────────────────────────────────────────

#[tokio::test]
async fn test_render_all_visual_kinds() {
    e2e_skip_unless_ready!();
    let script = plan(&sample_document(), 10).expect("plan");
    assert_eq!(script.len(), 5);

    let out = output_dir().join("all_kinds.mp4");
    let report = render_script(&script, &out, &small_config())
        .await
        .expect("render should succeed");

    assert!(out.is_file());
    assert_eq!(report.timeline.segments.len(), 5);

    let expected: f64 = script
        .scenes
        .iter()
        .zip(&report.timeline.segments)
        .map(|(scene, seg)| {
            assert!(seg.duration_secs >= scene.duration_secs);
            seg.duration_secs
        })
        .sum();
    assert!((report.timeline.total_secs - expected).abs() < 1e-6);

    let ffprobe = locate_tool("ffprobe", None).unwrap();
    let measured = probe_duration(&ffprobe, &out).await.expect("probe output");
    assert!(
        (measured - expected).abs() < 1.0,
        "video is {measured:.2}s, timeline says {expected:.2}s"
    );
    println!("✓ {} ({measured:.1}s)", out.display());
}

#[tokio::test]
async fn test_fade_and_kept_assets() {
    e2e_skip_unless_ready!();
    let script = plan(&sample_document(), 2).expect("plan");

    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    let out = dir.path().join("faded.mp4");
    let config = VideoConfig::builder()
        .resolution(640, 360)
        .fps(15)
        .transition(Transition::Fade { millis: 300 })
        .work_dir(&assets)
        .synthesizer(Arc::new(SilentSynthesizer))
        .build()
        .unwrap();

    let report = render_script(&script, &out, &config).await.expect("render");

    assert!(out.is_file());
    assert_eq!(report.kept_assets.as_deref(), Some(assets.as_path()));
    assert!(assets.join("segments").is_dir());
    assert!(assets.join("narration_000.mp3").is_file());
    // nothing left behind next to the output
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".pdf2video-"))
        .collect();
    assert!(leftovers.is_empty());
}

// ── Full pipeline (pdfium + ffmpeg) ──────────────────────────────────────────

#[tokio::test]
async fn test_generate_from_sample_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("gan_overview.pdf"));
    let out = output_dir().join("gan_overview_preview.mp4");

    let config = VideoConfig::builder()
        .resolution(640, 360)
        .fps(15)
        .preview_scenes(3)
        .synthesizer(Arc::new(SilentSynthesizer))
        .build()
        .unwrap();

    let report = generate_video(path.to_str().unwrap(), &out, &config)
        .await
        .expect("generation should succeed");

    assert!(report.script.len() <= 3);
    assert!(out.is_file());
    println!("✓ {} scenes in {}ms", report.script.len(), report.elapsed_ms);
}

#[tokio::test]
async fn test_extract_sample_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("gan_overview.pdf"));

    let doc = extract(path.to_str().unwrap(), &VideoConfig::default())
        .await
        .expect("extract should succeed");

    assert!(doc.page_count > 0);
    assert!(!doc.sections.is_empty());
    for (i, s) in doc.sections.iter().enumerate() {
        assert_eq!(s.index, i);
    }
}

// ── Live narration (network) ─────────────────────────────────────────────────

#[tokio::test]
async fn test_google_tts_live() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("hello.mp3");

    let clip = GoogleTts::new("en", 30)
        .synthesize(
            "Gallium nitride is a wide band gap semiconductor used in fast chargers and radio amplifiers.",
            &dest,
        )
        .await
        .expect("live synthesis");

    assert!(dest.is_file());
    assert!(clip.duration_secs > 1.0);
}
