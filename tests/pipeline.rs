//! Integration tests that need neither pdfium, ffmpeg nor the network.
//!
//! Documents are built in memory and narration comes from fake
//! synthesizers, so these run everywhere `cargo test` does.

use async_trait::async_trait;
use edgequake_pdf2video::pipeline::plan::{plan, target_duration};
use edgequake_pdf2video::{
    load_script, plan_script, render_script, save_script, Document, NarrationClip,
    Pdf2VideoError, PipelineProgressCallback, PlanningRules, Pose, Script, Section, Stage,
    Synthesizer, VideoConfig,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const BODY: &str = "Gallium nitride devices switch quickly at high voltage. \
                    Designers use them in compact chargers and radio amplifiers.";

fn document(headings: &[&str]) -> Document {
    let sections = headings
        .iter()
        .enumerate()
        .map(|(i, h)| Section::new(i, *h, BODY))
        .collect();
    Document::from_sections(Some("GaN Primer".into()), sections)
}

/// Fails every request the way an unreachable service would.
struct OfflineSynthesizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Synthesizer for OfflineSynthesizer {
    fn name(&self) -> &str {
        "offline"
    }

    async fn synthesize(&self, _text: &str, _dest: &Path) -> Result<NarrationClip, Pdf2VideoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Pdf2VideoError::SynthesisUnreachable {
            service: self.name().to_string(),
            reason: "connection refused".into(),
        })
    }
}

/// Writes a placeholder clip and reports a fixed length.
struct FixedSynthesizer {
    secs: f64,
}

#[async_trait]
impl Synthesizer for FixedSynthesizer {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn synthesize(&self, _text: &str, dest: &Path) -> Result<NarrationClip, Pdf2VideoError> {
        tokio::fs::write(dest, b"not really audio")
            .await
            .map_err(|e| Pdf2VideoError::AudioWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
        Ok(NarrationClip {
            path: dest.to_path_buf(),
            duration_secs: self.secs,
        })
    }
}

#[derive(Default)]
struct FailureRecorder {
    failures: Mutex<Vec<Stage>>,
}

impl PipelineProgressCallback for FailureRecorder {
    fn on_failure(&self, stage: Stage, _error: &str) {
        self.failures.lock().unwrap().push(stage);
    }
}

// ── Planning ─────────────────────────────────────────────────────────────────

#[test]
fn plan_emits_min_of_limit_and_usable_sections() {
    let headings = ["Introduction", "Applications", "Device Structure", "Performance", "Outlook"];
    let doc = document(&headings);

    for limit in 1..=7 {
        let script = plan(&doc, limit).unwrap();
        assert_eq!(script.len(), limit.min(headings.len()), "limit {limit}");
        for (i, scene) in script.scenes.iter().enumerate() {
            assert_eq!(scene.ordinal, i);
            assert!(!scene.narration.is_empty());
        }
    }
}

#[test]
fn poses_follow_scene_position() {
    let script = plan(&document(&["Introduction", "Applications", "Conclusion"]), 10).unwrap();
    let poses: Vec<Pose> = script.scenes.iter().map(|s| s.pose).collect();
    assert_eq!(poses, vec![Pose::Greeting, Pose::Explaining, Pose::Concluding]);

    let two = plan(&document(&["Introduction", "Conclusion"]), 10).unwrap();
    assert_eq!(two.scenes[0].pose, Pose::Greeting);
    assert_eq!(two.scenes[1].pose, Pose::Concluding);

    let one = plan(&document(&["Introduction"]), 10).unwrap();
    assert_eq!(one.scenes[0].pose, Pose::Greeting);
}

#[test]
fn duration_has_a_floor_and_grows_with_length() {
    let rules = PlanningRules::default();
    let mut previous = 0.0;
    for words in 0..400 {
        let d = target_duration(words, &rules);
        assert!(d >= rules.min_scene_secs);
        assert!(d >= previous, "duration shrank at {words} words");
        previous = d;
    }
    assert_eq!(target_duration(0, &rules), rules.min_scene_secs);
    assert_eq!(target_duration(300, &rules), 120.0);
}

#[test]
fn zero_sections_is_a_planning_error() {
    let config = VideoConfig::default();
    let err = plan_script(&Document::from_sections(None, vec![]), &config).unwrap_err();
    assert_eq!(err.stage(), Stage::Planning);
    assert!(matches!(err, Pdf2VideoError::NoUsableSections { .. }));
}

// ── Script file ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn saved_script_loads_back_identical() {
    let script = plan(&document(&["Introduction", "Performance", "Outlook"]), 10).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/script.json");

    save_script(&script, &path).await.unwrap();
    let loaded = load_script(&path).await.unwrap();

    assert_eq!(loaded, script);
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn malformed_script_is_a_script_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    tokio::fs::write(&path, r#"{ "title": "x", "scenes": [ { "ordinal": 0 } ] }"#)
        .await
        .unwrap();

    let err = load_script(&path).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Script);

    let err = load_script(dir.path().join("missing.json")).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Script);
}

#[tokio::test]
async fn empty_script_is_blamed_on_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    tokio::fs::write(&path, r#"{ "title": "t", "scene_count": 0, "scenes": [] }"#)
        .await
        .unwrap();

    let err = load_script(&path).await.unwrap_err();
    assert!(matches!(err, Pdf2VideoError::InvalidScript { .. }));
    assert_eq!(err.stage(), Stage::Script);

    let recorder = Arc::new(FailureRecorder::default());
    let config = VideoConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let empty = Script {
        title: "t".into(),
        scenes: vec![],
    };
    let err = render_script(&empty, dir.path().join("video.mp4"), &config)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Script);
    assert_eq!(*recorder.failures.lock().unwrap(), vec![Stage::Script]);
}

// ── Rendering failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_synthesizer_fails_without_output() {
    let script = plan(&document(&["Introduction", "Applications", "Outlook"]), 10).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("video.mp4");

    let synth = Arc::new(OfflineSynthesizer {
        calls: AtomicUsize::new(0),
    });
    let recorder = Arc::new(FailureRecorder::default());
    let config = VideoConfig::builder()
        .synthesizer(synth.clone())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = render_script(&script, &output, &config).await.unwrap_err();

    assert_eq!(err.stage(), Stage::Synthesis);
    assert!(err.is_external());
    assert!(!output.exists());
    // sequential by default: the first failure stops the run
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.failures.lock().unwrap(), vec![Stage::Synthesis]);
}

#[tokio::test]
async fn missing_ffmpeg_is_an_assembly_error() {
    let script = plan(&document(&["Introduction", "Outlook"]), 10).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("video.mp4");
    let assets = dir.path().join("assets");

    let config = VideoConfig::builder()
        .synthesizer(Arc::new(FixedSynthesizer { secs: 2.0 }))
        .ffmpeg_path("/no/such/dir/ffmpeg")
        .work_dir(&assets)
        .build()
        .unwrap();

    let err = render_script(&script, &output, &config).await.unwrap_err();

    assert_eq!(err.stage(), Stage::Assembly);
    assert!(!output.exists());
    // scene assets were produced before assembly gave up
    for name in ["visual_000.png", "character_001.png", "narration_001.mp3"] {
        assert!(assets.join(name).is_file(), "{name} missing");
    }
}

#[tokio::test]
async fn preview_truncates_before_rendering() {
    let script = plan(
        &document(&["Introduction", "Applications", "Device Structure", "Outlook"]),
        10,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");

    let config = VideoConfig::builder()
        .synthesizer(Arc::new(FixedSynthesizer { secs: 1.0 }))
        .ffmpeg_path("/no/such/dir/ffmpeg")
        .preview_scenes(2)
        .work_dir(&assets)
        .build()
        .unwrap();

    let _ = render_script(&script, dir.path().join("video.mp4"), &config).await;

    assert!(assets.join("visual_001.png").is_file());
    assert!(!assets.join("visual_002.png").exists());
}
