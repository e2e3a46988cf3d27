//! The script: ordered scenes planned from a document.
//!
//! A script is the only artifact that crosses from planning into rendering.
//! It can be written to disk and re-read later so the expensive PDF
//! extraction does not have to be repeated when iterating on the video.
//!
//! ## File format
//!
//! ```json
//! {
//!   "title": "GaN Overview",
//!   "total_duration_secs": 23.0,
//!   "scene_count": 3,
//!   "scenes": [ { "ordinal": 0, "title": "…", "narration": "…",
//!                 "visual": { "kind": "crystal_structure" },
//!                 "duration_secs": 8.0, "pose": "greeting" }, … ]
//! }
//! ```
//!
//! `total_duration_secs` and `scene_count` are informational on write and
//! checked on read.

use crate::error::Pdf2VideoError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// An ordered, contiguous list of scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub scenes: Vec<Scene>,
}

impl Script {
    /// Sum of planned target durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_secs).sum()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Keep only the first `count` scenes.
    ///
    /// Poses are left as planned: a preview of a longer script still opens
    /// with the greeting and simply ends before the conclusion.
    pub fn truncated(&self, count: usize) -> Script {
        Script {
            title: self.title.clone(),
            scenes: self.scenes.iter().take(count).cloned().collect(),
        }
    }

    /// Check that there is at least one scene and ordinals run `0..len`
    /// without gaps.
    pub fn validate(&self) -> Result<(), String> {
        if self.scenes.is_empty() {
            return Err("script has no scenes".into());
        }
        for (expected, scene) in self.scenes.iter().enumerate() {
            if scene.ordinal != expected {
                return Err(format!(
                    "scene at position {expected} has ordinal {}",
                    scene.ordinal
                ));
            }
            if !scene.duration_secs.is_finite() || scene.duration_secs <= 0.0 {
                return Err(format!(
                    "scene {expected} has invalid duration {}",
                    scene.duration_secs
                ));
            }
        }
        Ok(())
    }
}

/// One timed unit of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the script, starting at 0.
    pub ordinal: usize,
    pub title: String,
    /// Speech-ready text.
    pub narration: String,
    pub visual: VisualDirective,
    /// Planned on-screen time; the assembler extends it if narration runs longer.
    pub duration_secs: f64,
    pub pose: Pose,
}

/// Character state shown in the corner of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    Greeting,
    Explaining,
    Concluding,
}

impl Pose {
    /// Pose for the scene at `ordinal` in a script of `count` scenes.
    ///
    /// The first scene always greets, even when it is also the last.
    pub fn for_position(ordinal: usize, count: usize) -> Self {
        if ordinal == 0 {
            Pose::Greeting
        } else if ordinal + 1 == count {
            Pose::Concluding
        } else {
            Pose::Explaining
        }
    }
}

/// Which diagram to draw for a scene, with its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualDirective {
    /// Hexagonal two-species lattice.
    CrystalStructure,
    /// Central hub surrounded by application boxes.
    ApplicationChart { items: Vec<String> },
    /// Stacked device layers, bottom first.
    LayerDiagram { layers: Vec<String> },
    /// Grouped bar chart, each series normalised to its own maximum.
    ComparisonChart {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// Seeded circuit-trace pattern.
    Generic { seed: u64 },
    /// Any kind this build does not know, e.g. from a newer script file.
    #[serde(other)]
    Unsupported,
}

impl VisualDirective {
    /// Short machine name, matching the serialized `kind` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            VisualDirective::CrystalStructure => "crystal_structure",
            VisualDirective::ApplicationChart { .. } => "application_chart",
            VisualDirective::LayerDiagram { .. } => "layer_diagram",
            VisualDirective::ComparisonChart { .. } => "comparison_chart",
            VisualDirective::Generic { .. } => "generic",
            VisualDirective::Unsupported => "unsupported",
        }
    }
}

/// One named series of a comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

// ── Persistence ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ScriptFileOut<'a> {
    title: &'a str,
    total_duration_secs: f64,
    scene_count: usize,
    scenes: &'a [Scene],
}

#[derive(Deserialize)]
struct ScriptFileIn {
    title: String,
    #[serde(default)]
    scene_count: Option<usize>,
    scenes: Vec<Scene>,
}

/// Serialize a script to pretty JSON.
pub fn to_json(script: &Script) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ScriptFileOut {
        title: &script.title,
        total_duration_secs: script.total_duration_secs(),
        scene_count: script.scenes.len(),
        scenes: &script.scenes,
    })
}

/// Write a script to `path`.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// half-written script that a later `assemble` step would choke on.
pub async fn save_script(script: &Script, path: impl AsRef<Path>) -> Result<(), Pdf2VideoError> {
    let path = path.as_ref();
    let json = to_json(script).map_err(|e| Pdf2VideoError::Internal(format!("serialise script: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Pdf2VideoError::ScriptWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| Pdf2VideoError::ScriptWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2VideoError::ScriptWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(
        "Script saved to {} ({} scenes, {:.1}s)",
        path.display(),
        script.len(),
        script.total_duration_secs()
    );
    Ok(())
}

/// Read and validate a script written by [`save_script`].
pub async fn load_script(path: impl AsRef<Path>) -> Result<Script, Pdf2VideoError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Pdf2VideoError::ScriptReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let script = from_json(&raw).map_err(|detail| Pdf2VideoError::InvalidScript {
        path: path.to_path_buf(),
        detail,
    })?;
    debug!("Loaded script '{}' with {} scenes", script.title, script.len());
    Ok(script)
}

/// Parse and validate script JSON.
pub fn from_json(raw: &str) -> Result<Script, String> {
    let file: ScriptFileIn = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if let Some(count) = file.scene_count {
        if count != file.scenes.len() {
            return Err(format!(
                "scene_count is {count} but {} scenes are present",
                file.scenes.len()
            ));
        }
    }
    let script = Script {
        title: file.title,
        scenes: file.scenes,
    };
    script.validate()?;
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(ordinal: usize, visual: VisualDirective) -> Scene {
        Scene {
            ordinal,
            title: format!("Scene {ordinal}"),
            narration: "Gallium nitride switches fast.".into(),
            visual,
            duration_secs: 5.0,
            pose: Pose::Explaining,
        }
    }

    #[test]
    fn pose_rules() {
        assert_eq!(Pose::for_position(0, 1), Pose::Greeting);
        assert_eq!(Pose::for_position(0, 3), Pose::Greeting);
        assert_eq!(Pose::for_position(1, 3), Pose::Explaining);
        assert_eq!(Pose::for_position(2, 3), Pose::Concluding);
        assert_eq!(Pose::for_position(1, 2), Pose::Concluding);
    }

    #[test]
    fn json_uses_snake_case_tags() {
        let s = Script {
            title: "t".into(),
            scenes: vec![scene(0, VisualDirective::Generic { seed: 7 })],
        };
        let json = to_json(&s).unwrap();
        assert!(json.contains("\"kind\": \"generic\""), "got: {json}");
        assert!(json.contains("\"pose\": \"explaining\""));
        assert!(json.contains("\"scene_count\": 1"));
    }

    #[test]
    fn unknown_visual_kind_loads_as_unsupported() {
        let raw = r#"{
            "title": "t",
            "scenes": [{
                "ordinal": 0, "title": "x", "narration": "y",
                "visual": { "kind": "hologram", "depth": 3 },
                "duration_secs": 5.0, "pose": "greeting"
            }]
        }"#;
        let s = from_json(raw).unwrap();
        assert_eq!(s.scenes[0].visual, VisualDirective::Unsupported);
    }

    #[test]
    fn gap_in_ordinals_is_rejected() {
        let s = Script {
            title: "t".into(),
            scenes: vec![
                scene(0, VisualDirective::CrystalStructure),
                scene(2, VisualDirective::CrystalStructure),
            ],
        };
        let json = to_json(&s).unwrap();
        let err = from_json(&json).unwrap_err();
        assert!(err.contains("ordinal 2"), "got: {err}");
    }

    #[test]
    fn scene_count_mismatch_is_rejected() {
        let raw = r#"{ "title": "t", "scene_count": 2, "scenes": [] }"#;
        assert!(from_json(raw).unwrap_err().contains("scene_count"));
    }

    #[test]
    fn script_without_scenes_is_rejected() {
        let raw = r#"{ "title": "t", "scene_count": 0, "scenes": [] }"#;
        assert_eq!(from_json(raw).unwrap_err(), "script has no scenes");
        let raw = r#"{ "title": "t", "scenes": [] }"#;
        assert!(from_json(raw).is_err());
    }

    #[test]
    fn truncated_keeps_prefix() {
        let s = Script {
            title: "t".into(),
            scenes: (0..4).map(|i| scene(i, VisualDirective::CrystalStructure)).collect(),
        };
        let p = s.truncated(2);
        assert_eq!(p.len(), 2);
        assert_eq!(p.scenes[1].ordinal, 1);
        assert_eq!(s.truncated(10).len(), 4);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/script.json");
        let s = Script {
            title: "GaN".into(),
            scenes: vec![
                scene(0, VisualDirective::LayerDiagram { layers: vec!["Substrate".into()] }),
                scene(
                    1,
                    VisualDirective::ComparisonChart {
                        categories: vec!["Si".into(), "GaN".into()],
                        series: vec![Series { name: "Mobility".into(), values: vec![1.4, 2.0] }],
                    },
                ),
            ],
        };
        let loaded = tokio_test::block_on(async {
            save_script(&s, &path).await.unwrap();
            load_script(&path).await.unwrap()
        });
        assert_eq!(loaded, s);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
