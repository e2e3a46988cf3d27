//! Video assembly: frames + narration → one MP4.
//!
//! Each scene becomes a still-image segment encoded by ffmpeg, held for
//! `max(target, narration)` seconds. Segments are joined with the concat
//! demuxer into a temp file beside the output and renamed into place, so
//! the output path holds either a complete video or nothing.

use crate::config::{Transition, VideoConfig};
use crate::error::{MediaError, Pdf2VideoError};
use crate::pipeline::character::compose_frame;
use crate::pipeline::media::{locate_tool, run_tool};
use crate::pipeline::speech::NarrationClip;
use crate::script::Scene;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Rendered inputs for one scene.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub ordinal: usize,
    /// Scene visual PNG, any size.
    pub visual: PathBuf,
    /// Transparent character sprite PNG.
    pub character: PathBuf,
    pub narration: NarrationClip,
}

/// Final on-screen time of one scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSegment {
    pub ordinal: usize,
    pub duration_secs: f64,
    /// True when narration outran the planned duration.
    pub extended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub segments: Vec<TimedSegment>,
    pub total_secs: f64,
}

#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub timeline: Timeline,
}

/// Pair scenes with assets and fix every segment's duration.
///
/// Segment duration is `max(scene.duration_secs, narration.duration_secs)`.
pub fn plan_timeline(scenes: &[Scene], assets: &[SceneAssets]) -> Result<Timeline, Pdf2VideoError> {
    if scenes.len() != assets.len() {
        return Err(Pdf2VideoError::AssetCountMismatch {
            scenes: scenes.len(),
            assets: assets.len(),
        });
    }

    let mut segments = Vec::with_capacity(scenes.len());
    for (scene, asset) in scenes.iter().zip(assets) {
        if asset.ordinal != scene.ordinal {
            return Err(Pdf2VideoError::MissingAsset {
                ordinal: scene.ordinal,
                what: "scene",
                path: asset.visual.clone(),
            });
        }
        let narration = asset.narration.duration_secs;
        segments.push(TimedSegment {
            ordinal: scene.ordinal,
            duration_secs: scene.duration_secs.max(narration),
            extended: narration > scene.duration_secs,
        });
    }

    let total_secs = segments.iter().map(|s| s.duration_secs).sum();
    Ok(Timeline {
        segments,
        total_secs,
    })
}

fn check_files(assets: &[SceneAssets]) -> Result<(), Pdf2VideoError> {
    for a in assets {
        for (what, path) in [
            ("visual", &a.visual),
            ("character", &a.character),
            ("narration", &a.narration.path),
        ] {
            if !path.is_file() {
                return Err(Pdf2VideoError::MissingAsset {
                    ordinal: a.ordinal,
                    what,
                    path: path.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Encode `scenes` with their `assets` into `output`.
///
/// Intermediate frames and segments go to `config.work_dir` when set,
/// otherwise to a temp directory beside `output` that is removed afterwards.
pub async fn assemble(
    scenes: &[Scene],
    assets: &[SceneAssets],
    config: &VideoConfig,
    output: &Path,
) -> Result<AssemblyReport, Pdf2VideoError> {
    let timeline = plan_timeline(scenes, assets)?;
    check_files(assets)?;

    let ffmpeg = locate_tool("ffmpeg", config.ffmpeg_path.as_deref()).map_err(|source| {
        Pdf2VideoError::EncodeFailed {
            step: "locating ffmpeg".into(),
            source,
        }
    })?;

    let out_dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let output_failed = |source| Pdf2VideoError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };
    tokio::fs::create_dir_all(&out_dir).await.map_err(output_failed)?;

    // Keep the scratch dir on the output's file system so the final rename is atomic.
    let scratch = tempfile::Builder::new()
        .prefix(".pdf2video-")
        .tempdir_in(&out_dir)
        .map_err(output_failed)?;
    let segment_dir = match &config.work_dir {
        Some(dir) => {
            let dir = dir.join("segments");
            tokio::fs::create_dir_all(&dir).await.map_err(output_failed)?;
            dir
        }
        None => scratch.path().to_path_buf(),
    };

    let result = encode_all(&ffmpeg, scenes, assets, &timeline, config, &segment_dir, &scratch, output).await;
    match result {
        Ok(()) => {
            info!(
                "Assembled {} segments ({:.1}s) into {}",
                timeline.segments.len(),
                timeline.total_secs,
                output.display()
            );
            Ok(AssemblyReport {
                output: output.to_path_buf(),
                timeline,
            })
        }
        Err(e) => {
            warn!("Assembly failed, no output written: {}", e);
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn encode_all(
    ffmpeg: &Path,
    scenes: &[Scene],
    assets: &[SceneAssets],
    timeline: &Timeline,
    config: &VideoConfig,
    segment_dir: &Path,
    scratch: &TempDir,
    output: &Path,
) -> Result<(), Pdf2VideoError> {
    let mut segment_paths = Vec::with_capacity(scenes.len());
    for ((scene, asset), segment) in scenes.iter().zip(assets).zip(&timeline.segments) {
        let frame = segment_dir.join(format!("frame_{:03}.png", scene.ordinal));
        write_frame(asset, config, &frame).await?;

        let path = segment_dir.join(format!("segment_{:03}.mp4", scene.ordinal));
        let args = segment_args(&frame, &asset.narration.path, segment.duration_secs, config, &path);
        run_tool(ffmpeg, &args).await.map_err(|source| Pdf2VideoError::EncodeFailed {
            step: format!("encoding scene {}", scene.ordinal),
            source,
        })?;
        debug!("Scene {}: segment of {:.2}s", scene.ordinal, segment.duration_secs);
        segment_paths.push(path);
    }

    let list = scratch.path().join("segments.txt");
    tokio::fs::write(&list, concat_list(&segment_paths))
        .await
        .map_err(|e| Pdf2VideoError::EncodeFailed {
            step: "writing concat list".into(),
            source: MediaError::Io {
                tool: "ffmpeg".into(),
                source: e,
            },
        })?;

    let partial = scratch.path().join("output.partial.mp4");
    let concat_args: Vec<OsString> = vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.into_os_string(),
        "-c".into(),
        "copy".into(),
        "-movflags".into(),
        "+faststart".into(),
        "-f".into(),
        "mp4".into(),
        partial.clone().into_os_string(),
    ];
    run_tool(ffmpeg, &concat_args)
        .await
        .map_err(|source| Pdf2VideoError::EncodeFailed {
            step: "concatenating segments".into(),
            source,
        })?;

    tokio::fs::rename(&partial, output)
        .await
        .map_err(|e| Pdf2VideoError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        })
}

/// Compose visual + character into the frame PNG, off the async workers.
async fn write_frame(asset: &SceneAssets, config: &VideoConfig, frame: &Path) -> Result<(), Pdf2VideoError> {
    let (visual, character, dest) = (asset.visual.clone(), asset.character.clone(), frame.to_path_buf());
    let config = config.clone();
    let ordinal = asset.ordinal;

    let io_failed = move |e: image::ImageError| Pdf2VideoError::EncodeFailed {
        step: format!("composing frame for scene {ordinal}"),
        source: MediaError::Io {
            tool: "frame".into(),
            source: std::io::Error::other(e),
        },
    };

    tokio::task::spawn_blocking(move || {
        let visual = image::open(&visual).map_err(io_failed)?.to_rgba8();
        let sprite = image::open(&character).map_err(io_failed)?.to_rgba8();
        compose_frame(&visual, &sprite, &config)
            .save(&dest)
            .map_err(io_failed)
    })
    .await
    .map_err(|e| Pdf2VideoError::Internal(format!("Frame task panicked: {}", e)))?
}

/// ffmpeg arguments for one still-image segment.
pub fn segment_args(
    frame: &Path,
    narration: &Path,
    duration_secs: f64,
    config: &VideoConfig,
    out: &Path,
) -> Vec<OsString> {
    let fps = config.fps.to_string();
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-framerate".into(),
        fps.clone().into(),
        "-i".into(),
        frame.into(),
        "-i".into(),
        narration.into(),
        "-vf".into(),
        video_filter(config, duration_secs).into(),
        "-af".into(),
        "apad".into(),
        "-t".into(),
        format!("{duration_secs:.3}").into(),
        "-r".into(),
        fps.into(),
        "-c:v".into(),
        "libx264".into(),
        "-tune".into(),
        "stillimage".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        "-ar".into(),
        "44100".into(),
        "-ac".into(),
        "2".into(),
    ];
    args.push(out.into());
    args
}

/// `-vf` chain: scale, pixel format, optional fades.
pub fn video_filter(config: &VideoConfig, duration_secs: f64) -> String {
    let mut filters = vec![
        format!("scale={}:{}", config.width, config.height),
        "format=yuv420p".to_string(),
    ];

    if let Transition::Fade { millis } = config.transition {
        let d = millis as f64 / 1000.0;
        if d > 0.0 && duration_secs > 2.0 * d {
            filters.push(format!("fade=t=in:st=0:d={d:.3}"));
            filters.push(format!("fade=t=out:st={:.3}:d={d:.3}", duration_secs - d));
        }
    }

    filters.join(",")
}

/// Concat-demuxer list, one `file '...'` line per segment.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Pose, VisualDirective};

    fn scene(ordinal: usize, duration_secs: f64) -> Scene {
        Scene {
            ordinal,
            title: format!("Scene {ordinal}"),
            narration: "Narration text for the scene.".into(),
            visual: VisualDirective::CrystalStructure,
            duration_secs,
            pose: Pose::Explaining,
        }
    }

    fn assets(ordinal: usize, narration_secs: f64) -> SceneAssets {
        SceneAssets {
            ordinal,
            visual: PathBuf::from(format!("/nonexistent/visual_{ordinal}.png")),
            character: PathBuf::from(format!("/nonexistent/character_{ordinal}.png")),
            narration: NarrationClip {
                path: PathBuf::from(format!("/nonexistent/narration_{ordinal}.mp3")),
                duration_secs: narration_secs,
            },
        }
    }

    #[test]
    fn segment_is_longest_of_target_and_narration() {
        let timeline = plan_timeline(&[scene(0, 5.0), scene(1, 3.0)], &[assets(0, 4.0), assets(1, 6.0)]).unwrap();
        let durations: Vec<_> = timeline.segments.iter().map(|s| s.duration_secs).collect();
        assert_eq!(durations, vec![5.0, 6.0]);
        assert_eq!(timeline.total_secs, 11.0);
        assert!(!timeline.segments[0].extended);
        assert!(timeline.segments[1].extended);
    }

    #[test]
    fn asset_count_must_match() {
        let err = plan_timeline(&[scene(0, 5.0)], &[]).unwrap_err();
        assert!(matches!(err, Pdf2VideoError::AssetCountMismatch { scenes: 1, assets: 0 }));
    }

    #[test]
    fn asset_ordinals_must_line_up() {
        let err = plan_timeline(&[scene(0, 5.0)], &[assets(3, 1.0)]).unwrap_err();
        assert!(matches!(err, Pdf2VideoError::MissingAsset { ordinal: 0, .. }));
    }

    #[tokio::test]
    async fn missing_files_fail_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("video.mp4");
        let config = VideoConfig::default();
        let err = assemble(&[scene(0, 5.0)], &[assets(0, 2.0)], &config, &out)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2VideoError::MissingAsset { what: "visual", .. }));
        assert!(!out.exists());
    }

    #[test]
    fn filter_chain_with_fade() {
        let config = VideoConfig::builder()
            .resolution(1280, 720)
            .transition(Transition::Fade { millis: 500 })
            .build()
            .unwrap();
        assert_eq!(
            video_filter(&config, 6.0),
            "scale=1280:720,format=yuv420p,fade=t=in:st=0:d=0.500,fade=t=out:st=5.500:d=0.500"
        );
        // too short to fit both fades
        assert_eq!(video_filter(&config, 0.8), "scale=1280:720,format=yuv420p");
    }

    #[test]
    fn plain_filter_chain() {
        assert_eq!(
            video_filter(&VideoConfig::default(), 5.0),
            "scale=1920:1080,format=yuv420p"
        );
    }

    #[test]
    fn concat_list_quotes_paths() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn segment_args_hold_duration_and_codecs() {
        let config = VideoConfig::default();
        let args = segment_args(
            Path::new("f.png"),
            Path::new("n.mp3"),
            6.25,
            &config,
            Path::new("s.mp4"),
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "6.250");
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert_eq!(args.last().unwrap(), "s.mp4");
    }
}
