//! Thin async wrappers around `ffmpeg` and `ffprobe`.
//!
//! Tools are resolved once per run (explicit path from the config, else
//! `PATH` via `which`) and invoked through `tokio::process` with stderr
//! captured, so a failed encode reports what ffmpeg actually said.

use crate::error::MediaError;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept in [`MediaError::Failed`].
const STDERR_TAIL_LINES: usize = 12;

/// Resolve a tool binary.
///
/// An explicit path is used as-is when it points at a file; a bare name is
/// looked up on `PATH`.
pub fn locate_tool(name: &str, explicit: Option<&Path>) -> Result<PathBuf, MediaError> {
    let not_found = || MediaError::NotFound {
        tool: name.to_string(),
    };
    match explicit {
        Some(p) if p.is_file() => Ok(p.to_path_buf()),
        Some(p) => which::which(p).map_err(|_| not_found()),
        None => which::which(name).map_err(|_| not_found()),
    }
}

fn tool_name(tool: &Path) -> String {
    tool.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| tool.display().to_string())
}

/// Run `tool` with `args`; returns stdout on success.
pub async fn run_tool<I, S>(tool: &Path, args: I) -> Result<Vec<u8>, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = tool_name(tool);
    let mut cmd = Command::new(tool);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!("Running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| MediaError::Spawn {
        tool: name.clone(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(MediaError::Failed {
            tool: name,
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(output.stdout)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Container duration of a media file, in seconds.
pub async fn probe_duration(ffprobe: &Path, media: &Path) -> Result<f64, MediaError> {
    let stdout = run_tool(
        ffprobe,
        [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-show_entries"),
            OsStr::new("format=duration"),
            OsStr::new("-of"),
            OsStr::new("json"),
            media.as_os_str(),
        ],
    )
    .await?;

    parse_probe_duration(&stdout).map_err(|detail| MediaError::BadOutput {
        tool: tool_name(ffprobe),
        detail,
    })
}

/// Parse `ffprobe -of json -show_entries format=duration` output.
pub fn parse_probe_duration(stdout: &[u8]) -> Result<f64, String> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid JSON: {e}"))?;
    let raw = parsed
        .format
        .duration
        .ok_or_else(|| "no duration reported".to_string())?;
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("unparseable duration '{raw}'"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("invalid duration {secs}"));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_json() {
        let out = br#"{ "format": { "duration": "3.456000" } }"#;
        assert_eq!(parse_probe_duration(out).unwrap(), 3.456);
    }

    #[test]
    fn rejects_missing_or_bad_duration() {
        assert!(parse_probe_duration(br#"{ "format": {} }"#).is_err());
        assert!(parse_probe_duration(br#"{ "format": { "duration": "N/A" } }"#).is_err());
        assert!(parse_probe_duration(b"not json").is_err());
    }

    #[test]
    fn missing_tool_is_not_found() {
        let err = locate_tool("pdf2video-no-such-tool", None).unwrap_err();
        assert!(matches!(err, MediaError::NotFound { ref tool } if tool == "pdf2video-no-such-tool"));

        let err = locate_tool("ffmpeg", Some(Path::new("/no/such/dir/ffmpeg"))).unwrap_err();
        assert!(matches!(err, MediaError::NotFound { .. }));
    }

    #[test]
    fn stderr_is_trimmed_to_tail() {
        let noisy: String = (0..40).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(noisy.as_bytes());
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 39"));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let err = run_tool(Path::new("/no/such/binary"), ["-version"]).await.unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_keeps_stderr() {
        let sh = locate_tool("sh", None).unwrap();
        let err = run_tool(&sh, ["-c", "echo broken pipe >&2; exit 3"]).await.unwrap_err();
        match err {
            MediaError::Failed { tool, stderr, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(stderr, "broken pipe");
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
