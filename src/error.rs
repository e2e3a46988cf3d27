//! Error types for the edgequake-pdf2video library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`Pdf2VideoError`]: **fatal**, the run cannot produce a video. Every
//!   variant belongs to exactly one pipeline [`Stage`], so the CLI can tell
//!   the user *where* the run stopped (bad PDF vs. speech service down vs.
//!   ffmpeg crash) without string matching.
//!
//! * [`MediaError`]: a failure of an external tool (`ffmpeg`, `ffprobe`).
//!   It never escapes on its own; the stage that invoked the tool wraps it as
//!   the `#[source]` of its own variant.
//!
//! No stage retries. Either a complete video is written or none is.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    Extraction,
    Planning,
    Script,
    Render,
    Synthesis,
    Assembly,
    Config,
    Internal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Planning => "planning",
            Stage::Script => "script",
            Stage::Render => "render",
            Stage::Synthesis => "synthesis",
            Stage::Assembly => "assembly",
            Stage::Config => "configuration",
            Stage::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// All fatal errors returned by the edgequake-pdf2video library.
#[derive(Debug, Error)]
pub enum Pdf2VideoError {
    // ── Extraction ────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened fine but no page yielded any text (scanned images only).
    #[error("PDF '{path}' contains no extractable text")]
    NoExtractableText { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Planning ──────────────────────────────────────────────────────────
    /// None of the document's sections carried enough prose to narrate.
    #[error("No usable sections to plan from ({sections} sections found, none qualified)")]
    NoUsableSections { sections: usize },

    /// The scene limit was zero, so nothing could be planned.
    #[error("Scene limit is 0; at least one scene is required ({sections} sections available)")]
    ZeroSceneLimit { sections: usize },

    // ── Script file ───────────────────────────────────────────────────────
    /// Could not read a saved script.
    #[error("Failed to read script '{path}': {source}")]
    ScriptReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the script file.
    #[error("Failed to write script '{path}': {source}")]
    ScriptWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The script file parsed but breaks an invariant, or did not parse.
    #[error("Invalid script '{path}': {detail}")]
    InvalidScript { path: PathBuf, detail: String },

    // ── Render ────────────────────────────────────────────────────────────
    /// The visual directive names a kind this build cannot draw.
    #[error("Scene {ordinal}: unsupported visual kind")]
    UnsupportedVisual { ordinal: usize },

    /// The visual directive's parameters cannot be drawn.
    #[error("Scene {ordinal}: invalid visual parameters: {detail}")]
    InvalidVisual { ordinal: usize, detail: String },

    /// The configured font file could not be read or parsed.
    #[error("Failed to load font '{path}': {detail}")]
    FontLoadFailed { path: PathBuf, detail: String },

    /// Writing a rendered PNG failed.
    #[error("Failed to write image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    // ── Synthesis ─────────────────────────────────────────────────────────
    /// The speech service could not be reached (DNS, TLS, connection refused).
    #[error("Speech service '{service}' is unreachable: {reason}\nCheck your internet connection.")]
    SynthesisUnreachable { service: String, reason: String },

    /// The speech service did not answer in time.
    #[error("Speech service '{service}' timed out after {secs}s")]
    SynthesisTimeout { service: String, secs: u64 },

    /// The speech service answered with a non-success status.
    #[error("Speech service '{service}' rejected the request: HTTP {status}")]
    SynthesisRejected { service: String, status: u16 },

    /// Nothing to synthesize.
    #[error("Scene {ordinal} has empty narration")]
    EmptyNarration { ordinal: usize },

    /// The synthesized clip could not be stored or measured.
    #[error("Failed to measure narration clip '{path}'")]
    AudioProbeFailed {
        path: PathBuf,
        #[source]
        source: MediaError,
    },

    /// The synthesized clip could not be written to disk.
    #[error("Failed to write narration clip '{path}': {source}")]
    AudioWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Assembly ──────────────────────────────────────────────────────────
    /// Number of rendered asset sets does not match the number of scenes.
    #[error("Expected assets for {scenes} scenes, got {assets}")]
    AssetCountMismatch { scenes: usize, assets: usize },

    /// A scene's asset is missing on disk or belongs to another scene.
    #[error("Scene {ordinal}: missing {what} asset at '{path}'")]
    MissingAsset {
        ordinal: usize,
        what: &'static str,
        path: PathBuf,
    },

    /// ffmpeg failed while producing the video.
    #[error("Video encoding failed during {step}")]
    EncodeFailed {
        step: String,
        #[source]
        source: MediaError,
    },

    /// Could not create or move the final video into place.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2VideoError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        use Pdf2VideoError::*;
        match self {
            FileNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | DownloadFailed { .. }
            | DownloadTimeout { .. }
            | NotAPdf { .. }
            | CorruptPdf { .. }
            | PasswordRequired { .. }
            | WrongPassword { .. }
            | NoExtractableText { .. }
            | PdfiumBindingFailed(_) => Stage::Extraction,
            NoUsableSections { .. } | ZeroSceneLimit { .. } => Stage::Planning,
            ScriptReadFailed { .. } | ScriptWriteFailed { .. } | InvalidScript { .. } => {
                Stage::Script
            }
            UnsupportedVisual { .. }
            | InvalidVisual { .. }
            | FontLoadFailed { .. }
            | ImageWriteFailed { .. } => Stage::Render,
            SynthesisUnreachable { .. }
            | SynthesisTimeout { .. }
            | SynthesisRejected { .. }
            | EmptyNarration { .. }
            | AudioProbeFailed { .. }
            | AudioWriteFailed { .. } => Stage::Synthesis,
            AssetCountMismatch { .. }
            | MissingAsset { .. }
            | EncodeFailed { .. }
            | OutputWriteFailed { .. } => Stage::Assembly,
            InvalidConfig(_) => Stage::Config,
            Internal(_) => Stage::Internal,
        }
    }

    /// True when the failure came from an external service rather than from
    /// the document or this library.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Pdf2VideoError::SynthesisUnreachable { .. }
                | Pdf2VideoError::SynthesisTimeout { .. }
                | Pdf2VideoError::SynthesisRejected { .. }
                | Pdf2VideoError::DownloadFailed { .. }
                | Pdf2VideoError::DownloadTimeout { .. }
        )
    }
}

/// Failure of an external media tool.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The tool is not on PATH and no explicit path was configured.
    #[error("'{tool}' not found on PATH\nInstall it (e.g. `apt-get install ffmpeg`) or pass --{tool} <PATH>.")]
    NotFound { tool: String },

    /// The process could not be started.
    #[error("Failed to launch '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited non-zero.
    #[error("'{tool}' exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The process succeeded but printed something we could not interpret.
    #[error("Unexpected output from '{tool}': {detail}")]
    BadOutput { tool: String, detail: String },

    /// Local I/O around the tool invocation failed (frame PNG, concat list).
    #[error("I/O error preparing '{tool}' input: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}
