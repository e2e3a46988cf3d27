//! Narration synthesis.
//!
//! [`Synthesizer`] is the seam between the pipeline and whatever produces
//! speech. The default [`GoogleTts`] talks to the public Google Translate
//! speech endpoint; tests and offline setups inject their own implementation
//! via [`crate::config::VideoConfigBuilder::synthesizer`].

use crate::config::VideoConfig;
use crate::error::Pdf2VideoError;
use crate::pipeline::media::{locate_tool, probe_duration};
use crate::script::Scene;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A synthesized narration clip and its measured length.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationClip {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Turns narration text into an audio file.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Write speech for `text` to `dest` and report its duration.
    ///
    /// `text` is never empty. Network or service failures must be reported
    /// as synthesis errors so callers can tell them from internal bugs.
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<NarrationClip, Pdf2VideoError>;
}

/// Synthesize the narration of `scene` into `dir`.
pub async fn synthesize_scene(
    synthesizer: &dyn Synthesizer,
    scene: &Scene,
    dir: &Path,
) -> Result<NarrationClip, Pdf2VideoError> {
    if scene.narration.trim().is_empty() {
        return Err(Pdf2VideoError::EmptyNarration {
            ordinal: scene.ordinal,
        });
    }
    let dest = dir.join(format!("narration_{:03}.mp3", scene.ordinal));
    let clip = synthesizer.synthesize(&scene.narration, &dest).await?;
    debug!(
        "Scene {}: {:.2}s of narration from {}",
        scene.ordinal,
        clip.duration_secs,
        synthesizer.name()
    );
    Ok(clip)
}

// ── Google Translate TTS ─────────────────────────────────────────────────

pub const GOOGLE_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects longer `q` values.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Default synthesizer backed by the Google Translate speech endpoint.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    timeout_secs: u64,
    ffprobe: Option<PathBuf>,
}

impl GoogleTts {
    pub fn new(language: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: GOOGLE_TTS_ENDPOINT.to_string(),
            language: language.into(),
            timeout_secs,
            ffprobe: None,
        }
    }

    /// Language, timeout and ffprobe location taken from `config`.
    pub fn from_config(config: &VideoConfig) -> Self {
        let mut tts = Self::new(config.language.clone(), config.tts_timeout_secs);
        tts.ffprobe = config.ffprobe_path.clone();
        tts
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_ffprobe(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe = Some(path.into());
        self
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>, Pdf2VideoError> {
        let service = self.name().to_string();
        let (total, idx, textlen) = (
            total.to_string(),
            idx.to_string(),
            chunk.chars().count().to_string(),
        );
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(Duration::from_secs(self.timeout_secs))
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Pdf2VideoError::SynthesisRejected {
                service,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_request_error(e))?;
        Ok(bytes.to_vec())
    }

    fn map_request_error(&self, e: reqwest::Error) -> Pdf2VideoError {
        if e.is_timeout() {
            Pdf2VideoError::SynthesisTimeout {
                service: self.name().to_string(),
                secs: self.timeout_secs,
            }
        } else {
            Pdf2VideoError::SynthesisUnreachable {
                service: self.name().to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Synthesizer for GoogleTts {
    fn name(&self) -> &str {
        "google-tts"
    }

    async fn synthesize(&self, text: &str, dest: &Path) -> Result<NarrationClip, Pdf2VideoError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            // MP3 frames are self-delimiting, so consecutive responses concatenate cleanly.
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len()).await?);
        }

        tokio::fs::write(dest, &audio)
            .await
            .map_err(|e| Pdf2VideoError::AudioWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;

        let probe_failed = |source| Pdf2VideoError::AudioProbeFailed {
            path: dest.to_path_buf(),
            source,
        };
        let ffprobe = locate_tool("ffprobe", self.ffprobe.as_deref()).map_err(probe_failed)?;
        let duration_secs = probe_duration(&ffprobe, dest).await.map_err(probe_failed)?;

        info!(
            "Synthesized {} chunks ({} bytes, {:.2}s) to {}",
            chunks.len(),
            audio.len(),
            duration_secs,
            dest.display()
        );
        Ok(NarrationClip {
            path: dest.to_path_buf(),
            duration_secs,
        })
    }
}

/// Split `text` into pieces of at most `max_chars`, breaking between words.
///
/// A single word longer than `max_chars` is split mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();
        if !current.is_empty() && current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if word_len <= max_chars {
            current.push_str(word);
        } else {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Pose, VisualDirective};

    #[test]
    fn chunks_respect_limit_and_word_boundaries() {
        let text = "Gallium nitride high electron mobility transistors switch quickly. ".repeat(4);
        let chunks = chunk_text(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(c.chars().count() <= MAX_CHUNK_CHARS);
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
        }
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn long_words_are_split() {
        assert_eq!(chunk_text("abcdefgh ij", 3), vec!["abc", "def", "gh", "ij"]);
        assert!(chunk_text("   ", 10).is_empty());
    }

    fn scene(narration: &str) -> Scene {
        Scene {
            ordinal: 2,
            title: "Outlook".into(),
            narration: narration.into(),
            visual: VisualDirective::Generic { seed: 1 },
            duration_secs: 5.0,
            pose: Pose::Explaining,
        }
    }

    #[tokio::test]
    async fn empty_narration_is_rejected_before_synthesis() {
        let tts = GoogleTts::new("en", 1);
        let dir = tempfile::tempdir().unwrap();
        let err = synthesize_scene(&tts, &scene("  "), dir.path()).await.unwrap_err();
        assert!(matches!(err, Pdf2VideoError::EmptyNarration { ordinal: 2 }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_synthesis_error() {
        // nothing listens on the discard port locally
        let tts = GoogleTts::new("en", 2).with_endpoint("http://127.0.0.1:9/translate_tts");
        let dir = tempfile::tempdir().unwrap();
        let err = synthesize_scene(&tts, &scene("Hello from the test suite."), dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::Synthesis);
        assert!(err.is_external());
        assert!(!dir.path().join("narration_002.mp3").exists());
    }
}
