//! Text extraction and section segmentation.
//!
//! pdfium pulls the text layer page by page (inside `spawn_blocking`; the
//! library keeps thread-local state and must not run on async workers).
//! The flattened text is then cut into [`Section`]s at lines that look like
//! headings. The heading heuristic is deliberately loose: a missed heading
//! merges two sections, a false one splits a section. Neither is fatal.

use crate::document::{Document, Section};
use crate::error::Pdf2VideoError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

/// Heading used for text that precedes the first detected heading.
pub const LEADING_SECTION_HEADING: &str = "Introduction";

/// Headings are short; long lines are always body text.
const MAX_HEADING_CHARS: usize = 100;

/// Keyword headings must also be short phrases, not sentences.
const MAX_KEYWORD_HEADING_WORDS: usize = 8;

const HEADER_KEYWORDS: &[&str] = &[
    "introduction",
    "overview",
    "conclusion",
    "summary",
    "properties",
    "applications",
    "technology",
    "performance",
];

static RE_NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\.?\s+[A-Z]").expect("valid regex"));

/// Extract text from the PDF at `pdf_path` and segment it.
pub async fn extract_document(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<Document, Pdf2VideoError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);

    let (title, page_count, text) =
        tokio::task::spawn_blocking(move || extract_text_blocking(&path, pwd.as_deref()))
            .await
            .map_err(|e| Pdf2VideoError::Internal(format!("Extraction task panicked: {}", e)))??;

    if text.trim().is_empty() {
        return Err(Pdf2VideoError::NoExtractableText {
            path: pdf_path.to_path_buf(),
        });
    }

    let sections = segment_sections(&text);
    info!(
        "Extracted {} chars from {} pages into {} sections",
        text.chars().count(),
        page_count,
        sections.len()
    );

    let title = title.or_else(|| {
        pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
    });

    Ok(Document {
        source: pdf_path.to_path_buf(),
        title,
        page_count,
        text,
        sections,
    })
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2VideoError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => {
            debug!("Binding pdfium from PDFIUM_LIB_PATH={}", lib);
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Pdf2VideoError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Returns `(metadata title, page count, text)`.
fn extract_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<(Option<String>, usize, String), Pdf2VideoError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.to_lowercase().contains("password") {
            if password.is_some() {
                Pdf2VideoError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2VideoError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2VideoError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let title = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().trim().to_string())
        .filter(|t| !t.is_empty());

    let pages = document.pages();
    let page_count = pages.len() as usize;
    let mut text = String::new();

    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(page_text) => {
                let s = page_text.all();
                debug!("Page {}: {} chars", idx + 1, s.len());
                text.push_str(&s);
                text.push('\n');
            }
            Err(e) => warn!("Page {}: text layer unreadable: {:?}", idx + 1, e),
        }
    }

    Ok((title, page_count, text))
}

/// Split flattened PDF text into sections at heading-like lines.
///
/// Text before the first heading goes into a section headed
/// [`LEADING_SECTION_HEADING`]. Sections without body text are dropped and
/// the survivors are re-indexed from 0.
pub fn segment_sections(text: &str) -> Vec<Section> {
    let mut raw: Vec<(String, String)> = Vec::new();
    let mut heading = LEADING_SECTION_HEADING.to_string();
    let mut body = String::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_section_heading(line) {
            raw.push((std::mem::replace(&mut heading, line.to_string()), std::mem::take(&mut body)));
        } else {
            append_line(&mut body, line);
        }
    }
    raw.push((heading, body));

    raw.into_iter()
        .filter(|(_, body)| !body.trim().is_empty())
        .enumerate()
        .map(|(index, (heading, body))| Section::new(index, heading, body))
        .collect()
}

/// Join a line onto the body, re-joining words hyphenated across lines.
fn append_line(body: &mut String, line: &str) {
    let rejoin = body.ends_with('-')
        && body
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| c.is_alphabetic())
        && line.chars().next().is_some_and(|c| c.is_lowercase());

    if rejoin {
        body.pop();
    } else if !body.is_empty() {
        body.push(' ');
    }
    body.push_str(line);
}

/// Heuristic heading detector.
pub fn is_section_heading(line: &str) -> bool {
    if line.chars().count() >= MAX_HEADING_CHARS {
        return false;
    }

    let has_letters = line.chars().any(|c| c.is_alphabetic());
    let all_caps = has_letters && !line.chars().any(|c| c.is_lowercase());
    if all_caps {
        return true;
    }

    if RE_NUMBERED_HEADING.is_match(line) && !line.ends_with('.') {
        return true;
    }

    let lower = line.to_lowercase();
    HEADER_KEYWORDS.iter().any(|kw| lower.contains(kw))
        && line.split_whitespace().count() <= MAX_KEYWORD_HEADING_WORDS
        && !line.ends_with(['.', ',', ';', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SectionLabel;

    #[test]
    fn heading_detection() {
        assert!(is_section_heading("MATERIAL PROPERTIES"));
        assert!(is_section_heading("2. Device Structure"));
        assert!(is_section_heading("3.1 Buffer Layers"));
        assert!(is_section_heading("Applications of GaN"));
        assert!(!is_section_heading("GaN offers superior performance in many designs."));
        assert!(!is_section_heading("the device performance improves when the gate length shrinks and"));
        assert!(!is_section_heading("42"));
        assert!(!is_section_heading(&"A".repeat(120)));
    }

    #[test]
    fn leading_text_becomes_introduction() {
        let text = "Gallium nitride is a wide bandgap material.\nIt conducts well.\nAPPLICATIONS\nRadar and 5G.";
        let sections = segment_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Introduction");
        assert_eq!(sections[0].label, SectionLabel::Introduction);
        assert_eq!(
            sections[0].text,
            "Gallium nitride is a wide bandgap material. It conducts well."
        );
        assert_eq!(sections[1].heading, "APPLICATIONS");
        assert_eq!(sections[1].label, SectionLabel::Applications);
        assert_eq!(sections[1].index, 1);
    }

    #[test]
    fn empty_sections_are_dropped_and_reindexed() {
        let text = "TITLE PAGE\n\nOVERVIEW\nBody one.\nEMPTY\nPERFORMANCE\nBody two.";
        let sections = segment_sections(text);
        let headings: Vec<_> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["OVERVIEW", "PERFORMANCE"]);
        assert_eq!(sections[1].index, 1);
    }

    #[test]
    fn hyphenated_line_breaks_are_rejoined() {
        let sections = segment_sections("The transis-\ntor switches. Wide-\nBandgap stays.");
        assert_eq!(
            sections[0].text,
            "The transistor switches. Wide- Bandgap stays."
        );
    }

    #[test]
    fn no_text_means_no_sections() {
        assert!(segment_sections("").is_empty());
        assert!(segment_sections("\n\n  \n").is_empty());
    }
}
