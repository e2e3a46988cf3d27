//! Extracted document model: raw text plus coarse sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text extracted from a PDF, split into ordered [`Section`]s.
///
/// Immutable once built by [`crate::pipeline::extract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path the text was read from (the downloaded temp copy for URL inputs).
    pub source: PathBuf,
    /// PDF metadata title, or the file stem when the metadata is empty.
    pub title: Option<String>,
    pub page_count: usize,
    /// All page text joined with newlines.
    pub text: String,
    pub sections: Vec<Section>,
}

impl Document {
    /// Build a document directly from sections, e.g. in tests or when text
    /// comes from somewhere other than a PDF.
    pub fn from_sections(title: Option<String>, sections: Vec<Section>) -> Self {
        let text = sections
            .iter()
            .map(|s| format!("{}\n{}", s.heading, s.text))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            source: PathBuf::new(),
            title,
            page_count: 0,
            text,
            sections,
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A contiguous span of the document under one heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Position in the document, starting at 0.
    pub index: usize,
    /// Heading line as it appeared in the PDF.
    pub heading: String,
    pub label: SectionLabel,
    /// Body text with line breaks flattened to spaces.
    pub text: String,
}

impl Section {
    pub fn new(index: usize, heading: impl Into<String>, text: impl Into<String>) -> Self {
        let heading = heading.into();
        let label = SectionLabel::infer(&heading);
        Self {
            index,
            heading,
            label,
            text: text.into(),
        }
    }
}

/// Topic inferred from a section heading.
///
/// Best effort: a wrong label only changes which diagram the scene shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    Introduction,
    Applications,
    Structure,
    Performance,
    Reliability,
    Conclusion,
    #[default]
    General,
}

impl SectionLabel {
    /// Keyword table checked in order; the first hit wins.
    const KEYWORDS: &'static [(&'static str, SectionLabel)] = &[
        ("introduction", SectionLabel::Introduction),
        ("overview", SectionLabel::Introduction),
        ("application", SectionLabel::Applications),
        ("structure", SectionLabel::Structure),
        ("architecture", SectionLabel::Structure),
        ("layer", SectionLabel::Structure),
        ("fabrication", SectionLabel::Structure),
        ("performance", SectionLabel::Performance),
        ("efficiency", SectionLabel::Performance),
        ("comparison", SectionLabel::Performance),
        ("reliability", SectionLabel::Reliability),
        ("conclusion", SectionLabel::Conclusion),
        ("summary", SectionLabel::Conclusion),
    ];

    /// Classify a heading by keyword.
    pub fn infer(heading: &str) -> Self {
        let lower = heading.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(kw, _)| lower.contains(kw))
            .map(|(_, label)| *label)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_labels_from_headings() {
        assert_eq!(SectionLabel::infer("1. INTRODUCTION"), SectionLabel::Introduction);
        assert_eq!(SectionLabel::infer("Technology Overview"), SectionLabel::Introduction);
        assert_eq!(SectionLabel::infer("RF Applications"), SectionLabel::Applications);
        assert_eq!(SectionLabel::infer("HEMT Layer Structure"), SectionLabel::Structure);
        assert_eq!(SectionLabel::infer("Performance vs. SiC"), SectionLabel::Performance);
        assert_eq!(SectionLabel::infer("Long-term Reliability"), SectionLabel::Reliability);
        assert_eq!(SectionLabel::infer("Summary"), SectionLabel::Conclusion);
        assert_eq!(SectionLabel::infer("Material Properties"), SectionLabel::General);
    }

    #[test]
    fn from_sections_concatenates_text() {
        let doc = Document::from_sections(
            Some("GaN".into()),
            vec![Section::new(0, "Intro", "alpha"), Section::new(1, "Next", "beta")],
        );
        assert_eq!(doc.text, "Intro\nalpha\nNext\nbeta");
        assert_eq!(doc.sections[0].label, SectionLabel::Introduction);
        assert_eq!(doc.char_count(), doc.text.len());
    }
}
