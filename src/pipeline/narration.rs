//! Narration cleanup: turn raw section text into speakable sentences.
//!
//! Text pulled from a PDF is full of things a speech engine reads out badly:
//! citation markers, author-year parentheticals, URLs, stray markup. This
//! module applies deterministic cleanup rules in a fixed order, then selects
//! and caps sentences so every scene's narration reads naturally at speech
//! pace.
//!
//! ## Rule Order
//!
//! Invisible characters go first so later regexes see clean text; citations
//! are removed before markup stripping (brackets are markup); whitespace is
//! collapsed last because every earlier rule can leave gaps behind.

use crate::config::PlanningRules;
use once_cell::sync::Lazy;
use regex::Regex;

/// Produce speech-ready narration from a section body.
///
/// Returns an empty string when no sentence survives selection.
///
/// 1. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Remove bracket citations: `[12]`, `[3, 4]`, `[5–7]`
/// 3. Remove parentheticals that contain a year: `(Smith et al., 2019)`
/// 4. Replace "et al." with "and colleagues"
/// 5. Remove URLs
/// 6. Remove markup characters
/// 7. Collapse whitespace
/// 8. Split into sentences and keep the first candidates worth speaking
/// 9. Join, terminate, and cap the length
pub fn narrate(raw: &str, rules: &PlanningRules) -> String {
    let s = clean_text(raw);
    let sentences = select_sentences(&s, rules);
    cap_narration(&sentences, rules.max_narration_chars)
}

/// Rules 1–7.
pub fn clean_text(raw: &str) -> String {
    let s = remove_invisible_chars(raw);
    let s = remove_bracket_citations(&s);
    let s = remove_year_parentheticals(&s);
    let s = expand_et_al(&s);
    let s = remove_urls(&s);
    let s = remove_markup(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Bracket citations ────────────────────────────────────────────────

static RE_BRACKET_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[\d+(?:\s*[,–-]\s*\d+)*\]").expect("valid regex"));

fn remove_bracket_citations(input: &str) -> String {
    RE_BRACKET_CITATION.replace_all(input, "").to_string()
}

// ── Rule 3: Author-year parentheticals ───────────────────────────────────────

static RE_YEAR_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\b(?:19|20)\d{2}[a-z]?\b[^)]*\)").expect("valid regex"));

fn remove_year_parentheticals(input: &str) -> String {
    RE_YEAR_PAREN.replace_all(input, "").to_string()
}

// ── Rule 4: et al. ───────────────────────────────────────────────────────────

static RE_ET_AL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bet al\.?").expect("valid regex"));

fn expand_et_al(input: &str) -> String {
    RE_ET_AL.replace_all(input, "and colleagues").to_string()
}

// ── Rule 5: URLs ─────────────────────────────────────────────────────────────

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:https?://|www\.)\S+").expect("valid regex"));

fn remove_urls(input: &str) -> String {
    RE_URL.replace_all(input, "").to_string()
}

// ── Rule 6: Markup ───────────────────────────────────────────────────────────

fn remove_markup(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '*' | '_' | '#' | '`' | '|' | '<' | '>' | '{' | '}' | '[' | ']' | '^' | '~' | '\\' => {
                ' '
            }
            '•' | '▪' | '◦' => ' ',
            other => other,
        })
        .collect()
}

// ── Rule 7: Whitespace ───────────────────────────────────────────────────────

static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,;:!?])").expect("valid regex"));

fn collapse_whitespace(input: &str) -> String {
    let joined = input.split_whitespace().collect::<Vec<_>>().join(" ");
    RE_SPACE_BEFORE_PUNCT.replace_all(&joined, "$1").to_string()
}

// ── Rule 8: Sentence selection ───────────────────────────────────────────────

/// Terminal punctuation followed by whitespace or the end of the text, so
/// decimals like `3.4` stay inside their sentence.
static RE_SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex"));

/// Marks a sentence as a caption or cross-reference.
static RE_SKIP_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:figs?|figures?|tables?|equations?|eqs?)\b").expect("valid regex")
});

/// Split into sentences and keep the first `max_sentences` candidates that
/// are long enough and do not refer to figures, tables or equations.
///
/// Only the first `max_sentences` raw sentences are considered, so the
/// narration always comes from the opening of the section.
pub fn select_sentences(text: &str, rules: &PlanningRules) -> Vec<String> {
    RE_SENTENCE_END
        .split(text)
        .take(rules.max_sentences)
        .map(str::trim)
        .filter(|s| s.chars().count() > rules.min_sentence_chars)
        .filter(|s| !RE_SKIP_REFERENCE.is_match(s))
        .map(str::to_string)
        .collect()
}

// ── Rule 9: Join and cap ─────────────────────────────────────────────────────

/// Join sentences as `"A. B."` without exceeding `max_chars`.
///
/// Whole trailing sentences are dropped first. When even the first sentence
/// is too long, it is cut at the last word boundary that fits.
pub fn cap_narration(sentences: &[String], max_chars: usize) -> String {
    let mut out = String::new();
    for sentence in sentences {
        let candidate = if out.is_empty() {
            format!("{sentence}.")
        } else {
            format!("{out} {sentence}.")
        };
        if candidate.chars().count() <= max_chars {
            out = candidate;
        } else {
            break;
        }
    }

    if out.is_empty() {
        if let Some(first) = sentences.first() {
            out = cut_at_word(first, max_chars.saturating_sub(1));
            if !out.is_empty() {
                out.push('.');
            }
        }
    }
    out
}

fn cut_at_word(s: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for word in s.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > max_chars {
            break;
        }
        if extra == 1 {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.trim_end_matches([',', ';', ':']).to_string()
}

/// Number of spoken words.
pub fn word_count(narration: &str) -> usize {
    narration.split_whitespace().count()
}
