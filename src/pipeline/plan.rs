//! Script planning: sections in, timed scenes out.
//!
//! Planning is a pure function of the document, the scene limit and the
//! [`PlanningRules`]. No I/O happens here, so the same inputs always give the
//! same script.

use crate::config::PlanningRules;
use crate::document::{Document, Section, SectionLabel};
use crate::error::Pdf2VideoError;
use crate::pipeline::narration::{narrate, word_count};
use crate::script::{Pose, Scene, Script, Series, VisualDirective};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Script title when the document has none.
pub const UNTITLED: &str = "Untitled";

pub const APPLICATION_ITEMS: &[&str] = &[
    "5G Communications",
    "Electric Vehicles",
    "Power Electronics",
    "RF Amplifiers",
    "Solar Inverters",
    "Radar Systems",
];

/// Device layers, substrate first.
pub const DEVICE_LAYERS: &[&str] = &[
    "Substrate",
    "Buffer Layer",
    "GaN Channel",
    "AlGaN Barrier",
    "Gate",
    "Source/Drain",
];

pub const COMPARED_MATERIALS: &[&str] = &["Si", "GaAs", "SiC", "GaN"];

/// Raw figures per material, in [`COMPARED_MATERIALS`] order.
pub const MATERIAL_FIGURES: &[(&str, [f64; 4])] = &[
    ("Breakdown Field", [0.3, 0.4, 3.0, 3.3]),
    ("Electron Mobility", [1.4, 8.5, 0.9, 2.0]),
    ("Thermal Conductivity", [1.5, 0.5, 4.9, 2.3]),
];

/// Plan with the default [`PlanningRules`].
pub fn plan(document: &Document, max_scenes: usize) -> Result<Script, Pdf2VideoError> {
    plan_with(document, max_scenes, &PlanningRules::default())
}

/// Plan a script of at most `max_scenes` scenes.
///
/// The earliest usable sections win. A section is usable when its body is at
/// least `rules.min_section_chars` long and its cleaned narration is not
/// empty. A `max_scenes` of 0 is rejected with
/// [`Pdf2VideoError::ZeroSceneLimit`].
pub fn plan_with(
    document: &Document,
    max_scenes: usize,
    rules: &PlanningRules,
) -> Result<Script, Pdf2VideoError> {
    if max_scenes == 0 {
        return Err(Pdf2VideoError::ZeroSceneLimit {
            sections: document.sections.len(),
        });
    }

    let picked: Vec<(&Section, String)> = document
        .sections
        .iter()
        .filter(|s| s.text.trim().chars().count() >= rules.min_section_chars)
        .filter_map(|s| {
            let narration = narrate(&s.text, rules);
            if narration.is_empty() {
                debug!("Section {} '{}' has no speakable sentences", s.index, s.heading);
                None
            } else {
                Some((s, narration))
            }
        })
        .take(max_scenes)
        .collect();

    if picked.is_empty() {
        return Err(Pdf2VideoError::NoUsableSections {
            sections: document.sections.len(),
        });
    }

    let count = picked.len();
    let scenes: Vec<Scene> = picked
        .into_iter()
        .enumerate()
        .map(|(ordinal, (section, narration))| {
            let title = clean_title(&section.heading);
            let duration_secs = target_duration(word_count(&narration), rules);
            Scene {
                ordinal,
                visual: visual_for(section.label, &title),
                title,
                narration,
                duration_secs,
                pose: Pose::for_position(ordinal, count),
            }
        })
        .collect();

    let script = Script {
        title: document
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        scenes,
    };

    info!(
        "Planned {} scenes ({:.1}s) from {} sections",
        script.len(),
        script.total_duration_secs(),
        document.sections.len()
    );
    Ok(script)
}

/// `max(min_scene_secs, words × 60 / words_per_minute)`.
pub fn target_duration(words: usize, rules: &PlanningRules) -> f64 {
    let spoken = words as f64 * 60.0 / rules.words_per_minute;
    spoken.max(rules.min_scene_secs)
}

static RE_LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*\.?\s*").expect("valid regex"));

/// Drop leading numbering and soften shouting.
///
/// `"2. MATERIAL PROPERTIES"` → `"Material Properties"`. All-caps words of
/// 3 chars or less (`"GAN"`, `"RF"`) are kept as acronyms.
pub fn clean_title(heading: &str) -> String {
    let stripped = RE_LEADING_NUMBER.replace(heading.trim(), "");
    let cleaned = stripped
        .split_whitespace()
        .map(|word| {
            let is_upper = word.chars().any(|c| c.is_alphabetic())
                && !word.chars().any(|c| c.is_lowercase());
            if is_upper && word.chars().count() > 3 {
                capitalize(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        heading.trim().to_string()
    } else {
        cleaned
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Fixed label → visual mapping.
pub fn visual_for(label: SectionLabel, title: &str) -> VisualDirective {
    match label {
        SectionLabel::Introduction => VisualDirective::CrystalStructure,
        SectionLabel::Applications => VisualDirective::ApplicationChart {
            items: APPLICATION_ITEMS.iter().map(|s| s.to_string()).collect(),
        },
        SectionLabel::Structure => VisualDirective::LayerDiagram {
            layers: DEVICE_LAYERS.iter().map(|s| s.to_string()).collect(),
        },
        SectionLabel::Performance => VisualDirective::ComparisonChart {
            categories: COMPARED_MATERIALS.iter().map(|s| s.to_string()).collect(),
            series: MATERIAL_FIGURES
                .iter()
                .map(|(name, values)| Series {
                    name: name.to_string(),
                    values: values.to_vec(),
                })
                .collect(),
        },
        SectionLabel::Reliability | SectionLabel::Conclusion | SectionLabel::General => {
            VisualDirective::Generic {
                seed: stable_seed(title),
            }
        }
    }
}

/// 64-bit FNV-1a. Stable across builds and platforms.
pub fn stable_seed(text: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
