//! Text rasterization for scene visuals.
//!
//! Glyphs are outlined with `ab_glyph` and blended onto a [`Canvas`] with
//! their coverage as alpha. A DejaVu Sans face is compiled in, so every run
//! can label its diagrams; `VideoConfig::font_file` swaps in another face.

use crate::error::Pdf2VideoError;
use crate::pipeline::canvas::{with_alpha, Canvas};
use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::Rgba;
use once_cell::sync::Lazy;
use std::fmt;
use std::path::Path;

static BUNDLED_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

static BUNDLED: Lazy<FontArc> =
    Lazy::new(|| FontArc::try_from_slice(BUNDLED_TTF).expect("bundled font is a valid TrueType file"));

/// Smallest size [`Typeface::fit`] will shrink to.
const MIN_SIZE: f32 = 8.0;

/// A loaded font face.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl Typeface {
    /// The compiled-in DejaVu Sans face.
    pub fn bundled() -> Self {
        Self {
            font: BUNDLED.clone(),
        }
    }

    /// Load a TrueType/OpenType file.
    pub fn load(path: &Path) -> Result<Self, Pdf2VideoError> {
        let failed = |detail: String| Pdf2VideoError::FontLoadFailed {
            path: path.to_path_buf(),
            detail,
        };
        let bytes = std::fs::read(path).map_err(|e| failed(e.to_string()))?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| failed(e.to_string()))?;
        Ok(Self { font })
    }

    /// The configured face, or the bundled one.
    pub fn from_config(font_file: Option<&Path>) -> Result<Self, Pdf2VideoError> {
        match font_file {
            Some(path) => Self::load(path),
            None => Ok(Self::bundled()),
        }
    }

    /// Advance width of a single line at `size` pixels.
    pub fn line_width(&self, line: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Largest size up to `size` at which every line fits in `max_width`.
    pub fn fit(&self, text: &str, size: f32, max_width: f32) -> f32 {
        let widest = text
            .lines()
            .map(|l| self.line_width(l, size))
            .fold(0.0_f32, f32::max);
        if widest <= max_width || widest <= 0.0 {
            size
        } else {
            (size * max_width / widest).max(MIN_SIZE)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub align: Align,
    pub color: Rgba<u8>,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgba<u8>) -> Self {
        Self {
            size,
            align: Align::Center,
            color,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

impl Canvas {
    /// Draw `text`, one line per `\n`, anchored horizontally at `x` per
    /// `style.align` and with the block centred vertically on `y`.
    pub fn text(&mut self, face: &Typeface, text: &str, x: f32, y: f32, style: TextStyle) {
        let scaled = face.font.as_scaled(PxScale::from(style.size));
        let line_height = scaled.height() + scaled.line_gap();
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return;
        }

        let block = line_height * lines.len() as f32 - scaled.line_gap();
        let mut top = y - block / 2.0;
        for line in lines {
            let width = face.line_width(line, style.size);
            let left = match style.align {
                Align::Left => x,
                Align::Center => x - width / 2.0,
                Align::Right => x - width,
            };
            self.glyph_run(face, line, left, top + scaled.ascent(), style);
            top += line_height;
        }
    }

    fn glyph_run(&mut self, face: &Typeface, line: &str, x: f32, baseline: f32, style: TextStyle) {
        let scale = PxScale::from(style.size);
        let scaled = face.font.as_scaled(scale);
        let mut caret = x;
        let mut prev: Option<GlyphId> = None;

        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            prev = Some(id);

            let Some(outlined) = face.font.outline_glyph(glyph) else {
                continue; // whitespace
            };
            let bounds = outlined.px_bounds();
            let (ox, oy) = (bounds.min.x as i64, bounds.min.y as i64);
            outlined.draw(|gx, gy, coverage| {
                let alpha = (style.color[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
                if alpha > 0 {
                    self.blend_pixel(ox + gx as i64, oy + gy as i64, with_alpha(style.color, alpha));
                }
            });
        }
    }
}
