//! Scene visuals: one fixed drawing routine per [`VisualDirective`] kind.
//!
//! Every visual is drawn on a dark 1920×1080 canvas with the scene title in
//! a banner across the top; the assembler scales the image to the output
//! size. Diagram geometry is laid out on a 10×10 unit grid below the banner.

use crate::error::Pdf2VideoError;
use crate::pipeline::canvas::{rgb, with_alpha, Canvas};
use crate::pipeline::text::{Align, TextStyle, Typeface};
use crate::script::{Series, VisualDirective};
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

pub const VISUAL_WIDTH: u32 = 1920;
pub const VISUAL_HEIGHT: u32 = 1080;

const BACKGROUND: u32 = 0x0a0a0a;
const BANNER_FILL: u32 = 0x1a1a1a;
const ACCENT: u32 = 0x4a90e2;
const HIGHLIGHT: u32 = 0xffd700;

/// Banner box `(x, y, w, h)` in visual pixels.
pub const BANNER: (f32, f32, f32, f32) = (160.0, 30.0, 1600.0, 110.0);

const TITLE_SIZE: f32 = 56.0;
const LABEL_SIZE: f32 = 26.0;

const HUB_LABEL: &str = "GaN\nTechnology";
const CRYSTAL_CAPTION: &str = "GaN Crystal Structure\nWide Bandgap Semiconductor";

const PALETTE: &[u32] = &[0x4a90e2, 0xe24a90, 0x90e24a, 0xe2904a, 0x904ae2, 0x4ae290];
const LAYER_PALETTE: &[u32] = &[0x333333, 0x555555, 0x4a90e2, 0xe24a90, 0xffd700, 0x90e24a];

/// Lattice sites on the unit grid; even sites are gallium, odd nitrogen.
const LATTICE_SITES: &[(f32, f32)] = &[
    (2.0, 5.0),
    (3.0, 6.0),
    (4.0, 5.0),
    (5.0, 6.0),
    (6.0, 5.0),
    (3.0, 4.0),
    (5.0, 4.0),
];

/// Render the visual for scene `ordinal`, with `title` in the banner.
///
/// Fails on [`VisualDirective::Unsupported`] and on malformed parameters.
pub fn render_visual(
    ordinal: usize,
    title: &str,
    directive: &VisualDirective,
    face: &Typeface,
) -> Result<RgbaImage, Pdf2VideoError> {
    let invalid = |detail: &str| Pdf2VideoError::InvalidVisual {
        ordinal,
        detail: detail.to_string(),
    };

    let mut canvas = Canvas::new(VISUAL_WIDTH, VISUAL_HEIGHT, rgb(BACKGROUND));
    let grid = Grid::below_banner();

    match directive {
        VisualDirective::CrystalStructure => draw_crystal(&mut canvas, &grid, face),
        VisualDirective::ApplicationChart { items } => {
            if items.is_empty() {
                return Err(invalid("application chart has no items"));
            }
            draw_applications(&mut canvas, &grid, face, items);
        }
        VisualDirective::LayerDiagram { layers } => {
            if layers.is_empty() {
                return Err(invalid("layer diagram has no layers"));
            }
            draw_layers(&mut canvas, &grid, face, layers);
        }
        VisualDirective::ComparisonChart { categories, series } => {
            check_chart(categories, series).map_err(|d| invalid(&d))?;
            draw_comparison(&mut canvas, &grid, face, categories, series);
        }
        VisualDirective::Generic { seed } => draw_circuit(&mut canvas, *seed),
        VisualDirective::Unsupported => {
            return Err(Pdf2VideoError::UnsupportedVisual { ordinal });
        }
    }

    draw_banner(&mut canvas, face, title);
    debug!("Rendered {} visual for scene {}", directive.kind_name(), ordinal);
    Ok(canvas.into_image())
}

/// Square 10×10 unit grid, y pointing up, centred below the banner.
struct Grid {
    left: f32,
    bottom: f32,
    unit: f32,
}

impl Grid {
    fn below_banner() -> Self {
        let top = BANNER.1 + BANNER.3 + 20.0;
        let bottom = VISUAL_HEIGHT as f32 - 20.0;
        let unit = (bottom - top) / 10.0;
        Self {
            left: (VISUAL_WIDTH as f32 - unit * 10.0) / 2.0,
            bottom,
            unit,
        }
    }

    fn px(&self, gx: f32, gy: f32) -> (f32, f32) {
        (self.left + gx * self.unit, self.bottom - gy * self.unit)
    }

    fn len(&self, units: f32) -> f32 {
        units * self.unit
    }
}

fn draw_banner(canvas: &mut Canvas, face: &Typeface, title: &str) {
    let (x, y, w, h) = BANNER;
    canvas.fill_rect(x, y, w, h, rgb(BANNER_FILL));
    canvas.stroke_rect(x, y, w, h, 4.0, rgb(ACCENT));

    let title = title.trim();
    let size = face.fit(title, TITLE_SIZE, w - 80.0);
    canvas.text(face, title, x + w / 2.0, y + h / 2.0, TextStyle::new(size, rgb(0xffffff)));
}

/// First word on one line, the rest on the next.
fn two_lines(label: &str) -> String {
    match label.trim().split_once(char::is_whitespace) {
        Some((head, rest)) => format!("{}\n{}", head, rest.trim()),
        None => label.trim().to_string(),
    }
}

fn draw_crystal(canvas: &mut Canvas, grid: &Grid, face: &Typeface) {
    let bond = with_alpha(rgb(0xffffff), 128);
    for (i, &(x0, y0)) in LATTICE_SITES.iter().enumerate() {
        for &(x1, y1) in &LATTICE_SITES[i + 1..] {
            if ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt() < 2.0 {
                let (a, b) = (grid.px(x0, y0), grid.px(x1, y1));
                canvas.line(a.0, a.1, b.0, b.1, 4.0, bond);
            }
        }
    }
    for (i, &(x, y)) in LATTICE_SITES.iter().enumerate() {
        let colour = if i % 2 == 0 { PALETTE[0] } else { PALETTE[1] };
        let (cx, cy) = grid.px(x, y);
        canvas.fill_circle(cx, cy, grid.len(0.4), with_alpha(rgb(colour), 204));
    }

    // substrate slab under the lattice
    let (sx, sy) = grid.px(1.5, 2.6);
    canvas.fill_rect(sx, sy, grid.len(5.0), grid.len(0.3), with_alpha(rgb(ACCENT), 90));

    let atom = TextStyle::new(30.0, rgb(0xffffff));
    for (i, symbol) in [(0, "Ga"), (1, "N")] {
        let (x, y) = LATTICE_SITES[i];
        let (cx, cy) = grid.px(x, y);
        canvas.text(face, symbol, cx, cy, atom);
    }
    let (cx, cy) = grid.px(5.0, 1.4);
    canvas.text(
        face,
        CRYSTAL_CAPTION,
        cx,
        cy,
        TextStyle::new(40.0, with_alpha(rgb(0xffffff), 204)),
    );
}

fn draw_applications(canvas: &mut Canvas, grid: &Grid, face: &Typeface, items: &[String]) {
    let count = items.len();
    let (hx, hy) = grid.px(5.0, 5.0);
    let (rx, ry) = (grid.len(3.4), grid.len(2.8));
    let (bw, bh) = (grid.len(1.6), grid.len(1.0));

    let centres: Vec<(f32, f32)> = (0..count)
        .map(|i| {
            let angle = (-90.0 + 360.0 * i as f32 / count as f32).to_radians();
            (hx + rx * angle.cos(), hy + ry * angle.sin())
        })
        .collect();

    let spoke = with_alpha(rgb(ACCENT), 110);
    for &(cx, cy) in &centres {
        canvas.line(hx, hy, cx, cy, 3.0, spoke);
    }
    for (i, (&(cx, cy), item)) in centres.iter().zip(items).enumerate() {
        let colour = PALETTE[i % PALETTE.len()];
        canvas.fill_rect(cx - bw / 2.0, cy - bh / 2.0, bw, bh, with_alpha(rgb(colour), 179));
        canvas.stroke_rect(cx - bw / 2.0, cy - bh / 2.0, bw, bh, 3.0, rgb(0xffffff));

        let label = two_lines(item);
        let size = face.fit(&label, LABEL_SIZE, bw - 16.0);
        canvas.text(face, &label, cx, cy, TextStyle::new(size, rgb(0xffffff)));
    }

    let r = grid.len(1.0);
    canvas.fill_circle(hx, hy, r, rgb(BANNER_FILL));
    canvas.arc(hx, hy, r - 3.0, 0.0, 360.0, 6.0, rgb(ACCENT));
    let size = face.fit(HUB_LABEL, 30.0, 2.0 * r - 24.0);
    canvas.text(face, HUB_LABEL, hx, hy, TextStyle::new(size, rgb(0xffffff)));
}

fn draw_layers(canvas: &mut Canvas, grid: &Grid, face: &Typeface, layers: &[String]) {
    let pitch = (6.0 / layers.len() as f32).min(1.0);
    let thickness = pitch * 0.8;
    let white = rgb(0xffffff);

    for (i, name) in layers.iter().enumerate() {
        let centre_y = 2.0 + pitch * i as f32;
        let (x, top) = grid.px(2.0, centre_y + thickness / 2.0);
        let (w, h) = (grid.len(6.0), grid.len(thickness));
        let colour = LAYER_PALETTE[i % LAYER_PALETTE.len()];
        canvas.fill_rect(x, top, w, h, with_alpha(rgb(colour), 204));
        canvas.stroke_rect(x, top, w, h, 2.0, white);

        // name to the left of the layer
        let (lx, ly) = grid.px(1.8, centre_y);
        let size = face.fit(name, LABEL_SIZE, lx - 20.0).min(grid.len(thickness) * 0.8);
        canvas.text(face, name, lx, ly, TextStyle::new(size, white).align(Align::Right));

        if name.to_lowercase().contains("channel") {
            let (x0, y) = grid.px(2.0, centre_y + pitch / 2.0);
            let (x1, _) = grid.px(8.0, centre_y + pitch / 2.0);
            let yellow = with_alpha(rgb(0xffff00), 204);
            canvas.dashed_line(x0, y, x1, y, 4.0, 24.0, 14.0, yellow);
            let (tx, ty) = grid.px(5.0, centre_y + pitch / 2.0 + 0.3);
            canvas.text(face, "2DEG", tx, ty, TextStyle::new(22.0, yellow));
        }
    }
}

/// Categories and series must line up and hold finite, non-negative values.
fn check_chart(categories: &[String], series: &[Series]) -> Result<(), String> {
    if categories.is_empty() {
        return Err("comparison chart has no categories".into());
    }
    if series.is_empty() {
        return Err("comparison chart has no series".into());
    }
    for s in series {
        if s.values.len() != categories.len() {
            return Err(format!(
                "series '{}' has {} values for {} categories",
                s.name,
                s.values.len(),
                categories.len()
            ));
        }
        if s.values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(format!("series '{}' has a non-finite or negative value", s.name));
        }
    }
    Ok(())
}

/// Each series scaled to its own maximum; an all-zero series stays at zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / max).collect()
}

fn draw_comparison(
    canvas: &mut Canvas,
    grid: &Grid,
    face: &Typeface,
    names: &[String],
    series: &[Series],
) {
    let categories = names.len();
    let (x0, y0) = (1.0_f32, 1.0_f32);
    let (plot_w, plot_h) = (8.0_f32, 7.0_f32);
    let slot = plot_w / categories as f32;
    let bar_w = slot * 0.75 / series.len() as f32;

    // the last category is the highlighted one
    let (hx, htop) = grid.px(x0 + slot * (categories - 1) as f32, y0 + plot_h);
    canvas.fill_rect(hx, htop, grid.len(slot), grid.len(plot_h), with_alpha(rgb(HIGHLIGHT), 40));

    let gridline = with_alpha(rgb(0xffffff), 60);
    for step in 1..=4 {
        let gy = y0 + plot_h * step as f32 / 4.0;
        let (a, b) = (grid.px(x0, gy), grid.px(x0 + plot_w, gy));
        canvas.line(a.0, a.1, b.0, b.1, 1.5, gridline);
    }

    for (si, s) in series.iter().enumerate() {
        let colour = with_alpha(rgb(PALETTE[si % PALETTE.len()]), 204);
        for (ci, v) in normalize(&s.values).into_iter().enumerate() {
            let bx = x0 + slot * ci as f32 + slot * 0.125 + bar_w * si as f32;
            let bh = plot_h * v as f32;
            let (px, top) = grid.px(bx, y0 + bh);
            canvas.fill_rect(px, top, grid.len(bar_w), grid.len(bh), colour);
        }
    }

    let axis = rgb(0xffffff);
    let (ox, oy) = grid.px(x0, y0);
    let (ex, _) = grid.px(x0 + plot_w, y0);
    let (_, ey) = grid.px(x0, y0 + plot_h);
    canvas.line(ox, oy, ex, oy, 3.0, axis);
    canvas.line(ox, oy, ox, ey, 3.0, axis);

    // category ticks under each bar group
    let tick = face.fit(&names.join("\n"), LABEL_SIZE, grid.len(slot) - 8.0);
    for (ci, name) in names.iter().enumerate() {
        let (tx, ty) = grid.px(x0 + slot * (ci as f32 + 0.5), y0 - 0.3);
        canvas.text(face, name, tx, ty, TextStyle::new(tick, axis));
    }
    let (mx, my) = grid.px(x0 + plot_w / 2.0, y0 - 0.75);
    canvas.text(face, "Material", mx, my, TextStyle::new(LABEL_SIZE, axis));
    let (nx, ny) = grid.px(x0, y0 + plot_h + 0.35);
    canvas.text(
        face,
        "Normalized Performance",
        nx,
        ny,
        TextStyle::new(LABEL_SIZE, axis).align(Align::Left),
    );

    // legend, top-left of the plot
    let legend_size = 22.0;
    let widest = series
        .iter()
        .map(|s| face.line_width(&s.name, legend_size))
        .fold(0.0_f32, f32::max);
    let (bx, by) = grid.px(x0 + 0.1, y0 + plot_h - 0.1);
    let (bw, bh) = (grid.len(0.55) + widest + 16.0, grid.len(0.4 * series.len() as f32 + 0.1));
    canvas.fill_rect(bx, by, bw, bh, with_alpha(rgb(BANNER_FILL), 220));
    canvas.stroke_rect(bx, by, bw, bh, 2.0, axis);
    for (si, s) in series.iter().enumerate() {
        let (lx, ly) = grid.px(x0 + 0.2, y0 + plot_h - 0.3 - 0.4 * si as f32);
        canvas.fill_rect(lx, ly, grid.len(0.3), grid.len(0.25), rgb(PALETTE[si % PALETTE.len()]));
        canvas.text(
            face,
            &s.name,
            lx + grid.len(0.4),
            ly + grid.len(0.125),
            TextStyle::new(legend_size, axis).align(Align::Left),
        );
    }
}

/// Right-angled traces with solder pads, fully determined by `seed`.
fn draw_circuit(canvas: &mut Canvas, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = (VISUAL_WIDTH as f32, VISUAL_HEIGHT as f32);
    let trace = with_alpha(rgb(ACCENT), 80);
    let pad = with_alpha(rgb(ACCENT), 150);

    for _ in 0..36 {
        let (x, y) = (rng.gen_range(0.0..w), rng.gen_range(BANNER.1 + BANNER.3..h));
        let x1 = x + rng.gen_range(-240.0..240.0_f32);
        let y1 = (y + rng.gen_range(-180.0..180.0_f32)).clamp(BANNER.1 + BANNER.3, h);
        canvas.line(x, y, x1, y, 3.0, trace);
        canvas.line(x1, y, x1, y1, 3.0, trace);
        canvas.fill_circle(x1, y1, 7.0, pad);
    }

    for _ in 0..14 {
        let (x, y) = (rng.gen_range(100.0..w - 100.0), rng.gen_range(250.0..h - 100.0));
        canvas.fill_circle(x, y, 14.0, with_alpha(rgb(ACCENT), 150));
        canvas.arc(x, y, 24.0, 0.0, 360.0, 3.0, with_alpha(rgb(0xffffff), 90));
    }
}

/// Fill colour of the banner, exposed for frame tests.
pub fn banner_fill() -> Rgba<u8> {
    rgb(BANNER_FILL)
}
