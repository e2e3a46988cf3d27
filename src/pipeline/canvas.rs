//! Minimal raster primitives over an [`RgbaImage`].
//!
//! Coordinates are `f32` pixels with the origin at the top-left corner. A
//! pixel is covered when its centre lies inside the shape. Everything is
//! clipped to the canvas and alpha-blended (source-over), so shapes may
//! safely extend past the edges.

use image::{Rgba, RgbaImage};

/// Opaque colour from `0xRRGGBB`.
pub fn rgb(hex: u32) -> Rgba<u8> {
    Rgba([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255])
}

/// Same colour with a new alpha.
pub fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], alpha])
}

pub struct Canvas {
    img: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            img: RgbaImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.img
    }

    pub fn into_image(self) -> RgbaImage {
        self.img
    }

    /// Blend `color` over the pixel at `(x, y)`; out-of-range is ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.img.width() as i64 || y >= self.img.height() as i64 {
            return;
        }
        let dst = self.img.get_pixel_mut(x as u32, y as u32);
        *dst = blend(*dst, color);
    }

    /// Visit every pixel whose centre lies in the clipped box and satisfies `inside`.
    fn fill_where(
        &mut self,
        (x0, y0, x1, y1): (f32, f32, f32, f32),
        color: Rgba<u8>,
        inside: impl Fn(f32, f32) -> bool,
    ) {
        let max_x = self.img.width() as i64 - 1;
        let max_y = self.img.height() as i64 - 1;
        let (px0, px1) = ((x0.floor() as i64).max(0), (x1.ceil() as i64).min(max_x));
        let (py0, py1) = ((y0.floor() as i64).max(0), (y1.ceil() as i64).min(max_y));
        for py in py0..=py1 {
            for px in px0..=px1 {
                if inside(px as f32 + 0.5, py as f32 + 0.5) {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        self.fill_where((x, y, x + w, y + h), color, |px, py| {
            px >= x && px < x + w && py >= y && py < y + h
        });
    }

    /// Rectangle outline drawn inside the given bounds.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, thickness: f32, color: Rgba<u8>) {
        let t = thickness.min(w / 2.0).min(h / 2.0);
        self.fill_rect(x, y, w, t, color);
        self.fill_rect(x, y + h - t, w, t, color);
        self.fill_rect(x, y + t, t, h - 2.0 * t, color);
        self.fill_rect(x + w - t, y + t, t, h - 2.0 * t, color);
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgba<u8>) {
        self.fill_where((cx - r, cy - r, cx + r, cy + r), color, |px, py| {
            (px - cx).powi(2) + (py - cy).powi(2) <= r * r
        });
    }

    /// Ellipse inscribed in the box `[x0, y0, x1, y1]`.
    pub fn fill_ellipse(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        let (rx, ry) = (((x1 - x0) / 2.0).max(0.5), ((y1 - y0) / 2.0).max(0.5));
        self.fill_where((x0, y0, x1, y1), color, |px, py| {
            ((px - cx) / rx).powi(2) + ((py - cy) / ry).powi(2) <= 1.0
        });
    }

    /// Ellipse outline of the given thickness, drawn inside the box.
    pub fn stroke_ellipse(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: f32,
        color: Rgba<u8>,
    ) {
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        let (rx, ry) = (((x1 - x0) / 2.0).max(0.5), ((y1 - y0) / 2.0).max(0.5));
        let (irx, iry) = ((rx - thickness).max(0.01), (ry - thickness).max(0.01));
        self.fill_where((x0, y0, x1, y1), color, |px, py| {
            let (dx, dy) = (px - cx, py - cy);
            (dx / rx).powi(2) + (dy / ry).powi(2) <= 1.0
                && (dx / irx).powi(2) + (dy / iry).powi(2) > 1.0
        });
    }

    /// Straight segment with round caps.
    pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, thickness: f32, color: Rgba<u8>) {
        let half = (thickness / 2.0).max(0.5);
        let bounds = (
            x0.min(x1) - half,
            y0.min(y1) - half,
            x0.max(x1) + half,
            y0.max(y1) + half,
        );
        self.fill_where(bounds, color, |px, py| {
            distance_to_segment(px, py, x0, y0, x1, y1) <= half
        });
    }

    /// Segment split into `dash`-long strokes separated by `gap`.
    #[allow(clippy::too_many_arguments)]
    pub fn dashed_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        thickness: f32,
        dash: f32,
        gap: f32,
        color: Rgba<u8>,
    ) {
        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        if len <= f32::EPSILON || dash <= 0.0 {
            return;
        }
        let (ux, uy) = ((x1 - x0) / len, (y1 - y0) / len);
        let mut start = 0.0;
        while start < len {
            let end = (start + dash).min(len);
            self.line(
                x0 + ux * start,
                y0 + uy * start,
                x0 + ux * end,
                y0 + uy * end,
                thickness,
                color,
            );
            start = end + gap.max(0.0);
        }
    }

    pub fn fill_triangle(&mut self, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Rgba<u8>) {
        let bounds = (
            a.0.min(b.0).min(c.0),
            a.1.min(b.1).min(c.1),
            a.0.max(b.0).max(c.0),
            a.1.max(b.1).max(c.1),
        );
        self.fill_where(bounds, color, |px, py| {
            let d1 = edge(px, py, a, b);
            let d2 = edge(px, py, b, c);
            let d3 = edge(px, py, c, a);
            let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
            let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
            !(has_neg && has_pos)
        });
    }

    /// Circular arc from `start_deg` to `end_deg`, clockwise on screen
    /// (0° points right, 90° points down).
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        cx: f32,
        cy: f32,
        r: f32,
        start_deg: f32,
        end_deg: f32,
        thickness: f32,
        color: Rgba<u8>,
    ) {
        let half = (thickness / 2.0).max(0.5);
        let span = if (end_deg - start_deg).abs() >= 360.0 {
            360.0
        } else {
            (end_deg - start_deg).rem_euclid(360.0)
        };
        let outer = r + half;
        self.fill_where((cx - outer, cy - outer, cx + outer, cy + outer), color, |px, py| {
            let (dx, dy) = (px - cx, py - cy);
            let dist = (dx * dx + dy * dy).sqrt();
            if (dist - r).abs() > half {
                return false;
            }
            let angle = dy.atan2(dx).to_degrees();
            (angle - start_deg).rem_euclid(360.0) <= span
        });
    }
}

fn blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let v = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round() as u8])
}

fn edge(px: f32, py: f32, a: (f32, f32), b: (f32, f32)) -> f32 {
    (px - b.0) * (a.1 - b.1) - (a.0 - b.0) * (py - b.1)
}

fn distance_to_segment(px: f32, py: f32, x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len2 = dx * dx + dy * dy;
    let t = if len2 <= f32::EPSILON {
        0.0
    } else {
        (((px - x0) * dx + (py - y0) * dy) / len2).clamp(0.0, 1.0)
    };
    let (nx, ny) = (x0 + t * dx, y0 + t * dy);
    ((px - nx).powi(2) + (py - ny).powi(2)).sqrt()
}
