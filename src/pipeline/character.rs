//! Presenter character: one sprite per [`Pose`], layered onto each frame.

use crate::config::VideoConfig;
use crate::pipeline::canvas::{rgb, Canvas};
use crate::script::Pose;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Side of the square sprite canvas, in pixels.
pub const SPRITE_SIZE: u32 = 400;

const SKIN: u32 = 0x6496ff;
const OUTLINE: u32 = 0x3264c8;
const HAND: u32 = 0xffc896;

/// Draw the sprite for `pose` on a transparent 400×400 canvas.
pub fn render_character(pose: Pose) -> RgbaImage {
    let mut c = Canvas::new(SPRITE_SIZE, SPRITE_SIZE, Rgba([0, 0, 0, 0]));
    let (skin, outline) = (rgb(SKIN), rgb(OUTLINE));

    // head
    c.fill_ellipse(150.0, 50.0, 251.0, 151.0, skin);
    c.stroke_ellipse(150.0, 50.0, 251.0, 151.0, 3.0, outline);

    // eyes
    for x in [170.0, 210.0] {
        c.fill_ellipse(x, 80.0, x + 21.0, 101.0, rgb(0xffffff));
        c.fill_ellipse(x + 5.0, 85.0, x + 16.0, 96.0, rgb(0x000000));
    }

    match pose {
        Pose::Explaining => c.fill_ellipse(180.0, 110.0, 221.0, 126.0, outline),
        Pose::Greeting | Pose::Concluding => c.arc(200.0, 100.0, 24.0, 20.0, 160.0, 3.0, outline),
    }

    // body
    c.fill_rect(170.0, 150.0, 61.0, 101.0, skin);
    c.stroke_rect(170.0, 150.0, 61.0, 101.0, 3.0, outline);

    match pose {
        Pose::Greeting => {
            c.line(230.0, 170.0, 280.0, 140.0, 20.0, skin);
            c.fill_ellipse(270.0, 130.0, 291.0, 151.0, rgb(HAND));
            c.line(170.0, 170.0, 120.0, 200.0, 20.0, skin);
        }
        Pose::Explaining => {
            c.line(230.0, 170.0, 280.0, 170.0, 20.0, skin);
            c.fill_triangle((280.0, 160.0), (300.0, 170.0), (280.0, 180.0), rgb(HAND));
            c.line(170.0, 170.0, 120.0, 200.0, 20.0, skin);
        }
        Pose::Concluding => {
            c.line(170.0, 170.0, 230.0, 200.0, 20.0, skin);
            c.line(230.0, 170.0, 170.0, 200.0, 20.0, skin);
        }
    }

    c.into_image()
}

/// Scale `visual` to the frame size and layer `sprite` bottom-right.
///
/// The sprite is scaled by `character_scale` and inset from the bottom and
/// right edges by `character_margin` pixels.
pub fn compose_frame(visual: &RgbaImage, sprite: &RgbaImage, config: &VideoConfig) -> RgbaImage {
    let mut frame = if visual.dimensions() == (config.width, config.height) {
        visual.clone()
    } else {
        imageops::resize(visual, config.width, config.height, FilterType::Triangle)
    };

    let sw = ((sprite.width() as f32 * config.character_scale).round() as u32).max(1);
    let sh = ((sprite.height() as f32 * config.character_scale).round() as u32).max(1);
    let scaled = imageops::resize(sprite, sw, sh, FilterType::Triangle);

    let x = config.width as i64 - sw as i64 - config.character_margin as i64;
    let y = config.height as i64 - sh as i64 - config.character_margin as i64;
    imageops::overlay(&mut frame, &scaled, x, y);
    frame
}
