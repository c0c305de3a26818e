//! Optional text rendering for the annotation and chart images.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;

/// Load a TTF/OTF font. Failure only costs the labels, so it is logged and
/// reported as `None`.
pub fn load_font(path: Option<&Path>) -> Option<FontVec> {
    let path = path?;
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read font, drawing without labels");
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            tracing::debug!(path = %path.display(), "loaded font");
            Some(font)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid font, drawing without labels");
            None
        }
    }
}

/// Text with a 1 px dark outline so it stays readable on any background.
pub fn draw_outlined(
    img: &mut RgbImage,
    font: &FontVec,
    scale: f32,
    x: i32,
    y: i32,
    color: Rgb<u8>,
    text: &str,
) {
    let scale = PxScale::from(scale);
    let outline = Rgb([0u8, 0, 0]);
    for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
        draw_text_mut(img, outline, x + dx, y + dy, scale, font, text);
    }
    draw_text_mut(img, color, x, y, scale, font, text);
}

/// Text horizontally centred on `cx`.
pub fn draw_centered(
    img: &mut RgbImage,
    font: &FontVec,
    scale: f32,
    cx: i32,
    y: i32,
    color: Rgb<u8>,
    text: &str,
) {
    let (w, _) = text_size(PxScale::from(scale), font, text);
    draw_text_mut(img, color, cx - w as i32 / 2, y, PxScale::from(scale), font, text);
}
