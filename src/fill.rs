use image::DynamicImage;
use tracing::debug;

use crate::error::{CompositeError, Result};
use crate::image_ops::{Extend, black, conform_layout, embed, linear};

/// A solid `color` image with the size and pixel layout of `target`.
///
/// Built from a single pixel: a black 1x1 swatch is offset to the colour,
/// cast to 8 bits, converted to the target's layout and then extended by
/// copying to the full size. `color` holds RGB or RGBA values; a greyscale
/// target gets the colour's luma.
pub fn color_fill(color: &[f64], target: &DynamicImage) -> Result<DynamicImage> {
    let bands = match color.len() {
        3 => 3u8,
        4 => 4u8,
        n => {
            return Err(CompositeError::geometry(format!(
                "fill colour needs 3 or 4 values, got {n}"
            )));
        }
    };
    debug!(?color, layout = ?target.color(), "Building colour fill");

    let swatch = black(1, 1, bands)?;
    let swatch = linear(&swatch, &[1.0], color)?;
    let swatch = conform_layout(swatch, target.color());
    embed(
        &swatch,
        0,
        0,
        target.width() as i32,
        target.height() as i32,
        Extend::Copy,
    )
}
