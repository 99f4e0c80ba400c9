use image::{DynamicImage, imageops};
use serde::{Deserialize, Serialize};

use super::arith::black;
use super::layout::{alloc_raw, bands, from_raw, to_8bit};
use crate::error::{CompositeError, Result};

/// How the canvas around an embedded image is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extend {
    /// Zero in every band, so transparent for layouts with alpha.
    #[default]
    Black,
    /// Replicate the nearest edge pixel outward.
    Copy,
}

/// Place `image` at (`x`, `y`) on a `width` x `height` canvas.
///
/// Offsets may be negative; whatever falls outside the canvas is clipped.
pub fn embed(
    image: &DynamicImage,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    extend: Extend,
) -> Result<DynamicImage> {
    if width <= 0 || height <= 0 {
        return Err(CompositeError::geometry(format!(
            "embed canvas must be positive, got {width}x{height}"
        )));
    }
    let image = to_8bit(image);
    let (width, height) = (width as u32, height as u32);
    match extend {
        Extend::Black => {
            let mut canvas = black(width, height, bands(&image))?;
            paste(&mut canvas, &image, i64::from(x), i64::from(y))?;
            Ok(canvas)
        }
        Extend::Copy => extend_copy(&image, i64::from(x), i64::from(y), width, height),
    }
}

/// Overwrite `canvas` with `image` at (`x`, `y`), clipping at the edges.
/// Both must share one of the 8-bit layouts.
pub(crate) fn paste(canvas: &mut DynamicImage, image: &DynamicImage, x: i64, y: i64) -> Result<()> {
    match (canvas, image) {
        (DynamicImage::ImageLuma8(dst), DynamicImage::ImageLuma8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (DynamicImage::ImageLumaA8(dst), DynamicImage::ImageLumaA8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgb8(dst), DynamicImage::ImageRgb8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgba8(dst), DynamicImage::ImageRgba8(src)) => {
            imageops::replace(dst, src, x, y)
        }
        (dst, src) => {
            return Err(CompositeError::geometry(format!(
                "cannot place {:?} image on {:?} canvas",
                src.color(),
                dst.color()
            )));
        }
    }
    Ok(())
}

/// Every canvas pixel takes the source pixel nearest to it, so edges are
/// smeared outward.
fn extend_copy(image: &DynamicImage, x: i64, y: i64, width: u32, height: u32) -> Result<DynamicImage> {
    let (src_w, src_h) = (i64::from(image.width()), i64::from(image.height()));
    if src_w == 0 || src_h == 0 {
        return Err(CompositeError::geometry(
            "cannot extend-by-copy from an empty image",
        ));
    }

    let n = bands(image) as usize;
    let src = image.as_bytes();
    let mut out = alloc_raw(width, height, n as u8)?;
    for (cy, row) in out.chunks_exact_mut(width as usize * n).enumerate() {
        let sy = (cy as i64 - y).clamp(0, src_h - 1);
        for (cx, dst) in row.chunks_exact_mut(n).enumerate() {
            let sx = (cx as i64 - x).clamp(0, src_w - 1);
            let from = ((sy * src_w + sx) as usize) * n;
            dst.copy_from_slice(&src[from..from + n]);
        }
    }

    from_raw(width, height, n as u8, out)
}

/// Cut the `width` x `height` area at (`left`, `top`) out of `image`.
/// The area must lie entirely inside the image.
pub fn crop(image: &DynamicImage, left: u32, top: u32, width: u32, height: u32) -> Result<DynamicImage> {
    let inside = width > 0
        && height > 0
        && left.checked_add(width).is_some_and(|r| r <= image.width())
        && top.checked_add(height).is_some_and(|b| b <= image.height());
    if !inside {
        return Err(CompositeError::geometry(format!(
            "crop {width}x{height}+{left}+{top} is outside {}x{}",
            image.width(),
            image.height()
        )));
    }
    Ok(to_8bit(image).crop_imm(left, top, width, height))
}
