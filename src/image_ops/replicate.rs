use image::{DynamicImage, imageops};
use tracing::debug;

use super::arith::black;
use super::embed::crop;
use super::layout::{bands, to_8bit};
use crate::error::{CompositeError, Result};

/// Number of tiles across and down needed to cover `target` with `tile`.
///
/// Always one more than the whole number of tiles that fit, so a remainder
/// is covered too; the surplus is cropped away afterwards.
pub fn tile_counts(tile: (u32, u32), target: (u32, u32)) -> Result<(u32, u32)> {
    if tile.0 == 0 || tile.1 == 0 {
        return Err(CompositeError::geometry(format!(
            "cannot tile with a {}x{} image",
            tile.0, tile.1
        )));
    }
    Ok((
        (target.0 / tile.0).saturating_add(1),
        (target.1 / tile.1).saturating_add(1),
    ))
}

/// Repeat `tile` `across` times horizontally and `down` times vertically.
pub fn replicate(tile: &DynamicImage, across: u32, down: u32) -> Result<DynamicImage> {
    let tile = to_8bit(tile);
    let (tw, th) = (tile.width(), tile.height());
    let size = tw.checked_mul(across).zip(th.checked_mul(down));
    let Some((width, height)) = size.filter(|&(w, h)| w > 0 && h > 0) else {
        return Err(CompositeError::geometry(format!(
            "cannot replicate {tw}x{th} by {across}x{down}"
        )));
    };

    let mut canvas = black(width, height, bands(&tile))?;
    match (&mut canvas, &*tile) {
        (DynamicImage::ImageLuma8(dst), DynamicImage::ImageLuma8(src)) => imageops::tile(dst, src),
        (DynamicImage::ImageLumaA8(dst), DynamicImage::ImageLumaA8(src)) => {
            imageops::tile(dst, src)
        }
        (DynamicImage::ImageRgb8(dst), DynamicImage::ImageRgb8(src)) => imageops::tile(dst, src),
        (DynamicImage::ImageRgba8(dst), DynamicImage::ImageRgba8(src)) => imageops::tile(dst, src),
        (_, src) => {
            return Err(CompositeError::geometry(format!(
                "cannot replicate {:?} image",
                src.color()
            )));
        }
    }
    Ok(canvas)
}

/// Tile `tile` over a `width` x `height` area with no gaps and crop the
/// result to exactly that size, anchored at (0, 0).
pub fn replicate_to_cover(tile: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    let (across, down) = tile_counts((tile.width(), tile.height()), (width, height))?;
    debug!(
        tile_width = tile.width(),
        tile_height = tile.height(),
        across,
        down,
        "Replicating tile"
    );
    let tiled = replicate(tile, across, down)?;
    crop(&tiled, 0, 0, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage, Luma};
    use proptest::prelude::*;

    fn checker(width: u32, height: u32) -> DynamicImage {
        let mut img = GrayImage::new(width, height);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Luma([(10 * y + x) as u8]);
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_tile_counts_exact_multiple() {
        // Even an exact fit gets one extra tile, like the remainder case.
        assert_eq!(tile_counts((100, 50), (400, 200)).unwrap(), (5, 5));
        assert_eq!(tile_counts((120, 70), (800, 600)).unwrap(), (7, 9));
    }

    #[test]
    fn test_tile_counts_zero_tile() {
        assert!(matches!(
            tile_counts((0, 10), (100, 100)),
            Err(CompositeError::Geometry(_))
        ));
    }

    #[test]
    fn test_replicate_repeats_pattern() {
        let tile = checker(2, 2);
        let out = replicate(&tile, 3, 2).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(
                    out.get_pixel(x, y)[0],
                    tile.get_pixel(x % 2, y % 2)[0],
                    "Mismatch at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn test_replicate_rejects_overflowing_size() {
        let tile = checker(2, 2);
        assert!(matches!(
            replicate(&tile, u32::MAX, 1),
            Err(CompositeError::Geometry(_))
        ));
        assert!(matches!(replicate(&tile, 0, 3), Err(CompositeError::Geometry(_))));
    }

    #[test]
    fn test_replicate_to_cover_has_no_gaps() {
        let tile = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 4, Luma([200])));
        let out = replicate_to_cover(&tile, 10, 9).unwrap();
        assert_eq!(out.dimensions(), (10, 9));
        assert!(out.as_bytes().iter().all(|&v| v == 200));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_cover_matches_target(tw in 1u32..20, th in 1u32..20, w in 1u32..80, h in 1u32..80) {
            let (across, down) = tile_counts((tw, th), (w, h)).unwrap();
            prop_assert_eq!(across, 1 + w / tw);
            prop_assert_eq!(down, 1 + h / th);
            prop_assert!(across * tw > w);
            prop_assert!(down * th > h);

            let out = replicate_to_cover(&checker(tw, th), w, h).unwrap();
            prop_assert_eq!(out.dimensions(), (w, h));
        }
    }
}
