use image::DynamicImage;

use super::layout::{alloc_raw, bands, from_raw, to_8bit};
use crate::error::{CompositeError, Result};

/// Blending if-then-else.
///
/// Every output band is `(m * then + (255 - m) * else) / 255`, so mask
/// values between the extremes mix the two inputs proportionally. All three
/// images must share width and height. The output has as many bands as the
/// widest input; every input must have either that many bands or one, and
/// single-band inputs are broadcast.
pub fn ifthenelse(
    mask: &DynamicImage,
    then: &DynamicImage,
    otherwise: &DynamicImage,
) -> Result<DynamicImage> {
    let (width, height) = (mask.width(), mask.height());
    for (name, img) in [("then", then), ("else", otherwise)] {
        if (img.width(), img.height()) != (width, height) {
            return Err(CompositeError::geometry(format!(
                "{name} image is {}x{} but mask is {width}x{height}",
                img.width(),
                img.height()
            )));
        }
    }

    let (mask, then, otherwise) = (to_8bit(mask), to_8bit(then), to_8bit(otherwise));
    let (mb, tb, eb) = (bands(&mask), bands(&then), bands(&otherwise));
    let n = mb.max(tb).max(eb);
    for (name, b) in [("mask", mb), ("then", tb), ("else", eb)] {
        if b != 1 && b != n {
            return Err(CompositeError::geometry(format!(
                "{name} image has {b} bands, expected 1 or {n}"
            )));
        }
    }

    let (m, t, e) = (mask.as_bytes(), then.as_bytes(), otherwise.as_bytes());
    let (mb, tb, eb, n) = (mb as usize, tb as usize, eb as usize, n as usize);
    let pick = |bands: usize, pixel: usize, band: usize| {
        pixel * bands + if bands == 1 { 0 } else { band }
    };

    let mut out = alloc_raw(width, height, n as u8)?;
    for (pixel, dst) in out.chunks_exact_mut(n).enumerate() {
        for (band, value) in dst.iter_mut().enumerate() {
            *value = mix(
                m[pick(mb, pixel, band)],
                t[pick(tb, pixel, band)],
                e[pick(eb, pixel, band)],
            );
        }
    }

    from_raw(width, height, n as u8, out)
}

fn mix(weight: u8, then: u8, otherwise: u8) -> u8 {
    let w = u32::from(weight);
    ((w * u32::from(then) + (255 - w) * u32::from(otherwise) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn grey(w: u32, h: u32, v: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([v])))
    }

    fn rgb(w: u32, h: u32, c: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(c)))
    }

    #[test]
    fn test_zero_mask_returns_else() {
        let then = rgb(4, 3, [255, 0, 0]);
        let otherwise = rgb(4, 3, [12, 34, 56]);
        let out = ifthenelse(&grey(4, 3, 0), &then, &otherwise).unwrap();
        assert_eq!(out.as_bytes(), otherwise.as_bytes());
    }

    #[test]
    fn test_full_mask_returns_then() {
        let then = rgb(4, 3, [255, 0, 0]);
        let otherwise = rgb(4, 3, [12, 34, 56]);
        let out = ifthenelse(&grey(4, 3, 255), &then, &otherwise).unwrap();
        assert_eq!(out.as_bytes(), then.as_bytes());
    }

    #[test]
    fn test_partial_mask_blends() {
        let out = ifthenelse(&grey(1, 1, 128), &grey(1, 1, 200), &grey(1, 1, 0)).unwrap();
        // 128 * 200 / 255 = 100.4
        assert_eq!(out.as_bytes(), &[100]);
    }

    #[test]
    fn test_per_band_mask() {
        let mask = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([255, 0, 255, 0])));
        let then = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4])));
        let otherwise = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([9, 8, 7, 6])));
        let out = ifthenelse(&mask, &then, &otherwise).unwrap();
        assert_eq!(out.as_bytes(), &[1, 8, 3, 6]);
    }

    #[test]
    fn test_broadcasts_single_band_else() {
        let out = ifthenelse(&grey(2, 2, 0), &rgb(2, 2, [1, 2, 3]), &grey(2, 2, 77)).unwrap();
        assert_eq!(out.color(), image::ColorType::Rgb8);
        assert!(out.as_bytes().iter().all(|&v| v == 77));
    }

    #[test]
    fn test_size_mismatch() {
        let err = ifthenelse(&grey(2, 2, 0), &rgb(2, 3, [0; 3]), &rgb(2, 2, [0; 3])).unwrap_err();
        assert!(matches!(err, CompositeError::Geometry(_)));
    }

    #[test]
    fn test_band_mismatch() {
        let mask = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let err = ifthenelse(&mask, &rgb(2, 2, [0; 3]), &rgb(2, 2, [0; 3])).unwrap_err();
        assert!(matches!(err, CompositeError::Geometry(_)));
    }
}
