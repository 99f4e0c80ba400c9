use image::DynamicImage;

use super::layout::{alloc_raw, bands, from_raw, to_8bit};
use crate::error::{CompositeError, Result};

/// A `width` x `height` image of zeros with the given band count.
pub fn black(width: u32, height: u32, bands: u8) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(CompositeError::geometry(format!(
            "black image must be at least 1x1, got {width}x{height}"
        )));
    }
    if !(1..=4).contains(&bands) {
        return Err(CompositeError::geometry(format!(
            "black image needs 1 to 4 bands, got {bands}"
        )));
    }
    from_raw(width, height, bands, alloc_raw(width, height, bands)?)
}

/// Compute `pixel * a + b` for every band and cast the result to 8 bits.
///
/// `a` and `b` hold either one constant for all bands or one per band.
/// Factors are not clamped; only the final cast saturates to 0..=255.
pub fn linear(image: &DynamicImage, a: &[f64], b: &[f64]) -> Result<DynamicImage> {
    let image = to_8bit(image);
    let n = bands(&image) as usize;
    for (name, constants) in [("scale", a), ("offset", b)] {
        if constants.len() != 1 && constants.len() != n {
            return Err(CompositeError::geometry(format!(
                "linear {name} has {} constants for a {n}-band image",
                constants.len()
            )));
        }
    }

    let (width, height) = (image.width(), image.height());
    let mut out = alloc_raw(width, height, n as u8)?;
    for (i, (dst, &src)) in out.iter_mut().zip(image.as_bytes()).enumerate() {
        let band = i % n;
        let scale = if a.len() == 1 { a[0] } else { a[band] };
        let offset = if b.len() == 1 { b[0] } else { b[band] };
        *dst = cast_u8(f64::from(src) * scale + offset);
    }
    from_raw(width, height, n as u8, out)
}

/// Round to nearest and saturate into the 8-bit range. NaN becomes 0.
pub fn cast_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn test_black_is_zeroed() {
        let img = black(3, 2, 4).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgba8);
        assert_eq!(img.width(), 3);
        assert!(img.as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_black_rejects_empty() {
        assert!(matches!(black(0, 1, 1), Err(CompositeError::Geometry(_))));
        assert!(matches!(black(1, 1, 0), Err(CompositeError::Geometry(_))));
    }

    #[test]
    fn test_linear_single_constant() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 1, Luma([200])));
        let half = linear(&img, &[0.5], &[0.0]).unwrap();
        assert_eq!(half.as_bytes(), &[100, 100]);
    }

    #[test]
    fn test_linear_per_band_offset() {
        let img = black(1, 1, 3).unwrap();
        let filled = linear(&img, &[1.0, 1.0, 1.0], &[12.0, 34.0, 56.0]).unwrap();
        assert_eq!(filled.as_bytes(), &[12, 34, 56]);
    }

    #[test]
    fn test_linear_does_not_clamp_factor() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 100])));
        let over = linear(&img, &[1.5], &[0.0]).unwrap();
        assert_eq!(over.as_bytes(), &[150, 150, 150, 150]);

        let negative = linear(&img, &[-1.0], &[0.0]).unwrap();
        assert_eq!(negative.as_bytes(), &[0, 0, 0, 0]);

        let saturated = linear(&img, &[3.0], &[0.0]).unwrap();
        assert_eq!(saturated.as_bytes(), &[255, 255, 255, 255]);
    }

    #[test]
    fn test_linear_rejects_constant_count() {
        let img = black(1, 1, 3).unwrap();
        let err = linear(&img, &[1.0, 1.0], &[0.0]).unwrap_err();
        assert!(matches!(err, CompositeError::Geometry(_)));
    }

    #[test]
    fn test_cast_u8() {
        assert_eq!(cast_u8(127.5), 128);
        assert_eq!(cast_u8(-3.0), 0);
        assert_eq!(cast_u8(300.0), 255);
        assert_eq!(cast_u8(f64::NAN), 0);
    }
}
