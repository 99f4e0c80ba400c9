//! Arbitrary-angle rotation with an expanded bounding box.
//!
//! Quarter turns are exact. Any other angle is resampled bilinearly about
//! the centre onto a canvas large enough to hold the rotated corners, with
//! zero (transparent) background.

use image::{DynamicImage, ImageBuffer, Pixel, imageops};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

use super::layout::{alloc_raw, to_8bit};
use crate::error::{CompositeError, Result};

/// Rotate `image` clockwise by `degrees`.
pub fn rotate(image: &DynamicImage, degrees: f64) -> Result<DynamicImage> {
    if !degrees.is_finite() {
        return Err(CompositeError::geometry(format!(
            "rotation angle must be finite, got {degrees}"
        )));
    }
    let image = to_8bit(image);
    let turn = degrees.rem_euclid(360.0);

    if turn == 0.0 {
        return Ok(image.into_owned());
    } else if turn == 90.0 {
        return Ok(image.rotate90());
    } else if turn == 180.0 {
        return Ok(image.rotate180());
    } else if turn == 270.0 {
        return Ok(image.rotate270());
    }

    let theta = turn.to_radians() as f32;
    let (w, h) = (image.width(), image.height());
    debug!(w, h, degrees, "Rotating image");

    let rotated = match image.as_ref() {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate_expanded(buf, theta)?),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(rotate_expanded(buf, theta)?),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(rotate_expanded(buf, theta)?),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(rotate_expanded(buf, theta)?),
        other => {
            return Err(CompositeError::geometry(format!(
                "cannot rotate {:?} image",
                other.color()
            )));
        }
    };
    Ok(rotated)
}

/// Size of the axis-aligned box that holds a `width` x `height` rectangle
/// rotated by `theta` radians.
pub fn rotated_bounds(width: u32, height: u32, theta: f32) -> (u32, u32) {
    let (sin, cos) = (f64::from(theta).sin().abs(), f64::from(theta).cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    // f32 radians leave cos(pi/2) at ~4e-8, which must not add a pixel.
    let fit = |v: f64| ((v - 1e-3).ceil() as u32).max(1);
    (fit(w * cos + h * sin), fit(w * sin + h * cos))
}

fn rotate_expanded<P>(buffer: &ImageBuffer<P, Vec<u8>>, theta: f32) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    let (w, h) = buffer.dimensions();
    let (bw, bh) = rotated_bounds(w, h, theta);
    let (cw, ch) = (bw.max(w), bh.max(h));

    let mut canvas = ImageBuffer::<P, Vec<u8>>::from_raw(cw, ch, alloc_raw(cw, ch, P::CHANNEL_COUNT)?)
        .ok_or_else(|| CompositeError::allocation(format!("rotation canvas {cw}x{ch}")))?;
    imageops::replace(
        &mut canvas,
        buffer,
        i64::from((cw - w) / 2),
        i64::from((ch - h) / 2),
    );

    let zeros = [0u8; 4];
    let background = *P::from_slice(&zeros[..P::CHANNEL_COUNT as usize]);
    let rotated = rotate_about_center(&canvas, theta, Interpolation::Bilinear, background);

    Ok(imageops::crop_imm(&rotated, (cw - bw) / 2, (ch - bh) / 2, bw, bh).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, GrayImage, Luma, Rgba, RgbaImage};

    fn corner_image(width: u32, height: u32) -> DynamicImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([128]));
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(width - 1, 0, Luma([20]));
        img.put_pixel(0, height - 1, Luma([30]));
        img.put_pixel(width - 1, height - 1, Luma([40]));
        DynamicImage::ImageLuma8(img)
    }

    fn value(img: &DynamicImage, x: u32, y: u32) -> u8 {
        img.get_pixel(x, y)[0]
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let img = corner_image(5, 3);
        let out = rotate(&img, 0.0).unwrap();
        assert_eq!(out.as_bytes(), img.as_bytes());

        let full_turn = rotate(&img, -360.0).unwrap();
        assert_eq!(full_turn.as_bytes(), img.as_bytes());
    }

    #[test]
    fn test_rotate_quarter_turn_clockwise() {
        let img = corner_image(6, 3);
        let out = rotate(&img, 90.0).unwrap();
        assert_eq!(out.dimensions(), (3, 6));
        // Top-left moves to the top-right corner.
        assert_eq!(value(&out, 2, 0), 10);
        assert_eq!(value(&out, 0, 0), 30);

        let anticlockwise = rotate(&img, -90.0).unwrap();
        assert_eq!(anticlockwise.dimensions(), (3, 6));
        assert_eq!(value(&anticlockwise, 0, 5), 10);
    }

    #[test]
    fn test_rotate_thirty_degrees_grows_bounds() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 10, Rgba([255, 255, 255, 255])));
        let out = rotate(&img, 30.0).unwrap();
        let (w, h) = out.dimensions();
        assert_eq!((w, h), rotated_bounds(40, 10, 30f32.to_radians()));
        assert!(h > 10);
        // Corners of the bounding box are outside the rotated strip.
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(out.get_pixel(w / 2, h / 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(10, 10, 0.0), (10, 10));
        assert_eq!(rotated_bounds(40, 10, std::f32::consts::FRAC_PI_2), (10, 40));
        // 100 * cos30 + 20 * sin30 = 96.6, 100 * sin30 + 20 * cos30 = 67.3
        assert_eq!(rotated_bounds(100, 20, 30f32.to_radians()), (97, 68));
    }

    #[test]
    fn test_rotate_rejects_nan() {
        let img = corner_image(2, 2);
        assert!(matches!(rotate(&img, f64::NAN), Err(CompositeError::Geometry(_))));
    }
}
