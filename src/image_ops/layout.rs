use image::{ColorType, DynamicImage, ImageBuffer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::{CompositeError, Result};

/// How the bands of an image are to be understood, independent of whether
/// an alpha band is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    /// Greyscale, with or without alpha.
    #[serde(alias = "b_w", alias = "grey", alias = "gray")]
    BW,
    /// sRGB colour, with or without alpha.
    SRgb,
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpretation::BW => f.write_str("b-w"),
            Interpretation::SRgb => f.write_str("srgb"),
        }
    }
}

/// Number of bands (channels) in an image.
pub fn bands(image: &DynamicImage) -> u8 {
    image.color().channel_count()
}

pub fn interpretation(image: &DynamicImage) -> Interpretation {
    if image.color().has_color() {
        Interpretation::SRgb
    } else {
        Interpretation::BW
    }
}

/// Borrow the image if it already uses one of the 8-bit layouts, otherwise
/// convert it to the 8-bit layout with the same bands.
pub fn to_8bit(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
        other => Cow::Owned(convert(other, other.color().has_color(), other.color().has_alpha())),
    }
}

/// Convert `image` to the pixel layout of `like`.
///
/// Colour to greyscale uses the luma weights of the `image` crate. A missing
/// alpha band is added fully opaque; a surplus one is dropped.
pub fn conform_layout(image: DynamicImage, like: ColorType) -> DynamicImage {
    let target = layout_for(like.has_color(), like.has_alpha());
    if image.color() == target {
        return image;
    }
    convert(&image, like.has_color(), like.has_alpha())
}

/// Append a fully opaque alpha band unless one is already present.
pub fn ensure_alpha(image: &DynamicImage) -> DynamicImage {
    let image = to_8bit(image);
    if image.color().has_alpha() {
        return image.into_owned();
    }
    convert(&image, image.color().has_color(), true)
}

fn layout_for(color: bool, alpha: bool) -> ColorType {
    match (color, alpha) {
        (false, false) => ColorType::L8,
        (false, true) => ColorType::La8,
        (true, false) => ColorType::Rgb8,
        (true, true) => ColorType::Rgba8,
    }
}

fn convert(image: &DynamicImage, color: bool, alpha: bool) -> DynamicImage {
    match (color, alpha) {
        (false, false) => DynamicImage::ImageLuma8(image.to_luma8()),
        (false, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        (true, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        (true, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
    }
}

/// Reserve a zeroed pixel buffer, reporting allocation failure instead of
/// aborting.
pub(crate) fn alloc_raw(width: u32, height: u32, bands: u8) -> Result<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(bands as usize))
        .ok_or_else(|| {
            CompositeError::allocation(format!("{width}x{height}x{bands} overflows usize"))
        })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        CompositeError::allocation(format!("{width}x{height}x{bands}: {e}"))
    })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Wrap a raw interleaved buffer in the 8-bit layout matching `bands`.
pub(crate) fn from_raw(width: u32, height: u32, bands: u8, data: Vec<u8>) -> Result<DynamicImage> {
    let image = match bands {
        1 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        2 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLumaA8),
        3 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        n => {
            return Err(CompositeError::geometry(format!(
                "{n} bands is not a supported layout"
            )));
        }
    };
    image.ok_or_else(|| {
        CompositeError::allocation(format!("buffer too small for {width}x{height}x{bands}"))
    })
}
