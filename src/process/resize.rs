//! The `resize` operation: `w_`/`h_` box, `l_`/`s_` long and short edge,
//! `p_` percentage, `m_` mode, `limit_` and `color_` (pad background).

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Limits};
use std::str::FromStr;
use tracing::debug;

use super::{ProcessError, int_param, parse_hex_color};
use crate::fill::color_fill;
use crate::image_ops::{bands, black, paste, to_8bit};

/// Linear resampling throughout.
const FILTER: FilterType = FilterType::Triangle;

/// How the source is fitted to the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Largest size that fits inside the box, aspect kept.
    #[default]
    Lfit,
    /// Smallest size that covers the box, aspect kept.
    Mfit,
    /// Cover the box, then crop the centre to exactly the box.
    Fill,
    /// Fit inside the box, then pad to exactly the box.
    Pad,
    /// Exactly the box, aspect ignored.
    Fixed,
}

/// Unknown mode names fall back to `lfit`.
impl FromStr for ResizeMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mfit" => ResizeMode::Mfit,
            "fill" => ResizeMode::Fill,
            "pad" => ResizeMode::Pad,
            "fixed" => ResizeMode::Fixed,
            _ => ResizeMode::Lfit,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeOptions {
    pub width: u32,
    pub height: u32,
    /// Target of the longer source edge, used when no box is given.
    pub long: u32,
    /// Target of the shorter source edge, used when no box is given.
    pub short: u32,
    /// Uniform scale in percent, used when no box or edge is given.
    pub percent: u32,
    pub mode: ResizeMode,
    /// Never enlarge the source.
    pub limit: bool,
    /// Pad background; white (or transparent with alpha) when unset.
    pub color: Option<[u8; 3]>,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            long: 0,
            short: 0,
            percent: 0,
            mode: ResizeMode::Lfit,
            limit: true,
            color: None,
        }
    }
}

impl ResizeOptions {
    /// The requested box, taking it from the long and short edges when no
    /// width or height was given. `mfit` uses one edge for both if only one
    /// is set.
    fn target_box(&self, width: u32, height: u32) -> (u32, u32) {
        if self.width > 0 || self.height > 0 {
            return (self.width, self.height);
        }
        let (long, short) = match self.mode {
            ResizeMode::Mfit => pair(self.long, self.short),
            _ => (self.long, self.short),
        };
        if height < width { (long, short) } else { (short, long) }
    }
}

fn dimension(value: &str) -> u32 {
    u32::try_from(int_param(value)).unwrap_or(0)
}

/// Parse the parameters of a `resize` operation.
///
/// A box (`w_`/`h_`) wins over edges (`l_`/`s_`), which win over `p_`.
pub fn parse_resize(params: &[&str]) -> Result<ResizeOptions, ProcessError> {
    let mut options = ResizeOptions::default();
    for param in params {
        if let Some(v) = param.strip_prefix("w_") {
            options.width = dimension(v);
        } else if let Some(v) = param.strip_prefix("h_") {
            options.height = dimension(v);
        } else if let Some(v) = param.strip_prefix("limit_") {
            options.limit = int_param(v) != 0;
        } else if let Some(v) = param.strip_prefix("m_") {
            options.mode = v.parse().unwrap_or_default();
        } else if let Some(v) = param.strip_prefix("color_") {
            options.color = Some(parse_hex_color(v)?);
        } else if let Some(v) = param.strip_prefix("l_") {
            options.long = dimension(v);
        } else if let Some(v) = param.strip_prefix("s_") {
            options.short = dimension(v);
        } else if let Some(v) = param.strip_prefix("p_") {
            options.percent = dimension(v);
        }
    }

    let has_box = options.width > 0 || options.height > 0;
    if has_box {
        options.percent = 0;
        options.long = 0;
        options.short = 0;
    }
    if !has_box && options.long == 0 && options.short == 0 && options.percent == 0 {
        return Err(ProcessError::InvalidParam(
            "width and height can not both be 0".to_string(),
        ));
    }
    Ok(options)
}

/// One value standing in for both when the other is zero.
fn pair<T: PartialEq + Default + Copy>(a: T, b: T) -> (T, T) {
    if a == T::default() {
        (b, b)
    } else if b == T::default() {
        (a, a)
    } else {
        (a, b)
    }
}

/// Refuse output sizes whose pixel buffer exceeds the decoder allocation
/// limits of the `image` crate.
fn check_size(width: u32, height: u32, bands: u8) -> Result<(), ProcessError> {
    let mut limits = Limits::default();
    limits.check_dimensions(width, height)?;
    limits.reserve(
        u64::from(width)
            .saturating_mul(u64::from(height))
            .saturating_mul(u64::from(bands)),
    )?;
    Ok(())
}

fn scaled(image: &DynamicImage, scale: f64) -> Result<DynamicImage, ProcessError> {
    let (w, h) = image.dimensions();
    let side = |v: u32| (f64::from(v) * scale).round().clamp(1.0, f64::from(u32::MAX)) as u32;
    let (nw, nh) = (side(w), side(h));
    exact(image, nw, nh)
}

fn exact(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, ProcessError> {
    check_size(width, height, bands(image))?;
    Ok(image.resize_exact(width, height, FILTER))
}

/// Resize `image` as `options` ask. Sizes that would not shrink the image
/// are left alone while `limit` is set.
pub fn resize(image: &DynamicImage, options: &ResizeOptions) -> Result<DynamicImage, ProcessError> {
    let (ow, oh) = image.dimensions();
    debug!(?options, width = ow, height = oh, "Resizing image");

    let (w, h) = options.target_box(ow, oh);
    if w == 0 && h == 0 {
        return scaled(image, f64::from(options.percent) / 100.0);
    }

    let shrinks = (w > 0 && w < ow) || (h > 0 && h < oh);
    let enlarge = !options.limit;
    let (sw, sh) = (f64::from(w) / f64::from(ow), f64::from(h) / f64::from(oh));

    match options.mode {
        ResizeMode::Lfit if shrinks || enlarge => {
            let sw = if w == 0 { 1.0 } else { sw };
            let sh = if h == 0 { 1.0 } else { sh };
            scaled(image, sw.min(sh))
        }
        ResizeMode::Mfit if (w < ow && h < oh) || enlarge => scaled(image, sw.max(sh)),
        ResizeMode::Fill if shrinks || enlarge => {
            let (w, h) = pair(w, h);
            check_size(w, h, bands(image))?;
            Ok(image.resize_to_fill(w, h, FILTER))
        }
        ResizeMode::Fixed if w > 0 && h > 0 => {
            if (w < ow && h < oh) || enlarge {
                exact(image, w, h)
            } else {
                Ok(image.clone())
            }
        }
        ResizeMode::Fixed if shrinks || enlarge => {
            let (sw, sh) = pair(sw, sh);
            scaled(image, sw.min(sh))
        }
        ResizeMode::Pad => pad(image, pair(w, h), options.color),
        _ => Ok(image.clone()),
    }
}

/// Fit inside `width` x `height` and centre on a canvas of exactly that size.
fn pad(
    image: &DynamicImage,
    (width, height): (u32, u32),
    color: Option<[u8; 3]>,
) -> Result<DynamicImage, ProcessError> {
    let (ow, oh) = image.dimensions();
    let scale = (f64::from(width) / f64::from(ow)).min(f64::from(height) / f64::from(oh));
    let resized = scaled(image, scale)?;
    let resized = to_8bit(&resized);

    check_size(width, height, bands(&resized))?;
    let canvas = black(width, height, bands(&resized))?;
    let mut canvas = match color {
        Some([r, g, b]) => color_fill(&[f64::from(r), f64::from(g), f64::from(b), 255.0], &canvas)?,
        None if resized.color().has_alpha() => canvas,
        None => color_fill(&[255.0, 255.0, 255.0], &canvas)?,
    };

    let x = (i64::from(width) - i64::from(resized.width())) / 2;
    let y = (i64::from(height) - i64::from(resized.height())) / 2;
    paste(&mut canvas, &resized, x, y)?;
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
    }

    fn run(params: &[&str], image: &DynamicImage) -> DynamicImage {
        resize(image, &parse_resize(params).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_resize_precedence() {
        let options = parse_resize(&["w_100", "l_50", "p_30", "m_fill", "limit_0"]).unwrap();
        assert_eq!((options.width, options.long, options.percent), (100, 0, 0));
        assert_eq!(options.mode, ResizeMode::Fill);
        assert!(!options.limit);

        let options = parse_resize(&["p_50", "m_unknown"]).unwrap();
        assert_eq!(options.percent, 50);
        assert_eq!(options.mode, ResizeMode::Lfit);
        assert!(options.limit);
    }

    #[test]
    fn test_parse_resize_errors() {
        assert!(matches!(parse_resize(&["m_pad"]), Err(ProcessError::InvalidParam(_))));
        assert!(matches!(parse_resize(&["w_-5"]), Err(ProcessError::InvalidParam(_))));
        assert!(matches!(
            parse_resize(&["w_10", "color_zz0000"]),
            Err(ProcessError::Color(_))
        ));
    }

    #[test]
    fn test_lfit_keeps_aspect_inside_box() {
        let out = run(&["w_100", "h_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 50));

        let out = run(&["w_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn test_limit_prevents_enlarging() {
        let image = source(40, 20);
        assert_eq!(run(&["w_100"], &image).dimensions(), (40, 20));
        assert_eq!(run(&["w_100", "h_50", "limit_0"], &image).dimensions(), (100, 50));
        // A missing side keeps its source size, which caps the scale.
        assert_eq!(run(&["w_100", "limit_0"], &image).dimensions(), (40, 20));
    }

    #[test]
    fn test_mfit_covers_box() {
        let out = run(&["m_mfit", "w_100", "h_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (200, 100));

        let out = run(&["m_mfit", "s_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (200, 100));
    }

    #[test]
    fn test_fill_crops_to_box() {
        let out = run(&["m_fill", "w_100", "h_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 100));

        let out = run(&["m_fill", "w_50"], &source(400, 200));
        assert_eq!(out.dimensions(), (50, 50));
    }

    #[test]
    fn test_fixed_ignores_aspect() {
        let out = run(&["m_fixed", "w_100", "h_30"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 30));

        let out = run(&["m_fixed", "h_50"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn test_long_and_short_edges_follow_orientation() {
        let out = run(&["l_100"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 50));

        let out = run(&["l_100"], &source(200, 400));
        assert_eq!(out.dimensions(), (50, 100));
    }

    #[test]
    fn test_percent_scales_uniformly() {
        let out = run(&["p_25"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn test_pad_centres_on_coloured_canvas() {
        let out = run(&["m_pad", "w_100", "h_100", "color_ff0000"], &source(400, 200));
        assert_eq!(out.dimensions(), (100, 100));
        let out = out.to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(50, 50).0, [10, 20, 30]);
        assert_eq!(out.get_pixel(99, 99).0, [255, 0, 0]);
    }

    #[test]
    fn test_pad_background_defaults() {
        let out = run(&["m_pad", "w_100", "h_100"], &source(400, 200));
        assert_eq!(out.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);

        let alpha = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([1, 2, 3, 255])));
        let out = run(&["m_pad", "w_20", "h_20"], &alpha);
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(out.to_rgba8().get_pixel(10, 10).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_huge_target_is_refused() {
        let options = parse_resize(&["m_fixed", "w_2000000000", "h_2000000000", "limit_0"]).unwrap();
        let err = resize(&source(4, 4), &options).unwrap_err();
        assert!(matches!(err, ProcessError::Image(_)));
    }
}
