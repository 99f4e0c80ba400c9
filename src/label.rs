use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{CompositeError, Result, Stage};
use crate::fill::color_fill;
use crate::image_ops::{Extend, embed, ifthenelse, linear, to_8bit};
use crate::text::{Align, DEFAULT_FONT, FontDescriptor, TextRasterizer, TextRequest};

/// Options for stamping a text label onto an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelOptions {
    pub text: String,
    /// Font descriptor, e.g. `"sans 10"`.
    pub font: String,
    /// Layout box the text is wrapped and fitted into.
    pub width: i32,
    pub height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub align: Align,
    /// Blend weight of the text. Values outside [0, 1] are applied as-is.
    pub opacity: f32,
    pub color: [f64; 3],
}

impl LabelOptions {
    pub fn new(text: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            text: text.into(),
            font: DEFAULT_FONT.to_string(),
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            align: Align::Left,
            opacity: 1.0,
            color: [0.0, 0.0, 0.0],
        }
    }
}

/// Stamp a text label onto `image`.
///
/// The text is rendered to a mask fitted into the options' layout box,
/// scaled by the opacity, placed at the offset and used to blend a solid
/// colour fill over the source. The result has the source's size and pixel
/// layout.
pub fn label<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    options: &LabelOptions,
) -> Result<DynamicImage> {
    debug!(
        text = %options.text,
        font = %options.font,
        width = options.width,
        height = options.height,
        opacity = options.opacity,
        "Applying label"
    );
    run_label(rasterizer, image, options).inspect_err(|e| warn!("Label failed: {}", e))
}

fn run_label<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    options: &LabelOptions,
) -> Result<DynamicImage> {
    let source = to_8bit(image);

    let font: FontDescriptor = options
        .font
        .parse()
        .map_err(|e: CompositeError| e.during(Stage::RenderText))?;
    let request = TextRequest {
        height: Some(options.height),
        align: options.align,
        ..TextRequest::new(options.text.as_str(), font, options.width)
    };
    let text = rasterizer
        .rasterize(&request)
        .map_err(|e| e.during(Stage::RenderText))?;

    let mask = linear(&text, &[f64::from(options.opacity)], &[0.0])
        .map_err(|e| e.during(Stage::ScaleOpacity))?;
    let mask = embed(
        &mask,
        options.offset_x,
        options.offset_y,
        source.width() as i32,
        source.height() as i32,
        Extend::Black,
    )
    .map_err(|e| e.during(Stage::Embed))?;

    let fill = color_fill(&options.color, &source).map_err(|e| e.during(Stage::ColorFill))?;

    ifthenelse(&mask, &fill, &source).map_err(|e| e.during(Stage::Blend))
}

/// A length that is either a pixel count or a fraction of the image's
/// corresponding dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Absolute(f64),
    Relative(f64),
}

impl Scalar {
    /// Pixel value of this scalar against `base`, rounded.
    pub fn resolve(self, base: u32) -> i32 {
        match self {
            Scalar::Absolute(v) => v.round() as i32,
            Scalar::Relative(f) => (f * f64::from(base)).round() as i32,
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Absolute(0.0)
    }
}

/// `"120"` is absolute; `"50%"` and `"0.5r"` are relative.
impl FromStr for Scalar {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid length {s:?}: {e}"))
        };
        if let Some(percent) = s.strip_suffix('%') {
            Ok(Scalar::Relative(parse(percent)? / 100.0))
        } else if let Some(fraction) = s.strip_suffix('r') {
            Ok(Scalar::Relative(parse(fraction)?))
        } else {
            Ok(Scalar::Absolute(parse(s)?))
        }
    }
}

/// Label options whose box and offsets may be relative to the image size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelParams {
    pub text: String,
    pub font: String,
    pub width: Scalar,
    pub height: Scalar,
    #[serde(default)]
    pub offset_x: Scalar,
    #[serde(default)]
    pub offset_y: Scalar,
    #[serde(default)]
    pub align: Align,
    pub opacity: f32,
    pub color: [f64; 3],
}

impl LabelParams {
    /// Pixel options for an image of `width` x `height`.
    pub fn resolve(&self, width: u32, height: u32) -> LabelOptions {
        LabelOptions {
            text: self.text.clone(),
            font: self.font.clone(),
            width: self.width.resolve(width),
            height: self.height.resolve(height),
            offset_x: self.offset_x.resolve(width),
            offset_y: self.offset_y.resolve(height),
            align: self.align,
            opacity: self.opacity,
            color: self.color,
        }
    }
}

/// [`label`] with lengths resolved against `image`.
pub fn label_params<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    params: &LabelParams,
) -> Result<DynamicImage> {
    let options = params.resolve(image.width(), image.height());
    label(rasterizer, image, &options)
}
