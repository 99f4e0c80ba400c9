use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CompositeError, Result, Stage};
use crate::fill::color_fill;
use crate::image_ops::{
    Extend, embed, ensure_alpha, ifthenelse, linear, replicate_to_cover, rotate,
};
use crate::text::{Align, DEFAULT_DPI, FontDescriptor, TextRasterizer, TextRequest};

/// Line spacing of watermark text, in points.
const LINE_SPACING_PT: f32 = 1.0;

/// Options for stamping a rotated, semi-transparent text watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkOptions {
    pub text: String,
    /// Font descriptor, e.g. `"sans 40"`.
    pub font: String,
    /// Width the text is wrapped to before rotation.
    pub width: i32,
    pub dpi: i32,
    /// Clockwise rotation in degrees.
    pub rotate: f64,
    /// Blend weight of the text. Values outside [0, 1] are applied as-is.
    pub opacity: f32,
    /// Pixels of empty space right of and below each stamp.
    pub margin: i32,
    /// Stamp once in the top-left corner instead of tiling.
    pub no_replicate: bool,
    /// Text colour. The fill is always fully opaque.
    pub background: [f64; 3],
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: "sans 40".to_string(),
            width: 100,
            dpi: DEFAULT_DPI,
            rotate: 0.0,
            opacity: 1.0,
            margin: 20,
            no_replicate: false,
            background: [0.0, 0.0, 0.0],
        }
    }
}

/// Stamp a text watermark across `image`.
///
/// The text is rendered as an RGBA mask, rotated, scaled by the opacity and
/// padded by the margin; the padded stamp is then tiled over the whole image
/// (or placed once) and used to blend an opaque colour fill over the source.
/// A source without alpha gains an opaque alpha band first, so the result is
/// the source's interpretation with alpha. Greyscale sources are rejected
/// by the blend because the RGBA mask cannot be matched to two bands.
pub fn watermark<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    options: &WatermarkOptions,
) -> Result<DynamicImage> {
    debug!(
        text = %options.text,
        font = %options.font,
        rotate = options.rotate,
        opacity = options.opacity,
        margin = options.margin,
        replicate = !options.no_replicate,
        "Applying watermark"
    );
    run_watermark(rasterizer, image, options).inspect_err(|e| warn!("Watermark failed: {}", e))
}

fn run_watermark<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    options: &WatermarkOptions,
) -> Result<DynamicImage> {
    let source = ensure_alpha(image);
    let (width, height) = (source.width() as i32, source.height() as i32);

    let font: FontDescriptor = options
        .font
        .parse()
        .map_err(|e: CompositeError| e.during(Stage::RenderText))?;
    let request = TextRequest {
        align: Align::Centre,
        dpi: options.dpi,
        spacing: (LINE_SPACING_PT * options.dpi as f32 / 72.0).round() as i32,
        justify: true,
        rgba: true,
        ..TextRequest::new(options.text.as_str(), font, options.width)
    };
    let text = rasterizer
        .rasterize(&request)
        .map_err(|e| e.during(Stage::RenderText))?;

    let rotated = rotate(&text, options.rotate).map_err(|e| e.during(Stage::Rotate))?;
    let mask = linear(&rotated, &[f64::from(options.opacity)], &[0.0])
        .map_err(|e| e.during(Stage::ScaleOpacity))?;
    let pad = |side: u32| i32::try_from(side).ok()?.checked_add(options.margin);
    let (Some(stamp_width), Some(stamp_height)) = (pad(mask.width()), pad(mask.height())) else {
        return Err(CompositeError::geometry(format!(
            "margin {} overflows the {}x{} stamp",
            options.margin,
            mask.width(),
            mask.height()
        ))
        .during(Stage::Embed));
    };
    let stamp = embed(&mask, 0, 0, stamp_width, stamp_height, Extend::Black)
        .map_err(|e| e.during(Stage::Embed))?;
    debug!(
        stamp_width = stamp.width(),
        stamp_height = stamp.height(),
        "Watermark stamp ready"
    );

    let mask = if options.no_replicate {
        embed(&stamp, 0, 0, width, height, Extend::Black).map_err(|e| e.during(Stage::Embed))?
    } else {
        replicate_to_cover(&stamp, source.width(), source.height())
            .map_err(|e| e.during(Stage::Replicate))?
    };

    let [r, g, b] = options.background;
    let fill = color_fill(&[r, g, b, 255.0], &source).map_err(|e| e.during(Stage::ColorFill))?;

    ifthenelse(&mask, &fill, &source).map_err(|e| e.during(Stage::Blend))
}
