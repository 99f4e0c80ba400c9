//! OSS-style processing instructions, e.g.
//! `image/resize,w_800/watermark,text_U0FNUExF,t_50,fill_1/format,png`.
//!
//! Operations are separated by `/`, parameters by `,`, and each parameter is
//! a `key_value` pair. `watermark`, `resize` and `blur` transform the image
//! in order; `format` picks the output encoding and `info` asks for the
//! image's metadata instead of any processing.

mod resize;

pub use resize::{ResizeMode, ResizeOptions, parse_resize, resize};

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::WatermarkConfig;
use crate::error::CompositeError;
use crate::text::TextRasterizer;
use crate::watermark::{WatermarkOptions, watermark};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unknown operation: {0:?}")]
    UnknownOperation(String),

    #[error("Missing required param: {0}")]
    MissingParam(&'static str),

    #[error("Invalid param: {0}")]
    InvalidParam(String),

    #[error("Invalid base64 text: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Text is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid colour {0:?}, expected RRGGBB")]
    Color(String),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// One parsed image operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Watermark(WatermarkOptions),
    Resize(ResizeOptions),
    /// Gaussian blur. `radius` must be given but only `sigma` shapes the
    /// kernel.
    Blur { sigma: f32, radius: f32 },
}

/// A parsed process string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Process {
    pub operations: Vec<Operation>,
    /// Output encoding; `None` keeps the input's own format.
    pub format: Option<ImageFormat>,
    /// Report the image's metadata instead of processing it.
    pub info: bool,
}

/// Parse a `RRGGBB` hex colour.
pub fn parse_hex_color(s: &str) -> Result<[u8; 3], ProcessError> {
    let bad = || ProcessError::Color(s.to_string());
    if s.len() != 6 || !s.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| bad());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Integer parameter value; anything unparsable counts as 0.
fn int_param(value: &str) -> i32 {
    value.parse().unwrap_or(0)
}

/// Parse the parameters of a `watermark` operation on top of `defaults`.
///
/// A stamp is tiled only with `fill_1`, so process strings place a single
/// stamp unless asked otherwise.
pub fn parse_watermark(
    params: &[&str],
    defaults: &WatermarkConfig,
) -> Result<WatermarkOptions, ProcessError> {
    let mut text = None;
    let mut size = defaults.size;
    let mut rotate = 0;
    let mut percent = 100;
    let mut color = "000000";
    let mut fill = 0;

    for param in params {
        if let Some(v) = param.strip_prefix("text_") {
            let bytes = STANDARD_NO_PAD.decode(v)?;
            text = Some(String::from_utf8(bytes)?);
        } else if let Some(v) = param.strip_prefix("fill_") {
            fill = int_param(v);
        } else if let Some(v) = param.strip_prefix("size_") {
            size = int_param(v);
        } else if let Some(v) = param.strip_prefix("rotate_") {
            rotate = int_param(v);
        } else if let Some(v) = param.strip_prefix("t_") {
            percent = int_param(v);
        } else if let Some(v) = param.strip_prefix("color_") {
            color = v;
        }
    }

    let text = text
        .filter(|t| !t.is_empty())
        .ok_or(ProcessError::MissingParam("text"))?;
    let [r, g, b] = parse_hex_color(color)?;

    Ok(WatermarkOptions {
        text,
        font: format!("{} {}", defaults.family, size),
        width: defaults.width,
        dpi: defaults.dpi,
        rotate: f64::from(rotate),
        opacity: percent as f32 / 100.0,
        margin: defaults.margin,
        no_replicate: fill != 1,
        background: [f64::from(r), f64::from(g), f64::from(b)],
    })
}

/// Parse the `s_` (sigma) and `r_` (radius) of a `blur` operation. Both
/// are required and must be non-zero.
pub fn parse_blur(params: &[&str]) -> Result<Operation, ProcessError> {
    let number = |key: &str, value: &str| {
        value
            .parse::<f32>()
            .map_err(|_| ProcessError::InvalidParam(format!("blur {key}{value:?}")))
    };
    let mut sigma = 0.0;
    let mut radius = 0.0;
    for param in params {
        if let Some(v) = param.strip_prefix("s_") {
            sigma = number("s_", v)?;
        } else if let Some(v) = param.strip_prefix("r_") {
            radius = number("r_", v)?;
        }
    }

    if sigma == 0.0 || radius == 0.0 {
        return Err(ProcessError::MissingParam("sigma or radius"));
    }
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(ProcessError::InvalidParam(format!("blur sigma {sigma}")));
    }
    Ok(Operation::Blur { sigma, radius })
}

/// Output format named by a `format` operation. Names the encoder does not
/// know keep the input's format.
pub fn parse_format(params: &[&str]) -> Result<Option<ImageFormat>, ProcessError> {
    let name = params
        .first()
        .filter(|name| !name.is_empty())
        .ok_or(ProcessError::MissingParam("format"))?;
    let format = match *name {
        "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "webp" => Some(ImageFormat::WebP),
        "tiff" => Some(ImageFormat::Tiff),
        "gif" => Some(ImageFormat::Gif),
        other => {
            warn!("Unknown output format {:?}, keeping the input format", other);
            None
        }
    };
    Ok(format)
}

/// Parse a full process string.
///
/// An `info` step wins over everything else, and the other steps are then
/// left unparsed. The last `format` step picks the output encoding.
pub fn parse_process(process: &str, defaults: &WatermarkConfig) -> Result<Process, ProcessError> {
    let process = process.replace("image/", "");
    let steps: Vec<Vec<&str>> = process
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').collect())
        .collect();

    if steps.iter().any(|step| step[0] == "info") {
        return Ok(Process {
            info: true,
            ..Process::default()
        });
    }

    let mut parsed = Process::default();
    let mut has_format = false;
    for step in &steps {
        let (name, params) = (step[0], &step[1..]);
        match name {
            "watermark" => parsed
                .operations
                .push(Operation::Watermark(parse_watermark(params, defaults)?)),
            "resize" => parsed.operations.push(Operation::Resize(parse_resize(params)?)),
            "blur" => parsed.operations.push(parse_blur(params)?),
            "format" => {
                parsed.format = parse_format(params)?;
                has_format = true;
            }
            other => return Err(ProcessError::UnknownOperation(other.to_string())),
        }
    }

    if parsed.operations.is_empty() && !has_format {
        return Err(ProcessError::UnknownOperation(process));
    }
    debug!(
        "Parsed {} operations, output format {:?}",
        parsed.operations.len(),
        parsed.format
    );
    Ok(parsed)
}

/// Run `operations` over `image` one after another.
pub fn apply<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    image: &DynamicImage,
    operations: &[Operation],
) -> Result<DynamicImage, ProcessError> {
    let mut current = image.clone();
    for operation in operations {
        current = match operation {
            Operation::Watermark(options) => watermark(rasterizer, &current, options)?,
            Operation::Resize(options) => resize(&current, options)?,
            Operation::Blur { sigma, radius } => {
                debug!(sigma, radius, "Blurring image");
                current.blur(*sigma)
            }
        };
    }
    Ok(current)
}

/// A single metadata field, serialised as `{"value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoValue<T> {
    pub value: T,
}

/// The answer to an `info` step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInfo {
    pub file_size: InfoValue<u64>,
    pub format: InfoValue<String>,
    pub image_height: InfoValue<u32>,
    pub image_width: InfoValue<u32>,
}

impl ImageInfo {
    pub fn new(file_size: u64, format: Option<ImageFormat>, image: &DynamicImage) -> Self {
        Self {
            file_size: InfoValue { value: file_size },
            format: InfoValue {
                value: format.map_or("unknown", format_name).to_string(),
            },
            image_height: InfoValue {
                value: image.height(),
            },
            image_width: InfoValue {
                value: image.width(),
            },
        }
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Tiff => "tiff",
        other => other.extensions_str().first().copied().unwrap_or("unknown"),
    }
}
