use ab_glyph::{Font, PxScale, ScaleFont};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use super::layout::{Line, justify, line_offset, wrap_lines};
use super::{FontBook, TextRasterizer, TextRequest};
use crate::error::{CompositeError, Result};
use crate::image_ops::alloc_raw;

impl TextRasterizer for FontBook {
    fn rasterize(&self, request: &TextRequest) -> Result<DynamicImage> {
        request.validate()?;
        let font = self.load(&request.font.family)?;
        render_with_font(font.as_ref(), request)
    }
}

/// Rasterize `request` with an already loaded font.
pub fn render_with_font<F: Font>(font: &F, request: &TextRequest) -> Result<DynamicImage> {
    request.validate()?;
    let max_width = request.width as u32;
    let requested = request.font.pixel_size(request.dpi);
    let px = match request.height {
        Some(h) => fit_pixel_size(font, request, requested, max_width, h as u32),
        None => requested,
    };
    let scale = PxScale::from(px);
    let block = Block::layout(font, scale, request);

    let width = block.width.min(max_width).max(1);
    let height = match request.height {
        Some(h) => block.height.min(h as u32),
        None => block.height,
    }
    .max(1);
    debug!(
        px,
        lines = block.lines.len(),
        width,
        height,
        "Rendering text block"
    );

    let mut canvas = GrayImage::from_raw(width, height, alloc_raw(width, height, 1)?)
        .ok_or_else(|| CompositeError::allocation(format!("text canvas {width}x{height}")))?;
    let ink = Luma([255u8]);
    let advance = i64::from(block.line_height) + i64::from(request.spacing);

    for (i, line) in block.lines.iter().enumerate() {
        let top = i as i64 * advance;
        if top >= i64::from(height) {
            break;
        }
        let Ok(y) = i32::try_from(top) else {
            break;
        };
        let words = request
            .justify
            .then(|| justify(line, block.width, |s| measure(font, scale, s)))
            .flatten();
        match words {
            Some(words) => {
                for (x, word) in words {
                    draw_text_mut(&mut canvas, ink, x, y, scale, font, word);
                }
            }
            None => {
                let x = line_offset(request.align, block.width, line.width);
                draw_text_mut(&mut canvas, ink, x, y, scale, font, &line.text);
            }
        }
    }

    if request.rgba {
        Ok(DynamicImage::ImageRgba8(coverage_to_rgba(&canvas)))
    } else {
        Ok(DynamicImage::ImageLuma8(canvas))
    }
}

/// Advance width of `text` in pixels, kerning included.
pub fn measure<F: Font>(font: &F, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev = None;

    for ch in text.chars() {
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, glyph);
        }
        width += scaled.h_advance(glyph);
        prev = Some(glyph);
    }

    width.ceil() as u32
}

fn line_height<F: Font>(font: &F, scale: PxScale) -> u32 {
    let scaled = font.as_scaled(scale);
    (scaled.ascent() - scaled.descent() + scaled.line_gap()).ceil() as u32
}

/// Largest pixel size, no larger than `requested`, whose layout fits the
/// box. Falls back to 1px when nothing fits.
fn fit_pixel_size<F: Font>(
    font: &F,
    request: &TextRequest,
    requested: f32,
    max_width: u32,
    max_height: u32,
) -> f32 {
    let fits = |px: f32| {
        let block = Block::layout(font, PxScale::from(px), request);
        block.width <= max_width && block.height <= max_height
    };
    if fits(requested) {
        return requested;
    }

    let mut best = 1.0;
    let (mut lo, mut hi) = (1u32, requested.floor().max(1.0) as u32);
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid as f32) {
            best = mid as f32;
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    best
}

struct Block {
    lines: Vec<Line>,
    width: u32,
    height: u32,
    line_height: u32,
}

impl Block {
    fn layout<F: Font>(font: &F, scale: PxScale, request: &TextRequest) -> Self {
        let lines = wrap_lines(&request.text, request.width as u32, |s| {
            measure(font, scale, s)
        });
        let line_height = line_height(font, scale);
        let count = lines.len() as u64;
        let width = lines.iter().map(|l| l.width).max().unwrap_or(0);
        // Layouts taller than u32::MAX never fit, so saturate.
        let height = count
            .saturating_mul(u64::from(line_height))
            .saturating_add(count.saturating_sub(1).saturating_mul(request.spacing.max(0) as u64));
        let height = u32::try_from(height).unwrap_or(u32::MAX);
        Self {
            lines,
            width,
            height,
            line_height,
        }
    }
}

/// Every band carries the glyph coverage, so the result works as a
/// per-band blend mask.
fn coverage_to_rgba(mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let c = mask.get_pixel(x, y)[0];
        Rgba([c, c, c, c])
    })
}
