#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use labelmark::text::{TextRasterizer, TextRequest, line_offset, wrap_lines};
use labelmark::{FontBook, FontsConfig, Result};

/// Rasterizer drawing every non-space character as a solid square of
/// `glyph` pixels. Lays text out with the crate's own line wrapping, so
/// outputs are predictable without any font on the machine.
pub struct BlockRasterizer {
    pub glyph: u32,
}

impl BlockRasterizer {
    pub fn new(glyph: u32) -> Self {
        Self { glyph }
    }
}

impl TextRasterizer for BlockRasterizer {
    fn rasterize(&self, request: &TextRequest) -> Result<DynamicImage> {
        request.validate()?;
        let g = self.glyph;
        let measure = |s: &str| s.chars().count() as u32 * g;
        let lines = wrap_lines(&request.text, request.width as u32, measure);

        let block_width = lines.iter().map(|l| l.width).max().unwrap_or(0);
        let advance = g + request.spacing as u32;
        let full_height = lines.len() as u32 * advance - request.spacing as u32;
        let width = block_width.min(request.width as u32).max(1);
        let height = request
            .height
            .map_or(full_height, |h| full_height.min(h as u32))
            .max(1);

        let mut mask = GrayImage::new(width, height);
        for (i, line) in lines.iter().enumerate() {
            let left = line_offset(request.align, block_width, line.width);
            for (c, ch) in line.text.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let x0 = left + (c as u32 * g) as i32;
                let y0 = (i as u32 * advance) as i32;
                for y in y0..y0 + g as i32 {
                    for x in x0..x0 + g as i32 {
                        if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                            mask.put_pixel(x as u32, y as u32, Luma([255]));
                        }
                    }
                }
            }
        }

        if request.rgba {
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_fn(
                width,
                height,
                |x, y| {
                    let c = mask.get_pixel(x, y)[0];
                    Rgba([c, c, c, c])
                },
            )))
        } else {
            Ok(DynamicImage::ImageLuma8(mask))
        }
    }
}

pub fn rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

/// A deterministic gradient so changed pixels are easy to spot.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// A font book over the machine's default font directories, or `None` when
/// no sans font is installed.
pub fn system_fonts() -> Option<FontBook> {
    let book = FontBook::from_config(&FontsConfig::default());
    if book.resolve("sans").is_none() {
        eprintln!("No sans font found, skipping test");
        return None;
    }
    Some(book)
}
