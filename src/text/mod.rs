//! Text rasterization into blend masks.
//!
//! A [`TextRasterizer`] turns a [`TextRequest`] into a coverage mask: `L8`
//! by default, or `Rgba8` with the coverage in every band when the request
//! asks for RGBA. [`FontBook`] is the font-file backed implementation.

mod font;
mod layout;
mod render;

use image::DynamicImage;

use crate::error::{CompositeError, Result};

pub use font::{DEFAULT_FONT, DEFAULT_POINT_SIZE, FontBook, FontDescriptor};
pub use layout::{Align, Line, justify, line_offset, wrap_lines};
pub use render::{measure, render_with_font};

/// Resolution text is rendered at unless a request says otherwise.
pub const DEFAULT_DPI: i32 = 72;

/// Anything that can rasterize a text block.
pub trait TextRasterizer {
    fn rasterize(&self, request: &TextRequest) -> Result<DynamicImage>;
}

/// Everything needed to rasterize one block of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub text: String,
    pub font: FontDescriptor,
    /// Maximum width in pixels; lines wrap to fit.
    pub width: i32,
    /// Maximum height in pixels. When set, the font is shrunk until the
    /// wrapped text fits `width` x `height`.
    pub height: Option<i32>,
    pub align: Align,
    pub dpi: i32,
    /// Extra pixels between consecutive lines.
    pub spacing: i32,
    /// Stretch wrapped lines to the full block width.
    pub justify: bool,
    /// Produce an RGBA mask instead of a single band.
    pub rgba: bool,
}

impl TextRequest {
    pub fn new(text: impl Into<String>, font: FontDescriptor, width: i32) -> Self {
        Self {
            text: text.into(),
            font,
            width,
            height: None,
            align: Align::Left,
            dpi: DEFAULT_DPI,
            spacing: 0,
            justify: false,
            rgba: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(CompositeError::rasterization("no text to render"));
        }
        if self.width <= 0 {
            return Err(CompositeError::rasterization(format!(
                "text width must be positive, got {}",
                self.width
            )));
        }
        if let Some(height) = self.height
            && height <= 0
        {
            return Err(CompositeError::rasterization(format!(
                "text height must be positive, got {height}"
            )));
        }
        if self.dpi <= 0 {
            return Err(CompositeError::rasterization(format!(
                "dpi must be positive, got {}",
                self.dpi
            )));
        }
        if self.spacing < 0 {
            return Err(CompositeError::rasterization(format!(
                "line spacing cannot be negative, got {}",
                self.spacing
            )));
        }
        Ok(())
    }
}

/// Render `text` into a single-band mask no larger than `width` x `height`.
///
/// `font` is a descriptor such as `"sans 10"`. Both dimensions must be
/// positive; the font size is reduced until the text fits the box.
pub fn render_text<R: TextRasterizer + ?Sized>(
    rasterizer: &R,
    text: &str,
    font: &str,
    width: i32,
    height: i32,
    align: Align,
    dpi: i32,
) -> Result<DynamicImage> {
    let request = TextRequest {
        height: Some(height),
        align,
        dpi,
        ..TextRequest::new(text, font.parse()?, width)
    };
    request.validate()?;
    rasterizer.rasterize(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_boxes() {
        let base = TextRequest::new("hi", FontDescriptor::default(), 100);
        assert!(base.validate().is_ok());

        let cases = [
            TextRequest { width: 0, ..base.clone() },
            TextRequest { width: -5, ..base.clone() },
            TextRequest { height: Some(0), ..base.clone() },
            TextRequest { dpi: 0, ..base.clone() },
            TextRequest { spacing: -1, ..base.clone() },
            TextRequest { text: String::new(), ..base.clone() },
        ];
        for request in cases {
            assert!(
                matches!(request.validate(), Err(CompositeError::Rasterization(_))),
                "{request:?} should be rejected"
            );
        }
    }

    struct Unreachable;

    impl TextRasterizer for Unreachable {
        fn rasterize(&self, _request: &TextRequest) -> Result<DynamicImage> {
            panic!("validation should fail first");
        }
    }

    #[test]
    fn test_render_text_validates_before_rasterizing() {
        let err = render_text(&Unreachable, "hi", "sans 10", 100, -1, Align::Left, 72).unwrap_err();
        assert!(matches!(err, CompositeError::Rasterization(_)));

        let err = render_text(&Unreachable, "hi", "", 100, 10, Align::Left, 72).unwrap_err();
        assert!(matches!(err, CompositeError::Rasterization(_)));
    }
}
