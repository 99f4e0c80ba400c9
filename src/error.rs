use std::fmt;
use thiserror::Error;

/// Failure of a compositing primitive or pipeline.
///
/// The three kinds are all unrecoverable at this layer. The string carries
/// the diagnostic from whichever primitive failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    #[error("text rasterization failed: {0}")]
    Rasterization(String),

    #[error("incompatible image geometry: {0}")]
    Geometry(String),

    #[error("image allocation failed: {0}")]
    Allocation(String),
}

impl CompositeError {
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// The underlying diagnostic, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Rasterization(msg) | Self::Geometry(msg) | Self::Allocation(msg) => msg,
        }
    }

    /// Prefix the diagnostic with the pipeline stage that produced it.
    pub fn during(self, stage: Stage) -> Self {
        match self {
            Self::Rasterization(msg) => Self::Rasterization(format!("{stage}: {msg}")),
            Self::Geometry(msg) => Self::Geometry(format!("{stage}: {msg}")),
            Self::Allocation(msg) => Self::Allocation(format!("{stage}: {msg}")),
        }
    }
}

/// Pipeline stages, in the order the label and watermark pipelines run them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RenderText,
    Rotate,
    ScaleOpacity,
    Embed,
    Replicate,
    ColorFill,
    Blend,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::RenderText => "render-text",
            Stage::Rotate => "rotate",
            Stage::ScaleOpacity => "scale-opacity",
            Stage::Embed => "embed",
            Stage::Replicate => "replicate",
            Stage::ColorFill => "color-fill",
            Stage::Blend => "blend",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;
