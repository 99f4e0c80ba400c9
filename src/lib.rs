use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod error;
pub mod fill;
pub mod image_ops;
pub mod label;
pub mod process;
pub mod text;
pub mod watermark;

pub use error::{CompositeError, Result, Stage};
pub use fill::color_fill;
pub use image_ops::Interpretation;
pub use label::{LabelOptions, LabelParams, Scalar, label, label_params};
pub use text::{Align, FontBook, FontDescriptor, TextRasterizer, TextRequest, render_text};
pub use watermark::{WatermarkOptions, watermark};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub fonts: FontsConfig,
    pub label: LabelConfig,
    pub watermark: WatermarkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Directories searched recursively for font files.
    pub directories: Vec<PathBuf>,
    /// Extra family names, e.g. `sans = "DejaVuSans"`.
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelConfig {
    pub font: String,
    pub opacity: f32,
    pub color: [f64; 3],
}

/// Defaults for watermarks that the command line or a process string does
/// not set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub family: String,
    pub size: i32,
    pub width: i32,
    pub dpi: i32,
    pub margin: i32,
    pub opacity: f32,
    pub rotate: f64,
    pub background: [f64; 3],
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml_edit::de::Error),
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            directories: vec![PathBuf::from("static"), PathBuf::from("/usr/share/fonts")],
            aliases: BTreeMap::from([
                ("sans".to_string(), "DejaVuSans".to_string()),
                ("serif".to_string(), "DejaVuSerif".to_string()),
                ("monospace".to_string(), "DejaVuSansMono".to_string()),
            ]),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font: text::DEFAULT_FONT.to_string(),
            opacity: 1.0,
            color: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        let options = WatermarkOptions::default();
        Self {
            family: "sans".to_string(),
            size: 40,
            width: options.width,
            dpi: options.dpi,
            margin: options.margin,
            opacity: options.opacity,
            rotate: options.rotate,
            background: options.background,
        }
    }
}

impl WatermarkConfig {
    /// Watermark options for `text` with every other field from this config.
    pub fn options(&self, text: impl Into<String>) -> WatermarkOptions {
        WatermarkOptions {
            text: text.into(),
            font: format!("{} {}", self.family, self.size),
            width: self.width,
            dpi: self.dpi,
            rotate: self.rotate,
            opacity: self.opacity,
            margin: self.margin,
            no_replicate: false,
            background: self.background,
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml_edit::de::from_str::<Config>(&content)?;
        info!("Configuration loaded from: {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fonts.aliases["sans"], "DejaVuSans");
        assert_eq!(config.label.font, "sans 10");
        assert_eq!(config.watermark.size, 40);
        assert_eq!(config.watermark.options("x"), WatermarkOptions {
            text: "x".to_string(),
            ..WatermarkOptions::default()
        });
    }

    #[test]
    fn test_load_partial_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[fonts]
directories = ["fonts"]

[watermark]
family = "serif"
size = 24
opacity = 0.5
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fonts.directories, vec![PathBuf::from("fonts")]);
        assert!(config.fonts.aliases.contains_key("sans"));
        assert_eq!(config.watermark.family, "serif");
        assert_eq!(config.watermark.margin, 20);
        assert_eq!(config.watermark.options("hi").font, "serif 24");
        assert_eq!(config.label.opacity, 1.0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/labelmark.toml")).unwrap();
        assert_eq!(config.watermark.width, 100);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[watermark]\nsize = \"big\"").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
