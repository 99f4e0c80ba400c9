use ab_glyph::FontVec;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::FontsConfig;
use crate::error::{CompositeError, Result};

/// Descriptor used when none is given, matching the usual "sans 10".
pub const DEFAULT_FONT: &str = "sans 10";

/// Size in points when a descriptor names only a family.
pub const DEFAULT_POINT_SIZE: f32 = 10.0;

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

/// A font family plus a size in points, written as `"<family> <size>"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    pub size: f32,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
        }
    }

    /// Pixel size of this font when rendered at `dpi`.
    pub fn pixel_size(&self, dpi: i32) -> f32 {
        self.size * dpi as f32 / 72.0
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new("sans", DEFAULT_POINT_SIZE)
    }
}

impl FromStr for FontDescriptor {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let (family, size) = match words.split_last() {
            None => return Err(CompositeError::rasterization("empty font descriptor")),
            Some((last, rest)) => match last.parse::<f32>() {
                Ok(_) if rest.is_empty() => {
                    return Err(CompositeError::rasterization(format!(
                        "font descriptor {s:?} has a size but no family"
                    )));
                }
                Ok(size) => (rest.join(" "), size),
                Err(_) => (words.join(" "), DEFAULT_POINT_SIZE),
            },
        };
        if !size.is_finite() || size <= 0.0 {
            return Err(CompositeError::rasterization(format!(
                "font size must be positive in {s:?}"
            )));
        }
        Ok(Self { family, size })
    }
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.size)
    }
}

/// Lookup key shared by family names, aliases and font file stems:
/// lowercase with spaces, dashes and underscores removed.
fn family_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Font files discovered on disk, keyed by family, with a cache of the fonts
/// already parsed.
///
/// A family is the file stem, so `DejaVuSans-Bold.ttf` answers to
/// `"DejaVu Sans Bold"`, `"dejavusans-bold"` and so on.
#[derive(Default)]
pub struct FontBook {
    files: HashMap<String, PathBuf>,
    aliases: HashMap<String, String>,
    loaded: Mutex<HashMap<PathBuf, Arc<FontVec>>>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every configured directory and register the configured aliases.
    pub fn from_config(config: &FontsConfig) -> Self {
        let mut book = Self::new();
        for dir in &config.directories {
            let found = book.scan_directory(dir);
            debug!("Found {} font files in {:?}", found, dir);
        }
        for (alias, family) in &config.aliases {
            book.add_alias(alias, family);
        }
        book
    }

    /// Register every font file below `dir`. Returns how many were found.
    pub fn scan_directory(&mut self, dir: &Path) -> usize {
        if !dir.exists() {
            warn!("Font directory does not exist: {:?}", dir);
            return 0;
        }
        let mut found = 0;
        for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
            if entry.file_type().is_file() && self.add_font_file(entry.path()) {
                found += 1;
            }
        }
        found
    }

    /// Register a single font file under its stem. Returns false for files
    /// that are not TrueType/OpenType.
    pub fn add_font_file(&mut self, path: &Path) -> bool {
        let is_font = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|f| ext.eq_ignore_ascii_case(f)));
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        if !is_font {
            return false;
        }
        self.files
            .entry(family_key(stem))
            .or_insert_with(|| path.to_path_buf());
        true
    }

    pub fn add_alias(&mut self, alias: &str, family: &str) {
        self.aliases.insert(family_key(alias), family.to_string());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of the font file serving `family`, following one alias hop.
    pub fn resolve(&self, family: &str) -> Option<&Path> {
        let key = family_key(family);
        self.files
            .get(&key)
            .or_else(|| {
                self.aliases
                    .get(&key)
                    .and_then(|target| self.files.get(&family_key(target)))
            })
            .map(PathBuf::as_path)
    }

    /// Parse (or fetch from cache) the font for `family`.
    pub fn load(&self, family: &str) -> Result<Arc<FontVec>> {
        let path = self
            .resolve(family)
            .ok_or_else(|| CompositeError::rasterization(format!("unknown font family {family:?}")))?;

        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(font) = loaded.get(path) {
            return Ok(Arc::clone(font));
        }

        let data = std::fs::read(path).map_err(|e| {
            CompositeError::rasterization(format!("failed to read font {path:?}: {e}"))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|_| {
            CompositeError::rasterization(format!("failed to parse font {path:?}"))
        })?;
        debug!("Loaded font {:?} for family {:?}", path, family);

        let font = Arc::new(font);
        loaded.insert(path.to_path_buf(), Arc::clone(&font));
        Ok(font)
    }
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("files", &self.files)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}
