//! Editor configuration.
//!
//! Settings come from an optional `config.toml` in the config directory
//! (the working directory unless `--config-dir` says otherwise), layered on
//! top of stock defaults. Command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [export]
//! format = "jpeg"           # jpeg, png, webp, bmp, pdf
//! quality = 0.92            # 0.0-1.0, lossy formats only
//!
//! [history]
//! capacity = 10             # Undo steps kept per session
//!
//! [thumbnail]
//! width = 150
//! height = 150
//! fill = "#ffffff"          # Letterbox color
//!
//! [merge]
//! layout = "grid"           # grid, horizontal, vertical
//! cell_width = 300          # Grid cell width in pixels
//! background = "#ffffff"
//!
//! [watermark]
//! anchor = "bottom-right"   # top-left, top-right, bottom-left, bottom-right, center
//! opacity = 0.5
//! padding = 20
//! text_scale = 3
//! color = "#ffffff"
//!
//! [pdf]
//! size = "a4"               # a4, letter, legal, fit
//! orientation = "portrait"
//! margin = 20.0             # Points
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [recent]
//! capacity = 5
//! path = ".image-desk/recent.json"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [export]
//! format = "webp"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::text::MAX_TEXT_SCALE;
use crate::imaging::{Anchor, Layout, MergeOptions, OutputFormat, PdfPage, Quality, Rgba};
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub export: ExportConfig,
    pub history: HistoryConfig,
    pub thumbnail: ThumbnailConfig,
    pub merge: MergeConfig,
    pub watermark: WatermarkConfig,
    pub pdf: PdfPage,
    pub processing: ProcessingConfig,
    pub recent: RecentConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail =
            |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Validation(msg.into())) };
        if self.history.capacity == 0 {
            return fail("history.capacity must be at least 1");
        }
        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return fail("thumbnail.width and thumbnail.height must be non-zero");
        }
        if self.merge.cell_width == 0 {
            return fail("merge.cell_width must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return fail("watermark.opacity must be 0.0-1.0");
        }
        if !(1..=MAX_TEXT_SCALE).contains(&self.watermark.text_scale) {
            return fail(&format!("watermark.text_scale must be 1-{MAX_TEXT_SCALE}"));
        }
        if !self.pdf.margin.is_finite() || self.pdf.margin < 0.0 {
            return fail("pdf.margin must be a non-negative number");
        }
        if self.recent.capacity == 0 {
            return fail("recent.capacity must be at least 1");
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            history_capacity: self.history.capacity,
            default_quality: self.export.quality,
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            cell_width: self.merge.cell_width,
            background: self.merge.background,
        }
    }
}

/// Default export settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: OutputFormat,
    /// Quality for lossy formats, and for operations that keep the source format.
    pub quality: Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: crate::history::DEFAULT_CAPACITY,
        }
    }
}

/// Thumbnail box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub height: u32,
    pub fill: Rgba,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 150,
            height: 150,
            fill: Rgba::WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub layout: Layout,
    pub cell_width: u32,
    pub background: Rgba,
}

impl Default for MergeConfig {
    fn default() -> Self {
        let options = MergeOptions::default();
        Self {
            layout: Layout::Grid,
            cell_width: options.cell_width,
            background: options.background,
        }
    }
}

/// Watermark defaults used when the command line leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub anchor: Anchor,
    pub opacity: f32,
    pub padding: u32,
    /// Pixel size multiplier for the 8x8 text font.
    pub text_scale: u32,
    pub color: Rgba,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            anchor: Anchor::BottomRight,
            opacity: 0.5,
            padding: 20,
            text_scale: 3,
            color: Rgba::WHITE,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Recent-files list settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecentConfig {
    pub capacity: usize,
    /// Store location, relative to the config directory.
    pub path: String,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            capacity: crate::recent::DEFAULT_CAPACITY,
            path: ".image-desk/recent.json".to_string(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EditorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// `Ok(None)` when the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in `dir`, on top of stock defaults.
pub fn load_config(dir: &Path) -> Result<EditorConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Fully-commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# image-desk configuration
# ========================
#
# Place this file as config.toml in the working directory (or pass
# --config-dir). Every key is optional; remove what you don't change.
# Unknown keys are rejected.

# ---------------------------------------------------------------------------
# Export defaults
# ---------------------------------------------------------------------------
[export]
# Output format when --format is not given: jpeg, png, webp, bmp, pdf.
format = "jpeg"
# Encoder quality for lossy formats (0.0-1.0). Also used when an operation
# re-encodes in the source format.
quality = 0.92

# ---------------------------------------------------------------------------
# Undo history
# ---------------------------------------------------------------------------
[history]
# Number of states kept. The oldest is dropped when full.
capacity = 10

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnail]
# Output box. The image is fitted inside and centered.
width = 150
height = 150
# Color of the bands around the fitted image (#rrggbb or #rrggbbaa).
fill = "#ffffff"

# ---------------------------------------------------------------------------
# Merge
# ---------------------------------------------------------------------------
[merge]
# grid, horizontal or vertical.
layout = "grid"
# Grid cell width in pixels. Cell height follows the narrowest (most portrait) input.
cell_width = 300
background = "#ffffff"

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
# top-left, top-right, bottom-left, bottom-right or center.
anchor = "bottom-right"
# 0.0 leaves the image untouched, 1.0 is fully opaque.
opacity = 0.5
# Distance from the edges in pixels. Not used for center.
padding = 20
# Text watermark glyph size: 8px times this value, 1-64.
text_scale = 3
color = "#ffffff"

# ---------------------------------------------------------------------------
# PDF export
# ---------------------------------------------------------------------------
[pdf]
# a4, letter, legal, or fit (page sized to the image at 96 DPI).
size = "a4"
# portrait or landscape.
orientation = "portrait"
# Page margin in points.
margin = 20.0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch and merge.
# Omit to use all CPU cores. Larger values are clamped to the core count.
# max_processes = 4

# ---------------------------------------------------------------------------
# Recent files
# ---------------------------------------------------------------------------
[recent]
capacity = 5
# Relative to the config directory.
path = ".image-desk/recent.json"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Orientation, PageSize};
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EditorConfig::default();
        assert_eq!(config.export.format, OutputFormat::Jpeg);
        assert_eq!(config.export.quality, Quality::default());
        assert_eq!(config.history.capacity, 10);
        assert_eq!((config.thumbnail.width, config.thumbnail.height), (150, 150));
        assert_eq!(config.merge.cell_width, 300);
        assert_eq!(config.watermark.anchor, Anchor::BottomRight);
        assert_eq!(config.watermark.padding, 20);
        assert_eq!(config.pdf, PdfPage::default());
        assert_eq!(config.recent.capacity, 5);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[export]
format = "webp"

[merge]
background = "#000000"
"##;
        let config: EditorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.export.format, OutputFormat::Webp);
        assert_eq!(config.merge.background, Rgba::BLACK);
        // untouched values keep their defaults
        assert_eq!(config.export.quality, Quality::default());
        assert_eq!(config.merge.cell_width, 300);
        assert_eq!(config.history.capacity, 10);
    }

    #[test]
    fn session_settings_follow_config() {
        let mut config = EditorConfig::default();
        config.history.capacity = 3;
        config.export.quality = Quality::new(0.5);
        let settings = config.session_settings();
        assert_eq!(settings.history_capacity, 3);
        assert_eq!(settings.default_quality, Quality::new(0.5));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[pdf]
size = "letter"
orientation = "landscape"

[watermark]
anchor = "top-left"
opacity = 0.25
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.pdf.size, PageSize::Letter);
        assert_eq!(config.pdf.orientation, Orientation::Landscape);
        assert_eq!(config.pdf.margin, 20.0);
        assert_eq!(config.watermark.anchor, Anchor::TopLeft);
        assert_eq!(config.watermark.opacity, 0.25);
        assert_eq!(config.watermark.padding, 20);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[export]\nformatt = \"png\"\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str("[colors]\nlight = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn bad_enum_value_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str("[merge]\nlayout = \"diagonal\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn bad_color_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str("[thumbnail]\nfill = \"white\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let config: EditorConfig = toml::from_str("[export]\nquality = 3.0\n").unwrap();
        assert_eq!(config.export.quality, Quality::MAX);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        let mut config = EditorConfig::default();
        config.merge.cell_width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = EditorConfig::default();
        config.thumbnail.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = EditorConfig::default();
        config.history.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_opacity_out_of_range() {
        let mut config = EditorConfig::default();
        config.watermark.opacity = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bounds_text_scale() {
        let mut config = EditorConfig::default();
        config.watermark.text_scale = MAX_TEXT_SCALE;
        assert!(config.validate().is_ok());

        config.watermark.text_scale = MAX_TEXT_SCALE + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.watermark.text_scale = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[pdf]\nmargin = -5.0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Layering
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(1));
        assert_eq!(merged.get("b").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[t]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 9\nz = 3").unwrap();
        let merged = merge_toml(base, overlay);
        let t = merged.get("t").unwrap();
        assert_eq!(t.get("x").unwrap().as_integer(), Some(1));
        assert_eq!(t.get("y").unwrap().as_integer(), Some(9));
        assert_eq!(t.get("z").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str("[history]\ncapacity = 4").unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.history.capacity, 4);
        assert_eq!(config.thumbnail.width, 150);
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[recent]\ncapacity = 0").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EditorConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[export]",
            "[history]",
            "[thumbnail]",
            "[merge]",
            "[watermark]",
            "[pdf]",
            "[processing]",
            "[recent]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        for key in ["export", "history", "thumbnail", "merge", "watermark", "pdf", "recent"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }
}
