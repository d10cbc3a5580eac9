//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are shared by
//! the engines ([`filters`](super::filters), [`geometry`](super::geometry),
//! [`merge`](super::merge)), the [`backend`](super::backend) encoders and the
//! config layer, so most of them round-trip through serde and `FromStr`.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality in `[0, 1]`, default 0.92. Clamped on construction.
//! - [`Intensity`] — Filter strength in `[0, 1]`, default 0.5 (neutral for brightness/contrast).
//! - [`Rgba`] — A straight-alpha color, written as `#rrggbb` or `#rrggbbaa` in config.
//! - [`FilterKind`], [`Anchor`], [`Layout`], [`OutputFormat`] — closed operation selectors.
//! - [`CropRect`] — A crop selection in source pixels.
//! - [`PageSize`], [`Orientation`] — PDF page selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (0.0-1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "f32", from = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const MAX: Quality = Quality(1.0);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality as an encoder percentage (1-100).
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.92)
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Filter strength (0.0-1.0).
///
/// Only blur, brightness and contrast read it. 0.5 maps to a factor of 1.0
/// for brightness and contrast, i.e. no change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intensity(f32);

impl Intensity {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(0.5)
    }
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut out = [0u8, 0, 0, 255];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    out[i] = v * 17;
                }
                Some(Self(out))
            }
            6 => Some(Self([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            ])),
            8 => Some(Self([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            ])),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value).ok_or_else(|| format!("invalid color '{value}', expected #rrggbb"))
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_hex()
    }
}

impl FromStr for Rgba {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

/// Per-pixel and neighborhood filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Grayscale,
    Sepia,
    Invert,
    Brightness,
    Contrast,
    Blur,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Invert,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Blur,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Blur => "blur",
        }
    }

    /// Whether the filter reads [`Intensity`].
    pub fn uses_intensity(self) -> bool {
        matches!(
            self,
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Blur
        )
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown filter '{value}'. Expected grayscale, sepia, invert, brightness, contrast, or blur"
                )
            })
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an overlay is placed on its base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top-left" => Ok(Anchor::TopLeft),
            "top-right" => Ok(Anchor::TopRight),
            "bottom-left" => Ok(Anchor::BottomLeft),
            "bottom-right" => Ok(Anchor::BottomRight),
            "center" => Ok(Anchor::Center),
            other => Err(format!(
                "unknown position '{other}'. Expected top-left, top-right, bottom-left, bottom-right, or center"
            )),
        }
    }
}

/// Merge layout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Grid,
    Horizontal,
    Vertical,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Layout::Grid),
            "horizontal" => Ok(Layout::Horizontal),
            "vertical" => Ok(Layout::Vertical),
            other => Err(format!(
                "unknown layout '{other}'. Expected grid, horizontal, or vertical"
            )),
        }
    }
}

/// Export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Bmp,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Pdf => "application/pdf",
        }
    }

    /// Pick the output format matching a source MIME type.
    ///
    /// Formats we can read but not write (GIF, unknown) fall back to PNG so
    /// transparency survives.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "image/jpeg" | "image/jpg" => OutputFormat::Jpeg,
            "image/webp" => OutputFormat::Webp,
            "image/bmp" => OutputFormat::Bmp,
            "application/pdf" => OutputFormat::Pdf,
            _ => OutputFormat::Png,
        }
    }

    /// Whether [`Quality`] affects the encoded output.
    pub fn is_lossy(self) -> bool {
        matches!(
            self,
            OutputFormat::Jpeg | OutputFormat::Webp | OutputFormat::Pdf
        )
    }

    pub fn is_raster(self) -> bool {
        !matches!(self, OutputFormat::Pdf)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "bmp" => Ok(OutputFormat::Bmp),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(format!(
                "unsupported format '{other}'. Expected jpeg, png, webp, bmp, or pdf"
            )),
        }
    }
}

/// A crop selection in source-pixel coordinates.
///
/// The origin may be negative or the rectangle may overhang the image; the
/// geometry engine clips it to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink the selection around its center to the given width/height ratio.
    ///
    /// `None` means a free ratio and leaves the selection as is.
    pub fn constrain_aspect(self, ratio: Option<f64>) -> Self {
        let Some(ratio) = ratio.filter(|r| r.is_finite() && *r > 0.0) else {
            return self;
        };
        let current = self.width as f64 / self.height.max(1) as f64;
        let (w, h) = if current > ratio {
            ((self.height as f64 * ratio).round() as u32, self.height)
        } else {
            (self.width, (self.width as f64 / ratio).round() as u32)
        };
        Self {
            x: self.x + (self.width as i64 - w as i64) / 2,
            y: self.y + (self.height as i64 - h as i64) / 2,
            width: w,
            height: h,
        }
    }
}

/// PDF page size. `Fit` sizes the page to the image at 96 DPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
    Fit,
}

impl PageSize {
    /// Portrait page dimensions in points, `None` for [`PageSize::Fit`].
    pub fn points(self) -> Option<(f32, f32)> {
        match self {
            PageSize::A4 => Some((595.28, 841.89)),
            PageSize::Letter => Some((612.0, 792.0)),
            PageSize::Legal => Some((612.0, 1008.0)),
            PageSize::Fit => None,
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            "fit" => Ok(PageSize::Fit),
            other => Err(format!(
                "unknown page size '{other}'. Expected a4, letter, legal, or fit"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!(
                "unknown orientation '{other}'. Expected portrait or landscape"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-0.5).value(), 0.0);
        assert_eq!(Quality::new(0.8).value(), 0.8);
        assert_eq!(Quality::new(3.0).value(), 1.0);
        assert_eq!(Quality::new(f32::NAN), Quality::default());
    }

    #[test]
    fn quality_percent_never_zero() {
        assert_eq!(Quality::new(0.0).percent(), 1);
        assert_eq!(Quality::new(0.8).percent(), 80);
        assert_eq!(Quality::MAX.percent(), 100);
    }

    #[test]
    fn quality_default_is_092() {
        assert_eq!(Quality::default().value(), 0.92);
    }

    #[test]
    fn intensity_clamps() {
        assert_eq!(Intensity::new(1.5).value(), 1.0);
        assert_eq!(Intensity::new(-1.0).value(), 0.0);
        assert_eq!(Intensity::default().value(), 0.5);
    }

    #[test]
    fn rgba_parses_hex_forms() {
        assert_eq!(Rgba::parse_hex("#ffffff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::parse_hex("000"), Some(Rgba::BLACK));
        assert_eq!(
            Rgba::parse_hex("#11223380"),
            Some(Rgba([0x11, 0x22, 0x33, 0x80]))
        );
        assert_eq!(Rgba::parse_hex("#12"), None);
        assert_eq!(Rgba::parse_hex("#gggggg"), None);
    }

    #[test]
    fn rgba_hex_roundtrip_drops_opaque_alpha() {
        assert_eq!(Rgba::WHITE.to_hex(), "#ffffff");
        assert_eq!(Rgba([1, 2, 3, 4]).to_hex(), "#01020304");
    }

    #[test]
    fn filter_kind_parses_names() {
        assert_eq!("Sepia".parse::<FilterKind>(), Ok(FilterKind::Sepia));
        assert_eq!(" blur ".parse::<FilterKind>(), Ok(FilterKind::Blur));
        assert!("emboss".parse::<FilterKind>().is_err());
    }

    #[test]
    fn only_blur_brightness_contrast_use_intensity() {
        let users: Vec<_> = FilterKind::ALL
            .into_iter()
            .filter(|k| k.uses_intensity())
            .collect();
        assert_eq!(
            users,
            vec![
                FilterKind::Brightness,
                FilterKind::Contrast,
                FilterKind::Blur
            ]
        );
    }

    #[test]
    fn output_format_from_mime_falls_back_to_png() {
        assert_eq!(OutputFormat::from_mime("image/jpeg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_mime("image/gif"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_mime("text/plain"), OutputFormat::Png);
    }

    #[test]
    fn output_format_parse_accepts_jpg_alias() {
        assert_eq!("JPG".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert!("tiff".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn crop_constrain_aspect_square_on_landscape() {
        let rect = CropRect::new(0, 0, 400, 200).constrain_aspect(Some(1.0));
        assert_eq!(rect, CropRect::new(100, 0, 200, 200));
    }

    #[test]
    fn crop_constrain_aspect_free_is_noop() {
        let rect = CropRect::new(5, 5, 40, 20);
        assert_eq!(rect.constrain_aspect(None), rect);
    }

    #[test]
    fn page_size_points() {
        assert_eq!(PageSize::Letter.points(), Some((612.0, 792.0)));
        assert_eq!(PageSize::Fit.points(), None);
    }
}
