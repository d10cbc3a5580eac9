//! Command-line step syntax.
//!
//! `edit` and `batch` take their work as `--step NAME[=ARGS]` values:
//!
//! ```text
//! resize=800x600      exact size
//! resize=800          width 800, height from aspect ratio
//! resize=x600         height 600, width from aspect ratio
//! thumbnail           box from config
//! thumbnail=200x200
//! crop=10,10,400,300  x,y,width,height (x and y may be negative)
//! crop=0,0,400,400@16:9
//! filter=sepia
//! filter=blur:0.3     kind:intensity
//! text=© 2024         text watermark with config defaults
//! logo=mark.png       image watermark with config defaults
//! compress=0.8
//! convert=webp        quality from --quality or config
//! strip
//! undo / redo / reset (edit only)
//! ```
//!
//! Parsing is syntax only. [`StepSpec::resolve`] fills in config defaults
//! and loads watermark images.

use crate::config::EditorConfig;
use crate::imaging::{
    CropRect, FilterKind, ImageBackend, ImagingError, Intensity, Operation, OutputFormat, Quality,
    Watermark, WatermarkSource,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// A parsed `--step` value.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSpec {
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    Thumbnail(Option<(u32, u32)>),
    Crop {
        rect: CropRect,
        aspect: Option<f64>,
    },
    Filter(FilterKind, Option<f32>),
    Text(String),
    Logo(PathBuf),
    Compress(f32),
    Convert(OutputFormat),
    Strip,
    Undo,
    Redo,
    Reset,
}

/// A step ready to run against a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Apply(Operation),
    Undo,
    Redo,
    Reset,
}

impl Step {
    /// The operation, for runners that only understand operations.
    pub fn into_operation(self) -> Option<Operation> {
        match self {
            Step::Apply(op) => Some(op),
            _ => None,
        }
    }
}

fn parse_size(value: &str) -> Result<(Option<u32>, Option<u32>), String> {
    let number = |s: &str| -> Result<Option<u32>, String> {
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<u32>()
            .map(Some)
            .map_err(|_| format!("invalid size '{s}'"))
    };
    match value.split_once(['x', 'X']) {
        Some((w, h)) => Ok((number(w)?, number(h)?)),
        None => Ok((number(value)?, None)),
    }
}

fn parse_aspect(value: &str) -> Result<f64, String> {
    let ratio = match value.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.parse().map_err(|_| format!("invalid ratio '{value}'"))?;
            let h: f64 = h.parse().map_err(|_| format!("invalid ratio '{value}'"))?;
            w / h
        }
        None => value
            .parse()
            .map_err(|_| format!("invalid ratio '{value}'"))?,
    };
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(format!("invalid ratio '{value}'"))
    }
}

fn parse_crop(value: &str) -> Result<StepSpec, String> {
    let (rect, aspect) = match value.split_once('@') {
        Some((rect, aspect)) => (rect, Some(parse_aspect(aspect)?)),
        None => (value, None),
    };
    let parts: Vec<&str> = rect.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts[..] else {
        return Err(format!("crop expects x,y,width,height, got '{rect}'"));
    };
    let bad = |s: &str| format!("invalid crop value '{s}'");
    Ok(StepSpec::Crop {
        rect: CropRect::new(
            x.parse().map_err(|_| bad(x))?,
            y.parse().map_err(|_| bad(y))?,
            w.parse().map_err(|_| bad(w))?,
            h.parse().map_err(|_| bad(h))?,
        ),
        aspect,
    })
}

fn parse_unit(value: &str, what: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or_else(|| format!("{what} must be 0.0-1.0, got '{value}'"))
}

impl FromStr for StepSpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match value.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg)),
            None => (value.trim(), None),
        };
        let required = || {
            arg.filter(|a| !a.is_empty())
                .ok_or_else(|| format!("step '{name}' needs a value: {name}=..."))
        };

        match name.to_ascii_lowercase().as_str() {
            "resize" => {
                let (width, height) = parse_size(required()?)?;
                if width.is_none() && height.is_none() {
                    return Err("resize needs a width, a height, or both".into());
                }
                Ok(StepSpec::Resize { width, height })
            }
            "thumbnail" => match arg {
                None => Ok(StepSpec::Thumbnail(None)),
                Some(size) => match parse_size(size)? {
                    (Some(w), Some(h)) => Ok(StepSpec::Thumbnail(Some((w, h)))),
                    _ => Err("thumbnail size must be WIDTHxHEIGHT".into()),
                },
            },
            "crop" => parse_crop(required()?),
            "filter" => {
                let arg = required()?;
                let (kind, intensity) = match arg.split_once(':') {
                    Some((kind, i)) => (kind, Some(parse_unit(i, "intensity")?)),
                    None => (arg, None),
                };
                Ok(StepSpec::Filter(kind.parse()?, intensity))
            }
            "text" => Ok(StepSpec::Text(required()?.to_string())),
            "logo" => Ok(StepSpec::Logo(PathBuf::from(required()?))),
            "compress" => Ok(StepSpec::Compress(parse_unit(required()?, "quality")?)),
            "convert" => Ok(StepSpec::Convert(required()?.parse()?)),
            "strip" => Ok(StepSpec::Strip),
            "undo" => Ok(StepSpec::Undo),
            "redo" => Ok(StepSpec::Redo),
            "reset" => Ok(StepSpec::Reset),
            other => Err(format!(
                "unknown step '{other}'. Expected resize, thumbnail, crop, filter, text, logo, compress, convert, strip, undo, redo, or reset"
            )),
        }
    }
}

impl StepSpec {
    /// Fill in defaults from `config` and load watermark images.
    ///
    /// `quality` overrides the configured export quality for `convert`.
    pub fn resolve(
        &self,
        config: &EditorConfig,
        quality: Option<Quality>,
        backend: &impl ImageBackend,
    ) -> Result<Step, ImagingError> {
        let watermark = |source: WatermarkSource| {
            Operation::Watermark(Watermark {
                source,
                anchor: config.watermark.anchor,
                opacity: config.watermark.opacity,
                padding: config.watermark.padding,
            })
        };

        let op = match self {
            StepSpec::Resize { width, height } => Operation::Resize {
                width: *width,
                height: *height,
                keep_aspect: width.is_none() || height.is_none(),
            },
            StepSpec::Thumbnail(size) => {
                let (width, height) =
                    size.unwrap_or((config.thumbnail.width, config.thumbnail.height));
                Operation::Thumbnail {
                    width,
                    height,
                    fill: config.thumbnail.fill,
                }
            }
            StepSpec::Crop { rect, aspect } => Operation::Crop(rect.constrain_aspect(*aspect)),
            StepSpec::Filter(kind, intensity) => Operation::Filter {
                kind: *kind,
                intensity: intensity.map(Intensity::new).unwrap_or_default(),
            },
            StepSpec::Text(text) => watermark(WatermarkSource::Text {
                text: text.clone(),
                scale: config.watermark.text_scale,
                color: config.watermark.color,
            }),
            StepSpec::Logo(path) => {
                let bytes = std::fs::read(path)?;
                let decoded = backend.decode(&path.display().to_string(), &bytes)?;
                watermark(WatermarkSource::Image(Arc::new(decoded.buffer)))
            }
            StepSpec::Compress(q) => Operation::Compress {
                quality: Quality::new(*q),
            },
            StepSpec::Convert(format) => Operation::Convert {
                format: *format,
                quality: quality.unwrap_or(config.export.quality),
            },
            StepSpec::Strip => Operation::StripMetadata,
            StepSpec::Undo => return Ok(Step::Undo),
            StepSpec::Redo => return Ok(Step::Redo),
            StepSpec::Reset => return Ok(Step::Reset),
        };
        Ok(Step::Apply(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Anchor;
    use crate::imaging::backend::tests::{MockBackend, mock_bytes};
    use crate::test_helpers::gradient_buffer;

    fn parse(value: &str) -> StepSpec {
        value.parse().unwrap()
    }

    fn resolve(value: &str) -> Step {
        parse(value)
            .resolve(&EditorConfig::default(), None, &MockBackend::new())
            .unwrap()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn parse_resize_forms() {
        assert_eq!(
            parse("resize=800x600"),
            StepSpec::Resize {
                width: Some(800),
                height: Some(600)
            }
        );
        assert_eq!(
            parse("resize=800"),
            StepSpec::Resize {
                width: Some(800),
                height: None
            }
        );
        assert_eq!(
            parse("resize=x600"),
            StepSpec::Resize {
                width: None,
                height: Some(600)
            }
        );
    }

    #[test]
    fn parse_crop_with_negative_origin_and_ratio() {
        assert_eq!(
            parse("crop=-10,5,400,300@16:9"),
            StepSpec::Crop {
                rect: CropRect::new(-10, 5, 400, 300),
                aspect: Some(16.0 / 9.0),
            }
        );
    }

    #[test]
    fn parse_filter_with_intensity() {
        assert_eq!(
            parse("filter=blur:0.3"),
            StepSpec::Filter(FilterKind::Blur, Some(0.3))
        );
        assert_eq!(
            parse("FILTER=Sepia"),
            StepSpec::Filter(FilterKind::Sepia, None)
        );
    }

    #[test]
    fn parse_errors() {
        for bad in [
            "resize",
            "resize=x",
            "crop=1,2,3",
            "filter=emboss",
            "compress=1.5",
            "convert=tiff",
            "thumbnail=200",
            "sharpen",
        ] {
            assert!(bad.parse::<StepSpec>().is_err(), "{bad} should not parse");
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn partial_resize_locks_aspect() {
        assert_eq!(
            resolve("resize=800"),
            Step::Apply(Operation::Resize {
                width: Some(800),
                height: None,
                keep_aspect: true,
            })
        );
        assert_eq!(
            resolve("resize=800x600"),
            Step::Apply(Operation::Resize {
                width: Some(800),
                height: Some(600),
                keep_aspect: false,
            })
        );
    }

    #[test]
    fn thumbnail_uses_config_box() {
        let Step::Apply(Operation::Thumbnail { width, height, .. }) = resolve("thumbnail") else {
            panic!("expected thumbnail");
        };
        assert_eq!((width, height), (150, 150));
    }

    #[test]
    fn crop_ratio_is_applied() {
        let Step::Apply(Operation::Crop(rect)) = resolve("crop=0,0,400,400@2:1") else {
            panic!("expected crop");
        };
        assert_eq!(rect, CropRect::new(0, 100, 400, 200));
    }

    #[test]
    fn text_uses_watermark_defaults() {
        let Step::Apply(Operation::Watermark(mark)) = resolve("text=hello") else {
            panic!("expected watermark");
        };
        assert_eq!(mark.anchor, Anchor::BottomRight);
        assert_eq!(mark.padding, 20);
        assert!(matches!(
            mark.source,
            WatermarkSource::Text { ref text, scale: 3, .. } if text == "hello"
        ));
    }

    #[test]
    fn logo_is_decoded_through_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        std::fs::write(&path, mock_bytes(&gradient_buffer(5, 4))).unwrap();

        let step = StepSpec::Logo(path)
            .resolve(&EditorConfig::default(), None, &MockBackend::new())
            .unwrap();
        let Step::Apply(Operation::Watermark(mark)) = step else {
            panic!("expected watermark");
        };
        let WatermarkSource::Image(image) = mark.source else {
            panic!("expected image source");
        };
        assert_eq!(image.dimensions(), (5, 4));
    }

    #[test]
    fn missing_logo_is_io_error() {
        let result = StepSpec::Logo(PathBuf::from("/nonexistent/logo.png")).resolve(
            &EditorConfig::default(),
            None,
            &MockBackend::new(),
        );
        assert!(matches!(result, Err(ImagingError::Io(_))));
    }

    #[test]
    fn convert_quality_override() {
        let step = parse("convert=webp")
            .resolve(
                &EditorConfig::default(),
                Some(Quality::new(0.4)),
                &MockBackend::new(),
            )
            .unwrap();
        assert_eq!(
            step,
            Step::Apply(Operation::Convert {
                format: OutputFormat::Webp,
                quality: Quality::new(0.4),
            })
        );
    }

    #[test]
    fn history_steps_have_no_operation() {
        assert_eq!(resolve("undo"), Step::Undo);
        assert!(resolve("reset").into_operation().is_none());
        assert!(resolve("strip").into_operation().is_some());
    }
}
