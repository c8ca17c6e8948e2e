//! [`Recognizer`] backed by the pure-Rust `ocrs` engine.
//!
//! Only compiled with the `ocrs` feature. The engine needs two `rten` model
//! files, `text-detection.rten` and `text-recognition.rten`, in one directory
//! (the `ocrs-cli` tool caches them under `~/.cache/ocrs`).
//!
//! `ocrs` reports no per-line score, so every region carries confidence 1.0.
//! Aggregated confidence for this engine is therefore always 1.0 or 0.0.

use crate::capabilities::Recognizer;
use crate::error::ExtractError;
use crate::output::{RecognizedRegion, RegionBox};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load both models from `dir`. Expensive; do it once per process.
    ///
    /// `languages` is only logged: the published models are Latin-script and
    /// cover French and English without selection.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_model_dir(
        dir: impl AsRef<Path>,
        languages: &[String],
    ) -> Result<Self, ExtractError> {
        let dir = dir.as_ref();
        let detection_model = load_model(&dir.join(DETECTION_MODEL_FILENAME))?;
        let recognition_model = load_model(&dir.join(RECOGNITION_MODEL_FILENAME))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| ExtractError::InvalidConfig(format!("cannot start ocrs engine: {e}")))?;

        info!("ocrs recognizer ready for languages {:?}", languages);
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::InvalidConfig(format!(
            "ocrs model not found at {}; run `ocrs-cli` once to download models",
            path.display()
        )));
    }
    Model::load_file(path).map_err(|e| {
        ExtractError::InvalidConfig(format!(
            "cannot load ocrs model from {}: {}",
            path.display(),
            e
        ))
    })
}

fn recognition_error(detail: impl std::fmt::Display) -> ExtractError {
    ExtractError::Recognition {
        page: None,
        detail: detail.to_string(),
    }
}

impl Recognizer for OcrsRecognizer {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<RecognizedRegion>, ExtractError> {
        let rgb = image.to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(recognition_error)?;
        let input = self.engine.prepare_input(source).map_err(recognition_error)?;

        let words = self.engine.detect_words(&input).map_err(recognition_error)?;
        let lines = self.engine.find_text_lines(&input, &words);
        let texts = self
            .engine
            .recognize_text(&input, &lines)
            .map_err(recognition_error)?;

        let regions: Vec<RecognizedRegion> = texts
            .iter()
            .flatten()
            .filter_map(|line| {
                let text = line.to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let rect = line.bounding_rect();
                Some(RecognizedRegion::new(text, 1.0).with_bbox(RegionBox {
                    x: rect.left() as f32,
                    y: rect.top() as f32,
                    width: rect.width() as f32,
                    height: rect.height() as f32,
                }))
            })
            .collect();

        debug!(words = words.len(), regions = regions.len(), "ocrs pass complete");
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_are_a_config_error() {
        let err = OcrsRecognizer::from_model_dir("/nonexistent/ocrs-models", &[])
            .err()
            .expect("should fail");
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
        assert!(err.to_string().contains(DETECTION_MODEL_FILENAME));
    }

    #[test]
    fn default_dir_ends_in_ocrs() {
        assert!(default_model_dir().ends_with("ocrs") || default_model_dir().ends_with("ocrs-models"));
    }
}
