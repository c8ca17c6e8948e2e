//! Configuration types for document extraction.
//!
//! All process-level knobs live in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The config is fixed when the process starts
//! and shared by every request; the only per-request switch is whether face
//! crops are wanted.
//!
//! Two values are deliberately *not* configurable: the PDF rasterisation
//! resolution ([`RASTER_DPI`]) and the face-detection parameters
//! ([`FACE_DETECTION_PARAMS`]).

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Resolution used when rasterising PDF pages.
pub const RASTER_DPI: u32 = 150;

/// MIME types accepted by default.
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/webp", "application/pdf"];

/// Fixed parameters handed to every [`crate::capabilities::FaceDetector`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Image pyramid scale step between detection passes.
    pub scale_factor: f64,
    /// How many overlapping candidate hits a face needs to be kept.
    pub min_neighbors: u32,
    /// Smallest detectable face, `(width, height)` in pixels.
    pub min_size: (u32, u32),
}

/// The one detection setting every caller uses.
pub const FACE_DETECTION_PARAMS: DetectionParams = DetectionParams {
    scale_factor: 1.1,
    min_neighbors: 5,
    min_size: (30, 30),
};

/// Configuration for the extraction pipeline.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_pdf_pages(5)
///     .face_padding_ratio(0.25)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pdf_pages, 5);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// MIME types the boundary layer accepts. Default: JPEG, PNG, WEBP, PDF.
    pub allowed_mime_types: Vec<String>,

    /// Maximum upload size in megabytes. Default: 10.
    pub max_file_size_mb: u64,

    /// Languages the text recognizer is initialised for. Default: `["fr", "en"]`.
    pub ocr_languages: Vec<String>,

    /// Maximum number of PDF pages processed per request. Default: 10.
    ///
    /// Pages beyond this bound are rasterised (so the total is known) but not
    /// recognised. The result reports both counts so callers can detect it.
    pub max_pdf_pages: usize,

    /// Fraction of a face box's width/height added on every side before
    /// cropping. Default: 0.35.
    pub face_padding_ratio: f64,

    /// JPEG quality for encoded face crops, 1–100. Default: 85.
    pub face_jpeg_quality: u8,

    /// Longest edge, in pixels, a raster may have before recognition. Default: 2000.
    pub max_image_dimension: u32,

    /// Number of PDF pages recognised concurrently. Default: 4.
    ///
    /// Page order in the result is preserved regardless of this value.
    pub page_concurrency: usize,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size_mb: 10,
            ocr_languages: vec!["fr".to_string(), "en".to_string()],
            max_pdf_pages: 10,
            face_padding_ratio: 0.35,
            face_jpeg_quality: 85,
            max_image_dimension: 2000,
            page_concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("allowed_mime_types", &self.allowed_mime_types)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("ocr_languages", &self.ocr_languages)
            .field("max_pdf_pages", &self.max_pdf_pages)
            .field("face_padding_ratio", &self.face_padding_ratio)
            .field("face_jpeg_quality", &self.face_jpeg_quality)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("page_concurrency", &self.page_concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Maximum upload size in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Whether `mime` is in the allow-list (parameters such as `; charset=` ignored).
    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or("").trim();
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(essence))
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size_mb = mb;
        self
    }

    pub fn ocr_languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ocr_languages = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n;
        self
    }

    pub fn face_padding_ratio(mut self, ratio: f64) -> Self {
        self.config.face_padding_ratio = ratio;
        self
    }

    pub fn face_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.face_jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px;
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.allowed_mime_types.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "At least one MIME type must be allowed".into(),
            ));
        }
        if c.max_file_size_mb == 0 {
            return Err(ExtractError::InvalidConfig(
                "Max file size must be ≥ 1 MB".into(),
            ));
        }
        if c.max_pdf_pages == 0 {
            return Err(ExtractError::InvalidConfig(
                "Max PDF pages must be ≥ 1".into(),
            ));
        }
        if !c.face_padding_ratio.is_finite() || c.face_padding_ratio < 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "Face padding ratio must be a non-negative number, got {}",
                c.face_padding_ratio
            )));
        }
        if c.max_image_dimension == 0 {
            return Err(ExtractError::InvalidConfig(
                "Max image dimension must be ≥ 1 px".into(),
            ));
        }
        Ok(self.config)
    }
}
