//! Data types flowing through and out of the extraction pipeline.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Heuristic language tag attached to every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded bitmap plus its 1-based page index (always 1 for a plain image).
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub page: usize,
    pub image: DynamicImage,
}

/// Axis-aligned region box as reported by a recognizer, in raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected text span with its own box and confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedRegion {
    pub bbox: RegionBox,
    pub text: String,
    pub confidence: f64,
}

impl RecognizedRegion {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            bbox: RegionBox::default(),
            text: text.into(),
            confidence,
        }
    }

    pub fn with_bbox(mut self, bbox: RegionBox) -> Self {
        self.bbox = bbox;
        self
    }
}

/// Clamped crop rectangle of a face in source-raster pixels.
///
/// Always lies fully inside the source raster and has non-zero extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A face photo cropped out of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceCrop {
    /// Base64 of the JPEG-encoded crop.
    pub image_base64: String,
    /// 1-based page number, `None` for plain images.
    pub page: Option<usize>,
    pub bbox: CropBox,
    pub image_width: u32,
    pub image_height: u32,
}

/// Final output of the OCR pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Full text; PDF pages are joined by a blank line, each behind a page marker.
    pub text: String,
    /// Mean region confidence rounded to two decimals. 0.0 when no region was found.
    pub confidence: Option<f64>,
    pub language_detected: Language,
    /// Pages processed, `None` for plain images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    /// Page count of the whole PDF before truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<usize>,
    /// Present only when face extraction was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_images: Option<Vec<FaceCrop>>,
}

impl ExtractionResult {
    /// `true` when the PDF had more pages than were processed.
    pub fn is_truncated(&self) -> bool {
        matches!(
            (self.total_pages, self.pages_processed),
            (Some(total), Some(done)) if done < total
        )
    }
}

/// What a [`crate::capabilities::DocumentConverter`] hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    pub markdown: String,
    pub page_count: Option<usize>,
}

/// Output of the document-converter path: canonical text next to the raw markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownExtraction {
    pub text: String,
    pub markdown: String,
    /// Converters report no confidence; always `None`.
    pub confidence: Option<f64>,
    pub language_detected: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    pub engine: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Language::Fr).unwrap(), "\"fr\"");
        assert_eq!(Language::En.to_string(), "en");
    }

    #[test]
    fn image_result_omits_page_fields() {
        let result = ExtractionResult {
            text: "hello".into(),
            confidence: Some(0.5),
            language_detected: Language::En,
            pages: None,
            total_pages: None,
            pages_processed: None,
            extracted_images: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("pages").is_none());
        assert!(json.get("extracted_images").is_none());
        assert_eq!(json["confidence"], 0.5);
        assert!(!result.is_truncated());
    }

    #[test]
    fn truncation_is_visible() {
        let result = ExtractionResult {
            text: String::new(),
            confidence: Some(0.0),
            language_detected: Language::En,
            pages: Some(10),
            total_pages: Some(12),
            pages_processed: Some(10),
            extracted_images: None,
        };
        assert!(result.is_truncated());
    }
}
