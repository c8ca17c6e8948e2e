//! External capabilities consumed by the pipeline, and the provider that owns them.
//!
//! The pipeline never knows how text is recognised, how faces are found, how
//! PDFs are drawn, or how a document is turned into markdown. Each of those is
//! a trait here. Implementations are loaded once at process start, bundled in
//! a [`Capabilities`] value and shared read-only (`Arc`) by every request.
//!
//! All traits are `Send + Sync`: the orchestrator calls them from
//! `spawn_blocking` threads and may hit the same handle for several pages at
//! once. An implementation that is not re-entrant must serialise internally
//! (see [`crate::pipeline::render::PdfiumRasterizer`]).

use crate::config::DetectionParams;
use crate::document::RawDocument;
use crate::error::ExtractError;
use crate::output::{ConvertedDocument, RecognizedRegion};
use futures::future::BoxFuture;
use image::{DynamicImage, GrayImage};
use std::fmt;
use std::sync::Arc;

/// Text recognition over a single raster.
pub trait Recognizer: Send + Sync {
    /// Regions in the recognizer's own reading order.
    fn read_text(&self, image: &DynamicImage) -> Result<Vec<RecognizedRegion>, ExtractError>;
}

/// Axis-aligned face box as returned by a detector, in grayscale-raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Face detection over a grayscale raster.
///
/// Finding nothing is not an error; detectors return an empty list.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage, params: &DetectionParams) -> Vec<FaceBox>;
}

/// Pages drawn from a PDF.
#[derive(Debug, Clone)]
pub struct RasterizedPdf {
    /// Page count of the whole document.
    pub total_pages: usize,
    /// Rasters in document order; at most `max_pages` of them.
    pub pages: Vec<DynamicImage>,
}

/// PDF-to-bitmap rendering.
pub trait PdfRasterizer: Send + Sync {
    /// Render up to `max_pages` leading pages at `dpi`, reporting the full page count.
    fn rasterize(&self, pdf: &[u8], dpi: u32, max_pages: usize)
        -> Result<RasterizedPdf, ExtractError>;
}

/// Whole-document conversion to markdown.
///
/// Converters are usually network- or model-bound, so `convert` is async;
/// the boxed future keeps the trait object-safe.
pub trait DocumentConverter: Send + Sync {
    /// Short engine name reported in results (e.g. `"vlm"`).
    fn engine(&self) -> &str;

    fn convert<'a>(
        &'a self,
        document: &'a RawDocument,
    ) -> BoxFuture<'a, Result<ConvertedDocument, ExtractError>>;
}

/// The set of capability handles a process was started with.
///
/// Built once via [`Capabilities::builder`]; cloning shares the handles.
#[derive(Clone, Default)]
pub struct Capabilities {
    recognizer: Option<Arc<dyn Recognizer>>,
    face_detector: Option<Arc<dyn FaceDetector>>,
    rasterizer: Option<Arc<dyn PdfRasterizer>>,
    converter: Option<Arc<dyn DocumentConverter>>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("recognizer", &self.recognizer.is_some())
            .field("face_detector", &self.face_detector.is_some())
            .field("rasterizer", &self.rasterizer.is_some())
            .field(
                "converter",
                &self.converter.as_ref().map(|c| c.engine().to_string()),
            )
            .finish()
    }
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    pub fn recognizer(&self) -> Result<&Arc<dyn Recognizer>, ExtractError> {
        self.recognizer
            .as_ref()
            .ok_or(ExtractError::CapabilityUnavailable {
                capability: "text recognizer",
            })
    }

    pub fn face_detector(&self) -> Result<&Arc<dyn FaceDetector>, ExtractError> {
        self.face_detector
            .as_ref()
            .ok_or(ExtractError::CapabilityUnavailable {
                capability: "face detector",
            })
    }

    pub fn rasterizer(&self) -> Result<&Arc<dyn PdfRasterizer>, ExtractError> {
        self.rasterizer
            .as_ref()
            .ok_or(ExtractError::CapabilityUnavailable {
                capability: "PDF rasterizer",
            })
    }

    pub fn converter(&self) -> Result<&Arc<dyn DocumentConverter>, ExtractError> {
        self.converter
            .as_ref()
            .ok_or(ExtractError::CapabilityUnavailable {
                capability: "document converter",
            })
    }
}

/// Builder for [`Capabilities`]. Every handle is optional; requests that need
/// a missing one fail with [`ExtractError::CapabilityUnavailable`].
#[derive(Default)]
pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl CapabilitiesBuilder {
    pub fn recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.inner.recognizer = Some(recognizer);
        self
    }

    pub fn face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.inner.face_detector = Some(detector);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PdfRasterizer>) -> Self {
        self.inner.rasterizer = Some(rasterizer);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.inner.converter = Some(converter);
        self
    }

    pub fn build(self) -> Capabilities {
        tracing::debug!(capabilities = ?self.inner, "Capabilities assembled");
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentRecognizer;

    impl Recognizer for SilentRecognizer {
        fn read_text(&self, _image: &DynamicImage) -> Result<Vec<RecognizedRegion>, ExtractError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn missing_capabilities_report_which_one() {
        let caps = Capabilities::builder().build();
        let err = caps.face_detector().err().unwrap();
        assert!(err.to_string().contains("face detector"));
        assert!(caps.rasterizer().is_err());
        assert!(caps.converter().is_err());
    }

    #[test]
    fn clones_share_handles() {
        let caps = Capabilities::builder()
            .recognizer(Arc::new(SilentRecognizer))
            .build();
        let copy = caps.clone();
        let a = caps.recognizer().unwrap();
        let b = copy.recognizer().unwrap();
        assert!(Arc::ptr_eq(a, b));
    }
}
