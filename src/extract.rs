//! Request-level entry points: one document in, one result out.
//!
//! [`Extractor`] owns the process-wide [`Capabilities`] and
//! [`ExtractionConfig`] and sequences the pipeline stages for each request.
//! It is cheap to clone and safe to share between tasks; nothing in it is
//! mutated per request.
//!
//! ## Failure model
//!
//! All or nothing. Validation errors are reported before any decoding
//! happens. After that, a failure on any page (rasterisation, recognition,
//! face encoding) aborts the whole request and no partial text is returned.

use crate::capabilities::{Capabilities, FaceDetector, Recognizer};
use crate::config::ExtractionConfig;
use crate::document::{DocumentKind, RawDocument};
use crate::error::ExtractError;
use crate::output::{ExtractionResult, FaceCrop, MarkdownExtraction, PageRaster};
use crate::pipeline::aggregate::{aggregate_page, join_pdf_pages, overall_confidence, PageResult};
use crate::pipeline::canonicalize::markdown_to_plain_text;
use crate::pipeline::faces::extract_faces;
use crate::pipeline::language::detect_language;
use crate::pipeline::preprocess::{decode_image, downscale};
use crate::pipeline::render::rasterize_pdf;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs extraction requests against a fixed set of capabilities.
///
/// # Example
/// ```rust,no_run
/// use ocr_extract::{Capabilities, ExtractionConfig, Extractor, RawDocument};
///
/// # async fn run(capabilities: Capabilities) -> Result<(), ocr_extract::ExtractError> {
/// let extractor = Extractor::new(capabilities, ExtractionConfig::default());
/// let doc = RawDocument::from_path("scan.pdf").expect("readable file");
/// let result = extractor.extract(&doc, false).await?;
/// println!("{} ({:?})", result.text, result.language_detected);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Extractor {
    capabilities: Capabilities,
    config: Arc<ExtractionConfig>,
}

/// Everything one page contributes to the final result.
struct PageOutcome {
    page: usize,
    result: PageResult,
    faces: Option<Vec<FaceCrop>>,
}

impl Extractor {
    pub fn new(capabilities: Capabilities, config: ExtractionConfig) -> Self {
        Self {
            capabilities,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Recognise the text of an image or PDF.
    ///
    /// With `extract_images`, face crops are collected from every processed
    /// page and returned in `extracted_images` (possibly empty).
    ///
    /// # Errors
    /// - [`ExtractError::UnsupportedMediaType`] / [`ExtractError::FileTooLarge`]
    ///   before any byte is decoded
    /// - [`ExtractError::CapabilityUnavailable`] when a needed capability was
    ///   not configured
    /// - [`ExtractError::Rasterization`] / [`ExtractError::Recognition`] from
    ///   the stages themselves
    pub async fn extract(
        &self,
        document: &RawDocument,
        extract_images: bool,
    ) -> Result<ExtractionResult, ExtractError> {
        document.validate(&self.config)?;
        let start = Instant::now();

        let result = match document.kind() {
            DocumentKind::Image => self.extract_image(document, extract_images).await?,
            DocumentKind::Pdf => self.extract_pdf(document, extract_images).await?,
        };

        info!(
            "Extraction complete: {} chars, confidence {:?}, language {}, {}ms",
            result.text.chars().count(),
            result.confidence,
            result.language_detected,
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    /// Convert a document to markdown with the configured converter and
    /// flatten it to comparable plain text.
    ///
    /// Converters report no confidence, so `confidence` is always `None`.
    pub async fn extract_markdown(
        &self,
        document: &RawDocument,
    ) -> Result<MarkdownExtraction, ExtractError> {
        document.validate(&self.config)?;
        let converter = self.capabilities.converter()?;
        let start = Instant::now();

        let converted = converter.convert(document).await?;
        let text = markdown_to_plain_text(&converted.markdown);
        let language_detected = detect_language(&text);

        info!(
            "Markdown extraction via {} complete: {} chars, {}ms",
            converter.engine(),
            text.chars().count(),
            start.elapsed().as_millis()
        );

        Ok(MarkdownExtraction {
            text,
            markdown: converted.markdown,
            confidence: None,
            language_detected,
            pages: converted.page_count,
            engine: converter.engine().to_string(),
        })
    }

    // ── Image path ───────────────────────────────────────────────────────

    async fn extract_image(
        &self,
        document: &RawDocument,
        extract_images: bool,
    ) -> Result<ExtractionResult, ExtractError> {
        let recognizer = self.capabilities.recognizer()?.clone();
        let detector = self.face_detector_for(extract_images)?;

        let image = decode_image(document.bytes().to_vec()).await?;
        debug!("Decoded {}x{} image", image.width(), image.height());

        self.notify(|cb| cb.on_extraction_start(1));
        self.notify(|cb| cb.on_page_start(1, 1));

        let config = Arc::clone(&self.config);
        let outcome = tokio::task::spawn_blocking(move || {
            process_page(
                recognizer.as_ref(),
                detector.as_deref(),
                PageRaster { page: 1, image },
                None,
                &config,
            )
        })
        .await
        .map_err(|e| ExtractError::Internal(format!("Recognition task panicked: {}", e)))??;

        self.notify(|cb| cb.on_page_complete(1, 1, outcome.result.confidences.len()));
        self.notify(|cb| cb.on_extraction_complete(1));

        let confidence = overall_confidence([&outcome.result]);
        let language_detected = detect_language(&outcome.result.text);

        Ok(ExtractionResult {
            text: outcome.result.text,
            confidence: Some(confidence),
            language_detected,
            pages: None,
            total_pages: None,
            pages_processed: None,
            extracted_images: outcome.faces,
        })
    }

    // ── PDF path ─────────────────────────────────────────────────────────

    async fn extract_pdf(
        &self,
        document: &RawDocument,
        extract_images: bool,
    ) -> Result<ExtractionResult, ExtractError> {
        let rasterizer = self.capabilities.rasterizer()?.clone();
        let recognizer = self.capabilities.recognizer()?.clone();
        let detector = self.face_detector_for(extract_images)?;

        let render_start = Instant::now();
        let rasterized =
            rasterize_pdf(rasterizer, document.bytes().to_vec(), self.config.max_pdf_pages)
                .await?;
        let total_pages = rasterized.total_pages;
        let pages_processed = rasterized.pages_processed();
        info!(
            "Rasterised {}/{} pages in {}ms",
            pages_processed,
            total_pages,
            render_start.elapsed().as_millis()
        );

        self.notify(|cb| cb.on_extraction_start(pages_processed));

        // `buffered` yields in input order, so pages come back in document
        // order whatever the concurrency.
        let outcomes: Vec<PageOutcome> = stream::iter(rasterized.pages)
            .map(|raster| {
                let recognizer = Arc::clone(&recognizer);
                let detector = detector.clone();
                let config = Arc::clone(&self.config);
                async move {
                    let page_num = raster.page;
                    self.notify(|cb| cb.on_page_start(page_num, pages_processed));

                    let outcome = tokio::task::spawn_blocking(move || {
                        process_page(
                            recognizer.as_ref(),
                            detector.as_deref(),
                            raster,
                            Some(page_num),
                            &config,
                        )
                    })
                    .await
                    .map_err(|e| {
                        ExtractError::Internal(format!(
                            "Recognition task for page {} panicked: {}",
                            page_num, e
                        ))
                    })??;

                    self.notify(|cb| {
                        cb.on_page_complete(
                            page_num,
                            pages_processed,
                            outcome.result.confidences.len(),
                        )
                    });
                    Ok::<_, ExtractError>(outcome)
                }
            })
            .buffered(self.config.page_concurrency)
            .try_collect()
            .await?;

        self.notify(|cb| cb.on_extraction_complete(outcomes.len()));

        let mut pages = Vec::with_capacity(outcomes.len());
        let mut faces: Option<Vec<FaceCrop>> = extract_images.then(Vec::new);
        for outcome in outcomes {
            if let (Some(all), Some(page_faces)) = (faces.as_mut(), outcome.faces) {
                all.extend(page_faces);
            }
            pages.push((outcome.page, outcome.result));
        }

        let text = join_pdf_pages(&pages);
        let confidence = overall_confidence(pages.iter().map(|(_, p)| p));
        let language_detected = detect_language(&text);

        Ok(ExtractionResult {
            text,
            confidence: Some(confidence),
            language_detected,
            pages: Some(pages_processed),
            total_pages: Some(total_pages),
            pages_processed: Some(pages_processed),
            extracted_images: faces,
        })
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// The face detector when crops were asked for. Fails before any work
    /// starts if it was not configured.
    fn face_detector_for(
        &self,
        extract_images: bool,
    ) -> Result<Option<Arc<dyn FaceDetector>>, ExtractError> {
        if !extract_images {
            return Ok(None);
        }
        Ok(Some(Arc::clone(self.capabilities.face_detector()?)))
    }

    fn notify(&self, event: impl FnOnce(&ProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            event(cb);
        }
    }
}

/// Downscale, recognise, aggregate and optionally crop faces for one raster.
///
/// Runs on the blocking pool. `face_page` is the page number recorded on
/// face crops: `None` for plain images.
fn process_page(
    recognizer: &dyn Recognizer,
    detector: Option<&dyn FaceDetector>,
    raster: PageRaster,
    face_page: Option<usize>,
    config: &ExtractionConfig,
) -> Result<PageOutcome, ExtractError> {
    let page = raster.page;
    let image = downscale(raster.image, config.max_image_dimension);

    let regions = recognizer.read_text(&image).map_err(|e| match e {
        ExtractError::Recognition { page: None, detail } if face_page.is_some() => {
            ExtractError::Recognition {
                page: face_page,
                detail,
            }
        }
        other => other,
    })?;
    let result = aggregate_page(&regions);
    debug!("Page {}: {} region(s)", page, regions.len());

    let faces = detector
        .map(|d| {
            extract_faces(
                d,
                &image,
                face_page,
                config.face_padding_ratio,
                config.face_jpeg_quality,
            )
        })
        .transpose()?;

    Ok(PageOutcome {
        page,
        result,
        faces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionParams;
    use crate::output::RecognizedRegion;
    use image::{DynamicImage, GrayImage, Rgb, RgbImage};
    use std::sync::Mutex;

    struct EchoRecognizer(Vec<(&'static str, f64)>);

    impl Recognizer for EchoRecognizer {
        fn read_text(&self, _: &DynamicImage) -> Result<Vec<RecognizedRegion>, ExtractError> {
            Ok(self
                .0
                .iter()
                .map(|(t, c)| RecognizedRegion::new(*t, *c))
                .collect())
        }
    }

    struct FailingRecognizer;

    impl Recognizer for FailingRecognizer {
        fn read_text(&self, _: &DynamicImage) -> Result<Vec<RecognizedRegion>, ExtractError> {
            Err(ExtractError::Recognition {
                page: None,
                detail: "model crashed".into(),
            })
        }
    }

    struct SizeRecordingDetector(Mutex<Vec<(u32, u32)>>);

    impl FaceDetector for SizeRecordingDetector {
        fn detect(&self, gray: &GrayImage, _: &DetectionParams) -> Vec<crate::capabilities::FaceBox> {
            self.0.lock().unwrap().push(gray.dimensions());
            Vec::new()
        }
    }

    fn raster(w: u32, h: u32) -> PageRaster {
        PageRaster {
            page: 3,
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255]))),
        }
    }

    #[test]
    fn process_page_joins_regions() {
        let rec = EchoRecognizer(vec![("Hello", 0.9), ("world", 0.7)]);
        let out = process_page(&rec, None, raster(10, 10), Some(3), &ExtractionConfig::default())
            .unwrap();
        assert_eq!(out.page, 3);
        assert_eq!(out.result.text, "Hello world");
        assert_eq!(out.result.confidences, vec![0.9, 0.7]);
        assert!(out.faces.is_none());
    }

    #[test]
    fn process_page_tags_recognition_error_with_page() {
        let err = process_page(
            &FailingRecognizer,
            None,
            raster(10, 10),
            Some(3),
            &ExtractionConfig::default(),
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "Recognition failed on page 3: model crashed");
    }

    #[test]
    fn faces_run_on_downscaled_raster() {
        let detector = SizeRecordingDetector(Mutex::new(Vec::new()));
        let config = ExtractionConfig::builder()
            .max_image_dimension(100)
            .build()
            .unwrap();
        let out = process_page(
            &EchoRecognizer(vec![]),
            Some(&detector as &dyn FaceDetector),
            raster(400, 200),
            None,
            &config,
        )
        .unwrap();
        assert_eq!(out.faces, Some(vec![]));
        assert_eq!(*detector.0.lock().unwrap(), vec![(100, 50)]);
    }
}
