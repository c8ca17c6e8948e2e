//! # ocr-extract
//!
//! Extract text, a confidence score, a language tag and optional face photos
//! from uploaded images and PDFs.
//!
//! ## Why this crate?
//!
//! Scanned identity documents, receipts and forms arrive as phone photos or
//! image-only PDFs. This crate drives a text recognizer over every page,
//! merges its regions into one document, guesses French vs English and can
//! cut out the portrait photos. A second engine converts the same documents
//! to markdown with a vision LLM and flattens it, so the two outputs can be
//! compared on equal terms.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + MIME
//!  │
//!  ├─ 1. Validate    MIME allow-list and size limit, before any decoding
//!  ├─ 2. Rasterise   PDF → first N pages at 150 DPI (pdfium, spawn_blocking)
//!  ├─ 3. Downscale   longest edge ≤ 2000 px, Lanczos
//!  ├─ 4. Recognise   external recognizer → regions (text, confidence)
//!  ├─ 5. Aggregate   page text, page markers, mean confidence
//!  ├─ 6. Faces       optional: detect, pad, clamp, JPEG + base64
//!  └─ 7. Language    fr / en from diacritic density
//! ```
//!
//! Recognition, face detection and rasterisation are capabilities
//! ([`Recognizer`], [`FaceDetector`], [`PdfRasterizer`]) loaded once and
//! handed to an [`Extractor`] through [`Capabilities`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_extract::{Capabilities, ExtractionConfig, Extractor, PdfiumRasterizer, RawDocument};
//! use std::sync::Arc;
//!
//! # fn recognizer() -> Arc<dyn ocr_extract::Recognizer> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let capabilities = Capabilities::builder()
//!         .recognizer(recognizer())
//!         .rasterizer(Arc::new(PdfiumRasterizer::new(None)?))
//!         .build();
//!     let extractor = Extractor::new(capabilities, ExtractionConfig::default());
//!
//!     let doc = RawDocument::from_path("passport.pdf")?;
//!     let result = extractor.extract(&doc, true).await?;
//!     println!("{} [{}] confidence={:?}", result.text, result.language_detected, result.confidence);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `ocrs`  | off     | Pure-Rust [`Recognizer`] backed by `ocrs`/`rten` models |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capabilities;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod response;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capabilities::{
    Capabilities, CapabilitiesBuilder, DocumentConverter, FaceBox, FaceDetector, PdfRasterizer,
    RasterizedPdf, Recognizer,
};
pub use config::{
    DetectionParams, ExtractionConfig, ExtractionConfigBuilder, FACE_DETECTION_PARAMS, RASTER_DPI,
};
pub use document::{DocumentKind, RawDocument};
pub use error::{ErrorKind, ExtractError};
pub use extract::Extractor;
pub use output::{
    ConvertedDocument, CropBox, ExtractionResult, FaceCrop, Language, MarkdownExtraction,
    PageRaster, RecognizedRegion, RegionBox,
};
pub use pipeline::canonicalize::markdown_to_plain_text;
pub use pipeline::language::detect_language;
#[cfg(feature = "ocrs")]
pub use pipeline::ocrs_recognizer::OcrsRecognizer;
pub use pipeline::render::PdfiumRasterizer;
pub use pipeline::vlm::{VlmConverter, VlmSettings};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use response::{ConverterResponse, ErrorResponse, ExtractResponse, FileInfo};
