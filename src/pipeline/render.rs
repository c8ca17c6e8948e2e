//! PDF rasterisation: turn PDF bytes into an ordered, bounded list of page rasters.
//!
//! [`rasterize_pdf`] is the adapter the orchestrator calls. It delegates the
//! drawing to any [`PdfRasterizer`], then enforces the page bound itself and
//! numbers the surviving pages from 1, so a misbehaving backend can never
//! hand the pipeline more than `max_pages` rasters.
//!
//! [`PdfiumRasterizer`] is the production backend. Pages are rendered at a
//! fixed [`RASTER_DPI`]: sharp enough for recognition, small enough to keep a
//! ten-page request in memory.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with global state; rendering is CPU-bound and
//! blocking. The adapter moves the call onto tokio's blocking pool so request
//! dispatch threads never stall on it.

use crate::capabilities::{PdfRasterizer, RasterizedPdf};
use crate::config::RASTER_DPI;
use crate::error::ExtractError;
use crate::output::PageRaster;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The first `max_pages` pages of a PDF plus the document's full page count.
#[derive(Debug, Clone)]
pub struct RasterizedDocument {
    pub pages: Vec<PageRaster>,
    pub total_pages: usize,
}

impl RasterizedDocument {
    /// Number of pages that will actually be processed.
    pub fn pages_processed(&self) -> usize {
        self.pages.len()
    }
}

/// Rasterise `pdf` at [`RASTER_DPI`], keeping at most `max_pages` leading pages.
///
/// Fails with [`ExtractError::Rasterization`] when the bytes are not a
/// readable PDF; the error is propagated, never retried.
pub async fn rasterize_pdf(
    rasterizer: Arc<dyn PdfRasterizer>,
    pdf: Vec<u8>,
    max_pages: usize,
) -> Result<RasterizedDocument, ExtractError> {
    let rendered = tokio::task::spawn_blocking(move || {
        rasterizer.rasterize(&pdf, RASTER_DPI, max_pages)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))??;

    Ok(bound_pages(rendered, max_pages))
}

/// Truncate to `max_pages` and attach 1-based page numbers.
fn bound_pages(rendered: RasterizedPdf, max_pages: usize) -> RasterizedDocument {
    let RasterizedPdf {
        total_pages,
        mut pages,
    } = rendered;
    // A backend that under-reports its page count must not break
    // `pages_processed <= total_pages`.
    let total_pages = total_pages.max(pages.len());
    pages.truncate(max_pages);

    if pages.len() < total_pages {
        warn!(
            "PDF has {} pages; only the first {} will be processed",
            total_pages,
            pages.len()
        );
    }

    RasterizedDocument {
        pages: pages
            .into_iter()
            .enumerate()
            .map(|(i, image)| PageRaster { page: i + 1, image })
            .collect(),
        total_pages,
    }
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PdfRasterizer`] backed by the pdfium library.
///
/// The library is probed once in [`PdfiumRasterizer::new`] so a missing or
/// broken libpdfium is reported at start-up, then rebound for each render.
/// pdfium is not re-entrant, so renders are serialised through a mutex.
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
    render_lock: Mutex<()>,
}

impl PdfiumRasterizer {
    /// Bind pdfium from `library_dir`, or from the system library path when `None`.
    pub fn new(library_dir: Option<PathBuf>) -> Result<Self, ExtractError> {
        let rasterizer = Self {
            library_dir,
            render_lock: Mutex::new(()),
        };
        // Probe once so misconfiguration fails fast.
        rasterizer.bind()?;
        info!("pdfium bound from {}", rasterizer.library_source());
        Ok(rasterizer)
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                &dir.to_string_lossy().to_string(),
            )),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    /// Where libpdfium is loaded from, for logs and diagnostics.
    pub fn library_source(&self) -> String {
        self.library_dir
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "system library path".to_string())
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: &[u8],
        dpi: u32,
        max_pages: usize,
    ) -> Result<RasterizedPdf, ExtractError> {
        let _guard = self
            .render_lock
            .lock()
            .map_err(|_| ExtractError::Internal("pdfium render lock poisoned".into()))?;
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ExtractError::rasterization(format!("{:?}", e)))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut rasters = Vec::with_capacity(total_pages.min(max_pages));
        for (idx, page) in pages.iter().take(max_pages).enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::rasterization(format!("page {}: {:?}", idx + 1, e))
            })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            rasters.push(image);
        }

        Ok(RasterizedPdf {
            total_pages,
            pages: rasters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    struct FixedRasterizer {
        total: usize,
        reported_total: usize,
    }

    impl PdfRasterizer for FixedRasterizer {
        fn rasterize(
            &self,
            _pdf: &[u8],
            dpi: u32,
            _max_pages: usize,
        ) -> Result<RasterizedPdf, ExtractError> {
            assert_eq!(dpi, RASTER_DPI);
            // Ignores the bound on purpose: the adapter must enforce it.
            Ok(RasterizedPdf {
                total_pages: self.reported_total,
                pages: (0..self.total)
                    .map(|i| DynamicImage::ImageRgb8(RgbImage::new(10 + i as u32, 10)))
                    .collect(),
            })
        }
    }

    struct BrokenRasterizer;

    impl PdfRasterizer for BrokenRasterizer {
        fn rasterize(&self, _: &[u8], _: u32, _: usize) -> Result<RasterizedPdf, ExtractError> {
            Err(ExtractError::rasterization("not a PDF"))
        }
    }

    #[tokio::test]
    async fn truncates_to_max_pages_and_keeps_total() {
        let r = Arc::new(FixedRasterizer {
            total: 12,
            reported_total: 12,
        });
        let doc = rasterize_pdf(r, b"%PDF".to_vec(), 10).await.unwrap();
        assert_eq!(doc.total_pages, 12);
        assert_eq!(doc.pages_processed(), 10);
        let numbers: Vec<usize> = doc.pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
        // Order is preserved: page N is the N-th raster.
        assert_eq!(doc.pages[3].image.width(), 13);
    }

    #[tokio::test]
    async fn short_document_is_not_padded() {
        let r = Arc::new(FixedRasterizer {
            total: 3,
            reported_total: 3,
        });
        let doc = rasterize_pdf(r, Vec::new(), 10).await.unwrap();
        assert_eq!(doc.total_pages, 3);
        assert_eq!(doc.pages_processed(), 3);
    }

    #[tokio::test]
    async fn under_reported_total_is_corrected() {
        let r = Arc::new(FixedRasterizer {
            total: 4,
            reported_total: 2,
        });
        let doc = rasterize_pdf(r, Vec::new(), 10).await.unwrap();
        assert!(doc.pages_processed() <= doc.total_pages);
        assert_eq!(doc.total_pages, 4);
    }

    #[tokio::test]
    async fn rasterization_errors_propagate() {
        let err = rasterize_pdf(Arc::new(BrokenRasterizer), b"junk".to_vec(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Rasterization { .. }));
    }

    /// Needs a real libpdfium; skipped unless PDFIUM_LIB_DIR is set.
    #[test]
    fn pdfium_rejects_garbage_bytes() {
        let Ok(dir) = std::env::var("PDFIUM_LIB_DIR") else {
            println!("SKIP: set PDFIUM_LIB_DIR to run pdfium tests");
            return;
        };
        let rasterizer = PdfiumRasterizer::new(Some(PathBuf::from(&dir))).unwrap();
        assert_eq!(rasterizer.library_source(), dir);
        let err = rasterizer
            .rasterize(b"definitely not a pdf", RASTER_DPI, 10)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Rasterization { .. }));
    }
}
