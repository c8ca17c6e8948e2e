//! Error types for the ocr-extract library.
//!
//! Every failure is a variant of [`ExtractError`]. The variants fall into two
//! classes, reported by [`ExtractError::kind`]:
//!
//! * [`ErrorKind::InvalidInput`]: the caller sent something we refuse to
//!   process (unsupported MIME type, oversized payload). A boundary layer maps
//!   these to a client error and never retries them.
//!
//! * [`ErrorKind::Processing`]: the document was accepted but rasterisation,
//!   recognition, conversion or encoding failed. These surface as a server
//!   error with the underlying message attached.
//!
//! There is no partial-success mode: a failure on any page of a multi-page
//! document aborts the whole extraction.

use thiserror::Error;

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is invalid (client fault).
    InvalidInput,
    /// The pipeline failed while processing an accepted request (server fault).
    Processing,
}

/// All errors returned by the ocr-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared MIME type is not in the configured allow-list.
    #[error("Invalid file type '{mime}'. Allowed: JPG, PNG, WEBP, PDF")]
    UnsupportedMediaType { mime: String },

    /// The payload exceeds the configured size limit.
    #[error("File too large ({size} bytes). Max size: {max_mb}MB")]
    FileTooLarge { size: usize, max_mb: u64 },

    // ── Processing errors ─────────────────────────────────────────────────
    /// PDF or image bytes could not be decoded into rasters.
    #[error("Rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// The text recognizer failed. `page` is `None` for plain images.
    #[error("Recognition failed{}: {detail}", .page.map(|p| format!(" on page {p}")).unwrap_or_default())]
    Recognition { page: Option<usize>, detail: String },

    /// The document converter failed.
    #[error("Document conversion failed: {detail}")]
    Conversion { detail: String },

    /// A face crop could not be re-encoded.
    #[error("Image encoding failed: {detail}")]
    Encoding { detail: String },

    /// The request needs a capability the process was started without.
    #[error("No {capability} is configured for this extractor")]
    CapabilityUnavailable { capability: &'static str },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_DIR to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Classify this error as a client or server fault.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::UnsupportedMediaType { .. } | ExtractError::FileTooLarge { .. } => {
                ErrorKind::InvalidInput
            }
            _ => ErrorKind::Processing,
        }
    }

    /// `true` for errors a boundary layer should report as a 400.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }

    /// HTTP status code a boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Processing => 500,
        }
    }

    pub(crate) fn rasterization(detail: impl std::fmt::Display) -> Self {
        ExtractError::Rasterization {
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_client_errors() {
        let e = ExtractError::UnsupportedMediaType {
            mime: "text/plain".into(),
        };
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
        assert_eq!(e.status_code(), 400);

        let e = ExtractError::FileTooLarge {
            size: 20 * 1024 * 1024,
            max_mb: 10,
        };
        assert!(e.is_client_error());
        assert!(e.to_string().contains("10MB"), "got: {e}");
    }

    #[test]
    fn processing_errors_are_server_errors() {
        let e = ExtractError::Rasterization {
            detail: "not a PDF".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Processing);
        assert_eq!(e.status_code(), 500);
        assert!(e.to_string().contains("not a PDF"));
    }

    #[test]
    fn recognition_display_with_page() {
        let e = ExtractError::Recognition {
            page: Some(3),
            detail: "model crashed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("on page 3"), "got: {msg}");
        assert!(msg.contains("model crashed"));
    }

    #[test]
    fn recognition_display_without_page() {
        let e = ExtractError::Recognition {
            page: None,
            detail: "boom".into(),
        };
        assert_eq!(e.to_string(), "Recognition failed: boom");
    }

    #[test]
    fn capability_unavailable_display() {
        let e = ExtractError::CapabilityUnavailable {
            capability: "face detector",
        };
        assert!(e.to_string().contains("face detector"));
        assert!(!e.is_client_error());
    }
}
