//! Raw uploaded documents and the boundary checks run before the pipeline.
//!
//! Validation is cheap and happens up front: once rasterisation or
//! recognition has started nothing can abort early, so an oversized or
//! unsupported payload must be rejected here.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use std::path::Path;

/// MIME type of PDF documents.
pub const PDF_MIME: &str = "application/pdf";

/// Immutable byte buffer plus the MIME type the caller declared for it.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    mime: String,
    name: Option<String>,
}

/// Which pipeline path a document takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl RawDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
            name: None,
        }
    }

    /// Attach the original file name (reported back in response envelopes).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read a file from disk, inferring the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime = mime_from_path(path).unwrap_or("application/octet-stream");
        let mut doc = Self::new(bytes, mime);
        if let Some(name) = path.file_name() {
            doc.name = Some(name.to_string_lossy().into_owned());
        }
        Ok(doc)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Dispatch on the declared MIME type.
    pub fn kind(&self) -> DocumentKind {
        let essence = self.mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }

    /// Reject payloads the boundary layer must not forward to the pipeline.
    ///
    /// MIME is checked first, then size.
    pub fn validate(&self, config: &ExtractionConfig) -> Result<(), ExtractError> {
        if !config.is_mime_allowed(&self.mime) {
            return Err(ExtractError::UnsupportedMediaType {
                mime: self.mime.clone(),
            });
        }
        if self.bytes.len() > config.max_file_size_bytes() {
            return Err(ExtractError::FileTooLarge {
                size: self.bytes.len(),
                max_mb: config.max_file_size_mb,
            });
        }
        Ok(())
    }
}

/// Guess a MIME type from a file extension for the formats the service accepts.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF_MIME),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_dispatches_on_mime() {
        assert_eq!(RawDocument::new(vec![], "application/pdf").kind(), DocumentKind::Pdf);
        assert_eq!(RawDocument::new(vec![], "image/png").kind(), DocumentKind::Image);
        assert_eq!(
            RawDocument::new(vec![], "Application/PDF; q=1").kind(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn validate_rejects_disallowed_mime() {
        let doc = RawDocument::new(b"GIF89a".to_vec(), "image/gif");
        let err = doc.validate(&ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedMediaType { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn validate_rejects_oversized_payload() {
        let config = ExtractionConfig::builder()
            .max_file_size_mb(1)
            .build()
            .unwrap();
        let doc = RawDocument::new(vec![0u8; 1024 * 1024 + 1], "image/png");
        let err = doc.validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::FileTooLarge {
                size: 1_048_577,
                max_mb: 1
            }
        ));
    }

    #[test]
    fn validate_accepts_payload_at_limit() {
        let config = ExtractionConfig::builder()
            .max_file_size_mb(1)
            .build()
            .unwrap();
        let doc = RawDocument::new(vec![0u8; 1024 * 1024], "application/pdf");
        assert!(doc.validate(&config).is_ok());
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("scan.PDF")), Some(PDF_MIME));
        assert_eq!(mime_from_path(Path::new("id.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_from_path(Path::new("photo.webp")), Some("image/webp"));
        assert_eq!(mime_from_path(Path::new("notes.txt")), None);
        assert_eq!(mime_from_path(Path::new("README")), None);
    }
}
