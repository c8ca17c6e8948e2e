//! JSON envelopes for a boundary layer (HTTP handler, CLI `--json`).
//!
//! The pipeline returns typed results; these wrappers add what only the
//! caller knows: the wall-clock processing time and the uploaded file's
//! metadata. Field names are the wire contract and must not change.

use crate::document::RawDocument;
use crate::error::ExtractError;
use crate::output::{ExtractionResult, FaceCrop, Language, MarkdownExtraction};
use serde::{Deserialize, Serialize};

/// Metadata of the uploaded file, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: Option<String>,
    pub size: usize,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<&RawDocument> for FileInfo {
    fn from(doc: &RawDocument) -> Self {
        Self {
            name: doc.name().map(str::to_string),
            size: doc.len(),
            mime_type: doc.mime().to_string(),
        }
    }
}

/// `data` of a successful OCR extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractData {
    pub text: String,
    pub confidence: Option<f64>,
    pub language_detected: Language,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_images: Option<Vec<FaceCrop>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub data: ExtractData,
    pub file_info: FileInfo,
}

impl ExtractResponse {
    pub fn new(result: ExtractionResult, file_info: FileInfo, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            data: ExtractData {
                text: result.text,
                confidence: result.confidence,
                language_detected: result.language_detected,
                processing_time_ms,
                pages: result.pages,
                total_pages: result.total_pages,
                pages_processed: result.pages_processed,
                extracted_images: result.extracted_images,
            },
            file_info,
        }
    }
}

/// `data` of a successful document-converter extraction.
///
/// `confidence` is always serialised, as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterData {
    pub text: String,
    pub markdown: String,
    pub confidence: Option<f64>,
    pub language_detected: Language,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterResponse {
    pub success: bool,
    pub data: ConverterData,
    pub file_info: FileInfo,
}

impl ConverterResponse {
    pub fn new(result: MarkdownExtraction, file_info: FileInfo, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            data: ConverterData {
                text: result.text,
                markdown: result.markdown,
                confidence: result.confidence,
                language_detected: result.language_detected,
                processing_time_ms,
                pages: result.pages,
                engine: result.engine,
            },
            file_info,
        }
    }
}

/// Body sent with a 4xx/5xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub status: u16,
}

impl From<&ExtractError> for ErrorResponse {
    fn from(err: &ExtractError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            status: err.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn image_result() -> ExtractionResult {
        ExtractionResult {
            text: "Bonjour".into(),
            confidence: Some(0.0),
            language_detected: Language::En,
            pages: None,
            total_pages: None,
            pages_processed: None,
            extracted_images: None,
        }
    }

    #[test]
    fn file_info_uses_type_key() {
        let doc = RawDocument::new(vec![0u8; 12], "image/png").with_name("scan.png");
        let v = serde_json::to_value(FileInfo::from(&doc)).unwrap();
        assert_eq!(v, json!({"name": "scan.png", "size": 12, "type": "image/png"}));
    }

    #[test]
    fn image_response_omits_page_fields() {
        let info = FileInfo {
            name: None,
            size: 3,
            mime_type: "image/jpeg".into(),
        };
        let v = serde_json::to_value(ExtractResponse::new(image_result(), info, 42)).unwrap();
        assert_eq!(v["success"], json!(true));
        assert_eq!(v["data"]["confidence"], json!(0.0));
        assert_eq!(v["data"]["processing_time_ms"], json!(42));
        assert_eq!(v["data"]["language_detected"], json!("en"));
        let data = v["data"].as_object().unwrap();
        assert!(!data.contains_key("pages"));
        assert!(!data.contains_key("extracted_images"));
    }

    #[test]
    fn converter_response_keeps_null_confidence() {
        let result = MarkdownExtraction {
            text: "Titre".into(),
            markdown: "# Titre".into(),
            confidence: None,
            language_detected: Language::Fr,
            pages: Some(2),
            engine: "vlm".into(),
        };
        let info = FileInfo {
            name: Some("a.pdf".into()),
            size: 1,
            mime_type: "application/pdf".into(),
        };
        let v = serde_json::to_value(ConverterResponse::new(result, info, 7)).unwrap();
        assert_eq!(v["data"]["confidence"], Value::Null);
        assert_eq!(v["data"]["engine"], json!("vlm"));
        assert_eq!(v["data"]["pages"], json!(2));
    }

    #[test]
    fn error_response_carries_status() {
        let err = ExtractError::UnsupportedMediaType {
            mime: "text/plain".into(),
        };
        let body = ErrorResponse::from(&err);
        assert!(!body.success);
        assert_eq!(body.status, 400);
        assert!(body.error.contains("text/plain"));
    }
}
