//! Pipeline stages for document extraction.
//!
//! Each submodule implements exactly one transformation step, so stages can
//! be tested on their own and backends swapped without touching neighbours.
//!
//! ## Data Flow
//!
//! ```text
//!                 ┌─ image ─▶ preprocess ─┐
//! RawDocument ────┤                       ├─▶ recognize ─▶ aggregate ─▶ language
//!                 └─ pdf ───▶ render ─────┘        │
//!                                                  └─▶ faces ─▶ encode
//!
//! RawDocument ──▶ converter (vlm) ──▶ canonicalize ──▶ language
//! ```
//!
//! 1. [`preprocess`] decodes uploaded images and downscales oversized rasters
//! 2. [`render`] rasterises leading PDF pages in `spawn_blocking`, since pdfium
//!    is not async-safe
//! 3. [`aggregate`] joins region text per page and across pages and computes
//!    the overall confidence
//! 4. [`language`] guesses French vs English from diacritic density
//! 5. [`faces`] pads, clamps and crops detected faces
//! 6. [`encode`] turns rasters into base64 JPEG crops or PNG model attachments
//! 7. [`canonicalize`] flattens converter markdown to comparable plain text
//! 8. [`vlm`] is the vision-LLM document converter, the only stage with
//!    network I/O

pub mod aggregate;
pub mod canonicalize;
pub mod encode;
pub mod faces;
pub mod language;
#[cfg(feature = "ocrs")]
pub mod ocrs_recognizer;
pub mod preprocess;
pub mod render;
pub mod vlm;
