//! Image encoding: face crops to base64 JPEG, VLM pages to base64 PNG.
//!
//! Face crops go back to API callers, so they use lossy JPEG at a configured
//! quality. Page images sent to a vision model use lossless PNG: JPEG
//! artefacts around glyph edges degrade transcription.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// JPEG-encode `img` at `quality` (1–100) and return the base64 text.
pub fn encode_jpeg_base64(img: &DynamicImage, quality: u8) -> Result<String, ExtractError> {
    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| ExtractError::Encoding {
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} crop → {} bytes base64",
        rgb.width(),
        rgb.height(),
        b64.len()
    );
    Ok(b64)
}

/// Encode a page raster as a base64 PNG ready for a vision-LLM request.
///
/// `detail: "high"` asks tile-based models to read the page at full resolution.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::Encoding {
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 12, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn jpeg_crop_decodes_back_to_same_size() {
        let b64 = encode_jpeg_base64(&red_square(), 85).expect("encode should succeed");
        let bytes = STANDARD.decode(&b64).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8])
        }));
        let high = encode_jpeg_base64(&img, 95).unwrap();
        let low = encode_jpeg_base64(&img, 10).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn page_is_png_image_data() {
        let data = encode_page(&red_square()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
