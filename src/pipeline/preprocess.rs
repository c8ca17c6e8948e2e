//! Decode uploaded images and downscale oversized rasters before recognition.
//!
//! Recognition cost grows with pixel count while accuracy stops improving
//! well before phone-camera resolutions, so anything with an edge above
//! `max_dimension` is shrunk with Lanczos resampling. Smaller images pass
//! through untouched; nothing is ever upsampled.

use crate::error::ExtractError;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Decode JPEG/PNG/WEBP bytes on the blocking pool.
///
/// The format is sniffed from the bytes, not taken from the declared MIME type.
pub async fn decode_image(bytes: Vec<u8>) -> Result<DynamicImage, ExtractError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| ExtractError::Internal(format!("Decode task panicked: {}", e)))?
        .map_err(|e| ExtractError::rasterization(format!("cannot decode image: {}", e)))
}

/// Target dimensions for an image of `width × height`, or `None` if it already fits.
///
/// Both edges are scaled by `min(max/width, max/height)`, so the longest edge
/// lands on `max_dimension` and the aspect ratio is kept to within a pixel.
pub fn target_size(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }
    let max = max_dimension as f64;
    let ratio = (max / width as f64).min(max / height as f64);
    let new_w = ((width as f64 * ratio).round() as u32).clamp(1, max_dimension);
    let new_h = ((height as f64 * ratio).round() as u32).clamp(1, max_dimension);
    Some((new_w, new_h))
}

/// Shrink `image` so neither edge exceeds `max_dimension`.
pub fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    match target_size(width, height, max_dimension) {
        Some((new_w, new_h)) => {
            debug!("Downscaling {}x{} → {}x{}", width, height, new_w, new_h);
            image.resize_exact(new_w, new_h, FilterType::Lanczos3)
        }
        None => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])))
    }

    #[test]
    fn small_image_is_returned_unchanged() {
        let img = solid(640, 480);
        let before = img.to_rgb8().into_raw();
        let out = downscale(img, 2000);
        assert_eq!((out.width(), out.height()), (640, 480));
        assert_eq!(out.to_rgb8().into_raw(), before);
    }

    #[test]
    fn exactly_at_limit_is_not_resized() {
        assert_eq!(target_size(2000, 2000, 2000), None);
        assert_eq!(target_size(2000, 1, 2000), None);
    }

    #[test]
    fn landscape_longest_edge_hits_limit() {
        assert_eq!(target_size(4000, 3000, 2000), Some((2000, 1500)));
    }

    #[test]
    fn portrait_longest_edge_hits_limit() {
        let (w, h) = target_size(2480, 3508, 2000).unwrap();
        assert_eq!(h, 2000);
        // 2480 * 2000 / 3508 = 1413.9
        assert_eq!(w, 1414);
    }

    #[test]
    fn aspect_ratio_preserved_within_a_pixel() {
        for &(w, h) in &[(3001, 2001), (2001, 7), (9999, 4321), (2500, 2500)] {
            let (nw, nh) = target_size(w, h, 2000).unwrap();
            assert_eq!(nw.max(nh), 2000, "{w}x{h}");
            let expected_h = h as f64 * nw as f64 / w as f64;
            assert!(
                (nh as f64 - expected_h).abs() <= 1.0,
                "{w}x{h} → {nw}x{nh}"
            );
        }
    }

    #[test]
    fn extreme_aspect_never_collapses_to_zero() {
        assert_eq!(target_size(100_000, 10, 2000), Some((2000, 1)));
    }

    #[test]
    fn downscale_resizes_large_raster() {
        let out = downscale(solid(2400, 1200), 2000);
        assert_eq!((out.width(), out.height()), (2000, 1000));
    }

    #[tokio::test]
    async fn decode_round_trips_png() {
        let mut buf = Vec::new();
        solid(7, 5)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let img = decode_image(buf).await.unwrap();
        assert_eq!((img.width(), img.height()), (7, 5));
    }

    #[tokio::test]
    async fn decode_rejects_garbage() {
        let err = decode_image(b"not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Rasterization { .. }));
    }
}
