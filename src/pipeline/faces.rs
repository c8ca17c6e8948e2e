//! Face photo extraction: detect, pad, clamp, crop, encode.
//!
//! Detectors return tight boxes around the face itself. ID-card and badge
//! photos look better with hair and chin included, so every box is grown by
//! `padding_ratio` of its own size on each side and then clamped to the
//! raster so the crop never reads outside the image.

use crate::capabilities::{FaceBox, FaceDetector};
use crate::config::FACE_DETECTION_PARAMS;
use crate::error::ExtractError;
use crate::output::{CropBox, FaceCrop};
use crate::pipeline::encode::encode_jpeg_base64;
use image::DynamicImage;
use tracing::{info, warn};

/// Grow `face` by `padding_ratio` on every side and clamp it to `width × height`.
///
/// Padding rounds to the nearest pixel, exact halves to the even neighbour,
/// the same rule confidences use.
///
/// Returns `None` when nothing of the box survives clamping (a detector
/// reporting a box entirely outside the raster).
pub fn padded_crop_box(
    face: FaceBox,
    padding_ratio: f64,
    width: u32,
    height: u32,
) -> Option<CropBox> {
    let pad_w = (face.width as f64 * padding_ratio).round_ties_even() as u64;
    let pad_h = (face.height as f64 * padding_ratio).round_ties_even() as u64;

    let (x, y) = (face.x as u64, face.y as u64);
    let x1 = x.saturating_sub(pad_w);
    let y1 = y.saturating_sub(pad_h);
    let x2 = (x + face.width as u64 + pad_w).min(width as u64);
    let y2 = (y + face.height as u64 + pad_h).min(height as u64);

    if x1 >= x2 || y1 >= y2 {
        return None;
    }

    Some(CropBox {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}

/// Detect faces on `image` and return one encoded crop per face, in detection order.
///
/// `page` is the 1-based page number for PDFs and `None` for plain images.
/// The input raster is only read. An image without faces yields an empty list.
pub fn extract_faces(
    detector: &dyn FaceDetector,
    image: &DynamicImage,
    page: Option<usize>,
    padding_ratio: f64,
    jpeg_quality: u8,
) -> Result<Vec<FaceCrop>, ExtractError> {
    let gray = image.to_luma8();
    let faces = detector.detect(&gray, &FACE_DETECTION_PARAMS);
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    let (width, height) = (image.width(), image.height());
    let mut crops = Vec::with_capacity(faces.len());

    for face in faces {
        let Some(bbox) = padded_crop_box(face, padding_ratio, width, height) else {
            warn!(
                "Ignoring face box {:?} outside {}x{} raster",
                face, width, height
            );
            continue;
        };

        let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
        crops.push(FaceCrop {
            image_base64: encode_jpeg_base64(&crop, jpeg_quality)?,
            page,
            bbox,
            image_width: bbox.width,
            image_height: bbox.height,
        });
    }

    info!(
        "Detected {} face(s) on {}",
        crops.len(),
        page.map(|p| format!("page {p}"))
            .unwrap_or_else(|| "image".to_string())
    );

    Ok(crops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionParams;
    use image::{GrayImage, Rgb, RgbImage};
    use std::sync::Mutex;

    fn face(x: u32, y: u32, w: u32, h: u32) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn padding_expands_symmetrically() {
        let b = padded_crop_box(face(100, 100, 40, 60), 0.35, 1000, 1000).unwrap();
        // pad_w = round(14.0) = 14, pad_h = round(21.0) = 21
        assert_eq!(
            b,
            CropBox {
                x: 86,
                y: 79,
                width: 68,
                height: 102
            }
        );
    }

    #[test]
    fn padding_rounds_to_nearest_pixel() {
        // 0.25 * 30 = 7.5 → 8
        let b = padded_crop_box(face(50, 50, 30, 30), 0.25, 500, 500).unwrap();
        assert_eq!(b.x, 42);
        assert_eq!(b.width, 46);
    }

    #[test]
    fn padding_halves_round_to_even() {
        // 0.25 * 10 = 2.5 → 2, 0.25 * 14 = 3.5 → 4
        let b = padded_crop_box(face(50, 50, 10, 14), 0.25, 500, 500).unwrap();
        assert_eq!((b.x, b.width), (48, 14));
        assert_eq!((b.y, b.height), (46, 22));
    }

    #[test]
    fn clamps_at_top_left_corner() {
        let b = padded_crop_box(face(5, 3, 40, 40), 0.35, 200, 200).unwrap();
        assert_eq!((b.x, b.y), (0, 0));
        assert_eq!(b.width, 5 + 40 + 14);
        assert_eq!(b.height, 3 + 40 + 14);
    }

    #[test]
    fn clamps_at_bottom_right_corner() {
        let b = padded_crop_box(face(170, 180, 30, 20), 0.5, 200, 200).unwrap();
        assert_eq!(b.x + b.width, 200);
        assert_eq!(b.y + b.height, 200);
    }

    #[test]
    fn crop_always_inside_raster() {
        let (w, h) = (321u32, 123u32);
        for x in (0..w + 20).step_by(17) {
            for y in (0..h + 20).step_by(13) {
                for size in [1u32, 30, 80, 400] {
                    if let Some(b) = padded_crop_box(face(x, y, size, size), 0.35, w, h) {
                        assert!(b.width > 0 && b.height > 0);
                        assert!(b.x + b.width <= w, "{b:?}");
                        assert!(b.y + b.height <= h, "{b:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn box_outside_raster_is_dropped() {
        assert_eq!(padded_crop_box(face(500, 10, 20, 20), 0.0, 100, 100), None);
    }

    struct FixedDetector {
        boxes: Vec<FaceBox>,
        seen: Mutex<Option<(u32, u32, DetectionParams)>>,
    }

    impl FaceDetector for FixedDetector {
        fn detect(&self, gray: &GrayImage, params: &DetectionParams) -> Vec<FaceBox> {
            *self.seen.lock().unwrap() = Some((gray.width(), gray.height(), *params));
            self.boxes.clone()
        }
    }

    fn page_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn extracts_one_crop_per_face_in_order() {
        let detector = FixedDetector {
            boxes: vec![face(10, 10, 40, 40), face(200, 100, 60, 60)],
            seen: Mutex::new(None),
        };
        let img = page_image();
        let before = img.to_rgb8().into_raw();

        let crops = extract_faces(&detector, &img, Some(2), 0.35, 85).unwrap();

        assert_eq!(crops.len(), 2);
        assert_eq!(crops[0].bbox.x, 0);
        assert_eq!(crops[1].bbox.x, 179);
        assert!(crops.iter().all(|c| c.page == Some(2)));
        assert_eq!(crops[1].image_width, crops[1].bbox.width);
        assert!(!crops[0].image_base64.is_empty());

        let seen = *detector.seen.lock().unwrap();
        let (gw, gh, params) = seen.expect("detector was called");
        assert_eq!((gw, gh), (300, 200));
        assert_eq!(params, FACE_DETECTION_PARAMS);
        // Source raster untouched.
        assert_eq!(img.to_rgb8().into_raw(), before);
    }

    #[test]
    fn no_faces_is_empty_not_error() {
        let detector = FixedDetector {
            boxes: Vec::new(),
            seen: Mutex::new(None),
        };
        let crops = extract_faces(&detector, &page_image(), None, 0.35, 85).unwrap();
        assert!(crops.is_empty());
    }
}
