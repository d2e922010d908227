use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::models::photo::{PhotoKind, StoredPhoto};

/// Largest photo blob stored in the database.
pub const PHOTO_BYTE_BUDGET: usize = 1_048_576;

pub const THUMB_WIDTH: u32 = 120;
pub const THUMB_HEIGHT: u32 = 160;

/// JPEG qualities tried, in order, before any downscaling.
const QUALITY_STEPS: [u8; 6] = [85, 75, 65, 55, 45, 35];
const DOWNSCALE_RATIO: f32 = 0.8;
const MAX_DOWNSCALES: u32 = 8;

/// Bytes ready to persist, with the MIME type that describes them.
#[derive(Debug, Clone)]
pub struct FittedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub reencoded: bool,
}

/// Result of running an upload through the pipeline
#[derive(Debug)]
pub struct ProcessedPhoto {
    pub photo_id: i64,
    pub byte_len: usize,
    pub thumb_path: PathBuf,
}

/// Only the declared type is checked; the payload itself is validated
/// later, when it has to be decoded.
pub fn is_image_mime(declared: Option<&str>) -> bool {
    declared
        .map(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Shrink an upload until it fits `budget` bytes.
///
/// Payloads already within budget are returned untouched. Otherwise the image
/// is re-encoded as JPEG at decreasing quality, then repeatedly downscaled at
/// the lowest quality. Fails once the retry budget is spent.
pub fn fit_to_budget(bytes: &[u8], declared_mime: &str, budget: usize) -> Result<FittedImage, String> {
    if bytes.len() <= budget {
        return Ok(FittedImage {
            bytes: bytes.to_vec(),
            mime: declared_mime.to_string(),
            reencoded: false,
        });
    }

    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;

    for quality in QUALITY_STEPS {
        let encoded = encode_jpeg(&img, quality)?;
        log::debug!("quality {} -> {} bytes", quality, encoded.len());
        if encoded.len() <= budget {
            return Ok(jpeg(encoded));
        }
    }

    let lowest = QUALITY_STEPS[QUALITY_STEPS.len() - 1];
    let mut current = img;
    for attempt in 1..=MAX_DOWNSCALES {
        let (w, h) = current.dimensions();
        let nw = ((w as f32 * DOWNSCALE_RATIO).round() as u32).max(1);
        let nh = ((h as f32 * DOWNSCALE_RATIO).round() as u32).max(1);
        current = current.resize_exact(nw, nh, FilterType::Triangle);

        let encoded = encode_jpeg(&current, lowest)?;
        log::debug!("downscale {} to {}x{} -> {} bytes", attempt, nw, nh, encoded.len());
        if encoded.len() <= budget {
            return Ok(jpeg(encoded));
        }
    }

    Err(format!(
        "image does not fit {} bytes after {} downscales",
        budget, MAX_DOWNSCALES
    ))
}

fn jpeg(bytes: Vec<u8>) -> FittedImage {
    FittedImage {
        bytes,
        mime: "image/jpeg".to_string(),
        reencoded: true,
    }
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb).map_err(|e| e.to_string())?;
    Ok(buf)
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(cursor.into_inner())
}

/// Fixed-size, centre-cropped JPEG thumbnail.
pub fn make_thumbnail(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let thumb = img.resize_to_fill(THUMB_WIDTH, THUMB_HEIGHT, FilterType::Lanczos3);
    encode_jpeg(&thumb, 85)
}

pub fn thumb_path(thumb_dir: &str, kind: PhotoKind, member_no: i64) -> PathBuf {
    Path::new(thumb_dir).join(kind.thumb_name(member_no))
}

/// Public URL of a thumbnail, or an empty string when none was generated yet.
pub fn thumb_url(config: &AppConfig, kind: PhotoKind, member_no: i64) -> String {
    if thumb_path(&config.thumb_dir, kind, member_no).is_file() {
        config.url(&format!("thumbs/{}", kind.thumb_name(member_no)))
    } else {
        String::new()
    }
}

/// Fit an upload to the byte budget, store it as the newest photo of its
/// kind, and overwrite the member's thumbnail on disk.
pub fn process_member_upload(
    pool: &DbPool,
    thumb_dir: &str,
    kind: PhotoKind,
    member_no: i64,
    bytes: &[u8],
    declared_mime: &str,
) -> Result<ProcessedPhoto, String> {
    let fitted = fit_to_budget(bytes, declared_mime, PHOTO_BYTE_BUDGET)?;
    // Decode before persisting so an unreadable payload leaves no row behind
    let thumb = make_thumbnail(&fitted.bytes)?;

    let photo_id = StoredPhoto::insert(pool, kind, member_no, &fitted.mime, &fitted.bytes)?;

    fs::create_dir_all(thumb_dir).map_err(|e| e.to_string())?;
    let path = thumb_path(thumb_dir, kind, member_no);
    fs::write(&path, &thumb).map_err(|e| e.to_string())?;

    log::info!(
        "stored {} for member {}: {} bytes (re-encoded: {}), thumbnail {}",
        kind.as_str(),
        member_no,
        fitted.bytes.len(),
        fitted.reencoded,
        path.display()
    );

    Ok(ProcessedPhoto {
        photo_id,
        byte_len: fitted.bytes.len(),
        thumb_path: path,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Deterministic noise; compresses badly, which is what these tests need.
    pub(crate) fn noise_png(w: u32, h: u32) -> Vec<u8> {
        let mut seed: u32 = 0x1234_5678;
        let img = RgbImage::from_fn(w, h, |_, _| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let b = seed.to_be_bytes();
            Rgb([b[0], b[1], b[2]])
        });
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn mime_prefix_check() {
        assert!(is_image_mime(Some("image/png")));
        assert!(is_image_mime(Some("IMAGE/JPEG")));
        assert!(!is_image_mime(Some("application/pdf")));
        assert!(!is_image_mime(Some("text/image")));
        assert!(!is_image_mime(None));
    }

    #[test]
    fn within_budget_is_untouched() {
        let png = noise_png(16, 16);
        let fitted = fit_to_budget(&png, "image/png", PHOTO_BYTE_BUDGET).unwrap();
        assert!(!fitted.reencoded);
        assert_eq!(fitted.bytes, png);
        assert_eq!(fitted.mime, "image/png");
    }

    #[test]
    fn oversized_upload_is_brought_under_budget() {
        let png = noise_png(300, 300);
        let budget = 40_000;
        assert!(png.len() > budget);

        let fitted = fit_to_budget(&png, "image/png", budget).unwrap();
        assert!(fitted.reencoded);
        assert!(fitted.bytes.len() <= budget);
        assert_eq!(fitted.mime, "image/jpeg");

        let decoded = image::load_from_memory(&fitted.bytes).unwrap();
        let (w, h) = decoded.dimensions();
        assert!(w > 0 && w <= 300);
        assert_eq!(w, h);
    }

    #[test]
    fn impossible_budget_fails() {
        let png = noise_png(200, 200);
        assert!(fit_to_budget(&png, "image/png", 10).is_err());
    }

    #[test]
    fn garbage_over_budget_fails_to_decode() {
        let junk = vec![0xABu8; 2048];
        assert!(fit_to_budget(&junk, "image/png", 1024).is_err());
    }

    #[test]
    fn thumbnail_has_fixed_size() {
        let png = noise_png(640, 480);
        let thumb = make_thumbnail(&png).unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.dimensions(), (THUMB_WIDTH, THUMB_HEIGHT));
    }

    #[test]
    fn thumb_paths_are_keyed_by_kind_and_member() {
        assert_eq!(
            thumb_path("thumbs", PhotoKind::Namecard, 42),
            Path::new("thumbs").join("namecard_42.jpg")
        );
        assert_eq!(PhotoKind::Spouse.thumb_name(7), "spouse_7.jpg");
    }
}
