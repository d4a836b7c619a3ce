use image::{GenericImageView, ImageFormat};
use rand::RngCore;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Stored images never exceed this bounding box on either side.
pub const MAX_THUMB_DIM: u32 = 125;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unreadable image upload")]
    Unreadable(#[source] image::ImageError),
    #[error("failed to store image")]
    Store(#[source] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Decode an uploaded image, downsize it to the thumbnail bounding box
/// (aspect ratio preserved, never upscaled), and write it into `dir` under a
/// random hexadecimal name. Returns the stored filename.
///
/// Nothing is written unless the payload decodes: a caller that gets an
/// error back can safely assume no file exists to reference.
pub fn ingest(data: &[u8], dir: &Path) -> Result<String, IntakeError> {
    let format = image::guess_format(data).map_err(IntakeError::Unreadable)?;
    let img = image::load_from_memory_with_format(data, format).map_err(IntakeError::Unreadable)?;

    let thumb = if img.width() > MAX_THUMB_DIM || img.height() > MAX_THUMB_DIM {
        img.thumbnail(MAX_THUMB_DIM, MAX_THUMB_DIM)
    } else {
        img
    };

    let (out_format, ext) = output_format(format);
    let filename = format!("{}.{}", random_hex(), ext);

    std::fs::create_dir_all(dir)?;
    thumb
        .save_with_format(dir.join(&filename), out_format)
        .map_err(IntakeError::Store)?;

    debug!(%filename, width = thumb.width(), height = thumb.height(), "image stored");
    Ok(filename)
}

/// Formats we re-encode as-is; anything else is normalized to PNG.
fn output_format(input: ImageFormat) -> (ImageFormat, &'static str) {
    match input {
        ImageFormat::Jpeg => (ImageFormat::Jpeg, "jpg"),
        ImageFormat::Png => (ImageFormat::Png, "png"),
        ImageFormat::Gif => (ImageFormat::Gif, "gif"),
        ImageFormat::WebP => (ImageFormat::WebP, "webp"),
        ImageFormat::Bmp => (ImageFormat::Bmp, "bmp"),
        _ => (ImageFormat::Png, "png"),
    }
}

/// 64 bits of randomness, 16 hex chars. Collisions in one upload directory
/// are not a practical concern at this namespace size.
fn random_hex() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("forkful-intake-{}", uuid::Uuid::new_v4()))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode test image");
        buf
    }

    #[test]
    fn large_input_is_bounded_to_the_thumbnail_box() {
        let dir = temp_dir();
        let filename = ingest(&png_bytes(4000, 3000), &dir).expect("ingest");

        let stored = image::open(dir.join(&filename)).expect("stored file decodes");
        assert_eq!(stored.width().max(stored.height()), MAX_THUMB_DIM);
        assert!(stored.width() <= MAX_THUMB_DIM && stored.height() <= MAX_THUMB_DIM);
        // 4:3 input keeps its shape.
        assert_eq!(stored.width(), 125);
        assert!((93..=94).contains(&stored.height()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn small_input_is_not_upscaled() {
        let dir = temp_dir();
        let filename = ingest(&png_bytes(50, 40), &dir).expect("ingest");

        let stored = image::open(dir.join(&filename)).expect("stored file decodes");
        assert_eq!((stored.width(), stored.height()), (50, 40));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn extension_follows_the_detected_format() {
        let dir = temp_dir();
        let filename = ingest(&png_bytes(10, 10), &dir).expect("ingest");
        assert!(filename.ends_with(".png"));
        assert_eq!(filename.len(), "0123456789abcdef.png".len());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn garbage_input_fails_and_writes_nothing() {
        let dir = temp_dir();
        let err = ingest(b"definitely not an image", &dir).unwrap_err();
        assert!(matches!(err, IntakeError::Unreadable(_)));
        assert!(!dir.exists());
    }

    #[test]
    fn names_do_not_collide_in_practice() {
        let a = random_hex();
        let b = random_hex();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
