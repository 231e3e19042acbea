//! Image encoding: rendered region → PNG bytes.
//!
//! PNG is chosen over JPEG because it is lossless; chart labels and thin
//! rules survive intact, and re-encoding the same pixels always yields the
//! same bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

pub const PNG_MIME: &str = "image/png";

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Shrink `img` so its longest edge is at most `max_dim`, keeping the
/// aspect ratio. Smaller images are returned unchanged.
pub fn downscale(img: DynamicImage, max_dim: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_dim {
        return img;
    }
    img.resize(max_dim, max_dim, FilterType::Lanczos3)
}

/// `data:<mime>;base64,<payload>`.
pub fn data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let bytes = encode_png(&solid(10, 10)).expect("encode should succeed");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (10, 10));
    }

    #[test]
    fn encoding_is_deterministic() {
        let img = solid(33, 17);
        assert_eq!(encode_png(&img).unwrap(), encode_png(&img).unwrap());
    }

    #[test]
    fn downscale_keeps_aspect_ratio() {
        let out = downscale(solid(400, 200), 100);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn downscale_leaves_small_images_alone() {
        let out = downscale(solid(40, 20), 100);
        assert_eq!((out.width(), out.height()), (40, 20));
    }

    #[test]
    fn data_uri_has_prefix() {
        assert_eq!(data_uri(&[1, 2, 3], PNG_MIME), "data:image/png;base64,AQID");
    }
}
