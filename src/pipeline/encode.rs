//! Image encoding for OCR backends.
//!
//! Tesseract reads a PNG file from disk, the Paddle serving endpoint takes
//! the same bytes base64-wrapped in JSON. PNG keeps glyph edges intact;
//! JPEG artefacts around small print cost recognition accuracy.

use crate::error::AnalyzerError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, AnalyzerError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| AnalyzerError::extraction_with("could not encode page image as PNG", e))?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Encode a rasterised page as base64 PNG.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, AnalyzerError> {
    Ok(STANDARD.encode(encode_png(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn png_has_signature() {
        let bytes = encode_png(&red_square()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn base64_decodes_to_png() {
        let b64 = encode_png_base64(&red_square()).unwrap();
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
