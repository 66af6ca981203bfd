//! Page image encoding for the OCR engines.
//!
//! Both engines take PNG: Tesseract reads it from a temp file, the vision
//! engine receives it base64-wrapped in an `ImageData`. PNG is lossless,
//! and JPEG artefacts around small glyphs cost recognition accuracy on the
//! dense grade tables transcripts are made of.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG-encode a page image.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Greyscale copy for Tesseract; colour backgrounds on transcript rows
/// confuse its binarisation.
pub fn for_tesseract(img: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(img.to_luma8())
}

/// Encode a page as a base64 PNG attachment for a vision model.
///
/// `detail: "high"` keeps the model from downscaling the page to a single
/// tile, which loses the small print of credit and grade columns.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(png_bytes(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let data = encode_page(&red_square()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }

    #[test]
    fn tesseract_copy_is_greyscale_same_size() {
        let grey = for_tesseract(&red_square());
        assert!(matches!(grey, DynamicImage::ImageLuma8(_)));
        assert_eq!((grey.width(), grey.height()), (10, 10));
    }
}
