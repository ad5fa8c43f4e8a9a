//! Image loading and PNG encoding with size limits.
//!
//! Dimensions are read from the header first so oversized images are rejected
//! before a full decode allocates the pixel buffer.

use image::{ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::core::config::ImageConfig;
use crate::domains::tools::ToolError;

/// Read an image file and convert it to 8-bit RGBA.
pub fn load_rgba(path: &Path, config: &ImageConfig) -> Result<RgbaImage, ToolError> {
    let bytes = std::fs::read(path)?;
    decode_rgba(&bytes, config)
}

/// Decode in-memory image bytes to 8-bit RGBA.
pub fn decode_rgba(bytes: &[u8], config: &ImageConfig) -> Result<RgbaImage, ToolError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ToolError::decode(format!("cannot detect image format: {}", e)))?
        .into_dimensions()
        .map_err(|e| ToolError::decode(format!("cannot read image dimensions: {}", e)))?;

    check_pixel_limit(width, height, config)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ToolError::decode(e.to_string()))?;

    debug!("Decoded {}x{} image", width, height);
    Ok(decoded.to_rgba8())
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ToolError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ToolError::encode(e.to_string()))?;
    Ok(bytes)
}

fn check_pixel_limit(width: u32, height: u32, config: &ImageConfig) -> Result<(), ToolError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 {
        return Err(ToolError::decode("image has no pixels"));
    }
    if pixels > config.max_pixels {
        return Err(ToolError::resource_limit(format!(
            "image has {} pixels (limit: {})",
            pixels, config.max_pixels
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_round_trip_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 1, Rgba([10, 20, 30, 0]));

        let png = encode_png(&img).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = decode_rgba(&png, &ImageConfig::default()).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn test_pixel_limit_rejects_before_decode() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let png = encode_png(&img).unwrap();

        let config = ImageConfig { max_pixels: 50 };
        let err = decode_rgba(&png, &config).unwrap_err();
        assert!(matches!(err, ToolError::ResourceLimit(_)));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = decode_rgba(b"definitely not an image", &ImageConfig::default()).unwrap_err();
        assert!(matches!(err, ToolError::Decode(_)));
    }
}
