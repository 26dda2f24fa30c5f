//! PNG export of composited frames.

use crate::AppResult;

/// Encode straight RGBA8 pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba_data)?;
    }

    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&[255, 0, 0, 255].repeat(4), 2, 2).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let err = encode_png(&[0; 4], 2, 2).unwrap_err();
        assert!(matches!(err, AppError::Png(_)));
    }
}
