//! Raster image codec: sniff, decode, redraw and re-encode.
//!
//! The format is always sniffed from the content. A file named `photo.png`
//! that actually holds JPEG bytes decodes fine; a file holding neither
//! fails with [`RouteError::Decode`].

use crate::config::TargetFormat;
use crate::error::{RouteError, Stage};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Decode `bytes` as an image, trusting only the content's magic number.
pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage, RouteError> {
    let format = image::guess_format(bytes).map_err(|e| RouteError::Decode {
        file: name.to_string(),
        detail: e.to_string(),
    })?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        RouteError::Decode {
            file: name.to_string(),
            detail: e.to_string(),
        }
    })?;
    debug!(
        "Decoded '{}' as {:?}: {}x{} px",
        name,
        format,
        img.width(),
        img.height()
    );
    Ok(img)
}

/// Copy the image onto a fresh RGBA surface of identical dimensions.
pub fn redraw(img: &DynamicImage) -> RgbaImage {
    let mut surface = RgbaImage::new(img.width(), img.height());
    image::imageops::replace(&mut surface, &img.to_rgba8(), 0, 0);
    surface
}

/// Encode a surface as PNG (lossless).
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    surface.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a surface as baseline JPEG. Alpha is dropped.
///
/// `quality` is on the encoder's 1–100 scale.
pub fn encode_jpeg(surface: &RgbaImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)))?;
    Ok(buf)
}

/// Encode an image as a JPEG suitable for a PDF `DCTDecode` XObject.
///
/// Greyscale sources stay single-channel; everything else becomes RGB.
/// Returns the JPEG bytes and whether they are greyscale.
pub fn encode_for_pdf(img: &DynamicImage, quality: u8) -> Result<(Vec<u8>, bool), image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    let grayscale = !img.color().has_color();
    if grayscale {
        img.to_luma8().write_with_encoder(encoder)?;
    } else {
        img.to_rgb8().write_with_encoder(encoder)?;
    }
    Ok((buf, grayscale))
}

/// Decode `bytes` and re-encode them as `target` at the same dimensions.
///
/// `target` must be a raster format; other targets are a caller bug and
/// surface as an encode-stage error.
pub fn transcode(
    name: &str,
    bytes: &[u8],
    target: TargetFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, RouteError> {
    let img = decode(name, bytes)?;
    let surface = redraw(&img);

    let encoded = match target {
        TargetFormat::Png => encode_png(&surface),
        TargetFormat::Jpeg => encode_jpeg(&surface, jpeg_quality),
        other => {
            return Err(RouteError::Conversion {
                file: name.to_string(),
                stage: Stage::Encode,
                detail: format!("'{other}' is not a raster format"),
            })
        }
    }
    .map_err(|e| RouteError::Conversion {
        file: name.to_string(),
        stage: Stage::Encode,
        detail: e.to_string(),
    })?;

    debug!(
        "Encoded '{}' → {} ({} bytes)",
        name,
        target,
        encoded.len()
    );
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn sample(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7) as u8, (y * 5) as u8, 128, 255]))
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        encode_png(&sample(w, h)).unwrap()
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let original = sample(100, 50);
        let bytes = encode_png(&original).unwrap();
        let back = decode("a.png", &bytes).unwrap();
        assert_eq!(back.dimensions(), (100, 50));
        assert_eq!(back.to_rgba8(), original);
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let bytes = transcode("a.png", &png_bytes(100, 50), TargetFormat::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let back = decode("a_GR.jpeg", &bytes).unwrap();
        assert_eq!(back.dimensions(), (100, 50));
    }

    #[test]
    fn transcode_is_deterministic() {
        let src = png_bytes(40, 30);
        let a = transcode("x.png", &src, TargetFormat::Jpeg, 75).unwrap();
        let b = transcode("x.png", &src, TargetFormat::Jpeg, 75).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lower_quality_gives_smaller_jpeg() {
        let src = png_bytes(200, 200);
        let hi = transcode("x.png", &src, TargetFormat::Jpeg, 100).unwrap();
        let lo = transcode("x.png", &src, TargetFormat::Jpeg, 10).unwrap();
        assert!(lo.len() < hi.len(), "lo={} hi={}", lo.len(), hi.len());
    }

    #[test]
    fn format_is_sniffed_not_trusted() {
        // JPEG bytes under a .png name still decode.
        let jpeg = encode_jpeg(&sample(10, 10), 90).unwrap();
        let out = transcode("liar.png", &jpeg, TargetFormat::Png, 90).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode("bad.png", b"definitely not an image").unwrap_err();
        assert!(matches!(err, RouteError::Decode { ref file, .. } if file == "bad.png"));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let mut bytes = png_bytes(20, 20);
        bytes.truncate(40);
        assert!(matches!(
            decode("cut.png", &bytes),
            Err(RouteError::Decode { .. })
        ));
    }

    #[test]
    fn pdf_embedding_keeps_greyscale_single_channel() {
        let grey = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(8, 8, image::Luma([90])));
        let (bytes, is_grey) = encode_for_pdf(&grey, 90).unwrap();
        assert!(is_grey);
        assert_eq!(decode("g.jpeg", &bytes).unwrap().color(), image::ColorType::L8);

        let colour = DynamicImage::ImageRgba8(sample(8, 8));
        let (_, is_grey) = encode_for_pdf(&colour, 90).unwrap();
        assert!(!is_grey);
    }

    #[test]
    fn non_raster_target_is_rejected() {
        let err = transcode("a.png", &png_bytes(2, 2), TargetFormat::Pdf, 90).unwrap_err();
        assert!(matches!(
            err,
            RouteError::Conversion {
                stage: Stage::Encode,
                ..
            }
        ));
    }
}
