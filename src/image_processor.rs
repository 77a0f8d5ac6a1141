//! # Image Processing Module
//!
//! Questo modulo implementa la strategia locale: decodifica in memoria e
//! re-encode ottimizzato con la libreria `image`.
//!
//! ## Pipeline
//!
//! 1. **Rilevamento formato**: Estensione del nome file (case-insensitive),
//!    `jpg` è un alias di JPEG
//! 2. **Decodifica**: Il formato in input è rilevato dal contenuto, non dal nome
//! 3. **Re-encode**: Nuovo buffer in memoria con le impostazioni più compatte
//!    per il formato di output; i metadati (EXIF, ICC, commenti) non vengono
//!    copiati
//!
//! ## Encoder per formato
//!
//! | Formato | Impostazioni |
//! |---------|--------------|
//! | JPEG    | `config.jpeg_quality` (default 75), RGB o grayscale |
//! | PNG     | Compressione `Best`, filtro `Adaptive` |
//! | Altri   | Encoder generico della libreria |
//!
//! Gli errori di decodifica/encode vengono propagati, nessun fallback.

use crate::error::OptimizeError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use tracing::debug;

/// Extension of `name` after the last dot, lowercased
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

/// Output format implied by the file name.
pub fn output_format(name: &str) -> Result<ImageFormat, OptimizeError> {
    let ext = extension_of(name)
        .ok_or_else(|| OptimizeError::UnsupportedFormat(format!("{} has no extension", name)))?;

    match ext.as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        "bmp" => Ok(ImageFormat::Bmp),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        _ => Err(OptimizeError::UnsupportedFormat(ext.to_uppercase())),
    }
}

/// Decode `data` and encode it again as `format`.
pub fn reencode(data: &[u8], format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let image = image::load_from_memory(data)?;
    debug!(
        "Decoded {}x{} {:?} image for {:?} re-encode",
        image.width(),
        image.height(),
        image.color(),
        format
    );
    encode(&image, format, jpeg_quality)
}

/// Encode a decoded image with the optimizing settings for `format`.
pub fn encode(image: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let mut cursor = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, jpeg_quality);
            let (width, height) = (image.width(), image.height());
            // JPEG has no alpha channel
            match image.color() {
                ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                    let luma = image.to_luma8();
                    encoder.encode(luma.as_raw(), width, height, ColorType::L8)?;
                }
                _ => {
                    let rgb = image.to_rgb8();
                    encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb8)?;
                }
            }
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut cursor,
                CompressionType::Best,
                FilterType::Adaptive,
            );
            encoder.write_image(image.as_bytes(), image.width(), image.height(), image.color())?;
        }
        other => {
            image.write_to(&mut cursor, ImageOutputFormat::from(other))?;
        }
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    /// Small gradient PNG written with fast, unfiltered settings
    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut cursor = Cursor::new(Vec::new());
        PngEncoder::new_with_quality(&mut cursor, CompressionType::Fast, FilterType::NoFilter)
            .write_image(image.as_raw(), width, height, ColorType::Rgb8)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_output_format_aliases() {
        assert_eq!(output_format("photo.jpg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(output_format("PHOTO.JPG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(output_format("photo.Jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(output_format("logo.PNG").unwrap(), ImageFormat::Png);
        assert_eq!(output_format("archive.tar.gif").unwrap(), ImageFormat::Gif);
        assert_eq!(output_format("scan.tif").unwrap(), ImageFormat::Tiff);
    }

    #[test]
    fn test_output_format_unsupported() {
        assert!(matches!(
            output_format("notes.txt"),
            Err(OptimizeError::UnsupportedFormat(ext)) if ext == "TXT"
        ));
        assert!(output_format("README").is_err());
        assert!(output_format("trailing.").is_err());
    }

    #[test]
    fn test_reencode_png_to_jpeg() {
        let png = sample_png(32, 24);
        let jpeg = reencode(&png, ImageFormat::Jpeg, 75).unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_reencode_png_is_smaller() {
        let png = sample_png(64, 64);
        let optimized = reencode(&png, ImageFormat::Png, 75).unwrap();

        assert!(optimized.len() < png.len());
        let before = image::load_from_memory(&png).unwrap().to_rgb8();
        let after = image::load_from_memory(&optimized).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn test_alpha_dropped_for_jpeg() {
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128]));
        let jpeg = encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Jpeg, 90).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_corrupt_data_is_an_error() {
        let result = reencode(b"definitely not an image", ImageFormat::Png, 75);
        assert!(matches!(result, Err(OptimizeError::Image(_))));
    }
}
