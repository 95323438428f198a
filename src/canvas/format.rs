//! Image file formats and the load/save plumbing behind them.
//!
//! Writers encode into memory first and then land the bytes with a
//! temp-file-and-rename, so a failed write never leaves a truncated image at
//! the destination path. PNG output carries a capture's context data as text
//! chunks, one per key.

use image::error::{DecodingError, EncodingError, ImageFormatHint};
use image::{DynamicImage, ImageError, ImageFormat, ImageOutputFormat, RgbaImage};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use super::types::{CanvasError, CanvasResult};
use crate::report::ContextData;
use crate::utils::write_atomically;

/// Default JPEG quality for space-constrained artifacts
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Longest keyword a PNG text chunk accepts
const MAX_KEYWORD_LEN: usize = 79;

/// Encodes a finished image into file bytes
pub trait ImageWriter: fmt::Debug + Send + Sync {
    /// File extension this writer produces (without the dot)
    fn extension(&self) -> &str;

    /// Encode the image, embedding `metadata` where the format allows it
    fn encode(&self, image: &RgbaImage, metadata: &ContextData) -> Result<Vec<u8>, ImageError>;
}

/// Lossless PNG, the default for goldens
#[derive(Debug, Clone, Copy, Default)]
pub struct PngWriter;

impl ImageWriter for PngWriter {
    fn extension(&self) -> &str {
        "png"
    }

    fn encode(&self, image: &RgbaImage, metadata: &ContextData) -> Result<Vec<u8>, ImageError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, image.width(), image.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            for (keyword, value) in metadata {
                if !is_valid_keyword(keyword) {
                    warn!("PngWriter: skipping context key {:?}, not a valid PNG keyword", keyword);
                    continue;
                }
                let text = text_value(value);
                let added = if is_latin1(&text) {
                    encoder.add_text_chunk(keyword.clone(), text)
                } else {
                    encoder.add_itxt_chunk(keyword.clone(), text)
                };
                added.map_err(png_encoding_error)?;
            }
            let mut writer = encoder.write_header().map_err(png_encoding_error)?;
            writer
                .write_image_data(image.as_raw())
                .map_err(png_encoding_error)?;
            writer.finish().map_err(png_encoding_error)?;
        }
        Ok(bytes)
    }
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) < 0x100)
}

fn is_valid_keyword(keyword: &str) -> bool {
    let len = keyword.chars().count();
    (1..=MAX_KEYWORD_LEN).contains(&len) && is_latin1(keyword)
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn png_encoding_error(err: png::EncodingError) -> ImageError {
    ImageError::Encoding(EncodingError::new(ImageFormatHint::Exact(ImageFormat::Png), err))
}

fn png_decoding_error(err: png::DecodingError) -> ImageError {
    ImageError::Decoding(DecodingError::new(ImageFormatHint::Exact(ImageFormat::Png), err))
}

/// Lossy JPEG; alpha is discarded
#[derive(Debug, Clone, Copy)]
pub struct JpegWriter {
    pub quality: u8,
}

impl Default for JpegWriter {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageWriter for JpegWriter {
    fn extension(&self) -> &str {
        "jpg"
    }

    fn encode(&self, image: &RgbaImage, metadata: &ContextData) -> Result<Vec<u8>, ImageError> {
        if !metadata.is_empty() {
            debug!("JpegWriter: {} context entries not embedded", metadata.len());
        }
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut bytes = Vec::new();
        rgb.write_to(
            &mut Cursor::new(&mut bytes),
            ImageOutputFormat::Jpeg(self.quality.clamp(1, 100)),
        )?;
        Ok(bytes)
    }
}

/// The file format used when saving canvases
#[derive(Debug, Clone)]
pub struct ImageIoFormat {
    writer: Arc<dyn ImageWriter>,
}

impl ImageIoFormat {
    pub fn png() -> Self {
        Self::custom(PngWriter)
    }

    pub fn jpeg(quality: u8) -> Self {
        Self::custom(JpegWriter { quality })
    }

    /// Plug in any writer
    pub fn custom(writer: impl ImageWriter + 'static) -> Self {
        Self {
            writer: Arc::new(writer),
        }
    }

    /// Pick a built-in format by file extension
    pub fn from_extension(extension: &str) -> CanvasResult<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "" | "png" => Ok(Self::png()),
            "jpg" | "jpeg" => Ok(Self::jpeg(DEFAULT_JPEG_QUALITY)),
            other => Err(CanvasError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &str {
        self.writer.extension()
    }

    /// Encode `image` with `metadata` and atomically place it at `path`,
    /// creating parent directories as needed
    pub fn write(&self, path: &Path, image: &RgbaImage, metadata: &ContextData) -> CanvasResult<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CanvasError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }
        let bytes = self
            .writer
            .encode(image, metadata)
            .map_err(|source| CanvasError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        write_atomically(path, &bytes).map_err(|source| CanvasError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ImageIoFormat {
    fn default() -> Self {
        Self::png()
    }
}

/// Decode an image file into RGBA
pub fn load_image(path: &Path) -> CanvasResult<RgbaImage> {
    let data = fs::read(path).map_err(|source| CanvasError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let img = image::load_from_memory(&data).map_err(|source| CanvasError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// Text chunks of a PNG file as `(keyword, text)` pairs in file order.
///
/// Covers the chunks placed before the image data, which is where
/// [`PngWriter`] puts context data.
pub fn read_text_metadata(path: &Path) -> CanvasResult<Vec<(String, String)>> {
    let decode_err = |err| CanvasError::Decode {
        path: path.to_path_buf(),
        source: png_decoding_error(err),
    };
    let data = fs::read(path).map_err(|source| CanvasError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_ignore_text_chunk(false);
    let reader = decoder.read_info().map_err(decode_err)?;
    let info = reader.info();

    let mut entries: Vec<(String, String)> = info
        .uncompressed_latin1_text
        .iter()
        .map(|chunk| (chunk.keyword.clone(), chunk.text.clone()))
        .collect();
    for chunk in &info.compressed_latin1_text {
        entries.push((chunk.keyword.clone(), chunk.get_text().map_err(decode_err)?));
    }
    for chunk in &info.utf8_text {
        entries.push((chunk.keyword.clone(), chunk.get_text().map_err(decode_err)?));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("golden.png");
        let mut img = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 128]));

        ImageIoFormat::png().write(&path, &img, &ContextData::new()).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, img);
    }

    #[test]
    fn test_jpeg_writes_decodable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.jpg");
        let img = RgbaImage::from_pixel(16, 16, Rgba([120, 120, 120, 255]));

        ImageIoFormat::jpeg(70).write(&path, &img, &ContextData::new()).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (16, 16));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ImageIoFormat::from_extension("PNG").unwrap().extension(), "png");
        assert_eq!(ImageIoFormat::from_extension(".jpeg").unwrap().extension(), "jpg");
        assert!(matches!(
            ImageIoFormat::from_extension("tiff"),
            Err(CanvasError::UnsupportedFormat(ext)) if ext == "tiff"
        ));
    }

    #[test]
    fn test_load_corrupt_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();

        match load_image(&path) {
            Err(CanvasError::Decode { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load_image(&dir.path().join("missing.png"));
        assert!(matches!(result, Err(CanvasError::Io { .. })));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        let result = ImageIoFormat::png().write(&path, &RgbaImage::new(0, 5), &ContextData::new());
        assert!(matches!(
            result,
            Err(CanvasError::InvalidDimensions { width: 0, height: 5 })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_into_file_parent_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let img = RgbaImage::new(2, 2);

        let result = ImageIoFormat::png().write(&blocker.join("out.png"), &img, &ContextData::new());
        assert!(matches!(result, Err(CanvasError::Io { .. })));
    }

    #[test]
    fn test_png_carries_context_as_text_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ctx.png");
        let img = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let mut context = ContextData::new();
        context.insert("device".to_string(), serde_json::json!("pixel_7"));
        context.insert("sdk".to_string(), serde_json::json!(34));
        context.insert("locale".to_string(), serde_json::json!("日本語"));
        context.insert(String::new(), serde_json::json!("dropped"));

        ImageIoFormat::png().write(&path, &img, &context).unwrap();

        let mut chunks = read_text_metadata(&path).unwrap();
        chunks.sort();
        assert_eq!(
            chunks,
            vec![
                ("device".to_string(), "pixel_7".to_string()),
                ("locale".to_string(), "日本語".to_string()),
                ("sdk".to_string(), "34".to_string()),
            ]
        );
        assert_eq!(load_image(&path).unwrap(), img);
    }

    #[test]
    fn test_png_without_context_has_no_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.png");
        ImageIoFormat::png()
            .write(&path, &RgbaImage::new(2, 2), &ContextData::new())
            .unwrap();
        assert!(read_text_metadata(&path).unwrap().is_empty());
    }
}
