// Core types for canvas functionality

use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Axis-aligned rectangle in canvas pixels (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const RED: Color = Color([255, 0, 0, 255]);

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color([r, g, b, a])
    }

    /// Build a color from a packed `0xAARRGGBB` value
    pub fn argb(packed: u32) -> Self {
        let [a, r, g, b] = packed.to_be_bytes();
        Color([r, g, b, a])
    }

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }
}

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        Color(px.0)
    }
}

/// How a source image is combined with what is already on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Alpha-blend the source over the destination
    #[default]
    SrcOver,
    /// Replace destination pixels, alpha included
    Src,
}

/// Pixel storage format of a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8 bits per channel with alpha
    #[default]
    Argb8888,
    /// 5-6-5 bit color, no alpha
    Rgb565,
}

impl PixelFormat {
    /// Round a pixel to what this format can represent
    pub fn quantize(self, px: Rgba<u8>) -> Rgba<u8> {
        match self {
            PixelFormat::Argb8888 => px,
            PixelFormat::Rgb565 => {
                let [r, g, b, _] = px.0;
                let r5 = r >> 3;
                let g6 = g >> 2;
                let b5 = b >> 3;
                Rgba([
                    (r5 << 3) | (r5 >> 2),
                    (g6 << 2) | (g6 >> 4),
                    (b5 << 3) | (b5 >> 2),
                    255,
                ])
            }
        }
    }

    /// Quantize a whole image in place
    pub fn apply(self, image: &mut RgbaImage) {
        if self == PixelFormat::Argb8888 {
            return;
        }
        for px in image.pixels_mut() {
            *px = self.quantize(*px);
        }
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argb8888" => Ok(PixelFormat::Argb8888),
            "rgb565" => Ok(PixelFormat::Rgb565),
            other => Err(format!("unknown pixel format '{}'", other)),
        }
    }
}

/// Result type for canvas operations
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Error types for canvas operations
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A stored image could not be decoded
    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded for writing
    #[error("failed to encode image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Reading, writing or renaming a file failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No writer is registered for the requested format
    #[error("unsupported image format '{0}'")]
    UnsupportedFormat(String),

    /// An image with a zero-sized side cannot be written
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_argb() {
        assert_eq!(Color::argb(0x33777777), Color([0x77, 0x77, 0x77, 0x33]));
        assert_eq!(Color::argb(0xFFFF0000), Color::RED);
    }

    #[test]
    fn test_rect_dimensions() {
        let rect = Rect::from_xywh(10, 20, 30, 40);
        assert_eq!(rect, Rect::new(10, 20, 40, 60));
        assert_eq!(rect.width(), 30);
        assert_eq!(rect.height(), 40);
        assert!(!rect.is_empty());
        assert!(Rect::new(5, 5, 5, 10).is_empty());
    }

    #[test]
    fn test_rgb565_quantize_drops_alpha_and_low_bits() {
        let px = PixelFormat::Rgb565.quantize(Rgba([0x12, 0x34, 0x56, 0x80]));
        assert_eq!(px[3], 255);
        assert_eq!(px[0] >> 3, 0x12 >> 3);
        assert_eq!(px[1] >> 2, 0x34 >> 2);
        // Extremes survive exactly
        assert_eq!(
            PixelFormat::Rgb565.quantize(Rgba([255, 255, 255, 0])),
            Rgba([255, 255, 255, 255])
        );
        assert_eq!(
            PixelFormat::Rgb565.quantize(Rgba([0, 0, 0, 0])),
            Rgba([0, 0, 0, 255])
        );
    }

    #[test]
    fn test_argb8888_is_identity() {
        let px = Rgba([1, 2, 3, 4]);
        assert_eq!(PixelFormat::Argb8888.quantize(px), px);
    }
}
