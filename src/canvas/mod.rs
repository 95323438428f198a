pub mod format;
pub mod raster;
pub mod text;
pub mod types;

pub use format::{
    DEFAULT_JPEG_QUALITY, ImageIoFormat, ImageWriter, JpegWriter, PngWriter, load_image,
    read_text_metadata,
};
pub use raster::{Canvas, DeferredDraw, EMPTY_POINT_SPACING, scale_image, scaled_dimensions};
pub use text::{GLYPH_SIZE, TextLayout, TextLayoutCache};
pub use types::{CanvasError, CanvasResult, Color, CompositeMode, PixelFormat, Rect};
