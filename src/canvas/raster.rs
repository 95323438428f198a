//! In-memory raster canvas for captures, goldens and comparison artifacts.
//!
//! Drawing accumulates into an RGBA buffer while the canvas tracks how far
//! content extends. The output image is that extent cropped out of the buffer,
//! computed once on first use: flush deferred draws, crop, quantize to the
//! pixel format. Draws issued after that point are a logic error.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use super::format::{ImageIoFormat, load_image};
use super::text::TextLayoutCache;
use super::types::{CanvasResult, Color, CompositeMode, PixelFormat, Rect};
use crate::compare::{ComparisonResult, ImageComparator};
use crate::report::ContextData;

/// Spacing of the empty-region lattice
pub const EMPTY_POINT_SPACING: u32 = 50;

/// A draw command run when the canvas is materialized
pub type DeferredDraw = Box<dyn FnOnce(&mut Canvas) + Send>;

/// A mutable raster buffer with lazy bounding-box cropping
pub struct Canvas {
    buffer: RgbaImage,
    pixel_format: PixelFormat,
    right_bottom: (u32, u32),
    empty_points: BTreeSet<(u32, u32)>,
    base_draws: Vec<DeferredDraw>,
    pending_draws: Vec<DeferredDraw>,
    text_cache: TextLayoutCache,
    cropped: Option<RgbaImage>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.buffer.width())
            .field("height", &self.buffer.height())
            .field("pixel_format", &self.pixel_format)
            .field("right_bottom", &self.right_bottom)
            .field("base_draws", &self.base_draws.len())
            .field("pending_draws", &self.pending_draws.len())
            .field("cropped", &self.cropped.as_ref().map(|c| c.dimensions()))
            .finish()
    }
}

impl Canvas {
    /// Create a transparent canvas.
    ///
    /// A `filled` canvas counts its whole area as content, so its crop is the
    /// full buffer. A blank one starts with an empty extent that grows with
    /// each draw.
    pub fn new(width: u32, height: u32, filled: bool, pixel_format: PixelFormat) -> Self {
        let empty_points = (0..=width)
            .step_by(EMPTY_POINT_SPACING as usize)
            .flat_map(|x| {
                (0..=height)
                    .step_by(EMPTY_POINT_SPACING as usize)
                    .map(move |y| (x, y))
            })
            .collect();
        Self {
            buffer: RgbaImage::new(width, height),
            pixel_format,
            right_bottom: if filled { (width, height) } else { (0, 0) },
            empty_points,
            base_draws: Vec::new(),
            pending_draws: Vec::new(),
            text_cache: TextLayoutCache::new(),
            cropped: None,
        }
    }

    /// Wrap an existing image in a filled canvas, keeping its pixels exactly
    pub fn from_image(image: &RgbaImage, pixel_format: PixelFormat) -> Self {
        let mut canvas = Self::new(image.width(), image.height(), true, pixel_format);
        canvas.draw_image(image, CompositeMode::Src);
        canvas
    }

    /// Load a stored image, typically a golden.
    ///
    /// Uses replace compositing: blending onto the transparent buffer would
    /// rewrite the color of fully transparent pixels and make an untouched
    /// golden compare as changed.
    pub fn load(path: &Path, pixel_format: PixelFormat) -> CanvasResult<Self> {
        let image = load_image(path)?;
        debug!(
            "Canvas::load(): {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(&image, pixel_format))
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Current `(right, bottom)` content extent
    pub fn extent(&self) -> (u32, u32) {
        self.right_bottom
    }

    pub fn cropped_width(&mut self) -> u32 {
        self.cropped_image().width()
    }

    pub fn cropped_height(&mut self) -> u32 {
        self.cropped_image().height()
    }

    /// Whether the cropped output has been materialized
    pub fn is_cropped(&self) -> bool {
        self.cropped.is_some()
    }

    /// Lattice points no draw has covered yet
    pub fn empty_points(&self) -> &BTreeSet<(u32, u32)> {
        &self.empty_points
    }

    /// Raw buffer, ignoring crop and deferred draws
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Read a pixel from the raw buffer
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.buffer.get_pixel_checked(x, y).copied()
    }

    /// Layout cache misses so far
    pub fn text_layouts_built(&self) -> usize {
        self.text_cache.misses()
    }

    /// Text layouts held by the cache right now
    pub fn text_layouts_cached(&self) -> usize {
        self.text_cache.len()
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Scale `source` into `rect` and blend it over the canvas
    pub fn draw_image_in(&mut self, rect: Rect, source: &RgbaImage) {
        self.check_mutable("draw_image_in");
        if rect.is_empty() {
            return;
        }
        let (w, h) = (rect.width() as u32, rect.height() as u32);
        if source.dimensions() == (w, h) {
            self.composite(source, rect.left, rect.top, CompositeMode::SrcOver);
        } else {
            let scaled = imageops::resize(source, w, h, FilterType::Triangle);
            self.composite(&scaled, rect.left, rect.top, CompositeMode::SrcOver);
        }
        self.update_right_bottom(rect.right, rect.bottom);
        self.consume_empty_points(rect);
    }

    /// Draw `source` at the origin with the given composite mode
    pub fn draw_image(&mut self, source: &RgbaImage, mode: CompositeMode) {
        self.draw_image_at(source, 0, 0, mode);
    }

    /// Draw `source` with its top-left corner at `(x, y)`
    pub fn draw_image_at(&mut self, source: &RgbaImage, x: i32, y: i32, mode: CompositeMode) {
        self.check_mutable("draw_image_at");
        self.composite(source, x, y, mode);
        self.update_right_bottom(x + source.width() as i32, y + source.height() as i32);
    }

    /// Fill a rectangle, blending by the color's alpha
    pub fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.check_mutable("draw_rect");
        self.fill_clipped(rect, color);
        self.update_right_bottom(rect.right, rect.bottom);
        self.consume_empty_points(rect);
    }

    /// Stroke the inside of a rectangle; the stroke is a twentieth of the
    /// shorter side
    pub fn draw_rect_outline(&mut self, rect: Rect, color: Color) {
        self.check_mutable("draw_rect_outline");
        if rect.is_empty() {
            return;
        }
        let stroke = (rect.width().min(rect.height()) as f32 / 20.0).round().max(1.0) as i32;
        let Rect {
            left,
            top,
            right,
            bottom,
        } = rect;
        self.fill_clipped(Rect::new(left, top, right, (top + stroke).min(bottom)), color);
        self.fill_clipped(Rect::new(left, (bottom - stroke).max(top + stroke), right, bottom), color);
        self.fill_clipped(
            Rect::new(left, top + stroke, (left + stroke).min(right), bottom - stroke),
            color,
        );
        self.fill_clipped(
            Rect::new((right - stroke).max(left + stroke), top + stroke, right, bottom - stroke),
            color,
        );
        self.update_right_bottom(rect.right, rect.bottom);
        self.consume_empty_points(rect);
    }

    /// Draw a line from `(x0, y0)` to `(x1, y1)` with a square brush.
    /// Lines are annotations and do not grow the content extent.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, stroke_width: u32) {
        self.check_mutable("draw_line");
        let stroke = stroke_width.max(1) as i32;
        let offset = (stroke - 1) / 2;
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.fill_clipped(Rect::from_xywh(x - offset, y - offset, stroke, stroke), color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Measure lines of text: (widest line, total height with 1px leading)
    pub fn text_calc(&mut self, texts: &[&str], scale: u32) -> (u32, u32) {
        let mut width = 0;
        let mut height = 0;
        for text in texts {
            let layout = self.text_cache.layout(text, scale);
            width = width.max(layout.width);
            height += layout.height + 1;
        }
        (width, height)
    }

    /// Draw lines of text with the top-left of the first line at `(x, y)`
    pub fn draw_text(&mut self, x: i32, y: i32, texts: &[&str], color: Color, scale: u32) {
        self.check_mutable("draw_text");
        let mut next_y = y;
        for text in texts {
            let layout = self.text_cache.layout(text, scale);
            for &(px, py) in &layout.coverage {
                self.blend_pixel(x + px as i32, next_y + py as i32, color);
            }
            next_y += layout.height as i32 + 1;
        }
    }

    // ------------------------------------------------------------------
    // Deferred drawing
    // ------------------------------------------------------------------

    /// Queue a draw that runs before any pending draw
    pub fn add_base_draw(&mut self, draw: impl FnOnce(&mut Canvas) + Send + 'static) {
        self.check_mutable("add_base_draw");
        self.base_draws.push(Box::new(draw));
    }

    /// Queue an overlay draw that runs after all content draws
    pub fn add_pending_draw(&mut self, draw: impl FnOnce(&mut Canvas) + Send + 'static) {
        self.check_mutable("add_pending_draw");
        self.pending_draws.push(Box::new(draw));
    }

    /// Run queued draws: every base draw, then every pending draw
    pub fn flush_deferred_draws(&mut self) {
        let base = std::mem::take(&mut self.base_draws);
        let pending = std::mem::take(&mut self.pending_draws);
        if base.is_empty() && pending.is_empty() {
            return;
        }
        debug!(
            "Canvas: running {} base and {} pending draws",
            base.len(),
            pending.len()
        );
        for draw in base {
            draw(self);
        }
        for draw in pending {
            draw(self);
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// The cropped output image, computed on first call and cached
    pub fn cropped_image(&mut self) -> &RgbaImage {
        let cropped = match self.cropped.take() {
            Some(image) => image,
            None => self.materialize_crop(),
        };
        self.cropped.insert(cropped)
    }

    fn materialize_crop(&mut self) -> RgbaImage {
        self.flush_deferred_draws();
        let w = self.buffer.width().min(self.right_bottom.0);
        let h = self.buffer.height().min(self.right_bottom.1);
        let mut cropped = if (w, h) == self.buffer.dimensions() {
            debug!("Canvas::cropped_image(): extent covers the buffer, no crop");
            self.buffer.clone()
        } else {
            imageops::crop_imm(&self.buffer, 0, 0, w, h).to_image()
        };
        self.pixel_format.apply(&mut cropped);
        cropped
    }

    /// Size of `output_image(resize_scale)` without producing it
    pub fn output_dimensions(&mut self, resize_scale: f64) -> (u32, u32) {
        let (w, h) = self.cropped_image().dimensions();
        scaled_dimensions(w, h, resize_scale)
    }

    /// Cropped output uniformly scaled by `resize_scale`
    pub fn output_image(&mut self, resize_scale: f64) -> RgbaImage {
        scale_image(self.cropped_image(), resize_scale)
    }

    /// Materialize, scale and write the canvas to `path`.
    ///
    /// Non-empty `context_data` is embedded in the file when the format
    /// supports metadata.
    pub fn save(
        &mut self,
        path: &Path,
        resize_scale: f64,
        format: &ImageIoFormat,
        context_data: &ContextData,
    ) -> CanvasResult<()> {
        let image = self.output_image(resize_scale);
        format.write(path, &image, context_data)?;
        debug!(
            "Canvas::save(): {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(())
    }

    /// Free the pixel buffers, queued draws and cached text layouts.
    ///
    /// The canvas is 0x0 afterwards and can no longer produce its capture.
    pub fn release(&mut self) {
        debug!("Canvas::release(): {}x{}", self.buffer.width(), self.buffer.height());
        self.buffer = RgbaImage::new(0, 0);
        self.cropped = None;
        self.right_bottom = (0, 0);
        self.empty_points.clear();
        self.base_draws.clear();
        self.pending_draws.clear();
        self.text_cache.clear();
    }

    /// Compare this canvas, scaled, against `other`'s buffer
    pub fn differ(
        &mut self,
        other: &Canvas,
        resize_scale: f64,
        comparator: &dyn ImageComparator,
    ) -> ComparisonResult {
        let new_image = self.output_image(resize_scale);
        comparator.compare(&new_image, other.buffer())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_mutable(&self, operation: &str) {
        if self.cropped.is_some() {
            warn!("Canvas::{}() after the crop was materialized; output will not change", operation);
        }
        debug_assert!(
            self.cropped.is_none(),
            "canvas mutated after its crop was materialized"
        );
    }

    fn update_right_bottom(&mut self, right: i32, bottom: i32) {
        let right = right.max(0) as u32;
        let bottom = bottom.max(0) as u32;
        self.right_bottom = (self.right_bottom.0.max(right), self.right_bottom.1.max(bottom));
    }

    fn consume_empty_points(&mut self, rect: Rect) {
        if rect.is_empty() || self.empty_points.is_empty() {
            return;
        }
        let spacing = EMPTY_POINT_SPACING as i32;
        let start_x = (rect.left.max(0) / spacing) * spacing;
        let start_y = (rect.top.max(0) / spacing) * spacing;
        if rect.right < start_x || rect.bottom < start_y {
            return;
        }
        for x in (start_x..=rect.right).step_by(EMPTY_POINT_SPACING as usize) {
            for y in (start_y..=rect.bottom).step_by(EMPTY_POINT_SPACING as usize) {
                self.empty_points.remove(&(x as u32, y as u32));
            }
        }
    }

    fn composite(&mut self, source: &RgbaImage, x: i32, y: i32, mode: CompositeMode) {
        let (x, y) = (i64::from(x), i64::from(y));
        match mode {
            CompositeMode::Src => imageops::replace(&mut self.buffer, source, x, y),
            CompositeMode::SrcOver => imageops::overlay(&mut self.buffer, source, x, y),
        }
    }

    fn fill_clipped(&mut self, rect: Rect, color: Color) {
        let left = rect.left.max(0);
        let top = rect.top.max(0);
        let right = rect.right.min(self.buffer.width() as i32);
        let bottom = rect.bottom.min(self.buffer.height() as i32);
        for py in top..bottom {
            for px in left..right {
                self.blend_pixel(px, py, color);
            }
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(dst) = self.buffer.get_pixel_mut_checked(x as u32, y as u32) {
            *dst = blend_src_over(*dst, color.to_rgba());
        }
    }
}

/// Straight-alpha source-over
pub(crate) fn blend_src_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst[3]);
    let dst_weight = da * (255 - sa);
    let out_a = sa * 255 + dst_weight;
    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = u32::from(src[c]) * sa * 255 + u32::from(dst[c]) * dst_weight;
        out[c] = ((value + out_a / 2) / out_a) as u8;
    }
    out[3] = ((out_a + 127) / 255) as u8;
    Rgba(out)
}

/// Uniform bilinear scale; a scale of exactly 1.0 returns the pixels untouched
pub fn scale_image(image: &RgbaImage, scale: f64) -> RgbaImage {
    if scale == 1.0 {
        return image.clone();
    }
    let (w, h) = scaled_dimensions(image.width(), image.height(), scale);
    imageops::resize(image, w, h, FilterType::Triangle)
}

/// Output size of `scale_image` for a `width`×`height` input
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    if scale == 1.0 {
        return (width, height);
    }
    let w = ((f64::from(width) * scale) as u32).max(1);
    let h = ((f64::from(height) * scale) as u32).max(1);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::SimpleImageComparator;
    use tempfile::TempDir;

    const OPAQUE_BLUE: Color = Color([0, 0, 255, 255]);

    #[test]
    fn test_blank_canvas_crops_to_drawn_extent() {
        let mut canvas = Canvas::new(200, 100, false, PixelFormat::Argb8888);
        assert_eq!(canvas.extent(), (0, 0));
        canvas.draw_rect(Rect::new(10, 10, 60, 40), OPAQUE_BLUE);
        assert_eq!(canvas.extent(), (60, 40));
        assert_eq!(canvas.cropped_image().dimensions(), (60, 40));
        assert_eq!(canvas.width(), 200);
    }

    #[test]
    fn test_filled_canvas_crops_to_full_buffer() {
        let mut canvas = Canvas::new(30, 20, true, PixelFormat::Argb8888);
        canvas.draw_rect(Rect::new(0, 0, 5, 5), OPAQUE_BLUE);
        assert_eq!((canvas.cropped_width(), canvas.cropped_height()), (30, 20));
    }

    #[test]
    fn test_extent_never_exceeds_buffer() {
        let mut canvas = Canvas::new(20, 20, false, PixelFormat::Argb8888);
        canvas.draw_rect(Rect::new(5, 5, 500, 500), OPAQUE_BLUE);
        assert_eq!(canvas.cropped_image().dimensions(), (20, 20));
    }

    #[test]
    fn test_crop_is_computed_once() {
        let mut canvas = Canvas::new(10, 10, true, PixelFormat::Argb8888);
        let first = canvas.cropped_image().as_ptr();
        let second = canvas.cropped_image().as_ptr();
        assert_eq!(first, second);
        assert!(canvas.is_cropped());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "canvas mutated after its crop was materialized")]
    fn test_draw_after_crop_is_rejected() {
        let mut canvas = Canvas::new(10, 10, true, PixelFormat::Argb8888);
        canvas.cropped_image();
        canvas.draw_rect(Rect::new(0, 0, 2, 2), OPAQUE_BLUE);
    }

    #[test]
    fn test_pending_draws_run_after_base_draws() {
        let mut canvas = Canvas::new(10, 10, true, PixelFormat::Argb8888);
        // Queued in reverse order on purpose: the pending overlay must still win
        canvas.add_pending_draw(|c| c.draw_rect(Rect::new(0, 0, 10, 10), Color::RED));
        canvas.add_base_draw(|c| c.draw_rect(Rect::new(0, 0, 10, 10), OPAQUE_BLUE));
        assert_eq!(canvas.get_pixel(0, 0), Some(Rgba([0, 0, 0, 0])));

        let image = canvas.cropped_image();
        assert_eq!(*image.get_pixel(5, 5), Color::RED.to_rgba());
    }

    #[test]
    fn test_src_mode_preserves_transparent_payload() {
        let mut source = RgbaImage::new(2, 1);
        source.put_pixel(0, 0, Rgba([12, 34, 56, 0]));
        source.put_pixel(1, 0, Rgba([1, 2, 3, 100]));

        let mut replaced = Canvas::new(2, 1, true, PixelFormat::Argb8888);
        replaced.draw_rect(Rect::new(0, 0, 2, 1), Color::WHITE);
        replaced.draw_image(&source, CompositeMode::Src);
        assert_eq!(replaced.get_pixel(0, 0), Some(Rgba([12, 34, 56, 0])));
        assert_eq!(replaced.get_pixel(1, 0), Some(Rgba([1, 2, 3, 100])));

        let mut blended = Canvas::new(2, 1, true, PixelFormat::Argb8888);
        blended.draw_rect(Rect::new(0, 0, 2, 1), Color::WHITE);
        blended.draw_image(&source, CompositeMode::SrcOver);
        assert_eq!(blended.get_pixel(0, 0), Some(Color::WHITE.to_rgba()));
        assert_ne!(blended.get_pixel(1, 0), Some(Rgba([1, 2, 3, 100])));
    }

    #[test]
    fn test_blend_half_alpha_over_opaque() {
        let out = blend_src_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]), "got {:?}", out);
    }

    #[test]
    fn test_blend_over_transparent_keeps_source_color() {
        let out = blend_src_over(Rgba([0, 0, 0, 0]), Rgba([200, 100, 50, 77]));
        assert_eq!(out, Rgba([200, 100, 50, 77]));
    }

    #[test]
    fn test_draw_image_in_scales_to_rect() {
        let source = RgbaImage::from_pixel(4, 4, Color::RED.to_rgba());
        let mut canvas = Canvas::new(50, 50, false, PixelFormat::Argb8888);
        canvas.draw_image_in(Rect::from_xywh(10, 10, 8, 8), &source);
        let inside = canvas.get_pixel(17, 17).unwrap();
        assert!(inside[0] > 240 && inside[3] > 240, "got {:?}", inside);
        assert_eq!(canvas.get_pixel(18, 18), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(canvas.extent(), (18, 18));
    }

    #[test]
    fn test_rect_outline_leaves_center_untouched() {
        let mut canvas = Canvas::new(100, 100, true, PixelFormat::Argb8888);
        canvas.draw_rect_outline(Rect::new(0, 0, 100, 100), Color::RED);
        assert_eq!(canvas.get_pixel(0, 50), Some(Color::RED.to_rgba()));
        assert_eq!(canvas.get_pixel(4, 50), Some(Color::RED.to_rgba()));
        assert_eq!(canvas.get_pixel(99, 99), Some(Color::RED.to_rgba()));
        assert_eq!(canvas.get_pixel(50, 50), Some(Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_draw_line_diagonal() {
        let mut canvas = Canvas::new(10, 10, true, PixelFormat::Argb8888);
        canvas.draw_line(0, 0, 9, 9, Color::BLACK, 1);
        for i in 0..10 {
            assert_eq!(canvas.get_pixel(i, i), Some(Color::BLACK.to_rgba()));
        }
        assert_eq!(canvas.get_pixel(0, 9), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(canvas.extent(), (10, 10));
    }

    #[test]
    fn test_line_does_not_grow_extent() {
        let mut canvas = Canvas::new(10, 10, false, PixelFormat::Argb8888);
        canvas.draw_line(0, 5, 9, 5, Color::BLACK, 1);
        assert_eq!(canvas.extent(), (0, 0));
    }

    #[test]
    fn test_draw_text_reuses_layout() {
        let mut canvas = Canvas::new(200, 40, true, PixelFormat::Argb8888);
        canvas.draw_text(0, 0, &["New", "New"], Color::BLACK, 1);
        canvas.draw_text(0, 20, &["New"], Color::BLACK, 1);
        assert_eq!(canvas.text_layouts_built(), 1);
        assert_eq!(canvas.text_calc(&["New", "Reference"], 1), (72, 18));

        let lit = (0..24)
            .flat_map(|x| (0..8).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y) == Some(Color::BLACK.to_rgba()))
            .count();
        assert!(lit > 0, "text should light some pixels");
    }

    #[test]
    fn test_empty_points_consumed_by_rect() {
        let mut canvas = Canvas::new(100, 100, false, PixelFormat::Argb8888);
        assert_eq!(canvas.empty_points().len(), 9);
        canvas.draw_rect(Rect::new(0, 0, 60, 40), OPAQUE_BLUE);
        assert!(!canvas.empty_points().contains(&(0, 0)));
        assert!(!canvas.empty_points().contains(&(50, 0)));
        assert!(canvas.empty_points().contains(&(0, 50)));
        assert!(canvas.empty_points().contains(&(100, 100)));
    }

    #[test]
    fn test_scale_one_is_pixel_identical() {
        let mut image = RgbaImage::new(7, 5);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgba([(x * 30) as u8, (y * 40) as u8, 7, 200]);
        }
        assert_eq!(scale_image(&image, 1.0), image);
    }

    #[test]
    fn test_scale_half_halves_dimensions() {
        let image = RgbaImage::from_pixel(101, 40, Color::RED.to_rgba());
        assert_eq!(scale_image(&image, 0.5).dimensions(), (50, 20));
    }

    #[test]
    fn test_rgb565_applied_on_output() {
        let mut canvas = Canvas::new(2, 2, true, PixelFormat::Rgb565);
        canvas.draw_rect(Rect::new(0, 0, 2, 2), Color([0x13, 0x57, 0x9b, 0x40]));
        let px = *canvas.cropped_image().get_pixel(0, 0);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("shot.png");
        let mut canvas = Canvas::new(40, 30, false, PixelFormat::Argb8888);
        canvas.draw_rect(Rect::new(0, 0, 20, 10), OPAQUE_BLUE);
        canvas.save(&path, 1.0, &ImageIoFormat::png(), &ContextData::new()).unwrap();

        let loaded = Canvas::load(&path, PixelFormat::Argb8888).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (20, 10));
        assert_eq!(loaded.get_pixel(3, 3), Some(OPAQUE_BLUE.to_rgba()));
    }

    #[test]
    fn test_release_frees_buffers_and_text_cache() {
        let mut canvas = Canvas::new(120, 40, false, PixelFormat::Argb8888);
        canvas.draw_text(0, 0, &["Reference", "Diff"], Color::BLACK, 1);
        canvas.add_pending_draw(|c| c.draw_rect(Rect::new(0, 0, 5, 5), Color::RED));
        canvas.cropped_image();
        assert_eq!(canvas.text_layouts_cached(), 2);

        canvas.release();

        assert_eq!((canvas.width(), canvas.height()), (0, 0));
        assert_eq!(canvas.text_layouts_cached(), 0);
        assert_eq!(canvas.text_layouts_built(), 2);
        assert!(!canvas.is_cropped());
        assert!(canvas.empty_points().is_empty());
        assert_eq!(canvas.extent(), (0, 0));
    }

    #[test]
    fn test_differ_against_itself_is_zero() {
        let mut canvas = Canvas::new(16, 16, true, PixelFormat::Argb8888);
        canvas.draw_rect(Rect::new(2, 2, 9, 9), OPAQUE_BLUE);
        let golden = Canvas::from_image(canvas.cropped_image(), PixelFormat::Argb8888);
        let result = canvas.differ(&golden, 1.0, &SimpleImageComparator::default());
        assert_eq!(result.changed_pixel_ratio(), 0.0);
    }
}
