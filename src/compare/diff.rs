//! Comparison artifact rendering.
//!
//! The artifact is three panels, `[reference | diff | new]`. The diff panel
//! highlights every coordinate that lies outside either image or whose pixels
//! differ. The grid style adds a margin, gridlines and labels, all sized in
//! density-independent pixels, and therefore needs a density.

use image::RgbaImage;
use log::{debug, warn};

use super::comparator::normalize_transparent;
use super::types::ComparisonStyle;
use crate::canvas::{Canvas, Color, CompositeMode, GLYPH_SIZE, PixelFormat, Rect};

/// Color of changed pixels in the diff panel
pub const DIFF_COLOR: Color = Color::RED;

/// Margin around the panels in grid style, in dp
pub const GRID_MARGIN_DP: f32 = 16.0;

const SMALL_LINE_COLOR: u32 = 0x3377_7777;
const BIG_LINE_COLOR: u32 = 0x9977_7777;
const LABEL_BACKGROUND_COLOR: u32 = 0x5599_9999;
const LABEL_FONT_DP: f32 = 12.0;
const LABEL_MARGIN_DP: f32 = 4.0;

/// Build the diff panel over the union of both extents
pub fn generate_diff_image(reference: &RgbaImage, new_image: &RgbaImage) -> RgbaImage {
    let width = reference.width().max(new_image.width());
    let height = reference.height().max(new_image.height());
    let highlight = DIFF_COLOR.to_rgba();
    RgbaImage::from_fn(width, height, |x, y| {
        match (reference.get_pixel_checked(x, y), new_image.get_pixel_checked(x, y)) {
            (Some(&a), Some(&b)) if normalize_transparent(a) == normalize_transparent(b) => {
                Color::TRANSPARENT.to_rgba()
            }
            _ => highlight,
        }
    })
}

/// Resolved layout of a comparison artifact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComparisonLayout {
    Simple,
    Grid {
        one_dp_px: f32,
        big_line_space_dp: Option<u32>,
        small_line_space_dp: Option<u32>,
        has_label: bool,
    },
}

impl ComparisonLayout {
    /// Pick the layout for a configured style. Grid needs a density; without
    /// one the artifact falls back to the simple layout.
    pub fn resolve(style: &ComparisonStyle, density: Option<f32>) -> Self {
        match (style, density) {
            (ComparisonStyle::Simple, _) => ComparisonLayout::Simple,
            (
                ComparisonStyle::Grid {
                    big_line_space_dp,
                    small_line_space_dp,
                    has_label,
                },
                Some(one_dp_px),
            ) if one_dp_px > 0.0 => ComparisonLayout::Grid {
                one_dp_px,
                big_line_space_dp: *big_line_space_dp,
                small_line_space_dp: *small_line_space_dp,
                has_label: *has_label,
            },
            (ComparisonStyle::Grid { .. }, _) => {
                warn!("Grid comparison style needs a display density; falling back to simple");
                ComparisonLayout::Simple
            }
        }
    }

    /// Margin in pixels around the panels
    pub fn margin(&self) -> u32 {
        match self {
            ComparisonLayout::Simple => 0,
            ComparisonLayout::Grid { one_dp_px, .. } => dp_to_px(GRID_MARGIN_DP, *one_dp_px),
        }
    }
}

/// Everything needed to render one comparison artifact
#[derive(Debug, Clone)]
pub struct ComparisonParameters<'a> {
    pub reference: &'a RgbaImage,
    pub new_image: &'a RgbaImage,
    pub diff: RgbaImage,
    pub layout: ComparisonLayout,
}

impl<'a> ComparisonParameters<'a> {
    pub fn new(
        reference: &'a RgbaImage,
        new_image: &'a RgbaImage,
        style: &ComparisonStyle,
        density: Option<f32>,
    ) -> Self {
        Self {
            reference,
            new_image,
            diff: generate_diff_image(reference, new_image),
            layout: ComparisonLayout::resolve(style, density),
        }
    }

    /// Artifact width: the three panels plus both side margins
    pub fn width(&self) -> u32 {
        self.reference.width() + self.diff.width() + self.new_image.width() + 2 * self.layout.margin()
    }

    /// Artifact height: the taller of reference and new plus both margins
    pub fn height(&self) -> u32 {
        self.reference.height().max(self.new_image.height()) + 2 * self.layout.margin()
    }

    /// Left edge of each panel, in draw order
    pub fn panel_offsets(&self) -> [u32; 3] {
        let margin = self.layout.margin();
        let diff_x = margin + self.reference.width();
        [margin, diff_x, diff_x + self.diff.width()]
    }
}

/// Compose the artifact and hand it back as a fresh filled canvas
pub fn generate_compare_canvas(params: &ComparisonParameters<'_>, pixel_format: PixelFormat) -> Canvas {
    let (width, height) = (params.width(), params.height());
    debug!(
        "generate_compare_canvas(): {:?} {}x{}",
        params.layout, width, height
    );
    let mut composition = Canvas::new(width, height, true, PixelFormat::Argb8888);

    let margin = params.layout.margin() as i32;
    let [reference_x, diff_x, new_x] = params.panel_offsets().map(|x| x as i32);

    if let ComparisonLayout::Grid {
        one_dp_px,
        big_line_space_dp,
        small_line_space_dp,
        has_label,
    } = params.layout
    {
        let segments = [(0, diff_x), (diff_x, new_x), (new_x, width as i32)];
        if let Some(space) = small_line_space_dp {
            draw_gridlines(
                &mut composition,
                &segments,
                dp_to_px(space as f32, one_dp_px),
                Color::argb(SMALL_LINE_COLOR),
            );
        }
        if let Some(space) = big_line_space_dp {
            draw_gridlines(
                &mut composition,
                &segments,
                dp_to_px(space as f32, one_dp_px),
                Color::argb(BIG_LINE_COLOR),
            );
        }
        if has_label {
            for (text, x) in [("Reference", reference_x), ("Diff", diff_x), ("New", new_x)] {
                draw_label(&mut composition, text, x, margin, one_dp_px);
            }
        }
    }

    composition.draw_image_at(params.reference, reference_x, margin, CompositeMode::SrcOver);
    composition.draw_image_at(&params.diff, diff_x, margin, CompositeMode::SrcOver);
    composition.draw_image_at(params.new_image, new_x, margin, CompositeMode::SrcOver);

    Canvas::from_image(composition.cropped_image(), pixel_format)
}

fn draw_gridlines(canvas: &mut Canvas, segments: &[(i32, i32); 3], step: u32, color: Color) {
    if step == 0 {
        debug!("draw_gridlines(): spacing rounds to 0px, skipping");
        return;
    }
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    for y in (0..height).step_by(step as usize) {
        canvas.draw_line(0, y, width - 1, y, color, 1);
    }
    for &(start, end) in segments {
        for x in (start..end).step_by(step as usize) {
            canvas.draw_line(x, 0, x, height - 1, color, 1);
        }
    }
}

/// Label text sits on a translucent plaquette whose bottom edge is `baseline`
fn draw_label(canvas: &mut Canvas, text: &str, x: i32, baseline: i32, one_dp_px: f32) {
    let text_margin = dp_to_px(LABEL_MARGIN_DP, one_dp_px) as i32;
    let scale = ((LABEL_FONT_DP * one_dp_px) / GLYPH_SIZE as f32).round().max(1.0) as u32;
    let (text_width, text_height) = canvas.text_calc(&[text], scale);
    let text_height = text_height as i32 - 1;
    let top = baseline - text_height - text_margin * 2;
    canvas.draw_rect(
        Rect::from_xywh(x, top, text_width as i32 + text_margin * 2, text_height + text_margin * 2),
        Color::argb(LABEL_BACKGROUND_COLOR),
    );
    canvas.draw_text(x + text_margin, top + text_margin, &[text], Color::BLACK, scale);
}

fn dp_to_px(dp: f32, one_dp_px: f32) -> u32 {
    (dp * one_dp_px).max(0.0) as u32
}
