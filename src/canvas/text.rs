//! Bitmap text layout for canvas labels.
//!
//! Glyphs come from font8x8. A laid-out string is cached per canvas so that
//! labels drawn many times (grid headers, overlay markers) are rasterized once.

use font8x8::{
    BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, GREEK_FONTS, LATIN_FONTS, MISC_FONTS, UnicodeFonts,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Glyph cell size in font units
pub const GLYPH_SIZE: u32 = 8;

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BOX_FONTS.get(ch))
        .or_else(|| BLOCK_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| MISC_FONTS.get(ch))
        .unwrap_or([0u8; 8])
}

/// A rasterized single line of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    /// Width of the advance box in pixels
    pub width: u32,
    /// Height of the advance box in pixels
    pub height: u32,
    /// Lit pixels, relative to the top-left of the box
    pub coverage: Vec<(u32, u32)>,
}

impl TextLayout {
    /// Lay out `text` with every font pixel drawn as a `scale`×`scale` block
    pub fn new(text: &str, scale: u32) -> Self {
        let scale = scale.max(1);
        let cell = GLYPH_SIZE * scale;
        let mut coverage = Vec::new();
        let mut count = 0u32;
        for (index, ch) in text.chars().enumerate() {
            count += 1;
            let origin_x = index as u32 * cell;
            for (row_idx, row) in glyph(ch).iter().enumerate() {
                for bit in 0..GLYPH_SIZE {
                    // font8x8 stores LSB as leftmost pixel
                    if (row >> bit) & 1 == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            coverage.push((
                                origin_x + bit * scale + dx,
                                row_idx as u32 * scale + dy,
                            ));
                        }
                    }
                }
            }
        }
        Self {
            width: count * cell,
            height: if count == 0 { 0 } else { cell },
            coverage,
        }
    }
}

/// Memoized layouts keyed by text and scale
#[derive(Debug, Default)]
pub struct TextLayoutCache {
    layouts: HashMap<(String, u32), Arc<TextLayout>>,
    misses: usize,
}

impl TextLayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the layout for `text`, building it on first use
    pub fn layout(&mut self, text: &str, scale: u32) -> Arc<TextLayout> {
        let key = (text.to_string(), scale);
        if let Some(layout) = self.layouts.get(&key) {
            return Arc::clone(layout);
        }
        self.misses += 1;
        let layout = Arc::new(TextLayout::new(text, scale));
        self.layouts.insert(key, Arc::clone(&layout));
        layout
    }

    /// Number of layouts that had to be built
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Layouts currently held
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Drop every cached layout; the miss count is kept
    pub fn clear(&mut self) {
        self.layouts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_dimensions() {
        let layout = TextLayout::new("Diff", 2);
        assert_eq!(layout.width, 4 * 16);
        assert_eq!(layout.height, 16);
        assert!(!layout.coverage.is_empty());
        assert!(layout.coverage.iter().all(|&(x, y)| x < 64 && y < 16));
    }

    #[test]
    fn test_empty_text_has_no_extent() {
        let layout = TextLayout::new("", 3);
        assert_eq!((layout.width, layout.height), (0, 0));
        assert!(layout.coverage.is_empty());
    }

    #[test]
    fn test_cache_reuses_layouts() {
        let mut cache = TextLayoutCache::new();
        let first = cache.layout("Reference", 1);
        let second = cache.layout("Reference", 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.misses(), 1);

        cache.layout("Reference", 2);
        assert_eq!(cache.misses(), 2);
    }
}
