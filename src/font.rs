//! The glyph-drawing collaborator spec.md §1 calls out as assumed and out
//! of scope ("preservation of bit-exact font rendering" is a Non-goal).
//!
//! Real M8 firmware ships several bitmap fonts baked into the client as
//! image data; decoding that bitmap format is outside this core's budget.
//! What the core *does* own is the font-mode selector (spec.md §4.4
//! `system_info`) and the seam `draw_character` calls through — modeled
//! here as a narrow [`Font`] trait with one built-in implementation that
//! draws a solid block in the foreground color sized to the glyph cell,
//! the same placeholder behavior the original implementation's own
//! renderer fell back to.

use crate::command::Color;
use crate::display::PixelBuffer;

/// A renderable glyph cell. `width`/`height` are in pixels.
pub trait Font {
    fn glyph_size(&self) -> (u16, u16);

    /// Renders `ch` at `pos` into `buf` using `fg`/`bg`. Implementations
    /// must clip the way every other drawing primitive does.
    fn draw_glyph(&self, buf: &mut PixelBuffer, ch: u8, x: u16, y: u16, fg: Color, bg: Color);
}

/// Stand-in bitmap font: every printable glyph is a solid `fg`-colored
/// block the size of one glyph cell. Distinct font modes only change the
/// cell dimensions, mirroring how the real fonts differ mainly in point
/// size.
pub struct BlockFont {
    width: u16,
    height: u16,
}

impl BlockFont {
    pub const fn new(width: u16, height: u16) -> Self {
        BlockFont { width, height }
    }
}

impl Font for BlockFont {
    fn glyph_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn draw_glyph(&self, buf: &mut PixelBuffer, _ch: u8, x: u16, y: u16, fg: Color, _bg: Color) {
        buf.fill_rect(x as i64, y as i64, self.width as i64, self.height as i64, fg);
    }
}

/// The fixed set of bitmap fonts the device can select between, indexed
/// by the `font_mode` byte of a `system_info` command (spec.md §3, §4.4).
pub struct FontSet {
    fonts: Vec<BlockFont>,
    mode: usize,
}

impl Default for FontSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FontSet {
    pub fn new() -> Self {
        FontSet {
            fonts: vec![
                BlockFont::new(8, 8),   // small
                BlockFont::new(10, 10), // large
            ],
            mode: 0,
        }
    }

    /// Selects a font by mode index. Out-of-range modes are clamped to
    /// the last available font rather than panicking — the decoder never
    /// fails fatally (spec.md §4.4), and font selection is no exception.
    pub fn set_mode(&mut self, mode: u8) {
        self.mode = (mode as usize).min(self.fonts.len() - 1);
    }

    pub fn current(&self) -> &dyn Font {
        &self.fonts[self.mode]
    }
}
