use std::sync::Arc;

use crate::font::FontId;

/// Code points below this limit are control characters and synthesize to
/// an invisible, zero-width glyph.
pub const CONTROL_LIMIT: u32 = 0x20;

/// Private-use marker code point, never drawn.
pub const SYMBOL_DUMMY: u32 = 0xF8FF;

/// U+200C ZERO WIDTH NON-JOINER.
pub const ZERO_WIDTH_NON_JOINER: u32 = 0x200C;

/// Metrics of a single resolved glyph.
///
/// Caller-allocated output record; a resolution call populates every
/// field exactly once, including on the synthesized-placeholder path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphDsc {
    /// Advance width: horizontal space taken by the glyph, kerning
    /// adjustments included.
    pub adv_w: u16,
    /// Width of the glyph's bounding box.
    pub box_w: u16,
    /// Height of the glyph's bounding box.
    pub box_h: u16,
    /// Horizontal offset of the bounding box.
    pub ofs_x: i16,
    /// Vertical offset of the bounding box, measured from the baseline.
    pub ofs_y: i16,
    /// Bits per pixel of the glyph bitmap.
    pub bpp: u8,
    /// True when the glyph is a substitute box rather than real outline
    /// data.
    pub is_placeholder: bool,
    /// The font in the chain that actually supplied the glyph, or `None`
    /// when the descriptor was synthesized.
    pub resolved_font: Option<FontId>,
}

/// Bitmap data of a resolved glyph.
///
/// Native providers and the default glyph source hand back host memory.
/// Sandboxed providers return an address in the module's linear memory;
/// the extent is defined by the glyph descriptor, and the bytes can be
/// copied out through the sandbox runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphBitmap {
    /// Bitmap bytes owned by the host.
    Host(Arc<[u8]>),
    /// Address of the bitmap in the providing module's linear memory.
    Guest { ptr: u32 },
}
