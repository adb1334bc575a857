use std::fmt;
use std::sync::Arc;

use crate::font::Font;
use crate::glyph::{GlyphBitmap, GlyphDsc};

/// Trusted in-process glyph descriptor lookup.
pub type NativeDscFn = Arc<dyn Fn(&Font, &mut GlyphDsc, u32, u32) -> bool + Send + Sync>;

/// Trusted in-process glyph bitmap lookup.
pub type NativeBitmapFn = Arc<dyn Fn(&Font, u32) -> Option<GlyphBitmap> + Send + Sync>;

/// Glyph descriptor provider of a font.
///
/// The execution model is chosen once, when the font is built: a
/// `Native` provider is called directly, a `Sandboxed` provider is
/// marshaled into the module associated with the font. This replaces
/// re-testing the function reference on every call.
#[derive(Clone)]
pub enum DscProvider {
    /// Directly callable, trusted code.
    Native(NativeDscFn),
    /// Entry point inside the font's sandbox module.
    Sandboxed { entry: String },
}

impl DscProvider {
    pub fn native(
        f: impl Fn(&Font, &mut GlyphDsc, u32, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        DscProvider::Native(Arc::new(f))
    }

    pub fn sandboxed(entry: impl Into<String>) -> Self {
        DscProvider::Sandboxed {
            entry: entry.into(),
        }
    }
}

impl fmt::Debug for DscProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DscProvider::Native(_) => f.write_str("DscProvider::Native(..)"),
            DscProvider::Sandboxed { entry } => {
                write!(f, "DscProvider::Sandboxed({entry:?})")
            }
        }
    }
}

/// Glyph bitmap provider of a font. See [`DscProvider`].
#[derive(Clone)]
pub enum BitmapProvider {
    /// Directly callable, trusted code.
    Native(NativeBitmapFn),
    /// Entry point inside the font's sandbox module.
    Sandboxed { entry: String },
}

impl BitmapProvider {
    pub fn native(f: impl Fn(&Font, u32) -> Option<GlyphBitmap> + Send + Sync + 'static) -> Self {
        BitmapProvider::Native(Arc::new(f))
    }

    pub fn sandboxed(entry: impl Into<String>) -> Self {
        BitmapProvider::Sandboxed {
            entry: entry.into(),
        }
    }
}

impl fmt::Debug for BitmapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmapProvider::Native(_) => f.write_str("BitmapProvider::Native(..)"),
            BitmapProvider::Sandboxed { entry } => {
                write!(f, "BitmapProvider::Sandboxed({entry:?})")
            }
        }
    }
}

/// Default glyph lookup implementation, supplied by the compact font
/// format reader.
///
/// The resolver falls back to this source when a font declares no
/// provider for a capability (see the routing rules on
/// [`GlyphResolver`](crate::resolve::GlyphResolver) for the exact
/// conditions). Parsing the compact format itself lives outside this
/// crate.
pub trait GlyphSource {
    /// Load the descriptor of `letter` into `out`. `letter_next` is an
    /// opaque kerning hint. Returns false when the font has no such
    /// glyph, in which case `out` is unspecified.
    fn glyph_dsc(&self, font: &Font, out: &mut GlyphDsc, letter: u32, letter_next: u32) -> bool;

    /// Fetch the bitmap of `letter`, or `None` when the font has no such
    /// glyph.
    fn glyph_bitmap(&self, font: &Font, letter: u32) -> Option<GlyphBitmap>;
}
