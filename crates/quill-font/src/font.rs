use crate::provider::{BitmapProvider, DscProvider};
use crate::sandbox::ModuleHandle;

/// Non-owning handle to a font in a [`FontTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u32);

impl FontId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw value, as marshaled into sandbox argument buffers.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A single font in the fallback chain.
///
/// The font itself is opaque to the resolver: it only carries the line
/// height, the two glyph providers, the optional fallback link and the
/// optional sandbox module its providers live in.
#[derive(Debug, Clone)]
pub struct Font {
    line_height: u16,
    glyph_dsc: Option<DscProvider>,
    glyph_bitmap: Option<BitmapProvider>,
    fallback: Option<FontId>,
    module: Option<ModuleHandle>,
}

impl Font {
    pub fn builder(line_height: u16) -> FontBuilder {
        FontBuilder {
            font: Font {
                line_height,
                glyph_dsc: None,
                glyph_bitmap: None,
                fallback: None,
                module: None,
            },
        }
    }

    pub fn line_height(&self) -> u16 {
        self.line_height
    }

    pub fn glyph_dsc(&self) -> Option<&DscProvider> {
        self.glyph_dsc.as_ref()
    }

    pub fn glyph_bitmap(&self) -> Option<&BitmapProvider> {
        self.glyph_bitmap.as_ref()
    }

    pub fn fallback(&self) -> Option<FontId> {
        self.fallback
    }

    pub fn module(&self) -> Option<&ModuleHandle> {
        self.module.as_ref()
    }
}

/// Builder for [`Font`]; provider variants are fixed here, once, at
/// construction time.
#[derive(Debug, Clone)]
pub struct FontBuilder {
    font: Font,
}

impl FontBuilder {
    pub fn glyph_dsc(mut self, provider: DscProvider) -> Self {
        self.font.glyph_dsc = Some(provider);
        self
    }

    pub fn glyph_bitmap(mut self, provider: BitmapProvider) -> Self {
        self.font.glyph_bitmap = Some(provider);
        self
    }

    /// Link the next font to consult when this one misses a glyph.
    pub fn fallback(mut self, font: FontId) -> Self {
        self.font.fallback = Some(font);
        self
    }

    /// Associate the sandbox module that hosts this font's sandboxed
    /// providers.
    pub fn module(mut self, module: ModuleHandle) -> Self {
        self.font.module = Some(module);
        self
    }

    pub fn build(self) -> Font {
        self.font
    }
}

/// Externally owned font storage.
///
/// Fallback links are plain [`FontId`]s into this table, so the table
/// must outlive every resolution call that walks it. The table is
/// append-only; ids stay valid for its lifetime. Keeping the fallback
/// chain acyclic is the caller's contract — a cycle makes resolution
/// loop forever.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    fonts: Vec<Font>,
}

impl FontTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, font: Font) -> FontId {
        let id = FontId(self.fonts.len() as u32);
        self.fonts.push(font);
        id
    }

    pub fn get(&self, id: FontId) -> Option<&Font> {
        self.fonts.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
