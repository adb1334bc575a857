//! Glyph resolution across a chain of fallback fonts.
//!
//! A [`FontTable`] owns the fonts; each [`Font`] exposes its glyph
//! descriptor and bitmap lookups through a [`DscProvider`] /
//! [`BitmapProvider`], which is either a trusted in-process callable or
//! an entry point inside a sandboxed module. The [`GlyphResolver`] walks
//! the fallback chain, routes each lookup to the right execution model,
//! and synthesizes a placeholder descriptor when no font has the glyph.

pub mod font;
pub mod glyph;
pub mod provider;
pub mod resolve;
pub mod sandbox;

pub use font::{Font, FontBuilder, FontId, FontTable};
pub use glyph::{
    CONTROL_LIMIT, GlyphBitmap, GlyphDsc, SYMBOL_DUMMY, ZERO_WIDTH_NON_JOINER,
};
pub use provider::{BitmapProvider, DscProvider, GlyphSource, NativeBitmapFn, NativeDscFn};
pub use resolve::{GlyphResolver, SandboxPolicy};
pub use sandbox::{ModuleHandle, SANDBOX_ARGC, SandboxError, SandboxRuntime};
