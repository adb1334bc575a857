//! Fallback-chain glyph resolution.

use std::sync::Arc;

use tracing::trace;

use crate::font::{Font, FontId, FontTable};
use crate::glyph::{
    CONTROL_LIMIT, GlyphBitmap, GlyphDsc, SYMBOL_DUMMY, ZERO_WIDTH_NON_JOINER,
};
use crate::provider::{BitmapProvider, DscProvider, GlyphSource};
use crate::sandbox::{self, SandboxRuntime};

/// Whether sandboxed providers may be executed.
///
/// `Disabled` collapses the routing to the trusted paths only: a
/// sandboxed (or absent) descriptor provider reports not-found, while an
/// absent bitmap provider still falls back to the default glyph source.
#[derive(Clone)]
pub enum SandboxPolicy {
    Disabled,
    Enabled(Arc<dyn SandboxRuntime>),
}

/// Resolves letters to glyph descriptors and bitmaps across a fallback
/// chain.
///
/// The resolver holds no state across calls; every lookup reads the
/// caller's [`FontTable`] and writes only the caller's output
/// descriptor, so concurrent resolutions over an unchanging table are
/// safe.
///
/// Descriptor routing per font:
/// - sandbox enabled: no provider → default source, sandboxed provider →
///   marshal into the font's module, native provider → direct call;
/// - sandbox disabled: only a native provider is called; anything else
///   reports not-found. There is intentionally no default-source branch
///   here, unlike the bitmap path below.
///
/// Bitmap routing per font: a native provider is called directly, an
/// absent provider falls back to the default source in both sandbox
/// modes, and a sandboxed provider is marshaled when the sandbox is
/// enabled and reports not-found otherwise.
#[derive(Clone)]
pub struct GlyphResolver {
    source: Arc<dyn GlyphSource>,
    sandbox: SandboxPolicy,
    placeholder_substitution: bool,
}

impl GlyphResolver {
    /// New resolver over the given default glyph source, with
    /// placeholder substitution on and the sandbox disabled.
    pub fn new(source: Arc<dyn GlyphSource>) -> Self {
        GlyphResolver {
            source,
            sandbox: SandboxPolicy::Disabled,
            placeholder_substitution: true,
        }
    }

    /// Route sandboxed providers through `runtime`.
    pub fn with_sandbox(mut self, runtime: Arc<dyn SandboxRuntime>) -> Self {
        self.sandbox = SandboxPolicy::Enabled(runtime);
        self
    }

    /// Enable or disable placeholder substitution: both the tracking of
    /// placeholder matches during the walk and the visible-box synthesis
    /// for unresolved glyphs.
    pub fn with_placeholder_substitution(mut self, enabled: bool) -> Self {
        self.placeholder_substitution = enabled;
        self
    }

    pub fn sandbox_enabled(&self) -> bool {
        matches!(self.sandbox, SandboxPolicy::Enabled(_))
    }

    pub fn placeholder_substitution(&self) -> bool {
        self.placeholder_substitution
    }

    /// Resolve the descriptor of `letter`, consulting `root` and then
    /// its fallback chain. `letter_next` is an opaque kerning hint
    /// forwarded to providers.
    ///
    /// A concrete glyph from any font wins immediately, in chain order.
    /// If only placeholder glyphs were reported, the first font that
    /// reported one is re-queried and wins. Otherwise `out` receives a
    /// synthesized placeholder descriptor and the call returns `false`.
    ///
    /// Panics if `root` or any fallback link is not live in `table`;
    /// that is a caller bug, not a resolvable condition.
    pub fn resolve(
        &self,
        table: &FontTable,
        root: FontId,
        out: &mut GlyphDsc,
        letter: u32,
        letter_next: u32,
    ) -> bool {
        let root_font = table.get(root).expect("unknown root font id");

        out.resolved_font = None;
        let mut best_placeholder: Option<FontId> = None;
        let mut current = Some(root);

        while let Some(id) = current {
            let font = table
                .get(id)
                .expect("fallback chain references a font missing from the table");
            if self.dispatch_dsc(id, font, out, letter, letter_next) {
                if !out.is_placeholder {
                    out.resolved_font = Some(id);
                    return true;
                }
                if self.placeholder_substitution && best_placeholder.is_none() {
                    best_placeholder = Some(id);
                }
            }
            current = font.fallback();
        }

        if let Some(id) = best_placeholder {
            // The walk may have overwritten `out` since this font
            // answered; the router is stateless, so query it afresh.
            let font = table
                .get(id)
                .expect("fallback chain references a font missing from the table");
            self.dispatch_dsc(id, font, out, letter, letter_next);
            out.resolved_font = Some(id);
            return true;
        }

        self.synthesize_missing(root_font, out, letter);
        trace!(letter, "glyph not found in any font, synthesized placeholder");
        false
    }

    /// Fetch the bitmap of `letter` from a single font (no chain walk).
    ///
    /// Panics if `font` is not live in `table`.
    pub fn glyph_bitmap(
        &self,
        table: &FontTable,
        font: FontId,
        letter: u32,
    ) -> Option<GlyphBitmap> {
        let f = table.get(font).expect("unknown font id");
        self.dispatch_bitmap(font, f, letter)
    }

    /// Advance width of `letter`, or 0 when resolution fails outright.
    pub fn glyph_width(
        &self,
        table: &FontTable,
        font: FontId,
        letter: u32,
        letter_next: u32,
    ) -> u16 {
        let mut dsc = GlyphDsc::default();
        if self.resolve(table, font, &mut dsc, letter, letter_next) {
            dsc.adv_w
        } else {
            0
        }
    }

    fn dispatch_dsc(
        &self,
        id: FontId,
        font: &Font,
        out: &mut GlyphDsc,
        letter: u32,
        letter_next: u32,
    ) -> bool {
        match (&self.sandbox, font.glyph_dsc()) {
            (SandboxPolicy::Enabled(_), None) => {
                self.source.glyph_dsc(font, out, letter, letter_next)
            }
            (SandboxPolicy::Enabled(runtime), Some(DscProvider::Sandboxed { entry })) => {
                let Some(module) = font.module() else {
                    trace!(entry, "sandboxed descriptor provider without a module");
                    return false;
                };
                let mut argv = sandbox::encode_dsc_call(id, letter, letter_next);
                match runtime.run(module, entry, &mut argv) {
                    Ok(()) => sandbox::decode_dsc_result(&argv, out),
                    Err(err) => {
                        trace!(%err, entry, "sandboxed descriptor lookup failed");
                        false
                    }
                }
            }
            (_, Some(DscProvider::Native(lookup))) => (**lookup)(font, out, letter, letter_next),
            (SandboxPolicy::Disabled, None | Some(DscProvider::Sandboxed { .. })) => false,
        }
    }

    fn dispatch_bitmap(&self, id: FontId, font: &Font, letter: u32) -> Option<GlyphBitmap> {
        match (&self.sandbox, font.glyph_bitmap()) {
            (_, None) => self.source.glyph_bitmap(font, letter),
            (SandboxPolicy::Enabled(runtime), Some(BitmapProvider::Sandboxed { entry })) => {
                let module = font.module()?;
                let mut argv = sandbox::encode_bitmap_call(id, letter);
                match runtime.run(module, entry, &mut argv) {
                    Ok(()) if argv[0] != 0 => Some(GlyphBitmap::Guest { ptr: argv[0] }),
                    Ok(()) => None,
                    Err(err) => {
                        trace!(%err, entry, "sandboxed bitmap lookup failed");
                        None
                    }
                }
            }
            (_, Some(BitmapProvider::Native(lookup))) => (**lookup)(font, letter),
            (SandboxPolicy::Disabled, Some(BitmapProvider::Sandboxed { .. })) => None,
        }
    }

    /// Populate `out` for a letter no font could supply: zero-size for
    /// control codes, the dummy symbol and ZWNJ, a visible box sized
    /// from the root font's line height otherwise (when substitution is
    /// enabled).
    fn synthesize_missing(&self, root: &Font, out: &mut GlyphDsc, letter: u32) {
        if letter < CONTROL_LIMIT || letter == SYMBOL_DUMMY || letter == ZERO_WIDTH_NON_JOINER {
            out.box_w = 0;
            out.adv_w = 0;
        } else if self.placeholder_substitution {
            out.box_w = root.line_height() / 2;
            out.adv_w = out.box_w + 2;
        } else {
            out.box_w = 0;
            out.adv_w = 0;
        }

        out.resolved_font = None;
        out.box_h = root.line_height();
        out.ofs_x = 0;
        out.ofs_y = 0;
        out.bpp = 1;
        out.is_placeholder = true;
    }
}
