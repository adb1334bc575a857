//! Quill: glyph resolution across fallback font chains, with trusted
//! native and sandboxed glyph providers.

pub use quill_config as config;
pub use quill_font as font;
pub use quill_wasm as wasm;

use std::sync::Arc;

use quill_config::QuillConfig;
use quill_font::{GlyphResolver, GlyphSource, SandboxRuntime};

/// Build a [`GlyphResolver`] from a loaded configuration.
///
/// `runtime` is only attached when the configuration enables the
/// sandbox; pass `None` when no module runtime is available, in which
/// case sandboxed providers simply report not-found.
pub fn resolver_from_config(
    config: &QuillConfig,
    source: Arc<dyn GlyphSource>,
    runtime: Option<Arc<dyn SandboxRuntime>>,
) -> GlyphResolver {
    let mut resolver = GlyphResolver::new(source)
        .with_placeholder_substitution(config.resolver.placeholder_substitution);
    if config.resolver.sandbox
        && let Some(runtime) = runtime
    {
        resolver = resolver.with_sandbox(runtime);
    }
    resolver
}
