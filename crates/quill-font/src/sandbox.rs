//! Interface to the sandboxed module runtime and the argument-buffer
//! calling convention shared with guest modules.

use std::sync::Arc;

use crate::font::FontId;
use crate::glyph::GlyphDsc;

/// Number of `u32` slots in a sandbox argument buffer.
pub const SANDBOX_ARGC: usize = 8;

/// Identifies an instantiated module within a sandbox runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHandle(Arc<str>);

impl ModuleHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        ModuleHandle(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Failures reported by a sandbox runtime.
///
/// The resolver treats every one of these as "glyph not found"; they
/// exist so runtime implementations can log and report precisely.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unknown module: {0}")]
    UnknownModule(String),
    #[error("entry point not found: {0}")]
    MissingEntry(String),
    #[error("sandbox runtime error: {0}")]
    Runtime(String),
}

/// Executes untrusted glyph provider code.
///
/// `run` invokes `entry` in `module` with the packed argument buffer
/// staged in guest memory; by convention the runtime writes the call's
/// return value back into `argv[0]`. Timeouts and cancellation are the
/// runtime's concern, not the resolver's.
pub trait SandboxRuntime {
    fn run(
        &self,
        module: &ModuleHandle,
        entry: &str,
        argv: &mut [u32; SANDBOX_ARGC],
    ) -> Result<(), SandboxError>;
}

/// Pack a descriptor lookup into an argument buffer:
/// `[font, letter, letter_next, 0, 0, 0, 0, 0]`.
pub fn encode_dsc_call(font: FontId, letter: u32, letter_next: u32) -> [u32; SANDBOX_ARGC] {
    let mut argv = [0u32; SANDBOX_ARGC];
    argv[0] = font.raw();
    argv[1] = letter;
    argv[2] = letter_next;
    argv
}

/// Unpack a descriptor lookup result:
/// `[found, adv_w, box_w, box_h, ofs_x, ofs_y, bpp, is_placeholder]`.
///
/// Offsets are `i16` values sign-extended through the `u32` slots.
/// `resolved_font` is left untouched; stamping it is the walker's job.
pub fn decode_dsc_result(argv: &[u32; SANDBOX_ARGC], out: &mut GlyphDsc) -> bool {
    out.adv_w = argv[1] as u16;
    out.box_w = argv[2] as u16;
    out.box_h = argv[3] as u16;
    out.ofs_x = argv[4] as i32 as i16;
    out.ofs_y = argv[5] as i32 as i16;
    out.bpp = argv[6] as u8;
    out.is_placeholder = argv[7] != 0;
    argv[0] != 0
}

/// Pack a bitmap lookup into an argument buffer: `[font, letter, 0, ..]`.
/// The result comes back in slot 0 as a guest memory address, 0 meaning
/// not found.
pub fn encode_bitmap_call(font: FontId, letter: u32) -> [u32; SANDBOX_ARGC] {
    let mut argv = [0u32; SANDBOX_ARGC];
    argv[0] = font.raw();
    argv[1] = letter;
    argv
}
