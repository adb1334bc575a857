//! wasmtime-backed sandbox for untrusted glyph providers.
//!
//! Guest modules export their memory as `"memory"` and their glyph
//! entry points as `fn(ptr: i32, argc: i32)`. The host stages the
//! resolver's argument buffer in guest memory at a fixed scratch offset,
//! invokes the entry point, and reads the buffer back; slot 0 carries
//! the call's result per the convention in `quill_font::sandbox`.

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;
use tracing::{trace, warn};
use wasmtime::{Engine, Instance, Linker, Module, Store, Val};

use quill_font::sandbox::{ModuleHandle, SANDBOX_ARGC, SandboxError, SandboxRuntime};

/// Offset in guest linear memory where argument buffers are staged,
/// far enough from the static data region at 0.
const ARG_BUFFER_OFFSET: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum WasmSandboxError {
    #[error("module not found: {0}")]
    UnknownModule(String),
    #[error("failed to compile module {module}: {message}")]
    Compile { module: String, message: String },
    #[error("export not found: {0}")]
    MissingExport(String),
    #[error("module exports no memory")]
    MissingMemory,
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<WasmSandboxError> for SandboxError {
    fn from(err: WasmSandboxError) -> Self {
        match err {
            WasmSandboxError::UnknownModule(name) => SandboxError::UnknownModule(name),
            WasmSandboxError::MissingExport(name) => SandboxError::MissingEntry(name),
            other => SandboxError::Runtime(other.to_string()),
        }
    }
}

struct Inner {
    store: Store<()>,
    modules: HashMap<String, Module>,
    instances: HashMap<String, Instance>,
}

/// Sandbox runtime over a wasmtime engine.
///
/// Single-threaded by design: the store sits behind a `RefCell` so the
/// resolver can call out through `&self`, and each call-out is one
/// blocking invocation.
pub struct WasmSandbox {
    engine: Engine,
    linker: Linker<()>,
    inner: RefCell<Inner>,
}

impl WasmSandbox {
    pub fn new() -> Result<Self> {
        let engine = Engine::default();
        let linker = Linker::new(&engine);
        let store = Store::new(&engine, ());
        Ok(Self {
            engine,
            linker,
            inner: RefCell::new(Inner {
                store,
                modules: HashMap::new(),
                instances: HashMap::new(),
            }),
        })
    }

    /// Compile and register a module. Accepts raw WASM bytes, with a
    /// WAT fallback for textual modules.
    pub fn register_module(&self, name: &str, bytes: &[u8]) -> Result<(), WasmSandboxError> {
        let module = match Module::new(&self.engine, bytes) {
            Ok(module) => module,
            Err(first_err) => match wat::parse_bytes(bytes) {
                Ok(compiled) => {
                    Module::new(&self.engine, &compiled).map_err(|e| {
                        warn!(module = %name, error = %e, "failed to compile WAT->WASM module");
                        WasmSandboxError::Compile {
                            module: name.to_string(),
                            message: e.to_string(),
                        }
                    })?
                }
                Err(_) => {
                    warn!(module = %name, error = %first_err, "failed to compile WASM module");
                    return Err(WasmSandboxError::Compile {
                        module: name.to_string(),
                        message: first_err.to_string(),
                    });
                }
            },
        };
        trace!(module = %name, "registered sandbox module");
        self.inner
            .borrow_mut()
            .modules
            .insert(name.to_string(), module);
        Ok(())
    }

    /// Instantiate a registered module, making it callable through
    /// [`SandboxRuntime::run`].
    pub fn instantiate(&self, name: &str) -> Result<ModuleHandle, WasmSandboxError> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let module = inner
            .modules
            .get(name)
            .ok_or_else(|| WasmSandboxError::UnknownModule(name.to_string()))?
            .clone();
        let instance = self
            .linker
            .instantiate(&mut inner.store, &module)
            .map_err(|e| WasmSandboxError::Runtime(e.to_string()))?;
        inner.instances.insert(name.to_string(), instance);
        Ok(ModuleHandle::new(name))
    }

    /// Copy bytes out of a module's linear memory, e.g. to fetch bitmap
    /// data a guest returned by pointer.
    pub fn read_bytes(&self, module: &ModuleHandle, ptr: u32, len: u32) -> Option<Vec<u8>> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let instance = *inner.instances.get(module.name())?;
        let memory = instance.get_memory(&mut inner.store, "memory")?;
        let mut buf = vec![0u8; len as usize];
        memory.read(&inner.store, ptr as usize, &mut buf).ok()?;
        Some(buf)
    }

    fn run_impl(
        &self,
        module: &ModuleHandle,
        entry: &str,
        argv: &mut [u32; SANDBOX_ARGC],
    ) -> Result<(), WasmSandboxError> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let instance = *inner
            .instances
            .get(module.name())
            .ok_or_else(|| WasmSandboxError::UnknownModule(module.name().to_string()))?;
        let func = instance
            .get_func(&mut inner.store, entry)
            .ok_or_else(|| WasmSandboxError::MissingExport(entry.to_string()))?;
        let memory = instance
            .get_memory(&mut inner.store, "memory")
            .ok_or(WasmSandboxError::MissingMemory)?;

        let mut buf = [0u8; SANDBOX_ARGC * 4];
        for (slot, chunk) in argv.iter().zip(buf.chunks_exact_mut(4)) {
            chunk.copy_from_slice(&slot.to_le_bytes());
        }
        memory
            .write(&mut inner.store, ARG_BUFFER_OFFSET, &buf)
            .map_err(|e| WasmSandboxError::Runtime(e.to_string()))?;

        func.call(
            &mut inner.store,
            &[
                Val::I32(ARG_BUFFER_OFFSET as i32),
                Val::I32(SANDBOX_ARGC as i32),
            ],
            &mut [],
        )
        .map_err(|e| WasmSandboxError::Runtime(e.to_string()))?;

        memory
            .read(&inner.store, ARG_BUFFER_OFFSET, &mut buf)
            .map_err(|e| WasmSandboxError::Runtime(e.to_string()))?;
        for (i, slot) in argv.iter_mut().enumerate() {
            *slot = u32::from_le_bytes([buf[i * 4], buf[i * 4 + 1], buf[i * 4 + 2], buf[i * 4 + 3]]);
        }
        Ok(())
    }
}

impl SandboxRuntime for WasmSandbox {
    fn run(
        &self,
        module: &ModuleHandle,
        entry: &str,
        argv: &mut [u32; SANDBOX_ARGC],
    ) -> Result<(), SandboxError> {
        Ok(self.run_impl(module, entry, argv)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quill_font::{
        BitmapProvider, DscProvider, Font, FontTable, GlyphBitmap, GlyphDsc, GlyphResolver,
        GlyphSource,
    };

    /// Guest with glyph data for 'A' only. The descriptor entry fills
    /// the argument buffer per the shared layout; the bitmap entry
    /// answers with a pointer to the data segment at 1024.
    const GLYPH_GUEST: &str = r#"
        (module
            (memory (export "memory") 1)
            (data (i32.const 1024) "\10\32\54\76")
            (func (export "glyph_dsc") (param $ptr i32) (param $argc i32)
                (if (i32.eq (i32.load offset=4 (local.get $ptr)) (i32.const 65))
                    (then
                        (i32.store (local.get $ptr) (i32.const 1))
                        (i32.store offset=4 (local.get $ptr) (i32.const 12))
                        (i32.store offset=8 (local.get $ptr) (i32.const 10))
                        (i32.store offset=12 (local.get $ptr) (i32.const 16))
                        (i32.store offset=16 (local.get $ptr) (i32.const 0))
                        (i32.store offset=20 (local.get $ptr) (i32.const -2))
                        (i32.store offset=24 (local.get $ptr) (i32.const 4))
                        (i32.store offset=28 (local.get $ptr) (i32.const 0)))
                    (else
                        (i32.store (local.get $ptr) (i32.const 0)))))
            (func (export "glyph_bitmap") (param $ptr i32) (param $argc i32)
                (if (i32.eq (i32.load offset=4 (local.get $ptr)) (i32.const 65))
                    (then (i32.store (local.get $ptr) (i32.const 1024)))
                    (else (i32.store (local.get $ptr) (i32.const 0))))))
    "#;

    struct NoGlyphs;

    impl GlyphSource for NoGlyphs {
        fn glyph_dsc(&self, _: &Font, _: &mut GlyphDsc, _: u32, _: u32) -> bool {
            false
        }

        fn glyph_bitmap(&self, _: &Font, _: u32) -> Option<GlyphBitmap> {
            None
        }
    }

    fn guest_sandbox() -> (Arc<WasmSandbox>, ModuleHandle) {
        let sandbox = Arc::new(WasmSandbox::new().expect("sandbox should construct"));
        sandbox
            .register_module("glyphs", GLYPH_GUEST.as_bytes())
            .expect("guest should compile");
        let module = sandbox.instantiate("glyphs").expect("guest instantiates");
        (sandbox, module)
    }

    #[test]
    fn run_round_trips_the_argument_buffer() {
        let (sandbox, module) = guest_sandbox();
        let mut argv = [0u32; SANDBOX_ARGC];
        argv[1] = 65;
        sandbox
            .run(&module, "glyph_dsc", &mut argv)
            .expect("call should succeed");
        assert_eq!(argv, [1, 12, 10, 16, 0, (-2i32) as u32, 4, 0]);

        let mut argv = [0u32; SANDBOX_ARGC];
        argv[1] = 66;
        sandbox
            .run(&module, "glyph_dsc", &mut argv)
            .expect("call should succeed");
        assert_eq!(argv[0], 0);
    }

    #[test]
    fn unknown_module_and_entry_are_reported() {
        let (sandbox, module) = guest_sandbox();
        let mut argv = [0u32; SANDBOX_ARGC];

        let missing = ModuleHandle::new("nope");
        assert!(matches!(
            sandbox.run(&missing, "glyph_dsc", &mut argv),
            Err(SandboxError::UnknownModule(_))
        ));
        assert!(matches!(
            sandbox.run(&module, "no_such_entry", &mut argv),
            Err(SandboxError::MissingEntry(_))
        ));
    }

    #[test]
    fn resolver_routes_through_the_sandbox() {
        let (sandbox, module) = guest_sandbox();
        let mut table = FontTable::new();
        let font = table.insert(
            Font::builder(20)
                .glyph_dsc(DscProvider::sandboxed("glyph_dsc"))
                .glyph_bitmap(BitmapProvider::sandboxed("glyph_bitmap"))
                .module(module.clone())
                .build(),
        );

        let resolver = GlyphResolver::new(Arc::new(NoGlyphs)).with_sandbox(sandbox.clone());

        let mut dsc = GlyphDsc::default();
        assert!(resolver.resolve(&table, font, &mut dsc, 'A' as u32, 0));
        assert_eq!(dsc.resolved_font, Some(font));
        assert_eq!(dsc.adv_w, 12);
        assert_eq!(dsc.box_w, 10);
        assert_eq!(dsc.box_h, 16);
        assert_eq!(dsc.ofs_y, -2);
        assert_eq!(dsc.bpp, 4);
        assert!(!dsc.is_placeholder);

        // 'B' is not in the guest: synthesized placeholder.
        let mut dsc = GlyphDsc::default();
        assert!(!resolver.resolve(&table, font, &mut dsc, 'B' as u32, 0));
        assert!(dsc.is_placeholder);
        assert_eq!(dsc.box_w, 10);
        assert_eq!(dsc.adv_w, 12);

        let bitmap = resolver.glyph_bitmap(&table, font, 'A' as u32);
        assert_eq!(bitmap, Some(GlyphBitmap::Guest { ptr: 1024 }));
        assert_eq!(
            sandbox.read_bytes(&module, 1024, 4),
            Some(vec![0x10, 0x32, 0x54, 0x76])
        );
    }
}
