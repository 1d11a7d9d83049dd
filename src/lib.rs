//! Arbor Runtime - Host runtime for compiled Arbor kernels
//!
//! This crate provides the host-side support linked into programs that load
//! Arbor-compiled kernel libraries and invoke their entry points through the
//! packed calling convention.

pub mod logging;
pub mod packed;

// Re-export core types
pub use packed::{
    ArgBuffer, ArgKind, CompiledKernel, KernelLibrary, PackedCall, PackedCallable, RawPackedFn,
};

/// Runtime initialization
#[no_mangle]
pub extern "C" fn arbor_runtime_init() {
    logging::init();
    packed::init();
}

/// Runtime cleanup
#[no_mangle]
pub extern "C" fn arbor_runtime_cleanup() {
    packed::cleanup();
}
