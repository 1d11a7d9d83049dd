//! Packed calling convention - type-erased kernel invocation
//!
//! Design: Calls whose arity and argument types are only known at runtime,
//! carried as a flat kind array plus a flat array of value addresses. This is
//! the shape the Arbor code generator emits, so host and kernels can call
//! each other without sharing static signatures.
//!
//! Architecture:
//! - `types.rs` - kind tags and the raw entry-point shape
//! - `args.rs` - envelope encoding and decoding (checked and unchecked)
//! - `call.rs` - callable abstraction over raw and host functions
//! - `library.rs` - kernel shared-library loading (dlopen/LoadLibrary)
//! - `kernel.rs` - named kernel entry points with recorded signatures

mod args;
mod call;
mod kernel;
mod library;
mod types;

pub use args::{ArgBuffer, DecodeError, PackedCall};
pub use call::{invoke, HostFn, PackedCallable, RawKernel};
pub use kernel::{CallError, CompiledKernel};
pub use library::{KernelLibrary, LoadError, SymbolError};
pub use types::{ArgKind, KindError, RawPackedFn};

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::logging::debug;

static CALLS_MADE: AtomicUsize = AtomicUsize::new(0);
static LIBRARIES_LOADED: AtomicUsize = AtomicUsize::new(0);

/// Initialize the packed-call subsystem (called once at program start)
pub fn init() {
    debug!("Packed call subsystem ready");
}

/// Release process-wide resources held by the subsystem
pub fn cleanup() {
    library::purge_cache();
}

/// Get packed-call statistics
pub fn stats() -> PackedStats {
    PackedStats {
        calls_made: CALLS_MADE.load(Ordering::Relaxed),
        libraries_loaded: LIBRARIES_LOADED.load(Ordering::Relaxed),
    }
}

/// Packed-call statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct PackedStats {
    pub calls_made: usize,
    pub libraries_loaded: usize,
}

#[inline]
pub(crate) fn record_call() {
    CALLS_MADE.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_library_load() {
    LIBRARIES_LOADED.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests;
