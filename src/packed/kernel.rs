//! Named kernel entry points with recorded signatures
//!
//! The host learns each kernel's signature out of band, from the compiler
//! artifacts that produced the library. Calls made through
//! [`CompiledKernel::call`] are checked against that record before the
//! envelope crosses the ABI boundary; the unchecked hot path stays available
//! through [`PackedCallable::invoke`].

use std::sync::Arc;

use crate::logging::{debug, trace};

use super::args::ArgBuffer;
use super::call::{PackedCallable, RawKernel};
use super::library::{KernelLibrary, SymbolError};
use super::types::{ArgKind, RawPackedFn};

/// Symbol prefix the code generator puts on kernel entry points
pub(crate) const SYMBOL_PREFIX: &str = "arbor_";

/// A kernel entry point with its recorded signature
pub struct CompiledKernel {
    name: String,
    param_kinds: Vec<ArgKind>,
    entry: RawKernel,
    /// Keeps the backing library mapped while the kernel handle lives.
    _library: Option<Arc<KernelLibrary>>,
}

impl CompiledKernel {
    /// Resolve `arbor_{name}` from a loaded library
    ///
    /// Trusts the library to export entry points with the packed shape; the
    /// Arbor code generator guarantees that for the symbols it emits.
    pub fn load(
        library: &Arc<KernelLibrary>,
        name: &str,
        param_kinds: Vec<ArgKind>,
    ) -> Result<Self, SymbolError> {
        let symbol = format!("{}{}", SYMBOL_PREFIX, name);
        let entry = library.symbol(&symbol)?;
        let entry = unsafe { core::mem::transmute::<*const (), RawPackedFn>(entry) };
        debug!(
            kernel = name,
            symbol = %symbol,
            arity = param_kinds.len(),
            "Kernel resolved"
        );
        Ok(Self {
            name: name.to_string(),
            param_kinds,
            entry: RawKernel::new(entry),
            _library: Some(Arc::clone(library)),
        })
    }

    /// Wrap a raw entry point the host already holds
    ///
    /// Used for statically linked kernels and for tests; the caller vouches
    /// that `entry` follows the packed shape and that `param_kinds` is its
    /// true signature.
    pub fn from_raw_fn(name: &str, param_kinds: Vec<ArgKind>, entry: RawPackedFn) -> Self {
        Self {
            name: name.to_string(),
            param_kinds,
            entry: RawKernel::new(entry),
            _library: None,
        }
    }

    /// Kernel name (without the symbol prefix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded parameter kinds, in call order
    pub fn param_kinds(&self) -> &[ArgKind] {
        &self.param_kinds
    }

    /// Call the kernel, checking the pack against the recorded signature
    ///
    /// The check covers arity and kinds only; slot addresses are trusted, as
    /// everywhere in this convention.
    pub fn call(&self, args: &ArgBuffer<'_>) -> Result<(), CallError> {
        if args.len() != self.param_kinds.len() {
            return Err(CallError::ArityMismatch {
                expected: self.param_kinds.len(),
                got: args.len(),
            });
        }
        for (index, expected) in self.param_kinds.iter().enumerate() {
            match args.kind(index) {
                Some(kind) if kind == *expected => {}
                Some(kind) => {
                    return Err(CallError::KindMismatch {
                        index,
                        expected: *expected,
                        got: kind,
                    });
                }
                None => {
                    return Err(CallError::ArityMismatch {
                        expected: self.param_kinds.len(),
                        got: args.len(),
                    });
                }
            }
        }

        trace!(kernel = %self.name, args = args.len(), "Kernel call");
        super::record_call();
        unsafe {
            self.entry.invoke(args.as_call());
        }
        Ok(())
    }
}

impl PackedCallable for CompiledKernel {
    unsafe fn invoke(&self, call: super::args::PackedCall<'_>) {
        self.entry.invoke(call);
    }
}

impl core::fmt::Debug for CompiledKernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompiledKernel")
            .field("name", &self.name)
            .field("param_kinds", &self.param_kinds)
            .finish()
    }
}

/// Signature-check failures raised before a kernel call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    ArityMismatch { expected: usize, got: usize },
    KindMismatch {
        index: usize,
        expected: ArgKind,
        got: ArgKind,
    },
}

impl core::fmt::Display for CallError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ArityMismatch { expected, got } => {
                write!(f, "Expected {} arguments, got {}", expected, got)
            }
            Self::KindMismatch {
                index,
                expected,
                got,
            } => write!(
                f,
                "Argument {} should be {}, got {}",
                index,
                expected.name(),
                got.name()
            ),
        }
    }
}

impl std::error::Error for CallError {}
