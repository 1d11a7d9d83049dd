//! Callable abstraction over packed entry points
//!
//! A callable receives the (count, kinds, addresses) triple and is
//! responsible for knowing its own signature out of band. The envelope never
//! branches on kinds itself.

use super::args::{ArgBuffer, PackedCall};
use super::types::RawPackedFn;

/// A function invocable through the packed calling convention
pub trait PackedCallable {
    /// Invoke with an encoded call
    ///
    /// # Safety
    /// Every slot must hold the address of a live value whose true type
    /// matches its recorded kind, and the storage must stay valid until this
    /// returns; the callable decodes on that assumption.
    unsafe fn invoke(&self, call: PackedCall<'_>);
}

/// Entry point exported by a compiled kernel library
#[derive(Clone, Copy)]
pub struct RawKernel(RawPackedFn);

impl RawKernel {
    /// Wrap a raw entry point
    pub const fn new(entry: RawPackedFn) -> Self {
        Self(entry)
    }
}

impl PackedCallable for RawKernel {
    unsafe fn invoke(&self, call: PackedCall<'_>) {
        let (num_args, kinds, slots) = call.raw_parts();
        (self.0)(num_args, kinds, slots);
    }
}

impl core::fmt::Debug for RawKernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RawKernel({:p})", self.0 as *const ())
    }
}

/// Host-implemented callable backed by a Rust closure
///
/// Lets host functions be called through the same envelope shape as
/// generated kernels.
pub struct HostFn<F>(F);

impl<F> HostFn<F>
where
    F: Fn(PackedCall<'_>),
{
    /// Wrap a closure taking the decoded-call view
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PackedCallable for HostFn<F>
where
    F: Fn(PackedCall<'_>),
{
    unsafe fn invoke(&self, call: PackedCall<'_>) {
        (self.0)(call);
    }
}

/// Invoke a callable with an encoded argument pack
///
/// # Safety
/// See [`PackedCallable::invoke`]. Packs built through [`ArgBuffer`]'s typed
/// push methods satisfy the kind-truth requirement by construction; the
/// remaining obligation is that `callable` really follows the packed entry
/// shape.
pub unsafe fn invoke<C>(callable: &C, args: &ArgBuffer<'_>)
where
    C: PackedCallable + ?Sized,
{
    super::record_call();
    callable.invoke(args.as_call());
}
