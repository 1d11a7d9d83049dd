//! Envelope encoding and decoding for packed calls
//!
//! Design: Zero-copy slots. Each slot records the address of caller-owned
//! storage, never a copy of the value, so encoding a call allocates nothing
//! beyond the two parallel arrays.

use core::ffi::{c_int, c_void};
use core::marker::PhantomData;

use super::types::{ArgKind, KindError};

/// Argument pack under construction for one call
///
/// Slots hold addresses of values borrowed for `'a`: the pack cannot outlive
/// the storage it points into, and it is meant to be consumed by a single
/// call. Reusing it for a later call is fine as long as the borrows are still
/// live.
#[derive(Debug, Default)]
pub struct ArgBuffer<'a> {
    kinds: Vec<c_int>,
    slots: Vec<*mut c_void>,
    _storage: PhantomData<&'a ()>,
}

impl<'a> ArgBuffer<'a> {
    /// Create an empty argument pack
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            slots: Vec::new(),
            _storage: PhantomData,
        }
    }

    /// Create an empty pack with room for `capacity` arguments
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            kinds: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            _storage: PhantomData,
        }
    }

    /// Append a 32-bit integer argument by address
    pub fn push_i32(&mut self, value: &'a i32) -> &mut Self {
        self.kinds.push(ArgKind::Int32.code());
        self.slots.push(value as *const i32 as *mut c_void);
        self
    }

    /// Append a 32-bit float argument by address
    pub fn push_f32(&mut self, value: &'a f32) -> &mut Self {
        self.kinds.push(ArgKind::Float32.code());
        self.slots.push(value as *const f32 as *mut c_void);
        self
    }

    /// Append an opaque address argument
    ///
    /// The slot records the address of `value`, so the callee reads the
    /// pointer with one dereference, exactly like the scalar kinds. What the
    /// pointer refers to is the callee's business; the caller keeps the
    /// referent alive for the duration of the call.
    pub fn push_ptr(&mut self, value: &'a *mut c_void) -> &mut Self {
        self.kinds.push(ArgKind::Pointer.code());
        self.slots.push(value as *const *mut c_void as *mut c_void);
        self
    }

    /// Number of encoded arguments
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pack is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Recorded kind at `index`, if in range
    pub fn kind(&self, index: usize) -> Option<ArgKind> {
        // Tags pushed through the typed methods are always decodable.
        self.kinds
            .get(index)
            .and_then(|&code| ArgKind::from_code(code).ok())
    }

    /// Borrow the pack as the view callables receive
    pub fn as_call(&self) -> PackedCall<'_> {
        PackedCall {
            kinds: &self.kinds,
            slots: &self.slots,
        }
    }
}

/// Borrowed view of one encoded call: the parallel kind and slot arrays
///
/// This is what a callable receives. It borrows the pack and every value the
/// slots point into; nothing here may be retained past the call.
#[derive(Debug, Clone, Copy)]
pub struct PackedCall<'a> {
    kinds: &'a [c_int],
    slots: &'a [*mut c_void],
}

impl<'a> PackedCall<'a> {
    /// Reconstruct a view from the raw ABI triple
    ///
    /// # Safety
    /// - `kinds` and `slots` must each point to `num_args` readable elements
    /// - every slot must hold the address of a live value whose true type
    ///   matches the tag recorded for it
    /// - the arrays and every referenced value must outlive the returned view
    pub unsafe fn from_raw_parts(
        num_args: c_int,
        kinds: *const c_int,
        slots: *mut *mut c_void,
    ) -> Self {
        debug_assert!(num_args >= 0, "negative argument count");
        let n = num_args as usize;
        Self {
            kinds: core::slice::from_raw_parts(kinds, n),
            slots: core::slice::from_raw_parts(slots, n),
        }
    }

    /// Argument count
    pub fn num_args(&self) -> usize {
        self.slots.len()
    }

    /// Whether the call carries no arguments
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Decode the kind tag at `index`
    pub fn kind(&self, index: usize) -> Result<ArgKind, DecodeError> {
        let code = *self
            .kinds
            .get(index)
            .ok_or(DecodeError::ArityMismatch {
                index,
                num_args: self.kinds.len(),
            })?;
        ArgKind::from_code(code).map_err(|KindError(tag)| DecodeError::UnknownKind { index, tag })
    }

    /// The raw ABI triple for forwarding across the boundary
    ///
    /// The slot array is handed out as `*mut *mut c_void` to match the entry
    /// point shape; callees may write through the referents of `Pointer`
    /// slots but never through the arrays themselves.
    pub fn raw_parts(&self) -> (c_int, *const c_int, *mut *mut c_void) {
        (
            self.slots.len() as c_int,
            self.kinds.as_ptr(),
            self.slots.as_ptr() as *mut *mut c_void,
        )
    }

    /// Read slot `index` as a 32-bit integer with no checks
    ///
    /// # Safety
    /// `index < num_args` and the recorded kind at `index` is `Int32`.
    #[inline]
    pub unsafe fn i32_unchecked(&self, index: usize) -> i32 {
        *(*self.slots.get_unchecked(index) as *const i32)
    }

    /// Read slot `index` as a 32-bit float with no checks
    ///
    /// # Safety
    /// `index < num_args` and the recorded kind at `index` is `Float32`.
    #[inline]
    pub unsafe fn f32_unchecked(&self, index: usize) -> f32 {
        *(*self.slots.get_unchecked(index) as *const f32)
    }

    /// Read slot `index` as an opaque address with no checks
    ///
    /// # Safety
    /// `index < num_args` and the recorded kind at `index` is `Pointer`.
    #[inline]
    pub unsafe fn ptr_unchecked(&self, index: usize) -> *mut c_void {
        *(*self.slots.get_unchecked(index) as *const *mut c_void)
    }

    /// Read slot `index` as a 32-bit integer, checking index and kind
    pub fn i32_arg(&self, index: usize) -> Result<i32, DecodeError> {
        self.expect_kind(index, ArgKind::Int32)?;
        Ok(unsafe { self.i32_unchecked(index) })
    }

    /// Read slot `index` as a 32-bit float, checking index and kind
    pub fn f32_arg(&self, index: usize) -> Result<f32, DecodeError> {
        self.expect_kind(index, ArgKind::Float32)?;
        Ok(unsafe { self.f32_unchecked(index) })
    }

    /// Read slot `index` as an opaque address, checking index and kind
    pub fn ptr_arg(&self, index: usize) -> Result<*mut c_void, DecodeError> {
        self.expect_kind(index, ArgKind::Pointer)?;
        Ok(unsafe { self.ptr_unchecked(index) })
    }

    fn expect_kind(&self, index: usize, expected: ArgKind) -> Result<(), DecodeError> {
        let recorded = self.kind(index)?;
        if recorded == expected {
            Ok(())
        } else {
            Err(DecodeError::KindMismatch {
                index,
                expected,
                recorded,
            })
        }
    }
}

/// Checked-decode errors
///
/// The unchecked accessors perform none of these checks; misusing them is
/// undefined behavior by contract, not a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Requested index is outside `[0, num_args)`
    ArityMismatch { index: usize, num_args: usize },
    /// Recorded kind at the index differs from the requested kind
    KindMismatch {
        index: usize,
        expected: ArgKind,
        recorded: ArgKind,
    },
    /// Kind array carries a tag this runtime does not know
    UnknownKind { index: usize, tag: i32 },
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ArityMismatch { index, num_args } => {
                write!(f, "Argument index {} out of range for {} arguments", index, num_args)
            }
            Self::KindMismatch {
                index,
                expected,
                recorded,
            } => write!(
                f,
                "Argument {} is {}, requested as {}",
                index,
                recorded.name(),
                expected.name()
            ),
            Self::UnknownKind { index, tag } => {
                write!(f, "Argument {} carries unknown kind tag {}", index, tag)
            }
        }
    }
}

impl std::error::Error for DecodeError {}
