//! Kind tags and the raw entry-point shape
//!
//! The numeric tag values are a frozen ABI shared with generated kernels;
//! both sides hard-code them.

use core::ffi::{c_int, c_void};

/// Argument kind tag
///
/// Discriminants must not change: generated code carries them in its kind
/// arrays and the host matches on the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ArgKind {
    /// 32-bit signed integer
    Int32 = 1,
    /// 32-bit IEEE-754 float
    Float32 = 2,
    /// Opaque address (tensor buffers, workspaces)
    Pointer = 3,
}

impl ArgKind {
    /// Numeric tag as carried in a kind array
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode a raw tag from a kind array
    #[inline]
    pub const fn from_code(code: i32) -> Result<Self, KindError> {
        match code {
            1 => Ok(Self::Int32),
            2 => Ok(Self::Float32),
            3 => Ok(Self::Pointer),
            other => Err(KindError(other)),
        }
    }

    /// Size in bytes of the value a slot of this kind points at
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::Pointer => core::mem::size_of::<*const c_void>(),
        }
    }

    /// Kind name for diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Pointer => "pointer",
        }
    }
}

/// Raw kernel entry point
///
/// Every generated kernel exports this exact shape: the argument count, the
/// parallel kind array, and the parallel array of value addresses.
pub type RawPackedFn =
    unsafe extern "C" fn(num_args: c_int, arg_kinds: *const c_int, args: *mut *mut c_void);

/// Unknown tag found in a kind array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindError(pub i32);

impl core::fmt::Display for KindError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Unknown argument kind tag: {}", self.0)
    }
}

impl std::error::Error for KindError {}
