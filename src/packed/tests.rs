//! Test suite for the packed calling convention

use super::*;
use core::cell::Cell;
use core::ffi::{c_int, c_void};

// Test kernels with the generated-code entry shape

unsafe extern "C" fn sum_into(num_args: c_int, arg_kinds: *const c_int, args: *mut *mut c_void) {
    let call = PackedCall::from_raw_parts(num_args, arg_kinds, args);
    let a = call.i32_unchecked(0);
    let b = call.i32_unchecked(1);
    let out = call.ptr_unchecked(2) as *mut i32;
    *out = a + b;
}

unsafe extern "C" fn scale_into(num_args: c_int, arg_kinds: *const c_int, args: *mut *mut c_void) {
    let call = PackedCall::from_raw_parts(num_args, arg_kinds, args);
    let factor = call.f32_unchecked(0);
    let out = call.ptr_unchecked(1) as *mut f32;
    *out *= factor;
}

unsafe extern "C" fn no_args(_num_args: c_int, _arg_kinds: *const c_int, _args: *mut *mut c_void) {}

#[test]
fn test_kind_tag_codes_are_stable() {
    // Binary compatibility with generated kernels hinges on these values.
    assert_eq!(ArgKind::Int32.code(), 1);
    assert_eq!(ArgKind::Float32.code(), 2);
    assert_eq!(ArgKind::Pointer.code(), 3);
}

#[test]
fn test_kind_tag_round_trip() {
    for kind in [ArgKind::Int32, ArgKind::Float32, ArgKind::Pointer] {
        assert_eq!(ArgKind::from_code(kind.code()), Ok(kind));
    }
    assert_eq!(ArgKind::from_code(0), Err(KindError(0)));
    assert_eq!(ArgKind::from_code(4), Err(KindError(4)));
    assert_eq!(ArgKind::from_code(-1), Err(KindError(-1)));
}

#[test]
fn test_kind_sizes() {
    assert_eq!(ArgKind::Int32.size(), 4);
    assert_eq!(ArgKind::Float32.size(), 4);
    assert_eq!(ArgKind::Pointer.size(), core::mem::size_of::<*const c_void>());
}

#[test]
fn test_kind_names() {
    assert_eq!(ArgKind::Int32.name(), "int32");
    assert_eq!(ArgKind::Float32.name(), "float32");
    assert_eq!(ArgKind::Pointer.name(), "pointer");
}

#[test]
fn test_encode_decode_i32_identity() {
    let value = 42i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);

    let call = args.as_call();
    assert_eq!(call.num_args(), 1);
    assert_eq!(call.i32_arg(0).unwrap(), 42);
}

#[test]
fn test_encode_decode_f32_identity() {
    let value = 3.5f32;
    let mut args = ArgBuffer::new();
    args.push_f32(&value);

    let call = args.as_call();
    assert_eq!(call.f32_arg(0).unwrap(), 3.5);
}

#[test]
fn test_encode_decode_ptr_identity() {
    let byte = 0xA5u8;
    let ptr = &byte as *const u8 as *mut c_void;
    let mut args = ArgBuffer::new();
    args.push_ptr(&ptr);

    let call = args.as_call();
    assert_eq!(call.ptr_arg(0).unwrap(), ptr);
}

#[test]
fn test_three_arg_positional_independence() {
    let seven = 7i32;
    let quarter = 1.25f32;
    let byte = 0u8;
    let opaque = &byte as *const u8 as *mut c_void;

    let mut args = ArgBuffer::with_capacity(3);
    args.push_i32(&seven).push_f32(&quarter).push_ptr(&opaque);
    assert_eq!(args.len(), 3);

    // Each slot decodes to the value placed there, regardless of neighbors.
    let call = args.as_call();
    assert_eq!(call.f32_arg(1).unwrap(), 1.25);
    assert_eq!(call.i32_arg(0).unwrap(), 7);
    assert_eq!(call.ptr_arg(2).unwrap(), opaque);
}

#[test]
fn test_empty_pack() {
    let args = ArgBuffer::new();
    assert!(args.is_empty());
    assert_eq!(args.as_call().num_args(), 0);
    assert!(args.as_call().is_empty());
}

#[test]
fn test_decode_out_of_range() {
    let value = 1i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);

    let call = args.as_call();
    assert_eq!(
        call.i32_arg(1),
        Err(DecodeError::ArityMismatch {
            index: 1,
            num_args: 1
        })
    );
}

#[test]
fn test_decode_kind_mismatch() {
    let value = 42i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);

    let call = args.as_call();
    assert_eq!(
        call.f32_arg(0),
        Err(DecodeError::KindMismatch {
            index: 0,
            expected: ArgKind::Float32,
            recorded: ArgKind::Int32,
        })
    );
    // The checked accessor never falls back to reinterpretation.
    assert!(call.ptr_arg(0).is_err());
}

#[test]
fn test_decode_unknown_tag_from_raw() {
    let value = 42i32;
    let kinds = [9 as c_int];
    let mut slots = [&value as *const i32 as *mut c_void];

    let call = unsafe { PackedCall::from_raw_parts(1, kinds.as_ptr(), slots.as_mut_ptr()) };
    assert_eq!(
        call.i32_arg(0),
        Err(DecodeError::UnknownKind { index: 0, tag: 9 })
    );
}

#[test]
fn test_raw_view_round_trip() {
    // The raw triple a foreign caller would hand us decodes the same way.
    let a = 11i32;
    let b = 2.5f32;
    let kinds = [ArgKind::Int32.code(), ArgKind::Float32.code()];
    let mut slots = [
        &a as *const i32 as *mut c_void,
        &b as *const f32 as *mut c_void,
    ];

    let call = unsafe { PackedCall::from_raw_parts(2, kinds.as_ptr(), slots.as_mut_ptr()) };
    unsafe {
        assert_eq!(call.i32_unchecked(0), 11);
        assert_eq!(call.f32_unchecked(1), 2.5);
    }

    let (num_args, kinds_ptr, slots_ptr) = call.raw_parts();
    assert_eq!(num_args, 2);
    assert_eq!(kinds_ptr, kinds.as_ptr());
    assert_eq!(slots_ptr, slots.as_mut_ptr());
}

#[test]
fn test_invoke_raw_kernel() {
    let a = 19i32;
    let b = 23i32;
    let mut out = 0i32;
    let out_ptr = &mut out as *mut i32 as *mut c_void;

    let mut args = ArgBuffer::with_capacity(3);
    args.push_i32(&a).push_i32(&b).push_ptr(&out_ptr);

    let kernel = RawKernel::new(sum_into);
    unsafe {
        invoke(&kernel, &args);
    }
    assert_eq!(out, 42);
}

#[test]
fn test_invoke_host_fn() {
    let seen = Cell::new(0i32);
    let host = HostFn::new(|call: PackedCall<'_>| {
        seen.set(call.i32_arg(0).unwrap());
    });

    let value = 7i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);
    unsafe {
        invoke(&host, &args);
    }
    assert_eq!(seen.get(), 7);
}

#[test]
fn test_compiled_kernel_call() {
    let kernel = CompiledKernel::from_raw_fn(
        "scale",
        vec![ArgKind::Float32, ArgKind::Pointer],
        scale_into,
    );
    assert_eq!(kernel.name(), "scale");
    assert_eq!(kernel.param_kinds(), &[ArgKind::Float32, ArgKind::Pointer]);

    let factor = 2.0f32;
    let mut out = 1.5f32;
    let out_ptr = &mut out as *mut f32 as *mut c_void;

    let mut args = ArgBuffer::new();
    args.push_f32(&factor).push_ptr(&out_ptr);
    kernel.call(&args).unwrap();
    assert_eq!(out, 3.0);
}

#[test]
fn test_compiled_kernel_arity_check() {
    let kernel = CompiledKernel::from_raw_fn("nothing", vec![], no_args);

    let value = 1i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);

    assert_eq!(
        kernel.call(&args),
        Err(CallError::ArityMismatch {
            expected: 0,
            got: 1
        })
    );
}

#[test]
fn test_compiled_kernel_kind_check() {
    let kernel = CompiledKernel::from_raw_fn("nothing", vec![ArgKind::Float32], no_args);

    let value = 1i32;
    let mut args = ArgBuffer::new();
    args.push_i32(&value);

    assert_eq!(
        kernel.call(&args),
        Err(CallError::KindMismatch {
            index: 0,
            expected: ArgKind::Float32,
            got: ArgKind::Int32,
        })
    );
}

#[test]
fn test_stats_count_calls() {
    let before = stats().calls_made;

    let kernel = RawKernel::new(no_args);
    let args = ArgBuffer::new();
    unsafe {
        invoke(&kernel, &args);
    }

    assert!(stats().calls_made > before);
}

#[cfg(unix)]
#[test]
fn test_library_load_missing() {
    let result = KernelLibrary::load("/nonexistent/arbor/kernels.so");
    assert!(matches!(result, Err(LoadError::LoadFailed(_))));
}

#[cfg(unix)]
#[test]
fn test_library_load_invalid_name() {
    let result = KernelLibrary::load("bad\0path.so");
    assert!(matches!(result, Err(LoadError::InvalidName)));
}
