use core::ffi::{c_int, c_void};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arbor_runtime::packed::{invoke, ArgBuffer, PackedCall, RawKernel};

unsafe extern "C" fn axpy_scalar(num_args: c_int, arg_kinds: *const c_int, args: *mut *mut c_void) {
    let call = PackedCall::from_raw_parts(num_args, arg_kinds, args);
    let a = call.f32_unchecked(0);
    let x = call.i32_unchecked(1);
    let out = call.ptr_unchecked(2) as *mut f32;
    *out = a * x as f32;
}

fn bench_packed_call(c: &mut Criterion) {
    let kernel = RawKernel::new(axpy_scalar);

    c.bench_function("encode_invoke_3args", |b| {
        b.iter(|| {
            let a = black_box(0.5f32);
            let x = black_box(42i32);
            let mut out = 0.0f32;
            let out_ptr = &mut out as *mut f32 as *mut c_void;

            let mut args = ArgBuffer::with_capacity(3);
            args.push_f32(&a).push_i32(&x).push_ptr(&out_ptr);
            unsafe {
                invoke(&kernel, &args);
            }
            black_box(out)
        });
    });

    c.bench_function("decode_checked_vs_unchecked", |b| {
        let value = 7i32;
        let mut args = ArgBuffer::new();
        args.push_i32(&value);
        let call = args.as_call();

        b.iter(|| {
            let checked = call.i32_arg(black_box(0)).unwrap();
            let unchecked = unsafe { call.i32_unchecked(black_box(0)) };
            black_box(checked + unchecked)
        });
    });
}

criterion_group!(benches, bench_packed_call);
criterion_main!(benches);
