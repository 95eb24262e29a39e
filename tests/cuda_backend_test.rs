use devbuf::gpu::runtime::CudaRuntime;
use devbuf::{Context, DataType, DeviceBuffer, Span};

fn cuda_context() -> Option<std::sync::Arc<Context>> {
    // No driver or no device: nothing to test on this machine.
    if CudaRuntime::new().is_err() {
        return None;
    }
    Context::cuda().ok()
}

#[test]
fn cuda_round_trip_and_arithmetic() {
    let ctx = match cuda_context() {
        Some(c) => c,
        None => return,
    };

    let mut a = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0]).unwrap();
    a.addi_scalar(5.0).unwrap();
    assert_eq!(a.as_double().unwrap(), vec![6.0, 7.0, 8.0]);

    let b = DeviceBuffer::from_slice_in(&ctx, &[3.0f64, 4.0, 5.0]).unwrap();
    let mut result = DeviceBuffer::zeros_in(&ctx, 3, DataType::Double).unwrap();
    a.rsub(&b, &mut result).unwrap();
    assert_eq!(result.as_double().unwrap(), vec![-3.0, -3.0, -3.0]);
}

#[test]
fn cuda_strided_matches_host() {
    let cuda = match cuda_context() {
        Some(c) => c,
        None => return,
    };
    let host = Context::host();
    let values: Vec<f32> = (0..10).map(|i| i as f32 * 0.5).collect();

    let run = |ctx: &std::sync::Arc<Context>| {
        let mut buf = DeviceBuffer::from_slice_in(ctx, &values).unwrap();
        buf.divi_scalar_strided(3.0, 3, Span::new(2, 2)).unwrap();
        buf.as_float().unwrap()
    };

    assert_eq!(run(&cuda), run(&host));
}
