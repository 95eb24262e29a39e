use approx::assert_relative_eq;
use devbuf::{Context, DataType, DeviceBuffer, Error};
use num_complex::{Complex32, Complex64};
use rand::Rng;

#[test]
fn host_values_round_trip() {
    let ctx = Context::host();
    let mut rng = rand::thread_rng();

    let doubles: Vec<f64> = (0..100).map(|_| rng.gen_range(-1.0e6..1.0e6)).collect();
    let buf = DeviceBuffer::from_slice_in(&ctx, &doubles).unwrap();
    assert_eq!(buf.as_double().unwrap(), doubles);

    let floats: Vec<f32> = (0..100).map(|_| rng.gen_range(-1.0e3..1.0e3)).collect();
    let buf = DeviceBuffer::from_slice_in(&ctx, &floats).unwrap();
    assert_eq!(buf.as_float().unwrap(), floats);
    for (i, v) in floats.iter().enumerate() {
        assert_relative_eq!(buf.get_double(i).unwrap(), *v as f64);
    }
}

#[test]
fn metadata_follows_type() {
    let ctx = Context::host();
    let buf = DeviceBuffer::new_in(&ctx, 12, DataType::Float).unwrap();
    assert_eq!(buf.len(), 12);
    assert_eq!(buf.element_size(), 4);
    assert_eq!(buf.byte_size(), 48);
    assert_eq!(buf.data_type(), DataType::Float);

    let buf = DeviceBuffer::new_in(&ctx, 12, DataType::Double).unwrap();
    assert_eq!(buf.byte_size(), 96);
}

#[test]
fn set_data_requires_exact_type() {
    let ctx = Context::host();
    let mut buf = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0]).unwrap();

    assert!(matches!(
        buf.set_data(&[9.0f32, 9.0]),
        Err(Error::TypeMismatch { expected: DataType::Double, found: DataType::Float })
    ));
    assert!(matches!(buf.set_data(&[0.0f64; 4]), Err(Error::OutOfBounds { .. })));

    buf.set_data(&[7.0f64, 8.0]).unwrap();
    assert_eq!(buf.as_double().unwrap(), vec![7.0, 8.0, 3.0]);
}

#[test]
fn element_accessors() {
    let ctx = Context::host();
    let mut buf = DeviceBuffer::zeros_in(&ctx, 4, DataType::Float).unwrap();

    buf.put_double(0, 2.5).unwrap();
    buf.put_float(1, -1.25).unwrap();
    buf.put_int(2, 7).unwrap();

    assert_eq!(buf.get_float(0).unwrap(), 2.5);
    assert_eq!(buf.get_double(1).unwrap(), -1.25);
    assert_eq!(buf.get_int(0).unwrap(), 2);
    assert_eq!(buf.get_int(1).unwrap(), -1);
    assert_eq!(buf.as_int().unwrap(), vec![2, -1, 7, 0]);

    assert!(matches!(buf.get_double(4), Err(Error::OutOfBounds { .. })));
    assert!(matches!(buf.put_double(4, 1.0), Err(Error::OutOfBounds { .. })));
}

#[test]
fn strided_reads_and_writes() {
    let ctx = Context::host();
    let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let mut buf = DeviceBuffer::from_slice_in(&ctx, &values).unwrap();

    assert_eq!(buf.get_doubles_at(3, 3).unwrap(), vec![3.0, 4.0, 5.0]);
    assert_eq!(buf.get_doubles_at_strided(1, 3, 3).unwrap(), vec![1.0, 4.0, 7.0]);
    assert_eq!(buf.get_floats_at_strided(0, 4, 3).unwrap(), vec![0.0f32, 4.0, 8.0]);
    assert_eq!(buf.get_floats_at(8, 2).unwrap(), vec![8.0f32, 9.0]);
    assert!(buf.get_doubles_at_strided(1, 3, 4).is_err());

    buf.put_doubles_at_strided(0, 5, &[-1.0, -2.0]).unwrap();
    assert_eq!(buf.get_double(0).unwrap(), -1.0);
    assert_eq!(buf.get_double(5).unwrap(), -2.0);
    assert_eq!(buf.get_double(4).unwrap(), 4.0);
}

#[test]
fn strided_float_writes() {
    let ctx = Context::host();
    let mut floats = DeviceBuffer::zeros_in(&ctx, 6, DataType::Float).unwrap();
    floats.put_floats_at_strided(1, 2, &[1.5, 2.5, 3.5]).unwrap();
    assert_eq!(floats.as_float().unwrap(), vec![0.0, 1.5, 0.0, 2.5, 0.0, 3.5]);

    let mut doubles = DeviceBuffer::zeros_in(&ctx, 4, DataType::Double).unwrap();
    doubles.put_floats_at_strided(0, 3, &[0.1, 0.2]).unwrap();
    assert_eq!(doubles.as_double().unwrap(), vec![0.1f32 as f64, 0.0, 0.0, 0.2f32 as f64]);

    assert!(matches!(
        doubles.put_floats_at_strided(1, 3, &[1.0, 2.0]),
        Err(Error::OutOfBounds { .. })
    ));
    assert!(matches!(doubles.put_floats_at_strided(0, 0, &[1.0]), Err(Error::InvalidStride)));
}

#[test]
fn assign_indices_scatters_values() {
    let ctx = Context::host();
    let mut buf = DeviceBuffer::zeros_in(&ctx, 6, DataType::Double).unwrap();

    buf.assign_indices(&[4, 0, 2], &[4.0, 1.0, 3.0], false).unwrap();
    assert_eq!(buf.as_double().unwrap(), vec![1.0, 0.0, 3.0, 0.0, 4.0, 0.0]);

    buf.assign_indices(&[3, 4, 5], &[7.0, 8.0, 9.0], true).unwrap();
    assert_eq!(buf.as_double().unwrap(), vec![1.0, 0.0, 3.0, 7.0, 8.0, 9.0]);

    buf.assign_indices(&[], &[], false).unwrap();
    assert!(matches!(
        buf.assign_indices(&[0, 1], &[1.0], false),
        Err(Error::LengthMismatch { indices: 2, values: 1 })
    ));
}

#[test]
fn assign_indices_out_of_range_writes_nothing() {
    let ctx = Context::host();
    let mut buf = DeviceBuffer::from_slice_in(&ctx, &[1.0f32, 2.0, 3.0]).unwrap();

    assert!(matches!(
        buf.assign_indices(&[0, 3], &[9.0, 9.0], false),
        Err(Error::OutOfBounds { offset: 3, len: 3, .. })
    ));
    assert!(matches!(
        buf.assign_indices(&[2, 3], &[9.0, 9.0], true),
        Err(Error::OutOfBounds { .. })
    ));
    assert_eq!(buf.as_float().unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn assign_fills() {
    let ctx = Context::host();
    let mut buf = DeviceBuffer::from_slice_in(&ctx, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();

    buf.assign_from(9.0, 2).unwrap();
    assert_eq!(buf.as_float().unwrap(), vec![1.0, 2.0, 9.0, 9.0]);

    buf.assign(0.5).unwrap();
    assert_eq!(buf.as_float().unwrap(), vec![0.5; 4]);

    buf.assign_from(1.0, 4).unwrap();
    assert!(matches!(buf.assign_from(1.0, 5), Err(Error::OutOfBounds { .. })));
}

#[test]
fn device_to_device_copies() {
    let ctx = Context::host();
    let src = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0]).unwrap();

    let copy = src.dup().unwrap();
    assert_eq!(copy, src);

    let mut larger = DeviceBuffer::zeros_in(&ctx, 5, DataType::Double).unwrap();
    src.copy_to(&mut larger).unwrap();
    assert_eq!(larger.as_double().unwrap(), vec![1.0, 2.0, 3.0, 0.0, 0.0]);

    let mut smaller = DeviceBuffer::zeros_in(&ctx, 2, DataType::Double).unwrap();
    assert!(matches!(src.copy_to(&mut smaller), Err(Error::OutOfBounds { .. })));

    let mut floats = DeviceBuffer::zeros_in(&ctx, 3, DataType::Float).unwrap();
    assert!(matches!(floats.assign_buffer(&src), Err(Error::TypeMismatch { .. })));
    assert_eq!(floats.as_float().unwrap(), vec![0.0; 3]);
}

#[test]
fn complex_views_read_adjacent_pairs() {
    let ctx = Context::host();
    let buf = DeviceBuffer::from_slice_in(&ctx, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();

    assert_eq!(buf.get_complex_float(0).unwrap(), Complex32::new(1.0, 2.0));
    assert_eq!(buf.get_complex_float(1).unwrap(), Complex32::new(2.0, 3.0));
    assert_eq!(buf.get_complex(2).unwrap(), Complex64::new(3.0, 4.0));
    assert!(matches!(buf.get_complex_double(3), Err(Error::OutOfBounds { .. })));

    assert_eq!(
        buf.as_complex_double().unwrap(),
        vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)]
    );

    let odd = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0]).unwrap();
    assert!(matches!(odd.as_complex_double(), Err(Error::OddComplexLength(3))));
    assert_eq!(odd.complex_doubles_at(1, 1).unwrap(), vec![Complex64::new(2.0, 3.0)]);
}

#[test]
fn zero_length_buffer() {
    let ctx = Context::host();
    let buf = DeviceBuffer::from_slice_in::<f64>(&ctx, &[]).unwrap();
    assert!(buf.is_empty());
    assert_eq!(buf.byte_size(), 0);
    assert!(buf.as_double().unwrap().is_empty());
    assert_eq!(buf.dup().unwrap(), buf);
    buf.release().unwrap();
}
