use std::sync::Arc;

use devbuf::gpu::device::Device;
use devbuf::gpu::host::HostDevice;
use devbuf::gpu::memory::{DeviceMemory, GpuMemoryError};
use devbuf::{Context, DataType, DeviceBuffer, Error};

#[test]
fn exhausted_device_fails_allocation_and_keeps_other_buffers() {
    let ctx = Context::host_with_capacity(1024);
    let kept = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0]).unwrap();

    let result = DeviceBuffer::new_in(&ctx, 1024, DataType::Double);
    assert!(matches!(result, Err(Error::Allocation(GpuMemoryError::AllocationFailed { .. }))));

    assert_eq!(kept.as_double().unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn release_returns_memory_to_the_device() {
    let device = Arc::new(HostDevice::new(4096));
    let ctx = Context::new(device.clone(), devbuf::gpu::host::kernels::registry());

    let buf = DeviceBuffer::zeros_in(&ctx, 100, DataType::Double).unwrap();
    assert_eq!(device.memory().in_use(), 800);

    buf.release().unwrap();
    assert_eq!(device.memory().in_use(), 0);

    {
        let _dropped = DeviceBuffer::new_in(&ctx, 10, DataType::Float).unwrap();
        assert_eq!(device.memory().live_allocations(), 1);
    }
    assert_eq!(device.memory().live_allocations(), 0);
}

#[test]
fn handle_rejects_double_release() {
    let device: Arc<dyn Device> = Arc::new(HostDevice::new(4096));
    let mut mem = DeviceMemory::allocate(device, 16, 4).unwrap();

    mem.release().unwrap();
    assert!(matches!(mem.release(), Err(GpuMemoryError::Released)));
    assert!(matches!(mem.ptr(), Err(GpuMemoryError::Released)));
    assert_eq!(mem.byte_size(), 64);
}

#[test]
fn equality_is_exact() {
    let ctx = Context::host();
    let a = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0]).unwrap();
    let b = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0]).unwrap();
    let c = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0000001]).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(!a.content_eq(&c).unwrap());
}

#[test]
fn equality_requires_matching_shape() {
    let ctx = Context::host();
    let a = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0]).unwrap();
    let longer = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 0.0]).unwrap();
    let single = DeviceBuffer::from_slice_in(&ctx, &[1.0f32, 2.0]).unwrap();

    assert_ne!(a, longer);
    assert_ne!(a, single);
}
