use std::sync::Arc;

use devbuf::gpu::device::{Device, DevicePtr};
use devbuf::gpu::host::{kernels, HostDevice};
use devbuf::gpu::launcher::LaunchError;
use devbuf::gpu::memory::GpuMemoryError;
use devbuf::kernel::{ElementwiseOp, KernelHandle, KernelKey, KernelParams, KernelRegistry, Layout, OperandKind};
use devbuf::{Context, DataType, DeviceBuffer, Error, Span};
use parking_lot::Mutex;

/// Host device that remembers every kernel it was asked to run.
struct RecordingDevice {
    inner: HostDevice,
    launched: Mutex<Vec<String>>,
    syncs: Mutex<usize>,
}

impl RecordingDevice {
    fn new() -> Self {
        Self {
            inner: HostDevice::new(1 << 20),
            launched: Mutex::new(Vec::new()),
            syncs: Mutex::new(0),
        }
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.launched.lock())
    }
}

impl Device for RecordingDevice {
    fn name(&self) -> &str {
        "recording"
    }

    fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError> {
        self.inner.alloc(bytes)
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError> {
        self.inner.free(ptr)
    }

    fn copy_htod(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError> {
        self.inner.copy_htod(dst, src)
    }

    fn copy_dtoh(&self, dst: &mut [u8], src: DevicePtr) -> Result<(), GpuMemoryError> {
        self.inner.copy_dtoh(dst, src)
    }

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError> {
        self.inner.copy_dtod(dst, src, bytes)
    }

    fn copy_htod_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError> {
        self.inner.copy_htod_pitched(dst, dst_pitch, src, width)
    }

    fn copy_dtoh_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError> {
        self.inner.copy_dtoh_pitched(dst, width, src, src_pitch)
    }

    fn launch(&self, kernel: &KernelHandle, params: &KernelParams) -> Result<(), LaunchError> {
        self.launched.lock().push(kernel.key.symbol());
        self.inner.launch(kernel, params)
    }

    fn synchronize(&self) -> Result<(), LaunchError> {
        *self.syncs.lock() += 1;
        self.inner.synchronize()
    }
}

fn recording_context() -> (Arc<RecordingDevice>, Arc<Context>) {
    let device = Arc::new(RecordingDevice::new());
    let ctx = Context::new(device.clone(), kernels::registry());
    (device, ctx)
}

#[test]
fn dense_spans_pick_dense_kernels() {
    let (device, ctx) = recording_context();
    let mut a = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 2.0, 3.0, 4.0]).unwrap();
    let b = DeviceBuffer::from_slice_in(&ctx, &[1.0f64, 1.0, 1.0, 1.0]).unwrap();

    a.addi(&b).unwrap();
    a.subi_scalar(1.0).unwrap();
    a.muli_scalar_strided(2.0, 2, Span::DENSE).unwrap();

    assert_eq!(device.take(), vec!["add_double", "sub_scalar_double", "mul_scalar_double"]);
    assert_eq!(a.as_double().unwrap(), vec![2.0, 4.0, 3.0, 4.0]);
}

#[test]
fn any_non_dense_span_picks_strided_kernels() {
    let (device, ctx) = recording_context();
    let mut a = DeviceBuffer::from_slice_in(&ctx, &[1.0f32; 6]).unwrap();
    let b = DeviceBuffer::from_slice_in(&ctx, &[2.0f32; 6]).unwrap();
    let mut r = DeviceBuffer::zeros_in(&ctx, 6, DataType::Float).unwrap();

    a.divi_strided(&b, 3, Span::DENSE, Span::new(0, 2)).unwrap();
    a.rsub_scalar_strided(1.0, 2, Span::new(1, 1), &mut r).unwrap();
    a.rdiv_strided(&b, 3, Span::new(0, 2), Span::DENSE, &mut r).unwrap();

    assert_eq!(
        device.take(),
        vec!["div_strided_float", "rsub_scalar_strided_float", "rdiv_strided_float"]
    );
}

#[test]
fn self_operand_ops_pick_kernels_by_span() {
    let (device, ctx) = recording_context();
    let mut a = DeviceBuffer::from_slice_in(&ctx, &[1.0f32, 10.0, 2.0, 20.0]).unwrap();

    a.muli_self().unwrap();
    a.subi_self_strided(2, Span::new(0, 2), Span::new(1, 2)).unwrap();

    assert_eq!(device.take(), vec!["mul_float", "sub_strided_float"]);
    assert_eq!(a.as_float().unwrap(), vec![-99.0, 100.0, -396.0, 400.0]);
}

#[test]
fn context_synchronize_reaches_the_device() {
    let (device, ctx) = recording_context();
    ctx.synchronize().unwrap();
    ctx.synchronize().unwrap();

    assert_eq!(*device.syncs.lock(), 2);
    assert!(device.take().is_empty());
}

#[test]
fn rejected_calls_launch_nothing() {
    let (device, ctx) = recording_context();
    let mut a = DeviceBuffer::from_slice_in(&ctx, &[1.0f64; 4]).unwrap();
    let b = DeviceBuffer::from_slice_in(&ctx, &[1.0f32; 4]).unwrap();

    assert!(a.addi(&b).is_err());
    assert!(a.addi_scalar_strided(1.0, 5, Span::DENSE).is_err());
    a.addi_scalar_strided(1.0, 0, Span::DENSE).unwrap();

    assert!(device.take().is_empty());
}

#[test]
fn missing_kernel_is_unsupported() {
    let key = KernelKey::new(ElementwiseOp::Add, OperandKind::Scalar, DataType::Double, Layout::Dense);
    let entries = kernels::registry();
    let partial = KernelRegistry::with_entries(
        entries
            .keys()
            .filter(|k| **k != key)
            .filter_map(|k| entries.resolve(k).ok())
            .map(|h| (h.key, h.entry)),
    );
    let ctx = Context::new(Arc::new(HostDevice::new(1 << 16)), partial);

    let mut buf = DeviceBuffer::from_slice_in(&ctx, &[1.0f64]).unwrap();
    assert!(matches!(
        buf.addi_scalar(1.0),
        Err(Error::UnsupportedOperation(symbol)) if symbol == "add_scalar_double"
    ));
    buf.subi_scalar(1.0).unwrap();
    assert_eq!(buf.get_double(0).unwrap(), 0.0);
}
