use crate::gpu::device::{Device, DevicePtr};
use crate::gpu::launcher::LaunchError;
use crate::gpu::memory::GpuMemoryError;
use crate::kernel::{KernelEntry, KernelHandle, KernelParams};

use super::HostMemory;

/// A [`Device`] that lives entirely in host memory.
///
/// Used when no CUDA driver is present and by every test that does not need
/// real hardware. Launches run to completion before returning.
pub struct HostDevice {
    memory: HostMemory,
}

impl HostDevice {
    pub fn new(capacity: usize) -> Self {
        Self {
            memory: HostMemory::new(capacity),
        }
    }

    pub fn memory(&self) -> &HostMemory {
        &self.memory
    }
}

impl Device for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError> {
        self.memory.alloc(bytes)
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError> {
        self.memory.free(ptr)
    }

    fn copy_htod(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError> {
        self.memory.write(dst, src)
    }

    fn copy_dtoh(&self, dst: &mut [u8], src: DevicePtr) -> Result<(), GpuMemoryError> {
        self.memory.read(src, dst)
    }

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError> {
        self.memory.copy(dst, src, bytes)
    }

    fn copy_htod_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError> {
        self.memory.write_pitched(dst, dst_pitch, src, width)
    }

    fn copy_dtoh_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError> {
        self.memory.read_pitched(dst, width, src, src_pitch)
    }

    fn launch(&self, kernel: &KernelHandle, params: &KernelParams) -> Result<(), LaunchError> {
        match kernel.entry {
            KernelEntry::Host(run) => run(&self.memory, &kernel.key, params),
            KernelEntry::Cuda(_) => Err(LaunchError::IncompatibleKernel(kernel.key.symbol())),
        }
    }

    fn synchronize(&self) -> Result<(), LaunchError> {
        Ok(())
    }
}
