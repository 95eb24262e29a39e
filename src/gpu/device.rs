//! The execution boundary every backend implements.
//!
//! All methods are synchronous from the caller's point of view: when a call
//! returns, its effect is visible to the next call on the same device.

use std::fmt;

use crate::gpu::launcher::LaunchError;
use crate::gpu::memory::GpuMemoryError;
use crate::kernel::{KernelHandle, KernelParams};

/// Address in the device address space. `0` is the null pointer.
pub type DevicePtr = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyKind {
    HostToDevice,
    DeviceToHost,
    DeviceToDevice,
}

impl fmt::Display for CopyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyKind::HostToDevice => write!(f, "host-to-device"),
            CopyKind::DeviceToHost => write!(f, "device-to-host"),
            CopyKind::DeviceToDevice => write!(f, "device-to-device"),
        }
    }
}

pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError>;

    fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError>;

    fn copy_htod(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError>;

    fn copy_dtoh(&self, dst: &mut [u8], src: DevicePtr) -> Result<(), GpuMemoryError>;

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError>;

    /// Scatters `src.len() / width` packed rows of `width` bytes to `dst`,
    /// advancing `dst_pitch` bytes per row.
    fn copy_htod_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError>;

    /// Gathers `dst.len() / width` rows of `width` bytes from `src`,
    /// advancing `src_pitch` bytes per row, packed into `dst`.
    fn copy_dtoh_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError>;

    /// Runs one kernel over its full parameter block and waits for it.
    fn launch(&self, kernel: &KernelHandle, params: &KernelParams) -> Result<(), LaunchError>;

    fn synchronize(&self) -> Result<(), LaunchError>;
}
