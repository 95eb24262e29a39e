use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use super::GpuMemoryError;
use crate::gpu::device::{Device, DevicePtr};

/// Sole owner of one contiguous device allocation.
///
/// The pointer is fixed for the handle's lifetime. `release` frees it exactly
/// once and leaves a tombstone behind: later accesses report
/// [`GpuMemoryError::Released`] and `Drop` does nothing. A handle dropped
/// without an explicit release frees its allocation in `Drop`.
///
/// Zero-length handles own no allocation and carry the null pointer.
pub struct DeviceMemory {
    device: Arc<dyn Device>,
    ptr: Option<DevicePtr>,
    length: usize,
    element_size: usize,
}

impl DeviceMemory {
    pub fn allocate(
        device: Arc<dyn Device>,
        length: usize,
        element_size: usize,
    ) -> Result<Self, GpuMemoryError> {
        let bytes = length
            .checked_mul(element_size)
            .ok_or(GpuMemoryError::InvalidSize(usize::MAX))?;

        let ptr = if bytes == 0 { 0 } else { device.alloc(bytes)? };
        debug!("allocated {} x {}B on {} at {:#x}", length, element_size, device.name(), ptr);

        Ok(Self {
            device,
            ptr: Some(ptr),
            length,
            element_size,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn byte_size(&self) -> usize {
        self.length * self.element_size
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn ptr(&self) -> Result<DevicePtr, GpuMemoryError> {
        self.ptr.ok_or(GpuMemoryError::Released)
    }

    /// Address of element `index`; not bounds-checked.
    pub fn ptr_at(&self, index: usize) -> Result<DevicePtr, GpuMemoryError> {
        Ok(self.ptr()? + (index * self.element_size) as u64)
    }

    pub fn is_released(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn release(&mut self) -> Result<(), GpuMemoryError> {
        let ptr = self.ptr.take().ok_or(GpuMemoryError::Released)?;
        if ptr != 0 {
            debug!("releasing {:#x} ({} bytes)", ptr, self.byte_size());
            self.device.free(ptr)?;
        }
        Ok(())
    }
}

impl Drop for DeviceMemory {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            if ptr != 0 {
                if let Err(e) = self.device.free(ptr) {
                    warn!("failed to free device memory at {:#x}: {}", ptr, e);
                }
            }
        }
    }
}

impl fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("device", &self.device.name())
            .field("ptr", &self.ptr.map(|p| format!("{:#x}", p)))
            .field("length", &self.length)
            .field("element_size", &self.element_size)
            .finish()
    }
}
