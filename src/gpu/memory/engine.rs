use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use libloading::Symbol;
use log::trace;

use super::GpuMemoryError;
use crate::gpu::device::{CopyKind, DevicePtr};
use crate::gpu::runtime::{CudaDriver, MissingSymbol};

type CUdeviceptr = u64;

const CU_MEMORYTYPE_HOST: u32 = 1;
const CU_MEMORYTYPE_DEVICE: u32 = 2;

/// `CUDA_MEMCPY2D` as laid out by the driver headers.
#[repr(C)]
struct CudaMemcpy2d {
    src_x_in_bytes: usize,
    src_y: usize,
    src_memory_type: u32,
    src_host: *const c_void,
    src_device: CUdeviceptr,
    src_array: *mut c_void,
    src_pitch: usize,
    dst_x_in_bytes: usize,
    dst_y: usize,
    dst_memory_type: u32,
    dst_host: *mut c_void,
    dst_device: CUdeviceptr,
    dst_array: *mut c_void,
    dst_pitch: usize,
    width_in_bytes: usize,
    height: usize,
}

impl CudaMemcpy2d {
    fn zeroed() -> Self {
        Self {
            src_x_in_bytes: 0,
            src_y: 0,
            src_memory_type: 0,
            src_host: ptr::null(),
            src_device: 0,
            src_array: ptr::null_mut(),
            src_pitch: 0,
            dst_x_in_bytes: 0,
            dst_y: 0,
            dst_memory_type: 0,
            dst_host: ptr::null_mut(),
            dst_device: 0,
            dst_array: ptr::null_mut(),
            dst_pitch: 0,
            width_in_bytes: 0,
            height: 0,
        }
    }
}

/// Driver-level memory entry points: allocation, free and synchronous copies.
/// The caller makes the owning context current before each call.
pub struct CudaMemoryEngine {
    driver: Arc<CudaDriver>,
}

impl CudaMemoryEngine {
    pub fn new(driver: Arc<CudaDriver>) -> Self {
        Self { driver }
    }

    unsafe fn load<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, MissingSymbol> {
        unsafe { self.driver.get(name) }
    }

    pub fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError> {
        if bytes == 0 {
            return Err(GpuMemoryError::InvalidSize(bytes));
        }

        unsafe {
            let cu_mem_alloc: Symbol<unsafe extern "C" fn(*mut CUdeviceptr, usize) -> i32> =
                self.load(b"cuMemAlloc_v2\0")?;

            let mut ptr: CUdeviceptr = 0;
            let res = cu_mem_alloc(&mut ptr, bytes);

            if res != 0 || ptr == 0 {
                return Err(GpuMemoryError::AllocationFailed { bytes, code: res });
            }

            trace!("cuMemAlloc {} bytes -> {:#x}", bytes, ptr);
            Ok(ptr)
        }
    }

    pub fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError> {
        unsafe {
            let cu_free: Symbol<unsafe extern "C" fn(CUdeviceptr) -> i32> =
                self.load(b"cuMemFree_v2\0")?;

            let res = cu_free(ptr);
            if res != 0 {
                return Err(GpuMemoryError::FreeFailed { ptr, code: res });
            }

            Ok(())
        }
    }

    pub fn copy_htod(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError> {
        unsafe {
            let cu_copy: Symbol<unsafe extern "C" fn(CUdeviceptr, *const c_void, usize) -> i32> =
                self.load(b"cuMemcpyHtoD_v2\0")?;

            let res = cu_copy(dst, src.as_ptr() as *const c_void, src.len());
            if res != 0 {
                return Err(copy_failed(CopyKind::HostToDevice, src.len(), res));
            }

            Ok(())
        }
    }

    pub fn copy_dtoh(&self, dst: &mut [u8], src: DevicePtr) -> Result<(), GpuMemoryError> {
        unsafe {
            let cu_copy: Symbol<unsafe extern "C" fn(*mut c_void, CUdeviceptr, usize) -> i32> =
                self.load(b"cuMemcpyDtoH_v2\0")?;

            let bytes = dst.len();
            let res = cu_copy(dst.as_mut_ptr() as *mut c_void, src, bytes);
            if res != 0 {
                return Err(copy_failed(CopyKind::DeviceToHost, bytes, res));
            }

            Ok(())
        }
    }

    pub fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError> {
        unsafe {
            let cu_copy: Symbol<unsafe extern "C" fn(CUdeviceptr, CUdeviceptr, usize) -> i32> =
                self.load(b"cuMemcpyDtoD_v2\0")?;

            let res = cu_copy(dst, src, bytes);
            if res != 0 {
                return Err(copy_failed(CopyKind::DeviceToDevice, bytes, res));
            }

            Ok(())
        }
    }

    pub fn copy_htod_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError> {
        let mut desc = CudaMemcpy2d::zeroed();
        desc.src_memory_type = CU_MEMORYTYPE_HOST;
        desc.src_host = src.as_ptr() as *const c_void;
        desc.src_pitch = width;
        desc.dst_memory_type = CU_MEMORYTYPE_DEVICE;
        desc.dst_device = dst;
        desc.dst_pitch = dst_pitch;
        desc.width_in_bytes = width;
        desc.height = src.len() / width;

        self.copy_2d(&desc, CopyKind::HostToDevice, src.len())
    }

    pub fn copy_dtoh_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError> {
        let bytes = dst.len();
        let mut desc = CudaMemcpy2d::zeroed();
        desc.src_memory_type = CU_MEMORYTYPE_DEVICE;
        desc.src_device = src;
        desc.src_pitch = src_pitch;
        desc.dst_memory_type = CU_MEMORYTYPE_HOST;
        desc.dst_host = dst.as_mut_ptr() as *mut c_void;
        desc.dst_pitch = width;
        desc.width_in_bytes = width;
        desc.height = bytes / width;

        self.copy_2d(&desc, CopyKind::DeviceToHost, bytes)
    }

    fn copy_2d(&self, desc: &CudaMemcpy2d, kind: CopyKind, bytes: usize) -> Result<(), GpuMemoryError> {
        if desc.height == 0 {
            return Ok(());
        }

        unsafe {
            let cu_copy_2d: Symbol<unsafe extern "C" fn(*const CudaMemcpy2d) -> i32> =
                self.load(b"cuMemcpy2D_v2\0")?;

            let res = cu_copy_2d(desc as *const CudaMemcpy2d);
            if res != 0 {
                return Err(copy_failed(kind, bytes, res));
            }

            Ok(())
        }
    }

    /// Waits for every outstanding operation in the current context.
    pub fn synchronize(&self) -> Result<(), GpuMemoryError> {
        unsafe {
            let cu_sync: Symbol<unsafe extern "C" fn() -> i32> = self.load(b"cuCtxSynchronize\0")?;
            let res = cu_sync();
            if res != 0 {
                return Err(GpuMemoryError::ContextUnavailable(res));
            }
            Ok(())
        }
    }
}

fn copy_failed(kind: CopyKind, bytes: usize, code: i32) -> GpuMemoryError {
    GpuMemoryError::CopyFailed { kind, bytes, code }
}
