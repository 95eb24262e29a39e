use std::ptr;
use std::sync::Arc;

use libloading::Symbol;
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use super::{CudaDriver, GpuRuntimeError};
use crate::config::get_runtime_flags;
use crate::gpu::device::{Device, DevicePtr};
use crate::gpu::launcher::{GpuLauncher, LaunchDims, LaunchError};
use crate::gpu::loader::{CudaLoader, CudaModule};
use crate::gpu::memory::{CudaMemoryEngine, GpuMemoryError};
use crate::gpu::safety::{describe, GpuSafety};
use crate::kernel::{KernelEntry, KernelHandle, KernelParams};

type CUcontext = *mut std::os::raw::c_void;
type CUstream = *mut std::os::raw::c_void;

/// A CUDA device bound through the driver API: the primary context of
/// device 0 and one blocking stream that every launch is issued on.
///
/// Raw driver handles are stored as integers so the runtime is `Send + Sync`;
/// each call makes the context current on the calling thread first.
pub struct CudaRuntime {
    driver: Arc<CudaDriver>,
    device: i32,
    context: usize,
    stream: usize,
    memory: CudaMemoryEngine,
    launcher: GpuLauncher,
    modules: Mutex<Vec<CudaModule>>,
    block_size: u32,
    max_grid_blocks: u32,
}

impl CudaRuntime {
    pub fn new() -> Result<Self, GpuRuntimeError> {
        let driver = Arc::new(CudaDriver::load()?);

        unsafe {
            let cu_init: Symbol<unsafe extern "C" fn(u32) -> i32> = driver.get(b"cuInit\0")?;
            let res = cu_init(0);
            if res != 0 {
                return Err(GpuRuntimeError::InitFailed(res));
            }

            let cu_device_get: Symbol<unsafe extern "C" fn(*mut i32, i32) -> i32> =
                driver.get(b"cuDeviceGet\0")?;
            let mut device = 0;
            let res = cu_device_get(&mut device, 0);
            if res != 0 {
                return Err(GpuRuntimeError::NoDevice(res));
            }

            let cu_retain: Symbol<unsafe extern "C" fn(*mut CUcontext, i32) -> i32> =
                driver.get(b"cuDevicePrimaryCtxRetain\0")?;
            let mut ctx: CUcontext = ptr::null_mut();
            let res = cu_retain(&mut ctx, device);
            if res != 0 || ctx.is_null() {
                return Err(GpuRuntimeError::ContextFailed(res));
            }

            let cu_set_current: Symbol<unsafe extern "C" fn(CUcontext) -> i32> =
                driver.get(b"cuCtxSetCurrent\0")?;
            let res = cu_set_current(ctx);
            if res != 0 {
                return Err(GpuRuntimeError::ContextFailed(res));
            }

            let cu_stream_create: Symbol<unsafe extern "C" fn(*mut CUstream, u32) -> i32> =
                driver.get(b"cuStreamCreate\0")?;
            let mut stream: CUstream = ptr::null_mut();
            let res = cu_stream_create(&mut stream, 0);
            if res != 0 || stream.is_null() {
                return Err(GpuRuntimeError::StreamCreateFailed(res));
            }

            let flags = get_runtime_flags().clone();
            info!(
                "CUDA runtime ready on device {} (block={} max_grid={})",
                device, flags.block_size, flags.max_grid_blocks
            );

            Ok(Self {
                memory: CudaMemoryEngine::new(Arc::clone(&driver)),
                launcher: GpuLauncher::new(Arc::clone(&driver)),
                modules: Mutex::new(Vec::new()),
                driver,
                device,
                context: ctx as usize,
                stream: stream as usize,
                block_size: flags.block_size,
                max_grid_blocks: flags.max_grid_blocks,
            })
        }
    }

    pub fn driver(&self) -> &Arc<CudaDriver> {
        &self.driver
    }

    pub fn device_ordinal(&self) -> i32 {
        self.device
    }

    pub fn loader(&self) -> CudaLoader {
        CudaLoader::new(Arc::clone(&self.driver))
    }

    /// Keeps a module loaded for as long as the runtime lives, so functions
    /// resolved from it stay valid.
    pub fn keep_module(&self, module: CudaModule) {
        self.modules.lock().push(module);
    }

    /// Makes the runtime's context current on the calling thread.
    pub fn bind(&self) -> Result<(), i32> {
        unsafe {
            let cu_set_current: Symbol<unsafe extern "C" fn(CUcontext) -> i32> = self
                .driver
                .get(b"cuCtxSetCurrent\0")
                .map_err(|_| crate::gpu::safety::error_codes::CUDA_ERROR_NOT_INITIALIZED)?;
            let res = cu_set_current(self.context as CUcontext);
            if GpuSafety::check(res, "cuCtxSetCurrent") { Ok(()) } else { Err(res) }
        }
    }

    fn stream_synchronize(&self) -> Result<(), LaunchError> {
        unsafe {
            let cu_sync: Symbol<unsafe extern "C" fn(CUstream) -> i32> =
                self.driver.get(b"cuStreamSynchronize\0")?;
            let res = cu_sync(self.stream as CUstream);
            if !GpuSafety::check(res, "cuStreamSynchronize") {
                if GpuSafety::is_sticky(res) {
                    error!("CUDA context on device {} is unusable after {}", self.device, describe(res));
                }
                return Err(LaunchError::SyncFailed(res));
            }
            Ok(())
        }
    }
}

impl Device for CudaRuntime {
    fn name(&self) -> &str {
        "cuda"
    }

    fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.alloc(bytes)
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.free(ptr)
    }

    fn copy_htod(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.copy_htod(dst, src)
    }

    fn copy_dtoh(&self, dst: &mut [u8], src: DevicePtr) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.copy_dtoh(dst, src)
    }

    fn copy_dtod(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.copy_dtod(dst, src, bytes)?;
        // Device-to-device copies may return before completion.
        self.memory.synchronize()
    }

    fn copy_htod_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.copy_htod_pitched(dst, dst_pitch, src, width)
    }

    fn copy_dtoh_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError> {
        self.bind().map_err(GpuMemoryError::ContextUnavailable)?;
        self.memory.copy_dtoh_pitched(dst, width, src, src_pitch)
    }

    fn launch(&self, kernel: &KernelHandle, params: &KernelParams) -> Result<(), LaunchError> {
        let function = match kernel.entry {
            KernelEntry::Cuda(f) => f,
            KernelEntry::Host(_) => {
                return Err(LaunchError::IncompatibleKernel(kernel.key.symbol()));
            }
        };

        self.bind().map_err(LaunchError::ContextUnavailable)?;

        let n = params.count().ok_or(LaunchError::BadParameters("missing element count"))?;
        let dims = LaunchDims::cover(n, self.block_size, self.max_grid_blocks);
        debug!(
            "launch {} n={} grid={} block={}",
            kernel.key.symbol(),
            n,
            dims.grid,
            dims.block
        );

        self.launcher.launch(self.stream as CUstream, function, dims, params)?;
        self.stream_synchronize()
    }

    fn synchronize(&self) -> Result<(), LaunchError> {
        self.bind().map_err(LaunchError::ContextUnavailable)?;
        self.stream_synchronize()
    }
}

impl Drop for CudaRuntime {
    fn drop(&mut self) {
        if self.bind().is_ok() {
            self.modules.lock().clear();
        }

        unsafe {
            if let Ok(cu_stream_destroy) = self
                .driver
                .get::<unsafe extern "C" fn(CUstream) -> i32>(b"cuStreamDestroy_v2\0")
            {
                let res = cu_stream_destroy(self.stream as CUstream);
                if res != 0 {
                    warn!("cuStreamDestroy failed with code {}", res);
                }
            }
            if let Ok(cu_release) = self
                .driver
                .get::<unsafe extern "C" fn(i32) -> i32>(b"cuDevicePrimaryCtxRelease_v2\0")
            {
                let _ = cu_release(self.device);
            }
        }
    }
}
