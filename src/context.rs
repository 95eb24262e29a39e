//! A device paired with the kernels that run on it.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use once_cell::sync::OnceCell;

use crate::config::{get_runtime_flags, BackendKind};
use crate::error::Result;
use crate::gpu::arch::CudaArchDetector;
use crate::gpu::device::Device;
use crate::gpu::host::{kernels as host_kernels, HostDevice};
use crate::gpu::nvrtc::{KernelCache, NvrtcCompiler};
use crate::gpu::runtime::CudaRuntime;
use crate::kernel::{catalog, KernelKey, KernelParams, KernelRegistry};

static GLOBAL: OnceCell<Arc<Context>> = OnceCell::new();

/// Everything needed to execute on one device. Buffers hold an `Arc` to
/// the context they were allocated in; operands of one operation must share
/// the same context.
pub struct Context {
    device: Arc<dyn Device>,
    registry: KernelRegistry,
}

impl Context {
    pub fn new(device: Arc<dyn Device>, registry: KernelRegistry) -> Arc<Self> {
        Arc::new(Self { device, registry })
    }

    /// Host emulator sized by `DEVBUF_HOST_CAPACITY`.
    pub fn host() -> Arc<Self> {
        let capacity = get_runtime_flags().host_capacity;
        Self::host_with_capacity(capacity)
    }

    pub fn host_with_capacity(capacity: usize) -> Arc<Self> {
        debug!("host context with {} bytes", capacity);
        Self::new(Arc::new(HostDevice::new(capacity)), host_kernels::registry())
    }

    /// Brings up device 0 and compiles the kernel catalog for it.
    pub fn cuda() -> Result<Arc<Self>> {
        let flags = get_runtime_flags().clone();
        let runtime = CudaRuntime::new()?;

        let arch = if flags.cuda_arch == "auto" {
            CudaArchDetector::new(Arc::clone(runtime.driver()), runtime.device_ordinal()).arch_flag()?
        } else {
            flags.cuda_arch.clone()
        };

        let mut compiler = NvrtcCompiler::new()?;
        if let Some(dir) = &flags.kernel_cache {
            compiler = compiler.with_cache(KernelCache::new(dir)?);
        }

        let registry = catalog::load_cuda_kernels(&runtime, &compiler, &arch)?;
        info!("CUDA context ready ({})", arch);
        Ok(Self::new(Arc::new(runtime), registry))
    }

    /// The process-wide default context, created on first use from the
    /// runtime flags. A failed bring-up is not cached.
    pub fn global() -> Result<Arc<Self>> {
        GLOBAL
            .get_or_try_init(|| {
                let backend = get_runtime_flags().backend;
                match backend {
                    BackendKind::Host => Ok(Self::host()),
                    BackendKind::Cuda => Self::cuda(),
                    BackendKind::Auto => match Self::cuda() {
                        Ok(ctx) => Ok(ctx),
                        Err(e) => {
                            warn!("CUDA unavailable ({}), falling back to host device", e);
                            Ok(Self::host())
                        }
                    },
                }
            })
            .map(Arc::clone)
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    /// Resolves `key` and runs it to completion.
    pub fn launch(&self, key: &KernelKey, params: &KernelParams) -> Result<()> {
        let kernel = self.registry.resolve(key)?;
        self.device.launch(&kernel, params)?;
        Ok(())
    }

    pub fn synchronize(&self) -> Result<()> {
        self.device.synchronize()?;
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("device", &self.device.name())
            .field("kernels", &self.registry.len())
            .finish()
    }
}
