use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use libloading::Symbol;

use super::LaunchError;
use crate::gpu::loader::CudaFunction;
use crate::gpu::runtime::CudaDriver;
use crate::gpu::safety::GpuSafety;
use crate::kernel::KernelParams;

/// One-dimensional launch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDims {
    pub grid: u32,
    pub block: u32,
}

impl LaunchDims {
    /// Enough blocks to give every element a thread, capped at `max_grid`;
    /// kernels use grid-stride loops to cover the remainder.
    pub fn cover(n: usize, block: u32, max_grid: u32) -> Self {
        let block = block.max(1);
        let needed = n.div_ceil(block as usize).max(1);
        let grid = needed.min(max_grid.max(1) as usize) as u32;
        Self { grid, block }
    }
}

pub struct GpuLauncher {
    driver: Arc<CudaDriver>,
}

impl GpuLauncher {
    pub fn new(driver: Arc<CudaDriver>) -> Self {
        Self { driver }
    }

    /// Enqueues `func` on `stream`. The caller synchronizes.
    pub fn launch(
        &self,
        stream: *mut c_void,
        func: CudaFunction,
        dims: LaunchDims,
        params: &KernelParams,
    ) -> Result<(), LaunchError> {
        unsafe {
            let cu_launch: Symbol<
                unsafe extern "C" fn(
                    cufunc: *mut c_void,
                    grid_x: u32, grid_y: u32, grid_z: u32,
                    block_x: u32, block_y: u32, block_z: u32,
                    shared_mem: u32,
                    stream: *mut c_void,
                    args: *mut *mut c_void,
                    extra: *mut *mut c_void,
                ) -> i32
            > = self.driver.get(b"cuLaunchKernel\0")?;

            // The argument array points into `params`, which outlives the call.
            let mut args = params.raw_args();

            let res = cu_launch(
                func.handle as usize as *mut c_void,
                dims.grid, 1, 1,
                dims.block, 1, 1,
                0,
                stream,
                args.as_mut_ptr(),
                ptr::null_mut(),
            );

            if !GpuSafety::check(res, "cuLaunchKernel") {
                return Err(LaunchError::LaunchFailed(res));
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_cover_all_elements() {
        assert_eq!(LaunchDims::cover(1000, 256, 4096), LaunchDims { grid: 4, block: 256 });
        assert_eq!(LaunchDims::cover(256, 256, 4096), LaunchDims { grid: 1, block: 256 });
        assert_eq!(LaunchDims::cover(1, 256, 4096).grid, 1);
    }

    #[test]
    fn dims_respect_grid_cap() {
        let dims = LaunchDims::cover(10_000_000, 256, 4096);
        assert_eq!(dims.grid, 4096);
    }
}
