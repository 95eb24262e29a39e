use std::ffi::{c_char, c_void, CString};
use std::ptr;
use std::sync::Arc;

use libloading::Symbol;
use log::{debug, warn};

use super::CudaLoaderError;
use crate::gpu::runtime::{CudaDriver, MissingSymbol};

type CUmodule = *mut c_void;
type CUfunction = *mut c_void;

/// A loaded module. Unloaded on drop; functions resolved from it are only
/// valid while it lives.
pub struct CudaModule {
    handle: u64,
    driver: Arc<CudaDriver>,
}

impl CudaModule {
    pub fn handle(&self) -> u64 {
        self.handle
    }
}

impl Drop for CudaModule {
    fn drop(&mut self) {
        unsafe {
            if let Ok(cu_unload) = self
                .driver
                .get::<unsafe extern "C" fn(CUmodule) -> i32>(b"cuModuleUnload\0")
            {
                let res = cu_unload(self.handle as usize as CUmodule);
                if res != 0 {
                    warn!("cuModuleUnload failed with code {}", res);
                }
            }
        }
    }
}

/// A kernel entry point. Stored as an integer so registries holding it stay
/// `Send + Sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CudaFunction {
    pub handle: u64,
}

pub struct CudaLoader {
    driver: Arc<CudaDriver>,
}

impl CudaLoader {
    pub fn new(driver: Arc<CudaDriver>) -> Self {
        Self { driver }
    }

    unsafe fn get_symbol<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, MissingSymbol> {
        unsafe { self.driver.get(name) }
    }

    /// Loads PTX text into the current context.
    pub fn load_module_from_ptx(&self, ptx: &str) -> Result<CudaModule, CudaLoaderError> {
        let image = CString::new(ptx).map_err(|_| CudaLoaderError::InvalidName("<ptx>".into()))?;

        unsafe {
            let cu_module_load_data: Symbol<unsafe extern "C" fn(*mut CUmodule, *const c_void) -> i32> =
                self.get_symbol(b"cuModuleLoadData\0")?;

            let mut module: CUmodule = ptr::null_mut();
            let res = cu_module_load_data(&mut module, image.as_ptr() as *const c_void);

            if res != 0 || module.is_null() {
                return Err(CudaLoaderError::ModuleLoadFailed(res));
            }

            debug!("loaded module ({} bytes of PTX)", ptx.len());
            Ok(CudaModule {
                handle: module as usize as u64,
                driver: Arc::clone(&self.driver),
            })
        }
    }

    pub fn get_function(&self, module: &CudaModule, name: &str) -> Result<CudaFunction, CudaLoaderError> {
        let cname = CString::new(name).map_err(|_| CudaLoaderError::InvalidName(name.into()))?;

        unsafe {
            let cu_get_function: Symbol<unsafe extern "C" fn(*mut CUfunction, CUmodule, *const c_char) -> i32> =
                self.get_symbol(b"cuModuleGetFunction\0")?;

            let mut func: CUfunction = ptr::null_mut();
            let res = cu_get_function(&mut func, module.handle as usize as CUmodule, cname.as_ptr());

            if res != 0 || func.is_null() {
                return Err(CudaLoaderError::FunctionNotFound(name.into()));
            }

            Ok(CudaFunction { handle: func as usize as u64 })
        }
    }
}
