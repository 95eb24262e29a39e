use libloading::{Library, Symbol};
use log::info;

use super::GpuRuntimeError;

/// Raised when the loaded driver does not export an entry point.
#[derive(Debug, Clone, thiserror::Error)]
#[error("missing CUDA symbol: {0}")]
pub struct MissingSymbol(pub String);

/// The CUDA driver library, loaded once and shared by every component that
/// issues driver calls.
pub struct CudaDriver {
    lib: Library,
}

impl CudaDriver {
    pub fn load() -> Result<Self, GpuRuntimeError> {
        unsafe {
            let lib = Library::new("nvcuda.dll")
                .or_else(|_| Library::new("libcuda.so"))
                .or_else(|_| Library::new("libcuda.so.1"))
                .map_err(|_| GpuRuntimeError::DriverNotFound)?;

            info!("CUDA driver loaded");
            Ok(Self { lib })
        }
    }

    /// Looks up a driver entry point. `name` must be NUL-terminated.
    ///
    /// # Safety
    ///
    /// `T` must match the C signature of the named symbol.
    pub unsafe fn get<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, MissingSymbol> {
        unsafe {
            self.lib.get(name).map_err(|_| {
                let trimmed = name.strip_suffix(b"\0").unwrap_or(name);
                MissingSymbol(String::from_utf8_lossy(trimmed).into_owned())
            })
        }
    }
}
