pub mod error;
pub mod loader;

pub use error::CudaLoaderError;
pub use loader::{CudaFunction, CudaLoader, CudaModule};
