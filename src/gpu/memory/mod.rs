pub mod engine;
pub mod error;
pub mod handle;

pub use engine::CudaMemoryEngine;
pub use error::GpuMemoryError;
pub use handle::DeviceMemory;
