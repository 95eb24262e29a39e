pub mod error_codes;
pub mod safety_layer;

pub use error_codes::{describe, CUDA_SUCCESS};
pub use safety_layer::GpuSafety;
