pub mod context;
pub mod driver;
pub mod error;

pub use context::CudaRuntime;
pub use driver::{CudaDriver, MissingSymbol};
pub use error::GpuRuntimeError;
