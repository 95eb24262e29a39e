use super::driver::MissingSymbol;
use crate::gpu::safety::describe;

#[derive(Debug, thiserror::Error)]
pub enum GpuRuntimeError {
    #[error("CUDA driver not found")]
    DriverNotFound,
    #[error(transparent)]
    MissingSymbol(#[from] MissingSymbol),
    #[error("failed to initialize CUDA driver: {}", describe(*.0))]
    InitFailed(i32),
    #[error("no CUDA device available: {}", describe(*.0))]
    NoDevice(i32),
    #[error("failed to retain CUDA context: {}", describe(*.0))]
    ContextFailed(i32),
    #[error("failed to create CUDA stream: {}", describe(*.0))]
    StreamCreateFailed(i32),
}
