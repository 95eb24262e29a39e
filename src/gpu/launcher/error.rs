use crate::gpu::memory::GpuMemoryError;
use crate::gpu::runtime::MissingSymbol;
use crate::gpu::safety::describe;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    MissingSymbol(#[from] MissingSymbol),
    #[error("kernel launch failed: {}", describe(*.0))]
    LaunchFailed(i32),
    #[error("waiting for kernel completion failed: {}", describe(*.0))]
    SyncFailed(i32),
    #[error("device context unavailable: {}", describe(*.0))]
    ContextUnavailable(i32),
    #[error("kernel {0} cannot run on this device")]
    IncompatibleKernel(String),
    #[error("malformed kernel parameters: {0}")]
    BadParameters(&'static str),
    #[error("kernel argument {name} = {value} does not fit a C int")]
    ArgumentOverflow { name: &'static str, value: usize },
    #[error("illegal device memory access: {0}")]
    IllegalAddress(#[source] GpuMemoryError),
}
