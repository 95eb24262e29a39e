use crate::gpu::runtime::MissingSymbol;
use crate::gpu::safety::describe;

#[derive(Debug, thiserror::Error)]
pub enum CudaLoaderError {
    #[error(transparent)]
    MissingSymbol(#[from] MissingSymbol),
    #[error("cuModuleLoadData failed: {}", describe(*.0))]
    ModuleLoadFailed(i32),
    #[error("kernel not found in module: {0}")]
    FunctionNotFound(String),
    #[error("kernel name contains an interior NUL: {0:?}")]
    InvalidName(String),
}
