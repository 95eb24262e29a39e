#[derive(Debug, thiserror::Error)]
pub enum NvrtcError {
    #[error("NVRTC library not found")]
    LoadError,
    #[error("missing NVRTC symbol: {0}")]
    MissingSymbol(String),
    #[error("NVRTC compilation failed:\n{0}")]
    CompilationError(String),
    #[error("kernel cache I/O failed: {0}")]
    IoError(#[from] std::io::Error),
}
