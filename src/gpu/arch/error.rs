use crate::gpu::runtime::MissingSymbol;

#[derive(Debug, thiserror::Error)]
pub enum ArchError {
    #[error(transparent)]
    MissingSymbol(#[from] MissingSymbol),
    #[error("failed to query compute capability (code {0})")]
    DetectionFailed(i32),
}
