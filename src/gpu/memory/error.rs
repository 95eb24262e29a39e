use crate::gpu::device::{CopyKind, DevicePtr};
use crate::gpu::runtime::MissingSymbol;
use crate::gpu::safety::describe;

#[derive(Debug, thiserror::Error)]
pub enum GpuMemoryError {
    #[error(transparent)]
    MissingSymbol(#[from] MissingSymbol),
    #[error("invalid allocation size: {0} bytes")]
    InvalidSize(usize),
    #[error("allocation of {bytes} bytes failed: {}", describe(*.code))]
    AllocationFailed { bytes: usize, code: i32 },
    #[error("{kind} copy of {bytes} bytes failed: {}", describe(*.code))]
    CopyFailed { kind: CopyKind, bytes: usize, code: i32 },
    #[error("free of {ptr:#x} failed: {}", describe(*.code))]
    FreeFailed { ptr: DevicePtr, code: i32 },
    #[error("address range {ptr:#x}+{bytes} is not inside a live allocation")]
    InvalidAddress { ptr: DevicePtr, bytes: usize },
    #[error("device context unavailable: {}", describe(*.0))]
    ContextUnavailable(i32),
    #[error("device memory handle already released")]
    Released,
}
