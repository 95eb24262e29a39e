use crate::buffer::DataType;
use crate::gpu::arch::ArchError;
use crate::gpu::launcher::LaunchError;
use crate::gpu::loader::CudaLoaderError;
use crate::gpu::memory::GpuMemoryError;
use crate::gpu::nvrtc::NvrtcError;
use crate::gpu::runtime::GpuRuntimeError;
use crate::kernel::KernelError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device allocation failed: {0}")]
    Allocation(#[source] GpuMemoryError),
    #[error("device transfer failed: {0}")]
    Transfer(#[source] GpuMemoryError),
    #[error("device release failed: {0}")]
    Release(#[source] GpuMemoryError),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("buffer used after release")]
    UseAfterRelease,
    #[error("operands belong to different contexts")]
    ContextMismatch,
    #[error("range offset={offset} count={count} stride={stride} exceeds buffer of length {len}")]
    OutOfBounds {
        offset: usize,
        count: usize,
        stride: usize,
        len: usize,
    },
    #[error("{indices} indices given for {values} values")]
    LengthMismatch { indices: usize, values: usize },
    #[error("stride must be at least 1")]
    InvalidStride,
    #[error("complex view needs an even length, buffer has {0} elements")]
    OddComplexLength(usize),
    #[error(transparent)]
    Kernel(KernelError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Runtime(#[from] GpuRuntimeError),
    #[error(transparent)]
    Loader(#[from] CudaLoaderError),
    #[error(transparent)]
    Nvrtc(#[from] NvrtcError),
    #[error(transparent)]
    Arch(#[from] ArchError),
}

impl Error {
    pub(crate) fn allocation(e: GpuMemoryError) -> Self {
        match e {
            GpuMemoryError::Released => Error::UseAfterRelease,
            e => Error::Allocation(e),
        }
    }

    pub(crate) fn transfer(e: GpuMemoryError) -> Self {
        match e {
            GpuMemoryError::Released => Error::UseAfterRelease,
            e => Error::Transfer(e),
        }
    }

    pub(crate) fn release(e: GpuMemoryError) -> Self {
        match e {
            GpuMemoryError::Released => Error::UseAfterRelease,
            e => Error::Release(e),
        }
    }

    pub(crate) fn type_mismatch(expected: DataType, found: DataType) -> Self {
        Error::TypeMismatch { expected, found }
    }
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::Unsupported(symbol) => Error::UnsupportedOperation(symbol),
            e => Error::Kernel(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
