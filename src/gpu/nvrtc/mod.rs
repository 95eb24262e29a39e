pub mod cache;
pub mod compiler;
pub mod error;

pub use cache::KernelCache;
pub use compiler::{NvrtcCompiler, NvrtcProgram};
pub use error::NvrtcError;
