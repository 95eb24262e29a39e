pub mod detect;
pub mod error;

pub use detect::{arch_for, CudaArchDetector};
pub use error::ArchError;
