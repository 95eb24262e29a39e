//! Kernel identities, launch parameters and the registry that maps one to
//! the other's entry point.

pub mod catalog;
pub mod key;
pub mod params;
pub mod registry;

pub use key::{ElementwiseOp, KernelKey, Layout, OperandKind};
pub use params::{KernelArg, KernelParams, PairwiseArgs, ScalarArgs};
pub use registry::{HostKernel, KernelEntry, KernelError, KernelHandle, KernelRegistry};
