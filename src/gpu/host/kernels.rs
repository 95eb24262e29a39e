//! Host implementations of the element-wise kernels.
//!
//! They decode the same parameter block a CUDA launch receives, so a bug in
//! marshalling shows up on both backends. Dense kernels ignore offsets and
//! increments exactly like their CUDA counterparts.

use crate::buffer::{DataType, Element};
use crate::gpu::launcher::LaunchError;
use crate::kernel::{
    KernelEntry, KernelKey, KernelParams, KernelRegistry, Layout, OperandKind, PairwiseArgs, ScalarArgs,
};

use super::HostMemory;

/// A registry holding a host entry for every kernel key.
pub fn registry() -> KernelRegistry {
    KernelRegistry::with_entries(KernelKey::all().map(|key| (key, KernelEntry::Host(run_elementwise))))
}

pub fn run_elementwise(memory: &HostMemory, key: &KernelKey, params: &KernelParams) -> Result<(), LaunchError> {
    match key.dtype {
        DataType::Float => run::<f32>(memory, key, params),
        DataType::Double => run::<f64>(memory, key, params),
    }
}

fn run<T: Element>(memory: &HostMemory, key: &KernelKey, params: &KernelParams) -> Result<(), LaunchError> {
    match key.operand {
        OperandKind::Scalar => {
            let args = ScalarArgs::decode(params)?;
            if args.dtype != key.dtype {
                return Err(LaunchError::BadParameters("scalar type does not match kernel"));
            }
            let (offset, inc) = match key.layout {
                Layout::Dense => (0, 1),
                Layout::Strided => (args.offset, args.inc),
            };

            let b = T::narrow(args.scalar);
            let x = memory
                .read_elements::<T>(args.x, offset, inc, args.n)
                .map_err(LaunchError::IllegalAddress)?;
            let out: Vec<T> = x.into_iter().map(|a| key.op.apply(a, b)).collect();

            memory
                .write_elements(args.result, offset, inc, &out)
                .map_err(LaunchError::IllegalAddress)
        }
        OperandKind::Buffer => {
            let args = PairwiseArgs::decode(params)?;
            let (x_offset, inc_x, y_offset, inc_y) = match key.layout {
                Layout::Dense => (0, 1, 0, 1),
                Layout::Strided => (args.x_offset, args.inc_x, args.y_offset, args.inc_y),
            };

            let x = memory
                .read_elements::<T>(args.x, x_offset, inc_x, args.n)
                .map_err(LaunchError::IllegalAddress)?;
            let y = memory
                .read_elements::<T>(args.y, y_offset, inc_y, args.n)
                .map_err(LaunchError::IllegalAddress)?;
            let out: Vec<T> = x.into_iter().zip(y).map(|(a, b)| key.op.apply(a, b)).collect();

            memory
                .write_elements(args.result, x_offset, inc_x, &out)
                .map_err(LaunchError::IllegalAddress)
        }
    }
}
