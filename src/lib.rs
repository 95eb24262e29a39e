//! Typed numeric buffers in GPU memory with element-wise arithmetic.
//!
//! A [`DeviceBuffer`] owns one allocation on the device of its [`Context`].
//! Arithmetic runs as a single kernel launch per call, either in place or
//! into a separate result buffer, over the whole buffer or a strided subset.
//!
//! The CUDA backend loads the driver and NVRTC at runtime; without them the
//! host-emulated device provides the same semantics.

pub mod buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod gpu;
pub mod kernel;

pub use buffer::{DataType, DeviceBuffer, Element, Span};
pub use context::Context;
pub use error::{Error, Result};
pub use kernel::ElementwiseOp;
