//! The buffer façade and the layers directly beneath it.

pub mod data_buffer;
pub mod dispatch;
pub mod dtype;
pub mod transfer;

pub use data_buffer::DeviceBuffer;
pub use dispatch::Span;
pub use dtype::{DataType, Element};
