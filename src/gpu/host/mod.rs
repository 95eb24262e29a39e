pub mod device;
pub mod kernels;
pub mod memory;

pub use device::HostDevice;
pub use memory::HostMemory;
