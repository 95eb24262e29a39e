//! Device backends: the CUDA driver stack and the host emulator, both behind
//! the [`device::Device`] trait.

pub mod arch;
pub mod device;
pub mod host;
pub mod launcher;
pub mod loader;
pub mod memory;
pub mod nvrtc;
pub mod runtime;
pub mod safety;
