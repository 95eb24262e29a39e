use std::collections::HashMap;

use log::debug;

use super::{KernelKey, KernelParams};
use crate::gpu::host::HostMemory;
use crate::gpu::launcher::LaunchError;
use crate::gpu::loader::CudaFunction;

#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("kernel {0} is already registered")]
    AlreadyRegistered(String),
    #[error("no kernel registered for {0}")]
    Unsupported(String),
}

/// Emulated kernel body: runs over the host address space synchronously.
pub type HostKernel = fn(&HostMemory, &KernelKey, &KernelParams) -> Result<(), LaunchError>;

#[derive(Debug, Clone, Copy)]
pub enum KernelEntry {
    Cuda(CudaFunction),
    Host(HostKernel),
}

/// A resolved kernel, ready to hand to [`Device::launch`](crate::gpu::device::Device::launch).
#[derive(Debug, Clone, Copy)]
pub struct KernelHandle {
    pub key: KernelKey,
    pub entry: KernelEntry,
}

/// Append-only map from kernel identity to its entry point.
///
/// Populated once when a context is brought up and read-only afterwards.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: HashMap<KernelKey, KernelEntry>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from `entries`; the first entry for a key wins.
    pub fn with_entries(entries: impl IntoIterator<Item = (KernelKey, KernelEntry)>) -> Self {
        let mut kernels = HashMap::new();
        for (key, entry) in entries {
            kernels.entry(key).or_insert(entry);
        }
        Self { kernels }
    }

    pub fn register(&mut self, key: KernelKey, entry: KernelEntry) -> Result<(), KernelError> {
        if self.kernels.contains_key(&key) {
            return Err(KernelError::AlreadyRegistered(key.symbol()));
        }
        debug!("registered kernel {}", key);
        self.kernels.insert(key, entry);
        Ok(())
    }

    pub fn resolve(&self, key: &KernelKey) -> Result<KernelHandle, KernelError> {
        self.kernels
            .get(key)
            .map(|entry| KernelHandle { key: *key, entry: *entry })
            .ok_or_else(|| KernelError::Unsupported(key.symbol()))
    }

    pub fn contains(&self, key: &KernelKey) -> bool {
        self.kernels.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KernelKey> {
        self.kernels.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DataType;
    use crate::kernel::{ElementwiseOp, Layout, OperandKind};

    fn noop(_: &HostMemory, _: &KernelKey, _: &KernelParams) -> Result<(), LaunchError> {
        Ok(())
    }

    fn key() -> KernelKey {
        KernelKey::new(ElementwiseOp::Mul, OperandKind::Buffer, DataType::Double, Layout::Dense)
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = KernelRegistry::new();
        registry.register(key(), KernelEntry::Host(noop)).unwrap();
        assert!(matches!(
            registry.register(key(), KernelEntry::Host(noop)),
            Err(KernelError::AlreadyRegistered(name)) if name == "mul_double"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_kernel_is_unsupported() {
        let registry = KernelRegistry::new();
        assert!(matches!(registry.resolve(&key()), Err(KernelError::Unsupported(_))));
    }

    #[test]
    fn resolve_returns_registered_key() {
        let registry = KernelRegistry::with_entries([(key(), KernelEntry::Host(noop))]);
        let handle = registry.resolve(&key()).unwrap();
        assert_eq!(handle.key, key());
        assert!(matches!(handle.entry, KernelEntry::Host(_)));
    }
}
