use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::NvrtcError;

/// On-disk PTX cache keyed by a hash of the source text and target
/// architecture, so an edited kernel never reuses stale PTX.
pub struct KernelCache {
    root: PathBuf,
}

impl KernelCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, NvrtcError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(KernelCache { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key(source: &str, arch: &str) -> u64 {
        let mut h = DefaultHasher::new();
        source.hash(&mut h);
        arch.hash(&mut h);
        h.finish()
    }

    pub fn get_path(&self, name: &str, key: u64) -> PathBuf {
        self.root.join(format!("{}-{:016x}.ptx", name, key))
    }

    pub fn save(&self, name: &str, key: u64, ptx: &str) -> Result<(), NvrtcError> {
        let path = self.get_path(name, key);
        let mut file = File::create(&path)?;
        file.write_all(ptx.as_bytes())?;
        debug!("cached PTX at {}", path.display());
        Ok(())
    }

    /// Like [`save`](Self::save), but a failed write is only logged; the
    /// PTX is still usable and is recompiled next time.
    pub fn store(&self, name: &str, key: u64, ptx: &str) {
        if let Err(e) = self.save(name, key, ptx) {
            warn!("could not cache PTX for {} in {}: {}", name, self.root.display(), e);
        }
    }

    pub fn load(&self, name: &str, key: u64) -> Option<String> {
        fs::read_to_string(self.get_path(name, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("devbuf-cache-{}", std::process::id()));
        let cache = KernelCache::new(&dir).unwrap();
        let key = KernelCache::key("extern \"C\" __global__ void k() {}", "compute_80");

        assert!(cache.load("catalog", key).is_none());
        cache.save("catalog", key, ".version 8.0").unwrap();
        assert_eq!(cache.load("catalog", key).as_deref(), Some(".version 8.0"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn store_survives_unwritable_root() {
        let dir = std::env::temp_dir().join(format!("devbuf-cache-gone-{}", std::process::id()));
        let cache = KernelCache::new(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert!(cache.save("catalog", 7, ".version 8.0").is_err());
        cache.store("catalog", 7, ".version 8.0");
        assert!(cache.load("catalog", 7).is_none());
    }

    #[test]
    fn key_depends_on_arch() {
        assert_ne!(KernelCache::key("src", "compute_75"), KernelCache::key("src", "compute_80"));
    }
}
