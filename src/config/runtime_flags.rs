use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

/// Which device `Context::global` brings up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// CUDA when a driver and device are present, otherwise the host emulator.
    #[default]
    Auto,
    Cuda,
    Host,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "cuda" | "gpu" => Ok(BackendKind::Cuda),
            "host" | "cpu" => Ok(BackendKind::Host),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeFlags {
    pub backend: BackendKind,
    /// `compute_XX` / `sm_XX`, or `auto` to query the device.
    pub cuda_arch: String,
    pub block_size: u32,
    pub max_grid_blocks: u32,
    /// Byte capacity of the host-emulated device.
    pub host_capacity: usize,
    /// Directory for compiled PTX; no caching when unset.
    pub kernel_cache: Option<PathBuf>,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            cuda_arch: "auto".to_string(),
            block_size: 256,
            max_grid_blocks: 4096,
            host_capacity: 1 << 30,
            kernel_cache: None,
        }
    }
}

impl RuntimeFlags {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds flags from `lookup`, keeping the default for any variable that
    /// is unset or does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let kernel_cache = lookup("DEVBUF_KERNEL_CACHE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let cuda_arch = lookup("DEVBUF_CUDA_ARCH")
            .map(|v| v.trim().to_string())
            .filter(|v| v == "auto" || v.starts_with("compute_") || v.starts_with("sm_"))
            .unwrap_or(defaults.cuda_arch);

        Self {
            backend: parse(&lookup, "DEVBUF_BACKEND", defaults.backend),
            cuda_arch,
            block_size: parse_positive(&lookup, "DEVBUF_BLOCK_SIZE", defaults.block_size),
            max_grid_blocks: parse_positive(&lookup, "DEVBUF_MAX_GRID", defaults.max_grid_blocks),
            host_capacity: parse(&lookup, "DEVBUF_HOST_CAPACITY", defaults.host_capacity),
            kernel_cache,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr,
{
    match lookup(name) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring {}={:?}: not a valid value", name, raw);
                default
            }
        },
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u32) -> u32 {
    match parse(lookup, name, default) {
        0 => {
            warn!("ignoring {}=0: must be positive", name);
            default
        }
        v => v,
    }
}
