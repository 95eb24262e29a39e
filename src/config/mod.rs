use std::sync::OnceLock;

use parking_lot::{Mutex, MutexGuard};

pub mod runtime_flags;

pub use runtime_flags::{BackendKind, RuntimeFlags};

static RUNTIME_FLAGS: OnceLock<Mutex<RuntimeFlags>> = OnceLock::new();

fn global_runtime_flags() -> &'static Mutex<RuntimeFlags> {
    RUNTIME_FLAGS.get_or_init(|| Mutex::new(RuntimeFlags::from_env()))
}

/// Process-wide flags, read from `DEVBUF_*` environment variables on first use.
pub fn get_runtime_flags() -> MutexGuard<'static, RuntimeFlags> {
    global_runtime_flags().lock()
}

/// Replaces the process-wide flags. Contexts already built keep the values
/// they were created with.
pub fn set_runtime_flags(flags: RuntimeFlags) {
    *global_runtime_flags().lock() = flags;
}
