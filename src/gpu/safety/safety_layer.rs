use log::warn;

use super::error_codes::{describe, CUDA_ERROR_ILLEGAL_ADDRESS, CUDA_ERROR_LAUNCH_FAILED, CUDA_SUCCESS};

pub struct GpuSafety;

impl GpuSafety {
    /// Logs a failing driver call. Returns true on success.
    pub fn check(code: i32, context: &str) -> bool {
        if code == CUDA_SUCCESS {
            return true;
        }

        warn!("CUDA error in {} -> {} ({})", context, describe(code), code);
        false
    }

    /// Sticky errors leave the context unusable; every later call on it fails.
    pub fn is_sticky(code: i32) -> bool {
        matches!(code, CUDA_ERROR_ILLEGAL_ADDRESS | CUDA_ERROR_LAUNCH_FAILED)
    }
}
