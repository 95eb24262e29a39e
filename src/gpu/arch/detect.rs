use std::sync::Arc;

use libloading::Symbol;

use super::ArchError;
use crate::gpu::runtime::CudaDriver;

const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR: i32 = 75;
const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR: i32 = 76;

pub struct CudaArchDetector {
    driver: Arc<CudaDriver>,
    device: i32,
}

impl CudaArchDetector {
    pub fn new(driver: Arc<CudaDriver>, device: i32) -> Self {
        Self { driver, device }
    }

    pub fn compute_capability(&self) -> Result<(i32, i32), ArchError> {
        unsafe {
            let cu_device_get_attr: Symbol<unsafe extern "C" fn(*mut i32, i32, i32) -> i32> =
                self.driver.get(b"cuDeviceGetAttribute\0")?;

            let mut major = 0;
            let mut minor = 0;

            let res = cu_device_get_attr(&mut major, CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR, self.device);
            if res != 0 {
                return Err(ArchError::DetectionFailed(res));
            }
            let res = cu_device_get_attr(&mut minor, CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR, self.device);
            if res != 0 {
                return Err(ArchError::DetectionFailed(res));
            }

            Ok((major, minor))
        }
    }

    /// Virtual architecture flag for NVRTC, e.g. `compute_86`.
    pub fn arch_flag(&self) -> Result<String, ArchError> {
        let (major, minor) = self.compute_capability()?;
        Ok(arch_for(major, minor))
    }
}

pub fn arch_for(major: i32, minor: i32) -> String {
    // PTX targets below 5.2 are no longer accepted by current NVRTC releases.
    if major < 5 || (major == 5 && minor < 2) {
        return "compute_52".to_string();
    }
    format!("compute_{}{}", major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_capability_to_virtual_arch() {
        assert_eq!(arch_for(8, 9), "compute_89");
        assert_eq!(arch_for(7, 5), "compute_75");
        assert_eq!(arch_for(3, 5), "compute_52");
    }
}
