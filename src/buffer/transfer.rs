//! Typed movement between host slices and device allocations.
//!
//! Element types are checked against the buffer's [`DataType`]; ranges are
//! not. Callers validate offsets and counts before getting here.

use log::trace;

use super::{DataType, Element};
use crate::error::{Error, Result};
use crate::gpu::memory::DeviceMemory;

fn check_type<T: Element>(dtype: DataType) -> Result<()> {
    if T::DATA_TYPE != dtype {
        return Err(Error::type_mismatch(dtype, T::DATA_TYPE));
    }
    Ok(())
}

/// Copies `host` into the first `host.len()` elements of `mem`.
pub fn copy_host_to_device<T: Element>(mem: &DeviceMemory, dtype: DataType, host: &[T]) -> Result<()> {
    write_host_to_device(mem, dtype, 0, 1, host)
}

/// Copies all of `src` over the start of `dst`.
pub fn copy_device_to_device(
    src: &DeviceMemory,
    src_type: DataType,
    dst: &DeviceMemory,
    dst_type: DataType,
) -> Result<()> {
    if src_type != dst_type {
        return Err(Error::type_mismatch(dst_type, src_type));
    }

    let bytes = src.byte_size();
    let src_ptr = src.ptr().map_err(Error::transfer)?;
    let dst_ptr = dst.ptr().map_err(Error::transfer)?;
    if bytes == 0 || src_ptr == dst_ptr {
        return Ok(());
    }

    trace!("dtod {} bytes {:#x} -> {:#x}", bytes, src_ptr, dst_ptr);
    dst.device()
        .copy_dtod(dst_ptr, src_ptr, bytes)
        .map_err(Error::transfer)
}

/// Reads `count` elements at `start + i * stride`.
pub fn read_device_to_host<T: Element>(
    mem: &DeviceMemory,
    dtype: DataType,
    start: usize,
    count: usize,
    stride: usize,
) -> Result<Vec<T>> {
    check_type::<T>(dtype)?;
    let src = mem.ptr_at(start).map_err(Error::transfer)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut out = vec![T::zero(); count];
    let size = dtype.size_in_bytes();
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut out);
    trace!("dtoh {} x {} from {:#x} stride {}", count, dtype, src, stride);

    let device = mem.device();
    let copied = if stride == 1 {
        device.copy_dtoh(bytes, src)
    } else {
        device.copy_dtoh_pitched(bytes, size, src, stride * size)
    };
    copied.map_err(Error::transfer)?;

    Ok(out)
}

/// Writes `host[i]` to element `start + i * stride`.
pub fn write_host_to_device<T: Element>(
    mem: &DeviceMemory,
    dtype: DataType,
    start: usize,
    stride: usize,
    host: &[T],
) -> Result<()> {
    check_type::<T>(dtype)?;
    let dst = mem.ptr_at(start).map_err(Error::transfer)?;
    if host.is_empty() {
        return Ok(());
    }

    let size = dtype.size_in_bytes();
    let bytes: &[u8] = bytemuck::cast_slice(host);
    trace!("htod {} x {} to {:#x} stride {}", host.len(), dtype, dst, stride);

    let device = mem.device();
    let copied = if stride == 1 {
        device.copy_htod(dst, bytes)
    } else {
        device.copy_htod_pitched(dst, stride * size, bytes, size)
    };
    copied.map_err(Error::transfer)
}
