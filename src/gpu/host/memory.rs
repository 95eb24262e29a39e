use std::collections::BTreeMap;

use log::trace;
use parking_lot::Mutex;

use crate::buffer::Element;
use crate::gpu::device::{CopyKind, DevicePtr};
use crate::gpu::memory::GpuMemoryError;
use crate::gpu::safety::error_codes::CUDA_ERROR_OUT_OF_MEMORY;

const ALIGNMENT: u64 = 256;
const BASE_ADDRESS: u64 = 0x7f00_0000_0000;

struct AddressSpace {
    regions: BTreeMap<DevicePtr, Vec<u8>>,
    next: DevicePtr,
    in_use: usize,
    capacity: usize,
}

impl AddressSpace {
    /// Region base and byte offset for `[ptr, ptr + bytes)`, which must lie
    /// inside one live allocation.
    fn locate(&self, ptr: DevicePtr, bytes: usize) -> Result<(DevicePtr, usize), GpuMemoryError> {
        let (&base, region) = self
            .regions
            .range(..=ptr)
            .next_back()
            .ok_or(GpuMemoryError::InvalidAddress { ptr, bytes })?;
        let start = (ptr - base) as usize;
        match start.checked_add(bytes) {
            Some(end) if end <= region.len() => Ok((base, start)),
            _ => Err(GpuMemoryError::InvalidAddress { ptr, bytes }),
        }
    }

    fn slice(&self, ptr: DevicePtr, bytes: usize) -> Result<&[u8], GpuMemoryError> {
        let (base, start) = self.locate(ptr, bytes)?;
        Ok(&self.regions[&base][start..start + bytes])
    }

    fn slice_mut(&mut self, ptr: DevicePtr, bytes: usize) -> Result<&mut [u8], GpuMemoryError> {
        let (base, start) = self.locate(ptr, bytes)?;
        let region = self
            .regions
            .get_mut(&base)
            .ok_or(GpuMemoryError::InvalidAddress { ptr, bytes })?;
        Ok(&mut region[start..start + bytes])
    }
}

/// Bytes spanned by `rows` rows of `width` bytes placed `pitch` apart.
fn pitched_span(rows: usize, width: usize, pitch: usize) -> Option<usize> {
    if rows == 0 {
        return Some(0);
    }
    (rows - 1).checked_mul(pitch)?.checked_add(width)
}

/// Emulated device address space.
///
/// Allocations are zero-filled, 256-byte aligned and never reuse an address,
/// so a stale pointer is always reported as invalid rather than aliasing a
/// newer allocation. Every access must stay inside a single live allocation.
pub struct HostMemory {
    space: Mutex<AddressSpace>,
}

impl HostMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            space: Mutex::new(AddressSpace {
                regions: BTreeMap::new(),
                next: BASE_ADDRESS,
                in_use: 0,
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.space.lock().capacity
    }

    pub fn in_use(&self) -> usize {
        self.space.lock().in_use
    }

    pub fn live_allocations(&self) -> usize {
        self.space.lock().regions.len()
    }

    pub fn alloc(&self, bytes: usize) -> Result<DevicePtr, GpuMemoryError> {
        if bytes == 0 {
            return Err(GpuMemoryError::InvalidSize(bytes));
        }

        let mut space = self.space.lock();
        if space.capacity - space.in_use < bytes {
            return Err(GpuMemoryError::AllocationFailed {
                bytes,
                code: CUDA_ERROR_OUT_OF_MEMORY,
            });
        }

        let ptr = space.next;
        let span = (bytes as u64).div_ceil(ALIGNMENT) * ALIGNMENT;
        space.next += span + ALIGNMENT;
        space.in_use += bytes;
        space.regions.insert(ptr, vec![0u8; bytes]);

        trace!("host alloc {} bytes -> {:#x}", bytes, ptr);
        Ok(ptr)
    }

    pub fn free(&self, ptr: DevicePtr) -> Result<(), GpuMemoryError> {
        let mut space = self.space.lock();
        let region = space
            .regions
            .remove(&ptr)
            .ok_or(GpuMemoryError::InvalidAddress { ptr, bytes: 0 })?;
        space.in_use -= region.len();
        Ok(())
    }

    pub fn read(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), GpuMemoryError> {
        let space = self.space.lock();
        dst.copy_from_slice(space.slice(src, dst.len())?);
        trace!("{} {} bytes from {:#x}", CopyKind::DeviceToHost, dst.len(), src);
        Ok(())
    }

    pub fn write(&self, dst: DevicePtr, src: &[u8]) -> Result<(), GpuMemoryError> {
        let mut space = self.space.lock();
        space.slice_mut(dst, src.len())?.copy_from_slice(src);
        trace!("{} {} bytes to {:#x}", CopyKind::HostToDevice, src.len(), dst);
        Ok(())
    }

    pub fn copy(&self, dst: DevicePtr, src: DevicePtr, bytes: usize) -> Result<(), GpuMemoryError> {
        let mut space = self.space.lock();
        let staged = space.slice(src, bytes)?.to_vec();
        space.slice_mut(dst, bytes)?.copy_from_slice(&staged);
        Ok(())
    }

    pub fn read_pitched(
        &self,
        dst: &mut [u8],
        width: usize,
        src: DevicePtr,
        src_pitch: usize,
    ) -> Result<(), GpuMemoryError> {
        if width == 0 || dst.len() % width != 0 || src_pitch < width {
            return Err(GpuMemoryError::InvalidSize(width));
        }
        let rows = dst.len() / width;
        let span = pitched_span(rows, width, src_pitch).ok_or(GpuMemoryError::InvalidSize(src_pitch))?;

        let space = self.space.lock();
        let region = space.slice(src, span)?;
        for (row, chunk) in dst.chunks_exact_mut(width).enumerate() {
            let start = row * src_pitch;
            chunk.copy_from_slice(&region[start..start + width]);
        }
        Ok(())
    }

    pub fn write_pitched(
        &self,
        dst: DevicePtr,
        dst_pitch: usize,
        src: &[u8],
        width: usize,
    ) -> Result<(), GpuMemoryError> {
        if width == 0 || src.len() % width != 0 || dst_pitch < width {
            return Err(GpuMemoryError::InvalidSize(width));
        }
        let rows = src.len() / width;
        let span = pitched_span(rows, width, dst_pitch).ok_or(GpuMemoryError::InvalidSize(dst_pitch))?;

        let mut space = self.space.lock();
        let region = space.slice_mut(dst, span)?;
        for (row, chunk) in src.chunks_exact(width).enumerate() {
            let start = row * dst_pitch;
            region[start..start + width].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Reads `n` elements at `offset + i * inc` from the array at `base`.
    pub fn read_elements<T: Element>(
        &self,
        base: DevicePtr,
        offset: usize,
        inc: usize,
        n: usize,
    ) -> Result<Vec<T>, GpuMemoryError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let size = std::mem::size_of::<T>();
        let (start, span) = element_span::<T>(base, offset, inc, n)?;

        let space = self.space.lock();
        let bytes = space.slice(start, span)?;
        Ok((0..n)
            .map(|i| bytemuck::pod_read_unaligned::<T>(&bytes[i * inc * size..(i * inc + 1) * size]))
            .collect())
    }

    /// Writes `values[i]` to `offset + i * inc` of the array at `base`.
    pub fn write_elements<T: Element>(
        &self,
        base: DevicePtr,
        offset: usize,
        inc: usize,
        values: &[T],
    ) -> Result<(), GpuMemoryError> {
        if values.is_empty() {
            return Ok(());
        }
        let size = std::mem::size_of::<T>();
        let (start, span) = element_span::<T>(base, offset, inc, values.len())?;

        let mut space = self.space.lock();
        let bytes = space.slice_mut(start, span)?;
        for (i, value) in values.iter().enumerate() {
            bytes[i * inc * size..(i * inc + 1) * size].copy_from_slice(bytemuck::bytes_of(value));
        }
        Ok(())
    }
}

/// First address and byte span covered by `n > 0` strided elements.
fn element_span<T>(base: DevicePtr, offset: usize, inc: usize, n: usize) -> Result<(DevicePtr, usize), GpuMemoryError> {
    let size = std::mem::size_of::<T>();
    let invalid = || GpuMemoryError::InvalidAddress { ptr: base, bytes: usize::MAX };
    let start = offset
        .checked_mul(size)
        .and_then(|bytes| base.checked_add(bytes as u64))
        .ok_or_else(invalid)?;
    let span = inc
        .checked_mul(size)
        .and_then(|pitch| pitched_span(n, size, pitch))
        .ok_or_else(invalid)?;
    Ok((start, span))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_distinct() {
        let mem = HostMemory::new(4096);
        let a = mem.alloc(10).unwrap();
        let b = mem.alloc(10).unwrap();
        assert_eq!(a % ALIGNMENT, 0);
        assert_eq!(b % ALIGNMENT, 0);
        assert_ne!(a, b);
        assert_eq!(mem.in_use(), 20);
    }

    #[test]
    fn capacity_is_enforced() {
        let mem = HostMemory::new(64);
        assert_eq!(mem.capacity(), 64);
        mem.alloc(48).unwrap();
        assert!(matches!(
            mem.alloc(32),
            Err(GpuMemoryError::AllocationFailed { bytes: 32, .. })
        ));
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mem = HostMemory::new(1024);
        let ptr = mem.alloc(16).unwrap();
        let mut buf = [0u8; 8];
        assert!(mem.read(ptr + 8, &mut buf).is_ok());
        assert!(matches!(
            mem.read(ptr + 9, &mut buf),
            Err(GpuMemoryError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn freed_pointer_is_invalid() {
        let mem = HostMemory::new(1024);
        let ptr = mem.alloc(16).unwrap();
        mem.free(ptr).unwrap();
        assert_eq!(mem.in_use(), 0);
        assert!(mem.free(ptr).is_err());
        assert!(mem.write(ptr, &[1, 2]).is_err());
    }

    #[test]
    fn strided_elements_touch_only_their_slots() {
        let mem = HostMemory::new(1024);
        let ptr = mem.alloc(8 * 4).unwrap();
        mem.write_elements::<f32>(ptr, 1, 3, &[1.0, 2.0, 3.0]).unwrap();

        let all = mem.read_elements::<f32>(ptr, 0, 1, 8).unwrap();
        assert_eq!(all, vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0]);
        assert!(mem.read_elements::<f32>(ptr, 2, 3, 3).is_err());
    }

    #[test]
    fn pitched_round_trip() {
        let mem = HostMemory::new(1024);
        let ptr = mem.alloc(6 * 8).unwrap();
        let values = [1.5f64, -2.0, 4.25];
        mem.write_pitched(ptr, 16, bytemuck::cast_slice(&values), 8).unwrap();

        let mut out = [0.0f64; 3];
        mem.read_pitched(bytemuck::cast_slice_mut(&mut out), 8, ptr, 16).unwrap();
        assert_eq!(out, values);
        assert_eq!(mem.read_elements::<f64>(ptr, 1, 2, 2).unwrap(), vec![0.0, 0.0]);
    }
}
