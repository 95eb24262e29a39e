use std::fmt;
use std::sync::Arc;

use num_complex::{Complex32, Complex64};

use super::dispatch::{self, Span};
use super::{transfer, DataType, Element};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::gpu::device::DevicePtr;
use crate::gpu::memory::DeviceMemory;
use crate::kernel::ElementwiseOp;

/// A fixed-length array of `f32` or `f64` in device memory.
///
/// Reads always go to the device; nothing is mirrored on the host. The
/// buffer owns its allocation: it is freed by [`release`](Self::release) or
/// on drop, and copies are made explicitly with [`dup`](Self::dup) or
/// [`assign_buffer`](Self::assign_buffer).
///
/// If a kernel launch fails part-way, the contents of the buffer it was
/// writing are unspecified.
pub struct DeviceBuffer {
    context: Arc<Context>,
    memory: DeviceMemory,
    dtype: DataType,
}

impl DeviceBuffer {
    /// Allocates `length` uninitialized elements in the global context.
    pub fn new(length: usize, dtype: DataType) -> Result<Self> {
        Self::new_in(&Context::global()?, length, dtype)
    }

    /// Allocates `length` uninitialized elements in `context`.
    pub fn new_in(context: &Arc<Context>, length: usize, dtype: DataType) -> Result<Self> {
        let memory = DeviceMemory::allocate(Arc::clone(context.device()), length, dtype.size_in_bytes())
            .map_err(Error::allocation)?;
        Ok(Self {
            context: Arc::clone(context),
            memory,
            dtype,
        })
    }

    pub fn zeros_in(context: &Arc<Context>, length: usize, dtype: DataType) -> Result<Self> {
        let mut buffer = Self::new_in(context, length, dtype)?;
        buffer.assign(0.0)?;
        Ok(buffer)
    }

    pub fn from_slice<T: Element>(data: &[T]) -> Result<Self> {
        Self::from_slice_in(&Context::global()?, data)
    }

    pub fn from_slice_in<T: Element>(context: &Arc<Context>, data: &[T]) -> Result<Self> {
        let buffer = Self::new_in(context, data.len(), T::DATA_TYPE)?;
        transfer::copy_host_to_device(&buffer.memory, buffer.dtype, data)?;
        Ok(buffer)
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn element_size(&self) -> usize {
        self.memory.element_size()
    }

    pub fn byte_size(&self) -> usize {
        self.memory.byte_size()
    }

    pub fn data_type(&self) -> DataType {
        self.dtype
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub(crate) fn shares_context(&self, other: &DeviceBuffer) -> bool {
        Arc::ptr_eq(&self.context, &other.context)
    }

    pub(crate) fn device_ptr(&self) -> Result<DevicePtr> {
        self.memory.ptr().map_err(Error::transfer)
    }

    /// Frees the device allocation now instead of on drop.
    pub fn release(mut self) -> Result<()> {
        self.memory.release().map_err(Error::release)
    }

    fn read<T: Element>(&self, offset: usize, count: usize, stride: usize) -> Result<Vec<T>> {
        transfer::read_device_to_host(&self.memory, self.dtype, offset, count, stride)
    }

    fn write<T: Element>(&self, offset: usize, stride: usize, values: &[T]) -> Result<()> {
        transfer::write_host_to_device(&self.memory, self.dtype, offset, stride, values)
    }

    fn read_f64(&self, offset: usize, count: usize, stride: usize) -> Result<Vec<f64>> {
        Span::new(offset, stride).check(count, self.len())?;
        match self.dtype {
            DataType::Float => Ok(self
                .read::<f32>(offset, count, stride)?
                .into_iter()
                .map(Element::widen)
                .collect()),
            DataType::Double => self.read::<f64>(offset, count, stride),
        }
    }

    fn read_f32(&self, offset: usize, count: usize, stride: usize) -> Result<Vec<f32>> {
        Span::new(offset, stride).check(count, self.len())?;
        match self.dtype {
            DataType::Float => self.read::<f32>(offset, count, stride),
            DataType::Double => Ok(self
                .read::<f64>(offset, count, stride)?
                .into_iter()
                .map(f32::narrow)
                .collect()),
        }
    }

    fn write_f64(&mut self, offset: usize, stride: usize, values: &[f64]) -> Result<()> {
        Span::new(offset, stride).check(values.len(), self.len())?;
        match self.dtype {
            DataType::Float => {
                let narrowed: Vec<f32> = values.iter().copied().map(f32::narrow).collect();
                self.write(offset, stride, &narrowed)
            }
            DataType::Double => self.write(offset, stride, values),
        }
    }

    fn read_one(&self, index: usize) -> Result<f64> {
        let values = self.read_f64(index, 1, 1)?;
        Ok(values[0])
    }

    pub fn get_double(&self, index: usize) -> Result<f64> {
        self.read_one(index)
    }

    pub fn get_float(&self, index: usize) -> Result<f32> {
        Ok(self.read_f32(index, 1, 1)?[0])
    }

    /// Element `index` truncated toward zero.
    pub fn get_int(&self, index: usize) -> Result<i32> {
        Ok(self.read_one(index)? as i32)
    }

    pub fn get_doubles_at(&self, offset: usize, len: usize) -> Result<Vec<f64>> {
        self.read_f64(offset, len, 1)
    }

    pub fn get_floats_at(&self, offset: usize, len: usize) -> Result<Vec<f32>> {
        self.read_f32(offset, len, 1)
    }

    pub fn get_doubles_at_strided(&self, offset: usize, inc: usize, len: usize) -> Result<Vec<f64>> {
        self.read_f64(offset, len, inc)
    }

    pub fn get_floats_at_strided(&self, offset: usize, inc: usize, len: usize) -> Result<Vec<f32>> {
        self.read_f32(offset, len, inc)
    }

    pub fn as_double(&self) -> Result<Vec<f64>> {
        self.read_f64(0, self.len(), 1)
    }

    pub fn as_float(&self) -> Result<Vec<f32>> {
        self.read_f32(0, self.len(), 1)
    }

    pub fn as_int(&self) -> Result<Vec<i32>> {
        Ok(self.as_double()?.into_iter().map(|v| v as i32).collect())
    }

    /// Overwrites the first `data.len()` elements. `T` must match the
    /// buffer's type exactly.
    pub fn set_data<T: Element>(&mut self, data: &[T]) -> Result<()> {
        if T::DATA_TYPE != self.dtype {
            return Err(Error::type_mismatch(self.dtype, T::DATA_TYPE));
        }
        Span::DENSE.check(data.len(), self.len())?;
        self.write(0, 1, data)
    }

    pub fn put_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.write_f64(index, 1, &[value])
    }

    pub fn put_float(&mut self, index: usize, value: f32) -> Result<()> {
        self.write_f64(index, 1, &[value as f64])
    }

    pub fn put_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.write_f64(index, 1, &[value as f64])
    }

    pub fn put_doubles_at_strided(&mut self, offset: usize, inc: usize, values: &[f64]) -> Result<()> {
        self.write_f64(offset, inc, values)
    }

    pub fn put_floats_at_strided(&mut self, offset: usize, inc: usize, values: &[f32]) -> Result<()> {
        let wide: Vec<f64> = values.iter().map(|&v| v.widen()).collect();
        self.write_f64(offset, inc, &wide)
    }

    /// Writes `values[k]` to `indices[k]`. A `contiguous` index list is
    /// taken to run upward from `indices[0]` and goes out as one transfer.
    /// Nothing is written if any index is out of range.
    pub fn assign_indices(&mut self, indices: &[usize], values: &[f64], contiguous: bool) -> Result<()> {
        if indices.len() != values.len() {
            return Err(Error::LengthMismatch {
                indices: indices.len(),
                values: values.len(),
            });
        }
        let Some(&first) = indices.first() else {
            return Ok(());
        };
        if contiguous {
            return self.write_f64(first, 1, values);
        }
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(Error::OutOfBounds {
                offset: index,
                count: 1,
                stride: 1,
                len,
            });
        }
        for (&index, &value) in indices.iter().zip(values) {
            self.write_f64(index, 1, &[value])?;
        }
        Ok(())
    }

    /// Sets every element to `value`.
    pub fn assign(&mut self, value: f64) -> Result<()> {
        self.assign_from(value, 0)
    }

    /// Sets elements `offset..len` to `value`.
    pub fn assign_from(&mut self, value: f64, offset: usize) -> Result<()> {
        let len = self.len();
        if offset > len {
            return Err(Error::OutOfBounds {
                offset,
                count: 0,
                stride: 1,
                len,
            });
        }
        let fill = vec![value; len - offset];
        self.write_f64(offset, 1, &fill)
    }

    /// Copies all of `other` over the start of this buffer on the device.
    pub fn assign_buffer(&mut self, other: &DeviceBuffer) -> Result<()> {
        if !self.shares_context(other) {
            return Err(Error::ContextMismatch);
        }
        Span::DENSE.check(other.len(), self.len())?;
        transfer::copy_device_to_device(&other.memory, other.dtype, &self.memory, self.dtype)
    }

    pub fn copy_to(&self, dest: &mut DeviceBuffer) -> Result<()> {
        dest.assign_buffer(self)
    }

    /// A new buffer in the same context with the same contents.
    pub fn dup(&self) -> Result<DeviceBuffer> {
        let mut copy = Self::new_in(&self.context, self.len(), self.dtype)?;
        copy.assign_buffer(self)?;
        Ok(copy)
    }

    /// Elements `index` and `index + 1` as real and imaginary parts.
    pub fn get_complex_float(&self, index: usize) -> Result<Complex32> {
        let parts = self.read_f32(index, 2, 1)?;
        Ok(Complex32::new(parts[0], parts[1]))
    }

    pub fn get_complex_double(&self, index: usize) -> Result<Complex64> {
        let parts = self.read_f64(index, 2, 1)?;
        Ok(Complex64::new(parts[0], parts[1]))
    }

    pub fn get_complex(&self, index: usize) -> Result<Complex64> {
        match self.dtype {
            DataType::Float => {
                let c = self.get_complex_float(index)?;
                Ok(Complex64::new(c.re as f64, c.im as f64))
            }
            DataType::Double => self.get_complex_double(index),
        }
    }

    /// `count` interleaved pairs starting at `offset`.
    pub fn complex_doubles_at(&self, offset: usize, count: usize) -> Result<Vec<Complex64>> {
        let re = self.read_f64(offset, count, 2)?;
        let im = self.read_f64(offset.saturating_add(1), count, 2)?;
        Ok(re.into_iter().zip(im).map(|(re, im)| Complex64::new(re, im)).collect())
    }

    pub fn as_complex_double(&self) -> Result<Vec<Complex64>> {
        if self.len() % 2 != 0 {
            return Err(Error::OddComplexLength(self.len()));
        }
        self.complex_doubles_at(0, self.len() / 2)
    }

    /// `self[span] ∘= value` over `count` elements.
    pub fn apply_scalar_in_place(&mut self, op: ElementwiseOp, value: f64, count: usize, span: Span) -> Result<()> {
        let this: &DeviceBuffer = self;
        dispatch::scalar(op, this, span, count, value, this)
    }

    /// `result[span] = self[span] ∘ value` over `count` elements.
    pub fn apply_scalar_into(
        &self,
        op: ElementwiseOp,
        value: f64,
        count: usize,
        span: Span,
        result: &mut DeviceBuffer,
    ) -> Result<()> {
        dispatch::scalar(op, self, span, count, value, result)
    }

    /// `self[span] ∘= other[other_span]` over `count` elements.
    pub fn apply_buffer_in_place(
        &mut self,
        op: ElementwiseOp,
        other: &DeviceBuffer,
        count: usize,
        span: Span,
        other_span: Span,
    ) -> Result<()> {
        let this: &DeviceBuffer = self;
        dispatch::pairwise(op, this, span, other, other_span, count, this)
    }

    /// `self[span] ∘= self[other_span]` over `count` elements, with this
    /// buffer as both operands. Spans whose elements interleave without
    /// sharing positions are safe on every device.
    pub fn apply_self_in_place(
        &mut self,
        op: ElementwiseOp,
        count: usize,
        span: Span,
        other_span: Span,
    ) -> Result<()> {
        let this: &DeviceBuffer = self;
        dispatch::pairwise(op, this, span, this, other_span, count, this)
    }

    /// `result[span] = self[span] ∘ other[other_span]` over `count` elements.
    pub fn apply_buffer_into(
        &self,
        op: ElementwiseOp,
        other: &DeviceBuffer,
        count: usize,
        span: Span,
        other_span: Span,
        result: &mut DeviceBuffer,
    ) -> Result<()> {
        dispatch::pairwise(op, self, span, other, other_span, count, result)
    }

    /// Compares lengths, element sizes and every element as `f64`.
    pub fn content_eq(&self, other: &DeviceBuffer) -> Result<bool> {
        if self.len() != other.len() || self.element_size() != other.element_size() {
            return Ok(false);
        }
        Ok(self.as_double()? == other.as_double()?)
    }
}

macro_rules! elementwise_ops {
    ($(
        $op:expr => $in_place:ident, $in_place_scalar:ident, $into:ident, $into_scalar:ident,
        $in_place_strided:ident, $in_place_scalar_strided:ident, $into_strided:ident, $into_scalar_strided:ident,
        $in_place_self:ident, $in_place_self_strided:ident;
    )*) => {
        #[allow(clippy::should_implement_trait)]
        impl DeviceBuffer {
            $(
                pub fn $in_place(&mut self, other: &DeviceBuffer) -> Result<()> {
                    self.apply_buffer_in_place($op, other, self.len(), Span::DENSE, Span::DENSE)
                }

                pub fn $in_place_scalar(&mut self, value: f64) -> Result<()> {
                    self.apply_scalar_in_place($op, value, self.len(), Span::DENSE)
                }

                pub fn $into(&self, other: &DeviceBuffer, result: &mut DeviceBuffer) -> Result<()> {
                    self.apply_buffer_into($op, other, self.len(), Span::DENSE, Span::DENSE, result)
                }

                pub fn $into_scalar(&self, value: f64, result: &mut DeviceBuffer) -> Result<()> {
                    self.apply_scalar_into($op, value, self.len(), Span::DENSE, result)
                }

                pub fn $in_place_strided(
                    &mut self,
                    other: &DeviceBuffer,
                    count: usize,
                    span: Span,
                    other_span: Span,
                ) -> Result<()> {
                    self.apply_buffer_in_place($op, other, count, span, other_span)
                }

                pub fn $in_place_scalar_strided(&mut self, value: f64, count: usize, span: Span) -> Result<()> {
                    self.apply_scalar_in_place($op, value, count, span)
                }

                pub fn $into_strided(
                    &self,
                    other: &DeviceBuffer,
                    count: usize,
                    span: Span,
                    other_span: Span,
                    result: &mut DeviceBuffer,
                ) -> Result<()> {
                    self.apply_buffer_into($op, other, count, span, other_span, result)
                }

                pub fn $into_scalar_strided(
                    &self,
                    value: f64,
                    count: usize,
                    span: Span,
                    result: &mut DeviceBuffer,
                ) -> Result<()> {
                    self.apply_scalar_into($op, value, count, span, result)
                }

                pub fn $in_place_self(&mut self) -> Result<()> {
                    self.apply_self_in_place($op, self.len(), Span::DENSE, Span::DENSE)
                }

                pub fn $in_place_self_strided(&mut self, count: usize, span: Span, other_span: Span) -> Result<()> {
                    self.apply_self_in_place($op, count, span, other_span)
                }
            )*
        }
    };
}

elementwise_ops! {
    ElementwiseOp::Add => addi, addi_scalar, add, add_scalar,
        addi_strided, addi_scalar_strided, add_strided, add_scalar_strided,
        addi_self, addi_self_strided;
    ElementwiseOp::Sub => subi, subi_scalar, sub, sub_scalar,
        subi_strided, subi_scalar_strided, sub_strided, sub_scalar_strided,
        subi_self, subi_self_strided;
    ElementwiseOp::Mul => muli, muli_scalar, mul, mul_scalar,
        muli_strided, muli_scalar_strided, mul_strided, mul_scalar_strided,
        muli_self, muli_self_strided;
    ElementwiseOp::Div => divi, divi_scalar, div, div_scalar,
        divi_strided, divi_scalar_strided, div_strided, div_scalar_strided,
        divi_self, divi_self_strided;
    ElementwiseOp::RSub => rsubi, rsubi_scalar, rsub, rsub_scalar,
        rsubi_strided, rsubi_scalar_strided, rsub_strided, rsub_scalar_strided,
        rsubi_self, rsubi_self_strided;
    ElementwiseOp::RDiv => rdivi, rdivi_scalar, rdiv, rdiv_scalar,
        rdivi_strided, rdivi_scalar_strided, rdiv_strided, rdiv_scalar_strided,
        rdivi_self, rdivi_self_strided;
}

impl PartialEq for DeviceBuffer {
    /// A buffer that cannot be read back compares unequal.
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other).unwrap_or(false)
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.context.name())
            .field("dtype", &self.dtype)
            .field("len", &self.len())
            .field("memory", &self.memory)
            .finish()
    }
}
