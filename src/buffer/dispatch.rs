//! Selects and launches the element-wise kernel for one operation.
//!
//! All validation happens before the launch, so a rejected call never
//! touches device memory. The result is addressed with the left operand's
//! span.

use log::debug;

use super::DeviceBuffer;
use crate::error::{Error, Result};
use crate::kernel::{ElementwiseOp, KernelKey, Layout, OperandKind, PairwiseArgs, ScalarArgs};

/// Offset and stride of an operand, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub stride: usize,
}

impl Span {
    pub const DENSE: Span = Span { offset: 0, stride: 1 };

    pub fn new(offset: usize, stride: usize) -> Self {
        Self { offset, stride }
    }

    pub fn is_dense(&self) -> bool {
        *self == Span::DENSE
    }

    /// `count` elements at `offset + i * stride` must all lie below `len`.
    pub fn check(&self, count: usize, len: usize) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidStride);
        }
        if count == 0 {
            return Ok(());
        }

        let last = (count - 1)
            .checked_mul(self.stride)
            .and_then(|s| s.checked_add(self.offset));
        match last {
            Some(last) if last < len => Ok(()),
            _ => Err(Error::OutOfBounds {
                offset: self.offset,
                count,
                stride: self.stride,
                len,
            }),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::DENSE
    }
}

fn check_operand(left: &DeviceBuffer, operand: &DeviceBuffer) -> Result<()> {
    if !left.shares_context(operand) {
        return Err(Error::ContextMismatch);
    }
    if operand.data_type() != left.data_type() {
        return Err(Error::type_mismatch(left.data_type(), operand.data_type()));
    }
    Ok(())
}

/// `result[span] = x[span] ∘ scalar` over `count` elements.
pub(crate) fn scalar(
    op: ElementwiseOp,
    x: &DeviceBuffer,
    span: Span,
    count: usize,
    value: f64,
    result: &DeviceBuffer,
) -> Result<()> {
    check_operand(x, result)?;
    span.check(count, x.len())?;
    span.check(count, result.len())?;
    if count == 0 {
        return Ok(());
    }

    let layout = if span.is_dense() { Layout::Dense } else { Layout::Strided };
    let key = KernelKey::new(op, OperandKind::Scalar, x.data_type(), layout);
    let params = ScalarArgs {
        n: count,
        offset: span.offset,
        dtype: x.data_type(),
        scalar: value,
        x: x.device_ptr()?,
        inc: span.stride,
        result: result.device_ptr()?,
    }
    .marshal()?;

    debug!("dispatch {} n={} on {}", key, count, x.context().name());
    x.context().launch(&key, &params)
}

/// `result[x_span] = x[x_span] ∘ y[y_span]` over `count` elements.
pub(crate) fn pairwise(
    op: ElementwiseOp,
    x: &DeviceBuffer,
    x_span: Span,
    y: &DeviceBuffer,
    y_span: Span,
    count: usize,
    result: &DeviceBuffer,
) -> Result<()> {
    check_operand(x, y)?;
    check_operand(x, result)?;
    x_span.check(count, x.len())?;
    y_span.check(count, y.len())?;
    x_span.check(count, result.len())?;
    if count == 0 {
        return Ok(());
    }

    let layout = if x_span.is_dense() && y_span.is_dense() {
        Layout::Dense
    } else {
        Layout::Strided
    };
    let key = KernelKey::new(op, OperandKind::Buffer, x.data_type(), layout);
    let params = PairwiseArgs {
        n: count,
        x_offset: x_span.offset,
        y_offset: y_span.offset,
        x: x.device_ptr()?,
        y: y.device_ptr()?,
        inc_x: x_span.stride,
        inc_y: y_span.stride,
        result: result.device_ptr()?,
    }
    .marshal()?;

    debug!("dispatch {} n={} on {}", key, count, x.context().name());
    x.context().launch(&key, &params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_bounds() {
        assert!(Span::new(2, 2).check(3, 7).is_ok());
        assert!(matches!(
            Span::new(2, 2).check(3, 6),
            Err(Error::OutOfBounds { offset: 2, count: 3, stride: 2, len: 6 })
        ));
        assert!(Span::new(100, 1).check(0, 4).is_ok());
        assert!(matches!(Span::new(0, 0).check(1, 4), Err(Error::InvalidStride)));
        assert!(Span::new(1, usize::MAX).check(3, 10).is_err());
    }
}
