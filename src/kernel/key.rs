use std::fmt;

use num_traits::Float;

use crate::buffer::DataType;

/// Element-wise arithmetic applied as `x ∘ y`, where `x` is the buffer being
/// read and `y` the scalar or the other buffer. The reversed forms swap the
/// operands: `rsub` computes `y - x`, `rdiv` computes `y / x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementwiseOp {
    Add,
    Sub,
    Mul,
    Div,
    RSub,
    RDiv,
}

impl ElementwiseOp {
    pub const ALL: [ElementwiseOp; 6] = [
        ElementwiseOp::Add,
        ElementwiseOp::Sub,
        ElementwiseOp::Mul,
        ElementwiseOp::Div,
        ElementwiseOp::RSub,
        ElementwiseOp::RDiv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ElementwiseOp::Add => "add",
            ElementwiseOp::Sub => "sub",
            ElementwiseOp::Mul => "mul",
            ElementwiseOp::Div => "div",
            ElementwiseOp::RSub => "rsub",
            ElementwiseOp::RDiv => "rdiv",
        }
    }

    /// C expression over the operands `a` (read element) and `b`.
    pub fn c_expression(&self) -> &'static str {
        match self {
            ElementwiseOp::Add => "a + b",
            ElementwiseOp::Sub => "a - b",
            ElementwiseOp::Mul => "a * b",
            ElementwiseOp::Div => "a / b",
            ElementwiseOp::RSub => "b - a",
            ElementwiseOp::RDiv => "b / a",
        }
    }

    #[inline]
    pub fn apply<T: Float>(&self, a: T, b: T) -> T {
        match self {
            ElementwiseOp::Add => a + b,
            ElementwiseOp::Sub => a - b,
            ElementwiseOp::Mul => a * b,
            ElementwiseOp::Div => a / b,
            ElementwiseOp::RSub => b - a,
            ElementwiseOp::RDiv => b / a,
        }
    }
}

impl fmt::Display for ElementwiseOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Scalar,
    Buffer,
}

/// Addressing scheme of a kernel: `Dense` touches `0..n` contiguously,
/// `Strided` honours explicit offsets and increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Dense,
    Strided,
}

/// Identity of one compiled kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub op: ElementwiseOp,
    pub operand: OperandKind,
    pub dtype: DataType,
    pub layout: Layout,
}

impl KernelKey {
    pub fn new(op: ElementwiseOp, operand: OperandKind, dtype: DataType, layout: Layout) -> Self {
        Self { op, operand, dtype, layout }
    }

    /// Exported symbol name, e.g. `rdiv_scalar_strided_float`.
    pub fn symbol(&self) -> String {
        let mut name = String::from(self.op.name());
        if self.operand == OperandKind::Scalar {
            name.push_str("_scalar");
        }
        if self.layout == Layout::Strided {
            name.push_str("_strided");
        }
        name.push('_');
        name.push_str(self.dtype.c_name());
        name
    }

    /// Every kernel the library ships.
    pub fn all() -> impl Iterator<Item = KernelKey> {
        ElementwiseOp::ALL.into_iter().flat_map(|op| {
            [OperandKind::Scalar, OperandKind::Buffer].into_iter().flat_map(move |operand| {
                DataType::ALL.into_iter().flat_map(move |dtype| {
                    [Layout::Dense, Layout::Strided]
                        .into_iter()
                        .map(move |layout| KernelKey::new(op, operand, dtype, layout))
                })
            })
        })
    }
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn symbols_follow_naming_scheme() {
        let key = KernelKey::new(ElementwiseOp::RDiv, OperandKind::Scalar, DataType::Float, Layout::Strided);
        assert_eq!(key.symbol(), "rdiv_scalar_strided_float");

        let key = KernelKey::new(ElementwiseOp::Add, OperandKind::Buffer, DataType::Double, Layout::Dense);
        assert_eq!(key.symbol(), "add_double");
    }

    #[test]
    fn catalogue_is_complete_and_unique() {
        let symbols: HashSet<String> = KernelKey::all().map(|k| k.symbol()).collect();
        assert_eq!(symbols.len(), 48);
        assert!(symbols.contains("sub_strided_double"));
        assert!(symbols.contains("rsub_scalar_float"));
    }

    #[test]
    fn reversed_ops_swap_operands() {
        assert_eq!(ElementwiseOp::Sub.apply(5.0, 2.0), 3.0);
        assert_eq!(ElementwiseOp::RSub.apply(5.0, 2.0), -3.0);
        assert_eq!(ElementwiseOp::RDiv.apply(4.0f32, 2.0), 0.5);
    }
}
