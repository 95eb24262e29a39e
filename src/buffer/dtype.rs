use std::fmt;

use num_traits::Float;

/// Numeric representation of a buffer's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Double,
}

impl DataType {
    pub const ALL: [DataType; 2] = [DataType::Float, DataType::Double];

    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    /// C type name; also the suffix of every compiled kernel symbol.
    pub fn c_name(&self) -> &'static str {
        match self {
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

/// Host element types that map one-to-one onto a [`DataType`].
pub trait Element: bytemuck::Pod + Float + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn widen(self) -> f64;

    fn narrow(value: f64) -> Self;
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float;

    fn widen(self) -> f64 {
        self as f64
    }

    fn narrow(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn widen(self) -> f64 {
        self
    }

    fn narrow(value: f64) -> Self {
        value
    }
}
