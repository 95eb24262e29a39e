use std::ffi::c_void;

use crate::buffer::DataType;
use crate::gpu::device::DevicePtr;
use crate::gpu::launcher::LaunchError;

/// One kernel argument, tagged with the C type the kernel declares for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelArg {
    Int(i32),
    Float(f32),
    Double(f64),
    Ptr(DevicePtr),
}

impl KernelArg {
    fn as_raw(&self) -> *mut c_void {
        match self {
            KernelArg::Int(v) => v as *const i32 as *mut c_void,
            KernelArg::Float(v) => v as *const f32 as *mut c_void,
            KernelArg::Double(v) => v as *const f64 as *mut c_void,
            KernelArg::Ptr(v) => v as *const DevicePtr as *mut c_void,
        }
    }
}

/// Ordered parameter block for a single launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelParams {
    args: Vec<KernelArg>,
}

impl KernelParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: KernelArg) -> &mut Self {
        self.args.push(arg);
        self
    }

    pub fn args(&self) -> &[KernelArg] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Element count; every kernel takes it as its first argument.
    pub fn count(&self) -> Option<usize> {
        match self.args.first() {
            Some(KernelArg::Int(n)) if *n >= 0 => Some(*n as usize),
            _ => None,
        }
    }

    /// `void**` array for `cuLaunchKernel`. The pointers borrow from `self`.
    pub fn raw_args(&self) -> Vec<*mut c_void> {
        self.args.iter().map(KernelArg::as_raw).collect()
    }
}

fn c_int(name: &'static str, value: usize) -> Result<i32, LaunchError> {
    i32::try_from(value).map_err(|_| LaunchError::ArgumentOverflow { name, value })
}

struct Reader<'a> {
    args: std::slice::Iter<'a, KernelArg>,
}

impl<'a> Reader<'a> {
    fn new(params: &'a KernelParams, expected: usize) -> Result<Self, LaunchError> {
        if params.len() != expected {
            return Err(LaunchError::BadParameters("unexpected argument count"));
        }
        Ok(Self { args: params.args.iter() })
    }

    fn int(&mut self) -> Result<usize, LaunchError> {
        match self.args.next() {
            Some(KernelArg::Int(v)) if *v >= 0 => Ok(*v as usize),
            _ => Err(LaunchError::BadParameters("expected a non-negative int")),
        }
    }

    fn ptr(&mut self) -> Result<DevicePtr, LaunchError> {
        match self.args.next() {
            Some(KernelArg::Ptr(p)) => Ok(*p),
            _ => Err(LaunchError::BadParameters("expected a device pointer")),
        }
    }

    fn scalar(&mut self) -> Result<(DataType, f64), LaunchError> {
        match self.args.next() {
            Some(KernelArg::Float(v)) => Ok((DataType::Float, *v as f64)),
            Some(KernelArg::Double(v)) => Ok((DataType::Double, *v)),
            _ => Err(LaunchError::BadParameters("expected a floating-point scalar")),
        }
    }
}

/// Arguments of a buffer-scalar kernel, marshalled as
/// `(n, offset, scalar, x, inc, result)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarArgs {
    pub n: usize,
    pub offset: usize,
    pub dtype: DataType,
    pub scalar: f64,
    pub x: DevicePtr,
    pub inc: usize,
    pub result: DevicePtr,
}

impl ScalarArgs {
    /// The scalar is narrowed to the buffer's representation here, so a
    /// `float` kernel sees exactly the value a host `f32` would.
    pub fn marshal(&self) -> Result<KernelParams, LaunchError> {
        let scalar = match self.dtype {
            DataType::Float => KernelArg::Float(self.scalar as f32),
            DataType::Double => KernelArg::Double(self.scalar),
        };

        let mut params = KernelParams::new();
        params
            .push(KernelArg::Int(c_int("n", self.n)?))
            .push(KernelArg::Int(c_int("offset", self.offset)?))
            .push(scalar)
            .push(KernelArg::Ptr(self.x))
            .push(KernelArg::Int(c_int("inc", self.inc)?))
            .push(KernelArg::Ptr(self.result));
        Ok(params)
    }

    pub fn decode(params: &KernelParams) -> Result<Self, LaunchError> {
        let mut r = Reader::new(params, 6)?;
        let n = r.int()?;
        let offset = r.int()?;
        let (dtype, scalar) = r.scalar()?;
        Ok(Self {
            n,
            offset,
            dtype,
            scalar,
            x: r.ptr()?,
            inc: r.int()?,
            result: r.ptr()?,
        })
    }
}

/// Arguments of a buffer-buffer kernel, marshalled as
/// `(n, x_offset, y_offset, x, y, inc_x, inc_y, result)`.
/// The result is addressed with `x_offset` and `inc_x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairwiseArgs {
    pub n: usize,
    pub x_offset: usize,
    pub y_offset: usize,
    pub x: DevicePtr,
    pub y: DevicePtr,
    pub inc_x: usize,
    pub inc_y: usize,
    pub result: DevicePtr,
}

impl PairwiseArgs {
    pub fn marshal(&self) -> Result<KernelParams, LaunchError> {
        let mut params = KernelParams::new();
        params
            .push(KernelArg::Int(c_int("n", self.n)?))
            .push(KernelArg::Int(c_int("x_offset", self.x_offset)?))
            .push(KernelArg::Int(c_int("y_offset", self.y_offset)?))
            .push(KernelArg::Ptr(self.x))
            .push(KernelArg::Ptr(self.y))
            .push(KernelArg::Int(c_int("inc_x", self.inc_x)?))
            .push(KernelArg::Int(c_int("inc_y", self.inc_y)?))
            .push(KernelArg::Ptr(self.result));
        Ok(params)
    }

    pub fn decode(params: &KernelParams) -> Result<Self, LaunchError> {
        let mut r = Reader::new(params, 8)?;
        Ok(Self {
            n: r.int()?,
            x_offset: r.int()?,
            y_offset: r.int()?,
            x: r.ptr()?,
            y: r.ptr()?,
            inc_x: r.int()?,
            inc_y: r.int()?,
            result: r.ptr()?,
        })
    }
}
