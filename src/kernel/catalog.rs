//! CUDA C sources for the element-wise kernels and their installation into a
//! [`KernelRegistry`].
//!
//! Every kernel uses a grid-stride loop, so any launch geometry covers `n`.
//! Indices are widened to 64 bits before scaling by the increment.

use std::fmt::Write;

use log::info;

use super::{KernelEntry, KernelKey, KernelRegistry, Layout, OperandKind};
use crate::gpu::nvrtc::NvrtcCompiler;
use crate::gpu::runtime::{CudaRuntime, GpuRuntimeError};

pub const MODULE_NAME: &str = "devbuf_elementwise";

const GRID_STRIDE_LOOP: &str = "for (long long i = (long long)blockIdx.x * blockDim.x + threadIdx.x; \
     i < n; i += (long long)blockDim.x * gridDim.x)";

fn index_expr(layout: Layout, offset: &str, inc: &str) -> String {
    match layout {
        Layout::Dense => "i".to_string(),
        Layout::Strided => format!("(long long){} + i * {}", offset, inc),
    }
}

/// CUDA C definition of one kernel.
pub fn kernel_source(key: &KernelKey) -> String {
    let t = key.dtype.c_name();
    let name = key.symbol();
    let expr = key.op.c_expression();

    match key.operand {
        OperandKind::Scalar => format!(
            "extern \"C\" __global__ void {name}(int n, int offset, {t} scalar, {t} *x, int inc, {t} *result) {{\n\
             \x20   const {t} b = scalar;\n\
             \x20   {GRID_STRIDE_LOOP} {{\n\
             \x20       const long long xi = {xi};\n\
             \x20       const {t} a = x[xi];\n\
             \x20       result[xi] = {expr};\n\
             \x20   }}\n\
             }}\n",
            xi = index_expr(key.layout, "offset", "inc"),
        ),
        OperandKind::Buffer => format!(
            "extern \"C\" __global__ void {name}(int n, int xOffset, int yOffset, {t} *x, {t} *y, int incx, int incy, {t} *result) {{\n\
             \x20   {GRID_STRIDE_LOOP} {{\n\
             \x20       const long long xi = {xi};\n\
             \x20       const long long yi = {yi};\n\
             \x20       const {t} a = x[xi];\n\
             \x20       const {t} b = y[yi];\n\
             \x20       result[xi] = {expr};\n\
             \x20   }}\n\
             }}\n",
            xi = index_expr(key.layout, "xOffset", "incx"),
            yi = index_expr(key.layout, "yOffset", "incy"),
        ),
    }
}

/// The whole module: every kernel from [`KernelKey::all`].
pub fn cuda_source() -> String {
    let mut src = String::new();
    for key in KernelKey::all() {
        let _ = writeln!(src, "{}", kernel_source(&key));
    }
    src
}

/// Compiles the module for `arch`, loads it into `runtime` and registers
/// every function it exports.
pub fn load_cuda_kernels(
    runtime: &CudaRuntime,
    compiler: &NvrtcCompiler,
    arch: &str,
) -> crate::Result<KernelRegistry> {
    let program = compiler.compile(&cuda_source(), MODULE_NAME, arch)?;

    runtime.bind().map_err(GpuRuntimeError::ContextFailed)?;
    let loader = runtime.loader();
    let module = loader.load_module_from_ptx(&program.ptx)?;

    let mut registry = KernelRegistry::new();
    for key in KernelKey::all() {
        let function = loader.get_function(&module, &key.symbol())?;
        registry.register(key, KernelEntry::Cuda(function))?;
    }
    runtime.keep_module(module);

    info!("loaded {} CUDA kernels for {}", registry.len(), arch);
    Ok(registry)
}
