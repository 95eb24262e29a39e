use std::ffi::{c_char, CStr, CString};
use std::ptr;

use libloading::{Library, Symbol};
use log::{debug, info};

use super::{KernelCache, NvrtcError};

// Opaque nvrtcProgram.
type NvrtcProgramT = *mut std::os::raw::c_void;

const NVRTC_SUCCESS: i32 = 0;

pub struct NvrtcProgram {
    pub ptx: String,
}

pub struct NvrtcCompiler {
    lib: Library,
    cache: Option<KernelCache>,
}

impl NvrtcCompiler {
    pub fn new() -> Result<Self, NvrtcError> {
        let lib = unsafe {
            Library::new("nvrtc64_120_0.dll")
                .or_else(|_| Library::new("nvrtc64_112_0.dll"))
                .or_else(|_| Library::new("libnvrtc.so"))
                .or_else(|_| Library::new("libnvrtc.so.12"))
                .or_else(|_| Library::new("libnvrtc.so.11.2"))
                .map_err(|_| NvrtcError::LoadError)?
        };

        Ok(Self { lib, cache: None })
    }

    pub fn with_cache(mut self, cache: KernelCache) -> Self {
        self.cache = Some(cache);
        self
    }

    unsafe fn symbol<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, NvrtcError> {
        unsafe {
            self.lib.get(name).map_err(|_| {
                let trimmed = name.strip_suffix(b"\0").unwrap_or(name);
                NvrtcError::MissingSymbol(String::from_utf8_lossy(trimmed).into_owned())
            })
        }
    }

    /// Compiles CUDA C `source` to PTX for `arch` (`compute_XX`; `sm_XX` is
    /// normalized to the matching virtual architecture).
    pub fn compile(&self, source: &str, name: &str, arch: &str) -> Result<NvrtcProgram, NvrtcError> {
        let arch = match arch.strip_prefix("sm_") {
            Some(sm) => format!("compute_{}", sm),
            None => arch.to_string(),
        };

        let key = KernelCache::key(source, &arch);
        if let Some(ptx) = self.cache.as_ref().and_then(|c| c.load(name, key)) {
            debug!("PTX cache hit for {} ({})", name, arch);
            return Ok(NvrtcProgram { ptx });
        }

        let ptx = self.compile_uncached(source, name, &arch)?;

        if let Some(cache) = &self.cache {
            cache.store(name, key, &ptx);
        }

        Ok(NvrtcProgram { ptx })
    }

    fn compile_uncached(&self, source: &str, name: &str, arch: &str) -> Result<String, NvrtcError> {
        type CreateFn = unsafe extern "C" fn(
            *mut NvrtcProgramT,
            *const c_char,
            *const c_char,
            i32,
            *const *const c_char,
            *const *const c_char,
        ) -> i32;
        type CompileFn = unsafe extern "C" fn(NvrtcProgramT, i32, *const *const c_char) -> i32;
        type GetPtxSizeFn = unsafe extern "C" fn(NvrtcProgramT, *mut usize) -> i32;
        type GetPtxFn = unsafe extern "C" fn(NvrtcProgramT, *mut c_char) -> i32;
        type GetLogSizeFn = unsafe extern "C" fn(NvrtcProgramT, *mut usize) -> i32;
        type GetLogFn = unsafe extern "C" fn(NvrtcProgramT, *mut c_char) -> i32;
        type DestroyFn = unsafe extern "C" fn(*mut NvrtcProgramT) -> i32;

        let src_c = CString::new(source)
            .map_err(|_| NvrtcError::CompilationError("source contains a NUL byte".into()))?;
        let name_c = CString::new(format!("{}.cu", name))
            .map_err(|_| NvrtcError::CompilationError("name contains a NUL byte".into()))?;

        // Generic PTX for the virtual architecture; no fused multiply-add so
        // every op rounds exactly once, like the host kernels.
        let options = [format!("--gpu-architecture={}", arch), "--fmad=false".to_string()];
        let opt_cstrings = options
            .iter()
            .map(|o| CString::new(o.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| NvrtcError::CompilationError("option contains a NUL byte".into()))?;
        let opt_ptrs: Vec<*const c_char> = opt_cstrings.iter().map(|s| s.as_ptr()).collect();

        unsafe {
            let create: Symbol<CreateFn> = self.symbol(b"nvrtcCreateProgram\0")?;
            let compile: Symbol<CompileFn> = self.symbol(b"nvrtcCompileProgram\0")?;
            let get_ptx_size: Symbol<GetPtxSizeFn> = self.symbol(b"nvrtcGetPTXSize\0")?;
            let get_ptx: Symbol<GetPtxFn> = self.symbol(b"nvrtcGetPTX\0")?;
            let get_log_size: Symbol<GetLogSizeFn> = self.symbol(b"nvrtcGetProgramLogSize\0")?;
            let get_log: Symbol<GetLogFn> = self.symbol(b"nvrtcGetProgramLog\0")?;
            let destroy: Symbol<DestroyFn> = self.symbol(b"nvrtcDestroyProgram\0")?;

            let mut prog: NvrtcProgramT = ptr::null_mut();
            let res = create(&mut prog, src_c.as_ptr(), name_c.as_ptr(), 0, ptr::null(), ptr::null());
            if res != NVRTC_SUCCESS || prog.is_null() {
                return Err(NvrtcError::CompilationError("failed to create NVRTC program".into()));
            }

            info!("compiling {} for {}", name, arch);
            let res = compile(prog, opt_ptrs.len() as i32, opt_ptrs.as_ptr());
            if res != NVRTC_SUCCESS {
                let mut log_size: usize = 0;
                let mut log_msg = String::new();
                if get_log_size(prog, &mut log_size) == NVRTC_SUCCESS && log_size > 1 {
                    let mut buf = vec![0 as c_char; log_size];
                    if get_log(prog, buf.as_mut_ptr()) == NVRTC_SUCCESS {
                        log_msg = CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned();
                    }
                }
                let _ = destroy(&mut prog);
                return Err(NvrtcError::CompilationError(log_msg));
            }

            let mut size: usize = 0;
            if get_ptx_size(prog, &mut size) != NVRTC_SUCCESS || size == 0 {
                let _ = destroy(&mut prog);
                return Err(NvrtcError::CompilationError("failed to get PTX size".into()));
            }

            let mut buffer = vec![0 as c_char; size];
            if get_ptx(prog, buffer.as_mut_ptr()) != NVRTC_SUCCESS {
                let _ = destroy(&mut prog);
                return Err(NvrtcError::CompilationError("failed to get PTX".into()));
            }

            let _ = destroy(&mut prog);

            Ok(CStr::from_ptr(buffer.as_ptr()).to_string_lossy().into_owned())
        }
    }
}
