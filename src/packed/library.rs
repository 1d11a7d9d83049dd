//! Kernel shared-library loading and symbol resolution
//!
//! Platform-agnostic wrapper around dlopen/LoadLibrary with a process-wide
//! load cache: loading the same path twice shares one OS handle, and the
//! handle is closed when the last [`KernelLibrary`] reference drops.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::collections::HashMap;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::logging::{debug, info};

/// Libraries currently mapped into the process, keyed by canonical path
static LOAD_CACHE: Lazy<DashMap<PathBuf, Weak<KernelLibrary>>> = Lazy::new(DashMap::new);

/// Handle to a loaded kernel library
pub struct KernelLibrary {
    path: PathBuf,
    handle: NonNull<c_void>,
    /// Resolved symbol addresses, memoized per library.
    symbols: Mutex<HashMap<String, usize>>,
}

impl KernelLibrary {
    /// Load the kernel library at `path`, re-using an already-mapped handle
    /// when possible
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>, LoadError> {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        // Racing loads may both map the library; the loader refcounts the
        // mapping and the cache keeps whichever entry lands last.
        if let Some(entry) = LOAD_CACHE.get(&key) {
            if let Some(lib) = entry.upgrade() {
                debug!(path = %key.display(), "Kernel library cache hit");
                return Ok(lib);
            }
        }

        let _timing = crate::logging::perf::track("library_load");
        let handle = Self::open(&key)?;
        let lib = Arc::new(Self {
            path: key.clone(),
            handle,
            symbols: Mutex::new(HashMap::new()),
        });
        LOAD_CACHE.insert(key, Arc::downgrade(&lib));
        super::record_library_load();
        info!(path = %lib.path.display(), "Kernel library loaded");
        Ok(lib)
    }

    #[cfg(unix)]
    fn open(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        use std::os::unix::ffi::OsStrExt;

        let cpath =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| LoadError::InvalidName)?;

        unsafe {
            let handle = libc::dlopen(cpath.as_ptr(), libc::RTLD_NOW);
            NonNull::new(handle).ok_or_else(|| {
                let err = libc::dlerror();
                let msg = if err.is_null() {
                    "unknown error".into()
                } else {
                    std::ffi::CStr::from_ptr(err).to_string_lossy().into_owned()
                };
                LoadError::LoadFailed(msg)
            })
        }
    }

    #[cfg(windows)]
    fn open(path: &Path) -> Result<NonNull<c_void>, LoadError> {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::errhandlingapi::GetLastError;
        use winapi::um::libloaderapi::LoadLibraryW;

        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

        unsafe {
            let handle = LoadLibraryW(wide.as_ptr());
            NonNull::new(handle as *mut c_void)
                .ok_or_else(|| LoadError::LoadFailed(format!("error code: {}", GetLastError())))
        }
    }

    /// Resolve a raw entry point by symbol name
    pub fn symbol(&self, name: &str) -> Result<*const (), SymbolError> {
        if let Some(&addr) = self.symbols.lock().get(name) {
            return Ok(addr as *const ());
        }
        let ptr = self.symbol_impl(name)?;
        self.symbols.lock().insert(name.to_string(), ptr as usize);
        Ok(ptr)
    }

    #[cfg(unix)]
    fn symbol_impl(&self, name: &str) -> Result<*const (), SymbolError> {
        let cname = CString::new(name).map_err(|_| SymbolError::InvalidName)?;

        unsafe {
            let ptr = libc::dlsym(self.handle.as_ptr(), cname.as_ptr());
            if ptr.is_null() {
                Err(SymbolError::NotFound)
            } else {
                Ok(ptr as *const ())
            }
        }
    }

    #[cfg(windows)]
    fn symbol_impl(&self, name: &str) -> Result<*const (), SymbolError> {
        use winapi::um::libloaderapi::GetProcAddress;

        let cname = CString::new(name).map_err(|_| SymbolError::InvalidName)?;

        unsafe {
            let ptr = GetProcAddress(self.handle.as_ptr() as _, cname.as_ptr());
            if ptr.is_null() {
                Err(SymbolError::NotFound)
            } else {
                Ok(ptr as *const ())
            }
        }
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for KernelLibrary {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Kernel library unloaded");
        #[cfg(unix)]
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
        #[cfg(windows)]
        unsafe {
            winapi::um::libloaderapi::FreeLibrary(self.handle.as_ptr() as _);
        }
    }
}

impl core::fmt::Debug for KernelLibrary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelLibrary")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}

unsafe impl Send for KernelLibrary {}
unsafe impl Sync for KernelLibrary {}

/// Drop cache entries whose library has already been unloaded
pub(crate) fn purge_cache() {
    LOAD_CACHE.retain(|_, weak| weak.strong_count() > 0);
}

/// Library loading errors
#[derive(Debug)]
pub enum LoadError {
    InvalidName,
    LoadFailed(String),
}

impl core::fmt::Display for LoadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "Invalid library path"),
            Self::LoadFailed(msg) => write!(f, "Failed to load kernel library: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Symbol lookup errors
#[derive(Debug)]
pub enum SymbolError {
    InvalidName,
    NotFound,
}

impl core::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "Invalid symbol name"),
            Self::NotFound => write!(f, "Symbol not found"),
        }
    }
}

impl std::error::Error for SymbolError {}
