//! Protocol trace sinks.
//!
//! `PQtrace` wants a C `FILE *`. A sink duplicates the caller's descriptor
//! and opens its own stream on the copy, so the caller's file object keeps
//! its own buffering and can be closed independently.

use std::ffi::CString;
use std::os::fd::RawFd;
use std::path::Path;
use std::ptr::NonNull;

use crate::error::{PqError, PqResult};

pub struct TraceFile {
    file: NonNull<libc::FILE>,
}

impl TraceFile {
    /// Open a stream on a duplicate of `fd`, appending.
    pub fn from_fd(fd: RawFd) -> PqResult<Self> {
        let dup = unsafe { libc::dup(fd) };
        if dup < 0 {
            return Err(PqError::last_os_error("trace"));
        }
        let file = unsafe { libc::fdopen(dup, c"a".as_ptr()) };
        match NonNull::new(file) {
            Some(file) => Ok(Self { file }),
            None => {
                let err = PqError::last_os_error("trace");
                unsafe { libc::close(dup) };
                Err(err)
            }
        }
    }

    /// Open (or create) `path` for appending.
    pub fn create(path: &Path) -> PqResult<Self> {
        let path = CString::new(path.as_os_str().as_encoded_bytes())?;
        let file = unsafe { libc::fopen(path.as_ptr(), c"a".as_ptr()) };
        NonNull::new(file)
            .map(|file| Self { file })
            .ok_or_else(|| PqError::last_os_error("trace"))
    }

    pub(crate) fn as_ptr(&self) -> *mut pq_sys::FILE {
        self.file.as_ptr().cast()
    }
}

impl Drop for TraceFile {
    fn drop(&mut self) {
        unsafe {
            libc::fflush(self.file.as_ptr());
            libc::fclose(self.file.as_ptr());
        }
    }
}

impl std::fmt::Debug for TraceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TraceFile").field(&self.file).finish()
    }
}
