//! Ownership of memory that libpq allocates and expects back via `PQfreemem`.

use std::ffi::{c_char, CStr};
use std::ptr::NonNull;

/// A buffer allocated by libpq, released with `PQfreemem` on drop.
pub(crate) struct PqBuf<T> {
    ptr: NonNull<T>,
}

impl<T> PqBuf<T> {
    /// Take ownership of a libpq allocation. Returns `None` for NULL.
    ///
    /// # Safety
    /// `ptr` must be NULL or a pointer libpq documents as "free with
    /// PQfreemem" that nothing else frees.
    pub(crate) unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl PqBuf<c_char> {
    pub(crate) fn to_string_lossy(&self) -> String {
        // SAFETY: libpq string results are NUL-terminated
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl PqBuf<u8> {
    /// # Safety
    /// `len` must not exceed the size libpq reported for this buffer.
    pub(crate) unsafe fn to_vec(&self, len: usize) -> Vec<u8> {
        std::slice::from_raw_parts(self.ptr.as_ptr(), len).to_vec()
    }
}

impl<T> Drop for PqBuf<T> {
    fn drop(&mut self) {
        unsafe { pq_sys::PQfreemem(self.ptr.as_ptr().cast()) }
    }
}

/// Copy a borrowed C string, mapping NULL to `None`.
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string.
pub(crate) unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Copy a borrowed C string, mapping NULL to the empty string.
///
/// # Safety
/// Same as [`opt_string`].
pub(crate) unsafe fn string(ptr: *const c_char) -> String {
    opt_string(ptr).unwrap_or_default()
}
